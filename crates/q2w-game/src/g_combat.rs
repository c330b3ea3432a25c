// g_combat.rs — damage, armor, knockback and obituaries

/*
Copyright (C) 1997-2001 Id Software, Inc.

This program is free software; you can redistribute it and/or
modify it under the terms of the GNU General Public License
as published by the Free Software Foundation; either version 2
of the License, or (at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program; if not, write to the Free Software
Foundation, Inc., 59 Temple Place - Suite 330, Boston, MA  02111-1307, USA.
*/

use log::debug;

use crate::g_events::TempEvent;
use crate::g_local::*;
use crate::game_import::{Multicast, PrintLevel};

const QUAD_DAMAGE_FACTOR: f32 = 2.5;
const QUAD_KNOCKBACK_FACTOR: f32 = 2.0;

const KNOCKBACK_SCALE: f32 = 1000.0;
/// Milliseconds the engine leaves a knocked-back player's velocity alone.
const KNOCKBACK_PM_TIME: u16 = 50;

/// Absorption of one armor type, in percent of the incoming damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmorInfo {
    pub max: i16,
    pub normal_protection: i32,
    pub energy_protection: i32,
}

impl ArmorType {
    pub fn info(self) -> Option<ArmorInfo> {
        match self {
            ArmorType::None => None,
            ArmorType::Jacket => Some(ArmorInfo {
                max: 50,
                normal_protection: 30,
                energy_protection: 0,
            }),
            ArmorType::Combat => Some(ArmorInfo {
                max: 100,
                normal_protection: 60,
                energy_protection: 30,
            }),
            ArmorType::Body => Some(ArmorInfo {
                max: 200,
                normal_protection: 80,
                energy_protection: 60,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImpactEffect {
    Blood,
    Bullet,
    Sparks,
}

impl GameCtx {
    /// True if both are clients on the same team. Spectators are all on one
    /// team.
    pub fn on_same_team(&self, ent1: usize, ent2: usize) -> bool {
        let (Some(c1), Some(c2)) = (self.client(ent1), self.client(ent2)) else {
            return false;
        };

        if c1.persistent.spectator && c2.persistent.spectator {
            return true;
        }

        if !self.level.teams && !self.level.ctf {
            return false;
        }

        c1.persistent.team.is_some() && c1.persistent.team == c2.persistent.team
    }

    /// True if the inflictor has a clear line to the target. Used for
    /// explosions.
    pub fn can_damage(&mut self, target: usize, inflictor: usize) -> bool {
        let start = self.edicts[inflictor].s.origin;

        // inline models have their origin at 0 0 0
        if self.edicts[target].move_type == MoveType::Push {
            let dest = self.edicts[target].abs_center();
            let tr = self.gi.trace(&start, &VEC3_ORIGIN, &VEC3_ORIGIN, &dest, Some(inflictor), MASK_SOLID);
            return tr.fraction == 1.0 || tr.ent == Some(target);
        }

        let origin = self.edicts[target].s.origin;
        let offsets = [(0.0, 0.0), (15.0, 15.0), (15.0, -15.0), (-15.0, 15.0), (-15.0, -15.0)];

        offsets.iter().any(|&(dx, dy)| {
            let dest = [origin[0] + dx, origin[1] + dy, origin[2]];
            let tr = self.gi.trace(&start, &VEC3_ORIGIN, &VEC3_ORIGIN, &dest, Some(inflictor), MASK_SOLID);
            tr.fraction == 1.0
        })
    }

    fn spawn_damage(&mut self, effect: ImpactEffect, pos: &Vec3, normal: &Vec3, damage: i32) {
        if damage < 1 {
            return;
        }

        let count = (damage / 50).clamp(1, 4);
        let (pos, dir) = (*pos, *normal);
        let event = match effect {
            ImpactEffect::Blood => TempEvent::Blood { pos, dir },
            ImpactEffect::Bullet => TempEvent::Bullet { pos, dir },
            ImpactEffect::Sparks => TempEvent::Sparks { pos, dir },
        };

        for _ in 0..count {
            self.temp_event(&event, &pos, Multicast::Pvs);
        }
    }

    /// Returns the damage absorbed by the target's armor.
    fn check_armor(&mut self, ent: usize, pos: &Vec3, normal: &Vec3, damage: i32, dflags: u32) -> i32 {
        if damage < 1 || dflags & (DAMAGE_NO_ARMOR | DAMAGE_NO_PROTECTION) != 0 {
            return 0;
        }

        let Some(client) = self.client_mut(ent) else {
            return 0;
        };

        let p = &mut client.persistent;
        let Some(info) = p.armor_type.info() else {
            return 0;
        };
        if p.armor <= 0 {
            return 0;
        }

        let protection = if dflags & DAMAGE_ENERGY != 0 {
            info.energy_protection
        } else {
            info.normal_protection
        };

        // rounds up
        let saved = ((protection * damage + 99) / 100).min(p.armor as i32);
        p.armor -= saved as i16;
        if p.armor == 0 {
            p.armor_type = ArmorType::None;
        }

        self.spawn_damage(ImpactEffect::Sparks, pos, normal, saved);
        saved
    }

    /// The inflictor imparts damage on the target on behalf of the attacker.
    ///
    /// * `dir` - direction of the attack, used for knockback
    /// * `pos` - point at which damage is inflicted
    /// * `normal` - surface normal at `pos`, for impact effects
    /// * `dflags` - `DAMAGE_RADIUS`, `DAMAGE_NO_ARMOR`, `DAMAGE_ENERGY`,
    ///   `DAMAGE_BULLET`, `DAMAGE_NO_PROTECTION`
    /// * `mod_` - means of death, for obituaries
    pub fn damage(
        &mut self,
        target: usize,
        inflictor: usize,
        attacker: usize,
        dir: &Vec3,
        pos: &Vec3,
        normal: &Vec3,
        damage: i32,
        knockback: i32,
        dflags: u32,
        mod_: u32,
    ) {
        let t = &self.edicts[target];
        if !t.take_damage || t.dead || t.health <= 0 {
            return;
        }

        if dflags & DAMAGE_NO_PROTECTION == 0 {
            let protected = self
                .client(target)
                .map(|c| c.locals.respawn_protection_time > self.level.time)
                .unwrap_or(false);
            if protected {
                return;
            }
        }

        let mut damage = damage as f32;
        let mut knockback = knockback as f32;
        let mut mod_ = mod_;

        let quad = self
            .client(attacker)
            .map(|c| c.locals.quad_damage_time > self.level.time)
            .unwrap_or(false);
        if quad {
            damage *= QUAD_DAMAGE_FACTOR;
            knockback *= QUAD_KNOCKBACK_FACTOR;
        }

        // friendly fire avoidance
        if target != attacker && (self.level.teams || self.level.ctf) && self.on_same_team(target, attacker) {
            if mod_ == MOD_TELEFRAG || self.gi.cvars().value("g_friendly_fire") != 0.0 {
                mod_ |= MOD_FRIENDLY_FIRE;
            } else {
                damage = 0.0;
                knockback = 0.0;
            }
        }

        // there is no self damage in instagib or arena, but there is knockback
        if target == attacker && matches!(self.level.gameplay, Gameplay::Instagib | Gameplay::Arena) {
            damage = 0.0;
        }

        self.level.means_of_death = mod_;

        let damage = damage as i32;
        let knockback = knockback as i32;

        self.apply_knockback(target, attacker, dir, knockback, mod_);

        let mut inflicted = damage;
        let mut saved = 0;

        if self.edicts[target].flags.contains(EntityFlags::GOD_MODE) && dflags & DAMAGE_NO_PROTECTION == 0 {
            inflicted = 0;
            saved = damage;
            self.spawn_damage(ImpactEffect::Sparks, pos, normal, saved);
        }

        let saved_armor = self.check_armor(target, pos, normal, inflicted, dflags);
        inflicted -= saved_armor;
        let saved_armor = saved_armor + saved;

        let is_client = self.edicts[target].is_client();

        if inflicted > 0 {
            let effect = if is_client {
                ImpactEffect::Blood
            } else if dflags & DAMAGE_BULLET != 0 {
                ImpactEffect::Bullet
            } else {
                ImpactEffect::Sparks
            };
            self.spawn_damage(effect, pos, normal, inflicted);

            self.edicts[target].health -= inflicted;

            if self.edicts[target].health <= 0 {
                if self.edicts[target].die.is_some() {
                    self.call_die(target, inflictor, attacker, inflicted, pos);
                } else {
                    debug!("no die function for {}", self.edicts[target].class_name);
                }
                return;
            }
        }

        if inflicted > 0 || knockback > 0 {
            self.call_pain(target, attacker, inflicted, knockback);
        }

        if is_client {
            let time = self.level.time;
            if let Some(client) = self.client_mut(target) {
                client.locals.damage_armor += saved_armor as i16;
                client.locals.damage_health += inflicted as i16;
                client.locals.pain_time = time;
            }
            if attacker != target {
                if let Some(client) = self.client_mut(attacker) {
                    client.locals.damage_inflicted += inflicted as i16;
                }
            }
        }
    }

    fn apply_knockback(&mut self, target: usize, attacker: usize, dir: &Vec3, knockback: i32, mod_: u32) {
        let t = &self.edicts[target];
        if knockback == 0
            || t.flags.contains(EntityFlags::NO_KNOCKBACK)
            || !matches!(t.move_type, MoveType::Walk | MoveType::Toss | MoveType::Bounce | MoveType::Fly)
        {
            return;
        }

        let ndir = vector_normalized(dir);
        let mass = t.mass.clamp(50.0, 999.0);

        // weapon jumping
        let scale = if target == attacker {
            match mod_ & !MOD_FRIENDLY_FIRE {
                MOD_BFG_BLAST => 300.0,
                MOD_ROCKET_SPLASH => 1400.0,
                MOD_GRENADE => 1200.0,
                _ => KNOCKBACK_SCALE,
            }
        } else {
            KNOCKBACK_SCALE
        };

        let kvel = vector_scale(&ndir, scale * knockback as f32 / mass);
        let t = &mut self.edicts[target];
        t.velocity = vector_add(&t.velocity, &kvel);

        if let Some(client) = self.client_mut(target) {
            client.ps.pmove.pm_flags |= PMF_PUSHED;
            client.ps.pmove.pm_time = KNOCKBACK_PM_TIME;
        }
    }

    /// Splash damage falling off linearly to zero at `radius`.
    pub fn radius_damage(
        &mut self,
        inflictor: usize,
        attacker: usize,
        ignore: Option<usize>,
        damage: i32,
        knockback: i32,
        radius: f32,
        mod_: u32,
    ) {
        let origin = self.edicts[inflictor].s.origin;

        for ent in self.find_radius(&origin, radius) {
            if Some(ent) == ignore || !self.edicts[ent].in_use || !self.edicts[ent].take_damage {
                continue;
            }

            let e = &self.edicts[ent];
            let center = vector_add(&e.s.origin, &vector_mix(&e.mins, &e.maxs, 0.5));
            let mut dir = vector_subtract(&center, &origin);
            let dist = vector_normalize(&mut dir);

            let falloff = (1.0 - dist / radius).max(0.0);
            let mut d = damage as f32 * falloff;
            let k = knockback as f32 * falloff;

            if d <= 0.0 && k <= 0.0 {
                continue;
            }

            if ent == attacker {
                d *= if mod_ == MOD_BFG_BLAST { 0.25 } else { 0.5 };
            }

            if !self.can_damage(ent, inflictor) {
                continue;
            }

            self.damage(
                ent,
                inflictor,
                attacker,
                &dir,
                &center,
                &VEC3_ORIGIN,
                d as i32,
                k as i32,
                DAMAGE_RADIUS,
                mod_,
            );
        }
    }

    // ============================================================
    // Obituaries
    // ============================================================

    /// Announce a player's death and adjust scores.
    pub fn client_obituary(&mut self, victim: usize, attacker: usize) {
        let ff = self.level.means_of_death & MOD_FRIENDLY_FIRE != 0;
        let mod_ = self.level.means_of_death & !MOD_FRIENDLY_FIRE;

        let victim_name = self
            .client(victim)
            .map(|c| c.persistent.net_name.clone())
            .unwrap_or_default();

        let suicide = if attacker == victim {
            Some(self_kill_message(mod_))
        } else {
            environment_message(mod_)
        };

        if let Some(message) = suicide {
            self.gi
                .bprint(PrintLevel::Medium, &format!("{} {}.\n", victim_name, message));

            if self.level.warmup {
                return;
            }

            let team = self.team_of(victim);
            if let Some(client) = self.client_mut(victim) {
                client.persistent.score -= 1;
            }
            if self.level.teams || self.level.ctf {
                if let Some(team) = team {
                    self.team_mut(team).score -= 1;
                }
            }
            return;
        }

        self.edicts[victim].enemy = Some(self.entity_ref(attacker));

        let Some(attacker_name) = self.client(attacker).map(|c| c.persistent.net_name.clone()) else {
            return;
        };

        let (message, message2) = kill_message(mod_);
        self.gi.bprint(
            PrintLevel::Medium,
            &format!(
                "{}{} {} {}{}\n",
                if ff { "^1TEAMKILL^7 " } else { "" },
                victim_name,
                message,
                attacker_name,
                message2
            ),
        );

        if self.level.warmup {
            return;
        }

        let delta = if ff { -1 } else { 1 };
        let team = self.team_of(attacker);
        if let Some(client) = self.client_mut(attacker) {
            client.persistent.score += delta;
        }
        if self.level.teams || self.level.ctf {
            if let Some(team) = team {
                self.team_mut(team).score += delta;
            }
        }
    }
}

/// Deaths that need no attacker.
fn environment_message(mod_: u32) -> Option<&'static str> {
    match mod_ {
        MOD_SUICIDE | MOD_TRIGGER_HURT => Some("sucks at life"),
        MOD_FALLING => Some("challenged gravity"),
        MOD_CRUSH => Some("likes it tight"),
        MOD_WATER => Some("took a drink"),
        MOD_SLIME => Some("got slimed"),
        MOD_LAVA => Some("did a back flip into the lava"),
        _ => None,
    }
}

fn self_kill_message(mod_: u32) -> &'static str {
    match mod_ {
        MOD_GRENADE_SPLASH => "went pop",
        MOD_ROCKET_SPLASH => "needs glasses",
        MOD_LIGHTNING_DISCHARGE => "took a toaster bath",
        MOD_BFG_BLAST => "should have used a smaller gun",
        m => environment_message(m).unwrap_or("sucks at life"),
    }
}

fn kill_message(mod_: u32) -> (&'static str, &'static str) {
    match mod_ {
        MOD_BLASTER => ("was blasted by", ""),
        MOD_SHOTGUN => ("was gunned down by", "'s pea shooter"),
        MOD_SUPER_SHOTGUN => ("was blown away by", "'s super shotgun"),
        MOD_MACHINEGUN => ("was chewed up by", ""),
        MOD_GRENADE => ("was popped by", "'s grenade"),
        MOD_GRENADE_SPLASH => ("was shredded by", "'s shrapnel"),
        MOD_ROCKET => ("ate", "'s rocket"),
        MOD_ROCKET_SPLASH => ("almost dodged", "'s rocket"),
        MOD_HYPERBLASTER => ("was melted by", "'s hyperblaster"),
        MOD_LIGHTNING => ("was tased by", "'s lightning"),
        MOD_LIGHTNING_DISCHARGE => ("sipped", "'s discharge"),
        MOD_RAILGUN => ("was poked by", "'s railgun"),
        MOD_BFG_LASER => ("saw the pretty lights from", "'s BFG"),
        MOD_BFG_BLAST => ("was disintegrated by", "'s BFG blast"),
        MOD_TELEFRAG => ("tried to invade", "'s personal space"),
        _ => ("was killed by", ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn two_players() -> (GameCtx, std::rc::Rc<std::cell::RefCell<MockWorld>>) {
        let (mut ctx, world) = make_ctx(2, 128);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [200.0, 0.0, 0.0]);
        (ctx, world)
    }

    // ============================================================
    // Direct damage
    // ============================================================

    #[test]
    fn test_damage_reduces_health() {
        let (mut ctx, _) = two_players();
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &[200.0, 0.0, 0.0], &VEC3_ORIGIN, 30, 0, 0, MOD_BLASTER);
        assert_eq!(ctx.edicts[2].health, 70);
        assert_eq!(ctx.clients[1].locals.damage_health, 30);
        assert_eq!(ctx.clients[0].locals.damage_inflicted, 30);
    }

    #[test]
    fn test_damage_is_idempotent_after_death() {
        let (mut ctx, _) = two_players();
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 150, 0, 0, MOD_RAILGUN);
        assert!(ctx.edicts[2].dead);
        let health = ctx.edicts[2].health;
        let score = ctx.clients[0].persistent.score;

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 150, 0, 0, MOD_RAILGUN);
        assert_eq!(ctx.edicts[2].health, health);
        assert_eq!(ctx.clients[0].persistent.score, score);
    }

    #[test]
    fn test_kill_scores_attacker() {
        let (mut ctx, world) = two_players();
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, 0, MOD_ROCKET);
        assert_eq!(ctx.clients[0].persistent.score, 1);
        let world = world.borrow();
        assert!(world.bprints.iter().any(|(_, m)| m.contains("'s rocket")));
    }

    #[test]
    fn test_suicide_costs_a_point() {
        let (mut ctx, _) = two_players();
        ctx.damage(1, 1, 1, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 500, 0, 0, MOD_ROCKET_SPLASH);
        assert!(ctx.edicts[1].dead);
        assert_eq!(ctx.clients[0].persistent.score, -1);
    }

    #[test]
    fn test_respawn_protection() {
        let (mut ctx, _) = two_players();
        ctx.clients[1].locals.respawn_protection_time = ctx.level.time + 1000;
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, 0, MOD_BLASTER);
        assert_eq!(ctx.edicts[2].health, 100);

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, DAMAGE_NO_PROTECTION, MOD_TELEFRAG);
        assert_eq!(ctx.edicts[2].health, 50);
    }

    #[test]
    fn test_god_mode() {
        let (mut ctx, _) = two_players();
        ctx.edicts[2].flags |= EntityFlags::GOD_MODE;
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, 0, MOD_BLASTER);
        assert_eq!(ctx.edicts[2].health, 100);
    }

    #[test]
    fn test_quad_multiplies_damage() {
        let (mut ctx, _) = two_players();
        ctx.clients[0].locals.quad_damage_time = ctx.level.time + 5000;
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 20, 0, 0, MOD_BLASTER);
        assert_eq!(ctx.edicts[2].health, 50);
    }

    // ============================================================
    // Armor
    // ============================================================

    #[test]
    fn test_armor_absorbs_by_type() {
        let (mut ctx, _) = two_players();
        ctx.clients[1].persistent.armor = 100;
        ctx.clients[1].persistent.armor_type = ArmorType::Combat;

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, 0, MOD_MACHINEGUN);
        // 60% saved
        assert_eq!(ctx.clients[1].persistent.armor, 70);
        assert_eq!(ctx.edicts[2].health, 80);
        assert_eq!(ctx.clients[1].locals.damage_armor, 30);
    }

    #[test]
    fn test_armor_never_goes_negative() {
        let (mut ctx, _) = two_players();
        ctx.clients[1].persistent.armor = 5;
        ctx.clients[1].persistent.armor_type = ArmorType::Body;

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, 0, MOD_MACHINEGUN);
        assert_eq!(ctx.clients[1].persistent.armor, 0);
        assert_eq!(ctx.clients[1].persistent.armor_type, ArmorType::None);
        assert_eq!(ctx.edicts[2].health, 55);
    }

    #[test]
    fn test_armor_save_exact_and_rounded_up() {
        let (mut ctx, _) = two_players();
        ctx.clients[1].persistent.armor = 50;
        ctx.clients[1].persistent.armor_type = ArmorType::Jacket;

        // 30% of 10 is exactly 3
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 10, 0, 0, MOD_MACHINEGUN);
        assert_eq!(ctx.clients[1].persistent.armor, 47);
        assert_eq!(ctx.edicts[2].health, 93);

        // 30% of 7 is 2.1
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 7, 0, 0, MOD_MACHINEGUN);
        assert_eq!(ctx.clients[1].persistent.armor, 44);
        assert_eq!(ctx.edicts[2].health, 89);
    }

    #[test]
    fn test_energy_and_no_armor() {
        let (mut ctx, _) = two_players();
        ctx.clients[1].persistent.armor = 50;
        ctx.clients[1].persistent.armor_type = ArmorType::Jacket;

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 10, 0, DAMAGE_ENERGY, MOD_BLASTER);
        assert_eq!(ctx.clients[1].persistent.armor, 50);
        assert_eq!(ctx.edicts[2].health, 90);

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 10, 0, DAMAGE_NO_ARMOR, MOD_WATER);
        assert_eq!(ctx.clients[1].persistent.armor, 50);
        assert_eq!(ctx.edicts[2].health, 80);
    }

    // ============================================================
    // Teams and knockback
    // ============================================================

    #[test]
    fn test_friendly_fire_suppressed_but_self_splash_applies() {
        let (mut ctx, _) = two_players();
        ctx.level.teams = true;
        ctx.gi.cvars().set("g_friendly_fire", "0");
        ctx.clients[0].persistent.team = Some(TeamId::Good);
        ctx.clients[1].persistent.team = Some(TeamId::Good);

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 50, 0, MOD_ROCKET);
        assert_eq!(ctx.edicts[2].health, 100);

        ctx.radius_damage(1, 1, None, 100, 100, 120.0, MOD_ROCKET_SPLASH);
        assert!(ctx.edicts[1].health < 100);
    }

    #[test]
    fn test_friendly_fire_enabled_tags_mod() {
        let (mut ctx, _) = two_players();
        ctx.level.teams = true;
        ctx.gi.cvars().set("g_friendly_fire", "1");
        ctx.clients[0].persistent.team = Some(TeamId::Evil);
        ctx.clients[1].persistent.team = Some(TeamId::Evil);

        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 0, 0, MOD_ROCKET);
        assert_eq!(ctx.edicts[2].health, 50);
        assert!(ctx.level.means_of_death & MOD_FRIENDLY_FIRE != 0);
    }

    #[test]
    fn test_no_self_damage_in_instagib() {
        let (mut ctx, _) = two_players();
        ctx.level.gameplay = Gameplay::Instagib;
        ctx.damage(1, 1, 1, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 50, 50, DAMAGE_RADIUS, MOD_ROCKET_SPLASH);
        assert_eq!(ctx.edicts[1].health, 100);
        assert!(ctx.edicts[1].velocity[2] > 0.0);
    }

    #[test]
    fn test_knockback_scales_with_mass() {
        let (mut ctx, _) = two_players();
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 0, 100, 0, MOD_BLASTER);
        // 1000 * 100 / 200
        assert!((ctx.edicts[2].velocity[0] - 500.0).abs() < 1e-3);
        assert!(ctx.clients[1].ps.pmove.pm_flags & PMF_PUSHED != 0);
    }

    // ============================================================
    // Radius damage
    // ============================================================

    #[test]
    fn test_radius_falloff_is_monotonic() {
        let (mut ctx, _) = make_ctx(3, 128);
        spawn_test_client(&mut ctx, 2, [40.0, 0.0, -4.0]);
        spawn_test_client(&mut ctx, 3, [80.0, 0.0, -4.0]);
        let bomb = ctx.alloc_entity("bomb").unwrap();

        ctx.radius_damage(bomb, bomb, None, 100, 0, 120.0, MOD_EXPLOSIVE);
        let near = 100 - ctx.edicts[2].health;
        let far = 100 - ctx.edicts[3].health;
        assert!(near >= far);
        assert!(far > 0);
    }

    #[test]
    fn test_radius_damage_stops_at_radius() {
        let (mut ctx, _) = make_ctx(2, 128);
        spawn_test_client(&mut ctx, 2, [300.0, 0.0, 0.0]);
        let bomb = ctx.alloc_entity("bomb").unwrap();
        ctx.radius_damage(bomb, bomb, None, 100, 100, 120.0, MOD_EXPLOSIVE);
        assert_eq!(ctx.edicts[2].health, 100);
    }

    #[test]
    fn test_radius_damage_blocked_by_wall() {
        let (mut ctx, world) = make_ctx(2, 128);
        world.borrow_mut().add_brush([20.0, -64.0, -64.0], [30.0, 64.0, 64.0], CONTENTS_SOLID);
        spawn_test_client(&mut ctx, 2, [60.0, 0.0, 0.0]);
        let bomb = ctx.alloc_entity("bomb").unwrap();
        ctx.radius_damage(bomb, bomb, None, 100, 0, 200.0, MOD_EXPLOSIVE);
        assert_eq!(ctx.edicts[2].health, 100);
    }

    #[test]
    fn test_impact_effects_are_multicast() {
        let (mut ctx, world) = two_players();
        ctx.damage(2, 1, 1, &[1.0, 0.0, 0.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 120, 0, 0, MOD_RAILGUN);
        // 120 / 50 blood events
        let types = world.borrow().temp_event_types();
        assert_eq!(types.iter().filter(|&&t| t == crate::g_events::TE_BLOOD).count(), 2);
    }
}
