// g_weapon.rs — projectiles, hitscan weapons, the grappling hook and ripples

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

use log::{debug, warn};

use crate::dispatch::{ThinkFn, TouchFn};
use crate::g_events::TempEvent;
use crate::g_local::*;
use crate::game::SVF_PROJECTILE;
use crate::game_import::{Attenuation, Multicast};

pub const TRAIL_BLASTER: u8 = 1;
pub const TRAIL_GRENADE: u8 = 2;
pub const TRAIL_ROCKET: u8 = 3;
pub const TRAIL_HYPERBLASTER: u8 = 4;
pub const TRAIL_LIGHTNING: u8 = 5;
pub const TRAIL_BFG: u8 = 6;
pub const TRAIL_HOOK: u8 = 7;

pub const EFFECT_COLOR_RED: u8 = 242;
pub const EFFECT_COLOR_BLUE: u8 = 243;

const PROJECTILE_LIFETIME: u32 = 8000;
const HYPERBLASTER_LIFETIME: u32 = 6000;
const GRENADE_BOUNCE_DEBOUNCE: u32 = 200;
const LIGHTNING_RANGE: f32 = 800.0;
/// A beam not refired within this many ms goes away.
const LIGHTNING_TIMEOUT: u32 = 101;
const HYPERBLASTER_CLIMB_DISTANCE: f32 = 32.0;

pub const HOOK_SPEED: f32 = 1200.0;
pub const HOOK_PULL_SPEED: f32 = 600.0;
const HOOK_FLIGHT_TIME: u32 = 2000;

const RIPPLE_DELAY: u32 = 400;

impl GameCtx {
    // ============================================================
    // Helpers
    // ============================================================

    /// Adds a fraction of the owner's velocity to a new projectile.
    fn player_projectile(&mut self, projectile: usize, scale: f32) {
        let Some(owner) = self.resolve(self.edicts[projectile].owner) else {
            debug!("no owner for {}", self.etos(projectile));
            return;
        };
        let s = scale * self.gi.cvars().value("g_player_projectile");
        let owner_velocity = self.edicts[owner].velocity;
        let p = &mut self.edicts[projectile];
        p.velocity = vector_ma(&p.velocity, s, &owner_velocity);
    }

    /// True if the shooter is too close to a wall for the projectile to
    /// start where it was placed.
    fn immediate_wall(&mut self, ent: usize, projectile: usize) -> bool {
        let start = self.edicts[ent].s.origin;
        let p = &self.edicts[projectile];
        let (end, mins, maxs) = (p.s.origin, p.mins, p.maxs);
        self.gi.trace(&start, &mins, &maxs, &end, Some(ent), MASK_SOLID).fraction < 1.0
    }

    /// Not moving and not a mover in motion.
    pub fn is_stationary(&self, ent: Option<usize>) -> bool {
        let Some(ent) = ent else {
            return false;
        };
        let e = &self.edicts[ent];
        e.move_type == MoveType::None && vector_is_zero(&e.velocity) && vector_is_zero(&e.avelocity)
    }

    /// True if the hit looks like level geometry that can carry a mark.
    pub fn is_structural(&self, ent: Option<usize>, surf: Option<&CSurface>) -> bool {
        let Some(e) = ent else {
            return false;
        };
        if self.edicts[e].is_client() || self.edicts[e].take_damage {
            return false;
        }
        match surf {
            Some(s) if s.flags & SURF_SKY == 0 => self.is_stationary(ent),
            _ => false,
        }
    }

    fn takes_damage(&self, ent: Option<usize>) -> bool {
        ent.map(|e| self.edicts[e].take_damage).unwrap_or(false)
    }

    fn owner_of(&self, ent: usize) -> usize {
        self.resolve(self.edicts[ent].owner).unwrap_or(ent)
    }

    fn spawn_projectile(&mut self, class_name: &str, owner: usize, start: &Vec3) -> Option<usize> {
        let projectile = match self.alloc_entity(class_name) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: {}", class_name, e);
                return None;
            }
        };
        let owner_ref = self.entity_ref(owner);
        let p = &mut self.edicts[projectile];
        p.owner = Some(owner_ref);
        p.s.origin = *start;
        p.s.old_origin = *start;
        p.clip_mask = MASK_SHOT;
        p.solid = Solid::Missile;
        p.sv_flags |= SVF_PROJECTILE;
        Some(projectile)
    }

    fn bubble_trail(&mut self, start: &Vec3, tr: &Trace) {
        if vector_compare(&tr.end, start) {
            return;
        }

        let dir = vector_normalized(&vector_subtract(&tr.end, start));
        let pos = vector_ma(&tr.end, -2.0, &dir);

        let end = if self.gi.point_contents(&pos) & MASK_WATER != 0 {
            pos
        } else {
            self.gi.trace(&pos, &VEC3_ORIGIN, &VEC3_ORIGIN, start, tr.ent, MASK_WATER).end
        };

        let mid = vector_mix(start, &end, 0.5);
        self.temp_event(&TempEvent::Bubbles { start: *start, end }, &mid, Multicast::Phs);
    }

    /// Visible streak for long bullet paths.
    fn tracer(&mut self, start: &Vec3, end: &Vec3) {
        let mut dir = vector_subtract(end, start);
        let len = vector_normalize(&mut dir);
        if len < 128.0 {
            return;
        }

        let mid = vector_ma(end, -len + self.frand() * 0.05 * len, &dir);
        let event = TempEvent::Tracer { start: mid, end: *end };
        self.temp_event(&event, start, Multicast::Phs);

        if !self.gi.in_phs(start, end) {
            self.temp_event(&event, end, Multicast::Phs);
        }
    }

    fn burn_mark(&mut self, pos: &Vec3, plane: &CPlane, size: u8) {
        self.temp_event(
            &TempEvent::Burn {
                pos: *pos,
                dir: plane.normal,
                size,
            },
            pos,
            Multicast::Phs,
        );
    }

    // ============================================================
    // Blaster
    // ============================================================

    pub fn blaster_projectile(&mut self, ent: usize, start: &Vec3, dir: &Vec3, speed: i32, damage: i32, knockback: i32) {
        let Some(p) = self.spawn_projectile("blaster", ent, start) else {
            return;
        };
        let color = self.client(ent).map(|c| c.persistent.color as u8).unwrap_or(0);
        let time = self.level.time;

        let e = &mut self.edicts[p];
        e.mins = [-1.0; 3];
        e.maxs = [1.0; 3];
        e.s.angles = vectoangles_exact(dir);
        e.velocity = vector_scale(dir, speed as f32);
        e.dmg = damage;
        e.knockback = knockback;
        e.move_type = MoveType::Fly;
        e.next_think = time + PROJECTILE_LIFETIME;
        e.think = Some(ThinkFn::FreeEntity);
        e.touch = Some(TouchFn::Blaster);
        e.s.trail = TRAIL_BLASTER;
        // the client byte carries the bolt color
        e.s.client = color;

        self.player_projectile(p, 0.25);
        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);
    }

    pub fn blaster_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let owner = self.owner_of(ent);
        if other == owner {
            return;
        }

        let normal = plane.map(|p| p.normal).unwrap_or(VEC3_ORIGIN);
        let e = &self.edicts[ent];
        let (origin, velocity, dmg, kb, color) = (e.s.origin, e.velocity, e.dmg, e.knockback, e.s.client);

        if self.takes_damage(Some(other)) {
            self.damage(other, ent, owner, &velocity, &origin, &normal, dmg, kb, 0, MOD_BLASTER);
        } else if self.is_structural(Some(other), surf) {
            let pos = vector_ma(&origin, 16.0, &normal);
            self.temp_event(&TempEvent::Blaster { pos, dir: normal, color }, &pos, Multicast::Phs);
        }

        self.free_entity(ent);
    }

    // ============================================================
    // Bullets
    // ============================================================

    /// One hitscan bullet. The aim wanders by up to `hspread` and `vspread`
    /// units at the end of its range.
    pub fn bullet_projectile(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        damage: i32,
        knockback: i32,
        hspread: i32,
        vspread: i32,
        mod_: u32,
    ) {
        let origin = self.edicts[ent].s.origin;
        let mut tr = self.gi.trace(&origin, &VEC3_ORIGIN, &VEC3_ORIGIN, start, Some(ent), MASK_SHOT);

        if tr.fraction == 1.0 {
            let (forward, right, up) = angle_vectors_tuple(&vectoangles_exact(dir));
            let mut end = vector_ma(start, MAX_WORLD_DIST, &forward);
            let h = self.crand() * hspread as f32;
            let v = self.crand() * vspread as f32;
            end = vector_ma(&end, h, &right);
            end = vector_ma(&end, v, &up);

            tr = self.gi.trace(start, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, Some(ent), MASK_SHOT);
        }

        if tr.fraction >= 1.0 {
            return;
        }

        if self.takes_damage(tr.ent) {
            if let Some(hit) = tr.ent {
                self.damage(hit, ent, ent, dir, &tr.end, &tr.plane.normal, damage, knockback, DAMAGE_BULLET, mod_);
            }
        } else if self.is_structural(tr.ent, tr.surface.as_ref()) && tr.surface_flags() & SURF_ALPHA_TEST == 0 {
            let event = TempEvent::Bullet {
                pos: tr.end,
                dir: tr.plane.normal,
            };
            self.temp_event(&event, &tr.end, Multicast::Phs);
        }

        self.tracer(start, &tr.end);

        if self.gi.point_contents(start) & MASK_WATER != 0 || self.gi.point_contents(&tr.end) & MASK_WATER != 0 {
            self.bubble_trail(start, &tr);
        }
    }

    pub fn shotgun_projectiles(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        damage: i32,
        knockback: i32,
        hspread: i32,
        vspread: i32,
        count: u32,
        mod_: u32,
    ) {
        for _ in 0..count {
            self.bullet_projectile(ent, start, dir, damage, knockback, hspread, vspread, mod_);
        }
    }

    // ============================================================
    // Grenades
    // ============================================================

    pub fn grenade_projectile(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        speed: f32,
        damage: i32,
        knockback: i32,
        damage_radius: f32,
        timer: u32,
    ) {
        let Some(p) = self.spawn_projectile("grenade", ent, start) else {
            return;
        };

        let angles = vectoangles_exact(dir);
        let (_, right, up) = angle_vectors_tuple(&angles);
        let lift = 200.0 + self.crand() * 10.0;
        let drift = self.crand() * 30.0;
        let avelocity = [-300.0 + 10.0 * self.crand(), 50.0 * self.crand(), 25.0 * self.crand()];
        let time = self.level.time;
        let model = self.gi.model_index("models/objects/grenade/tris");

        let e = &mut self.edicts[p];
        e.mins = [-3.0; 3];
        e.maxs = [3.0; 3];
        e.s.angles = angles;
        e.velocity = vector_scale(dir, speed);
        e.velocity = vector_ma(&e.velocity, lift, &up);
        e.velocity = vector_ma(&e.velocity, drift, &right);
        e.avelocity = avelocity;
        e.dmg = damage;
        e.knockback = knockback;
        e.damage_radius = damage_radius;
        e.move_type = MoveType::Bounce;
        e.next_think = time + timer;
        e.think = Some(ThinkFn::GrenadeExplode);
        e.touch = Some(TouchFn::Grenade);
        e.touch_time = time;
        e.take_damage = true;
        e.s.trail = TRAIL_GRENADE;
        e.s.model1 = model;

        self.player_projectile(p, 0.33);
        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);
    }

    pub fn grenade_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        if other == self.owner_of(ent) {
            return;
        }

        if surf.map(|s| s.flags & SURF_SKY != 0).unwrap_or(false) {
            self.free_entity(ent);
            return;
        }

        if self.is_structural(Some(other), surf) {
            if let Some(plane) = plane {
                self.edicts[ent].plane = *plane;
            }
            self.edicts[ent].surf = surf.cloned();
        }

        if !self.edicts[other].take_damage {
            let time = self.level.time;
            if time - self.edicts[ent].touch_time.min(time) > GRENADE_BOUNCE_DEBOUNCE {
                let e = &mut self.edicts[ent];
                e.velocity = vector_scale(&e.velocity, 1.25);
                e.touch_time = time;
                let sound = self.gi.sound_index("objects/grenade/hit");
                self.gi.sound(ent, sound, Attenuation::Norm);
            }
            return;
        }

        let other_ref = self.entity_ref(other);
        self.edicts[ent].enemy = Some(other_ref);
        self.grenade_projectile_explode(ent);
    }

    pub fn grenade_projectile_explode(&mut self, ent: usize) {
        let owner = self.owner_of(ent);
        let enemy = self.resolve(self.edicts[ent].enemy);
        let e = &self.edicts[ent];
        let (origin, dmg, kb, radius) = (e.s.origin, e.dmg, e.knockback, e.damage_radius);

        if let Some(enemy) = enemy {
            // direct hit, falling off with distance from the enemy's center
            let t = &self.edicts[enemy];
            let center = vector_ma(&t.s.origin, 0.5, &vector_add(&t.mins, &t.maxs));
            let dist = vector_distance(&origin, &center);
            let d = dmg as f32 - 0.5 * dist;
            let k = kb as f32 - 0.5 * dist;
            let dir = vector_subtract(&t.s.origin, &origin);

            self.damage(
                enemy,
                ent,
                owner,
                &dir,
                &origin,
                &VEC3_ORIGIN,
                d as i32,
                k as i32,
                DAMAGE_RADIUS,
                MOD_GRENADE,
            );
        }

        self.radius_damage(ent, owner, enemy, dmg, kb, radius, MOD_GRENADE_SPLASH);

        let ground = self.resolve(self.edicts[ent].ground_entity);
        let stationary = self.is_stationary(ground);
        let plane = self.edicts[ent].plane;
        let pos = if stationary {
            vector_ma(&origin, 16.0, &plane.normal)
        } else {
            origin
        };

        self.temp_event(&TempEvent::Explosion { pos }, &pos, Multicast::Phs);

        if stationary {
            self.burn_mark(&origin, &plane, 20);
        }

        self.free_entity(ent);
    }

    // ============================================================
    // Rockets
    // ============================================================

    pub fn rocket_projectile(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        speed: f32,
        damage: i32,
        knockback: i32,
        damage_radius: f32,
    ) {
        let Some(p) = self.spawn_projectile("rocket", ent, start) else {
            return;
        };
        let time = self.level.time;
        let model = self.gi.model_index("models/objects/rocket/tris");
        let sound = self.gi.sound_index("objects/rocket/fly");

        let e = &mut self.edicts[p];
        e.mins = [-3.0; 3];
        e.maxs = [3.0; 3];
        e.s.angles = vectoangles_exact(dir);
        e.velocity = vector_scale(dir, speed);
        e.avelocity = [0.0, 0.0, 600.0];
        e.dmg = damage;
        e.knockback = knockback;
        e.damage_radius = damage_radius;
        e.move_type = MoveType::Fly;
        e.next_think = time + PROJECTILE_LIFETIME;
        e.think = Some(ThinkFn::FreeEntity);
        e.touch = Some(TouchFn::Rocket);
        e.s.model1 = model;
        e.s.sound = sound;
        e.s.trail = TRAIL_ROCKET;

        self.player_projectile(p, 0.125);
        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);
    }

    pub fn rocket_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let owner = self.owner_of(ent);
        if other == owner {
            return;
        }

        if surf.map(|s| s.flags & SURF_SKY != 0).unwrap_or(false) {
            self.free_entity(ent);
            return;
        }

        let normal = plane.map(|p| p.normal).unwrap_or(VEC3_ORIGIN);
        let e = &self.edicts[ent];
        let (origin, velocity, dmg, kb, radius) = (e.s.origin, e.velocity, e.dmg, e.knockback, e.damage_radius);

        let pos = if plane.is_some() && surf.is_some() {
            vector_ma(&origin, 16.0, &normal)
        } else {
            origin
        };
        self.temp_event(&TempEvent::Explosion { pos }, &pos, Multicast::Phs);

        if self.edicts[other].take_damage {
            self.damage(other, ent, owner, &velocity, &origin, &normal, dmg, kb, 0, MOD_ROCKET);
        }

        self.radius_damage(ent, owner, Some(other), dmg, kb, radius, MOD_ROCKET_SPLASH);

        if let Some(plane) = plane.filter(|_| self.is_structural(Some(other), surf)) {
            let pos = vector_ma(&origin, 2.0, &plane.normal);
            self.burn_mark(&pos, plane, 20);
        }

        self.free_entity(ent);
    }

    // ============================================================
    // Hyperblaster
    // ============================================================

    pub fn hyperblaster_projectile(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        speed: f32,
        damage: i32,
        knockback: i32,
    ) {
        let Some(p) = self.spawn_projectile("hyperblaster", ent, start) else {
            return;
        };
        let time = self.level.time;

        let e = &mut self.edicts[p];
        e.s.angles = vectoangles_exact(dir);
        e.velocity = vector_scale(dir, speed);
        e.dmg = damage;
        e.knockback = knockback;
        e.move_type = MoveType::Fly;
        e.next_think = time + HYPERBLASTER_LIFETIME;
        e.think = Some(ThinkFn::FreeEntity);
        e.touch = Some(TouchFn::Hyperblaster);
        e.s.trail = TRAIL_HYPERBLASTER;

        self.player_projectile(p, 0.25);
        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);
    }

    /// Structural hits right in front of the shooter hurt them a little and
    /// push them upwards, which lets players climb walls.
    pub fn hyperblaster_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let owner = self.owner_of(ent);
        if other == owner {
            return;
        }

        if surf.map(|s| s.flags & SURF_SKY != 0).unwrap_or(false) {
            self.free_entity(ent);
            return;
        }

        let normal = plane.map(|p| p.normal).unwrap_or(VEC3_ORIGIN);
        let e = &self.edicts[ent];
        let (origin, velocity, dmg, kb) = (e.s.origin, e.velocity, e.dmg, e.knockback);

        let pos = if plane.is_some() && surf.is_some() {
            vector_ma(&origin, 16.0, &normal)
        } else {
            origin
        };
        self.temp_event(&TempEvent::Hyperblaster { pos }, &pos, Multicast::Phs);

        if self.edicts[other].take_damage {
            self.damage(other, ent, owner, &velocity, &origin, &normal, dmg, kb, DAMAGE_ENERGY, MOD_HYPERBLASTER);
        } else if self.is_structural(Some(other), surf) {
            if let Some(plane) = plane {
                let pos = vector_ma(&origin, 2.0, &plane.normal);
                self.burn_mark(&pos, plane, 10);
            }

            let owner_origin = self.edicts[owner].s.origin;
            if owner != ent && vector_distance(&origin, &owner_origin) < HYPERBLASTER_CLIMB_DISTANCE {
                let climb_damage = (dmg as f32 * 0.06) as i32;
                self.damage(
                    owner,
                    ent,
                    owner,
                    &VEC3_ORIGIN,
                    &origin,
                    &normal,
                    climb_damage,
                    0,
                    DAMAGE_ENERGY,
                    MOD_HYPERBLASTER,
                );
                self.edicts[owner].velocity[2] += 80.0;
            }
        }

        self.free_entity(ent);
    }

    // ============================================================
    // Lightning
    // ============================================================

    /// Each client owns at most one beam. Firing renews its damage for the
    /// next think; a beam left alone expires.
    pub fn lightning_projectile(&mut self, ent: usize, start: &Vec3, dir: &Vec3, damage: i32, knockback: i32) {
        let beam = match self.resolve(self.edicts[ent].lightning) {
            Some(b) => b,
            None => {
                let Ok(b) = self.alloc_entity("lightning") else {
                    warn!("no slot for lightning from {}", self.etos(ent));
                    return;
                };
                let owner_ref = self.entity_ref(ent);
                let sound = self.gi.sound_index("weapons/lightning/fly");

                let e = &mut self.edicts[b];
                e.owner = Some(owner_ref);
                e.s.origin = *start;
                e.s.old_origin = vector_ma(start, LIGHTNING_RANGE, dir);
                e.clip_mask = MASK_SHOT;
                e.solid = Solid::Not;
                e.move_type = MoveType::None;
                e.think = Some(ThinkFn::Lightning);
                e.knockback = knockback;
                e.s.client = ent as u8;
                e.s.effects = EF_BEAM;
                e.s.sound = sound;
                e.s.trail = TRAIL_LIGHTNING;

                if self.immediate_wall(ent, b) {
                    self.edicts[b].s.origin = self.edicts[ent].s.origin;
                }
                self.link_entity(b);

                let beam_ref = self.entity_ref(b);
                self.edicts[ent].lightning = Some(beam_ref);
                b
            }
        };

        let time = self.level.time;
        let e = &mut self.edicts[beam];
        e.damage = damage;
        e.next_think = time + 1;
        e.timestamp = time;
    }

    /// Remove the client's beam, if any.
    pub fn discard_lightning(&mut self, ent: usize) {
        if let Some(beam) = self.resolve(self.edicts[ent].lightning) {
            self.free_entity(beam);
        }
        self.edicts[ent].lightning = None;
    }

    /// Firing into liquid hurts every client in the same liquid, the owner
    /// most of all.
    fn lightning_discharge(&mut self, beam: usize, owner: usize) {
        let origin = self.edicts[beam].s.origin;

        for i in 1..=self.max_clients {
            let e = &self.edicts[i];
            if !e.in_use || !e.take_damage || e.water_level == 0 {
                continue;
            }
            let target_origin = e.s.origin;
            if !self.gi.in_pvs(&origin, &target_origin) {
                continue;
            }
            let d = if i == owner { 999 } else { 50 * self.edicts[i].water_level };
            self.damage(
                i,
                beam,
                owner,
                &VEC3_ORIGIN,
                &target_origin,
                &VEC3_ORIGIN,
                d,
                100,
                DAMAGE_NO_ARMOR,
                MOD_LIGHTNING_DISCHARGE,
            );
        }

        self.temp_event(&TempEvent::Lightning { pos: origin }, &origin, Multicast::Phs);
    }

    pub fn lightning_projectile_think(&mut self, ent: usize) {
        let time = self.level.time;
        let owner = self.resolve(self.edicts[ent].owner);

        let expired = match owner {
            Some(o) => self.edicts[ent].timestamp + LIGHTNING_TIMEOUT < time || self.edicts[o].dead,
            None => true,
        };
        let Some(owner) = owner.filter(|_| !expired) else {
            if let Some(o) = owner {
                self.edicts[o].lightning = None;
            }
            self.free_entity(ent);
            return;
        };

        // follow the owner's aim
        let (forward, right, up, mut start) = self.init_projectile(owner);
        self.edicts[ent].s.origin = start;
        if self.immediate_wall(owner, ent) {
            start = self.edicts[owner].s.origin;
        }

        if self.gi.point_contents(&start) & MASK_WATER != 0 {
            self.edicts[ent].s.origin = start;
            self.lightning_discharge(ent, owner);
            // a fatal discharge already dropped the beam with its owner
            self.edicts[owner].lightning = None;
            if self.edicts[ent].in_use {
                self.free_entity(ent);
            }
            return;
        }

        let wobble = 10.0 * (time as f32 / 4.0).sin();
        let jitter = 10.0 * self.crand();
        let mut end = vector_ma(&start, LIGHTNING_RANGE, &forward);
        end = vector_ma(&end, wobble, &up);
        end = vector_ma(&end, jitter, &right);

        let mut tr = self.gi.trace(&start, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, Some(ent), MASK_SHOT | MASK_WATER);

        if tr.contents & MASK_WATER != 0 {
            let water_start = tr.end;
            if self.edicts[ent].water_level == 0 {
                let sound = self.gi.sound_index("world/water_in");
                self.gi.positioned_sound(&water_start, Some(0), sound, Attenuation::Norm);
                self.edicts[ent].water_level = 1;
            }
            tr = self.gi.trace(&water_start, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, Some(ent), MASK_SHOT);
            self.bubble_trail(&water_start, &tr);
        } else if self.edicts[ent].water_level != 0 {
            let sound = self.gi.sound_index("world/water_out");
            self.gi.positioned_sound(&start, Some(0), sound, Attenuation::Norm);
            self.edicts[ent].water_level = 0;
        }

        let (damage, knockback) = (self.edicts[ent].damage, self.edicts[ent].knockback);
        if damage != 0 {
            if self.takes_damage(tr.ent) {
                if let Some(hit) = tr.ent {
                    self.damage(
                        hit,
                        ent,
                        owner,
                        &forward,
                        &tr.end,
                        &tr.plane.normal,
                        damage,
                        knockback,
                        DAMAGE_ENERGY,
                        MOD_LIGHTNING,
                    );
                }
            } else if tr.contents & CONTENTS_SOLID != 0 && self.is_structural(tr.ent, tr.surface.as_ref()) {
                self.burn_mark(&tr.end, &tr.plane, 8);
            }
            // spent until the owner fires again
            self.edicts[ent].damage = 0;
        }

        if !self.edicts[ent].in_use {
            return;
        }
        let frame = self.frame_millis();
        let e = &mut self.edicts[ent];
        e.s.origin = start;
        e.s.old_origin = tr.end;
        e.next_think = time + frame;
        self.link_entity(ent);
    }

    // ============================================================
    // Railgun
    // ============================================================

    /// Passes through players and boxes, stopping at the first piece of
    /// world.
    pub fn railgun_projectile(&mut self, ent: usize, start: &Vec3, dir: &Vec3, damage: i32, knockback: i32) {
        let origin = self.edicts[ent].s.origin;
        let mut pos = *start;
        if self.gi.trace(&origin, &VEC3_ORIGIN, &VEC3_ORIGIN, &pos, Some(ent), MASK_SHOT).fraction < 1.0 {
            pos = origin;
        }

        let mut mask = MASK_SHOT | MASK_WATER;
        let mut water = false;
        if self.gi.point_contents(&pos) & MASK_WATER != 0 {
            mask &= !MASK_WATER;
            water = true;
        }

        let end = vector_ma(&pos, MAX_WORLD_DIST, dir);
        let mut tr = Trace {
            end,
            ..Default::default()
        };

        let mut ignore = Some(ent);
        while let Some(skip) = ignore {
            tr = self.gi.trace(&pos, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, Some(skip), mask);
            let Some(hit) = tr.ent else {
                break;
            };

            if tr.contents & MASK_WATER != 0 && !water {
                mask &= !MASK_WATER;
                water = true;
                let sound = self.gi.sound_index("world/water_in");
                self.gi.positioned_sound(&tr.end, Some(0), sound, Attenuation::Norm);
                ignore = Some(ent);
                continue;
            }

            let h = &self.edicts[hit];
            ignore = if h.is_client() || h.solid == Solid::Box {
                Some(hit)
            } else {
                None
            };

            if hit != ent && self.edicts[hit].take_damage {
                self.damage(hit, ent, ent, dir, &tr.end, &tr.plane.normal, damage, knockback, 0, MOD_RAILGUN);
            }

            pos = tr.end;
        }

        let color = match self.client(ent) {
            Some(c) if self.level.teams || self.level.ctf => match c.persistent.team {
                Some(TeamId::Good) => EFFECT_COLOR_BLUE,
                _ => EFFECT_COLOR_RED,
            },
            Some(c) => c.persistent.color as u8,
            None => 0,
        };

        let event = TempEvent::Rail {
            start: *start,
            end: tr.end,
            flags: tr.surface_flags(),
            color,
        };
        self.temp_event(&event, start, Multicast::Phs);
        if !self.gi.in_phs(start, &tr.end) {
            self.temp_event(&event, &tr.end, Multicast::Phs);
        }

        if self.is_structural(tr.ent, tr.surface.as_ref()) {
            let pos = vector_ma(&tr.end, -1.0, dir);
            let plane = tr.plane;
            self.burn_mark(&pos, &plane, 12);
        }
    }

    // ============================================================
    // BFG
    // ============================================================

    pub fn bfg_projectile(
        &mut self,
        ent: usize,
        start: &Vec3,
        dir: &Vec3,
        speed: f32,
        damage: i32,
        knockback: i32,
        damage_radius: f32,
    ) {
        let Some(p) = self.spawn_projectile("bfg", ent, start) else {
            return;
        };
        let next_think = self.level.time + self.frame_millis();

        let e = &mut self.edicts[p];
        e.velocity = vector_scale(dir, speed);
        e.dmg = damage;
        e.knockback = knockback;
        e.damage_radius = damage_radius;
        e.move_type = MoveType::Fly;
        e.next_think = next_think;
        e.think = Some(ThinkFn::Bfg);
        e.touch = Some(TouchFn::Bfg);
        e.s.trail = TRAIL_BFG;

        self.player_projectile(p, 0.33);
        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);
    }

    /// Lasers everything damageable in range each frame, scaled down with
    /// distance.
    pub fn bfg_projectile_think(&mut self, ent: usize) {
        let owner = self.owner_of(ent);
        let seconds = self.frame_seconds();
        let e = &self.edicts[ent];
        let (origin, radius) = (e.s.origin, e.damage_radius);
        let frame_damage = (e.dmg as f32 * seconds) as i32;
        let frame_knockback = (e.knockback as f32 * seconds) as i32;

        for target in self.find_radius(&origin, radius) {
            if target == ent || target == owner || !self.edicts[target].take_damage {
                continue;
            }
            if !self.can_damage(target, ent) {
                continue;
            }

            let target_origin = self.edicts[target].s.origin;
            let mut dir = vector_subtract(&target_origin, &origin);
            let dist = vector_normalize(&mut dir);
            let normal = vector_negate(&dir);
            let f = 1.0 - dist / radius;

            self.damage(
                target,
                ent,
                owner,
                &dir,
                &target_origin,
                &normal,
                (frame_damage as f32 * f) as i32,
                (frame_knockback as f32 * f) as i32,
                DAMAGE_RADIUS,
                MOD_BFG_LASER,
            );

            let event = TempEvent::BfgLaser {
                start: origin,
                end: target_origin,
            };
            self.temp_event(&event, &origin, Multicast::Pvs);
        }

        let frame = self.frame_millis();
        self.edicts[ent].next_think = self.level.time + frame;
    }

    pub fn bfg_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let owner = self.owner_of(ent);
        if other == owner {
            return;
        }

        if surf.map(|s| s.flags & SURF_SKY != 0).unwrap_or(false) {
            self.free_entity(ent);
            return;
        }

        let normal = plane.map(|p| p.normal).unwrap_or(VEC3_ORIGIN);
        let e = &self.edicts[ent];
        let (origin, velocity, dmg, kb, radius) = (e.s.origin, e.velocity, e.dmg, e.knockback, e.damage_radius);

        let pos = if plane.is_some() && surf.is_some() {
            vector_ma(&origin, 16.0, &normal)
        } else {
            origin
        };
        self.temp_event(&TempEvent::Bfg { pos }, &pos, Multicast::Phs);

        if self.edicts[other].take_damage {
            self.damage(other, ent, owner, &velocity, &origin, &normal, dmg, kb, DAMAGE_ENERGY, MOD_BFG_BLAST);
        }

        self.radius_damage(ent, owner, Some(other), dmg, kb, radius, MOD_BFG_BLAST);

        if let Some(plane) = plane.filter(|_| self.is_structural(Some(other), surf)) {
            let pos = vector_ma(&origin, 2.0, &plane.normal);
            self.burn_mark(&pos, plane, 30);
        }

        self.free_entity(ent);
    }

    // ============================================================
    // Grappling hook
    // ============================================================

    /// Throw the hook. It flies for a limited time and latches onto level
    /// geometry; once attached, the owner is pulled towards it.
    pub fn fire_hook(&mut self, ent: usize) {
        if self.resolve(self.edicts[ent].hook).is_some() || self.edicts[ent].dead {
            return;
        }

        let (forward, _, _, org) = self.init_projectile(ent);
        let Some(p) = self.spawn_projectile("hook", ent, &org) else {
            return;
        };
        let time = self.level.time;
        let frame = self.frame_millis();

        let e = &mut self.edicts[p];
        e.mins = [-1.0; 3];
        e.maxs = [1.0; 3];
        e.s.angles = vectoangles_exact(&forward);
        e.velocity = vector_scale(&forward, HOOK_SPEED);
        e.move_type = MoveType::Fly;
        e.timestamp = time;
        e.next_think = time + frame;
        e.think = Some(ThinkFn::Hook);
        e.touch = Some(TouchFn::Hook);
        e.s.client = ent as u8;
        e.s.effects = EF_BEAM;
        e.s.trail = TRAIL_HOOK;

        if self.immediate_wall(ent, p) {
            self.edicts[p].s.origin = self.edicts[ent].s.origin;
        }
        self.link_entity(p);

        let hook_ref = self.entity_ref(p);
        self.edicts[ent].hook = Some(hook_ref);
        if let Some(client) = self.client_mut(ent) {
            client.locals.hook_pull = false;
        }

        let sound = self.gi.sound_index("weapons/hook/fire");
        self.gi.sound(ent, sound, Attenuation::Norm);
    }

    pub fn hook_projectile_touch(
        &mut self,
        ent: usize,
        other: usize,
        _plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let owner = self.owner_of(ent);
        if other == owner {
            return;
        }

        let sky = surf.map(|s| s.flags & SURF_SKY != 0).unwrap_or(false);
        if sky || !self.is_structural(Some(other), surf) {
            self.release_hook(owner, ent);
            return;
        }

        let e = &mut self.edicts[ent];
        e.velocity = VEC3_ORIGIN;
        e.avelocity = VEC3_ORIGIN;
        e.move_type = MoveType::None;
        e.solid = Solid::Not;
        self.link_entity(ent);

        if let Some(client) = self.client_mut(owner) {
            client.locals.hook_pull = true;
        }
        let sound = self.gi.sound_index("weapons/hook/hit");
        self.gi.sound(ent, sound, Attenuation::Norm);
    }

    pub fn hook_projectile_think(&mut self, ent: usize) {
        let time = self.level.time;
        let Some(owner) = self.resolve(self.edicts[ent].owner) else {
            self.free_entity(ent);
            return;
        };

        if self.edicts[owner].dead || self.client(owner).is_none() {
            self.release_hook(owner, ent);
            return;
        }

        let attached = self.clients[owner - 1].locals.hook_pull;
        if !attached && time.saturating_sub(self.edicts[ent].timestamp) > HOOK_FLIGHT_TIME {
            self.release_hook(owner, ent);
            return;
        }

        if attached {
            let hook_origin = self.edicts[ent].s.origin;
            let mut dir = vector_subtract(&hook_origin, &self.edicts[owner].s.origin);
            if vector_normalize(&mut dir) > 1.0 {
                self.edicts[owner].velocity = vector_scale(&dir, HOOK_PULL_SPEED);
            }
            let pm = &mut self.clients[owner - 1].ps.pmove;
            pm.pm_flags |= PMF_HOOK;
            pm.hook_position = hook_origin;
        }

        let frame = self.frame_millis();
        self.edicts[ent].next_think = time + frame;
    }

    fn release_hook(&mut self, owner: usize, hook: usize) {
        if self.resolve(self.edicts[owner].hook) == Some(hook) {
            self.detach_hook(owner);
        } else {
            self.free_entity(hook);
        }
    }

    /// Let go of the hook, if one is out.
    pub fn detach_hook(&mut self, ent: usize) {
        if let Some(hook) = self.resolve(self.edicts[ent].hook) {
            self.free_entity(hook);
        }
        self.edicts[ent].hook = None;

        if let Some(client) = self.client_mut(ent) {
            client.locals.hook_pull = false;
            client.ps.pmove.pm_flags &= !PMF_HOOK;
        }
    }

    // ============================================================
    // Ripples
    // ============================================================

    /// Ripple where the entity crossed a liquid surface moving from `from`
    /// to `to`. At most one per entity every 400 ms.
    pub fn ripple(&mut self, ent: usize, from: &Vec3, to: &Vec3) {
        let time = self.level.time;
        if self.edicts[ent].ripple_time > time {
            return;
        }

        let tr = self.gi.trace(from, &VEC3_ORIGIN, &VEC3_ORIGIN, to, Some(ent), MASK_WATER);
        let pos = if tr.fraction < 1.0 && !tr.start_solid {
            tr.end
        } else {
            self.gi.trace(to, &VEC3_ORIGIN, &VEC3_ORIGIN, from, Some(ent), MASK_WATER).end
        };

        let e = &mut self.edicts[ent];
        e.ripple_time = time + RIPPLE_DELAY;
        let size = ((e.size[0] + e.size[1]) * 0.5).clamp(8.0, 255.0) as u8;
        let viewable = e.sv_flags & crate::game::SVF_NO_CLIENT == 0;

        self.temp_event(&TempEvent::Ripple { pos, size, viewable }, &pos, Multicast::Pvs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_events::{TE_BFG_LASER, TE_BLASTER, TE_EXPLOSION, TE_LIGHTNING, TE_RIPPLE};
    use crate::test_support::*;

    const EPS: f32 = 1e-3;

    fn fly(ctx: &mut GameCtx, ent: usize, frames: usize) {
        for _ in 0..frames {
            if !ctx.edicts[ent].in_use {
                break;
            }
            ctx.run_entity(ent);
        }
    }

    // ============================================================
    // Blaster
    // ============================================================

    #[test]
    fn test_blaster_hits_wall_and_marks() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_brush([300.0, -64.0, -64.0], [364.0, 64.0, 64.0], CONTENTS_SOLID);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        ctx.clients[0].persistent.color = 200;

        ctx.blaster_projectile(1, &[28.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 1000, 15, 2);
        let bolt = ctx.find_by_class_name(None, "blaster").unwrap();
        assert_eq!(ctx.edicts[bolt].s.client, 200);

        fly(&mut ctx, bolt, 5);

        assert!(!ctx.edicts[bolt].in_use);
        assert!(world.borrow().temp_event_types().contains(&TE_BLASTER));
    }

    #[test]
    fn test_blaster_ignores_owner_and_damages_target() {
        let (mut ctx, _) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [100.0, 0.0, 0.0]);

        ctx.blaster_projectile(1, &[28.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 1000, 15, 2);
        let bolt = ctx.find_by_class_name(None, "blaster").unwrap();

        ctx.blaster_projectile_touch(bolt, 1, None, None);
        assert!(ctx.edicts[bolt].in_use);

        ctx.blaster_projectile_touch(bolt, 2, None, None);
        assert!(!ctx.edicts[bolt].in_use);
        assert_eq!(ctx.edicts[2].health, 85);
    }

    // ============================================================
    // Explosives
    // ============================================================

    #[test]
    fn test_rocket_direct_hit() {
        let (mut ctx, world) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [200.0, 0.0, 0.0]);
        ctx.edicts[2].health = 500;

        ctx.rocket_projectile(1, &[28.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 900.0, 100, 100, 150.0);
        let rocket = ctx.find_by_class_name(None, "rocket").unwrap();

        fly(&mut ctx, rocket, 5);

        assert!(!ctx.edicts[rocket].in_use);
        assert_eq!(ctx.edicts[2].health, 400);
        assert_eq!(ctx.edicts[1].health, 100);
        assert!(world.borrow().temp_event_types().contains(&TE_EXPLOSION));
    }

    #[test]
    fn test_rocket_sky_vanishes() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        ctx.rocket_projectile(1, &[28.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 900.0, 100, 100, 150.0);
        let rocket = ctx.find_by_class_name(None, "rocket").unwrap();

        let sky = CSurface {
            name: "sky".into(),
            flags: SURF_SKY,
            value: 0,
        };
        ctx.rocket_projectile_touch(rocket, 0, Some(&CPlane::default()), Some(&sky));

        assert!(!ctx.edicts[rocket].in_use);
        assert!(world.borrow().temp_event_types().is_empty());
    }

    #[test]
    fn test_grenade_bounces_then_explodes_on_timer() {
        let (mut ctx, world) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        ctx.grenade_projectile(1, &[28.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 700.0, 120, 120, 185.0, 2000);
        let grenade = ctx.find_by_class_name(None, "grenade").unwrap();
        assert!(ctx.edicts[grenade].velocity[2] > 150.0);

        ctx.level.time += 500;
        let before = ctx.edicts[grenade].velocity[0];
        ctx.grenade_projectile_touch(grenade, 0, Some(&CPlane::default()), None);
        assert!(ctx.edicts[grenade].in_use);
        assert!((ctx.edicts[grenade].velocity[0] - before * 1.25).abs() < EPS);

        // debounced
        ctx.grenade_projectile_touch(grenade, 0, Some(&CPlane::default()), None);
        assert!((ctx.edicts[grenade].velocity[0] - before * 1.25).abs() < EPS);

        ctx.level.time = ctx.edicts[grenade].next_think;
        ctx.run_think(grenade);
        assert!(!ctx.edicts[grenade].in_use);
        assert!(world.borrow().temp_event_types().contains(&TE_EXPLOSION));
    }

    #[test]
    fn test_grenade_direct_hit_falls_off() {
        let (mut ctx, _) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [300.0, 0.0, 0.0]);
        ctx.edicts[2].health = 500;

        ctx.grenade_projectile(1, &[280.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 700.0, 120, 0, 185.0, 2000);
        let grenade = ctx.find_by_class_name(None, "grenade").unwrap();
        ctx.edicts[grenade].s.origin = [280.0, 0.0, 4.0];

        ctx.grenade_projectile_touch(grenade, 2, None, None);

        // 20 units from the center of the box
        assert!(!ctx.edicts[grenade].in_use);
        assert_eq!(ctx.edicts[2].health, 390);
    }

    // ============================================================
    // Hyperblaster
    // ============================================================

    #[test]
    fn test_hyperblaster_climb() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);

        ctx.hyperblaster_projectile(1, &[20.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 1400.0, 16, 6);
        let bolt = ctx.find_by_class_name(None, "hyperblaster").unwrap();
        ctx.edicts[bolt].s.origin = [20.0, 0.0, -10.0];

        let plane = CPlane {
            normal: [0.0, 0.0, 1.0],
            dist: 0.0,
        };
        ctx.hyperblaster_projectile_touch(bolt, 0, Some(&plane), Some(&CSurface::default()));

        assert!((ctx.edicts[1].velocity[2] - 80.0).abs() < EPS);
        assert!(!ctx.edicts[bolt].in_use);
    }

    // ============================================================
    // Lightning
    // ============================================================

    #[test]
    fn test_lightning_damages_once_per_fire_and_expires() {
        let (mut ctx, _) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [200.0, 0.0, 0.0]);
        ctx.edicts[2].health = 500;

        let (forward, _, _, org) = ctx.init_projectile(1);
        ctx.lightning_projectile(1, &org, &forward, 12, 12);
        let beam = ctx.resolve(ctx.edicts[1].lightning).unwrap();
        assert_eq!(ctx.edicts[beam].s.effects, EF_BEAM);

        ctx.lightning_projectile_think(beam);
        assert_eq!(ctx.edicts[2].health, 488);

        ctx.lightning_projectile_think(beam);
        assert_eq!(ctx.edicts[2].health, 488);

        // refiring reuses the same beam
        ctx.lightning_projectile(1, &org, &forward, 12, 12);
        assert_eq!(ctx.resolve(ctx.edicts[1].lightning), Some(beam));

        ctx.level.time += 200;
        ctx.lightning_projectile_think(beam);
        assert!(!ctx.edicts[beam].in_use);
        assert!(ctx.edicts[1].lightning.is_none());
    }

    #[test]
    fn test_lightning_discharge_in_water() {
        let (mut ctx, world) = make_ctx(3, 64);
        world
            .borrow_mut()
            .add_brush([-512.0, -512.0, -512.0], [512.0, 512.0, 512.0], CONTENTS_WATER);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        spawn_test_client(&mut ctx, 2, [200.0, 0.0, 0.0]);
        ctx.edicts[1].water_level = 3;
        ctx.edicts[2].water_level = 2;
        ctx.edicts[2].health = 500;

        let (forward, _, _, org) = ctx.init_projectile(1);
        ctx.lightning_projectile(1, &org, &forward, 12, 12);
        let beam = ctx.resolve(ctx.edicts[1].lightning).unwrap();
        ctx.lightning_projectile_think(beam);

        assert!(!ctx.edicts[beam].in_use);
        assert!(ctx.edicts[1].health <= 0);
        assert_eq!(ctx.edicts[2].health, 400);
        assert!(world.borrow().temp_event_types().contains(&TE_LIGHTNING));
    }

    // ============================================================
    // BFG
    // ============================================================

    #[test]
    fn test_bfg_laser_scales_with_distance() {
        let (mut ctx, world) = make_ctx(3, 64);
        spawn_test_client(&mut ctx, 1, [-1000.0, 0.0, 0.0]);
        spawn_test_client(&mut ctx, 2, [100.0, 0.0, 0.0]);
        ctx.edicts[2].health = 500;

        ctx.bfg_projectile(1, &[0.0; 3], &[1.0, 0.0, 0.0], 600.0, 100, 100, 256.0);
        let bfg = ctx.find_by_class_name(None, "bfg").unwrap();
        ctx.edicts[bfg].s.origin = [0.0; 3];

        ctx.bfg_projectile_think(bfg);

        // 10 per frame at 10 Hz, times 1 - 100/256
        assert_eq!(ctx.edicts[2].health, 494);
        assert_eq!(ctx.edicts[1].health, 100);
        assert!(world.borrow().temp_event_types().contains(&TE_BFG_LASER));
        assert_eq!(ctx.edicts[bfg].next_think, ctx.level.time + 100);
    }

    // ============================================================
    // Hook
    // ============================================================

    #[test]
    fn test_hook_attaches_and_pulls() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_brush([300.0, -64.0, -64.0], [364.0, 64.0, 64.0], CONTENTS_SOLID);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);

        ctx.fire_hook(1);
        let hook = ctx.resolve(ctx.edicts[1].hook).unwrap();
        fly(&mut ctx, hook, 5);
        assert!(ctx.edicts[hook].in_use);
        assert!(ctx.clients[0].locals.hook_pull);

        ctx.hook_projectile_think(hook);
        assert!((vector_length(&ctx.edicts[1].velocity) - HOOK_PULL_SPEED).abs() < 0.1);
        assert!(ctx.edicts[1].velocity[0] > 0.0);
        assert!(ctx.clients[0].ps.pmove.pm_flags & PMF_HOOK != 0);

        ctx.detach_hook(1);
        assert!(!ctx.edicts[hook].in_use);
        assert!(ctx.edicts[1].hook.is_none());
        assert_eq!(ctx.clients[0].ps.pmove.pm_flags & PMF_HOOK, 0);
    }

    #[test]
    fn test_hook_gives_up_after_flight_time() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);

        ctx.fire_hook(1);
        let hook = ctx.resolve(ctx.edicts[1].hook).unwrap();

        ctx.level.time += HOOK_FLIGHT_TIME + 100;
        ctx.hook_projectile_think(hook);

        assert!(!ctx.edicts[hook].in_use);
        assert!(ctx.edicts[1].hook.is_none());
    }

    #[test]
    fn test_hook_released_when_owner_dies() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);

        ctx.fire_hook(1);
        let hook = ctx.resolve(ctx.edicts[1].hook).unwrap();
        ctx.edicts[1].dead = true;
        ctx.hook_projectile_think(hook);

        assert!(!ctx.edicts[hook].in_use);
    }

    // ============================================================
    // Ripples
    // ============================================================

    #[test]
    fn test_ripple_rate_limited() {
        let (mut ctx, world) = make_ctx(2, 64);
        world
            .borrow_mut()
            .add_brush([-512.0, -512.0, -512.0], [512.0, 512.0, 0.0], CONTENTS_WATER);
        let ent = ctx.alloc_entity("crate").unwrap();

        ctx.ripple(ent, &[0.0, 0.0, 32.0], &[0.0, 0.0, -32.0]);
        ctx.ripple(ent, &[0.0, 0.0, 32.0], &[0.0, 0.0, -32.0]);
        let count = |w: &MockWorld| w.temp_event_types().iter().filter(|&&t| t == TE_RIPPLE).count();
        assert_eq!(count(&world.borrow()), 1);

        ctx.level.time += 400;
        ctx.ripple(ent, &[0.0, 0.0, 32.0], &[0.0, 0.0, -32.0]);
        assert_eq!(count(&world.borrow()), 2);

        let w = world.borrow();
        let (pos, _, _) = w.multicasts.last().unwrap();
        assert!(pos[2].abs() < 0.1);
    }
}
