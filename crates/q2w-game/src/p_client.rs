// p_client.rs — player connection, spawning, death and movement

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

use log::{debug, info, warn};

use q2w_common::cvar::info_validate;

use crate::dispatch::{DieFn, PainFn, ThinkFn};
use crate::error::{GameError, GameResult};
use crate::g_events::MuzzleFlash;
use crate::g_local::*;
use crate::game::SVF_NO_CLIENT;
use crate::game_import::{Attenuation, Multicast, PrintLevel};

/// `model1` value telling clients to draw the player's own model and skin.
pub const MODEL_CLIENT: u16 = 0xff;

pub const PM_MINS: Vec3 = [-16.0, -16.0, -24.0];
pub const PM_MAXS: Vec3 = [16.0, 16.0, 32.0];

const DEFAULT_USER_INFO: &str = "\\name\\newbie\\skin\\qforcer/enforcer";
const DEFAULT_SKIN: &str = "qforcer/enforcer";
const DEFAULT_COLOR: i32 = 243;

const RESPAWN_DELAY: u32 = 1000;
/// Dead players respawn on their own this long after they may respawn.
const AUTO_RESPAWN_DELAY: u32 = 2000;
const RESPAWN_PROTECTION: u32 = 2000;
const CORPSE_TIME: u32 = 5000;
const JUMP_DEBOUNCE: u32 = 200;

/// Name trimmed to 15 printable characters. Color escapes do not count
/// towards the limit, and a colored name is reset to white at its end.
pub fn sanitize_name(raw: &str) -> String {
    let mut name = String::new();
    let mut printable = 0;
    let mut color = false;

    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if printable == 15 {
            break;
        }
        if c == '^' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            color = true;
            name.push(c);
            if let Some(n) = chars.next() {
                name.push(n);
            }
            continue;
        }
        if c.is_ascii_graphic() || c == ' ' {
            name.push(c);
            printable += 1;
        }
    }

    if printable == 0 {
        return "newbie".to_string();
    }

    if color {
        name.push_str("^7");
    }
    name
}

/// Palette index for a color name or number.
fn color_by_name(s: &str, default: i32) -> i32 {
    if let Ok(i) = s.trim().parse::<i32>() {
        return if (0..=255).contains(&i) { i } else { default };
    }
    match s.trim().to_ascii_lowercase().as_str() {
        "red" => 242,
        "green" => 209,
        "blue" => 243,
        "yellow" => 219,
        "orange" => 225,
        "white" => 216,
        "pink" => 247,
        "purple" => 187,
        _ => default,
    }
}

impl GameCtx {
    // ============================================================
    // Inventory
    // ============================================================

    /// Give a named item. Weapons take `quantity` as their ammo; a negative
    /// quantity means the default pickup amount.
    pub fn give(&mut self, ent: usize, name: &str, quantity: i32) -> bool {
        let time = self.level.time;
        let Some(client) = self.client_mut(ent) else {
            return false;
        };
        let p = &mut client.persistent;

        if name.eq_ignore_ascii_case("health") {
            p.health = quantity.max(0) as i16;
            return true;
        }

        if name.eq_ignore_ascii_case("armor") {
            p.armor = quantity.clamp(0, p.max_armor.max(1) as i32) as i16;
            if p.armor > 0 && p.armor_type == ArmorType::None {
                p.armor_type = ArmorType::Body;
            }
            return true;
        }

        if name.eq_ignore_ascii_case("quad damage") || name.eq_ignore_ascii_case("quad") {
            client.locals.quad_damage_time = time + 20_000;
            return true;
        }

        if let Some(ammo) = AmmoType::from_name(name) {
            let i = ammo.index();
            let q = if quantity > -1 { quantity } else { ammo.pickup_quantity() as i32 };
            p.ammo[i] = q.min(p.max_ammo[i] as i32) as i16;
            return true;
        }

        if let Some(weapon) = Weapon::from_name(name) {
            self.give_weapon(ent, weapon, quantity);
            return true;
        }

        false
    }

    /// The map's `give` string: comma separated items with optional
    /// quantities, e.g. `Rocket Launcher 20, Armor 50`.
    fn give_level_locals(&mut self, ent: usize) -> bool {
        if self.level.give.trim().is_empty() {
            return false;
        }

        let give = self.level.give.clone();
        for item in give.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, quantity) = match item.rsplit_once(' ') {
                Some((n, q)) => match q.parse::<i32>() {
                    Ok(q) if q > -1 => (n.trim(), q),
                    _ => (item, -1),
                },
                None => (item, -1),
            };
            if !self.give(ent, name, quantity) {
                debug!("unknown item in give: {}", name);
            }
        }
        true
    }

    /// Reset inventory, health and armor for a new life.
    fn init_client_inventory(&mut self, ent: usize) {
        let warmup = self.level.warmup;
        let gameplay = self.level.gameplay;
        let Some(client) = self.client_mut(ent) else {
            return;
        };

        let p = &mut client.persistent;
        p.health = 100;
        p.max_health = 100;
        p.armor = 0;
        p.max_armor = 200;
        p.armor_type = ArmorType::None;
        p.weapons = WeaponSet::empty();
        p.ammo = [0; NUM_AMMO];
        for ammo in AmmoType::ALL {
            p.max_ammo[ammo.index()] = ammo.default_max();
        }

        let weapon = if gameplay == Gameplay::Instagib {
            // instagib gets the railgun only, in warmup too
            self.give_weapon(ent, Weapon::Railgun, 1000);
            Weapon::Railgun
        } else if gameplay == Gameplay::Arena || warmup {
            self.give_weapon(ent, Weapon::Blaster, -1);
            self.give_weapon(ent, Weapon::Railgun, 50);
            self.give_weapon(ent, Weapon::Lightning, 200);
            self.give_weapon(ent, Weapon::Hyperblaster, 200);
            self.give_weapon(ent, Weapon::RocketLauncher, 50);
            self.give_weapon(ent, Weapon::GrenadeLauncher, 50);
            self.give_weapon(ent, Weapon::Machinegun, 200);
            self.give_weapon(ent, Weapon::SuperShotgun, 80);
            self.give_weapon(ent, Weapon::Shotgun, 80);
            self.give(ent, "Armor", 200);
            Weapon::RocketLauncher
        } else {
            self.give_weapon(ent, Weapon::Blaster, -1);
            self.give_weapon(ent, Weapon::Shotgun, 10);
            Weapon::Shotgun
        };

        let weapon = if self.give_level_locals(ent) {
            self.best_weapon(ent).unwrap_or(weapon)
        } else {
            weapon
        };

        if let Some(client) = self.client_mut(ent) {
            client.persistent.weapon = Some(weapon);
            client.persistent.last_weapon = None;
        }
    }

    // ============================================================
    // Spawn points
    // ============================================================

    /// Distance from the spot to the nearest living enemy. Teammates count
    /// only when they are standing right on it.
    fn enemy_range_from_spot(&self, ent: usize, spot: usize) -> f32 {
        let team = self.team_of(ent);
        let origin = self.edicts[spot].s.origin;

        (1..=self.max_clients)
            .filter(|&i| i != ent && self.edicts[i].in_use && self.edicts[i].health > 0)
            .filter(|&i| !self.client(i).map(|c| c.persistent.spectator).unwrap_or(true))
            .filter_map(|i| {
                let dist = vector_distance(&origin, &self.edicts[i].s.origin);
                let teammate = (self.level.teams || self.level.ctf) && team.is_some() && self.team_of(i) == team;
                (!teammate || dist <= 64.0).then_some(dist)
            })
            .fold(9_999_999.0, f32::min)
    }

    fn spawn_points(&self, class_name: &str) -> Vec<usize> {
        let mut spots = Vec::new();
        let mut from = None;
        while let Some(spot) = self.find_by_class_name(from, class_name) {
            spots.push(spot);
            from = Some(spot);
        }
        spots
    }

    fn select_spawn_point_by_class(&mut self, ent: usize, class_name: &str) -> Option<usize> {
        let spots = self.spawn_points(class_name);
        if spots.is_empty() {
            return None;
        }

        if self.gi.cvars().value("g_spawn_farthest") != 0.0 {
            let mut best = None;
            let mut best_dist = 0.0;
            for &spot in &spots {
                let dist = self.enemy_range_from_spot(ent, spot);
                if dist > best_dist {
                    best = Some(spot);
                    best_dist = dist;
                }
            }
            // someone is standing on every spot, somebody gets telefragged
            return best.or(spots.first().copied());
        }

        let i = self.randomi(spots.len());
        Some(spots[i])
    }

    /// Team spawns first in team modes, then deathmatch spawns, then any
    /// player start.
    pub fn select_spawn_point(&mut self, ent: usize) -> (Vec3, Vec3) {
        let mut spot = None;

        if self.level.teams || self.level.ctf {
            spot = match self.team_of(ent) {
                Some(TeamId::Good) => self.select_spawn_point_by_class(ent, "info_player_team1"),
                Some(TeamId::Evil) => self.select_spawn_point_by_class(ent, "info_player_team2"),
                None => None,
            };
        }

        if spot.is_none() {
            spot = self.select_spawn_point_by_class(ent, "info_player_deathmatch");
        }

        if spot.is_none() {
            let starts = self.spawn_points("info_player_start");
            spot = starts
                .iter()
                .copied()
                .find(|&s| self.edicts[s].target_name.is_empty())
                .or(starts.first().copied());
        }

        match spot {
            Some(s) => {
                let e = &self.edicts[s];
                let mut origin = e.s.origin;
                origin[2] += 12.0;
                (origin, e.s.angles)
            }
            None => {
                warn!("no spawn point on {}, using the map origin", self.level.name);
                ([0.0, 0.0, 12.0], VEC3_ORIGIN)
            }
        }
    }

    // ============================================================
    // Spawning
    // ============================================================

    fn client_respawn_(&mut self, ent: usize) {
        let (spawn_origin, spawn_angles) = self.select_spawn_point(ent);

        let Some(client) = self.client(ent) else {
            return;
        };
        let old_angles = client.locals.cmd_angles;

        self.init_client_inventory(ent);

        // clear everything but the persistent data
        let (health, max_health) = match self.client_mut(ent) {
            Some(client) => {
                client.locals = ClientLocals::default();
                client.ps = PlayerState::default();
                (client.persistent.health, client.persistent.max_health)
            }
            None => return,
        };

        let e = &mut self.edicts[ent];
        e.mins = PM_MINS;
        e.maxs = PM_MAXS;
        e.ground_entity = None;
        e.take_damage = true;
        e.move_type = MoveType::Walk;
        e.class_name = "player".into();
        e.mass = 200.0;
        e.solid = Solid::Box;
        e.dead = false;
        e.clip_mask = MASK_PLAYER_SOLID;
        e.pain = Some(PainFn::Client);
        e.die = Some(DieFn::Client);
        e.water_level = 0;
        e.water_type = 0;
        e.sv_flags = 0;
        e.health = health as i32;
        e.max_health = max_health as i32;
        e.velocity = VEC3_ORIGIN;

        e.s.effects = 0;
        e.s.model1 = MODEL_CLIENT;
        e.s.model2 = 0;
        e.s.model3 = 0;
        e.s.model4 = 0;
        e.s.client = (ent - 1) as u8;
        e.s.origin = spawn_origin;
        e.s.old_origin = spawn_origin;
        e.s.angles = VEC3_ORIGIN;

        let time = self.level.time;
        let (match_num, round_num) = (self.level.match_num, self.level.round_num);

        let Some(client) = self.client_mut(ent) else {
            return;
        };
        client.ps.pmove.origin = spawn_origin;
        client.ps.pmove.delta_angles = vector_subtract(&spawn_angles, &old_angles);

        if client.persistent.spectator {
            client.locals.chase_target = None;
            client.persistent.weapon = None;
            client.persistent.team = None;
            client.persistent.ready = false;

            let e = &mut self.edicts[ent];
            e.move_type = MoveType::NoClip;
            e.solid = Solid::Not;
            e.sv_flags |= SVF_NO_CLIENT;
            e.take_damage = false;

            self.link_entity(ent);
            return;
        }

        // hold in place briefly
        client.ps.pmove.pm_flags = PMF_TIME_TELEPORT;
        client.ps.pmove.pm_time = 20;
        client.persistent.match_num = match_num;
        client.persistent.round_num = round_num;
        client.locals.respawn_protection_time = time + RESPAWN_PROTECTION;
        let weapon = client.persistent.weapon;

        self.edicts[ent].s.event = EntityEvent::ClientTeleport;

        self.unlink_entity(ent);
        self.kill_box(ent);
        self.link_entity(ent);

        // force the current weapon up
        self.change_weapon(ent, weapon);
    }

    /// Put the client back in the game. `voluntary` means they asked for it
    /// by changing their spectator status or team.
    pub fn client_respawn(&mut self, ent: usize, voluntary: bool) {
        if voluntary {
            self.toss_flag(ent);
        }
        self.client_respawn_(ent);

        let time = self.level.time;
        let teams = self.level.teams || self.level.ctf;
        let Some(client) = self.client_mut(ent) else {
            return;
        };

        // clear scores and match/round on voluntary changes
        if client.persistent.spectator && voluntary {
            client.persistent.score = 0;
            client.persistent.captures = 0;
            client.persistent.match_num = 0;
            client.persistent.round_num = 0;
        }

        client.locals.respawn_time = time;

        if !voluntary {
            return;
        }

        let name = client.persistent.net_name.clone();
        let msg = if client.persistent.spectator {
            format!("{} likes to watch\n", name)
        } else if let Some(team) = client.persistent.team.filter(|_| teams) {
            format!("{} has joined {}\n", name, self.team(team).name)
        } else {
            format!("{} wants some\n", name)
        };
        self.gi.bprint(PrintLevel::High, &msg);
    }

    // ============================================================
    // Connection
    // ============================================================

    /// Called when a player begins connecting. Refusal carries the message to
    /// show them.
    pub fn client_connect(&mut self, ent: usize, user_info: &str) -> GameResult<()> {
        if self.client(ent).is_none() {
            return Err(GameError::UnknownClient(ent));
        }

        let password = self.gi.cvars().string("password").to_string();
        if !password.is_empty() && password != "none" && password != info_value_for_key(user_info, "password") {
            return Err(GameError::ConnectRefused("Password required or incorrect.".into()));
        }

        if let Some(client) = self.client_mut(ent) {
            *client = Client::default();
            client.connected = true;
            client.persistent.vote = Vote::NoOp;
        }

        self.client_user_info_changed(ent, user_info);

        if self.max_clients > 1 {
            let name = self.clients[ent - 1].persistent.net_name.clone();
            self.gi.bprint(PrintLevel::High, &format!("{} connected\n", name));
        }

        self.edicts[ent].sv_flags = 0;
        Ok(())
    }

    pub fn client_user_info_changed(&mut self, ent: usize, user_info: &str) {
        let user_info = if user_info.split('\\').all(info_validate) && !user_info.is_empty() {
            user_info
        } else {
            DEFAULT_USER_INFO
        };
        let teams = self.level.teams || self.level.ctf;

        let name = sanitize_name(&info_value_for_key(user_info, "name"));

        let Some(team) = self.client(ent).map(|c| c.persistent.team) else {
            return;
        };
        let skin = match team.filter(|_| teams) {
            Some(team) => self.team(team).skin.clone(),
            None => info_value_for_key(user_info, "skin"),
        };
        let skin = if skin.is_empty() { DEFAULT_SKIN.to_string() } else { skin };
        let color = color_by_name(&info_value_for_key(user_info, "color"), DEFAULT_COLOR);

        let Some(client) = self.client_mut(ent) else {
            return;
        };
        let old_name = std::mem::replace(&mut client.persistent.net_name, name.clone());
        client.persistent.skin = skin.clone();
        client.persistent.color = color;
        client.persistent.user_info = user_info.to_string();

        if !old_name.is_empty() && old_name != name {
            self.gi
                .bprint(PrintLevel::Medium, &format!("{} changed name to {}\n", old_name, name));
        }

        self.gi
            .set_config_string(CS_CLIENTS + ent - 1, &format!("{}\\{}", name, skin));
    }

    /// Called when the client is ready to be placed in the game, on every
    /// level load.
    pub fn client_begin(&mut self, ent: usize) {
        if self.client(ent).is_none() {
            warn!("client_begin for non-client slot {}", ent);
            return;
        }

        self.init_entity(ent);
        self.init_client_inventory(ent);

        let frame_num = self.level.frame_num;
        let auto_join = self.gi.cvars().value("g_auto_join") != 0.0;
        if let Some(client) = self.client_mut(ent) {
            client.locals.cmd_angles = VEC3_ORIGIN;
            client.persistent.first_frame = frame_num;
        }

        // force spectator if match or rounds
        if self.level.match_ || self.level.rounds {
            self.clients[ent - 1].persistent.spectator = true;
        } else if self.level.teams || self.level.ctf {
            if auto_join {
                let team = self.smallest_team();
                self.add_client_to_team(ent, team);
            } else {
                self.clients[ent - 1].persistent.spectator = true;
            }
        }

        self.client_respawn(ent, true);

        if self.level.intermission_time != 0 {
            self.client_to_intermission(ent);
        } else {
            let mut welcome = format!(
                "^2Welcome to ^7{}\n^2Gameplay is ^1{}\n",
                self.gi.cvars().string("sv_hostname"),
                self.level.gameplay.name()
            );
            if self.level.teams {
                welcome.push_str("^2Teams are enabled\n");
            }
            if self.level.ctf {
                welcome.push_str("^2CTF is enabled\n");
            }
            if self.gi.cvars().value("g_voting") != 0.0 {
                welcome.push_str("^2Voting is allowed\n");
            }
            let motd = self.gi.cvars().string("g_motd").to_string();
            if !motd.is_empty() {
                welcome.push_str(&motd);
                welcome.push('\n');
            }
            self.center_print(ent, &welcome);
        }

        info!("{} entered the game", self.clients[ent - 1].persistent.net_name);

        // make sure all view stuff is valid
        self.client_end_frame(ent);
    }

    /// Called when a player drops from the server. Not called between levels.
    pub fn client_disconnect(&mut self, ent: usize) {
        let Some(name) = self.client(ent).map(|c| c.persistent.net_name.clone()) else {
            return;
        };

        self.detach_hook(ent);
        self.discard_lightning(ent);

        self.toss_quad_damage(ent);
        self.toss_flag(ent);

        self.gi.bprint(PrintLevel::High, &format!("{} disconnected\n", name));

        self.muzzle_flash(ent, MuzzleFlash::Logout, None);

        self.unlink_entity(ent);

        if let Some(client) = self.client_mut(ent) {
            client.persistent.user_info.clear();
            client.connected = false;
        }

        let e = &mut self.edicts[ent];
        e.in_use = false;
        e.solid = Solid::Not;
        e.s.model1 = 0;
        e.s.model2 = 0;
        e.s.model3 = 0;
        e.s.model4 = 0;
        e.class_name = "disconnected".into();

        self.gi.set_config_string(CS_CLIENTS + ent - 1, "");
    }

    // ============================================================
    // Pain and death
    // ============================================================

    pub fn client_pain(&mut self, ent: usize, other: usize, damage: i32, _knockback: i32) {
        if other != ent && self.edicts[other].is_client() {
            let hit = self.gi.sound_index("misc/hit");
            self.gi.sound(other, hit, Attenuation::Static);
        }

        if damage > 0 {
            let health = self.edicts[ent].health;
            let bucket = match health {
                h if h < 25 => 25,
                h if h < 50 => 50,
                h if h < 75 => 75,
                _ => 100,
            };
            let sound = self.gi.sound_index(&format!("*pain{}_1", bucket));
            self.gi.sound(ent, sound, Attenuation::Norm);
        }
    }

    /// A lifeless copy of the player left behind to sink away.
    fn client_corpse(&mut self, ent: usize) {
        let Ok(corpse) = self.alloc_entity("corpse") else {
            return;
        };

        let time = self.level.time;
        let src = self.edicts[ent].clone();
        let c = &mut self.edicts[corpse];

        c.s = src.s;
        c.s.number = corpse as u16;
        c.s.event = EntityEvent::None;
        c.s.effects |= EF_CORPSE;
        c.mins = src.mins;
        c.maxs = src.maxs;
        c.velocity = src.velocity;
        c.move_type = MoveType::Toss;
        c.solid = Solid::Not;
        c.clip_mask = MASK_DEAD_SOLID;
        c.dead = true;
        c.think = Some(ThinkFn::FreeEntity);
        c.next_think = time + CORPSE_TIME;

        self.link_entity(corpse);
    }

    /// Weapons and the quad only drop in default gameplay, the flag only in
    /// CTF, and nothing during warmup.
    fn client_drop_items(&mut self, ent: usize) {
        if self.level.warmup {
            return;
        }
        if self.level.gameplay == Gameplay::Default {
            if self.level.means_of_death & !MOD_FRIENDLY_FIRE != MOD_TRIGGER_HURT {
                self.toss_weapon(ent);
            }
            self.toss_quad_damage(ent);
        }
        if self.level.ctf {
            self.toss_flag(ent);
        }
    }

    pub fn client_die(&mut self, ent: usize, _inflictor: usize, attacker: usize, _damage: i32, _point: &Vec3) {
        let spectator = self.client(ent).map(|c| c.persistent.spectator).unwrap_or(true);
        if !spectator {
            self.client_corpse(ent);
        }

        let death = self.gi.sound_index("*death_1");
        self.gi.sound(ent, death, Attenuation::Norm);

        let time = self.level.time;
        if let Some(client) = self.client_mut(ent) {
            client.locals.respawn_time = time + RESPAWN_DELAY;
            client.locals.show_scores = true;
            client.ps.pmove.pm_type = PmType::Dead;
            client.ps.pmove.pm_flags &= !PMF_HOOK;
        }

        self.client_obituary(ent, attacker);

        if !spectator {
            self.client_drop_items(ent);
        }

        self.detach_hook(ent);
        self.discard_lightning(ent);

        let e = &mut self.edicts[ent];
        e.sv_flags |= SVF_NO_CLIENT;
        e.dead = true;
        e.class_name = "dead".into();
        e.s.model1 = 0;
        e.s.model2 = 0;
        e.s.model3 = 0;
        e.s.model4 = 0;
        e.s.sound = 0;
        e.s.effects = 0;
        e.solid = Solid::Not;
        e.take_damage = false;

        self.link_entity(ent);
    }

    // ============================================================
    // Per-command and per-frame
    // ============================================================

    fn client_inventory_think(&mut self, ent: usize) {
        let time = self.level.time;
        let expired = match self.client_mut(ent) {
            Some(client) if client.locals.quad_damage_time != 0 && client.locals.quad_damage_time < time => {
                client.locals.quad_damage_time = 0;
                true
            }
            _ => false,
        };

        if expired {
            let sound = self.gi.sound_index("quad/expire");
            self.gi.sound(ent, sound, Attenuation::Norm);
            self.edicts[ent].s.effects &= !EF_QUAD;
        } else if self.client(ent).map(|c| c.locals.quad_damage_time > time).unwrap_or(false) {
            self.edicts[ent].s.effects |= EF_QUAD;
        }
    }

    /// Run one user command: movement, touches, hook and weapon. Called
    /// once or more per server frame.
    pub fn client_think(&mut self, ent: usize, cmd: &UserCmd) {
        if self.client(ent).is_none() {
            return;
        }

        self.level.current_entity = Some(ent);

        if self.level.intermission_time != 0 {
            self.clients[ent - 1].ps.pmove.pm_type = PmType::Freeze;
            return;
        }

        // ensure chase is valid
        if let Some(target) = self.clients[ent - 1].locals.chase_target {
            self.clients[ent - 1].ps.pmove.pm_flags |= PMF_NO_PREDICTION;

            let valid = self
                .resolve(Some(target))
                .map(|t| !self.client(t).map(|c| c.persistent.spectator).unwrap_or(true))
                .unwrap_or(false);
            if !valid {
                self.chase_next(ent);
                if self.clients[ent - 1].locals.chase_target == Some(target) {
                    self.clients[ent - 1].locals.chase_target = None;
                }
            }
        }

        if self.clients[ent - 1].locals.chase_target.is_none() {
            self.client_move(ent, cmd);
        }

        let time = self.level.time;
        let client = &mut self.clients[ent - 1];
        client.locals.old_buttons = client.locals.buttons;
        client.locals.buttons = cmd.buttons;
        client.locals.latched_buttons |= client.locals.buttons & !client.locals.old_buttons;
        client.locals.cmd = *cmd;

        let spectator = client.persistent.spectator;
        let latched = client.locals.latched_buttons;
        let fire_time = client.locals.weapon_fire_time;
        let hook_held = cmd.buttons & BUTTON_HOOK != 0;
        let has_hook = self.resolve(self.edicts[ent].hook).is_some();

        if !spectator && !self.edicts[ent].dead {
            if hook_held && !has_hook {
                self.fire_hook(ent);
            } else if !hook_held && has_hook {
                self.detach_hook(ent);
            }
        }

        // fire weapon if requested
        if latched & BUTTON_ATTACK != 0 {
            if spectator {
                let client = &mut self.clients[ent - 1];
                client.locals.latched_buttons = 0;

                // toggle chase camera
                if client.locals.chase_target.is_some() {
                    client.locals.chase_target = None;
                    client.ps.pmove.pm_flags &= !PMF_NO_PREDICTION;
                } else {
                    self.chase_target(ent);
                }
            } else if fire_time <= time {
                self.weapon_think(ent);
            }
        }

        // update chase cameras following us
        let me = self.entity_ref(ent);
        for other in 1..=self.max_clients {
            if self.edicts[other].in_use && self.clients[other - 1].locals.chase_target == Some(me) {
                self.chase_think(other);
            }
        }

        self.client_inventory_think(ent);
    }

    fn client_move(&mut self, ent: usize, cmd: &UserCmd) {
        let gravity = self.level.gravity;
        let time = self.level.time;

        let e = &self.edicts[ent];
        let pm_type = if e.move_type == MoveType::NoClip {
            PmType::Spectator
        } else if e.s.model1 != MODEL_CLIENT || e.dead {
            PmType::Dead
        } else {
            PmType::Normal
        };

        let (origin, velocity, mins, maxs) = (e.s.origin, e.velocity, e.mins, e.maxs);
        let ground_entity = self.resolve(e.ground_entity);

        let client = &mut self.clients[ent - 1];
        client.ps.pmove.pm_flags &= !PMF_NO_PREDICTION;
        client.ps.pmove.pm_type = pm_type;
        client.ps.pmove.gravity = gravity as i16;

        let mut pm = PmoveData {
            s: client.ps.pmove,
            cmd: *cmd,
            mins,
            maxs,
            ground_entity,
            pass_ent: ent,
            ..Default::default()
        };
        pm.s.origin = origin;
        pm.s.velocity = velocity;

        self.gi.pmove(&mut pm);

        let client = &mut self.clients[ent - 1];
        client.ps.pmove = pm.s;
        client.locals.cmd_angles = cmd.angles;
        client.locals.angles = pm.angles;

        let was_on_ground = self.edicts[ent].ground_entity.is_some();
        let jumped = was_on_ground
            && pm.ground_entity.is_none()
            && cmd.up >= 10
            && pm.water_level == 0
            && client.locals.jump_time + JUMP_DEBOUNCE < time;
        if jumped {
            client.locals.jump_time = time;
        }

        let ground = pm.ground_entity.map(|g| self.entity_ref(g));
        let ground_link_count = pm.ground_entity.map(|g| self.edicts[g].link_count);

        let e = &mut self.edicts[ent];
        e.s.origin = pm.s.origin;
        e.velocity = pm.s.velocity;
        e.mins = pm.mins;
        e.maxs = pm.maxs;
        e.s.angles = [0.0, pm.angles[YAW], 0.0];
        e.water_level = pm.water_level;
        e.water_type = pm.water_type;
        e.ground_entity = ground;
        if let Some(count) = ground_link_count {
            e.ground_entity_link_count = count;
        }
        if jumped {
            e.s.event = EntityEvent::ClientJump;
        }

        self.link_entity(ent);

        // touch jump pads, hurt brushes, etc
        if self.edicts[ent].move_type != MoveType::NoClip && self.edicts[ent].health > 0 {
            self.touch_triggers(ent);
        }

        let mut touched: Vec<usize> = Vec::with_capacity(pm.touch_ents.len());
        for other in pm.touch_ents {
            if touched.contains(&other) {
                continue;
            }
            touched.push(other);
            if self.edicts[other].in_use && self.edicts[other].touch.is_some() {
                self.call_touch(other, ent, None, None);
            }
        }
    }

    /// Called once per server frame before any entity runs.
    pub fn client_begin_frame(&mut self, ent: usize) {
        if self.level.intermission_time != 0 || self.client(ent).is_none() {
            return;
        }

        let time = self.level.time;

        // let this be reset each frame as needed
        if self.edicts[ent].ground_entity.is_some() {
            self.clients[ent - 1].ps.pmove.pm_flags &= !PMF_PUSHED;
        }

        // run weapon think if it hasn't been done by a command
        let client = &self.clients[ent - 1];
        if client.locals.weapon_fire_time <= time && !client.persistent.spectator {
            self.weapon_think(ent);
        }

        if self.edicts[ent].dead {
            let client = &self.clients[ent - 1];
            let respawn_time = client.locals.respawn_time;
            let clicked = client.locals.latched_buttons & BUTTON_ATTACK != 0;

            // rounds are last man standing, so the dead watch once a round is underway
            if self.level.rounds && self.level.round_time != 0 && time >= self.level.round_time {
                self.clients[ent - 1].persistent.spectator = true;
                self.client_respawn(ent, false);
            } else if time > respawn_time
                && (clicked || (!self.level.rounds && time > respawn_time + AUTO_RESPAWN_DELAY))
            {
                self.client_respawn(ent, false);
            }
        }

        if let Some(client) = self.client_mut(ent) {
            client.locals.latched_buttons = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn spawn_spot(ctx: &mut GameCtx, class_name: &str, origin: Vec3) -> usize {
        let spot = ctx.alloc_entity(class_name).unwrap();
        ctx.edicts[spot].s.origin = origin;
        spot
    }

    fn connect(ctx: &mut GameCtx, ent: usize, name: &str) {
        ctx.client_connect(ent, &format!("\\name\\{}\\skin\\qforcer/enforcer", name)).unwrap();
        ctx.client_begin(ent);
    }

    // ============================================================
    // Names
    // ============================================================

    #[test]
    fn test_sanitize_name_trims_to_fifteen() {
        assert_eq!(sanitize_name("abcdefghijklmnopqrstuvwxyz"), "abcdefghijklmno");
    }

    #[test]
    fn test_sanitize_name_colors_do_not_count() {
        assert_eq!(sanitize_name("^1red"), "^1red^7");
        assert_eq!(sanitize_name("^1^2"), "newbie");
        assert_eq!(sanitize_name(""), "newbie");
    }

    #[test]
    fn test_color_by_name() {
        assert_eq!(color_by_name("red", 0), 242);
        assert_eq!(color_by_name("12", 0), 12);
        assert_eq!(color_by_name("bogus", 243), 243);
    }

    // ============================================================
    // Connection
    // ============================================================

    #[test]
    fn test_connect_rejects_bad_password() {
        let (mut ctx, _) = make_ctx(2, 64);
        ctx.gi.cvars().set("password", "secret");
        let err = ctx.client_connect(1, "\\name\\bob\\password\\nope").unwrap_err();
        assert!(matches!(err, GameError::ConnectRefused(_)));

        assert!(ctx.client_connect(1, "\\name\\bob\\password\\secret").is_ok());
        assert_eq!(ctx.clients[0].persistent.net_name, "bob");
    }

    #[test]
    fn test_user_info_publishes_config_string() {
        let (mut ctx, world) = make_ctx(2, 64);
        ctx.client_connect(2, "\\name\\alice\\skin\\male/grunt").unwrap();
        assert_eq!(
            world.borrow().config_strings.get(&(CS_CLIENTS + 1)).map(String::as_str),
            Some("alice\\male/grunt")
        );
    }

    #[test]
    fn test_rename_is_announced() {
        let (mut ctx, world) = make_ctx(2, 64);
        ctx.client_connect(1, "\\name\\alice").unwrap();
        ctx.client_user_info_changed(1, "\\name\\bob");
        assert!(world.borrow().bprints.iter().any(|(_, m)| m == "alice changed name to bob\n"));
    }

    #[test]
    fn test_begin_spawns_player_at_spot() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [100.0, 0.0, 0.0]);
        connect(&mut ctx, 1, "alice");

        let e = &ctx.edicts[1];
        assert!(e.in_use);
        assert_eq!(e.s.origin, [100.0, 0.0, 12.0]);
        assert_eq!(e.health, 100);
        assert_eq!(e.move_type, MoveType::Walk);
        assert_eq!(ctx.clients[0].persistent.weapon, Some(Weapon::Shotgun));
        assert!(ctx.clients[0].locals.respawn_protection_time > ctx.level.time);
    }

    #[test]
    fn test_begin_in_match_mode_spectates() {
        let (mut ctx, _) = make_ctx(2, 64);
        ctx.level.match_ = true;
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");

        assert!(ctx.clients[0].persistent.spectator);
        assert_eq!(ctx.edicts[1].move_type, MoveType::NoClip);
        assert!(!ctx.edicts[1].take_damage);
    }

    #[test]
    fn test_instagib_gives_only_railgun() {
        let (mut ctx, _) = make_ctx(2, 64);
        ctx.level.gameplay = Gameplay::Instagib;
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");

        let p = &ctx.clients[0].persistent;
        assert_eq!(p.weapons, WeaponSet::RAILGUN);
        assert_eq!(p.weapon, Some(Weapon::Railgun));
    }

    #[test]
    fn test_level_give_picks_best_weapon() {
        let (mut ctx, _) = make_ctx(2, 64);
        ctx.level.give = "Rocket Launcher 20, Armor 50".into();
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");

        let p = &ctx.clients[0].persistent;
        assert_eq!(p.weapon, Some(Weapon::RocketLauncher));
        assert_eq!(p.ammo[AmmoType::Rockets.index()], 20);
        assert_eq!(p.armor, 50);
    }

    #[test]
    fn test_disconnect_frees_slot() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        ctx.client_disconnect(1);

        assert!(!ctx.edicts[1].in_use);
        assert!(!ctx.clients[0].connected);
        assert!(!world.borrow().linked.contains_key(&1));
        assert_eq!(world.borrow().config_strings.get(&CS_CLIENTS).map(String::as_str), Some(""));
    }

    // ============================================================
    // Spawn points
    // ============================================================

    #[test]
    fn test_farthest_spawn_point_avoids_enemies() {
        let (mut ctx, _) = make_ctx(3, 64);
        ctx.gi.cvars().set("g_spawn_farthest", "1");
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        spawn_spot(&mut ctx, "info_player_deathmatch", [1000.0, 0.0, 0.0]);
        spawn_test_client(&mut ctx, 2, [10.0, 0.0, 0.0]);

        let (origin, _) = ctx.select_spawn_point(1);
        assert_eq!(origin, [1000.0, 0.0, 12.0]);
    }

    #[test]
    fn test_team_spawn_points_preferred() {
        let (mut ctx, _) = make_ctx(2, 64);
        ctx.level.teams = true;
        ctx.clients[0].persistent.team = Some(TeamId::Evil);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        spawn_spot(&mut ctx, "info_player_team2", [500.0, 0.0, 0.0]);

        let (origin, _) = ctx.select_spawn_point(1);
        assert_eq!(origin, [500.0, 0.0, 12.0]);
    }

    // ============================================================
    // Death and respawn
    // ============================================================

    #[test]
    fn test_death_leaves_corpse_and_respawns_on_click() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");

        ctx.damage(1, 0, 0, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, DAMAGE_NO_PROTECTION, MOD_LAVA);
        assert!(ctx.edicts[1].dead);
        assert_eq!(ctx.edicts[1].solid, Solid::Not);
        assert!(ctx.find_by_class_name(None, "corpse").is_some());

        // too soon
        ctx.clients[0].locals.latched_buttons = BUTTON_ATTACK;
        ctx.client_begin_frame(1);
        assert!(ctx.edicts[1].dead);

        ctx.level.time += 1100;
        ctx.clients[0].locals.latched_buttons = BUTTON_ATTACK;
        ctx.client_begin_frame(1);
        assert!(!ctx.edicts[1].dead);
        assert_eq!(ctx.edicts[1].health, 100);
    }

    #[test]
    fn test_automatic_respawn() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        ctx.damage(1, 0, 0, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, DAMAGE_NO_PROTECTION, MOD_LAVA);

        ctx.level.time += 3500;
        ctx.client_begin_frame(1);
        assert!(!ctx.edicts[1].dead);
    }

    #[test]
    fn test_environmental_death_obituary() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        ctx.damage(1, 0, 0, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, DAMAGE_NO_PROTECTION, MOD_LAVA);
        assert!(world
            .borrow()
            .bprints
            .iter()
            .any(|(_, m)| m == "alice did a back flip into the lava.\n"));
    }

    fn dropped(ctx: &GameCtx, class_name: &str) -> Option<usize> {
        (ctx.max_clients + 1..ctx.num_edicts).find(|&i| ctx.edicts[i].in_use && ctx.edicts[i].class_name == class_name)
    }

    #[test]
    fn test_death_drops_weapon_and_quad() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        let expires = ctx.level.time + 5000;
        ctx.clients[0].locals.quad_damage_time = expires;

        ctx.damage(1, 0, 0, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, DAMAGE_NO_PROTECTION, MOD_LAVA);

        let shotgun = dropped(&ctx, "weapon_shotgun").unwrap();
        assert_eq!(ctx.edicts[shotgun].count, 10);
        let quad = dropped(&ctx, "item_quad").unwrap();
        assert_eq!(ctx.edicts[quad].timestamp, expires);
    }

    #[test]
    fn test_trigger_hurt_death_keeps_weapon() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");

        ctx.damage(1, 0, 0, &[0.0, 0.0, 1.0], &VEC3_ORIGIN, &VEC3_ORIGIN, 200, 0, DAMAGE_NO_PROTECTION, MOD_TRIGGER_HURT);
        assert!(ctx.edicts[1].dead);
        assert!(dropped(&ctx, "weapon_shotgun").is_none());
    }

    #[test]
    fn test_disconnect_drops_carried_flag() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        ctx.level.ctf = true;
        ctx.clients[0].locals.flag = Some(TeamId::Evil);

        ctx.client_disconnect(1);

        assert!(dropped(&ctx, "item_flag_team2").is_some());
        assert!(world.borrow().bprints.iter().any(|(_, m)| m.starts_with("alice dropped the")));
    }

    // ============================================================
    // Movement
    // ============================================================

    #[test]
    fn test_client_think_runs_pmove() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_spot(&mut ctx, "info_player_deathmatch", [0.0; 3]);
        connect(&mut ctx, 1, "alice");
        ctx.edicts[1].velocity = [100.0, 0.0, 0.0];

        let cmd = UserCmd { msec: 100, ..Default::default() };
        ctx.client_think(1, &cmd);

        assert_eq!(world.borrow().pmove_calls, 1);
        assert!((ctx.edicts[1].s.origin[0] - 10.0).abs() < 1e-3);
        assert_eq!(ctx.clients[0].ps.pmove.origin, ctx.edicts[1].s.origin);
    }

    #[test]
    fn test_intermission_freezes() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        ctx.level.intermission_time = ctx.level.time;
        ctx.client_think(1, &UserCmd::default());
        assert_eq!(ctx.clients[0].ps.pmove.pm_type, PmType::Freeze);
        assert_eq!(world.borrow().pmove_calls, 0);
    }

    #[test]
    fn test_buttons_latch_on_press() {
        let (mut ctx, _) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        let cmd = UserCmd { msec: 10, buttons: BUTTON_SCORE, ..Default::default() };
        ctx.client_think(1, &cmd);
        assert_eq!(ctx.clients[0].locals.latched_buttons & BUTTON_SCORE, BUTTON_SCORE);

        ctx.client_begin_frame(1);
        assert_eq!(ctx.clients[0].locals.latched_buttons, 0);
    }

    #[test]
    fn test_quad_expires() {
        let (mut ctx, world) = make_ctx(2, 64);
        spawn_test_client(&mut ctx, 1, [0.0; 3]);
        ctx.clients[0].locals.quad_damage_time = ctx.level.time - 1;
        ctx.edicts[1].s.effects = EF_QUAD;
        ctx.client_think(1, &UserCmd::default());
        assert_eq!(ctx.edicts[1].s.effects & EF_QUAD, 0);
        assert_eq!(ctx.clients[0].locals.quad_damage_time, 0);
        assert!(!world.borrow().sounds.is_empty());
    }
}
