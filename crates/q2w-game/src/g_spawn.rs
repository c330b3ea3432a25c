// g_spawn.rs — entity lump parsing, spawn dispatch and worldspawn

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

use std::collections::HashMap;
use std::sync::OnceLock;

use log::{debug, error, info};

use crate::error::{GameError, GameResult};
use crate::g_items::find_item_by_class_name;
use crate::g_local::*;
use crate::g_map_list::{MapListEntry, MAP_LIST_UNSET};
use crate::game_import::Attenuation;

// ============================================================
// Lookup tables
// ============================================================

static FIELDS_INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
static SPAWNS_INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();

fn fields_index() -> &'static HashMap<&'static str, usize> {
    FIELDS_INDEX.get_or_init(|| FIELDS.iter().enumerate().map(|(i, f)| (f.name, i)).collect())
}

fn spawns_index() -> &'static HashMap<&'static str, usize> {
    SPAWNS_INDEX.get_or_init(|| SPAWNS.iter().enumerate().map(|(i, s)| (s.name, i)).collect())
}

// ============================================================
// Spawn table
// ============================================================

pub type SpawnFn = fn(&mut GameCtx, usize);

pub struct SpawnEntry {
    pub name: &'static str,
    pub spawn: SpawnFn,
}

pub static SPAWNS: &[SpawnEntry] = &[
    SpawnEntry { name: "info_player_start", spawn: GameCtx::sp_info_player_start },
    SpawnEntry { name: "info_player_deathmatch", spawn: GameCtx::sp_info_player_deathmatch },
    SpawnEntry { name: "info_player_team1", spawn: GameCtx::sp_info_player_team1 },
    SpawnEntry { name: "info_player_team2", spawn: GameCtx::sp_info_player_team2 },
    SpawnEntry { name: "info_player_intermission", spawn: GameCtx::sp_info_player_intermission },

    SpawnEntry { name: "func_plat", spawn: GameCtx::sp_func_plat },
    SpawnEntry { name: "func_button", spawn: GameCtx::sp_func_button },
    SpawnEntry { name: "func_door", spawn: GameCtx::sp_func_door },
    SpawnEntry { name: "func_door_rotating", spawn: GameCtx::sp_func_door_rotating },
    SpawnEntry { name: "func_rotating", spawn: GameCtx::sp_func_rotating },
    SpawnEntry { name: "func_train", spawn: GameCtx::sp_func_train },
    SpawnEntry { name: "func_water", spawn: GameCtx::sp_func_water },
    SpawnEntry { name: "func_conveyor", spawn: GameCtx::sp_func_conveyor },
    SpawnEntry { name: "func_areaportal", spawn: GameCtx::sp_func_areaportal },
    SpawnEntry { name: "func_wall", spawn: GameCtx::sp_func_wall },
    SpawnEntry { name: "func_timer", spawn: GameCtx::sp_func_timer },
    SpawnEntry { name: "func_group", spawn: GameCtx::sp_func_group },

    SpawnEntry { name: "trigger_always", spawn: GameCtx::sp_trigger_always },
    SpawnEntry { name: "trigger_once", spawn: GameCtx::sp_trigger_once },
    SpawnEntry { name: "trigger_multiple", spawn: GameCtx::sp_trigger_multiple },
    SpawnEntry { name: "trigger_relay", spawn: GameCtx::sp_trigger_relay },
    SpawnEntry { name: "trigger_push", spawn: GameCtx::sp_trigger_push },
    SpawnEntry { name: "trigger_hurt", spawn: GameCtx::sp_trigger_hurt },
    SpawnEntry { name: "trigger_teleport", spawn: GameCtx::sp_misc_teleporter },
    SpawnEntry { name: "trigger_teleporter", spawn: GameCtx::sp_misc_teleporter },

    SpawnEntry { name: "target_speaker", spawn: GameCtx::sp_target_speaker },
    SpawnEntry { name: "target_explosion", spawn: GameCtx::sp_target_explosion },

    SpawnEntry { name: "worldspawn", spawn: GameCtx::sp_worldspawn },

    SpawnEntry { name: "path_corner", spawn: GameCtx::sp_path_corner },
    SpawnEntry { name: "info_null", spawn: GameCtx::sp_info_null },
    SpawnEntry { name: "info_notnull", spawn: GameCtx::sp_info_notnull },

    SpawnEntry { name: "misc_teleporter", spawn: GameCtx::sp_misc_teleporter },
    SpawnEntry { name: "misc_teleporter_dest", spawn: GameCtx::sp_misc_teleporter_dest },
];

/// Client side or unused classes, dropped at load.
const INHIBITED_CLASSES: [&str; 4] = ["misc_emit", "misc_model", "light", "light_spot"];

// skill and coop flags from older editors
const SF_NOT_EASY: u32 = 0x0000_0100;
const SF_NOT_MEDIUM: u32 = 0x0000_0200;
const SF_NOT_HARD: u32 = 0x0000_0400;
const SF_NOT_COOP: u32 = 0x0000_1000;
const LEGACY_SPAWN_FLAGS: u32 = SF_NOT_EASY | SF_NOT_MEDIUM | SF_NOT_HARD | SF_NOT_COOP | SF_NOT_DEATHMATCH;

// ============================================================
// Field table
// ============================================================

/// A typed setter for one editor key. `Temp` setters write the spawn temp
/// record, which is only valid while the spawn function runs.
#[derive(Clone, Copy)]
pub enum FieldSet {
    Str(fn(&mut Edict, String)),
    Int(fn(&mut Edict, i32)),
    Float(fn(&mut Edict, f32)),
    Vector(fn(&mut Edict, Vec3)),
    /// A single yaw, stored as `[0, yaw, 0]`.
    AngleHack(fn(&mut Edict, Vec3)),
    TempStr(fn(&mut SpawnTemp, String)),
    TempInt(fn(&mut SpawnTemp, i32)),
}

pub struct FieldDef {
    pub name: &'static str,
    pub set: FieldSet,
}

pub static FIELDS: &[FieldDef] = &[
    FieldDef { name: "classname", set: FieldSet::Str(|e, v| e.class_name = v) },
    FieldDef { name: "model", set: FieldSet::Str(|e, v| e.model = v) },
    FieldDef { name: "spawnflags", set: FieldSet::Int(|e, v| e.spawn_flags = v as u32) },
    FieldDef { name: "speed", set: FieldSet::Float(|e, v| e.speed = v) },
    FieldDef { name: "accel", set: FieldSet::Float(|e, v| e.accel = v) },
    FieldDef { name: "decel", set: FieldSet::Float(|e, v| e.decel = v) },
    FieldDef { name: "target", set: FieldSet::Str(|e, v| e.target = v) },
    FieldDef { name: "targetname", set: FieldSet::Str(|e, v| e.target_name = v) },
    FieldDef { name: "pathtarget", set: FieldSet::Str(|e, v| e.path_target = v) },
    FieldDef { name: "killtarget", set: FieldSet::Str(|e, v| e.kill_target = v) },
    FieldDef { name: "message", set: FieldSet::Str(|e, v| e.message = v) },
    FieldDef { name: "team", set: FieldSet::Str(|e, v| e.team = v) },
    FieldDef { name: "wait", set: FieldSet::Float(|e, v| e.wait = v) },
    FieldDef { name: "delay", set: FieldSet::Float(|e, v| e.delay = v) },
    FieldDef { name: "random", set: FieldSet::Float(|e, v| e.random = v) },
    FieldDef { name: "count", set: FieldSet::Int(|e, v| e.count = v) },
    FieldDef { name: "health", set: FieldSet::Int(|e, v| e.health = v) },
    FieldDef { name: "sounds", set: FieldSet::Int(|e, v| e.sounds = v) },
    FieldDef { name: "dmg", set: FieldSet::Int(|e, v| e.dmg = v) },
    FieldDef { name: "mass", set: FieldSet::Int(|e, v| e.mass = v as f32) },
    FieldDef { name: "attenuation", set: FieldSet::Int(|e, v| e.attenuation = attenuation_from_i32(v)) },
    FieldDef { name: "origin", set: FieldSet::Vector(|e, v| e.s.origin = v) },
    FieldDef { name: "angles", set: FieldSet::Vector(|e, v| e.s.angles = v) },
    FieldDef { name: "angle", set: FieldSet::AngleHack(|e, v| e.s.angles = v) },

    // temp spawn vars
    FieldDef { name: "lip", set: FieldSet::TempInt(|st, v| st.lip = v) },
    FieldDef { name: "distance", set: FieldSet::TempInt(|st, v| st.distance = v) },
    FieldDef { name: "height", set: FieldSet::TempInt(|st, v| st.height = v) },
    FieldDef { name: "noise", set: FieldSet::TempStr(|st, v| st.noise = v) },

    // world vars
    FieldDef { name: "sky", set: FieldSet::TempStr(|st, v| st.sky = v) },
    FieldDef { name: "weather", set: FieldSet::TempStr(|st, v| st.weather = v) },
    FieldDef { name: "gravity", set: FieldSet::TempStr(|st, v| st.gravity = v) },
    FieldDef { name: "gameplay", set: FieldSet::TempStr(|st, v| st.gameplay = v) },
    FieldDef { name: "teams", set: FieldSet::TempStr(|st, v| st.teams = v) },
    FieldDef { name: "ctf", set: FieldSet::TempStr(|st, v| st.ctf = v) },
    FieldDef { name: "match", set: FieldSet::TempStr(|st, v| st.match_ = v) },
    FieldDef { name: "rounds", set: FieldSet::TempStr(|st, v| st.rounds = v) },
    FieldDef { name: "frag_limit", set: FieldSet::TempStr(|st, v| st.frag_limit = v) },
    FieldDef { name: "round_limit", set: FieldSet::TempStr(|st, v| st.round_limit = v) },
    FieldDef { name: "capture_limit", set: FieldSet::TempStr(|st, v| st.capture_limit = v) },
    FieldDef { name: "time_limit", set: FieldSet::TempStr(|st, v| st.time_limit = v) },
    FieldDef { name: "give", set: FieldSet::TempStr(|st, v| st.give = v) },
    FieldDef { name: "music", set: FieldSet::TempStr(|st, v| st.music = v) },
];

/// Editor attenuation: -1 is none, 0 leaves it to the spawn function.
fn attenuation_from_i32(v: i32) -> Option<Attenuation> {
    match v {
        -1 => Some(Attenuation::None),
        1 => Some(Attenuation::Norm),
        2 => Some(Attenuation::Idle),
        3 => Some(Attenuation::Static),
        _ => None,
    }
}

// ============================================================
// Value parsing
// ============================================================

/// Copy of `input` with `\n` escapes turned into newlines.
pub fn ed_new_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some() {
            if chars.next() == Some('n') {
                out.push('\n');
            } else {
                out.push('\\');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Leading integer of `s`, 0 when there is none.
pub fn atoi(s: &str) -> i32 {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

pub fn atof(s: &str) -> f32 {
    s.trim().parse().unwrap_or(0.0)
}

/// `"x y z"`, missing components are zero.
pub fn parse_vec3(s: &str) -> Vec3 {
    let mut v = VEC3_ORIGIN;
    for (i, part) in s.split_whitespace().take(3).enumerate() {
        v[i] = atof(part);
    }
    v
}

/// Key/value pairs of one `{ ... }` record, whose opening brace has been
/// consumed, and the text after its closing brace.
fn parse_record(data: &str, record: usize) -> GameResult<(Vec<(String, String)>, Option<&str>)> {
    let mut pairs = Vec::new();
    let mut rest = Some(data);

    loop {
        let Some(d) = rest else {
            return Err(GameError::lump(record, "EOF without closing brace"));
        };
        let (key, after_key) = com_parse(d);
        if key == "}" {
            return Ok((pairs, after_key));
        }
        let Some(after_key) = after_key else {
            return Err(GameError::lump(record, "EOF without closing brace"));
        };

        let (value, after_value) = com_parse(after_key);
        if value == "}" {
            return Err(GameError::lump(record, format!("{} has no value", key)));
        }
        if after_value.is_none() {
            return Err(GameError::lump(record, "EOF in entity definition"));
        }

        // leading underscores are editor comments
        if !key.starts_with('_') {
            pairs.push((key, value));
        }
        rest = after_value;
    }
}

/// Resolve a world setting: map list entry, then worldspawn key, then the
/// fallback (usually a cvar).
fn resolve_int(map: Option<i32>, spawn: &str, fallback: i32) -> i32 {
    match map.filter(|&v| v > MAP_LIST_UNSET) {
        Some(v) => v,
        None if !spawn.trim().is_empty() => atoi(spawn),
        None => fallback,
    }
}

fn resolve_str(map: Option<&str>, spawn: &str, fallback: &str) -> String {
    match map.filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None if !spawn.is_empty() => spawn.to_string(),
        None => fallback.to_string(),
    }
}

impl GameCtx {
    /// Apply one editor key to `ent` or the spawn temp record.
    pub fn parse_field(&mut self, ent: usize, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        let Some(&i) = fields_index().get(key.as_str()) else {
            debug!("{} is not a field", key);
            return;
        };

        let e = &mut self.edicts[ent];
        match FIELDS[i].set {
            FieldSet::Str(set) => set(e, ed_new_string(value)),
            FieldSet::Int(set) => set(e, atoi(value)),
            FieldSet::Float(set) => set(e, atof(value)),
            FieldSet::Vector(set) => set(e, parse_vec3(value)),
            FieldSet::AngleHack(set) => set(e, [0.0, atof(value), 0.0]),
            FieldSet::TempStr(set) => set(&mut self.st, ed_new_string(value)),
            FieldSet::TempInt(set) => set(&mut self.st, atoi(value)),
        }
    }

    /// Run the spawn function for the entity's class. Classes with none are
    /// discarded.
    pub fn call_spawn(&mut self, ent: usize) {
        let class_name = self.edicts[ent].class_name.clone();

        if let Some(index) = find_item_by_class_name(&class_name) {
            self.spawn_item(ent, index);
            return;
        }

        match spawns_index().get(class_name.as_str()) {
            Some(&i) => (SPAWNS[i].spawn)(self, ent),
            None => {
                debug!("{} doesn't have a spawn function", class_name);
                if ent != 0 {
                    self.free_entity(ent);
                }
            }
        }
    }

    /// Build the entity store for a freshly loaded map from its entity lump.
    /// The first record is the world.
    pub fn spawn_level(&mut self, name: &str, entities: &str) -> GameResult<()> {
        info!("spawning entities for {}", name);

        self.level = Level {
            name: name.to_string(),
            ..Default::default()
        };
        self.reset_edicts();

        let mut rest = Some(entities);
        let mut record = 0;
        let mut inhibit = 0;
        let mut skipped = 0;

        while let Some(data) = rest {
            let (token, after) = com_parse(data);
            if token.is_empty() && after.is_none() {
                break;
            }
            if token != "{" {
                let err = GameError::lump(record, format!("found {} when expecting {{", token));
                error!("{}", err);
                return Err(err);
            }
            let Some(after) = after else {
                return Err(GameError::lump(record, "EOF without closing brace"));
            };

            let (pairs, next) = parse_record(after, record).map_err(|e| {
                error!("{}", e);
                e
            })?;
            rest = next;
            record += 1;

            let ent = if record == 1 {
                self.init_entity(0);
                0
            } else {
                match self.alloc_entity("noclass") {
                    Ok(ent) => ent,
                    Err(_) => {
                        skipped += 1;
                        continue;
                    }
                }
            };

            self.st = SpawnTemp::default();
            for (key, value) in &pairs {
                self.parse_field(ent, key, value);
            }

            if ent != 0 {
                let e = &self.edicts[ent];
                if pairs.is_empty()
                    || e.spawn_flags & SF_NOT_DEATHMATCH != 0
                    || INHIBITED_CLASSES.contains(&e.class_name.as_str())
                {
                    self.free_entity(ent);
                    inhibit += 1;
                    continue;
                }
                self.edicts[ent].spawn_flags &= !LEGACY_SPAWN_FLAGS;
            }

            // kept for respawns
            self.edicts[ent].map_origin = self.edicts[ent].s.origin;

            self.call_spawn(ent);
        }

        info!("{} records, {} inhibited, {} skipped", record, inhibit, skipped);

        self.reset_teams();
        self.reset_vote();
        self.find_teams();

        Ok(())
    }

    /// Chain entities sharing a `team` key. The first in slot order is the
    /// master; the rest are flagged as slaves and linked in order.
    pub fn find_teams(&mut self) {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

        for i in 1..self.num_edicts {
            let e = &self.edicts[i];
            if !e.in_use || e.team.is_empty() || e.flags.contains(EntityFlags::TEAM_SLAVE) {
                continue;
            }
            match groups.iter_mut().find(|(name, _)| *name == e.team) {
                Some((_, members)) => members.push(i),
                None => groups.push((e.team.clone(), vec![i])),
            }
        }

        let mut count = 0;
        for (_, members) in &groups {
            let master = self.entity_ref(members[0]);
            for (pos, &m) in members.iter().enumerate() {
                self.edicts[m].team_master = Some(master);
                if pos > 0 {
                    let next = self.entity_ref(m);
                    self.edicts[members[pos - 1]].team_chain = Some(next);
                    self.edicts[m].flags |= EntityFlags::TEAM_SLAVE;
                }
            }
            count += members.len();
        }

        debug!("{} teams with {} entities", groups.len(), count);
    }

    // ============================================================
    // worldspawn
    // ============================================================

    /// Only used for the world. Level rules come from the map list entry,
    /// then the worldspawn keys, then the cvars.
    pub fn sp_worldspawn(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.move_type = MoveType::Push;
        e.solid = Solid::Bsp;
        e.in_use = true;
        e.s.model1 = 1;
        let message = e.message.clone();

        let map: Option<MapListEntry> = self.map_list.find(&self.level.name).cloned();
        let map = map.as_ref();
        let st = self.st.clone();

        self.level.title = if !message.is_empty() {
            message
        } else if let Some(title) = map.map(|m| m.title.clone()).filter(|t| !t.is_empty()) {
            title
        } else {
            self.level.name.clone()
        };
        let title = self.level.title.clone();
        self.gi.set_config_string(CS_NAME, &title);

        let sky = resolve_str(map.map(|m| m.sky.as_str()), &st.sky, "unit1_");
        self.gi.set_config_string(CS_SKY, &sky);

        let weather = resolve_str(map.map(|m| m.weather.as_str()), &st.weather, "none");
        self.gi.set_config_string(CS_WEATHER, &weather);

        self.set_item_names();

        let cvars = self.gi.cvars();
        let gravity = resolve_int(map.map(|m| m.gravity), &st.gravity, cvars.integer("g_gravity"));
        let gameplay_cvar = Gameplay::parse(cvars.string("g_gameplay"));
        let teams = resolve_int(map.map(|m| m.teams), &st.teams, cvars.integer("g_teams"));
        let ctf = resolve_int(map.map(|m| m.ctf), &st.ctf, cvars.integer("g_ctf"));
        let match_ = resolve_int(map.map(|m| m.match_), &st.match_, cvars.integer("g_match"));
        let rounds = resolve_int(map.map(|m| m.rounds), &st.rounds, cvars.integer("g_rounds"));
        let frag_limit = resolve_int(map.map(|m| m.frag_limit), &st.frag_limit, cvars.integer("g_frag_limit"));
        let round_limit = resolve_int(map.map(|m| m.round_limit), &st.round_limit, cvars.integer("g_round_limit"));
        let capture_limit =
            resolve_int(map.map(|m| m.capture_limit), &st.capture_limit, cvars.integer("g_capture_limit"));
        let time_limit_cvar = cvars.value("g_time_limit");

        let level = &mut self.level;
        level.gravity = if gravity > 0 { gravity } else { 800 };

        level.gameplay = match map.and_then(|m| m.gameplay()) {
            Some(g) => g,
            None if !st.gameplay.is_empty() => Gameplay::parse(&st.gameplay),
            None => gameplay_cvar,
        };

        level.teams = teams != 0;
        level.ctf = ctf != 0;
        if level.teams && level.ctf {
            level.teams = false;
        }

        level.match_ = match_ != 0;
        level.rounds = rounds != 0;
        if level.match_ && level.rounds {
            level.match_ = false;
        }

        level.frag_limit = frag_limit.max(0);
        level.round_limit = round_limit.max(0);
        level.capture_limit = capture_limit.max(0);

        let minutes = match map.map(|m| m.time_limit).filter(|&t| t > MAP_LIST_UNSET as f32) {
            Some(t) => t,
            None if !st.time_limit.is_empty() => atof(&st.time_limit),
            None => time_limit_cvar,
        };
        level.time_limit = (minutes.max(0.0) * 60_000.0) as u32;

        level.give = resolve_str(map.map(|m| m.give.as_str()), &st.give, "");
        level.music = resolve_str(map.map(|m| m.music.as_str()), &st.music, "");

        self.worldspawn_music();
        self.publish_rules();

        for w in Weapon::ALL {
            self.gi.model_index(w.info().model);
        }
        for sound in [
            "world/water_in",
            "world/water_out",
            "weapons/common/no_ammo",
            "weapons/common/pickup",
            "weapons/common/switch",
        ] {
            self.gi.sound_index(sound);
        }

        self.gi.set_config_string(CS_VOTE, "");
        let good = self.team(TeamId::Good).name.clone();
        let evil = self.team(TeamId::Evil).name.clone();
        self.gi.set_config_string(CS_TEAM_GOOD, &good);
        self.gi.set_config_string(CS_TEAM_EVIL, &evil);

        info!(
            "{} ({}): {}, gravity {}",
            self.level.name,
            self.level.title,
            self.level.gameplay.name(),
            self.level.gravity
        );
    }

    /// Comma separated tracks go to the music config strings from index 1.
    fn worldspawn_music(&mut self) {
        let music = self.level.music.clone();
        let tracks = music.split(',').map(str::trim).filter(|t| !t.is_empty());
        for (i, track) in (1..MAX_MUSICS).zip(tracks) {
            self.gi.set_config_string(CS_MUSICS + i, track);
        }
    }

    /// Rule config strings the HUD and server browser read.
    pub fn publish_rules(&mut self) {
        let level = &self.level;
        let values = [
            (CS_GAMEPLAY, level.gameplay as i32),
            (CS_TEAMS, level.teams as i32),
            (CS_CTF, level.ctf as i32),
            (CS_MATCH, level.match_ as i32),
            (CS_ROUNDS, level.rounds as i32),
        ];
        for (index, value) in values {
            self.gi.set_config_string(index, &value.to_string());
        }
    }
}
