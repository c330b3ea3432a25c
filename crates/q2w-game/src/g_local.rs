// g_local.rs — local definitions for the game module

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

pub use q2w_common::q_shared::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use q2w_common::msg::MessageWriter;

use crate::dispatch::{BlockedFn, DieFn, MoveDoneFn, PainFn, ThinkFn, TouchFn, UseFn};
use crate::g_map_list::MapList;
use crate::game_import::{Attenuation, GameImport};

pub const GAME_NAME: &str = "default";

// edict->spawn_flags
pub const SF_NOT_DEATHMATCH: u32 = 0x0000_0800;

// edict->flags
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        const FLY          = 0x0000_0001;
        const SWIM         = 0x0000_0002;
        const GOD_MODE     = 0x0000_0004;
        const TEAM_SLAVE   = 0x0000_0008;
        const NO_KNOCKBACK = 0x0000_0010;
    }
}

// damage flags
pub const DAMAGE_RADIUS: u32 = 0x0000_0001;
pub const DAMAGE_NO_ARMOR: u32 = 0x0000_0002;
pub const DAMAGE_ENERGY: u32 = 0x0000_0004;
pub const DAMAGE_BULLET: u32 = 0x0000_0008;
pub const DAMAGE_NO_PROTECTION: u32 = 0x0000_0010;

// means of death
pub const MOD_UNKNOWN: u32 = 0;
pub const MOD_BLASTER: u32 = 1;
pub const MOD_SHOTGUN: u32 = 2;
pub const MOD_SUPER_SHOTGUN: u32 = 3;
pub const MOD_MACHINEGUN: u32 = 4;
pub const MOD_GRENADE: u32 = 5;
pub const MOD_GRENADE_SPLASH: u32 = 6;
pub const MOD_ROCKET: u32 = 7;
pub const MOD_ROCKET_SPLASH: u32 = 8;
pub const MOD_HYPERBLASTER: u32 = 9;
pub const MOD_LIGHTNING: u32 = 10;
pub const MOD_LIGHTNING_DISCHARGE: u32 = 11;
pub const MOD_RAILGUN: u32 = 12;
pub const MOD_BFG_LASER: u32 = 13;
pub const MOD_BFG_BLAST: u32 = 14;
pub const MOD_WATER: u32 = 15;
pub const MOD_SLIME: u32 = 16;
pub const MOD_LAVA: u32 = 17;
pub const MOD_CRUSH: u32 = 18;
pub const MOD_TELEFRAG: u32 = 19;
pub const MOD_FALLING: u32 = 20;
pub const MOD_SUICIDE: u32 = 21;
pub const MOD_EXPLOSIVE: u32 = 22;
pub const MOD_TRIGGER_HURT: u32 = 23;
pub const MOD_FRIENDLY_FIRE: u32 = 0x0800_0000;

// config strings local to the game and client game
pub const CS_GAMEPLAY: usize = CS_GENERAL;
pub const CS_TEAMS: usize = CS_GENERAL + 1;
pub const CS_CTF: usize = CS_GENERAL + 2;
pub const CS_MATCH: usize = CS_GENERAL + 3;
pub const CS_ROUNDS: usize = CS_GENERAL + 4;
pub const CS_TEAM_GOOD: usize = CS_GENERAL + 5;
pub const CS_TEAM_EVIL: usize = CS_GENERAL + 6;
pub const CS_TIME: usize = CS_GENERAL + 7;
pub const CS_ROUND: usize = CS_GENERAL + 8;
pub const CS_VOTE: usize = CS_GENERAL + 9;

// voting
pub const MAX_VOTE_TIME: u32 = 60_000;
pub const VOTE_MAJORITY: f32 = 0.51;

pub const INTERMISSION_TIME: u32 = 10_000;
pub const COUNTDOWN_TIME: u32 = 10_000;

// ============================================================
// Entity enums
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Solid {
    #[default]
    Not,
    Trigger,
    Box,
    Missile,
    Dead,
    Bsp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveType {
    /// Never moves; only thinks.
    #[default]
    None,
    /// Origin and angles change with no interaction.
    NoClip,
    /// No clip to world, push on box contact.
    Push,
    /// No clip to world, stop on box contact.
    Stop,
    Walk,
    Fly,
    Toss,
    Bounce,
}

/// Readable alias for entities that exist only to think.
pub const MOVE_TYPE_THINK: MoveType = MoveType::None;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveState {
    Top,
    #[default]
    Bottom,
    GoingUp,
    GoingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gameplay {
    #[default]
    Default,
    Deathmatch,
    Instagib,
    Arena,
}

impl Gameplay {
    pub fn from_i32(i: i32) -> Self {
        match i {
            1 => Gameplay::Deathmatch,
            2 => Gameplay::Instagib,
            3 => Gameplay::Arena,
            _ => Gameplay::Default,
        }
    }

    /// Accepts a number or a (prefix of a) mode name.
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(i) = s.parse::<i32>() {
            return Self::from_i32(i);
        }
        if s.starts_with("insta") {
            Gameplay::Instagib
        } else if s.starts_with("arena") {
            Gameplay::Arena
        } else if s.starts_with("death") || s.starts_with("dm") {
            Gameplay::Deathmatch
        } else {
            Gameplay::Default
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gameplay::Default => "Default",
            Gameplay::Deathmatch => "Deathmatch",
            Gameplay::Instagib => "Instagib",
            Gameplay::Arena => "Arena",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamId {
    Good,
    Evil,
}

impl TeamId {
    pub fn index(self) -> usize {
        match self {
            TeamId::Good => 0,
            TeamId::Evil => 1,
        }
    }

    pub fn other(self) -> TeamId {
        match self {
            TeamId::Good => TeamId::Evil,
            TeamId::Evil => TeamId::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vote {
    #[default]
    NoOp,
    Yes,
    No,
}

// ============================================================
// Inventory
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmmoType {
    Shells,
    Bullets,
    Grenades,
    Rockets,
    Cells,
    Bolts,
    Slugs,
    Nukes,
}

pub const NUM_AMMO: usize = 8;

impl AmmoType {
    pub const ALL: [AmmoType; NUM_AMMO] = [
        AmmoType::Shells,
        AmmoType::Bullets,
        AmmoType::Grenades,
        AmmoType::Rockets,
        AmmoType::Cells,
        AmmoType::Bolts,
        AmmoType::Slugs,
        AmmoType::Nukes,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AmmoType::Shells => "shells",
            AmmoType::Bullets => "bullets",
            AmmoType::Grenades => "grenades",
            AmmoType::Rockets => "rockets",
            AmmoType::Cells => "cells",
            AmmoType::Bolts => "bolts",
            AmmoType::Slugs => "slugs",
            AmmoType::Nukes => "nukes",
        }
    }

    pub fn default_max(self) -> i16 {
        match self {
            AmmoType::Shells => 80,
            AmmoType::Bullets => 200,
            AmmoType::Grenades => 50,
            AmmoType::Rockets => 50,
            AmmoType::Cells => 200,
            AmmoType::Bolts => 150,
            AmmoType::Slugs => 50,
            AmmoType::Nukes => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weapon {
    Blaster,
    Shotgun,
    SuperShotgun,
    Machinegun,
    GrenadeLauncher,
    RocketLauncher,
    Hyperblaster,
    Lightning,
    Railgun,
    Bfg10k,
}

pub const NUM_WEAPONS: usize = 10;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WeaponSet: u16 {
        const BLASTER          = 1 << 0;
        const SHOTGUN          = 1 << 1;
        const SUPER_SHOTGUN    = 1 << 2;
        const MACHINEGUN       = 1 << 3;
        const GRENADE_LAUNCHER = 1 << 4;
        const ROCKET_LAUNCHER  = 1 << 5;
        const HYPERBLASTER     = 1 << 6;
        const LIGHTNING        = 1 << 7;
        const RAILGUN          = 1 << 8;
        const BFG10K           = 1 << 9;
    }
}

impl Weapon {
    pub const ALL: [Weapon; NUM_WEAPONS] = [
        Weapon::Blaster,
        Weapon::Shotgun,
        Weapon::SuperShotgun,
        Weapon::Machinegun,
        Weapon::GrenadeLauncher,
        Weapon::RocketLauncher,
        Weapon::Hyperblaster,
        Weapon::Lightning,
        Weapon::Railgun,
        Weapon::Bfg10k,
    ];

    pub fn bit(self) -> WeaponSet {
        WeaponSet::from_bits_truncate(1 << self as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ArmorType {
    #[default]
    None,
    Jacket,
    Combat,
    Body,
}

// ============================================================
// Entity references
// ============================================================

/// Weak, generation-checked handle to an entity slot. A handle whose slot
/// was freed (and possibly reused) no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub index: usize,
    pub generation: u32,
}

// ============================================================
// Mover state
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct MoveInfo {
    // fixed data
    pub start_origin: Vec3,
    pub start_angles: Vec3,
    pub end_origin: Vec3,
    pub end_angles: Vec3,

    pub sound_start: u16,
    pub sound_middle: u16,
    pub sound_end: u16,

    pub accel: f32,
    pub speed: f32,
    pub decel: f32,
    pub distance: f32,

    /// Seconds.
    pub wait: f32,

    // state data
    pub state: MoveState,
    /// Where the current linear move ends.
    pub dest: Vec3,
    pub dir: Vec3,
    pub current_speed: f32,
    pub move_speed: f32,
    pub next_speed: f32,
    pub remaining_distance: f32,
    pub decel_distance: f32,
    pub done: Option<MoveDoneFn>,
}

// ============================================================
// Edict
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct Edict {
    pub s: EntityState,
    /// Index into `GameCtx::clients`, `None` if not a player.
    pub client: Option<usize>,
    pub in_use: bool,
    pub generation: u32,
    /// Freed this frame; the slot is not handed out again until the sweep.
    pub pending_free: bool,
    pub linked: bool,
    pub link_count: i32,

    pub sv_flags: u32,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub abs_mins: Vec3,
    pub abs_maxs: Vec3,
    pub size: Vec3,
    pub solid: Solid,
    pub clip_mask: i32,
    pub owner: Option<EntityRef>,

    pub class_name: String,
    pub model: String,
    pub free_time: u32,
    pub spawn_flags: u32,
    pub flags: EntityFlags,

    pub message: String,
    pub target: String,
    pub target_name: String,
    pub kill_target: String,
    pub path_target: String,
    pub team: String,

    pub move_type: MoveType,
    pub move_info: MoveInfo,
    pub timestamp: u32,

    pub velocity: Vec3,
    pub avelocity: Vec3,
    pub mass: f32,
    pub gravity: f32,

    pub speed: f32,
    pub accel: f32,
    pub decel: f32,
    pub move_dir: Vec3,
    pub pos1: Vec3,
    pub pos2: Vec3,

    /// Absolute level time in ms; 0 means no think is scheduled.
    pub next_think: u32,
    pub think: Option<ThinkFn>,
    pub touch: Option<TouchFn>,
    pub use_fn: Option<UseFn>,
    pub blocked: Option<BlockedFn>,
    pub pain: Option<PainFn>,
    pub die: Option<DieFn>,

    pub touch_time: u32,
    pub ripple_time: u32,
    /// Last jump pad sound.
    pub push_time: u32,

    pub health: i32,
    pub max_health: i32,
    pub dead: bool,
    pub take_damage: bool,

    pub dmg: i32,
    pub knockback: i32,
    /// Per-hit damage carried by beams between fire frames.
    pub damage: i32,
    pub damage_radius: f32,
    pub sounds: i32,
    pub count: i32,
    pub noise_index: u16,
    pub attenuation: Option<Attenuation>,

    /// Seconds.
    pub wait: f32,
    pub delay: f32,
    pub random: f32,

    pub enemy: Option<EntityRef>,
    pub activator: Option<EntityRef>,
    pub target_ent: Option<EntityRef>,
    pub team_chain: Option<EntityRef>,
    pub team_master: Option<EntityRef>,
    pub ground_entity: Option<EntityRef>,
    pub ground_entity_link_count: i32,
    pub lightning: Option<EntityRef>,
    pub hook: Option<EntityRef>,

    pub water_type: i32,
    pub water_level: i32,
    pub old_water_level: i32,

    pub area_portal: i32,

    pub plane: CPlane,
    pub surf: Option<CSurface>,

    pub map_origin: Vec3,

    /// Pickups only, see `g_items::item`.
    pub item: Option<usize>,
}

impl Edict {
    pub fn is_client(&self) -> bool {
        self.client.is_some()
    }

    /// Center of the absolute bounds.
    pub fn abs_center(&self) -> Vec3 {
        vector_mix(&self.abs_mins, &self.abs_maxs, 0.5)
    }
}

// ============================================================
// Clients
// ============================================================

/// Client data that persists through respawns.
#[derive(Debug, Clone, Default)]
pub struct ClientPersistent {
    /// Frame the client entered the game.
    pub first_frame: u32,

    pub user_info: String,
    pub net_name: String,
    pub skin: String,
    pub score: i16,
    pub captures: i16,
    /// Rounds won.
    pub rounds: i16,

    pub health: i16,
    pub max_health: i16,
    pub armor: i16,
    pub max_armor: i16,
    pub armor_type: ArmorType,

    pub weapons: WeaponSet,
    pub ammo: [i16; NUM_AMMO],
    pub max_ammo: [i16; NUM_AMMO],
    pub weapon: Option<Weapon>,
    pub last_weapon: Option<Weapon>,

    pub spectator: bool,
    pub ready: bool,
    pub muted: bool,

    pub team: Option<TeamId>,
    pub vote: Vote,
    pub match_num: u32,
    pub round_num: u32,
    pub color: i32,
}

/// Per-life client state, cleared on each respawn.
#[derive(Debug, Clone, Default)]
pub struct ClientLocals {
    pub cmd: UserCmd,

    pub show_scores: bool,
    pub scores_time: u32,

    pub buttons: u8,
    pub old_buttons: u8,
    pub latched_buttons: u8,

    pub weapon_fire_time: u32,
    pub weapon_change_time: u32,

    pub damage_armor: i16,
    pub damage_health: i16,
    pub damage_inflicted: i16,

    pub speed: f32,
    pub angles: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub cmd_angles: Vec3,
    pub old_velocity: Vec3,

    pub respawn_time: u32,
    pub respawn_protection_time: u32,
    pub ground_time: u32,
    pub drown_time: u32,
    pub sizzle_time: u32,
    pub land_time: u32,
    pub jump_time: u32,
    pub footstep_time: u32,
    pub pain_time: u32,
    pub chat_time: u32,

    pub quad_damage_time: u32,
    pub quad_attack_time: u32,

    pub pickup_msg_time: u32,
    /// The enemy flag, while carrying it.
    pub flag: Option<TeamId>,

    pub hook_pull: bool,

    pub chase_target: Option<EntityRef>,
    pub old_chase_target: Option<EntityRef>,
}

#[derive(Debug, Clone, Default)]
pub struct Client {
    /// Communicated by the server to clients.
    pub ps: PlayerState,
    pub ping: u32,
    pub connected: bool,

    pub persistent: ClientPersistent,
    pub locals: ClientLocals,
}

// ============================================================
// Level and teams
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct Team {
    pub name: String,
    pub skin: String,
    pub score: i16,
    pub captures: i16,
    pub rounds: i16,
    pub name_time: u32,
    pub skin_time: u32,
}

impl Team {
    pub fn good() -> Self {
        Self {
            name: "Good".into(),
            skin: "qforcer/blue".into(),
            ..Default::default()
        }
    }

    pub fn evil() -> Self {
        Self {
            name: "Evil".into(),
            skin: "qforcer/red".into(),
            ..Default::default()
        }
    }
}

/// Cleared as each map is entered.
#[derive(Debug, Clone, Default)]
pub struct Level {
    pub frame_num: u32,
    /// Milliseconds since the level started.
    pub time: u32,

    pub title: String,
    pub name: String,
    pub gravity: i32,
    pub gameplay: Gameplay,
    pub teams: bool,
    pub ctf: bool,
    pub match_: bool,
    pub rounds: bool,
    pub frag_limit: i32,
    pub round_limit: i32,
    pub capture_limit: i32,
    /// Milliseconds; 0 is unlimited.
    pub time_limit: u32,
    pub give: String,
    pub music: String,

    pub intermission_time: u32,
    pub intermission_origin: Vec3,
    pub intermission_angle: Vec3,
    pub change_map: Option<String>,

    /// Shared by match and round countdowns.
    pub warmup: bool,

    pub start_match: bool,
    pub match_time: u32,
    pub match_num: u32,

    pub start_round: bool,
    pub round_time: u32,
    pub round_num: u32,

    pub vote_cmd: String,
    pub votes: [u32; 3],
    pub vote_time: u32,

    pub means_of_death: u32,
    pub current_entity: Option<usize>,
    pub last_time_string: u32,
}

/// Editor keys with no runtime home on the entity.
#[derive(Debug, Clone, Default)]
pub struct SpawnTemp {
    // world vars are kept as strings to tell 0 from unset
    pub sky: String,
    pub weather: String,
    pub gravity: String,
    pub gameplay: String,
    pub teams: String,
    pub ctf: String,
    pub match_: String,
    pub rounds: String,
    pub frag_limit: String,
    pub round_limit: String,
    pub capture_limit: String,
    pub time_limit: String,
    pub give: String,
    pub music: String,

    pub lip: i32,
    pub distance: i32,
    pub height: i32,
    pub noise: String,
}

// ============================================================
// Game context
// ============================================================

/// Everything the simulation owns, passed by reference to every subsystem.
pub struct GameCtx {
    pub gi: Box<dyn GameImport>,

    pub edicts: Vec<Edict>,
    pub clients: Vec<Client>,
    /// High-water mark of slots ever handed out.
    pub num_edicts: usize,
    pub max_entities: usize,
    pub max_clients: usize,

    pub level: Level,
    pub teams: [Team; 2],
    pub st: SpawnTemp,
    pub map_list: MapList,

    /// Outgoing message under construction.
    pub msg: MessageWriter,
    pub rng: StdRng,
}

pub type GameContext = GameCtx;

impl GameCtx {
    pub fn new(gi: Box<dyn GameImport>, max_clients: usize, max_entities: usize) -> Self {
        let max_entities = max_entities.max(max_clients + 64).min(MAX_EDICTS);
        let mut ctx = Self {
            gi,
            edicts: vec![Edict::default(); max_entities],
            clients: vec![Client::default(); max_clients],
            num_edicts: max_clients + 1,
            max_entities,
            max_clients,
            level: Level::default(),
            teams: [Team::good(), Team::evil()],
            st: SpawnTemp::default(),
            map_list: MapList::default(),
            msg: MessageWriter::with_capacity(1400),
            rng: StdRng::from_entropy(),
        };
        ctx.reset_edicts();
        ctx
    }

    /// Lay out the world and the reserved client slots.
    pub fn reset_edicts(&mut self) {
        for (i, e) in self.edicts.iter_mut().enumerate() {
            let generation = e.generation;
            *e = Edict::default();
            e.generation = generation.wrapping_add(1);
            e.s.number = i as u16;
            if (1..=self.max_clients).contains(&i) {
                e.client = Some(i - 1);
            }
        }
        self.num_edicts = self.max_clients + 1;
    }

    // ---- time ----

    pub fn frame_millis(&self) -> u32 {
        1000 / self.gi.frame_rate().max(1)
    }

    pub fn frame_seconds(&self) -> f32 {
        self.frame_millis() as f32 / 1000.0
    }

    // ---- random ----

    /// Uniform in [0, 1).
    pub fn frand(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform in [-1, 1).
    pub fn crand(&mut self) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }

    pub fn randomi(&mut self, n: usize) -> usize {
        if n == 0 {
            0
        } else {
            self.rng.gen_range(0..n)
        }
    }

    // ---- clients ----

    pub fn client(&self, ent: usize) -> Option<&Client> {
        self.edicts.get(ent)?.client.map(|c| &self.clients[c])
    }

    pub fn client_mut(&mut self, ent: usize) -> Option<&mut Client> {
        let c = self.edicts.get(ent)?.client?;
        self.clients.get_mut(c)
    }

    /// True for player slots whose client record is connected.
    pub fn is_live_client(&self, ent: usize) -> bool {
        self.edicts[ent].in_use && self.client(ent).map(|c| c.connected).unwrap_or(false)
    }

    pub fn team(&self, id: TeamId) -> &Team {
        &self.teams[id.index()]
    }

    pub fn team_mut(&mut self, id: TeamId) -> &mut Team {
        &mut self.teams[id.index()]
    }

    pub fn team_of(&self, ent: usize) -> Option<TeamId> {
        self.client(ent).and_then(|c| c.persistent.team)
    }
}
