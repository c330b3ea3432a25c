//! Game import interface: functions provided by the engine to the game module.
//!
//! The engine hands the game a boxed implementation at construction time and
//! every subsystem reaches it through `GameCtx::gi`. There are no globals.

use q2w_common::cvar::CvarRegistry;
use q2w_common::q_shared::{PmoveData, Trace, Vec3};

use crate::g_local::Solid;

/// Reach of a multicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multicast {
    All,
    AllReliable,
    Phs,
    Pvs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrintLevel {
    Low,
    Medium,
    High,
    Chat,
    TeamChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    None,
    Norm,
    Idle,
    Static,
}

/// What the engine needs to place an entity in its collision world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkState {
    pub origin: Vec3,
    pub angles: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub abs_mins: Vec3,
    pub abs_maxs: Vec3,
    pub solid: Solid,
    pub owner: Option<usize>,
    pub sv_flags: u32,
    pub clip_mask: i32,
    pub model: u16,
}

/// Result of binding an inline or external model to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelInfo {
    pub index: u16,
    pub mins: Vec3,
    pub maxs: Vec3,
}

pub trait GameImport {
    // console
    fn print(&mut self, msg: &str);
    fn bprint(&mut self, level: PrintLevel, msg: &str);
    fn cprint(&mut self, ent: usize, level: PrintLevel, msg: &str);

    /// Fatal. The engine tears the game module down after this returns.
    fn error(&mut self, msg: &str);

    fn cvars(&mut self) -> &mut CvarRegistry;

    // config strings and precache
    fn set_config_string(&mut self, index: usize, value: &str);
    fn model_index(&mut self, name: &str) -> u16;
    fn sound_index(&mut self, name: &str) -> u16;
    fn image_index(&mut self, name: &str) -> u16;
    fn set_model(&mut self, name: &str) -> ModelInfo;

    // audio
    fn sound(&mut self, ent: usize, sound: u16, atten: Attenuation);
    fn positioned_sound(&mut self, origin: &Vec3, ent: Option<usize>, sound: u16, atten: Attenuation);

    // collision
    fn trace(
        &mut self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        pass_ent: Option<usize>,
        mask: i32,
    ) -> Trace;
    fn point_contents(&mut self, point: &Vec3) -> i32;
    fn in_pvs(&mut self, p1: &Vec3, p2: &Vec3) -> bool;
    fn in_phs(&mut self, p1: &Vec3, p2: &Vec3) -> bool;
    fn set_area_portal_state(&mut self, portal: i32, open: bool);
    fn link_entity(&mut self, ent: usize, link: &LinkState);
    fn unlink_entity(&mut self, ent: usize);

    // network
    fn multicast(&mut self, origin: &Vec3, to: Multicast, data: &[u8]);
    fn unicast(&mut self, ent: usize, reliable: bool, data: &[u8]);

    /// Shared player movement. Reads and writes `pm` in place.
    fn pmove(&mut self, pm: &mut PmoveData);

    fn add_command_string(&mut self, text: &str);
    fn load_file(&mut self, path: &str) -> Option<String>;

    /// Server frames per second.
    fn frame_rate(&self) -> u32;
}
