// game.rs — game module interface visible to the server

use q2w_common::q_shared::UserCmd;

use crate::error::GameResult;

pub const GAME_API_VERSION: u32 = 6;

// edict->sv_flags
pub const SVF_NO_CLIENT: u32 = 0x0000_0001;
pub const SVF_PROJECTILE: u32 = 0x0000_0002;

/// The export table. The engine drives the game exclusively through these
/// hooks; `ent` is always a player slot in `1..=max_clients`.
pub trait GameExport {
    fn api_version(&self) -> u32 {
        GAME_API_VERSION
    }

    fn init(&mut self) -> GameResult<()>;
    fn shutdown(&mut self);

    /// Populate the entity store for a freshly loaded map.
    fn spawn_entities(&mut self, name: &str, entities: &str) -> GameResult<()>;

    /// Refusal is reported as `GameError::ConnectRefused` carrying the reason
    /// to show the player.
    fn client_connect(&mut self, ent: usize, user_info: &str) -> GameResult<()>;
    fn client_begin(&mut self, ent: usize);
    fn client_user_info_changed(&mut self, ent: usize, user_info: &str);
    fn client_disconnect(&mut self, ent: usize);
    fn client_command(&mut self, ent: usize, args: &str);
    fn client_think(&mut self, ent: usize, cmd: &UserCmd);

    fn frame(&mut self);

    /// Short mode summary for server browsers, e.g. `Deathmatch, Teams`.
    fn game_name(&self) -> String;
}
