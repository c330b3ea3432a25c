#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::manual_range_contains,
         clippy::needless_range_loop, clippy::float_cmp, clippy::comparison_chain)]
// Deathmatch game module: entity simulation, combat and match rules

pub mod error;
pub mod dispatch;
pub mod game_import;
pub mod game;
pub mod g_local;
pub mod g_utils;
pub mod g_events;
pub mod g_combat;
pub mod g_weapon;
pub mod g_phys;
pub mod g_map_list;
pub mod g_main;
pub mod g_trigger;
pub mod g_spawn;
pub mod g_chase;
pub mod g_cmds;
pub mod g_misc;
pub mod g_items;
pub mod g_func;
pub mod p_hud;
pub mod p_view;
pub mod p_weapon;
pub mod p_client;

#[cfg(test)]
mod test_support;

pub use error::{GameError, GameResult};
pub use g_local::GameCtx;
pub use game::GameExport;
pub use game_import::GameImport;
