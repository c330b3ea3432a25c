#![allow(clippy::too_many_arguments, clippy::needless_range_loop, clippy::float_cmp)]
// Engine-shared types used by the game module and its host

pub mod q_shared;
pub mod msg;
pub mod cvar;
