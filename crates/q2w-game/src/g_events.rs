// g_events.rs — server commands, temp entity events and their wire encoding
//
// Every payload is fixed per event type and must match the client game's
// decoder byte for byte.

use q2w_common::msg::MessageWriter;

use crate::g_local::{GameCtx, Vec3};
use crate::game_import::Multicast;

// server commands sent directly to the client game
pub const SV_CMD_CGAME: u8 = 16;
pub const SV_CMD_CENTER_PRINT: u8 = SV_CMD_CGAME;
pub const SV_CMD_MUZZLE_FLASH: u8 = SV_CMD_CGAME + 1;
pub const SV_CMD_SCORES: u8 = SV_CMD_CGAME + 2;
pub const SV_CMD_TEMP_ENTITY: u8 = SV_CMD_CGAME + 3;

// temp entity types
pub const TE_BLASTER: u8 = 0;
pub const TE_TRACER: u8 = 1;
pub const TE_BULLET: u8 = 2;
pub const TE_BURN: u8 = 3;
pub const TE_BLOOD: u8 = 4;
pub const TE_SPARKS: u8 = 5;
pub const TE_HYPERBLASTER: u8 = 6;
pub const TE_LIGHTNING: u8 = 7;
pub const TE_RAIL: u8 = 8;
pub const TE_EXPLOSION: u8 = 9;
pub const TE_BUBBLES: u8 = 10;
pub const TE_BFG: u8 = 11;
pub const TE_GIB: u8 = 12;
pub const TE_BFG_LASER: u8 = 13;
pub const TE_RIPPLE: u8 = 14;
pub const TE_TELEPORT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MuzzleFlash {
    Blaster = 0,
    Shotgun,
    SuperShotgun,
    Machinegun,
    Grenade,
    Rocket,
    Hyperblaster,
    Lightning,
    Railgun,
    Bfg,
    Logout,
}

/// A one-shot event at a location separate from any entity.
#[derive(Debug, Clone, PartialEq)]
pub enum TempEvent {
    Blaster { pos: Vec3, dir: Vec3, color: u8 },
    Tracer { start: Vec3, end: Vec3 },
    Bullet { pos: Vec3, dir: Vec3 },
    Burn { pos: Vec3, dir: Vec3, size: u8 },
    Blood { pos: Vec3, dir: Vec3 },
    Sparks { pos: Vec3, dir: Vec3 },
    Hyperblaster { pos: Vec3 },
    Lightning { pos: Vec3 },
    Rail { start: Vec3, end: Vec3, flags: i32, color: u8 },
    Explosion { pos: Vec3 },
    Bubbles { start: Vec3, end: Vec3 },
    Bfg { pos: Vec3 },
    Gib { pos: Vec3 },
    BfgLaser { start: Vec3, end: Vec3 },
    Ripple { pos: Vec3, size: u8, viewable: bool },
    Teleport { pos: Vec3 },
}

impl TempEvent {
    pub fn type_code(&self) -> u8 {
        match self {
            TempEvent::Blaster { .. } => TE_BLASTER,
            TempEvent::Tracer { .. } => TE_TRACER,
            TempEvent::Bullet { .. } => TE_BULLET,
            TempEvent::Burn { .. } => TE_BURN,
            TempEvent::Blood { .. } => TE_BLOOD,
            TempEvent::Sparks { .. } => TE_SPARKS,
            TempEvent::Hyperblaster { .. } => TE_HYPERBLASTER,
            TempEvent::Lightning { .. } => TE_LIGHTNING,
            TempEvent::Rail { .. } => TE_RAIL,
            TempEvent::Explosion { .. } => TE_EXPLOSION,
            TempEvent::Bubbles { .. } => TE_BUBBLES,
            TempEvent::Bfg { .. } => TE_BFG,
            TempEvent::Gib { .. } => TE_GIB,
            TempEvent::BfgLaser { .. } => TE_BFG_LASER,
            TempEvent::Ripple { .. } => TE_RIPPLE,
            TempEvent::Teleport { .. } => TE_TELEPORT,
        }
    }

    /// Append `SV_CMD_TEMP_ENTITY`, the type code and the payload.
    pub fn write(&self, msg: &mut MessageWriter) {
        msg.write_byte(SV_CMD_TEMP_ENTITY as i32)
            .write_byte(self.type_code() as i32);

        match self {
            // the blaster direction travels as a full position
            TempEvent::Blaster { pos, dir, color } => {
                msg.write_position(pos).write_position(dir).write_byte(*color as i32);
            }
            TempEvent::Tracer { start, end }
            | TempEvent::Bubbles { start, end }
            | TempEvent::BfgLaser { start, end } => {
                msg.write_position(start).write_position(end);
            }
            TempEvent::Bullet { pos, dir }
            | TempEvent::Blood { pos, dir }
            | TempEvent::Sparks { pos, dir } => {
                msg.write_position(pos).write_dir(dir);
            }
            TempEvent::Burn { pos, dir, size } => {
                msg.write_position(pos).write_dir(dir).write_byte(*size as i32);
            }
            TempEvent::Rail { start, end, flags, color } => {
                msg.write_position(start)
                    .write_position(end)
                    .write_long(*flags)
                    .write_byte(*color as i32);
            }
            TempEvent::Ripple { pos, size, viewable } => {
                msg.write_position(pos)
                    .write_byte(*size as i32)
                    .write_byte(*viewable as i32);
            }
            TempEvent::Hyperblaster { pos }
            | TempEvent::Lightning { pos }
            | TempEvent::Explosion { pos }
            | TempEvent::Bfg { pos }
            | TempEvent::Gib { pos }
            | TempEvent::Teleport { pos } => {
                msg.write_position(pos);
            }
        }
    }
}

impl GameCtx {
    /// Flush the pending message to every client in range of `origin`.
    pub fn multicast(&mut self, origin: &Vec3, to: Multicast) {
        let data = self.msg.take();
        self.gi.multicast(origin, to, &data);
    }

    /// Flush the pending message to one client.
    pub fn unicast(&mut self, ent: usize, reliable: bool) {
        let data = self.msg.take();
        self.gi.unicast(ent, reliable, &data);
    }

    pub fn temp_event(&mut self, event: &TempEvent, origin: &Vec3, to: Multicast) {
        event.write(&mut self.msg);
        self.multicast(origin, to);
    }

    pub fn center_print(&mut self, ent: usize, text: &str) {
        self.msg
            .write_byte(SV_CMD_CENTER_PRINT as i32)
            .write_string(text);
        self.unicast(ent, true);
    }

    pub fn muzzle_flash(&mut self, ent: usize, flash: MuzzleFlash, color: Option<u8>) {
        self.msg
            .write_byte(SV_CMD_MUZZLE_FLASH as i32)
            .write_short(ent as i32)
            .write_byte(flash as i32);
        if let Some(color) = color {
            self.msg.write_byte(color as i32);
        }
        let origin = self.edicts[ent].s.origin;
        self.multicast(&origin, Multicast::Phs);
    }
}
