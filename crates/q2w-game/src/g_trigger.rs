// g_trigger.rs — touch volumes: multiple, once, relay, always, push, hurt, teleport

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

use crate::dispatch::{ThinkFn, TouchFn, UseFn};
use crate::g_local::*;
use crate::g_utils::{set_move_dir, vtos};
use crate::game::SVF_NO_CLIENT;
use crate::game_import::Attenuation;

const TRIGGER_TRIGGERED: u32 = 1;

const PUSH_ONCE: u32 = 1;
const PUSH_EFFECT: u32 = 2;

const HURT_START_OFF: u32 = 1;
const HURT_TOGGLE: u32 = 2;
const HURT_NO_PROTECTION: u32 = 8;
const HURT_SLOW: u32 = 16;

const TELEPORTER_NO_EFFECT: u32 = 4;

/// Pitch and yaw of the teleport hold, in pmove time units.
const TELEPORT_HOLD_TIME: u16 = 20;

impl GameCtx {
    /// Brush volume shared by the touch triggers.
    fn init_trigger(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        if !vector_is_zero(&e.s.angles) {
            e.move_dir = set_move_dir(&mut e.s.angles);
        }

        e.solid = Solid::Trigger;
        e.move_type = MoveType::None;
        self.set_brush_model(ent);
        self.edicts[ent].sv_flags = SVF_NO_CLIENT;
    }

    // =========================================================
    // trigger_multiple, trigger_once
    // =========================================================

    /// The wait has passed; `next_think` is already clear so the trigger
    /// can fire again.
    pub fn trigger_multiple_wait(&mut self, ent: usize) {
        self.edicts[ent].next_think = 0;
    }

    fn trigger_multiple_fire(&mut self, ent: usize) {
        // still waiting
        if self.edicts[ent].next_think != 0 {
            return;
        }

        let activator = self.resolve(self.edicts[ent].activator);
        self.use_targets(ent, activator);

        if !self.edicts[ent].in_use {
            return;
        }

        let time = self.level.time;
        let frame_millis = self.frame_millis();
        let e = &mut self.edicts[ent];
        if e.wait > 0.0 {
            e.think = Some(ThinkFn::TriggerMultipleWait);
            e.next_think = time + (e.wait * 1000.0) as u32;
        } else {
            // touched from inside a scan, so free on the next frame
            e.touch = None;
            e.think = Some(ThinkFn::FreeEntity);
            e.next_think = time + frame_millis;
        }
    }

    pub fn trigger_multiple_use(&mut self, ent: usize, activator: Option<usize>) {
        // a TRIGGERED trigger is switched on by its first use
        if self.edicts[ent].solid == Solid::Not {
            self.edicts[ent].solid = Solid::Trigger;
            self.link_entity(ent);
            return;
        }

        self.edicts[ent].activator = activator.map(|a| self.entity_ref(a));
        self.trigger_multiple_fire(ent);
    }

    pub fn trigger_multiple_touch(&mut self, ent: usize, other: usize) {
        let Some(client) = self.client(other) else {
            return;
        };

        // directional triggers only fire for players facing along move_dir
        let move_dir = self.edicts[ent].move_dir;
        if !vector_is_zero(&move_dir) && dot_product(&client.locals.forward, &move_dir) < 0.0 {
            return;
        }

        self.edicts[ent].activator = Some(self.entity_ref(other));
        self.trigger_multiple_fire(ent);
    }

    /// Fires its targets each time a player passes through, at most once
    /// per `wait` seconds.
    pub fn sp_trigger_multiple(&mut self, ent: usize) {
        self.edicts[ent].noise_index = self.gi.sound_index("misc/chat");

        let e = &mut self.edicts[ent];
        if e.wait == 0.0 {
            e.wait = 0.2;
        }
        e.touch = Some(TouchFn::TriggerMultiple);
        e.use_fn = Some(UseFn::TriggerMultiple);
        e.move_type = MoveType::None;
        e.sv_flags |= SVF_NO_CLIENT;

        e.solid = if e.spawn_flags & TRIGGER_TRIGGERED != 0 {
            Solid::Not
        } else {
            Solid::Trigger
        };

        if !vector_is_zero(&e.s.angles) {
            e.move_dir = set_move_dir(&mut e.s.angles);
        }

        self.set_brush_model(ent);
        self.link_entity(ent);
    }

    pub fn sp_trigger_once(&mut self, ent: usize) {
        self.edicts[ent].wait = -1.0;
        self.sp_trigger_multiple(ent);
    }

    // =========================================================
    // trigger_relay, trigger_always
    // =========================================================

    pub fn trigger_relay_use(&mut self, ent: usize, activator: Option<usize>) {
        self.use_targets(ent, activator);
    }

    pub fn sp_trigger_relay(&mut self, ent: usize) {
        self.edicts[ent].use_fn = Some(UseFn::TriggerRelay);
    }

    /// Fires once, shortly after the level spawns.
    pub fn sp_trigger_always(&mut self, ent: usize) {
        // targets spawned later in the lump must exist first
        if self.edicts[ent].delay < 0.2 {
            self.edicts[ent].delay = 0.2;
        }
        self.use_targets(ent, Some(ent));
    }

    // =========================================================
    // trigger_push
    // =========================================================

    pub fn trigger_push_touch(&mut self, ent: usize, other: usize) {
        if self.edicts[other].health > 0 {
            let time = self.level.time;
            let push = vector_scale(&self.edicts[ent].move_dir, self.edicts[ent].speed * 10.0);
            self.edicts[other].velocity = push;

            // no landing damage from the launch
            if let Some(client) = self.client_mut(other) {
                client.ps.pmove.pm_flags |= PMF_PUSHED;
            }

            if self.edicts[other].push_time < time {
                self.edicts[other].push_time = time + 1500;
                let sound = self.gi.sound_index("world/jumppad");
                self.gi.sound(other, sound, Attenuation::Norm);
            }
        }

        if self.edicts[ent].spawn_flags & PUSH_ONCE != 0 {
            self.free_entity(ent);
        }
    }

    /// Jump pad: launches along its angles at ten times `speed`.
    pub fn sp_trigger_push(&mut self, ent: usize) {
        self.init_trigger(ent);

        let e = &mut self.edicts[ent];
        e.touch = Some(TouchFn::TriggerPush);
        if e.speed == 0.0 {
            e.speed = 100.0;
        }
        self.link_entity(ent);

        if self.edicts[ent].spawn_flags & PUSH_EFFECT == 0 {
            return;
        }

        let Ok(fx) = self.alloc_entity("trigger_push_effects") else {
            return;
        };
        let center = vector_mix(&self.edicts[ent].mins, &self.edicts[ent].maxs, 0.5);
        let f = &mut self.edicts[fx];
        f.solid = Solid::Trigger;
        f.move_type = MoveType::None;
        f.s.origin = center;
        f.s.effects = EF_TELEPORTER;
        self.link_entity(fx);
    }

    // =========================================================
    // trigger_hurt
    // =========================================================

    pub fn trigger_hurt_use(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.solid = if e.solid == Solid::Not {
            Solid::Trigger
        } else {
            Solid::Not
        };
        self.link_entity(ent);

        let e = &mut self.edicts[ent];
        if e.spawn_flags & HURT_TOGGLE == 0 {
            e.use_fn = None;
        }
    }

    pub fn trigger_hurt_touch(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].take_damage {
            debug!("{} ignores {}", self.etos(ent), self.etos(other));
            return;
        }

        let time = self.level.time;
        if self.edicts[ent].timestamp > time {
            return;
        }

        let e = &mut self.edicts[ent];
        e.timestamp = time + if e.spawn_flags & HURT_SLOW != 0 { 1000 } else { 100 };

        let dflags = if e.spawn_flags & HURT_NO_PROTECTION != 0 {
            DAMAGE_NO_PROTECTION
        } else {
            DAMAGE_NO_ARMOR
        };
        let dmg = e.dmg;
        let origin = self.edicts[other].s.origin;

        self.damage(other, ent, ent, &VEC3_ORIGIN, &origin, &VEC3_ORIGIN, dmg, dmg, dflags, MOD_TRIGGER_HURT);
    }

    /// Hurts anything inside it every 100 ms, or every second when SLOW.
    pub fn sp_trigger_hurt(&mut self, ent: usize) {
        self.init_trigger(ent);

        let e = &mut self.edicts[ent];
        e.touch = Some(TouchFn::TriggerHurt);
        if e.dmg == 0 {
            e.dmg = 2;
        }

        e.solid = if e.spawn_flags & HURT_START_OFF != 0 {
            Solid::Not
        } else {
            Solid::Trigger
        };

        if e.spawn_flags & HURT_TOGGLE != 0 {
            e.use_fn = Some(UseFn::TriggerHurt);
        }

        self.link_entity(ent);
    }

    // =========================================================
    // trigger_teleport, misc_teleporter_dest
    // =========================================================

    pub fn trigger_teleport_touch(&mut self, ent: usize, other: usize) {
        if self.client(other).is_none() {
            return;
        }

        let target = self.edicts[ent].target.clone();
        let Some(dest) = self.find_by_target_name(None, &target) else {
            debug!("{} could not find destination {}", self.etos(ent), target);
            return;
        };

        // out of the way of the kill box
        self.unlink_entity(other);

        let (dest_origin, dest_angles) = (self.edicts[dest].s.origin, self.edicts[dest].s.angles);

        let e = &mut self.edicts[other];
        e.s.origin = dest_origin;
        e.s.old_origin = dest_origin;
        e.s.origin[2] += 10.0;

        // keep the horizontal speed, redirected along the destination
        e.velocity[2] = 0.0;
        let speed = vector_length(&e.velocity);
        let (forward, _, _) = angle_vectors_tuple(&dest_angles);
        e.velocity = vector_scale(&forward, speed);
        e.velocity[2] = 150.0;

        e.s.angles = VEC3_ORIGIN;
        e.s.event = EntityEvent::ClientTeleport;
        self.edicts[ent].s.event = EntityEvent::ClientTeleport;

        let client = &mut self.clients[other - 1];
        client.ps.pmove.pm_time = TELEPORT_HOLD_TIME;
        client.ps.pmove.pm_flags |= PMF_TIME_TELEPORT;
        client.ps.pmove.delta_angles = vector_subtract(&dest_angles, &client.locals.cmd_angles);
        client.locals.cmd_angles = VEC3_ORIGIN;
        client.locals.angles = VEC3_ORIGIN;

        // telefrag whoever is standing there
        self.kill_box(other);

        self.link_entity(other);
    }

    /// Sends touching players to the entity named by `target`. Without a
    /// brush model it is a pad with the teleporter effect.
    pub fn sp_misc_teleporter(&mut self, ent: usize) {
        if self.edicts[ent].target.is_empty() {
            debug!("teleporter with no target at {}", vtos(&self.edicts[ent].s.origin));
            self.free_entity(ent);
            return;
        }

        let e = &mut self.edicts[ent];
        e.solid = Solid::Trigger;
        e.move_type = MoveType::None;

        if !e.model.is_empty() {
            self.set_brush_model(ent);
            self.edicts[ent].sv_flags = SVF_NO_CLIENT;
        } else {
            e.mins = [-32.0, -32.0, -24.0];
            e.maxs = [32.0, 32.0, -16.0];

            let mut below = e.s.origin;
            below[2] -= 16.0;

            // no effect on a buried pad
            let no_effect = e.spawn_flags & TELEPORTER_NO_EFFECT != 0;
            if !no_effect && self.gi.point_contents(&below) == 0 {
                let hum = self.gi.sound_index("world/teleport_hum");
                let e = &mut self.edicts[ent];
                e.s.effects = EF_TELEPORTER;
                e.s.sound = hum;
            }
        }

        self.edicts[ent].touch = Some(TouchFn::TriggerTeleport);
        self.link_entity(ent);
    }

    /// Destination marker for teleporters.
    pub fn sp_misc_teleporter_dest(&mut self, ent: usize) {
        self.edicts[ent].sv_flags |= SVF_NO_CLIENT;
    }
}
