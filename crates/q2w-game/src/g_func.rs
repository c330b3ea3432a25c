// g_func.rs — brush movers: plats, doors, buttons, trains, rotators, timers

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

use crate::dispatch::{BlockedFn, DieFn, MoveDoneFn, ThinkFn, TouchFn, UseFn};
use crate::g_local::*;
use crate::g_utils::{set_move_dir, vtos};
use crate::game::SVF_NO_CLIENT;
use crate::game_import::Attenuation;

// =========================================================
// Spawn flags
// =========================================================

const PLAT_LOW_TRIGGER: u32 = 1;

const ROTATING_START_ON: u32 = 1;
const ROTATING_REVERSE: u32 = 2;
const ROTATING_X_AXIS: u32 = 4;
const ROTATING_Y_AXIS: u32 = 8;
const ROTATING_TOUCH_PAIN: u32 = 16;
const ROTATING_STOP: u32 = 32;

const DOOR_START_OPEN: u32 = 1;
const DOOR_TOGGLE: u32 = 2;
const DOOR_REVERSE: u32 = 4;
const DOOR_X_AXIS: u32 = 8;
const DOOR_Y_AXIS: u32 = 16;

const WALL_TRIGGER_SPAWN: u32 = 1;
const WALL_TOGGLE: u32 = 2;
const WALL_START_ON: u32 = 4;

const TRAIN_START_ON: u32 = 1;
const TRAIN_TOGGLE: u32 = 2;
const TRAIN_BLOCK_STOPS: u32 = 4;

const PATH_CORNER_TELEPORT: u32 = 1;

const TIMER_START_ON: u32 = 1;

const CONVEYOR_START_ON: u32 = 1;
const CONVEYOR_TOGGLE: u32 = 2;

/// Distance covered while ramping from rest to `target` at `rate` per frame.
fn acceleration_distance(target: f32, rate: f32) -> f32 {
    target * ((target / rate) + 1.0) / 2.0
}

/// Pick the peak speed and the point where deceleration must begin.
/// Speeds are in units per frame.
fn update_acceleration(mi: &mut MoveInfo) {
    mi.move_speed = mi.speed;

    if mi.remaining_distance < mi.accel {
        mi.current_speed = mi.remaining_distance;
        return;
    }

    let accel_dist = acceleration_distance(mi.speed, mi.accel);
    let mut decel_dist = acceleration_distance(mi.speed, mi.decel);

    // too short to reach full speed, so solve for the peak
    if mi.remaining_distance - accel_dist - decel_dist < 0.0 {
        let v = (mi.accel + mi.decel) / (mi.accel * mi.decel);
        mi.move_speed = (-2.0 + (4.0 + 8.0 * v * mi.remaining_distance).sqrt()) / (2.0 * v);
        decel_dist = acceleration_distance(mi.move_speed, mi.decel);
    }

    mi.decel_distance = decel_dist;
}

/// Advance the speed for the coming frame.
fn accelerate(mi: &mut MoveInfo) {
    // decelerating
    if mi.remaining_distance <= mi.decel_distance {
        if mi.remaining_distance < mi.decel_distance {
            if mi.next_speed != 0.0 {
                mi.current_speed = mi.next_speed;
                mi.next_speed = 0.0;
                return;
            }
            // never slow below one step of deceleration
            if mi.current_speed > mi.decel {
                mi.current_speed -= mi.decel;
            }
        }
        return;
    }

    // at full speed and crossing into the deceleration zone this frame
    if mi.current_speed == mi.move_speed && mi.remaining_distance - mi.current_speed < mi.decel_distance {
        let p1_distance = mi.remaining_distance - mi.decel_distance;
        let p2_distance = mi.move_speed * (1.0 - (p1_distance / mi.move_speed));
        let distance = p1_distance + p2_distance;
        mi.current_speed = mi.move_speed;
        mi.next_speed = mi.move_speed - mi.decel * (p2_distance / distance);
        return;
    }

    if mi.current_speed < mi.speed {
        let old_speed = mi.current_speed;

        mi.current_speed = (mi.current_speed + mi.accel).min(mi.speed);

        // accelerating for the whole frame
        if mi.remaining_distance - mi.current_speed >= mi.decel_distance {
            return;
        }

        // the frame crosses into deceleration, so blend the two speeds
        let p1_distance = mi.remaining_distance - mi.decel_distance;
        let p1_speed = (old_speed + mi.move_speed) / 2.0;
        let p2_distance = mi.move_speed * (1.0 - (p1_distance / p1_speed));
        let distance = p1_distance + p2_distance;
        mi.current_speed = (p1_speed * (p1_distance / distance)) + (mi.move_speed * (p2_distance / distance));
        mi.next_speed = mi.move_speed - mi.decel * (p2_distance / distance);
    }
}

impl GameCtx {
    // =========================================================
    // Linear moves
    // =========================================================

    pub fn move_info_done(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.velocity = VEC3_ORIGIN;

        // pusher moves are snapped to eighths, so land exactly
        if e.s.origin != e.move_info.dest {
            e.s.origin = e.move_info.dest;
            self.link_entity(ent);
        }

        self.call_move_done(ent);
    }

    /// The last partial frame of a move.
    pub fn move_info_end(&mut self, ent: usize) {
        let frame_seconds = self.frame_seconds();
        let frame_millis = self.frame_millis();
        let time = self.level.time;

        let e = &mut self.edicts[ent];
        let remaining = vector_subtract(&e.move_info.dest, &e.s.origin);
        if vector_is_zero(&remaining) {
            self.move_info_done(ent);
            return;
        }

        e.velocity = vector_scale(&remaining, 1.0 / frame_seconds);
        e.think = Some(ThinkFn::MoveDone);
        e.next_think = time + frame_millis;
    }

    /// Constant speed: travel whole frames, then finish with `move_info_end`.
    pub fn move_info_constant(&mut self, ent: usize) {
        let frame_seconds = self.frame_seconds();
        let frame_millis = self.frame_millis();
        let time = self.level.time;

        let e = &mut self.edicts[ent];
        let speed = e.move_info.speed;
        if speed * frame_seconds >= e.move_info.remaining_distance {
            self.move_info_end(ent);
            return;
        }

        e.velocity = vector_scale(&e.move_info.dir, speed);

        let frames = (e.move_info.remaining_distance / speed / frame_seconds).floor();
        e.move_info.remaining_distance -= frames * speed * frame_seconds;
        e.next_think = time + frames as u32 * frame_millis;
        e.think = Some(ThinkFn::MoveEnd);
    }

    pub fn move_info_accelerative(&mut self, ent: usize) {
        let frame_rate = self.gi.frame_rate() as f32;
        let frame_millis = self.frame_millis();
        let time = self.level.time;

        let e = &mut self.edicts[ent];
        let mi = &mut e.move_info;
        mi.remaining_distance -= mi.current_speed;

        // starting, or restarting after being blocked
        if mi.current_speed == 0.0 {
            update_acceleration(mi);
        }

        accelerate(mi);

        // the rest fits in the next frame
        if mi.remaining_distance <= mi.current_speed {
            self.move_info_end(ent);
            return;
        }

        e.velocity = vector_scale(&e.move_info.dir, e.move_info.current_speed * frame_rate);
        e.next_think = time + frame_millis;
        e.think = Some(ThinkFn::MoveAccelerative);
    }

    /// The entity whose frame drives this mover's timing.
    fn move_team_leader(&self, ent: usize) -> Option<usize> {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            self.resolve(self.edicts[ent].team_master)
        } else {
            Some(ent)
        }
    }

    /// Start a linear move to `dest`, calling `done` on arrival.
    pub fn move_info_init(&mut self, ent: usize, dest: Vec3, done: MoveDoneFn) {
        let frame_millis = self.frame_millis();
        let time = self.level.time;
        let runs_now = self.level.current_entity.is_some() && self.level.current_entity == self.move_team_leader(ent);

        let e = &mut self.edicts[ent];
        e.velocity = VEC3_ORIGIN;

        let mut dir = vector_subtract(&dest, &e.s.origin);
        e.move_info.remaining_distance = vector_normalize(&mut dir);
        e.move_info.dir = dir;
        e.move_info.dest = dest;
        e.move_info.done = Some(done);

        let mi = &e.move_info;
        if mi.speed == mi.accel && mi.speed == mi.decel {
            if runs_now {
                self.move_info_constant(ent);
            } else {
                e.next_think = time + frame_millis;
                e.think = Some(ThinkFn::MoveConstant);
            }
        } else {
            e.move_info.current_speed = 0.0;
            e.think = Some(ThinkFn::MoveAccelerative);
            e.next_think = time + frame_millis;
        }
    }

    // =========================================================
    // Angular moves
    // =========================================================

    fn angular_move_remaining(&self, ent: usize) -> Vec3 {
        let e = &self.edicts[ent];
        let target = if e.move_info.state == MoveState::GoingUp {
            e.move_info.end_angles
        } else {
            e.move_info.start_angles
        };
        vector_subtract(&target, &e.s.angles)
    }

    pub fn move_info_angular_done(&mut self, ent: usize) {
        self.edicts[ent].avelocity = VEC3_ORIGIN;
        self.call_move_done(ent);
    }

    pub fn move_info_angular_final(&mut self, ent: usize) {
        let mv = self.angular_move_remaining(ent);
        if vector_is_zero(&mv) {
            self.move_info_angular_done(ent);
            return;
        }

        let frame_seconds = self.frame_seconds();
        let next = self.level.time + self.frame_millis();
        let e = &mut self.edicts[ent];
        e.avelocity = vector_scale(&mv, 1.0 / frame_seconds);
        e.think = Some(ThinkFn::AngularDone);
        e.next_think = next;
    }

    pub fn move_info_angular_begin(&mut self, ent: usize) {
        let mv = self.angular_move_remaining(ent);
        let frame_seconds = self.frame_seconds();

        let time = vector_length(&mv) / self.edicts[ent].move_info.speed;
        if time < frame_seconds {
            self.move_info_angular_final(ent);
            return;
        }

        let frames = (time / frame_seconds).floor() as u32;
        let next = self.level.time + frames * self.frame_millis();
        let e = &mut self.edicts[ent];
        e.avelocity = vector_scale(&mv, 1.0 / time);
        e.next_think = next;
        e.think = Some(ThinkFn::AngularFinal);
    }

    pub fn move_info_angular_init(&mut self, ent: usize, done: MoveDoneFn) {
        let runs_now = self.level.current_entity.is_some() && self.level.current_entity == self.move_team_leader(ent);
        let next = self.level.time + self.frame_millis();

        let e = &mut self.edicts[ent];
        e.avelocity = VEC3_ORIGIN;
        e.move_info.done = Some(done);

        if runs_now {
            self.move_info_angular_begin(ent);
        } else {
            e.next_think = next;
            e.think = Some(ThinkFn::AngularBegin);
        }
    }

    // =========================================================
    // Shared mover helpers
    // =========================================================

    fn mover_sound_start(&mut self, ent: usize) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }
        let mi = &self.edicts[ent].move_info;
        let (start, middle) = (mi.sound_start, mi.sound_middle);
        if start != 0 {
            self.gi.sound(ent, start, Attenuation::Idle);
        }
        self.edicts[ent].s.sound = middle;
    }

    fn mover_sound_end(&mut self, ent: usize) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }
        let end = self.edicts[ent].move_info.sound_end;
        if end != 0 {
            self.gi.sound(ent, end, Attenuation::Idle);
        }
        self.edicts[ent].s.sound = 0;
    }

    /// The master followed by every slave of its team.
    fn team_members(&self, master: usize) -> Vec<usize> {
        let mut members = Vec::new();
        let mut part = Some(master);
        while let Some(p) = part {
            if members.contains(&p) {
                warn!("{} has a looping team chain", self.etos(master));
                break;
            }
            members.push(p);
            part = self.resolve(self.edicts[p].team_chain);
        }
        members
    }

    /// Copy the spawn speeds and end points into the move info.
    fn init_move_info(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.move_info.speed = e.speed;
        e.move_info.accel = e.accel;
        e.move_info.decel = e.decel;
        e.move_info.wait = e.wait;
        e.move_info.start_origin = e.pos1;
        e.move_info.start_angles = e.s.angles;
        e.move_info.end_origin = e.pos2;
        e.move_info.end_angles = e.s.angles;
    }

    /// Travel along `move_dir` for the model's extent less the lip.
    fn move_extent(&self, ent: usize, lip: f32) -> f32 {
        let e = &self.edicts[ent];
        e.move_dir[0].abs() * e.size[0] + e.move_dir[1].abs() * e.size[1] + e.move_dir[2].abs() * e.size[2] - lip
    }

    fn crush(&mut self, ent: usize, other: usize) {
        let origin = self.edicts[other].s.origin;
        let dmg = self.edicts[ent].dmg;
        self.damage(other, ent, ent, &VEC3_ORIGIN, &origin, &VEC3_ORIGIN, dmg, 1, 0, MOD_CRUSH);
    }

    // =========================================================
    // func_plat
    // =========================================================

    pub fn func_plat_up(&mut self, ent: usize) {
        self.mover_sound_end(ent);
        let time = self.level.time;
        let e = &mut self.edicts[ent];
        e.move_info.state = MoveState::Top;
        e.think = Some(ThinkFn::PlatGoDown);
        e.next_think = time + 3000;
    }

    pub fn func_plat_down(&mut self, ent: usize) {
        self.mover_sound_end(ent);
        self.edicts[ent].move_info.state = MoveState::Bottom;
    }

    pub fn func_plat_go_down(&mut self, ent: usize) {
        self.mover_sound_start(ent);
        self.edicts[ent].move_info.state = MoveState::GoingDown;
        let dest = self.edicts[ent].move_info.end_origin;
        self.move_info_init(ent, dest, MoveDoneFn::PlatDown);
    }

    pub fn func_plat_go_up(&mut self, ent: usize) {
        self.mover_sound_start(ent);
        self.edicts[ent].move_info.state = MoveState::GoingUp;
        let dest = self.edicts[ent].move_info.start_origin;
        self.move_info_init(ent, dest, MoveDoneFn::PlatUp);
    }

    pub fn func_plat_blocked(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() {
            return;
        }

        self.crush(ent, other);

        match self.edicts[ent].move_info.state {
            MoveState::GoingUp => self.func_plat_go_down(ent),
            MoveState::GoingDown => self.func_plat_go_up(ent),
            _ => {}
        }
    }

    pub fn func_plat_use(&mut self, ent: usize) {
        // already moved at least once
        if self.edicts[ent].think.is_some() {
            return;
        }
        self.func_plat_go_down(ent);
    }

    /// Touch of the trigger volume; `enemy` is the plat itself.
    pub fn func_plat_touch(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() || self.edicts[other].health <= 0 {
            return;
        }

        let Some(plat) = self.resolve(self.edicts[ent].enemy) else {
            return;
        };

        match self.edicts[plat].move_info.state {
            MoveState::Bottom => self.func_plat_go_up(plat),
            // still riding, so hold at the top
            MoveState::Top => self.edicts[plat].next_think = self.level.time + 1000,
            _ => {}
        }
    }

    fn func_plat_create_trigger(&mut self, ent: usize, lip: f32) {
        let Ok(trigger) = self.alloc_entity("plat_trigger") else {
            return;
        };

        let plat = self.entity_ref(ent);
        let p = &self.edicts[ent];

        let mut tmin = [p.mins[0] + 25.0, p.mins[1] + 25.0, p.mins[2]];
        let mut tmax = [p.maxs[0] - 25.0, p.maxs[1] - 25.0, p.maxs[2] + 8.0];

        tmin[2] = tmax[2] - (p.pos1[2] - p.pos2[2] + lip);

        if p.spawn_flags & PLAT_LOW_TRIGGER != 0 {
            tmax[2] = tmin[2] + 8.0;
        }

        for i in 0..2 {
            if tmax[i] - tmin[i] <= 0.0 {
                tmin[i] = (p.mins[i] + p.maxs[i]) * 0.5;
                tmax[i] = tmin[i] + 1.0;
            }
        }

        let t = &mut self.edicts[trigger];
        t.touch = Some(TouchFn::PlatTrigger);
        t.move_type = MoveType::None;
        t.solid = Solid::Trigger;
        t.enemy = Some(plat);
        t.mins = tmin;
        t.maxs = tmax;
        self.link_entity(trigger);
    }

    /// Rising platform. Placed raised, spawns lowered unless targeted.
    pub fn sp_func_plat(&mut self, ent: usize) {
        let frame_rate = self.gi.frame_rate().max(1) as f32;

        let e = &mut self.edicts[ent];
        e.s.angles = VEC3_ORIGIN;
        e.solid = Solid::Bsp;
        e.move_type = MoveType::Push;
        self.set_brush_model(ent);

        let e = &mut self.edicts[ent];
        e.blocked = Some(BlockedFn::Plat);

        if e.speed == 0.0 {
            e.speed = 200.0;
        }
        e.speed *= 0.5;
        if e.accel == 0.0 {
            e.accel = 50.0;
        }
        e.accel *= 0.1;
        if e.decel == 0.0 {
            e.decel = 50.0;
        }
        e.decel *= 0.1;

        // per frame, normalized to the server rate
        let v = 100.0 / (frame_rate * frame_rate);
        e.speed *= v;
        e.accel *= v;
        e.decel *= v;

        if e.dmg == 0 {
            e.dmg = 2;
        }

        let lip = (if self.st.lip != 0 { self.st.lip } else { 8 }) as f32;

        // pos1 is the top, pos2 the bottom
        e.pos1 = e.s.origin;
        e.pos2 = e.s.origin;
        if self.st.height != 0 {
            e.pos2[2] -= self.st.height as f32;
        } else {
            e.pos2[2] -= (e.maxs[2] - e.mins[2]) - lip;
        }

        e.use_fn = Some(UseFn::Plat);

        self.func_plat_create_trigger(ent, lip);

        let e = &mut self.edicts[ent];
        if !e.target_name.is_empty() {
            e.move_info.state = MoveState::GoingUp;
        } else {
            e.s.origin = e.pos2;
            e.move_info.state = MoveState::Bottom;
        }

        self.init_move_info(ent);

        let mi = &mut self.edicts[ent].move_info;
        mi.sound_start = self.gi.sound_index("world/plat_start");
        mi.sound_middle = self.gi.sound_index("world/plat_mid");
        mi.sound_end = self.gi.sound_index("world/plat_end");

        self.link_entity(ent);
    }

    // =========================================================
    // func_rotating
    // =========================================================

    pub fn func_rotating_blocked(&mut self, ent: usize, other: usize) {
        self.crush(ent, other);
    }

    pub fn func_rotating_touch(&mut self, ent: usize, other: usize) {
        if !vector_is_zero(&self.edicts[ent].avelocity) {
            self.crush(ent, other);
        }
    }

    pub fn func_rotating_use(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        if !vector_is_zero(&e.avelocity) {
            e.s.sound = 0;
            e.avelocity = VEC3_ORIGIN;
            e.touch = None;
        } else {
            e.s.sound = e.move_info.sound_middle;
            e.avelocity = vector_scale(&e.move_dir, e.speed);
            if e.spawn_flags & ROTATING_TOUCH_PAIN != 0 {
                e.touch = Some(TouchFn::Rotating);
            }
        }
    }

    pub fn sp_func_rotating(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.solid = Solid::Bsp;
        e.move_type = if e.spawn_flags & ROTATING_STOP != 0 {
            MoveType::Stop
        } else {
            MoveType::Push
        };

        e.move_dir = VEC3_ORIGIN;
        if e.spawn_flags & ROTATING_X_AXIS != 0 {
            e.move_dir[2] = 1.0;
        } else if e.spawn_flags & ROTATING_Y_AXIS != 0 {
            e.move_dir[0] = 1.0;
        } else {
            e.move_dir[1] = 1.0;
        }

        if e.spawn_flags & ROTATING_REVERSE != 0 {
            e.move_dir = vector_negate(&e.move_dir);
        }

        if e.speed == 0.0 {
            e.speed = 100.0;
        }
        if e.dmg == 0 {
            e.dmg = 2;
        }

        e.use_fn = Some(UseFn::Rotating);
        e.blocked = Some(BlockedFn::Rotating);

        if e.spawn_flags & ROTATING_START_ON != 0 {
            self.func_rotating_use(ent);
        }

        self.set_brush_model(ent);
        self.link_entity(ent);
    }

    // =========================================================
    // func_button
    // =========================================================

    pub fn func_button_done(&mut self, ent: usize) {
        self.edicts[ent].move_info.state = MoveState::Bottom;
    }

    pub fn func_button_reset(&mut self, ent: usize) {
        self.edicts[ent].move_info.state = MoveState::GoingDown;
        let dest = self.edicts[ent].move_info.start_origin;
        self.move_info_init(ent, dest, MoveDoneFn::ButtonDone);

        if self.edicts[ent].health != 0 {
            self.edicts[ent].take_damage = true;
        }
    }

    pub fn func_button_wait(&mut self, ent: usize) {
        self.edicts[ent].move_info.state = MoveState::Top;

        let activator = self.resolve(self.edicts[ent].activator);
        self.use_targets(ent, activator);

        if !self.edicts[ent].in_use {
            return;
        }

        let time = self.level.time;
        let e = &mut self.edicts[ent];
        if e.move_info.wait >= 0.0 {
            e.next_think = time + (e.move_info.wait * 1000.0) as u32;
            e.think = Some(ThinkFn::ButtonReset);
        }
    }

    fn func_button_activate(&mut self, ent: usize) {
        let state = self.edicts[ent].move_info.state;
        if matches!(state, MoveState::GoingUp | MoveState::Top) {
            return;
        }

        self.edicts[ent].move_info.state = MoveState::GoingUp;

        let sound = self.edicts[ent].move_info.sound_start;
        if sound != 0 && !self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            self.gi.sound(ent, sound, Attenuation::Idle);
        }

        let dest = self.edicts[ent].move_info.end_origin;
        self.move_info_init(ent, dest, MoveDoneFn::ButtonWait);
    }

    pub fn func_button_use(&mut self, ent: usize, activator: Option<usize>) {
        self.edicts[ent].activator = activator.map(|a| self.entity_ref(a));
        self.func_button_activate(ent);
    }

    pub fn func_button_touch(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() || self.edicts[other].health <= 0 {
            return;
        }
        self.edicts[ent].activator = Some(self.entity_ref(other));
        self.func_button_activate(ent);
    }

    pub fn func_button_die(&mut self, ent: usize, attacker: usize) {
        let attacker = self.entity_ref(attacker);
        let e = &mut self.edicts[ent];
        e.activator = Some(attacker);
        e.health = e.max_health;
        e.take_damage = false;
        self.func_button_activate(ent);
    }

    pub fn sp_func_button(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.move_dir = set_move_dir(&mut e.s.angles);
        e.move_type = MoveType::Stop;
        e.solid = Solid::Bsp;
        self.set_brush_model(ent);

        if self.edicts[ent].sounds != 1 {
            self.edicts[ent].move_info.sound_start = self.gi.sound_index("world/switch");
        }

        let e = &mut self.edicts[ent];
        if e.speed == 0.0 {
            e.speed = 40.0;
        }
        if e.accel == 0.0 {
            e.accel = e.speed;
        }
        if e.decel == 0.0 {
            e.decel = e.speed;
        }
        if e.wait == 0.0 {
            e.wait = 3.0;
        }

        let lip = (if self.st.lip != 0 { self.st.lip } else { 4 }) as f32;
        let dist = self.move_extent(ent, lip);

        let e = &mut self.edicts[ent];
        e.pos1 = e.s.origin;
        e.pos2 = vector_ma(&e.pos1, dist, &e.move_dir);

        e.use_fn = Some(UseFn::Button);

        if e.health != 0 {
            e.max_health = e.health;
            e.die = Some(DieFn::Button);
            e.take_damage = true;
        } else if e.target_name.is_empty() {
            e.touch = Some(TouchFn::Button);
        }

        e.move_info.state = MoveState::Bottom;
        self.init_move_info(ent);
        self.link_entity(ent);
    }

    // =========================================================
    // func_door, func_door_rotating, func_water
    // =========================================================

    fn func_door_use_area_portals(&mut self, ent: usize, open: bool) {
        let target = self.edicts[ent].target.clone();
        for t in self.find_all_by_target_name(&target) {
            if q_streq_nocase(&self.edicts[t].class_name, "func_areaportal") {
                let portal = self.edicts[t].area_portal;
                self.gi.set_area_portal_state(portal, open);
            }
        }
    }

    fn is_linear_door(&self, ent: usize) -> bool {
        self.edicts[ent].class_name == "func_door"
    }

    pub fn func_door_up(&mut self, ent: usize) {
        self.mover_sound_end(ent);

        let time = self.level.time;
        let e = &mut self.edicts[ent];
        e.move_info.state = MoveState::Top;

        if e.spawn_flags & DOOR_TOGGLE != 0 {
            return;
        }

        if e.move_info.wait >= 0.0 {
            e.think = Some(ThinkFn::DoorGoDown);
            e.next_think = time + (e.move_info.wait * 1000.0) as u32;
        }
    }

    pub fn func_door_down(&mut self, ent: usize) {
        self.mover_sound_end(ent);
        self.edicts[ent].move_info.state = MoveState::Bottom;
        self.func_door_use_area_portals(ent, false);
    }

    pub fn func_door_go_down(&mut self, ent: usize) {
        self.mover_sound_start(ent);

        let e = &mut self.edicts[ent];
        if e.max_health != 0 {
            e.take_damage = true;
            e.health = e.max_health;
        }
        e.move_info.state = MoveState::GoingDown;

        if self.is_linear_door(ent) {
            let dest = self.edicts[ent].move_info.start_origin;
            self.move_info_init(ent, dest, MoveDoneFn::DoorDown);
        } else {
            self.move_info_angular_init(ent, MoveDoneFn::DoorDown);
        }
    }

    fn func_door_go_up(&mut self, ent: usize, activator: Option<usize>) {
        let time = self.level.time;
        let e = &mut self.edicts[ent];
        match e.move_info.state {
            MoveState::GoingUp => return,
            MoveState::Top => {
                // reset the top wait
                if e.move_info.wait >= 0.0 {
                    e.next_think = time + (e.move_info.wait * 1000.0) as u32;
                }
                return;
            }
            _ => {}
        }

        self.mover_sound_start(ent);
        self.edicts[ent].move_info.state = MoveState::GoingUp;

        if self.is_linear_door(ent) {
            let dest = self.edicts[ent].move_info.end_origin;
            self.move_info_init(ent, dest, MoveDoneFn::DoorUp);
        } else {
            self.move_info_angular_init(ent, MoveDoneFn::DoorUp);
        }

        self.use_targets(ent, activator);
        if self.edicts[ent].in_use {
            self.func_door_use_area_portals(ent, true);
        }
    }

    pub fn func_door_use(&mut self, ent: usize, activator: Option<usize>) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }

        let closing = self.edicts[ent].spawn_flags & DOOR_TOGGLE != 0
            && matches!(self.edicts[ent].move_info.state, MoveState::GoingUp | MoveState::Top);

        // the whole team moves together
        for member in self.team_members(ent) {
            let m = &mut self.edicts[member];
            m.message.clear();
            m.touch = None;
            if closing {
                self.func_door_go_down(member);
            } else {
                self.func_door_go_up(member, activator);
            }
        }
    }

    /// Touch of the auto-spawned trigger around an untargeted door.
    pub fn func_door_touch_trigger(&mut self, ent: usize, other: usize) {
        if self.edicts[other].health <= 0 || !self.edicts[other].is_client() {
            return;
        }

        if self.level.time < self.edicts[ent].touch_time {
            return;
        }
        self.edicts[ent].touch_time = self.level.time + 1000;

        if let Some(door) = self.resolve(self.edicts[ent].owner) {
            self.func_door_use(door, Some(other));
        }
    }

    /// Make every member of the team finish its move in the same time.
    pub fn func_door_calculate_move(&mut self, ent: usize) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }

        let members = self.team_members(ent);
        let min = members
            .iter()
            .map(|&m| self.edicts[m].move_info.distance.abs())
            .fold(f32::INFINITY, f32::min);

        let time = min / self.edicts[ent].move_info.speed;
        if !(time > 0.0 && time.is_finite()) {
            debug!("{} has no distance to travel", self.etos(ent));
            return;
        }

        for m in members {
            let mi = &mut self.edicts[m].move_info;
            let new_speed = mi.distance.abs() / time;
            let ratio = new_speed / mi.speed;
            if mi.accel == mi.speed {
                mi.accel = new_speed;
            } else {
                mi.accel *= ratio;
            }
            if mi.decel == mi.speed {
                mi.decel = new_speed;
            } else {
                mi.decel *= ratio;
            }
            mi.speed = new_speed;
        }
    }

    pub fn func_door_create_trigger(&mut self, ent: usize) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }

        let mut mins = self.edicts[ent].abs_mins;
        let mut maxs = self.edicts[ent].abs_maxs;
        for m in self.team_members(ent).into_iter().skip(1) {
            add_point_to_bounds(&self.edicts[m].abs_mins, &mut mins, &mut maxs);
            add_point_to_bounds(&self.edicts[m].abs_maxs, &mut mins, &mut maxs);
        }

        for i in 0..2 {
            mins[i] -= 60.0;
            maxs[i] += 60.0;
        }

        if let Ok(trigger) = self.alloc_entity("door_trigger") {
            let owner = self.entity_ref(ent);
            let t = &mut self.edicts[trigger];
            t.mins = mins;
            t.maxs = maxs;
            t.owner = Some(owner);
            t.solid = Solid::Trigger;
            t.move_type = MoveType::None;
            t.touch = Some(TouchFn::DoorTrigger);
            self.link_entity(trigger);
        }

        if self.edicts[ent].spawn_flags & DOOR_START_OPEN != 0 {
            self.func_door_use_area_portals(ent, true);
        }

        self.func_door_calculate_move(ent);
    }

    pub fn func_door_blocked(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() {
            return;
        }

        self.crush(ent, other);

        // a door that never returns just keeps crushing
        if self.edicts[ent].move_info.wait < 0.0 {
            return;
        }

        let Some(master) = self.resolve(self.edicts[ent].team_master) else {
            return;
        };

        let reopen = self.edicts[ent].move_info.state == MoveState::GoingDown;
        for member in self.team_members(master) {
            if reopen {
                let activator = self.resolve(self.edicts[member].activator);
                self.func_door_go_up(member, activator);
            } else {
                self.func_door_go_down(member);
            }
        }
    }

    pub fn func_door_die(&mut self, ent: usize, attacker: usize) {
        let Some(master) = self.resolve(self.edicts[ent].team_master) else {
            return;
        };

        for member in self.team_members(master) {
            let m = &mut self.edicts[member];
            m.health = m.max_health;
            m.take_damage = false;
        }

        self.func_door_use(master, Some(attacker));
    }

    /// Targeted doors with a message print it to whoever bumps them.
    pub fn func_door_touch(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() {
            return;
        }

        if self.level.time < self.edicts[ent].touch_time {
            return;
        }
        self.edicts[ent].touch_time = self.level.time + 5000;

        let message = self.edicts[ent].message.clone();
        if !message.is_empty() {
            self.center_print(other, &message);
        }
        let sound = self.gi.sound_index("misc/chat");
        self.gi.sound(other, sound, Attenuation::Norm);
    }

    /// Shared tail of the door spawns.
    fn func_door_finish_spawn(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];

        // a lone door is a team of one
        if e.team.is_empty() {
            e.team_master = Some(EntityRef {
                index: ent,
                generation: e.generation,
            });
        }

        self.link_entity(ent);

        let next = self.level.time + self.frame_millis();
        let e = &mut self.edicts[ent];
        e.next_think = next;
        e.think = if e.health != 0 || !e.target_name.is_empty() {
            Some(ThinkFn::DoorCalculateMove)
        } else {
            Some(ThinkFn::DoorCreateTrigger)
        };
    }

    pub fn sp_func_door(&mut self, ent: usize) {
        if self.edicts[ent].sounds != 1 {
            let start = self.gi.sound_index("world/door_start");
            let end = self.gi.sound_index("world/door_end");
            let mi = &mut self.edicts[ent].move_info;
            mi.sound_start = start;
            mi.sound_end = end;
        }

        let e = &mut self.edicts[ent];
        e.move_dir = set_move_dir(&mut e.s.angles);
        e.move_type = MoveType::Push;
        e.solid = Solid::Bsp;
        self.set_brush_model(ent);

        let e = &mut self.edicts[ent];
        e.blocked = Some(BlockedFn::Door);
        e.use_fn = Some(UseFn::Door);

        if e.speed == 0.0 {
            e.speed = 100.0;
        }
        e.speed *= 2.0;
        if e.accel == 0.0 {
            e.accel = e.speed;
        }
        if e.decel == 0.0 {
            e.decel = e.speed;
        }
        if e.wait == 0.0 {
            e.wait = 3.0;
        }
        if e.dmg == 0 {
            e.dmg = 2;
        }

        let lip = (if self.st.lip != 0 { self.st.lip } else { 8 }) as f32;
        let distance = self.move_extent(ent, lip);

        let e = &mut self.edicts[ent];
        e.pos1 = e.s.origin;
        e.move_info.distance = distance;
        e.pos2 = vector_ma(&e.pos1, distance, &e.move_dir);

        // starts open, so operate in reverse
        if e.spawn_flags & DOOR_START_OPEN != 0 {
            std::mem::swap(&mut e.pos1, &mut e.pos2);
            e.s.origin = e.pos1;
        }

        e.move_info.state = MoveState::Bottom;

        if e.health != 0 {
            e.take_damage = true;
            e.die = Some(DieFn::Door);
            e.max_health = e.health;
        } else if !e.target_name.is_empty() && !e.message.is_empty() {
            self.gi.sound_index("misc/chat");
            self.edicts[ent].touch = Some(TouchFn::Door);
        }

        self.init_move_info(ent);
        self.func_door_finish_spawn(ent);
    }

    pub fn sp_func_door_rotating(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.s.angles = VEC3_ORIGIN;

        e.move_dir = VEC3_ORIGIN;
        if e.spawn_flags & DOOR_X_AXIS != 0 {
            e.move_dir[2] = 1.0;
        } else if e.spawn_flags & DOOR_Y_AXIS != 0 {
            e.move_dir[0] = 1.0;
        } else {
            e.move_dir[1] = 1.0;
        }

        if e.spawn_flags & DOOR_REVERSE != 0 {
            e.move_dir = vector_negate(&e.move_dir);
        }

        let distance = if self.st.distance != 0 {
            self.st.distance as f32
        } else {
            debug!("{} with no distance", self.etos(ent));
            90.0
        };

        let e = &mut self.edicts[ent];
        e.pos1 = e.s.angles;
        e.pos2 = vector_ma(&e.s.angles, distance, &e.move_dir);
        e.move_info.distance = distance;

        e.move_type = MoveType::Push;
        e.solid = Solid::Bsp;
        self.set_brush_model(ent);

        let e = &mut self.edicts[ent];
        e.blocked = Some(BlockedFn::Door);
        e.use_fn = Some(UseFn::Door);

        if e.speed == 0.0 {
            e.speed = 100.0;
        }
        if e.accel == 0.0 {
            e.accel = e.speed;
        }
        if e.decel == 0.0 {
            e.decel = e.speed;
        }
        if e.wait == 0.0 {
            e.wait = 3.0;
        }
        if e.dmg == 0 {
            e.dmg = 2;
        }

        if e.spawn_flags & DOOR_START_OPEN != 0 {
            std::mem::swap(&mut e.pos1, &mut e.pos2);
            e.s.angles = e.pos1;
            e.move_dir = vector_negate(&e.move_dir);
        }

        if e.health != 0 {
            e.take_damage = true;
            e.die = Some(DieFn::Door);
            e.max_health = e.health;
        }

        if !e.target_name.is_empty() && !e.message.is_empty() {
            e.touch = Some(TouchFn::Door);
            self.gi.sound_index("misc/chat");
        }

        let e = &mut self.edicts[ent];
        e.move_info.state = MoveState::Bottom;
        e.move_info.speed = e.speed;
        e.move_info.accel = e.accel;
        e.move_info.decel = e.decel;
        e.move_info.wait = e.wait;
        e.move_info.start_origin = e.s.origin;
        e.move_info.start_angles = e.pos1;
        e.move_info.end_origin = e.s.origin;
        e.move_info.end_angles = e.pos2;

        self.func_door_finish_spawn(ent);
    }

    /// A movable water brush, operated as a door.
    pub fn sp_func_water(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.move_dir = set_move_dir(&mut e.s.angles);
        e.move_type = MoveType::Push;
        e.solid = Solid::Bsp;
        self.set_brush_model(ent);

        let lip = self.st.lip as f32;
        let distance = self.move_extent(ent, lip);

        let e = &mut self.edicts[ent];
        e.pos1 = e.s.origin;
        e.move_info.distance = distance;
        e.pos2 = vector_ma(&e.pos1, distance, &e.move_dir);

        if e.spawn_flags & DOOR_START_OPEN != 0 {
            std::mem::swap(&mut e.pos1, &mut e.pos2);
            e.s.origin = e.pos1;
        }

        if e.speed == 0.0 {
            e.speed = 25.0;
        }
        e.accel = e.speed;
        e.decel = e.speed;

        if e.wait == 0.0 {
            e.wait = -1.0;
        }
        if e.wait == -1.0 {
            e.spawn_flags |= DOOR_TOGGLE;
        }

        e.move_info.state = MoveState::Bottom;
        e.use_fn = Some(UseFn::Door);
        e.class_name = "func_door".into();

        self.init_move_info(ent);
        self.link_entity(ent);
    }

    // =========================================================
    // func_train
    // =========================================================

    pub fn func_train_blocked(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() {
            return;
        }

        let time = self.level.time;
        if time < self.edicts[ent].touch_time || self.edicts[ent].dmg == 0 {
            return;
        }
        self.edicts[ent].touch_time = time + 500;

        self.crush(ent, other);
    }

    pub fn func_train_wait(&mut self, ent: usize) {
        if let Some(corner) = self.resolve(self.edicts[ent].target_ent) {
            if !self.edicts[corner].path_target.is_empty() {
                let activator = self.resolve(self.edicts[ent].activator);

                // fire the corner's path target in place of its next corner
                let path_target = self.edicts[corner].path_target.clone();
                let saved = std::mem::replace(&mut self.edicts[corner].target, path_target);
                self.use_targets(corner, activator);
                if self.edicts[corner].in_use {
                    self.edicts[corner].target = saved;
                }

                if !self.edicts[ent].in_use {
                    return;
                }
            }
        }

        let wait = self.edicts[ent].move_info.wait;
        if wait == 0.0 {
            self.func_train_next(ent);
            return;
        }

        if wait > 0.0 {
            let next = self.level.time + (wait * 1000.0) as u32;
            let e = &mut self.edicts[ent];
            e.next_think = next;
            e.think = Some(ThinkFn::TrainNext);
        } else if self.edicts[ent].spawn_flags & TRAIN_TOGGLE != 0 {
            self.func_train_next(ent);
            let e = &mut self.edicts[ent];
            e.spawn_flags &= !TRAIN_START_ON;
            e.velocity = VEC3_ORIGIN;
            e.next_think = 0;
        }

        self.mover_sound_end(ent);
    }

    fn func_train_move_to(&mut self, ent: usize, corner: usize) {
        let dest = vector_subtract(&self.edicts[corner].s.origin, &self.edicts[ent].mins);

        let e = &mut self.edicts[ent];
        e.move_info.state = MoveState::Top;
        e.move_info.start_origin = e.s.origin;
        e.move_info.end_origin = dest;
        self.move_info_init(ent, dest, MoveDoneFn::TrainWait);
        self.edicts[ent].spawn_flags |= TRAIN_START_ON;
    }

    /// Head for the next corner, passing straight through teleport corners.
    pub fn func_train_next(&mut self, ent: usize) {
        let mut first = true;

        let corner = loop {
            let target = self.edicts[ent].target.clone();
            if target.is_empty() {
                return;
            }

            let Some(corner) = self.pick_target(&target) else {
                debug!("{} has invalid target {}", self.etos(ent), target);
                return;
            };

            self.edicts[ent].target = self.edicts[corner].target.clone();

            if self.edicts[corner].spawn_flags & PATH_CORNER_TELEPORT == 0 {
                break corner;
            }

            if !first {
                debug!("{} has consecutive teleport corners at {}", self.etos(ent), self.etos(corner));
                return;
            }
            first = false;

            let origin = vector_subtract(&self.edicts[corner].s.origin, &self.edicts[ent].mins);
            let e = &mut self.edicts[ent];
            e.s.origin = origin;
            e.s.old_origin = origin;
            e.s.event = EntityEvent::ClientTeleport;
            self.link_entity(ent);
        };

        let corner_ref = self.entity_ref(corner);
        let wait = self.edicts[corner].wait;
        let e = &mut self.edicts[ent];
        e.move_info.wait = wait;
        e.target_ent = Some(corner_ref);

        self.mover_sound_start(ent);
        self.func_train_move_to(ent, corner);
    }

    fn func_train_resume(&mut self, ent: usize) {
        if let Some(corner) = self.resolve(self.edicts[ent].target_ent) {
            self.func_train_move_to(ent, corner);
        }
    }

    /// Place the train on its first corner once the level has spawned.
    pub fn func_train_find(&mut self, ent: usize) {
        let target = self.edicts[ent].target.clone();
        if target.is_empty() {
            debug!("{} has no target", self.etos(ent));
            return;
        }

        let Some(corner) = self.pick_target(&target) else {
            debug!("{} target {} not found", self.etos(ent), target);
            return;
        };

        let origin = vector_subtract(&self.edicts[corner].s.origin, &self.edicts[ent].mins);
        self.edicts[ent].target = self.edicts[corner].target.clone();
        self.edicts[ent].s.origin = origin;
        self.link_entity(ent);

        let next = self.level.time + self.frame_millis();
        let self_ref = self.entity_ref(ent);
        let e = &mut self.edicts[ent];

        // untargeted trains start at once
        if e.target_name.is_empty() {
            e.spawn_flags |= TRAIN_START_ON;
        }

        if e.spawn_flags & TRAIN_START_ON != 0 {
            e.next_think = next;
            e.think = Some(ThinkFn::TrainNext);
            e.activator = Some(self_ref);
        }
    }

    pub fn func_train_use(&mut self, ent: usize, activator: Option<usize>) {
        self.edicts[ent].activator = activator.map(|a| self.entity_ref(a));

        let e = &mut self.edicts[ent];
        if e.spawn_flags & TRAIN_START_ON != 0 {
            if e.spawn_flags & TRAIN_TOGGLE == 0 {
                return;
            }
            e.spawn_flags &= !TRAIN_START_ON;
            e.velocity = VEC3_ORIGIN;
            e.next_think = 0;
        } else if e.target_ent.is_some() {
            self.func_train_resume(ent);
        } else {
            self.func_train_next(ent);
        }
    }

    pub fn sp_func_train(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.move_type = MoveType::Push;
        e.s.angles = VEC3_ORIGIN;
        e.blocked = Some(BlockedFn::Train);

        if e.spawn_flags & TRAIN_BLOCK_STOPS != 0 {
            e.dmg = 0;
        } else if e.dmg == 0 {
            e.dmg = 100;
        }

        e.solid = Solid::Bsp;
        self.set_brush_model(ent);

        if !self.st.noise.is_empty() {
            let noise = self.st.noise.clone();
            self.edicts[ent].move_info.sound_middle = self.gi.sound_index(&noise);
        }

        let e = &mut self.edicts[ent];
        if e.speed == 0.0 {
            e.speed = 100.0;
        }
        e.move_info.speed = e.speed;
        e.move_info.accel = e.speed;
        e.move_info.decel = e.speed;
        e.use_fn = Some(UseFn::Train);

        self.link_entity(ent);

        if self.edicts[ent].target.is_empty() {
            debug!("func_train with no target at {}", vtos(&self.edicts[ent].abs_mins));
            return;
        }

        // corners may spawn after the train, so look for them next frame
        let next = self.level.time + self.frame_millis();
        let e = &mut self.edicts[ent];
        e.next_think = next;
        e.think = Some(ThinkFn::TrainFind);
    }

    // =========================================================
    // func_timer, func_conveyor, func_wall, func_areaportal
    // =========================================================

    fn func_timer_interval(&mut self, ent: usize) -> u32 {
        let (wait, random) = (self.edicts[ent].wait, self.edicts[ent].random);
        let jitter = random * self.crand();
        ((wait + jitter) * 1000.0).max(0.0) as u32
    }

    pub fn func_timer_think(&mut self, ent: usize) {
        let activator = self.resolve(self.edicts[ent].activator);
        self.use_targets(ent, activator);

        if !self.edicts[ent].in_use {
            return;
        }
        let interval = self.func_timer_interval(ent);
        self.edicts[ent].next_think = self.level.time + interval;
    }

    /// Toggle the timer.
    pub fn func_timer_use(&mut self, ent: usize, activator: Option<usize>) {
        self.edicts[ent].activator = activator.map(|a| self.entity_ref(a));

        if self.edicts[ent].next_think != 0 {
            self.edicts[ent].next_think = 0;
            return;
        }

        let delay = self.edicts[ent].delay;
        if delay > 0.0 {
            self.edicts[ent].next_think = self.level.time + (delay * 1000.0) as u32;
        } else {
            self.func_timer_think(ent);
        }
    }

    pub fn sp_func_timer(&mut self, ent: usize) {
        let frame_seconds = self.frame_seconds();
        let e = &mut self.edicts[ent];

        if e.wait == 0.0 {
            e.wait = 1.0;
        }

        e.use_fn = Some(UseFn::Timer);
        e.think = Some(ThinkFn::Timer);

        if e.random >= e.wait {
            e.random = e.wait - frame_seconds;
            debug!("func_timer random >= wait at {}", vtos(&e.s.origin));
        }

        if e.spawn_flags & TIMER_START_ON != 0 {
            let delay = (e.delay * 1000.0) as u32;
            let interval = self.func_timer_interval(ent);
            let self_ref = self.entity_ref(ent);
            let time = self.level.time;
            let e = &mut self.edicts[ent];
            e.next_think = time + delay + interval;
            e.activator = Some(self_ref);
        }

        self.edicts[ent].sv_flags = SVF_NO_CLIENT;
    }

    pub fn func_conveyor_use(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        if e.spawn_flags & CONVEYOR_START_ON != 0 {
            e.speed = 0.0;
            e.spawn_flags &= !CONVEYOR_START_ON;
        } else {
            e.speed = e.count as f32;
            e.spawn_flags |= CONVEYOR_START_ON;
        }

        if e.spawn_flags & CONVEYOR_TOGGLE == 0 {
            e.count = 0;
        }
    }

    /// Stationary brush whose current surfaces carry what rests on it.
    pub fn sp_func_conveyor(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        if e.speed == 0.0 {
            e.speed = 100.0;
        }

        // the idle speed waits in count
        if e.spawn_flags & CONVEYOR_START_ON == 0 {
            e.count = e.speed as i32;
            e.speed = 0.0;
        }

        e.use_fn = Some(UseFn::Conveyor);
        self.set_brush_model(ent);
        self.edicts[ent].solid = Solid::Bsp;
        self.link_entity(ent);
    }

    pub fn func_wall_use(&mut self, ent: usize) {
        if self.edicts[ent].solid == Solid::Not {
            let e = &mut self.edicts[ent];
            e.solid = Solid::Bsp;
            e.sv_flags &= !SVF_NO_CLIENT;
            self.link_entity(ent);
            self.kill_box(ent);
        } else {
            let e = &mut self.edicts[ent];
            e.solid = Solid::Not;
            e.sv_flags |= SVF_NO_CLIENT;
        }
        self.link_entity(ent);

        let e = &mut self.edicts[ent];
        if e.spawn_flags & WALL_TOGGLE == 0 {
            e.use_fn = None;
        }
    }

    pub fn sp_func_wall(&mut self, ent: usize) {
        self.edicts[ent].move_type = MoveType::Push;
        self.set_brush_model(ent);

        let e = &mut self.edicts[ent];

        // just a wall
        if e.spawn_flags & (WALL_TRIGGER_SPAWN | WALL_TOGGLE | WALL_START_ON) == 0 {
            e.solid = Solid::Bsp;
            self.link_entity(ent);
            return;
        }

        if e.spawn_flags & WALL_TRIGGER_SPAWN == 0 {
            debug!("func_wall missing TRIGGER_SPAWN at {}", vtos(&e.s.origin));
            e.spawn_flags |= WALL_TRIGGER_SPAWN;
        }

        if e.spawn_flags & WALL_START_ON != 0 && e.spawn_flags & WALL_TOGGLE == 0 {
            debug!("func_wall START_ON without TOGGLE at {}", vtos(&e.s.origin));
            e.spawn_flags |= WALL_TOGGLE;
        }

        e.use_fn = Some(UseFn::Wall);

        if e.spawn_flags & WALL_START_ON != 0 {
            e.solid = Solid::Bsp;
        } else {
            e.solid = Solid::Not;
            e.sv_flags |= SVF_NO_CLIENT;
        }

        self.link_entity(ent);
    }

    pub fn func_areaportal_use(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.count ^= 1;
        let (portal, open) = (e.area_portal, e.count != 0);
        self.gi.set_area_portal_state(portal, open);
    }

    /// Joins two areas while used. Starts closed.
    pub fn sp_func_areaportal(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.use_fn = Some(UseFn::AreaPortal);
        e.count = 0;
    }

    /// Editor grouping only; merged into the world by the map compiler.
    pub fn sp_func_group(&mut self, ent: usize) {
        self.free_entity(ent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_import::ModelInfo;
    use crate::test_support::*;

    const EPS: f32 = 1e-3;

    /// One server frame over every non-client entity.
    fn step(ctx: &mut GameCtx) {
        ctx.level.time += ctx.frame_millis();
        for i in 0..ctx.num_edicts {
            if ctx.edicts[i].in_use && !ctx.edicts[i].is_client() {
                ctx.level.current_entity = Some(i);
                ctx.run_entity(i);
            }
        }
        ctx.level.current_entity = None;
    }

    fn brush(
        ctx: &mut GameCtx,
        world: &std::rc::Rc<std::cell::RefCell<MockWorld>>,
        class_name: &str,
        model: &str,
        mins: Vec3,
        maxs: Vec3,
    ) -> usize {
        let index = world.borrow().models.len() as u16 + 1;
        world
            .borrow_mut()
            .models
            .insert(model.to_string(), ModelInfo { index, mins, maxs });
        let ent = ctx.alloc_entity(class_name).unwrap();
        ctx.edicts[ent].model = model.to_string();
        ent
    }

    fn door(ctx: &mut GameCtx, world: &std::rc::Rc<std::cell::RefCell<MockWorld>>, model: &str, height: f32) -> usize {
        let ent = brush(ctx, world, "func_door", model, [-32.0, -8.0, 0.0], [32.0, 8.0, height]);
        // opens upwards
        ctx.edicts[ent].s.angles = [0.0, -1.0, 0.0];
        ent
    }

    fn corner(ctx: &mut GameCtx, name: &str, target: &str, origin: Vec3) -> usize {
        let ent = ctx.alloc_entity("path_corner").unwrap();
        let e = &mut ctx.edicts[ent];
        e.target_name = name.into();
        e.target = target.into();
        e.s.origin = origin;
        ent
    }

    // ============================================================
    // Move primitives
    // ============================================================

    #[test]
    fn test_acceleration_distance() {
        assert!((acceleration_distance(10.0, 5.0) - 15.0).abs() < EPS);
    }

    #[test]
    fn test_short_move_prorates_peak_speed() {
        let mut mi = MoveInfo {
            speed: 100.0,
            accel: 5.0,
            decel: 5.0,
            remaining_distance: 200.0,
            ..Default::default()
        };
        update_acceleration(&mut mi);

        assert!(mi.move_speed < mi.speed);
        // accelerating to the peak and back covers the distance
        let covered = acceleration_distance(mi.move_speed, mi.accel) + mi.decel_distance;
        assert!((covered - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_accelerated_plat_lands_exactly() {
        let (mut ctx, world) = make_ctx(1, 64);
        let plat = brush(&mut ctx, &world, "func_plat", "*1", [-32.0, -32.0, 0.0], [32.0, 32.0, 8.0]);
        ctx.st.height = 200;
        ctx.sp_func_plat(plat);

        assert_eq!(ctx.edicts[plat].move_info.state, MoveState::Bottom);
        assert!((ctx.edicts[plat].s.origin[2] + 200.0).abs() < EPS);

        ctx.func_plat_go_up(plat);

        let mut speeds = Vec::new();
        for _ in 0..100 {
            step(&mut ctx);
            speeds.push(ctx.edicts[plat].velocity[2]);
            if ctx.edicts[plat].move_info.state == MoveState::Top {
                break;
            }
        }

        assert_eq!(ctx.edicts[plat].move_info.state, MoveState::Top);
        assert_eq!(ctx.edicts[plat].s.origin, [0.0, 0.0, 0.0]);

        // speeds up, then slows down
        let peak = speeds.iter().cloned().fold(0.0f32, f32::max);
        let first_moving = speeds.iter().cloned().find(|&v| v > 0.0).unwrap();
        assert!(first_moving < peak);
        assert!(speeds[speeds.len() - 2] < peak);
    }

    #[test]
    fn test_constant_move_runs_now_for_current_entity() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].target_name = "d".into();
        ctx.sp_func_door(ent);

        ctx.level.current_entity = Some(ent);
        ctx.edicts[ent].move_info.state = MoveState::GoingUp;
        ctx.move_info_init(ent, [0.0, 0.0, 64.0], MoveDoneFn::DoorUp);

        assert!((ctx.edicts[ent].velocity[2] - 200.0).abs() < EPS);
        assert_eq!(ctx.edicts[ent].think, Some(ThinkFn::MoveEnd));
    }

    // ============================================================
    // Doors
    // ============================================================

    #[test]
    fn test_door_open_wait_close_cycle() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].target_name = "d".into();
        ctx.sp_func_door(ent);

        assert!((ctx.edicts[ent].pos2[2] - 64.0).abs() < EPS);
        step(&mut ctx);

        ctx.func_door_use(ent, None);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingUp);

        let mut opened_at = 0;
        for _ in 0..20 {
            step(&mut ctx);
            if ctx.edicts[ent].move_info.state == MoveState::Top {
                opened_at = ctx.level.time;
                break;
            }
        }
        assert!(opened_at > 0);
        assert_eq!(ctx.edicts[ent].s.origin, [0.0, 0.0, 64.0]);

        // holds for exactly the wait
        while ctx.level.time < opened_at + 2900 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::Top);
        step(&mut ctx);
        assert_eq!(ctx.level.time, opened_at + 3000);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingDown);

        for _ in 0..20 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::Bottom);
        assert_eq!(ctx.edicts[ent].s.origin, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_team_doors_arrive_together() {
        let (mut ctx, world) = make_ctx(1, 64);
        let a = door(&mut ctx, &world, "*1", 72.0);
        let b = door(&mut ctx, &world, "*2", 136.0);
        for &d in &[a, b] {
            ctx.edicts[d].target_name = "pair".into();
            ctx.edicts[d].team = "t".into();
            ctx.sp_func_door(d);
        }
        let (ra, rb) = (ctx.entity_ref(a), ctx.entity_ref(b));
        ctx.edicts[a].team_master = Some(ra);
        ctx.edicts[a].team_chain = Some(rb);
        ctx.edicts[b].team_master = Some(ra);
        ctx.edicts[b].flags |= EntityFlags::TEAM_SLAVE;

        step(&mut ctx);
        assert!((ctx.edicts[b].move_info.speed - 2.0 * ctx.edicts[a].move_info.speed).abs() < EPS);

        ctx.func_door_use(a, None);

        let mut arrivals = (None, None);
        for _ in 0..20 {
            step(&mut ctx);
            if arrivals.0.is_none() && ctx.edicts[a].move_info.state == MoveState::Top {
                arrivals.0 = Some(ctx.level.time);
            }
            if arrivals.1.is_none() && ctx.edicts[b].move_info.state == MoveState::Top {
                arrivals.1 = Some(ctx.level.time);
            }
        }

        assert!(arrivals.0.is_some());
        assert_eq!(arrivals.0, arrivals.1);
        assert!((ctx.edicts[a].s.origin[2] - 64.0).abs() < EPS);
        assert!((ctx.edicts[b].s.origin[2] - 128.0).abs() < EPS);
    }

    #[test]
    fn test_untargeted_door_spawns_trigger() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.sp_func_door(ent);
        step(&mut ctx);

        let trigger = ctx.find_by_class_name(None, "door_trigger").unwrap();
        assert_eq!(ctx.resolve(ctx.edicts[trigger].owner), Some(ent));
        assert!((ctx.edicts[trigger].mins[0] + 93.0).abs() < EPS);

        spawn_test_client(&mut ctx, 1, [0.0, 40.0, 24.0]);
        ctx.func_door_touch_trigger(trigger, 1);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingUp);

        // debounced
        let touch_time = ctx.edicts[trigger].touch_time;
        ctx.func_door_touch_trigger(trigger, 1);
        assert_eq!(ctx.edicts[trigger].touch_time, touch_time);
    }

    #[test]
    fn test_blocked_door_crushes_and_reopens() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].target_name = "d".into();
        ctx.sp_func_door(ent);
        spawn_test_client(&mut ctx, 1, [0.0, 0.0, 0.0]);

        ctx.edicts[ent].move_info.state = MoveState::GoingDown;
        ctx.func_door_blocked(ent, 1);

        assert_eq!(ctx.edicts[1].health, 98);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingUp);
    }

    #[test]
    fn test_toggle_door_waits_for_trigger() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].target_name = "d".into();
        ctx.edicts[ent].spawn_flags = DOOR_TOGGLE;
        ctx.sp_func_door(ent);
        step(&mut ctx);

        ctx.func_door_use(ent, None);
        for _ in 0..60 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::Top);

        ctx.func_door_use(ent, None);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingDown);
    }

    #[test]
    fn test_door_opens_area_portals() {
        let (mut ctx, world) = make_ctx(1, 64);
        let portal = ctx.alloc_entity("func_areaportal").unwrap();
        ctx.edicts[portal].target_name = "ap".into();
        ctx.edicts[portal].area_portal = 3;
        ctx.sp_func_areaportal(portal);

        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].target_name = "d".into();
        ctx.edicts[ent].target = "ap".into();
        ctx.sp_func_door(ent);
        step(&mut ctx);

        ctx.func_door_use(ent, None);
        for _ in 0..60 {
            step(&mut ctx);
        }

        // opened on the way up, closed at the bottom, never toggled by use
        assert_eq!(world.borrow().area_portals, vec![(3, true), (3, false)]);
        assert_eq!(ctx.edicts[portal].count, 0);
    }

    #[test]
    fn test_shootable_door_opens_on_death() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = door(&mut ctx, &world, "*1", 72.0);
        ctx.edicts[ent].health = 10;
        ctx.sp_func_door(ent);
        spawn_test_client(&mut ctx, 1, [200.0, 0.0, 0.0]);

        ctx.func_door_die(ent, 1);

        assert_eq!(ctx.edicts[ent].health, 10);
        assert!(!ctx.edicts[ent].take_damage);
        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::GoingUp);
    }

    #[test]
    fn test_rotating_door_swings_to_distance() {
        let (mut ctx, world) = make_ctx(1, 64);
        let ent = brush(&mut ctx, &world, "func_door_rotating", "*1", [0.0, -4.0, 0.0], [64.0, 4.0, 96.0]);
        ctx.edicts[ent].target_name = "d".into();
        ctx.sp_func_door_rotating(ent);
        step(&mut ctx);

        ctx.func_door_use(ent, None);
        for _ in 0..30 {
            step(&mut ctx);
        }

        assert_eq!(ctx.edicts[ent].move_info.state, MoveState::Top);
        assert!((ctx.edicts[ent].s.angles[YAW] - 90.0).abs() < 0.01);
        assert!(vector_is_zero(&ctx.edicts[ent].avelocity));
    }

    // ============================================================
    // Plats and buttons
    // ============================================================

    #[test]
    fn test_plat_trigger_raises_plat() {
        let (mut ctx, world) = make_ctx(1, 64);
        let plat = brush(&mut ctx, &world, "func_plat", "*1", [-64.0, -64.0, 0.0], [64.0, 64.0, 8.0]);
        ctx.st.height = 100;
        ctx.sp_func_plat(plat);

        let trigger = ctx.find_by_class_name(None, "plat_trigger").unwrap();
        assert_eq!(ctx.resolve(ctx.edicts[trigger].enemy), Some(plat));
        assert!((ctx.edicts[trigger].maxs[2] - 16.0).abs() < EPS);
        assert!((ctx.edicts[trigger].mins[2] + 92.0).abs() < EPS);

        spawn_test_client(&mut ctx, 1, [0.0, 0.0, -70.0]);
        ctx.func_plat_touch(trigger, 1);
        assert_eq!(ctx.edicts[plat].move_info.state, MoveState::GoingUp);
    }

    #[test]
    fn test_targeted_plat_lowers_once_on_use() {
        let (mut ctx, world) = make_ctx(1, 64);
        let plat = brush(&mut ctx, &world, "func_plat", "*1", [-64.0, -64.0, 0.0], [64.0, 64.0, 8.0]);
        ctx.edicts[plat].target_name = "lift".into();
        ctx.st.height = 100;
        ctx.sp_func_plat(plat);

        assert_eq!(ctx.edicts[plat].s.origin, [0.0, 0.0, 0.0]);
        ctx.func_plat_use(plat);
        assert_eq!(ctx.edicts[plat].move_info.state, MoveState::GoingDown);

        // a plat that has moved ignores further use
        let think = ctx.edicts[plat].think;
        ctx.func_plat_use(plat);
        assert_eq!(ctx.edicts[plat].think, think);
    }

    #[test]
    fn test_button_fires_targets_and_returns() {
        let (mut ctx, world) = make_ctx(1, 64);
        let portal = ctx.alloc_entity("func_areaportal").unwrap();
        ctx.edicts[portal].target_name = "ap".into();
        ctx.sp_func_areaportal(portal);

        let button = brush(&mut ctx, &world, "func_button", "*1", [-8.0, -8.0, 0.0], [8.0, 8.0, 16.0]);
        ctx.edicts[button].s.angles = [0.0, -2.0, 0.0];
        ctx.edicts[button].target = "ap".into();
        ctx.sp_func_button(button);
        assert!((ctx.edicts[button].pos2[2] + 12.0).abs() < EPS);

        spawn_test_client(&mut ctx, 1, [0.0, 0.0, 100.0]);
        ctx.func_button_touch(button, 1);
        assert_eq!(ctx.edicts[button].move_info.state, MoveState::GoingUp);

        for _ in 0..10 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[button].move_info.state, MoveState::Top);
        assert_eq!(ctx.edicts[portal].count, 1);

        for _ in 0..40 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[button].move_info.state, MoveState::Bottom);
        assert_eq!(ctx.edicts[button].s.origin, [0.0, 0.0, 0.0]);
    }

    // ============================================================
    // Trains
    // ============================================================

    #[test]
    fn test_train_runs_between_corners() {
        let (mut ctx, world) = make_ctx(1, 64);
        let p1 = corner(&mut ctx, "p1", "p2", [0.0, 0.0, 0.0]);
        let p2 = corner(&mut ctx, "p2", "p1", [100.0, 0.0, 0.0]);
        let train = brush(&mut ctx, &world, "func_train", "*1", [0.0, 0.0, 0.0], [32.0, 32.0, 8.0]);
        ctx.edicts[train].target = "p1".into();
        ctx.sp_func_train(train);

        step(&mut ctx);
        assert_eq!(ctx.edicts[train].s.origin, [0.0, 0.0, 0.0]);
        assert!(ctx.edicts[train].spawn_flags & TRAIN_START_ON != 0);

        let mut reached = false;
        for _ in 0..20 {
            step(&mut ctx);
            if ctx.edicts[train].s.origin == [100.0, 0.0, 0.0] {
                reached = true;
                break;
            }
        }
        assert!(reached);

        // and back again
        assert_eq!(ctx.resolve(ctx.edicts[train].target_ent), Some(p1));
        let _ = p2;
    }

    #[test]
    fn test_train_teleport_corner_snaps() {
        let (mut ctx, world) = make_ctx(1, 64);
        let jump = corner(&mut ctx, "jump", "p2", [500.0, 0.0, 0.0]);
        ctx.edicts[jump].spawn_flags = PATH_CORNER_TELEPORT;
        let p2 = corner(&mut ctx, "p2", "", [600.0, 0.0, 0.0]);
        let train = brush(&mut ctx, &world, "func_train", "*1", [-8.0, -8.0, -8.0], [8.0, 8.0, 8.0]);
        ctx.edicts[train].target = "jump".into();
        ctx.sp_func_train(train);

        ctx.func_train_next(train);

        assert_eq!(ctx.edicts[train].s.origin, [508.0, 8.0, 8.0]);
        assert_eq!(ctx.edicts[train].s.event, EntityEvent::ClientTeleport);
        assert_eq!(ctx.resolve(ctx.edicts[train].target_ent), Some(p2));
        assert_eq!(ctx.edicts[train].move_info.dest, [608.0, 8.0, 8.0]);
    }

    #[test]
    fn test_toggle_train_stops_on_use() {
        let (mut ctx, world) = make_ctx(1, 64);
        corner(&mut ctx, "p1", "p2", [0.0, 0.0, 0.0]);
        corner(&mut ctx, "p2", "p1", [100.0, 0.0, 0.0]);
        let train = brush(&mut ctx, &world, "func_train", "*1", [0.0; 3], [8.0; 3]);
        ctx.edicts[train].target = "p1".into();
        ctx.edicts[train].spawn_flags = TRAIN_TOGGLE;
        ctx.sp_func_train(train);
        step(&mut ctx);
        step(&mut ctx);
        step(&mut ctx);
        assert!(!vector_is_zero(&ctx.edicts[train].velocity));

        ctx.func_train_use(train, None);
        assert!(vector_is_zero(&ctx.edicts[train].velocity));
        assert_eq!(ctx.edicts[train].next_think, 0);
    }

    #[test]
    fn test_train_crush_is_debounced() {
        let (mut ctx, world) = make_ctx(1, 64);
        let train = brush(&mut ctx, &world, "func_train", "*1", [0.0; 3], [8.0; 3]);
        ctx.sp_func_train(train);
        ctx.edicts[train].dmg = 10;
        spawn_test_client(&mut ctx, 1, [0.0; 3]);

        ctx.func_train_blocked(train, 1);
        ctx.func_train_blocked(train, 1);
        assert_eq!(ctx.edicts[1].health, 90);
    }

    // ============================================================
    // Timers, walls, rotators, conveyors, portals
    // ============================================================

    #[test]
    fn test_timer_fires_each_wait() {
        let (mut ctx, _) = make_ctx(1, 64);
        let portal = ctx.alloc_entity("func_areaportal").unwrap();
        ctx.edicts[portal].target_name = "ap".into();
        ctx.sp_func_areaportal(portal);

        let timer = ctx.alloc_entity("func_timer").unwrap();
        ctx.edicts[timer].target = "ap".into();
        ctx.edicts[timer].spawn_flags = TIMER_START_ON;
        ctx.sp_func_timer(timer);

        for _ in 0..10 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[portal].count, 1);
        for _ in 0..10 {
            step(&mut ctx);
        }
        assert_eq!(ctx.edicts[portal].count, 0);

        // use turns it off
        ctx.func_timer_use(timer, None);
        assert_eq!(ctx.edicts[timer].next_think, 0);
    }

    #[test]
    fn test_timer_random_clamped_below_wait() {
        let (mut ctx, _) = make_ctx(1, 64);
        let timer = ctx.alloc_entity("func_timer").unwrap();
        ctx.edicts[timer].wait = 1.0;
        ctx.edicts[timer].random = 2.0;
        ctx.sp_func_timer(timer);
        assert!(ctx.edicts[timer].random < 1.0);
    }

    #[test]
    fn test_trigger_spawned_wall_appears_once() {
        let (mut ctx, world) = make_ctx(1, 64);
        let wall = brush(&mut ctx, &world, "func_wall", "*1", [0.0; 3], [64.0; 3]);
        ctx.edicts[wall].spawn_flags = WALL_TRIGGER_SPAWN;
        ctx.sp_func_wall(wall);
        assert_eq!(ctx.edicts[wall].solid, Solid::Not);
        assert!(ctx.edicts[wall].sv_flags & SVF_NO_CLIENT != 0);

        ctx.func_wall_use(wall);
        assert_eq!(ctx.edicts[wall].solid, Solid::Bsp);
        assert!(ctx.edicts[wall].use_fn.is_none());
    }

    #[test]
    fn test_rotating_toggles_spin() {
        let (mut ctx, world) = make_ctx(1, 64);
        let fan = brush(&mut ctx, &world, "func_rotating", "*1", [-8.0; 3], [8.0; 3]);
        ctx.edicts[fan].spawn_flags = ROTATING_START_ON | ROTATING_TOUCH_PAIN;
        ctx.sp_func_rotating(fan);
        assert_eq!(ctx.edicts[fan].avelocity, [0.0, 100.0, 0.0]);
        assert_eq!(ctx.edicts[fan].touch, Some(TouchFn::Rotating));

        ctx.func_rotating_use(fan);
        assert!(vector_is_zero(&ctx.edicts[fan].avelocity));
        assert!(ctx.edicts[fan].touch.is_none());
    }

    #[test]
    fn test_conveyor_toggles_speed() {
        let (mut ctx, world) = make_ctx(1, 64);
        let belt = brush(&mut ctx, &world, "func_conveyor", "*1", [0.0; 3], [64.0, 64.0, 8.0]);
        ctx.edicts[belt].spawn_flags = CONVEYOR_TOGGLE;
        ctx.sp_func_conveyor(belt);
        assert_eq!(ctx.edicts[belt].speed, 0.0);

        ctx.func_conveyor_use(belt);
        assert!((ctx.edicts[belt].speed - 100.0).abs() < EPS);
        ctx.func_conveyor_use(belt);
        assert_eq!(ctx.edicts[belt].speed, 0.0);
    }

    #[test]
    fn test_area_portal_toggles() {
        let (mut ctx, world) = make_ctx(1, 64);
        let portal = ctx.alloc_entity("func_areaportal").unwrap();
        ctx.edicts[portal].area_portal = 7;
        ctx.sp_func_areaportal(portal);

        ctx.func_areaportal_use(portal);
        ctx.func_areaportal_use(portal);
        assert_eq!(world.borrow().area_portals, vec![(7, true), (7, false)]);
    }
}
