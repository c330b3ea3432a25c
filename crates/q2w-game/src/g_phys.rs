// g_phys.rs — per-frame movement for non-player entities

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

/*
pushmove objects do not obey gravity, and do not interact with each other or
trigger fields, but block normal movement and push normal objects when they
move.

onground is set for toss objects when they come to a complete rest.

doors, plats, etc are Solid::Bsp and MoveType::Push
corpses are Solid::Not and MoveType::Toss
*/

use crate::g_local::*;
use crate::game_import::Attenuation;

pub const MAX_VELOCITY: f32 = 2500.0;
pub const STOP_EPSILON: f32 = 0.1;

const BOUNCE_OVERBOUNCE: f32 = 1.3;

/// Blocked flags returned by `clip_velocity`.
pub const BLOCKED_FLOOR: i32 = 1;
pub const BLOCKED_STEP: i32 = 2;

/// Slide `vel` off a plane. Returns the velocity and the blocked flags.
pub fn clip_velocity(vel: &Vec3, normal: &Vec3, overbounce: f32) -> (Vec3, i32) {
    let mut blocked = 0;
    if normal[2] > 0.0 {
        blocked |= BLOCKED_FLOOR;
    }
    if normal[2] == 0.0 {
        blocked |= BLOCKED_STEP;
    }

    let backoff = dot_product(vel, normal) * overbounce;

    let mut out = [0.0; 3];
    for i in 0..3 {
        out[i] = vel[i] - normal[i] * backoff;
        if out[i] > -STOP_EPSILON && out[i] < STOP_EPSILON {
            out[i] = 0.0;
        }
    }

    (out, blocked)
}

/// Saved state of something a pusher moved, for rolling back.
#[derive(Debug, Clone, Copy)]
struct Pushed {
    ent: usize,
    origin: Vec3,
    angles: Vec3,
    delta_yaw: f32,
}

impl GameCtx {
    fn clip_mask_of(&self, ent: usize) -> i32 {
        match self.edicts[ent].clip_mask {
            0 => MASK_SOLID,
            mask => mask,
        }
    }

    /// True when the entity's box is embedded in something solid.
    fn test_entity_position(&mut self, ent: usize) -> bool {
        let mask = self.clip_mask_of(ent);
        let e = &self.edicts[ent];
        let (origin, mins, maxs) = (e.s.origin, e.mins, e.maxs);
        self.gi.trace(&origin, &mins, &maxs, &origin, Some(ent), mask).start_solid
    }

    fn clamp_velocity(&mut self, ent: usize) {
        for v in self.edicts[ent].velocity.iter_mut() {
            *v = v.clamp(-MAX_VELOCITY, MAX_VELOCITY);
        }
    }

    /// Runs the entity's think if it is due. Returns true if it ran.
    pub fn run_think(&mut self, ent: usize) -> bool {
        let think_time = self.edicts[ent].next_think;
        if think_time == 0 || think_time > self.level.time {
            return false;
        }

        self.edicts[ent].next_think = 0;
        self.call_think(ent);
        true
    }

    /// Two entities have touched, so run their touch functions.
    fn impact(&mut self, e1: usize, trace: &Trace) {
        let Some(e2) = trace.ent else {
            return;
        };

        if self.edicts[e1].touch.is_some() && self.edicts[e1].solid != Solid::Not {
            self.call_touch(e1, e2, Some(&trace.plane), trace.surface.as_ref());
        }

        if self.edicts[e2].in_use && self.edicts[e2].touch.is_some() && self.edicts[e2].solid != Solid::Not
        {
            self.call_touch(e2, e1, None, None);
        }
    }

    fn add_gravity(&mut self, ent: usize) {
        let mut g = self.level.gravity as f32;
        if self.edicts[ent].water_level > 0 {
            g *= 0.5;
        }
        let dt = self.frame_seconds();
        let e = &mut self.edicts[ent];
        e.velocity[2] -= e.gravity * g * dt;
    }

    // ============================================================
    // Pushmove
    // ============================================================

    /// Moves the entity by `push` without changing its velocity, touching
    /// whatever it hits.
    pub fn push_entity(&mut self, ent: usize, push: &Vec3) -> Trace {
        let start = self.edicts[ent].s.origin;
        let end = vector_add(&start, push);

        let trace = loop {
            let mask = self.clip_mask_of(ent);
            let e = &self.edicts[ent];
            let (mins, maxs) = (e.mins, e.maxs);
            let trace = self.gi.trace(&start, &mins, &maxs, &end, Some(ent), mask);

            self.edicts[ent].s.origin = trace.end;
            self.link_entity(ent);

            if trace.fraction < 1.0 {
                self.impact(ent, &trace);

                // the obstacle went away and we are still here, so try again
                let gone = trace.ent.map(|o| !self.edicts[o].in_use).unwrap_or(false);
                if gone && self.edicts[ent].in_use {
                    self.edicts[ent].s.origin = start;
                    self.link_entity(ent);
                    continue;
                }
            }
            break trace;
        };

        let e = &self.edicts[ent];
        if e.in_use && e.is_client() && e.health > 0 {
            self.touch_triggers(ent);
        }

        trace
    }

    /// Moves the pusher and everything it carries or shoves. On failure,
    /// everything is put back and the blocking entity is returned.
    fn push(&mut self, pusher: usize, mv: &Vec3, amove: &Vec3, pushed: &mut Vec<Pushed>) -> Result<(), usize> {
        // clamp the move to 1/8 units for client side prediction
        let mut mv = *mv;
        for m in mv.iter_mut() {
            let temp = *m * 8.0;
            let temp = if temp > 0.0 { temp + 0.5 } else { temp - 0.5 };
            *m = 0.125 * temp.trunc();
        }

        let p = &self.edicts[pusher];
        let mins = vector_add(&p.abs_mins, &mv);
        let maxs = vector_add(&p.abs_maxs, &mv);

        let (forward, right, up) = angle_vectors_tuple(&vector_negate(amove));

        pushed.push(Pushed {
            ent: pusher,
            origin: p.s.origin,
            angles: p.s.angles,
            delta_yaw: self.client(pusher).map(|c| c.ps.pmove.delta_angles[YAW]).unwrap_or(0.0),
        });

        let p = &mut self.edicts[pusher];
        p.s.origin = vector_add(&p.s.origin, &mv);
        p.s.angles = vector_add(&p.s.angles, amove);
        self.link_entity(pusher);

        let mut obstacle = None;

        for check in 1..self.num_edicts {
            let c = &self.edicts[check];
            if !c.in_use || !c.linked {
                continue;
            }
            if matches!(c.move_type, MoveType::Push | MoveType::Stop | MoveType::None | MoveType::NoClip) {
                continue;
            }

            let riding = self.resolve(c.ground_entity) == Some(pusher);

            if !riding {
                // see if the entity needs to be tested
                if (0..3).any(|i| c.abs_mins[i] >= maxs[i] || c.abs_maxs[i] <= mins[i]) {
                    continue;
                }
                if !self.test_entity_position(check) {
                    continue;
                }
            }

            if self.edicts[pusher].move_type == MoveType::Push || riding {
                let c = &self.edicts[check];
                pushed.push(Pushed {
                    ent: check,
                    origin: c.s.origin,
                    angles: c.s.angles,
                    delta_yaw: self.client(check).map(|c| c.ps.pmove.delta_angles[YAW]).unwrap_or(0.0),
                });

                self.edicts[check].s.origin = vector_add(&self.edicts[check].s.origin, &mv);
                if let Some(client) = self.client_mut(check) {
                    // disable stair prediction
                    client.ps.pmove.pm_flags |= PMF_PUSHED;
                    client.ps.pmove.delta_angles[YAW] += amove[YAW];
                }

                // rotate about the pusher
                let org = vector_subtract(&self.edicts[check].s.origin, &self.edicts[pusher].s.origin);
                let org2 = [
                    dot_product(&org, &forward),
                    -dot_product(&org, &right),
                    dot_product(&org, &up),
                ];
                let move2 = vector_subtract(&org2, &org);
                self.edicts[check].s.origin = vector_add(&self.edicts[check].s.origin, &move2);

                // may have pushed them off an edge
                if !riding {
                    self.edicts[check].ground_entity = None;
                }

                if !self.test_entity_position(check) {
                    self.link_entity(check);
                    continue;
                }

                // riders may stay where they were
                self.edicts[check].s.origin = vector_subtract(&self.edicts[check].s.origin, &mv);
                if !self.test_entity_position(check) {
                    pushed.pop();
                    continue;
                }
            }

            obstacle = Some(check);
            break;
        }

        if let Some(obstacle) = obstacle {
            // newest first, so an entity pushed twice ends up where it began
            for p in pushed.iter().rev() {
                let e = &mut self.edicts[p.ent];
                e.s.origin = p.origin;
                e.s.angles = p.angles;
                if let Some(client) = self.client_mut(p.ent) {
                    client.ps.pmove.delta_angles[YAW] = p.delta_yaw;
                }
                self.link_entity(p.ent);
            }
            return Err(obstacle);
        }

        // see if anything we moved has touched a trigger
        for p in pushed.iter().rev() {
            let e = &self.edicts[p.ent];
            if e.in_use && e.is_client() && e.health > 0 {
                self.touch_triggers(p.ent);
            }
        }

        Ok(())
    }

    /// Team masters move their whole chain; if any part is blocked nothing
    /// moves and no part thinks this frame.
    fn physics_pusher(&mut self, ent: usize) {
        if self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }

        let dt = self.frame_seconds();
        let mut pushed = Vec::new();
        let mut blocked = None;

        let mut part = Some(ent);
        while let Some(p) = part {
            let e = &self.edicts[p];
            if !vector_is_zero(&e.velocity) || !vector_is_zero(&e.avelocity) {
                let mv = vector_scale(&e.velocity, dt);
                let amove = vector_scale(&e.avelocity, dt);
                if let Err(obstacle) = self.push(p, &mv, &amove, &mut pushed) {
                    blocked = Some((p, obstacle));
                    break;
                }
            }
            part = self.resolve(self.edicts[p].team_chain);
        }

        if let Some((part, obstacle)) = blocked {
            // the move failed, so bump every think back a frame
            let frame = self.frame_millis();
            let mut mv = Some(ent);
            while let Some(m) = mv {
                if self.edicts[m].next_think > 0 {
                    self.edicts[m].next_think += frame;
                }
                mv = self.resolve(self.edicts[m].team_chain);
            }

            // without a blocked function, stay put until the obstacle leaves
            self.call_blocked(part, obstacle);
        } else {
            let mut part = Some(ent);
            while let Some(p) = part {
                let next = self.edicts[p].team_chain;
                self.run_think(p);
                part = self.resolve(next);
            }
        }
    }

    /// A moving object that doesn't obey physics.
    fn physics_noclip(&mut self, ent: usize) {
        if self.run_think(ent) || !self.edicts[ent].in_use {
            return;
        }

        let dt = self.frame_seconds();
        let e = &mut self.edicts[ent];
        e.s.angles = vector_ma(&e.s.angles, dt, &e.avelocity);
        e.s.origin = vector_ma(&e.s.origin, dt, &e.velocity);
        self.link_entity(ent);
    }

    /// Toss, bounce and fly movement. When on ground, do nothing.
    fn physics_toss(&mut self, ent: usize) {
        self.run_think(ent);

        if !self.edicts[ent].in_use || self.edicts[ent].flags.contains(EntityFlags::TEAM_SLAVE) {
            return;
        }

        // check for the ground entity going away
        if self.edicts[ent].ground_entity.is_some() {
            match self.resolve(self.edicts[ent].ground_entity) {
                Some(g) if self.edicts[ent].velocity[2] <= self.edicts[g].velocity[2] + 0.1 => return,
                _ => self.edicts[ent].ground_entity = None,
            }
        }

        self.clamp_velocity(ent);

        let move_type = self.edicts[ent].move_type;
        if move_type != MoveType::Fly {
            self.add_gravity(ent);
        }

        let dt = self.frame_seconds();
        let e = &mut self.edicts[ent];
        e.s.angles = vector_ma(&e.s.angles, dt, &e.avelocity);

        let org = e.s.origin;
        let mv = vector_scale(&e.velocity, dt);

        let trace = self.push_entity(ent, &mv);

        if !self.edicts[ent].in_use {
            return;
        }

        if trace.fraction < 1.0 {
            let overbounce = if move_type == MoveType::Bounce {
                BOUNCE_OVERBOUNCE
            } else {
                1.0
            };
            let (vel, blocked) = clip_velocity(&self.edicts[ent].velocity, &trace.plane.normal, overbounce);
            self.edicts[ent].velocity = vel;

            if blocked == BLOCKED_FLOOR {
                let moved = vector_subtract(&self.edicts[ent].s.origin, &org);

                if move_type != MoveType::Bounce || vector_length(&moved) < STOP_EPSILON {
                    // come to rest
                    let ground = trace.ent.unwrap_or(0);
                    let link_count = self.edicts[ground].link_count;
                    let ground_ref = self.entity_ref(ground);
                    let e = &mut self.edicts[ent];
                    e.velocity = VEC3_ORIGIN;
                    e.ground_entity = Some(ground_ref);
                    e.ground_entity_link_count = link_count;
                } else {
                    // bounce and slide along the floor
                    let e = &mut self.edicts[ent];
                    let bounce = vector_length(&e.velocity).sqrt();
                    if e.velocity[2] < bounce {
                        e.velocity[2] = bounce;
                    }
                }
            }

            // all impacts reduce velocity and angular velocity
            let e = &mut self.edicts[ent];
            e.velocity = vector_scale(&e.velocity, 0.9);
            e.avelocity = vector_scale(&e.avelocity, 0.9);
        }

        self.check_water_transition(ent, &org);

        // move team slaves
        let origin = self.edicts[ent].s.origin;
        let mut slave = self.resolve(self.edicts[ent].team_chain);
        while let Some(s) = slave {
            self.edicts[s].s.origin = origin;
            self.link_entity(s);
            slave = self.resolve(self.edicts[s].team_chain);
        }
    }

    fn check_water_transition(&mut self, ent: usize, old_origin: &Vec3) {
        let was_in_water = self.edicts[ent].water_type & MASK_WATER != 0;
        let origin = self.edicts[ent].s.origin;
        let water_type = self.gi.point_contents(&origin);
        let is_in_water = water_type & MASK_WATER != 0;

        let e = &mut self.edicts[ent];
        e.water_type = water_type;
        e.old_water_level = e.water_level;
        e.water_level = is_in_water as i32;

        if was_in_water == is_in_water {
            return;
        }

        let sound = if is_in_water {
            let e = &mut self.edicts[ent];
            e.velocity = vector_scale(&e.velocity, 0.5);
            self.gi.sound_index("world/water_in")
        } else {
            self.gi.sound_index("world/water_out")
        };
        self.gi.positioned_sound(&origin, Some(0), sound, Attenuation::Norm);

        self.ripple(ent, old_origin, &origin);
    }

    /// Advance one entity by one frame according to its move type.
    pub fn run_entity(&mut self, ent: usize) {
        match self.edicts[ent].move_type {
            MoveType::Push | MoveType::Stop => self.physics_pusher(ent),
            MoveType::None => {
                self.run_think(ent);
            }
            MoveType::NoClip => self.physics_noclip(ent),
            MoveType::Fly | MoveType::Toss | MoveType::Bounce => self.physics_toss(ent),
            MoveType::Walk => {
                // players are moved by the engine's pmove from their commands
                if self.edicts[ent].is_client() {
                    self.run_think(ent);
                } else {
                    self.physics_toss(ent);
                }
            }
        }
    }
}
