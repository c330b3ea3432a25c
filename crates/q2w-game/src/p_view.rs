// p_view.rs — per-client end of frame: view angles, water, footsteps, HUD

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

use crate::g_local::*;
use crate::game_import::Attenuation;

const AIR_TIME: u32 = 12_000;
const DROWN_INTERVAL: u32 = 1000;
const DROWN_DAMAGE_MAX: i32 = 15;
const SIZZLE_INTERVAL: u32 = 200;
const FOOTSTEP_INTERVAL: u32 = 275;
const FOOTSTEP_SPEED: f32 = 250.0;

impl GameCtx {
    /// Water transitions, drowning and lava/slime sizzle.
    fn client_water_level(&mut self, ent: usize) {
        let time = self.level.time;

        if self.edicts[ent].move_type == MoveType::NoClip {
            self.clients[ent - 1].locals.drown_time = time + AIR_TIME;
            return;
        }

        let e = &mut self.edicts[ent];
        let water_level = e.water_level;
        let old_water_level = e.old_water_level;
        let water_type = e.water_type;
        e.old_water_level = water_level;

        if old_water_level == 0 && water_level != 0 {
            let sound = self.gi.sound_index("world/water_in");
            self.gi.sound(ent, sound, Attenuation::Norm);
        } else if old_water_level != 0 && water_level == 0 {
            let sound = self.gi.sound_index("world/water_out");
            self.gi.sound(ent, sound, Attenuation::Norm);
        }

        let drown_time = self.clients[ent - 1].locals.drown_time;

        // head coming up after a while under
        if old_water_level == 3 && water_level != 3 && drown_time.saturating_sub(time) < 8000 {
            let sound = self.gi.sound_index("*gasp_1");
            let origin = self.edicts[ent].s.origin;
            self.gi.positioned_sound(&origin, Some(ent), sound, Attenuation::Norm);
        }

        if water_level != 3 {
            self.clients[ent - 1].locals.drown_time = time + AIR_TIME;
            self.edicts[ent].dmg = 0;
        } else if drown_time < time && self.edicts[ent].health > 0 {
            self.clients[ent - 1].locals.drown_time = time + DROWN_INTERVAL;

            // more damage the longer under water
            let e = &mut self.edicts[ent];
            e.dmg = (e.dmg + 2).min(DROWN_DAMAGE_MAX);
            let dmg = e.dmg;
            let origin = e.s.origin;

            let sound = if self.edicts[ent].health <= dmg {
                self.gi.sound_index("*drown_1")
            } else {
                self.gi.sound_index("*gurp_1")
            };
            self.gi.sound(ent, sound, Attenuation::Norm);

            self.damage(ent, 0, 0, &VEC3_ORIGIN, &origin, &VEC3_ORIGIN, dmg, 0, DAMAGE_NO_ARMOR, MOD_WATER);
        }

        if water_level != 0
            && water_type & (CONTENTS_LAVA | CONTENTS_SLIME) != 0
            && self.clients[ent - 1].locals.sizzle_time <= time
            && self.edicts[ent].health > 0
        {
            self.clients[ent - 1].locals.sizzle_time = time + SIZZLE_INTERVAL;
            let origin = self.edicts[ent].s.origin;

            if water_type & CONTENTS_LAVA != 0 {
                self.damage(ent, 0, 0, &VEC3_ORIGIN, &origin, &VEC3_ORIGIN, 2 * water_level, 0, DAMAGE_NO_ARMOR, MOD_LAVA);
            }
            if water_type & CONTENTS_SLIME != 0 {
                self.damage(ent, 0, 0, &VEC3_ORIGIN, &origin, &VEC3_ORIGIN, water_level, 0, DAMAGE_NO_ARMOR, MOD_SLIME);
            }
        }
    }

    /// Model angles follow the view so others can see where we look.
    fn client_view_angles(&mut self, ent: usize) {
        let angles = self.clients[ent - 1].locals.angles;
        let (_, right, _) = angle_vectors_tuple(&angles);

        let e = &mut self.edicts[ent];
        e.s.angles[PITCH] = if angles[PITCH] > 180.0 {
            (angles[PITCH] - 360.0) / 3.0
        } else {
            angles[PITCH] / 3.0
        };
        e.s.angles[YAW] = angles[YAW];

        // roll into lateral movement, less so in the air
        e.s.angles[ROLL] = dot_product(&e.velocity, &right) * 0.025;
        if e.ground_entity.is_none() {
            e.s.angles[ROLL] *= 0.25;
        }
    }

    fn client_footsteps(&mut self, ent: usize) {
        let time = self.level.time;
        let e = &self.edicts[ent];
        if e.ground_entity.is_none() || e.move_type != MoveType::Walk || e.s.event != EntityEvent::None {
            return;
        }

        let xy_speed = (e.velocity[0] * e.velocity[0] + e.velocity[1] * e.velocity[1]).sqrt();
        if xy_speed > FOOTSTEP_SPEED && self.clients[ent - 1].locals.footstep_time < time {
            self.clients[ent - 1].locals.footstep_time = time + FOOTSTEP_INTERVAL;
            self.edicts[ent].s.event = EntityEvent::ClientFootstep;
        }
    }

    /// Called for each client at the end of the server frame.
    pub fn client_end_frame(&mut self, ent: usize) {
        if self.client(ent).is_none() {
            return;
        }

        // pushers and explosions move the body after the command ran
        let (origin, velocity) = (self.edicts[ent].s.origin, self.edicts[ent].velocity);
        let client = &mut self.clients[ent - 1];
        client.ps.pmove.origin = origin;
        client.ps.pmove.velocity = velocity;

        if self.level.intermission_time != 0 {
            self.client_stats(ent);
            self.client_scores(ent);
            return;
        }

        if self.clients[ent - 1].locals.chase_target.is_some() {
            self.chase_think(ent);
        } else {
            self.client_water_level(ent);
            self.client_view_angles(ent);
            self.client_footsteps(ent);
        }

        if self.clients[ent - 1].persistent.spectator {
            self.client_spectator_stats(ent);
        } else {
            self.client_stats(ent);
        }

        self.client_scores(ent);

        // damage totals are reported once
        let locals = &mut self.clients[ent - 1].locals;
        locals.damage_armor = 0;
        locals.damage_health = 0;
        locals.damage_inflicted = 0;
    }

    /// Finalize every connected client's outgoing state.
    pub fn end_client_frames(&mut self) {
        for ent in 1..=self.max_clients {
            if self.is_live_client(ent) {
                self.client_end_frame(ent);
            }
        }
    }
}
