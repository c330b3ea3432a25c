// g_utils.rs — entity store and general utilities

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
use rayon::prelude::*;

use crate::dispatch::ThinkFn;
use crate::error::{GameError, GameResult};
use crate::g_local::*;
use crate::game_import::{Attenuation, LinkState};

const MAX_CHOICES: usize = 8;

/// Slots freed this early in a level may be handed out again at once.
const FREE_GRACE_TIME: u32 = 2000;
/// Otherwise a freed slot rests this long so clients drop the old entity.
const FREE_REUSE_DELAY: u32 = 500;

const MOVEDIR_UP: Vec3 = [0.0, 0.0, 1.0];
const MOVEDIR_DOWN: Vec3 = [0.0, 0.0, -1.0];

/// Projects a muzzle offset (forward, right, up) from `point`.
pub fn project_source(point: &Vec3, distance: &Vec3, forward: &Vec3, right: &Vec3) -> Vec3 {
    [
        point[0] + forward[0] * distance[0] + right[0] * distance[1],
        point[1] + forward[1] * distance[0] + right[1] * distance[1],
        point[2] + forward[2] * distance[0] + right[2] * distance[1] + distance[2],
    ]
}

/// Convert a vector to a string for printing.
pub fn vtos(v: &Vec3) -> String {
    format!("({} {} {})", v[0] as i32, v[1] as i32, v[2] as i32)
}

/// Editor angles to a movement direction. `(0 -1 0)` is up and `(0 -2 0)`
/// is down. The angles are cleared.
pub fn set_move_dir(angles: &mut Vec3) -> Vec3 {
    let dir = if vector_compare(angles, &[0.0, -1.0, 0.0]) {
        MOVEDIR_UP
    } else if vector_compare(angles, &[0.0, -2.0, 0.0]) {
        MOVEDIR_DOWN
    } else {
        angle_vectors_tuple(angles).0
    };
    *angles = VEC3_ORIGIN;
    dir
}

impl GameCtx {
    // ============================================================
    // References
    // ============================================================

    pub fn entity_ref(&self, ent: usize) -> EntityRef {
        EntityRef {
            index: ent,
            generation: self.edicts[ent].generation,
        }
    }

    /// The slot behind `r`, if it still holds the same entity.
    pub fn resolve(&self, r: Option<EntityRef>) -> Option<usize> {
        let r = r?;
        let e = self.edicts.get(r.index)?;
        (e.in_use && e.generation == r.generation).then_some(r.index)
    }

    pub fn etos(&self, ent: usize) -> String {
        let e = &self.edicts[ent];
        format!("{} @ {}", e.class_name, vtos(&e.abs_center()))
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    pub fn init_entity(&mut self, ent: usize) {
        let time = self.level.time;
        let e = &mut self.edicts[ent];
        let generation = e.generation;
        let client = e.client;
        *e = Edict {
            generation,
            client,
            in_use: true,
            class_name: "noclass".into(),
            gravity: 1.0,
            timestamp: time,
            ..Default::default()
        };
        e.s.number = ent as u16;
    }

    /// Hands out the lowest reusable slot after the players, or a new one
    /// while under capacity.
    pub fn alloc_entity(&mut self, class_name: &str) -> GameResult<usize> {
        let time = self.level.time;
        let reusable = (self.max_clients + 1..self.num_edicts).find(|&i| {
            let e = &self.edicts[i];
            !e.in_use
                && !e.pending_free
                && (e.free_time < FREE_GRACE_TIME || time.saturating_sub(e.free_time) > FREE_REUSE_DELAY)
        });

        let ent = match reusable {
            Some(i) => i,
            None if self.num_edicts < self.max_entities => {
                self.num_edicts += 1;
                self.num_edicts - 1
            }
            None => {
                warn!("no free entity slot for {}", class_name);
                return Err(GameError::EntityStoreFull(self.max_entities));
            }
        };

        self.init_entity(ent);
        self.edicts[ent].class_name = class_name.to_string();
        Ok(ent)
    }

    /// Marks the entity free. The slot stays out of circulation until the
    /// end-of-frame sweep, so a scan in progress never sees it reused.
    pub fn free_entity(&mut self, ent: usize) {
        if ent == 0 || self.edicts[ent].is_client() {
            warn!("refusing to free reserved slot {}", ent);
            return;
        }

        self.unlink_entity(ent);

        let generation = self.edicts[ent].generation.wrapping_add(1);
        self.edicts[ent] = Edict {
            generation,
            pending_free: true,
            free_time: self.level.time,
            class_name: "freed".into(),
            ..Default::default()
        };
        self.edicts[ent].s.number = ent as u16;
    }

    pub fn sweep_freed(&mut self) {
        for e in self.edicts[..self.num_edicts].iter_mut() {
            e.pending_free = false;
        }
    }

    // ============================================================
    // Linking
    // ============================================================

    /// Recompute absolute bounds and hand the entity to the collision world.
    /// Call after any change to origin, bounds or solidity.
    pub fn link_entity(&mut self, ent: usize) {
        let owner = self.resolve(self.edicts[ent].owner);
        let e = &mut self.edicts[ent];

        e.size = vector_subtract(&e.maxs, &e.mins);

        if e.solid == Solid::Bsp && !vector_is_zero(&e.s.angles) {
            // rotated models get a cube that contains every orientation
            let max = (0..3)
                .map(|i| e.mins[i].abs().max(e.maxs[i].abs()))
                .fold(0.0f32, f32::max);
            for i in 0..3 {
                e.abs_mins[i] = e.s.origin[i] - max;
                e.abs_maxs[i] = e.s.origin[i] + max;
            }
        } else {
            e.abs_mins = vector_add(&e.s.origin, &e.mins);
            e.abs_maxs = vector_add(&e.s.origin, &e.maxs);
        }

        // touching boxes must also overlap
        for i in 0..3 {
            e.abs_mins[i] -= 1.0;
            e.abs_maxs[i] += 1.0;
        }

        e.s.solid = e.solid as u16;
        e.linked = true;
        e.link_count += 1;

        let link = LinkState {
            origin: e.s.origin,
            angles: e.s.angles,
            mins: e.mins,
            maxs: e.maxs,
            abs_mins: e.abs_mins,
            abs_maxs: e.abs_maxs,
            solid: e.solid,
            owner,
            sv_flags: e.sv_flags,
            clip_mask: e.clip_mask,
            model: e.s.model1,
        };
        self.gi.link_entity(ent, &link);
    }

    /// Bind the entity's model and take its bounds. Inline brush models
    /// carry their own extents.
    pub fn set_brush_model(&mut self, ent: usize) {
        let model = self.edicts[ent].model.clone();
        if model.is_empty() {
            warn!("{} with no model", self.etos(ent));
            return;
        }
        let info = self.gi.set_model(&model);
        let e = &mut self.edicts[ent];
        e.s.model1 = info.index;
        e.mins = info.mins;
        e.maxs = info.maxs;
        e.size = vector_subtract(&info.maxs, &info.mins);
    }

    pub fn unlink_entity(&mut self, ent: usize) {
        if self.edicts[ent].linked {
            self.edicts[ent].linked = false;
            self.gi.unlink_entity(ent);
        }
    }

    // ============================================================
    // Searches
    // ============================================================

    /// Next in-use entity after `from` whose class name matches.
    pub fn find_by_class_name(&self, from: Option<usize>, name: &str) -> Option<usize> {
        let start = from.map(|f| f + 1).unwrap_or(0);
        (start..self.num_edicts)
            .find(|&i| self.edicts[i].in_use && q_streq_nocase(&self.edicts[i].class_name, name))
    }

    pub fn find_by_target_name(&self, from: Option<usize>, name: &str) -> Option<usize> {
        let start = from.map(|f| f + 1).unwrap_or(0);
        (start..self.num_edicts)
            .find(|&i| self.edicts[i].in_use && q_streq_nocase(&self.edicts[i].target_name, name))
    }

    pub fn find_all_by_target_name(&self, name: &str) -> Vec<usize> {
        if name.is_empty() {
            return Vec::new();
        }
        (0..self.num_edicts)
            .filter(|&i| self.edicts[i].in_use && q_streq_nocase(&self.edicts[i].target_name, name))
            .collect()
    }

    /// In-use, non-`Not` solid entities other than the world whose center
    /// lies within `radius`. Slot order is preserved.
    pub fn find_radius(&self, origin: &Vec3, radius: f32) -> Vec<usize> {
        self.edicts[1..self.num_edicts]
            .par_iter()
            .enumerate()
            .filter(|(_, e)| e.in_use && e.solid != Solid::Not)
            .filter(|(_, e)| {
                let center = vector_add(&e.s.origin, &vector_mix(&e.mins, &e.maxs, 0.5));
                vector_distance(origin, &center) <= radius
            })
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// A random entity among those named `target_name`.
    pub fn pick_target(&mut self, target_name: &str) -> Option<usize> {
        if target_name.is_empty() {
            debug!("pick_target called with empty name");
            return None;
        }

        let mut choices = self.find_all_by_target_name(target_name);
        choices.truncate(MAX_CHOICES);

        if choices.is_empty() {
            debug!("target {} not found", target_name);
            return None;
        }

        let i = self.randomi(choices.len());
        Some(choices[i])
    }

    // ============================================================
    // Targets
    // ============================================================

    /// Fire the entity's targets: kill targets are removed, every matching
    /// target is used, and a message is printed to the activator.
    pub fn use_targets(&mut self, ent: usize, activator: Option<usize>) {
        let e = &self.edicts[ent];

        if e.delay > 0.0 {
            let (delay, message, target, kill_target) =
                (e.delay, e.message.clone(), e.target.clone(), e.kill_target.clone());

            let Ok(t) = self.alloc_entity("delayed_use") else {
                return;
            };
            let activator_ref = activator.map(|a| self.entity_ref(a));
            if activator.is_none() {
                debug!("delayed use with no activator from {}", self.etos(ent));
            }

            let time = self.level.time;
            let d = &mut self.edicts[t];
            d.next_think = time + (delay * 1000.0) as u32;
            d.think = Some(ThinkFn::DelayedUse);
            d.activator = activator_ref;
            d.message = message;
            d.target = target;
            d.kill_target = kill_target;
            return;
        }

        if let Some(a) = activator {
            let e = &self.edicts[ent];
            if !e.message.is_empty() && self.edicts[a].is_client() {
                let message = e.message.clone();
                let noise = e.noise_index;
                self.center_print(a, &message);
                let sound = if noise != 0 {
                    noise
                } else {
                    self.gi.sound_index("misc/chat")
                };
                self.gi.sound(a, sound, Attenuation::Norm);
            }
        }

        let kill_target = self.edicts[ent].kill_target.clone();
        for t in self.find_all_by_target_name(&kill_target) {
            self.free_entity(t);
            if !self.edicts[ent].in_use {
                debug!("entity {} was removed while killing targets", ent);
                return;
            }
        }

        let target = self.edicts[ent].target.clone();
        let is_door = matches!(self.edicts[ent].class_name.as_str(), "func_door" | "func_door_rotating");

        for t in self.find_all_by_target_name(&target) {
            if !self.edicts[t].in_use {
                continue;
            }

            // doors fire area portals in their own open and close handlers
            if is_door && q_streq_nocase(&self.edicts[t].class_name, "func_areaportal") {
                continue;
            }

            if t == ent {
                warn!("{} used itself", self.etos(ent));
            } else {
                self.call_use(t, Some(ent), activator);
            }

            if !self.edicts[ent].in_use {
                debug!("entity {} was removed while using targets", ent);
                return;
            }
        }
    }

    pub fn delayed_use_think(&mut self, ent: usize) {
        let activator = self.resolve(self.edicts[ent].activator);
        self.use_targets(ent, activator);
        self.free_entity(ent);
    }

    // ============================================================
    // Occupancy
    // ============================================================

    /// Touch every trigger overlapping the entity. Dead players touch nothing.
    pub fn touch_triggers(&mut self, ent: usize) {
        let e = &self.edicts[ent];
        if e.is_client() && e.health <= 0 {
            return;
        }
        let (abs_mins, abs_maxs) = (e.abs_mins, e.abs_maxs);

        let triggers: Vec<usize> = (1..self.num_edicts)
            .filter(|&i| {
                let t = &self.edicts[i];
                i != ent
                    && t.in_use
                    && t.linked
                    && t.solid == Solid::Trigger
                    && t.touch.is_some()
                    && bounds_intersect(&abs_mins, &abs_maxs, &t.abs_mins, &t.abs_maxs)
            })
            .collect();

        for t in triggers {
            if !self.edicts[t].in_use {
                continue;
            }
            self.call_touch(t, ent, None, None);
            if !self.edicts[ent].in_use {
                break;
            }
        }
    }

    /// Have a freshly linked trigger touch every solid already inside it.
    pub fn touch_solids(&mut self, ent: usize) {
        let e = &self.edicts[ent];
        if e.touch.is_none() {
            return;
        }
        let (abs_mins, abs_maxs) = (e.abs_mins, e.abs_maxs);

        let solids: Vec<usize> = (1..self.num_edicts)
            .filter(|&i| {
                let o = &self.edicts[i];
                i != ent
                    && o.in_use
                    && o.linked
                    && matches!(o.solid, Solid::Box | Solid::Bsp | Solid::Missile)
                    && bounds_intersect(&abs_mins, &abs_maxs, &o.abs_mins, &o.abs_maxs)
            })
            .collect();

        for other in solids {
            if !self.edicts[other].in_use {
                continue;
            }
            self.call_touch(ent, other, None, None);
            if !self.edicts[ent].in_use {
                break;
            }
        }
    }

    /// Telefrag everything occupying the entity's box. False if something
    /// solid (the world included) is still there afterwards.
    pub fn kill_box(&mut self, ent: usize) -> bool {
        let e = &self.edicts[ent];
        let (origin, mins, maxs) = (e.s.origin, e.mins, e.maxs);

        loop {
            let tr = self.gi.trace(
                &origin,
                &mins,
                &maxs,
                &origin,
                Some(ent),
                MASK_PLAYER_SOLID | CONTENTS_DEAD_MONSTER,
            );
            let Some(hit) = tr.ent.filter(|_| tr.start_solid) else {
                break;
            };

            self.damage(
                hit,
                ent,
                ent,
                &VEC3_ORIGIN,
                &origin,
                &VEC3_ORIGIN,
                999,
                0,
                DAMAGE_NO_PROTECTION,
                MOD_TELEFRAG,
            );

            if hit == 0 || self.edicts[hit].solid != Solid::Not {
                return false;
            }
        }

        true
    }
}
