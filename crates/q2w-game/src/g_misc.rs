// g_misc.rs — point entities: path corners, info markers, speakers, explosions

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

use crate::dispatch::{ThinkFn, UseFn};
use crate::g_events::TempEvent;
use crate::g_local::*;
use crate::g_utils::vtos;
use crate::game::SVF_NO_CLIENT;
use crate::game_import::{Attenuation, Multicast};

const SPEAKER_LOOPED_ON: u32 = 1;
const SPEAKER_LOOPED_OFF: u32 = 2;

impl GameCtx {
    // =========================================================
    // Markers
    // =========================================================

    /// Waypoint for trains. Unnamed corners can never be reached.
    pub fn sp_path_corner(&mut self, ent: usize) {
        if self.edicts[ent].target_name.is_empty() {
            debug!("path_corner with no targetname at {}", vtos(&self.edicts[ent].s.origin));
            self.free_entity(ent);
            return;
        }
        self.edicts[ent].sv_flags |= SVF_NO_CLIENT;
    }

    pub fn sp_info_null(&mut self, ent: usize) {
        self.free_entity(ent);
    }

    /// Positional target for lights and the like.
    pub fn sp_info_notnull(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.abs_mins = e.s.origin;
        e.abs_maxs = e.s.origin;
    }

    // Spawn points are looked up by class name when players spawn and when
    // the level ends, so they need no setup of their own.

    pub fn sp_info_player_start(&mut self, _ent: usize) {}

    pub fn sp_info_player_deathmatch(&mut self, _ent: usize) {}

    pub fn sp_info_player_team1(&mut self, _ent: usize) {}

    pub fn sp_info_player_team2(&mut self, _ent: usize) {}

    pub fn sp_info_player_intermission(&mut self, _ent: usize) {}

    // =========================================================
    // target_speaker
    // =========================================================

    pub fn target_speaker_use(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];

        if e.spawn_flags & (SPEAKER_LOOPED_ON | SPEAKER_LOOPED_OFF) != 0 {
            e.s.sound = if e.s.sound != 0 { 0 } else { e.noise_index };
        } else {
            let (origin, noise) = (e.s.origin, e.noise_index);
            let atten = e.attenuation.unwrap_or(Attenuation::Norm);
            self.gi.positioned_sound(&origin, Some(ent), noise, atten);
        }
    }

    /// Plays `noise` when used. Looped speakers toggle an ambient sound.
    pub fn sp_target_speaker(&mut self, ent: usize) {
        if self.st.noise.is_empty() {
            debug!("target_speaker with no noise at {}", vtos(&self.edicts[ent].s.origin));
            return;
        }

        let noise = self.gi.sound_index(&self.st.noise);

        let e = &mut self.edicts[ent];
        e.noise_index = noise;
        if e.attenuation.is_none() {
            e.attenuation = Some(Attenuation::Norm);
        }

        if e.spawn_flags & SPEAKER_LOOPED_ON != 0 {
            e.s.sound = noise;
        }

        e.use_fn = Some(UseFn::TargetSpeaker);

        // linked so the engine hears looped sounds
        self.link_entity(ent);
    }

    // =========================================================
    // target_explosion
    // =========================================================

    pub fn target_explosion_explode(&mut self, ent: usize) {
        let origin = self.edicts[ent].s.origin;
        self.temp_event(&TempEvent::Explosion { pos: origin }, &origin, Multicast::Phs);

        let attacker = self.resolve(self.edicts[ent].activator).unwrap_or(ent);
        let dmg = self.edicts[ent].dmg;
        self.radius_damage(ent, attacker, None, dmg, dmg, (dmg + 40) as f32, MOD_EXPLOSIVE);

        // the delay has been served
        let delay = self.edicts[ent].delay;
        self.edicts[ent].delay = 0.0;
        let activator = self.resolve(self.edicts[ent].activator);
        self.use_targets(ent, activator);
        if self.edicts[ent].in_use {
            self.edicts[ent].delay = delay;
        }
    }

    pub fn target_explosion_use(&mut self, ent: usize, activator: Option<usize>) {
        self.edicts[ent].activator = activator.map(|a| self.entity_ref(a));

        if self.edicts[ent].delay == 0.0 {
            self.target_explosion_explode(ent);
            return;
        }

        let time = self.level.time;
        let e = &mut self.edicts[ent];
        e.think = Some(ThinkFn::TargetExplosion);
        e.next_think = time + (e.delay * 1000.0) as u32;
    }

    /// Explodes for `dmg` radius damage each time it is used.
    pub fn sp_target_explosion(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.use_fn = Some(UseFn::TargetExplosion);
        e.sv_flags = SVF_NO_CLIENT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_events::TE_EXPLOSION;
    use crate::test_support::*;

    #[test]
    fn test_unnamed_path_corner_is_removed() {
        let (mut ctx, _) = make_ctx(1, 64);
        let lost = ctx.alloc_entity("path_corner").unwrap();
        ctx.sp_path_corner(lost);
        assert!(!ctx.edicts[lost].in_use);

        let named = ctx.alloc_entity("path_corner").unwrap();
        ctx.edicts[named].target_name = "p1".into();
        ctx.sp_path_corner(named);
        assert!(ctx.edicts[named].in_use);
    }

    #[test]
    fn test_info_markers() {
        let (mut ctx, _) = make_ctx(1, 64);
        let null = ctx.alloc_entity("info_null").unwrap();
        ctx.sp_info_null(null);
        assert!(!ctx.edicts[null].in_use);

        let notnull = ctx.alloc_entity("info_notnull").unwrap();
        ctx.edicts[notnull].s.origin = [8.0, 16.0, 32.0];
        ctx.sp_info_notnull(notnull);
        assert_eq!(ctx.edicts[notnull].abs_mins, [8.0, 16.0, 32.0]);
        assert_eq!(ctx.edicts[notnull].abs_maxs, [8.0, 16.0, 32.0]);
    }

    // ============================================================
    // Speakers
    // ============================================================

    #[test]
    fn test_speaker_plays_once_per_use() {
        let (mut ctx, world) = make_ctx(1, 64);
        let speaker = ctx.alloc_entity("target_speaker").unwrap();
        ctx.st.noise = "world/alarm".into();
        ctx.sp_target_speaker(speaker);
        assert_eq!(ctx.edicts[speaker].attenuation, Some(Attenuation::Norm));
        assert_eq!(ctx.edicts[speaker].s.sound, 0);

        ctx.target_speaker_use(speaker);
        ctx.target_speaker_use(speaker);
        assert_eq!(world.borrow().positioned_sounds.len(), 2);
    }

    #[test]
    fn test_looped_speaker_toggles() {
        let (mut ctx, world) = make_ctx(1, 64);
        let speaker = ctx.alloc_entity("target_speaker").unwrap();
        ctx.edicts[speaker].spawn_flags = SPEAKER_LOOPED_ON;
        ctx.st.noise = "world/hum".into();
        ctx.sp_target_speaker(speaker);
        let noise = ctx.edicts[speaker].noise_index;
        assert_ne!(noise, 0);
        assert_eq!(ctx.edicts[speaker].s.sound, noise);

        ctx.target_speaker_use(speaker);
        assert_eq!(ctx.edicts[speaker].s.sound, 0);
        ctx.target_speaker_use(speaker);
        assert_eq!(ctx.edicts[speaker].s.sound, noise);
        assert!(world.borrow().positioned_sounds.is_empty());
    }

    #[test]
    fn test_speaker_without_noise_is_inert() {
        let (mut ctx, _) = make_ctx(1, 64);
        let speaker = ctx.alloc_entity("target_speaker").unwrap();
        ctx.sp_target_speaker(speaker);
        assert!(ctx.edicts[speaker].use_fn.is_none());
    }

    // ============================================================
    // Explosions
    // ============================================================

    #[test]
    fn test_explosion_damages_nearby_player() {
        let (mut ctx, world) = make_ctx(1, 64);
        let boom = ctx.alloc_entity("target_explosion").unwrap();
        ctx.edicts[boom].dmg = 50;
        ctx.edicts[boom].s.origin = [0.0, 0.0, 0.0];
        ctx.sp_target_explosion(boom);
        spawn_test_client(&mut ctx, 1, [32.0, 0.0, 0.0]);

        ctx.call_use(boom, None, None);

        assert!(ctx.edicts[1].health < 100);
        assert_eq!(world.borrow().temp_event_types().first(), Some(&TE_EXPLOSION));
        assert!(ctx.edicts[boom].in_use);
    }

    #[test]
    fn test_delayed_explosion() {
        let (mut ctx, world) = make_ctx(1, 64);
        let boom = ctx.alloc_entity("target_explosion").unwrap();
        ctx.edicts[boom].delay = 0.5;
        ctx.sp_target_explosion(boom);

        ctx.target_explosion_use(boom, None);
        assert!(world.borrow().multicasts.is_empty());
        assert_eq!(ctx.edicts[boom].next_think, ctx.level.time + 500);

        ctx.level.time += 500;
        ctx.run_entity(boom);
        assert_eq!(world.borrow().temp_event_types(), vec![TE_EXPLOSION]);
        assert!((ctx.edicts[boom].delay - 0.5).abs() < 1e-6);
    }
}
