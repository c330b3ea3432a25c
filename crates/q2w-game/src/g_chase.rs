// g_chase.rs — spectator chase camera

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

impl GameCtx {
    /// A player a spectator may follow.
    fn is_chaseable(&self, ent: usize) -> bool {
        self.edicts[ent].in_use && self.client(ent).map(|c| !c.persistent.spectator).unwrap_or(false)
    }

    /// Mirror the followed player's view.
    pub fn chase_think(&mut self, ent: usize) {
        let Some(target) = self.client(ent).and_then(|c| self.resolve(c.locals.chase_target)) else {
            return;
        };
        if self.client(target).is_none() {
            return;
        }

        let mut ps = self.clients[target - 1].ps;
        let angles = self.clients[target - 1].locals.angles;
        ps.pmove.pm_flags |= PMF_NO_PREDICTION;
        ps.pmove.pm_type = if self.edicts[target].dead {
            PmType::Dead
        } else {
            PmType::Freeze
        };

        let origin = self.edicts[target].s.origin;
        let client = &mut self.clients[ent - 1];
        client.ps = ps;
        client.locals.angles = angles;

        self.edicts[ent].s.origin = origin;
        self.link_entity(ent);
    }

    fn chase_step(&mut self, ent: usize, forward: bool) {
        let Some(current) = self.client(ent).and_then(|c| self.resolve(c.locals.chase_target)) else {
            return;
        };

        let n = self.max_clients;
        let mut i = current;
        loop {
            i = if forward {
                if i >= n { 1 } else { i + 1 }
            } else if i <= 1 {
                n
            } else {
                i - 1
            };
            if i == current || self.is_chaseable(i) {
                break;
            }
        }

        let target = self.entity_ref(i);
        self.clients[ent - 1].locals.chase_target = Some(target);
        self.chase_think(ent);
    }

    pub fn chase_next(&mut self, ent: usize) {
        self.chase_step(ent, true);
    }

    pub fn chase_prev(&mut self, ent: usize) {
        self.chase_step(ent, false);
    }

    /// Start following the first player in the game.
    pub fn chase_target(&mut self, ent: usize) {
        let found = (1..=self.max_clients).find(|&i| i != ent && self.is_chaseable(i));

        match found {
            Some(i) => {
                let target = self.entity_ref(i);
                let client = &mut self.clients[ent - 1];
                client.locals.chase_target = Some(target);
                client.locals.old_chase_target = Some(target);
                self.chase_think(ent);
            }
            None => self.center_print(ent, "No players to chase"),
        }
    }
}
