// p_hud.rs — player stats, scoreboard and intermission

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

use q2w_common::msg::MessageWriter;

use crate::g_events::SV_CMD_SCORES;
use crate::g_local::*;
use crate::game::SVF_NO_CLIENT;

// player_state->stats[] indexes
pub const STAT_AMMO: usize = 0;
pub const STAT_AMMO_ICON: usize = 1;
pub const STAT_AMMO_LOW: usize = 2;
pub const STAT_ARMOR: usize = 3;
pub const STAT_ARMOR_ICON: usize = 4;
pub const STAT_CAPTURES: usize = 5;
pub const STAT_CHASE: usize = 6;
pub const STAT_DAMAGE_ARMOR: usize = 7;
pub const STAT_DAMAGE_HEALTH: usize = 8;
pub const STAT_DAMAGE_INFLICT: usize = 9;
pub const STAT_FRAGS: usize = 10;
pub const STAT_HEALTH: usize = 11;
pub const STAT_HEALTH_ICON: usize = 12;
pub const STAT_PICKUP_ICON: usize = 13;
pub const STAT_PICKUP_STRING: usize = 14;
pub const STAT_READY: usize = 15;
pub const STAT_ROUND: usize = 16;
pub const STAT_SCORES: usize = 17;
pub const STAT_SPECTATOR: usize = 18;
pub const STAT_TEAM: usize = 19;
pub const STAT_TIME: usize = 20;
pub const STAT_VOTE: usize = 21;
pub const STAT_WEAPON: usize = 22;
pub const STAT_WEAPON_ICON: usize = 23;

// player_score_t flags
pub const SCORES_NOT_READY: u8 = 1 << 0;
pub const SCORES_FLAG: u8 = 1 << 1;

/// Bytes per scoreboard record, including the trailing pad byte the client
/// expects.
pub const PLAYER_SCORE_SIZE: usize = 12;

/// Player number used by the two team pseudo-records.
const TEAM_SCORE_NUM: u16 = MAX_CLIENTS as u16;

const SCORES_INTERVAL: u32 = 3000;
const SCORES_INTERVAL_SHOWN: u32 = 500;

const COLOR_BLUE: u8 = 243;
const COLOR_RED: u8 = 242;

/// One scoreboard row as the client game decodes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerScore {
    pub player_num: u16,
    pub ping: u16,
    /// 0 for no team, 1 good, 2 evil, 0xff spectator.
    pub team: u8,
    pub color: u8,
    pub score: i16,
    pub captures: i16,
    pub flags: u8,
}

impl PlayerScore {
    pub fn write(&self, msg: &mut MessageWriter) {
        msg.write_short(self.player_num as i32)
            .write_short(self.ping as i32)
            .write_byte(self.team as i32)
            .write_byte(self.color as i32)
            .write_short(self.score as i32)
            .write_short(self.captures as i32)
            .write_byte(self.flags as i32)
            .write_byte(0);
    }
}

impl GameCtx {
    // ============================================================
    // Intermission
    // ============================================================

    /// Park the client at the intermission spot with the scoreboard up.
    pub fn client_to_intermission(&mut self, ent: usize) {
        let origin = self.level.intermission_origin;
        let angles = self.level.intermission_angle;

        let e = &mut self.edicts[ent];
        e.s.origin = origin;
        e.s.model1 = 0;
        e.s.model2 = 0;
        e.s.model3 = 0;
        e.s.model4 = 0;
        e.s.effects = 0;
        e.s.sound = 0;
        e.solid = Solid::Not;
        e.dead = true;
        e.sv_flags |= SVF_NO_CLIENT;

        let Some(client) = self.client_mut(ent) else {
            return;
        };
        client.ps.pmove.origin = origin;
        client.ps.pmove.delta_angles = angles;
        client.ps.pmove.view_offset = VEC3_ORIGIN;
        client.ps.pmove.pm_type = PmType::Freeze;
        client.locals.show_scores = true;
        client.locals.scores_time = 0;

        // hide the hud
        client.persistent.weapon = None;
        client.persistent.armor = 0;

        self.link_entity(ent);
    }

    // ============================================================
    // Scoreboard
    // ============================================================

    fn player_score(&self, ent: usize) -> PlayerScore {
        let client = &self.clients[ent - 1];
        let p = &client.persistent;

        let mut s = PlayerScore {
            player_num: (ent - 1) as u16,
            ping: client.ping.min(999) as u16,
            score: p.score,
            captures: p.captures,
            ..Default::default()
        };

        if p.spectator {
            s.team = 0xff;
            return s;
        }

        if self.level.match_ && !p.ready {
            s.flags |= SCORES_NOT_READY;
        }
        if self.level.ctf && self.edicts[ent].s.effects & (EF_CTF_BLUE | EF_CTF_RED) != 0 {
            s.flags |= SCORES_FLAG;
        }

        match p.team {
            Some(TeamId::Good) => {
                s.team = 1;
                s.color = COLOR_BLUE;
            }
            Some(TeamId::Evil) => {
                s.team = 2;
                s.color = COLOR_RED;
            }
            None => s.color = p.color.clamp(0, 255) as u8,
        }
        s
    }

    /// Every connected player, then the two teams in team modes.
    pub fn scoreboard(&self) -> Vec<PlayerScore> {
        let mut scores: Vec<PlayerScore> = (1..=self.max_clients)
            .filter(|&i| self.edicts[i].in_use && self.clients[i - 1].connected)
            .map(|i| self.player_score(i))
            .collect();

        if self.level.teams || self.level.ctf {
            for (id, team) in [(TeamId::Good, 1), (TeamId::Evil, 2)] {
                let t = self.team(id);
                scores.push(PlayerScore {
                    player_num: TEAM_SCORE_NUM,
                    team,
                    score: t.score,
                    captures: t.captures,
                    ..Default::default()
                });
            }
        }

        scores
    }

    /// Send the scoreboard when it is due: quickly while it is shown,
    /// occasionally otherwise.
    pub fn client_scores(&mut self, ent: usize) {
        let time = self.level.time;
        let Some(client) = self.client(ent) else {
            return;
        };
        if client.locals.scores_time > time {
            return;
        }
        let shown = client.locals.show_scores;

        let scores = self.scoreboard();
        let length = scores.len() * PLAYER_SCORE_SIZE;

        self.msg.write_byte(SV_CMD_SCORES as i32).write_short(length as i32);
        for s in &scores {
            s.write(&mut self.msg);
        }
        self.unicast(ent, false);

        let interval = if shown { SCORES_INTERVAL_SHOWN } else { SCORES_INTERVAL };
        if let Some(client) = self.client_mut(ent) {
            client.locals.scores_time = time + interval;
        }
    }

    // ============================================================
    // Stats
    // ============================================================

    /// Fill in the stats array the client's HUD is drawn from.
    pub fn client_stats(&mut self, ent: usize) {
        let weapon = self.client(ent).and_then(|c| c.persistent.weapon);
        let armor = self.client(ent).map(|c| c.persistent.armor).unwrap_or(0);

        let weapon_icons = weapon.map(|w| {
            let info = w.info();
            (
                self.gi.image_index(&format!("w_{}", w.name().to_ascii_lowercase().replace(' ', "_"))),
                self.gi.model_index(info.model),
                info.ammo,
            )
        });
        let ammo_icon = weapon_icons
            .and_then(|(_, _, ammo)| ammo)
            .map(|a| (a, self.gi.image_index(&format!("a_{}", a.name()))));

        let armor_icon = match armor {
            a if a >= 200 => self.gi.image_index("i_bodyarmor"),
            a if a >= 100 => self.gi.image_index("i_combatarmor"),
            a if a >= 50 => self.gi.image_index("i_jacketarmor"),
            a if a > 0 => self.gi.image_index("i_shard"),
            _ => 0,
        };
        let health_icon = self.gi.image_index("i_health");

        let level = &self.level;
        let team_stat = match self.team_of(ent) {
            Some(TeamId::Good) if level.teams || level.ctf => CS_TEAM_GOOD as i16,
            Some(TeamId::Evil) if level.teams || level.ctf => CS_TEAM_EVIL as i16,
            _ => 0,
        };
        let (intermission, match_, match_time, rounds, round_num, vote_time) = (
            level.intermission_time != 0,
            level.match_,
            level.match_time,
            level.rounds,
            level.round_num,
            level.vote_time,
        );
        let (dead, health) = (self.edicts[ent].dead, self.edicts[ent].health);
        let time = self.level.time;

        let Some(client) = self.client_mut(ent) else {
            return;
        };
        let p = &client.persistent;
        let stats = &mut client.ps.stats;

        match ammo_icon {
            Some((ammo, icon)) => {
                stats[STAT_AMMO_ICON] = icon as i16;
                stats[STAT_AMMO] = p.ammo[ammo.index()];
                stats[STAT_AMMO_LOW] = ammo.pickup_quantity();
            }
            None => {
                stats[STAT_AMMO_ICON] = 0;
                stats[STAT_AMMO] = 0;
                stats[STAT_AMMO_LOW] = 0;
            }
        }

        stats[STAT_ARMOR_ICON] = armor_icon as i16;
        stats[STAT_ARMOR] = p.armor;
        stats[STAT_CAPTURES] = p.captures;

        stats[STAT_DAMAGE_ARMOR] = client.locals.damage_armor;
        stats[STAT_DAMAGE_HEALTH] = client.locals.damage_health;
        stats[STAT_DAMAGE_INFLICT] = client.locals.damage_inflicted;

        stats[STAT_FRAGS] = p.score;

        if p.spectator || dead {
            stats[STAT_HEALTH_ICON] = 0;
            stats[STAT_HEALTH] = 0;
        } else {
            stats[STAT_HEALTH_ICON] = health_icon as i16;
            stats[STAT_HEALTH] = health.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }

        if client.locals.pickup_msg_time <= time {
            stats[STAT_PICKUP_ICON] = 0;
            stats[STAT_PICKUP_STRING] = 0;
        }

        stats[STAT_READY] = (match_ && match_time != 0 && p.ready) as i16;
        stats[STAT_ROUND] = if rounds { round_num as i16 + 1 } else { 0 };
        stats[STAT_SCORES] = (intermission || client.locals.show_scores) as i16;
        stats[STAT_SPECTATOR] = 0;
        stats[STAT_CHASE] = 0;
        stats[STAT_TEAM] = team_stat;
        stats[STAT_TIME] = if intermission { 0 } else { CS_TIME as i16 };
        stats[STAT_VOTE] = if vote_time != 0 { CS_VOTE as i16 } else { 0 };

        match weapon_icons {
            Some((icon, model, _)) => {
                stats[STAT_WEAPON_ICON] = icon as i16;
                stats[STAT_WEAPON] = model as i16;
            }
            None => {
                stats[STAT_WEAPON_ICON] = 0;
                stats[STAT_WEAPON] = 0;
            }
        }
    }

    /// A chasing spectator sees the target's HUD, but keeps their own
    /// scoreboard toggle.
    pub fn client_spectator_stats(&mut self, ent: usize) {
        let target = self.client(ent).and_then(|c| self.resolve(c.locals.chase_target));
        let intermission = self.level.intermission_time != 0;

        match target {
            Some(target) => {
                let Some(client) = self.client_mut(ent) else {
                    return;
                };
                client.ps.stats[STAT_SPECTATOR] = 1;
                client.ps.stats[STAT_CHASE] = (CS_CLIENTS + target - 1) as i16;
                client.ps.stats[STAT_SCORES] = (intermission || client.locals.show_scores) as i16;
            }
            None => {
                self.client_stats(ent);
                if let Some(client) = self.client_mut(ent) {
                    client.ps.stats[STAT_SPECTATOR] = 1;
                    client.ps.stats[STAT_CHASE] = 0;
                }
            }
        }
    }
}
