// g_main.rs — module init, level rules, voting and the per-frame scheduler

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

use log::{debug, error, info, warn};

use q2w_common::cvar::CvarFlags;

use crate::error::GameResult;
use crate::g_local::*;
use crate::g_map_list::{MapList, MAP_LIST_FILE};
use crate::game::GameExport;
use crate::game_import::{Attenuation, PrintLevel};

/// Game cvars and their defaults.
const CVARS: &[(&str, &str, CvarFlags, &str)] = &[
    ("g_auto_join", "1", CvarFlags::SERVER_INFO, "Automatically assigns players to teams"),
    ("g_capture_limit", "8", CvarFlags::SERVER_INFO, "The capture limit per level"),
    ("g_cheats", "0", CvarFlags::SERVER_INFO, "Enables the give, god and no_clip commands"),
    ("g_ctf", "0", CvarFlags::SERVER_INFO, "Enables capture the flag gameplay"),
    ("g_frag_limit", "30", CvarFlags::SERVER_INFO, "The frag limit per level"),
    ("g_friendly_fire", "1", CvarFlags::SERVER_INFO, "Enables friendly fire"),
    ("g_gameplay", "0", CvarFlags::SERVER_INFO, "Selects deathmatch, instagib or arena"),
    ("g_gravity", "800", CvarFlags::SERVER_INFO, "The world gravity"),
    ("g_match", "0", CvarFlags::SERVER_INFO, "Enables match play, where all players must ready"),
    ("g_max_entities", "1024", CvarFlags::LATCH, "The maximum number of entities"),
    ("g_motd", "", CvarFlags::empty(), "Message of the day, shown to players on entering"),
    ("g_player_projectile", "1", CvarFlags::SERVER_INFO, "Scales player velocity onto projectiles"),
    ("g_random_map", "0", CvarFlags::empty(), "Enables random map rotation from the map list"),
    ("g_round_limit", "30", CvarFlags::SERVER_INFO, "The number of rounds to run per level"),
    ("g_rounds", "0", CvarFlags::SERVER_INFO, "Enables rounds-based play, where last player standing wins"),
    ("g_spawn_farthest", "0", CvarFlags::SERVER_INFO, "Spawns players at the point farthest from others"),
    ("g_teams", "0", CvarFlags::SERVER_INFO, "Enables teams-based play"),
    ("g_time_limit", "20", CvarFlags::SERVER_INFO, "The time limit per level in minutes"),
    ("g_voting", "1", CvarFlags::SERVER_INFO, "Activates voting"),
    ("password", "", CvarFlags::USER_INFO, "The server password"),
    ("sv_max_clients", "8", CvarFlags::SERVER_INFO.union(CvarFlags::LATCH), "The maximum number of players"),
    ("sv_hostname", "Quake2World", CvarFlags::SERVER_INFO.union(CvarFlags::ARCHIVE), "The server name"),
];

/// Cvars whose changes are applied by `check_rules`.
const RULE_CVARS: [&str; 11] = [
    "g_gameplay",
    "g_teams",
    "g_ctf",
    "g_match",
    "g_rounds",
    "g_cheats",
    "g_frag_limit",
    "g_round_limit",
    "g_capture_limit",
    "g_time_limit",
    "g_gravity",
];

/// `" m:ss"` for the HUD clock.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(" {:2}:{:02}", seconds / 60, seconds % 60)
}

fn enabled(on: bool) -> &'static str {
    if on {
        "enabled"
    } else {
        "disabled"
    }
}

impl GameCtx {
    // ============================================================
    // Setup
    // ============================================================

    pub fn register_cvars(&mut self) {
        let cvars = self.gi.cvars();
        for &(name, value, flags, description) in CVARS {
            cvars.get_or_create(name, value, flags, description);
        }
        cvars.get_or_create("game_name", GAME_NAME, CvarFlags::SERVER_INFO.union(CvarFlags::NO_SET), "");

        for name in RULE_CVARS {
            cvars.clear_modified(name);
        }
    }

    /// Load `maps.lst`. A missing file leaves the list empty; a malformed
    /// one is fatal.
    pub fn load_map_list(&mut self) -> GameResult<()> {
        let Some(text) = self.gi.load_file(MAP_LIST_FILE) else {
            debug!("no {}", MAP_LIST_FILE);
            self.map_list = MapList::default();
            return Ok(());
        };

        match MapList::parse(&text) {
            Ok(list) => {
                info!("loaded {} maps from {}", list.len(), MAP_LIST_FILE);
                self.map_list = list;
                Ok(())
            }
            Err(err) => {
                error!("{}: {}", MAP_LIST_FILE, err);
                self.map_list = MapList::default();
                Err(err)
            }
        }
    }

    pub fn reset_teams(&mut self) {
        self.teams = [Team::good(), Team::evil()];

        let good = self.teams[0].name.clone();
        let evil = self.teams[1].name.clone();
        self.gi.set_config_string(CS_TEAM_GOOD, &good);
        self.gi.set_config_string(CS_TEAM_EVIL, &evil);
    }

    pub fn reset_vote(&mut self) {
        for ent in 1..=self.max_clients {
            if !self.edicts[ent].in_use {
                continue;
            }
            if let Some(client) = self.client_mut(ent) {
                client.persistent.vote = Vote::NoOp;
            }
        }

        self.gi.set_config_string(CS_VOTE, "");

        self.level.votes = [0; 3];
        self.level.vote_cmd.clear();
        self.level.vote_time = 0;
    }

    // ============================================================
    // Teams
    // ============================================================

    /// In-use player slots.
    pub fn player_slots(&self) -> Vec<usize> {
        (1..=self.max_clients).filter(|&i| self.edicts[i].in_use).collect()
    }

    pub fn team_by_name(&self, name: &str) -> Option<TeamId> {
        [TeamId::Good, TeamId::Evil]
            .into_iter()
            .find(|&t| self.team(t).name.eq_ignore_ascii_case(name.trim()))
    }

    /// The team with fewer players; evil on a tie.
    pub fn smallest_team(&self) -> TeamId {
        let (mut good, mut evil) = (0, 0);
        for ent in self.player_slots() {
            match self.team_of(ent) {
                Some(TeamId::Good) => good += 1,
                Some(TeamId::Evil) => evil += 1,
                None => {}
            }
        }
        if good < evil {
            TeamId::Good
        } else {
            TeamId::Evil
        }
    }

    /// Move a client onto `team`. Returns true if their team changed.
    pub fn add_client_to_team(&mut self, ent: usize, team: TeamId) -> bool {
        if self.level.match_time != 0 && self.level.match_time <= self.level.time {
            self.gi.cprint(ent, PrintLevel::High, "Match has already started\n");
            return false;
        }

        let Some(client) = self.client_mut(ent) else {
            return false;
        };
        if client.persistent.team == Some(team) {
            return false;
        }

        client.persistent.team = Some(team);
        client.persistent.spectator = false;
        client.persistent.ready = false;

        let user_info = client.persistent.user_info.clone();
        self.client_user_info_changed(ent, &user_info);
        true
    }

    /// Connected client with the given name, ignoring case.
    pub fn client_by_name(&self, name: &str) -> Option<usize> {
        self.player_slots().into_iter().find(|&ent| {
            self.client(ent)
                .map(|c| c.persistent.net_name.eq_ignore_ascii_case(name.trim()))
                .unwrap_or(false)
        })
    }

    pub fn mute_client(&mut self, name: &str, mute: bool) {
        match self.client_by_name(name) {
            Some(ent) => {
                if let Some(client) = self.client_mut(ent) {
                    client.persistent.muted = mute;
                }
            }
            None => debug!("no client named {}", name),
        }
    }

    // ============================================================
    // Game flow
    // ============================================================

    /// Clear scores and respawn everyone. `reset_teams` also drops every
    /// client's team affiliation.
    pub fn restart_game(&mut self, reset_teams: bool) {
        if self.level.match_time != 0 {
            self.level.match_num += 1;
        }
        if self.level.round_time != 0 {
            self.level.round_num += 1;
        }

        let auto_join = self.gi.cvars().integer("g_auto_join") != 0;
        let (match_num, round_num) = (self.level.match_num, self.level.round_num);

        for ent in self.player_slots() {
            let level = &self.level;
            let Some(c) = self.edicts[ent].client else {
                continue;
            };
            let p = &mut self.clients[c].persistent;

            p.ready = false;
            p.score = 0;
            p.captures = 0;
            p.rounds = 0;

            if reset_teams {
                p.team = None;
            }

            if level.match_ {
                p.spectator = p.match_num != match_num;
            } else if level.rounds {
                p.spectator = p.round_num != round_num;
            }

            if (level.teams || level.ctf) && p.team.is_none() {
                if auto_join {
                    let team = self.smallest_team();
                    self.add_client_to_team(ent, team);
                } else {
                    p.spectator = true;
                }
            }

            self.client_respawn(ent, false);
        }

        self.reset_items();

        self.level.match_time = 0;
        self.level.round_time = 0;
        for team in self.teams.iter_mut() {
            team.score = 0;
            team.captures = 0;
            team.rounds = 0;
        }

        info!("game restarted");
        self.gi.bprint(PrintLevel::High, "Game restarted\n");
        let sound = self.gi.sound_index("world/teleport");
        self.gi.sound(0, sound, Attenuation::None);
    }

    /// Freeze everyone at the intermission spot. The engine is asked to load
    /// `map` (or this level again) once the intermission runs out.
    pub fn begin_intermission(&mut self, map: &str) {
        if self.level.intermission_time != 0 {
            return;
        }
        self.level.intermission_time = self.level.time;

        // respawn any dead clients
        for ent in self.player_slots() {
            if self.edicts[ent].health <= 0 || self.edicts[ent].dead {
                self.client_respawn(ent, false);
            }
        }

        let spot = self
            .find_by_class_name(None, "info_player_intermission")
            .or_else(|| self.find_by_class_name(None, "info_player_start"))
            .or_else(|| self.find_by_class_name(None, "info_player_deathmatch"));
        let (origin, angles) = match spot {
            Some(spot) => (self.edicts[spot].s.origin, self.edicts[spot].s.angles),
            None => (VEC3_ORIGIN, VEC3_ORIGIN),
        };
        self.level.intermission_origin = origin;
        self.level.intermission_angle = angles;

        for ent in self.player_slots() {
            self.client_to_intermission(ent);
        }

        let sound = self.gi.sound_index("weapons/bfg/hit");
        self.gi.positioned_sound(&origin, Some(0), sound, Attenuation::Norm);

        let map = if map.is_empty() { self.level.name.clone() } else { map.to_string() };
        info!("intermission, next map {}", map);
        self.level.change_map = Some(map);
    }

    /// A limit was hit: intermission, then the next map in the rotation.
    pub fn end_level(&mut self) {
        let random = self.gi.cvars().integer("g_random_map") != 0;
        let next = self
            .map_list
            .next(&self.level.name, random, &mut self.rng)
            .map(|m| m.name.clone());

        let map = next.unwrap_or_else(|| self.level.name.clone());
        self.begin_intermission(&map);
    }

    pub fn exit_level(&mut self) {
        let map = self.level.change_map.take().unwrap_or_else(|| self.level.name.clone());
        self.gi.add_command_string(&format!("map {}\n", map));

        self.level.intermission_time = 0;

        self.end_client_frames();
    }

    // ============================================================
    // Voting
    // ============================================================

    pub fn check_vote(&mut self) {
        if self.gi.cvars().integer("g_voting") == 0 || self.level.vote_time == 0 {
            return;
        }

        let cmd = self.level.vote_cmd.clone();

        if self.level.time.saturating_sub(self.level.vote_time) > MAX_VOTE_TIME {
            self.gi.bprint(PrintLevel::High, &format!("Vote \"{}\" expired\n", cmd));
            self.reset_vote();
            return;
        }

        let count = self.player_slots().len() as f32;
        let needed = count * VOTE_MAJORITY;

        if self.level.votes[Vote::Yes as usize] as f32 >= needed {
            self.gi.bprint(PrintLevel::High, &format!("Vote \"{}\" passed\n", cmd));
            info!("vote passed: {}", cmd);

            if let Some(map) = cmd.strip_prefix("map ") {
                self.begin_intermission(map.trim());
            } else if cmd == "restart" {
                self.restart_game(false);
            } else if let Some(name) = cmd.strip_prefix("mute ") {
                self.mute_client(name, true);
            } else if let Some(name) = cmd.strip_prefix("unmute ") {
                self.mute_client(name, false);
            } else {
                self.gi.add_command_string(&format!("{}\n", cmd));
            }
            self.reset_vote();
        } else if self.level.votes[Vote::No as usize] as f32 >= needed {
            self.gi.bprint(PrintLevel::High, &format!("Vote \"{}\" failed\n", cmd));
            self.reset_vote();
        }
    }

    // ============================================================
    // Matches and rounds
    // ============================================================

    /// Non-spectating players, and how many of them are on each team.
    fn count_players(&self) -> (usize, usize, usize) {
        let (mut players, mut good, mut evil) = (0, 0, 0);
        for ent in self.player_slots() {
            let Some(client) = self.client(ent) else {
                continue;
            };
            if client.persistent.spectator {
                continue;
            }
            players += 1;
            match client.persistent.team {
                Some(TeamId::Good) => good += 1,
                Some(TeamId::Evil) => evil += 1,
                None => {}
            }
        }
        (players, good, evil)
    }

    pub fn check_round_start(&mut self) {
        if !self.level.rounds || self.level.round_time != 0 {
            return;
        }

        let (players, good, evil) = self.count_players();

        // a round needs two players, one per team in team play
        if players < 2 {
            return;
        }
        if self.level.teams && (good == 0 || evil == 0) {
            return;
        }

        self.gi.bprint(PrintLevel::High, "Round starting in 10 seconds...\n");
        self.level.round_time = self.level.time + COUNTDOWN_TIME;
        self.level.start_round = true;
    }

    /// A round has finished. End the level at the round limit, otherwise
    /// bring back everyone who played it.
    fn check_round_limit(&mut self) {
        let played = self.level.round_num;
        self.level.round_num += 1;

        let limit = self.level.round_limit;
        if limit > 0 && self.level.round_num >= limit as u32 {
            self.gi.bprint(PrintLevel::High, "Roundlimit hit\n");
            self.end_level();
            return;
        }

        let teams = self.level.teams || self.level.ctf;
        for ent in self.player_slots() {
            let Some(client) = self.client(ent) else {
                continue;
            };
            // they were intentionally spectating
            if client.persistent.round_num != played {
                continue;
            }

            if teams {
                let team = client.persistent.team.unwrap_or_else(|| self.smallest_team());
                if !self.add_client_to_team(ent, team) {
                    self.clients[ent - 1].persistent.spectator = false;
                }
            } else {
                self.clients[ent - 1].persistent.spectator = false;
            }

            self.client_respawn(ent, false);
        }
    }

    pub fn check_round_end(&mut self) {
        if !self.level.rounds {
            return;
        }
        if self.level.round_time == 0 || self.level.round_time > self.level.time {
            return;
        }

        let teams = self.level.teams || self.level.ctf;
        let (players, good, evil) = self.count_players();
        let winner = self
            .player_slots()
            .into_iter()
            .filter(|&ent| self.client(ent).map(|c| !c.persistent.spectator).unwrap_or(false))
            .last();

        let Some(winner) = winner.filter(|_| players > 0) else {
            // everyone was fragged
            self.gi.bprint(PrintLevel::High, "Tie!\n");
            self.level.round_time = 0;
            self.check_round_limit();
            return;
        };

        if teams {
            if good > 0 && evil > 0 {
                return;
            }
        } else if players > 1 {
            return;
        }

        // let enemy projectiles land before declaring a winner
        let winner_team = self.team_of(winner);
        for i in self.max_clients + 1..self.num_edicts {
            if !self.edicts[i].in_use {
                continue;
            }
            let Some(owner) = self.resolve(self.edicts[i].owner) else {
                continue;
            };
            if !self.edicts[owner].is_client() {
                continue;
            }
            let ally = if teams { self.team_of(owner) == winner_team } else { owner == winner };
            if !ally {
                return;
            }
        }

        let name = match winner_team.filter(|_| teams) {
            Some(team) => {
                self.team_mut(team).rounds += 1;
                self.team(team).name.clone()
            }
            None => {
                self.clients[winner - 1].persistent.rounds += 1;
                self.clients[winner - 1].persistent.net_name.clone()
            }
        };
        self.gi.bprint(PrintLevel::High, &format!("{} wins!\n", name));
        info!("round {} won by {}", self.level.round_num, name);

        self.level.round_time = 0;
        self.check_round_limit();
    }

    pub fn check_match_end(&mut self) {
        if !self.level.match_ {
            return;
        }
        if self.level.match_time == 0 || self.level.match_time > self.level.time {
            return;
        }

        let (players, good, evil) = self.count_players();

        if players == 0 {
            self.gi.bprint(PrintLevel::High, "No players left\n");
            self.level.match_time = 0;
            return;
        }

        if (self.level.teams || self.level.ctf) && (good == 0 || evil == 0) {
            self.gi.bprint(PrintLevel::High, "Not enough players left\n");
            self.level.match_time = 0;
        }
    }

    fn respawn_all(&mut self, msg: &str) {
        for ent in self.player_slots() {
            self.client_respawn(ent, false);
        }

        let sound = self.gi.sound_index("world/teleport");
        self.gi.sound(0, sound, Attenuation::None);
        self.gi.bprint(PrintLevel::High, msg);
    }

    // ============================================================
    // Rules
    // ============================================================

    /// Milliseconds to show on the HUD clock, negative when there is
    /// nothing to count.
    fn clock_millis(&self) -> i64 {
        let level = &self.level;
        let time = level.time as i64;
        let match_time = level.match_time as i64;
        let round_time = level.round_time as i64;

        if level.rounds {
            if round_time > time {
                round_time - time
            } else if round_time != 0 {
                time - round_time
            } else {
                -1
            }
        } else if level.match_ {
            if match_time > time {
                match_time - time
            } else if match_time != 0 {
                if level.time_limit != 0 {
                    match_time + level.time_limit as i64 - time
                } else {
                    time - match_time
                }
            } else {
                -1
            }
        } else {
            time
        }
    }

    /// Time counted against the time limit, `None` while it is not running.
    fn limit_elapsed(&self) -> Option<u32> {
        let level = &self.level;
        let since = |start: u32| (start != 0 && start <= level.time).then(|| level.time - start);

        if level.match_ {
            since(level.match_time)
        } else if level.rounds {
            since(level.round_time)
        } else {
            Some(level.time)
        }
    }

    pub fn check_rules(&mut self) {
        if self.level.intermission_time != 0 {
            return;
        }

        let time = self.level.time;

        // waiting on players, or counting down
        self.level.warmup = self.level.match_ && (self.level.match_time == 0 || self.level.match_time > time);
        self.level.warmup |= self.level.rounds && (self.level.round_time == 0 || self.level.round_time > time);

        if self.level.start_match && time >= self.level.match_time {
            self.level.start_match = false;
            self.level.warmup = false;
            self.respawn_all("Match has started\n");
        }

        if self.level.start_round && time >= self.level.round_time {
            self.level.start_round = false;
            self.level.warmup = false;
            self.respawn_all("Round has started\n");
        }

        let mut clock = self.clock_millis();

        if self.level.time_limit != 0 {
            if let Some(elapsed) = self.limit_elapsed() {
                if elapsed >= self.level.time_limit {
                    self.gi.bprint(PrintLevel::High, "Timelimit hit\n");
                    self.end_level();
                    return;
                }
                clock = (self.level.time_limit - elapsed) as i64;
            }
        }

        // once per second
        let frame_rate = self.gi.frame_rate().max(1);
        if self.level.frame_num % frame_rate == 0 {
            let text = if self.level.warmup {
                "Warmup".to_string()
            } else {
                format_time(clock / 1000)
            };
            self.gi.set_config_string(CS_TIME, &text);
        }

        if !self.level.ctf && self.level.frag_limit > 0 {
            let limit = self.level.frag_limit;
            let hit = if self.level.teams {
                self.teams.iter().any(|t| t.score as i32 >= limit)
            } else {
                self.player_slots()
                    .into_iter()
                    .any(|ent| self.client(ent).map(|c| c.persistent.score as i32 >= limit).unwrap_or(false))
            };
            if hit {
                self.gi.bprint(PrintLevel::High, "Fraglimit hit\n");
                self.end_level();
                return;
            }
        }

        if self.level.ctf && self.level.capture_limit > 0 {
            let limit = self.level.capture_limit;
            if self.teams.iter().any(|t| t.captures as i32 >= limit) {
                self.gi.bprint(PrintLevel::High, "Capturelimit hit\n");
                self.end_level();
                return;
            }
        }

        self.check_rule_cvars();
    }

    /// Apply console changes to the rule cvars.
    fn check_rule_cvars(&mut self) {
        if self.gi.cvars().take_modified("g_gameplay") {
            let gameplay = Gameplay::parse(self.gi.cvars().string("g_gameplay"));
            self.level.gameplay = gameplay;
            self.publish_rules();

            self.restart_game(false);

            self.gi.bprint(
                PrintLevel::High,
                &format!("Gameplay has changed to {}\n", gameplay.name()),
            );
        }

        if self.gi.cvars().take_modified("g_gravity") {
            let gravity = self.gi.cvars().integer("g_gravity");
            self.level.gravity = if gravity > 0 { gravity } else { 800 };
        }

        if self.gi.cvars().take_modified("g_teams") {
            self.level.teams = self.gi.cvars().integer("g_teams") != 0;
            self.publish_rules();

            let msg = format!("Teams have been {}\n", enabled(self.level.teams));
            self.gi.bprint(PrintLevel::High, &msg);

            self.restart_game(true);
        }

        if self.gi.cvars().take_modified("g_ctf") {
            self.level.ctf = self.gi.cvars().integer("g_ctf") != 0;
            self.publish_rules();

            let msg = format!("CTF has been {}\n", enabled(self.level.ctf));
            self.gi.bprint(PrintLevel::High, &msg);

            self.restart_game(true);
        }

        if self.gi.cvars().take_modified("g_match") {
            self.level.match_ = self.gi.cvars().integer("g_match") != 0;
            self.publish_rules();
            self.level.warmup = self.level.match_;

            let msg = format!("Match has been {}\n", enabled(self.level.match_));
            self.gi.bprint(PrintLevel::High, &msg);

            self.restart_game(false);
        }

        if self.gi.cvars().take_modified("g_rounds") {
            self.level.rounds = self.gi.cvars().integer("g_rounds") != 0;
            self.publish_rules();
            self.level.warmup = self.level.rounds;

            let msg = format!("Rounds have been {}\n", enabled(self.level.rounds));
            self.gi.bprint(PrintLevel::High, &msg);

            self.restart_game(false);
        }

        if self.gi.cvars().take_modified("g_cheats") {
            let msg = format!("Cheats have been {}\n", enabled(self.gi.cvars().integer("g_cheats") != 0));
            self.gi.bprint(PrintLevel::High, &msg);
        }

        if self.gi.cvars().take_modified("g_frag_limit") {
            self.level.frag_limit = self.gi.cvars().integer("g_frag_limit").max(0);
            let msg = format!("Fraglimit has been changed to {}\n", self.level.frag_limit);
            self.gi.bprint(PrintLevel::High, &msg);
        }

        if self.gi.cvars().take_modified("g_round_limit") {
            self.level.round_limit = self.gi.cvars().integer("g_round_limit").max(0);
            let msg = format!("Roundlimit has been changed to {}\n", self.level.round_limit);
            self.gi.bprint(PrintLevel::High, &msg);
        }

        if self.gi.cvars().take_modified("g_capture_limit") {
            self.level.capture_limit = self.gi.cvars().integer("g_capture_limit").max(0);
            let msg = format!("Capturelimit has been changed to {}\n", self.level.capture_limit);
            self.gi.bprint(PrintLevel::High, &msg);
        }

        if self.gi.cvars().take_modified("g_time_limit") {
            let minutes = self.gi.cvars().value("g_time_limit").max(0.0);
            self.level.time_limit = (minutes * 60_000.0) as u32;
            let msg = format!("Timelimit has been changed to {}\n", minutes as i32);
            self.gi.bprint(PrintLevel::High, &msg);
        }
    }

    // ============================================================
    // Frame
    // ============================================================

    /// Advance the world by one server frame.
    pub fn run_frame(&mut self) {
        self.level.frame_num += 1;
        self.level.time += self.frame_millis();

        // check for level change after running intermission
        if self.level.intermission_time != 0 {
            if self.level.time > self.level.intermission_time + INTERMISSION_TIME {
                self.exit_level();
            }
            return;
        }

        // even the world gets a chance to think
        let mut i = 0;
        while i < self.num_edicts {
            if !self.edicts[i].in_use {
                i += 1;
                continue;
            }

            self.level.current_entity = Some(i);

            let e = &mut self.edicts[i];
            if e.s.effects & EF_BEAM == 0 {
                e.s.old_origin = e.s.origin;
            }

            // drop ground entities that went away or moved
            if let Some(ground) = self.edicts[i].ground_entity {
                let stale = match self.resolve(Some(ground)) {
                    Some(g) => self.edicts[g].link_count != self.edicts[i].ground_entity_link_count,
                    None => true,
                };
                if stale {
                    self.edicts[i].ground_entity = None;
                }
            }

            if i > 0 && i <= self.max_clients {
                self.client_begin_frame(i);
            } else {
                self.run_entity(i);
            }
            i += 1;
        }
        self.level.current_entity = None;

        self.check_vote();
        self.check_rules();
        self.check_match_end();
        self.check_round_start();
        self.check_round_end();

        // build the player states now that everything has moved
        self.end_client_frames();

        self.sweep_freed();
    }

    /// Mode summary, e.g. `Deathmatch, Teams`.
    pub fn gameplay_summary(&self) -> String {
        let level = &self.level;
        let mut name = level.gameplay.name().to_string();
        if level.ctf {
            name.push_str(", CTF");
        } else if level.teams {
            name.push_str(", Teams");
        }
        if level.match_ {
            name.push_str(", Match");
        } else if level.rounds {
            name.push_str(", Rounds");
        }
        name
    }
}

// ============================================================
// Export table
// ============================================================

impl GameExport for GameCtx {
    fn init(&mut self) -> GameResult<()> {
        info!("game initialization: {}", GAME_NAME);

        self.register_cvars();

        if let Err(err) = self.load_map_list() {
            self.gi.error(&err.to_string());
            return Err(err);
        }

        info!("game initialized, {} entities, {} clients", self.max_entities, self.max_clients);
        Ok(())
    }

    fn shutdown(&mut self) {
        info!("game shutdown");
        self.map_list = MapList::default();
    }

    fn spawn_entities(&mut self, name: &str, entities: &str) -> GameResult<()> {
        self.spawn_level(name, entities).map_err(|err| {
            self.gi.error(&err.to_string());
            err
        })
    }

    fn client_connect(&mut self, ent: usize, user_info: &str) -> GameResult<()> {
        GameCtx::client_connect(self, ent, user_info).map_err(|err| {
            warn!("connect refused for slot {}: {}", ent, err);
            err
        })
    }

    fn client_begin(&mut self, ent: usize) {
        GameCtx::client_begin(self, ent);
    }

    fn client_user_info_changed(&mut self, ent: usize, user_info: &str) {
        GameCtx::client_user_info_changed(self, ent, user_info);
    }

    fn client_disconnect(&mut self, ent: usize) {
        GameCtx::client_disconnect(self, ent);
    }

    fn client_command(&mut self, ent: usize, args: &str) {
        GameCtx::client_command(self, ent, args);
    }

    fn client_think(&mut self, ent: usize, cmd: &UserCmd) {
        GameCtx::client_think(self, ent, cmd);
    }

    fn frame(&mut self) {
        self.run_frame();
    }

    fn game_name(&self) -> String {
        self.gameplay_summary()
    }
}
