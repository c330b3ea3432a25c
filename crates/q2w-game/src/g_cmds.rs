// g_cmds.rs — console commands sent by clients

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

use log::{debug, info};

use crate::g_local::*;
use crate::game_import::PrintLevel;

/// Team names and skins may change this often.
const TEAM_CHANGE_TIME: u32 = 5000;
const SPECTATE_DEBOUNCE: u32 = 3000;
const KILL_DEBOUNCE: u32 = 1000;
const CHAT_FLOOD_TIME: u32 = 1000;

const CHAT_COLOR: u8 = 2;
const TEAM_CHAT_COLOR: u8 = 3;

const MAX_TEAM_NAME: usize = 15;
const MAX_VOTE_CMD: usize = 63;

const VOTE_CMDS: [&str; 15] = [
    "g_capture_limit",
    "g_ctf",
    "g_frag_limit",
    "g_friendly_fire",
    "g_gameplay",
    "g_match",
    "g_round_limit",
    "g_rounds",
    "g_spawn_farthest",
    "g_teams",
    "g_time_limit",
    "map",
    "mute",
    "restart",
    "unmute",
];

/// A tokenized command line.
#[derive(Debug, Default)]
pub struct CmdArgs<'a> {
    argv: Vec<String>,
    /// Everything after the command name, untokenized.
    args: &'a str,
}

impl<'a> CmdArgs<'a> {
    pub fn parse(line: &'a str) -> Self {
        let (first, mut rest) = com_parse(line);
        let args = rest.map(str::trim).unwrap_or("");

        let mut argv = Vec::new();
        if !first.is_empty() {
            argv.push(first);
        }
        while let Some(data) = rest {
            let (token, next) = com_parse(data);
            if token.is_empty() && next.is_none() {
                break;
            }
            argv.push(token);
            rest = next;
        }

        Self { argv, args }
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    /// The nth token, or an empty string.
    pub fn argv(&self, i: usize) -> &str {
        self.argv.get(i).map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &str {
        self.args
    }
}

/// True if nothing but color escapes and whitespace.
fn is_blank(text: &str) -> bool {
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '^' => {
                chars.next();
            }
            c if c.is_whitespace() => {}
            _ => return false,
        }
    }
    true
}

impl GameCtx {
    fn cheats_allowed(&mut self, ent: usize) -> bool {
        if self.max_clients > 1 && self.gi.cvars().integer("g_cheats") == 0 {
            self.gi.cprint(ent, PrintLevel::High, "Cheats are disabled\n");
            return false;
        }
        true
    }

    fn reply(&mut self, ent: usize, msg: &str) {
        self.gi.cprint(ent, PrintLevel::High, msg);
    }

    // ============================================================
    // Cheats
    // ============================================================

    fn cmd_give(&mut self, ent: usize, cmd: &CmdArgs) {
        if !self.cheats_allowed(ent) {
            return;
        }

        let name = cmd.args();
        let give_all = name.eq_ignore_ascii_case("all");
        let amount = (cmd.argc() == 3).then(|| cmd.argv(2).parse::<i32>().ok()).flatten();

        if give_all || cmd.argv(1).eq_ignore_ascii_case("health") {
            let e = &mut self.edicts[ent];
            e.health = amount.unwrap_or(e.max_health);
            if !give_all {
                return;
            }
        }

        if give_all || name.eq_ignore_ascii_case("weapons") {
            for w in Weapon::ALL {
                self.give_weapon(ent, w, 0);
            }
            if !give_all {
                return;
            }
        }

        if give_all || name.eq_ignore_ascii_case("ammo") {
            if let Some(client) = self.client_mut(ent) {
                let p = &mut client.persistent;
                p.ammo = p.max_ammo;
            }
            if !give_all {
                return;
            }
        }

        if give_all || cmd.argv(1).eq_ignore_ascii_case("armor") {
            let max = self.client(ent).map(|c| c.persistent.max_armor as i32).unwrap_or(0);
            self.give(ent, "armor", amount.unwrap_or(max));
            return;
        }

        // a named item, optionally with a trailing quantity
        let (item, quantity) = match name.rsplit_once(' ') {
            Some((item, q)) => match q.parse::<i32>() {
                Ok(q) => (item.trim(), q),
                Err(_) => (name, -1),
            },
            None => (name, -1),
        };

        if !self.give(ent, item, quantity) {
            self.reply(ent, &format!("Unknown item: {}\n", item));
        }
    }

    fn cmd_god(&mut self, ent: usize) {
        if !self.cheats_allowed(ent) {
            return;
        }

        let e = &mut self.edicts[ent];
        e.flags.toggle(EntityFlags::GOD_MODE);
        let msg = if e.flags.contains(EntityFlags::GOD_MODE) { "god ON\n" } else { "god OFF\n" };
        self.reply(ent, msg);
    }

    fn cmd_no_clip(&mut self, ent: usize) {
        if !self.cheats_allowed(ent) {
            return;
        }

        let e = &mut self.edicts[ent];
        let msg = if e.move_type == MoveType::NoClip {
            e.move_type = MoveType::Walk;
            "no_clip OFF\n"
        } else {
            e.move_type = MoveType::NoClip;
            "no_clip ON\n"
        };
        self.reply(ent, msg);
    }

    // ============================================================
    // Weapons
    // ============================================================

    fn cmd_use(&mut self, ent: usize, cmd: &CmdArgs) {
        match Weapon::from_name(cmd.args()) {
            Some(weapon) => self.use_weapon(ent, weapon),
            None => self.reply(ent, &format!("Unknown item: {}\n", cmd.args())),
        }
    }

    /// Spectators step through the players they could chase instead.
    fn cmd_weapon_cycle(&mut self, ent: usize, forward: bool) {
        let Some(client) = self.client(ent) else {
            return;
        };

        if client.persistent.spectator {
            if client.locals.chase_target.is_some() {
                if forward {
                    self.chase_next(ent);
                } else {
                    self.chase_prev(ent);
                }
            }
            return;
        }

        if client.persistent.weapon.is_some() {
            self.cycle_weapon(ent, forward);
        }
    }

    fn cmd_weapon_last(&mut self, ent: usize) {
        let Some(p) = self.client(ent).map(|c| &c.persistent) else {
            return;
        };
        if let (Some(_), Some(last)) = (p.weapon, p.last_weapon) {
            self.use_weapon(ent, last);
        }
    }

    fn cmd_kill(&mut self, ent: usize) {
        let time = self.level.time;
        let Some(client) = self.client(ent) else {
            return;
        };

        if time.saturating_sub(client.locals.respawn_time) < KILL_DEBOUNCE {
            return;
        }
        if client.persistent.spectator || self.edicts[ent].dead {
            return;
        }

        let e = &mut self.edicts[ent];
        e.flags.remove(EntityFlags::GOD_MODE);
        e.health = 0;

        self.level.means_of_death = MOD_SUICIDE;
        self.client_die(ent, ent, ent, 100_000, &VEC3_ORIGIN);
    }

    // ============================================================
    // Chat
    // ============================================================

    /// `say`, `say_team`, or anything typed that is not a command.
    fn cmd_say(&mut self, ent: usize, cmd: &CmdArgs) {
        let Some(client) = self.client(ent) else {
            return;
        };
        if client.persistent.muted {
            self.reply(ent, "You have been muted\n");
            return;
        }

        let arg0 = cmd.argv(0);
        let is_say = arg0.eq_ignore_ascii_case("say") || arg0.eq_ignore_ascii_case("say_team");
        if is_say && cmd.argc() == 1 {
            return;
        }
        let team = is_say && arg0.eq_ignore_ascii_case("say_team") && (self.level.teams || self.level.ctf);

        let body = if is_say {
            let args = cmd.args();
            match args.strip_prefix('"') {
                Some(quoted) => quoted.strip_suffix('"').unwrap_or(quoted).to_string(),
                None => args.to_string(),
            }
        } else if cmd.args().is_empty() {
            arg0.to_string()
        } else {
            format!("{} {}", arg0, cmd.args())
        };

        if is_blank(&body) {
            return;
        }

        // flood protection does not pertain to teams
        if !team {
            let time = self.level.time;
            let client = &mut self.clients[ent - 1];
            if time < client.locals.chat_time {
                return;
            }
            client.locals.chat_time = time + CHAT_FLOOD_TIME;
        }

        let color = if team { TEAM_CHAT_COLOR } else { CHAT_COLOR };
        let text = format!("{}^{}: {}\n", self.clients[ent - 1].persistent.net_name, color, body);

        for other in self.player_slots() {
            if team {
                if self.on_same_team(ent, other) {
                    self.gi.cprint(other, PrintLevel::TeamChat, &text);
                }
            } else {
                self.gi.cprint(other, PrintLevel::Chat, &text);
            }
        }

        self.gi.print(&text);
    }

    fn cmd_player_list(&mut self, ent: usize) {
        let frame_rate = self.gi.frame_rate().max(1);
        let mut text = String::new();

        for other in self.player_slots() {
            let Some(client) = self.client(other) else {
                continue;
            };
            let seconds = self.level.frame_num.saturating_sub(client.persistent.first_frame) / frame_rate;
            text.push_str(&format!(
                "{:02}:{:02} {:4} {:3} {:<16} {}\n",
                seconds / 60,
                seconds % 60,
                client.ping,
                client.persistent.score,
                client.persistent.net_name,
                client.persistent.skin
            ));
        }

        self.reply(ent, &text);
    }

    // ============================================================
    // Voting
    // ============================================================

    /// Print help for incomplete or unsupported vote commands. Returns true
    /// if the command was answered.
    fn vote_help(&mut self, ent: usize, cmd: &CmdArgs) -> bool {
        if self.level.vote_time == 0 {
            let shorthand = cmd.argc() == 1 && matches!(cmd.argv(0).to_ascii_lowercase().as_str(), "yes" | "no");
            let explicit = cmd.argc() == 2 && matches!(cmd.argv(1).to_ascii_lowercase().as_str(), "yes" | "no");
            if shorthand || explicit {
                self.reply(ent, "There is not a vote in progress\n");
                return true;
            }
        }

        if cmd.argc() == 1 {
            let mut msg = String::from("\nAvailable vote commands:\n\n");
            for c in VOTE_CMDS {
                msg.push_str(&format!("  {}\n", c));
            }
            self.reply(ent, &msg);
            return true;
        }

        let what = cmd.argv(1).to_ascii_lowercase();
        if !VOTE_CMDS.contains(&what.as_str()) {
            self.reply(ent, &format!("Voting on \"{}\" is not supported\n", cmd.argv(1)));
            return true;
        }

        if what == "restart" {
            return false;
        }

        if cmd.argc() == 2 && what == "map" {
            if self.map_list.is_empty() {
                self.reply(ent, "Map voting is not available\n");
                return true;
            }
            let mut msg = String::from("\nAvailable maps:\n\n");
            for m in &self.map_list.maps {
                msg.push_str(&format!("  {} {}\n", m.name, m.title));
            }
            self.reply(ent, &msg);
            return true;
        }

        if cmd.argc() == 2 && what == "g_gameplay" {
            self.reply(ent, "\nAvailable gameplay modes:\n\n  DEATHMATCH\n  INSTAGIB\n  ARENA\n");
            return true;
        }

        if cmd.argc() == 2 {
            self.reply(ent, &format!("Usage: {} <command args>\n", cmd.argv(0)));
            return true;
        }

        false
    }

    fn cmd_vote(&mut self, ent: usize, cmd: &CmdArgs) {
        if self.gi.cvars().integer("g_voting") == 0 {
            self.reply(ent, "Voting is not allowed\n");
            return;
        }

        let arg0 = cmd.argv(0);
        let vote: String = if arg0.eq_ignore_ascii_case("yes") || arg0.eq_ignore_ascii_case("no") {
            arg0.to_string()
        } else {
            cmd.args().chars().take(MAX_VOTE_CMD).collect()
        };

        if self.level.vote_time != 0 {
            let Some(client) = self.client(ent) else {
                return;
            };
            if client.persistent.vote != Vote::NoOp {
                self.reply(ent, "You've already voted\n");
                return;
            }

            let cast = if vote.eq_ignore_ascii_case("yes") {
                Vote::Yes
            } else if vote.eq_ignore_ascii_case("no") {
                Vote::No
            } else {
                let msg = format!("A vote \"{}\" is already in progress\n", self.level.vote_cmd);
                self.reply(ent, &msg);
                return;
            };

            self.clients[ent - 1].persistent.vote = cast;
            self.level.votes[cast as usize] += 1;

            let msg = format!(
                "Voting results \"{}\":\n  {} Yes     {} No\n",
                self.level.vote_cmd,
                self.level.votes[Vote::Yes as usize],
                self.level.votes[Vote::No as usize]
            );
            self.gi.bprint(PrintLevel::High, &msg);
            return;
        }

        if self.vote_help(ent, cmd) {
            return;
        }

        if cmd.argv(1).eq_ignore_ascii_case("map") {
            let wanted = cmd.argv(2);
            if !self.map_list.maps.iter().any(|m| m.name.eq_ignore_ascii_case(wanted)) {
                self.reply(ent, &format!("Map \"{}\" is not available\n", wanted));
                return;
            }
        }

        self.level.vote_cmd = vote;
        self.level.vote_time = self.level.time;
        self.level.votes = [0; 3];
        self.level.votes[Vote::Yes as usize] = 1;

        // calling a vote is a yes
        self.clients[ent - 1].persistent.vote = Vote::Yes;

        let vote_cmd = self.level.vote_cmd.clone();
        self.gi.set_config_string(CS_VOTE, &vote_cmd);

        let name = self.clients[ent - 1].persistent.net_name.clone();
        info!("{} called a vote: {}", name, vote_cmd);
        self.gi.bprint(
            PrintLevel::High,
            &format!(
                "{} has called a vote:\n  {}\nTo vote, press F1 for yes or F2 for no\n",
                name, vote_cmd
            ),
        );
    }

    // ============================================================
    // Teams
    // ============================================================

    fn add_client_to_round(&mut self, ent: usize, cmd: &CmdArgs) {
        if self.level.round_time != 0 && self.level.round_time <= self.level.time {
            self.reply(ent, "Round has already started\n");
            return;
        }

        let score = self.clients[ent - 1].persistent.score;

        if self.level.teams {
            let Some(team) = self.team_by_name(cmd.argv(1)) else {
                self.reply(ent, &format!("Team \"{}\" doesn't exist\n", cmd.argv(1)));
                return;
            };
            if !self.add_client_to_team(ent, team) {
                return;
            }
        } else {
            let p = &mut self.clients[ent - 1].persistent;
            if !p.spectator {
                return;
            }
            p.spectator = false;
        }

        self.client_respawn(ent, true);
        self.clients[ent - 1].persistent.score = score;
    }

    fn cmd_team(&mut self, ent: usize, cmd: &CmdArgs) {
        let teams = self.level.teams || self.level.ctf;

        if teams && cmd.argc() != 2 {
            let msg = format!(
                "Usage: {} <{}|{}>\n",
                cmd.argv(0),
                self.team(TeamId::Good).name,
                self.team(TeamId::Evil).name
            );
            self.reply(ent, &msg);
            return;
        }

        if self.level.rounds {
            self.add_client_to_round(ent, cmd);
            return;
        }

        if !teams {
            self.reply(ent, "Teams are disabled\n");
            return;
        }

        let Some(team) = self.team_by_name(cmd.argv(1)) else {
            self.reply(ent, &format!("Team \"{}\" doesn't exist\n", cmd.argv(1)));
            return;
        };

        if self.add_client_to_team(ent, team) {
            self.client_respawn(ent, true);
        }
    }

    fn cmd_team_name(&mut self, ent: usize, cmd: &CmdArgs) {
        if cmd.argc() != 2 {
            self.reply(ent, &format!("Usage: {} <name>\n", cmd.argv(0)));
            return;
        }
        let Some(id) = self.team_of(ent) else {
            self.reply(ent, "You're not on a team\n");
            return;
        };

        let time = self.level.time;
        let team = self.team_mut(id);
        if team.name_time != 0 && time.saturating_sub(team.name_time) < TEAM_CHANGE_TIME {
            return;
        }

        let name: String = cmd.argv(1).chars().take(MAX_TEAM_NAME).collect();
        team.name = if name.is_empty() {
            match id {
                TeamId::Good => Team::good().name,
                TeamId::Evil => Team::evil().name,
            }
        } else {
            name
        };
        team.name_time = time;
        let name = team.name.clone();

        let index = match id {
            TeamId::Good => CS_TEAM_GOOD,
            TeamId::Evil => CS_TEAM_EVIL,
        };
        self.gi.set_config_string(index, &name);

        let msg = format!("{} changed team_name to {}\n", self.clients[ent - 1].persistent.net_name, name);
        self.gi.bprint(PrintLevel::High, &msg);
    }

    fn cmd_team_skin(&mut self, ent: usize, cmd: &CmdArgs) {
        if cmd.argc() != 2 {
            self.reply(ent, &format!("Usage: {} <skin>\n", cmd.argv(0)));
            return;
        }
        let Some(id) = self.team_of(ent) else {
            self.reply(ent, "You're not on a team\n");
            return;
        };

        let time = self.level.time;
        let team = self.team_mut(id);
        if team.skin_time != 0 && time.saturating_sub(team.skin_time) < TEAM_CHANGE_TIME {
            return;
        }

        let mut skin = cmd.argv(1).to_string();
        if skin.is_empty() {
            skin = "qforcer".into();
        }

        // a bare model name gets its default skin
        match skin.find('/') {
            Some(i) if i + 1 < skin.len() => {}
            Some(i) => {
                skin.truncate(i);
                skin.push_str("/default");
            }
            None => skin.push_str("/default"),
        }

        team.skin = skin.clone();
        team.skin_time = time;

        for i in 0..self.max_clients {
            let p = &mut self.clients[i].persistent;
            if p.team != Some(id) {
                continue;
            }
            p.skin = skin.clone();
            let value = format!("{}\\{}", p.net_name, p.skin);
            self.gi.set_config_string(CS_CLIENTS + i, &value);
        }

        let msg = format!("{} changed team_skin to {}\n", self.clients[ent - 1].persistent.net_name, skin);
        self.gi.bprint(PrintLevel::High, &msg);
    }

    fn cmd_spectate(&mut self, ent: usize) {
        let time = self.level.time;
        let Some(client) = self.client(ent) else {
            return;
        };

        if time.saturating_sub(client.locals.respawn_time) < SPECTATE_DEBOUNCE {
            return;
        }

        let spectator = client.persistent.spectator;

        if self.level.match_time != 0 && spectator {
            self.reply(ent, "Match has already started\n");
            return;
        }
        if self.level.round_time != 0 && spectator {
            self.reply(ent, "Round has already started\n");
            return;
        }

        // they wish to join
        if spectator && (self.level.teams || self.level.ctf) {
            if self.gi.cvars().integer("g_auto_join") != 0 {
                let team = self.smallest_team();
                self.add_client_to_team(ent, team);
            } else {
                let msg = format!(
                    "Use team <{}|{}> to join the game\n",
                    self.team(TeamId::Good).name,
                    self.team(TeamId::Evil).name
                );
                self.reply(ent, &msg);
                return;
            }
        }

        self.clients[ent - 1].persistent.spectator = !spectator;
        self.client_respawn(ent, true);
    }

    // ============================================================
    // Match
    // ============================================================

    /// In match play every player must be ready before the countdown.
    fn cmd_ready(&mut self, ent: usize) {
        if !self.level.match_ {
            self.reply(ent, "Match is disabled\n");
            return;
        }
        let p = &mut self.clients[ent - 1].persistent;
        if p.spectator {
            self.reply(ent, "You're a spectator\n");
            return;
        }
        if p.ready {
            self.reply(ent, "You're already ready\n");
            return;
        }
        p.ready = true;

        let everyone_ready = self.player_slots().into_iter().all(|other| {
            self.client(other)
                .map(|c| c.persistent.spectator || c.persistent.ready)
                .unwrap_or(true)
        });
        if !everyone_ready {
            return;
        }

        let (players, good, evil) = {
            let mut counts = (0, 0, 0);
            for other in self.player_slots() {
                let Some(c) = self.client(other) else {
                    continue;
                };
                if c.persistent.spectator {
                    continue;
                }
                counts.0 += 1;
                match c.persistent.team {
                    Some(TeamId::Good) => counts.1 += 1,
                    Some(TeamId::Evil) => counts.2 += 1,
                    None => {}
                }
            }
            counts
        };

        if players < 2 {
            return;
        }
        if (self.level.teams || self.level.ctf) && (good == 0 || evil == 0) {
            return;
        }

        self.gi.bprint(PrintLevel::High, "Match starting in 10 seconds...\n");
        self.level.match_time = self.level.time + COUNTDOWN_TIME;
        self.level.start_match = true;
    }

    fn cmd_unready(&mut self, ent: usize) {
        if !self.level.match_ {
            self.reply(ent, "Match is disabled\n");
            return;
        }
        let match_time = self.level.match_time;
        let p = &mut self.clients[ent - 1].persistent;
        if p.spectator {
            self.reply(ent, "You're a spectator\n");
            return;
        }
        if match_time != 0 {
            self.reply(ent, "Match has started\n");
            return;
        }
        if !p.ready {
            self.reply(ent, "You are not ready\n");
            return;
        }

        p.ready = false;
        self.level.start_match = false;
    }

    // ============================================================
    // Misc
    // ============================================================

    fn cmd_score(&mut self, ent: usize) {
        let Some(client) = self.client_mut(ent) else {
            return;
        };
        client.locals.show_scores = !client.locals.show_scores;
        if client.locals.show_scores {
            client.locals.scores_time = 0;
            self.client_scores(ent);
        }
    }

    /// Spectators toggle following a player.
    fn cmd_chase(&mut self, ent: usize) {
        let Some(client) = self.client_mut(ent) else {
            return;
        };
        if !client.persistent.spectator {
            self.reply(ent, "You must be spectating to chase\n");
            return;
        }

        if client.locals.chase_target.take().is_none() {
            self.chase_target(ent);
        } else {
            client.locals.old_chase_target = None;
        }
    }

    /// Dispatch one command line from a client.
    pub fn client_command(&mut self, ent: usize, line: &str) {
        if self.client(ent).is_none() {
            return;
        }

        let cmd = CmdArgs::parse(line);
        let name = cmd.argv(0).to_ascii_lowercase();
        debug!("client {} command: {}", ent, line.trim());

        match name.as_str() {
            "" => return,
            "say" | "say_team" => {
                self.cmd_say(ent, &cmd);
                return;
            }
            _ => {}
        }

        // most commands can not be executed during intermission
        if self.level.intermission_time != 0 {
            return;
        }

        match name.as_str() {
            "score" => self.cmd_score(ent),
            "spectate" => self.cmd_spectate(ent),
            "team" | "join" => self.cmd_team(ent, &cmd),
            "team_name" => self.cmd_team_name(ent, &cmd),
            "team_skin" => self.cmd_team_skin(ent, &cmd),
            "ready" => self.cmd_ready(ent),
            "unready" => self.cmd_unready(ent),
            "use" => self.cmd_use(ent, &cmd),
            "give" => self.cmd_give(ent, &cmd),
            "god" => self.cmd_god(ent),
            "no_clip" => self.cmd_no_clip(ent),
            "weapon_next" => self.cmd_weapon_cycle(ent, true),
            "weapon_previous" => self.cmd_weapon_cycle(ent, false),
            "weapon_last" => self.cmd_weapon_last(ent),
            "kill" => self.cmd_kill(ent),
            "chase" => self.cmd_chase(ent),
            "player_list" => self.cmd_player_list(ent),
            "vote" | "yes" | "no" => self.cmd_vote(ent, &cmd),
            _ => self.cmd_say(ent, &cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_map_list::MapList;
    use crate::test_support::*;

    fn replies(world: &std::cell::RefCell<MockWorld>, ent: usize) -> Vec<String> {
        world
            .borrow()
            .cprints
            .iter()
            .filter(|(e, _, _)| *e == ent)
            .map(|(_, _, m)| m.clone())
            .collect()
    }

    fn players(n: usize) -> (GameCtx, std::rc::Rc<std::cell::RefCell<MockWorld>>) {
        let (mut ctx, world) = make_ctx(n, 64);
        for ent in 1..=n {
            spawn_test_client(&mut ctx, ent, [ent as f32 * 128.0, 0.0, 0.0]);
        }
        (ctx, world)
    }

    // ============================================================
    // Parsing
    // ============================================================

    #[test]
    fn test_cmd_args() {
        let cmd = CmdArgs::parse("give \"rocket launcher\" 20");
        assert_eq!(cmd.argc(), 3);
        assert_eq!(cmd.argv(0), "give");
        assert_eq!(cmd.argv(1), "rocket launcher");
        assert_eq!(cmd.argv(2), "20");
        assert_eq!(cmd.argv(7), "");
        assert_eq!(cmd.args(), "\"rocket launcher\" 20");

        let cmd = CmdArgs::parse("score");
        assert_eq!(cmd.argc(), 1);
        assert_eq!(cmd.args(), "");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank("  ^1 ^7\n"));
        assert!(!is_blank("^1hi"));
    }

    // ============================================================
    // Chat
    // ============================================================

    #[test]
    fn test_say_reaches_everyone() {
        let (mut ctx, world) = players(2);
        ctx.client_command(1, "say \"hello there\"");

        let w = world.borrow();
        let chats: Vec<_> = w.cprints.iter().filter(|(_, l, _)| *l == PrintLevel::Chat).collect();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].2, "player1^2: hello there\n");
    }

    #[test]
    fn test_say_team_only_reaches_teammates() {
        let (mut ctx, world) = players(3);
        ctx.level.teams = true;
        ctx.clients[0].persistent.team = Some(TeamId::Good);
        ctx.clients[1].persistent.team = Some(TeamId::Good);
        ctx.clients[2].persistent.team = Some(TeamId::Evil);

        ctx.client_command(1, "say_team rush b");

        let w = world.borrow();
        let recipients: Vec<usize> = w
            .cprints
            .iter()
            .filter(|(_, l, _)| *l == PrintLevel::TeamChat)
            .map(|(e, _, _)| *e)
            .collect();
        assert_eq!(recipients, vec![1, 2]);
    }

    #[test]
    fn test_chat_flood_and_mute() {
        let (mut ctx, world) = players(1);
        ctx.client_command(1, "say one");
        ctx.client_command(1, "say two");
        assert_eq!(replies(&world, 1).len(), 1);

        ctx.clients[0].persistent.muted = true;
        ctx.level.time += CHAT_FLOOD_TIME;
        ctx.client_command(1, "say three");
        assert!(replies(&world, 1).last().unwrap().contains("muted"));
    }

    #[test]
    fn test_empty_say_is_dropped() {
        let (mut ctx, world) = players(1);
        ctx.client_command(1, "say \"^1  \"");
        ctx.client_command(1, "say");
        assert!(replies(&world, 1).is_empty());
    }

    #[test]
    fn test_unknown_command_is_chat() {
        let (mut ctx, world) = players(1);
        ctx.client_command(1, "hello world");
        assert_eq!(replies(&world, 1), vec!["player1^2: hello world\n".to_string()]);
    }

    // ============================================================
    // Cheats
    // ============================================================

    #[test]
    fn test_cheats_need_g_cheats() {
        let (mut ctx, world) = players(2);
        ctx.client_command(1, "god");
        assert!(!ctx.edicts[1].flags.contains(EntityFlags::GOD_MODE));
        assert!(replies(&world, 1)[0].contains("Cheats are disabled"));

        ctx.gi.cvars().set("g_cheats", "1");
        ctx.client_command(1, "god");
        assert!(ctx.edicts[1].flags.contains(EntityFlags::GOD_MODE));
        ctx.client_command(1, "no_clip");
        assert_eq!(ctx.edicts[1].move_type, MoveType::NoClip);
        ctx.client_command(1, "no_clip");
        assert_eq!(ctx.edicts[1].move_type, MoveType::Walk);
    }

    #[test]
    fn test_give_and_use() {
        let (mut ctx, world) = players(1);
        ctx.clients[0].persistent.max_ammo = AmmoType::ALL.map(|a| a.default_max());

        ctx.client_command(1, "give railgun");
        let p = &ctx.clients[0].persistent;
        assert!(p.weapons.contains(Weapon::Railgun.bit()));
        assert_eq!(p.ammo[AmmoType::Slugs.index()], AmmoType::Slugs.pickup_quantity());

        ctx.client_command(1, "use railgun");
        assert_eq!(ctx.clients[0].persistent.weapon, Some(Weapon::Railgun));

        ctx.client_command(1, "give health 50");
        assert_eq!(ctx.edicts[1].health, 50);

        ctx.client_command(1, "give bananas");
        assert!(replies(&world, 1).last().unwrap().contains("Unknown item: bananas"));
    }

    #[test]
    fn test_give_all() {
        let (mut ctx, _) = players(1);
        ctx.clients[0].persistent.max_ammo = AmmoType::ALL.map(|a| a.default_max());
        ctx.clients[0].persistent.max_armor = 200;

        ctx.client_command(1, "give all");

        let p = &ctx.clients[0].persistent;
        for w in Weapon::ALL {
            assert!(p.weapons.contains(w.bit()));
        }
        assert_eq!(p.ammo, p.max_ammo);
        assert_eq!(p.armor, 200);
    }

    #[test]
    fn test_kill() {
        let (mut ctx, _) = players(1);
        ctx.client_command(1, "kill");
        assert!(ctx.edicts[1].dead);
        assert_eq!(ctx.clients[0].persistent.score, -1);
    }

    // ============================================================
    // Teams
    // ============================================================

    #[test]
    fn test_team_join() {
        let (mut ctx, world) = players(2);
        ctx.client_command(1, "team evil");
        assert!(replies(&world, 1)[0].contains("Teams are disabled"));

        ctx.level.teams = true;
        ctx.client_command(1, "team evil");
        assert_eq!(ctx.team_of(1), Some(TeamId::Evil));

        ctx.client_command(2, "join purple");
        assert!(replies(&world, 2)[0].contains("doesn't exist"));
        ctx.client_command(2, "join");
        assert!(replies(&world, 2)[1].contains("Usage"));
    }

    #[test]
    fn test_team_skin_defaults_and_updates_clients() {
        let (mut ctx, world) = players(2);
        ctx.level.teams = true;
        ctx.clients[0].persistent.team = Some(TeamId::Good);
        ctx.clients[1].persistent.team = Some(TeamId::Good);

        ctx.client_command(1, "team_skin ichabod");

        assert_eq!(ctx.team(TeamId::Good).skin, "ichabod/default");
        assert_eq!(ctx.clients[1].persistent.skin, "ichabod/default");
        let w = world.borrow();
        assert_eq!(w.config_strings.get(&(CS_CLIENTS + 1)).map(String::as_str), Some("player2\\ichabod/default"));
    }

    #[test]
    fn test_team_name_is_rate_limited() {
        let (mut ctx, world) = players(1);
        ctx.level.teams = true;
        ctx.clients[0].persistent.team = Some(TeamId::Evil);

        ctx.client_command(1, "team_name Reds");
        assert_eq!(ctx.team(TeamId::Evil).name, "Reds");
        assert_eq!(world.borrow().config_strings.get(&CS_TEAM_EVIL).map(String::as_str), Some("Reds"));

        ctx.level.time += 1000;
        ctx.client_command(1, "team_name Blues");
        assert_eq!(ctx.team(TeamId::Evil).name, "Reds");
    }

    #[test]
    fn test_spectate_toggles() {
        let (mut ctx, _) = players(1);
        ctx.level.time = 10_000;
        ctx.client_command(1, "spectate");
        assert!(ctx.clients[0].persistent.spectator);
        assert_eq!(ctx.edicts[1].move_type, MoveType::NoClip);

        // debounced
        ctx.client_command(1, "spectate");
        assert!(ctx.clients[0].persistent.spectator);

        ctx.level.time += SPECTATE_DEBOUNCE;
        ctx.client_command(1, "spectate");
        assert!(!ctx.clients[0].persistent.spectator);
    }

    // ============================================================
    // Match
    // ============================================================

    #[test]
    fn test_ready_starts_countdown() {
        let (mut ctx, world) = players(2);
        ctx.level.match_ = true;

        ctx.client_command(1, "ready");
        assert_eq!(ctx.level.match_time, 0);
        ctx.client_command(1, "ready");
        assert!(replies(&world, 1).last().unwrap().contains("already ready"));

        ctx.client_command(2, "ready");
        assert_eq!(ctx.level.match_time, ctx.level.time + COUNTDOWN_TIME);
        assert!(ctx.level.start_match);
    }

    #[test]
    fn test_unready() {
        let (mut ctx, _) = players(2);
        ctx.level.match_ = true;
        ctx.client_command(1, "ready");
        ctx.client_command(1, "unready");
        assert!(!ctx.clients[0].persistent.ready);
    }

    // ============================================================
    // Voting
    // ============================================================

    #[test]
    fn test_vote_call_and_cast() {
        let (mut ctx, world) = players(3);
        ctx.client_command(1, "vote g_frag_limit 50");

        assert_eq!(ctx.level.vote_cmd, "g_frag_limit 50");
        assert_eq!(ctx.level.votes[Vote::Yes as usize], 1);
        assert_eq!(world.borrow().config_strings.get(&CS_VOTE).map(String::as_str), Some("g_frag_limit 50"));

        ctx.client_command(2, "yes");
        assert_eq!(ctx.level.votes[Vote::Yes as usize], 2);
        ctx.client_command(2, "no");
        assert!(replies(&world, 2).last().unwrap().contains("already voted"));

        ctx.client_command(3, "vote restart");
        assert!(replies(&world, 3).last().unwrap().contains("already in progress"));
    }

    #[test]
    fn test_vote_help_and_validation() {
        let (mut ctx, world) = players(1);
        ctx.client_command(1, "vote");
        assert!(replies(&world, 1)[0].contains("Available vote commands"));

        ctx.client_command(1, "yes");
        assert!(replies(&world, 1)[1].contains("not a vote in progress"));

        ctx.client_command(1, "vote rcon_password x");
        assert!(replies(&world, 1)[2].contains("not supported"));

        ctx.map_list = MapList::parse("{ name edge title \"The Edge\" }").unwrap();
        ctx.client_command(1, "vote map nowhere");
        assert!(replies(&world, 1)[3].contains("not available"));
        assert_eq!(ctx.level.vote_time, 0);

        ctx.client_command(1, "vote map edge");
        assert_eq!(ctx.level.vote_cmd, "map edge");
    }

    #[test]
    fn test_voting_disabled() {
        let (mut ctx, world) = players(1);
        ctx.gi.cvars().set("g_voting", "0");
        ctx.client_command(1, "vote restart");
        assert!(replies(&world, 1)[0].contains("not allowed"));
        assert_eq!(ctx.level.vote_time, 0);
    }

    // ============================================================
    // Misc
    // ============================================================

    #[test]
    fn test_intermission_blocks_commands_but_not_chat() {
        let (mut ctx, world) = players(1);
        ctx.gi.cvars().set("g_cheats", "1");
        ctx.level.intermission_time = ctx.level.time;

        ctx.client_command(1, "god");
        assert!(!ctx.edicts[1].flags.contains(EntityFlags::GOD_MODE));

        ctx.client_command(1, "say gg");
        assert_eq!(replies(&world, 1), vec!["player1^2: gg\n".to_string()]);
    }

    #[test]
    fn test_score_toggles_and_sends() {
        let (mut ctx, world) = players(1);
        ctx.client_command(1, "score");
        assert!(ctx.clients[0].locals.show_scores);
        assert_eq!(world.borrow().unicasts.len(), 1);

        ctx.client_command(1, "score");
        assert!(!ctx.clients[0].locals.show_scores);
    }

    #[test]
    fn test_player_list() {
        let (mut ctx, world) = players(2);
        ctx.clients[1].persistent.score = 4;
        ctx.client_command(1, "player_list");

        let text = replies(&world, 1).pop().unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("player2"));
    }

    #[test]
    fn test_chase_requires_spectator() {
        let (mut ctx, world) = players(2);
        ctx.client_command(1, "chase");
        assert!(replies(&world, 1)[0].contains("spectating"));

        ctx.clients[0].persistent.spectator = true;
        ctx.client_command(1, "chase");
        assert_eq!(ctx.resolve(ctx.clients[0].locals.chase_target), Some(2));

        ctx.client_command(1, "chase");
        assert!(ctx.clients[0].locals.chase_target.is_none());
    }
}
