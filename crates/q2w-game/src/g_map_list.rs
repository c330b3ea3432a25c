// g_map_list.rs — maps.lst rotation with per-map rule overrides

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
use rand::Rng;

use q2w_common::q_shared::com_parse;

use crate::error::{GameError, GameResult};
use crate::g_local::Gameplay;

pub const MAP_LIST_FILE: &str = "maps.lst";

/// Slots in the weighted selection table.
pub const MAP_LIST_WEIGHT: usize = 16384;

/// Integer fields left at this value defer to the cvar.
pub const MAP_LIST_UNSET: i32 = -1;

/// One `{ ... }` block of the map list.
#[derive(Debug, Clone, PartialEq)]
pub struct MapListEntry {
    pub name: String,
    pub title: String,
    pub sky: String,
    pub weather: String,
    pub gravity: i32,
    pub gameplay: i32,
    pub teams: i32,
    pub ctf: i32,
    pub match_: i32,
    pub rounds: i32,
    pub frag_limit: i32,
    pub round_limit: i32,
    pub capture_limit: i32,
    /// Minutes.
    pub time_limit: f32,
    pub give: String,
    pub music: String,
    pub weight: f32,
}

impl Default for MapListEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            title: String::new(),
            sky: String::new(),
            weather: String::new(),
            gravity: MAP_LIST_UNSET,
            gameplay: MAP_LIST_UNSET,
            teams: MAP_LIST_UNSET,
            ctf: MAP_LIST_UNSET,
            match_: MAP_LIST_UNSET,
            rounds: MAP_LIST_UNSET,
            frag_limit: MAP_LIST_UNSET,
            round_limit: MAP_LIST_UNSET,
            capture_limit: MAP_LIST_UNSET,
            time_limit: MAP_LIST_UNSET as f32,
            give: String::new(),
            music: String::new(),
            weight: 1.0,
        }
    }
}

impl MapListEntry {
    /// The entry's gameplay, if it sets one.
    pub fn gameplay(&self) -> Option<Gameplay> {
        (self.gameplay > MAP_LIST_UNSET).then(|| Gameplay::from_i32(self.gameplay))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapList {
    pub maps: Vec<MapListEntry>,
    pub total_weight: f32,
    weighted_index: Vec<usize>,
}

/// Token stream over the map list text.
struct Tokens<'a> {
    rest: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Option<String> {
        let data = self.rest?;
        let (token, rest) = com_parse(data);
        self.rest = rest;
        if token.is_empty() && rest.is_none() {
            None
        } else {
            Some(token)
        }
    }

    fn value(&mut self, key: &str) -> GameResult<String> {
        self.next()
            .ok_or_else(|| GameError::MapList(format!("EOF reading value of {}", key)))
    }
}

fn parse_int(s: &str) -> i32 {
    let s = s.trim();
    s.parse::<i32>()
        .or_else(|_| s.parse::<f32>().map(|f| f as i32))
        .unwrap_or(0)
}

impl MapList {
    /// Parse the map list text. An empty text yields an empty list.
    pub fn parse(text: &str) -> GameResult<MapList> {
        let mut list = MapList::default();
        let mut tokens = Tokens { rest: Some(text) };
        let mut map: Option<MapListEntry> = None;

        while let Some(token) = tokens.next() {
            if token == "{" {
                if map.is_some() {
                    return Err(GameError::MapList("found { inside a map block".into()));
                }
                map = Some(MapListEntry::default());
                continue;
            }

            let Some(m) = map.as_mut() else {
                return Err(GameError::MapList(format!("found {} when expecting {{", token)));
            };

            match token.as_str() {
                "}" => {
                    if let Some(m) = map.take() {
                        debug!("loaded map {} weight {}", m.name, m.weight);
                        list.maps.push(m);
                    }
                }
                "name" => m.name = tokens.value(&token)?,
                "title" => m.title = tokens.value(&token)?,
                "sky" => m.sky = tokens.value(&token)?,
                "weather" => m.weather = tokens.value(&token)?,
                "gravity" => m.gravity = parse_int(&tokens.value(&token)?),
                "gameplay" => m.gameplay = Gameplay::parse(&tokens.value(&token)?) as i32,
                "teams" => m.teams = parse_int(&tokens.value(&token)?),
                "ctf" => m.ctf = parse_int(&tokens.value(&token)?),
                "match" => m.match_ = parse_int(&tokens.value(&token)?),
                "rounds" => m.rounds = parse_int(&tokens.value(&token)?),
                "frag_limit" => m.frag_limit = parse_int(&tokens.value(&token)?),
                "round_limit" => m.round_limit = parse_int(&tokens.value(&token)?),
                "capture_limit" => m.capture_limit = parse_int(&tokens.value(&token)?),
                "time_limit" => m.time_limit = tokens.value(&token)?.trim().parse().unwrap_or(0.0),
                "give" => m.give = tokens.value(&token)?,
                "music" => m.music = tokens.value(&token)?,
                "weight" => m.weight = tokens.value(&token)?.trim().parse::<f32>().unwrap_or(0.0).max(0.0),
                other => {
                    let value = tokens.value(other)?;
                    debug!("unknown map list key {} = {}", other, value);
                }
            }
        }

        if let Some(m) = map {
            return Err(GameError::MapList(format!("unterminated block for {}", m.name)));
        }

        list.build_weighted_index();
        Ok(list)
    }

    /// Spread the maps over the selection table in proportion to weight.
    fn build_weighted_index(&mut self) {
        self.total_weight = self.maps.iter().map(|m| m.weight).sum();
        if self.total_weight <= 0.0 {
            self.total_weight = 1.0;
        }

        self.weighted_index.clear();
        for (i, m) in self.maps.iter().enumerate() {
            let k = ((m.weight / self.total_weight) * MAP_LIST_WEIGHT as f32) as usize;
            let room = MAP_LIST_WEIGHT - self.weighted_index.len();
            self.weighted_index.extend(std::iter::repeat(i).take(k.min(room)));
        }

        // rounding leaves a few slots over
        let last = self.maps.iter().rposition(|m| m.weight > 0.0).unwrap_or(0);
        self.weighted_index.resize(MAP_LIST_WEIGHT, last);
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&MapListEntry> {
        self.maps.iter().find(|m| m.name == name)
    }

    /// The map to play after `current`: weighted random, or the next entry
    /// with a nonzero weight. `None` when the list is empty.
    pub fn next<R: Rng>(&self, current: &str, random: bool, rng: &mut R) -> Option<&MapListEntry> {
        if self.maps.is_empty() {
            return None;
        }

        if random {
            let slot = rng.gen_range(0..MAP_LIST_WEIGHT);
            return self.maps.get(self.weighted_index[slot]);
        }

        let len = self.maps.len();
        let start = self
            .maps
            .iter()
            .position(|m| m.name == current)
            .unwrap_or(len - 1);

        (1..=len)
            .map(|k| (start + k) % len)
            .find(|&i| self.maps[i].weight > 0.0)
            .or(Some((start + 1) % len))
            .and_then(|i| self.maps.get(i))
    }
}
