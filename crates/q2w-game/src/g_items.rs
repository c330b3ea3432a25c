// g_items.rs — pickups: armor, weapons, ammo, health, powerups and CTF flags

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

use crate::dispatch::{ThinkFn, TouchFn, UseFn};
use crate::g_local::*;
use crate::g_utils::vtos;
use crate::game::SVF_NO_CLIENT;
use crate::game_import::{Attenuation, PrintLevel};
use crate::p_hud::{STAT_PICKUP_ICON, STAT_PICKUP_STRING};

// edict->spawn_flags for items
pub const SF_ITEM_TRIGGER: u32 = 0x0000_0001;
pub const SF_ITEM_NO_TOUCH: u32 = 0x0000_0002;
pub const SF_ITEM_HOVER: u32 = 0x0000_0004;
pub const SF_ITEM_DROPPED: u32 = 0x0001_0000;
pub const SF_ITEM_TARGETS_USED: u32 = 0x0002_0000;

const ITEM_MINS: Vec3 = [-15.0, -15.0, -15.0];
const ITEM_MAXS: Vec3 = [15.0, 15.0, 15.0];

const PICKUP_MESSAGE_TIME: u32 = 3000;
const QUAD_DAMAGE_TIME: u32 = 30_000;
const DROPPED_ITEM_TIME: u32 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthKind {
    Small,
    Medium,
    Large,
    Mega,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Armor(ArmorType),
    ArmorShard,
    Weapon(Weapon),
    Ammo(AmmoType),
    Health(HealthKind),
    Adrenaline,
    QuadDamage,
    Flag(TeamId),
}

/// Static description of a pickup.
#[derive(Debug, Clone, Copy)]
pub struct Item {
    pub class_name: &'static str,
    pub pickup_name: &'static str,
    pub pickup_sound: Option<&'static str>,
    pub model: &'static str,
    pub icon: &'static str,
    pub effects: u16,
    /// Armor points, ammo, health, or seconds until a powerup respawns.
    pub quantity: i16,
    pub kind: ItemKind,
}

const ITEM_EFFECTS: u16 = EF_ROTATE | EF_BOB | EF_PULSE;

const fn armor(
    class_name: &'static str,
    pickup_name: &'static str,
    sound: &'static str,
    model: &'static str,
    icon: &'static str,
    quantity: i16,
    kind: ItemKind,
) -> Item {
    Item {
        class_name,
        pickup_name,
        pickup_sound: Some(sound),
        model,
        icon,
        effects: ITEM_EFFECTS,
        quantity,
        kind,
    }
}

const fn weapon(class_name: &'static str, model: &'static str, icon: &'static str, w: Weapon) -> Item {
    Item {
        class_name,
        pickup_name: "",
        pickup_sound: Some("weapons/common/pickup"),
        model,
        icon,
        effects: ITEM_EFFECTS,
        quantity: 0,
        kind: ItemKind::Weapon(w),
    }
}

const fn ammo(class_name: &'static str, model: &'static str, icon: &'static str, a: AmmoType) -> Item {
    Item {
        class_name,
        pickup_name: "",
        pickup_sound: Some("ammo/common/pickup"),
        model,
        icon,
        effects: ITEM_EFFECTS,
        quantity: 0,
        kind: ItemKind::Ammo(a),
    }
}

const fn health(
    class_name: &'static str,
    pickup_name: &'static str,
    sound: &'static str,
    model: &'static str,
    quantity: i16,
    kind: HealthKind,
) -> Item {
    Item {
        class_name,
        pickup_name,
        pickup_sound: Some(sound),
        model,
        icon: "i_health",
        effects: ITEM_EFFECTS,
        quantity,
        kind: ItemKind::Health(kind),
    }
}

/// Every item a map may place. The position in this table is the item's
/// index, and its pickup name lives at `CS_ITEMS + index`.
pub static ITEMS: [Item; 27] = [
    armor(
        "item_armor_body",
        "Body Armor",
        "armor/body/pickup",
        "models/armor/body/tris",
        "i_bodyarmor",
        200,
        ItemKind::Armor(ArmorType::Body),
    ),
    armor(
        "item_armor_combat",
        "Combat Armor",
        "armor/combat/pickup",
        "models/armor/combat/tris",
        "i_combatarmor",
        100,
        ItemKind::Armor(ArmorType::Combat),
    ),
    armor(
        "item_armor_jacket",
        "Jacket Armor",
        "armor/jacket/pickup",
        "models/armor/jacket/tris",
        "i_jacketarmor",
        50,
        ItemKind::Armor(ArmorType::Jacket),
    ),
    armor(
        "item_armor_shard",
        "Armor Shard",
        "armor/shard/pickup",
        "models/armor/shard/tris",
        "i_shard",
        3,
        ItemKind::ArmorShard,
    ),
    weapon("weapon_shotgun", "models/weapons/shotgun/tris", "w_shotgun", Weapon::Shotgun),
    weapon("weapon_supershotgun", "models/weapons/supershotgun/tris", "w_super_shotgun", Weapon::SuperShotgun),
    weapon("weapon_machinegun", "models/weapons/machinegun/tris", "w_machinegun", Weapon::Machinegun),
    weapon(
        "weapon_grenadelauncher",
        "models/weapons/grenadelauncher/tris",
        "w_grenade_launcher",
        Weapon::GrenadeLauncher,
    ),
    weapon(
        "weapon_rocketlauncher",
        "models/weapons/rocketlauncher/tris",
        "w_rocket_launcher",
        Weapon::RocketLauncher,
    ),
    weapon("weapon_hyperblaster", "models/weapons/hyperblaster/tris", "w_hyperblaster", Weapon::Hyperblaster),
    weapon("weapon_lightning", "models/weapons/lightning/tris", "w_lightning", Weapon::Lightning),
    weapon("weapon_railgun", "models/weapons/railgun/tris", "w_railgun", Weapon::Railgun),
    weapon("weapon_bfg", "models/weapons/bfg/tris", "w_bfg10k", Weapon::Bfg10k),
    ammo("ammo_shells", "models/ammo/shells/tris", "a_shells", AmmoType::Shells),
    ammo("ammo_bullets", "models/ammo/bullets/tris", "a_bullets", AmmoType::Bullets),
    ammo("ammo_grenades", "models/ammo/grenades/tris", "a_grenades", AmmoType::Grenades),
    ammo("ammo_rockets", "models/ammo/rockets/tris", "a_rockets", AmmoType::Rockets),
    ammo("ammo_cells", "models/ammo/cells/tris", "a_cells", AmmoType::Cells),
    ammo("ammo_bolts", "models/ammo/bolts/tris", "a_bolts", AmmoType::Bolts),
    ammo("ammo_slugs", "models/ammo/slugs/tris", "a_slugs", AmmoType::Slugs),
    ammo("ammo_nukes", "models/ammo/nukes/tris", "a_nukes", AmmoType::Nukes),
    Item {
        class_name: "item_adrenaline",
        pickup_name: "Adrenaline",
        pickup_sound: Some("adren/pickup"),
        model: "models/powerups/adren/tris",
        icon: "p_adrenaline",
        effects: EF_ROTATE | EF_PULSE,
        quantity: 0,
        kind: ItemKind::Adrenaline,
    },
    health("item_health_small", "Small Health", "health/small/pickup", "models/health/small/tris", 3, HealthKind::Small),
    health("item_health", "Medium Health", "health/medium/pickup", "models/health/medium/tris", 15, HealthKind::Medium),
    health("item_health_large", "Large Health", "health/large/pickup", "models/health/large/tris", 25, HealthKind::Large),
    health("item_health_mega", "Mega Health", "health/mega/pickup", "models/health/mega/tris", 75, HealthKind::Mega),
    Item {
        class_name: "item_quad",
        pickup_name: "Quad Damage",
        pickup_sound: Some("quad/pickup"),
        model: "models/powerups/quad/tris",
        icon: "i_quad",
        effects: EF_ROTATE | EF_BOB,
        quantity: 60,
        kind: ItemKind::QuadDamage,
    },
];

static FLAGS: [Item; 2] = [
    Item {
        class_name: "item_flag_team1",
        pickup_name: "Flag",
        pickup_sound: None,
        model: "models/ctf/flag1/tris",
        icon: "i_flag1",
        effects: EF_ROTATE | EF_BOB,
        quantity: 0,
        kind: ItemKind::Flag(TeamId::Good),
    },
    Item {
        class_name: "item_flag_team2",
        pickup_name: "Flag",
        pickup_sound: None,
        model: "models/ctf/flag2/tris",
        icon: "i_flag2",
        effects: EF_ROTATE | EF_BOB,
        quantity: 0,
        kind: ItemKind::Flag(TeamId::Evil),
    },
];

/// Class names from other games that map onto our items.
const ITEM_OVERRIDES: &[(&str, &str)] = &[
    ("weapon_chaingun", "weapon_machinegun"),
    ("item_invulnerability", "item_quad"),
    ("item_power_shield", "item_armor_combat"),
    ("item_power_screen", "item_armor_jacket"),
];

pub const NUM_ITEMS: usize = 29;

/// Item by index, flags last.
pub fn item(index: usize) -> Option<&'static Item> {
    ITEMS.get(index).or_else(|| FLAGS.get(index.checked_sub(ITEMS.len())?))
}

fn items() -> impl Iterator<Item = (usize, &'static Item)> {
    ITEMS.iter().chain(FLAGS.iter()).enumerate()
}

pub fn find_item_by_class_name(class_name: &str) -> Option<usize> {
    let class_name = ITEM_OVERRIDES
        .iter()
        .find(|(from, _)| *from == class_name)
        .map(|(_, to)| *to)
        .unwrap_or(class_name);
    items().find(|(_, it)| it.class_name == class_name).map(|(i, _)| i)
}

/// Case-insensitive lookup by pickup name.
pub fn find_item(pickup_name: &str) -> Option<usize> {
    items()
        .find(|(_, it)| it.display_name().eq_ignore_ascii_case(pickup_name))
        .map(|(i, _)| i)
}

pub fn flag_item(team: TeamId) -> usize {
    ITEMS.len() + team.index()
}

impl Item {
    /// Weapons and ammo are named by their inventory entry.
    pub fn display_name(&self) -> &'static str {
        match self.kind {
            ItemKind::Weapon(w) => w.name(),
            ItemKind::Ammo(a) => match a {
                AmmoType::Shells => "Shells",
                AmmoType::Bullets => "Bullets",
                AmmoType::Grenades => "Grenades",
                AmmoType::Rockets => "Rockets",
                AmmoType::Cells => "Cells",
                AmmoType::Bolts => "Bolts",
                AmmoType::Slugs => "Slugs",
                AmmoType::Nukes => "Nukes",
            },
            _ => self.pickup_name,
        }
    }

    /// Ammo granted by a fresh weapon or ammo box.
    pub fn ammo_quantity(&self) -> i16 {
        match self.kind {
            ItemKind::Weapon(w) => w.info().ammo.map(|a| a.pickup_quantity()).unwrap_or(0),
            ItemKind::Ammo(a) => a.pickup_quantity(),
            _ => self.quantity,
        }
    }
}

pub fn effect_for_team(team: TeamId) -> u16 {
    match team {
        TeamId::Good => EF_CTF_BLUE,
        TeamId::Evil => EF_CTF_RED,
    }
}

impl GameCtx {
    // ============================================================
    // Registration
    // ============================================================

    /// Publish pickup names so the HUD can show them by config string.
    pub fn set_item_names(&mut self) {
        for (i, it) in items() {
            self.gi.set_config_string(CS_ITEMS + i, it.display_name());
        }
    }

    pub fn precache_item(&mut self, index: usize) {
        let Some(it) = item(index) else {
            return;
        };
        if let Some(sound) = it.pickup_sound {
            self.gi.sound_index(sound);
        }
        self.gi.model_index(it.model);
        self.gi.image_index(it.icon);

        match it.kind {
            ItemKind::Weapon(w) => {
                if let Some(ammo) = w.info().ammo.and_then(ammo_item) {
                    self.precache_item(ammo);
                }
            }
            ItemKind::QuadDamage => {
                self.gi.sound_index("quad/attack");
                self.gi.sound_index("quad/expire");
            }
            ItemKind::Flag(_) => {
                for s in ["ctf/capture", "ctf/steal", "ctf/return"] {
                    self.gi.sound_index(s);
                }
            }
            _ => {}
        }
    }

    pub fn item_of(&self, ent: usize) -> Option<&'static Item> {
        self.edicts.get(ent)?.item.and_then(item)
    }

    // ============================================================
    // Spawning
    // ============================================================

    /// Set up a map-placed item. It settles onto the floor a couple of frames
    /// later, once whatever it rests on has spawned.
    pub fn spawn_item(&mut self, ent: usize, index: usize) {
        let Some(it) = item(index) else {
            return;
        };
        self.precache_item(index);

        let time = self.level.time;
        let frame = self.frame_millis();

        let e = &mut self.edicts[ent];
        if e.spawn_flags != 0 {
            debug!("{} at {} has spawnflags {}", e.class_name, vtos(&e.s.origin), e.spawn_flags);
        }

        e.class_name = it.class_name.to_string();
        e.item = Some(index);
        e.mins = ITEM_MINS;
        e.maxs = ITEM_MAXS;
        e.solid = Solid::Trigger;
        e.move_type = MoveType::Toss;
        e.touch = Some(TouchFn::Item);
        e.think = Some(ThinkFn::ItemDropToFloor);
        e.next_think = time + 2 * frame;
        e.s.effects = it.effects;

        let model = if e.model.is_empty() { it.model.to_string() } else { e.model.clone() };
        let model = self.gi.model_index(&model);
        let e = &mut self.edicts[ent];
        e.s.model1 = model;

        if e.spawn_flags & SF_ITEM_NO_TOUCH != 0 {
            e.solid = Solid::Box;
            e.touch = None;
        }

        if e.spawn_flags & SF_ITEM_TRIGGER != 0 {
            e.use_fn = Some(UseFn::Item);
        }

        if self.item_hidden(ent) {
            self.hide_item(ent);
        }
    }

    /// Items not in play under the current rules: flags outside of CTF,
    /// everything else outside of default gameplay, and items waiting on a
    /// trigger.
    fn item_hidden(&self, ent: usize) -> bool {
        let e = &self.edicts[ent];
        if e.spawn_flags & SF_ITEM_TRIGGER != 0 && e.use_fn.is_some() {
            return true;
        }
        match self.item_of(ent).map(|it| it.kind) {
            Some(ItemKind::Flag(_)) => !self.level.ctf,
            Some(_) => self.level.gameplay != Gameplay::Default,
            None => true,
        }
    }

    fn hide_item(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.sv_flags |= SVF_NO_CLIENT;
        e.solid = Solid::Not;
        self.link_entity(ent);
    }

    fn show_item(&mut self, ent: usize) {
        let e = &mut self.edicts[ent];
        e.sv_flags &= !SVF_NO_CLIENT;
        if e.spawn_flags & SF_ITEM_NO_TOUCH != 0 {
            e.solid = Solid::Box;
            e.touch = None;
        } else {
            e.solid = Solid::Trigger;
            e.touch = Some(TouchFn::Item);
        }
        self.link_entity(ent);
    }

    /// Plant the item on whatever is below it. Hovering items stay put.
    /// Teamed items show one member at a time, picked by the team master.
    pub fn item_drop_to_floor(&mut self, ent: usize) {
        self.edicts[ent].velocity = VEC3_ORIGIN;

        if self.edicts[ent].spawn_flags & SF_ITEM_HOVER != 0 {
            self.edicts[ent].move_type = MoveType::Fly;
            self.edicts[ent].ground_entity = None;
        } else {
            let e = &self.edicts[ent];
            let (origin, mins, maxs) = (e.s.origin, e.mins, e.maxs);
            let mut dest = origin;
            dest[2] -= 8192.0;

            let tr = self.gi.trace(&origin, &mins, &maxs, &dest, Some(ent), MASK_SOLID);
            if tr.start_solid {
                debug!("{} start_solid at {}", self.edicts[ent].class_name, vtos(&origin));
                self.free_entity(ent);
                return;
            }

            let ground = tr.ent.map(|g| self.entity_ref(g));
            let e = &mut self.edicts[ent];
            e.s.origin = tr.end;
            e.ground_entity = ground;
        }

        if !self.edicts[ent].team.is_empty() {
            self.hide_item(ent);
            let master = self.resolve(self.edicts[ent].team_master).unwrap_or(ent);
            if master == ent {
                let time = self.level.time + self.frame_millis();
                let e = &mut self.edicts[ent];
                e.think = Some(ThinkFn::ItemRespawn);
                e.next_think = time;
            }
            return;
        }

        self.link_entity(ent);
    }

    /// Map triggers reveal `SF_ITEM_TRIGGER` items.
    pub fn item_use(&mut self, ent: usize) {
        self.edicts[ent].use_fn = None;
        if self.item_hidden(ent) {
            return;
        }
        self.show_item(ent);
    }

    // ============================================================
    // Respawning
    // ============================================================

    pub fn set_item_respawn(&mut self, ent: usize, delay: u32) {
        let time = self.level.time;
        let e = &mut self.edicts[ent];
        e.sv_flags |= SVF_NO_CLIENT;
        e.solid = Solid::Not;
        e.think = Some(ThinkFn::ItemRespawn);
        e.next_think = time + delay;
        self.link_entity(ent);
    }

    /// Bring a taken item back. For teamed items a random member of the team
    /// reappears instead. Anyone standing on the spot picks it up at once.
    pub fn item_respawn(&mut self, ent: usize) {
        let mut target = ent;

        if !self.edicts[ent].team.is_empty() {
            let master = self.resolve(self.edicts[ent].team_master).unwrap_or(ent);
            let mut members = vec![master];
            let mut next = self.resolve(self.edicts[master].team_chain);
            while let Some(m) = next {
                if members.contains(&m) {
                    break;
                }
                members.push(m);
                next = self.resolve(self.edicts[m].team_chain);
            }
            target = members[self.randomi(members.len())];
        }

        self.edicts[target].think = None;
        if self.item_hidden(target) {
            return;
        }

        self.show_item(target);
        self.edicts[target].s.event = EntityEvent::ItemRespawn;
        self.touch_solids(target);
    }

    // ============================================================
    // Pickups
    // ============================================================

    fn pickup_armor(&mut self, ent: usize, other: usize, it: &Item) -> bool {
        let dropped = self.edicts[ent].spawn_flags & SF_ITEM_DROPPED != 0;
        let Some(client) = self.client_mut(other) else {
            return false;
        };
        let p = &mut client.persistent;

        match it.kind {
            ItemKind::ArmorShard => {
                p.armor += it.quantity;
                if p.armor_type == ArmorType::None {
                    p.armor_type = ArmorType::Jacket;
                }
            }
            ItemKind::Armor(armor_type) if p.armor < p.max_armor => {
                p.armor = (p.armor + it.quantity).min(p.max_armor);
                p.armor_type = p.armor_type.max(armor_type);
            }
            _ => return false,
        }

        if !dropped {
            self.set_item_respawn(ent, 20_000);
        }
        true
    }

    /// Weapons carry their ammo in `count`, dropped ones whatever the dropper
    /// had left.
    fn pickup_weapon(&mut self, ent: usize, other: usize, weapon: Weapon, it: &Item) -> bool {
        let e = &self.edicts[ent];
        let dropped = e.spawn_flags & SF_ITEM_DROPPED != 0;
        let quantity = if e.count > 0 { e.count as i16 } else { it.ammo_quantity() };

        let Some(client) = self.client_mut(other) else {
            return false;
        };
        let p = &mut client.persistent;

        if let Some(a) = weapon.info().ammo {
            let i = a.index();
            let have = p.ammo[i];
            let ammo = if quantity <= have { have + quantity / 2 } else { quantity + have / 2 };
            p.ammo[i] = ammo.min(p.max_ammo[i]);
        }

        p.weapons |= weapon.bit();
        let switch = p.weapon == Some(Weapon::Blaster) && weapon != Weapon::Blaster;

        if !dropped {
            let delay = if weapon == Weapon::Bfg10k { 30_000 } else { 5000 };
            self.set_item_respawn(ent, delay);
        }

        if switch {
            self.change_weapon(other, Some(weapon));
        }
        true
    }

    fn pickup_ammo(&mut self, ent: usize, other: usize, a: AmmoType, it: &Item) -> bool {
        let e = &self.edicts[ent];
        let dropped = e.spawn_flags & SF_ITEM_DROPPED != 0;
        let quantity = if e.count > 0 { e.count as i16 } else { it.ammo_quantity() };

        let Some(client) = self.client_mut(other) else {
            return false;
        };
        let p = &mut client.persistent;
        let i = a.index();
        if p.ammo[i] >= p.max_ammo[i] {
            return false;
        }
        p.ammo[i] = (p.ammo[i] + quantity).min(p.max_ammo[i]);

        if !dropped {
            self.set_item_respawn(ent, 20_000);
        }
        true
    }

    /// Small and mega health are always taken, up to 200 or the current
    /// health if that is higher. Small health stacks without limit.
    fn pickup_health(&mut self, ent: usize, other: usize, kind: HealthKind, it: &Item) -> bool {
        let always_add = kind == HealthKind::Small;
        let always_pickup = matches!(kind, HealthKind::Small | HealthKind::Mega);

        let (health, max_health) = (self.edicts[other].health, self.edicts[other].max_health);
        if health >= max_health && !always_pickup {
            return false;
        }

        let max = if always_add {
            i32::from(i16::MAX)
        } else if always_pickup {
            health.max(200)
        } else {
            max_health
        };
        let health = (health + it.quantity as i32).min(max);

        self.edicts[other].health = health;
        if let Some(client) = self.client_mut(other) {
            client.persistent.health = health as i16;
        }

        if self.edicts[ent].spawn_flags & SF_ITEM_DROPPED == 0 {
            let delay = if it.quantity >= 50 { 60_000 } else { 20_000 };
            self.set_item_respawn(ent, delay);
        }
        true
    }

    fn pickup_adrenaline(&mut self, ent: usize, other: usize) -> bool {
        let o = &mut self.edicts[other];
        o.health = o.health.max(o.max_health);

        if self.edicts[ent].spawn_flags & SF_ITEM_DROPPED == 0 {
            self.set_item_respawn(ent, 30_000);
        }
        true
    }

    /// A dropped quad carries only the time its owner had left.
    fn pickup_quad_damage(&mut self, ent: usize, other: usize, it: &Item) -> bool {
        let time = self.level.time;
        let e = &self.edicts[ent];
        let (dropped, remaining) = (e.spawn_flags & SF_ITEM_DROPPED != 0, e.timestamp);

        let Some(client) = self.client_mut(other) else {
            return false;
        };
        if client.locals.quad_damage_time > time {
            return false;
        }

        if dropped {
            client.locals.quad_damage_time = remaining;
        } else {
            client.locals.quad_damage_time = time + QUAD_DAMAGE_TIME;
            self.set_item_respawn(ent, it.quantity as u32 * 1000);
        }

        self.edicts[other].s.effects |= EF_QUAD;
        true
    }

    /// Return our own dropped flag, capture on our base while carrying the
    /// enemy flag, or take the enemy flag.
    fn pickup_flag(&mut self, ent: usize, other: usize, team: TeamId) -> bool {
        let Some(client) = self.client(other) else {
            return false;
        };
        let Some(own) = client.persistent.team else {
            return false;
        };
        let name = client.persistent.net_name.clone();
        let carried = client.locals.flag;

        let Some(base) = self.flag_for_team(team) else {
            return false;
        };
        let Some(other_base) = self.flag_for_team(team.other()) else {
            return false;
        };

        if team == own {
            if self.edicts[ent].spawn_flags & SF_ITEM_DROPPED != 0 {
                self.show_item(base);
                self.edicts[base].s.event = EntityEvent::ItemRespawn;

                let sound = self.gi.sound_index("ctf/return");
                self.gi.sound(other, sound, Attenuation::None);

                let msg = format!("{} returned the {} flag\n", name, self.team(team).name);
                self.gi.bprint(PrintLevel::High, &msg);
                return true;
            }

            if carried == Some(team.other()) {
                if let Some(client) = self.client_mut(other) {
                    client.locals.flag = None;
                    client.persistent.captures += 1;
                }
                let o = &mut self.edicts[other];
                o.s.effects &= !effect_for_team(team.other());
                o.s.model3 = 0;

                self.show_item(other_base);
                self.edicts[other_base].s.event = EntityEvent::ItemRespawn;

                let sound = self.gi.sound_index("ctf/capture");
                self.gi.sound(other, sound, Attenuation::None);

                let msg = format!("{} captured the {} flag\n", name, self.team(team.other()).name);
                self.gi.bprint(PrintLevel::High, &msg);

                self.team_mut(own).captures += 1;
            }
            return false;
        }

        if self.edicts[ent].sv_flags & SVF_NO_CLIENT != 0 {
            return false;
        }

        if let Some(client) = self.client_mut(other) {
            client.locals.flag = Some(team);
        }

        let model = self.gi.model_index(FLAGS[team.index()].model);
        let o = &mut self.edicts[other];
        o.s.model3 = model;
        o.s.effects |= effect_for_team(team);

        let sound = self.gi.sound_index("ctf/steal");
        self.gi.sound(other, sound, Attenuation::None);

        let msg = format!("{} stole the {} flag\n", name, self.team(team).name);
        self.gi.bprint(PrintLevel::High, &msg);
        true
    }

    fn pickup(&mut self, ent: usize, other: usize, it: &'static Item) -> bool {
        match it.kind {
            ItemKind::Armor(_) | ItemKind::ArmorShard => self.pickup_armor(ent, other, it),
            ItemKind::Weapon(w) => self.pickup_weapon(ent, other, w, it),
            ItemKind::Ammo(a) => self.pickup_ammo(ent, other, a, it),
            ItemKind::Health(kind) => self.pickup_health(ent, other, kind, it),
            ItemKind::Adrenaline => self.pickup_adrenaline(ent, other),
            ItemKind::QuadDamage => self.pickup_quad_damage(ent, other, it),
            ItemKind::Flag(team) => self.pickup_flag(ent, other, team),
        }
    }

    /// Live players take items they can use. The item's targets fire on the
    /// first touch whether or not it was taken.
    pub fn touch_item(&mut self, ent: usize, other: usize) {
        if !self.edicts[other].is_client() || self.edicts[other].health < 1 || self.level.warmup {
            return;
        }
        let (Some(index), Some(it)) = (self.edicts[ent].item, self.item_of(ent)) else {
            return;
        };

        let taken = self.pickup(ent, other, it);

        if taken {
            let icon = self.gi.image_index(it.icon);
            let time = self.level.time;
            if let Some(client) = self.client_mut(other) {
                client.ps.stats[STAT_PICKUP_ICON] = icon as i16;
                client.ps.stats[STAT_PICKUP_STRING] = (CS_ITEMS + index) as i16;
                client.locals.pickup_msg_time = time + PICKUP_MESSAGE_TIME;
            }
            if let Some(sound) = it.pickup_sound {
                let sound = self.gi.sound_index(sound);
                self.gi.sound(other, sound, Attenuation::Norm);
            }
            self.edicts[other].s.event = EntityEvent::ItemPickup;
        }

        if self.edicts[ent].spawn_flags & SF_ITEM_TARGETS_USED == 0 {
            self.use_targets(ent, Some(other));
            if !self.edicts[ent].in_use {
                return;
            }
            self.edicts[ent].spawn_flags |= SF_ITEM_TARGETS_USED;
        }

        if !taken {
            return;
        }

        if self.edicts[ent].spawn_flags & SF_ITEM_DROPPED != 0 {
            self.free_entity(ent);
        } else if matches!(it.kind, ItemKind::Flag(_)) {
            self.hide_item(ent);
            // still touchable so the owning team can capture on it
            self.edicts[ent].solid = Solid::Trigger;
            self.link_entity(ent);
        }
    }

    /// The dropper can't take it straight back.
    pub fn touch_dropped_item(&mut self, ent: usize, other: usize) {
        if self.resolve(self.edicts[ent].owner) == Some(other) {
            return;
        }
        self.touch_item(ent, other);
    }

    // ============================================================
    // Dropping
    // ============================================================

    /// Throw an item out of `ent`. Inventory is left to the caller. `None`
    /// if there was no room to drop it.
    pub fn drop_item(&mut self, ent: usize, index: usize) -> Option<usize> {
        let it = item(index)?;
        let dropped = self.alloc_entity(it.class_name).ok()?;

        let model = self.gi.model_index(it.model);
        let owner = self.entity_ref(ent);
        let d = &mut self.edicts[dropped];
        d.item = Some(index);
        d.spawn_flags = SF_ITEM_DROPPED;
        d.s.effects = it.effects & !EF_BOB;
        d.s.model1 = model;
        d.mins = ITEM_MINS;
        d.maxs = ITEM_MAXS;
        d.solid = Solid::Trigger;
        d.move_type = MoveType::Toss;
        d.touch = Some(TouchFn::ItemDropped);
        d.owner = Some(owner);

        let origin = self.edicts[ent].s.origin;
        let (forward, tr) = match self.client(ent).map(|c| c.locals.angles[YAW]) {
            Some(yaw) => {
                let yaw = yaw + self.crand() * 45.0;
                let (forward, _, _) = angle_vectors_tuple(&[0.0, yaw, 0.0]);
                let dest = vector_ma(&origin, 24.0, &forward);
                let tr = self.gi.trace(&origin, &ITEM_MINS, &ITEM_MAXS, &dest, Some(ent), CONTENTS_SOLID);
                (forward, tr)
            }
            None => {
                let (forward, _, _) = angle_vectors_tuple(&self.edicts[ent].s.angles);
                let tr = self.gi.trace(&origin, &ITEM_MINS, &ITEM_MAXS, &origin, Some(ent), CONTENTS_SOLID);
                (forward, Trace { end: origin, ..tr })
            }
        };

        if tr.start_solid {
            if matches!(it.kind, ItemKind::Flag(_)) {
                self.reset_flag(dropped);
            } else {
                self.free_entity(dropped);
            }
            return None;
        }

        let up = 200.0 + self.frand() * 150.0;
        let time = self.level.time + self.frame_millis();
        let d = &mut self.edicts[dropped];
        d.s.origin = tr.end;
        d.velocity = vector_scale(&forward, 100.0);
        d.velocity[2] = up;
        d.think = Some(ThinkFn::ItemDropped);
        d.next_think = time;

        self.link_entity(dropped);
        Some(dropped)
    }

    /// Once landed, anyone may take it. Flags go home and everything else
    /// vanishes after a while, sooner in lava or slime.
    pub fn item_dropped_think(&mut self, ent: usize) {
        let frame = self.frame_millis();
        if self.edicts[ent].ground_entity.is_none() {
            self.edicts[ent].next_think = self.level.time + frame;
            return;
        }

        // landed on a trigger_hurt, perhaps
        self.touch_triggers(ent);
        if !self.edicts[ent].in_use {
            return;
        }

        let Some(it) = self.item_of(ent) else {
            return;
        };
        let time = self.level.time;
        let contents = self.gi.point_contents(&self.edicts[ent].s.origin);

        let e = &mut self.edicts[ent];
        e.s.effects = it.effects;
        e.touch = Some(TouchFn::Item);
        e.think = Some(if matches!(it.kind, ItemKind::Flag(_)) {
            ThinkFn::ResetFlag
        } else {
            ThinkFn::FreeEntity
        });

        let remaining = match it.kind {
            ItemKind::QuadDamage => e.timestamp.saturating_sub(time),
            _ => DROPPED_ITEM_TIME,
        };
        let mut delay = remaining as f32;
        if contents & CONTENTS_LAVA != 0 {
            delay *= 0.3;
        }
        if contents & CONTENTS_SLIME != 0 {
            delay *= 0.5;
        }
        e.next_think = time + delay as u32;
    }

    /// Drop the current weapon with whatever ammo it has, up to one pickup's
    /// worth. Never the blaster, and not when out of ammo.
    pub fn toss_weapon(&mut self, ent: usize) {
        let Some(client) = self.client(ent) else {
            return;
        };
        let Some(weapon) = client.persistent.weapon.filter(|&w| w != Weapon::Blaster) else {
            return;
        };
        let Some(ammo) = weapon.info().ammo else {
            return;
        };
        let have = client.persistent.ammo[ammo.index()];
        if have == 0 {
            return;
        }
        let Some(index) = items().find(|(_, it)| it.kind == ItemKind::Weapon(weapon)).map(|(i, _)| i) else {
            return;
        };

        if let Some(dropped) = self.drop_item(ent, index) {
            self.edicts[dropped].count = i32::from(have.min(ammo.pickup_quantity()));
        }
    }

    pub fn toss_quad_damage(&mut self, ent: usize) {
        let time = self.level.time;
        let Some(quad_time) = self.client(ent).map(|c| c.locals.quad_damage_time) else {
            return;
        };
        if quad_time <= time {
            return;
        }
        let Some(index) = find_item_by_class_name("item_quad") else {
            return;
        };

        if let Some(dropped) = self.drop_item(ent, index) {
            self.edicts[dropped].timestamp = quad_time;
        }

        if let Some(client) = self.client_mut(ent) {
            client.locals.quad_damage_time = 0;
        }
        self.edicts[ent].s.effects &= !EF_QUAD;
    }

    pub fn toss_flag(&mut self, ent: usize) {
        let Some(client) = self.client_mut(ent) else {
            return;
        };
        let Some(team) = client.locals.flag.take() else {
            return;
        };
        let name = client.persistent.net_name.clone();

        let e = &mut self.edicts[ent];
        e.s.model3 = 0;
        e.s.effects &= !(EF_CTF_RED | EF_CTF_BLUE);

        let msg = format!("{} dropped the {} flag\n", name, self.team(team).name);
        self.gi.bprint(PrintLevel::High, &msg);

        self.drop_item(ent, flag_item(team));
    }

    // ============================================================
    // Flags
    // ============================================================

    pub fn team_for_flag(&self, ent: usize) -> Option<TeamId> {
        if !self.level.ctf {
            return None;
        }
        match self.item_of(ent)?.kind {
            ItemKind::Flag(team) => Some(team),
            _ => None,
        }
    }

    /// The team's base flag. Only meaningful in CTF.
    pub fn flag_for_team(&self, team: TeamId) -> Option<usize> {
        if !self.level.ctf {
            return None;
        }
        let index = flag_item(team);
        (self.max_clients + 1..self.num_edicts).find(|&i| {
            let e = &self.edicts[i];
            e.in_use && e.item == Some(index) && e.spawn_flags & SF_ITEM_DROPPED == 0
        })
    }

    /// Send a dropped flag home.
    pub fn reset_flag(&mut self, ent: usize) {
        let Some(team) = self.team_for_flag(ent) else {
            self.free_entity(ent);
            return;
        };

        if let Some(base) = self.flag_for_team(team) {
            self.show_item(base);
            self.edicts[base].s.event = EntityEvent::ItemRespawn;
        }

        let sound = self.gi.sound_index("ctf/return");
        self.gi.sound(ent, sound, Attenuation::None);

        let msg = format!("The {} flag has been returned\n", self.team(team).name);
        self.gi.bprint(PrintLevel::High, &msg);

        self.free_entity(ent);
    }

    /// After a rule change: dropped items go away and map items appear or
    /// hide to suit the new gameplay and CTF settings.
    pub fn reset_items(&mut self) {
        let time = self.level.time + 2 * self.frame_millis();

        for i in self.max_clients + 1..self.num_edicts {
            let e = &self.edicts[i];
            if !e.in_use || e.item.is_none() {
                continue;
            }

            if e.spawn_flags & SF_ITEM_DROPPED != 0 {
                self.free_entity(i);
                continue;
            }

            if self.item_hidden(i) {
                self.hide_item(i);
                let e = &mut self.edicts[i];
                e.think = None;
                e.next_think = 0;
            } else {
                self.show_item(i);
                let e = &mut self.edicts[i];
                e.think = Some(ThinkFn::ItemDropToFloor);
                e.next_think = time;
            }
        }
    }
}

fn ammo_item(a: AmmoType) -> Option<usize> {
    items().find(|(_, it)| it.kind == ItemKind::Ammo(a)).map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn ready_client(ctx: &mut GameCtx, ent: usize, origin: Vec3) {
        spawn_test_client(ctx, ent, origin);
        let p = &mut ctx.clients[ent - 1].persistent;
        p.max_health = 100;
        p.max_armor = 200;
        for a in AmmoType::ALL {
            p.max_ammo[a.index()] = a.default_max();
        }
        p.weapons = Weapon::Blaster.bit();
        p.weapon = Some(Weapon::Blaster);
    }

    fn place_item(ctx: &mut GameCtx, class_name: &str, origin: Vec3) -> usize {
        let ent = ctx.alloc_entity(class_name).unwrap();
        ctx.edicts[ent].s.origin = origin;
        let index = find_item_by_class_name(class_name).unwrap();
        ctx.spawn_item(ent, index);
        ctx.item_drop_to_floor(ent);
        ent
    }

    fn enable_ctf(ctx: &mut GameCtx, good: usize, evil: usize) {
        ctx.level.ctf = true;
        ctx.clients[good - 1].persistent.team = Some(TeamId::Good);
        ctx.clients[evil - 1].persistent.team = Some(TeamId::Evil);
    }

    // ============================================================
    // Table
    // ============================================================

    #[test]
    fn test_item_lookup_and_overrides() {
        assert_eq!(ITEMS.len() + FLAGS.len(), NUM_ITEMS);
        assert!(NUM_ITEMS <= MAX_ITEMS);

        let mg = find_item_by_class_name("weapon_chaingun").unwrap();
        assert_eq!(item(mg).unwrap().kind, ItemKind::Weapon(Weapon::Machinegun));
        let quad = find_item_by_class_name("item_invulnerability").unwrap();
        assert_eq!(item(quad).unwrap().kind, ItemKind::QuadDamage);

        assert_eq!(find_item("rocket launcher"), find_item_by_class_name("weapon_rocketlauncher"));
        assert_eq!(find_item_by_class_name("item_flag_team2"), Some(flag_item(TeamId::Evil)));
        assert!(find_item_by_class_name("monster_tank").is_none());
    }

    #[test]
    fn test_item_names_published() {
        let (mut ctx, world) = make_ctx(2, 64);
        ctx.set_item_names();

        let w = world.borrow();
        let body = find_item_by_class_name("item_armor_body").unwrap();
        assert_eq!(w.config_strings[&(CS_ITEMS + body)], "Body Armor");
        let slugs = find_item_by_class_name("ammo_slugs").unwrap();
        assert_eq!(w.config_strings[&(CS_ITEMS + slugs)], "Slugs");
    }

    // ============================================================
    // Spawning
    // ============================================================

    #[test]
    fn test_item_settles_on_floor() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        let ent = place_item(&mut ctx, "item_health", [0.0, 0.0, 100.0]);

        let e = &ctx.edicts[ent];
        assert!(e.in_use);
        assert!((e.s.origin[2] - 15.0).abs() < 0.1);
        assert_eq!(ctx.resolve(e.ground_entity), Some(0));
        assert_eq!(e.solid, Solid::Trigger);
    }

    #[test]
    fn test_item_in_solid_is_removed() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        let ent = place_item(&mut ctx, "item_health", [0.0, 0.0, -10.0]);
        assert!(!ctx.edicts[ent].in_use);
    }

    #[test]
    fn test_items_hidden_outside_default_gameplay() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ctx.level.gameplay = Gameplay::Instagib;

        let armor = place_item(&mut ctx, "item_armor_body", [0.0, 0.0, 16.0]);
        assert_eq!(ctx.edicts[armor].solid, Solid::Not);
        assert_ne!(ctx.edicts[armor].sv_flags & SVF_NO_CLIENT, 0);

        // switching back brings them out
        ctx.level.gameplay = Gameplay::Default;
        ctx.reset_items();
        assert_eq!(ctx.edicts[armor].solid, Solid::Trigger);
        assert_eq!(ctx.edicts[armor].sv_flags & SVF_NO_CLIENT, 0);
    }

    #[test]
    fn test_flags_need_ctf() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        let flag = place_item(&mut ctx, "item_flag_team1", [0.0, 0.0, 16.0]);
        assert_eq!(ctx.edicts[flag].solid, Solid::Not);
        assert!(ctx.flag_for_team(TeamId::Good).is_none());

        ctx.level.ctf = true;
        ctx.reset_items();
        assert_eq!(ctx.edicts[flag].solid, Solid::Trigger);
        assert_eq!(ctx.flag_for_team(TeamId::Good), Some(flag));
    }

    #[test]
    fn test_triggered_item_appears_when_used() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        let ent = ctx.alloc_entity("item_quad").unwrap();
        ctx.edicts[ent].s.origin = [0.0, 0.0, 16.0];
        ctx.edicts[ent].spawn_flags = SF_ITEM_TRIGGER;
        ctx.spawn_item(ent, find_item_by_class_name("item_quad").unwrap());
        assert_eq!(ctx.edicts[ent].solid, Solid::Not);

        ctx.call_use(ent, None, None);
        assert_eq!(ctx.edicts[ent].solid, Solid::Trigger);
        assert!(ctx.edicts[ent].use_fn.is_none());
    }

    // ============================================================
    // Pickups
    // ============================================================

    #[test]
    fn test_armor_pickup_upgrades_type_and_respawns() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ctx.clients[0].persistent.armor = 20;
        ctx.clients[0].persistent.armor_type = ArmorType::Jacket;

        let armor = place_item(&mut ctx, "item_armor_combat", [0.0, 0.0, 16.0]);
        ctx.touch_item(armor, 1);

        let p = &ctx.clients[0].persistent;
        assert_eq!(p.armor, 120);
        assert_eq!(p.armor_type, ArmorType::Combat);
        assert_eq!(ctx.edicts[armor].solid, Solid::Not);
        assert_eq!(ctx.edicts[armor].think, Some(ThinkFn::ItemRespawn));
        assert_eq!(ctx.edicts[armor].next_think, ctx.level.time + 20_000);
        assert_eq!(ctx.edicts[1].s.event, EntityEvent::ItemPickup);
        assert_eq!(ctx.clients[0].locals.pickup_msg_time, ctx.level.time + PICKUP_MESSAGE_TIME);
    }

    #[test]
    fn test_shard_ignores_armor_cap() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ctx.clients[0].persistent.armor = 200;
        ctx.clients[0].persistent.armor_type = ArmorType::Body;

        let body = place_item(&mut ctx, "item_armor_body", [0.0, 0.0, 16.0]);
        ctx.touch_item(body, 1);
        assert_eq!(ctx.edicts[body].solid, Solid::Trigger);

        let shard = place_item(&mut ctx, "item_armor_shard", [0.0, 0.0, 16.0]);
        ctx.touch_item(shard, 1);
        assert_eq!(ctx.clients[0].persistent.armor, 203);
        assert_eq!(ctx.clients[0].persistent.armor_type, ArmorType::Body);
    }

    #[test]
    fn test_weapon_pickup_gives_ammo_and_switches_from_blaster() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);

        let rl = place_item(&mut ctx, "weapon_rocketlauncher", [0.0, 0.0, 16.0]);
        ctx.touch_item(rl, 1);

        let p = &ctx.clients[0].persistent;
        assert!(p.weapons.contains(Weapon::RocketLauncher.bit()));
        assert_eq!(p.ammo[AmmoType::Rockets.index()], 10);
        assert_eq!(p.weapon, Some(Weapon::RocketLauncher));
        assert_eq!(ctx.edicts[rl].next_think, ctx.level.time + 5000);

        // a second one only tops up by half
        let bfg = place_item(&mut ctx, "weapon_bfg", [0.0, 0.0, 16.0]);
        ctx.touch_item(bfg, 1);
        ctx.edicts[rl].solid = Solid::Trigger;
        ctx.touch_item(rl, 1);
        let p = &ctx.clients[0].persistent;
        assert_eq!(p.ammo[AmmoType::Rockets.index()], 15);
        assert_eq!(p.weapon, Some(Weapon::RocketLauncher));
        assert_eq!(ctx.edicts[bfg].next_think, ctx.level.time + 30_000);
    }

    #[test]
    fn test_ammo_pickup_caps_and_refuses_when_full() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ctx.clients[0].persistent.ammo[AmmoType::Nukes.index()] = 9;

        let nukes = place_item(&mut ctx, "ammo_nukes", [0.0, 0.0, 16.0]);
        ctx.touch_item(nukes, 1);
        assert_eq!(ctx.clients[0].persistent.ammo[AmmoType::Nukes.index()], 10);
        assert_eq!(ctx.edicts[nukes].solid, Solid::Not);

        let more = place_item(&mut ctx, "ammo_nukes", [0.0, 0.0, 16.0]);
        ctx.touch_item(more, 1);
        assert_eq!(ctx.edicts[more].solid, Solid::Trigger);
    }

    #[test]
    fn test_health_pickup_rules() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);

        // medium health is refused at full health
        let medium = place_item(&mut ctx, "item_health", [0.0, 0.0, 16.0]);
        ctx.touch_item(medium, 1);
        assert_eq!(ctx.edicts[1].health, 100);
        assert_eq!(ctx.edicts[medium].solid, Solid::Trigger);

        // mega is always taken and caps at 200
        ctx.edicts[1].health = 150;
        let mega = place_item(&mut ctx, "item_health_mega", [0.0, 0.0, 16.0]);
        ctx.touch_item(mega, 1);
        assert_eq!(ctx.edicts[1].health, 200);
        assert_eq!(ctx.edicts[mega].next_think, ctx.level.time + 60_000);

        // small stacks past it
        let small = place_item(&mut ctx, "item_health_small", [0.0, 0.0, 16.0]);
        ctx.touch_item(small, 1);
        assert_eq!(ctx.edicts[1].health, 203);
        assert_eq!(ctx.clients[0].persistent.health, 203);

        ctx.edicts[1].health = 95;
        ctx.touch_item(medium, 1);
        assert_eq!(ctx.edicts[1].health, 100);
    }

    #[test]
    fn test_quad_pickup() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);

        let quad = place_item(&mut ctx, "item_quad", [0.0, 0.0, 16.0]);
        ctx.touch_item(quad, 1);
        assert_eq!(ctx.clients[0].locals.quad_damage_time, ctx.level.time + QUAD_DAMAGE_TIME);
        assert_ne!(ctx.edicts[1].s.effects & EF_QUAD, 0);
        assert_eq!(ctx.edicts[quad].next_think, ctx.level.time + 60_000);

        // one at a time
        let second = place_item(&mut ctx, "item_quad", [0.0, 0.0, 16.0]);
        ctx.touch_item(second, 1);
        assert_eq!(ctx.edicts[second].solid, Solid::Trigger);
    }

    #[test]
    fn test_dead_players_and_warmup_take_nothing() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        let shard = place_item(&mut ctx, "item_armor_shard", [0.0, 0.0, 16.0]);

        ctx.edicts[1].health = 0;
        ctx.touch_item(shard, 1);
        ctx.edicts[1].health = 100;
        ctx.level.warmup = true;
        ctx.touch_item(shard, 1);

        assert_eq!(ctx.clients[0].persistent.armor, 0);
        assert_eq!(ctx.edicts[shard].solid, Solid::Trigger);
    }

    #[test]
    fn test_item_fires_targets_once() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        let shard = place_item(&mut ctx, "item_armor_shard", [0.0, 0.0, 16.0]);
        ctx.edicts[shard].message = "Found a secret".into();

        ctx.touch_item(shard, 1);
        assert_ne!(ctx.edicts[shard].spawn_flags & SF_ITEM_TARGETS_USED, 0);

        ctx.show_item(shard);
        ctx.touch_item(shard, 1);
        assert_eq!(ctx.clients[0].persistent.armor, 6);
        // one centerprint for the message
        assert_eq!(world.borrow().unicasts.len(), 1);
    }

    // ============================================================
    // Respawning
    // ============================================================

    #[test]
    fn test_respawned_item_goes_to_player_standing_on_it() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ctx.clients[0].persistent.armor = 0;

        let shard = place_item(&mut ctx, "item_armor_shard", [0.0, 0.0, 16.0]);
        ctx.touch_item(shard, 1);
        assert_eq!(ctx.clients[0].persistent.armor, 3);

        ctx.level.time = ctx.edicts[shard].next_think;
        ctx.call_think(shard);
        assert_eq!(ctx.clients[0].persistent.armor, 6);
        assert_eq!(ctx.edicts[shard].solid, Solid::Not);
    }

    #[test]
    fn test_teamed_items_show_one_member() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);

        let a = ctx.alloc_entity("item_armor_body").unwrap();
        let b = ctx.alloc_entity("item_quad").unwrap();
        for (ent, class_name) in [(a, "item_armor_body"), (b, "item_quad")] {
            ctx.edicts[ent].s.origin = [0.0, 0.0, 16.0];
            ctx.edicts[ent].team = "powerups".into();
            ctx.spawn_item(ent, find_item_by_class_name(class_name).unwrap());
        }
        ctx.find_teams();
        ctx.item_drop_to_floor(a);
        ctx.item_drop_to_floor(b);

        assert_eq!(ctx.edicts[a].think, Some(ThinkFn::ItemRespawn));
        assert_eq!(ctx.edicts[b].solid, Solid::Not);

        ctx.item_respawn(a);
        let shown = [a, b].iter().filter(|&&i| ctx.edicts[i].solid == Solid::Trigger).count();
        assert_eq!(shown, 1);
    }

    // ============================================================
    // Dropping
    // ============================================================

    #[test]
    fn test_dropped_item_ignores_its_owner_until_landed() {
        let (mut ctx, world) = make_ctx(3, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ready_client(&mut ctx, 2, [200.0, 0.0, 24.0]);
        ctx.clients[0].persistent.ammo[AmmoType::Slugs.index()] = 3;
        ctx.clients[0].persistent.weapons |= Weapon::Railgun.bit();
        ctx.clients[0].persistent.weapon = Some(Weapon::Railgun);

        ctx.toss_weapon(1);
        let dropped = (ctx.max_clients + 1..ctx.num_edicts)
            .find(|&i| ctx.edicts[i].class_name == "weapon_railgun")
            .unwrap();
        assert_eq!(ctx.edicts[dropped].count, 3);
        assert_eq!(ctx.edicts[dropped].touch, Some(TouchFn::ItemDropped));

        ctx.call_touch(dropped, 1, None, None);
        assert!(ctx.edicts[dropped].in_use);

        ctx.call_touch(dropped, 2, None, None);
        assert!(!ctx.edicts[dropped].in_use);
        let p = &ctx.clients[1].persistent;
        assert!(p.weapons.contains(Weapon::Railgun.bit()));
        assert_eq!(p.ammo[AmmoType::Slugs.index()], 3);
    }

    #[test]
    fn test_blaster_and_empty_weapons_stay_with_player() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        let before = ctx.num_edicts;

        ctx.toss_weapon(1);
        ctx.clients[0].persistent.weapon = Some(Weapon::Shotgun);
        ctx.toss_weapon(1);
        assert_eq!(ctx.num_edicts, before);
    }

    #[test]
    fn test_landed_item_expires_sooner_in_lava() {
        let (mut ctx, world) = make_ctx(2, 64);
        world.borrow_mut().add_floor(0.0);
        world.borrow_mut().add_brush([-64.0, -64.0, 0.0], [64.0, 64.0, 32.0], CONTENTS_LAVA);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);

        let index = find_item_by_class_name("ammo_shells").unwrap();
        let dropped = ctx.drop_item(1, index).unwrap();
        ctx.edicts[dropped].s.origin = [0.0, 0.0, 16.0];
        ctx.edicts[dropped].ground_entity = Some(ctx.entity_ref(0));
        ctx.item_dropped_think(dropped);

        let e = &ctx.edicts[dropped];
        assert_eq!(e.think, Some(ThinkFn::FreeEntity));
        assert_eq!(e.touch, Some(TouchFn::Item));
        assert_eq!(e.next_think, ctx.level.time + 9000);
    }

    #[test]
    fn test_tossed_quad_keeps_remaining_time() {
        let (mut ctx, world) = make_ctx(3, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ready_client(&mut ctx, 2, [200.0, 0.0, 24.0]);
        let expires = ctx.level.time + 12_000;
        ctx.clients[0].locals.quad_damage_time = expires;
        ctx.edicts[1].s.effects |= EF_QUAD;

        ctx.toss_quad_damage(1);
        assert_eq!(ctx.clients[0].locals.quad_damage_time, 0);
        assert_eq!(ctx.edicts[1].s.effects & EF_QUAD, 0);

        let quad = (ctx.max_clients + 1..ctx.num_edicts)
            .find(|&i| ctx.edicts[i].class_name == "item_quad")
            .unwrap();
        ctx.touch_dropped_item(quad, 2);
        assert_eq!(ctx.clients[1].locals.quad_damage_time, expires);
    }

    // ============================================================
    // Flags
    // ============================================================

    #[test]
    fn test_flag_steal_and_capture() {
        let (mut ctx, world) = make_ctx(3, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ready_client(&mut ctx, 2, [512.0, 0.0, 24.0]);
        enable_ctf(&mut ctx, 1, 2);

        let good = place_item(&mut ctx, "item_flag_team1", [0.0, 0.0, 16.0]);
        let evil = place_item(&mut ctx, "item_flag_team2", [512.0, 0.0, 16.0]);

        // player 1 takes the enemy flag from its base
        ctx.touch_item(evil, 1);
        assert_eq!(ctx.clients[0].locals.flag, Some(TeamId::Evil));
        assert_ne!(ctx.edicts[1].s.effects & EF_CTF_RED, 0);
        assert_ne!(ctx.edicts[evil].sv_flags & SVF_NO_CLIENT, 0);

        // and brings it home
        ctx.touch_item(good, 1);
        assert_eq!(ctx.clients[0].locals.flag, None);
        assert_eq!(ctx.clients[0].persistent.captures, 1);
        assert_eq!(ctx.team(TeamId::Good).captures, 1);
        assert_eq!(ctx.edicts[1].s.effects & EF_CTF_RED, 0);
        assert_eq!(ctx.edicts[evil].sv_flags & SVF_NO_CLIENT, 0);
        assert!(world.borrow().bprints.iter().any(|(_, m)| m.contains("captured the")));
    }

    #[test]
    fn test_dropped_flag_returned_by_owner() {
        let (mut ctx, world) = make_ctx(3, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ready_client(&mut ctx, 2, [512.0, 0.0, 24.0]);
        enable_ctf(&mut ctx, 1, 2);

        let _good = place_item(&mut ctx, "item_flag_team1", [-512.0, 0.0, 16.0]);
        let evil = place_item(&mut ctx, "item_flag_team2", [512.0, 0.0, 16.0]);

        ctx.touch_item(evil, 1);
        ctx.toss_flag(1);
        assert_eq!(ctx.clients[0].locals.flag, None);
        let dropped = (ctx.max_clients + 1..ctx.num_edicts)
            .find(|&i| ctx.edicts[i].in_use && ctx.edicts[i].spawn_flags & SF_ITEM_DROPPED != 0)
            .unwrap();

        ctx.touch_dropped_item(dropped, 2);
        assert!(!ctx.edicts[dropped].in_use);
        assert_eq!(ctx.edicts[evil].sv_flags & SVF_NO_CLIENT, 0);
        assert!(world.borrow().bprints.iter().any(|(_, m)| m.contains("returned the")));
    }

    #[test]
    fn test_idle_dropped_flag_goes_home() {
        let (mut ctx, world) = make_ctx(3, 64);
        world.borrow_mut().add_floor(0.0);
        ready_client(&mut ctx, 1, [0.0, 0.0, 24.0]);
        ready_client(&mut ctx, 2, [512.0, 0.0, 24.0]);
        enable_ctf(&mut ctx, 1, 2);
        let evil = place_item(&mut ctx, "item_flag_team2", [512.0, 0.0, 16.0]);

        ctx.touch_item(evil, 1);
        ctx.toss_flag(1);
        let dropped = (ctx.max_clients + 1..ctx.num_edicts)
            .find(|&i| ctx.edicts[i].in_use && ctx.edicts[i].spawn_flags & SF_ITEM_DROPPED != 0)
            .unwrap();

        ctx.reset_flag(dropped);
        assert!(!ctx.edicts[dropped].in_use);
        assert_eq!(ctx.edicts[evil].sv_flags & SVF_NO_CLIENT, 0);
        assert!(world.borrow().bprints.iter().any(|(_, m)| m.contains("has been returned")));
    }
}
