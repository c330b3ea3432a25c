// p_weapon.rs — player weapon inventory, switching and firing

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

use crate::g_events::MuzzleFlash;
use crate::g_local::*;
use crate::game_import::{Attenuation, PrintLevel};

/// Minimum delay between switching weapons and firing the new one.
const WEAPON_CHANGE_DELAY: u32 = 400;
const NO_AMMO_CLICK_DELAY: u32 = 1000;
const QUAD_ATTACK_SOUND_DELAY: u32 = 500;

/// Static description of a player weapon.
#[derive(Debug, Clone, Copy)]
pub struct WeaponInfo {
    pub name: &'static str,
    pub model: &'static str,
    pub ammo: Option<AmmoType>,
    /// Ammo consumed per shot.
    pub quantity: i16,
    /// Refire interval in milliseconds.
    pub interval: u32,
    pub flash: MuzzleFlash,
}

const WEAPONS: [WeaponInfo; NUM_WEAPONS] = [
    WeaponInfo {
        name: "Blaster",
        model: "models/weapons/blaster/tris",
        ammo: None,
        quantity: 0,
        interval: 500,
        flash: MuzzleFlash::Blaster,
    },
    WeaponInfo {
        name: "Shotgun",
        model: "models/weapons/shotgun/tris",
        ammo: Some(AmmoType::Shells),
        quantity: 1,
        interval: 750,
        flash: MuzzleFlash::Shotgun,
    },
    WeaponInfo {
        name: "Super Shotgun",
        model: "models/weapons/supershotgun/tris",
        ammo: Some(AmmoType::Shells),
        quantity: 2,
        interval: 1000,
        flash: MuzzleFlash::SuperShotgun,
    },
    WeaponInfo {
        name: "Machinegun",
        model: "models/weapons/machinegun/tris",
        ammo: Some(AmmoType::Bullets),
        quantity: 1,
        interval: 50,
        flash: MuzzleFlash::Machinegun,
    },
    WeaponInfo {
        name: "Grenade Launcher",
        model: "models/weapons/grenadelauncher/tris",
        ammo: Some(AmmoType::Grenades),
        quantity: 1,
        interval: 1000,
        flash: MuzzleFlash::Grenade,
    },
    WeaponInfo {
        name: "Rocket Launcher",
        model: "models/weapons/rocketlauncher/tris",
        ammo: Some(AmmoType::Rockets),
        quantity: 1,
        interval: 1000,
        flash: MuzzleFlash::Rocket,
    },
    WeaponInfo {
        name: "Hyperblaster",
        model: "models/weapons/hyperblaster/tris",
        ammo: Some(AmmoType::Cells),
        quantity: 1,
        interval: 100,
        flash: MuzzleFlash::Hyperblaster,
    },
    WeaponInfo {
        name: "Lightning",
        model: "models/weapons/lightning/tris",
        ammo: Some(AmmoType::Bolts),
        quantity: 1,
        interval: 100,
        flash: MuzzleFlash::Lightning,
    },
    WeaponInfo {
        name: "Railgun",
        model: "models/weapons/railgun/tris",
        ammo: Some(AmmoType::Slugs),
        quantity: 1,
        interval: 1800,
        flash: MuzzleFlash::Railgun,
    },
    WeaponInfo {
        name: "BFG10K",
        model: "models/weapons/bfg/tris",
        ammo: Some(AmmoType::Nukes),
        quantity: 1,
        interval: 2000,
        flash: MuzzleFlash::Bfg,
    },
];

impl Weapon {
    pub fn info(self) -> &'static WeaponInfo {
        &WEAPONS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Case-insensitive lookup by pickup name. Spaces are optional, so
    /// `rocketlauncher` and `Rocket Launcher` both match.
    pub fn from_name(name: &str) -> Option<Weapon> {
        let squash = |s: &str| -> String { s.chars().filter(|c| !c.is_whitespace()).collect() };
        let wanted = squash(name);
        Weapon::ALL
            .into_iter()
            .find(|w| squash(w.name()).eq_ignore_ascii_case(&wanted))
    }
}

impl AmmoType {
    pub fn from_name(name: &str) -> Option<AmmoType> {
        let name = name.trim();
        AmmoType::ALL.into_iter().find(|a| a.name().eq_ignore_ascii_case(name))
    }

    /// Amount granted by a pickup or a weapon given without a quantity.
    pub fn pickup_quantity(self) -> i16 {
        match self {
            AmmoType::Shells => 10,
            AmmoType::Bullets => 50,
            AmmoType::Grenades => 10,
            AmmoType::Rockets => 10,
            AmmoType::Cells => 50,
            AmmoType::Bolts => 25,
            AmmoType::Slugs => 10,
            AmmoType::Nukes => 2,
        }
    }
}

/// Preference order for automatic weapon selection, best first. The super
/// shotgun needs two shells.
const BEST_WEAPON_ORDER: [Weapon; NUM_WEAPONS] = [
    Weapon::Bfg10k,
    Weapon::Railgun,
    Weapon::Lightning,
    Weapon::Hyperblaster,
    Weapon::RocketLauncher,
    Weapon::GrenadeLauncher,
    Weapon::Machinegun,
    Weapon::SuperShotgun,
    Weapon::Shotgun,
    Weapon::Blaster,
];

impl GameCtx {
    // ============================================================
    // Inventory
    // ============================================================

    /// Add a weapon and its ammo. A negative `quantity` gives the default
    /// pickup amount of the weapon's ammo.
    pub fn give_weapon(&mut self, ent: usize, weapon: Weapon, quantity: i32) {
        let Some(client) = self.client_mut(ent) else {
            return;
        };
        let p = &mut client.persistent;
        p.weapons |= weapon.bit();

        if let Some(ammo) = weapon.info().ammo {
            let i = ammo.index();
            let q = if quantity < 0 { ammo.pickup_quantity() as i32 } else { quantity };
            p.ammo[i] = (p.ammo[i] as i32 + q).clamp(0, p.max_ammo[i] as i32) as i16;
        }
    }

    /// True if the client owns the weapon and has enough ammo for one shot.
    pub fn has_weapon_ready(&self, ent: usize, weapon: Weapon) -> bool {
        let Some(client) = self.client(ent) else {
            return false;
        };
        let p = &client.persistent;
        if !p.weapons.contains(weapon.bit()) {
            return false;
        }
        let info = weapon.info();
        match info.ammo {
            Some(ammo) => p.ammo[ammo.index()] >= info.quantity,
            None => true,
        }
    }

    pub fn best_weapon(&self, ent: usize) -> Option<Weapon> {
        BEST_WEAPON_ORDER.into_iter().find(|&w| self.has_weapon_ready(ent, w))
    }

    /// Make `weapon` current at once. The previous weapon is remembered and
    /// firing is held off briefly.
    pub fn change_weapon(&mut self, ent: usize, weapon: Option<Weapon>) {
        let time = self.level.time;
        let Some(client) = self.client_mut(ent) else {
            return;
        };

        client.persistent.last_weapon = client.persistent.weapon;
        client.persistent.weapon = weapon;
        client.locals.weapon_change_time = time;
        if client.locals.weapon_fire_time < time + WEAPON_CHANGE_DELAY {
            client.locals.weapon_fire_time = time + WEAPON_CHANGE_DELAY;
        }

        let model = match weapon {
            Some(w) => self.gi.model_index(w.info().model),
            None => 0,
        };
        self.edicts[ent].s.model2 = model;

        if self.edicts[ent].health < 1 {
            return;
        }

        let sound = self.gi.sound_index("weapons/common/switch");
        self.gi.sound(ent, sound, Attenuation::Norm);
    }

    /// Switch on request, refusing weapons the client cannot fire.
    pub fn use_weapon(&mut self, ent: usize, weapon: Weapon) {
        let Some(client) = self.client(ent) else {
            return;
        };
        if client.persistent.weapon == Some(weapon) {
            return;
        }
        if !client.persistent.weapons.contains(weapon.bit()) {
            self.gi.cprint(ent, PrintLevel::High, &format!("You don't have the {}\n", weapon.name()));
            return;
        }
        if !self.has_weapon_ready(ent, weapon) {
            self.gi.cprint(ent, PrintLevel::High, &format!("Not enough ammo for {}\n", weapon.name()));
            return;
        }
        self.change_weapon(ent, Some(weapon));
    }

    /// Cycle to the next (or previous) weapon that can fire.
    pub fn cycle_weapon(&mut self, ent: usize, forward: bool) {
        let Some(client) = self.client(ent) else {
            return;
        };
        let current = client.persistent.weapon.map(|w| w as usize).unwrap_or(0);

        for step in 1..=NUM_WEAPONS {
            let i = if forward {
                (current + step) % NUM_WEAPONS
            } else {
                (current + NUM_WEAPONS - step) % NUM_WEAPONS
            };
            let w = Weapon::ALL[i];
            if self.has_weapon_ready(ent, w) {
                if Some(w) != self.client(ent).and_then(|c| c.persistent.weapon) {
                    self.change_weapon(ent, Some(w));
                }
                return;
            }
        }
    }

    // ============================================================
    // Firing
    // ============================================================

    /// Muzzle origin and aim for a client's shot. The aim is corrected so
    /// the shot converges on whatever the view is centered on.
    pub fn init_projectile(&mut self, ent: usize) -> (Vec3, Vec3, Vec3, Vec3) {
        let Some(client) = self.client(ent) else {
            let (f, r, u) = angle_vectors_tuple(&self.edicts[ent].s.angles);
            return (f, r, u, self.edicts[ent].s.origin);
        };

        let (mut forward, mut right, mut up) = angle_vectors_tuple(&client.locals.angles);
        let ducked = client.ps.pmove.pm_flags & PMF_DUCKED != 0;
        let view_offset = client.ps.pmove.view_offset;
        let origin = self.edicts[ent].s.origin;

        let up_offset = if ducked { 0.0 } else { 14.0 };
        let up_scale = (30.0 - self.edicts[ent].s.angles[PITCH].abs()) / 30.0;

        let mut org = vector_ma(&origin, up_offset * up_scale, &up);
        org = vector_ma(&org, 8.0, &right);
        org = vector_ma(&org, 28.0, &forward);

        if self.gi.point_contents(&org) & MASK_PLAYER_SOLID == 0 {
            let view = vector_add(&origin, &view_offset);
            let end = vector_ma(&view, MAX_WORLD_DIST, &forward);
            let tr = self.gi.trace(&view, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, Some(ent), MASK_SHOT);

            let mut dir = vector_subtract(&tr.end, &org);
            if vector_normalize(&mut dir) > 0.0 {
                forward = dir;
                let (_, r, u) = angle_vectors_tuple(&vectoangles_exact(&forward));
                right = r;
                up = u;
            }
        }

        let locals = &mut self.clients[ent - 1].locals;
        locals.forward = forward;
        locals.right = right;
        locals.up = up;

        (forward, right, up, org)
    }

    /// Fire the current weapon if the attack button is down and the weapon
    /// has recovered from its last shot.
    pub fn weapon_think(&mut self, ent: usize) {
        if self.edicts[ent].health < 1 || self.edicts[ent].dead {
            return;
        }
        let time = self.level.time;
        let Some(client) = self.client_mut(ent) else {
            return;
        };
        if client.persistent.spectator {
            return;
        }
        let Some(weapon) = client.persistent.weapon else {
            return;
        };

        let buttons = client.locals.latched_buttons | client.locals.buttons;
        if buttons & BUTTON_ATTACK == 0 {
            return;
        }
        client.locals.latched_buttons &= !BUTTON_ATTACK;

        // small epsilon for low frame rates
        if client.locals.weapon_fire_time > time + 1 {
            return;
        }

        let info = weapon.info();
        client.locals.weapon_fire_time = time + info.interval;

        if let Some(ammo) = info.ammo {
            if client.persistent.ammo[ammo.index()] < info.quantity {
                if time >= client.locals.pain_time {
                    client.locals.pain_time = time + NO_AMMO_CLICK_DELAY;
                    let sound = self.gi.sound_index("weapons/common/no_ammo");
                    self.gi.sound(ent, sound, Attenuation::Norm);
                }
                if let Some(best) = self.best_weapon(ent).filter(|&w| w != weapon) {
                    self.change_weapon(ent, Some(best));
                }
                return;
            }
        }

        let client = &mut self.clients[ent - 1];
        if client.locals.quad_damage_time > time && client.locals.quad_attack_time < time {
            client.locals.quad_attack_time = time + QUAD_ATTACK_SOUND_DELAY;
            let sound = self.gi.sound_index("quad/attack");
            self.gi.sound(ent, sound, Attenuation::Norm);
        }

        self.fire_weapon(ent, weapon);

        if let (Some(ammo), Some(client)) = (info.ammo, self.client_mut(ent)) {
            client.persistent.ammo[ammo.index()] -= info.quantity;
        }
    }

    fn fire_weapon(&mut self, ent: usize, weapon: Weapon) {
        debug!("{} fires {}", self.etos(ent), weapon.name());

        let color = self.client(ent).map(|c| c.persistent.color as u8);
        let mut flash = true;

        match weapon {
            Weapon::Blaster => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.blaster_projectile(ent, &org, &forward, 1000, 15, 2);
            }
            Weapon::Shotgun => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.shotgun_projectiles(ent, &org, &forward, 6, 4, 750, 350, 12, MOD_SHOTGUN);
            }
            Weapon::SuperShotgun => {
                // two volleys, either side of the aim
                self.clients[ent - 1].locals.angles[YAW] -= 5.0;
                let (forward, _, _, org) = self.init_projectile(ent);
                self.shotgun_projectiles(ent, &org, &forward, 6, 4, 1000, 500, 12, MOD_SUPER_SHOTGUN);

                self.clients[ent - 1].locals.angles[YAW] += 10.0;
                let (forward, _, _, org) = self.init_projectile(ent);
                self.shotgun_projectiles(ent, &org, &forward, 4, 4, 1000, 500, 12, MOD_SUPER_SHOTGUN);

                self.clients[ent - 1].locals.angles[YAW] -= 5.0;
            }
            Weapon::Machinegun => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.bullet_projectile(ent, &org, &forward, 4, 4, 100, 200, MOD_MACHINEGUN);
            }
            Weapon::GrenadeLauncher => {
                let damage = (120.0 + self.crand() * 30.0) as i32;
                let knockback = (120.0 + self.frand() * 20.0) as i32;
                let (forward, _, _, org) = self.init_projectile(ent);
                self.grenade_projectile(ent, &org, &forward, 700.0, damage, knockback, 185.0, 2000);
            }
            Weapon::RocketLauncher => {
                let damage = (110.0 + self.frand() * 20.0) as i32;
                let knockback = (110.0 + self.frand() * 20.0) as i32;
                let (forward, _, _, org) = self.init_projectile(ent);
                self.rocket_projectile(ent, &org, &forward, 900.0, damage, knockback, 150.0);
            }
            Weapon::Hyperblaster => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.hyperblaster_projectile(ent, &org, &forward, 1400.0, 16, 6);
            }
            Weapon::Lightning => {
                // the beam flashes once when it appears
                flash = self.resolve(self.edicts[ent].lightning).is_none();
                let (forward, _, _, org) = self.init_projectile(ent);
                self.lightning_projectile(ent, &org, &forward, 12, 12);
            }
            Weapon::Railgun => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.railgun_projectile(ent, &org, &forward, 120, 80);
            }
            Weapon::Bfg10k => {
                let (forward, _, _, org) = self.init_projectile(ent);
                self.bfg_projectile(ent, &org, &forward, 600.0, 100, 100, 256.0);
            }
        }

        if flash {
            let info = weapon.info();
            let color = match info.flash {
                MuzzleFlash::Blaster | MuzzleFlash::Hyperblaster => color,
                _ => None,
            };
            self.muzzle_flash(ent, info.flash, color);
        }
    }
}
