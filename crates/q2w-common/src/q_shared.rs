// q_shared.rs — foundational types and functions shared by the engine and game module

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

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

pub const PITCH: usize = 0;
pub const YAW: usize = 1;
pub const ROLL: usize = 2;

pub const MAX_TOKEN_CHARS: usize = 256;

/// Longest distance a trace is ever asked to cover.
pub const MAX_WORLD_DIST: f32 = 8192.0;
pub const MAX_STRING_CHARS: usize = 1024;
pub const MAX_QPATH: usize = 64;
pub const MAX_NET_NAME: usize = 16;

// ============================================================
// Limits and config strings
// ============================================================

pub const MAX_CLIENTS: usize = 64;
pub const MAX_EDICTS: usize = 1024;
pub const MAX_MODELS: usize = 256;
pub const MAX_SOUNDS: usize = 256;
pub const MAX_MUSICS: usize = 8;
pub const MAX_IMAGES: usize = 256;
pub const MAX_ITEMS: usize = 64;
pub const MAX_GENERAL: usize = 256;
pub const MAX_STATS: usize = 32;

pub const CS_NAME: usize = 0;
pub const CS_SKY: usize = 2;
pub const CS_WEATHER: usize = 3;
pub const CS_MODELS: usize = 16;
pub const CS_SOUNDS: usize = CS_MODELS + MAX_MODELS;
pub const CS_MUSICS: usize = CS_SOUNDS + MAX_SOUNDS;
pub const CS_IMAGES: usize = CS_MUSICS + MAX_MUSICS;
pub const CS_ITEMS: usize = CS_IMAGES + MAX_IMAGES;
pub const CS_CLIENTS: usize = CS_ITEMS + MAX_ITEMS;
pub const CS_GENERAL: usize = CS_CLIENTS + MAX_CLIENTS;
pub const MAX_CONFIG_STRINGS: usize = CS_GENERAL + MAX_GENERAL;

// ============================================================
// Content flags
// ============================================================

pub const CONTENTS_SOLID: i32 = 1;
pub const CONTENTS_WINDOW: i32 = 2;
pub const CONTENTS_LAVA: i32 = 8;
pub const CONTENTS_SLIME: i32 = 16;
pub const CONTENTS_WATER: i32 = 32;
pub const CONTENTS_MIST: i32 = 64;

pub const CONTENTS_AREA_PORTAL: i32 = 0x8000;
pub const CONTENTS_PLAYER_CLIP: i32 = 0x10000;
pub const CONTENTS_MONSTER_CLIP: i32 = 0x20000;

pub const CONTENTS_CURRENT_0: i32 = 0x40000;
pub const CONTENTS_CURRENT_90: i32 = 0x80000;
pub const CONTENTS_CURRENT_180: i32 = 0x100000;
pub const CONTENTS_CURRENT_270: i32 = 0x200000;
pub const CONTENTS_CURRENT_UP: i32 = 0x400000;
pub const CONTENTS_CURRENT_DOWN: i32 = 0x800000;

pub const CONTENTS_ORIGIN: i32 = 0x1000000;
pub const CONTENTS_MONSTER: i32 = 0x2000000;
pub const CONTENTS_DEAD_MONSTER: i32 = 0x4000000;
pub const CONTENTS_DETAIL: i32 = 0x8000000;
pub const CONTENTS_TRANSLUCENT: i32 = 0x10000000;
pub const CONTENTS_LADDER: i32 = 0x20000000;

// ============================================================
// Surface flags
// ============================================================

pub const SURF_LIGHT: i32 = 0x1;
pub const SURF_SLICK: i32 = 0x2;
pub const SURF_SKY: i32 = 0x4;
pub const SURF_WARP: i32 = 0x8;
pub const SURF_BLEND_33: i32 = 0x10;
pub const SURF_BLEND_66: i32 = 0x20;
pub const SURF_NO_DRAW: i32 = 0x80;
pub const SURF_ALPHA_TEST: i32 = 0x2000000;

// ============================================================
// Content masks
// ============================================================

pub const MASK_ALL: i32 = -1;
pub const MASK_SOLID: i32 = CONTENTS_SOLID | CONTENTS_WINDOW;
pub const MASK_PLAYER_SOLID: i32 =
    CONTENTS_SOLID | CONTENTS_PLAYER_CLIP | CONTENTS_WINDOW | CONTENTS_MONSTER;
pub const MASK_DEAD_SOLID: i32 = CONTENTS_SOLID | CONTENTS_PLAYER_CLIP | CONTENTS_WINDOW;
pub const MASK_WATER: i32 = CONTENTS_WATER | CONTENTS_LAVA | CONTENTS_SLIME;
pub const MASK_OPAQUE: i32 = CONTENTS_SOLID | CONTENTS_SLIME | CONTENTS_LAVA;
pub const MASK_SHOT: i32 =
    CONTENTS_SOLID | CONTENTS_MONSTER | CONTENTS_WINDOW | CONTENTS_DEAD_MONSTER;
pub const MASK_CURRENT: i32 = CONTENTS_CURRENT_0
    | CONTENTS_CURRENT_90
    | CONTENTS_CURRENT_180
    | CONTENTS_CURRENT_270
    | CONTENTS_CURRENT_UP
    | CONTENTS_CURRENT_DOWN;

// ============================================================
// Plane / surface / trace
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CSurface {
    pub name: String,
    pub flags: i32,
    pub value: i32,
}

/// Result of sweeping a box through the world. `ent` is the slot index of
/// whatever was hit; the world itself is slot 0.
#[derive(Debug, Clone)]
pub struct Trace {
    pub all_solid: bool,
    pub start_solid: bool,
    pub fraction: f32,
    pub end: Vec3,
    pub plane: CPlane,
    pub surface: Option<CSurface>,
    pub contents: i32,
    pub ent: Option<usize>,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            all_solid: false,
            start_solid: false,
            fraction: 1.0,
            end: VEC3_ORIGIN,
            plane: CPlane::default(),
            surface: None,
            contents: 0,
            ent: None,
        }
    }
}

impl Trace {
    pub fn surface_flags(&self) -> i32 {
        self.surface.as_ref().map(|s| s.flags).unwrap_or(0)
    }
}

// ============================================================
// Player movement types
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum PmType {
    #[default]
    Normal = 0,
    Spectator = 1,
    Dead = 2,
    Freeze = 3,
}

pub const PMF_DUCKED: u16 = 0x1;
pub const PMF_JUMPED: u16 = 0x2;
pub const PMF_JUMP_HELD: u16 = 0x4;
pub const PMF_ON_GROUND: u16 = 0x8;
pub const PMF_TIME_WATER_JUMP: u16 = 0x10;
pub const PMF_TIME_LAND: u16 = 0x20;
pub const PMF_TIME_TELEPORT: u16 = 0x40;
pub const PMF_NO_PREDICTION: u16 = 0x80;
pub const PMF_PUSHED: u16 = 0x100;
pub const PMF_HOOK: u16 = 0x200;
pub const PMF_TIME_MASK: u16 = PMF_TIME_WATER_JUMP | PMF_TIME_LAND | PMF_TIME_TELEPORT;

/// Communicated between server and client for prediction sync.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PmoveState {
    pub pm_type: PmType,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub pm_flags: u16,
    pub pm_time: u16,
    pub gravity: i16,
    pub view_offset: Vec3,
    pub delta_angles: Vec3,
    /// World anchor of an attached grappling hook, valid while `PMF_HOOK` is set.
    pub hook_position: Vec3,
}

pub const BUTTON_ATTACK: u8 = 1;
pub const BUTTON_WALK: u8 = 2;
pub const BUTTON_HOOK: u8 = 4;
pub const BUTTON_SCORE: u8 = 8;
pub const BUTTON_ANY: u8 = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserCmd {
    pub msec: u8,
    pub buttons: u8,
    pub angles: Vec3,
    pub forward: i16,
    pub right: i16,
    pub up: i16,
}

pub const MAX_TOUCH_ENTS: usize = 32;

/// In/out parameters of the engine's player movement routine.
#[derive(Debug, Clone, Default)]
pub struct PmoveData {
    pub s: PmoveState,
    pub cmd: UserCmd,
    pub touch_ents: Vec<usize>,
    pub angles: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub ground_entity: Option<usize>,
    pub water_type: i32,
    pub water_level: i32,
    /// Slot to skip while tracing: the moving player.
    pub pass_ent: usize,
}

// ============================================================
// Entity and player state
// ============================================================

pub const EF_ROTATE: u16 = 0x1;
pub const EF_BOB: u16 = 0x2;
pub const EF_PULSE: u16 = 0x4;
pub const EF_INACTIVE: u16 = 0x8;
pub const EF_RESPAWN: u16 = 0x10;
pub const EF_QUAD: u16 = 0x20;
pub const EF_CTF_BLUE: u16 = 0x40;
pub const EF_CTF_RED: u16 = 0x80;
pub const EF_BEAM: u16 = 0x100;
pub const EF_CORPSE: u16 = 0x200;
pub const EF_DESPAWN: u16 = 0x400;
pub const EF_TELEPORTER: u16 = 0x800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EntityEvent {
    #[default]
    None = 0,
    ItemRespawn = 1,
    ItemPickup = 2,
    ClientFootstep = 3,
    ClientFall = 4,
    ClientFallFar = 5,
    ClientJump = 6,
    ClientLand = 7,
    ClientTeleport = 8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityState {
    pub number: u16,
    pub origin: Vec3,
    /// Previous origin, or the far end point for beams.
    pub old_origin: Vec3,
    pub angles: Vec3,
    pub animation1: u8,
    pub animation2: u8,
    pub event: EntityEvent,
    pub effects: u16,
    pub trail: u8,
    pub model1: u16,
    pub model2: u16,
    pub model3: u16,
    pub model4: u16,
    /// Player number, or a color overloaded onto projectiles.
    pub client: u8,
    pub sound: u16,
    pub solid: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub pmove: PmoveState,
    pub stats: [i16; MAX_STATS],
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            pmove: PmoveState::default(),
            stats: [0; MAX_STATS],
        }
    }
}

// ============================================================
// MATHLIB
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

/// veca + scale * vecb
#[inline]
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

#[inline]
pub fn vector_negate(v: &Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

#[inline]
pub fn vector_length(v: &Vec3) -> f32 {
    dot_product(v, v).sqrt()
}

#[inline]
pub fn vector_distance(a: &Vec3, b: &Vec3) -> f32 {
    vector_length(&vector_subtract(a, b))
}

#[inline]
pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

#[inline]
pub fn vector_is_zero(v: &Vec3) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

/// Normalizes in place, returning the original length.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = vector_length(v);
    if length != 0.0 {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    }
    length
}

pub fn vector_normalized(v: &Vec3) -> Vec3 {
    let mut out = *v;
    vector_normalize(&mut out);
    out
}

pub fn vector_mix(a: &Vec3, b: &Vec3, frac: f32) -> Vec3 {
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}

pub fn cross_product(v1: &Vec3, v2: &Vec3) -> Vec3 {
    [
        v1[1] * v2[2] - v1[2] * v2[1],
        v1[2] * v2[0] - v1[0] * v2[2],
        v1[0] * v2[1] - v1[1] * v2[0],
    ]
}

pub fn add_point_to_bounds(v: &Vec3, mins: &mut Vec3, maxs: &mut Vec3) {
    for i in 0..3 {
        if v[i] < mins[i] {
            mins[i] = v[i];
        }
        if v[i] > maxs[i] {
            maxs[i] = v[i];
        }
    }
}

/// True when the two boxes overlap with positive volume.
pub fn bounds_intersect(amins: &Vec3, amaxs: &Vec3, bmins: &Vec3, bmaxs: &Vec3) -> bool {
    (0..3).all(|i| amins[i] < bmaxs[i] && amaxs[i] > bmins[i])
}

// ============================================================
// Angle functions
// ============================================================

pub fn angle_vectors(
    angles: &Vec3,
    forward: Option<&mut Vec3>,
    right: Option<&mut Vec3>,
    up: Option<&mut Vec3>,
) {
    let (sy, cy) = angles[YAW].to_radians().sin_cos();
    let (sp, cp) = angles[PITCH].to_radians().sin_cos();
    let (sr, cr) = angles[ROLL].to_radians().sin_cos();

    if let Some(fwd) = forward {
        fwd[0] = cp * cy;
        fwd[1] = cp * sy;
        fwd[2] = -sp;
    }
    if let Some(r) = right {
        r[0] = -sr * sp * cy + cr * sy;
        r[1] = -sr * sp * sy - cr * cy;
        r[2] = -sr * cp;
    }
    if let Some(u) = up {
        u[0] = cr * sp * cy + sr * sy;
        u[1] = cr * sp * sy - sr * cy;
        u[2] = cr * cp;
    }
}

/// Returns (forward, right, up).
pub fn angle_vectors_tuple(angles: &Vec3) -> (Vec3, Vec3, Vec3) {
    let mut forward = [0.0f32; 3];
    let mut right = [0.0f32; 3];
    let mut up = [0.0f32; 3];
    angle_vectors(angles, Some(&mut forward), Some(&mut right), Some(&mut up));
    (forward, right, up)
}

/// Direction vector to Euler angles without truncation.
pub fn vectoangles_exact(value: &Vec3) -> Vec3 {
    let (yaw, pitch) = if value[1] == 0.0 && value[0] == 0.0 {
        (0.0, if value[2] > 0.0 { 90.0 } else { 270.0 })
    } else {
        let mut yaw = value[1].atan2(value[0]).to_degrees();
        if yaw < 0.0 {
            yaw += 360.0;
        }
        let forward = (value[0] * value[0] + value[1] * value[1]).sqrt();
        let mut pitch = value[2].atan2(forward).to_degrees();
        if pitch < 0.0 {
            pitch += 360.0;
        }
        (yaw, pitch)
    };

    [-pitch, yaw, 0.0]
}

// ============================================================
// String helpers
// ============================================================

pub fn q_streq_nocase(s1: &str, s2: &str) -> bool {
    s1.eq_ignore_ascii_case(s2)
}

/// Parse one whitespace-delimited token from `data`, handling // comments
/// and "quoted strings". Returns `(token, remaining)`; `remaining` is `None`
/// once the input is exhausted.
pub fn com_parse(data: &str) -> (String, Option<&str>) {
    let bytes = data.as_bytes();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos] <= b' ' {
            pos += 1;
        }
        if pos >= bytes.len() {
            return (String::new(), None);
        }
        if bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        break;
    }

    let mut token = String::new();

    if bytes[pos] == b'"' {
        pos += 1;
        let start = pos;
        while pos < bytes.len() && bytes[pos] != b'"' {
            pos += 1;
        }
        token.push_str(&data[start..pos]);
        if pos < bytes.len() {
            pos += 1;
        }
    } else {
        let start = pos;
        while pos < bytes.len() && bytes[pos] > b' ' {
            pos += 1;
        }
        token.push_str(&data[start..pos]);
    }

    if token.len() >= MAX_TOKEN_CHARS {
        let mut end = MAX_TOKEN_CHARS - 1;
        while !token.is_char_boundary(end) {
            end -= 1;
        }
        token.truncate(end);
    }

    let rest = &data[pos..];
    (token, if rest.is_empty() { None } else { Some(rest) })
}

/// Search info string `s` for `key`, returning the value or an empty string.
pub fn info_value_for_key(s: &str, key: &str) -> String {
    let s = s.strip_prefix('\\').unwrap_or(s);
    let mut parts = s.split('\\');
    while let Some(k) = parts.next() {
        let v = parts.next().unwrap_or("");
        if k == key {
            return v.to_string();
        }
    }
    String::new()
}

pub fn info_remove_key(s: &mut String, key: &str) {
    if key.contains('\\') {
        return;
    }
    let body = s.strip_prefix('\\').unwrap_or(s).to_string();
    let mut out = String::new();
    let mut parts = body.split('\\');
    while let Some(k) = parts.next() {
        let v = parts.next().unwrap_or("");
        if k.is_empty() || k == key {
            continue;
        }
        out.push('\\');
        out.push_str(k);
        out.push('\\');
        out.push_str(v);
    }
    *s = out;
}

pub fn info_set_value_for_key(s: &mut String, key: &str, value: &str) {
    info_remove_key(s, key);
    if value.is_empty() {
        return;
    }
    s.push('\\');
    s.push_str(key);
    s.push('\\');
    s.push_str(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot_product(&a, &b), 32.0);
    }

    #[test]
    fn test_vector_normalize() {
        let mut v = [3.0, 0.0, 4.0];
        let len = vector_normalize(&mut v);
        assert!((len - 5.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        let mut v = [0.0; 3];
        assert_eq!(vector_normalize(&mut v), 0.0);
        assert_eq!(v, [0.0; 3]);
    }

    #[test]
    fn test_cross_product() {
        let c = cross_product(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert_eq!(c, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_angle_vectors_yaw_90() {
        let (f, r, u) = angle_vectors_tuple(&[0.0, 90.0, 0.0]);
        assert!(f[0].abs() < 1e-6 && (f[1] - 1.0).abs() < 1e-6);
        assert!((r[0] - 1.0).abs() < 1e-6);
        assert!((u[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vectoangles_round_trip() {
        let dir = vector_normalized(&[1.0, 1.0, 1.0]);
        let angles = vectoangles_exact(&dir);
        let (f, _, _) = angle_vectors_tuple(&angles);
        assert!(dot_product(&f, &dir) > 0.9999);
    }

    #[test]
    fn test_bounds_intersect() {
        assert!(bounds_intersect(&[0.0; 3], &[10.0; 3], &[5.0; 3], &[15.0; 3]));
        assert!(!bounds_intersect(&[0.0; 3], &[10.0; 3], &[10.0, 0.0, 0.0], &[15.0; 3]));
    }

    #[test]
    fn test_com_parse_tokens_and_comments() {
        let (t, rest) = com_parse("  // comment\n { \"class name\" value }");
        assert_eq!(t, "{");
        let (t, rest) = com_parse(rest.unwrap());
        assert_eq!(t, "class name");
        let (t, rest) = com_parse(rest.unwrap());
        assert_eq!(t, "value");
        let (t, rest) = com_parse(rest.unwrap());
        assert_eq!(t, "}");
        assert!(rest.is_none() || com_parse(rest.unwrap()).1.is_none());
    }

    #[test]
    fn test_com_parse_empty_quoted_string() {
        let (t, rest) = com_parse("\"\" next");
        assert_eq!(t, "");
        assert_eq!(com_parse(rest.unwrap()).0, "next");
    }

    #[test]
    fn test_com_parse_truncates_on_char_boundary() {
        let long = format!("{}\u{e9}\u{e9} tail", "a".repeat(MAX_TOKEN_CHARS - 2));
        let (t, rest) = com_parse(&long);
        assert!(t.len() < MAX_TOKEN_CHARS);
        assert!(t.starts_with("aaa"));
        assert_eq!(com_parse(rest.unwrap()).0, "tail");
    }

    #[test]
    fn test_info_strings() {
        let mut info = String::from("\\name\\Player\\skin\\qforcer/blue");
        assert_eq!(info_value_for_key(&info, "name"), "Player");
        assert_eq!(info_value_for_key(&info, "skin"), "qforcer/blue");
        assert_eq!(info_value_for_key(&info, "color"), "");

        info_set_value_for_key(&mut info, "name", "Other");
        assert_eq!(info_value_for_key(&info, "name"), "Other");
        assert_eq!(info_value_for_key(&info, "skin"), "qforcer/blue");
    }
}
