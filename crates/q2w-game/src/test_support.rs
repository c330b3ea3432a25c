// test_support.rs — mock engine used by the unit tests
//
// The collision world is a set of axis-aligned boxes: world brushes plus
// whatever the game links. Traces are swept AABB slab tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use q2w_common::cvar::CvarRegistry;
use q2w_common::q_shared::*;

use crate::g_local::{GameCtx, Solid};
use crate::game_import::{Attenuation, GameImport, LinkState, ModelInfo, Multicast, PrintLevel};

const DIST_EPSILON: f32 = 0.03125;

#[derive(Debug, Clone)]
pub struct Brush {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: i32,
    pub surface_flags: i32,
}

/// Everything the game told the engine, plus the world it traces against.
#[derive(Debug, Default)]
pub struct MockWorld {
    pub brushes: Vec<Brush>,
    pub linked: BTreeMap<usize, LinkState>,
    pub models: HashMap<String, ModelInfo>,
    pub files: HashMap<String, String>,

    pub prints: Vec<String>,
    pub bprints: Vec<(PrintLevel, String)>,
    pub cprints: Vec<(usize, PrintLevel, String)>,
    pub errors: Vec<String>,
    pub config_strings: BTreeMap<usize, String>,
    pub sounds: Vec<(usize, u16)>,
    pub positioned_sounds: Vec<(Vec3, u16)>,
    pub multicasts: Vec<(Vec3, Multicast, Vec<u8>)>,
    pub unicasts: Vec<(usize, bool, Vec<u8>)>,
    pub commands: Vec<String>,
    pub area_portals: Vec<(i32, bool)>,
    pub pmove_calls: usize,

    assets: Vec<String>,
}

impl MockWorld {
    pub fn add_brush(&mut self, mins: Vec3, maxs: Vec3, contents: i32) {
        self.brushes.push(Brush { mins, maxs, contents, surface_flags: 0 });
    }

    /// A large solid floor whose top face is at `z`.
    pub fn add_floor(&mut self, z: f32) {
        self.add_brush([-4096.0, -4096.0, z - 64.0], [4096.0, 4096.0, z], CONTENTS_SOLID);
    }

    /// Temp entity type codes of every multicast, in order.
    pub fn temp_event_types(&self) -> Vec<u8> {
        self.multicasts
            .iter()
            .filter(|(_, _, d)| d.first() == Some(&crate::g_events::SV_CMD_TEMP_ENTITY))
            .filter_map(|(_, _, d)| d.get(1).copied())
            .collect()
    }

    fn asset_index(&mut self, name: &str) -> u16 {
        if name.is_empty() {
            return 0;
        }
        if let Some(i) = self.assets.iter().position(|a| a == name) {
            return i as u16 + 1;
        }
        self.assets.push(name.to_string());
        self.assets.len() as u16
    }

    fn contents_of(link: &LinkState) -> i32 {
        match link.solid {
            Solid::Bsp => CONTENTS_SOLID,
            Solid::Box => CONTENTS_MONSTER,
            Solid::Dead => CONTENTS_DEAD_MONSTER,
            Solid::Not | Solid::Trigger | Solid::Missile => 0,
        }
    }

    pub fn trace(
        &self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        pass_ent: Option<usize>,
        mask: i32,
    ) -> Trace {
        let mut best = Trace {
            end: *end,
            ..Default::default()
        };

        let pass_owner = pass_ent.and_then(|p| self.linked.get(&p)).and_then(|l| l.owner);

        let mut test = |bmins: &Vec3, bmaxs: &Vec3, contents: i32, surf: Option<CSurface>, ent: usize| {
            if contents & mask == 0 {
                return;
            }
            // Minkowski expand the obstacle by the moving box
            let emins = vector_subtract(bmins, maxs);
            let emaxs = vector_subtract(bmaxs, mins);

            let inside = (0..3).all(|i| start[i] > emins[i] && start[i] < emaxs[i]);
            if inside {
                if !best.start_solid {
                    best.start_solid = true;
                    best.all_solid = (0..3).all(|i| end[i] > emins[i] && end[i] < emaxs[i]);
                    best.fraction = 0.0;
                    best.end = *start;
                    best.contents = contents;
                    best.surface = surf;
                    best.ent = Some(ent);
                }
                return;
            }

            let delta = vector_subtract(end, start);
            let mut enter = f32::NEG_INFINITY;
            let mut exit = f32::INFINITY;
            let mut normal = VEC3_ORIGIN;
            for i in 0..3 {
                if delta[i] == 0.0 {
                    if start[i] <= emins[i] || start[i] >= emaxs[i] {
                        return;
                    }
                    continue;
                }
                let t0 = (emins[i] - start[i]) / delta[i];
                let t1 = (emaxs[i] - start[i]) / delta[i];
                let (near, far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
                if near > enter {
                    enter = near;
                    normal = VEC3_ORIGIN;
                    normal[i] = if delta[i] > 0.0 { -1.0 } else { 1.0 };
                }
                exit = exit.min(far);
            }
            if enter < 0.0 || enter > 1.0 || enter >= exit {
                return;
            }
            let len = vector_length(&delta);
            let fraction = ((enter * len - DIST_EPSILON) / len).max(0.0);
            if fraction < best.fraction && !best.start_solid {
                best.fraction = fraction;
                best.end = vector_ma(start, fraction, &delta);
                best.plane = CPlane {
                    normal,
                    dist: dot_product(&normal, &best.end),
                };
                best.contents = contents;
                best.surface = surf;
                best.ent = Some(ent);
            }
        };

        for brush in &self.brushes {
            let surf = CSurface {
                name: "brush".into(),
                flags: brush.surface_flags,
                value: 0,
            };
            test(&brush.mins, &brush.maxs, brush.contents, Some(surf), 0);
        }

        for (&num, link) in &self.linked {
            if Some(num) == pass_ent {
                continue;
            }
            if pass_ent.is_some() && link.owner == pass_ent {
                continue;
            }
            if pass_owner == Some(num) {
                continue;
            }
            let contents = Self::contents_of(link);
            if contents == 0 {
                continue;
            }
            let bmins = vector_add(&link.origin, &link.mins);
            let bmaxs = vector_add(&link.origin, &link.maxs);
            let surf = (link.solid == Solid::Bsp).then(CSurface::default);
            test(&bmins, &bmaxs, contents, surf, num);
        }

        best
    }

    pub fn point_contents(&self, p: &Vec3) -> i32 {
        self.brushes
            .iter()
            .filter(|b| (0..3).all(|i| p[i] >= b.mins[i] && p[i] <= b.maxs[i]))
            .fold(0, |c, b| c | b.contents)
    }
}

/// `GameImport` over a shared `MockWorld`, so tests can inspect what the game
/// did after handing the engine to the context.
pub struct MockEngine {
    pub cvars: CvarRegistry,
    pub world: Rc<RefCell<MockWorld>>,
    pub frame_rate: u32,
}

impl GameImport for MockEngine {
    fn print(&mut self, msg: &str) {
        self.world.borrow_mut().prints.push(msg.to_string());
    }

    fn bprint(&mut self, level: PrintLevel, msg: &str) {
        self.world.borrow_mut().bprints.push((level, msg.to_string()));
    }

    fn cprint(&mut self, ent: usize, level: PrintLevel, msg: &str) {
        self.world.borrow_mut().cprints.push((ent, level, msg.to_string()));
    }

    fn error(&mut self, msg: &str) {
        self.world.borrow_mut().errors.push(msg.to_string());
    }

    fn cvars(&mut self) -> &mut CvarRegistry {
        &mut self.cvars
    }

    fn set_config_string(&mut self, index: usize, value: &str) {
        self.world.borrow_mut().config_strings.insert(index, value.to_string());
    }

    fn model_index(&mut self, name: &str) -> u16 {
        self.world.borrow_mut().asset_index(name)
    }

    fn sound_index(&mut self, name: &str) -> u16 {
        self.world.borrow_mut().asset_index(name)
    }

    fn image_index(&mut self, name: &str) -> u16 {
        self.world.borrow_mut().asset_index(name)
    }

    fn set_model(&mut self, name: &str) -> ModelInfo {
        let mut world = self.world.borrow_mut();
        if let Some(info) = world.models.get(name) {
            return *info;
        }
        let index = world.asset_index(name);
        ModelInfo { index, ..Default::default() }
    }

    fn sound(&mut self, ent: usize, sound: u16, _atten: Attenuation) {
        self.world.borrow_mut().sounds.push((ent, sound));
    }

    fn positioned_sound(&mut self, origin: &Vec3, _ent: Option<usize>, sound: u16, _atten: Attenuation) {
        self.world.borrow_mut().positioned_sounds.push((*origin, sound));
    }

    fn trace(
        &mut self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        pass_ent: Option<usize>,
        mask: i32,
    ) -> Trace {
        self.world.borrow().trace(start, mins, maxs, end, pass_ent, mask)
    }

    fn point_contents(&mut self, point: &Vec3) -> i32 {
        self.world.borrow().point_contents(point)
    }

    fn in_pvs(&mut self, _p1: &Vec3, _p2: &Vec3) -> bool {
        true
    }

    fn in_phs(&mut self, _p1: &Vec3, _p2: &Vec3) -> bool {
        true
    }

    fn set_area_portal_state(&mut self, portal: i32, open: bool) {
        self.world.borrow_mut().area_portals.push((portal, open));
    }

    fn link_entity(&mut self, ent: usize, link: &LinkState) {
        self.world.borrow_mut().linked.insert(ent, link.clone());
    }

    fn unlink_entity(&mut self, ent: usize) {
        self.world.borrow_mut().linked.remove(&ent);
    }

    fn multicast(&mut self, origin: &Vec3, to: Multicast, data: &[u8]) {
        self.world.borrow_mut().multicasts.push((*origin, to, data.to_vec()));
    }

    fn unicast(&mut self, ent: usize, reliable: bool, data: &[u8]) {
        self.world.borrow_mut().unicasts.push((ent, reliable, data.to_vec()));
    }

    /// Straight-line integration with no collision.
    fn pmove(&mut self, pm: &mut PmoveData) {
        let dt = pm.cmd.msec as f32 / 1000.0;
        pm.s.origin = vector_ma(&pm.s.origin, dt, &pm.s.velocity);
        pm.angles = pm.cmd.angles;
        pm.touch_ents.clear();
        pm.ground_entity = None;
        self.world.borrow_mut().pmove_calls += 1;
    }

    fn add_command_string(&mut self, text: &str) {
        self.world.borrow_mut().commands.push(text.to_string());
    }

    fn load_file(&mut self, path: &str) -> Option<String> {
        self.world.borrow().files.get(path).cloned()
    }

    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }
}

/// A context with cvars registered, a 10 Hz frame rate, default gravity, and
/// level time one second in. Returns the shared world for inspection.
pub fn make_ctx(max_clients: usize, max_entities: usize) -> (GameCtx, Rc<RefCell<MockWorld>>) {
    let world = Rc::new(RefCell::new(MockWorld::default()));
    let engine = MockEngine {
        cvars: CvarRegistry::new(),
        world: Rc::clone(&world),
        frame_rate: 10,
    };
    let mut ctx = GameCtx::new(Box::new(engine), max_clients, max_entities);
    ctx.register_cvars();
    ctx.edicts[0].in_use = true;
    ctx.edicts[0].class_name = "worldspawn".into();
    ctx.edicts[0].solid = Solid::Bsp;
    ctx.level.gravity = 800;
    ctx.level.time = 1000;
    ctx.level.frame_num = 10;
    (ctx, world)
}

/// Mark a player slot connected and alive at `origin`.
pub fn spawn_test_client(ctx: &mut GameCtx, ent: usize, origin: Vec3) {
    ctx.clients[ent - 1].connected = true;
    ctx.clients[ent - 1].persistent.net_name = format!("player{}", ent);
    let e = &mut ctx.edicts[ent];
    e.in_use = true;
    e.class_name = "player".into();
    e.s.origin = origin;
    e.mins = [-16.0, -16.0, -24.0];
    e.maxs = [16.0, 16.0, 32.0];
    e.solid = Solid::Box;
    e.move_type = crate::g_local::MoveType::Walk;
    e.clip_mask = MASK_PLAYER_SOLID;
    e.health = 100;
    e.max_health = 100;
    e.take_damage = true;
    e.mass = 200.0;
    e.pain = Some(crate::dispatch::PainFn::Client);
    e.die = Some(crate::dispatch::DieFn::Client);
    ctx.link_entity(ent);
}
