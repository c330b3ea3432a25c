// dispatch.rs — behaviour dispatch for entity callbacks
//
// Entity callbacks are stored as small enum tags rather than function
// pointers or closures. A tag is plain data, so an `Edict` stays `Clone`
// and a callback can freely borrow the whole `GameCtx` while it runs.

use log::{debug, warn};

use crate::g_local::{CPlane, CSurface, GameCtx, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkFn {
    FreeEntity,
    // shared mover primitives
    MoveDone,
    MoveEnd,
    MoveConstant,
    MoveAccelerative,
    AngularBegin,
    AngularFinal,
    AngularDone,
    // movers
    PlatGoDown,
    ButtonReset,
    DoorGoDown,
    DoorCalculateMove,
    DoorCreateTrigger,
    TrainFind,
    TrainNext,
    Timer,
    // triggers and targets
    TriggerMultipleWait,
    DelayedUse,
    TargetExplosion,
    // projectiles
    GrenadeExplode,
    Bfg,
    Lightning,
    Hook,
    // items
    ItemDropToFloor,
    ItemRespawn,
    ItemDropped,
    ResetFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchFn {
    Blaster,
    Grenade,
    Rocket,
    Hyperblaster,
    Bfg,
    Hook,
    PlatTrigger,
    Rotating,
    Button,
    DoorTrigger,
    Door,
    TriggerMultiple,
    TriggerPush,
    TriggerHurt,
    TriggerTeleport,
    Item,
    ItemDropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseFn {
    AreaPortal,
    Plat,
    Rotating,
    Button,
    Door,
    Wall,
    Train,
    Timer,
    Conveyor,
    TriggerMultiple,
    TriggerRelay,
    TriggerHurt,
    TargetSpeaker,
    TargetExplosion,
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedFn {
    Plat,
    Rotating,
    Door,
    Train,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PainFn {
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieFn {
    Client,
    Button,
    Door,
}

/// Completion callbacks for the shared move-to-destination primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDoneFn {
    PlatUp,
    PlatDown,
    ButtonWait,
    ButtonDone,
    DoorUp,
    DoorDown,
    TrainWait,
}

impl GameCtx {
    pub fn call_think(&mut self, ent: usize) {
        let Some(think) = self.edicts[ent].think else {
            warn!("{} ({}) has no think function", self.edicts[ent].class_name, ent);
            return;
        };
        match think {
            ThinkFn::FreeEntity => self.free_entity(ent),
            ThinkFn::MoveDone => self.move_info_done(ent),
            ThinkFn::MoveEnd => self.move_info_end(ent),
            ThinkFn::MoveConstant => self.move_info_constant(ent),
            ThinkFn::MoveAccelerative => self.move_info_accelerative(ent),
            ThinkFn::AngularBegin => self.move_info_angular_begin(ent),
            ThinkFn::AngularFinal => self.move_info_angular_final(ent),
            ThinkFn::AngularDone => self.move_info_angular_done(ent),
            ThinkFn::PlatGoDown => self.func_plat_go_down(ent),
            ThinkFn::ButtonReset => self.func_button_reset(ent),
            ThinkFn::DoorGoDown => self.func_door_go_down(ent),
            ThinkFn::DoorCalculateMove => self.func_door_calculate_move(ent),
            ThinkFn::DoorCreateTrigger => self.func_door_create_trigger(ent),
            ThinkFn::TrainFind => self.func_train_find(ent),
            ThinkFn::TrainNext => self.func_train_next(ent),
            ThinkFn::Timer => self.func_timer_think(ent),
            ThinkFn::TriggerMultipleWait => self.trigger_multiple_wait(ent),
            ThinkFn::DelayedUse => self.delayed_use_think(ent),
            ThinkFn::TargetExplosion => self.target_explosion_explode(ent),
            ThinkFn::GrenadeExplode => self.grenade_projectile_explode(ent),
            ThinkFn::Bfg => self.bfg_projectile_think(ent),
            ThinkFn::Lightning => self.lightning_projectile_think(ent),
            ThinkFn::Hook => self.hook_projectile_think(ent),
            ThinkFn::ItemDropToFloor => self.item_drop_to_floor(ent),
            ThinkFn::ItemRespawn => self.item_respawn(ent),
            ThinkFn::ItemDropped => self.item_dropped_think(ent),
            ThinkFn::ResetFlag => self.reset_flag(ent),
        }
    }

    pub fn call_touch(
        &mut self,
        ent: usize,
        other: usize,
        plane: Option<&CPlane>,
        surf: Option<&CSurface>,
    ) {
        let Some(touch) = self.edicts[ent].touch else {
            return;
        };
        match touch {
            TouchFn::Blaster => self.blaster_projectile_touch(ent, other, plane, surf),
            TouchFn::Grenade => self.grenade_projectile_touch(ent, other, plane, surf),
            TouchFn::Rocket => self.rocket_projectile_touch(ent, other, plane, surf),
            TouchFn::Hyperblaster => self.hyperblaster_projectile_touch(ent, other, plane, surf),
            TouchFn::Bfg => self.bfg_projectile_touch(ent, other, plane, surf),
            TouchFn::Hook => self.hook_projectile_touch(ent, other, plane, surf),
            TouchFn::PlatTrigger => self.func_plat_touch(ent, other),
            TouchFn::Rotating => self.func_rotating_touch(ent, other),
            TouchFn::Button => self.func_button_touch(ent, other),
            TouchFn::DoorTrigger => self.func_door_touch_trigger(ent, other),
            TouchFn::Door => self.func_door_touch(ent, other),
            TouchFn::TriggerMultiple => self.trigger_multiple_touch(ent, other),
            TouchFn::TriggerPush => self.trigger_push_touch(ent, other),
            TouchFn::TriggerHurt => self.trigger_hurt_touch(ent, other),
            TouchFn::TriggerTeleport => self.trigger_teleport_touch(ent, other),
            TouchFn::Item => self.touch_item(ent, other),
            TouchFn::ItemDropped => self.touch_dropped_item(ent, other),
        }
    }

    pub fn call_use(&mut self, ent: usize, _other: Option<usize>, activator: Option<usize>) {
        let Some(use_fn) = self.edicts[ent].use_fn else {
            debug!("{} ({}) is not usable", self.edicts[ent].class_name, ent);
            return;
        };
        match use_fn {
            UseFn::AreaPortal => self.func_areaportal_use(ent),
            UseFn::Plat => self.func_plat_use(ent),
            UseFn::Rotating => self.func_rotating_use(ent),
            UseFn::Button => self.func_button_use(ent, activator),
            UseFn::Door => self.func_door_use(ent, activator),
            UseFn::Wall => self.func_wall_use(ent),
            UseFn::Train => self.func_train_use(ent, activator),
            UseFn::Timer => self.func_timer_use(ent, activator),
            UseFn::Conveyor => self.func_conveyor_use(ent),
            UseFn::TriggerMultiple => self.trigger_multiple_use(ent, activator),
            UseFn::TriggerRelay => self.trigger_relay_use(ent, activator),
            UseFn::TriggerHurt => self.trigger_hurt_use(ent),
            UseFn::TargetSpeaker => self.target_speaker_use(ent),
            UseFn::TargetExplosion => self.target_explosion_use(ent, activator),
            UseFn::Item => self.item_use(ent),
        }
    }

    pub fn call_blocked(&mut self, ent: usize, other: usize) {
        let Some(blocked) = self.edicts[ent].blocked else {
            return;
        };
        match blocked {
            BlockedFn::Plat => self.func_plat_blocked(ent, other),
            BlockedFn::Rotating => self.func_rotating_blocked(ent, other),
            BlockedFn::Door => self.func_door_blocked(ent, other),
            BlockedFn::Train => self.func_train_blocked(ent, other),
        }
    }

    pub fn call_pain(&mut self, ent: usize, other: usize, damage: i32, knockback: i32) {
        if let Some(PainFn::Client) = self.edicts[ent].pain {
            self.client_pain(ent, other, damage, knockback);
        }
    }

    pub fn call_die(
        &mut self,
        ent: usize,
        inflictor: usize,
        attacker: usize,
        damage: i32,
        point: &Vec3,
    ) {
        let Some(die) = self.edicts[ent].die else {
            return;
        };
        match die {
            DieFn::Client => self.client_die(ent, inflictor, attacker, damage, point),
            DieFn::Button => self.func_button_die(ent, attacker),
            DieFn::Door => self.func_door_die(ent, attacker),
        }
    }

    pub fn call_move_done(&mut self, ent: usize) {
        let Some(done) = self.edicts[ent].move_info.done else {
            return;
        };
        match done {
            MoveDoneFn::PlatUp => self.func_plat_up(ent),
            MoveDoneFn::PlatDown => self.func_plat_down(ent),
            MoveDoneFn::ButtonWait => self.func_button_wait(ent),
            MoveDoneFn::ButtonDone => self.func_button_done(ent),
            MoveDoneFn::DoorUp => self.func_door_up(ent),
            MoveDoneFn::DoorDown => self.func_door_down(ent),
            MoveDoneFn::TrainWait => self.func_train_wait(ent),
        }
    }
}
