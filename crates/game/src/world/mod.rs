mod damage;

pub use damage::{apply_damage, attack_velocity};

use glam::Vec2;

pub const WORLD_WIDTH: f32 = 1920.0;
pub const WORLD_HEIGHT: f32 = 1080.0;

pub const MAX_CLIENTS: usize = 4;
pub const TOWERS_PER_TEAM: usize = 2;
pub const TOWER_COUNT: usize = TOWERS_PER_TEAM * 2;
pub const BASE_COUNT: usize = 2;
pub const MAX_ATTACKS: usize = 64;

pub const PLAYER_MAX_HEALTH: i32 = 200;
pub const MINION_MAX_HEALTH: i32 = 120;
pub const TOWER_MAX_HEALTH: i32 = 600;
pub const BASE_MAX_HEALTH: i32 = 1200;

pub const ATTACK_LIFETIME_SECS: f32 = 3.0;

/// Kinds of replicated objects. The wire-level `ObjectType` in the
/// protocol module is narrower: destroy notices exist only for players,
/// attacks, towers and bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Player,
    Minion,
    Tower,
    Base,
    Attack,
}

/// Team assignment is positional: odd connection slots play the right
/// side, even slots the left.
pub fn team_for_slot(slot: u8) -> bool {
    slot % 2 == 1
}

/// Towers 0..TOWERS_PER_TEAM belong to the left team, the rest to the
/// right.
pub fn tower_team(index: usize) -> bool {
    index >= TOWERS_PER_TEAM
}

pub fn base_team(index: usize) -> bool {
    index == 1
}

pub fn player_spawn(slot: u8) -> Vec2 {
    let x = if team_for_slot(slot) {
        WORLD_WIDTH - 160.0
    } else {
        160.0
    };
    let y = WORLD_HEIGHT * 0.5 + (slot / 2) as f32 * 96.0;
    Vec2::new(x, y)
}

pub fn tower_position(index: usize) -> Vec2 {
    let lane = (index % TOWERS_PER_TEAM) as f32;
    let x = if tower_team(index) {
        WORLD_WIDTH - 480.0 - lane * 240.0
    } else {
        480.0 + lane * 240.0
    };
    Vec2::new(x, WORLD_HEIGHT * 0.5)
}

pub fn base_position(index: usize) -> Vec2 {
    let x = if base_team(index) {
        WORLD_WIDTH - 96.0
    } else {
        96.0
    };
    Vec2::new(x, WORLD_HEIGHT * 0.5)
}

/// True when a point lies inside the arena plus a margin. Used to
/// bounds-check client-supplied targets and to expire attacks in flight.
pub fn in_arena(point: Vec2, margin: f32) -> bool {
    point.x >= -margin
        && point.x <= WORLD_WIDTH + margin
        && point.y >= -margin
        && point.y <= WORLD_HEIGHT + margin
}
