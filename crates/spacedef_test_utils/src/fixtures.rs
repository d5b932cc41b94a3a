//! Test fixtures and helpers.
//!
//! Pre-built levels and worlds for consistent testing.

use spacedef_core::level::{LevelDescriptor, ResourceNode, StartingBuilding, StartingShip};
use spacedef_core::math::Vec2;
use spacedef_core::ships::{ShipId, ShipKind};
use spacedef_core::spawner::SpawnGroup;
use spacedef_core::stats::StatCatalog;
use spacedef_core::victory::WinCondition;
use spacedef_core::world::{TickEvents, WorldContext};

/// Frame time used by fixtures: 60 frames per second.
pub const FRAME_DT: f32 = 1.0 / 60.0;

/// Seed used when a test does not care which one.
pub const DEFAULT_SEED: u64 = 0x5eed;

fn building(blueprint: &str, x: f32, y: f32) -> StartingBuilding {
    StartingBuilding {
        blueprint: blueprint.to_string(),
        position: Vec2::new(x, y),
        complete: true,
    }
}

/// A small base: command center, mining platform with a miner, a turret
/// and one mineral field. No waves and no win condition.
#[must_use]
pub fn outpost_level() -> LevelDescriptor {
    LevelDescriptor {
        name: "Outpost".to_string(),
        resources: vec![ResourceNode {
            position: Vec2::new(350.0, 150.0),
            radius: 60.0,
            minerals: 200,
        }],
        starting_buildings: vec![
            building("CommandCenter", 0.0, 0.0),
            building("MiningPlatform", 150.0, 0.0),
            building("Turret", 0.0, 150.0),
        ],
        starting_ships: vec![StartingShip {
            kind: ShipKind::Miner,
            position: Vec2::new(150.0, 0.0),
            home: Some(1),
        }],
        ..LevelDescriptor::default()
    }
}

/// [`outpost_level`] with waves arriving from the west and a kill-all win.
#[must_use]
pub fn siege_level(waves: usize) -> LevelDescriptor {
    let spawn_groups = (0..waves)
        .map(|i| {
            let tier_one = u32::from(i % 2 == 1);
            SpawnGroup::new(
                2.0 + i as f32 * 4.0,
                Vec2::new(-800.0, (i as f32 - 1.0) * 200.0),
                [2, tier_one, 0],
            )
        })
        .collect();

    LevelDescriptor {
        name: "Siege".to_string(),
        spawn_groups,
        win_condition: WinCondition {
            kill_all: true,
            ..WinCondition::default()
        },
        starting_ships: vec![
            StartingShip {
                kind: ShipKind::Miner,
                position: Vec2::new(150.0, 0.0),
                home: Some(1),
            },
            StartingShip {
                kind: ShipKind::Fighter,
                position: Vec2::new(-100.0, 50.0),
                home: None,
            },
            StartingShip {
                kind: ShipKind::Fighter,
                position: Vec2::new(-100.0, -50.0),
                home: None,
            },
        ],
        ..outpost_level()
    }
}

/// Build a world from a level with stock stats.
///
/// # Panics
///
/// Panics if the level fails validation.
#[must_use]
pub fn world_from(level: &LevelDescriptor, seed: u64) -> WorldContext {
    match WorldContext::from_level(level, StatCatalog::new(), seed) {
        Ok(world) => world,
        Err(e) => panic!("fixture level '{}' is invalid: {e}", level.name),
    }
}

/// The outpost world.
#[must_use]
pub fn outpost_world(seed: u64) -> WorldContext {
    world_from(&outpost_level(), seed)
}

/// The siege world with three waves.
#[must_use]
pub fn siege_world(seed: u64) -> WorldContext {
    world_from(&siege_level(3), seed)
}

/// An open-space skirmish: `fighters` player fighters at x = -200 and
/// `enemies` tier-0 enemies at x = 200, with no buildings.
#[must_use]
pub fn skirmish_world(seed: u64, fighters: usize, enemies: usize) -> (WorldContext, Vec<ShipId>) {
    let mut world = WorldContext::new(1000.0, seed);
    let mut ids = Vec::with_capacity(fighters + enemies);
    for i in 0..fighters {
        let y = (i as f32 - fighters as f32 / 2.0) * 60.0;
        ids.push(world.spawn_ship(ShipKind::Fighter, Vec2::new(-200.0, y), None));
    }
    for i in 0..enemies {
        let y = (i as f32 - enemies as f32 / 2.0) * 60.0;
        ids.push(world.spawn_ship(ShipKind::Enemy(0), Vec2::new(200.0, y), None));
    }
    (world, ids)
}

/// Run `ticks` frames of `dt` and collect every tick's events.
pub fn run_ticks(world: &mut WorldContext, ticks: usize, dt: f32) -> Vec<TickEvents> {
    (0..ticks).map(|_| world.tick(dt)).collect()
}

/// Run until the game ends or `max_ticks` frames pass. Returns the ticks run.
pub fn run_until_over(world: &mut WorldContext, max_ticks: usize, dt: f32) -> usize {
    for tick in 0..max_ticks {
        if world.tick(dt).outcome.is_some() {
            return tick + 1;
        }
    }
    max_ticks
}
