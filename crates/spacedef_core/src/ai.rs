//! Per-kind ship behaviour.
//!
//! Each tick every ship runs exactly one behaviour after its physics step.
//! Behaviours choose a steering goal, request thrust through the PID
//! controller and fire at targets in range. Targets are read from a
//! start-of-phase [`ShipSnapshot`] list so the order in which ships update
//! does not change who they see.

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::economy::ResourcePool;
use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::registry::Registry;
use crate::scenery::{SceneryField, SceneryId};
use crate::ships::{Ship, ShipKind, ShipSnapshot};
use crate::steering::Thrust;

/// Enemy orbit radius around its target.
pub const ENEMY_ORBIT_RADIUS: f32 = 100.0;
/// Enemy firing range.
pub const ENEMY_FIRE_RANGE: f32 = 800.0;
/// Angular rate (rad/s of behaviour clock) of combat orbits.
pub const COMBAT_ORBIT_RATE: f32 = 0.1;

/// Most minerals a miner can carry.
pub const MINER_CAPACITY: i32 = 20;
/// Minerals collected per collection interval.
pub const MINER_COLLECTION_RATE: i32 = 1;
/// Seconds per collection.
pub const MINER_COLLECTION_INTERVAL: f32 = 1.0;
/// Distance from home at which cargo is unloaded.
pub const MINER_UNLOAD_DISTANCE: f32 = 50.0;
/// Miner orbit radius as a fraction of the field radius.
pub const MINER_ORBIT_FACTOR: f32 = 0.6;
/// Angular rate of the mining orbit.
pub const MINER_ORBIT_RATE: f32 = 0.3;
/// Range of the random initial miner clock (± seconds).
pub const MINER_CLOCK_SPREAD: f32 = 60.0;

/// Mining state carried by miners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MinerHold {
    /// Minerals on board.
    pub cargo: i32,
    /// Field being mined.
    pub target: Option<SceneryId>,
    /// Seconds accumulated towards the next collection.
    pub collection_timer: f32,
}

impl MinerHold {
    /// Whether the hold is full.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.cargo >= MINER_CAPACITY
    }
}

/// Orbit and firing ranges for player warships.
#[must_use]
pub const fn warship_ranges(kind: ShipKind) -> Option<(f32, f32)> {
    match kind {
        ShipKind::Fighter => Some((400.0, 800.0)),
        ShipKind::Destroyer => Some((600.0, 1000.0)),
        ShipKind::Carrier => Some((700.0, 2000.0)),
        _ => None,
    }
}

/// What a behaviour can see.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    /// Live ships at the start of the ship phase.
    pub ships: &'a [ShipSnapshot],
    /// Buildings (read-only during the ship phase).
    pub buildings: &'a Registry<Building>,
    /// World half-width.
    pub half_width: f32,
}

/// Side effects of one behaviour step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorOutput {
    /// Projectiles fired.
    pub shots: Vec<Projectile>,
    /// Minerals delivered to the pool.
    pub delivered: i32,
}

/// Run the behaviour for `ship`'s kind.
pub fn run_behavior(
    ship: &mut Ship,
    ctx: &BehaviorContext<'_>,
    scenery: &mut SceneryField,
    pool: &mut ResourcePool,
    dt: f32,
) -> BehaviorOutput {
    match ship.kind {
        ShipKind::Enemy(_) => enemy_behavior(ship, ctx, dt),
        ShipKind::Miner => miner_behavior(ship, ctx, scenery, pool, dt),
        ShipKind::Fighter | ShipKind::Destroyer | ShipKind::Carrier => {
            warship_behavior(ship, ctx, dt)
        }
    }
}

fn nearest<'a>(
    from: Vec2,
    candidates: impl Iterator<Item = &'a ShipSnapshot>,
) -> Option<&'a ShipSnapshot> {
    candidates.min_by(|a, b| {
        a.position
            .distance_squared(from)
            .total_cmp(&b.position.distance_squared(from))
    })
}

fn nearest_building(from: Vec2, buildings: &Registry<Building>) -> Option<&Building> {
    buildings.iter().filter(|b| !b.is_dead()).min_by(|a, b| {
        a.position
            .distance_squared(from)
            .total_cmp(&b.position.distance_squared(from))
    })
}

fn orbit_point(center: Vec2, radius: f32, angle: f32) -> Vec2 {
    center + Vec2::from_angle(angle) * radius
}

/// Orbit the nearest player ship (or building) and shoot when close.
fn enemy_behavior(ship: &mut Ship, ctx: &BehaviorContext<'_>, dt: f32) -> BehaviorOutput {
    let target = nearest(
        ship.position,
        ctx.ships
            .iter()
            .filter(|other| other.id != ship.id && other.faction != Faction::Enemy),
    )
    .map(|s| s.position)
    .or_else(|| nearest_building(ship.position, ctx.buildings).map(|b| b.position));

    let mut output = BehaviorOutput::default();
    let Some(target) = target else {
        ship.set_thrust(Thrust::default());
        return output;
    };

    let goal = orbit_point(target, ENEMY_ORBIT_RADIUS, ship.clock * COMBAT_ORBIT_RATE);
    ship.steer_towards(goal, dt);
    if ship.position.distance(target) < ENEMY_FIRE_RANGE {
        output.shots = ship.fire_at(target);
    }
    output
}

/// Orbit the nearest in-world enemy and shoot; head for the origin otherwise.
fn warship_behavior(ship: &mut Ship, ctx: &BehaviorContext<'_>, dt: f32) -> BehaviorOutput {
    let mut output = BehaviorOutput::default();
    let Some((orbit, range)) = warship_ranges(ship.kind) else {
        return output;
    };

    let target = nearest(
        ship.position,
        ctx.ships.iter().filter(|other| {
            other.faction == Faction::Enemy && other.position.is_within(ctx.half_width)
        }),
    )
    .map(|s| s.position);

    match target {
        Some(target) => {
            let goal = orbit_point(target, orbit, ship.clock * COMBAT_ORBIT_RATE);
            ship.steer_towards(goal, dt);
            if ship.position.distance(target) < range {
                output.shots = ship.fire_at(target);
            }
        }
        None => ship.steer_towards(Vec2::ZERO, dt),
    }
    output
}

/// Mine the nearest field, carry cargo home and unload it.
fn miner_behavior(
    ship: &mut Ship,
    ctx: &BehaviorContext<'_>,
    scenery: &mut SceneryField,
    pool: &mut ResourcePool,
    dt: f32,
) -> BehaviorOutput {
    let mut output = BehaviorOutput::default();
    let home = ship
        .home
        .and_then(|BuildingId(id)| ctx.buildings.get(id))
        .filter(|b| !b.is_dead())
        .map(|b| b.position);
    let Some(home) = home else {
        ship.set_thrust(Thrust::default());
        return output;
    };

    let mut hold = ship.hold.unwrap_or_default();

    // Drop fields that ran dry, then look for a new one
    if hold
        .target
        .and_then(|id| scenery.get(id))
        .is_some_and(|field| !field.has_minerals())
    {
        hold.target = None;
    }
    if hold.target.is_none() && !hold.is_full() {
        hold.target = scenery.closest_mineral(ship.position).map(|s| s.id);
    }

    let field = hold
        .target
        .and_then(|id| scenery.get(id))
        .and_then(|s| s.mineral_radius().map(|radius| (s.id, s.position, radius)));

    match field {
        Some((field_id, center, radius)) if !hold.is_full() => {
            let goal = orbit_point(center, radius * MINER_ORBIT_FACTOR, ship.clock * MINER_ORBIT_RATE);
            ship.steer_towards(goal, dt);

            if goal.distance(ship.position) <= radius {
                hold.collection_timer += dt;
                if hold.collection_timer > MINER_COLLECTION_INTERVAL {
                    hold.collection_timer -= MINER_COLLECTION_INTERVAL;
                    let mined = scenery.mine(field_id, MINER_COLLECTION_RATE);
                    hold.cargo = (hold.cargo + mined).min(MINER_CAPACITY);
                }
            }
        }
        _ => ship.steer_towards(home, dt),
    }

    if home.distance(ship.position) < MINER_UNLOAD_DISTANCE && hold.cargo > 0 {
        output.delivered = pool.add(hold.cargo);
        tracing::trace!(ship = ship.id.0, cargo = hold.cargo, "Miner unloaded");
        hold.cargo = 0;
    }

    ship.hold = Some(hold);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ships::{ShipClass, ShipId};
    use crate::stats::StatCatalog;

    fn make_ship(kind: ShipKind, id: u32, position: Vec2) -> Ship {
        let mut ship = Ship::new(kind, &ShipClass::stock(kind), position, "Test");
        ship.id = ShipId(id);
        for weapon in &mut ship.weapons {
            weapon.advance(100.0);
        }
        ship
    }

    fn run(ship: &mut Ship, others: &[&Ship], buildings: &Registry<Building>) -> BehaviorOutput {
        let snapshot: Vec<ShipSnapshot> = others.iter().map(|s| ShipSnapshot::from(*s)).collect();
        let ctx = BehaviorContext {
            ships: &snapshot,
            buildings,
            half_width: 1000.0,
        };
        run_behavior(ship, &ctx, &mut SceneryField::new(), &mut ResourcePool::new(100), 0.1)
    }

    #[test]
    fn test_enemy_fires_at_nearby_player_ship() {
        let mut enemy = make_ship(ShipKind::Enemy(0), 1, Vec2::ZERO);
        let fighter = make_ship(ShipKind::Fighter, 2, Vec2::new(300.0, 0.0));

        let output = run(&mut enemy, &[&fighter], &Registry::new());
        assert_eq!(output.shots.len(), 1);
        assert_eq!(output.shots[0].faction, Faction::Enemy);
    }

    #[test]
    fn test_enemy_holds_fire_out_of_range() {
        let mut enemy = make_ship(ShipKind::Enemy(0), 1, Vec2::ZERO);
        let fighter = make_ship(ShipKind::Fighter, 2, Vec2::new(900.0, 0.0));

        let output = run(&mut enemy, &[&fighter], &Registry::new());
        assert!(output.shots.is_empty());
        assert!(enemy.acceleration != Vec2::ZERO);
    }

    #[test]
    fn test_enemy_falls_back_to_buildings() {
        let mut enemy = make_ship(ShipKind::Enemy(0), 1, Vec2::ZERO);
        let mut buildings = Registry::new();
        buildings.insert(Building::from_blueprint(
            "Turret",
            Vec2::new(200.0, 0.0),
            &StatCatalog::new(),
        ));

        let output = run(&mut enemy, &[], &buildings);
        assert_eq!(output.shots.len(), 1);
    }

    #[test]
    fn test_enemy_ignores_other_enemies() {
        let mut enemy = make_ship(ShipKind::Enemy(0), 1, Vec2::ZERO);
        let other = make_ship(ShipKind::Enemy(1), 2, Vec2::new(50.0, 0.0));

        let output = run(&mut enemy, &[&other], &Registry::new());
        assert!(output.shots.is_empty());
    }

    #[test]
    fn test_warship_ignores_enemies_outside_world() {
        let mut fighter = make_ship(ShipKind::Fighter, 1, Vec2::new(900.0, 0.0));
        let outside = make_ship(ShipKind::Enemy(0), 2, Vec2::new(1200.0, 0.0));

        let output = run(&mut fighter, &[&outside], &Registry::new());
        assert!(output.shots.is_empty());

        let inside = make_ship(ShipKind::Enemy(0), 3, Vec2::new(600.0, 0.0));
        let output = run(&mut fighter, &[&outside, &inside], &Registry::new());
        assert_eq!(output.shots.len(), 2);
    }

    #[test]
    fn test_miner_without_home_idles() {
        let mut miner = make_ship(ShipKind::Miner, 1, Vec2::ZERO);
        run(&mut miner, &[], &Registry::new());
        assert_eq!(miner.acceleration, Vec2::ZERO);
    }

    #[test]
    fn test_miner_collects_and_unloads() {
        let mut buildings = Registry::new();
        let home = BuildingId(buildings.insert(
            Building::from_blueprint("MiningPlatform", Vec2::ZERO, &StatCatalog::new()).completed(),
        ));
        let mut scenery = SceneryField::new();
        let field = scenery.add_mineral(Vec2::ZERO, 100.0, 50);
        let mut pool = ResourcePool::with_available(0, 1000);

        let mut miner = make_ship(ShipKind::Miner, 1, Vec2::ZERO).with_home(home);
        let ctx = BehaviorContext {
            ships: &[],
            buildings: &buildings,
            half_width: 1000.0,
        };

        // Sitting inside the field: 1 mineral per second, unloaded at home
        let mut delivered = 0;
        for _ in 0..35 {
            miner.position = Vec2::ZERO;
            delivered += run_behavior(&mut miner, &ctx, &mut scenery, &mut pool, 0.1).delivered;
        }

        assert_eq!(delivered, 3);
        assert_eq!(pool.available(), 3);
        assert_eq!(scenery.get(field).and_then(|s| s.minerals()), Some(47));
    }

    #[test]
    fn test_full_miner_heads_home() {
        let mut buildings = Registry::new();
        let home = BuildingId(buildings.insert(
            Building::from_blueprint("MiningPlatform", Vec2::new(-500.0, 0.0), &StatCatalog::new())
                .completed(),
        ));
        let mut scenery = SceneryField::new();
        scenery.add_mineral(Vec2::new(500.0, 0.0), 100.0, 50);
        let mut pool = ResourcePool::with_available(0, 1000);

        let mut miner = make_ship(ShipKind::Miner, 1, Vec2::ZERO).with_home(home);
        miner.hold = Some(MinerHold {
            cargo: MINER_CAPACITY,
            ..MinerHold::default()
        });
        let ctx = BehaviorContext {
            ships: &[],
            buildings: &buildings,
            half_width: 1000.0,
        };

        run_behavior(&mut miner, &ctx, &mut scenery, &mut pool, 0.1);
        // Home is behind: the controller turns instead of thrusting forward
        assert_eq!(miner.acceleration.x, 0.0);
        assert!(miner.acceleration.y != 0.0);
        assert_eq!(miner.hold.map(|h| h.target), Some(None));
    }
}
