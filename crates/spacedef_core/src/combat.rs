//! Combat resolution: projectile movement, hits and death effects.
//!
//! Projectiles are resolved in a single pass over the live list. Each one
//! moves, is dropped if it left the arena, and otherwise hits at most one
//! target: the first hostile ship (in id order) whose hit box contains it,
//! or for enemy shots the first building whose circle contains it.

use std::f32::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::registry::Registry;
use crate::scenery::SceneryField;
use crate::ships::{HitOutcome, Ship, ShipId};

/// Explosions spawned when a ship or building dies.
pub const EXPLOSIONS_PER_DEATH: usize = 32;

/// Spread of ship death explosions (± units per axis).
pub const SHIP_EXPLOSION_SPREAD: f32 = 45.0;

/// Hull length per debris chunk.
pub const CHUNK_SPACING: f32 = 20.0;

/// Debris drift speed as a fraction of its offset from the wreck, per second.
pub const CHUNK_DRIFT: f32 = 0.6;

/// What a projectile hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTarget {
    /// A ship.
    Ship(ShipId),
    /// A building.
    Building(BuildingId),
}

/// One projectile impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Entity hit.
    pub target: HitTarget,
    /// Impact position.
    pub position: Vec2,
    /// Raw projectile damage.
    pub damage: i32,
    /// Whether this hit destroyed the target.
    pub destroyed: bool,
}

/// Move every projectile and apply hits.
///
/// Dead ships and buildings are skipped: a wreck does not absorb shots
/// before it is cleaned up.
pub fn resolve_projectiles(
    projectiles: &mut Vec<Projectile>,
    ships: &mut Registry<Ship>,
    buildings: &mut Registry<Building>,
    half_width: f32,
    dt: f32,
) -> Vec<HitEvent> {
    let mut hits = Vec::new();

    projectiles.retain_mut(|projectile| {
        projectile.advance(dt);
        if projectile.is_out_of_bounds(half_width) {
            return false;
        }

        if let Some(hit) = hit_ship(projectile, ships) {
            hits.push(hit);
            return false;
        }

        if projectile.faction == Faction::Enemy {
            if let Some(hit) = hit_building(projectile, buildings) {
                hits.push(hit);
                return false;
            }
        }
        true
    });

    hits
}

fn hit_ship(projectile: &Projectile, ships: &mut Registry<Ship>) -> Option<HitEvent> {
    let ship = ships.iter_mut().find(|ship| {
        !ship.is_dead()
            && projectile.faction.is_hostile_to(ship.faction)
            && ship.check_projectile(projectile.position)
    })?;

    let outcome = ship.hit(projectile.damage as f32);
    Some(HitEvent {
        target: HitTarget::Ship(ship.id),
        position: projectile.position,
        damage: projectile.damage,
        destroyed: outcome == HitOutcome::Destroyed,
    })
}

fn hit_building(projectile: &Projectile, buildings: &mut Registry<Building>) -> Option<HitEvent> {
    let building = buildings.iter_mut().find(|building| {
        !building.is_dead()
            && building.position.distance(projectile.position) <= building.size.x / 2.0
    })?;

    let destroyed = building.take_damage(projectile.damage);
    Some(HitEvent {
        target: HitTarget::Building(building.id),
        position: projectile.position,
        damage: projectile.damage,
        destroyed,
    })
}

/// Scatter explosions and hull debris for a destroyed ship.
///
/// Returns the explosion positions. Debris chunks are added to `scenery`,
/// spread along the hull and drifting away from the wreck.
pub fn explode_ship(ship: &Ship, rng: &mut impl Rng, scenery: &mut SceneryField) -> Vec<Vec2> {
    let explosions = (0..EXPLOSIONS_PER_DEATH)
        .map(|_| {
            ship.position
                + Vec2::new(
                    rng.gen_range(-SHIP_EXPLOSION_SPREAD..=SHIP_EXPLOSION_SPREAD),
                    rng.gen_range(-SHIP_EXPLOSION_SPREAD..=SHIP_EXPLOSION_SPREAD),
                )
        })
        .collect();

    if ship.chunk_count > 0 {
        let half_length = ship.size.x / 2.0;
        let half_height = ship.size.y / 2.0;
        let along = Vec2::from_angle(ship.heading);
        let across = along.perp();
        let count = (ship.chunk_count as f32 * (half_length / CHUNK_SPACING)).ceil() as u32;

        for i in 0..count {
            let offset = along * (half_length * rng.gen_range(-1.0..=1.0))
                + across * rng.gen_range(-half_height..=half_height);
            let spin = rng.gen_range(-PI..=PI) / 2.0;
            scenery.add_hull_chunk(
                ship.position + offset,
                ship.heading,
                i % ship.chunk_count,
                offset * CHUNK_DRIFT,
                spin,
            );
        }
    }

    explosions
}

/// Scatter explosions over a destroyed building.
pub fn explode_building(building: &Building, rng: &mut impl Rng) -> Vec<Vec2> {
    let spread = building.size.x.abs();
    (0..EXPLOSIONS_PER_DEATH)
        .map(|_| {
            building.position
                + Vec2::new(
                    rng.gen_range(-spread..=spread),
                    rng.gen_range(-spread..=spread),
                )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenery::SceneryKind;
    use crate::ships::{ShipClass, ShipKind};
    use crate::stats::StatCatalog;
    use crate::weapons::WeaponKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn add_ship(ships: &mut Registry<Ship>, kind: ShipKind, position: Vec2) -> ShipId {
        ShipId(ships.insert(Ship::new(kind, &ShipClass::stock(kind), position, "Target")))
    }

    fn shot(faction: Faction, position: Vec2) -> Projectile {
        Projectile::new(WeaponKind::RailGun, position, Vec2::ZERO, None, faction)
    }

    #[test]
    fn test_friendly_fire_is_ignored() {
        let mut ships = Registry::new();
        let id = add_ship(&mut ships, ShipKind::Fighter, Vec2::ZERO);
        let mut buildings = Registry::new();
        let mut projectiles: Vec<Projectile> =
            (0..100).map(|_| shot(Faction::Player, Vec2::ZERO)).collect();

        let hits = resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 0.016);

        assert!(hits.is_empty());
        assert_eq!(projectiles.len(), 100);
        let ship = ships.get(id.0).expect("ship");
        assert_eq!(ship.shield, ship.max_shield);
        assert_eq!(ship.hull, ship.max_hull);
    }

    #[test]
    fn test_projectile_hits_first_hostile_ship_only() {
        let mut ships = Registry::new();
        let first = add_ship(&mut ships, ShipKind::Enemy(0), Vec2::ZERO);
        let second = add_ship(&mut ships, ShipKind::Enemy(0), Vec2::ZERO);
        let mut buildings = Registry::new();
        let mut projectiles = vec![shot(Faction::Player, Vec2::ZERO)];

        let hits = resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 0.016);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, HitTarget::Ship(first));
        assert!(projectiles.is_empty());
        let untouched = ships.get(second.0).expect("ship");
        assert_eq!(untouched.shield, untouched.max_shield);
    }

    #[test]
    fn test_out_of_bounds_projectiles_are_removed() {
        let mut ships = Registry::new();
        let mut buildings = Registry::new();
        let mut projectiles = vec![Projectile::new(
            WeaponKind::Gatling,
            Vec2::new(1990.0, 0.0),
            Vec2::new(50.0, 0.0),
            None,
            Faction::Player,
        )];

        resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 1.0);
        assert!(projectiles.is_empty());
    }

    #[test]
    fn test_only_enemy_shots_hit_buildings() {
        let mut ships = Registry::new();
        let mut buildings = Registry::new();
        let id = BuildingId(buildings.insert(Building::from_blueprint(
            "PowerNode",
            Vec2::ZERO,
            &StatCatalog::new(),
        )));

        let mut projectiles = vec![shot(Faction::Player, Vec2::new(5.0, 0.0))];
        assert!(resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 0.0).is_empty());

        let mut projectiles = vec![shot(Faction::Enemy, Vec2::new(16.0, 0.0))];
        let hits = resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, HitTarget::Building(id));

        // Rail gun 10 minus armor 1
        let building = buildings.get(id.0).expect("building");
        assert_eq!(building.health, building.max_health - 9);
    }

    #[test]
    fn test_killing_hit_is_reported() {
        let mut ships = Registry::new();
        let id = add_ship(&mut ships, ShipKind::Enemy(0), Vec2::ZERO);
        if let Some(ship) = ships.get_mut(id.0) {
            ship.shield = 0.0;
            ship.hull = 5.0;
        }
        let mut buildings = Registry::new();
        let mut projectiles = vec![shot(Faction::Player, Vec2::ZERO), shot(Faction::Player, Vec2::ZERO)];

        let hits = resolve_projectiles(&mut projectiles, &mut ships, &mut buildings, 1000.0, 0.0);

        // The second shot passes the wreck
        assert_eq!(hits.len(), 1);
        assert!(hits[0].destroyed);
        assert_eq!(projectiles.len(), 1);
    }

    #[test]
    fn test_ship_explosion_scatters_debris() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut scenery = SceneryField::new();
        let mut ship = Ship::new(
            ShipKind::Destroyer,
            &ShipClass::stock(ShipKind::Destroyer),
            Vec2::new(100.0, 100.0),
            "Wreck",
        );
        ship.kill();

        let explosions = explode_ship(&ship, &mut rng, &mut scenery);

        assert_eq!(explosions.len(), EXPLOSIONS_PER_DEATH);
        assert!(explosions
            .iter()
            .all(|p| (p.x - 100.0).abs() <= 45.0 && (p.y - 100.0).abs() <= 45.0));

        // 4 chunks * (48 / 20) = 9.6 -> 10
        assert_eq!(scenery.len(), 10);
        assert!(scenery
            .iter()
            .all(|s| matches!(s.kind, SceneryKind::Hull { spin, .. } if spin.abs() <= PI / 2.0)));
    }

    #[test]
    fn test_building_explosion_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let building = Building::from_blueprint("Turret", Vec2::ZERO, &StatCatalog::new());
        let explosions = explode_building(&building, &mut rng);

        assert_eq!(explosions.len(), EXPLOSIONS_PER_DEATH);
        assert!(explosions.iter().all(|p| p.x.abs() <= 48.0 && p.y.abs() <= 48.0));
    }
}
