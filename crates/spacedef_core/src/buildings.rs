//! Buildings: factory, construction, damage, upgrades, shipyards and turrets.
//!
//! Every building is a [`Building`] carrying the shared fields (health, price,
//! power links, construction state) plus a [`BuildingKind`] for the
//! behaviour that differs between power nodes, command centers, shipyards,
//! turrets and plain consumers.
//!
//! Buildings are created from a blueprint name through
//! [`Building::from_blueprint`], which reads every number from a
//! [`StatsProvider`] group of the same name. The group's `Type` key picks
//! the variant.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::economy::Price;
use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::registry::RegistryEntry;
use crate::ships::{load_weapon, ShipId, ShipKind};
use crate::stats::StatsProvider;
use crate::weapons::{Weapon, WeaponKind};

// ============================================================================
// Constants
// ============================================================================

/// Seconds every building spends under construction.
pub const CONSTRUCTION_TIME: f32 = 3.0;

/// Maximum number of buildings that are not power nodes.
pub const MAX_BUILDINGS: usize = 50;

/// Default outgoing link limit of a power node.
pub const POWER_NODE_MAX_CONNECTIONS: usize = 4;

/// Default outgoing link limit of a command center.
pub const COMMAND_CENTER_MAX_CONNECTIONS: usize = 6;

/// Shipyard timer value while the ship pool is full.
const SHIPYARD_HOLD_TIMER: f32 = 0.001;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier of a building within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

// ============================================================================
// Variant data
// ============================================================================

/// Construction progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstructionState {
    /// Being built; holds elapsed seconds.
    UnderConstruction(f32),
    /// Finished.
    Complete,
}

/// Shipyard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipyardData {
    /// Kind of ship produced.
    pub ship_kind: ShipKind,
    /// Maximum queued orders and maximum live ships.
    pub capacity: usize,
    /// Seconds between launches.
    pub cooldown: f32,
    /// Countdown to the next launch.
    pub timer: f32,
    /// Launch offsets of queued orders.
    pub queue: VecDeque<Vec2>,
    /// Live ships launched by this yard.
    pub pool: Vec<ShipId>,
}

/// Turret state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretData {
    /// Guns, mounted at the building's center.
    pub guns: Vec<Weapon>,
    /// Radius within which enemies are tracked.
    pub alert_radius: f32,
    /// Radius within which the guns fire.
    pub fire_radius: f32,
    /// Enemy currently tracked.
    pub target: Option<ShipId>,
}

/// Behaviour-specific building data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Consumes power, no behaviour.
    Plain,
    /// Relays power to its neighbors.
    PowerNode {
        /// Outgoing link limit.
        max_connections: usize,
    },
    /// Power source.
    CommandCenter {
        /// Outgoing link limit.
        max_connections: usize,
        /// Energy injected into the grid each tick.
        max_energy: f32,
        /// Energy left after the last distribution.
        remaining_energy: f32,
    },
    /// Builds ships.
    Shipyard(ShipyardData),
    /// Shoots enemies.
    Turret(TurretData),
}

impl BuildingKind {
    /// Config `Type` name of this variant.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::PowerNode { .. } => "powernode",
            Self::CommandCenter { .. } => "commandcenter",
            Self::Shipyard(_) => "shipyard",
            Self::Turret(_) => "turret",
        }
    }
}

// ============================================================================
// Stock blueprints
// ============================================================================

struct StockBlueprint {
    name: &'static str,
    type_name: &'static str,
    health: i32,
    armor: i32,
    consumption: f32,
    max_level: u32,
    magnitude: i32,
    connection: (f32, f32),
    price: (i32, i32),
    size: (f32, f32),
}

const GENERIC_BLUEPRINT: StockBlueprint = StockBlueprint {
    name: "Building",
    type_name: "plain",
    health: 100,
    armor: 0,
    consumption: 0.0,
    max_level: 1,
    magnitude: 0,
    connection: (40.0, 250.0),
    price: (0, 0),
    size: (32.0, 32.0),
};

fn stock_blueprint(group: &str) -> StockBlueprint {
    let group = group.to_lowercase();
    if group == "commandcenter" {
        StockBlueprint {
            name: "Command Center",
            type_name: "commandcenter",
            health: 1000,
            armor: 5,
            consumption: 0.0,
            max_level: 3,
            magnitude: 100,
            connection: (40.0, 300.0),
            price: (400, 0),
            size: (96.0, 96.0),
        }
    } else if group == "powernode" {
        StockBlueprint {
            name: "Power Node",
            type_name: "powernode",
            health: 150,
            armor: 1,
            consumption: 0.0,
            max_level: 2,
            magnitude: 25,
            connection: (40.0, 250.0),
            price: (50, 0),
            size: (32.0, 32.0),
        }
    } else if group == "miningplatform" {
        StockBlueprint {
            name: "Mining Platform",
            type_name: "shipyard",
            health: 300,
            armor: 2,
            consumption: 10.0,
            max_level: 3,
            magnitude: 50,
            connection: (40.0, 250.0),
            price: (150, 0),
            size: (64.0, 64.0),
        }
    } else if group == "assaultshipyard" {
        StockBlueprint {
            name: "Assault Shipyard",
            type_name: "shipyard",
            health: 400,
            armor: 3,
            consumption: 20.0,
            max_level: 3,
            magnitude: 50,
            connection: (40.0, 250.0),
            price: (250, 0),
            size: (72.0, 72.0),
        }
    } else if group == "destroyershipyard" {
        StockBlueprint {
            name: "Destroyer Shipyard",
            type_name: "shipyard",
            health: 500,
            armor: 4,
            consumption: 30.0,
            max_level: 3,
            magnitude: 75,
            connection: (40.0, 250.0),
            price: (400, 0),
            size: (96.0, 80.0),
        }
    } else if group == "carriershipyard" {
        StockBlueprint {
            name: "Carrier Shipyard",
            type_name: "shipyard",
            health: 700,
            armor: 5,
            consumption: 40.0,
            max_level: 3,
            magnitude: 100,
            connection: (40.0, 250.0),
            price: (600, 0),
            size: (128.0, 96.0),
        }
    } else if group == "turret" {
        StockBlueprint {
            name: "Gatling Turret",
            type_name: "turret",
            health: 250,
            armor: 3,
            consumption: 10.0,
            max_level: 3,
            magnitude: 40,
            connection: (40.0, 250.0),
            price: (100, 0),
            size: (48.0, 48.0),
        }
    } else if group == "missiles" {
        StockBlueprint {
            name: "Missile Battery",
            type_name: "turret",
            health: 200,
            armor: 2,
            consumption: 15.0,
            max_level: 3,
            magnitude: 40,
            connection: (40.0, 250.0),
            price: (175, 0),
            size: (48.0, 48.0),
        }
    } else {
        GENERIC_BLUEPRINT
    }
}

/// Stock shipyard settings: (ship, capacity, cooldown).
fn stock_shipyard(group: &str) -> (ShipKind, i64, f32) {
    match group.to_lowercase().as_str() {
        "assaultshipyard" => (ShipKind::Fighter, 6, 8.0),
        "destroyershipyard" => (ShipKind::Destroyer, 3, 15.0),
        "carriershipyard" => (ShipKind::Carrier, 2, 25.0),
        _ => (ShipKind::Miner, 4, 5.0),
    }
}

/// Stock turret settings: (alert radius, fire radius, guns).
fn stock_turret(group: &str) -> (f32, f32, WeaponKind, i64) {
    match group.to_lowercase().as_str() {
        "missiles" => (900.0, 700.0, WeaponKind::Missile, 2),
        _ => (600.0, 400.0, WeaponKind::Gatling, 1),
    }
}

/// Blueprint names with built-in stats.
pub const STOCK_BLUEPRINTS: [&str; 8] = [
    "CommandCenter",
    "PowerNode",
    "MiningPlatform",
    "AssaultShipyard",
    "DestroyerShipyard",
    "CarrierShipyard",
    "Turret",
    "Missiles",
];

// ============================================================================
// Building
// ============================================================================

/// A building in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Unique id, assigned by the registry.
    pub id: BuildingId,
    /// Display name.
    pub name: String,
    /// Stats group this building was created from.
    pub blueprint: String,
    /// Center position.
    pub position: Vec2,
    /// Footprint size.
    pub size: Vec2,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Flat damage reduction per hit.
    pub armor: i32,
    /// Purchase price.
    pub price: Price,
    /// Energy consumed per tick when powered.
    pub consumption: f32,
    /// Minimum power link distance.
    pub min_distance: f32,
    /// Maximum power link distance.
    pub max_distance: f32,
    /// Current upgrade level.
    pub level: u32,
    /// Upgrade level cap.
    pub max_level: u32,
    /// Health (and energy) gained per upgrade, times the new level.
    pub upgrade_magnitude: i32,
    /// Buildings fed by this one, in link order.
    pub neighbors: Vec<BuildingId>,
    /// Whether the building received power this tick.
    pub powered: bool,
    /// Construction progress.
    pub construction: ConstructionState,
    /// Variant behaviour.
    pub kind: BuildingKind,
    dead: bool,
}

impl RegistryEntry for Building {
    fn entry_id(&self) -> u32 {
        self.id.0
    }

    fn assign_id(&mut self, id: u32) {
        self.id = BuildingId(id);
    }
}

impl Building {
    /// Create a building from the stats group `blueprint`.
    ///
    /// Keys: `Type`, `Name`, `Health`, `Armor`, `ConsumptionRate`,
    /// `MaxUpgradeLevels`, `UpgradeMagnitude`, `MinConnDist`, `MaxConnDist`,
    /// `Price`, `Size`, plus the variant keys (`MaxConnections`,
    /// `MaxEnergy`, `Capacity`, `CoolDown`, `ShipConfig`, `AlertRadius`,
    /// `FireRadius`, `NumGuns`, `GunType`). Unknown types build a plain
    /// consumer. The building starts under construction and unpowered.
    #[must_use]
    pub fn from_blueprint(blueprint: &str, position: Vec2, stats: &dyn StatsProvider) -> Self {
        let stock = stock_blueprint(blueprint);
        let group = blueprint;

        let type_name = stats.get_string(group, "Type", stock.type_name).to_lowercase();
        let kind = match type_name.as_str() {
            "powernode" => BuildingKind::PowerNode {
                max_connections: stats
                    .get_int(group, "MaxConnections", POWER_NODE_MAX_CONNECTIONS as i64)
                    .max(0) as usize,
            },
            "commandcenter" => {
                let max_energy = stats.get_float(group, "MaxEnergy", 100.0).max(0.0);
                BuildingKind::CommandCenter {
                    max_connections: stats
                        .get_int(group, "MaxConnections", COMMAND_CENTER_MAX_CONNECTIONS as i64)
                        .max(0) as usize,
                    max_energy,
                    remaining_energy: max_energy,
                }
            }
            "shipyard" => BuildingKind::Shipyard(load_shipyard(group, stats)),
            "turret" => BuildingKind::Turret(load_turret(group, stats)),
            "plain" => BuildingKind::Plain,
            other => {
                tracing::debug!(blueprint, building_type = other, "Unrecognised building type, using plain");
                BuildingKind::Plain
            }
        };

        let health = stats.get_int(group, "Health", i64::from(stock.health)).max(1) as i32;
        let price = stats.get_vec2(
            group,
            "Price",
            Vec2::new(stock.price.0 as f32, stock.price.1 as f32),
        );

        Self {
            id: BuildingId(0),
            name: stats.get_string(group, "Name", stock.name),
            blueprint: blueprint.to_string(),
            position,
            size: stats.get_vec2(group, "Size", Vec2::new(stock.size.0, stock.size.1)),
            health,
            max_health: health,
            armor: stats.get_int(group, "Armor", i64::from(stock.armor)).max(0) as i32,
            price: Price::new(price.x.max(0.0) as i32, price.y.max(0.0) as i32),
            consumption: stats.get_float(group, "ConsumptionRate", stock.consumption).max(0.0),
            min_distance: stats.get_float(group, "MinConnDist", stock.connection.0),
            max_distance: stats.get_float(group, "MaxConnDist", stock.connection.1),
            level: 0,
            max_level: stats
                .get_int(group, "MaxUpgradeLevels", i64::from(stock.max_level))
                .max(0) as u32,
            upgrade_magnitude: stats
                .get_int(group, "UpgradeMagnitude", i64::from(stock.magnitude))
                .max(0) as i32,
            neighbors: Vec::new(),
            powered: false,
            construction: ConstructionState::UnderConstruction(0.0),
            kind,
            dead: false,
        }
    }

    /// Mark construction as finished.
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.construction = ConstructionState::Complete;
        self
    }

    /// Whether the building has been destroyed.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Whether the building is still under construction.
    #[must_use]
    pub const fn is_constructing(&self) -> bool {
        matches!(self.construction, ConstructionState::UnderConstruction(_))
    }

    /// Power nodes and command centers relay power.
    #[must_use]
    pub const fn is_power_node(&self) -> bool {
        matches!(
            self.kind,
            BuildingKind::PowerNode { .. } | BuildingKind::CommandCenter { .. }
        )
    }

    /// Whether this building is a power source.
    #[must_use]
    pub const fn is_command_center(&self) -> bool {
        matches!(self.kind, BuildingKind::CommandCenter { .. })
    }

    /// Outgoing link limit; zero for consumers.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        match self.kind {
            BuildingKind::PowerNode { max_connections }
            | BuildingKind::CommandCenter {
                max_connections, ..
            } => max_connections,
            _ => 0,
        }
    }

    /// Whether this node can feed another building.
    #[must_use]
    pub fn has_open_connections(&self) -> bool {
        self.is_power_node() && self.neighbors.len() < self.max_connections()
    }

    /// Whether turret/shipyard behaviour runs this tick.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.powered && !self.is_constructing()
    }

    /// Whether a link of length `distance` is inside this building's bounds.
    #[must_use]
    pub fn accepts_link_distance(&self, distance: f32) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }

    /// Add an outgoing power link. Fails for consumers, duplicates and full nodes.
    pub fn add_neighbor(&mut self, neighbor: BuildingId) -> bool {
        if !self.has_open_connections() || self.neighbors.contains(&neighbor) {
            return false;
        }
        self.neighbors.push(neighbor);
        true
    }

    /// Advance construction. Returns `true` on the tick it completes.
    pub fn advance_construction(&mut self, dt: f32) -> bool {
        if let ConstructionState::UnderConstruction(elapsed) = self.construction {
            let elapsed = elapsed + dt;
            if elapsed >= CONSTRUCTION_TIME {
                self.construction = ConstructionState::Complete;
                return true;
            }
            self.construction = ConstructionState::UnderConstruction(elapsed);
        }
        false
    }

    /// Apply a hit. Armor is subtracted first; returns `true` if this hit destroyed it.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if self.dead {
            return false;
        }
        let damage = (damage - self.armor).max(0);
        self.health = (self.health - damage).max(0);
        if self.health <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Destroy the building outright.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// Try to draw this building's consumption from `available`.
    ///
    /// Returns the energy left. When `available` cannot cover the
    /// consumption the building is unpowered and nothing is drawn.
    pub fn consume_energy(&mut self, available: f32) -> f32 {
        let remainder = available - self.consumption;
        if remainder < 0.0 {
            self.powered = false;
            available
        } else {
            self.powered = true;
            remainder
        }
    }

    /// Raise the upgrade level. Returns `false` at the cap.
    pub fn upgrade(&mut self) -> bool {
        if self.level >= self.max_level {
            return false;
        }
        self.level += 1;
        let gain = self.upgrade_magnitude * self.level as i32;
        self.max_health += gain;
        self.health += gain;

        let level = self.level;
        let max_level = self.max_level;
        match &mut self.kind {
            BuildingKind::CommandCenter {
                max_energy,
                remaining_energy,
                ..
            } if level < max_level => {
                *max_energy += gain as f32;
                *remaining_energy += gain as f32;
            }
            BuildingKind::Turret(turret) => {
                turret.fire_radius += level as f32;
            }
            _ => {}
        }
        true
    }

    /// Mutable shipyard data, if this is a shipyard.
    pub fn shipyard_mut(&mut self) -> Option<&mut ShipyardData> {
        match &mut self.kind {
            BuildingKind::Shipyard(data) => Some(data),
            _ => None,
        }
    }

    /// Shipyard data, if this is a shipyard.
    #[must_use]
    pub const fn shipyard(&self) -> Option<&ShipyardData> {
        match &self.kind {
            BuildingKind::Shipyard(data) => Some(data),
            _ => None,
        }
    }

    /// Turret data, if this is a turret.
    #[must_use]
    pub const fn turret(&self) -> Option<&TurretData> {
        match &self.kind {
            BuildingKind::Turret(data) => Some(data),
            _ => None,
        }
    }

    /// Turret engagement for one tick.
    ///
    /// `target` is the nearest enemy inside the alert radius, if any.
    /// Guns cool down, track the target and fire once it is inside the
    /// fire radius. Shots belong to the player faction and have no owner.
    pub fn update_turret(&mut self, dt: f32, target: Option<(ShipId, Vec2)>) -> Vec<Projectile> {
        let position = self.position;
        let BuildingKind::Turret(turret) = &mut self.kind else {
            return Vec::new();
        };

        for gun in &mut turret.guns {
            gun.advance(dt);
        }

        turret.target = target.map(|(id, _)| id);
        let Some((_, target_position)) = target else {
            return Vec::new();
        };
        if position.distance(target_position) > turret.fire_radius {
            return Vec::new();
        }

        turret
            .guns
            .iter_mut()
            .filter_map(|gun| gun.try_fire(position, target_position, None, Faction::Player))
            .collect()
    }
}

fn load_shipyard(group: &str, stats: &dyn StatsProvider) -> ShipyardData {
    let (stock_kind, stock_capacity, stock_cooldown) = stock_shipyard(group);
    let ship_name = stats.get_string(group, "ShipConfig", &stock_kind.stat_group());
    let ship_kind = ShipKind::from_name(&ship_name).unwrap_or_else(|| {
        tracing::warn!(group, ship = %ship_name, "Unknown shipyard ship, building miners");
        ShipKind::Miner
    });
    let cooldown = stats.get_float(group, "CoolDown", stock_cooldown).max(0.0);
    ShipyardData {
        ship_kind,
        capacity: stats.get_int(group, "Capacity", stock_capacity).max(0) as usize,
        cooldown,
        timer: cooldown,
        queue: VecDeque::new(),
        pool: Vec::new(),
    }
}

fn load_turret(group: &str, stats: &dyn StatsProvider) -> TurretData {
    let (alert, fire, stock_gun, stock_count) = stock_turret(group);
    let gun_name = stats.get_string(group, "GunType", stock_gun.name());
    let gun_kind = WeaponKind::from_name(&gun_name).unwrap_or_else(|| {
        tracing::warn!(group, gun = %gun_name, "Unknown turret gun, using stock");
        stock_gun
    });
    let count = stats.get_int(group, "NumGuns", stock_count).max(0) as usize;
    TurretData {
        guns: (0..count)
            .map(|_| load_weapon(gun_kind, Vec2::ZERO, stats))
            .collect(),
        alert_radius: stats.get_float(group, "AlertRadius", alert).max(0.0),
        fire_radius: stats.get_float(group, "FireRadius", fire).max(0.0),
        target: None,
    }
}

// ============================================================================
// Shipyard behaviour
// ============================================================================

impl ShipyardData {
    /// Whether another order can be queued.
    #[must_use]
    pub fn can_queue(&self) -> bool {
        self.pool.len() < self.capacity && self.queue.len() < self.capacity
    }

    /// Queue a ship to launch at the yard position plus `offset`.
    ///
    /// Resets the launch timer to the full cooldown.
    pub fn queue_ship(&mut self, offset: Vec2) -> bool {
        if !self.can_queue() {
            return false;
        }
        self.queue.push_back(offset);
        self.timer = self.cooldown;
        true
    }

    /// Advance the launch timer. Returns the launch offset when a ship is due.
    ///
    /// A full pool holds the timer just above zero so the next ship launches
    /// as soon as a slot frees up.
    pub fn update(&mut self, dt: f32) -> Option<Vec2> {
        if self.queue.is_empty() {
            return None;
        }

        if self.pool.len() >= self.capacity {
            self.timer = SHIPYARD_HOLD_TIMER;
        } else {
            self.timer -= dt;
        }

        if self.timer > 0.0 {
            return None;
        }
        self.timer = self.cooldown;
        if self.pool.len() < self.capacity {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Record a launched ship.
    pub fn record_launch(&mut self, ship: ShipId) {
        self.pool.push(ship);
    }

    /// Drop pool entries for ships that no longer exist.
    pub fn prune_pool(&mut self, mut alive: impl FnMut(ShipId) -> bool) {
        self.pool.retain(|&id| alive(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{StatCatalog, StatValue};

    fn stock(blueprint: &str) -> Building {
        Building::from_blueprint(blueprint, Vec2::ZERO, &StatCatalog::new())
    }

    #[test]
    fn test_factory_dispatches_on_type() {
        assert!(matches!(stock("PowerNode").kind, BuildingKind::PowerNode { max_connections: 4 }));
        assert!(matches!(
            stock("commandcenter").kind,
            BuildingKind::CommandCenter { max_connections: 6, .. }
        ));
        assert!(matches!(stock("MiningPlatform").kind, BuildingKind::Shipyard(_)));
        assert!(matches!(stock("Missiles").kind, BuildingKind::Turret(_)));
        assert!(matches!(stock("Habitat").kind, BuildingKind::Plain));
    }

    #[test]
    fn test_factory_reads_stats() {
        let stats = StatCatalog::new()
            .with("Refinery", "Type", StatValue::Text("Turret".into()))
            .with("Refinery", "Health", StatValue::Int(42))
            .with("Refinery", "Price", StatValue::Vec2(75.0, 10.0))
            .with("Refinery", "NumGuns", StatValue::Int(3));
        let building = Building::from_blueprint("Refinery", Vec2::new(1.0, 2.0), &stats);

        assert_eq!(building.max_health, 42);
        assert_eq!(building.price, Price::new(75, 10));
        assert_eq!(building.turret().map(|t| t.guns.len()), Some(3));
        assert!(building.is_constructing());
        assert!(!building.powered);
    }

    #[test]
    fn test_unrecognised_type_is_plain() {
        let stats = StatCatalog::new().with("Odd", "Type", StatValue::Text("teleporter".into()));
        let building = Building::from_blueprint("Odd", Vec2::ZERO, &stats);
        assert_eq!(building.kind, BuildingKind::Plain);
    }

    #[test]
    fn test_armor_reduces_damage() {
        let mut building = stock("Turret");
        let health = building.health;

        assert!(!building.take_damage(2));
        assert_eq!(building.health, health);

        assert!(!building.take_damage(10));
        assert_eq!(building.health, health - 7);
    }

    #[test]
    fn test_building_dies_at_zero_health() {
        let mut building = stock("PowerNode");
        assert!(building.take_damage(10_000));
        assert_eq!(building.health, 0);
        assert!(building.is_dead());
        // Already dead: no second death
        assert!(!building.take_damage(10_000));
    }

    #[test]
    fn test_construction_takes_three_seconds() {
        let mut building = stock("Turret");
        assert!(!building.advance_construction(1.5));
        assert!(!building.advance_construction(1.4));
        assert!(building.advance_construction(0.2));
        assert!(!building.is_constructing());
        assert!(!building.advance_construction(1.0));
    }

    #[test]
    fn test_consume_energy() {
        let mut building = stock("AssaultShipyard");
        assert_eq!(building.consume_energy(50.0), 30.0);
        assert!(building.powered);

        assert_eq!(building.consume_energy(5.0), 5.0);
        assert!(!building.powered);
    }

    #[test]
    fn test_upgrade_adds_health_per_level() {
        let mut building = stock("Turret");
        let base = building.max_health;
        let radius = building.turret().map(|t| t.fire_radius).unwrap_or_default();

        assert!(building.upgrade());
        assert!(building.upgrade());
        assert_eq!(building.level, 2);
        assert_eq!(building.max_health, base + 40 + 80);
        assert_eq!(building.turret().map(|t| t.fire_radius), Some(radius + 3.0));

        assert!(building.upgrade());
        assert!(!building.upgrade());
        assert_eq!(building.level, 3);
    }

    #[test]
    fn test_command_center_energy_upgrade_stops_at_cap() {
        let mut building = stock("CommandCenter");

        building.upgrade();
        building.upgrade();
        building.upgrade();

        let BuildingKind::CommandCenter { max_energy, .. } = building.kind else {
            panic!("not a command center");
        };
        // Level 1 (+100) and 2 (+200) add energy, level 3 reaches the cap
        assert_eq!(max_energy, 400.0);
    }

    #[test]
    fn test_power_node_slots() {
        let mut node = stock("PowerNode");
        for id in 1..=4 {
            assert!(node.add_neighbor(BuildingId(id)));
        }
        assert!(!node.add_neighbor(BuildingId(5)));
        assert!(!stock("Turret").add_neighbor(BuildingId(1)));
    }

    #[test]
    fn test_duplicate_neighbor_is_rejected() {
        let mut node = stock("PowerNode");
        assert!(node.add_neighbor(BuildingId(9)));
        assert!(!node.add_neighbor(BuildingId(9)));
    }

    #[test]
    fn test_shipyard_launch_cycle() {
        let mut yard = stock("MiningPlatform");
        let data = yard.shipyard_mut().expect("shipyard");
        data.cooldown = 2.0;

        assert!(data.queue_ship(Vec2::new(10.0, 10.0)));
        assert_eq!(data.timer, 2.0);
        assert_eq!(data.update(1.0), None);
        assert_eq!(data.update(1.0), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(data.timer, 2.0);
        assert_eq!(data.update(5.0), None);
    }

    #[test]
    fn test_full_pool_holds_launch() {
        let mut yard = stock("CarrierShipyard");
        let data = yard.shipyard_mut().expect("shipyard");
        data.record_launch(ShipId(1));
        assert!(data.queue_ship(Vec2::ZERO));
        data.record_launch(ShipId(2));

        // Pool full (capacity 2)
        assert!(!data.can_queue());
        assert_eq!(data.update(100.0), None);
        assert_eq!(data.timer, SHIPYARD_HOLD_TIMER);

        data.prune_pool(|id| id != ShipId(1));
        assert_eq!(data.update(0.01), Some(Vec2::ZERO));
    }

    #[test]
    fn test_turret_fires_inside_fire_radius() {
        let mut turret = stock("Turret");
        let mut shots = turret.update_turret(1.0, Some((ShipId(4), Vec2::new(500.0, 0.0))));
        // Inside alert, outside fire radius
        assert!(shots.is_empty());
        assert_eq!(turret.turret().and_then(|t| t.target), Some(ShipId(4)));

        shots = turret.update_turret(1.0, Some((ShipId(4), Vec2::new(300.0, 0.0))));
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].owner, None);
        assert_eq!(shots[0].faction, Faction::Player);
    }
}
