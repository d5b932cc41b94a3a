//! World tick orchestrator.
//!
//! [`WorldContext`] owns every registry, the resource pool, the wave queue,
//! the win/loss evaluator and the seeded RNG. One call to
//! [`WorldContext::tick`] runs a full pass over every subsystem in a fixed
//! order; player input arrives as [`PlayerAction`] values between ticks.
//!
//! # Determinism
//!
//! - All randomness comes from the world's `ChaCha8Rng`
//! - Registries iterate in id order
//! - The same level, seed, frame times and actions produce the same state
//!
//! # Example
//!
//! ```
//! use spacedef_core::level::LevelDescriptor;
//! use spacedef_core::stats::StatCatalog;
//! use spacedef_core::world::WorldContext;
//!
//! let level = LevelDescriptor::default();
//! let mut world = WorldContext::from_level(&level, StatCatalog::new(), 7).unwrap();
//! let events = world.tick(1.0 / 60.0);
//! // An empty level has nothing to defend
//! assert!(events.outcome.is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{self, BehaviorContext, MINER_CLOCK_SPREAD};
use crate::buildings::{Building, BuildingId, MAX_BUILDINGS};
use crate::combat::{self, HitEvent};
use crate::economy::ResourcePool;
use crate::error::{ActionError, GameError, Result};
use crate::factions::Faction;
use crate::level::{LevelDescriptor, DEFAULT_HALF_WIDTH};
use crate::math::Vec2;
use crate::names::NameGenerator;
use crate::power;
use crate::presentation::AmbientMode;
use crate::projectiles::Projectile;
use crate::registry::Registry;
use crate::scenery::SceneryField;
use crate::ships::{separation_push, Ship, ShipClass, ShipId, ShipKind, ShipSnapshot};
use crate::spawner::{WaveScheduler, SPAWN_JITTER};
use crate::stats::StatCatalog;
use crate::victory::{GameOutcome, GameState, VictoryEvaluator, VictorySnapshot};
use crate::weapons::WeaponKind;

/// Launch offset for ships queued by the player.
pub const QUEUE_OFFSET: Vec2 = Vec2::new(10.0, 10.0);

// ============================================================================
// Speed and actions
// ============================================================================

/// Play speed multiplier applied to every subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameSpeed {
    /// ×1.
    #[default]
    Normal,
    /// ×2.
    Fast,
    /// ×4.
    Faster,
}

impl GameSpeed {
    /// The dt multiplier.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Fast => 2.0,
            Self::Faster => 4.0,
        }
    }
}

/// Something the player asked the world to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Buy and place a building from a stats group.
    PlaceBuilding {
        /// Stats group of the building.
        blueprint: String,
        /// Center position.
        position: Vec2,
    },
    /// Sell a finished building for its full price.
    Sell(BuildingId),
    /// Cancel a building under construction for 80% of its price.
    CancelConstruction(BuildingId),
    /// Raise a building's upgrade level.
    Upgrade(BuildingId),
    /// Queue a ship at a shipyard.
    QueueShip(BuildingId),
    /// Change play speed.
    SetSpeed(GameSpeed),
    /// Pause or resume.
    SetPaused(bool),
}

/// What an accepted action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A building was placed.
    Placed {
        /// New building id.
        id: BuildingId,
        /// Number of power links created.
        links: usize,
    },
    /// A building was sold.
    Sold {
        /// Minerals returned to the pool.
        refund: i32,
    },
    /// Construction was cancelled.
    Cancelled {
        /// Minerals returned to the pool.
        refund: i32,
    },
    /// A building was upgraded.
    Upgraded {
        /// New level.
        level: u32,
    },
    /// A ship was queued.
    ShipQueued {
        /// Orders now waiting at the yard.
        queued: usize,
    },
    /// Play speed changed.
    SpeedChanged(GameSpeed),
    /// Pause state changed.
    PauseChanged(bool),
}

// ============================================================================
// Tick events
// ============================================================================

/// A weapon discharge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiredShot {
    /// Muzzle position.
    pub position: Vec2,
    /// Weapon kind.
    pub kind: WeaponKind,
    /// Side that fired.
    pub faction: Faction,
}

impl From<&Projectile> for FiredShot {
    fn from(projectile: &Projectile) -> Self {
        Self {
            position: projectile.position,
            kind: projectile.kind,
            faction: projectile.faction,
        }
    }
}

/// A ship removed this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipDeath {
    /// Ship id.
    pub id: ShipId,
    /// Kind.
    pub kind: ShipKind,
    /// Faction.
    pub faction: Faction,
    /// Where it died.
    pub position: Vec2,
}

/// A building removed this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingDeath {
    /// Building id.
    pub id: BuildingId,
    /// Stats group.
    pub blueprint: String,
    /// Where it stood.
    pub position: Vec2,
}

/// A wave released this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSpawned {
    /// 1-based wave number.
    pub wave: u32,
    /// Spawn point before jitter.
    pub position: Vec2,
    /// Ships spawned.
    pub ships: usize,
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Weapons fired.
    pub shots: Vec<FiredShot>,
    /// Projectile impacts.
    pub hits: Vec<HitEvent>,
    /// Ships removed.
    pub ship_deaths: Vec<ShipDeath>,
    /// Buildings removed.
    pub building_deaths: Vec<BuildingDeath>,
    /// Explosion positions.
    pub explosions: Vec<Vec2>,
    /// Ships created by waves and shipyards.
    pub ships_spawned: Vec<ShipId>,
    /// Waves released.
    pub waves: Vec<WaveSpawned>,
    /// Buildings that finished construction.
    pub constructions_completed: Vec<BuildingId>,
    /// Minerals unloaded into the pool.
    pub minerals_delivered: i32,
    /// New ambient mode, when it changed.
    pub ambient_changed: Option<AmbientMode>,
    /// Terminal outcome, on the tick the level ends.
    pub outcome: Option<GameOutcome>,
}

// ============================================================================
// World
// ============================================================================

/// The whole simulation state of one level.
///
/// # Tick order
///
/// 1. **Waves** - release at most one spawn group
/// 2. **Ships** - physics, separation, AI, weapons
/// 3. **Power** - redistribute command center energy
/// 4. **Buildings** - construction, turrets, shipyards
/// 5. **Projectiles** - movement and hits
/// 6. **Deaths** - remove the dead, explosions and debris
/// 7. **Scenery** - debris drift
/// 8. **Ambient** - back to calm when no enemies remain
/// 9. **Victory** - win/loss evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldContext {
    tick: u64,
    elapsed: f32,
    half_width: f32,
    ships: Registry<Ship>,
    buildings: Registry<Building>,
    projectiles: Vec<Projectile>,
    next_projectile: u64,
    scenery: SceneryField,
    pool: ResourcePool,
    waves: WaveScheduler,
    victory: VictoryEvaluator,
    speed: GameSpeed,
    paused: bool,
    ambient: AmbientMode,
    names: NameGenerator,
    stats: StatCatalog,
    rng: ChaCha8Rng,
}

impl Default for WorldContext {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_WIDTH, 0)
    }
}

impl WorldContext {
    /// Create an empty world of half-width `half_width`.
    #[must_use]
    pub fn new(half_width: f32, seed: u64) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            half_width,
            ships: Registry::new(),
            buildings: Registry::new(),
            projectiles: Vec::new(),
            next_projectile: 1,
            scenery: SceneryField::new(),
            pool: ResourcePool::default(),
            waves: WaveScheduler::default(),
            victory: VictoryEvaluator::default(),
            speed: GameSpeed::Normal,
            paused: false,
            ambient: AmbientMode::Calm,
            names: NameGenerator::new(),
            stats: StatCatalog::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Build the starting state of a level.
    ///
    /// Starting buildings are placed for free and linked into the grid in
    /// descriptor order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidLevel`] if the descriptor fails validation.
    pub fn from_level(level: &LevelDescriptor, stats: StatCatalog, seed: u64) -> Result<Self> {
        level.validate()?;

        let mut world = Self::new(level.half_width, seed);
        world.stats = stats;
        world.pool = ResourcePool::with_available(level.starting_minerals, level.max_minerals);
        world.waves = WaveScheduler::new(level.spawn_groups.clone());
        world.victory = VictoryEvaluator::new(level.win_condition);

        for node in &level.resources {
            world.scenery.add_mineral(node.position, node.radius, node.minerals);
        }
        for &position in &level.junk {
            let rotation = world.rng.gen_range(-std::f32::consts::PI..=std::f32::consts::PI);
            world.scenery.add_junk(position, rotation);
        }

        let mut placed = Vec::with_capacity(level.starting_buildings.len());
        for start in &level.starting_buildings {
            let mut building = Building::from_blueprint(&start.blueprint, start.position, &world.stats);
            if start.complete {
                building = building.completed();
            }
            let id = BuildingId(world.buildings.insert(building));
            power::connect(&mut world.buildings, id);
            placed.push(id);
        }

        for start in &level.starting_ships {
            let home = start.home.and_then(|index| placed.get(index).copied());
            world.spawn_ship(start.kind, start.position, home);
        }

        tracing::info!(
            level = %level.name,
            buildings = world.buildings.len(),
            ships = world.ships.len(),
            waves = world.waves.remaining(),
            "Level loaded"
        );
        Ok(world)
    }

    /// Create a ship with stats from the world's catalog.
    ///
    /// Miners get a random clock offset. A ship with a `home` shipyard is
    /// recorded in that yard's pool.
    pub fn spawn_ship(&mut self, kind: ShipKind, position: Vec2, home: Option<BuildingId>) -> ShipId {
        let class = ShipClass::load(kind, &self.stats);
        let name = self.names.generate(&mut self.rng);
        let mut ship = Ship::new(kind, &class, position, name);
        if kind == ShipKind::Miner {
            ship = ship.with_clock(self.rng.gen_range(-MINER_CLOCK_SPREAD..=MINER_CLOCK_SPREAD));
        }
        if let Some(home) = home {
            ship = ship.with_home(home);
        }

        let id = ShipId(self.ships.insert(ship));
        if let Some(yard) = home
            .and_then(|home| self.buildings.get_mut(home.0))
            .and_then(Building::shipyard_mut)
        {
            yard.record_launch(id);
        }
        id
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Number of ticks run.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since level start.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Arena half-width.
    #[must_use]
    pub const fn half_width(&self) -> f32 {
        self.half_width
    }

    /// All ships.
    #[must_use]
    pub const fn ships(&self) -> &Registry<Ship> {
        &self.ships
    }

    /// A ship by id.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id.0)
    }

    /// All buildings.
    #[must_use]
    pub const fn buildings(&self) -> &Registry<Building> {
        &self.buildings
    }

    /// A building by id.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.0)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Minerals, junk and debris.
    #[must_use]
    pub const fn scenery(&self) -> &SceneryField {
        &self.scenery
    }

    /// The mineral pool.
    #[must_use]
    pub const fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// The wave queue.
    #[must_use]
    pub const fn waves(&self) -> &WaveScheduler {
        &self.waves
    }

    /// Running or over.
    #[must_use]
    pub const fn game_state(&self) -> GameState {
        self.victory.state()
    }

    /// Current play speed.
    #[must_use]
    pub const fn speed(&self) -> GameSpeed {
        self.speed
    }

    /// Whether ticks are suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current ambient mode.
    #[must_use]
    pub const fn ambient(&self) -> AmbientMode {
        self.ambient
    }

    /// Stats used for new entities.
    #[must_use]
    pub const fn stats(&self) -> &StatCatalog {
        &self.stats
    }

    /// Live enemy ships.
    #[must_use]
    pub fn enemy_count(&self) -> usize {
        self.ships
            .iter()
            .filter(|s| !s.is_dead() && s.faction.is_enemy())
            .count()
    }

    /// Live miners, fighters, destroyers and carriers.
    #[must_use]
    pub fn player_fleet_count(&self) -> usize {
        self.ships
            .iter()
            .filter(|s| !s.is_dead() && s.kind.is_player_fleet())
            .count()
    }

    /// Live buildings.
    #[must_use]
    pub fn building_count(&self) -> usize {
        self.buildings.iter().filter(|b| !b.is_dead()).count()
    }

    fn consumer_count(&self) -> usize {
        self.buildings
            .iter()
            .filter(|b| !b.is_dead() && !b.is_power_node())
            .count()
    }

    /// Buildings that a `blueprint` placed at `position` would link to.
    #[must_use]
    pub fn preview_connections(&self, blueprint: &str, position: Vec2) -> Vec<BuildingId> {
        let preview = Building::from_blueprint(blueprint, position, &self.stats);
        power::link_candidates(&self.buildings, &preview)
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advance the world by one frame of `frame_dt` seconds.
    ///
    /// `frame_dt` is scaled by the play speed. A paused or finished world,
    /// or a non-positive `frame_dt`, leaves the state untouched.
    pub fn tick(&mut self, frame_dt: f32) -> TickEvents {
        let mut events = TickEvents::default();
        if self.paused || self.victory.is_over() || frame_dt.is_nan() || frame_dt <= 0.0 {
            return events;
        }

        let dt = frame_dt * self.speed.multiplier();
        self.elapsed += dt;
        let ambient_before = self.ambient;

        // 1. Waves
        self.run_spawner(&mut events);

        // 2. Ships
        self.run_ships(dt, &mut events);

        // 3. Power
        power::distribute(&mut self.buildings);

        // 4. Buildings
        self.run_buildings(dt, &mut events);

        // 5. Projectiles
        events.hits = combat::resolve_projectiles(
            &mut self.projectiles,
            &mut self.ships,
            &mut self.buildings,
            self.half_width,
            dt,
        );

        // 6. Deaths
        self.run_deaths(&mut events);

        // 7. Scenery
        self.scenery.update(dt, self.half_width);

        // 8. Ambient
        if self.ambient == AmbientMode::Combat && self.enemy_count() == 0 {
            self.ambient = AmbientMode::Calm;
        }
        if self.ambient != ambient_before {
            events.ambient_changed = Some(self.ambient);
        }

        // 9. Victory
        let snapshot = self.victory_snapshot();
        if let Some(outcome) = self.victory.evaluate(&snapshot) {
            self.paused = true;
            tracing::info!(tick = self.tick, elapsed = self.elapsed, ?outcome, "Game over");
            events.outcome = Some(outcome);
        }

        self.tick += 1;

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "World state hash");
        }

        events
    }

    fn run_spawner(&mut self, events: &mut TickEvents) {
        let Some(group) = self.waves.poll(self.elapsed) else {
            return;
        };

        let mut spawned = Vec::with_capacity(group.size() as usize);
        for (tier, &count) in (0u8..).zip(group.counts.iter()) {
            for _ in 0..count {
                let jitter = Vec2::new(
                    self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                    self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                );
                spawned.push(self.spawn_ship(ShipKind::Enemy(tier), group.position + jitter, None));
            }
        }

        self.ambient = AmbientMode::Combat;
        let wave = self.waves.released();
        tracing::info!(wave, ships = spawned.len(), remaining = self.waves.remaining(), "Wave spawned");
        events.waves.push(WaveSpawned {
            wave,
            position: group.position,
            ships: spawned.len(),
        });
        events.ships_spawned.extend(spawned);
    }

    fn run_ships(&mut self, dt: f32, events: &mut TickEvents) {
        let snapshots: Vec<ShipSnapshot> = self
            .ships
            .iter()
            .filter(|s| !s.is_dead())
            .map(ShipSnapshot::from)
            .collect();
        let pushes: Vec<Vec2> = snapshots
            .iter()
            .map(|s| separation_push(s.id, s.position, &snapshots, dt))
            .collect();

        let ctx = BehaviorContext {
            ships: &snapshots,
            buildings: &self.buildings,
            half_width: self.half_width,
        };

        for (ship, push) in self.ships.iter_mut().filter(|s| !s.is_dead()).zip(pushes) {
            ship.integrate(dt);
            ship.position += push;

            let output = ai::run_behavior(ship, &ctx, &mut self.scenery, &mut self.pool, dt);
            events.minerals_delivered += output.delivered;
            for mut shot in output.shots {
                shot.id = self.next_projectile;
                self.next_projectile += 1;
                events.shots.push(FiredShot::from(&shot));
                self.projectiles.push(shot);
            }
        }
    }

    fn run_buildings(&mut self, dt: f32, events: &mut TickEvents) {
        let enemies: Vec<(ShipId, Vec2)> = self
            .ships
            .iter()
            .filter(|s| !s.is_dead() && s.faction.is_enemy())
            .map(|s| (s.id, s.position))
            .collect();
        let ships = &self.ships;
        let mut launches = Vec::new();

        for building in self.buildings.iter_mut().filter(|b| !b.is_dead()) {
            let id = building.id;
            let position = building.position;

            if building.advance_construction(dt) {
                tracing::debug!(building = id.0, name = %building.name, "Construction complete");
                events.constructions_completed.push(id);
            }
            if let Some(yard) = building.shipyard_mut() {
                yard.prune_pool(|ship| ships.get(ship.0).is_some_and(|s| !s.is_dead()));
            }
            if !building.is_active() {
                continue;
            }

            if let Some(alert_radius) = building.turret().map(|t| t.alert_radius) {
                let target = turret_target(&enemies, position, alert_radius);
                for mut shot in building.update_turret(dt, target) {
                    shot.id = self.next_projectile;
                    self.next_projectile += 1;
                    events.shots.push(FiredShot::from(&shot));
                    self.projectiles.push(shot);
                }
            }

            if let Some(yard) = building.shipyard_mut() {
                if let Some(offset) = yard.update(dt) {
                    launches.push((id, yard.ship_kind, position + offset));
                }
            }
        }

        for (home, kind, position) in launches {
            let ship = self.spawn_ship(kind, position, Some(home));
            tracing::debug!(shipyard = home.0, ship = ship.0, ?kind, "Ship launched");
            events.ships_spawned.push(ship);
        }
    }

    fn run_deaths(&mut self, events: &mut TickEvents) {
        for building in self.buildings.drain_where(Building::is_dead) {
            power::disconnect(&mut self.buildings, building.id);
            if let Some(yard) = building.shipyard() {
                for ship in &yard.pool {
                    if let Some(ship) = self.ships.get_mut(ship.0) {
                        ship.kill();
                    }
                }
            }
            events
                .explosions
                .extend(combat::explode_building(&building, &mut self.rng));
            tracing::debug!(building = building.id.0, name = %building.name, "Building destroyed");
            events.building_deaths.push(BuildingDeath {
                id: building.id,
                blueprint: building.blueprint,
                position: building.position,
            });
        }

        for ship in self.ships.drain_where(Ship::is_dead) {
            events
                .explosions
                .extend(combat::explode_ship(&ship, &mut self.rng, &mut self.scenery));
            events.ship_deaths.push(ShipDeath {
                id: ship.id,
                kind: ship.kind,
                faction: ship.faction,
                position: ship.position,
            });
        }
    }

    fn victory_snapshot(&self) -> VictorySnapshot {
        VictorySnapshot {
            elapsed: self.elapsed,
            player_fleet: self.player_fleet_count(),
            buildings: self.building_count(),
            enemies: self.enemy_count(),
            waves_exhausted: self.waves.is_empty(),
            resources_consumed: self.scenery.all_resources_consumed(),
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        for ship in self.ships.iter() {
            debug_assert!(
                (0.0..=ship.max_shield).contains(&ship.shield),
                "ship {} shield out of bounds",
                ship.id.0
            );
            debug_assert!(
                (0.0..=ship.max_hull).contains(&ship.hull),
                "ship {} hull out of bounds",
                ship.id.0
            );
        }
        for building in self.buildings.iter() {
            debug_assert!(
                building.health <= building.max_health,
                "building {} health above max",
                building.id.0
            );
        }
        debug_assert!((0..=self.pool.max()).contains(&self.pool.available()));
    }

    // ------------------------------------------------------------------------
    // Player actions
    // ------------------------------------------------------------------------

    /// Apply a player action.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] when the action is refused. A refused
    /// action leaves the world as it was.
    pub fn apply_action(&mut self, action: PlayerAction) -> std::result::Result<ActionOutcome, ActionError> {
        if self.victory.is_over() {
            return Err(ActionError::GameOver);
        }

        match action {
            PlayerAction::PlaceBuilding { blueprint, position } => self.place_building(&blueprint, position),
            PlayerAction::Sell(id) => {
                let building = self.live_building(id)?;
                if building.is_constructing() {
                    return Err(ActionError::UnderConstruction(id));
                }
                let refund = building.price.sell_refund();
                self.remove_building(id);
                self.pool.add(refund);
                Ok(ActionOutcome::Sold { refund })
            }
            PlayerAction::CancelConstruction(id) => {
                let building = self.live_building(id)?;
                if !building.is_constructing() {
                    return Err(ActionError::NotUnderConstruction(id));
                }
                let refund = building.price.cancel_refund();
                self.remove_building(id);
                self.pool.add(refund);
                Ok(ActionOutcome::Cancelled { refund })
            }
            PlayerAction::Upgrade(id) => {
                self.live_building(id)?;
                let building = self
                    .buildings
                    .get_mut(id.0)
                    .ok_or(ActionError::BuildingNotFound(id))?;
                if !building.upgrade() {
                    return Err(ActionError::MaxLevel(id));
                }
                tracing::debug!(building = id.0, level = building.level, "Building upgraded");
                Ok(ActionOutcome::Upgraded {
                    level: building.level,
                })
            }
            PlayerAction::QueueShip(id) => {
                self.live_building(id)?;
                let yard = self
                    .buildings
                    .get_mut(id.0)
                    .and_then(Building::shipyard_mut)
                    .ok_or(ActionError::NotAShipyard(id))?;
                if !yard.queue_ship(QUEUE_OFFSET) {
                    return Err(ActionError::ShipyardFull(id));
                }
                Ok(ActionOutcome::ShipQueued {
                    queued: yard.queue.len(),
                })
            }
            PlayerAction::SetSpeed(speed) => {
                self.speed = speed;
                Ok(ActionOutcome::SpeedChanged(speed))
            }
            PlayerAction::SetPaused(paused) => {
                self.paused = paused;
                Ok(ActionOutcome::PauseChanged(paused))
            }
        }
    }

    fn live_building(&self, id: BuildingId) -> std::result::Result<&Building, ActionError> {
        self.buildings
            .get(id.0)
            .filter(|b| !b.is_dead())
            .ok_or(ActionError::BuildingNotFound(id))
    }

    fn place_building(
        &mut self,
        blueprint: &str,
        position: Vec2,
    ) -> std::result::Result<ActionOutcome, ActionError> {
        let building = Building::from_blueprint(blueprint, position, &self.stats);
        if !building.is_power_node() && self.consumer_count() >= MAX_BUILDINGS {
            return Err(ActionError::BuildingLimit {
                limit: MAX_BUILDINGS,
            });
        }

        let available = self.pool.available();
        if !self.pool.purchase(building.price) {
            return Err(ActionError::InsufficientMinerals {
                required: building.price.minerals,
                available,
            });
        }

        let id = BuildingId(self.buildings.insert(building));
        let links = power::connect(&mut self.buildings, id).len();
        tracing::debug!(building = id.0, blueprint, links, "Building placed");
        Ok(ActionOutcome::Placed { id, links })
    }

    fn remove_building(&mut self, id: BuildingId) {
        power::disconnect(&mut self.buildings, id);
        self.buildings.remove(id.0);
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Serialize the world to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize world: {e}")))
    }

    /// Hash of the full world state.
    ///
    /// Two worlds with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        match self.snapshot() {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => tracing::warn!(error = %e, "State hash without snapshot"),
        }
        hasher.finish()
    }
}

/// Nearest enemy strictly inside a turret's alert radius.
fn turret_target(enemies: &[(ShipId, Vec2)], position: Vec2, alert_radius: f32) -> Option<(ShipId, Vec2)> {
    enemies
        .iter()
        .filter(|(_, p)| p.distance(position) < alert_radius)
        .min_by(|a, b| {
            a.1.distance_squared(position)
                .total_cmp(&b.1.distance_squared(position))
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{ResourceNode, StartingBuilding, StartingShip};
    use crate::spawner::SpawnGroup;
    use crate::victory::{WinCondition, WinReason};

    fn outpost() -> LevelDescriptor {
        LevelDescriptor {
            starting_buildings: vec![
                StartingBuilding {
                    blueprint: "CommandCenter".to_string(),
                    position: Vec2::ZERO,
                    complete: true,
                },
                StartingBuilding {
                    blueprint: "MiningPlatform".to_string(),
                    position: Vec2::new(150.0, 0.0),
                    complete: true,
                },
            ],
            resources: vec![ResourceNode {
                position: Vec2::new(400.0, 200.0),
                radius: 60.0,
                minerals: 500,
            }],
            ..LevelDescriptor::default()
        }
    }

    fn world(level: &LevelDescriptor) -> WorldContext {
        WorldContext::from_level(level, StatCatalog::new(), 42).expect("valid level")
    }

    fn run(world: &mut WorldContext, ticks: usize, dt: f32) {
        for _ in 0..ticks {
            world.tick(dt);
        }
    }

    #[test]
    fn test_from_level_links_and_homes() {
        let mut level = outpost();
        level.starting_ships.push(StartingShip {
            kind: ShipKind::Miner,
            position: Vec2::new(150.0, 0.0),
            home: Some(1),
        });
        let world = world(&level);

        let center = world.building(BuildingId(1)).expect("command center");
        assert_eq!(center.neighbors, vec![BuildingId(2)]);

        let miner = world.ships().iter().next().expect("miner");
        assert_eq!(miner.home, Some(BuildingId(2)));
        let yard = world.building(BuildingId(2)).and_then(Building::shipyard).expect("yard");
        assert_eq!(yard.pool, vec![miner.id]);
        assert_eq!(world.scenery().total_minerals(), 500);
    }

    #[test]
    fn test_turret_target_ignores_enemy_on_alert_edge() {
        let position = Vec2::ZERO;
        let on_edge = (ShipId(1), Vec2::new(500.0, 0.0));
        let inside = (ShipId(2), Vec2::new(0.0, 450.0));

        assert_eq!(turret_target(&[on_edge], position, 500.0), None);
        assert_eq!(turret_target(&[on_edge, inside], position, 500.0), Some(inside));
    }

    #[test]
    fn test_fired_projectiles_get_unique_ids() {
        let mut level = outpost();
        level.spawn_groups = vec![SpawnGroup::new(0.0, Vec2::new(-300.0, 0.0), [3, 0, 0])];
        let mut world = world(&level);

        let mut ids = Vec::new();
        for _ in 0..600 {
            let events = world.tick(1.0 / 60.0);
            if !events.shots.is_empty() {
                ids.extend(world.projectiles().iter().map(|p| p.id));
                break;
            }
        }
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|&id| id > 0));
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_paused_tick_is_noop() {
        let mut world = world(&outpost());
        world.apply_action(PlayerAction::SetPaused(true)).expect("pause");

        let events = world.tick(0.5);
        assert_eq!(events, TickEvents::default());
        assert_eq!(world.get_tick(), 0);
        assert_eq!(world.elapsed(), 0.0);

        world.apply_action(PlayerAction::SetPaused(false)).expect("resume");
        world.tick(0.5);
        assert_eq!(world.get_tick(), 1);
    }

    #[test]
    fn test_speed_scales_dt() {
        let mut world = world(&outpost());
        world.apply_action(PlayerAction::SetSpeed(GameSpeed::Faster)).expect("speed");
        world.tick(0.25);
        assert!((world.elapsed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_positive_dt_is_ignored() {
        let mut world = world(&outpost());
        world.tick(0.0);
        world.tick(-1.0);
        assert_eq!(world.get_tick(), 0);
    }

    #[test]
    fn test_wave_spawns_with_jitter_and_combat_music() {
        let mut level = outpost();
        level.spawn_groups = vec![SpawnGroup::new(1.0, Vec2::new(-800.0, 0.0), [2, 1, 0])];
        let mut world = world(&level);

        let events = world.tick(0.5);
        assert!(events.waves.is_empty());

        let events = world.tick(0.6);
        assert_eq!(events.waves.len(), 1);
        assert_eq!(events.waves[0].ships, 3);
        assert_eq!(events.ambient_changed, Some(AmbientMode::Combat));
        assert_eq!(world.enemy_count(), 3);

        let positions: Vec<Vec2> = world.ships().iter().map(|s| s.position).collect();
        assert_ne!(positions[0], positions[1]);

        let tiers: Vec<ShipKind> = world.ships().iter().map(|s| s.kind).collect();
        assert_eq!(tiers, vec![ShipKind::Enemy(0), ShipKind::Enemy(0), ShipKind::Enemy(1)]);
    }

    #[test]
    fn test_ambient_returns_to_calm() {
        let mut world = world(&outpost());
        let enemy = world.spawn_ship(ShipKind::Enemy(0), Vec2::new(-900.0, 0.0), None);
        world.ambient = AmbientMode::Combat;

        world.tick(0.1);
        assert_eq!(world.ambient(), AmbientMode::Combat);

        if let Some(ship) = world.ships.get_mut(enemy.0) {
            ship.kill();
        }
        let events = world.tick(0.1);
        assert_eq!(events.ship_deaths.len(), 1);
        assert_eq!(events.ambient_changed, Some(AmbientMode::Calm));
    }

    #[test]
    fn test_place_building_pays_and_links() {
        let mut world = world(&outpost());
        let before = world.pool().available();

        let outcome = world
            .apply_action(PlayerAction::PlaceBuilding {
                blueprint: "Turret".to_string(),
                position: Vec2::new(0.0, 150.0),
            })
            .expect("placed");

        let ActionOutcome::Placed { id, links } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(links, 1);
        assert_eq!(world.pool().available(), before - 100);
        assert!(world.building(id).is_some_and(Building::is_constructing));
    }

    #[test]
    fn test_insufficient_minerals_refunds() {
        let mut world = world(&outpost());
        let place = || PlayerAction::PlaceBuilding {
            blueprint: "CarrierShipyard".to_string(),
            position: Vec2::new(-150.0, 0.0),
        };

        world.apply_action(place()).expect("first fits");
        assert_eq!(world.pool().available(), 400);

        assert_eq!(
            world.apply_action(place()),
            Err(ActionError::InsufficientMinerals {
                required: 600,
                available: 400
            })
        );
        assert_eq!(world.pool().available(), 400);
        assert_eq!(world.building_count(), 3);
    }

    #[test]
    fn test_building_limit_counts_consumers_only() {
        let level = LevelDescriptor {
            starting_minerals: 100_000,
            max_minerals: 100_000,
            ..LevelDescriptor::default()
        };
        let mut world = world(&level);

        for i in 0..MAX_BUILDINGS {
            let position = Vec2::new((i % 10) as f32 * 60.0, (i / 10) as f32 * 60.0);
            world
                .apply_action(PlayerAction::PlaceBuilding {
                    blueprint: "Turret".to_string(),
                    position,
                })
                .expect("under the limit");
        }

        let turret = PlayerAction::PlaceBuilding {
            blueprint: "Turret".to_string(),
            position: Vec2::new(-500.0, -500.0),
        };
        assert_eq!(
            world.apply_action(turret),
            Err(ActionError::BuildingLimit {
                limit: MAX_BUILDINGS
            })
        );

        let node = PlayerAction::PlaceBuilding {
            blueprint: "PowerNode".to_string(),
            position: Vec2::new(-500.0, -500.0),
        };
        assert!(world.apply_action(node).is_ok());
    }

    #[test]
    fn test_cancel_and_sell_refunds() {
        let mut world = world(&LevelDescriptor {
            starting_ships: vec![StartingShip {
                kind: ShipKind::Fighter,
                position: Vec2::new(500.0, 500.0),
                home: None,
            }],
            ..LevelDescriptor::default()
        });
        let place = || PlayerAction::PlaceBuilding {
            blueprint: "CommandCenter".to_string(),
            position: Vec2::ZERO,
        };

        let Ok(ActionOutcome::Placed { id, .. }) = world.apply_action(place()) else {
            panic!("placement failed");
        };
        assert_eq!(world.apply_action(PlayerAction::Sell(id)), Err(ActionError::UnderConstruction(id)));
        assert_eq!(
            world.apply_action(PlayerAction::CancelConstruction(id)),
            Ok(ActionOutcome::Cancelled { refund: 320 })
        );
        assert_eq!(world.pool().available(), 920);
        assert!(world.building(id).is_none());

        let Ok(ActionOutcome::Placed { id, .. }) = world.apply_action(place()) else {
            panic!("placement failed");
        };
        run(&mut world, 7, 0.5);
        assert!(!world.building(id).is_some_and(Building::is_constructing));
        assert_eq!(
            world.apply_action(PlayerAction::CancelConstruction(id)),
            Err(ActionError::NotUnderConstruction(id))
        );
        assert_eq!(world.apply_action(PlayerAction::Sell(id)), Ok(ActionOutcome::Sold { refund: 400 }));
        assert_eq!(world.pool().available(), 920);
    }

    #[test]
    fn test_upgrade_until_cap() {
        let mut world = world(&outpost());
        let id = BuildingId(2);
        let health = world.building(id).map(|b| b.max_health).unwrap_or_default();

        assert_eq!(world.apply_action(PlayerAction::Upgrade(id)), Ok(ActionOutcome::Upgraded { level: 1 }));
        assert_eq!(world.building(id).map(|b| b.max_health), Some(health + 50));
        world.apply_action(PlayerAction::Upgrade(id)).expect("level 2");
        world.apply_action(PlayerAction::Upgrade(id)).expect("level 3");
        assert_eq!(world.apply_action(PlayerAction::Upgrade(id)), Err(ActionError::MaxLevel(id)));
        assert_eq!(
            world.apply_action(PlayerAction::Upgrade(BuildingId(99))),
            Err(ActionError::BuildingNotFound(BuildingId(99)))
        );
    }

    #[test]
    fn test_queued_ship_launches_from_powered_yard() {
        let mut world = world(&outpost());
        assert_eq!(
            world.apply_action(PlayerAction::QueueShip(BuildingId(1))),
            Err(ActionError::NotAShipyard(BuildingId(1)))
        );
        assert_eq!(
            world.apply_action(PlayerAction::QueueShip(BuildingId(2))),
            Ok(ActionOutcome::ShipQueued { queued: 1 })
        );

        let mut launched = Vec::new();
        for _ in 0..60 {
            launched.extend(world.tick(0.1).ships_spawned);
        }

        assert_eq!(launched.len(), 1);
        let miner = world.ship(launched[0]).expect("miner");
        assert_eq!(miner.kind, ShipKind::Miner);
        assert_eq!(miner.home, Some(BuildingId(2)));
        assert_eq!(world.player_fleet_count(), 1);
    }

    #[test]
    fn test_unpowered_yard_does_not_launch() {
        let mut level = outpost();
        level.starting_buildings.remove(0);
        let mut world = world(&level);
        world.apply_action(PlayerAction::QueueShip(BuildingId(1))).expect("queued");

        let launched: usize = (0..100).map(|_| world.tick(0.1).ships_spawned.len()).sum();
        assert_eq!(launched, 0);
    }

    #[test]
    fn test_destroyed_yard_destroys_its_pool() {
        let mut world = world(&outpost());
        let miner = world.spawn_ship(ShipKind::Miner, Vec2::new(150.0, 0.0), Some(BuildingId(2)));
        let stray = world.spawn_ship(ShipKind::Fighter, Vec2::new(-300.0, 0.0), None);

        if let Some(yard) = world.buildings.get_mut(2) {
            yard.kill();
        }
        let events = world.tick(0.1);

        assert_eq!(events.building_deaths.len(), 1);
        assert_eq!(events.explosions.len(), 64);
        assert!(world.ship(miner).is_none());
        assert!(world.ship(stray).is_some());
        assert!(world.building(BuildingId(1)).is_some_and(|b| b.neighbors.is_empty()));
    }

    #[test]
    fn test_loss_pauses_and_refuses_actions() {
        let mut world = world(&LevelDescriptor::default());
        let events = world.tick(0.1);

        assert_eq!(events.outcome, Some(GameOutcome::Defeat));
        assert!(world.is_paused());
        assert_eq!(world.game_state(), GameState::Over(GameOutcome::Defeat));
        assert_eq!(world.apply_action(PlayerAction::SetPaused(false)), Err(ActionError::GameOver));
        assert_eq!(world.tick(0.1), TickEvents::default());
    }

    #[test]
    fn test_survival_win() {
        let mut level = outpost();
        level.win_condition = WinCondition {
            win_time: Some(1),
            ..WinCondition::default()
        };
        let mut world = world(&level);

        let mut outcome = None;
        for _ in 0..30 {
            outcome = outcome.or(world.tick(0.1).outcome);
        }
        assert_eq!(outcome, Some(GameOutcome::Victory(WinReason::Survived)));
        assert!(world.elapsed() >= 2.0);
        assert!(world.elapsed() < 2.2);
    }

    #[test]
    fn test_preview_matches_placement() {
        let mut world = world(&outpost());
        let preview = world.preview_connections("Turret", Vec2::new(0.0, 150.0));
        assert_eq!(preview, vec![BuildingId(1)]);

        let far = world.preview_connections("Turret", Vec2::new(900.0, 900.0));
        assert!(far.is_empty());
    }

    #[test]
    fn test_same_seed_same_hash() {
        let mut level = outpost();
        level.spawn_groups = vec![SpawnGroup::new(0.5, Vec2::new(-600.0, 300.0), [3, 0, 0])];
        let mut a = world(&level);
        let mut b = world(&level);

        for _ in 0..120 {
            a.tick(1.0 / 30.0);
            b.tick(1.0 / 30.0);
        }
        assert_eq!(a.state_hash(), b.state_hash());

        let mut c = WorldContext::from_level(&level, StatCatalog::new(), 43).expect("valid level");
        run(&mut c, 120, 1.0 / 30.0);
        assert_ne!(a.state_hash(), c.state_hash());
    }
}
