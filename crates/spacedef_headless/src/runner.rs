//! Single-level runs.
//!
//! [`run_game`] drives one [`WorldContext`] to its outcome (or a tick cap)
//! at a fixed frame time, optionally with the [`Autopilot`] keeping the
//! shipyards busy, and condenses the run into a [`GameReport`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use spacedef_core::error::{GameError, Result};
use spacedef_core::level::LevelDescriptor;
use spacedef_core::presentation::PresentationSync;
use spacedef_core::stats::StatCatalog;
use spacedef_core::victory::GameOutcome;
use spacedef_core::world::{GameSpeed, PlayerAction, TickEvents, WorldContext};

use crate::sinks::{TracingAudio, TracingRenderer};

/// Frame time of a headless run: 60 frames per second.
pub const DEFAULT_FRAME_DT: f32 = 1.0 / 60.0;

/// Default tick cap: 20 minutes of frames.
pub const DEFAULT_MAX_TICKS: u64 = 20 * 60 * 60;

/// Configuration for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Index of the level in the library.
    pub level_index: u32,
    /// World seed.
    pub seed: u64,
    /// Stop after this many frames even if the level is undecided.
    pub max_ticks: u64,
    /// Wall-clock seconds per frame.
    pub frame_dt: f32,
    /// Play speed.
    pub speed: GameSpeed,
    /// Let the autopilot queue ships.
    pub autopilot: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            level_index: 0,
            seed: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            frame_dt: DEFAULT_FRAME_DT,
            speed: GameSpeed::Normal,
            autopilot: true,
        }
    }
}

/// Minimal player stand-in: every finished shipyard with an empty queue
/// gets one order.
///
/// Queuing resets a yard's launch timer, so orders are only placed on idle
/// yards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autopilot {
    interval: u64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self { interval: 30 }
    }
}

impl Autopilot {
    /// Autopilot that acts every `interval` ticks.
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    /// Orders the autopilot would give now.
    #[must_use]
    pub fn orders(&self, world: &WorldContext) -> Vec<PlayerAction> {
        if world.get_tick() % self.interval != 0 {
            return Vec::new();
        }
        world
            .buildings()
            .iter()
            .filter(|b| !b.is_dead() && !b.is_constructing())
            .filter(|b| b.shipyard().is_some_and(|yard| yard.queue.is_empty() && yard.can_queue()))
            .map(|b| PlayerAction::QueueShip(b.id))
            .collect()
    }

    /// Give this tick's orders. Returns how many were accepted.
    pub fn step(&self, world: &mut WorldContext) -> u32 {
        let mut accepted = 0;
        for order in self.orders(world) {
            match world.apply_action(order) {
                Ok(_) => accepted += 1,
                Err(e) => tracing::debug!(error = %e, "Autopilot order refused"),
            }
        }
        accepted
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    /// Level name.
    pub level: String,
    /// Level index.
    pub level_index: u32,
    /// World seed.
    pub seed: u64,
    /// How the level ended (`None` if the tick cap was hit first).
    pub outcome: Option<GameOutcome>,
    /// Win or lose text of the level, matching the outcome.
    pub message: String,
    /// Frames simulated.
    pub ticks: u64,
    /// Simulated seconds.
    pub elapsed: f32,
    /// Waves released.
    pub waves_released: u32,
    /// Ships launched by shipyards.
    pub ships_launched: u32,
    /// Player ships destroyed.
    pub ships_lost: u32,
    /// Enemy ships destroyed.
    pub enemies_destroyed: u32,
    /// Buildings destroyed.
    pub buildings_lost: u32,
    /// Buildings that finished construction.
    pub constructions_completed: u32,
    /// Weapon discharges.
    pub shots_fired: u64,
    /// Minerals unloaded by miners.
    pub minerals_delivered: i64,
    /// Minerals in the pool at the end.
    pub final_minerals: i32,
    /// Ship orders the autopilot placed.
    pub orders_placed: u32,
    /// Most visuals alive at once.
    pub peak_visuals: usize,
    /// Sound effects played.
    pub sounds_played: u64,
    /// State hash of the final world.
    pub final_state_hash: u64,
}

impl GameReport {
    fn new(level: &LevelDescriptor, config: &GameConfig) -> Self {
        Self {
            level: level.name.clone(),
            level_index: config.level_index,
            seed: config.seed,
            ..Self::default()
        }
    }

    /// Fold one tick's events into the report.
    pub fn record(&mut self, events: &TickEvents) {
        let wave_ships: usize = events.waves.iter().map(|w| w.ships).sum();
        self.waves_released += events.waves.len() as u32;
        self.ships_launched += events.ships_spawned.len().saturating_sub(wave_ships) as u32;
        for death in &events.ship_deaths {
            if death.kind.is_player_fleet() {
                self.ships_lost += 1;
            } else {
                self.enemies_destroyed += 1;
            }
        }
        self.buildings_lost += events.building_deaths.len() as u32;
        self.constructions_completed += events.constructions_completed.len() as u32;
        self.shots_fired += events.shots.len() as u64;
        self.minerals_delivered += i64::from(events.minerals_delivered);
    }

    /// Whether the run ended in a win.
    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.outcome.is_some_and(GameOutcome::is_victory)
    }

    /// Save the report as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load a report saved with [`GameReport::save`].
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run one level to its outcome or `config.max_ticks`.
///
/// # Errors
///
/// Returns the level's validation error, or [`GameError::InvalidState`] if
/// the configured speed is refused.
pub fn run_game(level: &LevelDescriptor, stats: &StatCatalog, config: &GameConfig) -> Result<GameReport> {
    let mut world = WorldContext::from_level(level, stats.clone(), config.seed)?;
    if config.speed != GameSpeed::Normal {
        world
            .apply_action(PlayerAction::SetSpeed(config.speed))
            .map_err(|e| GameError::InvalidState(e.to_string()))?;
    }

    let autopilot = config.autopilot.then(Autopilot::default);
    let mut sync = PresentationSync::new();
    let mut renderer = TracingRenderer::new();
    let mut audio = TracingAudio::default();
    let mut report = GameReport::new(level, config);

    tracing::debug!(level = %level.name, seed = config.seed, "Run starting");

    for _ in 0..config.max_ticks {
        if let Some(pilot) = &autopilot {
            report.orders_placed += pilot.step(&mut world);
        }

        let events = world.tick(config.frame_dt);
        report.ticks += 1;
        report.record(&events);
        sync.sync(&world, &events, &mut renderer, &mut audio);

        if let Some(outcome) = events.outcome {
            report.outcome = Some(outcome);
            break;
        }
    }

    report.message = match report.outcome {
        Some(outcome) if outcome.is_victory() => level.win_text.clone(),
        Some(_) => level.lose_text.clone(),
        None => String::new(),
    };
    report.elapsed = world.elapsed();
    report.final_minerals = world.pool().available();
    report.peak_visuals = renderer.peak();
    report.sounds_played = audio.clips;
    report.final_state_hash = world.state_hash();

    tracing::info!(
        level = %report.level,
        seed = report.seed,
        outcome = ?report.outcome,
        ticks = report.ticks,
        enemies_destroyed = report.enemies_destroyed,
        "Run finished"
    );

    Ok(report)
}
