//! Batch runs for balance testing.
//!
//! Runs one level over a range of seeds in parallel using rayon, one world
//! per task, and aggregates the reports.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use spacedef_core::level::LevelDescriptor;
use spacedef_core::stats::StatCatalog;
use spacedef_core::world::GameSpeed;

use crate::runner::{run_game, GameConfig, GameReport, DEFAULT_FRAME_DT, DEFAULT_MAX_TICKS};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Level index in the library.
    pub level_index: u32,
    /// Number of games to run.
    pub game_count: u32,
    /// Worker threads (0 = rayon default).
    pub parallel_games: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Tick cap per game.
    pub max_ticks: u64,
    /// Frame time.
    pub frame_dt: f32,
    /// Let the autopilot queue ships.
    pub autopilot: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            level_index: 0,
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            frame_dt: DEFAULT_FRAME_DT,
            autopilot: true,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` games of one level.
    #[must_use]
    pub fn new(level_index: u32, game_count: u32) -> Self {
        Self {
            level_index,
            game_count,
            ..Default::default()
        }
    }

    /// Set the first seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick cap.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Config of game `index`.
    #[must_use]
    pub fn game_config(&self, index: u32) -> GameConfig {
        GameConfig {
            level_index: self.level_index,
            seed: self.seed_start.wrapping_add(u64::from(index)),
            max_ticks: self.max_ticks,
            frame_dt: self.frame_dt,
            speed: GameSpeed::Normal,
            autopilot: self.autopilot,
        }
    }
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games that finished without error.
    pub total_games: u32,
    /// Games won.
    pub victories: u32,
    /// Games lost.
    pub defeats: u32,
    /// Games that hit the tick cap.
    pub unfinished: u32,
    /// `victories / total_games`.
    pub win_rate: f64,
    /// Mean frames per game.
    pub mean_ticks: f64,
    /// Mean enemy kills per game.
    pub mean_enemies_destroyed: f64,
    /// Mean buildings lost per game.
    pub mean_buildings_lost: f64,
}

impl BatchSummary {
    /// Summarise finished games.
    #[must_use]
    pub fn from_games(games: &[GameReport]) -> Self {
        let total = games.len() as u32;
        if total == 0 {
            return Self::default();
        }
        let mean = |f: fn(&GameReport) -> f64| games.iter().map(f).sum::<f64>() / f64::from(total);
        let victories = games.iter().filter(|g| g.is_victory()).count() as u32;
        let unfinished = games.iter().filter(|g| g.outcome.is_none()).count() as u32;

        Self {
            total_games: total,
            victories,
            defeats: total - victories - unfinished,
            unfinished,
            win_rate: f64::from(victories) / f64::from(total),
            mean_ticks: mean(|g| g.ticks as f64),
            mean_enemies_destroyed: mean(|g| f64::from(g.enemies_destroyed)),
            mean_buildings_lost: mean(|g| f64::from(g.buildings_lost)),
        }
    }
}

/// A game that could not be run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Results of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Level name.
    pub level: String,
    /// Per-game reports, in game order.
    pub games: Vec<GameReport>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Games that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Progress tracking shared by the batch workers.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total games.
    pub total: u32,
    completed: AtomicU32,
    victories: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Tracker for `total` games.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            victories: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished game.
    pub fn record_completion(&self, victory: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if victory {
            self.victories.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Games finished so far.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Win rate over the finished games.
    #[must_use]
    pub fn current_win_rate(&self) -> f64 {
        let completed = self.current();
        if completed == 0 {
            return 0.0;
        }
        f64::from(self.victories.load(Ordering::Relaxed)) / f64::from(completed)
    }

    /// Estimated time remaining.
    #[must_use]
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::ZERO;
        }
        let per_game = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        Duration::from_secs_f64(per_game * f64::from(self.total.saturating_sub(completed)))
    }

    /// Log progress.
    pub fn display(&self) {
        let eta = self.eta();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            win_rate = format!("{:.1}%", self.current_win_rate() * 100.0),
            eta = format!("{}m {}s", eta.as_secs() / 60, eta.as_secs() % 60),
            "Batch progress"
        );
    }
}

fn run_all(level: &LevelDescriptor, stats: &StatCatalog, config: &BatchConfig) -> Vec<Result<GameReport, BatchError>> {
    let progress = BatchProgress::new(config.game_count);

    (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let game = config.game_config(i);
            match run_game(level, stats, &game) {
                Ok(report) => {
                    progress.record_completion(report.is_victory());
                    let completed = progress.current();
                    if completed % 10 == 0 {
                        debug!("Progress: {}/{}", completed, config.game_count);
                    }
                    if completed % 100 == 0 {
                        progress.display();
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!("Game {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed: game.seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect()
}

/// Run a batch of games of `level`.
pub fn run_batch(level: &LevelDescriptor, stats: &StatCatalog, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!("Starting batch run: {} games of '{}'", config.game_count, level.name);

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(|| run_all(level, stats, &config)),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool, using the global pool");
                run_all(level, stats, &config)
            }
        }
    } else {
        run_all(level, stats, &config)
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameReport> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        level: level.name.clone(),
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Whether every run ended identically.
    pub deterministic: bool,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Frames simulated by each run.
    pub ticks: Vec<u64>,
}

/// Run the same game `runs` times in parallel and compare final hashes.
///
/// # Errors
///
/// Returns the first run's error if the level cannot start.
pub fn verify_determinism(
    level: &LevelDescriptor,
    stats: &StatCatalog,
    config: &GameConfig,
    runs: u32,
) -> spacedef_core::error::Result<VerifyReport> {
    let reports = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_game(level, stats, config))
        .collect::<spacedef_core::error::Result<Vec<_>>>()?;

    let deterministic = reports.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(level = %level.name, seed = config.seed, "Runs diverged");
    }

    Ok(VerifyReport {
        deterministic,
        hashes: reports.iter().map(|r| r.final_state_hash).collect(),
        ticks: reports.iter().map(|r| r.ticks).collect(),
    })
}
