//! Headless space defense runner.
//!
//! Runs levels without graphics. Reports go to stdout as JSON, logs go to
//! stderr.
//!
//! # Usage
//!
//! ```bash
//! # Play one level
//! cargo run -p spacedef_headless -- run --level 0 --seed 7
//!
//! # Run a batch for balance testing
//! cargo run -p spacedef_headless -- batch --level 1 --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p spacedef_headless -- verify --level 1 --seed 12345 --runs 5
//!
//! # List levels and unlock state
//! cargo run -p spacedef_headless -- levels --unlocks profile.ron
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacedef_core::level::LevelDescriptor;
use spacedef_core::stats::StatCatalog;
use spacedef_core::world::GameSpeed;
use spacedef_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    level_loader::{default_level_dir, load_stats, LevelLibrary},
    runner::{run_game, GameConfig, DEFAULT_MAX_TICKS},
    unlock_store::UnlockStore,
};

#[derive(Parser)]
#[command(name = "spacedef_headless")]
#[command(about = "Headless space defense runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding level{N}.ron files
    #[arg(long, global = true)]
    levels: Option<PathBuf>,

    /// Stats catalog (RON); stock stats when omitted
    #[arg(long, global = true)]
    stats: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single level and print its report
    Run {
        /// Level index
        #[arg(short, long, default_value = "0")]
        level: u32,

        /// World seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick cap
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Play speed
        #[arg(long, value_enum, default_value = "normal")]
        speed: SpeedArg,

        /// Do not queue ships automatically
        #[arg(long)]
        no_autopilot: bool,

        /// Write the report to this file as well
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Unlock profile: refuse locked levels, unlock the next level on a win
        #[arg(long)]
        unlocks: Option<PathBuf>,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Level index
        #[arg(short, long, default_value = "0")]
        level: u32,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick cap per game
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Do not queue ships automatically
        #[arg(long)]
        no_autopilot: bool,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Level index
        #[arg(short, long, default_value = "0")]
        level: u32,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick cap per run
        #[arg(long, default_value = "3600")]
        max_ticks: u64,
    },

    /// List the level library
    Levels {
        /// Unlock profile to show lock state from
        #[arg(long)]
        unlocks: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SpeedArg {
    Normal,
    Fast,
    Faster,
}

impl From<SpeedArg> for GameSpeed {
    fn from(speed: SpeedArg) -> Self {
        match speed {
            SpeedArg::Normal => Self::Normal,
            SpeedArg::Fast => Self::Fast,
            SpeedArg::Faster => Self::Faster,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let library = load_library(cli.levels.as_deref());
    let stats = cli.stats.as_deref().map_or_else(StatCatalog::new, |path| {
        load_stats(path).unwrap_or_else(|e| fatal(&format!("Failed to load stats '{}': {e}", path.display())))
    });

    match cli.command {
        Commands::Run {
            level,
            seed,
            max_ticks,
            speed,
            no_autopilot,
            output,
            unlocks,
        } => {
            let config = GameConfig {
                level_index: level,
                seed,
                max_ticks,
                speed: speed.into(),
                autopilot: !no_autopilot,
                ..GameConfig::default()
            };
            cmd_run(&library, &stats, &config, output, unlocks);
        }
        Commands::Batch {
            level,
            count,
            parallel,
            seed,
            max_ticks,
            no_autopilot,
            output,
        } => {
            let config = BatchConfig {
                parallel_games: parallel,
                autopilot: !no_autopilot,
                ..BatchConfig::new(level, count)
                    .with_seed(seed)
                    .with_max_ticks(max_ticks)
            };
            cmd_batch(&library, &stats, config, &output);
        }
        Commands::Verify {
            level,
            seed,
            runs,
            max_ticks,
        } => {
            let config = GameConfig {
                level_index: level,
                seed,
                max_ticks,
                ..GameConfig::default()
            };
            cmd_verify(&library, &stats, &config, runs);
        }
        Commands::Levels { unlocks } => {
            cmd_levels(&library, unlocks);
        }
    }
}

fn fatal(message: &str) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    std::process::exit(1);
}

fn load_library(dir: Option<&Path>) -> LevelLibrary {
    let Some(dir) = dir.map(Path::to_path_buf).or_else(default_level_dir) else {
        fatal("No level directory found; pass --levels or set SPACEDEF_LEVEL_DIR");
    };
    LevelLibrary::load_dir(&dir)
        .unwrap_or_else(|e| fatal(&format!("Failed to load levels from '{}': {e}", dir.display())))
}

fn level_or_exit(library: &LevelLibrary, index: u32) -> &LevelDescriptor {
    library.get(index).unwrap_or_else(|e| fatal(&e.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("Failed to encode report: {e}")),
    }
}

/// Play one level
fn cmd_run(
    library: &LevelLibrary,
    stats: &StatCatalog,
    config: &GameConfig,
    output: Option<PathBuf>,
    unlocks: Option<PathBuf>,
) {
    let store = unlocks.map(UnlockStore::new);
    let mut flags = match &store {
        Some(store) => Some(
            store
                .load()
                .unwrap_or_else(|e| fatal(&format!("Failed to read unlocks: {e}"))),
        ),
        None => None,
    };
    if let Some(flags) = &flags {
        if !flags.is_unlocked(config.level_index) {
            fatal(&format!("Level {} is locked", config.level_index));
        }
    }

    let level = level_or_exit(library, config.level_index);
    tracing::info!(level = %level.name, seed = config.seed, "Starting run");
    if !level.description.is_empty() {
        eprintln!("{}", level.description);
    }

    let report = run_game(level, stats, config).unwrap_or_else(|e| fatal(&format!("Run failed: {e}")));

    if let (Some(store), Some(flags), Some(outcome)) = (&store, flags.as_mut(), report.outcome) {
        if let Some(next) = flags.record_outcome(config.level_index, outcome) {
            tracing::info!(level = next, "Level unlocked");
        }
        if let Err(e) = store.save(flags) {
            fatal(&format!("Failed to save unlocks: {e}"));
        }
    }

    if !report.message.is_empty() {
        eprintln!("{}", report.message);
    }
    if let Some(path) = output {
        if let Err(e) = report.save(&path) {
            fatal(&format!("Failed to save report: {e}"));
        }
    }
    print_json(&report);
}

/// Run a batch of games for balance testing
fn cmd_batch(library: &LevelLibrary, stats: &StatCatalog, config: BatchConfig, output: &Path) {
    let level = level_or_exit(library, config.level_index);
    let cpus = std::thread::available_parallelism().map_or(1, |p| p.get());

    tracing::info!(
        level = %level.name,
        count = config.game_count,
        parallel = config.parallel_games,
        seed = config.seed_start,
        max_ticks = config.max_ticks,
        output = %output.display(),
        cpus_available = cpus,
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(output) {
        fatal(&format!("Cannot create output directory '{}': {e}", output.display()));
    }

    let results = run_batch(level, stats, config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        fatal(&format!("Failed to save results: {e}"));
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Win rate: {:.1}% ({} won, {} lost, {} unfinished)",
        results.summary.win_rate * 100.0,
        results.summary.victories,
        results.summary.defeats,
        results.summary.unfinished
    );
    eprintln!("Mean length: {:.0} ticks", results.summary.mean_ticks);

    for error in results.errors.iter().take(10) {
        eprintln!("  Game {} (seed {}): {}", error.game_index, error.seed, error.message);
    }
    if results.errors.len() > 10 {
        eprintln!("  ... and {} more failures", results.errors.len() - 10);
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    print_json(&results.summary);
}

/// Verify determinism
fn cmd_verify(library: &LevelLibrary, stats: &StatCatalog, config: &GameConfig, runs: u32) {
    let level = level_or_exit(library, config.level_index);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        level.name,
        config.seed,
        runs
    );

    let report = verify_determinism(level, stats, config, runs)
        .unwrap_or_else(|e| fatal(&format!("Verification failed to run: {e}")));
    print_json(&report);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// List levels
fn cmd_levels(library: &LevelLibrary, unlocks: Option<PathBuf>) {
    let flags = unlocks
        .map(|path| {
            UnlockStore::new(path)
                .load()
                .unwrap_or_else(|e| fatal(&format!("Failed to read unlocks: {e}")))
        })
        .unwrap_or_default();

    for (index, level) in library.iter() {
        let state = if flags.is_unlocked(index) { "open" } else { "locked" };
        println!(
            "{index:>3}  {:<24} {:>2} waves  [{state}]",
            level.name,
            level.spawn_groups.len()
        );
    }
}
