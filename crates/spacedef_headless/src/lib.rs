//! Headless level runner for balance testing and CI verification.
//!
//! Runs levels without a frontend: the world is driven at a fixed frame
//! time, an optional autopilot keeps the shipyards busy, and each run is
//! summarised as a JSON report. This enables:
//!
//! - **Balance batches**: many seeds of one level in parallel
//! - **CI verification**: same level + seed must give the same final hash
//! - **Level checks**: every level file loads and validates
//!
//! # Example
//!
//! ```bash
//! # Play level 0 once and print the report
//! cargo run -p spacedef_headless -- run --level 0 --seed 7
//!
//! # 200 seeds of level 1
//! cargo run -p spacedef_headless -- batch --level 1 --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p spacedef_headless -- verify --level 2 --runs 5
//! ```

pub mod batch;
pub mod level_loader;
pub mod runner;
pub mod sinks;
pub mod unlock_store;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary, VerifyReport};
pub use level_loader::{default_level_dir, load_level, load_stats, LevelLibrary, LevelLoadError};
pub use runner::{run_game, Autopilot, GameConfig, GameReport};
pub use sinks::{TracingAudio, TracingRenderer};
pub use unlock_store::{UnlockStore, UnlockStoreError};
