//! # Space Defense Core
//!
//! Simulation core for a 2D space tower-defense game.
//!
//! This crate contains **only** game logic:
//! - No rendering (visuals go through [`presentation::Renderer`])
//! - No audio (sounds go through [`presentation::Audio`])
//! - No IO (levels and stats arrive as parsed data)
//! - No system randomness (each world owns a seeded RNG)
//!
//! This separation enables:
//! - Headless runs and batch balance checks
//! - Determinism testing
//! - Any frontend on top of the same rules
//!
//! ## Crate Structure
//!
//! - [`world`] - Tick orchestrator and player actions
//! - [`ships`], [`steering`], [`weapons`], [`ai`] - Ships and their behaviour
//! - [`buildings`], [`power`] - Buildings and the power grid
//! - [`projectiles`], [`combat`] - Shots, hits and explosions
//! - [`economy`], [`scenery`] - Minerals and debris
//! - [`spawner`], [`victory`] - Enemy waves and win/loss
//! - [`level`], [`unlocks`], [`stats`] - Data the world starts from

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod buildings;
pub mod combat;
pub mod economy;
pub mod error;
pub mod factions;
pub mod level;
pub mod math;
pub mod names;
pub mod power;
pub mod presentation;
pub mod projectiles;
pub mod registry;
pub mod scenery;
pub mod ships;
pub mod spawner;
pub mod stats;
pub mod steering;
pub mod unlocks;
pub mod victory;
pub mod weapons;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{Building, BuildingId, BuildingKind};
    pub use crate::economy::{Price, ResourcePool};
    pub use crate::error::{ActionError, GameError, Result};
    pub use crate::factions::Faction;
    pub use crate::level::LevelDescriptor;
    pub use crate::math::Vec2;
    pub use crate::presentation::{AmbientMode, Audio, PresentationSync, Renderer};
    pub use crate::ships::{Ship, ShipId, ShipKind};
    pub use crate::stats::{StatCatalog, StatValue, StatsProvider};
    pub use crate::unlocks::UnlockFlags;
    pub use crate::victory::{GameOutcome, GameState, WinCondition, WinReason};
    pub use crate::weapons::WeaponKind;
    pub use crate::world::{GameSpeed, PlayerAction, TickEvents, WorldContext};
}
