//! Error types for the game simulation.
//!
//! Nothing inside a tick is fatal. [`GameError`] covers the edges of the
//! core (data files, snapshots); [`ActionError`] describes player actions
//! the world refused to apply.

use thiserror::Error;

use crate::buildings::BuildingId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A level descriptor references something that does not exist.
    #[error("Invalid level '{level}': {reason}")]
    InvalidLevel {
        /// Level name.
        level: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Reasons a [`crate::world::PlayerAction`] was rejected.
///
/// A rejected action leaves the world untouched (apart from refunds that
/// return the pool to its previous value).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The consumer-building cap has been reached.
    #[error("Building limit reached ({limit} buildings)")]
    BuildingLimit {
        /// Maximum number of non-power-node buildings.
        limit: usize,
    },

    /// Not enough minerals in the pool.
    #[error("Not enough minerals: need {required}, have {available}")]
    InsufficientMinerals {
        /// Price of the building.
        required: i32,
        /// Minerals that were available.
        available: i32,
    },

    /// No building with this id exists.
    #[error("Building not found: {0:?}")]
    BuildingNotFound(BuildingId),

    /// Selling requires a finished building.
    #[error("Building {0:?} is still under construction")]
    UnderConstruction(BuildingId),

    /// Cancelling requires a building that is still under construction.
    #[error("Building {0:?} is not under construction")]
    NotUnderConstruction(BuildingId),

    /// The building is already at its maximum upgrade level.
    #[error("Building {0:?} is fully upgraded")]
    MaxLevel(BuildingId),

    /// The building cannot build ships.
    #[error("Building {0:?} is not a shipyard")]
    NotAShipyard(BuildingId),

    /// The shipyard queue or ship pool is full.
    #[error("Shipyard {0:?} is at capacity")]
    ShipyardFull(BuildingId),

    /// The game has already been won or lost.
    #[error("The game is over")]
    GameOver,
}
