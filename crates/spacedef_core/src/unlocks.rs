//! Level unlock flags, the only state persisted between sessions.
//!
//! Flags are stored as `Level{N}_Unlocked` booleans. Level 0 is always
//! unlocked, whether or not it has a flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::victory::GameOutcome;

/// Persisted flag key for a level.
#[must_use]
pub fn flag_key(level: u32) -> String {
    format!("Level{level}_Unlocked")
}

/// Set of unlocked levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockFlags {
    #[serde(default)]
    flags: BTreeMap<String, bool>,
}

impl UnlockFlags {
    /// Fresh profile: only level 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `level` can be played.
    #[must_use]
    pub fn is_unlocked(&self, level: u32) -> bool {
        level == 0 || self.flags.get(&flag_key(level)).copied().unwrap_or(false)
    }

    /// Unlock `level`. Returns `true` if it was locked before.
    pub fn unlock(&mut self, level: u32) -> bool {
        if self.is_unlocked(level) {
            return false;
        }
        self.flags.insert(flag_key(level), true);
        true
    }

    /// Apply the result of playing `level`: a win unlocks the next level.
    ///
    /// Returns the newly unlocked level, if any.
    pub fn record_outcome(&mut self, level: u32, outcome: GameOutcome) -> Option<u32> {
        if !outcome.is_victory() {
            return None;
        }
        let next = level.checked_add(1)?;
        self.unlock(next).then_some(next)
    }

    /// Highest unlocked level.
    #[must_use]
    pub fn highest_unlocked(&self) -> u32 {
        self.flags
            .iter()
            .filter(|(_, &on)| on)
            .filter_map(|(key, _)| key.strip_prefix("Level")?.strip_suffix("_Unlocked")?.parse().ok())
            .max()
            .unwrap_or(0)
    }

    /// Parse flags from RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] for malformed text.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParse {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize flags to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("unlock serialization failed: {e}")))
    }
}
