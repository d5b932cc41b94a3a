//! Level descriptors.
//!
//! A level is plain data produced once by the level editor: the arena size,
//! mineral fields, waves, the win condition and what the player starts
//! with. Descriptors are stored as RON:
//!
//! ```ron
//! LevelDescriptor(
//!     name: "Outpost",
//!     half_width: 1000.0,
//!     resources: [(position: (x: 300.0, y: 0.0), radius: 80.0, minerals: 500)],
//!     spawn_groups: [(spawn_time: 30.0, position: (x: -900.0, y: 0.0), counts: (3, 0, 0))],
//!     win_condition: (win_time: Some(300), kill_all: true),
//!     starting_buildings: [(blueprint: "CommandCenter", position: (x: 0.0, y: 0.0))],
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Vec2;
use crate::ships::ShipKind;
use crate::spawner::SpawnGroup;
use crate::victory::WinCondition;

/// Default arena half-width.
pub const DEFAULT_HALF_WIDTH: f32 = 1000.0;

/// Default starting and maximum minerals.
pub const DEFAULT_MINERALS: i32 = 1000;

/// A mineral field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Field center.
    pub position: Vec2,
    /// Mining radius.
    pub radius: f32,
    /// Minerals in the field.
    pub minerals: i32,
}

/// A building present at level start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingBuilding {
    /// Stats group of the building.
    pub blueprint: String,
    /// Center position.
    pub position: Vec2,
    /// Whether construction is already finished.
    #[serde(default = "default_true")]
    pub complete: bool,
}

/// A ship present at level start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingShip {
    /// Ship kind.
    pub kind: ShipKind,
    /// Spawn position.
    pub position: Vec2,
    /// Index into `starting_buildings` of the ship's home shipyard.
    #[serde(default)]
    pub home: Option<usize>,
}

const fn default_true() -> bool {
    true
}

const fn default_half_width() -> f32 {
    DEFAULT_HALF_WIDTH
}

const fn default_minerals() -> i32 {
    DEFAULT_MINERALS
}

/// Everything needed to start a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Level name.
    pub name: String,
    /// Briefing text.
    #[serde(default)]
    pub description: String,
    /// Text shown on victory.
    #[serde(default)]
    pub win_text: String,
    /// Text shown on defeat.
    #[serde(default)]
    pub lose_text: String,
    /// Arena half-width; the world is `[-W, W]²`.
    #[serde(default = "default_half_width")]
    pub half_width: f32,
    /// Mineral fields.
    #[serde(default)]
    pub resources: Vec<ResourceNode>,
    /// Decorative junk positions.
    #[serde(default)]
    pub junk: Vec<Vec2>,
    /// Enemy waves.
    #[serde(default)]
    pub spawn_groups: Vec<SpawnGroup>,
    /// How the level is won.
    #[serde(default)]
    pub win_condition: WinCondition,
    /// Buildings placed at start.
    #[serde(default)]
    pub starting_buildings: Vec<StartingBuilding>,
    /// Ships placed at start.
    #[serde(default)]
    pub starting_ships: Vec<StartingShip>,
    /// Minerals in the pool at start.
    #[serde(default = "default_minerals")]
    pub starting_minerals: i32,
    /// Pool capacity.
    #[serde(default = "default_minerals")]
    pub max_minerals: i32,
}

impl Default for LevelDescriptor {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            description: String::new(),
            win_text: String::new(),
            lose_text: String::new(),
            half_width: DEFAULT_HALF_WIDTH,
            resources: Vec::new(),
            junk: Vec::new(),
            spawn_groups: Vec::new(),
            win_condition: WinCondition::default(),
            starting_buildings: Vec::new(),
            starting_ships: Vec::new(),
            starting_minerals: DEFAULT_MINERALS,
            max_minerals: DEFAULT_MINERALS,
        }
    }
}

impl LevelDescriptor {
    /// Parse and validate a descriptor from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] for malformed RON and
    /// [`GameError::InvalidLevel`] when [`LevelDescriptor::validate`] fails.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let level: Self = ron::from_str(source).map_err(|e| GameError::DataParse {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        level.validate()?;
        Ok(level)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("level serialization failed: {e}")))
    }

    /// Check the descriptor for values the world cannot start from.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidLevel`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| GameError::InvalidLevel {
            level: self.name.clone(),
            reason,
        };

        if !(self.half_width.is_finite() && self.half_width > 0.0) {
            return Err(invalid(format!("half_width must be positive, got {}", self.half_width)));
        }
        if self.max_minerals < 0 {
            return Err(invalid("max_minerals must not be negative".to_string()));
        }
        if let Some(group) = self.spawn_groups.iter().find(|g| !g.spawn_time.is_finite()) {
            return Err(invalid(format!("spawn group at {:?} has no valid time", group.position)));
        }
        for ship in &self.starting_ships {
            if let ShipKind::Enemy(tier) = ship.kind {
                if tier >= ShipKind::ENEMY_TIERS {
                    return Err(invalid(format!("enemy tier {tier} does not exist")));
                }
            }
            if let Some(home) = ship.home {
                if home >= self.starting_buildings.len() {
                    return Err(invalid(format!("ship home index {home} is out of range")));
                }
            }
        }
        Ok(())
    }
}
