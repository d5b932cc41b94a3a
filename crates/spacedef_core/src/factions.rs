//! Faction definitions.

use serde::{Deserialize, Serialize};

/// Which side an entity fights for.
///
/// Projectiles only damage entities of the opposing faction, so friendly
/// fire is impossible by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Faction {
    /// The player's ships, turrets and buildings.
    #[default]
    Player,
    /// Wave-spawned enemy ships.
    Enemy,
}

impl Faction {
    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
        }
    }

    /// Whether this is the enemy side.
    #[must_use]
    pub const fn is_enemy(self) -> bool {
        matches!(self, Self::Enemy)
    }

    /// Whether an attack from `self` may damage `target`.
    #[must_use]
    pub const fn is_hostile_to(self, target: Self) -> bool {
        self.is_enemy() != target.is_enemy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostility_is_symmetric_and_never_friendly() {
        assert!(Faction::Player.is_hostile_to(Faction::Enemy));
        assert!(Faction::Enemy.is_hostile_to(Faction::Player));
        assert!(!Faction::Player.is_hostile_to(Faction::Player));
        assert!(!Faction::Enemy.is_hostile_to(Faction::Enemy));
    }

    #[test]
    fn test_default_is_player() {
        assert_eq!(Faction::default(), Faction::Player);
        assert_eq!(Faction::Enemy.display_name(), "Enemy");
    }
}
