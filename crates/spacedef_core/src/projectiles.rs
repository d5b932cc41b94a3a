//! Projectiles in flight.

use serde::{Deserialize, Serialize};

use crate::factions::Faction;
use crate::math::Vec2;
use crate::ships::ShipId;
use crate::weapons::WeaponKind;

/// Projectiles leave the world once beyond this multiple of the half-width.
pub const OUT_OF_BOUNDS_FACTOR: f32 = 2.0;

/// A projectile travelling in a straight line.
///
/// `owner` is a weak reference: the firing ship may be destroyed while the
/// projectile is still in flight. The owner's faction is captured when the
/// shot is fired, so hit resolution never needs to look the owner up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Serial number, assigned by the world when the shot is fired.
    pub id: u64,
    /// Weapon family that fired it.
    pub kind: WeaponKind,
    /// Current position.
    pub position: Vec2,
    /// Velocity in units per second.
    pub velocity: Vec2,
    /// Ship that fired it; `None` for turret shots.
    pub owner: Option<ShipId>,
    /// Side of the shooter.
    pub faction: Faction,
    /// Damage applied on hit.
    pub damage: i32,
}

impl Projectile {
    /// Create a projectile with the stock damage for `kind`.
    #[must_use]
    pub fn new(
        kind: WeaponKind,
        position: Vec2,
        velocity: Vec2,
        owner: Option<ShipId>,
        faction: Faction,
    ) -> Self {
        Self {
            id: 0,
            kind,
            position,
            velocity,
            owner,
            faction,
            damage: kind.damage(),
        }
    }

    /// Move along the velocity.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    /// Whether the projectile has left the playable area.
    #[must_use]
    pub fn is_out_of_bounds(&self, half_width: f32) -> bool {
        let limit = half_width * OUT_OF_BOUNDS_FACTOR;
        self.position.x.abs() > limit || self.position.y.abs() > limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_along_velocity() {
        let mut p = Projectile::new(
            WeaponKind::Gatling,
            Vec2::ZERO,
            Vec2::new(50.0, 0.0),
            None,
            Faction::Player,
        );
        p.advance(0.5);
        assert_eq!(p.position, Vec2::new(25.0, 0.0));
        assert_eq!(p.damage, 1);
    }

    #[test]
    fn test_bounds_are_twice_the_half_width() {
        let mut p = Projectile::new(
            WeaponKind::Laser,
            Vec2::new(1999.0, 0.0),
            Vec2::ZERO,
            None,
            Faction::Player,
        );
        assert!(!p.is_out_of_bounds(1000.0));
        p.position = Vec2::new(0.0, -2001.0);
        assert!(p.is_out_of_bounds(1000.0));
    }
}
