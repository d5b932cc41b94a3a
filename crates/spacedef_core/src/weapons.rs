//! Weapons shared by ships and turrets.
//!
//! A weapon is a tiny state machine driven by its cooldown timer:
//!
//! ```text
//! Charging --(timer >= rate)--> Ready --(fire)--> Charging (timer = 0)
//! ```
//!
//! The timer only grows through [`Weapon::advance`]; it never fires on
//! its own. Ships and turrets call [`Weapon::try_fire`] when they have a
//! target in range.

use serde::{Deserialize, Serialize};

use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::ships::ShipId;

/// Speed of every projectile, in world units per second.
pub const PROJECTILE_SPEED: f32 = 50.0;

/// Weapon families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Rapid-fire bullets.
    Gatling,
    /// Beam weapon.
    Laser,
    /// Guided missile.
    Missile,
    /// Rail gun.
    RailGun,
}

impl WeaponKind {
    /// All weapon kinds.
    pub const ALL: [Self; 4] = [Self::Gatling, Self::Laser, Self::Missile, Self::RailGun];

    /// Damage dealt by one projectile of this kind.
    #[must_use]
    pub const fn damage(self) -> i32 {
        match self {
            Self::Gatling => 1,
            Self::Laser => 3,
            Self::Missile => 8,
            Self::RailGun => 10,
        }
    }

    /// Stock cooldown rate in seconds.
    #[must_use]
    pub const fn default_cooldown(self) -> f32 {
        match self {
            Self::Gatling => 0.15,
            Self::Laser => 0.5,
            Self::Missile => 2.0,
            Self::RailGun => 3.0,
        }
    }

    /// Config name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gatling => "Gatling",
            Self::Laser => "Laser",
            Self::Missile => "Missile",
            Self::RailGun => "RailGun",
        }
    }

    /// Parse a config name (case-insensitive).
    ///
    /// Accepts both the weapon names and their generic families
    /// (`rapidfire`, `beam`, `guided`, `rail`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gatling" | "rapidfire" => Some(Self::Gatling),
            "laser" | "beam" => Some(Self::Laser),
            "missile" | "missiles" | "guided" => Some(Self::Missile),
            "railgun" | "rail" => Some(Self::RailGun),
            _ => None,
        }
    }
}

/// Observable weapon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    /// Cooling down, cannot fire.
    Charging,
    /// Cooled down, fires on the next [`Weapon::try_fire`].
    Ready,
}

/// A weapon mount on a ship or turret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Weapon family.
    pub kind: WeaponKind,
    /// Mount position relative to the owner's center, in the owner's frame.
    pub mount: Vec2,
    /// Seconds accumulated since the last shot.
    pub cooldown: f32,
    /// Seconds required between shots.
    pub cooldown_rate: f32,
    /// Direction the weapon last aimed at (radians), for rendering.
    pub aim: f32,
}

impl Weapon {
    /// Create a weapon with the stock cooldown for its kind.
    #[must_use]
    pub fn new(kind: WeaponKind, mount: Vec2) -> Self {
        Self::with_cooldown(kind, mount, kind.default_cooldown())
    }

    /// Create a weapon with an explicit cooldown rate.
    #[must_use]
    pub fn with_cooldown(kind: WeaponKind, mount: Vec2, cooldown_rate: f32) -> Self {
        Self {
            kind,
            mount,
            cooldown: 0.0,
            cooldown_rate: cooldown_rate.max(0.0),
            aim: 0.0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WeaponState {
        if self.cooldown >= self.cooldown_rate {
            WeaponState::Ready
        } else {
            WeaponState::Charging
        }
    }

    /// Advance the cooldown timer.
    pub fn advance(&mut self, dt: f32) {
        self.cooldown += dt;
    }

    /// Aim from `origin` at `target` and fire if ready.
    ///
    /// The weapon always turns towards the target; a projectile is only
    /// produced (and the timer reset) when the weapon is [`WeaponState::Ready`].
    pub fn try_fire(
        &mut self,
        origin: Vec2,
        target: Vec2,
        owner: Option<ShipId>,
        faction: Faction,
    ) -> Option<Projectile> {
        let velocity = (target - origin).normalize_or_zero() * PROJECTILE_SPEED;
        self.aim = velocity.angle();

        if self.state() == WeaponState::Charging {
            return None;
        }

        self.cooldown = 0.0;
        Some(Projectile::new(self.kind, origin, velocity, owner, faction))
    }
}
