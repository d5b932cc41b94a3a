//! Ships: stats, physics, damage and collision.
//!
//! Ship physics is local to the ship: `velocity.x` is the forward speed along
//! the heading and `velocity.y` the angular rate. Only position and heading
//! are global. Thrust requested by the AI is clamped in [`Ship::set_thrust`]
//! and becomes the acceleration applied by the next [`Ship::integrate`].

use serde::{Deserialize, Serialize};

use crate::ai::MinerHold;
use crate::buildings::BuildingId;
use crate::factions::Faction;
use crate::math::Vec2;
use crate::projectiles::Projectile;
use crate::registry::RegistryEntry;
use crate::stats::StatsProvider;
use crate::steering::{compute_thrust, PidState, Thrust};
use crate::weapons::{Weapon, WeaponKind};

// ============================================================================
// Constants
// ============================================================================

/// Seconds without being hit before shields start regenerating.
pub const SHIELD_REGEN_DELAY: f32 = 5.0;

/// Shield points regenerated per second.
pub const SHIELD_REGEN_RATE: f32 = 10.0;

/// Fraction of velocity kept each physics step.
pub const VELOCITY_DECAY: f32 = 0.99;

/// Forward thrust limit as a fraction of max forward velocity.
pub const FORWARD_THRUST_FRACTION: f32 = 0.05;

/// Angular thrust limit as a fraction of max angular velocity.
pub const ANGULAR_THRUST_FRACTION: f32 = 0.01;

/// Fraction of the half extents used by the hit box.
pub const HIT_BOX_SCALE: f32 = 0.8;

/// Strength of the ship-to-ship separation heuristic.
pub const SEPARATION_STRENGTH: f32 = 50.0;

// ============================================================================
// Identifiers and kinds
// ============================================================================

/// Unique identifier of a ship within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShipId(pub u32);

/// The kinds of ships in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipKind {
    /// Player mining ship.
    Miner,
    /// Small player attack ship.
    Fighter,
    /// Medium player warship.
    Destroyer,
    /// Large player warship.
    Carrier,
    /// Wave-spawned enemy of the given tier (0 small, 1 medium, 2 large).
    Enemy(u8),
}

impl ShipKind {
    /// Number of enemy tiers.
    pub const ENEMY_TIERS: u8 = 3;

    /// Faction that flies ships of this kind.
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Enemy(_) => Faction::Enemy,
            _ => Faction::Player,
        }
    }

    /// Stats group name for this kind.
    #[must_use]
    pub fn stat_group(self) -> String {
        match self {
            Self::Miner => "Miner".to_string(),
            Self::Fighter => "Fighter".to_string(),
            Self::Destroyer => "Destroyer".to_string(),
            Self::Carrier => "Carrier".to_string(),
            Self::Enemy(tier) => format!("Enemy{tier}"),
        }
    }

    /// Parse a player ship name as used by shipyard configs (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "miner" => Some(Self::Miner),
            "fighter" => Some(Self::Fighter),
            "destroyer" => Some(Self::Destroyer),
            "carrier" => Some(Self::Carrier),
            _ => None,
        }
    }

    /// Whether this kind counts towards the player's fleet for the loss check.
    #[must_use]
    pub const fn is_player_fleet(self) -> bool {
        matches!(
            self,
            Self::Miner | Self::Fighter | Self::Destroyer | Self::Carrier
        )
    }
}

// ============================================================================
// Ship class (stats)
// ============================================================================

/// Static description of a ship kind, read from stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipClass {
    /// Maximum shield.
    pub max_shield: f32,
    /// Maximum hull.
    pub max_hull: f32,
    /// Maximum forward speed (x) and angular rate (y).
    pub max_velocity: Vec2,
    /// Frame size (width along the heading, height across it).
    pub size: Vec2,
    /// Number of hull damage skins.
    pub hull_tiers: u32,
    /// Number of distinct debris chunks.
    pub chunk_count: u32,
    /// Weapon loadout.
    pub weapons: Vec<Weapon>,
}

fn stock_weapons(mounts: &[(WeaponKind, f32, f32)]) -> Vec<Weapon> {
    mounts
        .iter()
        .map(|&(kind, x, y)| Weapon::new(kind, Vec2::new(x, y)))
        .collect()
}

impl ShipClass {
    /// Built-in stats for a ship kind.
    #[must_use]
    pub fn stock(kind: ShipKind) -> Self {
        use WeaponKind::{Gatling, Laser, Missile, RailGun};

        let (shield, hull, velocity, size, tiers, chunks, mounts): (
            f32,
            f32,
            (f32, f32),
            (f32, f32),
            u32,
            u32,
            &[(WeaponKind, f32, f32)],
        ) = match kind {
            ShipKind::Miner => (20.0, 40.0, (600.0, 60.0), (32.0, 28.0), 3, 2, &[]),
            ShipKind::Fighter => (
                50.0,
                100.0,
                (900.0, 80.0),
                (40.0, 36.0),
                3,
                3,
                &[(Gatling, 4.0, 10.0), (Gatling, 4.0, -10.0)],
            ),
            ShipKind::Destroyer => (
                150.0,
                300.0,
                (600.0, 50.0),
                (96.0, 48.0),
                4,
                4,
                &[(Laser, 20.0, 0.0), (Missile, -20.0, 0.0)],
            ),
            ShipKind::Carrier => (
                300.0,
                600.0,
                (400.0, 40.0),
                (160.0, 80.0),
                4,
                6,
                &[(RailGun, 40.0, 0.0), (Missile, -30.0, 20.0), (Missile, -30.0, -20.0)],
            ),
            ShipKind::Enemy(0) => (
                30.0,
                60.0,
                (900.0, 80.0),
                (36.0, 36.0),
                3,
                2,
                &[(Gatling, 10.0, 0.0)],
            ),
            ShipKind::Enemy(1) => (
                100.0,
                200.0,
                (600.0, 50.0),
                (72.0, 40.0),
                3,
                3,
                &[(Laser, 10.0, 8.0), (Laser, 10.0, -8.0)],
            ),
            ShipKind::Enemy(_) => (
                250.0,
                500.0,
                (400.0, 40.0),
                (140.0, 70.0),
                4,
                5,
                &[(RailGun, 30.0, 0.0), (Missile, -20.0, 15.0), (Missile, -20.0, -15.0)],
            ),
        };

        Self {
            max_shield: shield,
            max_hull: hull,
            max_velocity: Vec2::new(velocity.0, velocity.1),
            size: Vec2::new(size.0, size.1),
            hull_tiers: tiers,
            chunk_count: chunks,
            weapons: stock_weapons(mounts),
        }
    }

    /// Stats for a ship kind, with the stock values as defaults.
    ///
    /// Keys in the kind's group: `Shield`, `Hull`, `MaxVelocity`, `Size`,
    /// `HullTiers`, `ChunkCount`, `WeaponCount`, `Weapon{n}Type`,
    /// `Weapon{n}Pos` (1-based). Cooldowns come from the `Weapons` group as
    /// `{Type}CoolDown`.
    #[must_use]
    pub fn load(kind: ShipKind, stats: &dyn StatsProvider) -> Self {
        let stock = Self::stock(kind);
        let group = kind.stat_group();

        let weapon_count = stats
            .get_int(&group, "WeaponCount", stock.weapons.len() as i64)
            .max(0) as usize;
        let mut weapons = Vec::with_capacity(weapon_count);
        for index in 0..weapon_count {
            let stock_weapon = stock.weapons.get(index);
            let default_type = stock_weapon.map_or(WeaponKind::Gatling, |w| w.kind).name();
            let default_mount = stock_weapon.map_or(Vec2::ZERO, |w| w.mount);

            let type_name = stats.get_string(&group, &format!("Weapon{}Type", index + 1), default_type);
            let Some(weapon_kind) = WeaponKind::from_name(&type_name) else {
                tracing::warn!(group = %group, weapon = %type_name, "Unknown weapon type, skipping mount");
                continue;
            };
            let mount = stats.get_vec2(&group, &format!("Weapon{}Pos", index + 1), default_mount);
            weapons.push(load_weapon(weapon_kind, mount, stats));
        }

        Self {
            max_shield: stats.get_float(&group, "Shield", stock.max_shield).max(0.0),
            max_hull: stats.get_float(&group, "Hull", stock.max_hull).max(0.0),
            max_velocity: clamp_non_negative(stats.get_vec2(&group, "MaxVelocity", stock.max_velocity)),
            size: clamp_non_negative(stats.get_vec2(&group, "Size", stock.size)),
            hull_tiers: stats
                .get_int(&group, "HullTiers", i64::from(stock.hull_tiers))
                .max(1) as u32,
            chunk_count: stats
                .get_int(&group, "ChunkCount", i64::from(stock.chunk_count))
                .max(0) as u32,
            weapons,
        }
    }
}

/// Build a weapon whose cooldown may be overridden by the `Weapons` stats group.
pub fn load_weapon(kind: WeaponKind, mount: Vec2, stats: &dyn StatsProvider) -> Weapon {
    let rate = stats.get_float(
        "Weapons",
        &format!("{}CoolDown", kind.name()),
        kind.default_cooldown(),
    );
    Weapon::with_cooldown(kind, mount, rate)
}

fn clamp_non_negative(v: Vec2) -> Vec2 {
    Vec2::new(v.x.max(0.0), v.y.max(0.0))
}

// ============================================================================
// Ship
// ============================================================================

/// Result of a projectile hitting a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// The shield took the damage.
    ShieldAbsorbed,
    /// The hull took the damage and the ship survived.
    HullDamaged,
    /// The ship was destroyed by this hit.
    Destroyed,
}

/// A ship in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Unique id, assigned by the registry.
    pub id: ShipId,
    /// Generated display name.
    pub name: String,
    /// Ship kind.
    pub kind: ShipKind,
    /// Side this ship fights for.
    pub faction: Faction,
    /// Center position.
    pub position: Vec2,
    /// Heading in radians (not normalized).
    pub heading: f32,
    /// Forward speed (x) and angular rate (y).
    pub velocity: Vec2,
    /// Forward (x) and angular (y) acceleration from the last thrust request.
    pub acceleration: Vec2,
    /// Maximum forward speed (x) and angular rate (y).
    pub max_velocity: Vec2,
    /// Frame size.
    pub size: Vec2,
    /// Current shield.
    pub shield: f32,
    /// Maximum shield.
    pub max_shield: f32,
    /// Current hull.
    pub hull: f32,
    /// Maximum hull.
    pub max_hull: f32,
    /// Number of hull damage skins.
    pub hull_tiers: u32,
    /// Number of distinct debris chunks.
    pub chunk_count: u32,
    /// Weapon mounts.
    pub weapons: Vec<Weapon>,
    /// Steering controller memory.
    pub pid: PidState,
    /// Seconds since the ship was created.
    pub age: f32,
    /// Seconds since the ship was last hit.
    pub since_last_hit: f32,
    /// Behaviour clock driving orbit offsets.
    pub clock: f32,
    /// Shipyard that built this ship, if any.
    pub home: Option<BuildingId>,
    /// Mining state, for miners.
    pub hold: Option<MinerHold>,
    dead: bool,
}

impl RegistryEntry for Ship {
    fn entry_id(&self) -> u32 {
        self.id.0
    }

    fn assign_id(&mut self, id: u32) {
        self.id = ShipId(id);
    }
}

impl Ship {
    /// Create a ship of `kind` from its class at `position`, facing +x.
    #[must_use]
    pub fn new(kind: ShipKind, class: &ShipClass, position: Vec2, name: impl Into<String>) -> Self {
        Self {
            id: ShipId(0),
            name: name.into(),
            kind,
            faction: kind.faction(),
            position,
            heading: 0.0,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            max_velocity: class.max_velocity,
            size: class.size,
            shield: class.max_shield,
            max_shield: class.max_shield,
            hull: class.max_hull,
            max_hull: class.max_hull,
            hull_tiers: class.hull_tiers.max(1),
            chunk_count: class.chunk_count,
            weapons: class.weapons.clone(),
            pid: PidState::default(),
            age: 0.0,
            since_last_hit: 0.0,
            clock: 0.0,
            home: None,
            hold: (kind == ShipKind::Miner).then(MinerHold::default),
            dead: false,
        }
    }

    /// Set the home shipyard.
    #[must_use]
    pub fn with_home(mut self, home: BuildingId) -> Self {
        self.home = Some(home);
        self
    }

    /// Set the initial behaviour clock.
    #[must_use]
    pub fn with_clock(mut self, clock: f32) -> Self {
        self.clock = clock;
        self
    }

    /// Whether the ship has been destroyed.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Destroy the ship (e.g. when its shipyard is destroyed).
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// Footprint area used by the separation heuristic.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// Request thrust, clamped to this ship's limits.
    pub fn set_thrust(&mut self, thrust: Thrust) {
        let max_forward = self.max_velocity.x * FORWARD_THRUST_FRACTION;
        let max_angular = self.max_velocity.y * ANGULAR_THRUST_FRACTION;
        self.acceleration = Vec2::new(
            thrust.forward.clamp(-max_forward, max_forward),
            thrust.angular.clamp(-max_angular, max_angular),
        );
    }

    /// Run the PID controller towards `target` and apply the resulting thrust.
    pub fn steer_towards(&mut self, target: Vec2, dt: f32) {
        let thrust = compute_thrust(
            self.position,
            self.heading,
            target,
            self.max_velocity.x,
            dt,
            &mut self.pid,
        );
        self.set_thrust(thrust);
    }

    /// Advance timers, shields, physics and weapon cooldowns by `dt`.
    pub fn integrate(&mut self, dt: f32) {
        self.age += dt;
        self.clock += dt;
        self.since_last_hit += dt;

        if self.since_last_hit > SHIELD_REGEN_DELAY && self.shield < self.max_shield {
            self.shield = (self.shield + SHIELD_REGEN_RATE * dt).min(self.max_shield);
        }

        self.velocity += self.acceleration * dt;
        self.velocity = self.velocity * VELOCITY_DECAY;
        self.velocity.x = self.velocity.x.clamp(0.0, self.max_velocity.x);
        self.velocity.y = self
            .velocity
            .y
            .clamp(-self.max_velocity.y, self.max_velocity.y);

        self.heading += self.velocity.y * dt;
        self.position += Vec2::new(self.velocity.x * dt, 0.0).rotate(self.heading);

        for weapon in &mut self.weapons {
            weapon.advance(dt);
        }
    }

    /// Hull damage skin index: 0 when intact, `hull_tiers - 1` when wrecked.
    #[must_use]
    pub fn damage_tier(&self) -> usize {
        let ratio = if self.max_hull > 0.0 {
            (self.hull / self.max_hull).clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((self.hull_tiers.max(1) - 1) as f32 * (1.0 - ratio)) as usize
    }

    /// Apply one projectile's damage with strict layering.
    ///
    /// The shield takes the whole hit while it is above zero; the hull is
    /// only touched once the shield is already empty when the hit lands.
    /// Nothing overflows from shield to hull within a single hit.
    pub fn hit(&mut self, damage: f32) -> HitOutcome {
        self.since_last_hit = 0.0;
        let damage = damage.max(0.0);

        if self.shield > 0.0 {
            self.shield = (self.shield - damage).max(0.0);
            HitOutcome::ShieldAbsorbed
        } else if self.hull > 0.0 {
            self.hull = (self.hull - damage).max(0.0);
            if self.hull <= 0.0 {
                self.dead = true;
                HitOutcome::Destroyed
            } else {
                HitOutcome::HullDamaged
            }
        } else {
            self.dead = true;
            HitOutcome::Destroyed
        }
    }

    /// Whether a world point lies inside this ship's hit box.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        let local = (point - self.position).rotate(-self.heading);
        let half = self.size * (0.5 * HIT_BOX_SCALE);
        local.x > -half.x && local.x < half.x && local.y > -half.y && local.y < half.y
    }

    /// Collision test for a projectile at `point`, with a cheap distance reject.
    #[must_use]
    pub fn check_projectile(&self, point: Vec2) -> bool {
        if point.distance(self.position) > self.size.x {
            return false;
        }
        self.contains_point(point)
    }

    /// Aim every weapon at `target`; ready weapons fire.
    pub fn fire_at(&mut self, target: Vec2) -> Vec<Projectile> {
        let position = self.position;
        let heading = self.heading;
        let owner = Some(self.id);
        let faction = self.faction;
        self.weapons
            .iter_mut()
            .filter_map(|weapon| {
                let origin = position + weapon.mount.rotate(heading);
                weapon.try_fire(origin, target, owner, faction)
            })
            .collect()
    }
}

/// Start-of-phase view of a ship, used for separation and targeting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipSnapshot {
    /// Ship id.
    pub id: ShipId,
    /// Kind.
    pub kind: ShipKind,
    /// Faction.
    pub faction: Faction,
    /// Position at snapshot time.
    pub position: Vec2,
    /// Footprint area.
    pub area: f32,
}

impl From<&Ship> for ShipSnapshot {
    fn from(ship: &Ship) -> Self {
        Self {
            id: ship.id,
            kind: ship.kind,
            faction: ship.faction,
            position: ship.position,
            area: ship.area(),
        }
    }
}

/// Inverse-cube push away from every other ship, scaled by their area.
///
/// O(n²) over the snapshot. Ships at exactly the same position exert no push.
#[must_use]
pub fn separation_push(id: ShipId, position: Vec2, others: &[ShipSnapshot], dt: f32) -> Vec2 {
    let mut push = Vec2::ZERO;
    for other in others {
        if other.id == id || other.position == position {
            continue;
        }
        let offset = position - other.position;
        let distance = offset.length();
        let strength = SEPARATION_STRENGTH / distance.powi(3);
        push += offset.normalize_or_zero() * (strength * other.area * dt);
    }
    push
}
