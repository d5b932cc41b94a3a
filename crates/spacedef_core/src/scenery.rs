//! Scenery: mineral fields, junk and drifting hull debris.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::registry::{Registry, RegistryEntry};

/// Seconds a hull chunk drifts before it is removed.
pub const HULL_CHUNK_MAX_AGE: f32 = 3.0;

/// Unique identifier of a scenery item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SceneryId(pub u32);

/// What a scenery item is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneryKind {
    /// Mineable asteroid field.
    Mineral {
        /// Radius miners orbit within.
        radius: f32,
        /// Minerals left.
        minerals: i32,
        /// Starting minerals.
        max_minerals: i32,
    },
    /// Static decoration.
    Junk,
    /// Wreckage from a destroyed ship.
    Hull {
        /// Ship hull damage skin the chunk came from.
        chunk: u32,
        /// Drift velocity per second.
        velocity: Vec2,
        /// Spin in radians per second.
        spin: f32,
        /// Seconds since the chunk was created.
        age: f32,
        /// Seconds before removal.
        max_age: f32,
    },
}

/// A scenery item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenery {
    /// Unique id.
    pub id: SceneryId,
    /// Position.
    pub position: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    /// Variant data.
    pub kind: SceneryKind,
}

impl RegistryEntry for Scenery {
    fn entry_id(&self) -> u32 {
        self.id.0
    }

    fn assign_id(&mut self, id: u32) {
        self.id = SceneryId(id);
    }
}

impl Scenery {
    /// Minerals left, or `None` for non-mineral scenery.
    #[must_use]
    pub fn minerals(&self) -> Option<i32> {
        match self.kind {
            SceneryKind::Mineral { minerals, .. } => Some(minerals),
            _ => None,
        }
    }

    /// Mining radius, or `None` for non-mineral scenery.
    #[must_use]
    pub fn mineral_radius(&self) -> Option<f32> {
        match self.kind {
            SceneryKind::Mineral { radius, .. } => Some(radius),
            _ => None,
        }
    }

    /// Whether this is a mineral field with minerals left.
    #[must_use]
    pub fn has_minerals(&self) -> bool {
        self.minerals().is_some_and(|m| m > 0)
    }
}

/// All scenery in the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneryField {
    items: Registry<Scenery>,
}

impl SceneryField {
    /// Create an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, position: Vec2, rotation: f32, kind: SceneryKind) -> SceneryId {
        SceneryId(self.items.insert(Scenery {
            id: SceneryId(0),
            position,
            rotation,
            kind,
        }))
    }

    /// Add a mineral field holding `minerals`.
    pub fn add_mineral(&mut self, position: Vec2, radius: f32, minerals: i32) -> SceneryId {
        let minerals = minerals.max(0);
        self.insert(
            position,
            0.0,
            SceneryKind::Mineral {
                radius: radius.max(0.0),
                minerals,
                max_minerals: minerals,
            },
        )
    }

    /// Add a piece of junk.
    pub fn add_junk(&mut self, position: Vec2, rotation: f32) -> SceneryId {
        self.insert(position, rotation, SceneryKind::Junk)
    }

    /// Add a drifting hull chunk.
    pub fn add_hull_chunk(
        &mut self,
        position: Vec2,
        rotation: f32,
        chunk: u32,
        velocity: Vec2,
        spin: f32,
    ) -> SceneryId {
        self.insert(
            position,
            rotation,
            SceneryKind::Hull {
                chunk,
                velocity,
                spin,
                age: 0.0,
                max_age: HULL_CHUNK_MAX_AGE,
            },
        )
    }

    /// Get a scenery item.
    #[must_use]
    pub fn get(&self, id: SceneryId) -> Option<&Scenery> {
        self.items.get(id.0)
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenery> {
        self.items.iter()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Nearest mineral field that still holds minerals.
    ///
    /// Ties keep the lower id.
    #[must_use]
    pub fn closest_mineral(&self, position: Vec2) -> Option<&Scenery> {
        self.items
            .iter()
            .filter(|s| s.has_minerals())
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
    }

    /// Take up to `amount` minerals from a field. Returns what was taken.
    pub fn mine(&mut self, id: SceneryId, amount: i32) -> i32 {
        let Some(item) = self.items.get_mut(id.0) else {
            return 0;
        };
        match &mut item.kind {
            SceneryKind::Mineral { minerals, .. } => {
                let taken = amount.clamp(0, *minerals);
                *minerals -= taken;
                taken
            }
            _ => 0,
        }
    }

    /// Minerals left across every field.
    #[must_use]
    pub fn total_minerals(&self) -> i64 {
        self.items
            .iter()
            .filter_map(Scenery::minerals)
            .map(i64::from)
            .sum()
    }

    /// True when no mineral field has minerals left (or none exist).
    #[must_use]
    pub fn all_resources_consumed(&self) -> bool {
        !self.items.iter().any(Scenery::has_minerals)
    }

    /// Drift and age hull chunks. Returns the ids of removed chunks.
    pub fn update(&mut self, dt: f32, half_width: f32) -> Vec<SceneryId> {
        for item in self.items.iter_mut() {
            if let SceneryKind::Hull {
                velocity, spin, age, ..
            } = &mut item.kind
            {
                *age += dt;
                item.rotation += *spin * dt;
                item.position += *velocity * dt;
            }
        }

        self.items
            .drain_where(|item| match item.kind {
                SceneryKind::Hull { age, max_age, .. } => {
                    age >= max_age
                        || item.position.x.abs() > half_width
                        || item.position.y.abs() > half_width
                }
                _ => false,
            })
            .into_iter()
            .map(|item| item.id)
            .collect()
    }
}
