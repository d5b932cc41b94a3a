//! Entity stat lookup.
//!
//! Ships, buildings and weapons read their starting numbers through the
//! [`StatsProvider`] trait: a case-insensitive `(group, key)` lookup that
//! always answers, falling back to a caller-supplied default when a key is
//! missing or has the wrong type. The in-memory [`StatCatalog`] is the
//! default provider and can be loaded from RON:
//!
//! ```ron
//! StatCatalog(
//!     groups: {
//!         "Fighter": {
//!             "Shield": Float(60.0),
//!             "Weapon1Type": Text("Laser"),
//!         },
//!     },
//! )
//! ```
//!
//! An empty catalog yields the stock game, since every lookup site passes
//! its stock value as the default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Vec2;

/// Key-value lookup service supplying initial entity stats.
///
/// Group and key matching is case-insensitive. Implementations never fail:
/// a missing or malformed entry is logged and `default` is returned.
pub trait StatsProvider {
    /// Look up an integer.
    fn get_int(&self, group: &str, key: &str, default: i64) -> i64;

    /// Look up a float.
    fn get_float(&self, group: &str, key: &str, default: f32) -> f32;

    /// Look up a 2D vector.
    fn get_vec2(&self, group: &str, key: &str, default: Vec2) -> Vec2;

    /// Look up a string.
    fn get_string(&self, group: &str, key: &str, default: &str) -> String;

    /// Whether the provider has any entries for `group`.
    fn has_group(&self, group: &str) -> bool;
}

/// A single stat value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f32),
    /// 2D vector value.
    Vec2(f32, f32),
    /// String value.
    Text(String),
}

impl StatValue {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec2(..) => "vec2",
            Self::Text(_) => "text",
        }
    }
}

/// In-memory stats table: group → key → value.
///
/// Names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatCatalog {
    #[serde(default)]
    groups: BTreeMap<String, BTreeMap<String, StatValue>>,
}

impl StatCatalog {
    /// Create an empty catalog (stock stats everywhere).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the text is not a valid catalog.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let parsed: Self = ron::from_str(source).map_err(|e| GameError::DataParse {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        Ok(parsed.normalized())
    }

    /// Set a value, replacing any previous value for the same key.
    pub fn set(&mut self, group: &str, key: &str, value: StatValue) {
        self.groups
            .entry(group.to_lowercase())
            .or_default()
            .insert(key.to_lowercase(), value);
    }

    /// Builder-style [`StatCatalog::set`].
    #[must_use]
    pub fn with(mut self, group: &str, key: &str, value: StatValue) -> Self {
        self.set(group, key, value);
        self
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn normalized(self) -> Self {
        let mut out = Self::new();
        for (group, entries) in self.groups {
            for (key, value) in entries {
                out.set(&group, &key, value);
            }
        }
        out
    }

    fn lookup(&self, group: &str, key: &str) -> Option<&StatValue> {
        let value = self
            .groups
            .get(&group.to_lowercase())
            .and_then(|entries| entries.get(&key.to_lowercase()));
        if value.is_none() {
            tracing::trace!(group, key, "Stat not set, using default");
        }
        value
    }
}

fn type_mismatch(group: &str, key: &str, expected: &str, found: &StatValue) {
    tracing::warn!(
        group,
        key,
        expected,
        found = found.type_name(),
        "Malformed stat, using default"
    );
}

impl StatsProvider for StatCatalog {
    fn get_int(&self, group: &str, key: &str, default: i64) -> i64 {
        match self.lookup(group, key) {
            None => default,
            Some(StatValue::Int(v)) => *v,
            Some(StatValue::Float(v)) if v.is_finite() => *v as i64,
            Some(other) => {
                type_mismatch(group, key, "int", other);
                default
            }
        }
    }

    fn get_float(&self, group: &str, key: &str, default: f32) -> f32 {
        match self.lookup(group, key) {
            None => default,
            Some(StatValue::Float(v)) if v.is_finite() => *v,
            Some(StatValue::Int(v)) => *v as f32,
            Some(other) => {
                type_mismatch(group, key, "float", other);
                default
            }
        }
    }

    fn get_vec2(&self, group: &str, key: &str, default: Vec2) -> Vec2 {
        match self.lookup(group, key) {
            None => default,
            Some(StatValue::Vec2(x, y)) if x.is_finite() && y.is_finite() => Vec2::new(*x, *y),
            Some(other) => {
                type_mismatch(group, key, "vec2", other);
                default
            }
        }
    }

    fn get_string(&self, group: &str, key: &str, default: &str) -> String {
        match self.lookup(group, key) {
            None => default.to_string(),
            Some(StatValue::Text(v)) => v.clone(),
            Some(other) => {
                type_mismatch(group, key, "text", other);
                default.to_string()
            }
        }
    }

    fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(&group.to_lowercase())
    }
}
