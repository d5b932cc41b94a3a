//! Ship name generation.

use rand::Rng;
use serde::{Deserialize, Serialize};

const STOCK_WORDS: [&str; 24] = [
    "Aurora", "Basilisk", "Cinder", "Dauntless", "Ember", "Falcon", "Gale", "Halcyon",
    "Ironclad", "Jackal", "Kestrel", "Lumen", "Meridian", "Nomad", "Onyx", "Pioneer",
    "Quasar", "Radiant", "Sable", "Tempest", "Umbra", "Vigil", "Warden", "Zephyr",
];

/// Builds two-word ship names from a word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameGenerator {
    words: Vec<String>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::with_words(STOCK_WORDS.iter().map(ToString::to_string))
    }
}

impl NameGenerator {
    /// Generator over the stock word list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator over a custom word list. Blank entries are dropped.
    #[must_use]
    pub fn with_words(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            words: words
                .into_iter()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Pick a name; `"Unnamed"` if the list is empty.
    pub fn generate(&self, rng: &mut impl Rng) -> String {
        if self.words.is_empty() {
            return "Unnamed".to_string();
        }
        let first = &self.words[rng.gen_range(0..self.words.len())];
        let second = &self.words[rng.gen_range(0..self.words.len())];
        format!("{first} {second}")
    }
}
