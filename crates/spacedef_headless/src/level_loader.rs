//! Level and stats loading for headless runs.
//!
//! Levels live in a directory as `level{N}.ron` files; `N` is the level's
//! index in the unlock chain. The stats catalog is a single RON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use spacedef_core::error::GameError;
use spacedef_core::level::LevelDescriptor;
use spacedef_core::stats::StatCatalog;
use thiserror::Error;

/// Errors raised while loading level or stats files.
#[derive(Debug, Error)]
pub enum LevelLoadError {
    /// Failed to read a file or directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON.
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The file parsed but describes an unusable level or catalog.
    #[error(transparent)]
    Invalid(#[from] GameError),

    /// The level directory does not exist.
    #[error("Level directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// No level with this index was loaded.
    #[error("Level {0} not found")]
    NotFound(u32),
}

/// Loaded levels, keyed by index.
#[derive(Debug, Clone, Default)]
pub struct LevelLibrary {
    levels: BTreeMap<u32, LevelDescriptor>,
}

impl LevelLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a level.
    pub fn insert(&mut self, index: u32, level: LevelDescriptor) {
        self.levels.insert(index, level);
    }

    /// Load every `level{N}.ron` file in `dir`.
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn load_dir(dir: &Path) -> Result<Self, LevelLoadError> {
        if !dir.is_dir() {
            return Err(LevelLoadError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut library = Self::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(index) = level_index(&path) else {
                continue;
            };
            match load_level(&path) {
                Ok(level) => {
                    tracing::debug!(index, name = %level.name, "Loaded level");
                    library.insert(index, level);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping level file");
                }
            }
        }

        tracing::info!(count = library.len(), dir = %dir.display(), "Level library loaded");
        Ok(library)
    }

    /// Level by index.
    pub fn get(&self, index: u32) -> Result<&LevelDescriptor, LevelLoadError> {
        self.levels.get(&index).ok_or(LevelLoadError::NotFound(index))
    }

    /// Levels in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &LevelDescriptor)> {
        self.levels.iter().map(|(&index, level)| (index, level))
    }

    /// Number of loaded levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether no level was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Level index from a `level{N}.ron` path.
fn level_index(path: &Path) -> Option<u32> {
    if path.extension()? != "ron" {
        return None;
    }
    path.file_stem()?.to_str()?.strip_prefix("level")?.parse().ok()
}

/// Read, parse and validate one level file.
pub fn load_level(path: &Path) -> Result<LevelDescriptor, LevelLoadError> {
    let text = fs::read_to_string(path)?;
    let level: LevelDescriptor = ron::from_str(&text)?;
    level.validate()?;
    Ok(level)
}

/// Read a stats catalog.
pub fn load_stats(path: &Path) -> Result<StatCatalog, LevelLoadError> {
    let text = fs::read_to_string(path)?;
    Ok(StatCatalog::from_ron_str(&text, &path.display().to_string())?)
}

/// Find the level directory.
///
/// Checks `SPACEDEF_LEVEL_DIR`, then the usual locations relative to the
/// working directory.
pub fn default_level_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SPACEDEF_LEVEL_DIR") {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
    }

    ["data/levels", "../data/levels", "../../data/levels"]
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL: &str = r#"LevelDescriptor(
        name: "Test Ground",
        starting_buildings: [(blueprint: "CommandCenter", position: (x: 0.0, y: 0.0))],
        spawn_groups: [(spawn_time: 5.0, position: (x: -500.0, y: 0.0), counts: (2, 0, 0))],
    )"#;

    #[test]
    fn test_level_index_from_name() {
        assert_eq!(level_index(Path::new("levels/level3.ron")), Some(3));
        assert_eq!(level_index(Path::new("levels/level3.json")), None);
        assert_eq!(level_index(Path::new("levels/bonus.ron")), None);
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("level0.ron"), LEVEL).unwrap();
        fs::write(dir.path().join("level1.ron"), "LevelDescriptor(name: ").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = LevelLibrary::load_dir(dir.path()).unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.get(0).unwrap().name, "Test Ground");
        assert!(matches!(library.get(1), Err(LevelLoadError::NotFound(1))));
    }

    #[test]
    fn test_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            LevelLibrary::load_dir(&missing),
            Err(LevelLoadError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level0.ron");
        fs::write(&path, r#"LevelDescriptor(name: "Flat", half_width: 0.0)"#).unwrap();

        assert!(matches!(load_level(&path), Err(LevelLoadError::Invalid(_))));
    }

    #[test]
    fn test_malformed_level_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level0.ron");
        fs::write(&path, "LevelDescriptor(").unwrap();

        assert!(matches!(load_level(&path), Err(LevelLoadError::Parse(_))));
    }

    #[test]
    fn test_load_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.ron");
        fs::write(&path, r#"StatCatalog(groups: {"Fighter": {"Shield": Float(80.0)}})"#).unwrap();

        let stats = load_stats(&path).unwrap();
        assert_eq!(stats.group_count(), 1);
    }
}
