//! On-disk unlock flags.
//!
//! The profile is a RON file holding `Level{N}_Unlocked` flags. A missing
//! file is a fresh profile.

use std::fs;
use std::path::{Path, PathBuf};

use spacedef_core::error::GameError;
use spacedef_core::unlocks::UnlockFlags;
use thiserror::Error;

/// Errors raised while reading or writing the profile.
#[derive(Debug, Error)]
pub enum UnlockStoreError {
    /// Failed to read or write the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The flags could not be parsed or serialized.
    #[error(transparent)]
    Data(#[from] GameError),
}

/// Unlock flags stored at a fixed path.
#[derive(Debug, Clone)]
pub struct UnlockStore {
    path: PathBuf,
}

impl UnlockStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the flags, or a fresh profile when the file does not exist.
    pub fn load(&self) -> Result<UnlockFlags, UnlockStoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No unlock file, starting fresh");
            return Ok(UnlockFlags::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(UnlockFlags::from_ron_str(&text, &self.path.display().to_string())?)
    }

    /// Write the flags, creating parent directories as needed.
    pub fn save(&self, flags: &UnlockFlags) -> Result<(), UnlockStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, flags.to_ron_string()?)?;
        Ok(())
    }
}
