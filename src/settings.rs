//! Settings for one storage instance.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

const fn default_port() -> u16 {
    21
}

const fn default_passive() -> bool {
    true
}

/// Connection parameters and directory layout for one storage instance.
///
/// The root is immutable for the lifetime of the storage built from it.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default = "default_passive")]
    pub passive: bool,
    /// Base directory under which every logical path resolves.
    pub root: String,
    /// Local staging directory for retrieved files.
    pub tmp: PathBuf,
}

impl StorageSettings {
    /// Loads settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| StorageError::Local(e.to_string()))
    }
}
