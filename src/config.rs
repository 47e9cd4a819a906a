// ⚙️ Kiosk Configuration - JSON file, every field optional

use crate::rules::AccessPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub policy: AccessPolicy,

    /// "Verificando..." pause before a decision is shown (front-end only)
    pub verify_delay_ms: u64,

    /// How long a decision stays on screen before `reset()` (front-end only)
    pub reset_delay_ms: u64,

    /// SQLite file backing the record store
    pub database_path: PathBuf,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            policy: AccessPolicy::default(),
            verify_delay_ms: 600,
            reset_delay_ms: 3000,
            database_path: PathBuf::from("gym.db"),
        }
    }
}

impl KioskConfig {
    /// Load config from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: KioskConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// File config when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
