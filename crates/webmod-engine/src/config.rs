//! Engine configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Second press of a Speak gesture within this window escalates to a move
    pub double_press_window_ms: u64,
    /// Page mutations one automatic-action cascade may cause
    pub max_cascade_depth: usize,
    /// Minimum delay between two automatic moves of the same rule
    pub auto_move_cooldown_ms: u64,
    /// Module store directory
    pub modules_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            double_press_window_ms: 500,
            max_cascade_depth: 8,
            auto_move_cooldown_ms: 4000,
            modules_dir: PathBuf::from("webModules"),
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.double_press_window_ms == 0 {
            return Err(EngineError::Config("double_press_window_ms must be positive".into()));
        }
        if self.max_cascade_depth == 0 {
            return Err(EngineError::Config("max_cascade_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn double_press_window(&self) -> Duration {
        Duration::from_millis(self.double_press_window_ms)
    }

    pub fn auto_move_cooldown(&self) -> Duration {
        Duration::from_millis(self.auto_move_cooldown_ms)
    }
}
