//! Configuration handling for the framelink demo binary.
//!
//! Reads an optional TOML file into a runtime configuration with sane
//! defaults, so the binary works without any file present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use framelink_wire::DEFAULT_MAX_FRAME_SIZE;

/// Runtime configuration for the frame engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum frame size in bytes
    pub max_frame_size: usize,
    /// Whether written frames carry a CRC32 trailer
    pub checksum: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            checksum: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file, falling back to defaults
    /// when no path is given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
