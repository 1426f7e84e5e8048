//! Application configuration
//!
//! Read once at startup from `cadprompt.ron` in the working directory.
//! Every section and field is optional; missing ones take their defaults.

use std::path::Path;

use cp_core::{ExportConfig, LoadConfig};
use cp_renderer::{SceneConfig, ViewerOptions};
use serde::{Deserialize, Serialize};

/// Configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "cadprompt.ron";

/// Error type for configuration I/O
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model source and load deadline
    pub load: LoadConfig,
    /// Mesh export settings
    pub export: ExportConfig,
    /// Model viewer options
    pub viewer: ViewerOptions,
    /// Decorative scene settings
    pub scene: SceneConfig,
}

impl AppConfig {
    /// Parse from RON text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Serialize to pretty RON text
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron(&content)
    }

    /// Save to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Load from `path` if it exists, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring broken config file");
                Self::default()
            }
        }
    }
}
