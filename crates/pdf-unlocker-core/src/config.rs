use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Marker inserted before the extension of the unlocked copy.
pub const DEFAULT_MARKER: &str = " [Unlocked]";

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

const fn default_true() -> bool {
    true
}

/// Application configuration
///
/// The password is intentionally absent: runs always open the source with an
/// empty password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text inserted before `.pdf` in the output file name
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Open the containing folder after a successful run
    #[serde(default = "default_true")]
    pub reveal_output: bool,

    /// Compress streams in the unlocked copy
    #[serde(default = "default_true")]
    pub compress: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            reveal_output: true,
            compress: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-unlocker/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(user_config) = crate::util::user_config_path() {
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            match Self::from_file(local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject markers that would produce an empty change or escape the
    /// source directory.
    pub fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.marker.contains(['/', '\\']) {
            return Err(Error::ConfigInvalid {
                field: "marker".to_string(),
                reason: "must not contain path separators".to_string(),
            });
        }
        Ok(())
    }
}
