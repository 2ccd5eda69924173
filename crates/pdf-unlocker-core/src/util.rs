//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Path of the per-user config file (`<config dir>/pdf-unlocker/config.toml`).
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("pdf-unlocker").join("config.toml"))
}
