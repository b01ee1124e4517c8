//! Configuration loading and discovery for `conveyor.toml`

use super::schema::Config;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "conveyor.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("failed to parse conveyor.toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI arguments that override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override dev server port
    pub port: Option<u16>,
}

/// Find `conveyor.toml` by walking up from the given directory.
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|candidate| candidate.is_file())
}

/// Load configuration from an explicit file path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// Discover and load configuration, falling back to defaults.
///
/// Returns the config together with the project root it applies to: the
/// directory holding `conveyor.toml` when one was found, otherwise `start`.
pub fn load_or_default(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    match find_config_from(start) {
        Some(path) => {
            let config = load_config(&path)?;
            let root =
                path.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| start.to_path_buf());
            Ok((config, root))
        }
        None => Ok((Config::default(), start.to_path_buf())),
    }
}

/// Apply CLI overrides on top of loaded configuration.
pub fn merge_cli_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(port) = overrides.port {
        config.serve.port = port;
    }
}
