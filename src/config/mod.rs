//! Project configuration: schema types and file discovery

pub mod loader;
pub mod schema;

pub use loader::{
    find_config_from, load_config, load_or_default, merge_cli_overrides, CliOverrides,
    ConfigError, CONFIG_FILE,
};
pub use schema::{AssetPaths, Config, LintSettings, ServeConfig, WatchConfig};
