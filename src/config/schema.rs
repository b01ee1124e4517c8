//! Configuration schema types for `conveyor.toml`
//!
//! Every field is defaulted so a project without a config file gets the
//! stock `App/` layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration, one immutable value per process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Asset category roots and source subpaths
    #[serde(default)]
    pub paths: AssetPaths,
    /// Dev server settings
    #[serde(default)]
    pub serve: ServeConfig,
    /// Watch loop settings
    #[serde(default)]
    pub watch: WatchConfig,
    /// Script lint settings
    #[serde(default)]
    pub lint: LintSettings,
}

/// Static mapping from asset categories to directories.
///
/// All paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Where compiled script bundles land
    #[serde(default = "default_scripts_root")]
    pub scripts_root: PathBuf,
    /// Hand-written script sources
    #[serde(default = "default_scripts_src")]
    pub scripts_src: PathBuf,
    /// Where the compiled stylesheet lands
    #[serde(default = "default_styles_root")]
    pub styles_root: PathBuf,
    /// SCSS sources
    #[serde(default = "default_styles_src")]
    pub styles_src: PathBuf,
    /// All image assets
    #[serde(default = "default_images_root")]
    pub images_root: PathBuf,
    /// Individual images that get packed into the sprite sheet
    #[serde(default = "default_sprite_src")]
    pub sprite_src: PathBuf,
    /// Handlebars template sources
    #[serde(default = "default_templates_root")]
    pub templates_root: PathBuf,
}

fn default_scripts_root() -> PathBuf {
    PathBuf::from("App/Scripts")
}

fn default_scripts_src() -> PathBuf {
    PathBuf::from("App/Scripts/Source")
}

fn default_styles_root() -> PathBuf {
    PathBuf::from("App/Styles")
}

fn default_styles_src() -> PathBuf {
    PathBuf::from("App/Styles/Scss")
}

fn default_images_root() -> PathBuf {
    PathBuf::from("App/Images")
}

fn default_sprite_src() -> PathBuf {
    PathBuf::from("App/Images/Sprite")
}

fn default_templates_root() -> PathBuf {
    PathBuf::from("App/Views")
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            scripts_root: default_scripts_root(),
            scripts_src: default_scripts_src(),
            styles_root: default_styles_root(),
            styles_src: default_styles_src(),
            images_root: default_images_root(),
            sprite_src: default_sprite_src(),
            templates_root: default_templates_root(),
        }
    }
}

impl AssetPaths {
    /// Compiled script bundle, relative to the project root
    pub fn script_bundle(&self) -> PathBuf {
        self.scripts_root.join("App.js")
    }

    /// Compiled template registrations, relative to the project root
    pub fn template_bundle(&self) -> PathBuf {
        self.scripts_root.join("Templates.js")
    }

    /// Compiled stylesheet, relative to the project root
    pub fn style_bundle(&self) -> PathBuf {
        self.styles_root.join("App.css")
    }

    /// Source map for the compiled stylesheet
    pub fn style_bundle_map(&self) -> PathBuf {
        self.styles_root.join("App.css.map")
    }

    /// Packed sprite sheet image
    pub fn sprite_image(&self) -> PathBuf {
        self.images_root.join("Sprite.png")
    }

    /// Generated sprite stylesheet fragment, consumed by the style pipeline
    pub fn sprite_fragment(&self) -> PathBuf {
        self.styles_src.join("Sprite.scss")
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Port the dev server binds to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Delay before connected clients are told to refresh, so writes settle
    #[serde(default = "default_reload_delay")]
    pub reload_delay_ms: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_reload_delay() -> u64 {
    250
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { port: default_port(), reload_delay_ms: default_reload_delay() }
    }
}

/// Watch loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Window for coalescing bursts of filesystem events
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

fn default_debounce() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce() }
    }
}

/// Script lint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintSettings {
    /// Rule-set file, relative to the project root
    #[serde(default = "default_lint_rules")]
    pub rules: PathBuf,
}

fn default_lint_rules() -> PathBuf {
    PathBuf::from(".lintrc")
}

impl Default for LintSettings {
    fn default() -> Self {
        Self { rules: default_lint_rules() }
    }
}

impl Config {
    /// Resolve a configured relative path against the project root.
    pub fn resolve(&self, root: &Path, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            root.join(rel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.paths.styles_src, PathBuf::from("App/Styles/Scss"));
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.reload_delay_ms, 250);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str("[serve]\nport = 8080\n").unwrap();
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.reload_delay_ms, 250);
        assert_eq!(config.paths.scripts_src, PathBuf::from("App/Scripts/Source"));
    }

    #[test]
    fn test_derived_outputs() {
        let paths = AssetPaths::default();
        assert_eq!(paths.script_bundle(), PathBuf::from("App/Scripts/App.js"));
        assert_eq!(paths.sprite_fragment(), PathBuf::from("App/Styles/Scss/Sprite.scss"));
        assert_eq!(paths.sprite_image(), PathBuf::from("App/Images/Sprite.png"));
    }
}
