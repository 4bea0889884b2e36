//! Crate configuration - plotting module selection and defaults
//!
//! Loaded from an `mplot.toml` discovered upward from the working directory,
//! then overridden by `MPLOT_*` environment variables. Everything has a
//! default, so configuration is entirely optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Dotted name of the plotting module imported at attach time.
    #[serde(default = "default_module")]
    pub module: String,

    /// Style applied right after the module is imported.
    #[serde(default)]
    pub style: Option<String>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
            style: None,
        }
    }
}

fn default_module() -> String {
    "matplotlib.pyplot".to_string()
}

impl PlotConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Find and load `mplot.toml` from the current directory or parents,
    /// then apply environment overrides. Falls back to defaults.
    pub fn discover() -> Self {
        let mut config = None;
        let mut current = std::env::current_dir().ok();

        while let Some(dir) = current {
            let config_path = dir.join("mplot.toml");
            if config_path.exists() {
                if let Ok(loaded) = Self::load(&config_path) {
                    config = Some(loaded);
                    break;
                }
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }

        let mut config = config.unwrap_or_default();
        config.apply_env();
        config
    }

    /// Apply `MPLOT_MODULE` / `MPLOT_STYLE` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(module) = std::env::var("MPLOT_MODULE") {
            if !module.is_empty() {
                self.backend.module = module;
            }
        }
        if let Ok(style) = std::env::var("MPLOT_STYLE") {
            if !style.is_empty() {
                self.backend.style = Some(style);
            }
        }
    }
}
