use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "OWM_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// timezone = "Europe/Madrid"
/// routes_enabled = true
/// listen = "127.0.0.1:8000"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeatherMap API key. `OWM_API_KEY` takes precedence.
    pub api_key: Option<String>,

    /// IANA timezone identifier all timestamps are rendered in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Whether the `/owmapi` routes are registered at all.
    #[serde(default = "default_routes_enabled")]
    pub routes_enabled: bool,

    /// Listen address for the HTTP server.
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

const fn default_routes_enabled() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8000".to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            timezone: default_timezone(),
            routes_enabled: default_routes_enabled(),
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Resolve the API key: environment first, then the config file.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or_else(|| {
            anyhow!(
                "No OpenWeatherMap API key configured.\n\
                 Hint: set `api_key` in the config file or export {API_KEY_ENV}."
            )
        })
    }

    /// Load config from disk, or return defaults if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "owm-api", "owm-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
