use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tubelog_core::RecordSource;

const APP_NAME: &str = "tubelog";

/// User settings read from `<config_dir>/tubelog/config.toml`.
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Activity items requested per API fetch (capped at 50)
    pub max_results: u32,
    pub api_export_filename: String,
    pub takeout_export_filename: String,
    /// Channels shown in the summary after an API ingestion
    pub api_top_channels: usize,
    /// Channels shown in the summary after a Takeout ingestion
    pub takeout_top_channels: usize,
    pub search_limit: usize,
    /// Where `find` looks when no directory is given
    pub takeout_search_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_results: 50,
            api_export_filename: "watch_history.json".to_string(),
            takeout_export_filename: "takeout_watch_history.json".to_string(),
            api_top_channels: 5,
            takeout_top_channels: 10,
            search_limit: 20,
            takeout_search_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn export_filename(&self, source: RecordSource) -> &str {
        match source {
            RecordSource::Api => &self.api_export_filename,
            RecordSource::Takeout => &self.takeout_export_filename,
        }
    }

    pub fn top_channels(&self, source: RecordSource) -> usize {
        match source {
            RecordSource::Api => self.api_top_channels,
            RecordSource::Takeout => self.takeout_top_channels,
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .context("cannot find config dir")
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load the user config, falling back to defaults when no file exists.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
