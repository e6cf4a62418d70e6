//! Configuration management for Reshare

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ConfigError, Result};
use crate::settings::{SettingsStore, GENERAL_SETTINGS_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON settings document
    pub path: String,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            store: StoreConfig {
                path: "~/.local/share/reshare/settings.json".to_string(),
            },
        }
    }

    /// The settings store path with `~` expanded
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store.path).to_string())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("RESHARE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("reshare").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("reshare"))
}

/// Operator-tunable rules for which published content is eligible for
/// re-sharing. Persisted as one blob in the settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Minimum age (days) a post must have before it is shared again
    pub minimum_post_age: u32,
    /// Maximum age (days) beyond which posts are no longer shared
    pub maximum_post_age: u32,
    /// How many posts to share per cycle
    pub number_of_posts: u32,
    /// Whether a post may be shared more than once
    pub more_than_once: bool,
    pub selected_post_types: Vec<String>,
    /// Encoded `"<taxonomy>_<term>"` values, parsed by the selection module
    pub selected_taxonomies: Vec<String>,
    pub exclude_taxonomies: bool,
    pub selected_posts: Vec<String>,
    pub exclude_posts: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            minimum_post_age: 30,
            maximum_post_age: 365,
            number_of_posts: 1,
            more_than_once: true,
            selected_post_types: vec!["post".to_string()],
            selected_taxonomies: Vec::new(),
            exclude_taxonomies: false,
            selected_posts: Vec::new(),
            exclude_posts: false,
        }
    }
}

impl GeneralSettings {
    /// Load stored settings, falling back to defaults when nothing is
    /// stored yet
    pub fn load(store: &Arc<dyn SettingsStore>) -> Result<Self> {
        match store.get(GENERAL_SETTINGS_KEY)? {
            Some(value) => {
                serde_json::from_value(value).map_err(crate::error::SettingsError::Serialize)
                    .map_err(Into::into)
            }
            None => Ok(Self::default()),
        }
    }

    /// Persist these settings and return the stored value
    pub fn save(&self, store: &Arc<dyn SettingsStore>) -> Result<Self> {
        let blob = serde_json::to_value(self).map_err(crate::error::SettingsError::Serialize)?;
        store.set(GENERAL_SETTINGS_KEY, blob)?;
        Self::load(store)
    }
}
