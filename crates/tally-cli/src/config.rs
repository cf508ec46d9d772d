//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_core::config::SyncSettings;
use tally_core::util::normalize_text_option;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "tally";

pub const USER_ENV: &str = "TALLY_USER";
pub const API_URL_ENV: &str = "TALLY_API_URL";
pub const API_TOKEN_ENV: &str = "TALLY_API_TOKEN";
pub const DATA_DIR_ENV: &str = "TALLY_DATA_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncSettings,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Overlay `TALLY_*` environment variables
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(user_id) = normalize_text_option(lookup(USER_ENV)) {
            self.user_id = Some(user_id);
        }
        if let Some(url) = normalize_text_option(lookup(API_URL_ENV)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(API_TOKEN_ENV)) {
            self.api_token = Some(token);
        }
        if let Some(dir) = normalize_text_option(lookup(DATA_DIR_ENV)) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    fn normalize(&mut self) {
        self.user_id = normalize_text_option(self.user_id.take());
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.api_token = normalize_text_option(self.api_token.take());
        self.data_dir = self
            .data_dir
            .take()
            .filter(|dir| !dir.as_os_str().is_empty());
    }
}
