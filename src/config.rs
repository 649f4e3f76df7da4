//! User settings stored as TOML in the platform config directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;
use url::Url;

use crate::analyzer::gemini;
use crate::auth::firebase;
use crate::documents::firestore;
use crate::error::NutriLifeError;

const APP_DIR: &str = "nutrilife";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_DB: &str = "history.db";

/// Every key accepted by [`Settings::get`] and [`Settings::set`].
pub const KEYS: &[&str] = &[
    "ai.model",
    "ai.endpoint",
    "firebase.project_id",
    "firebase.auth_endpoint",
    "firebase.token_endpoint",
    "firebase.firestore_endpoint",
    "history.local_when_signed_out",
    "history.data_dir",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ai: AiSettings,
    pub firebase: FirebaseSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub model: String,
    pub endpoint: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: gemini::DEFAULT_MODEL.to_string(),
            endpoint: gemini::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseSettings {
    pub project_id: String,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub firestore_endpoint: String,
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            auth_endpoint: firebase::DEFAULT_AUTH_ENDPOINT.to_string(),
            token_endpoint: firebase::DEFAULT_TOKEN_ENDPOINT.to_string(),
            firestore_endpoint: firestore::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Keep history in the local slot while nobody is signed in.
    pub local_when_signed_out: bool,
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            local_when_signed_out: true,
            data_dir: None,
        }
    }
}

/// `<config_dir>/nutrilife/config.toml`
pub fn default_config_path() -> Result<PathBuf, NutriLifeError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| NutriLifeError::Config("Could not determine config directory".to_string()))
}

fn check_url(key: &str, value: &str) -> Result<(), NutriLifeError> {
    let url = Url::parse(value)
        .map_err(|e| NutriLifeError::Config(format!("{} is not a valid URL ({}): {}", key, e, value)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(NutriLifeError::Config(format!(
            "{} must be an http(s) URL: {}",
            key, value
        )));
    }
    Ok(())
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config {:?}", path))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Config path has no parent directory: {:?}", path))?;
        std::fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(path)?;

        info!("Wrote config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), NutriLifeError> {
        if self.ai.model.trim().is_empty() {
            return Err(NutriLifeError::Config("ai.model must not be empty".to_string()));
        }
        check_url("ai.endpoint", &self.ai.endpoint)?;
        check_url("firebase.auth_endpoint", &self.firebase.auth_endpoint)?;
        check_url("firebase.token_endpoint", &self.firebase.token_endpoint)?;
        check_url("firebase.firestore_endpoint", &self.firebase.firestore_endpoint)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String, NutriLifeError> {
        let value = match key {
            "ai.model" => self.ai.model.clone(),
            "ai.endpoint" => self.ai.endpoint.clone(),
            "firebase.project_id" => self.firebase.project_id.clone(),
            "firebase.auth_endpoint" => self.firebase.auth_endpoint.clone(),
            "firebase.token_endpoint" => self.firebase.token_endpoint.clone(),
            "firebase.firestore_endpoint" => self.firebase.firestore_endpoint.clone(),
            "history.local_when_signed_out" => self.history.local_when_signed_out.to_string(),
            "history.data_dir" => self
                .history
                .data_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set one value by dotted key. The result is validated before it is
    /// applied, so a rejected value leaves the settings unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), NutriLifeError> {
        let mut next = self.clone();
        match key {
            "ai.model" => next.ai.model = value.trim().to_string(),
            "ai.endpoint" => next.ai.endpoint = value.trim().to_string(),
            "firebase.project_id" => next.firebase.project_id = value.trim().to_string(),
            "firebase.auth_endpoint" => next.firebase.auth_endpoint = value.trim().to_string(),
            "firebase.token_endpoint" => next.firebase.token_endpoint = value.trim().to_string(),
            "firebase.firestore_endpoint" => {
                next.firebase.firestore_endpoint = value.trim().to_string()
            }
            "history.local_when_signed_out" => {
                next.history.local_when_signed_out = value.trim().parse().map_err(|_| {
                    NutriLifeError::Config(format!("{} must be true or false", key))
                })?
            }
            "history.data_dir" => {
                let value = value.trim();
                next.history.data_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => return Err(unknown_key(key)),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Directory holding the local history database.
    pub fn data_dir(&self) -> Result<PathBuf, NutriLifeError> {
        if let Some(dir) = &self.history.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| NutriLifeError::Config("Could not determine data directory".to_string()))
    }

    pub fn history_db_path(&self) -> Result<PathBuf, NutriLifeError> {
        Ok(self.data_dir()?.join(HISTORY_DB))
    }
}

fn unknown_key(key: &str) -> NutriLifeError {
    NutriLifeError::Config(format!(
        "Unknown setting '{}'. Known settings: {}",
        key,
        KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ai.model, "gemini-2.5-flash");
        assert!(settings.history.local_when_signed_out);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[firebase]\nproject_id = \"nutrilife-app\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.firebase.project_id, "nutrilife-app");
        assert_eq!(settings.firebase.firestore_endpoint, firestore::DEFAULT_ENDPOINT);
        assert_eq!(settings.ai, AiSettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.set("history.local_when_signed_out", "false").unwrap();
        settings.set("history.data_dir", "/tmp/nutrilife-data").unwrap();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.history_db_path().unwrap(),
            PathBuf::from("/tmp/nutrilife-data/history.db")
        );
    }

    #[test]
    fn test_get_set_by_key() {
        let mut settings = Settings::default();
        for key in KEYS {
            assert!(settings.get(key).is_ok(), "{} should be readable", key);
        }
        settings.set("ai.model", "gemini-2.5-pro").unwrap();
        assert_eq!(settings.get("ai.model").unwrap(), "gemini-2.5-pro");
        assert!(settings.get("ai.temperature").is_err());
        assert!(settings.set("nope", "1").is_err());
    }

    #[test]
    fn test_rejected_value_leaves_settings_unchanged() {
        let mut settings = Settings::default();
        assert!(settings.set("ai.endpoint", "not a url").is_err());
        assert!(settings.set("firebase.auth_endpoint", "ftp://example.com").is_err());
        assert!(settings.set("history.local_when_signed_out", "maybe").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ai]\nendpoint = \"nowhere\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
