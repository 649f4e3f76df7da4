use std::path::Path;

use tracing::info;

use crate::config::{Settings, KEYS};

pub fn get_setting(settings: &Settings, key: &str) -> Result<String, String> {
    Ok(settings.get(key)?)
}

/// Change one setting and write the config file.
pub fn set_setting(
    settings: &mut Settings,
    path: &Path,
    key: &str,
    value: &str,
) -> Result<(), String> {
    info!("Setting {} = {}", key, value);
    settings.set(key, value)?;
    settings
        .save(path)
        .map_err(|e| format!("Failed to save config: {:#}", e))
}

/// Every setting with its current value.
pub fn list_settings(settings: &Settings) -> Vec<(&'static str, String)> {
    KEYS.iter()
        .map(|key| (*key, settings.get(key).unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_setting_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();

        set_setting(&mut settings, &path, "firebase.project_id", "nutrilife-app").unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(get_setting(&loaded, "firebase.project_id").unwrap(), "nutrilife-app");
    }

    #[test]
    fn test_list_covers_every_key() {
        let listed = list_settings(&Settings::default());
        assert_eq!(listed.len(), KEYS.len());
        assert!(listed.contains(&("history.local_when_signed_out", "true".to_string())));
    }
}
