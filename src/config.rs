//! Settings file management.
//!
//! Persists the user's two playback devices and the toggle hotkey to a flat
//! JSON file next to the executable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Hotkey used when the settings file does not provide one.
pub const DEFAULT_HOTKEY: &str = "ctrl+alt+s";

/// File name of the settings file.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration.
///
/// Field names on disk match the historical format of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Toggle key combination, e.g. `ctrl+alt+s`
    #[serde(rename = "hotkey")]
    pub hotkey: String,

    /// Friendly name of the first device
    #[serde(rename = "DEVICE1")]
    pub device1_name: String,

    /// Friendly name of the second device
    #[serde(rename = "DEVICE2")]
    pub device2_name: String,

    /// Endpoint ID of the first device
    #[serde(rename = "DEVICE1_ID")]
    pub device1_id: String,

    /// Endpoint ID of the second device
    #[serde(rename = "DEVICE2_ID")]
    pub device2_id: String,
}

impl Configuration {
    /// True once both device IDs have been chosen.
    pub fn is_configured(&self) -> bool {
        !self.device1_id.is_empty() && !self.device2_id.is_empty()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            hotkey: DEFAULT_HOTKEY.to_string(),
            device1_name: String::new(),
            device2_name: String::new(),
            device1_id: String::new(),
            device2_id: String::new(),
        }
    }
}

/// Settings store error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// File-based settings store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located next to the running executable.
    ///
    /// An elevated relaunch does not keep the caller's working directory, so
    /// the path is anchored to the executable rather than the CWD.
    pub fn beside_executable() -> Self {
        let path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::new(path)
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults on any failure.
    pub fn load(&self) -> Configuration {
        match self.try_load() {
            Ok(Some(config)) => config,
            Ok(None) => Configuration::default(),
            Err(e) => {
                warn!(error = %e, "Using default settings");
                Configuration::default()
            }
        }
    }

    /// Load the configuration. Returns `Ok(None)` if the file does not exist.
    pub fn try_load(&self) -> Result<Option<Configuration>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| ConfigError::ReadFailed {
            path: self.path.clone(),
            source,
        })?;

        let config = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(Some(config))
    }

    /// Save the configuration. Write failures are logged and swallowed.
    pub fn save(&self, config: &Configuration) {
        if let Err(e) = self.try_save(config) {
            warn!(error = %e, "Settings were not saved");
        }
    }

    /// Save the configuration, replacing the file contents.
    pub fn try_save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config
            .serialize(&mut serializer)
            .map_err(ConfigError::Serialize)?;

        fs::write(&self.path, buf).map_err(|source| ConfigError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join(CONFIG_FILE_NAME))
    }

    fn sample() -> Configuration {
        Configuration {
            hotkey: "ctrl+shift+f9".to_string(),
            device1_name: "Speakers (Realtek)".to_string(),
            device2_name: "耳机 (USB Audio)".to_string(),
            device1_id: "{0.0.0.00000000}.{aaaa}".to_string(),
            device2_id: "{0.0.0.00000000}.{bbbb}".to_string(),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_in(&dir).load();

        assert_eq!(config.hotkey, "ctrl+alt+s");
        assert!(config.device1_name.is_empty());
        assert!(config.device2_name.is_empty());
        assert!(config.device1_id.is_empty());
        assert!(config.device2_id.is_empty());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&sample());
        assert_eq!(store.load(), sample());
    }

    #[test]
    fn test_partial_file_is_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"DEVICE1": "Speakers", "DEVICE2_ID": "id-2"}"#).unwrap();

        let config = store.load();
        assert_eq!(config.hotkey, DEFAULT_HOTKEY);
        assert_eq!(config.device1_name, "Speakers");
        assert_eq!(config.device2_name, "");
        assert_eq!(config.device1_id, "");
        assert_eq!(config.device2_id, "id-2");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_each_missing_field_takes_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let full = serde_json::to_value(sample()).unwrap();
        let defaults = serde_json::to_value(Configuration::default()).unwrap();

        for key in ["hotkey", "DEVICE1", "DEVICE2", "DEVICE1_ID", "DEVICE2_ID"] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(key);
            fs::write(store.path(), partial.to_string()).unwrap();

            let loaded = serde_json::to_value(store.load()).unwrap();
            for (field, value) in loaded.as_object().unwrap() {
                let expected = if field == key { &defaults[field] } else { &full[field] };
                assert_eq!(value, expected, "field {field} with {key} missing");
            }
        }
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.try_load(), Err(ConfigError::Parse(_))));
        assert_eq!(store.load(), Configuration::default());
    }

    #[test]
    fn test_unknown_fields_dropped_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"hotkey": "alt+f1", "theme": "dark"}"#).unwrap();

        let config = store.load();
        assert_eq!(config.hotkey, "alt+f1");
        store.save(&config);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let keys: Vec<&String> = written.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(written.get("theme").is_none());
    }

    #[test]
    fn test_non_ascii_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("耳机 (USB Audio)"));
        assert!(raw.contains("\n    \"hotkey\""));
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("missing").join(CONFIG_FILE_NAME));

        assert!(matches!(
            store.try_save(&sample()),
            Err(ConfigError::WriteFailed { .. })
        ));
        store.save(&sample());
        assert_eq!(store.load(), Configuration::default());
    }
}
