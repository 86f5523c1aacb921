use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::error::{AppError, AppResult};

pub const APP_NAME: &str = "search-for-infinity";
const SETTINGS_FILE: &str = "settings.json";

/// Non-secret connection fields remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/search-for-infinity/settings.json` for the current user.
    pub fn user_default() -> AppResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| AppError::Settings("no user config directory".to_string()))?;
        Ok(Self::new(dir.join(APP_NAME).join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<SavedSettings> {
        if !self.path.exists() {
            return Ok(SavedSettings::default());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| AppError::Settings(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Settings(format!("{}: {e}", self.path.display())))
    }

    /// Like [`load`](Self::load), but an unreadable file is logged and
    /// treated as empty so it never blocks a command.
    pub fn load_or_default(&self) -> SavedSettings {
        self.load().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unreadable settings file");
            SavedSettings::default()
        })
    }

    pub fn save(&self, settings: &SavedSettings) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("{}: {e}", parent.display())))?;
        }

        let raw = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Settings(e.to_string()))?;
        fs::write(&self.path, raw)
            .map_err(|e| AppError::Settings(format!("{}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| AppError::Settings(format!("{}: {e}", self.path.display())))?;
        }
        Ok(())
    }
}

/// Where the password lives. Keyed by database username.
pub trait SecretStore {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, secret: &str) -> AppResult<()>;
    fn delete(&self, key: &str) -> AppResult<()>;
}

pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> AppResult<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| AppError::Secret(format!("Failed to create entry: {e}")))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::Secret(format!("Failed to get password: {e}"))),
        }
    }

    fn set(&self, key: &str, secret: &str) -> AppResult<()> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| AppError::Secret(format!("Failed to set password: {e}")))
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::Secret(format!("Failed to delete password: {e}"))),
        }
    }
}

/// Process-local secret store for tests and keyring-less environments.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let secrets = self
            .secrets
            .lock()
            .map_err(|_| AppError::Secret("secret store poisoned".to_string()))?;
        Ok(secrets.get(key).cloned())
    }

    fn set(&self, key: &str, secret: &str) -> AppResult<()> {
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|_| AppError::Secret("secret store poisoned".to_string()))?;
        secrets.insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|_| AppError::Secret("secret store poisoned".to_string()))?;
        secrets.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join(SETTINGS_FILE));

        assert_eq!(store.load().unwrap(), SavedSettings::default());
    }

    #[test]
    fn save_then_load_returns_same_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join(SETTINGS_FILE));
        let settings = SavedSettings {
            host: Some("db.internal".into()),
            port: Some(5433),
            database: Some("billing".into()),
            username: Some("auditor".into()),
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), SavedSettings::default());
    }

    #[test]
    fn corrupt_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path);
        assert!(matches!(store.load(), Err(AppError::Settings(_))));
        assert_eq!(store.load_or_default(), SavedSettings::default());
    }

    #[test]
    fn memory_store_set_get_delete() {
        let store = MemorySecretStore::default();
        assert_eq!(store.get("bob").unwrap(), None);

        store.set("bob", "pw").unwrap();
        assert_eq!(store.get("bob").unwrap().as_deref(), Some("pw"));

        store.delete("bob").unwrap();
        assert_eq!(store.get("bob").unwrap(), None);
    }
}
