//! Durable key/value state storage.
//!
//! Every persisted collection lives under one well-known key, serialized as
//! JSON in the format the original deployment wrote. Values that fail to
//! parse are treated as absent so startup falls back to defaults instead of
//! crashing.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// The well-known persisted state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Devices,
    Archived,
    Notes,
    ChangeLogs,
    AdminPassword,
    Theme,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Devices => "devices",
            StoreKey::Archived => "archived",
            StoreKey::Notes => "notes",
            StoreKey::ChangeLogs => "changeLogs",
            StoreKey::AdminPassword => "admin_password",
            StoreKey::Theme => "theme",
        }
    }
}

/// Key/value storage backing the repository and the auth gate.
///
/// Implementations are cheap to clone and share one underlying store, so
/// the repository and the auth gate can write through the same state.
pub trait StateStore {
    /// Read the raw serialized value for a key, if present.
    fn get_raw(&self, key: StoreKey) -> Result<Option<String>>;

    /// Write the raw serialized value for a key, replacing any prior value.
    fn put_raw(&self, key: StoreKey, value: &str) -> Result<()>;

    /// Read and deserialize a value. A corrupt value is logged and treated
    /// as absent rather than surfaced as an error.
    fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>>
    where
        Self: Sized,
    {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key = key.as_str(), %err, "stored value is corrupt, using defaults");
                Ok(None)
            }
        }
    }

    /// Serialize and write a value.
    fn put<T: Serialize>(&self, key: StoreKey, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw)
    }
}

/// In-memory store for tests and the `--dev` mode of the CLI.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<&'static str, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_raw(&self, key: StoreKey) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| crate::InventoryError::LockPoisoned("memory store".to_string()))?;
        Ok(values.get(key.as_str()).cloned())
    }

    fn put_raw(&self, key: StoreKey, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| crate::InventoryError::LockPoisoned("memory store".to_string()))?;
        values.insert(key.as_str(), value.to_string());
        Ok(())
    }
}

/// Display theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    #[serde(rename = "light")]
    Light,
    #[serde(rename = "dark")]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Load the saved theme, defaulting to light.
pub fn load_theme(store: &impl StateStore) -> Result<Theme> {
    Ok(store.get(StoreKey::Theme)?.unwrap_or_default())
}

/// Persist the theme preference.
pub fn save_theme(store: &impl StateStore, theme: Theme) -> Result<()> {
    store.put(StoreKey::Theme, &theme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        let value: Option<Vec<String>> = store.get(StoreKey::Devices).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn put_then_get_roundtrips() {
        let store = MemoryStore::new();
        store
            .put(StoreKey::Devices, &vec!["a".to_string(), "b".to_string()])
            .unwrap();
        let value: Option<Vec<String>> = store.get(StoreKey::Devices).unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn corrupt_value_reads_as_none() {
        let store = MemoryStore::new();
        store.put_raw(StoreKey::Notes, "{not json").unwrap();
        let value: Option<Vec<String>> = store.get(StoreKey::Notes).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.put_raw(StoreKey::Theme, "\"dark\"").unwrap();
        assert_eq!(
            other.get_raw(StoreKey::Theme).unwrap().as_deref(),
            Some("\"dark\"")
        );
    }

    #[test]
    fn theme_defaults_to_light_and_toggles() {
        let store = MemoryStore::new();
        assert_eq!(load_theme(&store).unwrap(), Theme::Light);
        save_theme(&store, Theme::Light.toggled()).unwrap();
        assert_eq!(load_theme(&store).unwrap(), Theme::Dark);
        assert_eq!(
            store.get_raw(StoreKey::Theme).unwrap().as_deref(),
            Some("\"dark\"")
        );
    }
}
