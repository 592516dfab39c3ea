mod config;
pub mod database;
mod memory;

pub use config::{Config, NotificationsConfig, ShortcutsConfig, StorageConfig};
pub use database::Database;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use crate::error::StorageError;

/// Store key for the persisted [`crate::timer::TimerConfig`].
pub const TIMER_CONFIG_KEY: &str = "pomodoro_config";
/// Store key for the persisted [`crate::task::TaskLedgerState`].
pub const TASKS_KEY: &str = "pomodoro_todos";
/// Store key for the persisted [`crate::stats::StatsLog`].
pub const STATS_KEY: &str = "pomodoro_stats";

/// Returns `~/.config/pomodojo[-dev]/` based on POMODOJO_ENV.
///
/// Set POMODOJO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMODOJO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomodojo-dev")
    } else {
        base_dir.join("pomodojo")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Persistent string key-value storage.
///
/// Values are JSON documents. [`KeyValueStore::load`] and
/// [`KeyValueStore::save`] do the (de)serialization on top of the raw calls.
pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Load `key`, falling back to `T::default()` when it is missing or holds
    /// something that no longer parses.
    fn load<T>(&self, key: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Default,
        Self: Sized,
    {
        match self.get_raw(key)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(value),
                Err(e) => {
                    warn!(key, error = %e, "stored value is unreadable, using default");
                    Ok(T::default())
                }
            },
            None => Ok(T::default()),
        }
    }

    fn save<T>(&self, key: &str, value: &T) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
        Self: Sized,
    {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &json)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_raw(key, value)
    }
}
