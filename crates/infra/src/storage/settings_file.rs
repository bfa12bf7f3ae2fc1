//! JSON file settings store
//!
//! All keys live in one JSON object on disk. Writes go to a sibling
//! temporary file that is renamed over the original.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mlauth_common::auth::{AuthError, SettingsStore};
use mlauth_domain::constants::SETTINGS_FILE_NAME;
use mlauth_domain::MlAuthError;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::InfraError;

/// Settings store backed by a JSON file
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// `<user config dir>/mlauth/state.json`
    ///
    /// # Errors
    /// Returns `MlAuthError::Platform` if the platform has no config
    /// directory.
    pub fn default_path() -> Result<PathBuf, MlAuthError> {
        dirs::config_dir()
            .map(|dir| dir.join("mlauth").join(SETTINGS_FILE_NAME))
            .ok_or_else(|| MlAuthError::Platform("no user config directory".to_string()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, InfraError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(InfraError(MlAuthError::Storage(format!(
                "settings file {} is not a JSON object",
                self.path.display()
            )))),
        }
    }

    async fn write_all(&self, values: &Map<String, Value>) -> Result<(), InfraError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), keys = values.len(), "Settings written");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, AuthError> {
        let _guard = self.lock.lock().await;
        let values = self.read_all().await?;
        Ok(values.get(key).cloned())
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value);
        self.write_all(&values).await?;
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            self.write_all(&values).await?;
        }
        Ok(())
    }
}
