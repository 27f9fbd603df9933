//! Pipeline Output Store
//!
//! The pipeline's latest outputs live in a single flat JSON file. There is no
//! schema and no locking: the poller overwrites it, the API reads it.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads and writes the persisted pipeline outputs document.
#[derive(Clone, Debug)]
pub struct OutputStore {
    path: PathBuf,
}

impl OutputStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the stored document with `outputs`, pretty-printed.
    pub async fn save(&self, outputs: &Value) -> Result<()> {
        let json = serde_json::to_string_pretty(outputs)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write outputs to {}", self.path.display()))?;
        info!(path = %self.path.display(), "Pipeline outputs saved");
        Ok(())
    }

    /// Loads the stored document.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds JSON `null`.
    /// Only `null` counts as absent: `false`, `0`, `""` and empty containers
    /// are returned as stored. A file that exists but is not valid JSON is an
    /// error.
    pub async fn load(&self) -> Result<Option<Value>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let value: Value = serde_json::from_slice(&data)
            .with_context(|| format!("{} does not contain valid JSON", self.path.display()))?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("outputs.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_overwrites() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("outputs.json"));

        store.save(&json!({ "plans": ["old"] })).await.unwrap();
        store
            .save(&json!({ "plans": [{ "isp": "Bell", "price": 55 }] }))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, json!({ "plans": [{ "isp": "Bell", "price": 55 }] }));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'), "outputs should be pretty-printed");
    }

    #[tokio::test]
    async fn test_stored_null_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("outputs.json"));
        store.save(&Value::Null).await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_falsy_values_are_still_present() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("outputs.json"));
        for value in [json!(false), json!(0), json!(""), json!([])] {
            store.save(&value).await.unwrap();
            assert_eq!(store.load().await.unwrap(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outputs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = OutputStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("valid JSON"));
    }
}
