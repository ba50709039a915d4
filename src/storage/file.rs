//! JSON document store on the local filesystem

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use super::{Entries, PersistentStore};
use crate::error::StoreError;

/// Stores the whole mapping under one namespaced key of a JSON document.
///
/// Other top-level keys in the document are left untouched, so several
/// namespaces can share one file. Saves write a sibling `.tmp` file and
/// rename it over the original.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    namespace: String,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Option<Map<String, Value>>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    async fn load_all(&self) -> Result<Entries, StoreError> {
        let Some(mut document) = self.read_document().await? else {
            debug!(path = %self.path.display(), "No store document yet");
            return Ok(Entries::new());
        };

        match document.remove(&self.namespace) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Entries::new()),
        }
    }

    async fn save_all(&self, entries: &Entries) -> Result<(), StoreError> {
        let mut document = match self.read_document().await {
            Ok(document) => document.unwrap_or_default(),
            Err(StoreError::Serde(err)) => {
                warn!(path = %self.path.display(), error = %err, "Replacing unreadable store document");
                Map::new()
            }
            Err(err) => return Err(err),
        };
        document.insert(self.namespace.clone(), serde_json::to_value(entries)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec(&document)?).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "Saved store document");
        Ok(())
    }
}
