//! Filesystem object store.

use async_trait::async_trait;
use maisoku::{MaisokuError, ObjectStore, PutOptions, Result, StoredObject};
use std::path::{Path, PathBuf};

/// Stores objects as files under a root directory, addressed as `file://` URLs.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        // Object paths are relative; never let one climb out of the root.
        let relative: PathBuf = Path::new(path)
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect();
        self.root.join(relative)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, bytes: &[u8], _options: PutOptions) -> Result<StoredObject> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MaisokuError::Storage(e.into()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| MaisokuError::Storage(e.into()))?;

        Ok(StoredObject {
            url: format!("file://{}", target.display()),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read(path)
            .await
            .map_err(|e| MaisokuError::Storage(e.into()))
    }
}
