//! In-memory object storage for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{MaisokuError, Result};
use crate::traits::store::{ObjectStore, PutOptions, StoredObject};

const URL_SCHEME: &str = "memory://";

/// In-memory storage for documents and rendered pages.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart. Objects are addressed as `memory://{path}`.
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, (Vec<u8>, PutOptions)>>,
    order: RwLock<Vec<String>>,
    failing: bool,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            failing: false,
        }
    }

    /// A store whose writes always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Paths written so far, in write order.
    pub fn paths(&self) -> Vec<String> {
        self.order.read().unwrap().clone()
    }

    /// Options an object was stored with.
    pub fn options(&self, path: &str) -> Option<PutOptions> {
        self.objects
            .read()
            .unwrap()
            .get(path)
            .map(|(_, options)| options.clone())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: &[u8], options: PutOptions) -> Result<StoredObject> {
        if self.failing {
            return Err(MaisokuError::storage(format!("write refused: {}", path)));
        }

        let previous = self
            .objects
            .write()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), options));
        if previous.is_none() {
            self.order.write().unwrap().push(path.to_string());
        }

        Ok(StoredObject {
            url: format!("{}{}", URL_SCHEME, path),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let path = url.strip_prefix(URL_SCHEME).unwrap_or(url);
        self.objects
            .read()
            .unwrap()
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| MaisokuError::storage(format!("no such object: {}", url)))
    }
}
