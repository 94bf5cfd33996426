//! Object storage trait for documents and rendered pages.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Options for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// Whether the object is publicly readable
    pub public: bool,

    /// MIME type of the object
    pub content_type: String,
}

impl PutOptions {
    /// Public object with the given content type.
    pub fn public(content_type: impl Into<String>) -> Self {
        Self {
            public: true,
            content_type: content_type.into(),
        }
    }
}

/// A stored object's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
}

/// Storage for input documents, rendered pages and reports.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes at a path and return the object's URL.
    async fn put(&self, path: &str, bytes: &[u8], options: PutOptions) -> Result<StoredObject>;

    /// Fetch the bytes behind a URL.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn put(&self, path: &str, bytes: &[u8], options: PutOptions) -> Result<StoredObject> {
        (**self).put(path, bytes, options).await
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        (**self).get(url).await
    }
}
