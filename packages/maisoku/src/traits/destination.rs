//! Destination database trait for publishing listings as pages.

use async_trait::async_trait;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A typed property value understood by the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    PhoneNumber(String),
    Number(f64),
    Select(String),
    MultiSelect(Vec<String>),
}

/// A page created in the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPage {
    pub page_id: String,
    pub page_url: String,
}

/// Destination database (e.g. a Notion database).
#[async_trait]
pub trait Destination: Send + Sync {
    /// Names of the properties the destination exposes.
    async fn property_names(&self, destination_id: &str) -> Result<Vec<String>>;

    /// Create one page from ordered `(property name, value)` pairs.
    async fn create_page(
        &self,
        properties: &[(String, PropertyValue)],
        destination_id: &str,
    ) -> Result<CreatedPage>;
}

#[async_trait]
impl<T: Destination + ?Sized> Destination for Arc<T> {
    async fn property_names(&self, destination_id: &str) -> Result<Vec<String>> {
        (**self).property_names(destination_id).await
    }

    async fn create_page(
        &self,
        properties: &[(String, PropertyValue)],
        destination_id: &str,
    ) -> Result<CreatedPage> {
        (**self).create_page(properties, destination_id).await
    }
}
