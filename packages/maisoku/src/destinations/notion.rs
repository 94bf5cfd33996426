//! Notion database destination.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::error::{MaisokuError, Result};
use crate::security::{validated_token, SecretString};
use crate::traits::destination::{CreatedPage, Destination, PropertyValue};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Publishes listings as pages of a Notion database.
#[derive(Clone)]
pub struct NotionDestination {
    client: Client,
    token: SecretString,
    base_url: String,
}

impl std::fmt::Debug for NotionDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionDestination")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NotionDestination {
    /// Create a destination from a raw integration token.
    pub fn new(raw_token: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            token: validated_token(raw_token)?,
            base_url: NOTION_API.to_string(),
        })
    }

    /// Set a custom API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.token.expose()))
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| MaisokuError::Destination(e.into()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MaisokuError::destination(format!(
                "Notion API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MaisokuError::Destination(e.into()))
    }
}

#[derive(Deserialize)]
struct DatabaseResponse {
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PageResponse {
    id: String,
    #[serde(default)]
    url: String,
}

#[async_trait]
impl Destination for NotionDestination {
    async fn property_names(&self, destination_id: &str) -> Result<Vec<String>> {
        let database: DatabaseResponse = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("databases/{}", destination_id),
            ))
            .await?;
        Ok(database.properties.into_keys().collect())
    }

    async fn create_page(
        &self,
        properties: &[(String, PropertyValue)],
        destination_id: &str,
    ) -> Result<CreatedPage> {
        let properties: Map<String, Value> = properties
            .iter()
            .map(|(name, value)| (name.clone(), property_json(value)))
            .collect();

        let body = json!({
            "parent": { "database_id": destination_id },
            "icon": { "emoji": "🏠" },
            "properties": properties,
        });

        let page: PageResponse = self
            .send(self.request(reqwest::Method::POST, "pages").json(&body))
            .await?;

        Ok(CreatedPage {
            page_id: page.id,
            page_url: page.url,
        })
    }
}

/// Notion JSON for one property value.
pub fn property_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
        PropertyValue::RichText(text) => {
            json!({ "rich_text": [{ "text": { "content": text } }] })
        }
        PropertyValue::PhoneNumber(phone) => json!({ "phone_number": phone }),
        PropertyValue::Number(n) => json!({ "number": n }),
        PropertyValue::Select(name) => json!({ "select": { "name": name } }),
        PropertyValue::MultiSelect(names) => json!({
            "multi_select": names.iter().map(|n| json!({ "name": n })).collect::<Vec<_>>()
        }),
    }
}
