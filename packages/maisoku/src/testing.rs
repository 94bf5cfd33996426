//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the maisoku library
//! without making real LLM or destination calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{MaisokuError, Result};
use crate::traits::{
    ai::{ListingExtractor, VisionClassifier},
    destination::{CreatedPage, Destination, PropertyValue},
};

/// A mock extraction service.
///
/// Answers are chosen in order: the first registered needle contained in
/// the page text, then a per-page answer, then the default answer. The
/// default is an empty JSON object.
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// Answers keyed by a substring of the page text
    by_text: Arc<RwLock<Vec<(String, String)>>>,

    /// Answers keyed by page index
    by_page: Arc<RwLock<HashMap<usize, String>>>,

    default_response: Option<String>,
    failing: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockExtractorCall {
    pub text: String,
    pub page_index: usize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// An extractor whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Answer used when nothing more specific matches.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Answer for any page whose text contains `needle`.
    pub fn with_response_for(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.by_text
            .write()
            .unwrap()
            .push((needle.into(), response.into()));
        self
    }

    /// Answer for a page index.
    pub fn with_page_response(self, page_index: usize, response: impl Into<String>) -> Self {
        self.by_page
            .write()
            .unwrap()
            .insert(page_index, response.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl ListingExtractor for MockExtractor {
    async fn extract(&self, text: &str, page_index: usize) -> Result<String> {
        self.calls.write().unwrap().push(MockExtractorCall {
            text: text.to_string(),
            page_index,
        });

        if self.failing {
            return Err(MaisokuError::service("mock extractor failure"));
        }

        let by_text = self
            .by_text
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, response)| response.clone());
        if let Some(response) = by_text {
            return Ok(response);
        }

        if let Some(response) = self.by_page.read().unwrap().get(&page_index) {
            return Ok(response.clone());
        }

        Ok(self
            .default_response
            .clone()
            .unwrap_or_else(|| "{}".to_string()))
    }
}

/// A mock vision service.
///
/// Answers `{"type": "other", "confidence": 0.5}` unless told otherwise.
#[derive(Clone, Default)]
pub struct MockClassifier {
    default_response: Option<String>,
    failing: bool,

    /// Base64 payloads received, in call order
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A classifier whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Set the answer for every call.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Get all payloads sent to this mock.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl VisionClassifier for MockClassifier {
    async fn classify(&self, image_base64: &str) -> Result<String> {
        self.calls.write().unwrap().push(image_base64.to_string());

        if self.failing {
            return Err(MaisokuError::service("mock classifier failure"));
        }

        Ok(self
            .default_response
            .clone()
            .unwrap_or_else(|| r#"{"type": "other", "confidence": 0.5}"#.to_string()))
    }
}

/// A mock destination database.
#[derive(Clone, Default)]
pub struct MockDestination {
    property_names: Vec<String>,
    failing_pages: bool,

    /// Property payloads of created pages, in creation order
    created: Arc<RwLock<Vec<Vec<(String, PropertyValue)>>>>,
}

impl MockDestination {
    /// Create a destination exposing the given properties.
    pub fn new(property_names: Vec<String>) -> Self {
        Self {
            property_names,
            ..Self::default()
        }
    }

    /// Make every page creation fail.
    pub fn failing_pages(mut self) -> Self {
        self.failing_pages = true;
        self
    }

    /// Payloads of pages created so far.
    pub fn created(&self) -> Vec<Vec<(String, PropertyValue)>> {
        self.created.read().unwrap().clone()
    }
}

#[async_trait]
impl Destination for MockDestination {
    async fn property_names(&self, _destination_id: &str) -> Result<Vec<String>> {
        Ok(self.property_names.clone())
    }

    async fn create_page(
        &self,
        properties: &[(String, PropertyValue)],
        destination_id: &str,
    ) -> Result<CreatedPage> {
        if self.failing_pages {
            return Err(MaisokuError::destination("mock page creation failure"));
        }

        let mut created = self.created.write().unwrap();
        created.push(properties.to_vec());
        let page_id = format!("page-{}", created.len());

        Ok(CreatedPage {
            page_url: format!("https://notion.test/{}/{}", destination_id, page_id),
            page_id,
        })
    }
}
