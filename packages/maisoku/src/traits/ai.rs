//! Service traits for LLM operations.
//!
//! The pipeline needs two black-box capabilities:
//! - Listing extraction: page text in, schema-shaped JSON (as raw text) out
//! - Vision classification: page image in, a label guess (as raw text) out
//!
//! Both return the model's raw answer. Parsing, validation and fallback
//! are the pipeline's job, so implementations stay thin.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Extraction service for listing fields.
///
/// Implementations wrap a specific LLM provider and handle prompting.
/// The answer should be a JSON object mapping field names to
/// `{value, confidence, evidence}`, optionally inside a fenced code block.
#[async_trait]
pub trait ListingExtractor: Send + Sync {
    /// Extract listing fields from one page's text.
    async fn extract(&self, text: &str, page_index: usize) -> Result<String>;
}

/// Vision classification service for rendered pages.
///
/// The answer should be a JSON object `{type, confidence, reasoning?}`,
/// optionally inside a fenced code block.
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    /// Classify one base64-encoded PNG page image.
    async fn classify(&self, image_base64: &str) -> Result<String>;
}

#[async_trait]
impl<T: ListingExtractor + ?Sized> ListingExtractor for Arc<T> {
    async fn extract(&self, text: &str, page_index: usize) -> Result<String> {
        (**self).extract(text, page_index).await
    }
}

#[async_trait]
impl<T: VisionClassifier + ?Sized> VisionClassifier for Arc<T> {
    async fn classify(&self, image_base64: &str) -> Result<String> {
        (**self).classify(image_base64).await
    }
}
