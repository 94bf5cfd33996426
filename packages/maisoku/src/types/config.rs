//! Configuration for the batch pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for batch processing and publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Documents processed concurrently.
    ///
    /// Default: 3.
    pub file_concurrency: usize,

    /// Minimum gap between extraction service calls.
    ///
    /// Default: 500ms.
    pub extraction_delay: Duration,

    /// Minimum gap between vision service calls.
    ///
    /// Default: 500ms.
    pub classification_delay: Duration,

    /// Minimum gap between destination page creations.
    ///
    /// Default: 500ms.
    pub publish_delay: Duration,

    /// Characters of page text kept as candidate preview.
    ///
    /// This is also the text sent to the extraction service. Default: 500.
    pub preview_chars: usize,

    /// Base used for placeholder URLs when storage fails.
    pub placeholder_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file_concurrency: 3,
            extraction_delay: Duration::from_millis(500),
            classification_delay: Duration::from_millis(500),
            publish_delay: Duration::from_millis(500),
            preview_chars: 500,
            placeholder_base_url: "https://example.com".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set file-level concurrency (minimum 1).
    pub fn with_file_concurrency(mut self, concurrency: usize) -> Self {
        self.file_concurrency = concurrency.max(1);
        self
    }

    /// Set one delay for every external service.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.extraction_delay = delay;
        self.classification_delay = delay;
        self.publish_delay = delay;
        self
    }

    /// Set the extraction delay.
    pub fn with_extraction_delay(mut self, delay: Duration) -> Self {
        self.extraction_delay = delay;
        self
    }

    /// Set the classification delay.
    pub fn with_classification_delay(mut self, delay: Duration) -> Self {
        self.classification_delay = delay;
        self
    }

    /// Set the preview length.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Set the placeholder URL base.
    pub fn with_placeholder_base_url(mut self, url: impl Into<String>) -> Self {
        self.placeholder_base_url = url.into();
        self
    }

    /// Placeholder URL for a stored object that could not be written.
    pub fn placeholder_url(&self, session_id: &str, name: &str) -> String {
        format!(
            "{}/mock-{}/{}",
            self.placeholder_base_url.trim_end_matches('/'),
            session_id,
            name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.file_concurrency, 3);
        assert_eq!(config.extraction_delay, Duration::from_millis(500));
        assert_eq!(config.preview_chars, 500);
    }

    #[test]
    fn test_placeholder_url() {
        let config = PipelineConfig::new().with_placeholder_base_url("https://cdn.test/");
        assert_eq!(
            config.placeholder_url("abc", "flyer.pdf"),
            "https://cdn.test/mock-abc/flyer.pdf"
        );
    }

    #[test]
    fn test_concurrency_floor() {
        assert_eq!(PipelineConfig::new().with_file_concurrency(0).file_concurrency, 1);
    }
}
