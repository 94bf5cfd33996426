//! Image classification adapter.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::pipeline::{extract::parse_service_response, throttle::Throttle};
use crate::traits::ai::VisionClassifier;
use crate::types::{
    field::clamp_confidence,
    image::{ImageType, FALLBACK_IMAGE_CONFIDENCE},
};

/// A label and the confidence behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub image_type: ImageType,
    pub confidence: f64,
}

impl Classification {
    /// Result used when the service could not classify the image at all.
    pub fn fallback() -> Self {
        Self {
            image_type: ImageType::Other,
            confidence: FALLBACK_IMAGE_CONFIDENCE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(rename = "type", default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Classifies rendered pages through a vision service.
pub struct ImageClassifier<C: VisionClassifier> {
    classifier: C,
    throttle: Throttle,
}

impl<C: VisionClassifier> ImageClassifier<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            throttle: Throttle::disabled(),
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify one PNG page image. Never fails.
    pub async fn classify(&self, png: &[u8]) -> Classification {
        self.throttle.wait().await;

        match self.try_classify(png).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Image classification failed, labelling as other");
                Classification::fallback()
            }
        }
    }

    async fn try_classify(&self, png: &[u8]) -> Result<Classification> {
        let answer = self.classifier.classify(&STANDARD.encode(png)).await?;
        let raw: RawClassification = serde_json::from_value(parse_service_response(&answer)?)?;

        if let Some(reasoning) = &raw.reasoning {
            debug!(label = ?raw.label, reasoning = %reasoning, "Vision service reasoning");
        }

        let label = raw.label.unwrap_or_default();
        let image_type = ImageType::from_label(&label).unwrap_or_else(|| {
            debug!(label = %label, "Out-of-set image label, using other");
            ImageType::Other
        });

        Ok(Classification {
            image_type,
            confidence: clamp_confidence(raw.confidence.unwrap_or(0.0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClassifier;

    #[tokio::test]
    async fn test_known_label() {
        let classifier = ImageClassifier::new(MockClassifier::new().with_default_response(
            "```json\n{\"type\": \"floorplan\", \"confidence\": 0.92, \"reasoning\": \"間取り図\"}\n```",
        ));

        let result = classifier.classify(b"png").await;

        assert_eq!(result.image_type, ImageType::Floorplan);
        assert_eq!(result.confidence, 0.92);
    }

    #[tokio::test]
    async fn test_out_of_set_label_keeps_confidence() {
        let classifier = ImageClassifier::new(
            MockClassifier::new().with_default_response(r#"{"type": "balcony", "confidence": 1.4}"#),
        );

        let result = classifier.classify(b"png").await;

        assert_eq!(result.image_type, ImageType::Other);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_failure_is_other_with_low_confidence() {
        let classifier = ImageClassifier::new(MockClassifier::failing());
        assert_eq!(classifier.classify(b"png").await, Classification::fallback());

        let garbled = ImageClassifier::new(MockClassifier::new().with_default_response("kitchen?"));
        let result = garbled.classify(b"png").await;
        assert_eq!(result.image_type, ImageType::Other);
        assert_eq!(result.confidence, FALLBACK_IMAGE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_image_is_sent_as_base64() {
        let classifier = ImageClassifier::new(MockClassifier::new());
        classifier.classify(b"hello").await;
        assert_eq!(classifier.classifier().calls(), vec!["aGVsbG8=".to_string()]);
    }
}
