//! Extraction orchestration - service call, parsing, normalization, fallback.
//!
//! Extraction is a total function at this boundary: a service failure,
//! an unparseable answer or an answer of the wrong shape all fall back to
//! pattern extraction, and the required fields are always present.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MaisokuError, Result};
use crate::pipeline::{fallback::fallback_listing, normalize::normalize_listing, throttle::Throttle};
use crate::traits::ai::ListingExtractor;
use crate::types::{candidate::ListingCandidate, listing::PropertyListing};

/// A listing plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub listing: PropertyListing,

    /// True when the service path failed and patterns were used
    pub from_fallback: bool,
}

/// Drives the extraction service for listing candidates.
pub struct ExtractionOrchestrator<E: ListingExtractor> {
    extractor: E,
    throttle: Throttle,
}

impl<E: ListingExtractor> ExtractionOrchestrator<E> {
    /// Create an orchestrator with no throttling.
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            throttle: Throttle::disabled(),
        }
    }

    /// Space service calls with a throttle.
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// The wrapped extractor.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Extract a listing from a candidate's preview text.
    pub async fn extract_candidate(&self, candidate: &ListingCandidate) -> ExtractionOutcome {
        self.extract_text(&candidate.preview_text, candidate.page_index)
            .await
    }

    /// Extract a listing from page text. Never fails.
    pub async fn extract_text(&self, text: &str, page_index: usize) -> ExtractionOutcome {
        self.throttle.wait().await;

        let (mut listing, from_fallback) = match self.try_service(text, page_index).await {
            Ok(listing) => (listing, false),
            Err(e) => {
                warn!(page_index, error = %e, "Extraction service failed, using pattern fallback");
                (fallback_listing(text, page_index), true)
            }
        };

        listing.fill_required(page_index);

        debug!(
            page_index,
            fields = listing.len(),
            mean_confidence = listing.mean_confidence(),
            from_fallback,
            "Extracted listing"
        );

        ExtractionOutcome {
            listing,
            from_fallback,
        }
    }

    async fn try_service(&self, text: &str, page_index: usize) -> Result<PropertyListing> {
        let answer = self.extractor.extract(text, page_index).await?;
        let parsed = parse_service_response(&answer)?;
        normalize_listing(&parsed, page_index)
    }
}

/// Parse a service answer as JSON.
///
/// Accepts a fenced code block (```` ```json ```` or bare ```` ``` ````) anywhere
/// in the answer; without a fence the whole answer must be JSON.
pub fn parse_service_response(answer: &str) -> Result<Value> {
    let json = extract_fenced_block(answer).unwrap_or(answer).trim();
    if json.is_empty() {
        return Err(MaisokuError::InvalidResponse {
            reason: "empty response".to_string(),
        });
    }
    Ok(serde_json::from_str(json)?)
}

/// Contents of the first fenced code block, if there is one.
pub fn extract_fenced_block(answer: &str) -> Option<&str> {
    const FENCE: &str = "```";

    let open = answer.find(FENCE)?;
    let after_fence = open + FENCE.len();
    // Skip the info string ("json") up to the end of the fence line.
    let body_start = answer[after_fence..]
        .find('\n')
        .map(|i| after_fence + i + 1)?;
    let body_len = answer[body_start..].find(FENCE)?;

    Some(answer[body_start..body_start + body_len].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExtractor;
    use crate::types::field::FieldValue;
    use crate::types::listing::ListingField;
    use uuid::Uuid;

    fn candidate(text: &str) -> ListingCandidate {
        ListingCandidate {
            page_index: 0,
            raw_name: "x".into(),
            raw_address: String::new(),
            raw_rent: 0,
            dedup_key: "x__0".into(),
            preview_text: text.into(),
            file_id: Uuid::nil(),
            file_name: "a.pdf".into(),
        }
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let answer = "抽出結果です。\n```json\n{\"a\": 1}\n```\n以上";
        assert_eq!(parse_service_response(answer).unwrap()["a"], 1);
    }

    #[test]
    fn test_bare_fence_is_accepted() {
        let answer = "```\n{\"a\": 2}\n```";
        assert_eq!(parse_service_response(answer).unwrap()["a"], 2);
    }

    #[test]
    fn test_unfenced_json_is_accepted() {
        assert_eq!(parse_service_response("  {\"a\": 3} ").unwrap()["a"], 3);
    }

    #[test]
    fn test_prose_is_rejected() {
        assert!(parse_service_response("I could not find a listing.").is_err());
        assert!(parse_service_response("").is_err());
    }

    #[tokio::test]
    async fn test_service_success_is_normalized() {
        let extractor = MockExtractor::new().with_default_response(
            "```json\n{\"物件名\": {\"value\": \" パークマンション青山 \", \"confidence\": 0.95, \"evidence\": \"物件名: パークマンション青山\"}, \"賃料\": {\"value\": \"120,000円\", \"confidence\": 0.9}}\n```",
        );
        let orchestrator = ExtractionOrchestrator::new(extractor);

        let outcome = orchestrator.extract_candidate(&candidate("物件名: パークマンション青山")).await;

        assert!(!outcome.from_fallback);
        let listing = &outcome.listing;
        assert_eq!(
            listing.get(ListingField::PropertyName).unwrap().value(),
            Some(&FieldValue::Text("パークマンション青山".into()))
        );
        assert_eq!(
            listing.get(ListingField::Rent).unwrap().value(),
            Some(&FieldValue::Integer(120000))
        );
        assert!(listing.missing_required().is_empty());
        assert_eq!(orchestrator.extractor().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_with_complete_schema() {
        let orchestrator = ExtractionOrchestrator::new(MockExtractor::failing());

        let outcome = orchestrator
            .extract_candidate(&candidate("物件名: レジデンス新宿\n賃料: 98,000円\n"))
            .await;

        assert!(outcome.from_fallback);
        let listing = &outcome.listing;
        assert!(listing.missing_required().is_empty());
        assert!(listing.iter().all(|(_, f)| (0.0..=1.0).contains(&f.confidence())));
        assert_eq!(listing.get(ListingField::Rent).unwrap().confidence(), 0.3);
        assert!(!listing.get(ListingField::Address).unwrap().is_found());
    }

    #[tokio::test]
    async fn test_non_json_answer_falls_back() {
        let orchestrator = ExtractionOrchestrator::new(
            MockExtractor::new().with_default_response("申し訳ありませんが抽出できません"),
        );
        let outcome = orchestrator.extract_candidate(&candidate("間取り: 1K")).await;

        assert!(outcome.from_fallback);
        assert!(outcome.listing.missing_required().is_empty());
    }

    #[tokio::test]
    async fn test_json_array_answer_falls_back() {
        let orchestrator =
            ExtractionOrchestrator::new(MockExtractor::new().with_default_response("[1, 2, 3]"));
        let outcome = orchestrator.extract_candidate(&candidate("")).await;
        assert!(outcome.from_fallback);
    }
}
