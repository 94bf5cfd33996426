//! Evidence-scored fields - the value/confidence/evidence wrapper.
//!
//! Every extracted field carries a confidence in `[0, 1]` and the page
//! text that supports it. The invariants are enforced at construction
//! (and on deserialization), so downstream stages never see an
//! out-of-range confidence or an over-long snippet.

use serde::{Deserialize, Serialize};

/// Maximum evidence snippet length, in characters.
pub const MAX_SNIPPET_CHARS: usize = 150;

/// A normalized field value.
///
/// Serialized as the plain JSON value (no tag), so a listing reads the
/// same as the extraction service's own output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Whole-number amounts (yen, minutes)
    Integer(i64),

    /// Fractional amounts (square metres, months)
    Decimal(f64),

    /// Free text or a select label
    Text(String),

    /// Multi-valued tags (equipment)
    Tags(Vec<String>),

    /// Passed through without a dedicated normalizer
    Raw(serde_json::Value),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(n) => Some(*n),
            Self::Raw(value) => value.as_f64(),
            _ => None,
        }
    }

    /// Integer view of the value, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Raw(value) => value.as_i64(),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Raw(value) => value.as_str(),
            _ => None,
        }
    }

    /// Render the value as display text.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Decimal(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Tags(tags) => tags.join(", "),
            Self::Raw(serde_json::Value::String(s)) => s.clone(),
            Self::Raw(value) => value.to_string(),
        }
    }
}

/// Where a field value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Zero-based page index within the source document
    pub page_index: usize,

    /// Source text supporting the value (at most 150 characters)
    pub snippet: String,
}

impl Evidence {
    /// Create evidence, truncating the snippet to the maximum length.
    pub fn new(page_index: usize, snippet: impl AsRef<str>) -> Self {
        Self {
            page_index,
            snippet: truncate_snippet(snippet.as_ref()),
        }
    }
}

/// A field value with a confidence score and supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FieldParts")]
pub struct EvidenceScoredField {
    value: Option<FieldValue>,
    confidence: f64,
    evidence: Evidence,
}

/// Unchecked wire form, funnelled through [`EvidenceScoredField::new`].
#[derive(Deserialize)]
struct FieldParts {
    value: Option<FieldValue>,
    #[serde(default)]
    confidence: f64,
    evidence: Evidence,
}

impl From<FieldParts> for EvidenceScoredField {
    fn from(parts: FieldParts) -> Self {
        Self::new(parts.value, parts.confidence, parts.evidence)
    }
}

impl EvidenceScoredField {
    /// Create a field.
    ///
    /// Confidence is clamped into `[0, 1]`; a missing value always has
    /// confidence 0.0.
    pub fn new(value: Option<FieldValue>, confidence: f64, evidence: Evidence) -> Self {
        let confidence = if value.is_some() {
            clamp_confidence(confidence)
        } else {
            0.0
        };

        Self {
            value,
            confidence,
            evidence: Evidence::new(evidence.page_index, evidence.snippet),
        }
    }

    /// Create an empty field with a synthetic evidence marker.
    pub fn not_found(page_index: usize, snippet: impl AsRef<str>) -> Self {
        Self::new(None, 0.0, Evidence::new(page_index, snippet))
    }

    /// The normalized value, if any.
    pub fn value(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    /// Confidence in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Supporting evidence.
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Whether a value was extracted.
    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }
}

/// Clamp a raw confidence into `[0, 1]`. NaN becomes 0.
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Truncate a snippet to [`MAX_SNIPPET_CHARS`] characters.
pub fn truncate_snippet(snippet: &str) -> String {
    snippet.chars().take(MAX_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let evidence = Evidence::new(0, "賃料: 120,000円");
        let high = EvidenceScoredField::new(Some(FieldValue::Integer(1)), 1.7, evidence.clone());
        let low = EvidenceScoredField::new(Some(FieldValue::Integer(1)), -0.2, evidence.clone());
        let nan = EvidenceScoredField::new(Some(FieldValue::Integer(1)), f64::NAN, evidence);

        assert_eq!(high.confidence(), 1.0);
        assert_eq!(low.confidence(), 0.0);
        assert_eq!(nan.confidence(), 0.0);
    }

    #[test]
    fn test_null_value_never_has_confidence() {
        let field = EvidenceScoredField::new(None, 0.8, Evidence::new(2, "nothing"));
        assert_eq!(field.confidence(), 0.0);
        assert!(!field.is_found());
    }

    #[test]
    fn test_snippet_truncated_by_chars() {
        let long = "あ".repeat(200);
        let evidence = Evidence::new(0, &long);
        assert_eq!(evidence.snippet.chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_deserialize_reapplies_invariants() {
        let json = r#"{"value": 120000, "confidence": 3.0, "evidence": {"pageIndex": 1, "snippet": "x"}}"#;
        let field: EvidenceScoredField = serde_json::from_str(json).unwrap();

        assert_eq!(field.value(), Some(&FieldValue::Integer(120000)));
        assert_eq!(field.confidence(), 1.0);
        assert_eq!(field.evidence().page_index, 1);
    }

    #[test]
    fn test_serializes_camel_case_evidence() {
        let field = EvidenceScoredField::new(
            Some(FieldValue::Text("1LDK".into())),
            0.9,
            Evidence::new(3, "間取り: 1LDK"),
        );
        let json = serde_json::to_value(&field).unwrap();

        assert_eq!(json["value"], "1LDK");
        assert_eq!(json["evidence"]["pageIndex"], 3);
    }
}
