//! Pattern-based fallback extraction.
//!
//! Used whenever the extraction service fails. A handful of labelled
//! regexes recover the most important fields at a fixed low confidence,
//! so every candidate still yields a listing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::normalize::parse_digits;
use crate::types::{
    field::{Evidence, EvidenceScoredField, FieldValue},
    listing::{ListingField, PropertyListing},
};

/// Confidence given to every pattern match.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

static FALLBACK_PATTERNS: Lazy<Vec<(ListingField, Regex)>> = Lazy::new(|| {
    [
        (ListingField::PropertyName, r"(?:物件名|建物名)[：:\s]*([^\n]+)"),
        (ListingField::Rent, r"(?:賃料|家賃)[：:\s]*([0-9,]+)円"),
        (ListingField::Address, r"(?:所在地|住所)[：:\s]*([^\n]+)"),
        (ListingField::FloorPlan, r"間取り[：:\s]*([0-9]+[RLDK]+)"),
    ]
    .into_iter()
    .map(|(field, pattern)| {
        (
            field,
            Regex::new(pattern).expect("fallback pattern must compile"),
        )
    })
    .collect()
});

/// Extract what the fallback patterns can find in `text`.
///
/// Every pattern field is present in the result: matched fields carry
/// [`FALLBACK_CONFIDENCE`], unmatched ones are null with confidence 0.
pub fn fallback_listing(text: &str, page_index: usize) -> PropertyListing {
    let mut listing = PropertyListing::new();

    for (field, regex) in FALLBACK_PATTERNS.iter() {
        let scored = match regex.captures(text) {
            Some(captures) => {
                let whole = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
                let captured = captures
                    .get(1)
                    .map(|m| m.as_str().trim())
                    .unwrap_or_default();
                let value = match field {
                    ListingField::Rent => parse_digits(captured).map(FieldValue::Integer),
                    _ => Some(FieldValue::Text(captured.to_string())),
                };
                EvidenceScoredField::new(value, FALLBACK_CONFIDENCE, Evidence::new(page_index, whole))
            }
            None => EvidenceScoredField::not_found(
                page_index,
                format!("ページ{}でパターンマッチ失敗", page_index + 1),
            ),
        };
        listing.insert(*field, scored);
    }

    listing
}
