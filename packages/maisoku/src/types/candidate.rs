//! Listing candidates and the dedup key they are grouped by.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rent bucket width used in dedup keys (yen).
pub const RENT_BUCKET: i64 = 10_000;

/// A per-page hypothesis that a listing exists on that page.
///
/// Created once during detection and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCandidate {
    /// Zero-based page index within the document
    pub page_index: usize,

    /// Listing name as found (or a page-numbered placeholder)
    pub raw_name: String,

    /// Address as found (may be empty)
    pub raw_address: String,

    /// Rent in yen as found (0 when absent or unparseable)
    pub raw_rent: i64,

    /// Grouping key
    pub dedup_key: String,

    /// Leading text of the page slice
    pub preview_text: String,

    /// Document the candidate came from
    pub file_id: Uuid,

    /// Name of that document
    pub file_name: String,
}

/// Derive the dedup key for a listing.
///
/// `normalize(name)_normalize(address)_bucket(rent)` where the rent
/// bucket is `floor(rent / 10000) * 10000`.
pub fn dedup_key(name: &str, address: &str, rent: i64) -> String {
    let bucket = rent.div_euclid(RENT_BUCKET) * RENT_BUCKET;
    format!(
        "{}_{}_{}",
        normalize_key_part(name),
        normalize_key_part(address),
        bucket
    )
}

/// Strip whitespace, hyphens and underscores; lower-case.
pub fn normalize_key_part(part: &str) -> String {
    part.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
