//! Listing groups - clusters of candidates denoting one listing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::ListingCandidate;

/// Group confidence when the listing was seen more than once.
pub const CORROBORATED_CONFIDENCE: f64 = 0.9;

/// Group confidence for a single sighting.
pub const SINGLE_SIGHTING_CONFIDENCE: f64 = 0.7;

/// A cluster of candidates sharing a dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingGroup {
    /// Group identifier
    pub id: Uuid,

    /// Canonical member (longest preview text)
    pub primary_candidate: ListingCandidate,

    /// All other members, in first-seen order
    pub duplicate_candidates: Vec<ListingCandidate>,

    /// Page index of every member, in first-seen order
    pub page_indexes: Vec<usize>,

    /// File id of every member, in first-seen order
    pub file_ids: Vec<Uuid>,

    /// Static prior: higher when corroborated across pages
    pub group_confidence: f64,
}

impl ListingGroup {
    /// Number of candidates in the group.
    pub fn member_count(&self) -> usize {
        1 + self.duplicate_candidates.len()
    }

    /// Whether the group has a given page of a given file.
    pub fn covers_page(&self, file_id: Uuid, page_index: usize) -> bool {
        self.file_ids
            .iter()
            .zip(&self.page_indexes)
            .any(|(f, p)| *f == file_id && *p == page_index)
    }
}

/// Confidence prior for a group with `members` candidates.
pub fn group_confidence(members: usize) -> f64 {
    if members >= 2 {
        CORROBORATED_CONFIDENCE
    } else {
        SINGLE_SIGHTING_CONFIDENCE
    }
}
