//! Listing identity matching.
//!
//! The grouper only asks a matcher for a grouping key; candidates with
//! equal keys land in the same group. Stricter matchers (address distance,
//! rent tolerance bands) can replace the default without touching grouping.

use std::sync::Arc;

use crate::types::candidate::ListingCandidate;

/// Decides which candidates denote the same listing.
pub trait ListingMatcher: Send + Sync {
    /// Key under which the candidate is grouped.
    fn group_key(&self, candidate: &ListingCandidate) -> String;
}

/// Exact dedup-key equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupKeyMatcher;

impl ListingMatcher for DedupKeyMatcher {
    fn group_key(&self, candidate: &ListingCandidate) -> String {
        candidate.dedup_key.clone()
    }
}

impl<T: ListingMatcher + ?Sized> ListingMatcher for Arc<T> {
    fn group_key(&self, candidate: &ListingCandidate) -> String {
        (**self).group_key(candidate)
    }
}
