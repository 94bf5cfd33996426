//! Listing deduplication - cluster candidates across a whole batch.
//!
//! Candidates are partitioned by the key their [`ListingMatcher`] returns.
//! Every candidate lands in exactly one group; groups appear in the order
//! their key was first seen, and members keep their input order, so equal
//! input always produces equal output.

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::traits::matcher::{DedupKeyMatcher, ListingMatcher};
use crate::types::{
    candidate::ListingCandidate,
    group::{group_confidence, ListingGroup},
};

/// Incrementally groups candidates by listing identity.
///
/// Candidates may be added until [`finish`](Self::finish) is called; group
/// confidence always reflects the current membership.
pub struct ListingGrouper<M: ListingMatcher = DedupKeyMatcher> {
    matcher: M,
    groups: IndexMap<String, PendingGroup>,
}

struct PendingGroup {
    id: Uuid,
    members: Vec<ListingCandidate>,
}

impl Default for ListingGrouper<DedupKeyMatcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingGrouper<DedupKeyMatcher> {
    /// Create a grouper using exact dedup-key equality.
    pub fn new() -> Self {
        Self::with_matcher(DedupKeyMatcher)
    }
}

impl<M: ListingMatcher> ListingGrouper<M> {
    /// Create a grouper with a custom matcher.
    pub fn with_matcher(matcher: M) -> Self {
        Self {
            matcher,
            groups: IndexMap::new(),
        }
    }

    /// Add one candidate.
    pub fn add(&mut self, candidate: ListingCandidate) {
        let key = self.matcher.group_key(&candidate);
        self.groups
            .entry(key)
            .or_insert_with(|| PendingGroup {
                id: Uuid::new_v4(),
                members: Vec::new(),
            })
            .members
            .push(candidate);
    }

    /// Add many candidates, in order.
    pub fn extend(&mut self, candidates: impl IntoIterator<Item = ListingCandidate>) {
        for candidate in candidates {
            self.add(candidate);
        }
    }

    /// Number of groups so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no candidate has been added.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Current confidence of the group holding `candidate`'s key.
    pub fn confidence_for(&self, candidate: &ListingCandidate) -> Option<f64> {
        self.groups
            .get(&self.matcher.group_key(candidate))
            .map(|g| group_confidence(g.members.len()))
    }

    /// Current groups, without consuming the grouper.
    pub fn snapshot(&self) -> Vec<ListingGroup> {
        self.groups
            .values()
            .map(|g| build_group(g.id, g.members.clone()))
            .collect()
    }

    /// Finalize the groups.
    pub fn finish(self) -> Vec<ListingGroup> {
        let groups: Vec<ListingGroup> = self
            .groups
            .into_values()
            .map(|g| build_group(g.id, g.members))
            .collect();

        debug!(
            groups = groups.len(),
            corroborated = groups.iter().filter(|g| g.member_count() > 1).count(),
            "Grouped listing candidates"
        );

        groups
    }
}

/// Group candidates by exact dedup key.
pub fn group_candidates(candidates: impl IntoIterator<Item = ListingCandidate>) -> Vec<ListingGroup> {
    let mut grouper = ListingGrouper::new();
    grouper.extend(candidates);
    grouper.finish()
}

/// Index of the member with the longest preview; ties go to the earliest.
pub fn select_primary(members: &[ListingCandidate]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, candidate) in members.iter().enumerate() {
        let len = candidate.preview_text.chars().count();
        match best {
            Some((_, best_len)) if len <= best_len => {}
            _ => best = Some((index, len)),
        }
    }
    best.map(|(index, _)| index)
}

fn build_group(id: Uuid, mut members: Vec<ListingCandidate>) -> ListingGroup {
    let page_indexes = members.iter().map(|c| c.page_index).collect();
    let file_ids = members.iter().map(|c| c.file_id).collect();
    let confidence = group_confidence(members.len());

    // Groups are created on first insert, so members is never empty.
    let primary_index = select_primary(&members).unwrap_or_default();
    let primary = members.remove(primary_index);

    ListingGroup {
        id,
        primary_candidate: primary,
        duplicate_candidates: members,
        page_indexes,
        file_ids,
        group_confidence: confidence,
    }
}
