//! Listing pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Candidate detection over linearized page text
//! - Cross-document grouping of candidates into listings
//! - Service extraction with normalization and pattern fallback
//! - Page image classification
//! - Publishing to a destination database

pub mod batch;
pub mod classify;
pub mod dedup;
pub mod detect;
pub mod extract;
pub mod fallback;
pub mod normalize;
pub mod prompts;
pub mod publish;
pub mod throttle;

pub use batch::BatchProcessor;
pub use classify::{Classification, ImageClassifier};
pub use dedup::{group_candidates, select_primary, ListingGrouper};
pub use detect::{split_pages, CandidateDetector};
pub use extract::{parse_service_response, ExtractionOrchestrator, ExtractionOutcome};
pub use fallback::{fallback_listing, FALLBACK_CONFIDENCE};
pub use normalize::normalize_listing;
pub use prompts::{format_classify_prompt, format_extract_prompt, CLASSIFY_IMAGE_PROMPT, EXTRACT_PROMPT};
pub use publish::{
    build_properties, check_schema, publish_listings, PublishFailure, PublishReport,
    PublishedListing, DESTINATION_REQUIRED,
};
pub use throttle::Throttle;
