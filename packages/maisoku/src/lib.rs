//! Rental Flyer Listing Pipeline
//!
//! Takes a batch of rental property flyers (マイソク), finds the pages that
//! describe a listing, merges sightings of the same listing across
//! documents, and extracts one normalized, evidence-scored record per
//! listing.
//!
//! # Design Philosophy
//!
//! - Per-item failures degrade, they never abort a batch
//! - Every field carries a confidence and the text it came from
//! - External services sit behind traits; the library handles mechanics
//!
//! # Usage
//!
//! ```rust,ignore
//! use maisoku::{BatchProcessor, BatchRequest, DocumentInput, MemoryObjectStore};
//! use maisoku::testing::{MockClassifier, MockExtractor};
//!
//! let processor = BatchProcessor::new(
//!     MockExtractor::new(),
//!     MockClassifier::new(),
//!     MemoryObjectStore::new(),
//! );
//!
//! let request = BatchRequest::new(vec![
//!     DocumentInput::new("flyer.pdf", text).with_page_count(2),
//! ]);
//! let result = processor.process_batch(request).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Service abstractions (ListingExtractor, VisionClassifier, ObjectStore, Destination)
//! - [`types`] - Listings, candidates, groups and batch records
//! - [`pipeline`] - Detection, grouping, extraction, classification and publishing
//! - [`stores`] - Object store implementations (MemoryObjectStore)
//! - [`destinations`] - Destination implementations (NotionDestination)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod destinations;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{MaisokuError, Result, SecurityError};
pub use traits::{
    ai::{ListingExtractor, VisionClassifier},
    destination::{CreatedPage, Destination, PropertyValue},
    matcher::{DedupKeyMatcher, ListingMatcher},
    store::{ObjectStore, PutOptions, StoredObject},
};
pub use types::{
    candidate::{dedup_key, ListingCandidate},
    config::PipelineConfig,
    document::{BatchRequest, BatchResult, DocumentInput, ListingRecord, ProcessedFile},
    field::{Evidence, EvidenceScoredField, FieldValue},
    group::ListingGroup,
    image::{ExtractedImage, ImageBounds, ImageType},
    listing::{FieldKind, ListingField, PropertyListing, SCHEMA_VERSION},
    progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender, Stage},
};

// Re-export pipeline components
pub use pipeline::{
    // Batch driver
    BatchProcessor,
    // Detection and grouping
    group_candidates, split_pages, CandidateDetector, ListingGrouper,
    // Extraction
    fallback_listing, normalize_listing, parse_service_response, ExtractionOrchestrator,
    ExtractionOutcome,
    // Images
    Classification, ImageClassifier,
    // Publishing
    build_properties, publish_listings, PublishReport,
    Throttle,
};

// Re-export stores
pub use stores::MemoryObjectStore;

#[cfg(feature = "notion")]
pub use destinations::NotionDestination;

// Re-export testing utilities
pub use testing::{MockClassifier, MockDestination, MockExtractor};
