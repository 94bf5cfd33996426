//! Batch inputs and the contract surface handed to presentation code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    candidate::ListingCandidate, group::ListingGroup, image::ExtractedImage,
    listing::PropertyListing,
};

/// One uploaded document.
///
/// Text extraction and page rendering happen upstream; the pipeline only
/// needs the linearized text, the page count and the rendered pages.
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    /// File name as uploaded
    pub name: String,

    /// Original document bytes (persisted to the object store)
    pub bytes: Vec<u8>,

    /// Linearized text content, without page markers
    pub text: String,

    /// Number of pages
    pub page_count: usize,

    /// Rendered page images (PNG), one per page when available
    pub page_images: Vec<Vec<u8>>,
}

impl DocumentInput {
    /// Create a document from its name and text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            page_count: 1,
            ..Default::default()
        }
    }

    /// Set the page count.
    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = page_count;
        self
    }

    /// Set the original bytes.
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;
        self
    }

    /// Add a rendered page image.
    pub fn with_page_image(mut self, png: Vec<u8>) -> Self {
        self.page_images.push(png);
        self
    }
}

/// A batch of documents sharing one session.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Opaque session identifier
    pub session_id: String,

    /// Documents in upload order
    pub documents: Vec<DocumentInput>,
}

impl BatchRequest {
    /// Create a request with a fresh session id.
    pub fn new(documents: Vec<DocumentInput>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            documents,
        }
    }

    /// Create a request for an existing session.
    pub fn for_session(session_id: impl Into<String>, documents: Vec<DocumentInput>) -> Self {
        Self {
            session_id: session_id.into(),
            documents,
        }
    }
}

/// Per-document processing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub id: Uuid,
    pub name: String,

    /// Stored document URL (placeholder when storage failed)
    pub url: String,

    pub pages: usize,
    pub candidates: Vec<ListingCandidate>,
    pub images: Vec<ExtractedImage>,

    /// Why the document could not be processed, if it could not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A normalized listing paired with the group it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub group_id: Uuid,
    pub listing: PropertyListing,

    /// Images from the pages this listing was seen on
    pub images: Vec<ExtractedImage>,

    /// True when the listing came from the pattern fallback
    pub from_fallback: bool,
}

/// Everything a batch produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub files: Vec<ProcessedFile>,
    pub groups: Vec<ListingGroup>,

    /// One record per group, in group order
    pub listings: Vec<ListingRecord>,
}

impl BatchResult {
    /// Total candidates detected across all files.
    pub fn candidate_count(&self) -> usize {
        self.files.iter().map(|f| f.candidates.len()).sum()
    }
}
