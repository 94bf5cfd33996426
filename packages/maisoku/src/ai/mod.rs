//! Service implementations for the maisoku library.
//!
//! This module provides reference implementations of the `ListingExtractor`
//! and `VisionClassifier` traits. Users can use these directly or implement
//! their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::{shared_client, OpenAI};
