//! Destination implementations.

#[cfg(feature = "notion")]
mod notion;

#[cfg(feature = "notion")]
pub use notion::{property_json, NotionDestination};
