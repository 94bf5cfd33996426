//! Data types for listings, candidates, groups and batches.

pub mod candidate;
pub mod config;
pub mod document;
pub mod field;
pub mod group;
pub mod image;
pub mod listing;
pub mod progress;
