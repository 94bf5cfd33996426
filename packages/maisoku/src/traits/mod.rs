//! Core trait abstractions for the maisoku library.
//!
//! These traits define the interfaces that applications implement
//! to provide extraction, vision, storage and publishing capabilities.

pub mod ai;
pub mod destination;
pub mod matcher;
pub mod store;
