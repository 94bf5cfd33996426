//! Object store implementations for the maisoku library.
//!
//! Available backends:
//! - `MemoryObjectStore` - In-memory storage (always available)

pub mod memory;

pub use memory::MemoryObjectStore;
