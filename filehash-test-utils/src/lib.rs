//! Test utilities for the file hash cache
//!
//! This crate provides a scriptable hasher, a recording client and fixture
//! builders for exercising `HashStore` without real files.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::CacheEntryBuilder;
pub use mocks::{ClientEvent, MockHasher, RecordingClient};
