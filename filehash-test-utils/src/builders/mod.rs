//! Test data builders

mod entry;

pub use entry::CacheEntryBuilder;
