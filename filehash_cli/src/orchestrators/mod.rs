//! Command orchestrators
//!
//! Business logic behind the CLI commands, kept out of `main.rs` so it can
//! be driven from tests.

pub mod cache_orchestrator;
pub mod hash_orchestrator;

pub use cache_orchestrator::{CacheSummary, CleanReport, clean_cache, summarize_cache};
pub use hash_orchestrator::{HashOrchestrator, HashReport, HashRunOptions};
