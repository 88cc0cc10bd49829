//! Progress reporting module for the CLI
//!
//! Formatting helpers plus the indicatif bar shown while hashes are
//! computed in the background.

pub mod renderer;
pub mod utils;

pub use renderer::HashProgress;
pub use utils::{format_age, format_bytes, format_duration};
