//! filehash CLI library
//!
//! Command logic for the `filehash` binary: configuration, file discovery,
//! the orchestrators that drive `filehash_core::HashStore`, and output
//! formatting.

pub mod config;
pub mod file_discovery;
pub mod orchestrators;
pub mod output;
pub mod paths;
pub mod progress;
pub mod terminal;
