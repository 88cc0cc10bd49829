//! Result formatting for the `hash` command

mod formatters;

pub use formatters::{CsvFormatter, JsonFormatter, TextFormatter};

use anyhow::Result;
use filehash_core::FileHash;
use serde::Serialize;
use std::path::PathBuf;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => anyhow::bail!("Unknown output format: {}", s),
        }
    }

    /// Formatter for this format
    pub fn formatter(self, use_color: bool) -> Box<dyn OutputFormatter> {
        match self {
            Self::Text => Box::new(TextFormatter::new(use_color)),
            Self::Json => Box::new(JsonFormatter::new(true)),
            Self::Csv => Box::new(CsvFormatter),
        }
    }
}

/// How a file's hash was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Answered from the cache
    Cached,
    /// Computed during this run
    Hashed,
    Failed,
    /// No answer before the deadline
    TimedOut,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Hashed => "hashed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Whether the record carries a hash
    pub fn is_success(self) -> bool {
        matches!(self, Self::Cached | Self::Hashed)
    }
}

/// One line of `hash` output
#[derive(Debug, Clone, Serialize)]
pub struct HashRecord {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<FileHash>,
    pub size: u64,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HashRecord {
    pub fn success(path: PathBuf, hash: FileHash, size: u64, status: RecordStatus) -> Self {
        Self {
            path,
            hash: Some(hash),
            size,
            status,
            error: None,
        }
    }

    pub fn failure(path: PathBuf, size: u64, status: RecordStatus, error: String) -> Self {
        Self {
            path,
            hash: None,
            size,
            status,
            error: Some(error),
        }
    }
}

/// Renders a batch of records for stdout
pub trait OutputFormatter {
    fn format(&self, records: &[HashRecord]) -> Result<String>;
}
