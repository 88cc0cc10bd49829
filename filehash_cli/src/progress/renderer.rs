//! Progress rendering for the CLI
//!
//! Shows one bar for the files whose hashes are computed in the background.
//! Cache hits never reach the bar.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Bar advanced once per hash callback
pub struct HashProgress {
    bar: ProgressBar,
}

impl HashProgress {
    /// Create a bar for `total` pending files
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files | {percent}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message("Hashing".bold().to_string());
        Self { bar }
    }

    /// Record one finished file
    pub fn advance(&self, path: &Path) {
        self.bar.inc(1);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar
            .set_message(format!("{}: {}", "Hashing".bold(), name.cyan()));
    }

    /// Remove the bar from the terminal
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
