use super::{HashRecord, OutputFormatter};
use anyhow::Result;
use colored::*;

/// Text formatter in `sha1sum` layout: hash, two spaces, path
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, records: &[HashRecord]) -> Result<String> {
        let mut output = String::new();

        for record in records {
            let path = record.path.display();
            match (&record.hash, &record.error) {
                (Some(hash), _) => {
                    let hash_str = self.colorize(&hash.to_hex(), |s| s.cyan());
                    output.push_str(&format!("{hash_str}  {path}\n"));
                }
                (None, error) => {
                    let label = self.colorize(
                        &record.status.as_str().to_uppercase(),
                        |s| s.red(),
                    );
                    let reason = error.as_deref().unwrap_or("unknown error");
                    output.push_str(&format!("{label}  {path}: {reason}\n"));
                }
            }
        }

        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, records: &[HashRecord]) -> Result<String> {
        let mut json = if self.pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };
        json.push('\n');
        Ok(json)
    }
}

/// CSV formatter with a header row
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn format(&self, records: &[HashRecord]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["path", "hash", "size", "status", "error"])?;

        for record in records {
            let hash = record.hash.map(|h| h.to_hex()).unwrap_or_default();
            writer.write_record([
                record.path.display().to_string(),
                hash,
                record.size.to_string(),
                record.status.as_str().to_string(),
                record.error.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(String::from_utf8(bytes)?)
    }
}
