//! Output formatting for CLI results.

use serde_json::json;
use tardigest::{DigestReport, EntryDigest};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the result line(s) written to stdout
    fn format_report(&self, report: &DigestReport, with_entries: bool) -> String;

    /// Formats the per-entry listing written to stderr, if this format keeps
    /// it separate from the report
    fn format_entries(&self, entries: &[EntryDigest]) -> Option<String>;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_report(&self, report: &DigestReport, _with_entries: bool) -> String {
        format!("{}  -", report.digest)
    }

    fn format_entries(&self, entries: &[EntryDigest]) -> Option<String> {
        let mut output = String::new();
        for entry in entries {
            output.push_str(&format!("{}  {}\n", entry.header, entry.content));
        }
        Some(output)
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &DigestReport, with_entries: bool) -> String {
        let mut obj = json!({
            "digest": report.digest.as_str(),
            "entries": report.entries,
            "decompressed_bytes": report.decompressed_bytes,
            "encoding": report.encoding.name(),
        });
        if with_entries {
            obj["entry_digests"] = report
                .entry_digests()
                .iter()
                .map(|e| json!({"header": e.header.as_str(), "content": e.content.as_str()}))
                .collect();
        }

        serde_json::to_string(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_entries(&self, _entries: &[EntryDigest]) -> Option<String> {
        None
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
