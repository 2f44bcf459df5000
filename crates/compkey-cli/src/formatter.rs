//! Output formatters for key listings and check results.

use std::fmt::Write;

use clap::ValueEnum;
use compkey_core::{DynRecord, ErrorTarget, Report, UniqueKeys};
use serde_json::json;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Format normalized key declarations.
pub fn format_keys(keys: &[&UniqueKeys], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(keys),
        OutputFormat::Text => {
            let mut out = String::new();
            for entity in keys {
                let _ = writeln!(out, "{}", entity.entity());
                for (index, spec) in entity.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "  #{} ({}) -> {}",
                        index,
                        spec.attributes().join(", "),
                        target_label(spec.error_target())
                    );
                    let _ = writeln!(out, "     message: {}", spec.error_message());
                    if !spec.skip_fields().is_empty() {
                        let _ = writeln!(out, "     skip on errors in: {}", spec.skip_fields().join(", "));
                    }
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

/// Format the outcome of a check.
pub fn format_check(
    record: &DynRecord,
    report: &Report,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "entity": report.entity,
            "valid": report.is_valid(),
            "errors": record.errors(),
            "report": report,
        })),
        OutputFormat::Text => {
            let mut out = String::new();
            let status = if report.is_valid() { "valid" } else { "invalid" };
            let _ = writeln!(
                out,
                "{}: {} ({} checked, {} skipped)",
                report.entity,
                status,
                report.checked,
                report.skipped.len()
            );
            for (field, messages) in record.errors().iter() {
                for message in messages {
                    let _ = writeln!(out, "  {}: {}", field, message);
                }
            }
            for violation in &report.violations {
                if violation.target.fields().is_empty() {
                    let _ = writeln!(
                        out,
                        "  ({}): {}",
                        violation.attributes.join(", "),
                        violation.message
                    );
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

fn target_label(target: &ErrorTarget) -> String {
    match target {
        ErrorTarget::Detached => "no field".to_string(),
        ErrorTarget::Fields(fields) if fields.is_empty() => "no field".to_string(),
        ErrorTarget::Fields(fields) => fields.join(", "),
    }
}
