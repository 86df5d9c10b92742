//! JSON and Markdown renderers for the combined result. Pure
//! functions of the result; only the file write can fail.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::ExtractionResult;

pub const OUTPUT_BASENAME: &str = "google_data_output";

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    Json,
    Md,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Md => "md",
        }
    }
}

/// Render as pretty-printed JSON. Key order follows the struct
/// declarations; non-ASCII characters are preserved unescaped.
pub fn render_json(result: &ExtractionResult) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(result).context("Failed to serialize result to JSON")?;
    out.push('\n');
    Ok(out)
}

/// Render as a Markdown document: metadata summary, then one
/// subsection per email, then one per event.
pub fn render_markdown(result: &ExtractionResult) -> String {
    let mut out = String::new();

    out.push_str("# Google Data Extract\n\n");
    let _ = writeln!(out, "**Extracted at:** {}", result.metadata.extracted_at);
    let _ = writeln!(out, "**Total Emails:** {}", result.metadata.total_emails);
    let _ = writeln!(
        out,
        "**Total Calendar Events:** {}\n",
        result.metadata.total_calendar_events
    );

    out.push_str("## Recent Emails\n\n");
    for (i, email) in result.emails.iter().enumerate() {
        let _ = writeln!(out, "### Email {}: {}", i + 1, email.subject);
        let _ = writeln!(out, "- **From:** {}", email.sender);
        let _ = writeln!(out, "- **Date:** {}", email.date);
        let _ = writeln!(out, "- **ID:** {}", email.id);
        let _ = writeln!(out, "- **Snippet:** {}", email.snippet);
        let _ = writeln!(out, "- **Labels:** {}\n", email.labels.join(", "));
    }

    out.push_str("## Upcoming Calendar Events\n\n");
    for (i, event) in result.calendar_events.iter().enumerate() {
        let _ = writeln!(out, "### Event {}: {}", i + 1, event.summary);
        let _ = writeln!(out, "- **Start:** {}", event.start);
        let _ = writeln!(out, "- **End:** {}", event.end);
        let _ = writeln!(out, "- **Location:** {}", event.location);
        let _ = writeln!(out, "- **Status:** {}", event.status);
        if !event.attendees.is_empty() {
            let _ = writeln!(out, "- **Attendees:** {}", event.attendees.len());
            for attendee in &event.attendees {
                let _ = writeln!(out, "  - {} ({})", attendee.email, attendee.response_status);
            }
        }
        out.push('\n');
    }

    out
}

/// Write the rendered output to the working directory, overwriting any
/// previous extract.
pub fn write_output(result: &ExtractionResult, format: OutputFormat) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}.{}", OUTPUT_BASENAME, format.extension()));
    let rendered = match format {
        OutputFormat::Json => render_json(result)?,
        OutputFormat::Md => render_markdown(result),
    };
    std::fs::write(&path, rendered)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
