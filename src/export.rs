//! Transcript export formatting

use crate::error::PersistenceError;
use crate::meeting::{Meeting, MeetingTranscript};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Render a meeting transcript in the requested format
pub fn render(
    meeting: &Meeting,
    transcript: &MeetingTranscript,
    format: ExportFormat,
) -> Result<String, PersistenceError> {
    match format {
        ExportFormat::Text => Ok(render_text(meeting, transcript)),
        ExportFormat::Markdown => Ok(render_markdown(meeting, transcript)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(transcript)?),
    }
}

fn render_text(meeting: &Meeting, transcript: &MeetingTranscript) -> String {
    let mut out = String::new();
    out.push_str(&format!("Meeting: {}\n", meeting.title));
    out.push_str(&format!(
        "Date: {}\n",
        meeting.started_at.format("%Y-%m-%d %H:%M")
    ));
    if !meeting.participants.is_empty() {
        out.push_str(&format!(
            "Participants: {}\n",
            meeting.participants.join(", ")
        ));
    }
    out.push('\n');
    out.push_str(&transcript.render());
    out.push('\n');
    out
}

fn render_markdown(meeting: &Meeting, transcript: &MeetingTranscript) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", meeting.title));
    out.push_str(&format!(
        "**Date:** {}\n\n",
        meeting.started_at.format("%Y-%m-%d %H:%M")
    ));
    if !meeting.participants.is_empty() {
        out.push_str(&format!(
            "**Participants:** {}\n\n",
            meeting.participants.join(", ")
        ));
    }
    if let Some(duration) = meeting.duration_secs() {
        out.push_str(&format!("**Duration:** {:.0}s\n\n", duration));
    }
    out.push_str("## Transcript\n\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "- **[{}]** {}: {}\n",
            segment.timestamp.format("%H:%M:%S"),
            segment.speaker.as_deref().unwrap_or("Unknown"),
            segment.text
        ));
    }
    out
}
