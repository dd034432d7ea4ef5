//! JSON-lines chat transcripts.
//!
//! Each non-blank line holds one message object:
//!
//! ```text
//! {"at":"2024-05-01T12:00:00Z","id":"m1","sender":"bocchi","text":"madoka","channel":"#kessoku"}
//! ```
//!
//! `channel` is optional; lines without it belong to whatever channel the
//! reader was told to use. Lines starting with `#` are comments.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::message::Message;

/// One parsed transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Parse a single transcript line.
///
/// Returns `Ok(None)` for blank lines and comments.
///
/// # Errors
///
/// Returns [`Error::TranscriptParse`] carrying the 1-based `line` number
/// when the line is not a valid message object.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Entry>, Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| Error::TranscriptParse {
            line: line_no,
            source,
        })
}

/// Read every entry from a transcript.
///
/// # Errors
///
/// Fails on the first unreadable or unparseable line.
pub fn read_entries(reader: impl BufRead) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(entry) = parse_line(idx + 1, &line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}
