//! Email dataset loading.
//!
//! A dataset is the CSV export of a child's school mailbox: one row per
//! email with `direction, sender, recipient, subject, body` and an optional
//! `timestamp`. Header names are matched case-insensitively, extra columns
//! are ignored, and any missing value is read as the empty string.

use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Minutes of screen time attributed to each email
pub const MINUTES_PER_EMAIL: u64 = 5;

/// Column order used when a row is flattened into one text
pub const TEXT_COLUMNS: [&str; 5] = ["direction", "sender", "recipient", "subject", "body"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
    Other(String),
}

impl Direction {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("inbound") {
            Direction::Inbound
        } else if trimmed.eq_ignore_ascii_case("outbound") {
            Direction::Outbound
        } else {
            Direction::Other(trimmed.to_string())
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
            Direction::Other(raw) => f.write_str(raw),
        }
    }
}

/// One row of the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmailMessage {
    pub direction: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Option<String>,
}

impl EmailMessage {
    pub fn direction(&self) -> Direction {
        Direction::parse(&self.direction)
    }

    /// The text columns joined with single spaces, in column order
    pub fn combined_text(&self) -> String {
        [
            self.direction.as_str(),
            self.sender.as_str(),
            self.recipient.as_str(),
            self.subject.as_str(),
            self.body.as_str(),
        ]
        .join(" ")
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts RFC 3339 and the common spreadsheet export formats
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl From<CsvRow> for EmailMessage {
    fn from(row: CsvRow) -> Self {
        Self {
            direction: row.direction.unwrap_or_default(),
            sender: row.sender.unwrap_or_default(),
            recipient: row.recipient.unwrap_or_default(),
            subject: row.subject.unwrap_or_default(),
            body: row.body.unwrap_or_default(),
            timestamp: row.timestamp.filter(|t| !t.trim().is_empty()),
        }
    }
}

/// An uploaded dataset, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    messages: Vec<EmailMessage>,
}

impl Dataset {
    pub fn new(messages: Vec<EmailMessage>) -> Self {
        Self { messages }
    }

    pub fn from_path(path: impl AsRef<Path>) -> DashboardResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            DashboardError::dataset_error(
                format!("cannot open {}: {}", path.display(), e),
                Some(concat!(file!(), ":", line!())),
            )
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> DashboardResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: csv::StringRecord = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(DashboardError::dataset_error(
                "the file has no header row",
                Some(concat!(file!(), ":", line!())),
            ));
        }

        let missing: Vec<&str> = TEXT_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            log::warn!("dataset is missing columns {:?}; treating them as empty", missing);
        }

        csv_reader.set_headers(headers);

        let mut messages = Vec::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            messages.push(EmailMessage::from(row?));
        }

        tracing::info!(rows = messages.len(), "loaded email dataset");
        Ok(Self { messages })
    }

    pub fn messages(&self) -> &[EmailMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Per-row combined text, in dataset order
    pub fn combined_texts(&self) -> Vec<String> {
        self.messages.iter().map(EmailMessage::combined_text).collect()
    }

    pub fn overview(&self) -> ActivityOverview {
        let mut inbound = 0;
        let mut outbound = 0;
        let mut other_direction = 0;
        let mut first_timestamp: Option<NaiveDateTime> = None;
        let mut last_timestamp: Option<NaiveDateTime> = None;

        for message in &self.messages {
            match message.direction() {
                Direction::Inbound => inbound += 1,
                Direction::Outbound => outbound += 1,
                Direction::Other(_) => other_direction += 1,
            }
            if let Some(ts) = message.parsed_timestamp() {
                first_timestamp = Some(first_timestamp.map_or(ts, |f| f.min(ts)));
                last_timestamp = Some(last_timestamp.map_or(ts, |l| l.max(ts)));
            }
        }

        ActivityOverview {
            total_emails: self.messages.len(),
            estimated_screen_time_minutes: self.messages.len() as u64 * MINUTES_PER_EMAIL,
            inbound,
            outbound,
            other_direction,
            first_timestamp,
            last_timestamp,
        }
    }
}

/// Summary activity metrics for the overview view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityOverview {
    pub total_emails: usize,
    pub estimated_screen_time_minutes: u64,
    pub inbound: usize,
    pub outbound: usize,
    pub other_direction: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
}
