//! Watch-history ingestion pipeline for tubelog.
//!
//! This crate provides functionality to:
//! - Map YouTube Data API activity items onto canonical watch records
//! - Load and filter a Google Takeout `watch-history.json` export
//! - Report how many raw items were seen, kept, and skipped (and why)
//! - Abstract the activity feed behind [`ActivitySource`]
//! - Locate candidate Takeout files on disk

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use tubelog_core::{HistoryCollection, RecordSource, Result, TubelogError};

pub mod api;
mod discover;
mod source;
pub mod takeout;

pub use api::{ingest_from_api_activities, record_from_activity, API_MAX_RESULTS};
pub use discover::find_takeout_files;
pub use source::{fetch_history, ActivitySource, ResponseFileSource};
pub use takeout::{ingest_from_takeout_file, ingest_takeout_entries, record_from_takeout_entry};

/// Why a raw item did not make it into the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Takeout entry without a title or URL
    MissingFields,
    /// Takeout entry that is not a video watch (searches, ads, ...)
    NotAVideo,
    /// API activity of a type that does not represent a video
    UnsupportedType,
    /// Raw item did not have the expected shape
    ParseFailed,
    /// No video ID could be resolved
    NoVideoId,
}

impl SkipReason {
    pub const ALL: [SkipReason; 5] = [
        SkipReason::MissingFields,
        SkipReason::NotAVideo,
        SkipReason::UnsupportedType,
        SkipReason::ParseFailed,
        SkipReason::NoVideoId,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::MissingFields => "missing title or URL",
            SkipReason::NotAVideo => "not a video watch",
            SkipReason::UnsupportedType => "unsupported activity type",
            SkipReason::ParseFailed => "could not be parsed",
            SkipReason::NoVideoId => "no video ID",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Skipped-item tally, split by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub missing_fields: usize,
    pub not_a_video: usize,
    pub unsupported_type: usize,
    pub parse_failed: usize,
    pub no_video_id: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        *self.slot(reason) += 1;
    }

    pub fn get(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::MissingFields => self.missing_fields,
            SkipReason::NotAVideo => self.not_a_video,
            SkipReason::UnsupportedType => self.unsupported_type,
            SkipReason::ParseFailed => self.parse_failed,
            SkipReason::NoVideoId => self.no_video_id,
        }
    }

    pub fn total(&self) -> usize {
        SkipReason::ALL.iter().map(|r| self.get(*r)).sum()
    }

    /// Non-zero reasons with their counts.
    pub fn breakdown(&self) -> Vec<(SkipReason, usize)> {
        SkipReason::ALL
            .iter()
            .map(|r| (*r, self.get(*r)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    fn slot(&mut self, reason: SkipReason) -> &mut usize {
        match reason {
            SkipReason::MissingFields => &mut self.missing_fields,
            SkipReason::NotAVideo => &mut self.not_a_video,
            SkipReason::UnsupportedType => &mut self.unsupported_type,
            SkipReason::ParseFailed => &mut self.parse_failed,
            SkipReason::NoVideoId => &mut self.no_video_id,
        }
    }
}

/// Statistics from a batch ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source: RecordSource,
    /// Raw items handed to the adapter
    pub raw_count: usize,
    /// Raw items actually examined (the API adapter caps this)
    pub considered: usize,
    pub retained: usize,
    pub skipped: SkipCounts,
}

impl IngestReport {
    pub fn new(source: RecordSource, raw_count: usize) -> Self {
        Self {
            source,
            raw_count,
            considered: 0,
            retained: 0,
            skipped: SkipCounts::default(),
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.total()
    }
}

/// The result of one ingestion call: the new collection and its report.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub collection: HistoryCollection,
    pub report: IngestReport,
}

/// Read and parse a JSON file, separating "missing" from "not JSON".
pub(crate) fn read_json_file(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(TubelogError::FileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        TubelogError::MalformedInput(format!("invalid JSON in {}: {}", path.display(), e))
    })
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
