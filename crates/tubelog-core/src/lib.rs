//! Core data models and types for tubelog.
//!
//! This crate provides the canonical watch-history record both ingestion
//! adapters produce, the ordered collection that holds those records, and
//! the leaf parsing utilities (timestamps and video IDs) the adapters share.
//! It performs no I/O.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

mod timestamp;
mod video_id;

pub use timestamp::{parse_timestamp, Timestamp};
pub use video_id::{extract_video_id, watch_url, WATCH_URL_PREFIX};

/// Title used when a source omits one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Channel used when no channel name can be resolved.
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Maximum description length (in characters) written to exports.
pub const DESCRIPTION_EXPORT_LIMIT: usize = 200;

/// Marker appended to descriptions truncated for export.
pub const ELLIPSIS: &str = "...";

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSource {
    /// YouTube Data API activity feed
    Api,
    /// Google Takeout watch-history export
    Takeout,
}

impl RecordSource {
    /// The export key that carries the raw timestamp text for this source.
    pub fn timestamp_key(&self) -> &'static str {
        match self {
            RecordSource::Api => "published_at",
            RecordSource::Takeout => "watched_at",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RecordSource::Api => "YouTube API",
            RecordSource::Takeout => "Google Takeout",
        }
    }
}

/// Coarse category of a history record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Upload,
    PlaylistItem,
    Recommendation,
    Watch,
    /// Any other tag, kept verbatim (may be empty)
    Other(String),
}

impl ActivityType {
    /// Map a raw API/Takeout tag onto a category.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "upload" => ActivityType::Upload,
            "playlistItem" => ActivityType::PlaylistItem,
            "recommendation" => ActivityType::Recommendation,
            "watch" => ActivityType::Watch,
            other => ActivityType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Upload => "upload",
            ActivityType::PlaylistItem => "playlistItem",
            ActivityType::Recommendation => "recommendation",
            ActivityType::Watch => "watch",
            ActivityType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single watched (or otherwise touched) video, independent of source.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRecord {
    /// Never empty; `UNKNOWN_TITLE` when the source has none
    pub title: String,
    /// `UNKNOWN_CHANNEL` when unresolvable
    pub channel_title: String,
    /// 11-character YouTube video ID
    pub video_id: Option<String>,
    pub video_url: Option<String>,
    /// Raw timestamp text, kept verbatim for export
    pub published_or_watched_at: String,
    /// Parsed from `published_or_watched_at` when possible
    pub timestamp: Option<Timestamp>,
    /// Full text; truncation happens only on export
    pub description: String,
    pub activity_type: ActivityType,
    pub source: RecordSource,
}

impl WatchRecord {
    /// Whether this record may be kept in a history collection.
    pub fn has_video_id(&self) -> bool {
        self.video_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Description as written to exports: at most `DESCRIPTION_EXPORT_LIMIT`
    /// characters, with `ELLIPSIS` appended when cut.
    pub fn export_description(&self) -> String {
        if self.description.chars().count() > DESCRIPTION_EXPORT_LIMIT {
            let mut cut: String = self.description.chars().take(DESCRIPTION_EXPORT_LIMIT).collect();
            cut.push_str(ELLIPSIS);
            cut
        } else {
            self.description.clone()
        }
    }
}

impl fmt::Display for WatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.timestamp {
            Some(ts) => write!(f, "[{}] {} - {}", ts, self.title, self.channel_title),
            None => write!(f, "[Unknown date] {} - {}", self.title, self.channel_title),
        }
    }
}

/// An ordered set of watch records.
///
/// Every record in a collection has a video ID: `new` drops the rest.
/// Collections are built once per ingestion and never mutated afterwards;
/// search and sorting produce new collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryCollection {
    records: Vec<WatchRecord>,
}

impl HistoryCollection {
    /// Build a collection, keeping only records that have a video ID.
    pub fn new(records: Vec<WatchRecord>) -> Self {
        let records = records.into_iter().filter(WatchRecord::has_video_id).collect();
        Self { records }
    }

    pub fn records(&self) -> &[WatchRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WatchRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<WatchRecord> {
        self.records
    }

    /// Returns the collection sorted newest first.
    ///
    /// Records without a timestamp sort as the oldest possible value, so they
    /// end up last. Equal timestamps keep their relative order.
    pub fn sorted_newest_first(mut self) -> Self {
        self.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self
    }

    /// Earliest and latest timestamps, ignoring records without one.
    pub fn date_range(&self) -> Option<(Timestamp, Timestamp)> {
        let mut stamps = self.records.iter().filter_map(|r| r.timestamp);
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }
}

impl FromIterator<WatchRecord> for HistoryCollection {
    fn from_iter<I: IntoIterator<Item = WatchRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a HistoryCollection {
    type Item = &'a WatchRecord;
    type IntoIter = std::slice::Iter<'a, WatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Error types for tubelog operations.
#[derive(Error, Debug)]
pub enum TubelogError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input exists but is not the expected JSON shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A single raw item could not be mapped to a record
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Writing an export failed
    #[error("Export failed: {0}")]
    Export(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TubelogError>;
