//! History store and flat-file export for tubelog.
//!
//! A [`HistoryStore`] is an explicit cache slot: it holds at most one
//! "current" collection, replaced wholesale by each ingestion. The only
//! persistence is the JSON export written by [`export_json`], which
//! [`load_export`] can read back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use tubelog_core::{
    parse_timestamp, ActivityType, HistoryCollection, RecordSource, Result, TubelogError,
    WatchRecord, UNKNOWN_CHANNEL, UNKNOWN_TITLE,
};
use tubelog_ingest::{
    fetch_history, ingest_from_api_activities, ingest_from_takeout_file, ActivitySource,
    IngestReport, Ingested,
};
use tubelog_search::{fuzzy_search, search, summarize, HistoryStats, SearchOutcome, SearchResult};

/// One element of an exported JSON array.
///
/// Field order is the on-disk key order. Exactly one of `published_at`
/// (API records) and `watched_at` (Takeout records) is written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExportedRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<String>,
    /// ISO-8601, or `null` when the raw timestamp could not be parsed
    pub timestamp: Option<String>,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub description: String,
}

impl From<&WatchRecord> for ExportedRecord {
    fn from(record: &WatchRecord) -> Self {
        let raw = record.published_or_watched_at.clone();
        let (published_at, watched_at) = match record.source {
            RecordSource::Api => (Some(raw), None),
            RecordSource::Takeout => (None, Some(raw)),
        };

        Self {
            title: record.title.clone(),
            channel: record.channel_title.clone(),
            video_id: record.video_id.clone(),
            video_url: record.video_url.clone(),
            published_at,
            watched_at,
            timestamp: record.timestamp.map(|ts| ts.to_iso_string()),
            activity_type: record.activity_type.as_str().to_string(),
            description: record.export_description(),
        }
    }
}

impl ExportedRecord {
    /// Rebuild a canonical record. Descriptions stay as exported (possibly
    /// truncated).
    pub fn into_record(self) -> WatchRecord {
        let (source, raw) = match (self.watched_at, self.published_at) {
            (Some(watched), _) => (RecordSource::Takeout, watched),
            (None, published) => (RecordSource::Api, published.unwrap_or_default()),
        };
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| parse_timestamp(&raw));

        WatchRecord {
            title: non_empty_or(self.title, UNKNOWN_TITLE),
            channel_title: non_empty_or(self.channel, UNKNOWN_CHANNEL),
            video_id: self.video_id.filter(|id| !id.is_empty()),
            video_url: self.video_url,
            published_or_watched_at: raw,
            timestamp,
            description: self.description,
            activity_type: ActivityType::from_raw(&self.activity_type),
            source,
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Write `history` to `path` as a pretty-printed JSON array.
///
/// Output is UTF-8 with non-ASCII characters written literally. Descriptions
/// longer than 200 characters are truncated with `...` in the file only.
///
/// Returns the number of records written.
///
/// # Errors
///
/// Returns [`TubelogError::Export`] if the file cannot be written. The
/// collection is untouched either way.
pub fn export_json(history: &HistoryCollection, path: &Path) -> Result<usize> {
    let exported: Vec<ExportedRecord> = history.iter().map(ExportedRecord::from).collect();
    let json = serde_json::to_string_pretty(&exported)?;

    fs::write(path, json).map_err(|e| {
        TubelogError::Export(format!("failed to write {}: {}", path.display(), e))
    })?;

    info!(count = exported.len(), path = %path.display(), "exported history");
    Ok(exported.len())
}

/// Read a file written by [`export_json`] back into a collection.
///
/// Entries with a `null` video ID are dropped, like at ingestion.
///
/// # Errors
///
/// - [`TubelogError::FileNotFound`] if `path` does not exist
/// - [`TubelogError::MalformedInput`] if it is not a JSON array of exported records
pub fn load_export(path: &Path) -> Result<HistoryCollection> {
    if !path.exists() {
        return Err(TubelogError::FileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        TubelogError::MalformedInput(format!("invalid JSON in {}: {}", path.display(), e))
    })?;
    let exported: Vec<ExportedRecord> = serde_json::from_value(value).map_err(|e| {
        TubelogError::MalformedInput(format!(
            "{} is not a tubelog export: {}",
            path.display(),
            e
        ))
    })?;

    let total = exported.len();
    let collection: HistoryCollection =
        exported.into_iter().map(ExportedRecord::into_record).collect();
    if collection.len() < total {
        warn!(
            dropped = total - collection.len(),
            "dropped exported records without a video id"
        );
    }
    Ok(collection)
}

/// Holds the current history collection for one session.
#[derive(Debug, Default)]
pub struct HistoryStore {
    current: Option<HistoryCollection>,
    last_report: Option<IngestReport>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current collection, if anything has been loaded.
    pub fn current(&self) -> Option<&HistoryCollection> {
        self.current.as_ref()
    }

    /// Report of the ingestion that produced the current collection.
    pub fn last_report(&self) -> Option<&IngestReport> {
        self.last_report.as_ref()
    }

    /// Replace the current collection with one not produced by ingestion.
    pub fn replace(&mut self, collection: HistoryCollection) {
        self.current = Some(collection);
        self.last_report = None;
    }

    fn install(&mut self, ingested: Ingested) -> &IngestReport {
        self.current = Some(ingested.collection);
        self.last_report.insert(ingested.report)
    }

    /// Load a Takeout export, replacing the current collection.
    ///
    /// On error the current collection is left as it was.
    pub fn load_takeout(&mut self, path: &Path) -> Result<&IngestReport> {
        let ingested = ingest_from_takeout_file(path)?;
        Ok(self.install(ingested))
    }

    /// Ingest raw API activity items, replacing the current collection.
    pub fn ingest_api(&mut self, raw_items: &[Value], max_results: u32) -> &IngestReport {
        self.install(ingest_from_api_activities(raw_items, max_results))
    }

    /// Fetch one page from `source` and ingest it.
    ///
    /// On error the current collection is left as it was.
    pub fn fetch_api(
        &mut self,
        source: &dyn ActivitySource,
        max_results: u32,
    ) -> Result<&IngestReport> {
        let ingested = fetch_history(source, max_results)?;
        Ok(self.install(ingested))
    }

    /// Load a previous export, replacing the current collection.
    pub fn load_export(&mut self, path: &Path) -> Result<usize> {
        let collection = load_export(path)?;
        let count = collection.len();
        self.replace(collection);
        Ok(count)
    }

    /// Substring search over the current collection.
    pub fn search(&self, query: &str) -> SearchOutcome {
        search(query, self.current.as_ref())
    }

    /// Fuzzy-ranked search over the current collection.
    pub fn fuzzy_search(&self, query: &str) -> SearchOutcome<Vec<SearchResult>> {
        fuzzy_search(query, self.current.as_ref())
    }

    /// Summary of the current collection, if any.
    pub fn summarize(&self, top_n: usize) -> Option<HistoryStats> {
        self.current.as_ref().map(|history| summarize(history, top_n))
    }

    /// Export the current collection (an empty array when nothing is loaded).
    pub fn export_json(&self, path: &Path) -> Result<usize> {
        match &self.current {
            Some(history) => export_json(history, path),
            None => export_json(&HistoryCollection::default(), path),
        }
    }
}
