//! Google Takeout `watch-history.json` adapter.
//!
//! Takeout exports are JSON arrays of entries like:
//!
//! ```json
//! {
//!   "header": "YouTube",
//!   "title": "Watched Some Video",
//!   "titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!   "subtitles": [{ "name": "Some Channel", "url": "https://www.youtube.com/channel/..." }],
//!   "time": "2023-12-15T23:45:23.123Z"
//! }
//! ```
//!
//! The same file also holds search history, ads and removed videos; those
//! are counted and skipped.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};
use tubelog_core::{
    extract_video_id, parse_timestamp, watch_url, ActivityType, HistoryCollection, RecordSource,
    Result, TubelogError, WatchRecord, UNKNOWN_CHANNEL, UNKNOWN_TITLE,
};

use crate::{json_kind, read_json_file, IngestReport, Ingested, SkipReason};

const WATCHED_PREFIX: &str = "Watched ";
const WATCH_URL_MARKER: &str = "youtube.com/watch";

mod takeout_schema {
    use super::*;

    /// One entry of a Takeout watch-history export.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct TakeoutEntry {
        pub title: Option<String>,
        pub title_url: Option<String>,
        #[serde(default)]
        pub subtitles: Vec<Subtitle>,
        pub time: Option<String>,
    }

    /// Takeout writes channel attributions as objects, older exports as strings.
    #[derive(Deserialize, Debug)]
    #[serde(untagged)]
    pub enum Subtitle {
        Plain(String),
        Named { name: Option<String> },
        Other(serde::de::IgnoredAny),
    }

    impl Subtitle {
        pub fn name(&self) -> Option<&str> {
            match self {
                Subtitle::Plain(name) => Some(name),
                Subtitle::Named { name } => name.as_deref(),
                Subtitle::Other(_) => None,
            }
        }
    }
}

use takeout_schema::{Subtitle, TakeoutEntry};

fn parse_entry(raw: &Value) -> Result<TakeoutEntry> {
    TakeoutEntry::deserialize(raw)
        .map_err(|e| TubelogError::InvalidEntry(format!("takeout entry: {}", e)))
}

fn clean_title(title: Option<String>) -> String {
    let title = title.unwrap_or_default();
    let title = title.strip_prefix(WATCHED_PREFIX).unwrap_or(&title);
    if title.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        title.to_string()
    }
}

fn channel_name(subtitles: &[Subtitle]) -> String {
    subtitles
        .iter()
        .filter_map(Subtitle::name)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string())
}

fn build_record(entry: TakeoutEntry) -> WatchRecord {
    let title_url = entry.title_url.unwrap_or_default();
    let video_id = extract_video_id(&title_url);
    let video_url = match &video_id {
        Some(id) => Some(watch_url(id)),
        None if !title_url.is_empty() => Some(title_url),
        None => None,
    };
    let time = entry.time.unwrap_or_default();

    WatchRecord {
        title: clean_title(entry.title),
        channel_title: channel_name(&entry.subtitles),
        video_id,
        video_url,
        timestamp: parse_timestamp(&time),
        published_or_watched_at: time,
        description: String::new(),
        activity_type: ActivityType::Watch,
        source: RecordSource::Takeout,
    }
}

/// Map one raw Takeout entry onto a canonical record.
///
/// Strips the "Watched " title prefix, takes the first non-empty subtitle as
/// the channel, and falls back to the raw `titleUrl` as the video URL when no
/// ID can be extracted.
///
/// # Errors
///
/// Returns [`TubelogError::InvalidEntry`] when the entry is not an object of
/// the Takeout shape.
pub fn record_from_takeout_entry(raw: &Value) -> Result<WatchRecord> {
    parse_entry(raw).map(build_record)
}

/// Build a history collection from the entries of a Takeout export.
///
/// Entries without a title or URL, entries that are not video watches,
/// entries that fail to parse, and entries without a video ID are skipped
/// and counted, checked in that order. The result is sorted newest first, with undated records last.
pub fn ingest_takeout_entries(entries: &[Value]) -> Ingested {
    let mut report = IngestReport::new(RecordSource::Takeout, entries.len());
    let mut records = Vec::new();

    for (index, raw) in entries.iter().enumerate() {
        report.considered += 1;

        if !raw.is_object() {
            warn!(index, kind = json_kind(raw), "entry is not an object");
            report.skipped.record(SkipReason::ParseFailed);
            continue;
        }

        // presence and URL checks look at the raw value, so a malformed
        // sibling field cannot hide a missing title or URL
        let has_title = raw
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.is_empty());
        let url = raw.get("titleUrl").and_then(Value::as_str).unwrap_or("");
        if !has_title || url.is_empty() {
            report.skipped.record(SkipReason::MissingFields);
            continue;
        }

        if !url.contains(WATCH_URL_MARKER) {
            debug!(index, url, "skipping non-video entry");
            report.skipped.record(SkipReason::NotAVideo);
            continue;
        }

        let entry = match parse_entry(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "could not parse entry");
                report.skipped.record(SkipReason::ParseFailed);
                continue;
            }
        };

        let record = build_record(entry);
        if record.has_video_id() {
            records.push(record);
        } else {
            debug!(index, title = %record.title, "entry has no video id");
            report.skipped.record(SkipReason::NoVideoId);
        }
    }

    let collection = HistoryCollection::new(records).sorted_newest_first();
    report.retained = collection.len();

    info!(
        raw = report.raw_count,
        retained = report.retained,
        skipped = report.skipped_total(),
        "processed Takeout entries"
    );
    if report.skipped_total() > 0 {
        info!(
            skipped = report.skipped_total(),
            "skipped invalid or non-video entries"
        );
    }

    Ingested { collection, report }
}

/// Load a Takeout `watch-history.json` file.
///
/// # Errors
///
/// - [`TubelogError::FileNotFound`] if `path` does not exist
/// - [`TubelogError::MalformedInput`] if the content is not JSON, or not a
///   JSON array
/// - [`TubelogError::Io`] if the file cannot be read
///
/// Individual bad entries are never errors; see [`ingest_takeout_entries`].
pub fn ingest_from_takeout_file(path: &Path) -> Result<Ingested> {
    let value = read_json_file(path)?;
    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(TubelogError::MalformedInput(format!(
                "expected a JSON array of watch entries in {}, found {}",
                path.display(),
                json_kind(&other)
            )))
        }
    };

    info!(path = %path.display(), entries = entries.len(), "loaded raw Takeout entries");
    Ok(ingest_takeout_entries(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(title: &str, url: &str, channel: &str, time: &str) -> Value {
        json!({
            "header": "YouTube",
            "title": title,
            "titleUrl": url,
            "subtitles": [{ "name": channel, "url": "https://www.youtube.com/channel/UC123" }],
            "time": time,
            "products": ["YouTube"]
        })
    }

    #[test]
    fn test_watched_prefix_stripped() {
        let raw = entry(
            "Watched Some Video",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "Some Channel",
            "2023-12-15T23:45:23.123Z",
        );
        let record = record_from_takeout_entry(&raw).unwrap();
        assert_eq!(record.title, "Some Video");
        assert_eq!(record.channel_title, "Some Channel");
        assert_eq!(record.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(record.activity_type, ActivityType::Watch);
        assert_eq!(record.published_or_watched_at, "2023-12-15T23:45:23.123Z");
        assert!(record.timestamp.is_some());
        assert!(record.description.is_empty());
    }

    #[test]
    fn test_title_without_prefix_unchanged() {
        let raw = entry("Some Video", "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "c", "");
        assert_eq!(record_from_takeout_entry(&raw).unwrap().title, "Some Video");
    }

    #[test]
    fn test_plain_string_subtitle() {
        let raw = json!({
            "title": "Watched x",
            "titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "subtitles": ["", "Legacy Channel"]
        });
        assert_eq!(record_from_takeout_entry(&raw).unwrap().channel_title, "Legacy Channel");
    }

    #[test]
    fn test_channel_fallback() {
        let raw = json!({
            "title": "Watched x",
            "titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "subtitles": [{ "url": "https://example.com" }, 7, { "name": "" }]
        });
        assert_eq!(record_from_takeout_entry(&raw).unwrap().channel_title, UNKNOWN_CHANNEL);
    }

    #[test]
    fn test_video_url_falls_back_to_title_url() {
        let raw = json!({
            "title": "Watched a removed video",
            "titleUrl": "https://www.youtube.com/watch?feature=x"
        });
        let record = record_from_takeout_entry(&raw).unwrap();
        assert!(record.video_id.is_none());
        assert_eq!(record.video_url.as_deref(), Some("https://www.youtube.com/watch?feature=x"));
    }

    #[test]
    fn test_batch_skips_and_sorts() {
        let entries = vec![
            entry("Watched Old", "https://www.youtube.com/watch?v=aaaaaaaaaaa", "A", "Jan 2, 2022, 1:00:00 PM PST"),
            json!({ "title": "Searched for rust", "titleUrl": "https://www.youtube.com/results?search_query=rust" }),
            json!({ "title": "Watched a video that has been removed" }),
            entry("Watched Undated", "https://www.youtube.com/watch?v=bbbbbbbbbbb", "B", "sometime"),
            entry("Watched New", "https://www.youtube.com/watch?v=ccccccccccc", "A", "2024-03-01T10:00:00Z"),
            json!("not an object"),
            entry("Watched No Id", "https://www.youtube.com/watch?feature=share", "C", "2024-01-01T00:00:00Z"),
        ];
        let ingested = ingest_takeout_entries(&entries);

        let titles: Vec<_> = ingested.collection.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);

        let skipped = &ingested.report.skipped;
        assert_eq!(ingested.report.raw_count, 7);
        assert_eq!(skipped.not_a_video, 1);
        assert_eq!(skipped.missing_fields, 1);
        assert_eq!(skipped.parse_failed, 1);
        assert_eq!(skipped.no_video_id, 1);
        assert_eq!(ingested.report.skipped_total(), 4);
        assert_eq!(ingested.report.retained, 3);
    }

    #[test]
    fn test_missing_url_wins_over_malformed_sibling() {
        let entries = vec![
            json!({ "title": "Watched A", "subtitles": null }),
            json!({ "title": "Watched B", "time": 12345 }),
            json!({ "title": "Watched C", "titleUrl": "https://www.youtube.com/watch?v=ccccccccccc", "time": 12345 }),
        ];
        let ingested = ingest_takeout_entries(&entries);
        let skipped = &ingested.report.skipped;
        assert_eq!(skipped.missing_fields, 2);
        assert_eq!(skipped.parse_failed, 1);
        assert!(ingested.collection.is_empty());
    }

    #[test]
    fn test_empty_title_is_missing() {
        let entries = vec![json!({ "title": "", "titleUrl": "https://www.youtube.com/watch?v=aaaaaaaaaaa" })];
        let ingested = ingest_takeout_entries(&entries);
        assert!(ingested.collection.is_empty());
        assert_eq!(ingested.report.skipped.missing_fields, 1);
    }
}
