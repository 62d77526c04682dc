//! YouTube Data API activity adapter.
//!
//! The activities endpoint is not a watch-history feed: it reports uploads,
//! playlist additions and recommendations, and only some of those carry a
//! video ID. Everything else is counted and dropped.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use tubelog_core::{
    parse_timestamp, watch_url, ActivityType, HistoryCollection, RecordSource, Result,
    TubelogError, WatchRecord, UNKNOWN_CHANNEL, UNKNOWN_TITLE,
};

use crate::{IngestReport, Ingested, SkipReason};

/// Hard ceiling the API imposes on a single `activities.list` page.
pub const API_MAX_RESULTS: u32 = 50;

/// Activity types that may stand for a watched video.
pub const HISTORY_ACTIVITY_TYPES: &[&str] = &["upload", "playlistItem", "recommendation"];

mod api_schema {
    use super::*;

    /// One item of an `activities.list` response.
    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Activity {
        #[serde(default)]
        pub snippet: Snippet,
        #[serde(default)]
        pub content_details: ContentDetails,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Snippet {
        pub title: Option<String>,
        pub published_at: Option<String>,
        pub channel_title: Option<String>,
        pub description: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct ContentDetails {
        pub upload: Option<Upload>,
        pub playlist_item: Option<PlaylistItem>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Upload {
        pub video_id: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct PlaylistItem {
        #[serde(default)]
        pub resource_id: ResourceId,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct ResourceId {
        pub video_id: Option<String>,
    }

    impl ContentDetails {
        /// The upload branch wins whenever it is present, even without an ID.
        pub fn video_id(&self) -> Option<&str> {
            match (&self.upload, &self.playlist_item) {
                (Some(upload), _) => upload.video_id.as_deref(),
                (None, Some(item)) => item.resource_id.video_id.as_deref(),
                (None, None) => None,
            }
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Map one raw activity item onto a canonical record.
///
/// Missing snippet fields fall back to defaults. The record may lack a video
/// ID (recommendations never have one); callers decide whether to keep it.
///
/// # Errors
///
/// Returns [`TubelogError::InvalidEntry`] when the item is not an object of
/// the activity shape (e.g. `snippet` is a string).
pub fn record_from_activity(raw: &Value) -> Result<WatchRecord> {
    let activity = api_schema::Activity::deserialize(raw)
        .map_err(|e| TubelogError::InvalidEntry(format!("activity item: {}", e)))?;

    let snippet = activity.snippet;
    let video_id = activity
        .content_details
        .video_id()
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let published_at = snippet.published_at.unwrap_or_default();

    Ok(WatchRecord {
        title: non_empty_or(snippet.title, UNKNOWN_TITLE),
        channel_title: non_empty_or(snippet.channel_title, UNKNOWN_CHANNEL),
        video_url: video_id.as_deref().map(watch_url),
        video_id,
        timestamp: parse_timestamp(&published_at),
        published_or_watched_at: published_at,
        description: snippet.description.unwrap_or_default(),
        activity_type: ActivityType::from_raw(snippet.kind.as_deref().unwrap_or("")),
        source: RecordSource::Api,
    })
}

/// Build a history collection from one page of raw activity items.
///
/// At most `min(max_results, API_MAX_RESULTS)` items are examined. Only
/// history-like activity types are kept, and only when they resolve to a
/// video ID. A malformed item is logged and skipped; it never aborts the
/// batch. Source order is preserved.
pub fn ingest_from_api_activities(raw_items: &[Value], max_results: u32) -> Ingested {
    let limit = max_results.min(API_MAX_RESULTS) as usize;
    let mut report = IngestReport::new(RecordSource::Api, raw_items.len());
    let mut records = Vec::new();

    for (index, item) in raw_items.iter().take(limit).enumerate() {
        report.considered += 1;

        let kind = item
            .pointer("/snippet/type")
            .and_then(Value::as_str)
            .unwrap_or("");
        if !HISTORY_ACTIVITY_TYPES.contains(&kind) {
            debug!(index, kind, "skipping activity type");
            report.skipped.record(SkipReason::UnsupportedType);
            continue;
        }

        match record_from_activity(item) {
            Ok(record) if record.has_video_id() => records.push(record),
            Ok(record) => {
                debug!(index, title = %record.title, "activity has no video id");
                report.skipped.record(SkipReason::NoVideoId);
            }
            Err(e) => {
                warn!(index, error = %e, "could not parse activity item");
                report.skipped.record(SkipReason::ParseFailed);
            }
        }
    }

    let collection = HistoryCollection::new(records);
    report.retained = collection.len();

    info!(
        raw = report.raw_count,
        retained = report.retained,
        skipped = report.skipped_total(),
        "processed API activity items"
    );

    Ingested { collection, report }
}
