use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tubelog_core::{Result, TubelogError};

use crate::api::{ingest_from_api_activities, API_MAX_RESULTS};
use crate::{json_kind, read_json_file, Ingested};

/// Anything that can hand back one page of the signed-in user's activities.
///
/// The networked, OAuth-authenticated client lives outside this crate; the
/// ingestion core only needs raw activity items.
pub trait ActivitySource {
    /// One page (at most `max_results` items) of raw `activities.list` items.
    fn list_activities(&self, max_results: u32) -> Result<Vec<Value>>;

    /// Title of the authenticated channel, if the account has one.
    /// Used as a connectivity check.
    fn channel_title(&self) -> Result<Option<String>>;
}

/// Fetch one bounded page from `source` and ingest it.
///
/// No retry happens here; a failing source is reported to the caller.
pub fn fetch_history(source: &dyn ActivitySource, max_results: u32) -> Result<Ingested> {
    let requested = max_results.min(API_MAX_RESULTS);
    info!(requested, "fetching activity items");
    let items = source.list_activities(requested)?;
    info!(received = items.len(), "retrieved activity items");
    Ok(ingest_from_api_activities(&items, requested))
}

/// An [`ActivitySource`] backed by saved API responses on disk.
///
/// `activities` holds an `activities.list` response (or a bare array of its
/// items); the optional `channels` file holds a `channels.list?mine=true`
/// response.
#[derive(Debug, Clone)]
pub struct ResponseFileSource {
    activities: PathBuf,
    channels: Option<PathBuf>,
}

impl ResponseFileSource {
    pub fn new(activities: impl AsRef<Path>) -> Self {
        Self {
            activities: activities.as_ref().to_path_buf(),
            channels: None,
        }
    }

    pub fn with_channels(mut self, channels: impl AsRef<Path>) -> Self {
        self.channels = Some(channels.as_ref().to_path_buf());
        self
    }

    pub fn activities_path(&self) -> &Path {
        &self.activities
    }
}

/// Pull the `items` array out of an API list response.
fn response_items(value: Value, path: &Path) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            None => Ok(Vec::new()),
            Some(other) => Err(TubelogError::MalformedInput(format!(
                "`items` in {} is {}, expected an array",
                path.display(),
                json_kind(&other)
            ))),
        },
        other => Err(TubelogError::MalformedInput(format!(
            "{} holds {}, expected an API list response",
            path.display(),
            json_kind(&other)
        ))),
    }
}

impl ActivitySource for ResponseFileSource {
    fn list_activities(&self, max_results: u32) -> Result<Vec<Value>> {
        let value = read_json_file(&self.activities)?;
        let mut items = response_items(value, &self.activities)?;
        items.truncate(max_results as usize);
        Ok(items)
    }

    fn channel_title(&self) -> Result<Option<String>> {
        let Some(path) = &self.channels else {
            return Ok(None);
        };
        let items = response_items(read_json_file(path)?, path)?;
        Ok(items
            .first()
            .and_then(|item| item.pointer("/snippet/title"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
