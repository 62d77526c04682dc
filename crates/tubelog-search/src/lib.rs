//! Search and summary features for tubelog.
//!
//! This crate provides:
//! - Case-insensitive substring search over titles, channels and (API)
//!   descriptions, with Unicode NFC folding
//! - Fuzzy ranking on titles and channels using nucleo
//! - Summary statistics: channel frequency, date range, daily average

use nucleo::pattern::{CaseMatching, Normalization, Pattern};
use nucleo::{Config, Matcher};
use tracing::warn;
use tubelog_core::{HistoryCollection, RecordSource, WatchRecord};
use unicode_normalization::UnicodeNormalization;

mod stats;

pub use stats::{summarize, ChannelCount, HistoryStats};

/// What a search produced.
///
/// `M` is the match payload: a [`HistoryCollection`] for substring search,
/// ranked [`SearchResult`]s for [`fuzzy_search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<M = HistoryCollection> {
    /// The query was blank after trimming; nothing was searched.
    EmptyQuery,
    /// There is no history to search (none loaded, or it is empty).
    NoHistory,
    /// Matching records. May be empty.
    Matches(M),
}

impl<M: Default> SearchOutcome<M> {
    /// The matches, or an empty payload for the other outcomes.
    pub fn into_matches(self) -> M {
        match self {
            SearchOutcome::Matches(matches) => matches,
            SearchOutcome::EmptyQuery | SearchOutcome::NoHistory => M::default(),
        }
    }
}

/// Trimmed query and non-empty history, or the outcome that ends the search early.
fn searchable<'a, M>(
    query: &'a str,
    history: Option<&'a HistoryCollection>,
) -> Result<(&'a str, &'a HistoryCollection), SearchOutcome<M>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchOutcome::EmptyQuery);
    }

    match history {
        Some(history) if !history.is_empty() => Ok((query, history)),
        _ => {
            warn!("no history data to search");
            Err(SearchOutcome::NoHistory)
        }
    }
}

/// NFC-normalize and lowercase text for comparison.
fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

fn record_matches(record: &WatchRecord, needle: &str) -> bool {
    fold(&record.title).contains(needle)
        || fold(&record.channel_title).contains(needle)
        || (record.source == RecordSource::Api && fold(&record.description).contains(needle))
}

/// Case-insensitive substring search.
///
/// Matches against title and channel, plus the description for API records
/// (Takeout records have none). The query is trimmed first; a blank query
/// is [`SearchOutcome::EmptyQuery`] rather than "match everything".
pub fn search(query: &str, history: Option<&HistoryCollection>) -> SearchOutcome {
    let (query, history) = match searchable(query, history) {
        Ok(ready) => ready,
        Err(outcome) => return outcome,
    };

    let needle = fold(query);
    let matches = history
        .iter()
        .filter(|record| record_matches(record, &needle))
        .cloned()
        .collect();
    SearchOutcome::Matches(matches)
}

/// A fuzzy search hit with rank information.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched record.
    pub record: WatchRecord,
    /// Match score (higher = better match).
    pub score: u32,
}

/// Fuzzy search with the same early outcomes as [`search`].
///
/// Matches are ranked by [`FuzzySearcher::search`].
pub fn fuzzy_search(
    query: &str,
    history: Option<&HistoryCollection>,
) -> SearchOutcome<Vec<SearchResult>> {
    match searchable(query, history) {
        Ok((query, history)) => SearchOutcome::Matches(FuzzySearcher::search(query, history)),
        Err(outcome) => outcome,
    }
}

/// Fuzzy search using nucleo matcher.
pub struct FuzzySearcher;

impl FuzzySearcher {
    /// Search across all records, matching against both title and channel.
    ///
    /// Returns results sorted by score descending; equal scores keep
    /// collection order.
    pub fn search(query: &str, history: &HistoryCollection) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut matcher = Matcher::new(Config::DEFAULT);
        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
        let mut buf = Vec::new();

        let mut results: Vec<SearchResult> = history
            .iter()
            .filter_map(|record| {
                Self::score_record(&pattern, record, &mut matcher, &mut buf).map(|score| {
                    SearchResult {
                        record: record.clone(),
                        score,
                    }
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score));
        results
    }

    /// Score a record by matching against both title and channel, taking the max.
    fn score_record(
        pattern: &Pattern,
        record: &WatchRecord,
        matcher: &mut Matcher,
        buf: &mut Vec<char>,
    ) -> Option<u32> {
        Self::score_text(pattern, &record.title, matcher, buf)
            .max(Self::score_text(pattern, &record.channel_title, matcher, buf))
    }

    /// Score a single text string.
    fn score_text(
        pattern: &Pattern,
        text: &str,
        matcher: &mut Matcher,
        buf: &mut Vec<char>,
    ) -> Option<u32> {
        let haystack = nucleo::Utf32Str::new(text, buf);
        let score = pattern.score(haystack, matcher);
        buf.clear();
        score
    }
}
