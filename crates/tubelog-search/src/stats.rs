use std::collections::HashMap;
use tubelog_core::{HistoryCollection, Timestamp};

/// How often one channel appears in a history.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCount {
    pub channel: String,
    pub count: usize,
    /// Share of all records, 0–100
    pub percentage: f64,
}

/// Summary statistics for a history collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    /// Total number of records
    pub total: usize,
    /// Number of distinct channel names
    pub unique_channels: usize,
    /// Most frequent channels, most frequent first
    pub top_channels: Vec<ChannelCount>,
    /// Earliest timestamp present
    pub oldest: Option<Timestamp>,
    /// Latest timestamp present
    pub newest: Option<Timestamp>,
    /// Whole days between `oldest` and `newest`
    pub span_days: Option<i64>,
    /// Records per day over the span; `None` when the span is zero days
    pub average_per_day: Option<f64>,
}

/// Compute summary statistics.
///
/// `top_channels` holds at most `top_n` channels by descending count; ties
/// keep the order in which channels were first seen.
pub fn summarize(history: &HistoryCollection, top_n: usize) -> HistoryStats {
    let total = history.len();

    // (channel, count) in first-seen order, indexed by name
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for record in history {
        let channel = record.channel_title.as_str();
        let i = *index.entry(channel).or_insert_with(|| {
            counts.push((channel, 0));
            counts.len() - 1
        });
        counts[i].1 += 1;
    }
    let unique_channels = counts.len();

    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let top_channels = counts
        .into_iter()
        .take(top_n)
        .map(|(channel, count)| ChannelCount {
            channel: channel.to_string(),
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();

    let (oldest, newest) = match history.date_range() {
        Some((oldest, newest)) => (Some(oldest), Some(newest)),
        None => (None, None),
    };
    let span_days = oldest.zip(newest).map(|(o, n)| o.days_until(&n));
    let average_per_day = span_days
        .filter(|days| *days > 0)
        .map(|days| total as f64 / days as f64);

    HistoryStats {
        total,
        unique_channels,
        top_channels,
        oldest,
        newest,
        span_days,
        average_per_day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelog_core::{parse_timestamp, ActivityType, RecordSource, WatchRecord};

    fn record(channel: &str, time: &str) -> WatchRecord {
        WatchRecord {
            title: "t".to_string(),
            channel_title: channel.to_string(),
            video_id: Some("aaaaaaaaaaa".to_string()),
            video_url: None,
            published_or_watched_at: time.to_string(),
            timestamp: parse_timestamp(time),
            description: String::new(),
            activity_type: ActivityType::Watch,
            source: RecordSource::Takeout,
        }
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let history = HistoryCollection::new(vec![
            record("B", ""),
            record("A", ""),
            record("C", ""),
            record("A", ""),
            record("C", ""),
        ]);
        let stats = summarize(&history, 10);
        let order: Vec<_> = stats.top_channels.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
        assert_eq!(stats.unique_channels, 3);
    }

    #[test]
    fn test_top_n_limit() {
        let history = HistoryCollection::new(vec![record("A", ""), record("B", ""), record("C", "")]);
        assert_eq!(summarize(&history, 2).top_channels.len(), 2);
        assert!(summarize(&history, 0).top_channels.is_empty());
    }

    #[test]
    fn test_span_and_average() {
        let history = HistoryCollection::new(vec![
            record("A", "2024-01-11T00:00:00Z"),
            record("A", "2024-01-06T12:00:00Z"),
            record("B", "2024-01-01T00:00:00Z"),
            record("B", "undated"),
        ]);
        let stats = summarize(&history, 10);
        assert_eq!(stats.span_days, Some(10));
        assert_eq!(stats.average_per_day, Some(0.4));
        assert_eq!(stats.oldest.unwrap().to_string(), "2024-01-01 00:00");
        assert_eq!(stats.newest.unwrap().to_string(), "2024-01-11 00:00");
    }

    #[test]
    fn test_zero_day_span_has_no_average() {
        let history = HistoryCollection::new(vec![
            record("A", "2024-01-01T08:00:00Z"),
            record("A", "2024-01-01T20:00:00Z"),
        ]);
        let stats = summarize(&history, 10);
        assert_eq!(stats.span_days, Some(0));
        assert_eq!(stats.average_per_day, None);
    }

    #[test]
    fn test_empty_history() {
        let stats = summarize(&HistoryCollection::default(), 5);
        assert_eq!(stats.total, 0);
        assert!(stats.top_channels.is_empty());
        assert!(stats.oldest.is_none());
        assert!(stats.span_days.is_none());
    }
}
