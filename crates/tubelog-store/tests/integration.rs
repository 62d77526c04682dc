use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use tubelog_core::{
    parse_timestamp, watch_url, ActivityType, HistoryCollection, RecordSource, TubelogError,
    WatchRecord,
};
use tubelog_store::{export_json, load_export, HistoryStore};

fn make_record(id: &str, title: &str, channel: &str, description: &str) -> WatchRecord {
    WatchRecord {
        title: title.to_string(),
        channel_title: channel.to_string(),
        video_id: Some(id.to_string()),
        video_url: Some(watch_url(id)),
        published_or_watched_at: "Dec 15, 2023, 3:45:23 PM PST".to_string(),
        timestamp: parse_timestamp("Dec 15, 2023, 3:45:23 PM PST"),
        description: description.to_string(),
        activity_type: ActivityType::Watch,
        source: RecordSource::Takeout,
    }
}

fn write_takeout(dir: &TempDir, entries: Value) -> std::path::PathBuf {
    let path = dir.path().join("watch-history.json");
    fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();
    path
}

#[test]
fn test_export_then_reparse() {
    let dir = TempDir::new().unwrap();
    let history = HistoryCollection::new(vec![
        make_record("aaaaaaaaaaa", "First", "Chan A", ""),
        make_record("bbbbbbbbbbb", "Second", "Chan B", ""),
        make_record("ccccccccccc", "Third", "Chan A", ""),
    ]);
    let out = dir.path().join("export.json");

    assert_eq!(export_json(&history, &out).unwrap(), 3);

    let parsed: Vec<Value> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let ids: Vec<_> = parsed.iter().map(|v| v["video_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
    assert_eq!(parsed[0]["watched_at"], "Dec 15, 2023, 3:45:23 PM PST");
    assert_eq!(parsed[0]["timestamp"], "2023-12-15T15:45:23");

    let reloaded = load_export(&out).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.records()[1].title, "Second");
    assert_eq!(reloaded.records()[1].source, RecordSource::Takeout);
}

#[test]
fn test_export_truncates_description_in_file_only() {
    let dir = TempDir::new().unwrap();
    let long = "d".repeat(250);
    let mut record = make_record("aaaaaaaaaaa", "Long", "Chan", &long);
    record.source = RecordSource::Api;
    let history = HistoryCollection::new(vec![record]);
    let out = dir.path().join("export.json");

    export_json(&history, &out).unwrap();

    let parsed: Vec<Value> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let exported = parsed[0]["description"].as_str().unwrap();
    assert_eq!(exported, format!("{}...", "d".repeat(200)));
    assert_eq!(history.records()[0].description.len(), 250);
    assert!(parsed[0].get("published_at").is_some());
}

#[test]
fn test_export_writes_non_ascii_literally() {
    let dir = TempDir::new().unwrap();
    let history = HistoryCollection::new(vec![make_record("aaaaaaaaaaa", "日本語のビデオ", "Café", "")]);
    let out = dir.path().join("export.json");

    export_json(&history, &out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("日本語のビデオ"));
    assert!(text.contains("Café"));
    assert!(!text.contains("\\u"));
}

#[test]
fn test_export_key_order() {
    let dir = TempDir::new().unwrap();
    let history = HistoryCollection::new(vec![make_record("aaaaaaaaaaa", "T", "C", "")]);
    let out = dir.path().join("export.json");

    export_json(&history, &out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let keys = [
        "\"title\"",
        "\"channel\"",
        "\"video_id\"",
        "\"video_url\"",
        "\"watched_at\"",
        "\"timestamp\"",
        "\"activity_type\"",
        "\"description\"",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| text.find(k).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_export_empty_collection() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("empty.json");

    assert_eq!(HistoryStore::new().export_json(&out).unwrap(), 0);
    let parsed: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed, json!([]));
}

#[test]
fn test_export_to_missing_directory_fails_and_store_survives() {
    let dir = TempDir::new().unwrap();
    let path = write_takeout(
        &dir,
        json!([{
            "title": "Watched Some Video",
            "titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "subtitles": [{"name": "Some Channel"}],
            "time": "2024-01-15T10:30:00.000Z"
        }]),
    );
    let mut store = HistoryStore::new();
    store.load_takeout(&path).unwrap();

    let bad = dir.path().join("no-such-dir").join("out.json");
    let err = store.export_json(&bad).unwrap_err();
    assert!(matches!(err, TubelogError::Export(_)));

    assert_eq!(store.current().unwrap().len(), 1);
    assert_eq!(store.search("some video").into_matches().len(), 1);
}

#[test]
fn test_store_load_takeout_replaces_previous() {
    let dir = TempDir::new().unwrap();
    let first = write_takeout(
        &dir,
        json!([
            {"title": "Watched A", "titleUrl": "https://www.youtube.com/watch?v=aaaaaaaaaaa", "time": "2024-01-01T00:00:00Z"},
            {"title": "Watched B", "titleUrl": "https://www.youtube.com/watch?v=bbbbbbbbbbb", "time": "2024-01-02T00:00:00Z"}
        ]),
    );
    let mut store = HistoryStore::new();
    assert_eq!(store.load_takeout(&first).unwrap().retained, 2);

    let second = dir.path().join("second.json");
    fs::write(
        &second,
        json!([{"title": "Watched C", "titleUrl": "https://www.youtube.com/watch?v=ccccccccccc", "time": "2024-01-03T00:00:00Z"}]).to_string(),
    )
    .unwrap();
    let report = store.load_takeout(&second).unwrap();
    assert_eq!(report.retained, 1);

    let titles: Vec<_> = store.current().unwrap().iter().map(|r| r.title.clone()).collect();
    assert_eq!(titles, vec!["C"]);
    assert_eq!(store.summarize(10).unwrap().total, 1);
}

#[test]
fn test_load_export_errors() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_export(&dir.path().join("missing.json")),
        Err(TubelogError::FileNotFound(_))
    ));

    let not_array = dir.path().join("object.json");
    fs::write(&not_array, "{\"title\": \"x\"}").unwrap();
    assert!(matches!(load_export(&not_array), Err(TubelogError::MalformedInput(_))));
}
