use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where Takeout archives usually put the watch history, relative to a root.
const TAKEOUT_PATTERNS: &[&str] = &[
    "**/watch-history.json",
    "**/Watch History.json",
    "**/Takeout/YouTube*/history/watch-history.json",
    "**/YouTube*/watch-history.json",
    "**/*watch*history*.json",
];

/// Find candidate Takeout watch-history files under `dir`.
///
/// Returns each matching file once, sorted by path. Unreadable directories
/// are skipped.
pub fn find_takeout_files(dir: &Path) -> Vec<PathBuf> {
    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in TAKEOUT_PATTERNS {
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern);
        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                debug!(pattern = %full, error = %e, "invalid glob pattern");
                continue;
            }
        };
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => {
                    found.insert(path);
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unreadable path"),
            }
        }
    }

    found.into_iter().collect()
}
