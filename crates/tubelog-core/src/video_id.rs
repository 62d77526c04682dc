//! YouTube video-ID extraction from the URL shapes seen in history data.

use regex::Regex;
use std::sync::OnceLock;
use url::{form_urlencoded, Url};

static VIDEO_ID_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Canonical watch URL prefix; the video ID is appended.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

fn video_id_patterns() -> &'static [Regex] {
    VIDEO_ID_PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})",
            r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Extract the 11-character video ID from a YouTube URL.
///
/// Recognizes `watch?v=`, `youtu.be/`, `/embed/` and `/v/` URLs first, then
/// falls back to the first non-empty `v` query parameter of any parseable
/// URL. Scheme-less URLs are scanned the same way. Malformed input yields
/// `None`.
pub fn extract_video_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    for pattern in video_id_patterns() {
        if let Some(id) = pattern.captures(url).and_then(|c| c.get(1)) {
            return Some(id.as_str().to_string());
        }
    }

    match Url::parse(url) {
        Ok(parsed) => first_v_param(parsed.query_pairs()),
        // scheme-less input such as `www.youtube.com/watch?v=...`
        Err(_) => {
            let (_, query) = url.split_once('?')?;
            let query = query.split('#').next().unwrap_or_default();
            first_v_param(form_urlencoded::parse(query.as_bytes()))
        }
    }
}

fn first_v_param(mut pairs: form_urlencoded::Parse<'_>) -> Option<String> {
    pairs
        .find(|(key, value)| key == "v" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// The canonical watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_embed_and_v_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_query_fallback() {
        // v is not the first parameter, so only the query fallback sees it
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_video_id("https://music.youtube.com/watch?v=&v=xyz").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_query_fallback_without_scheme() {
        assert_eq!(
            extract_video_id("www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("youtube.com/watch?list=PL1&v=abc123#t=30").as_deref(),
            Some("abc123")
        );
        assert!(extract_video_id("www.youtube.com/watch?feature=share").is_none());
    }

    #[test]
    fn test_no_video_parameter() {
        assert!(extract_video_id("https://www.youtube.com/feed/history").is_none());
        assert!(extract_video_id("https://www.youtube.com/results?search_query=rust").is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(extract_video_id("").is_none());
        assert!(extract_video_id("not a url at all").is_none());
        assert!(extract_video_id("::::").is_none());
    }

    #[test]
    fn test_watch_url_builder() {
        assert_eq!(watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
