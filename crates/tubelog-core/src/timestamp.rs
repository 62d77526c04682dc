//! Lenient parsing of the timestamp shapes found in API and Takeout data.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

static TZ_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
static BARE_DATE_RE: OnceLock<Regex> = OnceLock::new();

/// Offset-less ISO-8601 shapes, tried after the offset-aware parse fails.
const ISO_LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// ISO date-times whose offset has no colon, e.g. `+0000`.
const ISO_COMPACT_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Takeout long-form shapes, tried in order once the zone abbreviation is gone.
const TAKEOUT_FORMATS: &[&str] = &[
    "%b %d, %Y, %I:%M:%S %p", // Dec 15, 2023, 3:45:23 PM
    "%b %d, %Y, %H:%M:%S",    // Dec 15, 2023, 15:45:23
    "%Y-%m-%d %H:%M:%S",      // 2023-12-15 15:45:23
    "%Y-%m-%dT%H:%M:%S",      // 2023-12-15T15:45:23
];

/// A parsed point in time.
///
/// Keeps the wall-clock value exactly as the source wrote it, plus the UTC
/// offset when the source carried one. Takeout's zone abbreviations ("PST")
/// carry no usable offset, so those timestamps stay offset-less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl Timestamp {
    /// A timestamp with no known offset.
    pub fn from_naive(local: NaiveDateTime) -> Self {
        Self { local, offset: None }
    }

    /// A timestamp with an explicit offset.
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self {
            local: dt.naive_local(),
            offset: Some(*dt.offset()),
        }
    }

    /// The wall-clock value as written by the source.
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// The instant in UTC. Offset-less values are taken as already UTC.
    pub fn utc_naive(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self
                .local
                .and_local_timezone(offset)
                .single()
                .map(|dt| dt.naive_utc())
                .unwrap_or(self.local),
            None => self.local,
        }
    }

    /// Whole days from `self` to `later` (floored, never negative).
    pub fn days_until(&self, later: &Timestamp) -> i64 {
        (later.utc_naive() - self.utc_naive()).num_days().max(0)
    }

    /// Renders `YYYY-MM-DDTHH:MM:SS[.ffffff][+HH:MM]`.
    ///
    /// Microseconds are only written when non-zero and the offset only when
    /// known, which is the layout downstream consumers of exported files
    /// already parse.
    pub fn to_iso_string(&self) -> String {
        let mut out = self.local.format("%Y-%m-%dT%H:%M:%S").to_string();
        let micros = self.local.nanosecond() / 1_000;
        if micros != 0 {
            out.push_str(&format!(".{:06}", micros));
        }
        if let Some(offset) = self.offset {
            let secs = offset.local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let secs = secs.abs();
            out.push_str(&format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60));
        }
        out
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.utc_naive()
            .cmp(&other.utc_naive())
            .then_with(|| self.local.cmp(&other.local))
            .then_with(|| {
                let a = self.offset.map(|o| o.local_minus_utc());
                let b = other.offset.map(|o| o.local_minus_utc());
                a.cmp(&b)
            })
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%d %H:%M"))
    }
}

/// Parse a raw timestamp from either source.
///
/// Shapes are tried in order and the first match wins:
///
/// 1. ISO-8601. A trailing `Z` becomes `+00:00`; offset-less ISO date-times
///    are accepted as local times.
/// 2. Takeout long form, e.g. `Dec 15, 2023, 3:45:23 PM PST`. The trailing
///    zone abbreviation is stripped first.
/// 3. A bare `Dec 15, 2023` anywhere in the text, at midnight.
///
/// Returns `None` when nothing matches. Callers treat that as "no timestamp",
/// never as an error.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    parse_iso(raw)
        .or_else(|| parse_takeout_long_form(raw))
        .or_else(|| parse_bare_date(raw))
}

fn parse_iso(raw: &str) -> Option<Timestamp> {
    let normalized = match raw.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(Timestamp::from_datetime(dt));
    }

    if let Some(dt) = ISO_COMPACT_OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(Timestamp::from_datetime(dt));
    }

    ISO_LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(Timestamp::from_naive)
}

fn parse_takeout_long_form(raw: &str) -> Option<Timestamp> {
    let re = TZ_SUFFIX_RE.get_or_init(|| Regex::new(r"\s+[A-Z]{3,4}$").unwrap());
    let cleaned = re.replace(raw, "");

    TAKEOUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
        .map(Timestamp::from_naive)
}

fn parse_bare_date(raw: &str) -> Option<Timestamp> {
    let re = BARE_DATE_RE.get_or_init(|| Regex::new(r"(\w{3}\s+\d{1,2},\s+\d{4})").unwrap());
    let found = re.captures(raw)?.get(1)?.as_str();
    let date = NaiveDate::parse_from_str(found, "%b %d, %Y").ok()?;
    date.and_hms_opt(0, 0, 0).map(Timestamp::from_naive)
}
