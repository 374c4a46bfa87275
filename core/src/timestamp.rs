use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Trailing numeric UTC offset of a raw timestamp, e.g. `+0900` in `2025-11-09T22:39:21.123+0900`.
static OFFSET_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d{4})$").expect("offset suffix regex"));

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const ACCESS_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";
const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Shared state every parser can read during a run.
///
/// The GC parser fills `detected_offset` as soon as it sees its first offset-carrying
/// timestamp, then overwrites it with the offset of the earliest finalized GC event.
/// Parsers that interpret local times provisionally during `parse` re-read it in `finish`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub detected_offset: Option<String>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: impl Into<String>) -> Self {
        Self {
            detected_offset: Some(offset.into()),
        }
    }

    pub fn offset(&self) -> Option<&str> {
        self.detected_offset.as_deref()
    }

    /// Record an early guess. Never replaces an offset that is already known.
    pub fn detect_early(&mut self, raw_timestamp: &str) {
        if self.detected_offset.is_some() {
            return;
        }
        if let Some(offset) = detect_offset(raw_timestamp) {
            tracing::debug!(offset = %offset, "early timezone detection");
            self.detected_offset = Some(offset);
        }
    }
}

/// Extract the `+HHMM`/`-HHMM` suffix of a raw timestamp.
pub fn detect_offset(raw: &str) -> Option<String> {
    OFFSET_SUFFIX_RE
        .captures(raw)
        .map(|caps| caps[1].to_string())
}

/// Parse a `+HHMM`/`-HHMM` offset string.
pub fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let bytes = offset.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hours: i32 = offset[1..3].parse().ok()?;
    let minutes: i32 = offset[3..5].parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match bytes[0] {
        b'+' => FixedOffset::east_opt(seconds),
        b'-' => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Parse a GC log timestamp such as `2025-11-09T22:39:21.123+0900`.
pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, ISO_FORMAT)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Parse an access log timestamp such as `09/Nov/2025:22:39:21 +0900`.
pub fn parse_access(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, ACCESS_FORMAT)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Parse a service log local time (`2025-11-09 22:39:22`) against an offset.
///
/// Without an offset the local time is read as UTC. An offset that is present but
/// malformed rejects the timestamp.
pub fn parse_local(raw: &str, offset: Option<&str>) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, LOCAL_FORMAT).ok()?;
    match offset {
        Some(offset) => parse_offset(offset)?
            .from_local_datetime(&naive)
            .single()
            .map(|ts| ts.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Render a timestamp in the log's own offset, falling back to UTC.
pub fn format_in_offset(ts: &DateTime<Utc>, offset: Option<&str>) -> String {
    match offset.and_then(parse_offset) {
        Some(fixed) => ts.with_timezone(&fixed).format(DISPLAY_FORMAT).to_string(),
        None => ts.format(DISPLAY_FORMAT).to_string(),
    }
}
