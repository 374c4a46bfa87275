//! G1 GC log parsing.
//!
//! Unified JVM logging spreads one GC cycle over many lines that share a `GC(<id>)`
//! token. Lines are grouped by id into [`GcRecord`]s; a record becomes complete once its
//! `before->after(total)` memory line has been seen. Parsing runs in bounded batches so
//! callers can yield between them and enforce a global event cap.

use crate::classify::classify;
use crate::config::GcConfig;
use crate::event::{GcEvent, RateStats};
use crate::rate::compute_gc_rates;
use crate::size::parse_size;
use crate::timestamp::{detect_offset, parse_iso, LogContext};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `GC(<id>)`: group 1 is the cycle id.
static GC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GC\((\d+)\)").expect("gc id regex"));

/// Bracketed ISO-8601 timestamp with numeric offset: group 1 is the raw timestamp.
static GC_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?[+-]\d{4})\]")
        .expect("gc timestamp regex")
});

/// `100M->50M(512M)` or `9.304GB->5.201GB(12.480GB)`:
/// groups 1/2 before value/unit, 3/4 after value/unit, 5/6 total value/unit.
static MEMORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)([KMG]B?)->(\d+(?:\.\d+)?)([KMG]B?)\((\d+(?:\.\d+)?)([KMG]B?)\)")
        .expect("gc memory regex")
});

/// `12.345ms`: group 1 is the duration in milliseconds.
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)ms").expect("gc duration regex"));

/// A GC cycle being assembled from its log lines
#[derive(Debug, Clone, Default)]
pub struct GcRecord {
    pub id: u64,
    pub raw_lines: Vec<String>,
    pub actions: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub timestamp_raw: Option<String>,
    pub before_bytes: f64,
    pub after_bytes: f64,
    pub total_bytes: f64,
    pub total_duration: f64,
    pub parsed: bool,
}

impl GcRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Complete records carry both the memory summary and a timestamp.
    pub fn is_complete(&self) -> bool {
        self.parsed && self.timestamp.is_some()
    }
}

/// In-progress records keyed by GC id, iterated in first-seen order.
#[derive(Debug, Default)]
pub struct GcRecordMap {
    records: Vec<GcRecord>,
    index: HashMap<u64, usize>,
}

impl GcRecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&GcRecord> {
        self.index.get(&id).map(|&idx| &self.records[idx])
    }

    pub fn get_or_insert(&mut self, id: u64) -> &mut GcRecord {
        let idx = match self.index.get(&id) {
            Some(&idx) => idx,
            None => {
                self.records.push(GcRecord::new(id));
                let idx = self.records.len() - 1;
                self.index.insert(id, idx);
                idx
            }
        };
        &mut self.records[idx]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GcRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<GcRecord> {
        self.records
    }
}

/// Where a batch stopped and how many records it completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub next_line: usize,
    pub events_parsed: usize,
}

/// Scan `lines` from `start` until they run out or `max_events` records complete.
pub fn parse_batch(
    lines: &[&str],
    start: usize,
    max_events: usize,
    records: &mut GcRecordMap,
    ctx: &mut LogContext,
) -> BatchProgress {
    parse_batch_with(lines, start, max_events, records, ctx, |_, _| {})
}

/// Like [`parse_batch`], offering every scanned line to `on_line` before GC parsing.
pub fn parse_batch_with<F>(
    lines: &[&str],
    start: usize,
    max_events: usize,
    records: &mut GcRecordMap,
    ctx: &mut LogContext,
    mut on_line: F,
) -> BatchProgress
where
    F: FnMut(&str, &LogContext),
{
    let mut events_parsed = 0;
    let mut i = start;

    while i < lines.len() && events_parsed < max_events {
        let line = lines[i];
        i += 1;

        on_line(line, &*ctx);

        if parse_line(line, records, ctx) {
            events_parsed += 1;
        }
    }

    BatchProgress {
        next_line: i,
        events_parsed,
    }
}

/// Apply one line to its record. Returns true when the line completed the record.
fn parse_line(line: &str, records: &mut GcRecordMap, ctx: &mut LogContext) -> bool {
    let Some(id_match) = GC_ID_RE.captures(line) else {
        return false;
    };
    let Ok(id) = id_match[1].parse::<u64>() else {
        return false;
    };
    let marker_end = id_match.get(0).map_or(0, |m| m.end());

    let record = records.get_or_insert(id);
    record.raw_lines.push(line.to_string());

    if record.parsed {
        return false;
    }

    if let Some(dur) = DURATION_RE.captures(line) {
        record.total_duration += dur[1].parse::<f64>().unwrap_or(0.0);
    }

    if record.timestamp.is_none() {
        if let Some(time) = GC_TIME_RE.captures(line) {
            let raw = &time[1];
            if let Some(ts) = parse_iso(raw) {
                record.timestamp = Some(ts);
                record.timestamp_raw = Some(raw.to_string());
                ctx.detect_early(raw);
            }
        }
    }

    let Some(mem) = MEMORY_RE.captures(line) else {
        return false;
    };

    record.before_bytes = parse_size(&mem[1], &mem[2]);
    record.after_bytes = parse_size(&mem[3], &mem[4]);
    record.total_bytes = parse_size(&mem[5], &mem[6]);

    let mem_start = mem.get(0).map_or(0, |m| m.start());
    if mem_start > marker_end {
        let action = line[marker_end..mem_start].trim();
        if !action.is_empty() && !record.actions.iter().any(|a| a == action) {
            record.actions.push(action.to_string());
        }
    }

    record.parsed = true;
    true
}

/// Finalized GC stream
#[derive(Debug, Clone, Default, Serialize)]
pub struct GcTimeline {
    pub events: Vec<GcEvent>,
    pub rate_stats: Option<RateStats>,
    pub detected_timezone: Option<String>,
}

/// Turn complete records into sorted, classified, rated events.
///
/// The offset of the earliest event becomes the run's final detected offset and is
/// written back into `ctx` for the extensions' finish passes.
pub fn finalize(records: GcRecordMap, config: &GcConfig, ctx: &mut LogContext) -> GcTimeline {
    let mut events: Vec<GcEvent> = records
        .into_records()
        .into_iter()
        .filter(GcRecord::is_complete)
        .filter_map(|record| into_event(record, config.long_pause_ms))
        .collect();

    events.sort_by_key(|e| e.timestamp);

    let detected_timezone = events
        .first()
        .and_then(|e| detect_offset(&e.timestamp_raw));
    ctx.detected_offset = detected_timezone.clone();

    let rate_stats = compute_gc_rates(&mut events, config.window_size);

    GcTimeline {
        events,
        rate_stats,
        detected_timezone,
    }
}

fn into_event(record: GcRecord, long_pause_ms: f64) -> Option<GcEvent> {
    let timestamp = record.timestamp?;
    let action = record.actions.join(" + ");
    let duration = (record.total_duration * 100.0).round() / 100.0;
    let classification = classify(&action, &record.actions, duration, long_pause_ms);
    let style = classification.class.style();

    Some(GcEvent {
        id: record.id,
        timestamp,
        timestamp_raw: record.timestamp_raw.unwrap_or_default(),
        raw_lines: record.raw_lines,
        actions: record.actions,
        action,
        before_bytes: record.before_bytes,
        after_bytes: record.after_bytes,
        total_bytes: record.total_bytes,
        total_duration: record.total_duration,
        duration,
        class: classification.class,
        mixed_long: classification.mixed_long,
        color: classification.color().to_string(),
        radius: style.radius,
        priority: style.priority,
        allocated_bytes: 0.0,
        reclaimed_bytes: 0.0,
        elapsed_ms: 0.0,
        instant_alloc_rate: 0.0,
        instant_gc_rate: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GcClass;
    use crate::size::MIB;

    const YOUNG: &str = "[2025-11-09T22:39:21.123+0900][info][gc] GC(7) Pause Young (Normal) (G1 Evacuation Pause) 100M->50M(512M) 12.345ms";

    fn run(lines: &[&str]) -> (GcRecordMap, BatchProgress) {
        let mut records = GcRecordMap::new();
        let mut ctx = LogContext::new();
        let progress = parse_batch(lines, 0, usize::MAX, &mut records, &mut ctx);
        (records, progress)
    }

    #[test]
    fn test_single_line_cycle() {
        let (records, progress) = run(&[YOUNG]);
        assert_eq!(progress, BatchProgress { next_line: 1, events_parsed: 1 });

        let record = records.get(7).unwrap();
        assert!(record.parsed);
        assert_eq!(record.before_bytes, 100.0 * MIB);
        assert_eq!(record.after_bytes, 50.0 * MIB);
        assert_eq!(record.total_bytes, 512.0 * MIB);
        assert_eq!(record.actions, vec!["Pause Young (Normal) (G1 Evacuation Pause)"]);
        assert_eq!(record.timestamp_raw.as_deref(), Some("2025-11-09T22:39:21.123+0900"));
        assert!((record.total_duration - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_lines_without_id_are_skipped() {
        let (records, progress) = run(&["[2025-11-09T22:39:21.123+0900][info][gc] Using G1", ""]);
        assert!(records.is_empty());
        assert_eq!(progress.next_line, 2);
        assert_eq!(progress.events_parsed, 0);
    }

    #[test]
    fn test_multi_line_cycle_accumulates_duration() {
        let lines = [
            "[2025-11-09T22:39:21.000+0900][info][gc,phases] GC(3)   Pre Evacuate Collection Set: 12.5ms",
            "[2025-11-09T22:39:21.001+0900][info][gc,phases] GC(3)   Evacuate Collection Set: 3.0ms",
            "[2025-11-09T22:39:21.002+0900][info][gc] GC(3) Pause Young (Normal) (G1 Evacuation Pause) 200M->120M(512M) 0.2ms",
        ];
        let (records, _) = run(&lines);
        let record = records.get(3).unwrap();
        assert_eq!(record.raw_lines.len(), 3);
        // First timestamp wins
        assert_eq!(record.timestamp_raw.as_deref(), Some("2025-11-09T22:39:21.000+0900"));

        let mut ctx = LogContext::new();
        let timeline = finalize(records, &GcConfig::default(), &mut ctx);
        assert_eq!(timeline.events[0].duration, 15.7);
    }

    #[test]
    fn test_memory_line_parsed_once() {
        let lines = [
            "[2025-11-09T22:39:21.000+0900][info][gc] GC(9) Pause Remark 300M->280M(512M) 3.000ms",
            "[2025-11-09T22:39:21.500+0900][info][gc] GC(9) Pause Cleanup 280M->270M(512M) 1.000ms",
            "[2025-11-09T22:39:21.600+0900][info][gc] GC(9) Concurrent Mark Cycle 250.000ms",
        ];
        let (records, progress) = run(&lines);
        assert_eq!(progress.events_parsed, 1);
        let record = records.get(9).unwrap();
        assert_eq!(record.actions, vec!["Pause Remark"]);
        assert_eq!(record.after_bytes, 280.0 * MIB);
        assert_eq!(record.raw_lines.len(), 3);
        // Lines after the memory summary add no duration
        assert_eq!(record.total_duration, 3.0);

        let mut ctx = LogContext::new();
        let timeline = finalize(records, &GcConfig::default(), &mut ctx);
        assert_eq!(timeline.events[0].duration, 3.0);
        assert_eq!(timeline.events[0].class, GcClass::Concurrent);
    }

    #[test]
    fn test_batch_stops_at_max_events() {
        let lines: Vec<String> = (0..5)
            .map(|i| {
                format!(
                    "[2025-11-09T22:39:2{i}.000+0900][info][gc] GC({i}) Pause Young (Normal) 100M->50M(512M) 1.0ms"
                )
            })
            .collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();

        let mut records = GcRecordMap::new();
        let mut ctx = LogContext::new();
        let first = parse_batch(&lines, 0, 2, &mut records, &mut ctx);
        assert_eq!(first, BatchProgress { next_line: 2, events_parsed: 2 });

        let second = parse_batch(&lines, first.next_line, 10, &mut records, &mut ctx);
        assert_eq!(second, BatchProgress { next_line: 5, events_parsed: 3 });
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_early_timezone_detection_and_final_offset() {
        let lines = [
            "[2025-11-09T22:39:21.000-0300][info][gc] GC(1) Pause Young (Normal) 100M->50M(512M) 1.0ms",
        ];
        let mut records = GcRecordMap::new();
        let mut ctx = LogContext::new();
        let mut seen = Vec::new();
        parse_batch_with(&lines, 0, 10, &mut records, &mut ctx, |line, _| {
            seen.push(line.to_string())
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(ctx.offset(), Some("-0300"));

        let timeline = finalize(records, &GcConfig::default(), &mut ctx);
        assert_eq!(timeline.detected_timezone.as_deref(), Some("-0300"));
    }

    #[test]
    fn test_incomplete_records_are_dropped() {
        let lines = [
            // memory line without timestamp
            "GC(1) Pause Young (Normal) 100M->50M(512M) 1.0ms",
            // timestamp without memory line
            "[2025-11-09T22:39:21.000+0900][info][gc,start] GC(2) Pause Young (Normal) (G1 Evacuation Pause)",
            YOUNG,
        ];
        let (records, _) = run(&lines);
        assert_eq!(records.len(), 3);

        let mut ctx = LogContext::new();
        let timeline = finalize(records, &GcConfig::default(), &mut ctx);
        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.events[0].id, 7);
        assert!(timeline.rate_stats.is_none());
    }

    #[test]
    fn test_finalize_sorts_and_classifies() {
        let lines = [
            "[2025-11-09T22:39:25.000+0900][info][gc] GC(2) Pause Full (G1 Compaction Pause) 500M->100M(512M) 800.0ms",
            "[2025-11-09T22:39:21.000+0900][info][gc] GC(1) Pause Young (Mixed) (G1 Evacuation Pause) 300M->200M(512M) 20.0ms",
        ];
        let (records, _) = run(&lines);
        let mut ctx = LogContext::new();
        let timeline = finalize(records, &GcConfig::default(), &mut ctx);

        let ids: Vec<u64> = timeline.events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(timeline.events[0].class, GcClass::Mixed);
        assert_eq!(timeline.events[1].class, GcClass::Full);
        assert_eq!(timeline.events[1].priority, GcClass::Full.style().priority);
        assert!(timeline.rate_stats.is_some());
    }
}
