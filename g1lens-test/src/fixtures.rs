use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use g1lens_core::GcClass;
use serde::Serialize;

pub const OFFSET: &str = "+0900";

/// 2025-11-09 22:39:20 in UTC+9.
pub fn base_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2025, 11, 9, 22, 39, 20).single())
        .expect("valid fixture base time")
}

pub fn gc_stamp(ts: DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}

/// One GC cycle spread over a start line, optional phase lines and the summary line.
pub fn gc_cycle(
    id: u64,
    ts: DateTime<FixedOffset>,
    action: &str,
    heap_mb: (u64, u64, u64),
    phase_ms: &[f64],
    pause_ms: f64,
) -> Vec<String> {
    let stamp = gc_stamp(ts);
    let (before, after, total) = heap_mb;
    let mut lines = vec![format!("[{stamp}][info][gc,start    ] GC({id}) {action}")];
    for (n, ms) in phase_ms.iter().enumerate() {
        lines.push(format!(
            "[{stamp}][info][gc,phases   ] GC({id})   Phase {n}: {ms:.1}ms"
        ));
    }
    lines.push(format!(
        "[{stamp}][info][gc          ] GC({id}) {action} {before}M->{after}M({total}M) {pause_ms:.3}ms"
    ));
    lines
}

pub fn access_line(
    ts: DateTime<FixedOffset>,
    method: &str,
    path: &str,
    status: u16,
    size: u64,
    latency_us: u64,
) -> String {
    format!(
        "10.0.0.1 - - [{}] \"{method} {path} HTTP/1.1\" {status} {size} {latency_us}",
        ts.format("%d/%b/%Y:%H:%M:%S %z")
    )
}

fn service_stamp(ts: DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn service_start(ts: DateTime<FixedOffset>, thread: &str, class: &str, method: &str) -> String {
    format!(
        "{} [{thread}] INFO  [{class}#{method}()] : START",
        service_stamp(ts)
    )
}

pub fn service_end(
    ts: DateTime<FixedOffset>,
    thread: &str,
    class: &str,
    method: &str,
    processing: &str,
    goods: Option<u64>,
) -> String {
    let mut line = format!(
        "{} [{thread}] INFO  [{class}#{method}()] : END result=OK Processing time [{processing}] ms",
        service_stamp(ts)
    );
    if let Some(goods) = goods {
        line.push_str(&format!(" lastGoodsCount : {goods}"));
    }
    line
}

pub fn service_line(ts: DateTime<FixedOffset>, thread: &str, message: &str) -> String {
    format!("{} [{thread}] DEBUG {message}", service_stamp(ts))
}

#[derive(Debug, Clone, Serialize)]
pub struct GcFixture {
    pub text: String,
    pub expected_classes: Vec<GcClass>,
    pub expected_first_duration: f64,
    pub expected_timezone: &'static str,
}

/// Six complete cycles covering every class plus one cycle that never completes.
pub fn mixed_gc_fixture() -> GcFixture {
    let base = base_time();
    let at = |secs: i64| base + Duration::seconds(secs);

    let cycles = [
        gc_cycle(0, at(0), "Pause Young (Normal) (G1 Evacuation Pause)", (200, 80, 512), &[2.0, 3.5], 1.2),
        gc_cycle(1, at(1), "Pause Young (Mixed) (G1 Evacuation Pause)", (300, 150, 512), &[], 20.0),
        gc_cycle(2, at(2), "Pause Remark", (260, 250, 512), &[], 5.0),
        gc_cycle(3, at(3), "Pause Young (Normal) (G1 Evacuation Pause)", (400, 120, 512), &[], 150.0),
        gc_cycle(4, at(4), "Pause Full (G1 Compaction Pause)", (500, 90, 512), &[100.0], 800.0),
        gc_cycle(5, at(5), "Pause Young (Mixed) (G1 Evacuation Pause)", (350, 100, 512), &[], 130.0),
        // Start line only
        vec![format!(
            "[{}][info][gc,start    ] GC(6) Pause Young (Normal) (G1 Evacuation Pause)",
            gc_stamp(at(6))
        )],
    ];

    let mut lines = vec![format!("[{}][info][gc,init] Using G1", gc_stamp(base))];
    lines.extend(cycles.into_iter().flatten());

    GcFixture {
        text: lines.join("\n"),
        expected_classes: vec![
            GcClass::Normal,
            GcClass::Mixed,
            GcClass::Concurrent,
            GcClass::LongPause,
            GcClass::Full,
            GcClass::LongPause,
        ],
        expected_first_duration: 6.7,
        expected_timezone: OFFSET,
    }
}

/// `count` single-line young collections, 100 ms apart.
pub fn gc_flood(count: usize) -> String {
    let base = base_time();
    let mut text = String::new();
    for id in 0..count {
        let ts = base + Duration::milliseconds(id as i64 * 100);
        text.push_str(&format!(
            "[{}][info][gc] GC({id}) Pause Young (Normal) (G1 Evacuation Pause) 100M->50M(512M) 1.000ms\n",
            gc_stamp(ts)
        ));
    }
    text
}

/// `count` cycles whose heap and spacing vary, for rate window checks.
pub fn gc_rate_series(count: usize) -> String {
    let base = base_time();
    let mut lines = Vec::new();
    for id in 0..count {
        let i = id as i64;
        let ts = base + Duration::milliseconds(i * 750 + i * i * 13);
        let before = 200 + id as u64 * 7;
        let pause = if id % 4 == 0 { 40.0 } else { 4.0 };
        lines.extend(gc_cycle(
            id as u64,
            ts,
            "Pause Young (Normal) (G1 Evacuation Pause)",
            (before, before - 90, 512),
            &[],
            pause,
        ));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceFixture {
    pub text: String,
    pub thread: String,
    pub expected_thread_lines: usize,
}

/// A START and END on `exec-1` with `noise` lines from several threads in between.
pub fn interleaved_service_fixture(noise: usize) -> ServiceFixture {
    let base = base_time();
    let thread = "exec-1";
    let mut lines = vec![service_start(base, thread, "AirController", "airListSchSv")];
    let mut thread_lines = 1;

    for i in 0..noise {
        let ts = base + Duration::seconds(i as i64 / 50);
        let owner = if i % 3 == 0 {
            thread_lines += 1;
            thread.to_string()
        } else {
            format!("exec-{}", 2 + i % 4)
        };
        lines.push(service_line(ts, &owner, &format!("step {i}")));
    }

    let end = base + Duration::seconds(noise as i64 / 50 + 1);
    lines.push(service_end(
        end,
        thread,
        "AirController",
        "airListSchSv",
        "AM, 3, 120, 5, 340, 25, 2871",
        Some(42),
    ));
    thread_lines += 1;

    ServiceFixture {
        text: lines.join("\n"),
        thread: thread.to_string(),
        expected_thread_lines: thread_lines,
    }
}

/// Four requests in the same second followed by one a second later.
pub fn access_burst_fixture() -> String {
    let base = base_time();
    let mut lines: Vec<String> = (0..4)
        .map(|i| access_line(base, "POST", "/services/airSearch", 200, 1_000 + i, 250_000))
        .collect();
    lines.push(access_line(base + Duration::seconds(1), "GET", "/health", 200, 2, 300));
    lines.join("\n")
}

/// GC, access and service lines from one host in a single file.
pub fn combined_fixture() -> String {
    let base = base_time();
    let mut lines = gc_cycle(1, base, "Pause Young (Normal) (G1 Evacuation Pause)", (200, 80, 512), &[], 3.0);
    lines.push(service_start(base + Duration::seconds(1), "exec-7", "HotelController", "hotelSchSv"));
    lines.push(access_line(base + Duration::seconds(2), "GET", "/hotels", 200, 4_096, 1_500_000));
    lines.push(service_end(
        base + Duration::seconds(3),
        "exec-7",
        "HotelController",
        "hotelSchSv",
        "1480",
        Some(12),
    ));
    lines.extend(gc_cycle(2, base + Duration::seconds(4), "Pause Young (Normal) (G1 Evacuation Pause)", (300, 90, 512), &[], 2.0));
    lines.join("\n")
}
