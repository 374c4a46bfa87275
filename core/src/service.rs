//! Service log parsing.
//!
//! A service call is logged as a `START` line and an `END` line on the same thread,
//! possibly hundreds of lines apart and interleaved with other threads. One
//! [`ActiveCall`] accumulates per thread id until its `END` arrives.
//!
//! Service logs print local time without an offset. During `parse` the offset known so
//! far is used; `finish` re-reads every stored raw time against the final offset.

use crate::config::ServiceLogConfig;
use crate::event::{ServiceCallEvent, ServiceMetrics};
use crate::rate::{epoch_millis, trailing_rates};
use crate::timeline::{sort_by_time, spread_within_second};
use crate::timestamp::{parse_local, LogContext};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `2025-11-09 22:39:22 [http-nio-8080-exec-258]`: groups 1 date, 2 time, 3 thread id.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})\s(\d{2}:\d{2}:\d{2})\s\[([^\]]+)\]").expect("header regex")
});

/// `[AirController#airListSchSv()] : START`: groups 1 class, 2 method.
static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([a-zA-Z0-9_]+)#([a-zA-Z0-9_]+\(\))\]\s+:\s+START").expect("start regex")
});

/// `[Class#method()] : END ... Processing time [<value>] ms lastGoodsCount : <n>`:
/// groups 1 class, 2 method, 3 processing time (integer or comma tuple), 4 optional goods.
static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[([a-zA-Z0-9_]+)#([a-zA-Z0-9_]+\(\))\]\s+:\s+END.*?Processing\s+time\s+\[([^\]]+)\]\s+ms(?:\s+lastGoodsCount\s+:\s+(\d+))?",
    )
    .expect("end regex")
});

/// Auxiliary agent lookup timing: group 1 is milliseconds.
static HKN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Total time for getHknAgtInfo: \(ms\) (\d+)").expect("hkn regex")
});

/// Method family whose processing time tuple carries packed sub-metrics.
const AIR_LIST_METHOD: &str = "airListSchSv";

fn gds_name(code: &str) -> &str {
    match code {
        "IN" => "Infini",
        "AP" => "Galileo (Apollo)",
        "AM" => "Amadeus",
        other => other,
    }
}

/// In-flight accumulator for one thread
#[derive(Debug, Clone)]
pub struct ActiveCall {
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub start_time_raw: Option<String>,
    pub thread_id: String,
    pub logs: Vec<String>,
    pub hkn_agt_times: Vec<i64>,
}

impl ActiveCall {
    fn idle(thread_id: &str, first_line: &str) -> Self {
        Self {
            class_name: None,
            method_name: None,
            start_time: None,
            start_time_raw: None,
            thread_id: thread_id.to_string(),
            logs: vec![first_line.to_string()],
            hkn_agt_times: Vec::new(),
        }
    }
}

/// Decoded `Processing time [...]` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingTime {
    pub millis: i64,
    pub metrics: Option<ServiceMetrics>,
}

/// Decode a processing time field. A comma tuple's last element is the processing
/// time; for the air list search family the earlier elements carry the GDS code, two
/// connect timings (the larger wins) and the agent lookup time.
pub fn decode_processing_time(field: &str, method_name: &str) -> ProcessingTime {
    if !field.contains(',') {
        return ProcessingTime {
            millis: leading_int(field).unwrap_or(0),
            metrics: None,
        };
    }

    let parts: Vec<&str> = field.split(',').map(str::trim).collect();
    let part = |idx: usize| parts.get(idx).and_then(|p| leading_int(p)).unwrap_or(0);
    let millis = parts.last().and_then(|p| leading_int(p)).unwrap_or(0);

    let metrics = method_name.contains(AIR_LIST_METHOD).then(|| ServiceMetrics {
        gds: gds_name(parts[0]).to_string(),
        carrier_connect_execute_time: part(2).max(part(4)),
        hkn_agt_time: part(5),
    });

    ProcessingTime { millis, metrics }
}

/// Integer prefix of `s` after leading whitespace, e.g. `"12ms"` → 12.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

#[derive(Debug, Clone)]
pub struct ServiceLogParser {
    config: ServiceLogConfig,
    events: Vec<ServiceCallEvent>,
    active_calls: HashMap<String, ActiveCall>,
}

impl ServiceLogParser {
    pub fn new(config: ServiceLogConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            active_calls: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.active_calls.clear();
    }

    fn is_service_method(&self, method_name: &str) -> bool {
        method_name.contains(self.config.service_marker.as_str())
    }

    /// Feed one line through the per-thread state machine. Returns true when the line
    /// carried a service log header and a valid timestamp.
    pub fn parse(&mut self, line: &str, ctx: &LogContext) -> bool {
        let Some(header) = HEADER_RE.captures(line) else {
            return false;
        };
        let raw_time = format!("{} {}", &header[1], &header[2]);
        let thread_id = &header[3];

        let Some(timestamp) = parse_local(&raw_time, ctx.offset()) else {
            return false;
        };

        if let Some(start) = START_RE.captures(line) {
            if self.is_service_method(&start[2]) {
                self.on_start(line, thread_id, &start[1], &start[2], timestamp, raw_time);
                return true;
            }
        }

        if let Some(end) = END_RE.captures(line) {
            if self.is_service_method(&end[2]) {
                let goods = end.get(4).and_then(|m| m.as_str().parse::<u64>().ok());
                self.on_end(line, thread_id, &end[1], &end[2], &end[3], goods, timestamp, raw_time);
                return true;
            }
        }

        match self.active_calls.get_mut(thread_id) {
            None => {
                self.active_calls
                    .insert(thread_id.to_string(), ActiveCall::idle(thread_id, line));
            }
            Some(call) => match HKN_RE.captures(line) {
                Some(hkn) => call.hkn_agt_times.push(leading_int(&hkn[1]).unwrap_or(0)),
                None => call.logs.push(line.to_string()),
            },
        }
        true
    }

    fn on_start(
        &mut self,
        line: &str,
        thread_id: &str,
        class_name: &str,
        method_name: &str,
        timestamp: DateTime<Utc>,
        raw_time: String,
    ) {
        let call = self
            .active_calls
            .entry(thread_id.to_string())
            .or_insert_with(|| ActiveCall {
                logs: Vec::new(),
                ..ActiveCall::idle(thread_id, line)
            });
        call.class_name = Some(class_name.to_string());
        call.method_name = Some(method_name.to_string());
        call.start_time = Some(timestamp);
        call.start_time_raw = Some(raw_time);
        call.logs.push(line.to_string());
    }

    /// Close the thread's call. The END is matched by thread id alone: a START for a
    /// different service method on the same thread is still paired with it.
    #[allow(clippy::too_many_arguments)]
    fn on_end(
        &mut self,
        line: &str,
        thread_id: &str,
        class_name: &str,
        method_name: &str,
        processing_field: &str,
        goods: Option<u64>,
        timestamp: DateTime<Utc>,
        raw_time: String,
    ) {
        let decoded = decode_processing_time(processing_field, method_name);

        let mut call = match self.active_calls.remove(thread_id) {
            Some(mut call) => {
                call.logs.push(line.to_string());
                call
            }
            None => ActiveCall::idle(thread_id, line),
        };
        call.class_name.get_or_insert_with(|| class_name.to_string());
        call.method_name.get_or_insert_with(|| method_name.to_string());

        self.events.push(ServiceCallEvent {
            timestamp: call.start_time.unwrap_or(timestamp),
            timestamp_raw: call.start_time_raw,
            end_time: timestamp,
            end_time_raw: raw_time,
            class_name: call.class_name,
            method_name: call.method_name,
            thread_id: call.thread_id,
            processing_time: decoded.millis,
            last_goods_count: goods,
            hkn_agt_times: call.hkn_agt_times,
            metrics: decoded.metrics,
            logs: call.logs,
            proc_rate: 0.0,
            goods_rate: 0.0,
        });
    }

    /// Re-anchor timestamps on the final offset, redistribute and compute rates.
    pub fn finish(&mut self, ctx: &LogContext) {
        let offset = ctx.offset();
        for event in &mut self.events {
            if let Some(end) = parse_local(&event.end_time_raw, offset) {
                event.end_time = end;
            }
            let start = match event.timestamp_raw.as_deref() {
                Some(raw) => parse_local(raw, offset),
                None => Some(event.end_time),
            };
            if let Some(start) = start {
                event.timestamp = start;
            }
        }

        sort_by_time(&mut self.events);
        spread_within_second(&mut self.events);
        sort_by_time(&mut self.events);

        self.compute_rates();

        if !self.active_calls.is_empty() {
            tracing::debug!(
                open = self.active_calls.len(),
                "dropping service threads without a closing END"
            );
        }
        self.active_calls.clear();

        tracing::info!(events = self.events.len(), "service log finished");
    }

    fn compute_rates(&mut self) {
        let times: Vec<f64> = self.events.iter().map(|e| epoch_millis(e.timestamp)).collect();
        let own: Vec<f64> = self.events.iter().map(|e| e.processing_time as f64).collect();
        let goods: Vec<f64> = self
            .events
            .iter()
            .map(|e| e.last_goods_count.unwrap_or(0) as f64)
            .collect();

        let window = self.config.window_size;
        let proc_rates = trailing_rates(&times, &own, &own, window);
        let goods_rates = trailing_rates(&times, &own, &goods, window);

        for ((event, proc_rate), goods_rate) in self.events.iter_mut().zip(proc_rates).zip(goods_rates) {
            event.proc_rate = proc_rate;
            event.goods_rate = goods_rate;
        }
    }

    pub fn events(&self) -> &[ServiceCallEvent] {
        &self.events
    }

    /// Threads with an open accumulator, whether or not a START was seen.
    pub fn open_threads(&self) -> usize {
        self.active_calls.len()
    }

    pub fn active_call(&self, thread_id: &str) -> Option<&ActiveCall> {
        self.active_calls.get(thread_id)
    }
}

impl Default for ServiceLogParser {
    fn default() -> Self {
        Self::new(ServiceLogConfig::default())
    }
}
