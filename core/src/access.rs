//! HTTP access log parsing.
//!
//! Access logs only carry one-second resolution, so after ranking the busiest endpoints
//! the finish pass spreads requests that share a timestamp across their second before
//! computing request and byte rates.

use crate::config::AccessLogConfig;
use crate::event::{AccessEvent, LegendEntry};
use crate::rate::{epoch_millis, trailing_rates};
use crate::timeline::{sort_by_time, spread_identical};
use crate::timestamp::parse_access;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `... [09/Nov/2025:22:39:21 +0900] "POST /services/airSearch HTTP/1.1" 200 138179 698743`
///
/// Groups: 1 timestamp, 2 method, 3 path, then optional 4 status, 5 size, 6 latency (µs).
static ACCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[(\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2}\s[+-]\d{4})\]\s+"([A-Z]+)\s+([^"]+)\s+HTTP[^"]*"(?:\s+(\d+))?(?:\s+(\d+))?(?:\s+(\d+))?"#,
    )
    .expect("access log regex")
});

/// Colors of the top ranked endpoints, in rank order.
pub const TOP_PALETTE: [&str; 3] = ["#e74c3c", "#b28e00", "#01aa48"];

/// Color of every endpoint outside the top ranks.
pub const NEUTRAL_COLOR: &str = "#95a5a6";

#[derive(Debug, Clone)]
pub struct AccessLogParser {
    config: AccessLogConfig,
    events: Vec<AccessEvent>,
    legend: Vec<LegendEntry>,
}

impl AccessLogParser {
    pub fn new(config: AccessLogConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            legend: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.legend.clear();
    }

    /// Record the line if it is an access log entry. Returns true when consumed.
    pub fn parse(&mut self, line: &str) -> bool {
        let Some(caps) = ACCESS_RE.captures(line) else {
            return false;
        };
        let raw_time = &caps[1];
        let Some(timestamp) = parse_access(raw_time) else {
            return false;
        };

        let number = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u64>().ok());

        self.events.push(AccessEvent {
            timestamp,
            timestamp_raw: raw_time.to_string(),
            method: caps[2].to_string(),
            url: caps[3].to_string(),
            status: number(4).and_then(|s| u16::try_from(s).ok()),
            size: number(5).unwrap_or(0),
            latency: number(6).unwrap_or(0),
            original_line: line.to_string(),
            rps: 0.0,
            bps: 0.0,
            color: NEUTRAL_COLOR.to_string(),
            rank: -1,
        });
        true
    }

    /// Rank, redistribute and rate the collected requests.
    pub fn finish(&mut self) {
        sort_by_time(&mut self.events);
        if self.events.is_empty() {
            self.legend.clear();
            return;
        }

        self.assign_ranks();

        spread_identical(&mut self.events);
        sort_by_time(&mut self.events);

        self.compute_rates();

        tracing::info!(
            events = self.events.len(),
            top = self.legend.len(),
            "access log finished"
        );
    }

    fn assign_ranks(&mut self) {
        // Counts in first-seen order so equal counts rank by first appearance
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for event in &self.events {
            let key = event.request_key();
            match positions.get(&key) {
                Some(&pos) => order[pos].1 += 1,
                None => {
                    positions.insert(key.clone(), order.len());
                    order.push((key, 1));
                }
            }
        }
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let top_n = self.config.top_n.min(TOP_PALETTE.len());
        let top: Vec<(String, usize)> = order.into_iter().take(top_n).collect();

        for event in &mut self.events {
            let key = event.request_key();
            match top.iter().position(|(k, _)| *k == key) {
                Some(rank) => {
                    event.rank = rank as i32;
                    event.color = TOP_PALETTE[rank].to_string();
                }
                None => {
                    event.rank = -1;
                    event.color = NEUTRAL_COLOR.to_string();
                }
            }
        }

        self.legend = top
            .into_iter()
            .enumerate()
            .map(|(rank, (label, count))| LegendEntry {
                label,
                color: TOP_PALETTE[rank].to_string(),
                count,
            })
            .collect();
    }

    fn compute_rates(&mut self) {
        let times: Vec<f64> = self.events.iter().map(|e| epoch_millis(e.timestamp)).collect();
        let own: Vec<f64> = self.events.iter().map(|e| e.latency as f64 / 1000.0).collect();
        let requests = vec![1.0; self.events.len()];
        let bytes: Vec<f64> = self.events.iter().map(|e| e.size as f64).collect();

        let window = self.config.window_size;
        let rps = trailing_rates(&times, &own, &requests, window);
        let bps = trailing_rates(&times, &own, &bytes, window);

        for ((event, rps), bps) in self.events.iter_mut().zip(rps).zip(bps) {
            event.rps = rps;
            event.bps = bps;
        }
    }

    pub fn events(&self) -> &[AccessEvent] {
        &self.events
    }

    /// Top ranked endpoints with their colors and request counts.
    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new(AccessLogConfig::default())
    }
}
