use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pause class assigned to each finalized GC event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GcClass {
    Full,
    Concurrent,
    LongPause,
    Mixed,
    Normal,
}

/// A finalized GC cycle, ready for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub timestamp_raw: String,
    pub raw_lines: Vec<String>,
    pub actions: Vec<String>,
    pub action: String,
    pub before_bytes: f64,
    pub after_bytes: f64,
    pub total_bytes: f64,
    pub total_duration: f64,
    pub duration: f64,
    pub class: GcClass,
    pub mixed_long: bool,
    pub color: String,
    pub radius: f64,
    pub priority: u8,
    // Filled by the rate pass
    pub allocated_bytes: f64,
    pub reclaimed_bytes: f64,
    pub elapsed_ms: f64,
    pub instant_alloc_rate: f64,
    pub instant_gc_rate: f64,
}

/// Whole-run byte flow statistics for the GC stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub mean_alloc_rate: f64,
    pub mean_gc_rate: f64,
    pub mean_interval_ms: f64,
    pub total_allocated: f64,
    pub total_reclaimed: f64,
    pub total_time_ms: f64,
}

/// One HTTP request from an access log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub timestamp_raw: String,
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub size: u64,
    /// Microseconds
    pub latency: u64,
    pub original_line: String,
    pub rps: f64,
    pub bps: f64,
    pub color: String,
    pub rank: i32,
}

impl AccessEvent {
    /// Ranking key shared by every request to the same endpoint.
    pub fn request_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// Top-N request legend entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub count: usize,
}

/// Sub-metrics packed into the processing time tuple of flight search services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub gds: String,
    pub carrier_connect_execute_time: i64,
    pub hkn_agt_time: i64,
}

/// A service invocation assembled from its START and END lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCallEvent {
    /// Start time, or the end time when no START was seen
    pub timestamp: DateTime<Utc>,
    /// `None` when no START was seen
    pub timestamp_raw: Option<String>,
    pub end_time: DateTime<Utc>,
    pub end_time_raw: String,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
    pub thread_id: String,
    pub processing_time: i64,
    pub last_goods_count: Option<u64>,
    pub hkn_agt_times: Vec<i64>,
    pub metrics: Option<ServiceMetrics>,
    pub logs: Vec<String>,
    pub proc_rate: f64,
    pub goods_rate: f64,
}

impl ServiceCallEvent {
    /// Marker size grows with processing time and goods volume.
    pub fn dot_radius(&self) -> u8 {
        let time = self.processing_time;
        let count = self.last_goods_count.unwrap_or(0);
        if time >= 30_000 || count >= 1000 {
            5
        } else if time >= 10_000 {
            4
        } else if time >= 1000 {
            3
        } else {
            2
        }
    }
}
