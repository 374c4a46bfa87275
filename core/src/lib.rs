pub mod access;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod extension;
pub mod gc;
pub mod rate;
pub mod service;
pub mod size;
pub mod timeline;
pub mod timestamp;

pub use access::AccessLogParser;
pub use config::Config;
pub use engine::{Analysis, Analyzer, ExtensionReport};
pub use error::AnalysisError;
pub use event::{AccessEvent, GcClass, GcEvent, LegendEntry, RateStats, ServiceCallEvent, ServiceMetrics};
pub use extension::{ExtensionOutput, ExtensionRegistry, LogExtension, ServiceAccessLog};
pub use gc::GcTimeline;
pub use service::ServiceLogParser;
pub use size::{format_bytes, parse_size};
pub use timestamp::{format_in_offset, LogContext};
