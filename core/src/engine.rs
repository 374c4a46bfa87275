use crate::config::Config;
use crate::error::AnalysisError;
use crate::extension::{ExtensionOutput, ExtensionRegistry};
use crate::gc::{finalize, parse_batch_with, GcRecordMap, GcTimeline};
use crate::timestamp::LogContext;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Output of one extension after a run
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionReport {
    pub name: String,
    pub output: ExtensionOutput,
}

/// Everything produced by one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub gc: GcTimeline,
    /// The GC event cap was reached and parsing stopped early
    pub truncated: bool,
    pub lines_scanned: usize,
    pub total_lines: usize,
    pub extensions: Vec<ExtensionReport>,
}

impl Analysis {
    pub fn extension(&self, name: &str) -> Option<&ExtensionOutput> {
        self.extensions
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.output)
    }
}

/// Drives the GC parser and every registered extension over a log text.
#[derive(Debug)]
pub struct Analyzer {
    config: Config,
    registry: ExtensionRegistry,
    published: Option<Analysis>,
}

impl Analyzer {
    /// Analyzer with the default extension set.
    pub fn new(config: Config) -> Self {
        let registry = ExtensionRegistry::with_defaults(&config);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: Config, registry: ExtensionRegistry) -> Self {
        Self {
            config,
            registry,
            published: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration used by later runs.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// The last successful run, if any
    pub fn latest(&self) -> Option<&Analysis> {
        self.published.as_ref()
    }

    /// Read a log file and analyze it.
    pub async fn analyze_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&Analysis> {
        let text = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read log file {:?}", path.as_ref()))?;
        self.analyze(&text).await
    }

    /// Run a full analysis over `text`.
    ///
    /// Lines are scanned in batches of `gc.batch_size` completed GC events, yielding to
    /// the runtime between batches, until the input ends or `gc.global_limit` events
    /// have been accepted. On error the previously published analysis is left in place.
    pub async fn analyze(&mut self, text: &str) -> Result<&Analysis> {
        self.config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig {
                reason: format!("{e:#}"),
            })?;

        let lines = split_lines(text);
        let limit = self.config.gc.global_limit;
        let batch_size = self.config.gc.batch_size;

        for extension in self.registry.iter_mut() {
            extension.reset();
        }
        tracing::info!(
            lines = lines.len(),
            extensions = self.registry.len(),
            "starting analysis"
        );

        let mut records = GcRecordMap::new();
        let mut ctx = LogContext::new();
        let mut next_line = 0;
        let mut total = 0;
        let mut batches = 0;

        while next_line < lines.len() && total < limit {
            let max_events = batch_size.min(limit - total);
            let registry = &mut self.registry;
            let progress = parse_batch_with(
                &lines,
                next_line,
                max_events,
                &mut records,
                &mut ctx,
                |line, ctx| {
                    for extension in registry.iter_mut() {
                        extension.parse(line, ctx);
                    }
                },
            );

            next_line = progress.next_line;
            total += progress.events_parsed;
            batches += 1;
            tracing::debug!(
                batch = batches,
                events = progress.events_parsed,
                total,
                line = next_line,
                "parsed batch"
            );

            tokio::task::yield_now().await;
        }

        let truncated = total >= limit;
        if truncated {
            tracing::warn!(limit, line = next_line, "GC event limit reached, stopping early");
        }

        let gc = finalize(records, &self.config.gc, &mut ctx);

        for extension in self.registry.iter_mut() {
            extension.finish(&ctx);
        }

        let extensions = self
            .registry
            .iter()
            .map(|extension| ExtensionReport {
                name: extension.name().to_string(),
                output: extension.output(),
            })
            .collect();

        tracing::info!(
            gc_events = gc.events.len(),
            truncated,
            timezone = ?gc.detected_timezone,
            "analysis complete"
        );

        Ok(self.published.insert(Analysis {
            gc,
            truncated,
            lines_scanned: next_line,
            total_lines: lines.len(),
            extensions,
        }))
    }
}

/// Split on `\n`, dropping a `\r` before it.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}
