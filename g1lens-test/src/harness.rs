use anyhow::{Context, Result};
use g1lens_core::{Analysis, Analyzer, Config};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

/// Drives analyses in-process, or through the CLI entry point with a temporary log file.
pub struct TestRun {
    config: Config,
    analyzer: Analyzer,
}

impl TestRun {
    pub fn new(config: Config) -> Self {
        Self {
            analyzer: Analyzer::new(config.clone()),
            config,
        }
    }

    pub async fn analyze(&mut self, text: &str) -> Result<&Analysis> {
        self.analyzer.analyze(text).await
    }

    pub fn analyzer_mut(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }

    /// Write `text` to a temporary file and render it the way `g1lens analyze` does.
    pub async fn render(&self, text: &str, extension: Option<&str>, json: bool) -> Result<String> {
        let path = temp_log_path();
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("failed to write {:?}", path))?;

        let result =
            g1lens::analyze_to_string(self.config.clone(), &path, extension, json).await;
        let _ = tokio::fs::remove_file(&path).await;
        result
    }

    pub async fn render_json(&self, text: &str, extension: Option<&str>) -> Result<serde_json::Value> {
        let rendered = self.render(text, extension, true).await?;
        serde_json::from_str(&rendered).context("CLI output is not JSON")
    }
}

fn temp_log_path() -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("g1lens-test-{}-{n}.log", std::process::id()))
}
