pub mod logging;
pub mod report;

use anyhow::Result;
use g1lens_core::{Analyzer, Config};
use std::path::Path;

/// Analyze `path` and render the chosen extension as a summary or as JSON.
pub async fn analyze_to_string(
    config: Config,
    path: &Path,
    extension: Option<&str>,
    json: bool,
) -> Result<String> {
    let mut analyzer = Analyzer::new(config);
    let selected = analyzer.registry().select(extension)?.map(str::to_string);
    let analysis = analyzer.analyze_file(path).await?;

    if json {
        return report::render_json(analysis, selected.as_deref());
    }
    Ok(report::render_summary(analysis, selected.as_deref()))
}
