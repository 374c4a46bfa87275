use anyhow::Result;
use g1lens_core::{format_bytes, format_in_offset, Analysis, ExtensionOutput, GcClass, GcTimeline};
use serde::Serialize;
use std::fmt::Write;

const TOP_ROWS: usize = 5;

#[derive(Serialize)]
struct JsonReport<'a> {
    gc: &'a GcTimeline,
    truncated: bool,
    lines_scanned: usize,
    total_lines: usize,
    extension: Option<&'a str>,
    extension_output: Option<&'a ExtensionOutput>,
}

/// Pretty JSON with the GC timeline and the selected extension's output.
pub fn render_json(analysis: &Analysis, extension: Option<&str>) -> Result<String> {
    let report = JsonReport {
        gc: &analysis.gc,
        truncated: analysis.truncated,
        lines_scanned: analysis.lines_scanned,
        total_lines: analysis.total_lines,
        extension,
        extension_output: extension.and_then(|name| analysis.extension(name)),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Human readable overview of a run.
pub fn render_summary(analysis: &Analysis, extension: Option<&str>) -> String {
    let mut out = String::new();
    let gc = &analysis.gc;
    let offset = gc.detected_timezone.as_deref();

    let _ = writeln!(
        out,
        "🗑  GC events: {}  • Lines scanned: {}/{}  • Timezone: {}",
        gc.events.len(),
        analysis.lines_scanned,
        analysis.total_lines,
        offset.unwrap_or("unknown")
    );
    if analysis.truncated {
        let _ = writeln!(out, "⚠️  Event limit reached, later cycles were not parsed");
    }

    if let (Some(first), Some(last)) = (gc.events.first(), gc.events.last()) {
        let _ = writeln!(
            out,
            "• Range: {} → {}",
            format_in_offset(&first.timestamp, offset),
            format_in_offset(&last.timestamp, offset)
        );

        let counts: Vec<String> = [
            GcClass::Full,
            GcClass::Concurrent,
            GcClass::LongPause,
            GcClass::Mixed,
            GcClass::Normal,
        ]
        .into_iter()
        .map(|class| {
            let count = gc.events.iter().filter(|e| e.class == class).count();
            format!("{}: {}", class.label(), count)
        })
        .collect();
        let _ = writeln!(out, "• {}", counts.join("  "));
    }

    if let Some(stats) = &gc.rate_stats {
        let _ = writeln!(
            out,
            "• Allocation: {:.3} GB/s ({} total)  • Reclaim: {:.3} GB/s ({} total)  • Mean interval: {:.1} ms",
            stats.mean_alloc_rate,
            format_bytes(stats.total_allocated),
            stats.mean_gc_rate,
            format_bytes(stats.total_reclaimed),
            stats.mean_interval_ms
        );
    }

    let mut longest: Vec<_> = gc.events.iter().collect();
    longest.sort_by(|a, b| b.duration.total_cmp(&a.duration));
    if !longest.is_empty() {
        let _ = writeln!(out, "\n⏱  Longest pauses:");
        for event in longest.iter().take(TOP_ROWS) {
            let _ = writeln!(
                out,
                "  GC({}) {} {:.2} ms [{}] {} → {}",
                event.id,
                format_in_offset(&event.timestamp, offset),
                event.duration,
                event.class.label(),
                format_bytes(event.before_bytes),
                format_bytes(event.after_bytes)
            );
        }
    }

    if let Some(name) = extension {
        match analysis.extension(name) {
            Some(output) => render_extension(&mut out, name, output, offset),
            None => {
                let _ = writeln!(out, "\nExtension {name}: no output");
            }
        }
    }

    out
}

fn render_extension(out: &mut String, name: &str, output: &ExtensionOutput, offset: Option<&str>) {
    let _ = writeln!(out, "\n🔌 {}: {} events", name, output.event_count());

    if let Some(access) = output.access() {
        let _ = writeln!(out, "  Requests: {}", access.events.len());
        for entry in &access.legend {
            let _ = writeln!(out, "  {} {} ({})", entry.color, entry.label, entry.count);
        }
        let peak = access.events.iter().max_by(|a, b| a.rps.total_cmp(&b.rps));
        if let Some(peak) = peak {
            let _ = writeln!(
                out,
                "  Peak: {:.1} req/s at {}",
                peak.rps,
                format_in_offset(&peak.timestamp, offset)
            );
        }
    }

    if let Some(service) = output.service() {
        let _ = writeln!(out, "  Service calls: {}", service.events.len());
        let mut slowest: Vec<_> = service.events.iter().collect();
        slowest.sort_by(|a, b| b.processing_time.cmp(&a.processing_time));
        for call in slowest.iter().take(TOP_ROWS) {
            let method = call.method_name.as_deref().unwrap_or("?");
            let class = call.class_name.as_deref().unwrap_or("?");
            let mut line = format!(
                "  {} [{}] {}#{} {} ms",
                format_in_offset(&call.timestamp, offset),
                call.thread_id,
                class,
                method,
                call.processing_time
            );
            if let Some(goods) = call.last_goods_count {
                let _ = write!(line, ", {goods} goods");
            }
            if let Some(metrics) = &call.metrics {
                let _ = write!(
                    line,
                    ", {} connect {} ms, agent {} ms",
                    metrics.gds, metrics.carrier_connect_execute_time, metrics.hkn_agt_time
                );
            }
            let _ = writeln!(out, "{line}");
        }
    }
}
