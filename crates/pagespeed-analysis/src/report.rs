use std::fmt::Write;

use chrono::NaiveDate;
use pagespeed_types::{
    metrics::{MetricKind, MetricSet, MetricUnit, Strategy},
    run::{BatchRun, IterationResult},
};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_VALID_RESULTS: &str = "No valid results were obtained.";

/// Renders a single value. Missing or non-finite values render as `N/A`.
pub fn format_metric(value: Option<f64>, unit: MetricUnit) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };
    match unit {
        MetricUnit::Seconds if value < 10.0 => format!("{:.1}s", round_to(value, 1)),
        MetricUnit::Seconds => format!("{}s", round(value)),
        MetricUnit::Milliseconds => format!("{}ms", round(value)),
        MetricUnit::Ratio => format!("{:.3}", round_to(value, 3)),
        MetricUnit::Score => round(value).to_string(),
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

// Halves round away from zero before fixed-precision formatting.
fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

fn write_metric_lines(out: &mut String, metrics: &MetricSet, indent: &str) {
    for kind in MetricKind::ALL {
        let _ = writeln!(
            out,
            "{indent}{}: {}",
            kind.label(),
            format_metric(metrics.get(kind), kind.unit())
        );
    }
}

fn write_device_block(out: &mut String, strategy: Strategy, metrics: Option<&MetricSet>) {
    let _ = writeln!(out, "{}:", strategy.label());
    match metrics {
        Some(metrics) => write_metric_lines(out, metrics, "  "),
        None => {
            let _ = writeln!(out, "  No valid data");
        }
    }
}

/// Text block for one iteration, as shown while a batch is still running.
pub fn render_iteration(result: &IterationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Test {} - {}",
        result.index,
        result.timestamp.format("%H:%M:%S")
    );
    if let Some(error) = &result.error {
        let _ = writeln!(out, "  Error: {error}");
        return out;
    }
    for strategy in Strategy::ALL {
        match result.metrics(strategy) {
            Some(metrics) => {
                let _ = writeln!(out, "  {}:", strategy.label());
                write_metric_lines(&mut out, metrics, "    ");
            }
            None => {
                let _ = writeln!(out, "  {}: Error", strategy.label());
            }
        }
    }
    out
}

/// Whole-run report suitable for pasting elsewhere.
pub fn render_run_report(run: &BatchRun, date: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PageSpeed Insights Batch Test Results");
    let _ = writeln!(out, "URL: {}", run.target_url);
    let _ = writeln!(out, "Tests: {}", run.requested_count);
    let _ = writeln!(out, "Date: {}", date.format("%Y-%m-%d"));
    let _ = writeln!(out);

    let Some(averages) = run.averages.as_ref() else {
        let _ = writeln!(out, "{NO_VALID_RESULTS}");
        let _ = writeln!(out, "Valid results: 0 of {}", run.results.len());
        return out;
    };

    let _ = writeln!(out, "AVERAGE RESULTS:");
    for (position, strategy) in Strategy::ALL.into_iter().enumerate() {
        if position > 0 {
            let _ = writeln!(out);
        }
        write_device_block(&mut out, strategy, averages.get(strategy));
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Valid results: {} of {}",
        run.usable_count(),
        run.results.len()
    );
    out
}
