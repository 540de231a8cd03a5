//! Pure reductions over provider reports: metric extraction, averaging, and text rendering.

pub mod average;
pub mod extract;
pub mod report;

pub use average::{average_device, compute_averages};
pub use extract::{ensure_report_shape, extract_metrics, parse_display_value};
pub use report::{format_metric, render_iteration, render_run_report};
