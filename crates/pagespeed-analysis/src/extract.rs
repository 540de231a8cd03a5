use pagespeed_types::{
    metrics::MetricSet,
    BatchError, Result,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Checks the two required sections and returns the audit map.
///
/// A report without `lighthouseResult` or `lighthouseResult.audits` is unusable;
/// everything below those sections is optional.
pub fn ensure_report_shape(report: &Value) -> Result<&Map<String, Value>> {
    let lighthouse = report
        .get("lighthouseResult")
        .filter(|section| section.is_object())
        .ok_or_else(|| BatchError::MalformedReport("missing lighthouseResult section".into()))?;
    lighthouse
        .get("audits")
        .and_then(Value::as_object)
        .ok_or_else(|| BatchError::MalformedReport("missing lighthouseResult.audits section".into()))
}

/// Reads the fixed metric set out of a provider report.
pub fn extract_metrics(report: &Value) -> Result<MetricSet> {
    let audits = ensure_report_shape(report)?;
    let score = performance_score(report);

    Ok(MetricSet::from_fn(|kind| match kind.audit_id() {
        Some(id) => audit_value(audits, id),
        None => score,
    }))
}

fn audit_value(audits: &Map<String, Value>, id: &str) -> Option<f64> {
    let display = audits
        .get(id)
        .and_then(|audit| audit.get("displayValue"))
        .and_then(Value::as_str);
    let Some(raw) = display else {
        debug!(audit = id, "audit missing or without display value");
        return None;
    };
    let parsed = parse_display_value(raw);
    if parsed.is_none() {
        debug!(audit = id, value = %raw, "unparsable audit display value");
    }
    parsed
}

fn performance_score(report: &Value) -> Option<f64> {
    report
        .pointer("/lighthouseResult/categories/performance/score")
        .and_then(Value::as_f64)
        .filter(|score| score.is_finite())
        .map(|score| score * 100.0)
}

/// Parses a display string such as `"1.2 s"`, `"1,2 s"` or `"1,230 ms"`.
///
/// Everything but digits and separators is dropped. With both `.` and `,`
/// present the rightmost one is the decimal point. A lone comma is a thousands
/// separator only when followed by exactly three digits and preceded by a
/// group that does not start with `0`; otherwise it is a decimal comma.
/// A lone dot is always the decimal point, so only en-style grouping
/// (`1,230`) is recognised; `1.230` reads as 1.23.
pub fn parse_display_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (grouping, decimal) = if dot > comma { (',', '.') } else { ('.', ',') };
            cleaned
                .chars()
                .filter(|c| *c != grouping)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (None, Some(comma)) => {
            if comma_is_grouping(&cleaned, comma) {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn comma_is_grouping(cleaned: &str, last_comma: usize) -> bool {
    if cleaned.matches(',').count() > 1 {
        return true;
    }
    let head = &cleaned[..last_comma];
    let tail = &cleaned[last_comma + 1..];
    tail.len() == 3 && !head.is_empty() && !head.starts_with('0')
}
