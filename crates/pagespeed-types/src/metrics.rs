use std::fmt;

use serde::{Deserialize, Serialize};

/// Measurement profile requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Desktop,
    Mobile,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Desktop, Strategy::Mobile];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Desktop => "desktop",
            Strategy::Mobile => "mobile",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Desktop => "Desktop",
            Strategy::Mobile => "Mobile",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display unit attached to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Seconds,
    Milliseconds,
    Ratio,
    Score,
}

/// The six metrics collected per measurement, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    FirstContentfulPaint,
    LargestContentfulPaint,
    CumulativeLayoutShift,
    TotalBlockingTime,
    SpeedIndex,
    PerformanceScore,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::FirstContentfulPaint,
        MetricKind::LargestContentfulPaint,
        MetricKind::CumulativeLayoutShift,
        MetricKind::TotalBlockingTime,
        MetricKind::SpeedIndex,
        MetricKind::PerformanceScore,
    ];

    /// Provider audit id, `None` for the category-derived score.
    pub fn audit_id(self) -> Option<&'static str> {
        match self {
            MetricKind::FirstContentfulPaint => Some("first-contentful-paint"),
            MetricKind::LargestContentfulPaint => Some("largest-contentful-paint"),
            MetricKind::CumulativeLayoutShift => Some("cumulative-layout-shift"),
            MetricKind::TotalBlockingTime => Some("total-blocking-time"),
            MetricKind::SpeedIndex => Some("speed-index"),
            MetricKind::PerformanceScore => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::FirstContentfulPaint => "FCP",
            MetricKind::LargestContentfulPaint => "LCP",
            MetricKind::CumulativeLayoutShift => "CLS",
            MetricKind::TotalBlockingTime => "TBT",
            MetricKind::SpeedIndex => "Speed Index",
            MetricKind::PerformanceScore => "Performance Score",
        }
    }

    pub fn unit(self) -> MetricUnit {
        match self {
            MetricKind::FirstContentfulPaint
            | MetricKind::LargestContentfulPaint
            | MetricKind::SpeedIndex => MetricUnit::Seconds,
            MetricKind::TotalBlockingTime => MetricUnit::Milliseconds,
            MetricKind::CumulativeLayoutShift => MetricUnit::Ratio,
            MetricKind::PerformanceScore => MetricUnit::Score,
        }
    }
}

/// Metrics extracted from one provider report. Every field is independently optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub fcp: Option<f64>,
    pub lcp: Option<f64>,
    pub cls: Option<f64>,
    pub tbt: Option<f64>,
    pub speed_index: Option<f64>,
    /// 0-100.
    pub performance_score: Option<f64>,
}

impl MetricSet {
    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::FirstContentfulPaint => self.fcp,
            MetricKind::LargestContentfulPaint => self.lcp,
            MetricKind::CumulativeLayoutShift => self.cls,
            MetricKind::TotalBlockingTime => self.tbt,
            MetricKind::SpeedIndex => self.speed_index,
            MetricKind::PerformanceScore => self.performance_score,
        }
    }

    /// Builds a set by evaluating `f` once per metric.
    pub fn from_fn(mut f: impl FnMut(MetricKind) -> Option<f64>) -> Self {
        Self {
            fcp: f(MetricKind::FirstContentfulPaint),
            lcp: f(MetricKind::LargestContentfulPaint),
            cls: f(MetricKind::CumulativeLayoutShift),
            tbt: f(MetricKind::TotalBlockingTime),
            speed_index: f(MetricKind::SpeedIndex),
            performance_score: f(MetricKind::PerformanceScore),
        }
    }
}
