use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{MetricSet, Strategy};

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Idle
    }
}

/// Outcome of one paired desktop + mobile measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    /// 1-based.
    pub index: u32,
    pub timestamp: DateTime<Utc>,
    pub desktop: Option<MetricSet>,
    pub mobile: Option<MetricSet>,
    pub error: Option<String>,
}

impl IterationResult {
    pub fn success(index: u32, timestamp: DateTime<Utc>, desktop: MetricSet, mobile: MetricSet) -> Self {
        Self {
            index,
            timestamp,
            desktop: Some(desktop),
            mobile: Some(mobile),
            error: None,
        }
    }

    pub fn failure(index: u32, timestamp: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            index,
            timestamp,
            desktop: None,
            mobile: None,
            error: Some(error.into()),
        }
    }

    /// Both device sets present and no error recorded.
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && self.desktop.is_some() && self.mobile.is_some()
    }

    pub fn metrics(&self, strategy: Strategy) -> Option<&MetricSet> {
        match strategy {
            Strategy::Desktop => self.desktop.as_ref(),
            Strategy::Mobile => self.mobile.as_ref(),
        }
    }
}

/// Per-device means over the usable iterations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub desktop: Option<MetricSet>,
    pub mobile: Option<MetricSet>,
}

impl Averages {
    pub fn get(&self, strategy: Strategy) -> Option<&MetricSet> {
        match strategy {
            Strategy::Desktop => self.desktop.as_ref(),
            Strategy::Mobile => self.mobile.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }
}

/// A finished batch: the inputs, every attempted iteration in order, and the derived averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub run_id: Uuid,
    pub target_url: String,
    pub requested_count: u32,
    pub results: Vec<IterationResult>,
    /// `None` when no iteration produced usable data.
    pub averages: Option<Averages>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchRun {
    pub fn new(target_url: impl Into<String>, requested_count: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target_url: target_url.into(),
            requested_count,
            results: Vec::with_capacity(requested_count as usize),
            averages: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn completed_count(&self) -> u32 {
        self.results.len() as u32
    }

    pub fn usable_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_usable()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}
