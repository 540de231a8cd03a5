use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::IterationResult;

/// Where in the per-iteration protocol an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStage {
    IterationStarted { index: u32 },
    IterationCompleted { index: u32 },
    IterationFailed { index: u32 },
    Waiting { remaining_secs: u64 },
    Averaging,
    Finished,
}

/// Progress notification delivered to observers while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub completed_count: u32,
    pub total_count: u32,
    pub message: String,
    pub stage: ProgressStage,
    /// Set on iteration completion or failure.
    pub iteration: Option<IterationResult>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        completed_count: u32,
        total_count: u32,
        stage: ProgressStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            completed_count,
            total_count,
            message: message.into(),
            stage,
            iteration: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_iteration(mut self, iteration: IterationResult) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Completion ratio in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.completed_count as f64 / self.total_count as f64).clamp(0.0, 1.0)
    }
}
