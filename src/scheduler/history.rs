//! Run history.
//!
//! Append-only log of a simulation: one [`TickRecord`] per decision, counts
//! of skipped ticks, and every job's execution start timestamps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{JobId, TickRecord};

/// Everything the loop produced, for read-only consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    /// Clock value at which the history begins (s).
    #[serde(default)]
    pub start: f64,
    /// One record per decision, in time order.
    pub records: Vec<TickRecord>,
    /// Ticks skipped because every channel was still busy.
    pub skipped_busy: usize,
    /// Ticks skipped because fewer than `N` jobs were eligible.
    pub skipped_starved: usize,
    /// Execution start timestamps per job, in time order.
    pub revisits: HashMap<JobId, Vec<f64>>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty history beginning at `start`.
    pub fn starting_at(start: f64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    /// Number of decisions made.
    pub fn decisions(&self) -> usize {
        self.records.len()
    }

    /// Ticks on which no decision was made.
    pub fn skipped_ticks(&self) -> usize {
        self.skipped_busy + self.skipped_starved
    }

    /// Total cost over all decisions.
    pub fn total_cost(&self) -> f64 {
        self.records.iter().map(|r| r.cost).sum()
    }

    /// Total drops over all decisions.
    pub fn total_dropped(&self) -> usize {
        self.records.iter().map(|r| r.num_dropped).sum()
    }

    /// Total jobs executed.
    pub fn total_executions(&self) -> usize {
        self.records.iter().map(|r| r.batch_len()).sum()
    }

    /// Wall-clock time spent inside the policy.
    pub fn total_policy_runtime(&self) -> Duration {
        self.records.iter().map(|r| r.policy_runtime).sum()
    }

    /// Execution start timestamps of a job (empty if never executed).
    pub fn revisit_times(&self, job_id: JobId) -> &[f64] {
        self.revisits.get(&job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mean interval between successive executions of a job.
    ///
    /// `0` for a job executed fewer than two times.
    pub fn mean_revisit_interval(&self, job_id: JobId) -> f64 {
        let times = self.revisit_times(job_id);
        match (times.first(), times.last()) {
            (Some(first), Some(last)) if times.len() >= 2 => {
                (last - first) / (times.len() - 1) as f64
            }
            _ => 0.0,
        }
    }

    pub(crate) fn record(&mut self, record: TickRecord) {
        for a in &record.assignments {
            self.revisits.entry(a.job_id).or_default().push(a.start);
        }
        self.records.push(record);
    }
}
