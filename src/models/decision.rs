//! Scheduling decision records.
//!
//! A [`TickRecord`] captures one batch decision: which jobs were chosen, in
//! what order they execute, where and when each one runs, and what it cost.
//! Records are produced by the simulation loop and consumed read-only by
//! metrics and reporting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{JobId, JobType};

/// One job's placement within a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned job.
    pub job_id: JobId,
    /// Job type (denormalized for occupancy reporting).
    pub job_type: JobType,
    /// Channel the job runs on.
    pub channel: usize,
    /// Execution start (s).
    pub start: f64,
    /// Execution end (s).
    pub end: f64,
    /// Cost evaluated at `start`.
    pub cost: f64,
    /// Whether the job started at or past its deadline.
    pub dropped: bool,
}

/// Output of one scheduling decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    /// Simulated time of the decision (s).
    pub time: f64,
    /// Assignments in execution order.
    pub assignments: Vec<Assignment>,
    /// Total batch cost.
    pub cost: f64,
    /// Number of dropped jobs in the batch.
    pub num_dropped: usize,
    /// Channel availability after the decision.
    pub channel_availability: Vec<f64>,
    /// Wall-clock time spent inside the assignment policy.
    pub policy_runtime: Duration,
}

impl Assignment {
    /// Execution duration (end - start).
    #[inline]
    /// Execution time (s).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl TickRecord {
    /// Job ids in execution order.
    pub fn execution_order(&self) -> Vec<JobId> {
        self.assignments.iter().map(|a| a.job_id).collect()
    }

    /// Finds the assignment for a job.
    pub fn assignment_for_job(&self, job_id: JobId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.job_id == job_id)
    }

    /// Latest execution end in this decision (the decision time if empty).
    pub fn makespan(&self) -> f64 {
        self.assignments
            .iter()
            .map(|a| a.end)
            .fold(self.time, f64::max)
    }

    /// Busy time per channel index.
    pub fn busy_time_by_channel(&self) -> HashMap<usize, f64> {
        let mut busy = HashMap::new();
        for a in &self.assignments {
            *busy.entry(a.channel).or_insert(0.0) += a.duration();
        }
        busy
    }

    /// Number of jobs in the batch.
    pub fn batch_len(&self) -> usize {
        self.assignments.len()
    }
}
