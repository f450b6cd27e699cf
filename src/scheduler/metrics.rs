//! Run quality metrics.
//!
//! Derived after the fact from a [`RunHistory`]; never fed back into the
//! loop.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Mean cost | Total cost / decisions |
//! | Drop rate | Dropped executions / all executions |
//! | Mean revisit interval | Mean gap between successive starts of a job (0 below two visits) |
//! | Revisit ratio | Mean revisit interval / desired interval `1/slope` |
//! | Occupancy | Busy time per job type / total channel capacity |
//! | Utilization | Busy time per channel / elapsed time |
//!
//! Busy time only counts the part of each execution inside the history
//! window `[history.start, history.start + elapsed]`.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::RunHistory;
use crate::models::{Job, JobId};

/// Summary indicators of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Decisions made.
    pub decisions: usize,
    /// Ticks skipped (busy channels or too few eligible jobs).
    pub skipped_ticks: usize,
    /// Sum of batch costs.
    pub total_cost: f64,
    /// Mean batch cost per decision.
    pub mean_cost: f64,
    /// Executions started at or after their deadline.
    pub total_dropped: usize,
    /// Fraction of executions dropped (0.0..1.0).
    pub drop_rate: f64,
    /// Mean revisit interval per job (s).
    pub mean_revisit_interval: HashMap<JobId, f64>,
    /// Achieved / desired revisit interval per job; 0 when undefined.
    pub revisit_ratio: HashMap<JobId, f64>,
    /// Fraction of total channel capacity spent on each job type.
    pub occupancy_by_type: HashMap<String, f64>,
    /// Busy fraction per channel (0.0..1.0).
    pub utilization_by_channel: Vec<f64>,
    /// Mean of `utilization_by_channel`.
    pub avg_utilization: f64,
    /// Wall-clock time spent inside the policy.
    pub policy_runtime: Duration,
}

impl RunMetrics {
    /// Computes metrics from a history.
    ///
    /// # Arguments
    /// * `history` - The run's decision log.
    /// * `jobs` - The population (for slopes).
    /// * `channel_count` - Number of channels `K`.
    /// * `elapsed` - Simulated time covered by the history (s).
    pub fn calculate(history: &RunHistory, jobs: &[Job], channel_count: usize, elapsed: f64) -> Self {
        let decisions = history.decisions();
        let executions = history.total_executions();
        let total_cost = history.total_cost();
        let total_dropped = history.total_dropped();

        let mean_cost = if decisions == 0 {
            0.0
        } else {
            total_cost / decisions as f64
        };
        let drop_rate = if executions == 0 {
            0.0
        } else {
            total_dropped as f64 / executions as f64
        };

        let mut mean_revisit_interval = HashMap::new();
        let mut revisit_ratio = HashMap::new();
        for job in jobs {
            let interval = history.mean_revisit_interval(job.id);
            let desired = job.desired_revisit_interval();
            let ratio = if interval > 0.0 && desired.is_finite() && desired > 0.0 {
                interval / desired
            } else {
                0.0
            };
            mean_revisit_interval.insert(job.id, interval);
            revisit_ratio.insert(job.id, ratio);
        }

        let window_end = history.start + elapsed;
        let mut busy_by_channel = vec![0.0; channel_count];
        let mut busy_by_type: HashMap<String, f64> = HashMap::new();
        for record in &history.records {
            for a in &record.assignments {
                let span = (a.end.min(window_end) - a.start.max(history.start)).max(0.0);
                if let Some(busy) = busy_by_channel.get_mut(a.channel) {
                    *busy += span;
                }
                *busy_by_type.entry(a.job_type.label()).or_insert(0.0) += span;
            }
        }

        let capacity = elapsed * channel_count as f64;
        let occupancy_by_type = busy_by_type
            .into_iter()
            .map(|(label, busy)| {
                let fraction = if capacity > 0.0 { busy / capacity } else { 0.0 };
                (label, fraction)
            })
            .collect();

        let utilization_by_channel: Vec<f64> = busy_by_channel
            .iter()
            .map(|&busy| {
                if elapsed > 0.0 {
                    (busy / elapsed).min(1.0)
                } else {
                    0.0
                }
            })
            .collect();
        let avg_utilization = if utilization_by_channel.is_empty() {
            0.0
        } else {
            utilization_by_channel.iter().sum::<f64>() / utilization_by_channel.len() as f64
        };

        Self {
            decisions,
            skipped_ticks: history.skipped_ticks(),
            total_cost,
            mean_cost,
            total_dropped,
            drop_rate,
            mean_revisit_interval,
            revisit_ratio,
            occupancy_by_type,
            utilization_by_channel,
            avg_utilization,
            policy_runtime: history.total_policy_runtime(),
        }
    }

    /// Whether the run meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_drop_rate: f64, min_utilization: f64) -> bool {
        self.drop_rate <= max_drop_rate && self.avg_utilization >= min_utilization
    }
}
