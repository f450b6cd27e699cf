//! Job model.
//!
//! A job is a periodic unit of sensor work (a search sweep or a target track
//! dwell). It never leaves the simulation: each execution resets its wait
//! clock and it queues up again.
//!
//! # Time Representation
//! All times are in seconds of simulated time relative to the run origin.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::cost::CostFunction;

/// Stable job identity, unique for the lifetime of a simulation.
pub type JobId = u64;

/// A schedulable, periodically recurring job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier. Never reused.
    pub id: JobId,
    /// Urgency growth rate (cost per second of waiting). Non-negative.
    #[serde(deserialize_with = "deserialize_slope")]
    pub slope: f64,
    /// Wait-clock origin: when the job last became eligible (s).
    pub start_time: f64,
    /// Optional hard deadline (relative to `start_time`) with its flat penalty.
    pub drop: Option<DropPolicy>,
    /// Execution time once scheduled (s). Strictly positive.
    pub duration: f64,
    /// Reporting classification; never used for scheduling decisions.
    pub job_type: JobType,
    /// Derived priority, recomputed from `slope`, `start_time` and the clock every tick.
    #[serde(skip)]
    pub priority: f64,
    /// Whether the job is waiting or was just serviced.
    pub status: JobStatus,
}

/// Hard deadline and the one-time penalty for missing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropPolicy {
    /// Deadline offset from the wait-clock origin (s).
    pub drop_time: f64,
    /// Flat penalty incurred when the job starts at or after the deadline.
    pub drop_cost: f64,
}

/// Job classification for occupancy reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    /// Volume search sweep.
    Search,
    /// Target track at the given tier (lower = more important by convention).
    Track(u8),
    /// Domain-specific type.
    Custom(String),
}

/// Scheduling status of a job inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting for a channel; eligible for batch selection.
    #[default]
    Pending,
    /// Serviced by a recent decision and still executing; sorted last and not eligible.
    ActiveThisTick,
}

impl Job {
    /// Creates a pending search job with zero slope, released at t=0.
    pub fn new(id: JobId, duration: f64) -> Self {
        Self {
            id,
            slope: 0.0,
            start_time: 0.0,
            drop: None,
            duration,
            job_type: JobType::Search,
            priority: 0.0,
            status: JobStatus::Pending,
        }
    }

    /// Sets the urgency slope.
    pub fn with_slope(mut self, slope: f64) -> Self {
        self.slope = slope;
        self
    }

    /// Sets the wait-clock origin.
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets a hard deadline (`drop_time` after the wait-clock origin) and its penalty.
    pub fn with_drop(mut self, drop_time: f64, drop_cost: f64) -> Self {
        self.drop = Some(DropPolicy {
            drop_time,
            drop_cost,
        });
        self
    }

    /// Sets the reporting type.
    pub fn with_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    /// The job's cost function.
    pub fn cost_function(&self) -> CostFunction {
        match self.drop {
            None => CostFunction::Linear { slope: self.slope },
            Some(drop) => CostFunction::LinearDrop {
                slope: self.slope,
                drop_time: drop.drop_time,
                drop_cost: drop.drop_cost,
            },
        }
    }

    /// Cost if the job were executed at `now`.
    pub fn cost_at(&self, now: f64) -> f64 {
        self.cost_function().evaluate(now, self.start_time)
    }

    /// Absolute deadline, if any.
    pub fn deadline(&self) -> Option<f64> {
        self.drop.map(|d| self.start_time + d.drop_time)
    }

    /// Desired revisit interval: the inverse of the urgency slope.
    ///
    /// Infinite for a zero slope.
    pub fn desired_revisit_interval(&self) -> f64 {
        if self.slope > 0.0 {
            1.0 / self.slope
        } else {
            f64::INFINITY
        }
    }

    /// Whether the job can be offered to a batch.
    pub fn is_eligible(&self) -> bool {
        self.priority.is_finite()
    }
}

/// JSON writes an infinite slope as `null`.
fn deserialize_slope<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

impl JobType {
    /// Stable label used as a metrics key.
    pub fn label(&self) -> String {
        match self {
            Self::Search => "search".to_string(),
            Self::Track(tier) => format!("track-{tier}"),
            Self::Custom(name) => name.clone(),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_builder() {
        let job = Job::new(7, 0.5)
            .with_slope(2.0)
            .with_start_time(1.5)
            .with_drop(3.0, 40.0)
            .with_type(JobType::Track(1));

        assert_eq!(job.id, 7);
        assert!((job.duration - 0.5).abs() < 1e-10);
        assert!((job.slope - 2.0).abs() < 1e-10);
        assert!((job.start_time - 1.5).abs() < 1e-10);
        assert_eq!(
            job.drop,
            Some(DropPolicy {
                drop_time: 3.0,
                drop_cost: 40.0
            })
        );
        assert_eq!(job.job_type, JobType::Track(1));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_job_cost_at() {
        let job = Job::new(1, 1.0).with_slope(2.0).with_start_time(1.0);
        assert!((job.cost_at(4.0) - 6.0).abs() < 1e-10);
        assert_eq!(job.cost_at(0.0), 0.0);

        let job = job.with_drop(2.0, 50.0);
        assert!((job.cost_at(2.5) - 3.0).abs() < 1e-10);
        assert_eq!(job.cost_at(3.0), 50.0);
        assert_eq!(job.deadline(), Some(3.0));
    }

    #[test]
    fn test_desired_revisit_interval() {
        assert!((Job::new(1, 1.0).with_slope(4.0).desired_revisit_interval() - 0.25).abs() < 1e-10);
        assert!(Job::new(1, 1.0).desired_revisit_interval().is_infinite());
    }

    #[test]
    fn test_job_serde_infinite_slope() {
        let mut job = Job::new(3, 0.5).with_slope(f64::INFINITY);
        job.priority = f64::NEG_INFINITY;
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert!(back.slope.is_infinite());
        assert_eq!(back.priority, 0.0);
    }

    #[test]
    fn test_job_type_labels() {
        assert_eq!(JobType::Search.label(), "search");
        assert_eq!(JobType::Track(2).to_string(), "track-2");
        assert_eq!(JobType::Custom("calibration".into()).label(), "calibration");
    }
}
