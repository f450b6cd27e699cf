//! Assignment policies.
//!
//! An assignment policy receives a detached batch of jobs plus the current
//! channel availability and decides the execution order, the execution start
//! time of every job, and the resulting channel availability. Policies never
//! hold on to engine state between calls; everything flows through
//! [`PolicyInput`] and [`PolicyOutput`] by value.
//!
//! # Policies
//!
//! | Policy | Ordering |
//! |--------|----------|
//! | [`EarliestStartTime`] | Ascending release time (stable) |
//! | [`RulePolicy`] | Composable dispatching rules |
//! | [`RandomSequencer`] | Seeded random permutation |
//!
//! All of them place jobs with [`list_schedule`]: each job in order goes to
//! the least-loaded channel and starts at `max(release, channel availability)`.
//!
//! # Usage
//!
//! ```
//! use revisit_sched::policy::{AssignmentPolicy, EarliestStartTime, PolicyInput, PolicyJob};
//!
//! let input = PolicyInput::new(
//!     vec![PolicyJob::new(0.0, 1.0, 1.0), PolicyJob::new(0.0, 1.0, 1.0)],
//!     vec![0.0],
//! );
//! let output = EarliestStartTime.assign(&input).unwrap();
//! assert_eq!(output.execution_order, vec![0, 1]);
//! assert_eq!(output.execution_start_times, vec![0.0, 1.0]);
//! assert_eq!(output.channel_availability, vec![2.0]);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 5 (parallel machines)
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies" (list scheduling)

mod engine;
mod est;
mod random;
pub mod rules;

pub use engine::RulePolicy;
pub use est::EarliestStartTime;
pub use random::RandomSequencer;
pub use rules::{DispatchingRule, RuleContext, RuleKind, RuleScore};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::cost::CostFunction;
use crate::error::{SimError, SimResult};
use crate::models::{ChannelState, DropPolicy, Job};

/// One batch entry as seen by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyJob {
    /// Release time: the job's wait-clock origin (s).
    pub release_time: f64,
    /// Urgency slope.
    pub weight: f64,
    /// Execution time (s).
    pub duration: f64,
    /// Optional deadline (relative to release) and drop penalty.
    pub drop: Option<DropPolicy>,
}

impl PolicyJob {
    /// Creates a batch entry without drop semantics.
    pub fn new(release_time: f64, weight: f64, duration: f64) -> Self {
        Self {
            release_time,
            weight,
            duration,
            drop: None,
        }
    }

    /// Adds a deadline and drop penalty.
    pub fn with_drop(mut self, drop_time: f64, drop_cost: f64) -> Self {
        self.drop = Some(DropPolicy {
            drop_time,
            drop_cost,
        });
        self
    }

    /// Extracts the policy view of a registry job.
    pub fn from_job(job: &Job) -> Self {
        Self {
            release_time: job.start_time,
            weight: job.slope,
            duration: job.duration,
            drop: job.drop,
        }
    }

    /// The entry's cost function.
    pub fn cost_function(&self) -> CostFunction {
        match self.drop {
            None => CostFunction::Linear { slope: self.weight },
            Some(d) => CostFunction::LinearDrop {
                slope: self.weight,
                drop_time: d.drop_time,
                drop_cost: d.drop_cost,
            },
        }
    }

    /// Cost if execution starts at `start`.
    pub fn cost_at(&self, start: f64) -> f64 {
        self.cost_function().evaluate(start, self.release_time)
    }

    /// Whether starting at `start` misses the deadline.
    pub fn is_dropped_at(&self, start: f64) -> bool {
        self.cost_function().is_dropped(start, self.release_time)
    }
}

/// Input record handed to an assignment policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInput {
    /// Batch entries, indexed `0..N`.
    pub jobs: Vec<PolicyJob>,
    /// Channel availability, indexed `0..K`.
    pub channel_availability: Vec<f64>,
}

impl PolicyInput {
    /// Creates an input record.
    pub fn new(jobs: Vec<PolicyJob>, channel_availability: Vec<f64>) -> Self {
        Self {
            jobs,
            channel_availability,
        }
    }

    /// Builds an input record from registry jobs and channel state.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>, channels: &ChannelState) -> Self {
        Self {
            jobs: jobs.into_iter().map(PolicyJob::from_job).collect(),
            channel_availability: channels.availability().to_vec(),
        }
    }

    /// Batch size `N`.
    pub fn batch_size(&self) -> usize {
        self.jobs.len()
    }

    /// Channel count `K`.
    pub fn channel_count(&self) -> usize {
        self.channel_availability.len()
    }

    /// Release times by batch index.
    pub fn release_times(&self) -> Vec<f64> {
        self.jobs.iter().map(|j| j.release_time).collect()
    }

    /// Slopes by batch index.
    pub fn weights(&self) -> Vec<f64> {
        self.jobs.iter().map(|j| j.weight).collect()
    }

    /// Durations by batch index.
    pub fn durations(&self) -> Vec<f64> {
        self.jobs.iter().map(|j| j.duration).collect()
    }

    /// Relative deadlines (`None` = no drop semantics).
    pub fn deadlines(&self) -> Vec<Option<f64>> {
        self.jobs.iter().map(|j| j.drop.map(|d| d.drop_time)).collect()
    }

    /// Drop penalties (`None` = no drop semantics).
    pub fn drop_penalties(&self) -> Vec<Option<f64>> {
        self.jobs.iter().map(|j| j.drop.map(|d| d.drop_cost)).collect()
    }

    /// Rejects malformed entries.
    ///
    /// # Errors
    /// `InvalidBatchEntry` for a non-positive or non-finite duration, a
    /// non-finite release time, or a negative/NaN weight; `InvalidConfig`
    /// for a non-empty batch with no channels.
    pub fn check(&self) -> SimResult<()> {
        for (index, job) in self.jobs.iter().enumerate() {
            let reason = if !(job.duration > 0.0 && job.duration.is_finite()) {
                Some(format!("duration must be positive and finite, got {}", job.duration))
            } else if !job.release_time.is_finite() {
                Some(format!("release time must be finite, got {}", job.release_time))
            } else if !(job.weight >= 0.0) {
                Some(format!("weight must be non-negative, got {}", job.weight))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(SimError::InvalidBatchEntry { index, reason });
            }
        }
        if !self.jobs.is_empty() && self.channel_availability.is_empty() {
            return Err(SimError::InvalidConfig(
                "at least one channel is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output record returned by an assignment policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutput {
    /// Total batch cost evaluated at each job's execution start.
    pub cost: f64,
    /// Permutation of `0..N`: the order in which jobs were placed.
    pub execution_order: Vec<usize>,
    /// Execution start per batch index.
    pub execution_start_times: Vec<f64>,
    /// Channel per batch index.
    pub channel_assignments: Vec<usize>,
    /// Jobs started at or past their deadline.
    pub num_dropped: usize,
    /// Channel availability after the batch.
    pub channel_availability: Vec<f64>,
}

impl PolicyOutput {
    /// Output for an empty batch: no cost, no drops, channels unchanged.
    pub fn empty(channel_availability: Vec<f64>) -> Self {
        Self {
            cost: 0.0,
            execution_order: Vec::new(),
            execution_start_times: Vec::new(),
            channel_assignments: Vec::new(),
            num_dropped: 0,
            channel_availability,
        }
    }
}

/// A pluggable batch assignment policy.
///
/// Implementations must be total over well-formed input (an empty batch is a
/// no-op) and must signal malformed input instead of accepting it.
/// Policies may keep private state (e.g. an RNG) but never engine state.
pub trait AssignmentPolicy: Send + Debug {
    /// Policy name (e.g. "EST").
    fn name(&self) -> &'static str;

    /// Assigns a batch to channels.
    fn assign(&mut self, input: &PolicyInput) -> SimResult<PolicyOutput>;

    /// Policy description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

impl AssignmentPolicy for Box<dyn AssignmentPolicy> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn assign(&mut self, input: &PolicyInput) -> SimResult<PolicyOutput> {
        (**self).assign(input)
    }

    fn description(&self) -> &'static str {
        (**self).description()
    }
}

/// A channel keyed by availability in the list-scheduling heap.
#[derive(Debug, Clone, Copy)]
struct ChannelSlot {
    available_at: f64,
    channel: usize,
}

impl PartialEq for ChannelSlot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChannelSlot {}

impl PartialOrd for ChannelSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap: flip so the earliest, then lowest-index, channel pops first.
impl Ord for ChannelSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.available_at + 0.0)
            .total_cmp(&(self.available_at + 0.0))
            .then(other.channel.cmp(&self.channel))
    }
}

/// Places jobs in the given order, each on the least-loaded channel.
///
/// Job `order[i]` starts at `max(release_time, channel availability)` and
/// moves that channel to `start + duration`. Ties between equally loaded
/// channels go to the lowest index.
///
/// # Complexity
/// O(N log K), using a min-heap of channels.
///
/// # Errors
/// Propagates [`PolicyInput::check`]; `InvalidPolicyOutput` if `order` is not
/// a permutation of the batch indices.
pub fn list_schedule(input: &PolicyInput, order: &[usize]) -> SimResult<PolicyOutput> {
    input.check()?;

    let n = input.batch_size();
    if order.len() != n {
        return Err(SimError::InvalidPolicyOutput(format!(
            "order has {} entries for a batch of {n}",
            order.len()
        )));
    }
    if n == 0 {
        return Ok(PolicyOutput::empty(input.channel_availability.clone()));
    }

    let mut channels = ChannelState::from_availability(input.channel_availability.clone());
    let mut heap: BinaryHeap<ChannelSlot> = input
        .channel_availability
        .iter()
        .enumerate()
        .map(|(channel, &available_at)| ChannelSlot {
            available_at,
            channel,
        })
        .collect();
    let mut starts = vec![f64::NAN; n];
    let mut assigned = vec![usize::MAX; n];
    let mut cost = 0.0;
    let mut num_dropped = 0;

    for &idx in order {
        let job = input.jobs.get(idx).ok_or_else(|| {
            SimError::InvalidPolicyOutput(format!("order references index {idx} outside the batch"))
        })?;
        if assigned[idx] != usize::MAX {
            return Err(SimError::InvalidPolicyOutput(format!(
                "order places index {idx} twice"
            )));
        }
        let ChannelSlot {
            available_at,
            channel,
        } = heap.pop().ok_or_else(|| {
            SimError::InvalidConfig("at least one channel is required".to_string())
        })?;

        let start = job.release_time.max(available_at);
        let end = start + job.duration;
        channels.advance(channel, end)?;
        heap.push(ChannelSlot {
            available_at: end,
            channel,
        });

        starts[idx] = start;
        assigned[idx] = channel;
        cost += job.cost_at(start);
        if job.is_dropped_at(start) {
            num_dropped += 1;
        }
    }

    Ok(PolicyOutput {
        cost,
        execution_order: order.to_vec(),
        execution_start_times: starts,
        channel_assignments: assigned,
        num_dropped,
        channel_availability: channels.availability().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_schedule_two_channels() {
        let input = PolicyInput::new(
            vec![
                PolicyJob::new(0.0, 1.0, 2.0),
                PolicyJob::new(0.0, 1.0, 1.0),
                PolicyJob::new(0.0, 1.0, 1.0),
            ],
            vec![0.0, 0.5],
        );
        let out = list_schedule(&input, &[0, 1, 2]).unwrap();
        // job 0 → ch0 [0,2), job 1 → ch1 [0.5,1.5), job 2 → ch1 [1.5,2.5)
        assert_eq!(out.channel_assignments, vec![0, 1, 1]);
        assert_eq!(out.execution_start_times, vec![0.0, 0.5, 1.5]);
        assert_eq!(out.channel_availability, vec![2.0, 2.5]);
        assert!((out.cost - 2.0).abs() < 1e-10);
        assert_eq!(out.num_dropped, 0);
    }

    #[test]
    fn test_list_schedule_matches_least_loaded() {
        let input = PolicyInput::new(
            vec![PolicyJob::new(0.0, 1.0, 1.0); 6],
            vec![2.0, 0.0, -0.0, 1.0],
        );
        let out = list_schedule(&input, &[0, 1, 2, 3, 4, 5]).unwrap();

        let mut channels = ChannelState::from_availability(input.channel_availability.clone());
        for idx in 0..6 {
            let (channel, at) = channels.least_loaded().unwrap();
            assert_eq!(out.channel_assignments[idx], channel);
            assert_eq!(out.execution_start_times[idx], at.max(0.0));
            channels.advance(channel, at.max(0.0) + 1.0).unwrap();
        }
        // Signed zeros tie, so channel 1 is picked before channel 2.
        assert_eq!(&out.channel_assignments[..2], &[1, 2]);
        assert_eq!(out.channel_availability, channels.availability());
    }

    #[test]
    fn test_list_schedule_release_after_channel() {
        let input = PolicyInput::new(vec![PolicyJob::new(3.0, 1.0, 1.0)], vec![1.0]);
        let out = list_schedule(&input, &[0]).unwrap();
        assert_eq!(out.execution_start_times, vec![3.0]);
        assert_eq!(out.channel_availability, vec![4.0]);
        assert_eq!(out.cost, 0.0);
    }

    #[test]
    fn test_list_schedule_counts_drops() {
        let input = PolicyInput::new(
            vec![
                PolicyJob::new(0.0, 1.0, 2.0).with_drop(1.0, 30.0),
                PolicyJob::new(0.0, 1.0, 2.0).with_drop(1.0, 30.0),
            ],
            vec![0.0],
        );
        let out = list_schedule(&input, &[0, 1]).unwrap();
        assert_eq!(out.num_dropped, 1);
        assert!((out.cost - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_list_schedule_rejects_bad_order() {
        let input = PolicyInput::new(
            vec![PolicyJob::new(0.0, 1.0, 1.0), PolicyJob::new(0.0, 1.0, 1.0)],
            vec![0.0],
        );
        assert!(matches!(
            list_schedule(&input, &[0]),
            Err(SimError::InvalidPolicyOutput(_))
        ));
        assert!(matches!(
            list_schedule(&input, &[0, 0]),
            Err(SimError::InvalidPolicyOutput(_))
        ));
        assert!(matches!(
            list_schedule(&input, &[0, 5]),
            Err(SimError::InvalidPolicyOutput(_))
        ));
    }

    #[test]
    fn test_check_rejects_non_positive_duration() {
        for duration in [0.0, -1.0, f64::NAN] {
            let input = PolicyInput::new(vec![PolicyJob::new(0.0, 1.0, duration)], vec![0.0]);
            assert!(matches!(
                input.check(),
                Err(SimError::InvalidBatchEntry { index: 0, .. })
            ));
        }
    }

    #[test]
    fn test_check_requires_channels() {
        let input = PolicyInput::new(vec![PolicyJob::new(0.0, 1.0, 1.0)], Vec::new());
        assert!(matches!(input.check(), Err(SimError::InvalidConfig(_))));
        assert!(PolicyInput::new(Vec::new(), Vec::new()).check().is_ok());
    }

    #[test]
    fn test_input_arrays() {
        let input = PolicyInput::new(
            vec![
                PolicyJob::new(1.0, 2.0, 3.0).with_drop(4.0, 5.0),
                PolicyJob::new(6.0, 7.0, 8.0),
            ],
            vec![0.0, 0.0],
        );
        assert_eq!(input.batch_size(), 2);
        assert_eq!(input.channel_count(), 2);
        assert_eq!(input.release_times(), vec![1.0, 6.0]);
        assert_eq!(input.weights(), vec![2.0, 7.0]);
        assert_eq!(input.durations(), vec![3.0, 8.0]);
        assert_eq!(input.deadlines(), vec![Some(4.0), None]);
        assert_eq!(input.drop_penalties(), vec![Some(5.0), None]);
    }

    #[test]
    fn test_from_jobs() {
        let jobs = vec![
            Job::new(1, 0.5).with_slope(2.0).with_start_time(1.0),
            Job::new(2, 0.25).with_drop(3.0, 9.0),
        ];
        let input = PolicyInput::from_jobs(&jobs, &ChannelState::new(2));
        assert_eq!(input.jobs[0], PolicyJob::new(1.0, 2.0, 0.5));
        assert_eq!(input.jobs[1], PolicyJob::new(0.0, 0.0, 0.25).with_drop(3.0, 9.0));
        assert_eq!(input.channel_availability, vec![0.0, 0.0]);
    }
}
