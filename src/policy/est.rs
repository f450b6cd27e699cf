//! Earliest-Start-Time assignment.
//!
//! # Algorithm
//!
//! 1. Sort batch indices by ascending release time (stable: ties keep batch order).
//! 2. For each job in that order, take the least-loaded channel (lowest index on ties).
//! 3. Start the job at `max(release, channel availability)` and advance the
//!    channel to `start + duration`.
//!
//! With `K = 1` this is classical single-machine earliest-release scheduling.
//! Over `K` channels it minimizes the maximum completion time for the fixed
//! release order, but it ignores slopes and deadlines, so it is a baseline
//! for the weighted-cost objective rather than an optimum.
//!
//! # Complexity
//! O(N log N + N log K).

use super::{list_schedule, AssignmentPolicy, PolicyInput, PolicyOutput};
use crate::error::SimResult;

/// Earliest-Start-Time policy generalized to `K` channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestStartTime;

impl EarliestStartTime {
    /// Batch indices in ascending release order (stable).
    ///
    /// `-0.0` and `0.0` releases tie and keep batch order.
    pub fn order(input: &PolicyInput) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..input.batch_size()).collect();
        indices.sort_by(|&a, &b| {
            (input.jobs[a].release_time + 0.0).total_cmp(&(input.jobs[b].release_time + 0.0))
        });
        indices
    }
}

impl AssignmentPolicy for EarliestStartTime {
    fn name(&self) -> &'static str {
        "EST"
    }

    fn assign(&mut self, input: &PolicyInput) -> SimResult<PolicyOutput> {
        input.check()?;
        let order = Self::order(input);
        list_schedule(input, &order)
    }

    fn description(&self) -> &'static str {
        "Earliest Start Time"
    }
}
