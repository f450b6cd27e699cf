//! Policy comparison harness.
//!
//! Runs several policies on identical copies of one job stream and
//! configuration. Every run owns its own registry and channels; nothing is
//! shared between runs.

use tracing::info;

use super::{RunHistory, RunMetrics, Simulation};
use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::models::Job;
use crate::policy::AssignmentPolicy;

/// Outcome of one policy in a comparison.
#[derive(Debug, Clone)]
pub struct PolicyComparison {
    /// Policy name.
    pub policy: &'static str,
    pub metrics: RunMetrics,
    pub history: RunHistory,
}

/// Runs every policy to the horizon on the same population.
///
/// # Errors
/// The first configuration, population or policy error; runs already
/// finished are discarded.
///
/// # Example
/// ```
/// use revisit_sched::config::SimulationConfig;
/// use revisit_sched::models::Job;
/// use revisit_sched::policy::{AssignmentPolicy, EarliestStartTime, RandomSequencer};
/// use revisit_sched::scheduler::compare_policies;
///
/// let config = SimulationConfig::new().with_batch_size(2).with_horizon(0.4);
/// let jobs: Vec<Job> = (1..=4).map(|id| Job::new(id, 0.01).with_slope(id as f64)).collect();
/// let policies: Vec<Box<dyn AssignmentPolicy>> =
///     vec![Box::new(EarliestStartTime), Box::new(RandomSequencer::new(1))];
///
/// let results = compare_policies(&config, &jobs, policies).unwrap();
/// assert_eq!(results[0].policy, "EST");
/// assert_eq!(results[0].metrics.decisions, results[1].metrics.decisions);
/// ```
pub fn compare_policies(
    config: &SimulationConfig,
    jobs: &[Job],
    policies: Vec<Box<dyn AssignmentPolicy>>,
) -> SimResult<Vec<PolicyComparison>> {
    let mut results = Vec::with_capacity(policies.len());

    for policy in policies {
        let name = policy.name();
        let mut sim = Simulation::new(config.clone(), jobs.iter().cloned(), policy)?;
        sim.run()?;

        let metrics = sim.metrics();
        info!(
            policy = name,
            total_cost = metrics.total_cost,
            drop_rate = metrics.drop_rate,
            utilization = metrics.avg_utilization,
            "policy run complete"
        );
        results.push(PolicyComparison {
            policy: name,
            metrics,
            history: sim.into_history(),
        });
    }

    Ok(results)
}
