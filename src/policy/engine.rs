//! Rule-driven assignment policy.
//!
//! Orders a batch with a chain of dispatching rules evaluated sequentially
//! (the next rule only breaks ties of the previous one) and places the jobs
//! with list scheduling. Remaining ties keep batch order, which is the
//! registry's priority order.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::rules::{DispatchingRule, RuleContext, RuleKind};
use super::{list_schedule, AssignmentPolicy, PolicyInput, PolicyOutput};
use crate::error::SimResult;

/// Assignment policy composed from dispatching rules.
///
/// # Example
/// ```
/// use revisit_sched::policy::rules::{Edd, HighestSlope};
/// use revisit_sched::policy::{AssignmentPolicy, PolicyInput, PolicyJob, RulePolicy};
///
/// let mut policy = RulePolicy::new().with_rule(Edd).with_rule(HighestSlope);
/// let input = PolicyInput::new(
///     vec![
///         PolicyJob::new(0.0, 1.0, 1.0),
///         PolicyJob::new(0.0, 1.0, 1.0).with_drop(2.0, 10.0),
///     ],
///     vec![0.0],
/// );
/// let output = policy.assign(&input).unwrap();
/// assert_eq!(output.execution_order, vec![1, 0]);
/// ```
#[derive(Clone)]
pub struct RulePolicy {
    rules: Vec<Arc<dyn DispatchingRule>>,
    epsilon: f64,
}

impl RulePolicy {
    /// Creates a policy with no rules (keeps batch order).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// Builds a policy from serializable rule selectors.
    pub fn from_kinds(kinds: &[RuleKind]) -> Self {
        Self {
            rules: kinds.iter().map(|k| k.build()).collect(),
            epsilon: 1e-9,
        }
    }

    /// Appends a rule; later rules only break ties of earlier ones.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sets the score tolerance below which two jobs tie.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Number of rules in the chain.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Batch indices in placement order.
    pub fn sort_indices(&self, input: &PolicyInput) -> Vec<usize> {
        let context = RuleContext::from_input(input);
        let scores: Vec<Vec<f64>> = input
            .jobs
            .iter()
            .map(|job| {
                self.rules
                    .iter()
                    .map(|rule| rule.evaluate(job, &context))
                    .collect()
            })
            .collect();

        let mut indices: Vec<usize> = (0..input.batch_size()).collect();
        indices.sort_by(|&a, &b| self.compare(&scores[a], &scores[b]));
        indices
    }

    fn compare(&self, a: &[f64], b: &[f64]) -> Ordering {
        for (sa, sb) in a.iter().zip(b) {
            if (sa - sb).abs() > self.epsilon {
                return sa.total_cmp(sb);
            }
        }
        Ordering::Equal
    }
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentPolicy for RulePolicy {
    fn name(&self) -> &'static str {
        "RULES"
    }

    fn assign(&mut self, input: &PolicyInput) -> SimResult<PolicyOutput> {
        input.check()?;
        let order = self.sort_indices(input);
        list_schedule(input, &order)
    }

    fn description(&self) -> &'static str {
        "Sequential dispatching rules"
    }
}

impl std::fmt::Debug for RulePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulePolicy")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("epsilon", &self.epsilon)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::rules::{Ert, HighestSlope, MostUrgent, Spt, Wspt};
    use crate::policy::{EarliestStartTime, PolicyJob};

    fn sample_input() -> PolicyInput {
        PolicyInput::new(
            vec![
                PolicyJob::new(0.0, 1.0, 2.0),
                PolicyJob::new(0.0, 3.0, 1.0),
                PolicyJob::new(0.5, 3.0, 0.5),
            ],
            vec![0.0],
        )
    }

    #[test]
    fn test_no_rules_keeps_batch_order() {
        let policy = RulePolicy::new();
        assert_eq!(policy.sort_indices(&sample_input()), vec![0, 1, 2]);
    }

    #[test]
    fn test_highest_slope_then_spt() {
        let policy = RulePolicy::new().with_rule(HighestSlope).with_rule(Spt);
        // 1 and 2 tie on slope; SPT puts 2 first.
        assert_eq!(policy.sort_indices(&sample_input()), vec![2, 1, 0]);
    }

    #[test]
    fn test_ert_matches_est() {
        let input = sample_input();
        let mut rules = RulePolicy::new().with_rule(Ert);
        let a = rules.assign(&input).unwrap();
        let b = EarliestStartTime.assign(&input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wspt_lowers_cost() {
        let input = sample_input();
        let wspt = RulePolicy::new().with_rule(Wspt).assign(&input).unwrap();
        let est = EarliestStartTime.assign(&input).unwrap();
        assert!(wspt.cost < est.cost);
    }

    #[test]
    fn test_from_kinds() {
        let policy = RulePolicy::from_kinds(&[RuleKind::EarliestDeadline, RuleKind::MostUrgent]);
        assert_eq!(policy.rule_count(), 2);
        assert!(format!("{policy:?}").contains("EDD"));
    }

    #[test]
    fn test_most_urgent_orders_by_wait() {
        let input = PolicyInput::new(
            vec![PolicyJob::new(1.0, 1.0, 1.0), PolicyJob::new(0.0, 1.0, 1.0)],
            vec![2.0],
        );
        let policy = RulePolicy::new().with_rule(MostUrgent);
        assert_eq!(policy.sort_indices(&input), vec![1, 0]);
    }
}
