//! Built-in dispatching rules for batch ordering.
//!
//! # Categories
//!
//! - **Time-based**: ERT (earliest release), SPT, WSPT
//! - **Urgency**: HS (highest slope), MU (most urgent at the decision time)
//! - **Deadline**: EDD (earliest drop deadline), ATC (apparent tardiness cost)
//!
//! # Score Convention
//! All rules return lower scores for jobs that should be placed first.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use super::{PolicyInput, PolicyJob};

/// Score returned by a dispatching rule. Lower = placed earlier.
pub type RuleScore = f64;

/// Decision-time information shared by all rules for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleContext {
    /// Earliest channel availability: the soonest any job can start.
    pub decision_time: f64,
    /// Mean duration over the batch.
    pub average_duration: f64,
}

impl RuleContext {
    /// Derives the context from a policy input.
    pub fn from_input(input: &PolicyInput) -> Self {
        let decision_time = input
            .channel_availability
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let average_duration = if input.jobs.is_empty() {
            0.0
        } else {
            input.jobs.iter().map(|j| j.duration).sum::<f64>() / input.jobs.len() as f64
        };
        Self {
            decision_time: if decision_time.is_finite() { decision_time } else { 0.0 },
            average_duration,
        }
    }
}

/// A dispatching rule that scores batch entries.
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "ERT", "EDD").
    fn name(&self) -> &'static str;

    /// Scores a job; lower = higher priority.
    fn evaluate(&self, job: &PolicyJob, context: &RuleContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Earliest Release Time.
#[derive(Debug, Clone, Copy)]
pub struct Ert;

impl DispatchingRule for Ert {
    fn name(&self) -> &'static str {
        "ERT"
    }

    fn evaluate(&self, job: &PolicyJob, _context: &RuleContext) -> RuleScore {
        job.release_time
    }

    fn description(&self) -> &'static str {
        "Earliest Release Time"
    }
}

/// Shortest Processing Time.
///
/// # Reference
/// Smith (1956), optimal for mean flow time on a single machine.
#[derive(Debug, Clone, Copy)]
pub struct Spt;

impl DispatchingRule for Spt {
    fn name(&self) -> &'static str {
        "SPT"
    }

    fn evaluate(&self, job: &PolicyJob, _context: &RuleContext) -> RuleScore {
        job.duration
    }

    fn description(&self) -> &'static str {
        "Shortest Processing Time"
    }
}

/// Weighted Shortest Processing Time: `duration / slope`.
///
/// Optimal for total weighted completion time on one machine with equal
/// release times. Zero-slope jobs go last.
///
/// # Reference
/// Smith (1956), "Various Optimizers for Single-Stage Production"
#[derive(Debug, Clone, Copy)]
pub struct Wspt;

impl DispatchingRule for Wspt {
    fn name(&self) -> &'static str {
        "WSPT"
    }

    fn evaluate(&self, job: &PolicyJob, _context: &RuleContext) -> RuleScore {
        if job.weight <= 0.0 {
            return f64::MAX;
        }
        job.duration / job.weight
    }

    fn description(&self) -> &'static str {
        "Weighted Shortest Processing Time"
    }
}

/// Highest Slope first.
#[derive(Debug, Clone, Copy)]
pub struct HighestSlope;

impl DispatchingRule for HighestSlope {
    fn name(&self) -> &'static str {
        "HS"
    }

    fn evaluate(&self, job: &PolicyJob, _context: &RuleContext) -> RuleScore {
        -job.weight
    }

    fn description(&self) -> &'static str {
        "Highest Slope"
    }
}

/// Earliest Due Date on the drop deadline. Jobs without one go last.
///
/// # Reference
/// Jackson (1955), optimal for maximum lateness on a single machine.
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, job: &PolicyJob, _context: &RuleContext) -> RuleScore {
        job.drop
            .map(|d| job.release_time + d.drop_time)
            .unwrap_or(f64::MAX)
    }

    fn description(&self) -> &'static str {
        "Earliest Drop Deadline"
    }
}

/// Most Urgent: highest cost if started at the decision time.
#[derive(Debug, Clone, Copy)]
pub struct MostUrgent;

impl DispatchingRule for MostUrgent {
    fn name(&self) -> &'static str {
        "MU"
    }

    fn evaluate(&self, job: &PolicyJob, context: &RuleContext) -> RuleScore {
        -job.cost_at(context.decision_time)
    }

    fn description(&self) -> &'static str {
        "Most Urgent"
    }
}

/// Apparent Tardiness Cost on the drop deadline.
///
/// WSPT scaled by `exp(-slack / (k * average_duration))`, where slack is the
/// time left before the job's start deadline at the decision time. Jobs
/// without a deadline fall back to plain WSPT.
///
/// # Reference
/// Vepsalainen & Morton (1987), "Priority Rules for Job Shops with
/// Weighted Tardiness Costs"
#[derive(Debug, Clone, Copy)]
pub struct Atc {
    /// Lookahead parameter (default: 2.0).
    pub k: f64,
}

impl Default for Atc {
    fn default() -> Self {
        Self { k: 2.0 }
    }
}

impl Atc {
    /// Creates an ATC rule with a custom lookahead.
    pub fn with_k(k: f64) -> Self {
        Self { k }
    }
}

impl DispatchingRule for Atc {
    fn name(&self) -> &'static str {
        "ATC"
    }

    fn evaluate(&self, job: &PolicyJob, context: &RuleContext) -> RuleScore {
        if job.duration <= 0.0 {
            return f64::MAX;
        }
        let wspt = job.weight / job.duration;
        let Some(drop) = job.drop else {
            return -wspt;
        };

        let slack = job.release_time + drop.drop_time - context.decision_time;
        let scale = self.k
            * if context.average_duration > 0.0 {
                context.average_duration
            } else {
                job.duration
            };
        let urgency = if slack <= 0.0 {
            1.0
        } else {
            (-slack / scale).exp()
        };
        -(wspt * urgency)
    }

    fn description(&self) -> &'static str {
        "Apparent Tardiness Cost"
    }
}

/// Serializable rule selector, resolved once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    EarliestRelease,
    ShortestProcessing,
    WeightedShortestProcessing,
    HighestSlope,
    EarliestDeadline,
    MostUrgent,
    ApparentTardinessCost,
}

impl RuleKind {
    /// Instantiates the rule.
    pub fn build(self) -> Arc<dyn DispatchingRule> {
        match self {
            Self::EarliestRelease => Arc::new(Ert),
            Self::ShortestProcessing => Arc::new(Spt),
            Self::WeightedShortestProcessing => Arc::new(Wspt),
            Self::HighestSlope => Arc::new(HighestSlope),
            Self::EarliestDeadline => Arc::new(Edd),
            Self::MostUrgent => Arc::new(MostUrgent),
            Self::ApparentTardinessCost => Arc::new(Atc::default()),
        }
    }
}
