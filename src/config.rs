//! Simulation configuration.
//!
//! A [`SimulationConfig`] fixes the decision cadence, channel and batch
//! sizes, the time window, and which assignment policy drives the run. The
//! policy is selected once here through [`PolicyKind`]; the loop only ever
//! sees a built [`AssignmentPolicy`].
//!
//! # JSON
//!
//! ```
//! use revisit_sched::config::{PolicyKind, SimulationConfig};
//!
//! let config = SimulationConfig::from_json(r#"{
//!     "resource_period": 0.04,
//!     "channel_count": 2,
//!     "batch_size": 4,
//!     "horizon": 5.0,
//!     "policy": { "kind": "random", "seed": 7 }
//! }"#).unwrap();
//! assert_eq!(config.policy, PolicyKind::Random { seed: 7 });
//! assert!((config.step() - 0.02).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::policy::{AssignmentPolicy, EarliestStartTime, RandomSequencer, RuleKind, RulePolicy};

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Nominal decision cadence (s).
    pub resource_period: f64,
    /// Number of parallel execution channels `K`.
    pub channel_count: usize,
    /// Jobs per decision `N`.
    pub batch_size: usize,
    /// The run terminates once the clock exceeds this time (s).
    pub horizon: f64,
    /// Initial clock value and initial channel availability (s).
    pub start_time: f64,
    /// Assignment policy.
    pub policy: PolicyKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resource_period: 0.04,
            channel_count: 1,
            batch_size: 4,
            horizon: 10.0,
            start_time: 0.0,
            policy: PolicyKind::EarliestStartTime,
        }
    }
}

impl SimulationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decision cadence (s).
    pub fn with_resource_period(mut self, resource_period: f64) -> Self {
        self.resource_period = resource_period;
        self
    }

    /// Sets the number of channels `K`.
    pub fn with_channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    /// Sets the jobs per decision `N`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the time past which the run terminates (s).
    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the initial clock and channel availability (s).
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Selects the assignment policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Clock increment per tick: `resource_period / channel_count`.
    pub fn step(&self) -> f64 {
        self.resource_period / self.channel_count.max(1) as f64
    }

    /// Checks that the configuration describes a runnable simulation.
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.resource_period > 0.0 && self.resource_period.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "resource_period must be positive and finite, got {}",
                self.resource_period
            )));
        }
        if self.channel_count == 0 {
            return Err(SimError::InvalidConfig(
                "channel_count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SimError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !self.start_time.is_finite() {
            return Err(SimError::InvalidConfig(format!(
                "start_time must be finite, got {}",
                self.start_time
            )));
        }
        if !(self.horizon.is_finite() && self.horizon >= self.start_time) {
            return Err(SimError::InvalidConfig(format!(
                "horizon must be finite and not before start_time, got {}",
                self.horizon
            )));
        }
        if let PolicyKind::Rules { rules } = &self.policy {
            if rules.is_empty() {
                return Err(SimError::InvalidConfig(
                    "rules policy needs at least one rule".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Assignment policy selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyKind {
    /// [`EarliestStartTime`].
    #[default]
    EarliestStartTime,
    /// [`RulePolicy`] with the given rule chain.
    Rules { rules: Vec<RuleKind> },
    /// [`RandomSequencer`] with the given seed.
    Random { seed: u64 },
}

impl PolicyKind {
    /// Instantiates the policy.
    pub fn build(&self) -> Box<dyn AssignmentPolicy> {
        match self {
            Self::EarliestStartTime => Box::new(EarliestStartTime),
            Self::Rules { rules } => Box::new(RulePolicy::from_kinds(rules)),
            Self::Random { seed } => Box::new(RandomSequencer::new(*seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert!((config.resource_period - 0.04).abs() < 1e-10);
        assert_eq!(config.channel_count, 1);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.policy, PolicyKind::EarliestStartTime);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_step_divides_period() {
        let config = SimulationConfig::new()
            .with_resource_period(0.06)
            .with_channel_count(3);
        assert!((config.step() - 0.02).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            SimulationConfig::new().with_resource_period(0.0),
            SimulationConfig::new().with_resource_period(f64::NAN),
            SimulationConfig::new().with_channel_count(0),
            SimulationConfig::new().with_batch_size(0),
            SimulationConfig::new().with_horizon(f64::INFINITY),
            SimulationConfig::new().with_start_time(5.0).with_horizon(1.0),
            SimulationConfig::new().with_policy(PolicyKind::Rules { rules: vec![] }),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SimError::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = SimulationConfig::from_json(r#"{"channel_count": 2}"#).unwrap();
        assert_eq!(config.channel_count, 2);
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::new().with_policy(PolicyKind::Rules {
            rules: vec![RuleKind::EarliestDeadline, RuleKind::HighestSlope],
        });
        let json = config.to_json().unwrap();
        assert!(json.contains("\"kind\": \"rules\""));
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_invalid() {
        assert!(matches!(
            SimulationConfig::from_json("{not json"),
            Err(SimError::Serialization(_))
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{"batch_size": 0}"#),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_policies() {
        assert_eq!(PolicyKind::EarliestStartTime.build().name(), "EST");
        assert_eq!(PolicyKind::Random { seed: 3 }.build().name(), "RANDOM");
        let rules = PolicyKind::Rules {
            rules: vec![RuleKind::MostUrgent],
        };
        assert_eq!(rules.build().name(), "RULES");
    }
}
