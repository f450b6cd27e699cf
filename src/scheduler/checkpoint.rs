//! Simulation checkpoints.
//!
//! The registry, the channel state and the clock position are enough to
//! resume a run deterministically. Policy-private state (an RNG position,
//! say) is not captured; resumed runs start from a freshly built policy.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::models::ChannelState;

use super::JobRegistry;

/// Resumable snapshot of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Clock value of the next tick (s).
    pub now: f64,
    /// Time of tick zero (s).
    pub origin: f64,
    /// Ticks elapsed since `origin`.
    pub tick: u64,
    pub registry: JobRegistry,
    pub channels: ChannelState,
}

impl Checkpoint {
    /// Serializes the checkpoint.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a checkpoint, validating its registry.
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
