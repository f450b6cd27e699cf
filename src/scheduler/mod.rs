//! Simulation engine and run evaluation.
//!
//! Provides the job registry, the time-stepped simulation loop, checkpoints,
//! run metrics and a multi-policy comparison harness.
//!
//! # Ownership
//!
//! A [`Simulation`] exclusively owns its [`JobRegistry`] and channel state.
//! Policies receive detached copies of each batch; hooks see the registry
//! only through validated edits. Independent runs share nothing.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1, 9
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

mod checkpoint;
mod compare;
mod engine;
mod history;
mod hook;
mod metrics;
mod registry;

pub use checkpoint::Checkpoint;
pub use compare::{compare_policies, PolicyComparison};
pub use engine::{SimState, Simulation, StopReason, TickOutcome};
pub use history::RunHistory;
pub use hook::{TickContext, TickHook};
pub use metrics::RunMetrics;
pub use registry::{Batch, JobRegistry};
