//! Deterministic multi-channel revisit scheduling simulator.
//!
//! Simulates a resource-constrained sensor sharing `K` parallel execution
//! channels among a closed population of periodic jobs whose urgency grows
//! while they wait. Every resource period the loop re-prioritizes the
//! population, hands the top `N` jobs to a pluggable assignment policy, and
//! requeues them with a reset wait clock. Policies are compared on identical
//! job streams by achieved revisit rates, cost, drops and runtime.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Job`, `ChannelState`, `TickRecord`
//! - **`cost`**: Linear and linear-with-drop urgency cost functions
//! - **`policy`**: The `AssignmentPolicy` interface, EST, rule and random policies
//! - **`scheduler`**: `JobRegistry`, the `Simulation` loop, checkpoints, metrics
//! - **`validation`**: Job intake checks and policy output checks
//! - **`generators`**: Job population generators
//! - **`config`**: Run configuration and policy selection
//!
//! # Example
//!
//! ```
//! use revisit_sched::config::SimulationConfig;
//! use revisit_sched::generators::{JobGenerator, SurveillanceMix};
//! use revisit_sched::scheduler::Simulation;
//!
//! let jobs = SurveillanceMix::new().generate_seeded(1, 42);
//! let config = SimulationConfig::new().with_channel_count(2).with_horizon(2.0);
//!
//! let mut sim = Simulation::from_config(config, jobs).unwrap();
//! sim.run().unwrap();
//! let metrics = sim.metrics();
//! assert!(metrics.decisions > 0);
//! assert_eq!(sim.registry().len(), 32);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies"

pub mod config;
pub mod cost;
pub mod error;
pub mod generators;
pub mod models;
pub mod policy;
pub mod scheduler;
pub mod validation;

pub use error::{SimError, SimResult};
