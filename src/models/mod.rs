//! Simulation domain models.
//!
//! Provides the core data types shared by the registry, the assignment
//! policies and the simulation loop.
//!
//! # Domain Mappings
//!
//! | revisit-sched | Radar | Compute cluster |
//! |---------------|-------|-----------------|
//! | Job | Search sweep / track dwell | Periodic task |
//! | Channel | Beam / receiver channel | Worker slot |
//! | TickRecord | Resource-period decision | Scheduling round |

mod channel;
mod decision;
mod job;

pub use channel::ChannelState;
pub use decision::{Assignment, TickRecord};
pub use job::{DropPolicy, Job, JobId, JobStatus, JobType};
