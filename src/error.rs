//! Simulation error types.

use thiserror::Error;

use crate::models::JobId;

/// Errors raised by the scheduling engine.
///
/// Only `InsufficientEligibleJobs` is recoverable inside the loop (the tick is
/// skipped). `MonotonicityViolation` and `InvalidPolicyOutput` abort the run.
/// Intake errors (`InvalidJobParameters`, `DuplicateJobId`) are raised before
/// a job ever reaches the registry.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("registry cannot supply a full batch: {eligible} eligible, {required} required")]
    InsufficientEligibleJobs { eligible: usize, required: usize },

    #[error("channel {channel} availability cannot move backward ({current} -> {requested})")]
    MonotonicityViolation {
        channel: usize,
        current: f64,
        requested: f64,
    },

    #[error("invalid parameters for job {job}: {reason}")]
    InvalidJobParameters { job: JobId, reason: String },

    #[error("duplicate job id: {0}")]
    DuplicateJobId(JobId),

    #[error("job not found: {0}")]
    UnknownJob(JobId),

    #[error("invalid batch entry {index}: {reason}")]
    InvalidBatchEntry { index: usize, reason: String },

    #[error("invalid policy output: {0}")]
    InvalidPolicyOutput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("channel {channel} out of range ({count} channels)")]
    ChannelOutOfRange { channel: usize, count: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
