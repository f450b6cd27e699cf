//! Input and output validation.
//!
//! Jobs are checked once, at intake, so the loop never meets a malformed
//! job. Policy outputs are checked after every decision so a faulty policy
//! cannot corrupt engine state. Detects:
//! - Duplicate job IDs
//! - Non-positive durations, negative slopes, deadlines before release
//! - Orders that are not permutations, channel overlaps, starts before release
//! - Channels moved backward
//!
//! Validation never repairs anything; it reports every problem it finds.

use std::collections::HashSet;

use crate::error::SimError;
use crate::models::{Job, JobId};
use crate::policy::{PolicyInput, PolicyOutput};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Tolerance for floating-point time comparisons.
const TIME_EPSILON: f64 = 1e-9;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Offending job, when the problem belongs to one.
    pub job: Option<JobId>,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two jobs share the same ID.
    DuplicateId,
    /// Duration is zero, negative or not finite.
    InvalidDuration,
    /// Slope is negative or NaN.
    InvalidSlope,
    /// Wait-clock origin is not finite.
    InvalidStartTime,
    /// Deadline falls before the release time or is not finite.
    InvalidDeadline,
    /// Drop penalty is negative or not finite.
    InvalidDropCost,
    /// Output arrays do not match the batch or channel count.
    LengthMismatch,
    /// Execution order is not a permutation of the batch indices.
    NotAPermutation,
    /// A job was assigned to a channel that does not exist.
    InvalidChannel,
    /// A job starts before its release time.
    StartBeforeRelease,
    /// Two jobs overlap on a channel, or a job starts before the channel is free.
    ChannelOverlap,
    /// A channel's availability moved backward.
    ChannelRewind,
    /// Reported availability is earlier than the last job on the channel ends.
    AvailabilityMismatch,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, job: Option<JobId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            job,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for SimError {
    fn from(err: ValidationError) -> Self {
        match (err.kind, err.job) {
            (ValidationErrorKind::DuplicateId, Some(id)) => SimError::DuplicateJobId(id),
            (_, Some(job)) => SimError::InvalidJobParameters {
                job,
                reason: err.message,
            },
            (_, None) => SimError::InvalidPolicyOutput(err.message),
        }
    }
}

/// Converts the first collected problem into a [`SimError`].
pub(crate) fn first_error(errors: Vec<ValidationError>) -> SimError {
    errors
        .into_iter()
        .next()
        .map(SimError::from)
        .unwrap_or_else(|| SimError::InvalidConfig("validation failed".to_string()))
}

/// Validates a single job's parameters.
///
/// An infinite slope is accepted: it parks the job permanently at the back
/// of the registry.
pub fn validate_job(job: &Job) -> ValidationResult {
    let mut errors = Vec::new();
    let id = Some(job.id);

    if !(job.duration > 0.0 && job.duration.is_finite()) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            id,
            format!("Job {} has non-positive duration {}", job.id, job.duration),
        ));
    }
    if !(job.slope >= 0.0) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSlope,
            id,
            format!("Job {} has negative slope {}", job.id, job.slope),
        ));
    }
    if !job.start_time.is_finite() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidStartTime,
            id,
            format!("Job {} has non-finite start time {}", job.id, job.start_time),
        ));
    }
    if let Some(drop) = job.drop {
        if !(drop.drop_time >= 0.0 && drop.drop_time.is_finite()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDeadline,
                id,
                format!(
                    "Job {} has deadline {} before its release time",
                    job.id, drop.drop_time
                ),
            ));
        }
        if !(drop.drop_cost >= 0.0 && drop.drop_cost.is_finite()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDropCost,
                id,
                format!("Job {} has invalid drop cost {}", job.id, drop.drop_cost),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a job population.
///
/// Checks:
/// 1. No duplicate job IDs
/// 2. Every job passes [`validate_job`]
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_jobs(jobs: &[Job]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for job in jobs {
        if !ids.insert(job.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                Some(job.id),
                format!("Duplicate job ID: {}", job.id),
            ));
        }
        if let Err(mut job_errors) = validate_job(job) {
            errors.append(&mut job_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a policy's output against the input it was given.
///
/// Checks:
/// 1. Array lengths match `N` and `K`
/// 2. `execution_order` is a permutation of `0..N`
/// 3. Every job runs on an existing channel, no earlier than its release
/// 4. Jobs on one channel do not overlap and start after the channel was free
/// 5. Each channel's reported availability neither rewinds nor undercuts its last job
pub fn validate_output(input: &PolicyInput, output: &PolicyOutput) -> ValidationResult {
    let n = input.batch_size();
    let k = input.channel_count();

    let lengths = [
        ("execution_order", output.execution_order.len(), n),
        ("execution_start_times", output.execution_start_times.len(), n),
        ("channel_assignments", output.channel_assignments.len(), n),
        ("channel_availability", output.channel_availability.len(), k),
    ];
    let length_errors: Vec<ValidationError> = lengths
        .iter()
        .filter(|(_, got, want)| got != want)
        .map(|(name, got, want)| {
            ValidationError::new(
                ValidationErrorKind::LengthMismatch,
                None,
                format!("{name} has {got} entries, expected {want}"),
            )
        })
        .collect();
    if !length_errors.is_empty() {
        return Err(length_errors);
    }

    let mut errors = Vec::new();

    let mut seen = vec![false; n];
    for &idx in &output.execution_order {
        if idx >= n || seen[idx] {
            errors.push(ValidationError::new(
                ValidationErrorKind::NotAPermutation,
                None,
                format!("execution order entry {idx} is out of range or repeated"),
            ));
        } else {
            seen[idx] = true;
        }
    }

    let mut per_channel: Vec<Vec<(f64, f64)>> = vec![Vec::new(); k];
    for (idx, job) in input.jobs.iter().enumerate() {
        let channel = output.channel_assignments[idx];
        let start = output.execution_start_times[idx];

        if channel >= k {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidChannel,
                None,
                format!("batch index {idx} assigned to channel {channel} of {k}"),
            ));
            continue;
        }
        if !(start.is_finite() && start >= job.release_time - TIME_EPSILON) {
            errors.push(ValidationError::new(
                ValidationErrorKind::StartBeforeRelease,
                None,
                format!(
                    "batch index {idx} starts at {start} before release {}",
                    job.release_time
                ),
            ));
            continue;
        }
        per_channel[channel].push((start, start + job.duration));
    }

    for (channel, spans) in per_channel.iter_mut().enumerate() {
        let initial = input.channel_availability[channel];
        let updated = output.channel_availability[channel];

        spans.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut free_at = initial;
        for &(start, end) in spans.iter() {
            if start < free_at - TIME_EPSILON {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ChannelOverlap,
                    None,
                    format!("channel {channel} starts a job at {start} while busy until {free_at}"),
                ));
            }
            free_at = free_at.max(end);
        }

        if !(updated >= initial) {
            errors.push(ValidationError::new(
                ValidationErrorKind::ChannelRewind,
                None,
                format!("channel {channel} moved backward from {initial} to {updated}"),
            ));
        } else if updated < free_at - TIME_EPSILON {
            errors.push(ValidationError::new(
                ValidationErrorKind::AvailabilityMismatch,
                None,
                format!("channel {channel} reported free at {updated}, last job ends at {free_at}"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
