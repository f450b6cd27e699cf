//! Job registry.
//!
//! The authoritative, closed population of jobs. Jobs leave the registry
//! only as a [`Batch`] for one decision and always come back through
//! [`JobRegistry::reinsert`] or [`JobRegistry::restore`], so the population
//! count never changes during a run.
//!
//! # Priority
//!
//! Every tick, `priority = linear_cost(now, slope, start_time)`. A job that
//! cannot be offered to a batch gets `-inf` and sorts last:
//! - the job is still executing (`ActiveThisTick` until its completion time)
//! - the job has an infinite slope (parked)
//!
//! # Tie-Breaking
//! Equal priorities are ordered by registration order, which survives
//! reinsertion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cost::linear_cost;
use crate::error::{SimError, SimResult};
use crate::models::{Job, JobId, JobStatus};
use crate::validation::{first_error, validate_job, validate_jobs};

/// A registered job and its registration ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegistryEntry {
    ordinal: u64,
    job: Job,
}

/// Jobs detached from the registry for one decision, in priority order.
#[derive(Debug, Clone)]
pub struct Batch {
    entries: Vec<RegistryEntry>,
}

impl Batch {
    /// Number of jobs in the batch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Jobs in batch order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.entries.iter().map(|e| &e.job)
    }

    /// Mutable jobs in batch order.
    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.entries.iter_mut().map(|e| &mut e.job)
    }

    /// Job ids in batch order.
    pub fn ids(&self) -> Vec<JobId> {
        self.entries.iter().map(|e| e.job.id).collect()
    }
}

/// Closed population of jobs keyed by stable id.
///
/// # Example
/// ```
/// use revisit_sched::models::Job;
/// use revisit_sched::scheduler::JobRegistry;
///
/// let mut registry = JobRegistry::from_jobs(vec![
///     Job::new(1, 0.1).with_slope(1.0),
///     Job::new(2, 0.1).with_slope(3.0),
///     Job::new(3, 0.1).with_slope(f64::INFINITY),
/// ])
/// .unwrap();
///
/// registry.refresh_priorities(2.0);
/// assert_eq!(registry.eligible_count(), 2);
///
/// let batch = registry.select_batch(2).unwrap();
/// assert_eq!(batch.ids(), vec![2, 1]);
/// registry.reinsert(batch);
/// assert_eq!(registry.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegistryRepr", into = "RegistryRepr")]
pub struct JobRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<JobId, usize>,
    next_ordinal: u64,
}

#[derive(Serialize, Deserialize)]
struct RegistryRepr {
    entries: Vec<RegistryEntry>,
    next_ordinal: u64,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            next_ordinal: 0,
        }
    }

    /// Builds a registry from an initial population.
    ///
    /// # Errors
    /// The first intake problem found (`DuplicateJobId` or `InvalidJobParameters`).
    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> SimResult<Self> {
        let jobs: Vec<Job> = jobs.into_iter().collect();
        validate_jobs(&jobs).map_err(first_error)?;

        let mut registry = Self::new();
        for job in jobs {
            registry.push(job);
        }
        Ok(registry)
    }

    /// Adds a job to the population.
    pub fn register(&mut self, job: Job) -> SimResult<()> {
        if self.index.contains_key(&job.id) {
            return Err(SimError::DuplicateJobId(job.id));
        }
        validate_job(&job).map_err(first_error)?;
        self.push(job);
        Ok(())
    }

    fn push(&mut self, mut job: Job) {
        canonicalize(&mut job);
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.index.insert(job.id, self.entries.len());
        self.entries.push(RegistryEntry { ordinal, job });
    }

    /// Number of jobs currently in the registry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no jobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a job with this id is registered.
    pub fn contains(&self, id: JobId) -> bool {
        self.index.contains_key(&id)
    }

    /// Looks up a job by id.
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.index.get(&id).map(|&i| &self.entries[i].job)
    }

    /// Iterates over jobs in storage order (priority order after a selection).
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.entries.iter().map(|e| &e.job)
    }

    /// Copies of all jobs in registration order.
    pub fn snapshot(&self) -> Vec<Job> {
        let mut entries: Vec<&RegistryEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.ordinal);
        entries.into_iter().map(|e| e.job.clone()).collect()
    }

    /// Applies an edit to a job, keeping it only if the result is still valid.
    ///
    /// # Errors
    /// `UnknownJob` if the id is not registered; `InvalidJobParameters` if the
    /// edit changes the id or produces invalid parameters (the job is left
    /// unchanged).
    pub fn update<F>(&mut self, id: JobId, edit: F) -> SimResult<()>
    where
        F: FnOnce(&mut Job),
    {
        let &slot = self.index.get(&id).ok_or(SimError::UnknownJob(id))?;
        let mut candidate = self.entries[slot].job.clone();
        edit(&mut candidate);

        if candidate.id != id {
            return Err(SimError::InvalidJobParameters {
                job: id,
                reason: "job id is immutable".to_string(),
            });
        }
        validate_job(&candidate).map_err(first_error)?;
        canonicalize(&mut candidate);
        self.entries[slot].job = candidate;
        Ok(())
    }

    /// Recomputes every job's priority at `now`.
    ///
    /// Jobs whose completion time has passed return to `Pending` first.
    pub fn refresh_priorities(&mut self, now: f64) {
        for entry in &mut self.entries {
            let job = &mut entry.job;
            if job.status == JobStatus::ActiveThisTick && now >= job.start_time {
                job.status = JobStatus::Pending;
            }

            job.priority = if job.status == JobStatus::ActiveThisTick || job.slope.is_infinite() {
                f64::NEG_INFINITY
            } else {
                let cost = linear_cost(now, job.slope, job.start_time);
                if cost.is_finite() {
                    cost
                } else {
                    f64::NEG_INFINITY
                }
            };
        }
    }

    /// Number of jobs with a finite priority.
    pub fn eligible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.job.is_eligible()).count()
    }

    /// Removes the `n` highest-priority eligible jobs.
    ///
    /// Uses the priorities from the last [`refresh_priorities`](Self::refresh_priorities).
    ///
    /// # Errors
    /// `InsufficientEligibleJobs` if fewer than `n` jobs are eligible; the
    /// registry is left unchanged.
    pub fn select_batch(&mut self, n: usize) -> SimResult<Batch> {
        let eligible = self.eligible_count();
        if eligible < n {
            return Err(SimError::InsufficientEligibleJobs {
                eligible,
                required: n,
            });
        }

        self.entries.sort_by(|a, b| {
            sort_key(&b.job)
                .total_cmp(&sort_key(&a.job))
                .then(a.ordinal.cmp(&b.ordinal))
        });
        let entries: Vec<RegistryEntry> = self.entries.drain(..n).collect();
        self.rebuild_index();
        Ok(Batch { entries })
    }

    /// Returns serviced jobs to the registry.
    ///
    /// Each job is marked `ActiveThisTick` until the clock reaches its
    /// `start_time` (its completion time).
    pub fn reinsert(&mut self, mut batch: Batch) {
        for job in batch.jobs_mut() {
            job.status = JobStatus::ActiveThisTick;
        }
        self.restore(batch);
    }

    /// Returns a batch to the registry without changing any job.
    pub fn restore(&mut self, batch: Batch) {
        for entry in batch.entries {
            self.index.insert(entry.job.id, self.entries.len());
            self.entries.push(entry);
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.job.id, i);
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl From<JobRegistry> for RegistryRepr {
    fn from(registry: JobRegistry) -> Self {
        Self {
            entries: registry.entries,
            next_ordinal: registry.next_ordinal,
        }
    }
}

impl TryFrom<RegistryRepr> for JobRegistry {
    type Error = SimError;

    fn try_from(repr: RegistryRepr) -> SimResult<Self> {
        let jobs: Vec<Job> = repr.entries.iter().map(|e| e.job.clone()).collect();
        validate_jobs(&jobs).map_err(first_error)?;

        let max_ordinal = repr.entries.iter().map(|e| e.ordinal + 1).max().unwrap_or(0);
        let mut entries = repr.entries;
        for entry in &mut entries {
            canonicalize(&mut entry.job);
        }
        let mut registry = Self {
            entries,
            index: HashMap::new(),
            next_ordinal: repr.next_ordinal.max(max_ordinal),
        };
        registry.rebuild_index();
        Ok(registry)
    }
}

/// Ineligible jobs sort last regardless of a stale or NaN priority.
///
/// `-0.0` is folded into `0.0` so `total_cmp` treats equal priorities as a tie.
fn sort_key(job: &Job) -> f64 {
    if job.is_eligible() {
        job.priority + 0.0
    } else {
        f64::NEG_INFINITY
    }
}

/// Folds signed zeros so stored parameters compare equal to their positive form.
fn canonicalize(job: &mut Job) {
    job.slope += 0.0;
    job.start_time += 0.0;
    if let Some(drop) = job.drop.as_mut() {
        drop.drop_time += 0.0;
        drop.drop_cost += 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry(slopes: &[f64]) -> JobRegistry {
        JobRegistry::from_jobs(
            slopes
                .iter()
                .enumerate()
                .map(|(i, &s)| Job::new(i as JobId + 1, 0.25).with_slope(s)),
        )
        .unwrap()
    }

    #[test]
    fn test_from_jobs_rejects_duplicates() {
        let err = JobRegistry::from_jobs(vec![Job::new(1, 1.0), Job::new(1, 1.0)]).unwrap_err();
        assert!(matches!(err, SimError::DuplicateJobId(1)));
    }

    #[test]
    fn test_from_jobs_rejects_invalid() {
        let err = JobRegistry::from_jobs(vec![Job::new(3, -1.0)]).unwrap_err();
        assert!(matches!(err, SimError::InvalidJobParameters { job: 3, .. }));
    }

    #[test]
    fn test_register_and_get() {
        let mut reg = JobRegistry::new();
        reg.register(Job::new(5, 0.5).with_slope(2.0)).unwrap();
        assert!(matches!(
            reg.register(Job::new(5, 0.5)),
            Err(SimError::DuplicateJobId(5))
        ));
        assert_eq!(reg.len(), 1);
        assert!((reg.get(5).unwrap().slope - 2.0).abs() < 1e-10);
        assert!(reg.get(6).is_none());
    }

    #[test]
    fn test_refresh_priorities() {
        let mut reg = JobRegistry::from_jobs(vec![
            Job::new(1, 0.1).with_slope(2.0).with_start_time(1.0),
            Job::new(2, 0.1).with_slope(0.5),
        ])
        .unwrap();
        reg.refresh_priorities(3.0);
        assert!((reg.get(1).unwrap().priority - 4.0).abs() < 1e-10);
        assert!((reg.get(2).unwrap().priority - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_infinite_slope_sorts_last() {
        let mut reg = registry(&[f64::INFINITY, 0.1, 0.0]);
        for now in [0.0, 1.0, 1e6] {
            reg.refresh_priorities(now);
            assert_eq!(reg.get(1).unwrap().priority, f64::NEG_INFINITY);
        }
        assert_eq!(reg.eligible_count(), 2);

        let batch = reg.select_batch(2).unwrap();
        assert!(!batch.ids().contains(&1));
    }

    #[test]
    fn test_select_batch_priority_then_registration() {
        let mut reg = registry(&[1.0, 3.0, 1.0, 3.0]);
        reg.refresh_priorities(1.0);
        let batch = reg.select_batch(3).unwrap();
        assert_eq!(batch.ids(), vec![2, 4, 1]);
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(3));
    }

    #[test]
    fn test_negative_zero_slope_ties_by_registration() {
        let mut reg = registry(&[-0.0, 0.0]);
        assert!(reg.get(1).unwrap().slope.is_sign_positive());

        reg.refresh_priorities(5.0);
        assert_eq!(reg.select_batch(1).unwrap().ids(), vec![1]);
    }

    #[test]
    fn test_negative_zero_priority_ties_by_registration() {
        let mut reg = registry(&[0.0, 0.0]);
        reg.refresh_priorities(5.0);
        reg.entries[0].job.priority = -0.0;
        assert_eq!(reg.select_batch(1).unwrap().ids(), vec![1]);
    }

    #[test]
    fn test_select_batch_insufficient() {
        let mut reg = registry(&[1.0, f64::INFINITY]);
        reg.refresh_priorities(1.0);
        let err = reg.select_batch(2).unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientEligibleJobs {
                eligible: 1,
                required: 2
            }
        ));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_reinsert_marks_active_until_completion() {
        let mut reg = registry(&[1.0, 1.0]);
        reg.refresh_priorities(0.0);
        let mut batch = reg.select_batch(1).unwrap();
        for job in batch.jobs_mut() {
            job.start_time = 0.5;
        }
        reg.reinsert(batch);
        assert_eq!(reg.get(1).unwrap().status, JobStatus::ActiveThisTick);

        reg.refresh_priorities(0.25);
        assert_eq!(reg.get(1).unwrap().priority, f64::NEG_INFINITY);
        assert_eq!(reg.eligible_count(), 1);

        reg.refresh_priorities(0.5);
        assert_eq!(reg.get(1).unwrap().status, JobStatus::Pending);
        assert_eq!(reg.eligible_count(), 2);
    }

    #[test]
    fn test_tie_order_survives_reinsert() {
        let mut reg = registry(&[1.0, 1.0, 1.0]);
        reg.refresh_priorities(0.0);
        let batch = reg.select_batch(1).unwrap();
        assert_eq!(batch.ids(), vec![1]);
        reg.restore(batch);

        // Job 1 is now stored last but still wins the tie.
        reg.refresh_priorities(0.0);
        assert_eq!(reg.select_batch(1).unwrap().ids(), vec![1]);
    }

    #[test]
    fn test_update_validated() {
        let mut reg = registry(&[1.0]);
        reg.update(1, |job| job.drop = Some(crate::models::DropPolicy {
            drop_time: 2.0,
            drop_cost: 10.0,
        }))
        .unwrap();
        assert_eq!(reg.get(1).unwrap().deadline(), Some(2.0));

        let err = reg.update(1, |job| job.duration = 0.0).unwrap_err();
        assert!(matches!(err, SimError::InvalidJobParameters { job: 1, .. }));
        assert!((reg.get(1).unwrap().duration - 0.25).abs() < 1e-10);

        assert!(matches!(reg.update(1, |job| job.id = 9), Err(SimError::InvalidJobParameters { .. })));
        assert!(matches!(reg.update(42, |_| {}), Err(SimError::UnknownJob(42))));
    }

    #[test]
    fn test_snapshot_registration_order() {
        let mut reg = registry(&[1.0, 5.0, 3.0]);
        reg.refresh_priorities(1.0);
        let batch = reg.select_batch(3).unwrap();
        reg.reinsert(batch);
        let ids: Vec<JobId> = reg.snapshot().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut reg = registry(&[1.0, 2.0]);
        reg.refresh_priorities(1.0);
        let batch = reg.select_batch(1).unwrap();
        reg.reinsert(batch);

        let json = serde_json::to_string(&reg).unwrap();
        let mut restored: JobRegistry = serde_json::from_str(&json).unwrap();
        reg.refresh_priorities(1.5);
        restored.refresh_priorities(1.5);
        assert_eq!(restored, reg);
        assert_eq!(restored.get(2).unwrap().status, JobStatus::ActiveThisTick);
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let json = r#"{"entries":[
            {"ordinal":0,"job":{"id":1,"slope":1.0,"start_time":0.0,"drop":null,"duration":1.0,"job_type":"Search","priority":0.0,"status":"Pending"}},
            {"ordinal":1,"job":{"id":1,"slope":1.0,"start_time":0.0,"drop":null,"duration":1.0,"job_type":"Search","priority":0.0,"status":"Pending"}}
        ],"next_ordinal":2}"#;
        assert!(serde_json::from_str::<JobRegistry>(json).is_err());
    }

    proptest! {
        #[test]
        fn prop_population_conserved(
            slopes in prop::collection::vec(0.0f64..5.0, 1..12),
            n in 0usize..12,
            rounds in 1usize..6,
        ) {
            let mut reg = registry(&slopes);
            let total = reg.len();
            let mut now = 0.0;
            for _ in 0..rounds {
                now += 0.5;
                reg.refresh_priorities(now);
                match reg.select_batch(n) {
                    Ok(mut batch) => {
                        prop_assert_eq!(batch.len(), n);
                        prop_assert_eq!(reg.len() + batch.len(), total);
                        for job in batch.jobs_mut() {
                            job.start_time = now + job.duration;
                        }
                        reg.reinsert(batch);
                    }
                    Err(SimError::InsufficientEligibleJobs { .. }) => {}
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                }
                prop_assert_eq!(reg.len(), total);
            }
        }
    }
}
