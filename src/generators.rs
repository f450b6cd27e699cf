//! Job-generation collaborators.
//!
//! Generators build the initial population handed to the registry. The
//! engine only relies on the shape of [`Job`]; where parameters come from is
//! up to the generator.
//!
//! # Generators
//!
//! | Generator | Population |
//! |-----------|-----------|
//! | [`UniformJobGenerator`] | Independent uniform draws per parameter |
//! | [`SurveillanceMix`] | Search sweeps plus tiered target tracks |

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::{DropPolicy, Job, JobId, JobType};

/// Builds a job population.
pub trait JobGenerator {
    /// Generates jobs with sequential ids starting at `first_id`.
    fn generate<R: Rng>(&self, first_id: JobId, rng: &mut R) -> Vec<Job>;

    /// Generates with a seeded RNG, reproducibly.
    fn generate_seeded(&self, first_id: JobId, seed: u64) -> Vec<Job> {
        let mut rng = SmallRng::seed_from_u64(seed);
        self.generate(first_id, &mut rng)
    }
}

/// Uniform draw from `[lo, hi)`; a degenerate range yields `lo`.
fn sample<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}

/// Limits for the optional deadline and penalty draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropLimits {
    /// Deadline offset limits (s).
    pub drop_time: (f64, f64),
    /// Penalty limits.
    pub drop_cost: (f64, f64),
}

/// Draws every parameter independently and uniformly.
///
/// Limits are not checked here; out-of-range jobs are rejected when they
/// enter the registry.
///
/// # Example
/// ```
/// use revisit_sched::generators::{JobGenerator, UniformJobGenerator};
///
/// let jobs = UniformJobGenerator::linear_drop(8).generate_seeded(1, 42);
/// assert_eq!(jobs.len(), 8);
/// assert!(jobs.iter().all(|j| j.duration >= 3.0 && j.duration < 6.0));
/// assert!(jobs.iter().all(|j| j.drop.is_some()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformJobGenerator {
    /// Number of jobs per call.
    pub count: usize,
    pub duration: (f64, f64),
    /// Wait-clock origin limits.
    pub release: (f64, f64),
    pub slope: (f64, f64),
    /// `None` = no drop semantics.
    pub drop: Option<DropLimits>,
    pub job_type: JobType,
}

impl UniformJobGenerator {
    /// Linear-cost jobs: duration (3, 6), release (0, 4), slope (0.5, 2).
    pub fn linear(count: usize) -> Self {
        Self {
            count,
            duration: (3.0, 6.0),
            release: (0.0, 4.0),
            slope: (0.5, 2.0),
            drop: None,
            job_type: JobType::Search,
        }
    }

    /// Linear jobs plus deadline (6, 12) and penalty (35, 50).
    pub fn linear_drop(count: usize) -> Self {
        Self::linear(count).with_drop_limits((6.0, 12.0), (35.0, 50.0))
    }

    /// Sets the duration limits (s).
    pub fn with_duration(mut self, lo: f64, hi: f64) -> Self {
        self.duration = (lo, hi);
        self
    }

    /// Sets the wait-clock origin limits (s).
    pub fn with_release(mut self, lo: f64, hi: f64) -> Self {
        self.release = (lo, hi);
        self
    }

    /// Sets the slope limits.
    pub fn with_slope(mut self, lo: f64, hi: f64) -> Self {
        self.slope = (lo, hi);
        self
    }

    /// Enables drop semantics with deadline and penalty limits.
    pub fn with_drop_limits(mut self, drop_time: (f64, f64), drop_cost: (f64, f64)) -> Self {
        self.drop = Some(DropLimits {
            drop_time,
            drop_cost,
        });
        self
    }

    /// Sets the type of every generated job.
    pub fn with_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }
}

impl JobGenerator for UniformJobGenerator {
    fn generate<R: Rng>(&self, first_id: JobId, rng: &mut R) -> Vec<Job> {
        (0..self.count as JobId)
            .map(|offset| {
                let mut job = Job::new(first_id + offset, sample(rng, self.duration))
                    .with_start_time(sample(rng, self.release))
                    .with_slope(sample(rng, self.slope))
                    .with_type(self.job_type.clone());
                if let Some(limits) = self.drop {
                    job = job.with_drop(sample(rng, limits.drop_time), sample(rng, limits.drop_cost));
                }
                job
            })
            .collect()
    }
}

/// One class of target tracks sharing a revisit requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackTier {
    /// Tier label (lower = more important).
    pub tier: u8,
    /// Tracks in this tier.
    pub count: usize,
    /// Desired revisit interval (s); the slope is its inverse.
    pub revisit_interval: f64,
    /// Dwell duration (s).
    pub duration: f64,
    /// Track-loss deadline and penalty.
    pub drop: Option<DropPolicy>,
}

/// Surveillance workload: search beams plus tiered tracks.
///
/// Every job's slope is `1 / revisit_interval`, so urgency reaches 1 exactly
/// when a revisit is due. Start times are jittered by up to `jitter` after
/// `start_time` so jobs do not all fall due on the same tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveillanceMix {
    /// Search beam positions.
    pub search_count: usize,
    /// Frame time of the search volume (s).
    pub search_revisit_interval: f64,
    /// Search dwell duration (s).
    pub search_duration: f64,
    pub tiers: Vec<TrackTier>,
    /// Earliest wait-clock origin (s).
    pub start_time: f64,
    /// Maximum start-time jitter (s).
    pub jitter: f64,
}

impl Default for SurveillanceMix {
    fn default() -> Self {
        Self {
            search_count: 20,
            search_revisit_interval: 2.0,
            search_duration: 0.036,
            tiers: vec![
                TrackTier {
                    tier: 0,
                    count: 4,
                    revisit_interval: 0.5,
                    duration: 0.018,
                    drop: Some(DropPolicy {
                        drop_time: 1.5,
                        drop_cost: 100.0,
                    }),
                },
                TrackTier {
                    tier: 1,
                    count: 8,
                    revisit_interval: 1.0,
                    duration: 0.018,
                    drop: Some(DropPolicy {
                        drop_time: 3.0,
                        drop_cost: 50.0,
                    }),
                },
            ],
            start_time: 0.0,
            jitter: 0.04,
        }
    }
}

impl SurveillanceMix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search beam count, frame time and dwell.
    pub fn with_search(mut self, count: usize, revisit_interval: f64, duration: f64) -> Self {
        self.search_count = count;
        self.search_revisit_interval = revisit_interval;
        self.search_duration = duration;
        self
    }

    /// Replaces the track tiers.
    pub fn with_tiers(mut self, tiers: Vec<TrackTier>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Sets the earliest wait-clock origin (s).
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the maximum start-time jitter (s).
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total jobs per call.
    pub fn population(&self) -> usize {
        self.search_count + self.tiers.iter().map(|t| t.count).sum::<usize>()
    }
}

fn slope_for(revisit_interval: f64) -> f64 {
    if revisit_interval > 0.0 {
        1.0 / revisit_interval
    } else {
        0.0
    }
}

impl JobGenerator for SurveillanceMix {
    fn generate<R: Rng>(&self, first_id: JobId, rng: &mut R) -> Vec<Job> {
        let window = (self.start_time, self.start_time + self.jitter);
        let mut jobs = Vec::with_capacity(self.population());
        let mut next_id = first_id;

        for _ in 0..self.search_count {
            jobs.push(
                Job::new(next_id, self.search_duration)
                    .with_slope(slope_for(self.search_revisit_interval))
                    .with_start_time(sample(rng, window))
                    .with_type(JobType::Search),
            );
            next_id += 1;
        }

        for tier in &self.tiers {
            for _ in 0..tier.count {
                let mut job = Job::new(next_id, tier.duration)
                    .with_slope(slope_for(tier.revisit_interval))
                    .with_start_time(sample(rng, window))
                    .with_type(JobType::Track(tier.tier));
                job.drop = tier.drop;
                jobs.push(job);
                next_id += 1;
            }
        }

        jobs
    }
}
