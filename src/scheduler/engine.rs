//! Time-stepped simulation loop.
//!
//! # State Machine
//!
//! ```text
//! Idle(t) ──(t > horizon)──────────────────────────► Terminated
//! Idle(t) ──(all channels busy at t)───────────────► Idle(t + step)
//! Idle(t) ──(fewer than N eligible jobs)───────────► Idle(t + step)
//! Idle(t) ──► Deciding(t) ──(policy output applied)► Idle(t + step)
//!                  └────────(policy fault)─────────► Terminated
//! ```
//!
//! `step = resource_period / channel_count` and the clock is always
//! `origin + tick * step`, so long runs do not accumulate rounding drift.
//! No wall-clock waiting happens anywhere.
//!
//! # Decision
//!
//! 1. Run the tick hook (collaborator state advances with the clock).
//! 2. Refresh priorities and detach the top-`N` batch.
//! 3. Raise idle channels to `t` and call the policy.
//! 4. Validate the output; on success commit channels, reset each job's
//!    wait clock to its completion time and reinsert the batch.
//!
//! A policy fault (error, channel rewind, malformed output) restores the
//! batch untouched, leaves channels as they were, and terminates the run.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 9 (online scheduling)

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::hook::{TickContext, TickHook};
use super::registry::Batch;
use super::{Checkpoint, JobRegistry, RunHistory, RunMetrics};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::models::{Assignment, ChannelState, Job, TickRecord};
use crate::policy::{AssignmentPolicy, PolicyInput};
use crate::validation::{first_error, validate_output};

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimState {
    /// Waiting to process the tick at `t`.
    Idle(f64),
    /// Running the policy for the tick at `t`.
    Deciding(f64),
    /// No further ticks will be processed.
    Terminated,
}

/// Why a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The clock passed the configured horizon.
    Horizon,
    /// [`Simulation::stop`] or a `run_until` predicate.
    Stopped,
    /// A fatal error (policy fault or hook error).
    Aborted,
}

/// Result of one [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A batch was assigned.
    Decided { cost: f64, dropped: usize },
    /// Every channel was busy past the tick time.
    ChannelsBusy,
    /// Fewer than `N` jobs were eligible.
    InsufficientJobs { eligible: usize },
    /// The run is over; the clock did not move.
    Terminated,
}

/// A simulation run driven by an assignment policy.
///
/// # Example
/// ```
/// use revisit_sched::config::SimulationConfig;
/// use revisit_sched::models::Job;
/// use revisit_sched::policy::EarliestStartTime;
/// use revisit_sched::scheduler::Simulation;
///
/// let config = SimulationConfig::new()
///     .with_resource_period(1.0)
///     .with_batch_size(2)
///     .with_horizon(3.0);
/// let jobs = vec![
///     Job::new(1, 0.5).with_slope(1.0),
///     Job::new(2, 0.5).with_slope(2.0),
/// ];
///
/// let mut sim = Simulation::new(config, jobs, EarliestStartTime).unwrap();
/// let history = sim.run().unwrap();
/// assert_eq!(history.decisions(), 4);
/// assert_eq!(sim.registry().len(), 2);
/// ```
pub struct Simulation<P: AssignmentPolicy = Box<dyn AssignmentPolicy>> {
    config: SimulationConfig,
    registry: JobRegistry,
    channels: ChannelState,
    policy: P,
    hook: Option<Box<dyn TickHook>>,
    state: SimState,
    stop_reason: Option<StopReason>,
    origin: f64,
    tick: u64,
    history_start: f64,
    history: RunHistory,
}

impl Simulation<Box<dyn AssignmentPolicy>> {
    /// Creates a run using the policy selected in `config`.
    pub fn from_config(config: SimulationConfig, jobs: impl IntoIterator<Item = Job>) -> SimResult<Self> {
        let policy = config.policy.build();
        Self::new(config, jobs, policy)
    }
}

impl<P: AssignmentPolicy> Simulation<P> {
    /// Creates a run at `config.start_time` with all channels free.
    ///
    /// # Errors
    /// `InvalidConfig` for a bad configuration; `DuplicateJobId` or
    /// `InvalidJobParameters` for a bad population.
    pub fn new(config: SimulationConfig, jobs: impl IntoIterator<Item = Job>, policy: P) -> SimResult<Self> {
        config.validate()?;
        let registry = JobRegistry::from_jobs(jobs)?;
        let channels = ChannelState::starting_at(config.channel_count, config.start_time);
        let origin = config.start_time;
        Ok(Self::assemble(config, registry, channels, policy, origin, 0))
    }

    /// Continues a run from a checkpoint with a freshly built policy.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration is invalid, its channel count
    /// does not match the checkpoint, or the checkpoint clock disagrees with
    /// `origin + tick * step`.
    pub fn resume(config: SimulationConfig, checkpoint: Checkpoint, policy: P) -> SimResult<Self> {
        config.validate()?;
        if checkpoint.channels.len() != config.channel_count {
            return Err(SimError::InvalidConfig(format!(
                "checkpoint has {} channels, configuration has {}",
                checkpoint.channels.len(),
                config.channel_count
            )));
        }
        if !checkpoint.origin.is_finite() {
            return Err(SimError::InvalidConfig(format!(
                "checkpoint origin must be finite, got {}",
                checkpoint.origin
            )));
        }
        let expected_now = checkpoint.origin + checkpoint.tick as f64 * config.step();
        if !((checkpoint.now - expected_now).abs() <= 1e-9 * expected_now.abs().max(1.0)) {
            return Err(SimError::InvalidConfig(format!(
                "checkpoint clock {} does not match tick {} of this configuration ({expected_now})",
                checkpoint.now, checkpoint.tick
            )));
        }
        Ok(Self::assemble(
            config,
            checkpoint.registry,
            checkpoint.channels,
            policy,
            checkpoint.origin,
            checkpoint.tick,
        ))
    }

    fn assemble(
        config: SimulationConfig,
        registry: JobRegistry,
        channels: ChannelState,
        policy: P,
        origin: f64,
        tick: u64,
    ) -> Self {
        if registry.len() < config.batch_size {
            warn!(
                population = registry.len(),
                batch_size = config.batch_size,
                "population smaller than batch size, no decision can be made"
            );
        }
        let now = origin + tick as f64 * config.step();
        Self {
            config,
            registry,
            channels,
            policy,
            hook: None,
            state: SimState::Idle(now),
            stop_reason: None,
            origin,
            tick,
            history_start: now,
            history: RunHistory::starting_at(now),
        }
    }

    /// Installs a hook called once per tick before the decision.
    pub fn with_hook<H: TickHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current state of the run.
    pub fn state(&self) -> SimState {
        self.state
    }

    /// Why the run stopped (`None` while running).
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Whether the run has stopped.
    pub fn is_terminated(&self) -> bool {
        self.state == SimState::Terminated
    }

    /// Clock value of the current (next unprocessed) tick.
    pub fn now(&self) -> f64 {
        self.origin + self.tick as f64 * self.step_size()
    }

    /// Clock increment per tick.
    pub fn step_size(&self) -> f64 {
        self.config.step()
    }

    /// Ticks processed since the run origin.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The job population.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Committed channel availability.
    pub fn channels(&self) -> &ChannelState {
        &self.channels
    }

    /// Decisions and skips so far.
    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    /// The assignment policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Consumes the run, keeping only its history.
    pub fn into_history(self) -> RunHistory {
        self.history
    }

    /// Simulated time covered by this run's history.
    pub fn elapsed(&self) -> f64 {
        (self.now() - self.history_start).max(0.0)
    }

    /// Metrics over the history so far.
    pub fn metrics(&self) -> RunMetrics {
        RunMetrics::calculate(
            &self.history,
            &self.registry.snapshot(),
            self.config.channel_count,
            self.elapsed(),
        )
    }

    /// Snapshot sufficient to resume deterministically.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            now: self.now(),
            origin: self.origin,
            tick: self.tick,
            registry: self.registry.clone(),
            channels: self.channels.clone(),
        }
    }

    /// Processes one tick.
    ///
    /// # Errors
    /// A policy fault or hook error; the run is then `Terminated` with
    /// [`StopReason::Aborted`], the registry still holds every job and the
    /// channels are unchanged.
    pub fn step(&mut self) -> SimResult<TickOutcome> {
        let now = match self.state {
            SimState::Terminated => return Ok(TickOutcome::Terminated),
            SimState::Idle(t) | SimState::Deciding(t) => t,
        };
        if now > self.config.horizon {
            self.finish(StopReason::Horizon);
            return Ok(TickOutcome::Terminated);
        }

        let step = self.config.step();
        let hook_result = match self.hook.as_mut() {
            Some(hook) => hook.on_tick(&mut TickContext::new(now, step, &mut self.registry)),
            None => Ok(()),
        };
        if let Err(e) = hook_result {
            return Err(self.abort(e));
        }

        let outcome = if self.channels.earliest() > now {
            self.history.skipped_busy += 1;
            trace!(time = now, "all channels busy, tick skipped");
            TickOutcome::ChannelsBusy
        } else {
            self.registry.refresh_priorities(now);
            match self.registry.select_batch(self.config.batch_size) {
                Ok(batch) => self.decide(now, batch)?,
                Err(SimError::InsufficientEligibleJobs { eligible, .. }) => {
                    self.history.skipped_starved += 1;
                    trace!(time = now, eligible, "not enough eligible jobs, tick skipped");
                    TickOutcome::InsufficientJobs { eligible }
                }
                Err(e) => return Err(self.abort(e)),
            }
        };

        self.tick += 1;
        self.state = SimState::Idle(self.now());
        Ok(outcome)
    }

    fn decide(&mut self, now: f64, mut batch: Batch) -> SimResult<TickOutcome> {
        self.state = SimState::Deciding(now);

        let mut channels = self.channels.clone();
        channels.catch_up(now);
        let input = PolicyInput::from_jobs(batch.jobs(), &channels);

        let started = Instant::now();
        let result = self.policy.assign(&input);
        let policy_runtime = started.elapsed();

        let checked = result.and_then(|output| {
            channels.advance_all(&output.channel_availability)?;
            validate_output(&input, &output).map_err(first_error)?;
            Ok(output)
        });
        let output = match checked {
            Ok(output) => output,
            Err(e) => {
                self.registry.restore(batch);
                return Err(self.abort(e));
            }
        };

        let assignments: Vec<Assignment> = {
            let jobs: Vec<&Job> = batch.jobs().collect();
            output
                .execution_order
                .iter()
                .map(|&idx| {
                    let job = jobs[idx];
                    let entry = &input.jobs[idx];
                    let start = output.execution_start_times[idx];
                    Assignment {
                        job_id: job.id,
                        job_type: job.job_type.clone(),
                        channel: output.channel_assignments[idx],
                        start,
                        end: start + job.duration,
                        cost: entry.cost_at(start),
                        dropped: entry.is_dropped_at(start),
                    }
                })
                .collect()
        };

        for (job, &start) in batch.jobs_mut().zip(&output.execution_start_times) {
            job.start_time = start + job.duration;
        }

        debug!(
            time = now,
            jobs = ?batch.ids(),
            cost = output.cost,
            dropped = output.num_dropped,
            "batch assigned"
        );

        self.channels = channels;
        self.registry.reinsert(batch);
        self.history.record(TickRecord {
            time: now,
            assignments,
            cost: output.cost,
            num_dropped: output.num_dropped,
            channel_availability: output.channel_availability,
            policy_runtime,
        });

        Ok(TickOutcome::Decided {
            cost: output.cost,
            dropped: output.num_dropped,
        })
    }

    /// Runs until the horizon.
    pub fn run(&mut self) -> SimResult<&RunHistory> {
        self.log_start();
        while !matches!(self.step()?, TickOutcome::Terminated) {}
        Ok(&self.history)
    }

    /// Runs until the horizon or until `predicate` holds before a tick, in
    /// which case the run is stopped.
    pub fn run_until<F>(&mut self, mut predicate: F) -> SimResult<&RunHistory>
    where
        F: FnMut(&Self) -> bool,
    {
        self.log_start();
        while !self.is_terminated() {
            if predicate(self) {
                self.stop();
                break;
            }
            self.step()?;
        }
        Ok(&self.history)
    }

    /// Processes at most `n` ticks; returns how many were processed.
    pub fn run_ticks(&mut self, n: usize) -> SimResult<usize> {
        let mut processed = 0;
        while processed < n {
            if matches!(self.step()?, TickOutcome::Terminated) {
                break;
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Terminates the run early. Registry, channels and history stay
    /// consistent and inspectable.
    pub fn stop(&mut self) {
        if !self.is_terminated() {
            warn!(
                time = self.now(),
                decisions = self.history.decisions(),
                "simulation stopped early"
            );
            self.state = SimState::Terminated;
            self.stop_reason = Some(StopReason::Stopped);
        }
    }

    fn log_start(&self) {
        info!(
            policy = self.policy.name(),
            channels = self.config.channel_count,
            batch_size = self.config.batch_size,
            population = self.registry.len(),
            time = self.now(),
            horizon = self.config.horizon,
            "simulation started"
        );
    }

    fn finish(&mut self, reason: StopReason) {
        self.state = SimState::Terminated;
        self.stop_reason = Some(reason);
        info!(
            ?reason,
            time = self.now(),
            decisions = self.history.decisions(),
            total_cost = self.history.total_cost(),
            dropped = self.history.total_dropped(),
            "simulation finished"
        );
    }

    fn abort(&mut self, error: SimError) -> SimError {
        warn!(
            error = %error,
            time = self.now(),
            policy = self.policy.name(),
            "simulation aborted"
        );
        self.state = SimState::Terminated;
        self.stop_reason = Some(StopReason::Aborted);
        error
    }
}

impl<P: AssignmentPolicy> fmt::Debug for Simulation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("population", &self.registry.len())
            .field("channels", &self.channels)
            .field("decisions", &self.history.decisions())
            .finish()
    }
}
