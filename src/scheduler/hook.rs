//! Per-tick collaborator hook.
//!
//! External models (target kinematics, clutter, operator tasking) advance
//! alongside the simulation clock and may adjust job attributes between
//! decisions. They see the registry only through [`TickContext`], whose
//! edits are validated, so a hook can never break the population invariant.

use crate::error::SimResult;
use crate::models::{Job, JobId};

use super::JobRegistry;

/// View handed to a [`TickHook`] once per tick.
pub struct TickContext<'a> {
    now: f64,
    step: f64,
    registry: &'a mut JobRegistry,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(now: f64, step: f64, registry: &'a mut JobRegistry) -> Self {
        Self {
            now,
            step,
            registry,
        }
    }

    /// Current simulated time (s).
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Clock increment per tick (s).
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Looks up a job by id.
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.registry.get(id)
    }

    /// All jobs currently in the registry.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.registry.iter()
    }

    /// Edits a job; see [`JobRegistry::update`].
    pub fn update<F>(&mut self, id: JobId, edit: F) -> SimResult<()>
    where
        F: FnOnce(&mut Job),
    {
        self.registry.update(id, edit)
    }
}

/// Called once per tick, before the scheduling decision.
///
/// An error aborts the run.
pub trait TickHook: Send {
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()>;
}

impl<F> TickHook for F
where
    F: FnMut(&mut TickContext<'_>) -> SimResult<()> + Send,
{
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        self(ctx)
    }
}
