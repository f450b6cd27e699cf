//! Random sequencing baseline.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{list_schedule, AssignmentPolicy, PolicyInput, PolicyOutput};
use crate::error::SimResult;

/// Places the batch in a uniformly random order.
///
/// Seeded, so a run is reproducible. The RNG advances across calls, which
/// is private policy state and never touches the engine.
#[derive(Debug, Clone)]
pub struct RandomSequencer {
    seed: u64,
    rng: SmallRng,
}

impl RandomSequencer {
    /// Creates a sequencer with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The seed this sequencer was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl AssignmentPolicy for RandomSequencer {
    fn name(&self) -> &'static str {
        "RANDOM"
    }

    fn assign(&mut self, input: &PolicyInput) -> SimResult<PolicyOutput> {
        input.check()?;
        let mut order: Vec<usize> = (0..input.batch_size()).collect();
        order.shuffle(&mut self.rng);
        list_schedule(input, &order)
    }

    fn description(&self) -> &'static str {
        "Random Sequencer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyJob;

    fn input(n: usize) -> PolicyInput {
        PolicyInput::new(
            (0..n).map(|i| PolicyJob::new(i as f64 * 0.1, 1.0, 0.5)).collect(),
            vec![0.0, 0.0],
        )
    }

    #[test]
    fn test_order_is_permutation() {
        let mut policy = RandomSequencer::new(7);
        let out = policy.assign(&input(6)).unwrap();
        let mut sorted = out.execution_order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = RandomSequencer::new(42).assign(&input(8)).unwrap();
        let b = RandomSequencer::new(42).assign(&input(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_batch() {
        let out = RandomSequencer::new(1).assign(&input(0)).unwrap();
        assert!(out.execution_order.is_empty());
        assert_eq!(out.channel_availability, vec![0.0, 0.0]);
    }
}
