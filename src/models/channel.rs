//! Execution channel model.
//!
//! Each channel runs one job at a time. Its whole state is a single
//! availability timestamp, which never moves backward.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Availability timestamps for `K` execution channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    available_at: Vec<f64>,
}

impl ChannelState {
    /// Creates `count` channels, all available at t=0.
    pub fn new(count: usize) -> Self {
        Self::starting_at(count, 0.0)
    }

    /// Creates `count` channels, all available at `time`.
    pub fn starting_at(count: usize, time: f64) -> Self {
        Self {
            available_at: vec![time; count],
        }
    }

    /// Creates channels from explicit availability timestamps.
    pub fn from_availability(available_at: Vec<f64>) -> Self {
        Self { available_at }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.available_at.len()
    }

    /// Whether there are no channels.
    pub fn is_empty(&self) -> bool {
        self.available_at.is_empty()
    }

    /// Availability timestamps, indexed by channel.
    pub fn availability(&self) -> &[f64] {
        &self.available_at
    }

    /// Availability of a single channel.
    pub fn available_at(&self, channel: usize) -> Option<f64> {
        self.available_at.get(channel).copied()
    }

    /// Channel with the smallest availability; ties go to the lowest index.
    ///
    /// Returns `None` when there are no channels.
    pub fn least_loaded(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, &at) in self.available_at.iter().enumerate() {
            match best {
                Some((_, best_at)) if at >= best_at => {}
                _ => best = Some((idx, at)),
            }
        }
        best
    }

    /// Earliest availability across all channels (`+inf` with no channels).
    pub fn earliest(&self) -> f64 {
        self.least_loaded()
            .map(|(_, at)| at)
            .unwrap_or(f64::INFINITY)
    }

    /// Moves a channel's availability forward.
    ///
    /// # Errors
    /// `MonotonicityViolation` if `new_available_at` is earlier than the
    /// current value (the channel is left unchanged).
    pub fn advance(&mut self, channel: usize, new_available_at: f64) -> SimResult<()> {
        let count = self.available_at.len();
        let slot = self
            .available_at
            .get_mut(channel)
            .ok_or(SimError::ChannelOutOfRange { channel, count })?;

        // NaN fails this comparison too.
        if !(new_available_at >= *slot) {
            return Err(SimError::MonotonicityViolation {
                channel,
                current: *slot,
                requested: new_available_at,
            });
        }
        *slot = new_available_at;
        Ok(())
    }

    /// Raises every idle channel to `time`; busy channels are untouched.
    pub fn catch_up(&mut self, time: f64) {
        for at in &mut self.available_at {
            if *at < time {
                *at = time;
            }
        }
    }

    /// Replaces all timestamps at once, checking monotonicity for every channel
    /// before changing any of them.
    pub fn advance_all(&mut self, updated: &[f64]) -> SimResult<()> {
        if updated.len() != self.available_at.len() {
            return Err(SimError::InvalidPolicyOutput(format!(
                "expected {} channel timestamps, got {}",
                self.available_at.len(),
                updated.len()
            )));
        }
        for (channel, (&current, &requested)) in
            self.available_at.iter().zip(updated).enumerate()
        {
            if !(requested >= current) {
                return Err(SimError::MonotonicityViolation {
                    channel,
                    current,
                    requested,
                });
            }
        }
        self.available_at.copy_from_slice(updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_loaded_tie_lowest_index() {
        let ch = ChannelState::from_availability(vec![2.0, 1.0, 1.0]);
        assert_eq!(ch.least_loaded(), Some((1, 1.0)));

        let ch = ChannelState::new(3);
        assert_eq!(ch.least_loaded(), Some((0, 0.0)));
    }

    #[test]
    fn test_least_loaded_empty() {
        let ch = ChannelState::new(0);
        assert!(ch.least_loaded().is_none());
        assert!(ch.earliest().is_infinite());
    }

    #[test]
    fn test_advance_forward() {
        let mut ch = ChannelState::new(2);
        ch.advance(1, 3.0).unwrap();
        ch.advance(1, 3.0).unwrap();
        assert_eq!(ch.availability(), &[0.0, 3.0]);
        assert_eq!(ch.least_loaded(), Some((0, 0.0)));
    }

    #[test]
    fn test_advance_backward_rejected() {
        let mut ch = ChannelState::from_availability(vec![5.0]);
        let err = ch.advance(0, 4.0).unwrap_err();
        assert!(matches!(err, SimError::MonotonicityViolation { channel: 0, .. }));
        assert_eq!(ch.availability(), &[5.0]);
    }

    #[test]
    fn test_advance_out_of_range() {
        let mut ch = ChannelState::new(1);
        assert!(matches!(
            ch.advance(3, 1.0),
            Err(SimError::ChannelOutOfRange { channel: 3, count: 1 })
        ));
    }

    #[test]
    fn test_catch_up() {
        let mut ch = ChannelState::from_availability(vec![1.0, 6.0]);
        ch.catch_up(4.0);
        assert_eq!(ch.availability(), &[4.0, 6.0]);
    }

    #[test]
    fn test_advance_all_is_atomic() {
        let mut ch = ChannelState::from_availability(vec![1.0, 6.0]);
        let err = ch.advance_all(&[2.0, 5.0]).unwrap_err();
        assert!(matches!(err, SimError::MonotonicityViolation { channel: 1, .. }));
        assert_eq!(ch.availability(), &[1.0, 6.0]);

        ch.advance_all(&[2.0, 7.0]).unwrap();
        assert_eq!(ch.availability(), &[2.0, 7.0]);
    }
}
