//! Urgency cost model.
//!
//! A job's cost grows linearly with the time it has waited since its
//! wait-clock origin (`start_time`). Jobs with a deadline switch to a flat
//! drop penalty once the deadline has elapsed.
//!
//! | Function | Definition |
//! |----------|-----------|
//! | Linear | `slope * max(now - start, 0)` |
//! | Linear-drop | linear while `now < start + drop_time`, else `drop_cost` |
//!
//! All functions are pure and total.

use serde::{Deserialize, Serialize};

/// Linear urgency cost: `slope * max(now - start_time, 0)`.
///
/// Zero at `now == start_time` (and before it) for any slope, including an
/// infinite one.
#[inline]
pub fn linear_cost(now: f64, slope: f64, start_time: f64) -> f64 {
    let elapsed = now - start_time;
    if elapsed > 0.0 {
        slope * elapsed
    } else {
        0.0
    }
}

/// Linear cost with a hard deadline.
///
/// Equals [`linear_cost`] while `now < start_time + drop_time`; equals the
/// flat `drop_cost` at and after the deadline. The penalty replaces the
/// growing cost rather than adding to it.
#[inline]
pub fn linear_drop_cost(
    now: f64,
    slope: f64,
    start_time: f64,
    drop_time: f64,
    drop_cost: f64,
) -> f64 {
    if now < start_time + drop_time {
        linear_cost(now, slope, start_time)
    } else {
        drop_cost
    }
}

/// A job's cost function, bound to its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CostFunction {
    /// Unbounded linear growth.
    Linear { slope: f64 },
    /// Linear growth until `drop_time` after the wait-clock origin, then a flat penalty.
    LinearDrop {
        slope: f64,
        drop_time: f64,
        drop_cost: f64,
    },
}

impl CostFunction {
    /// Evaluates the cost at `now` for a job whose wait clock started at `start_time`.
    pub fn evaluate(&self, now: f64, start_time: f64) -> f64 {
        match *self {
            Self::Linear { slope } => linear_cost(now, slope, start_time),
            Self::LinearDrop {
                slope,
                drop_time,
                drop_cost,
            } => linear_drop_cost(now, slope, start_time, drop_time, drop_cost),
        }
    }

    /// Whether executing at `now` counts as a drop.
    pub fn is_dropped(&self, now: f64, start_time: f64) -> bool {
        match *self {
            Self::Linear { .. } => false,
            Self::LinearDrop { drop_time, .. } => now >= start_time + drop_time,
        }
    }

    /// Urgency slope.
    pub fn slope(&self) -> f64 {
        match *self {
            Self::Linear { slope } | Self::LinearDrop { slope, .. } => slope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_linear_cost_zero_at_start() {
        assert_eq!(linear_cost(5.0, 2.0, 5.0), 0.0);
        assert_eq!(linear_cost(5.0, f64::INFINITY, 5.0), 0.0);
    }

    #[test]
    fn test_linear_cost_before_start_is_zero() {
        assert_eq!(linear_cost(1.0, 3.0, 4.0), 0.0);
    }

    #[test]
    fn test_linear_cost_growth() {
        assert!((linear_cost(3.5, 2.0, 1.0) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_drop_boundary() {
        // deadline at 1.0 + 2.0 = 3.0
        let below = linear_drop_cost(2.999, 1.0, 1.0, 2.0, 40.0);
        assert!((below - 1.999).abs() < 1e-10);
        assert_eq!(linear_drop_cost(3.0, 1.0, 1.0, 2.0, 40.0), 40.0);
        assert_eq!(linear_drop_cost(100.0, 1.0, 1.0, 2.0, 40.0), 40.0);
    }

    #[test]
    fn test_cost_function_dispatch() {
        let linear = CostFunction::Linear { slope: 0.5 };
        assert!((linear.evaluate(4.0, 0.0) - 2.0).abs() < 1e-10);
        assert!(!linear.is_dropped(1e9, 0.0));

        let drop = CostFunction::LinearDrop {
            slope: 0.5,
            drop_time: 2.0,
            drop_cost: 10.0,
        };
        assert!((drop.evaluate(1.0, 0.0) - 0.5).abs() < 1e-10);
        assert_eq!(drop.evaluate(2.0, 0.0), 10.0);
        assert!(drop.is_dropped(2.0, 0.0));
        assert!(!drop.is_dropped(1.99, 0.0));
        assert_eq!(drop.slope(), 0.5);
    }

    proptest! {
        #[test]
        fn prop_linear_cost_monotonic(
            slope in 0.0f64..100.0,
            start in -50.0f64..50.0,
            t1 in -100.0f64..100.0,
            dt in 0.0f64..100.0,
        ) {
            prop_assert!(linear_cost(t1 + dt, slope, start) >= linear_cost(t1, slope, start));
        }

        #[test]
        fn prop_linear_drop_matches_linear_below_deadline(
            slope in 0.0f64..10.0,
            start in 0.0f64..10.0,
            drop_time in 0.1f64..10.0,
            drop_cost in 0.0f64..100.0,
            frac in 0.0f64..1.0,
        ) {
            let now = start + drop_time * frac * 0.999;
            prop_assert_eq!(
                linear_drop_cost(now, slope, start, drop_time, drop_cost),
                linear_cost(now, slope, start)
            );
            let after = start + drop_time + frac;
            prop_assert_eq!(linear_drop_cost(after, slope, start, drop_time, drop_cost), drop_cost);
        }
    }
}
