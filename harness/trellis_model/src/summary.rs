//! Aggregate pass/fail/skip counts.

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::time::Duration;

use serde::Serialize;

/// Counts over a set of leaf tests.
///
/// Merging is associative and commutative, so summaries of disjoint sets
/// can be combined in any order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Sum of leaf durations.
    pub duration: Duration,
}

impl Summary {
    pub fn new() -> Self {
        Summary::default()
    }

    /// Summary of a single leaf with the given state.
    pub fn leaf(failed: bool, skipped: bool, passed: bool, duration: Duration) -> Self {
        Summary {
            total: 1,
            passed: usize::from(passed),
            failed: usize::from(failed),
            skipped: usize::from(skipped),
            duration,
        }
    }

    #[must_use]
    pub fn merge(self, other: Summary) -> Summary {
        Summary {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
            duration: self.duration.saturating_add(other.duration),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl Add for Summary {
    type Output = Summary;

    fn add(self, rhs: Summary) -> Summary {
        self.merge(rhs)
    }
}

impl AddAssign for Summary {
    fn add_assign(&mut self, rhs: Summary) {
        *self = self.merge(rhs);
    }
}

impl Sum for Summary {
    fn sum<I: Iterator<Item = Summary>>(iter: I) -> Summary {
        iter.fold(Summary::default(), Summary::merge)
    }
}
