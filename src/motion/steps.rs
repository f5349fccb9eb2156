use core::ops::{Add, Neg, Sub};

use ufmt_macros::uDebug;

use crate::Direction;

/// Underlying type representing the number of steps.
type StepRepr = i32;

/// Number of steps.
///
/// `Steps` is careful to prevent overflows, so that it can be used safely to
/// track axis positions.
#[derive(Debug, uDebug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub struct Steps(StepRepr);
impl Steps {
    /// Create a new number of steps.
    pub const fn new(steps: StepRepr) -> Self {
        Self(steps)
    }

    /// Zero steps.
    pub const fn zero() -> Self {
        Steps(0)
    }

    /// Returns the value represented by `Steps`.
    pub fn get_value(&self) -> StepRepr {
        self.0
    }

    /// Magnitude of the step count.
    pub fn unsigned_abs(&self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Increment the value if it's safe to do so without an overflow.
    pub fn inc(&self) -> Option<Self> {
        self.0.checked_add_unsigned(1).map(Steps)
    }

    /// Decrement the value if it's safe to do so without an overflow.
    pub fn dec(&self) -> Option<Self> {
        self.0.checked_sub_unsigned(1).map(Steps)
    }

    /// Moves the value one step in `direction`, saturating at the limits.
    pub fn step(&self, direction: Direction) -> Self {
        match direction {
            Direction::Positive => self.inc().unwrap_or(*self),
            Direction::Negative => self.dec().unwrap_or(*self),
        }
    }
}

impl Add for Steps {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Steps(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Steps {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Steps(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Steps {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Steps(self.0.saturating_neg())
    }
}
