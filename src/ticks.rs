use ufmt_macros::uDebug;

/// Underlying type representing timer ticks.
type TicksRepr = u16;

/// Interval of the step timer, in ticks.
///
/// Step intervals share the width of the 16-bit compare register that
/// schedules them.
#[derive(Debug, uDebug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone)]
pub struct Ticks(TicksRepr);
impl Ticks {
    /// Compare value the timer is parked at while no axis is moving.
    pub const PARKED: Ticks = Ticks(65534);

    /// Longest interval that stall slow-down may produce.
    pub const SLOWEST: Ticks = Ticks(65500);

    /// Creates a new `Ticks`.
    pub const fn new(value: TicksRepr) -> Self {
        Self(value)
    }

    /// Returns the value as a `u16`.
    pub fn get_value(&self) -> TicksRepr {
        self.0
    }

    /// Subtracts an elapsed interval, stopping at zero.
    pub fn saturating_sub(&self, elapsed: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(elapsed.0))
    }

    /// Lengthens the interval by a quarter, capped at [Ticks::SLOWEST].
    pub fn slowed(&self) -> Ticks {
        let longer = self.0 as u32 + self.0 as u32 / 4;
        Ticks(longer.min(Self::SLOWEST.0 as u32) as TicksRepr)
    }
}
