use ufmt_macros::uDebug;

/// Describes the direction for an axis movement.
#[derive(Debug, uDebug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    /// Positive direction is associated with a "high" direction signal.
    Positive,
    /// Negative direction is associated with a "low" direction signal.
    Negative,
}
impl Direction {
    /// Direction of travel for a signed step delta.
    ///
    /// A zero delta counts as positive.
    pub fn of(delta: i32) -> Direction {
        if delta < 0 {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }

    /// The opposite direction.
    pub fn reversed(&self) -> Direction {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }

    /// `+1` or `-1`.
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }
}
