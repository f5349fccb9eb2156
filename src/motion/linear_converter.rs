use crate::Microns;
use crate::Steps;

/// Converts between steps and microns on the selector and the feeder.
///
/// The ratio is kept as steps per revolution over microns per revolution so
/// that lead screws and feeder gears with fractional steps per millimetre
/// stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearConverter {
    steps_per_revolution: i32,
    microns_per_revolution: i32,
}

impl LinearConverter {
    /// Creates a new linear converter.
    pub const fn new(
        steps_per_revolution: i32,
        microns_per_revolution: i32,
    ) -> Self {
        Self {
            steps_per_revolution,
            microns_per_revolution,
        }
    }

    /// Creates a converter from a whole number of steps per millimetre.
    pub const fn per_mm(steps_per_mm: i32) -> Self {
        Self::new(steps_per_mm, 1000)
    }

    /// Number of steps covering one millimetre, rounded down.
    pub fn steps_per_mm(&self) -> u32 {
        self.to_steps(Microns::from_mm(1)).unsigned_abs()
    }

    /// Converts a value in [Steps] to a value in [Microns].
    pub fn to_microns(&self, steps: Steps) -> Microns {
        Microns::new(
            (steps.get_value() as i64 * self.microns_per_revolution as i64
                / self.steps_per_revolution as i64) as i32,
        )
    }

    /// Converts a value in [Microns] to a value in [Steps].
    pub fn to_steps(&self, microns: Microns) -> Steps {
        Steps::new(
            (microns.get_value() as i64 * self.steps_per_revolution as i64
                / self.microns_per_revolution as i64) as i32,
        )
    }

    /// Computes the number of steps to move the axis to get from the current
    /// position (in steps) to a target position (in microns).
    ///
    /// # Parameters
    ///
    /// - `current`: Current position, in steps.
    /// - `target`: Target position, in microns.
    ///
    /// # Returns
    ///
    /// - The number of steps to move (signed).
    pub fn steps_to(&self, current: Steps, target: Microns) -> Steps {
        self.to_steps(target) - current
    }
}
