use crate::MilliDegrees;
use crate::Steps;

/// Conversions for rotary motion.
///
/// This converts:
/// - Millidegrees to steps.
/// - Steps to millidegrees.
///
/// It also performs delta calculations for movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotaryConverter {
    steps_per_revolution: i32,
}

impl RotaryConverter {
    pub const fn new(steps_per_revolution: i32) -> Self {
        Self {
            steps_per_revolution,
        }
    }

    pub fn steps_per_revolution(&self) -> i32 {
        self.steps_per_revolution
    }

    /// Number of steps covering one degree, rounded down (at least one).
    pub fn steps_per_degree(&self) -> u32 {
        (self.steps_per_revolution.unsigned_abs() / 360).max(1)
    }

    /// Converts a value in [Steps] to a value in [MilliDegrees].
    pub fn to_millidegrees(&self, steps: Steps) -> Option<MilliDegrees> {
        (steps.get_value() as i64)
            .checked_mul(360000)
            .and_then(|q| q.checked_div(self.steps_per_revolution as i64))
            .and_then(|q| q.try_into().ok())
            .map(MilliDegrees::new)
    }

    /// Converts a value in [MilliDegrees] to a value in [Steps].
    pub fn to_steps(&self, millidegrees: MilliDegrees) -> Option<Steps> {
        (millidegrees.get_value() as i64)
            .checked_mul(self.steps_per_revolution as i64)
            .and_then(|q| q.checked_div(360000))
            .and_then(|q| q.try_into().ok())
            .map(Steps::new)
    }

    /// Computes the minimum number of steps to move the axis from the current
    /// position (in steps) to a target position (in millidegrees).
    ///
    /// This is an absolute move, and always takes the shorter way round.
    ///
    /// # Parameters
    ///
    /// - `current`: Current position, in steps.
    /// - `target`: Target position, in millidegrees.
    ///
    /// # Returns
    ///
    /// - The number of steps to move (signed).
    pub fn steps_to_abs(
        &self,
        current: Steps,
        target: MilliDegrees,
    ) -> Option<Steps> {
        let revolution = self.steps_per_revolution;
        if revolution <= 0 {
            return None;
        }
        let here = self.to_millidegrees(current)?;
        let target_steps = self.to_steps(target)?.get_value();
        let arc = self.to_steps(here.shortest_angle_to(target))?;
        // Snap the landing point onto the nearest whole-turn image of the
        // target, so rounding never leaves the axis off the target step.
        let landing = current.get_value().checked_add(arc.get_value())?;
        let turns = (landing - target_steps + revolution / 2).div_euclid(revolution);
        let exact = target_steps + turns * revolution;
        Some(Steps::new(exact - current.get_value()))
    }
}
