use ufmt_macros::uDebug;

use crate::Ticks;

/// Speed of an axis.
///
/// Speeds can be given either directly as the timer interval between two
/// steps, or as a travel rate which is translated into an interval for the
/// axis it is applied to.
#[derive(Debug, uDebug, PartialEq, Eq, Copy, Clone)]
pub enum Speed {
    /// Interval between steps; larger is slower.
    Ticks(Ticks),
    /// Travel rate in millimetres (degrees, for rotary axes) per second.
    MillimetresPerSecond(u16),
}
impl Speed {
    /// Returns the speed slowed down by a quarter.
    ///
    /// Intervals become 25% longer, capped at [Ticks::SLOWEST]. Rates become
    /// 25% lower, with a floor of 1.
    pub fn slowed(&self) -> Speed {
        match *self {
            Speed::Ticks(ticks) => Speed::Ticks(ticks.slowed()),
            Speed::MillimetresPerSecond(rate) => {
                Speed::MillimetresPerSecond((rate - rate / 4).max(1))
            }
        }
    }

    /// Translates the speed into a step interval.
    ///
    /// # Parameters
    ///
    /// - `steps_per_unit`: Steps per millimetre (or per degree) of the axis.
    /// - `timer_hz`: Tick frequency of the step timer.
    ///
    /// # Returns
    ///
    /// - The interval between steps, clamped to `[1, PARKED - 1]`.
    pub fn to_ticks(&self, steps_per_unit: u32, timer_hz: u32) -> Ticks {
        match *self {
            Speed::Ticks(ticks) => ticks,
            Speed::MillimetresPerSecond(rate) => {
                let steps_per_second =
                    (rate as u32).saturating_mul(steps_per_unit).max(1);
                let interval = (timer_hz / steps_per_second)
                    .clamp(1, Ticks::PARKED.get_value() as u32 - 1);
                Ticks::new(interval as u16)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slowed_rate_floor() {
        assert_eq!(
            Speed::MillimetresPerSecond(30),
            Speed::MillimetresPerSecond(40).slowed()
        );
        assert_eq!(
            Speed::MillimetresPerSecond(1),
            Speed::MillimetresPerSecond(1).slowed()
        );
    }

    #[test]
    fn test_to_ticks() {
        // 2 MHz timer, 80 steps/mm at 25 mm/s is 2000 steps/s.
        let speed = Speed::MillimetresPerSecond(25);
        assert_eq!(Ticks::new(1000), speed.to_ticks(80, 2_000_000));

        let direct = Speed::Ticks(Ticks::new(321));
        assert_eq!(Ticks::new(321), direct.to_ticks(80, 2_000_000));
    }

    #[test]
    fn test_to_ticks_clamps() {
        let crawl = Speed::MillimetresPerSecond(1);
        assert_eq!(Ticks::new(65533), crawl.to_ticks(1, 2_000_000));
        let fast = Speed::MillimetresPerSecond(1000);
        assert_eq!(Ticks::new(1), fast.to_ticks(4000, 2_000_000));
    }
}
