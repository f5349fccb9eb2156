use crate::Ticks;

/// Trapezoidal speed profile of one movement.
///
/// The interval between steps falls linearly from the start interval to the
/// cruise interval over the ramp, holds, and rises again over the same
/// number of steps before the end of the movement. A movement shorter than
/// two ramps keeps the slope, so it peaks below cruise speed and the curve
/// stays continuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelProfile {
    start: u16,
    cruise: u16,
    ramp: u32,
    total: u32,
}
impl AccelProfile {
    /// Creates a new `AccelProfile`.
    ///
    /// A start interval that is not slower than the cruise interval, or an
    /// empty ramp, gives a constant profile at the cruise interval.
    ///
    /// # Parameters
    ///
    /// - `start`: Interval of the first and last step.
    /// - `cruise`: Interval at full speed.
    /// - `ramp`: Number of steps to go from `start` to `cruise`.
    /// - `total`: Number of steps in the movement.
    pub fn new(start: Ticks, cruise: Ticks, ramp: u32, total: u32) -> Self {
        let cruise = cruise.get_value().max(1);
        let start = start.get_value().max(cruise);
        let ramp = if start == cruise { 0 } else { ramp };
        Self {
            start,
            cruise,
            ramp,
            total,
        }
    }

    /// Creates a profile that runs every step at the same interval.
    pub fn constant(interval: Ticks, total: u32) -> Self {
        Self::new(interval, interval, 0, total)
    }

    /// Number of steps in the movement.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Interval to wait before step `index` (zero based).
    pub fn interval_at(&self, index: u32) -> Ticks {
        if self.ramp == 0 {
            return Ticks::new(self.cruise);
        }
        let from_end = self.total.saturating_sub(1).saturating_sub(index);
        let d = index.min(from_end).min(self.ramp);
        let span = (self.start - self.cruise) as u32;
        let reduction = (span as u64 * d as u64 / self.ramp as u64) as u16;
        Ticks::new(self.start - reduction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn profile() -> impl Strategy<Value = AccelProfile> {
        (1u16..5000, 1u16..20000, 0u32..300, 1u32..2000).prop_map(
            |(cruise, extra, ramp, total)| {
                AccelProfile::new(
                    Ticks::new(cruise.saturating_add(extra)),
                    Ticks::new(cruise),
                    ramp,
                    total,
                )
            },
        )
    }

    #[test]
    fn test_trapezoid() {
        let p = AccelProfile::new(Ticks::new(1000), Ticks::new(200), 4, 20);
        let intervals: Vec<u16> =
            (0..20).map(|k| p.interval_at(k).get_value()).collect();
        assert_eq!(
            vec![
                1000, 800, 600, 400, 200, 200, 200, 200, 200, 200, 200, 200,
                200, 200, 200, 200, 400, 600, 800, 1000
            ],
            intervals
        );
    }

    #[test]
    fn test_short_move_peaks_below_cruise() {
        let p = AccelProfile::new(Ticks::new(1000), Ticks::new(200), 10, 5);
        let fastest = (0..5).map(|k| p.interval_at(k)).min().unwrap();
        assert_eq!(Ticks::new(840), fastest);
    }

    #[test]
    fn test_constant() {
        let p = AccelProfile::constant(Ticks::new(300), 10);
        assert!((0..10).all(|k| p.interval_at(k) == Ticks::new(300)));
    }

    proptest! {
        #[test]
        fn test_symmetric_and_bounded(p in profile()) {
            let start = p.interval_at(0);
            for k in 0..p.total() {
                let here = p.interval_at(k);
                assert_eq!(here, p.interval_at(p.total() - 1 - k));
                assert!(here <= start);
                assert!(here.get_value() >= p.cruise);
            }
        }
    }

    proptest! {
        #[test]
        fn test_monotone_halves(p in profile()) {
            let half = p.total() / 2;
            for k in 1..half {
                assert!(p.interval_at(k) <= p.interval_at(k - 1));
            }
            for k in (half + 1)..p.total() {
                assert!(p.interval_at(k) >= p.interval_at(k - 1));
            }
        }
    }
}
