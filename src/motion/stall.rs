/// Counts stall reports of a driver during one movement.
///
/// The monitor never stops a movement itself. Sequences read
/// [StallMonitor::detected] after a move settles and decide what to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallMonitor {
    count: u16,
    threshold: u16,
    enabled: bool,
}
impl StallMonitor {
    /// Creates a new `StallMonitor`.
    ///
    /// # Parameters
    ///
    /// - `threshold`: A stall is detected once the count exceeds this.
    /// - `enabled`: Whether stall detection is configured for the axis.
    pub fn new(threshold: u16, enabled: bool) -> Self {
        Self {
            count: 0,
            threshold,
            enabled,
        }
    }

    /// Records one sample of the stall output.
    pub fn record(&mut self, stalled: bool) {
        if stalled {
            self.count = self.count.saturating_add(1);
        }
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the count exceeds the threshold on an axis with
    /// stall detection enabled.
    pub fn detected(&self) -> bool {
        self.enabled && self.count > self.threshold
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_disabled_never_detects() {
        let mut monitor = StallMonitor::new(0, false);
        monitor.record(true);
        assert_eq!(1, monitor.count());
        assert!(!monitor.detected());
    }

    proptest! {
        #[test]
        fn test_detected_above_threshold(
            threshold in 0u16..50,
            samples in proptest::collection::vec(any::<bool>(), 0..100)
        ) {
            let mut monitor = StallMonitor::new(threshold, true);
            for s in samples.iter() {
                monitor.record(*s);
            }
            let stalls = samples.iter().filter(|s| **s).count() as u16;
            assert_eq!(stalls, monitor.count());
            assert_eq!(stalls > threshold, monitor.detected());
            monitor.reset();
            assert!(!monitor.detected());
        }
    }
}
