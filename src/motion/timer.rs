use crate::Ticks;

/// Hardware timer that paces step pulses.
///
/// The scheduler arms the timer with the interval until the next due step.
/// Expiry is observed by polling [StepTimer::expired] from the control loop,
/// which then runs one scheduler tick.
pub trait StepTimer {
    /// Starts a new interval of `ticks` from now.
    fn arm(&mut self, ticks: Ticks);

    /// Parks the timer at its maximum interval while nothing moves.
    fn park(&mut self);

    /// Returns `true` once for each armed interval that has elapsed.
    fn expired(&mut self) -> bool;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Step timer to use for testing purposes.
    ///
    /// Time does not pass on its own; every armed interval has elapsed as
    /// soon as it is polled. The timer records each interval so that tests
    /// can reconstruct when steps happened.
    #[derive(Debug, Default)]
    pub struct TestTimer {
        armed: Option<Ticks>,
        history: Vec<Ticks>,
        parked: u32,
    }
    impl TestTimer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every interval armed so far.
        pub fn history(&self) -> &[Ticks] {
            &self.history
        }

        /// Number of times the timer was parked.
        pub fn parked(&self) -> u32 {
            self.parked
        }

        /// Sum of all armed intervals.
        pub fn elapsed(&self) -> u64 {
            self.history.iter().map(|t| t.get_value() as u64).sum()
        }
    }
    impl StepTimer for TestTimer {
        fn arm(&mut self, ticks: Ticks) {
            self.armed = Some(ticks);
            self.history.push(ticks);
        }

        fn park(&mut self) {
            self.armed = None;
            self.parked += 1;
        }

        fn expired(&mut self) -> bool {
            self.armed.take().is_some()
        }
    }
}
