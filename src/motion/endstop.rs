use crate::Level;

/// Interprets the raw level of an endstop input.
///
/// The level that counts as "hit" is configured per input, and can be
/// inverted temporarily (the feeder runs until its sensor is *released*
/// when unloading).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Endstop {
    trigger: Level,
}
impl Endstop {
    /// Creates a new `Endstop`.
    ///
    /// # Parameters
    ///
    /// - `trigger`: Level at which the endstop counts as hit.
    pub fn new(trigger: Level) -> Self {
        Self { trigger }
    }

    /// Level at which the endstop counts as hit.
    pub fn trigger(&self) -> Level {
        self.trigger
    }

    /// Swaps the trigger level.
    pub fn invert(&mut self) {
        self.trigger = self.trigger.inverted();
    }

    /// Returns whether a raw reading means the endstop is hit.
    pub fn is_hit(&self, level: Level) -> bool {
        level == self.trigger
    }
}

/// Settles a boolean input before changes are reported.
///
/// The motion core reads endstops raw on every step. Anything shown to a
/// user or forwarded to a printer goes through a `Debouncer` instead.
#[derive(Debug, Clone)]
pub struct Debouncer {
    settle_ms: u32,
    reported: Option<bool>,
    candidate: bool,
    since_ms: u32,
}
impl Debouncer {
    /// Creates a new `Debouncer`.
    ///
    /// # Parameters
    ///
    /// - `settle_ms`: How long a new state must hold before it is reported.
    pub fn new(settle_ms: u32) -> Self {
        Self {
            settle_ms,
            reported: None,
            candidate: false,
            since_ms: 0,
        }
    }

    /// Feeds a new sample.
    ///
    /// # Parameters
    ///
    /// - `state`: Current raw state.
    /// - `now_ms`: Monotonic time of the sample, in milliseconds.
    ///
    /// # Returns
    ///
    /// - `Some(state)`: when `state` has held for the settle time and differs
    ///   from the last reported state (the first settled state is always
    ///   reported).
    /// - `None`: otherwise.
    pub fn update(&mut self, state: bool, now_ms: u32) -> Option<bool> {
        if state != self.candidate {
            self.candidate = state;
            self.since_ms = now_ms;
        }
        let settled = now_ms.wrapping_sub(self.since_ms) >= self.settle_ms;
        if settled && self.reported != Some(state) {
            self.reported = Some(state);
            return Some(state);
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_endstop_invert() {
        let mut endstop = Endstop::new(Level::High);
        assert!(endstop.is_hit(Level::High));
        assert!(!endstop.is_hit(Level::Low));
        endstop.invert();
        assert_eq!(Level::Low, endstop.trigger());
        assert!(endstop.is_hit(Level::Low));
    }

    #[test]
    fn test_debouncer_ignores_bounce() {
        let mut debouncer = Debouncer::new(200);
        assert_eq!(None, debouncer.update(false, 0));
        assert_eq!(Some(false), debouncer.update(false, 200));

        // Chatter shorter than the settle time is never reported.
        assert_eq!(None, debouncer.update(true, 300));
        assert_eq!(None, debouncer.update(false, 350));
        assert_eq!(None, debouncer.update(true, 400));
        assert_eq!(None, debouncer.update(true, 599));
        assert_eq!(Some(true), debouncer.update(true, 600));
        assert_eq!(None, debouncer.update(true, 5000));
    }
}
