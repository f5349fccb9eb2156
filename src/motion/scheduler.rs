use crate::{StepTimer, Ticks};

/// An axis as seen by the [Scheduler].
pub trait Scheduled {
    /// Ticks until the axis is due for its next step.
    fn remaining(&self) -> Ticks;

    /// Takes an elapsed interval off the remaining interval of an axis that
    /// was not due when the timer fired.
    fn credit(&mut self, elapsed: Ticks);

    /// Services the axis when it is due.
    ///
    /// # Returns
    ///
    /// - `true` if the axis is still moving, and has been given a new
    ///   remaining interval.
    /// - `false` if its movement has finished.
    fn fire(&mut self) -> bool;
}

/// Set of axis indices.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AxisMask(u8);
impl AxisMask {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    pub fn remove(&mut self, index: usize) {
        self.0 &= !(1 << index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Multiplexes several axes onto one step timer.
///
/// Each active axis keeps the number of ticks until its next step. The
/// timer is always armed with the smallest of these, and every axis whose
/// interval equals that minimum is due when the timer fires. Axes that were
/// not due have the elapsed interval subtracted, so no time is lost between
/// axes running at different rates.
#[derive(Debug, Clone)]
pub struct Scheduler {
    active: AxisMask,
    due: AxisMask,
    armed: Ticks,
}
impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
impl Scheduler {
    /// Creates a new, idle `Scheduler`.
    pub fn new() -> Self {
        Self {
            active: AxisMask::empty(),
            due: AxisMask::empty(),
            armed: Ticks::PARKED,
        }
    }

    /// Adds an axis with a prepared movement to the active set.
    pub fn activate(&mut self, index: usize) {
        self.active.insert(index);
    }

    /// Returns whether an axis is still moving.
    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(index)
    }

    /// Returns whether any axis is still moving.
    pub fn is_busy(&self) -> bool {
        !self.active.is_empty()
    }

    /// Picks the next due axes and arms the timer.
    ///
    /// With no active axes the timer is parked.
    ///
    /// # Parameters
    ///
    /// - `axes`: Every axis, indexed like the active set.
    /// - `timer`: Timer to arm.
    pub fn schedule_next<A: Scheduled, T: StepTimer>(
        &mut self,
        axes: &[A],
        timer: &mut T,
    ) {
        self.due = AxisMask::empty();
        let next = axes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.active.contains(*i))
            .map(|(_, axis)| axis.remaining())
            .min();

        match next {
            None => {
                self.armed = Ticks::PARKED;
                timer.park();
            }
            Some(interval) => {
                for (i, axis) in axes.iter().enumerate() {
                    if self.active.contains(i) && axis.remaining() == interval
                    {
                        self.due.insert(i);
                    }
                }
                self.armed = interval.max(Ticks::new(1));
                timer.arm(self.armed);
            }
        }
    }

    /// Runs one timer expiry: services due axes, credits the others, and
    /// re-arms the timer.
    pub fn on_timer<A: Scheduled, T: StepTimer>(
        &mut self,
        axes: &mut [A],
        timer: &mut T,
    ) {
        let elapsed = self.armed;
        for (i, axis) in axes.iter_mut().enumerate() {
            if !self.active.contains(i) {
                continue;
            }
            if self.due.contains(i) {
                if !axis.fire() {
                    self.active.remove(i);
                }
            } else {
                axis.credit(elapsed);
            }
        }
        self.schedule_next(axes, timer);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::TestTimer;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Axis stepping at a fixed interval, recording when it fired.
    struct FakeAxis {
        interval: Ticks,
        remaining: Ticks,
        steps_left: u32,
        clock: Rc<Cell<u64>>,
        fired_at: Vec<u64>,
    }
    impl FakeAxis {
        fn new(interval: u16, steps: u32, clock: &Rc<Cell<u64>>) -> Self {
            Self {
                interval: Ticks::new(interval),
                remaining: Ticks::new(interval),
                steps_left: steps,
                clock: clock.clone(),
                fired_at: Vec::new(),
            }
        }
    }
    impl Scheduled for FakeAxis {
        fn remaining(&self) -> Ticks {
            self.remaining
        }

        fn credit(&mut self, elapsed: Ticks) {
            self.remaining = self.remaining.saturating_sub(elapsed);
        }

        fn fire(&mut self) -> bool {
            self.fired_at.push(self.clock.get());
            self.steps_left -= 1;
            self.remaining = self.interval;
            self.steps_left > 0
        }
    }

    /// Runs the scheduler until idle, advancing the shared clock by every
    /// armed interval.
    fn run(axes: &mut [FakeAxis], clock: &Rc<Cell<u64>>) -> TestTimer {
        let mut timer = TestTimer::new();
        let mut scheduler = Scheduler::new();
        for i in 0..axes.len() {
            scheduler.activate(i);
        }
        scheduler.schedule_next(axes, &mut timer);
        while scheduler.is_busy() {
            assert!(timer.expired());
            let armed = *timer.history().last().unwrap();
            clock.set(clock.get() + armed.get_value() as u64);
            scheduler.on_timer(axes, &mut timer);
        }
        timer
    }

    #[test]
    fn test_interleaves_two_rates() {
        let clock = Rc::new(Cell::new(0));
        let mut axes = [FakeAxis::new(10, 3, &clock), FakeAxis::new(15, 2, &clock)];
        let timer = run(&mut axes, &clock);

        assert_eq!(vec![10, 20, 30], axes[0].fired_at);
        assert_eq!(vec![15, 30], axes[1].fired_at);
        let armed: Vec<u16> =
            timer.history().iter().map(|t| t.get_value()).collect();
        assert_eq!(vec![10, 5, 5, 10], armed);
        assert_eq!(1, timer.parked());
    }

    #[test]
    fn test_idle_parks() {
        let mut timer = TestTimer::new();
        let mut scheduler = Scheduler::new();
        let axes: [FakeAxis; 0] = [];
        scheduler.schedule_next(&axes, &mut timer);
        assert!(!scheduler.is_busy());
        assert_eq!(1, timer.parked());
        assert!(!timer.expired());
    }

    proptest! {
        #[test]
        fn test_each_axis_keeps_its_rate(
            a in 1u16..200, b in 1u16..200, c in 1u16..200,
            na in 1u32..20, nb in 1u32..20, nc in 1u32..20
        ) {
            let clock = Rc::new(Cell::new(0));
            let mut axes = [
                FakeAxis::new(a, na, &clock),
                FakeAxis::new(b, nb, &clock),
                FakeAxis::new(c, nc, &clock),
            ];
            run(&mut axes, &clock);
            for axis in axes.iter() {
                let period = axis.interval.get_value() as u64;
                let expected: Vec<u64> =
                    (1..=axis.fired_at.len() as u64).map(|k| k * period).collect();
                assert_eq!(expected, axis.fired_at);
            }
            assert_eq!(na as usize, axes[0].fired_at.len());
            assert_eq!(nb as usize, axes[1].fired_at.len());
            assert_eq!(nc as usize, axes[2].fired_at.len());
        }
    }
}
