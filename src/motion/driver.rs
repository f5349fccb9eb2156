use ufmt_macros::uDebug;

use crate::Direction;

/// Electrical level read from an input.
#[derive(Debug, uDebug, PartialEq, Eq, Clone, Copy)]
pub enum Level {
    Low,
    High,
}
impl Level {
    /// The other level.
    pub fn inverted(&self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Selects one of the endstop inputs of an axis.
///
/// Only the feeder uses a secondary endstop (a filament sensor placed
/// further along the path).
#[derive(Debug, uDebug, PartialEq, Eq, Clone, Copy)]
pub enum EndstopInput {
    Primary,
    Secondary,
}

/// Hardware behind one axis.
///
/// This is the single seam between the motion core and the pins of a
/// board. Linear steppers, the rotary revolver stepper and any emulation
/// behind them all look the same from here.
pub trait AxisDriver {
    /// Emits a single step pulse in the supplied direction.
    ///
    /// # Parameters
    ///
    /// - `direction`: Physical direction of the step, already corrected for
    ///   any configured inversion.
    fn step(&mut self, direction: Direction);

    /// Powers the motor driver on or off.
    fn set_enabled(&mut self, enabled: bool);

    /// Reads the raw level of an endstop input.
    fn read_endstop(&self, input: EndstopInput) -> Level;

    /// Reads the driver's stall (diagnostic) output.
    ///
    /// Drivers without stall detection always return `false`.
    fn read_stall(&self) -> bool;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Simulated sensor whose state depends on the physical motor position.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Sensor {
        Never,
        Always,
        /// Active at or below the position (a minimum endstop).
        AtOrBelow(i128),
        /// Active at or above the position (a filament sensor).
        AtOrAbove(i128),
        /// Active whenever the position is a multiple of the period.
        Every(i128),
        /// Active on the half-open range `[from, to)`.
        Between(i128, i128),
    }
    impl Sensor {
        fn active(&self, position: i128) -> bool {
            match *self {
                Sensor::Never => false,
                Sensor::Always => true,
                Sensor::AtOrBelow(p) => position <= p,
                Sensor::AtOrAbove(p) => position >= p,
                Sensor::Every(period) => position.rem_euclid(period) == 0,
                Sensor::Between(from, to) => position >= from && position < to,
            }
        }
    }

    /// Shared state of a [TestDriver].
    #[derive(Debug, Clone)]
    pub struct TestDriverState {
        pub position: i128,
        pub pulses: u64,
        pub enabled: bool,
        pub endstop: Sensor,
        pub endstop2: Sensor,
        pub stall: Sensor,
        /// Pulses still to be reported as stalled, regardless of position.
        pub stall_pulses: u64,
        stalling: bool,
    }

    /// Axis driver to use for testing purposes.
    ///
    /// This tracks a physical position in `i128`, and simulates endstops and
    /// stall outputs as functions of that position. Active sensors read
    /// [Level::High].
    ///
    /// If the `TestDriver` is cloned then the underlying state is shared, so
    /// a test can keep a handle after moving the driver into the machine.
    #[derive(Clone)]
    pub struct TestDriver {
        state: Arc<Mutex<TestDriverState>>,
    }
    impl TestDriver {
        /// Creates a new test driver with no active sensors.
        pub fn new(position: i128) -> Self {
            Self {
                state: Arc::new(Mutex::new(TestDriverState {
                    position,
                    pulses: 0,
                    enabled: false,
                    endstop: Sensor::Never,
                    endstop2: Sensor::Never,
                    stall: Sensor::Never,
                    stall_pulses: 0,
                    stalling: false,
                })),
            }
        }

        /// Builder: sets the primary endstop model.
        pub fn with_endstop(self, sensor: Sensor) -> Self {
            self.set_endstop(sensor);
            self
        }

        /// Builder: sets the stall model.
        pub fn with_stall(self, sensor: Sensor) -> Self {
            self.set_stall(sensor);
            self
        }

        pub fn set_endstop(&self, sensor: Sensor) {
            self.state.lock().unwrap().endstop = sensor;
        }

        pub fn set_endstop2(&self, sensor: Sensor) {
            self.state.lock().unwrap().endstop2 = sensor;
        }

        pub fn set_stall(&self, sensor: Sensor) {
            self.state.lock().unwrap().stall = sensor;
        }

        /// Reports a stall on each of the next `pulses` pulses.
        pub fn stall_for_pulses(&self, pulses: u64) {
            self.state.lock().unwrap().stall_pulses = pulses;
        }

        /// Moves the simulated motor without pulsing it.
        pub fn set_position(&self, position: i128) {
            self.state.lock().unwrap().position = position;
        }

        /// Physical position of the simulated motor.
        pub fn position(&self) -> i128 {
            self.state.lock().unwrap().position
        }

        /// Number of pulses emitted so far.
        pub fn pulses(&self) -> u64 {
            self.state.lock().unwrap().pulses
        }

        pub fn is_enabled(&self) -> bool {
            self.state.lock().unwrap().enabled
        }
    }
    impl AxisDriver for TestDriver {
        fn step(&mut self, direction: Direction) {
            let mut state = self.state.lock().unwrap();
            state.position += direction.sign() as i128;
            state.pulses += 1;
            state.stalling = state.stall_pulses > 0;
            state.stall_pulses = state.stall_pulses.saturating_sub(1);
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.state.lock().unwrap().enabled = enabled;
        }

        fn read_endstop(&self, input: EndstopInput) -> Level {
            let state = self.state.lock().unwrap();
            let sensor = match input {
                EndstopInput::Primary => state.endstop,
                EndstopInput::Secondary => state.endstop2,
            };
            if sensor.active(state.position) {
                Level::High
            } else {
                Level::Low
            }
        }

        fn read_stall(&self) -> bool {
            let state = self.state.lock().unwrap();
            state.stalling || state.stall.active(state.position)
        }
    }

    #[test]
    fn test_test_driver_shares_state() {
        let driver = TestDriver::new(0).with_endstop(Sensor::AtOrAbove(2));
        let mut moved = driver.clone();
        assert_eq!(Level::Low, driver.read_endstop(EndstopInput::Primary));
        moved.step(Direction::Positive);
        moved.step(Direction::Positive);
        assert_eq!(2, driver.position());
        assert_eq!(2, driver.pulses());
        assert_eq!(Level::High, driver.read_endstop(EndstopInput::Primary));
        assert_eq!(Level::Low, driver.read_endstop(EndstopInput::Secondary));
    }

    #[test]
    fn test_sensor_models() {
        assert!(Sensor::Every(100).active(-200));
        assert!(!Sensor::Every(100).active(50));
        assert!(Sensor::Between(3, 5).active(3));
        assert!(!Sensor::Between(3, 5).active(5));
        assert!(Sensor::AtOrBelow(0).active(-1));
    }

    #[test]
    fn test_stall_for_pulses() {
        let mut driver = TestDriver::new(0);
        driver.stall_for_pulses(2);
        driver.step(Direction::Positive);
        assert!(driver.read_stall());
        driver.step(Direction::Positive);
        assert!(driver.read_stall());
        driver.step(Direction::Positive);
        assert!(!driver.read_stall());
    }
}
