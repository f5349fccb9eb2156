use arduino_hal::{
    delay_us,
    hal::port::Dynamic,
    port::{
        mode::{Floating, Input, Output, PullUp},
        Pin,
    },
    prelude::_unwrap_infallible_UnwrapInfallible,
};
use embedded_hal::digital::{OutputPin, PinState};
use smuff::{AxisDriver, Direction, EndstopInput, Level};

/// Level of the direction pin for a direction.
///
/// Positive is associated with a "high" direction signal.
fn direction_pin_state(direction: Direction) -> PinState {
    match direction {
        Direction::Positive => PinState::High,
        Direction::Negative => PinState::Low,
    }
}

/// Pins that belong to one stepper axis.
pub struct StepperPins {
    /// Pin to use for pulses.
    pub pulse: Pin<Output, Dynamic>,
    /// Pin to use for direction indication.
    pub direction: Pin<Output, Dynamic>,
    /// Driver enable pin (active low).
    pub enable: Pin<Output, Dynamic>,
    pub endstop: Pin<Input<PullUp>, Dynamic>,
    /// Second endstop, fitted on the feeder only.
    pub endstop2: Option<Pin<Input<PullUp>, Dynamic>>,
    /// Stall (DIAG) output of the driver, if it has one.
    pub diag: Option<Pin<Input<Floating>, Dynamic>>,
}

/// Stepper motor on a CNC shield, with its endstops and stall output.
///
/// All axes share this type so the motion core can hold them side by side;
/// the pins are downgraded to dynamic pins to make that possible.
pub struct Stepper {
    pins: StepperPins,
    /// Stores the current direction.
    direction: Direction,
    /// Delay between pulses, in microseconds.
    delay_pulse_us: u32,
    /// Delay between direction changes, in microseconds.
    delay_direction_us: u32,
}

impl Stepper {
    /// Creates a new `Stepper`, with its driver powered off.
    ///
    /// # Parameters
    ///
    /// - `pins`: Pins of the axis.
    /// - `delay_pulse_us`: Width of a step pulse, in microseconds.
    /// - `delay_direction_us`: Settle time around direction changes, in
    ///   microseconds.
    pub fn new(
        pins: StepperPins,
        delay_pulse_us: u32,
        delay_direction_us: u32,
    ) -> Self {
        let direction = Direction::Negative;
        let mut stepper = Self {
            pins,
            direction,
            delay_pulse_us,
            delay_direction_us,
        };

        // Ensure that the direction we think we have is really what's set on
        // the pin.
        stepper.force_set_direction(direction);
        stepper.pins.enable.set_high();

        stepper
    }

    /// Set the direction, but only if it needs changing.
    fn set_direction(&mut self, direction: Direction) {
        if direction != self.direction {
            self.force_set_direction(direction);
        }
    }

    /// Force set the direction.
    fn force_set_direction(&mut self, direction: Direction) {
        delay_us(self.delay_direction_us);
        self.pins
            .direction
            .set_state(direction_pin_state(direction))
            .unwrap_infallible();
        self.direction = direction;
        delay_us(self.delay_direction_us);
    }
}

impl AxisDriver for Stepper {
    fn step(&mut self, direction: Direction) {
        self.set_direction(direction);
        self.pins.pulse.set_high();
        delay_us(self.delay_pulse_us);
        self.pins.pulse.set_low();
    }

    fn set_enabled(&mut self, enabled: bool) {
        // Active low.
        self.pins
            .enable
            .set_state(PinState::from(!enabled))
            .unwrap_infallible();
    }

    fn read_endstop(&self, input: EndstopInput) -> Level {
        let pin = match input {
            EndstopInput::Primary => Some(&self.pins.endstop),
            EndstopInput::Secondary => self.pins.endstop2.as_ref(),
        };
        match pin {
            Some(pin) if pin.is_high() => Level::High,
            _ => Level::Low,
        }
    }

    fn read_stall(&self) -> bool {
        self.pins.diag.as_ref().is_some_and(|pin| pin.is_high())
    }
}
