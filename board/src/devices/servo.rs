use arduino_hal::{
    delay_us,
    port::{mode::Output, Pin, D12},
};
use smuff::Servo;

/// Hobby servo driving the revolver lid.
///
/// There is no hardware PWM left on the pin, so the pulse train is bit
/// banged for a fixed number of 20 ms frames, then the servo is left to
/// hold its position.
pub struct LidServo {
    pin: Pin<Output, D12>,
    /// Number of frames sent for each move.
    cycles: u8,
}
impl LidServo {
    const FRAME_US: u32 = 20_000;
    const MIN_PULSE_US: u32 = 544;
    const MAX_PULSE_US: u32 = 2400;

    /// Creates a new `LidServo`.
    ///
    /// # Parameters
    ///
    /// - `pin`: Signal pin of the servo.
    /// - `cycles`: Number of 20 ms frames sent for each move.
    pub fn new(pin: Pin<Output, D12>, cycles: u8) -> Self {
        Self { pin, cycles }
    }

    /// Width of the pulse that holds an angle.
    fn pulse_us(degrees: u8) -> u32 {
        let degrees = degrees.min(180) as u32;
        Self::MIN_PULSE_US
            + degrees * (Self::MAX_PULSE_US - Self::MIN_PULSE_US) / 180
    }
}

impl Servo for LidServo {
    fn set_angle(&mut self, degrees: u8) {
        let high = Self::pulse_us(degrees);
        for _ in 0..self.cycles {
            self.pin.set_high();
            delay_us(high);
            self.pin.set_low();
            delay_us(Self::FRAME_US - high);
        }
    }
}
