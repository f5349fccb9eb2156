use arduino_hal::pac::TC1;
use smuff::{StepTimer, Ticks};

/// Timer 1 pacing the step pulses.
///
/// Runs in CTC mode with a prescaler of 8, so one tick is 0.5 µs on a
/// 16 MHz Uno. Nothing is interrupt driven: the compare flag is polled
/// from the main loop.
pub struct StepTimer1 {
    tc1: TC1,
    parked: bool,
}
impl StepTimer1 {
    /// Tick frequency of the timer.
    pub const HZ: u32 = 2_000_000;

    /// Creates a new `StepTimer1`, parked.
    pub fn new(tc1: TC1) -> Self {
        tc1.tccr1a.write(|w| w.wgm1().bits(0b00));
        tc1.tccr1b
            .write(|w| w.wgm1().bits(0b01).cs1().prescale_8());
        let mut timer = Self { tc1, parked: false };
        timer.park();
        timer
    }

    /// Restarts the counter with a new compare value and clears the
    /// compare flag.
    fn restart(&mut self, ticks: Ticks) {
        self.tc1.ocr1a.write(|w| w.bits(ticks.get_value()));
        self.tc1.tcnt1.write(|w| w.bits(0));
        self.tc1.tifr1.write(|w| w.ocf1a().set_bit());
    }
}

impl StepTimer for StepTimer1 {
    fn arm(&mut self, ticks: Ticks) {
        self.parked = false;
        self.restart(ticks);
    }

    fn park(&mut self) {
        self.parked = true;
        self.restart(Ticks::PARKED);
    }

    fn expired(&mut self) -> bool {
        if self.parked || self.tc1.tifr1.read().ocf1a().bit_is_clear() {
            return false;
        }
        // Writing a one clears the flag.
        self.tc1.tifr1.write(|w| w.ocf1a().set_bit());
        true
    }
}
