use arduino_hal::pac::TC0;

/// Coarse millisecond clock on timer 0.
///
/// The timer raises its compare flag once per millisecond. Flags raised
/// while the firmware is busy elsewhere are merged into one, so the clock
/// runs slow during long blocking sections. That only delays debouncing.
pub struct Clock {
    tc0: TC0,
    millis: u32,
}
impl Clock {
    /// Creates a new `Clock`, counting from zero.
    pub fn new(tc0: TC0) -> Self {
        // 16 MHz / 64 / 250 = 1 kHz
        tc0.tccr0a.write(|w| w.wgm0().ctc());
        tc0.ocr0a.write(|w| w.bits(249));
        tc0.tccr0b.write(|w| w.cs0().prescale_64());
        Self { tc0, millis: 0 }
    }

    /// Milliseconds since start-up.
    pub fn now_ms(&mut self) -> u32 {
        if self.tc0.tifr0.read().ocf0a().bit_is_set() {
            self.tc0.tifr0.write(|w| w.ocf0a().set_bit());
            self.millis = self.millis.wrapping_add(1);
        }
        self.millis
    }

    /// Accounts for a delay spent blocking.
    pub fn advance(&mut self, milliseconds: u32) {
        self.millis = self.millis.wrapping_add(milliseconds);
    }
}
