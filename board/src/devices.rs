mod clock;
mod console;
mod eeprom;
mod servo;
mod step_timer;
mod stepper;

pub use clock::Clock;
pub use console::Console;
pub use eeprom::EepromStorage;
pub use servo::LidServo;
pub use step_timer::StepTimer1;
pub use stepper::{Stepper, StepperPins};
