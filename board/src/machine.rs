use crate::{
    commands::command::Command,
    devices::{
        Clock, Console, EepromStorage, LidServo, StepTimer1, Stepper,
        StepperPins,
    },
};
use arduino_hal::{
    default_serial, delay_ms, pins, prelude::_unwrap_infallible_UnwrapInfallible,
    Eeprom, Peripherals, Pins,
};
use smuff::{
    Config, Debouncer, Error, Host, Interaction, Parts, Signal, Unit,
};
use ufmt::uwriteln;

type BoardUnit = Unit<Stepper, StepTimer1, LidServo, EepromStorage>;

pub struct Machine {
    unit: BoardUnit,
    console: Console,
    feeder_endstop: Debouncer,
}

impl Machine {
    /// Settle time of the published feeder endstop state.
    const ENDSTOP_SETTLE_MS: u32 = 200;
    /// Servo frames sent for each lid move.
    const SERVO_CYCLES: u8 = 25;

    pub fn new() -> Self {
        let peripherals: Peripherals = unsafe { Peripherals::steal() };
        let pins: Pins = pins!(peripherals);
        let mut serial = default_serial!(peripherals, pins, Console::BAUD_RATE);

        // Announce the machine!
        delay_ms(100);
        uwriteln!(&mut serial, "SMUFF").unwrap_infallible();

        // Delays
        let delay_pulse_us = 2;
        let delay_direction_us = 5;

        // Axes (CNC shield X, Y and Z)
        let selector = Stepper::new(
            StepperPins {
                pulse: pins.d2.into_output().downgrade(),
                direction: pins.d5.into_output().downgrade(),
                enable: pins.d8.into_output().downgrade(),
                endstop: pins.d9.into_pull_up_input().downgrade(),
                endstop2: None,
                diag: Some(pins.a0.into_floating_input().downgrade()),
            },
            delay_pulse_us,
            delay_direction_us,
        );
        let revolver = Stepper::new(
            StepperPins {
                pulse: pins.d3.into_output().downgrade(),
                direction: pins.d6.into_output().downgrade(),
                enable: pins.a4.into_output().downgrade(),
                endstop: pins.d10.into_pull_up_input().downgrade(),
                endstop2: None,
                diag: Some(pins.a1.into_floating_input().downgrade()),
            },
            delay_pulse_us,
            delay_direction_us,
        );
        let feeder = Stepper::new(
            StepperPins {
                pulse: pins.d4.into_output().downgrade(),
                direction: pins.d7.into_output().downgrade(),
                enable: pins.a5.into_output().downgrade(),
                endstop: pins.d11.into_pull_up_input().downgrade(),
                endstop2: Some(pins.a3.into_pull_up_input().downgrade()),
                diag: Some(pins.a2.into_floating_input().downgrade()),
            },
            delay_pulse_us,
            delay_direction_us,
        );

        let parts = Parts {
            selector,
            revolver,
            feeder,
            timer: StepTimer1::new(peripherals.TC1),
            lid: LidServo::new(pins.d12.into_output(), Self::SERVO_CYCLES),
            storage: EepromStorage::new(Eeprom::new(peripherals.EEPROM)),
        };
        let config = Config {
            timer_hz: StepTimer1::HZ,
            ..Config::default()
        };
        let mut unit = Unit::new(config, parts);

        let mut console = Console::new(serial, Clock::new(peripherals.TC0));
        unit.restore(&mut console);

        Self {
            unit,
            console,
            feeder_endstop: Debouncer::new(Self::ENDSTOP_SETTLE_MS),
        }
    }

    /// Runs the next pending command, if there is one, and publishes
    /// changes of the feeder endstop.
    pub fn poll(&mut self) {
        if let Some(command) = self.console.next_command() {
            self.run(command);
        }

        let now = self.console.now_ms();
        let loaded = self.unit.feeder_loaded();
        if let Some(state) = self.feeder_endstop.update(loaded, now) {
            self.console.signal(Signal::FeederEndstop(state));
        }
    }

    fn run(&mut self, command: Command) {
        let result = match command {
            Command::Select(tool) => self.run_select(tool),
            Command::Load(tool) => self.run_load(tool),
            Command::Unload(_) => self.unit.unload_filament(&mut self.console),
            Command::Abort => Ok(()),
            Command::QueryFinda => {
                let loaded = self.unit.feeder_loaded() as u8;
                uwriteln!(self.console.serial(), "{}ok", loaded)
                    .unwrap_infallible();
                return;
            }
        };
        match result {
            Ok(()) => uwriteln!(self.console.serial(), "ok").unwrap_infallible(),
            Err(err) => self.print_error(err),
        }
    }

    fn run_select(&mut self, tool: u8) -> Result<(), Error> {
        self.unit
            .select_tool(tool, Interaction::Silent, &mut self.console)
    }

    fn run_load(&mut self, tool: u8) -> Result<(), Error> {
        self.run_select(tool)?;
        self.unit
            .load_filament_mmu2(Interaction::Silent, &mut self.console)?;
        Ok(())
    }

    /// Print an error from the unit.
    fn print_error(&mut self, error: Error) {
        uwriteln!(self.console.serial(), "ERROR: {:?}", error)
            .unwrap_infallible();
    }
}
