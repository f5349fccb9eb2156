use arduino_hal::{
    delay_ms,
    hal::port::{PD0, PD1},
    pac::USART0,
    port::{
        mode::{Input, Output},
        Pin,
    },
    prelude::_unwrap_infallible_UnwrapInfallible,
    Usart,
};
use heapless::{Deque, String};
use smuff::{Event, Failure, Host, Io, Severity, Signal};
use ufmt::uwriteln;

use crate::{
    commands::{command::Command, command_parser},
    devices::Clock,
};

pub type UnoSerial = Usart<USART0, Pin<Input, PD0>, Pin<Output, PD1>>;

/// Serial link to the printer.
///
/// Input is read without blocking. Complete lines are parsed into commands
/// and queued; an abort is handed straight to the running movement.
pub struct Console {
    serial: UnoSerial,
    line: String<32>,
    pending: Deque<Command, 4>,
    clock: Clock,
}

impl Console {
    pub const BAUD_RATE: u32 = 57600;

    /// Creates a new `Console`.
    pub fn new(serial: UnoSerial, clock: Clock) -> Self {
        Self {
            serial,
            line: String::new(),
            pending: Deque::new(),
            clock,
        }
    }

    /// The serial port, for writing replies.
    pub fn serial(&mut self) -> &mut UnoSerial {
        &mut self.serial
    }

    pub fn now_ms(&mut self) -> u32 {
        self.clock.now_ms()
    }

    /// Takes the next queued command, reading new input first.
    pub fn next_command(&mut self) -> Option<Command> {
        if let Io::Abort = self.service_io() {
            // Nothing is moving, so there is nothing to abort.
            uwriteln!(&mut self.serial, "ok").unwrap_infallible();
        }
        self.pending.pop_front()
    }

    /// Reads one character if there is one.
    fn read_char(&mut self) -> Option<u8> {
        match self.serial.read() {
            Ok(c) => Some(c),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(never)) => match never {},
        }
    }

    /// Reads characters until a line is complete.
    ///
    /// # Returns
    ///
    /// - `true` once `self.line` holds a complete line.
    /// - `false` if the input ran dry first.
    fn read_line(&mut self) -> bool {
        while let Some(c) = self.read_char() {
            match c {
                b'\n' => return true,
                b'\r' => {}
                c => {
                    if self.line.push(c as char).is_err() {
                        self.line.clear();
                        uwriteln!(&mut self.serial, "ERROR: line too long.")
                            .unwrap_infallible();
                    }
                }
            }
        }
        false
    }

    /// Blocks until a complete line has been read.
    fn block_for_line(&mut self) {
        self.line.clear();
        while !self.read_line() {}
    }

    /// Blocks for a yes or no answer from the operator.
    fn ask(&mut self) -> bool {
        loop {
            self.block_for_line();
            match self.line.trim() {
                "y" | "Y" => return true,
                "n" | "N" => return false,
                _ => uwriteln!(&mut self.serial, "Answer y or n.")
                    .unwrap_infallible(),
            }
        }
    }
}

impl Host for Console {
    fn service_io(&mut self) -> Io {
        while self.read_line() {
            let parsed = command_parser::parse(&self.line);
            self.line.clear();
            match parsed {
                Ok(Command::Abort) => return Io::Abort,
                Ok(command) => {
                    if self.pending.push_back(command).is_err() {
                        uwriteln!(&mut self.serial, "ERROR: busy.")
                            .unwrap_infallible();
                    }
                }
                Err(_) => uwriteln!(&mut self.serial, "ERROR: unknown command.")
                    .unwrap_infallible(),
            }
        }
        Io::Idle
    }

    fn delay_ms(&mut self, milliseconds: u32) {
        delay_ms(milliseconds);
        self.clock.advance(milliseconds);
    }

    fn report(&mut self, event: Event) {
        let prefix = match event.severity() {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        uwriteln!(&mut self.serial, "{}: {:?}", prefix, event).unwrap_infallible();
    }

    fn signal(&mut self, signal: Signal) {
        uwriteln!(&mut self.serial, "SIGNAL: {:?}", signal).unwrap_infallible();
    }

    fn offer_retry(&mut self, failure: Failure) -> bool {
        uwriteln!(&mut self.serial, "RETRY? {:?} (y/n)", failure)
            .unwrap_infallible();
        self.ask()
    }

    fn confirm_unload(&mut self) -> bool {
        uwriteln!(&mut self.serial, "UNLOAD FIRST? (y/n)").unwrap_infallible();
        self.ask()
    }
}
