use ufmt_macros::uDebug;

use crate::{AxisId, Speed, StoreError};

/// Outcome of servicing pending input between scheduler polls.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Io {
    /// Nothing that concerns the running movement.
    Idle,
    /// An abort was requested.
    Abort,
}

/// Whether an operation may ask the operator for decisions.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Prompts may be shown and answered.
    Operator,
    /// Run unattended; failures are reported, never prompted.
    Silent,
}

/// Status lines raised towards the printer or an external controller.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    SelectorBusy,
    SelectorReady,
    /// Ask the printer to pull the filament in.
    LoadFilament,
    /// Ask the printer to push the filament out.
    UnloadFilament,
    NoTool,
    FeederJammed,
    /// Debounced state of the feeder endstop.
    FeederEndstop(bool),
}

/// Failures the operator can be asked to retry.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The filament did not reach the feeder endstop.
    FeedJammed,
}

/// Severity of an [Event].
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Things worth logging while the unit works.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Homed(AxisId),
    ToolSelected { tool: u8 },
    SelectorStalled { attempt: u8 },
    StallProbe { axis: AxisId, left: bool, right: bool },
    FeederStalled { speed: Speed, retries_left: i8 },
    FeedRetry { retries_left: i8 },
    Repositioning { retract: bool },
    FeederJammed,
    UnloadIncomplete,
    Aborted,
    SnapshotRestored { tool: i8 },
    SnapshotUnavailable(StoreError),
    SnapshotSaved,
}
impl Event {
    pub fn severity(&self) -> Severity {
        use Event::*;
        match self {
            Homed(_) | ToolSelected { .. } | SnapshotRestored { .. }
            | SnapshotSaved => Severity::Info,
            SelectorStalled { .. }
            | StallProbe { .. }
            | FeederStalled { .. }
            | FeedRetry { .. }
            | Repositioning { .. }
            | Aborted
            | SnapshotUnavailable(_) => Severity::Warn,
            FeederJammed | UnloadIncomplete => Severity::Error,
        }
    }
}

/// Everything the motion core needs from its surroundings.
///
/// Blocking sequences call back into the host between scheduler polls and
/// whenever they need a delay, an operator decision or want to say
/// something.
pub trait Host {
    /// Drains pending input (serial lines, buttons) without blocking.
    fn service_io(&mut self) -> Io;

    /// Blocks for the specified number of milliseconds.
    fn delay_ms(&mut self, milliseconds: u32);

    /// Records an event.
    fn report(&mut self, event: Event);

    /// Raises a status signal.
    fn signal(&mut self, signal: Signal);

    /// Asks the operator whether to retry after a failure.
    ///
    /// # Returns
    ///
    /// - `true` to retry.
    /// - `false` to give up.
    fn offer_retry(&mut self, failure: Failure) -> bool;

    /// Asks the operator whether loaded filament may be unloaded first.
    fn confirm_unload(&mut self) -> bool;
}
