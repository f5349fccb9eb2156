use core::fmt;

use ufmt_macros::uDebug;

use crate::{AxisId, StoreError};

/// Errors raised by motion and feed sequences.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An axis reached the end of its travel without its endstop firing.
    EndstopNotReached(AxisId),
    /// An axis kept stalling after every recovery attempt.
    StallDetected(AxisId),
    /// The feeder could not bring the filament to its endstop.
    ///
    /// The unit stays jammed until an unload succeeds.
    Jammed,
    /// A tool index outside the fitted tools.
    InvalidToolIndex(u8),
    /// An abort request stopped the movement.
    MotionAborted,
    /// The operation needs a selected tool.
    NoToolSelected,
    /// Filament is loaded and the operator declined to unload it.
    FilamentLoaded,
    /// A movement was requested on a powered-off axis.
    AxisDisabled(AxisId),
    /// A movement was requested while the axis is still moving.
    AxisBusy(AxisId),
    /// A distance in the wrong units for the axis.
    WrongUnits(AxisId),
    /// The position store failed.
    Store(StoreError),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndstopNotReached(axis) => {
                write!(f, "{:?}: endstop not reached", axis)
            }
            Error::StallDetected(axis) => write!(f, "{:?}: stall detected", axis),
            Error::Jammed => f.write_str("feeder jammed"),
            Error::InvalidToolIndex(tool) => write!(f, "invalid tool {}", tool),
            Error::MotionAborted => f.write_str("motion aborted"),
            Error::NoToolSelected => f.write_str("no tool selected"),
            Error::FilamentLoaded => f.write_str("filament still loaded"),
            Error::AxisDisabled(axis) => write!(f, "{:?}: axis disabled", axis),
            Error::AxisBusy(axis) => write!(f, "{:?}: axis busy", axis),
            Error::WrongUnits(axis) => {
                write!(f, "{:?}: distance in wrong units", axis)
            }
            Error::Store(e) => write!(f, "position store: {}", e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            "Feeder: endstop not reached",
            Error::EndstopNotReached(AxisId::Feeder).to_string()
        );
        assert_eq!("invalid tool 7", Error::InvalidToolIndex(7).to_string());
        assert_eq!(
            "Selector: axis busy",
            Error::AxisBusy(AxisId::Selector).to_string()
        );
        assert_eq!(
            "position store: checksum mismatch",
            Error::from(StoreError::Checksum).to_string()
        );
    }
}
