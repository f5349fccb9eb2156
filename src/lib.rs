#![cfg_attr(not(test), no_std)]

mod config;
mod error;
mod host;
mod microns;
mod millidegrees;
mod motion;
mod sequence;
mod speed;
mod store;
mod ticks;

pub use config::AxisConfig;
pub use config::Config;
pub use config::RevolverMode;
pub use config::FEED_ERROR_RETRIES;
pub use config::MAX_TOOLS;
pub use error::Error;
pub use host::Event;
pub use host::Failure;
pub use host::Host;
pub use host::Interaction;
pub use host::Io;
pub use host::Severity;
pub use host::Signal;
pub use microns::udisplay_millis;
pub use microns::Microns;
pub use millidegrees::MilliDegrees;
pub use motion::*;
pub use sequence::FeedOutcome;
pub use sequence::FeedState;
pub use sequence::NoLid;
pub use sequence::Parts;
pub use sequence::Servo;
pub use sequence::StallSide;
pub use sequence::Unit;
pub use speed::Speed;
pub use store::PositionStore;
pub use store::Snapshot;
pub use store::SnapshotStorage;
pub use store::StoreError;
pub use store::RECORD_LEN;
pub use ticks::Ticks;

#[cfg(test)]
pub use host::tests::TestHost;
#[cfg(test)]
pub use sequence::TestServo;
#[cfg(test)]
pub use store::tests::TestStorage;
