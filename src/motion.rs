mod axis;
mod axis_id;
mod controller;
mod direction;
pub(crate) mod driver;
mod endstop;
mod linear_converter;
mod profile;
mod rotary_converter;
mod scheduler;
mod stall;
mod steps;
mod timer;
mod units;

pub use axis::Axis;
pub use axis_id::AxisId;
pub use controller::MotionController;
pub use direction::Direction;
pub use driver::AxisDriver;
pub use driver::EndstopInput;
pub use driver::Level;
pub use endstop::Debouncer;
pub use endstop::Endstop;
pub use linear_converter::LinearConverter;
pub use profile::AccelProfile;
pub use rotary_converter::RotaryConverter;
pub use scheduler::AxisMask;
pub use scheduler::Scheduled;
pub use scheduler::Scheduler;
pub use stall::StallMonitor;
pub use steps::Steps;
pub use timer::StepTimer;
pub use units::AxisUnits;
pub use units::Distance;

#[cfg(test)]
pub use driver::tests::TestDriver;
#[cfg(test)]
pub use timer::tests::TestTimer;
