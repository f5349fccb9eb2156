//! Simulated unit shared by the sequence tests.
//!
//! Every axis runs at ten steps per millimetre (or one step per degree), so
//! positions are easy to follow:
//!
//! - selector endstop at physical zero, tool `t` at `12 + 210 t`;
//! - revolver endstop every full turn (360 steps), slot `t` at `12 + 12 t`;
//! - feeder endstop reached once the filament tip is at 200 or beyond.

use super::{Parts, TestServo, Unit};
use crate::motion::driver::tests::Sensor;
use crate::{
    AxisUnits, Config, Error, Interaction, LinearConverter, RotaryConverter,
    TestDriver, TestHost, TestStorage, TestTimer,
};

/// Physical feeder position of the feeder endstop.
pub const FEEDER_ENDSTOP: i128 = 200;

pub struct Rig {
    pub selector: TestDriver,
    pub revolver: TestDriver,
    pub feeder: TestDriver,
    pub lid: TestServo,
    pub storage: TestStorage,
    pub unit: Unit<TestDriver, TestTimer, TestServo, TestStorage>,
}

pub fn rig() -> Rig {
    rig_with(|_| {})
}

pub fn rig_with(adjust: impl FnOnce(&mut Config)) -> Rig {
    let mut config = Config::default();
    config.selector.units = AxisUnits::Linear(LinearConverter::per_mm(10));
    config.selector.accel_distance = 20;
    config.selector.max_steps = 2000;
    config.revolver.units = AxisUnits::Rotary(RotaryConverter::new(360));
    config.revolver.accel_distance = 5;
    config.revolver.max_steps = 360;
    config.feeder.units = AxisUnits::Linear(LinearConverter::per_mm(10));
    config.feeder.accel_distance = 50;
    config.feeder.max_steps = 8000;
    adjust(&mut config);

    let selector = TestDriver::new(0).with_endstop(Sensor::AtOrBelow(0));
    let revolver = TestDriver::new(0).with_endstop(Sensor::Every(360));
    let feeder = TestDriver::new(0).with_endstop(Sensor::AtOrAbove(FEEDER_ENDSTOP));
    let lid = TestServo::new();
    let storage = TestStorage::new();

    let unit = Unit::new(
        config,
        Parts {
            selector: selector.clone(),
            revolver: revolver.clone(),
            feeder: feeder.clone(),
            timer: TestTimer::new(),
            lid: lid.clone(),
            storage: storage.clone(),
        },
    );
    Rig {
        selector,
        revolver,
        feeder,
        lid,
        storage,
        unit,
    }
}

/// A unit that jammed while loading `tool`, with a fresh host.
///
/// The feeder endstop stays dark, so loading runs out of retries.
pub fn jammed(tool: u8) -> (Rig, TestHost) {
    let mut rig = rig();
    let mut host = TestHost::new();
    rig.unit
        .select_tool(tool, Interaction::Silent, &mut host)
        .unwrap();
    rig.feeder.set_endstop(Sensor::Never);
    assert_eq!(
        Err(Error::Jammed),
        rig.unit.load_filament(Interaction::Silent, &mut host)
    );
    assert!(rig.unit.is_jammed());
    (rig, TestHost::new())
}
