use ufmt_macros::uDebug;

use super::{Servo, Unit};
use crate::{
    AxisDriver, AxisId, AxisUnits, Distance, Error, Event, Host, MilliDegrees,
    SnapshotStorage, Speed, StepTimer,
};

/// Pause after nudging the filament back, before re-homing.
const NUDGE_SETTLE_MS: u32 = 500;

/// Where a stalled axis met resistance while being probed.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum StallSide {
    /// Stall detection is off for the axis; nothing was probed.
    Unchecked,
    /// Neither probe stalled.
    Clear,
    Left,
    Right,
    /// Both probes stalled; the obstruction is at the axis' position.
    Centre,
}
impl StallSide {
    fn classify(left: bool, right: bool) -> StallSide {
        match (left, right) {
            (false, false) => StallSide::Clear,
            (true, false) => StallSide::Left,
            (false, true) => StallSide::Right,
            (true, true) => StallSide::Centre,
        }
    }
}

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Works a stalled axis free.
    ///
    /// The axis is slowed to its acceleration start speed and probed a short
    /// distance either side, cycling motor power before each probe so the
    /// driver's stall flag clears. Then the filament is nudged back and the
    /// axis re-homed. A re-homed selector no longer sits on a tool, so the
    /// selection is dropped.
    ///
    /// # Returns
    ///
    /// - The side on which the probes met resistance.
    pub fn handle_stall<H: Host>(
        &mut self,
        id: AxisId,
        host: &mut H,
    ) -> Result<StallSide, Error> {
        self.ensure_not_jammed(host)?;
        if !self.config.axis(id).stop_on_stall {
            return Ok(StallSide::Unchecked);
        }

        let saved = self.motion.max_speed(id);
        let slow = self.motion.axis(id).accel_speed();
        self.motion.restore_speed(id, slow);
        let result = self.probe_and_rehome(id, host);
        self.motion.restore_speed(id, saved);
        result
    }

    fn probe_and_rehome<H: Host>(
        &mut self,
        id: AxisId,
        host: &mut H,
    ) -> Result<StallSide, Error> {
        let probe = self.probe_distance(id);
        let left = self.probe(id, probe, host)?;
        let right = self.probe(id, negate(probe), host)?;
        host.report(Event::StallProbe {
            axis: id,
            left,
            right,
        });

        if self.selected.is_some() {
            self.nudge_back_filament(host)?;
            host.delay_ms(NUDGE_SETTLE_MS);
        }
        if id != AxisId::Feeder {
            self.motion.set_enabled(id, true);
            self.motion.home(id, &self.config, host)?;
        }
        if id == AxisId::Selector && self.selected.take().is_some() {
            self.persist(host)?;
        }
        Ok(StallSide::classify(left, right))
    }

    /// Moves an axis a short way and reports whether it stalled.
    fn probe<H: Host>(
        &mut self,
        id: AxisId,
        distance: Distance,
        host: &mut H,
    ) -> Result<bool, Error> {
        self.motion.set_enabled(id, false);
        host.delay_ms(self.config.stall_settle_ms);
        self.motion.set_enabled(id, true);
        self.motion.prepare_travel(id, distance, true)?;
        self.motion.run_and_wait(host)?;
        Ok(self.motion.axis(id).stall_detected())
    }

    /// Probe travel in the units of an axis.
    ///
    /// Rotary axes probe as many degrees as linear axes probe millimetres.
    fn probe_distance(&self, id: AxisId) -> Distance {
        let probe = self.config.stall_probe_distance;
        match self.motion.axis(id).units() {
            AxisUnits::Linear(_) => probe.into(),
            AxisUnits::Rotary(_) => MilliDegrees::new(probe.get_value()).into(),
        }
    }

    /// Pushes the filament of the selected tool forward by one insert
    /// length, at insert speed.
    pub fn nudge_back_filament<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.require_tool(host)?;
        self.ensure_not_jammed(host)?;
        self.clamp_filament(host)?;

        let saved = self.motion.max_speed(AxisId::Feeder);
        self.motion.set_speed(AxisId::Feeder, self.config.insert_speed);
        let result = self
            .motion
            .prepare_travel(AxisId::Feeder, self.config.insert_length, true)
            .and_then(|_| self.motion.run_and_wait(host));
        self.motion.restore_speed(AxisId::Feeder, saved);
        result?;

        self.release_after_feed(host)?;
        self.persist(host)
    }

    /// Slows the feeder after a stall and spends one retry.
    ///
    /// # Returns
    ///
    /// - `true` if the last feeder movement stalled.
    pub(super) fn handle_feeder_stall<H: Host>(
        &mut self,
        speed: &mut Speed,
        retries: &mut i8,
        host: &mut H,
    ) -> bool {
        if !self.motion.axis(AxisId::Feeder).stall_detected() {
            return false;
        }
        *speed = speed.slowed();
        *retries -= 1;
        self.motion.set_speed(AxisId::Feeder, *speed);
        host.report(Event::FeederStalled {
            speed: *speed,
            retries_left: *retries,
        });
        true
    }
}

fn negate(distance: Distance) -> Distance {
    match distance {
        Distance::Linear(microns) => Distance::Linear(-microns),
        Distance::Angular(mdg) => Distance::Angular(MilliDegrees::new(-mdg.get_value())),
    }
}
