use super::{FeedState, Servo, Unit};
use crate::{
    AxisDriver, AxisId, Error, Event, Host, Microns, Signal, SnapshotStorage,
    Speed, StepTimer, Steps, Ticks,
};

/// Pause after the filament has left the nozzle.
const NOZZLE_SETTLE_MS: u32 = 500;

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Pulls the filament of the selected tool out of the nozzle and back
    /// past the selector.
    ///
    /// A successful unload clears a jam.
    ///
    /// # Returns
    ///
    /// - `Err(Error::EndstopNotReached(AxisId::Feeder))` if the feeder
    ///   endstop never released.
    pub fn unload_filament<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.require_tool(host)?;
        if self.config.external_feeder {
            self.clamp_filament(host)?;
            host.signal(Signal::UnloadFilament);
            return Ok(());
        }

        let saved = self.motion.max_speed(AxisId::Feeder);
        let result = self.unload_to_selector(saved, host);
        self.motion.restore_speed(AxisId::Feeder, saved);
        self.state = FeedState::Idle;
        result
    }

    fn unload_to_selector<H: Host>(
        &mut self,
        cruise: Ticks,
        host: &mut H,
    ) -> Result<(), Error> {
        self.motion.set_enabled(AxisId::Feeder, true);
        self.motion.axis_mut(AxisId::Feeder).reset_steps_taken();
        self.clamp_filament(host)?;

        self.state = FeedState::RetractingFromNozzle;
        let retract = self.config.unload_retract;
        if retract != Microns::zero() {
            self.motion.prepare_travel(AxisId::Feeder, retract, true)?;
            self.motion.run_and_wait(host)?;
            let pushback = self.config.unload_pushback;
            if pushback != Microns::zero() {
                self.motion.set_speed(AxisId::Feeder, self.config.insert_speed);
                self.motion.prepare_travel(AxisId::Feeder, pushback, true)?;
                self.motion.run_and_wait(host)?;
                host.delay_ms(self.config.pushback_delay_ms);
                self.motion.restore_speed(AxisId::Feeder, cruise);
            }
        }
        self.retract_until_released(host)?;

        self.state = FeedState::RetractingFromSelector;
        self.unload_from_selector(host)?;

        self.jammed = false;
        self.motion.set_position(AxisId::Feeder, Steps::zero());
        self.release_after_feed(host)?;
        self.persist(host)
    }

    /// Retracts until the feeder endstop releases.
    ///
    /// The endstop polarity is flipped for the duration, so movements stop
    /// as soon as the filament clears it.
    pub fn retract_until_released<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.motion.axis_mut(AxisId::Feeder).invert_endstop();
        let result = self.retract_while_loaded(host);
        self.motion.axis_mut(AxisId::Feeder).invert_endstop();
        result
    }

    fn retract_while_loaded<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let mut retries = self.config.feed_error_retries;
        loop {
            self.unload_from_nozzle(host)?;
            // Polarity is flipped: a hit endstop means released.
            if self.feeder_loaded() {
                return Ok(());
            }
            retries -= 1;
            if retries <= 0 {
                host.report(Event::UnloadIncomplete);
                return Err(Error::EndstopNotReached(AxisId::Feeder));
            }
        }
    }

    /// Retracts the filament through the bowden tube, stopping at the
    /// feeder endstop.
    ///
    /// Either in equal chunks, or in one movement of 110% of the bowden
    /// length. Stalls slow the feeder down until the retries run out.
    pub fn unload_from_nozzle<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let saved = self.motion.max_speed(AxisId::Feeder);
        let result = self.retract_bowden(host);
        self.motion.restore_speed(AxisId::Feeder, saved);
        result?;
        host.delay_ms(NOZZLE_SETTLE_MS);
        Ok(())
    }

    fn retract_bowden<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let bowden = self.config.bowden_length;
        if self.config.enable_chunks {
            let chunks = self.config.feed_chunks.max(1) as i32;
            let chunk = -bowden.scale(3, chunks);
            for _ in 0..chunks {
                self.motion.prepare_travel(AxisId::Feeder, chunk, false)?;
                self.motion.run_and_wait(host)?;
                if self.motion.axis(AxisId::Feeder).stopped_on_endstop() {
                    break;
                }
            }
            return Ok(());
        }

        let mut speed = Speed::Ticks(self.motion.max_speed(AxisId::Feeder));
        let mut retries = self.config.feed_error_retries;
        let start = self.motion.position(AxisId::Feeder);
        let length = bowden.scale(110, 100);
        loop {
            let remaining = length + self.feeder_travel_since(start);
            self.motion.prepare_travel(AxisId::Feeder, -remaining, false)?;
            self.motion.run_and_wait(host)?;
            if self.motion.axis(AxisId::Feeder).stopped_on_endstop()
                || !self.handle_feeder_stall(&mut speed, &mut retries, host)
            {
                return Ok(());
            }
            if retries <= 0 {
                return Err(Error::StallDetected(AxisId::Feeder));
            }
        }
    }

    /// Pulls the filament back from the feeder endstop past the selector,
    /// at insert speed.
    pub fn unload_from_selector<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let mut speed = self.config.insert_speed;
        let mut retries = self.config.feed_error_retries;
        let start = self.motion.position(AxisId::Feeder);
        let length = self.config.selector_distance;
        loop {
            self.motion.set_speed(AxisId::Feeder, speed);
            let remaining = length + self.feeder_travel_since(start);
            self.motion.prepare_travel(AxisId::Feeder, -remaining, true)?;
            self.motion.run_and_wait(host)?;
            if !self.handle_feeder_stall(&mut speed, &mut retries, host) {
                return Ok(());
            }
            if retries <= 0 {
                return Err(Error::StallDetected(AxisId::Feeder));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::motion::driver::tests::Sensor;
    use crate::sequence::rig::*;
    use crate::sequence::FeedState;
    use crate::{AxisId, Error, Event, Interaction, Signal, Steps, TestHost};

    fn loaded(tool: u8) -> (Rig, TestHost) {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit
            .select_tool(tool, Interaction::Silent, &mut host)
            .unwrap();
        rig.unit
            .load_filament(Interaction::Silent, &mut host)
            .unwrap();
        (rig, host)
    }

    #[test]
    fn test_unload_needs_tool() {
        let mut rig = rig();
        let mut host = TestHost::new();
        assert_eq!(
            Err(Error::NoToolSelected),
            rig.unit.unload_filament(&mut host)
        );
    }

    #[test]
    fn test_unload_filament() {
        let (mut rig, mut host) = loaded(0);
        rig.unit.unload_filament(&mut host).unwrap();

        // Retract 200, push back 50, retract until the endstop releases
        // (199), then the selector distance (230).
        assert_eq!(-31, rig.feeder.position());
        assert!(!rig.unit.feeder_loaded());
        assert_eq!(Steps::zero(), rig.unit.motion().position(AxisId::Feeder));
        assert_eq!(FeedState::Idle, rig.unit.state());
        assert!(host.delays.contains(&1500));
        assert_eq!(0, rig.storage.snapshot().unwrap().positions[2]);
    }

    #[test]
    fn test_unload_in_chunks() {
        let mut rig = rig_with(|config| {
            config.enable_chunks = true;
            config.feed_chunks = 20;
        });
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        rig.unit.load_filament(Interaction::Silent, &mut host).unwrap();
        rig.unit.unload_filament(&mut host).unwrap();
        assert_eq!(-31, rig.feeder.position());
    }

    #[test]
    fn test_unload_stuck_filament() {
        let (mut rig, mut host) = loaded(0);
        rig.feeder.set_endstop(Sensor::Always);

        let result = rig.unit.unload_filament(&mut host);
        assert_eq!(Err(Error::EndstopNotReached(AxisId::Feeder)), result);
        assert_eq!(1, host.count(|e| *e == Event::UnloadIncomplete));
        // The endstop polarity is back to normal.
        assert!(rig.unit.feeder_loaded());
    }

    #[test]
    fn test_retract_until_released() {
        let (mut rig, mut host) = loaded(0);
        rig.unit.retract_until_released(&mut host).unwrap();
        assert_eq!(199, rig.feeder.position());
        assert!(!rig.unit.feeder_loaded());
    }

    #[test]
    fn test_external_unload() {
        let mut rig = rig_with(|config| config.external_feeder = true);
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        host.signals.clear();
        rig.unit.unload_filament(&mut host).unwrap();
        assert_eq!(vec![Signal::UnloadFilament], host.signals);
        assert_eq!(0, rig.feeder.pulses());
    }
}
