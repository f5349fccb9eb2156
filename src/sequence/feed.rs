use super::{FeedOutcome, FeedState, Servo, Unit};
use crate::{
    AxisDriver, AxisId, Distance, Error, Event, Failure, Host, Interaction,
    Microns, Signal, SnapshotStorage, Speed, StepTimer, Steps,
};

/// Pause once the feeder has stopped at its endstop.
const FEED_SETTLE_MS: u32 = 300;

/// Pause before retracting after an escalation.
const ESCALATION_SETTLE_MS: u32 = 250;

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Loads the filament of the selected tool up to the nozzle.
    ///
    /// The filament is fed to the feeder endstop, through the bowden tube
    /// and then pushed a little further to reinforce the load.
    ///
    /// # Returns
    ///
    /// - `Ok(outcome)` of the endstop search once the filament is at the
    ///   nozzle.
    /// - `Err(Error::Jammed)` if it never reached the feeder endstop. The
    ///   unit then stays jammed until an unload succeeds.
    pub fn load_filament<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.require_tool(host)?;
        self.ensure_not_jammed(host)?;
        if self.config.external_feeder {
            self.clamp_filament(host)?;
            host.signal(Signal::LoadFilament);
            return Ok(FeedOutcome::Succeeded);
        }

        let saved = self.motion.max_speed(AxisId::Feeder);
        let result = self.load_to_nozzle(interaction, host);
        self.motion.restore_speed(AxisId::Feeder, saved);
        self.state = FeedState::Idle;
        result
    }

    fn load_to_nozzle<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.state = FeedState::SeekingEndstop;
        let outcome = self.feed_to_endstop(interaction, host)?;
        if outcome == FeedOutcome::Jammed {
            return Err(Error::Jammed);
        }

        self.state = FeedState::FeedingToNozzle;
        self.motion.axis_mut(AxisId::Feeder).reset_steps_taken();
        self.feed_to_nozzle(host)?;

        self.state = FeedState::Reinforcing;
        if self.config.reinforce_length > Microns::zero() {
            self.reset_revolver(host)?;
            self.motion
                .prepare_travel(AxisId::Feeder, self.config.reinforce_length, true)?;
            self.motion.run_and_wait(host)?;
        }

        self.release_after_feed(host)?;
        self.persist(host)?;
        Ok(outcome)
    }

    /// Loads the selected tool the way a Prusa MMU2 does.
    ///
    /// The filament goes to the feeder endstop and is then pulled back by
    /// the selector distance, leaving the rest of the load to the printer's
    /// extruder.
    pub fn load_filament_mmu2<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.require_tool(host)?;
        self.ensure_not_jammed(host)?;
        if self.config.external_feeder {
            self.clamp_filament(host)?;
            host.signal(Signal::LoadFilament);
            return Ok(FeedOutcome::Succeeded);
        }

        let saved = self.motion.max_speed(AxisId::Feeder);
        let result = self.load_to_selector(interaction, host);
        self.motion.restore_speed(AxisId::Feeder, saved);
        self.motion.axis_mut(AxisId::Feeder).set_ignore_abort(false);
        self.state = FeedState::Idle;
        result
    }

    fn load_to_selector<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.state = FeedState::SeekingEndstop;
        let outcome = self.feed_to_endstop(interaction, host)?;
        if outcome == FeedOutcome::Jammed {
            return Err(Error::Jammed);
        }

        self.state = FeedState::RetractingFromSelector;
        let feeder = self.motion.axis_mut(AxisId::Feeder);
        feeder.reset_steps_taken();
        feeder.set_ignore_abort(true);
        self.motion.set_speed(AxisId::Feeder, self.config.insert_speed);
        self.motion
            .prepare_travel(AxisId::Feeder, -self.config.selector_distance, true)?;
        self.motion.run_and_wait(host)?;

        self.state = FeedState::Reinforcing;
        if self.config.reinforce_length > Microns::zero() {
            self.reset_revolver(host)?;
            self.motion
                .prepare_travel(AxisId::Feeder, self.config.reinforce_length, true)?;
            self.motion.run_and_wait(host)?;
        }

        self.release_after_feed(host)?;
        self.persist(host)?;
        Ok(outcome)
    }

    /// Feeds the filament of the selected tool up to the feeder endstop.
    ///
    /// The filament advances in insert-length increments. A stall slows the
    /// feeder down and spends a retry. Feeding twice the selector distance
    /// without reaching the endstop escalates: the filament is pulled back,
    /// the revolver reset, and on the last two retries the selector is
    /// repositioned (the very last time after retracting all neighbouring
    /// filaments). Once the retries are spent the feed is jammed, unless
    /// the operator chooses to try again.
    ///
    /// Abort requests are ignored while the search runs.
    pub fn feed_to_endstop<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.require_tool(host)?;
        self.ensure_not_jammed(host)?;
        self.motion.set_enabled(AxisId::Feeder, true);
        self.motion.axis_mut(AxisId::Feeder).set_ignore_abort(true);
        let saved = self.motion.max_speed(AxisId::Feeder);

        let result = self.seek_feeder_endstop(interaction, host);

        let feeder = self.motion.axis_mut(AxisId::Feeder);
        feeder.set_ignore_abort(false);
        feeder.set_accel_enabled(true);
        feeder.set_max_speed(saved);
        host.delay_ms(FEED_SETTLE_MS);
        result
    }

    fn seek_feeder_endstop<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<FeedOutcome, Error> {
        self.clamp_filament(host)?;
        if self.feeder_loaded() {
            self.retract_until_released(host)?;
        }

        let mut speed = self.config.insert_speed;
        self.motion.set_speed(AxisId::Feeder, speed);
        // Accelerate only when inserting faster than acceleration starts.
        let accelerate = self.motion.max_speed(AxisId::Feeder)
            < self.motion.axis(AxisId::Feeder).accel_speed();
        self.motion
            .axis_mut(AxisId::Feeder)
            .set_accel_enabled(accelerate);

        let cap = self.config.selector_distance.times(2);
        let increment = self.config.insert_length;
        let mut fed = Microns::zero();
        let mut retries = self.config.feed_error_retries;
        let mut retried = false;
        self.motion.set_position(AxisId::Feeder, Steps::zero());

        while !self.feeder_loaded() {
            self.motion.prepare_travel(AxisId::Feeder, increment, false)?;
            self.motion.run_and_wait(host)?;
            if self.feeder_loaded() {
                break;
            }
            fed = fed + increment;

            let stalled = self.handle_feeder_stall(&mut speed, &mut retries, host);
            retried |= stalled;
            if fed >= cap {
                self.escalate(stalled, &mut retries, host)?;
                retried = true;
                fed = Microns::zero();
            }

            if retries < 0 {
                if interaction == Interaction::Operator && self.offer_feed_retry(host)? {
                    retries = self.config.feed_error_retries;
                    speed = self.config.insert_speed;
                    self.motion.set_speed(AxisId::Feeder, speed);
                    fed = Microns::zero();
                    continue;
                }
                self.jam(host);
                return Ok(FeedOutcome::Jammed);
            }
        }

        Ok(if retried {
            FeedOutcome::RetriedAndSucceeded
        } else {
            FeedOutcome::Succeeded
        })
    }

    /// One escalation cycle after feeding the full cap without reaching the
    /// endstop.
    fn escalate<H: Host>(
        &mut self,
        stalled: bool,
        retries: &mut i8,
        host: &mut H,
    ) -> Result<(), Error> {
        host.delay_ms(ESCALATION_SETTLE_MS);
        self.motion.prepare_travel(
            AxisId::Feeder,
            -self.config.insert_length.scale(1, 2),
            true,
        )?;
        self.motion.run_and_wait(host)?;
        self.reset_revolver(host)?;

        if !stalled {
            *retries -= 1;
        }
        if *retries < 0 {
            return Ok(());
        }
        host.report(Event::FeedRetry {
            retries_left: *retries,
        });
        match *retries {
            1 => self.reposition_selector(false, host)?,
            0 => self.reposition_selector(true, host)?,
            _ => {}
        }
        self.set_lid(false);
        Ok(())
    }

    /// Parks the unit and asks the operator whether to retry a failed feed.
    fn offer_feed_retry<H: Host>(&mut self, host: &mut H) -> Result<bool, Error> {
        if !self.is_servo() {
            self.motion.home(AxisId::Revolver, &self.config, host)?;
        }
        self.motion.motors_off();
        self.set_lid(true);
        if !host.offer_retry(Failure::FeedJammed) {
            return Ok(false);
        }

        for id in AxisId::ALL {
            self.motion.set_enabled(id, true);
        }
        self.clamp_filament(host)?;
        Ok(true)
    }

    /// Feeds the filament from the feeder endstop through the bowden tube.
    ///
    /// Either in equal chunks, or the first 95% at full speed and the rest
    /// at insert speed. Stalls slow the feeder down until the retries run
    /// out.
    pub fn feed_to_nozzle<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.ensure_not_jammed(host)?;
        let bowden = self.config.bowden_length;
        if self.config.enable_chunks {
            let chunks = self.config.feed_chunks.max(1);
            let chunk = bowden.scale(1, chunks as i32);
            for _ in 0..chunks {
                self.motion.prepare_travel(AxisId::Feeder, chunk, true)?;
                self.motion.run_and_wait(host)?;
            }
            return Ok(());
        }

        let cruise = Speed::Ticks(self.motion.max_speed(AxisId::Feeder));
        self.feed_stretch(bowden.scale(95, 100), cruise, host)?;
        let insert = self.config.insert_speed;
        self.feed_stretch(bowden - bowden.scale(95, 100), insert, host)
    }

    /// Feeds a given length, resuming at a lower speed after each stall.
    fn feed_stretch<H: Host>(
        &mut self,
        length: Microns,
        speed: Speed,
        host: &mut H,
    ) -> Result<(), Error> {
        let mut speed = speed;
        let mut retries = self.config.feed_error_retries;
        let start = self.motion.position(AxisId::Feeder);
        loop {
            self.motion.set_speed(AxisId::Feeder, speed);
            let remaining = length - self.feeder_travel_since(start);
            self.motion.prepare_travel(AxisId::Feeder, remaining, true)?;
            self.motion.run_and_wait(host)?;
            if !self.handle_feeder_stall(&mut speed, &mut retries, host) {
                return Ok(());
            }
            if retries <= 0 {
                return Err(Error::StallDetected(AxisId::Feeder));
            }
        }
    }

    /// Filament fed since the feeder was at `start`.
    pub(super) fn feeder_travel_since(&self, start: Steps) -> Microns {
        let moved = self.motion.position(AxisId::Feeder) - start;
        match self.motion.axis(AxisId::Feeder).units().to_distance(moved) {
            Distance::Linear(microns) => microns,
            Distance::Angular(_) => Microns::zero(),
        }
    }
}
