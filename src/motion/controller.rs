use crate::{
    Axis, AxisDriver, AxisId, Config, Distance, EndstopInput, Error, Event,
    Host, Io, Scheduler, Speed, StepTimer, Steps, Ticks,
};

/// The three axes of the unit, paced by one step timer.
///
/// Movements are prepared per axis, then run together until every axis has
/// finished. Running blocks the caller, but pending input is serviced
/// between polls of the timer so that aborts still get through.
///
/// # Type Parameters
///
/// - `D`: driver of each axis.
/// - `T`: step timer.
pub struct MotionController<D, T> {
    axes: [Axis<D>; 3],
    scheduler: Scheduler,
    timer: T,
    timer_hz: u32,
}

impl<D: AxisDriver, T: StepTimer> MotionController<D, T> {
    /// Creates a new `MotionController`.
    ///
    /// # Parameters
    ///
    /// - `selector`, `revolver`, `feeder`: Drivers of the axes.
    /// - `config`: Axis settings and timer frequency.
    /// - `timer`: Step timer; it is parked straight away.
    pub fn new(
        selector: D,
        revolver: D,
        feeder: D,
        config: &Config,
        mut timer: T,
    ) -> Self {
        timer.park();
        let hz = config.timer_hz;
        Self {
            axes: [
                Axis::new(AxisId::Selector, selector, &config.selector, hz),
                Axis::new(AxisId::Revolver, revolver, &config.revolver, hz),
                Axis::new(AxisId::Feeder, feeder, &config.feeder, hz),
            ],
            scheduler: Scheduler::new(),
            timer,
            timer_hz: hz,
        }
    }

    pub fn axis(&self, id: AxisId) -> &Axis<D> {
        &self.axes[id.index()]
    }

    pub fn axis_mut(&mut self, id: AxisId) -> &mut Axis<D> {
        &mut self.axes[id.index()]
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn position(&self, id: AxisId) -> Steps {
        self.axis(id).position()
    }

    /// Sets the position of an axis without moving it.
    pub fn set_position(&mut self, id: AxisId, position: Steps) {
        self.axis_mut(id).set_position(position);
    }

    /// Positions of all axes, in index order.
    pub fn positions(&self) -> [Steps; 3] {
        [
            self.axes[0].position(),
            self.axes[1].position(),
            self.axes[2].position(),
        ]
    }

    pub fn set_enabled(&mut self, id: AxisId, enabled: bool) {
        self.axis_mut(id).set_enabled(enabled);
    }

    /// Powers every motor off.
    pub fn motors_off(&mut self) {
        for axis in self.axes.iter_mut() {
            axis.set_enabled(false);
        }
    }

    pub fn endstop_hit(&self, id: AxisId, input: EndstopInput) -> bool {
        self.axis(id).endstop_hit(input)
    }

    /// Cruise interval an axis currently uses.
    pub fn max_speed(&self, id: AxisId) -> Ticks {
        self.axis(id).max_speed()
    }

    /// Sets the cruise speed of an axis.
    pub fn set_speed(&mut self, id: AxisId, speed: Speed) {
        let per_unit = self.axis(id).units().steps_per_unit();
        let interval = speed.to_ticks(per_unit, self.timer_hz);
        self.axis_mut(id).set_max_speed(interval);
    }

    /// Restores a cruise interval saved from [MotionController::max_speed].
    pub fn restore_speed(&mut self, id: AxisId, interval: Ticks) {
        self.axis_mut(id).set_max_speed(interval);
    }

    /// Requests that every axis not ignoring aborts stops at its next step.
    pub fn request_abort(&mut self) {
        for axis in self.axes.iter_mut() {
            axis.request_abort();
        }
    }

    /// Prepares a relative movement of an axis.
    ///
    /// A zero delta does nothing.
    ///
    /// # Parameters
    ///
    /// - `id`: Axis to move.
    /// - `delta`: Signed number of steps to move.
    /// - `ignore_endstop`: Keep moving even when the primary endstop is hit.
    pub fn prepare_move(
        &mut self,
        id: AxisId,
        delta: Steps,
        ignore_endstop: bool,
    ) -> Result<(), Error> {
        if self.axis_mut(id).prepare_move(delta, ignore_endstop)? {
            self.scheduler.activate(id.index());
        }
        Ok(())
    }

    /// Prepares a movement of an axis to an absolute position.
    pub fn prepare_move_to(
        &mut self,
        id: AxisId,
        target: Steps,
        ignore_endstop: bool,
    ) -> Result<(), Error> {
        let delta = target - self.position(id);
        self.prepare_move(id, delta, ignore_endstop)
    }

    /// Prepares a relative movement given in the axis' units.
    pub fn prepare_travel(
        &mut self,
        id: AxisId,
        distance: impl Into<Distance>,
        ignore_endstop: bool,
    ) -> Result<(), Error> {
        let steps = self
            .axis(id)
            .units()
            .to_steps(distance.into())
            .ok_or(Error::WrongUnits(id))?;
        self.prepare_move(id, steps, ignore_endstop)
    }

    /// Prepares a movement to an absolute position in the axis' units.
    pub fn prepare_travel_to(
        &mut self,
        id: AxisId,
        target: impl Into<Distance>,
        ignore_endstop: bool,
    ) -> Result<(), Error> {
        let target = self
            .axis(id)
            .units()
            .to_steps(target.into())
            .ok_or(Error::WrongUnits(id))?;
        self.prepare_move_to(id, target, ignore_endstop)
    }

    /// Services one expiry of the step timer.
    ///
    /// This is the body of the step interrupt.
    pub fn on_timer(&mut self) {
        self.scheduler.on_timer(&mut self.axes, &mut self.timer);
    }

    /// Runs every prepared movement until all have finished.
    ///
    /// # Returns
    ///
    /// - `Err(Error::MotionAborted)` if an abort stopped any axis. Positions
    ///   still account for every step taken before the abort, and the abort
    ///   request is cleared.
    pub fn run_and_wait<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.wait(host, None)
    }

    /// Runs prepared movements until the given axis has finished.
    ///
    /// Other axes keep their progress and finish on a later run.
    pub fn run_and_wait_axis<H: Host>(
        &mut self,
        id: AxisId,
        host: &mut H,
    ) -> Result<(), Error> {
        self.wait(host, Some(id.index()))
    }

    fn wait<H: Host>(
        &mut self,
        host: &mut H,
        only: Option<usize>,
    ) -> Result<(), Error> {
        self.scheduler.schedule_next(&self.axes, &mut self.timer);
        loop {
            let busy = match only {
                Some(i) => self.scheduler.is_active(i),
                None => self.scheduler.is_busy(),
            };
            if !busy {
                break;
            }
            if self.timer.expired() {
                self.on_timer();
            }
            if host.service_io() == Io::Abort {
                self.request_abort();
            }
        }

        let mut aborted = false;
        for axis in self.axes.iter_mut() {
            aborted |= axis.take_aborted();
            axis.clear_abort();
        }
        if aborted {
            host.report(Event::Aborted);
            return Err(Error::MotionAborted);
        }
        Ok(())
    }

    /// Drives an axis onto its endstop and sets its home position.
    ///
    /// Homing runs at the homing speed without acceleration. An axis that
    /// starts on its endstop first backs off until it is released.
    ///
    /// # Returns
    ///
    /// - `Err(Error::EndstopNotReached)` if the endstop did not fire (or did
    ///   not release) within the configured maximum travel.
    pub fn home<H: Host>(
        &mut self,
        id: AxisId,
        config: &Config,
        host: &mut H,
    ) -> Result<(), Error> {
        let settings = config.axis(id);
        let saved = self.max_speed(id);
        self.set_speed(id, settings.homing_speed);
        self.axis_mut(id).set_accel_enabled(false);

        let result = self.seek_endstop(id, config, host);

        self.axis_mut(id).set_accel_enabled(true);
        self.restore_speed(id, saved);
        result?;

        self.set_position(id, settings.home_position);
        host.report(Event::Homed(id));
        Ok(())
    }

    fn seek_endstop<H: Host>(
        &mut self,
        id: AxisId,
        config: &Config,
        host: &mut H,
    ) -> Result<(), Error> {
        let settings = config.axis(id);
        let travel = i32::try_from(settings.max_steps).unwrap_or(i32::MAX)
            * settings.home_direction.sign();

        if self.endstop_hit(id, EndstopInput::Primary) {
            self.axis_mut(id).invert_endstop();
            let backed_off = self
                .prepare_move(id, Steps::new(-travel), false)
                .and_then(|_| self.run_and_wait(host));
            self.axis_mut(id).invert_endstop();
            backed_off?;
            if self.endstop_hit(id, EndstopInput::Primary) {
                return Err(Error::EndstopNotReached(id));
            }
        }

        self.prepare_move(id, Steps::new(travel), false)?;
        self.run_and_wait(host)?;
        if !self.endstop_hit(id, EndstopInput::Primary) {
            return Err(Error::EndstopNotReached(id));
        }
        Ok(())
    }
}
