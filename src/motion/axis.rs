use crate::{
    AccelProfile, AxisConfig, AxisDriver, AxisId, AxisUnits, Direction,
    Distance, Endstop, EndstopInput, Error, Scheduled, StallMonitor, Steps,
    Ticks,
};

/// State of the movement an axis is executing (or last executed).
#[derive(Debug, Clone, Copy)]
struct Movement {
    direction: Direction,
    profile: AccelProfile,
    done: u32,
    remaining: Ticks,
    ignore_endstop: bool,
    endstop_hit: bool,
    aborted: bool,
    active: bool,
}
impl Movement {
    fn idle() -> Self {
        Self {
            direction: Direction::Positive,
            profile: AccelProfile::constant(Ticks::PARKED, 0),
            done: 0,
            remaining: Ticks::PARKED,
            ignore_endstop: true,
            endstop_hit: false,
            aborted: false,
            active: false,
        }
    }
}

/// One motor of the unit: its driver, position and movement state.
///
/// The position changes by exactly one for every pulse emitted, in the
/// direction of the movement. It is also set directly when homing or
/// restoring a saved state.
pub struct Axis<D> {
    id: AxisId,
    driver: D,
    units: AxisUnits,
    invert_direction: bool,
    enabled: bool,
    position: Steps,
    steps_taken: Steps,
    endstop: Endstop,
    endstop2: Option<Endstop>,
    stall: StallMonitor,
    max_speed: Ticks,
    accel_speed: Ticks,
    accel_distance: u32,
    accel_enabled: bool,
    ignore_abort: bool,
    abort: bool,
    movement: Movement,
}

impl<D: AxisDriver> Axis<D> {
    /// Creates a new `Axis`.
    ///
    /// The axis starts disabled at position zero.
    ///
    /// # Parameters
    ///
    /// - `id`: Which motor this is.
    /// - `driver`: Hardware behind the motor.
    /// - `config`: Settings of the axis.
    /// - `timer_hz`: Tick frequency of the step timer.
    pub fn new(id: AxisId, driver: D, config: &AxisConfig, timer_hz: u32) -> Self {
        let per_unit = config.units.steps_per_unit();
        Self {
            id,
            driver,
            units: config.units,
            invert_direction: config.invert_direction,
            enabled: false,
            position: Steps::zero(),
            steps_taken: Steps::zero(),
            endstop: Endstop::new(config.endstop_trigger),
            endstop2: config.endstop2_trigger.map(Endstop::new),
            stall: StallMonitor::new(
                config.stall_threshold,
                config.stop_on_stall,
            ),
            max_speed: config.max_speed.to_ticks(per_unit, timer_hz),
            accel_speed: config.accel_speed.to_ticks(per_unit, timer_hz),
            accel_distance: config.accel_distance,
            accel_enabled: true,
            ignore_abort: false,
            abort: false,
            movement: Movement::idle(),
        }
    }

    pub fn id(&self) -> AxisId {
        self.id
    }

    pub fn units(&self) -> AxisUnits {
        self.units
    }

    /// Direct access to the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn position(&self) -> Steps {
        self.position
    }

    /// Sets the position without moving the motor.
    pub fn set_position(&mut self, position: Steps) {
        self.position = position;
    }

    /// Signed steps since the last [Axis::reset_steps_taken].
    pub fn steps_taken(&self) -> Steps {
        self.steps_taken
    }

    pub fn reset_steps_taken(&mut self) {
        self.steps_taken = Steps::zero();
    }

    /// [Axis::steps_taken] converted into the axis' units.
    pub fn steps_taken_as_distance(&self) -> Distance {
        self.units.to_distance(self.steps_taken)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Powers the motor on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.driver.set_enabled(enabled);
        self.enabled = enabled;
    }

    /// Current cruise interval.
    pub fn max_speed(&self) -> Ticks {
        self.max_speed
    }

    /// Changes the cruise interval for the following movements.
    pub fn set_max_speed(&mut self, interval: Ticks) {
        self.max_speed = interval;
    }

    pub fn set_accel_enabled(&mut self, enabled: bool) {
        self.accel_enabled = enabled;
    }

    pub fn accel_speed(&self) -> Ticks {
        self.accel_speed
    }

    /// Makes the axis immune to abort requests.
    pub fn set_ignore_abort(&mut self, ignore: bool) {
        self.ignore_abort = ignore;
    }

    /// Requests that the current movement stops at its next step.
    ///
    /// The request is refused while the axis ignores aborts.
    pub fn request_abort(&mut self) {
        if !self.ignore_abort {
            self.abort = true;
        }
    }

    pub fn clear_abort(&mut self) {
        self.abort = false;
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort
    }

    /// Returns whether the last movement ended through an abort.
    pub fn was_aborted(&self) -> bool {
        self.movement.aborted
    }

    /// Returns whether the last movement was aborted, and forgets it.
    pub fn take_aborted(&mut self) -> bool {
        core::mem::replace(&mut self.movement.aborted, false)
    }

    /// Returns whether the last movement ended on its endstop.
    pub fn stopped_on_endstop(&self) -> bool {
        self.movement.endstop_hit
    }

    /// Reads an endstop input now.
    ///
    /// An axis without the requested input never reports it hit.
    pub fn endstop_hit(&self, input: EndstopInput) -> bool {
        let endstop = match input {
            EndstopInput::Primary => Some(&self.endstop),
            EndstopInput::Secondary => self.endstop2.as_ref(),
        };
        endstop
            .map(|e| e.is_hit(self.driver.read_endstop(input)))
            .unwrap_or(false)
    }

    /// Swaps the trigger level of the primary endstop.
    ///
    /// Movements then run until the endstop is released instead of hit.
    pub fn invert_endstop(&mut self) {
        self.endstop.invert();
    }

    pub fn stall_count(&self) -> u16 {
        self.stall.count()
    }

    pub fn stall_detected(&self) -> bool {
        self.stall.detected()
    }

    pub fn reset_stall(&mut self) {
        self.stall.reset();
    }

    /// Returns whether a movement is in progress.
    pub fn is_moving(&self) -> bool {
        self.movement.active
    }

    /// Prepares a relative movement.
    ///
    /// # Parameters
    ///
    /// - `delta`: Signed number of steps to move.
    /// - `ignore_endstop`: Keep moving even when the primary endstop is hit.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the movement is ready to be scheduled.
    /// - `Ok(false)`: the delta was zero; nothing will move.
    /// - `Err(Error::AxisDisabled)`: the motor is powered off.
    /// - `Err(Error::AxisBusy)`: the previous movement has not finished.
    pub fn prepare_move(
        &mut self,
        delta: Steps,
        ignore_endstop: bool,
    ) -> Result<bool, Error> {
        if delta == Steps::zero() {
            return Ok(false);
        }
        if !self.enabled {
            return Err(Error::AxisDisabled(self.id));
        }
        if self.movement.active {
            return Err(Error::AxisBusy(self.id));
        }

        let total = delta.unsigned_abs();
        let profile = if self.accel_enabled {
            AccelProfile::new(
                self.accel_speed,
                self.max_speed,
                self.accel_distance,
                total,
            )
        } else {
            AccelProfile::constant(self.max_speed, total)
        };
        self.stall.reset();
        self.movement = Movement {
            direction: Direction::of(delta.get_value()),
            profile,
            done: 0,
            remaining: profile.interval_at(0),
            ignore_endstop,
            endstop_hit: false,
            aborted: false,
            active: true,
        };
        Ok(true)
    }

    /// Ends the current movement where it is.
    fn finish(&mut self) -> bool {
        self.movement.active = false;
        false
    }

    /// Physical direction of a logical direction.
    fn physical(&self, direction: Direction) -> Direction {
        if self.invert_direction {
            direction.reversed()
        } else {
            direction
        }
    }
}

impl<D: AxisDriver> Scheduled for Axis<D> {
    fn remaining(&self) -> Ticks {
        self.movement.remaining
    }

    fn credit(&mut self, elapsed: Ticks) {
        self.movement.remaining = self.movement.remaining.saturating_sub(elapsed);
    }

    fn fire(&mut self) -> bool {
        if !self.movement.active {
            return false;
        }
        if self.abort {
            self.movement.aborted = true;
            return self.finish();
        }
        if !self.enabled {
            return self.finish();
        }
        if !self.movement.ignore_endstop
            && self.endstop_hit(EndstopInput::Primary)
        {
            self.movement.endstop_hit = true;
            return self.finish();
        }

        let direction = self.movement.direction;
        self.driver.step(self.physical(direction));
        self.position = self.position.step(direction);
        self.steps_taken = self.steps_taken.step(direction);
        self.stall.record(self.driver.read_stall());
        self.movement.done += 1;

        if self.movement.done >= self.movement.profile.total() {
            return self.finish();
        }
        self.movement.remaining =
            self.movement.profile.interval_at(self.movement.done);
        true
    }
}
