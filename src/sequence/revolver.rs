use super::{Servo, Unit};
use crate::{
    AxisDriver, AxisId, AxisUnits, Error, Host, RevolverMode, SnapshotStorage,
    StepTimer, Steps,
};

/// Pause after the revolver has moved, before the feeder starts.
const REVOLVER_SETTLE_MS: u32 = 150;

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Clamps the filament of the selected tool.
    ///
    /// On a stepper revolver this turns the slot of the selected tool under
    /// the feeder, homing first if configured to. On a servo revolver it
    /// closes the lid. The feeder is powered off while the revolver moves,
    /// so the filament can follow.
    ///
    /// # Returns
    ///
    /// - `Err(Error::Jammed)` while the unit is jammed.
    pub fn position_revolver<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.ensure_not_jammed(host)?;
        self.clamp_filament(host)
    }

    /// [Unit::position_revolver] without the jam check. Unloading has to
    /// clamp the filament of a jammed unit.
    pub(super) fn clamp_filament<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let tool = self.require_tool(host)?;
        self.motion.set_enabled(AxisId::Feeder, false);
        let result = self.turn_revolver_to(tool, host);
        self.motion.set_enabled(AxisId::Feeder, true);
        result?;
        host.delay_ms(REVOLVER_SETTLE_MS);
        Ok(())
    }

    /// Homes the revolver (or opens the lid) and returns it to the selected
    /// tool, if there is one.
    pub fn reset_revolver<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        self.ensure_not_jammed(host)?;
        match self.config.revolver_mode {
            RevolverMode::Servo { .. } => {
                self.set_lid(true);
                if self.selected.is_some() {
                    self.set_lid(false);
                }
            }
            RevolverMode::Stepper => {
                self.motion.set_enabled(AxisId::Revolver, true);
                self.motion.home(AxisId::Revolver, &self.config, host)?;
                if let Some(tool) = self.selected {
                    self.move_revolver_to(tool, host)?;
                }
            }
        }
        Ok(())
    }

    fn turn_revolver_to<H: Host>(&mut self, tool: u8, host: &mut H) -> Result<(), Error> {
        if self.is_servo() {
            if self.config.reset_before_feed {
                self.set_lid(true);
            }
            self.set_lid(false);
            return Ok(());
        }

        self.motion.set_enabled(AxisId::Revolver, true);
        if self.config.reset_before_feed {
            self.motion.home(AxisId::Revolver, &self.config, host)?;
        }
        self.move_revolver_to(tool, host)?;

        if self.config.wiggle_revolver {
            let slot = self.revolver_slot()?;
            self.motion.prepare_move(AxisId::Revolver, slot, true)?;
            self.motion.run_and_wait(host)?;
            self.motion.prepare_move(AxisId::Revolver, -slot, true)?;
            self.motion.run_and_wait(host)?;
        }
        Ok(())
    }

    /// Turns the stepper revolver the short way round to a tool's slot.
    pub(super) fn move_revolver_to<H: Host>(
        &mut self,
        tool: u8,
        host: &mut H,
    ) -> Result<(), Error> {
        self.motion.set_enabled(AxisId::Revolver, true);
        let delta = self.revolver_delta(tool)?;
        self.motion.prepare_move(AxisId::Revolver, delta, true)?;
        self.motion.run_and_wait(host)
    }

    /// Steps from the current revolver position to a tool's slot.
    pub(super) fn revolver_delta(&self, tool: u8) -> Result<Steps, Error> {
        let converter = match self.motion.axis(AxisId::Revolver).units() {
            AxisUnits::Rotary(rc) => rc,
            AxisUnits::Linear(_) => return Err(Error::WrongUnits(AxisId::Revolver)),
        };
        converter
            .steps_to_abs(
                self.motion.position(AxisId::Revolver),
                self.config.revolver_position(tool),
            )
            .ok_or(Error::WrongUnits(AxisId::Revolver))
    }

    fn revolver_slot(&self) -> Result<Steps, Error> {
        self.motion
            .axis(AxisId::Revolver)
            .units()
            .to_steps(self.config.revolver_spacing.into())
            .ok_or(Error::WrongUnits(AxisId::Revolver))
    }

    /// Opens or closes the servo lid. Does nothing on a stepper revolver.
    pub(super) fn set_lid(&mut self, open: bool) {
        if let RevolverMode::Servo { open: o, closed: c } = self.config.revolver_mode {
            self.lid.set_angle(if open { o } else { c });
            self.lid_open = open;
        }
    }

    pub fn is_lid_open(&self) -> bool {
        self.lid_open
    }

    /// Frees the filament once a load or unload is done, if configured to.
    pub(super) fn release_after_feed<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        if !self.config.home_after_feed {
            return Ok(());
        }
        if self.is_servo() {
            self.set_lid(true);
            Ok(())
        } else {
            self.motion.home(AxisId::Revolver, &self.config, host)
        }
    }
}
