use super::{Servo, Unit};
use crate::{
    AxisDriver, AxisId, Error, Event, Host, Interaction, Signal,
    SnapshotStorage, StepTimer, Steps,
};

/// Selector movements tried before a stalling selector is given up on.
const SELECT_ATTEMPTS: u8 = 3;

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Moves the selector to a tool.
    ///
    /// Loaded filament is unloaded first; with [Interaction::Operator] the
    /// operator is asked before that happens. Selecting the tool that is
    /// already selected does nothing.
    ///
    /// # Parameters
    ///
    /// - `index`: Logical tool index, mapped through the swap table.
    /// - `interaction`: Whether the operator may be prompted.
    /// - `host`: Surroundings of the unit.
    ///
    /// # Returns
    ///
    /// - `Err(Error::InvalidToolIndex)` for an index beyond the fitted tools.
    /// - `Err(Error::Jammed)` while the unit is jammed.
    /// - `Err(Error::StallDetected)` if the selector kept stalling.
    pub fn select_tool<H: Host>(
        &mut self,
        index: u8,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<(), Error> {
        let tool = self.physical_tool(index)?;
        self.ensure_not_jammed(host)?;
        if self.selected == Some(tool) {
            return Ok(());
        }

        host.signal(Signal::SelectorBusy);
        let result = self.select_physical(tool, interaction, host);
        host.signal(Signal::SelectorReady);
        result
    }

    /// Moves the selector to a physical tool, bypassing the swap table.
    fn select_physical<H: Host>(
        &mut self,
        tool: u8,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<(), Error> {
        self.motion.set_enabled(AxisId::Selector, true);
        self.clear_feeder(interaction, host)?;
        self.set_lid(true);
        // Nothing is selected until the selector has arrived.
        self.selected = None;
        self.persist(host)?;

        let target = self.config.tool_position(tool);
        let mut attempt = 0;
        loop {
            self.motion.prepare_travel_to(AxisId::Selector, target, true)?;
            if !self.is_servo() && !self.config.reset_before_feed {
                self.motion.set_enabled(AxisId::Revolver, true);
                let delta = self.revolver_delta(tool)?;
                self.motion.prepare_move(AxisId::Revolver, delta, true)?;
            }
            self.motion.run_and_wait(host)?;
            if !self.motion.axis(AxisId::Selector).stall_detected() {
                break;
            }

            attempt += 1;
            host.report(Event::SelectorStalled { attempt });
            if attempt >= SELECT_ATTEMPTS {
                return Err(Error::StallDetected(AxisId::Selector));
            }
            self.handle_stall(AxisId::Selector, host)?;
        }

        self.selected = Some(tool);
        host.report(Event::ToolSelected { tool });
        self.persist(host)?;
        if self.config.external_feeder {
            self.reset_revolver(host)?;
        }
        Ok(())
    }

    /// Unloads filament still at the feeder endstop.
    fn clear_feeder<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<(), Error> {
        if !self.feeder_loaded() {
            return Ok(());
        }
        if interaction == Interaction::Operator && !host.confirm_unload() {
            return Err(Error::FilamentLoaded);
        }
        self.unload_filament(host)
    }

    /// Re-homes the selector and moves it back onto the selected tool.
    ///
    /// # Parameters
    ///
    /// - `retract`: First pull the filament of every other tool back by the
    ///   insert length, in case a neighbour strand is blocking the path.
    pub fn reposition_selector<H: Host>(
        &mut self,
        retract: bool,
        host: &mut H,
    ) -> Result<(), Error> {
        let tool = self.require_tool(host)?;
        self.ensure_not_jammed(host)?;
        host.report(Event::Repositioning { retract });

        if retract && !self.is_servo() {
            let saved = self.motion.max_speed(AxisId::Feeder);
            self.motion.set_speed(AxisId::Feeder, self.config.insert_speed);
            let result = self.retract_neighbours(tool, host);
            self.motion.restore_speed(AxisId::Feeder, saved);
            result?;
            self.move_revolver_to(tool, host)?;
        }

        self.motion.set_enabled(AxisId::Selector, true);
        self.motion.home(AxisId::Selector, &self.config, host)?;
        self.selected = None;
        self.select_physical(tool, Interaction::Silent, host)
    }

    fn retract_neighbours<H: Host>(&mut self, tool: u8, host: &mut H) -> Result<(), Error> {
        let retract = -self.config.insert_length;
        self.motion.set_enabled(AxisId::Feeder, true);
        for other in (0..self.swap_table.len() as u8).filter(|t| *t != tool) {
            self.move_revolver_to(other, host)?;
            self.motion.prepare_travel(AxisId::Feeder, retract, true)?;
            self.motion.run_and_wait(host)?;
        }
        Ok(())
    }

    /// Homes one axis.
    ///
    /// Homing the selector forgets the selected tool. The feeder has no
    /// homing endstop of its own; its position is just zeroed.
    pub fn home<H: Host>(
        &mut self,
        id: AxisId,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<(), Error> {
        self.ensure_not_jammed(host)?;
        match id {
            AxisId::Feeder => {
                self.motion.set_position(AxisId::Feeder, Steps::zero());
            }
            AxisId::Selector => {
                self.clear_feeder(interaction, host)?;
                self.set_lid(true);
                self.motion.set_enabled(AxisId::Selector, true);
                self.motion.home(AxisId::Selector, &self.config, host)?;
                self.selected = None;
            }
            AxisId::Revolver if self.is_servo() => self.set_lid(true),
            AxisId::Revolver => {
                self.clear_feeder(interaction, host)?;
                self.motion.set_enabled(AxisId::Revolver, true);
                self.motion.home(AxisId::Revolver, &self.config, host)?;
            }
        }
        self.persist(host)
    }

    /// Homes the selector and the revolver.
    pub fn home_all<H: Host>(
        &mut self,
        interaction: Interaction,
        host: &mut H,
    ) -> Result<(), Error> {
        self.home(AxisId::Selector, interaction, host)?;
        self.home(AxisId::Revolver, interaction, host)
    }
}

#[cfg(test)]
mod test {
    use crate::sequence::rig::*;
    use crate::{
        AxisId, Error, Event, Interaction, RevolverMode, Signal, Steps,
        TestHost,
    };

    #[test]
    fn test_select_tool() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(2, Interaction::Silent, &mut host).unwrap();

        assert_eq!(432, rig.selector.position());
        assert_eq!(Some(2), rig.unit.selected_tool());
        assert_eq!(
            vec![Signal::SelectorBusy, Signal::SelectorReady],
            host.signals
        );
        assert_eq!(1, host.count(|e| *e == Event::ToolSelected { tool: 2 }));

        let saved = rig.storage.snapshot().unwrap();
        assert_eq!(Some(2), saved.tool());
        assert_eq!(432, saved.positions[0]);
    }

    #[test]
    fn test_select_same_tool_is_noop() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(1, Interaction::Silent, &mut host).unwrap();
        let pulses = rig.selector.pulses();
        let writes = rig.storage.writes();

        rig.unit.select_tool(1, Interaction::Silent, &mut host).unwrap();
        assert_eq!(pulses, rig.selector.pulses());
        assert_eq!(writes, rig.storage.writes());
    }

    #[test]
    fn test_select_invalid_tool() {
        let mut rig = rig();
        let mut host = TestHost::new();
        assert_eq!(
            Err(Error::InvalidToolIndex(5)),
            rig.unit.select_tool(5, Interaction::Silent, &mut host)
        );
        assert_eq!(0, rig.selector.pulses());
    }

    #[test]
    fn test_swap_tools() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.swap_tools(0, 1).unwrap();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        assert_eq!(Some(1), rig.unit.selected_tool());
        assert_eq!(222, rig.selector.position());

        assert_eq!(Err(Error::InvalidToolIndex(9)), rig.unit.swap_tools(0, 9));
        rig.unit.reset_swap_table();
        assert_eq!(Ok(0), rig.unit.physical_tool(0));
    }

    #[test]
    fn test_select_moves_revolver_without_reset() {
        let mut rig = rig_with(|config| config.reset_before_feed = false);
        let mut host = TestHost::new();
        rig.unit.select_tool(2, Interaction::Silent, &mut host).unwrap();
        assert_eq!(36, rig.revolver.position());
        assert_eq!(432, rig.selector.position());
    }

    #[test]
    fn test_select_opens_servo_lid() {
        let mut rig = rig_with(|config| {
            config.revolver_mode = RevolverMode::Servo { open: 90, closed: 10 };
        });
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        assert_eq!(vec![90], rig.lid.angles());
        assert!(rig.unit.is_lid_open());
    }

    #[test]
    fn test_select_unloads_first() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        rig.unit.load_filament(Interaction::Silent, &mut host).unwrap();
        assert!(rig.unit.feeder_loaded());

        rig.unit.select_tool(1, Interaction::Silent, &mut host).unwrap();
        assert!(!rig.unit.feeder_loaded());
        assert_eq!(Some(1), rig.unit.selected_tool());
        assert_eq!(0, host.unload_prompts);
    }

    #[test]
    fn test_select_declined_unload() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        rig.unit.load_filament(Interaction::Silent, &mut host).unwrap();

        let result = rig.unit.select_tool(1, Interaction::Operator, &mut host);
        assert_eq!(Err(Error::FilamentLoaded), result);
        assert_eq!(1, host.unload_prompts);
        assert_eq!(Some(0), rig.unit.selected_tool());
        assert!(rig.unit.feeder_loaded());
    }

    #[test]
    fn test_select_confirmed_unload() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(0, Interaction::Silent, &mut host).unwrap();
        rig.unit.load_filament(Interaction::Silent, &mut host).unwrap();

        host.unload_answers.push_back(true);
        rig.unit.select_tool(3, Interaction::Operator, &mut host).unwrap();
        assert_eq!(Some(3), rig.unit.selected_tool());
        assert!(!rig.unit.feeder_loaded());
    }

    #[test]
    fn test_selector_stall_recovered() {
        let mut rig = rig_with(|config| config.selector.stop_on_stall = true);
        let mut host = TestHost::new();
        rig.selector.stall_for_pulses(20);
        rig.unit.select_tool(2, Interaction::Silent, &mut host).unwrap();

        assert_eq!(Some(2), rig.unit.selected_tool());
        assert_eq!(432, rig.selector.position());
        assert_eq!(
            1,
            host.count(|e| matches!(e, Event::SelectorStalled { attempt: 1 }))
        );
        assert_eq!(
            1,
            host.count(|e| matches!(
                e,
                Event::StallProbe {
                    axis: AxisId::Selector,
                    left: false,
                    right: false
                }
            ))
        );
    }

    #[test]
    fn test_selector_stall_gives_up() {
        let mut rig = rig_with(|config| config.selector.stop_on_stall = true);
        let mut host = TestHost::new();
        rig.selector.set_stall(crate::motion::driver::tests::Sensor::Always);
        let result = rig.unit.select_tool(2, Interaction::Silent, &mut host);

        assert_eq!(Err(Error::StallDetected(AxisId::Selector)), result);
        assert_eq!(None, rig.unit.selected_tool());
        assert_eq!(
            3,
            host.count(|e| matches!(e, Event::SelectorStalled { .. }))
        );
        assert_eq!(2, host.count(|e| matches!(e, Event::StallProbe { .. })));
        assert_eq!(Some(&Signal::SelectorReady), host.signals.last());
    }

    #[test]
    fn test_failed_select_forgets_previous_tool() {
        let mut rig = rig_with(|config| config.selector.stop_on_stall = true);
        let mut host = TestHost::new();
        rig.unit.select_tool(1, Interaction::Silent, &mut host).unwrap();
        assert_eq!(222, rig.selector.position());

        rig.selector.set_stall(crate::motion::driver::tests::Sensor::Always);
        assert_eq!(
            Err(Error::StallDetected(AxisId::Selector)),
            rig.unit.select_tool(3, Interaction::Silent, &mut host)
        );
        assert_eq!(None, rig.unit.selected_tool());
        assert_eq!(None, rig.storage.snapshot().unwrap().tool());

        // Selecting the old tool again has to move the selector back.
        rig.selector.set_stall(crate::motion::driver::tests::Sensor::Never);
        rig.unit.select_tool(1, Interaction::Silent, &mut host).unwrap();
        assert_eq!(222, rig.selector.position());
        assert_eq!(Some(1), rig.unit.selected_tool());
    }

    #[test]
    fn test_jammed_unit_refuses_reposition() {
        let (mut rig, mut host) = jammed(2);
        let selector = rig.selector.pulses();
        assert_eq!(
            Err(Error::Jammed),
            rig.unit.reposition_selector(true, &mut host)
        );
        assert_eq!(selector, rig.selector.pulses());
        assert_eq!(Some(2), rig.unit.selected_tool());
    }

    #[test]
    fn test_home_selector_forgets_tool() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(4, Interaction::Silent, &mut host).unwrap();
        rig.unit.home(AxisId::Selector, Interaction::Silent, &mut host).unwrap();

        assert_eq!(0, rig.selector.position());
        assert_eq!(None, rig.unit.selected_tool());
        assert_eq!(None, rig.storage.snapshot().unwrap().tool());
    }

    #[test]
    fn test_home_feeder_zeroes() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit
            .motion_mut()
            .set_position(AxisId::Feeder, Steps::new(77));
        rig.unit.home(AxisId::Feeder, Interaction::Silent, &mut host).unwrap();
        assert_eq!(Steps::zero(), rig.unit.motion().position(AxisId::Feeder));
        assert_eq!(0, rig.feeder.pulses());
    }

    #[test]
    fn test_home_all() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.selector.set_position(300);
        rig.revolver.set_position(100);
        rig.unit.home_all(Interaction::Silent, &mut host).unwrap();
        assert_eq!(0, rig.selector.position());
        assert_eq!(360, rig.revolver.position());
        assert_eq!(
            [Steps::zero(), Steps::zero(), Steps::zero()],
            rig.unit.motion().positions()
        );
    }

    #[test]
    fn test_reposition_selector() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(2, Interaction::Silent, &mut host).unwrap();
        rig.selector.set_position(440);

        rig.unit.reposition_selector(false, &mut host).unwrap();
        assert_eq!(432, rig.selector.position());
        assert_eq!(Some(2), rig.unit.selected_tool());
    }

    #[test]
    fn test_reposition_with_retract() {
        let mut rig = rig();
        let mut host = TestHost::new();
        rig.unit.select_tool(2, Interaction::Silent, &mut host).unwrap();
        rig.unit.reposition_selector(true, &mut host).unwrap();

        // One insert length (50 steps) back for each of the four neighbours.
        assert_eq!(-200, rig.feeder.position());
        assert_eq!(36, rig.revolver.position());
        assert_eq!(Some(2), rig.unit.selected_tool());
    }
}
