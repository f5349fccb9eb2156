//! Tool selection, loading and unloading.
//!
//! A [Unit] owns the motion controller, the lid servo and the position
//! store, and runs the blocking sequences the printer asks for.

mod feed;
mod lid;
mod recovery;
mod revolver;
mod select;
mod unload;

#[cfg(test)]
mod rig;

pub use lid::{NoLid, Servo};
pub use recovery::StallSide;

#[cfg(test)]
pub use lid::tests::TestServo;

use heapless::Vec;
use ufmt_macros::uDebug;

use crate::{
    AxisDriver, AxisId, Config, EndstopInput, Error, Event, Host,
    MotionController, PositionStore, RevolverMode, Signal, Snapshot,
    SnapshotStorage, StepTimer, Steps, MAX_TOOLS,
};

/// Stage of the feed sequence the unit is in.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    SeekingEndstop,
    FeedingToNozzle,
    Reinforcing,
    RetractingFromNozzle,
    RetractingFromSelector,
    /// A feed failed. Only a successful unload leaves this state.
    Jammed,
}

/// Result of driving the filament up to the feeder endstop.
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Succeeded,
    /// Reached the endstop after at least one stall or escalation.
    RetriedAndSucceeded,
    Jammed,
}

/// Hardware handed to a [Unit] when it is built.
pub struct Parts<D, T, V, S> {
    pub selector: D,
    pub revolver: D,
    pub feeder: D,
    pub timer: T,
    pub lid: V,
    pub storage: S,
}

/// A filament selector unit.
///
/// # Type Parameters
///
/// - `D`: driver of each axis.
/// - `T`: step timer.
/// - `V`: lid servo.
/// - `S`: storage behind the position store.
pub struct Unit<D, T, V, S> {
    config: Config,
    motion: MotionController<D, T>,
    lid: V,
    lid_open: bool,
    store: PositionStore<S>,
    swap_table: Vec<u8, MAX_TOOLS>,
    selected: Option<u8>,
    jammed: bool,
    state: FeedState,
}

impl<D, T, V, S> Unit<D, T, V, S>
where
    D: AxisDriver,
    T: StepTimer,
    V: Servo,
    S: SnapshotStorage,
{
    /// Creates a new `Unit`.
    ///
    /// All motors start powered off, with no tool selected. Call
    /// [Unit::restore] to pick up the state saved before the last power
    /// cycle.
    pub fn new(config: Config, parts: Parts<D, T, V, S>) -> Self {
        let motion = MotionController::new(
            parts.selector,
            parts.revolver,
            parts.feeder,
            &config,
            parts.timer,
        );
        let tools = (config.tool_count as usize).min(MAX_TOOLS);
        let swap_table = config.swap_table[..tools].iter().copied().collect();
        Self {
            config,
            motion,
            lid: parts.lid,
            lid_open: false,
            store: PositionStore::new(parts.storage),
            swap_table,
            selected: None,
            jammed: false,
            state: FeedState::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn motion(&self) -> &MotionController<D, T> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionController<D, T> {
        &mut self.motion
    }

    pub fn store(&self) -> &PositionStore<S> {
        &self.store
    }

    pub fn lid(&self) -> &V {
        &self.lid
    }

    /// Physical tool under the selector, if known.
    pub fn selected_tool(&self) -> Option<u8> {
        self.selected
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    pub fn state(&self) -> FeedState {
        if self.jammed {
            FeedState::Jammed
        } else {
            self.state
        }
    }

    /// Returns whether filament sits at the feeder endstop.
    pub fn feeder_loaded(&self) -> bool {
        self.motion.endstop_hit(AxisId::Feeder, EndstopInput::Primary)
    }

    /// Stall reports counted during the last movement of an axis.
    pub fn stall_count(&self, id: AxisId) -> u16 {
        self.motion.axis(id).stall_count()
    }

    /// Maps a logical tool index onto a physical tool.
    pub fn physical_tool(&self, index: u8) -> Result<u8, Error> {
        self.swap_table
            .get(index as usize)
            .copied()
            .ok_or(Error::InvalidToolIndex(index))
    }

    /// Exchanges the physical tools behind two logical indices.
    pub fn swap_tools(&mut self, a: u8, b: u8) -> Result<(), Error> {
        let pa = self.physical_tool(a)?;
        let pb = self.physical_tool(b)?;
        self.swap_table[a as usize] = pb;
        self.swap_table[b as usize] = pa;
        Ok(())
    }

    /// Restores the swap table from the configuration.
    pub fn reset_swap_table(&mut self) {
        for (i, slot) in self.swap_table.iter_mut().enumerate() {
            *slot = self.config.swap_table[i];
        }
    }

    /// Powers every motor off.
    pub fn motors_off(&mut self) {
        self.motion.motors_off();
    }

    /// Picks up axis positions and the selected tool from the position
    /// store.
    ///
    /// A missing or corrupt record leaves every position at zero and no
    /// tool selected; the unit must then be homed before use.
    pub fn restore<H: Host>(&mut self, host: &mut H) {
        match self.store.load() {
            Ok(snapshot) => {
                for (id, position) in AxisId::ALL.iter().zip(snapshot.steps()) {
                    self.motion.set_position(*id, position);
                }
                self.selected = snapshot
                    .tool()
                    .filter(|t| *t < self.swap_table.len() as u8);
                host.report(Event::SnapshotRestored {
                    tool: snapshot.tool,
                });
            }
            Err(e) => {
                for id in AxisId::ALL {
                    self.motion.set_position(id, Steps::zero());
                }
                self.selected = None;
                host.report(Event::SnapshotUnavailable(e));
            }
        }
    }

    /// Saves axis positions and the selected tool.
    ///
    /// Only called once a sequence has settled, never in the middle of a
    /// movement.
    fn persist<H: Host>(&mut self, host: &mut H) -> Result<(), Error> {
        let snapshot = Snapshot::new(self.motion.positions(), self.selected);
        self.store.save(&snapshot)?;
        host.report(Event::SnapshotSaved);
        Ok(())
    }

    /// Marks the unit jammed and tells the operator.
    fn jam<H: Host>(&mut self, host: &mut H) {
        self.jammed = true;
        host.report(Event::FeederJammed);
        host.signal(Signal::FeederJammed);
    }

    /// Fails with [Error::Jammed] while the unit is jammed.
    fn ensure_not_jammed<H: Host>(&self, host: &mut H) -> Result<(), Error> {
        if self.jammed {
            host.signal(Signal::FeederJammed);
            return Err(Error::Jammed);
        }
        Ok(())
    }

    /// Currently selected tool, or [Error::NoToolSelected].
    fn require_tool<H: Host>(&self, host: &mut H) -> Result<u8, Error> {
        self.selected.ok_or_else(|| {
            host.signal(Signal::NoTool);
            Error::NoToolSelected
        })
    }

    fn is_servo(&self) -> bool {
        matches!(self.config.revolver_mode, RevolverMode::Servo { .. })
    }
}
