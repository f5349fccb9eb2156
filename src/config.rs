use crate::{
    AxisUnits, Direction, Level, LinearConverter, Microns, MilliDegrees,
    RotaryConverter, Speed, Steps, Ticks,
};

/// Largest number of tools a unit can carry.
pub const MAX_TOOLS: usize = 12;

/// Escalation cycles allowed before a feed is declared jammed.
pub const FEED_ERROR_RETRIES: i8 = 4;

/// Settings of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConfig {
    /// Mapping from steps to travel.
    pub units: AxisUnits,
    /// Speed once acceleration is complete.
    pub max_speed: Speed,
    /// Speed of the first and last steps of a movement.
    pub accel_speed: Speed,
    /// Number of steps over which to accelerate (and decelerate).
    pub accel_distance: u32,
    /// Speed used while homing.
    pub homing_speed: Speed,
    /// Swap the meaning of the direction signal.
    pub invert_direction: bool,
    /// Level at which the primary endstop counts as hit.
    pub endstop_trigger: Level,
    /// Secondary endstop, if the axis has one.
    pub endstop2_trigger: Option<Level>,
    /// Direction in which the homing endstop lies.
    pub home_direction: Direction,
    /// Position the axis takes after homing.
    pub home_position: Steps,
    /// Longest travel allowed while searching for the endstop.
    pub max_steps: u32,
    /// Whether stall reports are acted upon.
    pub stop_on_stall: bool,
    /// A stall is detected once more reports than this arrive in one move.
    pub stall_threshold: u16,
}

/// How the filament clamp is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevolverMode {
    /// Rotary stepper carrying one slot per tool.
    Stepper,
    /// Lid on a hobby servo that is either open or closed.
    Servo {
        /// Servo angle (degrees) that releases the filament.
        open: u8,
        /// Servo angle (degrees) that clamps the filament.
        closed: u8,
    },
}

/// Configuration of a unit.
///
/// A `Config` is handed to the unit when it is built and is not changed by
/// it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub selector: AxisConfig,
    pub revolver: AxisConfig,
    pub feeder: AxisConfig,

    /// Tick frequency of the step timer.
    pub timer_hz: u32,

    /// Number of tools fitted.
    pub tool_count: u8,
    /// Initial logical-to-physical tool mapping.
    pub swap_table: [u8; MAX_TOOLS],
    /// Selector position of tool zero, from the selector's home.
    pub first_tool_offset: Microns,
    /// Selector distance between neighbouring tools.
    pub tool_spacing: Microns,

    pub revolver_mode: RevolverMode,
    /// Revolver angle of tool zero, from the revolver's home.
    pub first_revolver_offset: MilliDegrees,
    /// Revolver angle between neighbouring tools.
    pub revolver_spacing: MilliDegrees,
    /// Home the revolver before every positioning.
    pub reset_before_feed: bool,
    /// Home the revolver (or open the lid) after loading or unloading.
    pub home_after_feed: bool,
    /// Rock the revolver one slot either way after positioning.
    pub wiggle_revolver: bool,

    /// Length of the bowden tube, from the selector to the nozzle.
    pub bowden_length: Microns,
    /// Length from the feeder endstop to the selector exit.
    pub selector_distance: Microns,
    /// Increment used when searching for the feeder endstop.
    pub insert_length: Microns,
    /// Extra push once the filament has reached the nozzle.
    pub reinforce_length: Microns,
    /// Initial retract when unloading (usually negative).
    pub unload_retract: Microns,
    /// Short push after the retract, to shape the filament tip.
    pub unload_pushback: Microns,
    /// Pause after the push back.
    pub pushback_delay_ms: u32,
    /// Speed used near the endstop and the nozzle.
    pub insert_speed: Speed,
    /// Escalation cycles before a feed is jammed.
    pub feed_error_retries: i8,
    /// Feed the bowden tube in equal chunks instead of fast-then-slow.
    pub enable_chunks: bool,
    pub feed_chunks: u8,
    /// The feeder is driven by the printer; only the clamp is managed here.
    pub external_feeder: bool,

    /// Travel used to probe either side of a stalled axis.
    pub stall_probe_distance: Microns,
    /// Pause with the motor off while probing a stall.
    pub stall_settle_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut swap_table = [0u8; MAX_TOOLS];
        for (i, slot) in swap_table.iter_mut().enumerate() {
            *slot = i as u8;
        }

        Self {
            selector: AxisConfig {
                units: AxisUnits::Linear(LinearConverter::per_mm(80)),
                max_speed: Speed::MillimetresPerSecond(10),
                accel_speed: Speed::MillimetresPerSecond(5),
                accel_distance: 21 * 80,
                homing_speed: Speed::MillimetresPerSecond(5),
                invert_direction: false,
                endstop_trigger: Level::High,
                endstop2_trigger: None,
                home_direction: Direction::Negative,
                home_position: Steps::zero(),
                max_steps: 68000,
                stop_on_stall: false,
                stall_threshold: 5,
            },
            revolver: AxisConfig {
                units: AxisUnits::Rotary(RotaryConverter::new(9600)),
                max_speed: Speed::MillimetresPerSecond(10),
                accel_speed: Speed::MillimetresPerSecond(5),
                accel_distance: 5 * 9600 / 360,
                homing_speed: Speed::MillimetresPerSecond(5),
                invert_direction: false,
                endstop_trigger: Level::High,
                endstop2_trigger: None,
                home_direction: Direction::Positive,
                home_position: Steps::zero(),
                max_steps: 9600,
                stop_on_stall: false,
                stall_threshold: 5,
            },
            feeder: AxisConfig {
                units: AxisUnits::Linear(LinearConverter::per_mm(410)),
                max_speed: Speed::MillimetresPerSecond(10),
                accel_speed: Speed::MillimetresPerSecond(5),
                accel_distance: 5 * 410,
                homing_speed: Speed::MillimetresPerSecond(5),
                invert_direction: false,
                endstop_trigger: Level::High,
                endstop2_trigger: Some(Level::Low),
                home_direction: Direction::Negative,
                home_position: Steps::zero(),
                max_steps: 400 * 410,
                stop_on_stall: false,
                stall_threshold: 5,
            },

            timer_hz: 2_000_000,

            tool_count: 5,
            swap_table,
            first_tool_offset: Microns::new(1200),
            tool_spacing: Microns::from_mm(21),

            revolver_mode: RevolverMode::Stepper,
            first_revolver_offset: MilliDegrees::from_degrees(12),
            revolver_spacing: MilliDegrees::from_degrees(12),
            reset_before_feed: true,
            home_after_feed: true,
            wiggle_revolver: false,

            bowden_length: Microns::from_mm(400),
            selector_distance: Microns::from_mm(23),
            insert_length: Microns::from_mm(5),
            reinforce_length: Microns::from_mm(3),
            unload_retract: Microns::from_mm(-20),
            unload_pushback: Microns::from_mm(5),
            pushback_delay_ms: 1500,
            insert_speed: Speed::Ticks(Ticks::new(1000)),
            feed_error_retries: FEED_ERROR_RETRIES,
            enable_chunks: false,
            feed_chunks: 20,
            external_feeder: false,

            stall_probe_distance: Microns::from_mm(5),
            stall_settle_ms: 1000,
        }
    }
}

impl Config {
    /// Settings of one axis.
    pub fn axis(&self, id: crate::AxisId) -> &AxisConfig {
        match id {
            crate::AxisId::Selector => &self.selector,
            crate::AxisId::Revolver => &self.revolver,
            crate::AxisId::Feeder => &self.feeder,
        }
    }

    /// Selector position of a physical tool.
    pub fn tool_position(&self, tool: u8) -> Microns {
        self.first_tool_offset + self.tool_spacing.times(tool as i32)
    }

    /// Revolver angle of a physical tool.
    pub fn revolver_position(&self, tool: u8) -> MilliDegrees {
        self.first_revolver_offset
            + MilliDegrees::new(
                self.revolver_spacing.get_value().saturating_mul(tool as i32),
            )
    }
}
