use ufmt_macros::uDebug;

/// Identifies one of the unit's three motors.
#[derive(Debug, uDebug, PartialEq, Eq, Clone, Copy)]
pub enum AxisId {
    /// Linear axis carrying the selector head across the tool positions.
    Selector,
    /// Rotary (or servo driven) axis that clamps the active filament.
    Revolver,
    /// Linear axis pushing filament through the bowden tube.
    Feeder,
}
impl AxisId {
    /// Every axis, in index order.
    pub const ALL: [AxisId; 3] = [AxisId::Selector, AxisId::Revolver, AxisId::Feeder];

    /// Index of the axis into per-axis arrays.
    pub fn index(&self) -> usize {
        match self {
            AxisId::Selector => 0,
            AxisId::Revolver => 1,
            AxisId::Feeder => 2,
        }
    }
}
