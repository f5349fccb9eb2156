use ufmt_macros::uDebug;

/// Commands sent by the printer, in the MMU2 dialect.
#[derive(Copy, Clone, PartialEq, Eq, uDebug)]
pub enum Command {
    /// Tn: Select tool `n`.
    Select(u8),
    /// Ln: Load tool `n` up to the selector.
    Load(u8),
    /// Un: Unload the current tool.
    Unload(u8),
    /// A: Abort the running movement.
    Abort,
    /// P0: Report whether filament sits at the feeder endstop.
    QueryFinda,
}
