/// Hobby servo driving the filament lid.
pub trait Servo {
    /// Moves the servo horn to an angle, in degrees.
    fn set_angle(&mut self, degrees: u8);
}

/// Stand-in for units whose revolver is a stepper.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLid;
impl Servo for NoLid {
    fn set_angle(&mut self, _degrees: u8) {}
}
