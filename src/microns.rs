use core::ops::{Add, Neg, Sub};

use ufmt::{uDisplay, uWrite, Formatter};
use ufmt_macros::uDebug;

/// Underlying type representing the number of microns.
type MicronsRepr = i32;

/// Distance in microns.
///
/// All linear lengths of the unit (bowden tube, selector travel, tool
/// spacing) are carried as `Microns` so that fractional millimetres survive
/// without floating point.
#[derive(Debug, uDebug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone)]
pub struct Microns(MicronsRepr);
impl Microns {
    /// Creates a new `Microns`.
    pub const fn new(value: MicronsRepr) -> Self {
        Self(value)
    }

    /// Creates a `Microns` from a whole number of millimetres.
    pub const fn from_mm(mm: MicronsRepr) -> Self {
        Self(mm * 1000)
    }

    /// Zero distance.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the value as an `i32`.
    pub fn get_value(&self) -> MicronsRepr {
        self.0
    }

    /// Scales the distance by the ratio `numerator / denominator`.
    ///
    /// The intermediate product is computed in 64 bits, and the result
    /// truncates toward zero.
    ///
    /// # Parameters
    ///
    /// - `numerator`: Multiplier.
    /// - `denominator`: Divisor. A zero divisor yields zero distance.
    pub fn scale(&self, numerator: i32, denominator: i32) -> Microns {
        if denominator == 0 {
            return Microns::zero();
        }
        Microns::new(
            (self.0 as i64 * numerator as i64 / denominator as i64) as i32,
        )
    }

    /// Multiplies the distance by a whole number.
    pub fn times(&self, factor: i32) -> Microns {
        Microns::new(self.0.saturating_mul(factor))
    }
}

impl Add for Microns {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Microns::new(self.get_value() + rhs.get_value())
    }
}

impl Sub for Microns {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Microns::new(self.get_value() - rhs.get_value())
    }
}

impl Neg for Microns {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Microns::new(-self.get_value())
    }
}

impl uDisplay for Microns {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        udisplay_millis(self.get_value(), f)
    }
}

/// Writes a value in thousandths as a signed decimal with three places.
pub fn udisplay_millis<W>(
    value: i32,
    f: &mut Formatter<W>,
) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    if value >= 0 {
        f.write_char('+')?;
    } else {
        f.write_char('-')?;
    }

    let v = value.unsigned_abs();
    let int_part = v / 1000;
    let frc_part = v % 1000;

    int_part.fmt(f)?;
    f.write_char('.')?;

    if frc_part < 10 {
        f.write_str("00")?;
    } else if frc_part < 100 {
        f.write_char('0')?;
    }
    frc_part.fmt(f)?;

    Ok(())
}
