use ufmt::{uDisplay, uWrite, Formatter};

use crate::{LinearConverter, Microns, MilliDegrees, RotaryConverter, Steps};

/// Distance travelled by an axis, in the axis' own units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Linear(Microns),
    Angular(MilliDegrees),
}
impl From<Microns> for Distance {
    fn from(value: Microns) -> Self {
        Distance::Linear(value)
    }
}
impl From<MilliDegrees> for Distance {
    fn from(value: MilliDegrees) -> Self {
        Distance::Angular(value)
    }
}
impl uDisplay for Distance {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Distance::Linear(microns) => {
                uDisplay::fmt(microns, f)?;
                f.write_str("mm")
            }
            Distance::Angular(mdg) => {
                uDisplay::fmt(mdg, f)?;
                f.write_str("deg")
            }
        }
    }
}

/// How steps of an axis map onto physical travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisUnits {
    Linear(LinearConverter),
    Rotary(RotaryConverter),
}
impl AxisUnits {
    /// Steps per millimetre for linear axes, per degree for rotary axes.
    pub fn steps_per_unit(&self) -> u32 {
        match self {
            AxisUnits::Linear(lc) => lc.steps_per_mm(),
            AxisUnits::Rotary(rc) => rc.steps_per_degree(),
        }
    }

    /// Converts a distance into steps.
    ///
    /// # Returns
    ///
    /// - `None` if the distance is in the wrong kind of unit for the axis,
    ///   or does not fit in [Steps].
    pub fn to_steps(&self, distance: Distance) -> Option<Steps> {
        match (self, distance) {
            (AxisUnits::Linear(lc), Distance::Linear(microns)) => {
                Some(lc.to_steps(microns))
            }
            (AxisUnits::Rotary(rc), Distance::Angular(mdg)) => rc.to_steps(mdg),
            _ => None,
        }
    }

    /// Converts steps into a distance.
    pub fn to_distance(&self, steps: Steps) -> Distance {
        match self {
            AxisUnits::Linear(lc) => Distance::Linear(lc.to_microns(steps)),
            AxisUnits::Rotary(rc) => Distance::Angular(
                rc.to_millidegrees(steps).unwrap_or(MilliDegrees::new(0)),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::microns::test::TestWriter;

    #[test]
    fn test_unit_mismatch() {
        let linear = AxisUnits::Linear(LinearConverter::per_mm(80));
        let rotary = AxisUnits::Rotary(RotaryConverter::new(9600));
        assert_eq!(None, linear.to_steps(MilliDegrees::new(1000).into()));
        assert_eq!(None, rotary.to_steps(Microns::new(1000).into()));
        assert_eq!(Some(Steps::new(80)), linear.to_steps(Microns::from_mm(1).into()));
        assert_eq!(
            Some(Steps::new(320)),
            rotary.to_steps(MilliDegrees::from_degrees(12).into())
        );
    }

    #[test]
    fn test_display() {
        let mut out = TestWriter(String::new());
        let feeder = AxisUnits::Linear(LinearConverter::per_mm(410));
        ufmt::uwrite!(&mut out, "{}", feeder.to_distance(Steps::new(-820)))
            .unwrap();
        assert_eq!("-2.000mm", out.0);
    }
}
