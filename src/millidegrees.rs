use core::ops::{Add, Sub};

use ufmt::uDisplay;
use ufmt_macros::uDebug;

use crate::microns::udisplay_millis;

/// Underlying type representing the number of millidegrees.
type MilliDegreesRepr = i32;

/// One full turn.
const FULL_TURN: MilliDegreesRepr = 360_000;

/// Angle in millidegrees.
///
/// Revolver slot positions are angles on the revolver's circle.
#[derive(Debug, uDebug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone)]
pub struct MilliDegrees(MilliDegreesRepr);
impl MilliDegrees {
    /// Creates a new `MilliDegrees`.
    pub const fn new(value: MilliDegreesRepr) -> Self {
        Self(value)
    }

    /// Creates a `MilliDegrees` from whole degrees.
    pub const fn from_degrees(degrees: MilliDegreesRepr) -> Self {
        Self(degrees * 1000)
    }

    /// Returns the value as an `i32`.
    pub fn get_value(&self) -> MilliDegreesRepr {
        self.0
    }

    /// Normalize a `MilliDegrees` value to the range `[0, 359999]`.
    ///
    /// Negative angles wrap around, so `-90` degrees becomes `270` degrees.
    pub fn normalize(&self) -> MilliDegrees {
        MilliDegrees::new(self.0.rem_euclid(FULL_TURN))
    }

    /// Returns the shortest angular rotation between this angle and other
    /// angle.
    ///
    /// This is the shortest arc rotation between the angles. It is always in
    /// the range `[-179999, 180000]`.
    pub fn shortest_angle_to(&self, other: MilliDegrees) -> MilliDegrees {
        let self_n = self.normalize().get_value();
        let other_n = other.normalize().get_value();

        let mut delta: i32 = other_n - self_n;
        if delta > FULL_TURN / 2 {
            delta -= FULL_TURN;
        } else if delta <= -FULL_TURN / 2 {
            delta += FULL_TURN;
        }

        MilliDegrees::new(delta)
    }
}

impl Add for MilliDegrees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        MilliDegrees::new(self.get_value() + rhs.get_value())
    }
}

impl Sub for MilliDegrees {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        MilliDegrees::new(self.get_value() - rhs.get_value())
    }
}

impl uDisplay for MilliDegrees {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        udisplay_millis(self.get_value(), f)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating [MilliDegrees] across ten turns either way.
    pub fn millidegrees() -> impl Strategy<Value = MilliDegrees> {
        (-10 * FULL_TURN..10 * FULL_TURN).prop_map(MilliDegrees::new)
    }

    #[test]
    fn test_normalize_negative() {
        assert_eq!(
            MilliDegrees::from_degrees(270),
            MilliDegrees::from_degrees(-90).normalize()
        );
        assert_eq!(
            MilliDegrees::new(0),
            MilliDegrees::from_degrees(720).normalize()
        );
    }

    #[test]
    fn test_shortest_wraps() {
        let from = MilliDegrees::from_degrees(350);
        let to = MilliDegrees::from_degrees(10);
        assert_eq!(MilliDegrees::from_degrees(20), from.shortest_angle_to(to));
        assert_eq!(MilliDegrees::from_degrees(-20), to.shortest_angle_to(from));
    }

    proptest! {
        #[test]
        fn test_shortest_in_range(a in millidegrees(), b in millidegrees()) {
            let d = a.shortest_angle_to(b).get_value();
            assert!(d > -FULL_TURN / 2 && d <= FULL_TURN / 2);
            assert_eq!(b.normalize(), (a + MilliDegrees::new(d)).normalize());
        }
    }
}
