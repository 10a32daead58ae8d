//! Virtual time.
//!
//! # Design
//!
//! Time is a monotonically non-decreasing `Tick` counter advanced by the
//! event engine; there is no wall-clock mapping.  Using an integer tick as
//! the canonical unit means all schedule arithmetic is exact (no
//! floating-point drift) and comparisons are O(1).
//!
//! Arithmetic saturates instead of wrapping so that the [`Tick::INFTY`]
//! sentinel absorbs offsets: `INFTY + d == INFTY`, which is what "never"
//! should do under deadline arithmetic.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A point (or span) on the virtual timeline.
///
/// Stored as `i64`: spans produced by subtraction are first-class values, and
/// at one tick per simulated microsecond an `i64` lasts ~292,000 years.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Sentinel meaning "never".
    pub const INFTY: Tick = Tick(i64::MAX);

    #[inline]
    pub fn is_infty(self) -> bool {
        self == Tick::INFTY
    }
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

macro_rules! tick_binop {
    ($trait:ident, $method:ident, $op:ident) => {
        impl std::ops::$trait for Tick {
            type Output = Tick;
            #[inline]
            fn $method(self, rhs: Tick) -> Tick {
                Tick(self.0.$op(rhs.0))
            }
        }

        impl std::ops::$trait<i64> for Tick {
            type Output = Tick;
            #[inline]
            fn $method(self, rhs: i64) -> Tick {
                Tick(self.0.$op(rhs))
            }
        }
    };
}

tick_binop!(Add, add, saturating_add);
tick_binop!(Sub, sub, saturating_sub);
tick_binop!(Mul, mul, saturating_mul);

// Division and remainder do not saturate; dividing by zero panics just like
// it does for the underlying integer.
impl std::ops::Div for Tick {
    type Output = Tick;
    #[inline]
    fn div(self, rhs: Tick) -> Tick {
        Tick(self.0 / rhs.0)
    }
}

impl std::ops::Div<i64> for Tick {
    type Output = Tick;
    #[inline]
    fn div(self, rhs: i64) -> Tick {
        Tick(self.0 / rhs)
    }
}

impl std::ops::Rem for Tick {
    type Output = Tick;
    #[inline]
    fn rem(self, rhs: Tick) -> Tick {
        Tick(self.0 % rhs.0)
    }
}

impl std::ops::Rem<i64> for Tick {
    type Output = Tick;
    #[inline]
    fn rem(self, rhs: i64) -> Tick {
        Tick(self.0 % rhs)
    }
}

impl std::ops::AddAssign for Tick {
    #[inline]
    fn add_assign(&mut self, rhs: Tick) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Tick {
    #[inline]
    fn sub_assign(&mut self, rhs: Tick) {
        *self = *self - rhs;
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<i64> for Tick {
    #[inline]
    fn from(v: i64) -> Tick {
        Tick(v)
    }
}

/// Truncates toward zero, so `Tick::from(2.9) == Tick(2)` and
/// `Tick::from(-2.9) == Tick(-2)`.
impl From<f64> for Tick {
    #[inline]
    fn from(v: f64) -> Tick {
        Tick(v as i64)
    }
}

impl From<Tick> for i64 {
    #[inline]
    fn from(t: Tick) -> i64 {
        t.0
    }
}

impl FromStr for Tick {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Tick, CoreError> {
        s.trim()
            .parse::<i64>()
            .map(Tick)
            .map_err(|_| CoreError::TickLiteral(s.to_owned()))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infty() {
            write!(f, "INFTY")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
