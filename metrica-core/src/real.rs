//! Numeric representation used by a catalog
//!
//! A catalog is instantiated for one representation `T`. Conversions are
//! carried out in `T` and never round beyond what `T` itself does.

use std::fmt::Debug;
use crate::Number;

/// Arithmetic required from a catalog's numeric representation.
pub trait Real: Clone + Debug + PartialEq + PartialOrd + Send + Sync + 'static {
    fn zero() -> Self;
    fn one() -> Self;

    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn mul(&self, other: &Self) -> Self;
    /// `None` when `other` is zero.
    fn div(&self, other: &Self) -> Option<Self>;
    fn neg(&self) -> Self;

    fn is_zero(&self) -> bool;

    /// Parse a normalized ASCII literal such as `-12.5e3`.
    fn from_literal(literal: &str) -> Option<Self>;

    /// Exact (or shortest round-trip) decimal rendering.
    fn to_literal(&self) -> String;

    /// Not-a-number, if the representation has one.
    fn nan() -> Option<Self> {
        None
    }

    /// Positive or negative infinity, if the representation has one.
    fn infinity(_negative: bool) -> Option<Self> {
        None
    }

    fn to_f64(&self) -> f64;
}

macro_rules! impl_real_float {
    ($t:ty) => {
        impl Real for $t {
            fn zero() -> Self {
                0.0
            }

            fn one() -> Self {
                1.0
            }

            fn add(&self, other: &Self) -> Self {
                self + other
            }

            fn sub(&self, other: &Self) -> Self {
                self - other
            }

            fn mul(&self, other: &Self) -> Self {
                self * other
            }

            fn div(&self, other: &Self) -> Option<Self> {
                if *other == 0.0 {
                    None
                } else {
                    Some(self / other)
                }
            }

            fn neg(&self) -> Self {
                -self
            }

            fn is_zero(&self) -> bool {
                *self == 0.0
            }

            fn from_literal(literal: &str) -> Option<Self> {
                literal.trim().parse::<$t>().ok()
            }

            fn to_literal(&self) -> String {
                format!("{}", self)
            }

            fn nan() -> Option<Self> {
                Some(<$t>::NAN)
            }

            fn infinity(negative: bool) -> Option<Self> {
                Some(if negative { <$t>::NEG_INFINITY } else { <$t>::INFINITY })
            }

            fn to_f64(&self) -> f64 {
                *self as f64
            }
        }
    };
}

impl_real_float!(f64);
impl_real_float!(f32);

impl Real for Number {
    fn zero() -> Self {
        Number::from_i64(0)
    }

    fn one() -> Self {
        Number::from_i64(1)
    }

    fn add(&self, other: &Self) -> Self {
        Number::add(self, other)
    }

    fn sub(&self, other: &Self) -> Self {
        Number::sub(self, other)
    }

    fn mul(&self, other: &Self) -> Self {
        Number::mul(self, other)
    }

    fn div(&self, other: &Self) -> Option<Self> {
        self.checked_div(other).ok()
    }

    fn neg(&self) -> Self {
        Number::neg(self)
    }

    fn is_zero(&self) -> bool {
        Number::is_zero(self)
    }

    fn from_literal(literal: &str) -> Option<Self> {
        Number::from_str(literal).ok()
    }

    fn to_literal(&self) -> String {
        Number::to_literal(self)
    }

    fn to_f64(&self) -> f64 {
        Number::to_f64(self).unwrap_or(f64::NAN)
    }
}
