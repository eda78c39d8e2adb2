//! Arbitrary precision numbers using dashu
//!
//! Uses dashu-float (DBig) for decimal arithmetic. Definition factors and
//! offsets are evaluated in this type so that literals such as `0.3048`
//! survive the trip through generated modules without binary rounding.

use dashu_float::DBig;
use dashu_float::ops::Abs;
use dashu_int::IBig;
use serde::{Deserialize, Serialize, Serializer, Deserializer};
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// Default precision for calculations (decimal digits)
const DEFAULT_PRECISION: usize = 50;

/// Decimal number with a 50-digit working precision
#[derive(Debug, Clone)]
pub struct Number {
    inner: DBig,
}

impl Number {
    /// Ensure a DBig has adequate precision for calculations
    fn with_work_precision(val: DBig) -> DBig {
        val.with_precision(DEFAULT_PRECISION).value()
    }

    /// Parse a decimal literal such as `1852`, `-0.3048`, `+5` or `1.5e-3`
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let text = s.trim();
        let invalid = || NumberError::ParseError(text.to_string());
        let unsigned = text.strip_prefix('+').unwrap_or(text);

        let value: DBig = match unsigned.find(['e', 'E']) {
            Some(at) => {
                let mantissa: DBig = unsigned[..at].parse().map_err(|_| invalid())?;
                let exp = &unsigned[at + 1..];
                let exp: isize = exp.strip_prefix('+').unwrap_or(exp).parse().map_err(|_| invalid())?;
                Self::with_work_precision(mantissa) * DBig::from_parts(IBig::ONE, exp)
            }
            None => unsigned.parse().map_err(|_| invalid())?,
        };
        Ok(Self { inner: Self::with_work_precision(value) })
    }

    /// Create from i64 with working precision
    pub fn from_i64(n: i64) -> Self {
        Self { inner: Self::with_work_precision(DBig::from(n)) }
    }

    /// Create from ratio (exact division)
    pub fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self { inner: DBig::ZERO };
        }
        let n = Self::with_work_precision(DBig::from(num));
        let d = Self::with_work_precision(DBig::from(den));
        Self { inner: n / d }
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    /// True when `self` and `other` differ by no more than `10^-digits`.
    pub fn approx_eq(&self, other: &Self, digits: i32) -> bool {
        let tolerance = Self { inner: Self::with_work_precision(DBig::from_parts(IBig::from(1), -(digits as isize))) };
        self.sub(other).abs() <= tolerance
    }

    /// Addition
    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    /// Subtraction
    pub fn sub(&self, other: &Self) -> Self {
        Self { inner: &self.inner - &other.inner }
    }

    /// Multiplication
    pub fn mul(&self, other: &Self) -> Self {
        Self { inner: &self.inner * &other.inner }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self { inner: &self.inner / &other.inner })
        }
    }

    /// Negation
    pub fn neg(&self) -> Self {
        Self { inner: -self.inner.clone() }
    }

    /// Integer power by repeated squaring
    pub fn pow(&self, exp: i32) -> Result<Self, NumberError> {
        let mut result = Self::from_i64(1);
        let mut base = self.clone();
        let mut n = exp.unsigned_abs();
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul(&base);
            }
            n >>= 1;
            if n > 0 {
                base = base.mul(&base);
            }
        }

        if exp < 0 {
            Self::from_i64(1).checked_div(&result)
        } else {
            Ok(result)
        }
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        Self { inner: Abs::abs(self.inner.clone()) }
    }

    /// Exact decimal literal, parseable by `from_str` and by `f64::from_str`.
    pub fn to_literal(&self) -> String {
        self.inner.to_string()
    }

    /// Nearest f64, `None` when out of range
    pub fn to_f64(&self) -> Option<f64> {
        self.to_literal().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_literal())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.partial_cmp(&other.inner).unwrap_or(std::cmp::Ordering::Equal)
    }
}
