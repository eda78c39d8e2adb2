//! Unit representation with conversion factors

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use metrica_core::Real;
use crate::{Dimension, Quantity};

/// Identifier of a family of mutually convertible measures
pub type FamilyId = u32;

/// Errors that can occur during unit conversion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Measures belong to different families
    #[error("cannot convert {from} (family {from_family}) to {to} (family {to_family}): incompatible families")]
    IncompatibleFamily {
        from: String,
        to: String,
        from_family: FamilyId,
        to_family: FamilyId,
    },
    /// Target factor is zero
    #[error("unit {unit} has a zero factor")]
    DegenerateFactor { unit: String },
}

/// Externally driven conversion factor (e.g. an exchange rate).
///
/// Only units created with [`Unit::rated`] carry one; all other units have a
/// factor fixed at creation.
#[derive(Debug)]
pub struct Rate<T> {
    value: RwLock<T>,
}

impl<T: Real> Rate<T> {
    fn new(value: T) -> Self {
        Rate { value: RwLock::new(value) }
    }

    pub fn get(&self) -> T {
        match self.value.read() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the rate. A zero rate is rejected.
    pub fn set(&self, value: T) -> Result<(), T> {
        if value.is_zero() {
            return Err(value);
        }
        match self.value.write() {
            Ok(mut v) => *v = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Factor<T> {
    Fixed(T),
    Rated(Rate<T>),
}

/// A ratio-scale measure, convertible to its family primary by a factor.
#[derive(Debug)]
pub struct Unit<T> {
    name: String,
    symbols: Vec<String>,
    family: FamilyId,
    sense: Dimension,
    factor: Factor<T>,
}

/// Symbols in order, later duplicates dropped
pub(crate) fn unique_symbols<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in symbols {
        let s = s.into();
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

impl<T: Real> Unit<T> {
    /// Create a unit whose factor is fixed for its lifetime
    pub fn new<S: Into<String>>(
        name: &str,
        symbols: impl IntoIterator<Item = S>,
        family: FamilyId,
        sense: Dimension,
        factor: T,
    ) -> Self {
        Unit {
            name: name.to_string(),
            symbols: unique_symbols(symbols),
            family,
            sense,
            factor: Factor::Fixed(factor),
        }
    }

    /// Create a unit whose factor may be updated later through [`Unit::rate`]
    pub fn rated<S: Into<String>>(
        name: &str,
        symbols: impl IntoIterator<Item = S>,
        family: FamilyId,
        sense: Dimension,
        factor: T,
    ) -> Self {
        Unit {
            name: name.to_string(),
            symbols: unique_symbols(symbols),
            family,
            sense,
            factor: Factor::Rated(Rate::new(factor)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// First (default) symbol
    pub fn symbol(&self) -> &str {
        self.symbols.first().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn family(&self) -> FamilyId {
        self.family
    }

    pub fn sense(&self) -> Dimension {
        self.sense
    }

    /// Size of this unit expressed in units of the family primary
    pub fn factor(&self) -> T {
        match &self.factor {
            Factor::Fixed(f) => f.clone(),
            Factor::Rated(r) => r.get(),
        }
    }

    /// The mutable rate of a rated unit
    pub fn rate(&self) -> Option<&Rate<T>> {
        match &self.factor {
            Factor::Fixed(_) => None,
            Factor::Rated(r) => Some(r),
        }
    }

    pub fn is_rated(&self) -> bool {
        self.rate().is_some()
    }

    /// Convert a value expressed in `source` into this unit
    pub fn convert_value(&self, value: &T, source: &Unit<T>) -> Result<T, ConversionError> {
        if source.family != self.family {
            return Err(ConversionError::IncompatibleFamily {
                from: source.name.clone(),
                to: self.name.clone(),
                from_family: source.family,
                to_family: self.family,
            });
        }
        value.mul(&source.factor())
            .div(&self.factor())
            .ok_or_else(|| ConversionError::DegenerateFactor { unit: self.name.clone() })
    }
}

impl<T> fmt::Display for Unit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbols.first().unwrap_or(&self.name))
    }
}

/// Shared handle to a registered unit. Equality is identity.
#[derive(Debug)]
pub struct UnitRef<T>(Arc<Unit<T>>);

impl<T: Real> UnitRef<T> {
    pub fn new(unit: Unit<T>) -> Self {
        UnitRef(Arc::new(unit))
    }

    /// Build a quantity of this unit
    pub fn quantity(&self, value: T) -> Quantity<T> {
        Quantity::new(value, self.clone())
    }

    /// Re-express `q` in this unit: `value * q.unit.factor / self.factor`
    pub fn from(&self, q: &Quantity<T>) -> Result<Quantity<T>, ConversionError> {
        let value = self.convert_value(&q.value, &q.unit)?;
        Ok(Quantity::new(value, self.clone()))
    }
}

impl<T> Clone for UnitRef<T> {
    fn clone(&self) -> Self {
        UnitRef(Arc::clone(&self.0))
    }
}

impl<T> Deref for UnitRef<T> {
    type Target = Unit<T>;

    fn deref(&self) -> &Unit<T> {
        &self.0
    }
}

impl<T> PartialEq for UnitRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> fmt::Display for UnitRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
