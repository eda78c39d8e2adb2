//! Quantity and Level - values tied to a unit or a scale
//!
//! Both are snapshots: conversion always builds a new value.

use std::fmt;
use metrica_core::Real;
use crate::{ConversionError, Dimension, ScaleRef, UnitRef};

/// A value measured in a unit
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity<T> {
    pub value: T,
    pub unit: UnitRef<T>,
}

impl<T: Real> Quantity<T> {
    pub fn new(value: T, unit: UnitRef<T>) -> Self {
        Quantity { value, unit }
    }

    pub fn sense(&self) -> Dimension {
        self.unit.sense()
    }

    /// Convert to another unit of the same family
    pub fn convert_to(&self, target: &UnitRef<T>) -> Result<Quantity<T>, ConversionError> {
        target.from(self)
    }
}

impl<T: Real> fmt::Display for Quantity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.to_literal(), self.unit.symbol())
    }
}

/// A value on an interval scale
#[derive(Debug, Clone, PartialEq)]
pub struct Level<T> {
    pub value: T,
    pub scale: ScaleRef<T>,
}

impl<T: Real> Level<T> {
    pub fn new(value: T, scale: ScaleRef<T>) -> Self {
        Level { value, scale }
    }

    /// Absolute amount counted from the scale's reference point
    pub fn to_quantity(&self) -> Quantity<T> {
        Quantity::new(self.value.add(self.scale.offset()), self.scale.unit().clone())
    }

    /// Convert to another scale of the same family
    pub fn convert_to(&self, target: &ScaleRef<T>) -> Result<Level<T>, ConversionError> {
        target.from_level(self)
    }
}

impl<T: Real> fmt::Display for Level<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.to_literal(), self.scale.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scale, Unit};

    #[test]
    fn test_display() {
        let m = UnitRef::new(Unit::new("Meter", ["m"], 1, Dimension::LENGTH, 1.0));
        assert_eq!(m.quantity(5.0).to_string(), "5 m");
        assert_eq!(m.quantity(2.5).sense(), Dimension::LENGTH);
    }

    #[test]
    fn test_level_to_quantity() {
        let k = UnitRef::new(Unit::new("Kelvin", ["K"], 4, Dimension::TEMPERATURE, 1.0));
        let c = ScaleRef::new(Scale::new("Celsius", ["°C"], k.clone(), 273.15, Some("AbsoluteZero"), 20));
        let q: Quantity<f64> = c.level(100.0).to_quantity();
        assert!((q.value - 373.15).abs() < 1e-9);
        assert_eq!(q.unit, k);
    }

    #[test]
    fn test_convert_leaves_source_untouched() {
        let m = UnitRef::new(Unit::new("Meter", ["m"], 1, Dimension::LENGTH, 1.0));
        let cm = UnitRef::new(Unit::new("Centimeter", ["cm"], 1, Dimension::LENGTH, 0.01));
        let q = m.quantity(2.0);
        let c: Quantity<f64> = q.convert_to(&cm).unwrap();
        assert!((c.value - 200.0).abs() < 1e-9);
        assert_eq!(q.value, 2.0);
        assert_eq!(q.unit, m);
    }
}
