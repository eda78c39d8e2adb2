//! Scale representation: an affine measure riding on a unit
//!
//! A level's absolute amount, counted from the scale's reference point in
//! the scale's unit, is `value + offset`.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use metrica_core::Real;
use crate::unit::unique_symbols;
use crate::{ConversionError, Dimension, FamilyId, Level, Quantity, UnitRef};

/// An interval-scale measure (e.g. Celsius over a Kelvin-sized degree)
#[derive(Debug)]
pub struct Scale<T> {
    name: String,
    symbols: Vec<String>,
    unit: UnitRef<T>,
    offset: T,
    reference_point: Option<String>,
    family: FamilyId,
}

impl<T: Real> Scale<T> {
    pub fn new<S: Into<String>>(
        name: &str,
        symbols: impl IntoIterator<Item = S>,
        unit: UnitRef<T>,
        offset: T,
        reference_point: Option<&str>,
        family: FamilyId,
    ) -> Self {
        Scale {
            name: name.to_string(),
            symbols: unique_symbols(symbols),
            unit,
            offset,
            reference_point: reference_point.map(|r| r.to_string()),
            family,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn symbol(&self) -> &str {
        self.symbols.first().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn unit(&self) -> &UnitRef<T> {
        &self.unit
    }

    pub fn offset(&self) -> &T {
        &self.offset
    }

    pub fn reference_point(&self) -> Option<&str> {
        self.reference_point.as_deref()
    }

    pub fn family(&self) -> FamilyId {
        self.family
    }

    pub fn sense(&self) -> Dimension {
        self.unit.sense()
    }
}

impl<T> fmt::Display for Scale<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbols.first().unwrap_or(&self.name))
    }
}

/// Shared handle to a registered scale. Equality is identity.
#[derive(Debug)]
pub struct ScaleRef<T>(Arc<Scale<T>>);

impl<T: Real> ScaleRef<T> {
    pub fn new(scale: Scale<T>) -> Self {
        ScaleRef(Arc::new(scale))
    }

    /// Build a level on this scale
    pub fn level(&self, value: T) -> Level<T> {
        Level::new(value, self.clone())
    }

    /// Promote an absolute amount (counted from the reference point) to a level
    pub fn from_quantity(&self, q: &Quantity<T>) -> Result<Level<T>, ConversionError> {
        if q.unit.family() != self.unit.family() {
            return Err(ConversionError::IncompatibleFamily {
                from: q.unit.name().to_string(),
                to: self.name.clone(),
                from_family: q.unit.family(),
                to_family: self.unit.family(),
            });
        }
        let amount = self.unit.convert_value(&q.value, &q.unit)?;
        Ok(Level::new(amount.sub(&self.offset), self.clone()))
    }

    /// Re-express a level of a scale in the same family
    pub fn from_level(&self, l: &Level<T>) -> Result<Level<T>, ConversionError> {
        if l.scale.family() != self.family {
            return Err(ConversionError::IncompatibleFamily {
                from: l.scale.name().to_string(),
                to: self.name.clone(),
                from_family: l.scale.family(),
                to_family: self.family,
            });
        }
        self.from_quantity(&l.to_quantity())
    }
}

impl<T> Clone for ScaleRef<T> {
    fn clone(&self) -> Self {
        ScaleRef(Arc::clone(&self.0))
    }
}

impl<T> Deref for ScaleRef<T> {
    type Target = Scale<T>;

    fn deref(&self) -> &Scale<T> {
        &self.0
    }
}

impl<T> PartialEq for ScaleRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> fmt::Display for ScaleRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unit;

    struct Temperature {
        kelvin: ScaleRef<f64>,
        celsius: ScaleRef<f64>,
        fahrenheit: ScaleRef<f64>,
        k: UnitRef<f64>,
    }

    fn temperature() -> Temperature {
        let k = UnitRef::new(Unit::new("Kelvin", ["K"], 4, Dimension::TEMPERATURE, 1.0));
        let deg_f = UnitRef::new(Unit::new("DegFahrenheit", ["Δ°F"], 4, Dimension::TEMPERATURE, 5.0 / 9.0));
        Temperature {
            kelvin: ScaleRef::new(Scale::new("KelvinScale", ["°K"], k.clone(), 0.0, Some("AbsoluteZero"), 20)),
            celsius: ScaleRef::new(Scale::new("Celsius", ["°C"], k.clone(), 273.15, Some("AbsoluteZero"), 20)),
            fahrenheit: ScaleRef::new(Scale::new("Fahrenheit", ["°F"], deg_f, 459.67, Some("AbsoluteZero"), 20)),
            k,
        }
    }

    #[test]
    fn test_duplicate_symbols_dropped() {
        let t = temperature();
        let scale = Scale::new("Celsius", ["°C", "deg.C", "°C"], t.k.clone(), 273.15, None, 21);
        assert_eq!(scale.symbols(), ["°C", "deg.C"]);
        assert_eq!(scale.symbol(), "°C");
    }

    #[test]
    fn test_kelvin_to_celsius() {
        let t = temperature();
        let c = t.celsius.from_level(&t.kelvin.level(373.15)).unwrap();
        assert!((c.value - 100.0).abs() < 1e-9);
        assert_eq!(c.scale, t.celsius);
    }

    #[test]
    fn test_celsius_to_fahrenheit_and_back() {
        let t = temperature();
        let f = t.fahrenheit.from_level(&t.celsius.level(100.0)).unwrap();
        assert!((f.value - 212.0).abs() < 1e-9);
        let c = t.celsius.from_level(&f).unwrap();
        assert!((c.value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_quantity() {
        let t = temperature();
        let l = t.celsius.from_quantity(&t.k.quantity(0.0)).unwrap();
        assert!((l.value + 273.15).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible_scale_family() {
        let t = temperature();
        let other = ScaleRef::new(Scale::new("Odd", ["odd"], t.k.clone(), 0.0, None, 21));
        assert!(matches!(
            t.celsius.from_level(&other.level(1.0)),
            Err(ConversionError::IncompatibleFamily { .. })
        ));
        let meter = UnitRef::new(Unit::new("Meter", ["m"], 1, Dimension::LENGTH, 1.0));
        assert!(t.celsius.from_quantity(&meter.quantity(1.0)).is_err());
    }
}
