//! Built-in module: the starter set of units and scales every catalog can
//! be seeded with.
//!
//! NauticalMile is absent; it is the usual example of a unit added at
//! runtime through the definition language.

use metrica_core::Number;
use crate::{Dimension, FamilyId, Module, ModuleItem, ScaleItem, UnitItem};

/// Name of the built-in module
pub const BUILTIN_MODULE: &str = "builtin";

pub const LENGTH_FAMILY: FamilyId = 1;
pub const TIME_FAMILY: FamilyId = 2;
pub const MASS_FAMILY: FamilyId = 3;
pub const TEMPERATURE_FAMILY: FamilyId = 4;
pub const VELOCITY_FAMILY: FamilyId = 5;
pub const FORCE_FAMILY: FamilyId = 6;
pub const ENERGY_FAMILY: FamilyId = 7;
pub const TORQUE_FAMILY: FamilyId = 8;
pub const POWER_FAMILY: FamilyId = 9;
pub const ANGLE_FAMILY: FamilyId = 10;
pub const CURRENCY_FAMILY: FamilyId = 11;
pub const TEMPERATURE_SCALE_FAMILY: FamilyId = 12;

/// Reference point of the thermodynamic temperature scales
pub const ABSOLUTE_ZERO: &str = "AbsoluteZero";

const PI_OVER_180: &str = "0.017453292519943295769236907684886127134428718885417";

struct Builder {
    module: Module,
}

impl Builder {
    fn unit(&mut self, name: &str, symbols: &[&str], family: FamilyId, sense: Dimension, factor: &str) {
        self.module.items.push(ModuleItem::Unit(UnitItem {
            name: name.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            family,
            sense,
            factor: factor.to_string(),
            rated: false,
            expr: None,
        }));
    }

    fn rated(&mut self, name: &str, symbols: &[&str], family: FamilyId, sense: Dimension, factor: &str) {
        self.unit(name, symbols, family, sense, factor);
        if let Some(ModuleItem::Unit(u)) = self.module.items.last_mut() {
            u.rated = true;
        }
    }

    fn scale(&mut self, name: &str, symbols: &[&str], unit: &str, offset: &str) {
        self.module.items.push(ModuleItem::Scale(ScaleItem {
            name: name.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            family: TEMPERATURE_SCALE_FAMILY,
            unit: unit.to_string(),
            offset: offset.to_string(),
            reference_point: Some(ABSOLUTE_ZERO.to_string()),
        }));
    }

    fn register_length_units(&mut self) {
        let f = LENGTH_FAMILY;
        let d = Dimension::LENGTH;
        self.unit("Meter", &["m"], f, d, "1");
        self.unit("Centimeter", &["cm"], f, d, "0.01");
        self.unit("Millimeter", &["mm"], f, d, "0.001");
        self.unit("Kilometer", &["km"], f, d, "1000");
        self.unit("Inch", &["in"], f, d, "0.0254");
        self.unit("Foot", &["ft"], f, d, "0.3048");
        self.unit("Yard", &["yd"], f, d, "0.9144");
        self.unit("Mile", &["mi"], f, d, "1609.344");
    }

    fn register_time_units(&mut self) {
        let f = TIME_FAMILY;
        let d = Dimension::TIME;
        self.unit("Second", &["s", "sec"], f, d, "1");
        self.unit("Minute", &["min"], f, d, "60");
        self.unit("Hour", &["h", "hr"], f, d, "3600");
        self.unit("Day", &["d", "day"], f, d, "86400");
    }

    fn register_mass_units(&mut self) {
        let f = MASS_FAMILY;
        let d = Dimension::MASS;
        self.unit("Kilogram", &["kg"], f, d, "1");
        self.unit("Gram", &["g"], f, d, "0.001");
        self.unit("Tonne", &["t"], f, d, "1000");
        self.unit("Pound", &["lb", "lbs"], f, d, "0.45359237");
        self.unit("Ounce", &["oz"], f, d, "0.028349523125");
    }

    fn register_temperature_units(&mut self) {
        let f = TEMPERATURE_FAMILY;
        let d = Dimension::TEMPERATURE;
        let five_ninths = Number::from_ratio(5, 9).to_literal();
        self.unit("Kelvin", &["K", "ΔK"], f, d, "1");
        self.unit("DegCelsius", &["Δ°C", "deltaC"], f, d, "1");
        self.unit("DegFahrenheit", &["Δ°F", "deltaF"], f, d, &five_ninths);
        self.unit("DegRankine", &["Δ°R", "deltaR"], f, d, &five_ninths);
        self.unit("DegReaumur", &["Δ°Ré", "deltaRe"], f, d, "1.25");
    }

    fn register_temperature_scales(&mut self) {
        self.scale("KelvinScale", &["°K", "deg.K"], "Kelvin", "0");
        self.scale("Celsius", &["°C", "deg.C"], "DegCelsius", "273.15");
        self.scale("Fahrenheit", &["°F", "deg.F"], "DegFahrenheit", "459.67");
        self.scale("Rankine", &["°R", "deg.R"], "DegRankine", "0");
        self.scale("Reaumur", &["°Ré", "deg.Re"], "DegReaumur", "218.52");
    }

    fn register_mechanical_units(&mut self) {
        let kmh = Number::from_ratio(5, 18).to_literal();
        self.unit("MeterPerSecond", &["m/s"], VELOCITY_FAMILY, Dimension::VELOCITY, "1");
        self.unit("KilometerPerHour", &["km/h", "kph"], VELOCITY_FAMILY, Dimension::VELOCITY, &kmh);
        self.unit("MilePerHour", &["mph"], VELOCITY_FAMILY, Dimension::VELOCITY, "0.44704");

        self.unit("Newton", &["N"], FORCE_FAMILY, Dimension::FORCE, "1");

        self.unit("Joule", &["J"], ENERGY_FAMILY, Dimension::ENERGY, "1");
        self.unit("WattHour", &["Wh"], ENERGY_FAMILY, Dimension::ENERGY, "3600");
        self.unit("Calorie", &["cal"], ENERGY_FAMILY, Dimension::ENERGY, "4.184");

        // Same dimension as energy, never convertible to it
        self.unit("NewtonMeter", &["N·m", "N*m"], TORQUE_FAMILY, Dimension::ENERGY, "1");

        self.unit("Watt", &["W"], POWER_FAMILY, Dimension::POWER, "1");
    }

    fn register_angle_units(&mut self) {
        let d = Dimension::DIMENSIONLESS;
        self.unit("Radian", &["rad"], ANGLE_FAMILY, d, "1");
        self.unit("Degree", &["°", "deg"], ANGLE_FAMILY, d, PI_OVER_180);
    }

    fn register_currency_units(&mut self) {
        let f = CURRENCY_FAMILY;
        let d = Dimension::OTHER;
        self.unit("EUR", &["EUR", "€"], f, d, "1");
        self.rated("USD", &["USD", "$"], f, d, "0.86");
        self.rated("GBP", &["GBP", "£"], f, d, "1.16");
        self.rated("PLN", &["PLN", "zł"], f, d, "0.235");
    }
}

impl Module {
    /// The built-in module, grouped by kind
    pub fn builtin() -> Module {
        let mut b = Builder { module: Module::new(BUILTIN_MODULE) };
        b.register_length_units();
        b.register_time_units();
        b.register_mass_units();
        b.register_temperature_units();
        b.register_temperature_scales();
        b.register_mechanical_units();
        b.register_angle_units();
        b.register_currency_units();
        b.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_symbols_unique() {
        let m = Module::builtin();
        let mut seen = HashSet::new();
        for item in &m.items {
            for s in item.symbols() {
                assert!(seen.insert(s.clone()), "duplicate symbol {}", s);
            }
        }
    }

    #[test]
    fn test_no_nautical_mile() {
        let m = Module::builtin();
        assert!(m.find("NauticalMile").is_none());
        assert!(m.items.iter().all(|i| !i.symbols().iter().any(|s| s == "nmi")));
    }

    #[test]
    fn test_primaries_are_coherent() {
        let m = Module::builtin();
        let mut seen = HashSet::new();
        for u in m.units() {
            if seen.insert(u.family) {
                assert_eq!(u.factor, "1", "{} leads family {}", u.name, u.family);
            }
        }
    }

    #[test]
    fn test_factors_are_literals() {
        let m = Module::builtin();
        for u in m.units() {
            assert!(Number::from_str(&u.factor).is_ok(), "{}", u.factor);
        }
        assert_eq!(m.max_family(), TEMPERATURE_SCALE_FAMILY);
    }
}
