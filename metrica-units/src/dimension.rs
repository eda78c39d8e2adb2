//! Dimensional analysis types
//!
//! Each measure has a sense represented as an 8-element exponent vector:
//! [length, time, mass, temperature, current, amount, luminosity, other]
//!
//! The `other` slot carries non-physical kinds such as money.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Number of base magnitudes
pub const BASE_COUNT: usize = 8;

/// Base magnitudes, in exponent-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Magnitude {
    Length,
    Time,
    Mass,
    Temperature,
    ElectricCurrent,
    AmountOfSubstance,
    LuminousIntensity,
    Other,
}

impl Magnitude {
    pub const ALL: [Magnitude; BASE_COUNT] = [
        Magnitude::Length,
        Magnitude::Time,
        Magnitude::Mass,
        Magnitude::Temperature,
        Magnitude::ElectricCurrent,
        Magnitude::AmountOfSubstance,
        Magnitude::LuminousIntensity,
        Magnitude::Other,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a magnitude by the name used in definition text.
    pub fn from_name(name: &str) -> Option<Magnitude> {
        match name {
            "Length" => Some(Magnitude::Length),
            "Time" => Some(Magnitude::Time),
            "Mass" => Some(Magnitude::Mass),
            "Temperature" => Some(Magnitude::Temperature),
            "ElectricCurrent" | "Current" => Some(Magnitude::ElectricCurrent),
            "AmountOfSubstance" | "Amount" => Some(Magnitude::AmountOfSubstance),
            "LuminousIntensity" | "Luminosity" => Some(Magnitude::LuminousIntensity),
            "Other" | "Money" | "Currency" => Some(Magnitude::Other),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Magnitude::Length => "Length",
            Magnitude::Time => "Time",
            Magnitude::Mass => "Mass",
            Magnitude::Temperature => "Temperature",
            Magnitude::ElectricCurrent => "ElectricCurrent",
            Magnitude::AmountOfSubstance => "AmountOfSubstance",
            Magnitude::LuminousIntensity => "LuminousIntensity",
            Magnitude::Other => "Other",
        }
    }

    fn abbreviation(self) -> &'static str {
        match self {
            Magnitude::Length => "L",
            Magnitude::Time => "T",
            Magnitude::Mass => "M",
            Magnitude::Temperature => "Θ",
            Magnitude::ElectricCurrent => "I",
            Magnitude::AmountOfSubstance => "N",
            Magnitude::LuminousIntensity => "J",
            Magnitude::Other => "$",
        }
    }
}

/// Represents the sense of a measure as exponents of the base magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// [length, time, mass, temperature, current, amount, luminosity, other]
    pub exponents: [i32; BASE_COUNT],
}

impl Dimension {
    /// Dimensionless (all exponents zero)
    pub const DIMENSIONLESS: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 0, 0, 0] };

    /// Length [L]
    pub const LENGTH: Dimension = Dimension { exponents: [1, 0, 0, 0, 0, 0, 0, 0] };

    /// Time [T]
    pub const TIME: Dimension = Dimension { exponents: [0, 1, 0, 0, 0, 0, 0, 0] };

    /// Mass [M]
    pub const MASS: Dimension = Dimension { exponents: [0, 0, 1, 0, 0, 0, 0, 0] };

    /// Temperature [Θ]
    pub const TEMPERATURE: Dimension = Dimension { exponents: [0, 0, 0, 1, 0, 0, 0, 0] };

    /// Electric current [I]
    pub const CURRENT: Dimension = Dimension { exponents: [0, 0, 0, 0, 1, 0, 0, 0] };

    /// Amount of substance [N]
    pub const AMOUNT: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 1, 0, 0] };

    /// Luminous intensity [J]
    pub const LUMINOSITY: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 0, 1, 0] };

    /// Non-physical kinds, e.g. money
    pub const OTHER: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 0, 0, 1] };

    /// Velocity [L T^-1]
    pub const VELOCITY: Dimension = Dimension { exponents: [1, -1, 0, 0, 0, 0, 0, 0] };

    /// Force [L T^-2 M]
    pub const FORCE: Dimension = Dimension { exponents: [1, -2, 1, 0, 0, 0, 0, 0] };

    /// Energy and torque [L^2 T^-2 M]
    pub const ENERGY: Dimension = Dimension { exponents: [2, -2, 1, 0, 0, 0, 0, 0] };

    /// Power [L^2 T^-3 M]
    pub const POWER: Dimension = Dimension { exponents: [2, -3, 1, 0, 0, 0, 0, 0] };

    /// Area [L^2]
    pub const AREA: Dimension = Dimension { exponents: [2, 0, 0, 0, 0, 0, 0, 0] };

    /// Create a new dimension from exponents
    pub fn new(exponents: [i32; BASE_COUNT]) -> Self {
        Dimension { exponents }
    }

    /// Single base magnitude with exponent 1
    pub fn of(magnitude: Magnitude) -> Self {
        let mut exponents = [0i32; BASE_COUNT];
        exponents[magnitude.index()] = 1;
        Dimension { exponents }
    }

    pub fn exponent(&self, magnitude: Magnitude) -> i32 {
        self.exponents[magnitude.index()]
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|&e| e == 0)
    }

    /// Multiply dimensions (add exponents)
    pub fn multiply(&self, other: &Dimension) -> Dimension {
        let mut result = [0i32; BASE_COUNT];
        for i in 0..BASE_COUNT {
            result[i] = self.exponents[i] + other.exponents[i];
        }
        Dimension { exponents: result }
    }

    /// Divide dimensions (subtract exponents)
    pub fn divide(&self, other: &Dimension) -> Dimension {
        let mut result = [0i32; BASE_COUNT];
        for i in 0..BASE_COUNT {
            result[i] = self.exponents[i] - other.exponents[i];
        }
        Dimension { exponents: result }
    }

    /// Raise to integer power (multiply exponents)
    pub fn power(&self, exp: i32) -> Dimension {
        let mut result = [0i32; BASE_COUNT];
        for i in 0..BASE_COUNT {
            result[i] = self.exponents[i] * exp;
        }
        Dimension { exponents: result }
    }

    /// Like [`Dimension::multiply`], `None` when an exponent overflows
    pub fn checked_multiply(&self, other: &Dimension) -> Option<Dimension> {
        self.combine(other, i32::checked_add)
    }

    /// Like [`Dimension::divide`], `None` when an exponent overflows
    pub fn checked_divide(&self, other: &Dimension) -> Option<Dimension> {
        self.combine(other, i32::checked_sub)
    }

    /// Like [`Dimension::power`], `None` when an exponent overflows
    pub fn checked_power(&self, exp: i32) -> Option<Dimension> {
        let mut result = [0i32; BASE_COUNT];
        for (r, e) in result.iter_mut().zip(self.exponents) {
            *r = e.checked_mul(exp)?;
        }
        Some(Dimension { exponents: result })
    }

    fn combine(&self, other: &Dimension, op: fn(i32, i32) -> Option<i32>) -> Option<Dimension> {
        let mut result = [0i32; BASE_COUNT];
        for i in 0..BASE_COUNT {
            result[i] = op(self.exponents[i], other.exponents[i])?;
        }
        Some(Dimension { exponents: result })
    }

    /// Negate exponents (1/x)
    pub fn negate(&self) -> Dimension {
        self.power(-1)
    }

    /// Name of a common kind with this sense
    pub fn name(&self) -> Option<&'static str> {
        match self.exponents {
            [0, 0, 0, 0, 0, 0, 0, 0] => Some("dimensionless"),
            [1, 0, 0, 0, 0, 0, 0, 0] => Some("length"),
            [0, 1, 0, 0, 0, 0, 0, 0] => Some("time"),
            [0, 0, 1, 0, 0, 0, 0, 0] => Some("mass"),
            [0, 0, 0, 1, 0, 0, 0, 0] => Some("temperature"),
            [0, 0, 0, 0, 1, 0, 0, 0] => Some("current"),
            [0, 0, 0, 0, 0, 1, 0, 0] => Some("amount"),
            [0, 0, 0, 0, 0, 0, 1, 0] => Some("luminosity"),
            [0, 0, 0, 0, 0, 0, 0, 1] => Some("other"),
            [1, -1, 0, 0, 0, 0, 0, 0] => Some("velocity"),
            [1, -2, 0, 0, 0, 0, 0, 0] => Some("acceleration"),
            [1, -2, 1, 0, 0, 0, 0, 0] => Some("force"),
            [2, -2, 1, 0, 0, 0, 0, 0] => Some("energy"),
            [2, -3, 1, 0, 0, 0, 0, 0] => Some("power"),
            [2, 0, 0, 0, 0, 0, 0, 0] => Some("area"),
            [3, 0, 0, 0, 0, 0, 0, 0] => Some("volume"),
            [0, -1, 0, 0, 0, 0, 0, 0] => Some("frequency"),
            _ => None,
        }
    }

    /// Render in definition-language form, e.g. `<Length/Time^2>`.
    pub fn to_sense_literal(&self) -> String {
        let part = |m: Magnitude, e: i32| {
            if e == 1 { m.name().to_string() } else { format!("{}^{}", m.name(), e) }
        };
        let mut num = Vec::new();
        let mut den = Vec::new();
        let mut inverse = Vec::new();
        for m in Magnitude::ALL {
            let exp = self.exponent(m);
            if exp > 0 {
                num.push(part(m, exp));
            } else if exp < 0 {
                den.push(part(m, -exp));
                inverse.push(part(m, exp));
            }
        }
        let body = match (num.is_empty(), den.is_empty()) {
            (true, true) => String::new(),
            (false, true) => num.join("*"),
            (true, false) => inverse.join("*"),
            (false, false) => format!("{}/{}", num.join("*"), den.join("/")),
        };
        format!("<{}>", body)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        for m in Magnitude::ALL {
            let exp = self.exponent(m);
            if exp == 1 {
                parts.push(m.abbreviation().to_string());
            } else if exp != 0 {
                parts.push(format!("{}^{}", m.abbreviation(), exp));
            }
        }

        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::DIMENSIONLESS
    }
}
