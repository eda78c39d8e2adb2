//! Catalog entry: either a unit or a scale

use std::fmt;
use serde::{Deserialize, Serialize};
use metrica_core::Real;
use crate::{Dimension, FamilyId, ScaleRef, UnitRef};

/// Kind of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    Unit,
    Scale,
}

/// Handle to a registered unit or scale
#[derive(Debug, Clone, PartialEq)]
pub enum Measure<T> {
    Unit(UnitRef<T>),
    Scale(ScaleRef<T>),
}

impl<T: Real> Measure<T> {
    pub fn kind(&self) -> MeasureKind {
        match self {
            Measure::Unit(_) => MeasureKind::Unit,
            Measure::Scale(_) => MeasureKind::Scale,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Measure::Unit(u) => u.name(),
            Measure::Scale(s) => s.name(),
        }
    }

    pub fn symbols(&self) -> &[String] {
        match self {
            Measure::Unit(u) => u.symbols(),
            Measure::Scale(s) => s.symbols(),
        }
    }

    pub fn family(&self) -> FamilyId {
        match self {
            Measure::Unit(u) => u.family(),
            Measure::Scale(s) => s.family(),
        }
    }

    pub fn sense(&self) -> Dimension {
        match self {
            Measure::Unit(u) => u.sense(),
            Measure::Scale(s) => s.sense(),
        }
    }

    pub fn as_unit(&self) -> Option<&UnitRef<T>> {
        match self {
            Measure::Unit(u) => Some(u),
            Measure::Scale(_) => None,
        }
    }

    pub fn as_scale(&self) -> Option<&ScaleRef<T>> {
        match self {
            Measure::Unit(_) => None,
            Measure::Scale(s) => Some(s),
        }
    }
}

impl<T: Real> From<UnitRef<T>> for Measure<T> {
    fn from(u: UnitRef<T>) -> Self {
        Measure::Unit(u)
    }
}

impl<T: Real> From<ScaleRef<T>> for Measure<T> {
    fn from(s: ScaleRef<T>) -> Self {
        Measure::Scale(s)
    }
}

impl<T: Real> fmt::Display for Measure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Unit(u) => write!(f, "{}", u),
            Measure::Scale(s) => write!(f, "{}", s),
        }
    }
}
