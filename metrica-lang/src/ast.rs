//! Definition AST
//!
//! One extension cycle fills a [`Definitions`] twice: first with entries
//! rebuilt from already-loaded modules, then with freshly parsed ones. The
//! watermark taken in between marks the delta.

use std::collections::BTreeMap;
use metrica_core::Number;
use metrica_units::{Dimension, FamilyId, MeasureKind};

/// Where a definition came from
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    Decompiled { module: String },
    Parsed { line: usize },
}

impl Origin {
    pub fn is_decompiled(&self) -> bool {
        matches!(self, Origin::Decompiled { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitType {
    pub name: String,
    pub symbols: Vec<String>,
    pub sense: Dimension,
    pub sense_expr: String,
    /// Size in units of the family primary
    pub factor: Number,
    pub factor_expr: String,
    pub family: FamilyId,
    pub rated: bool,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleType {
    pub name: String,
    pub symbols: Vec<String>,
    pub reference_point: Option<String>,
    /// Name of the underlying unit
    pub unit: String,
    pub offset: Number,
    pub offset_expr: String,
    pub family: FamilyId,
    pub origin: Origin,
}

/// Members of one family; the primary is the first one added
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyLink {
    pub kind: MeasureKind,
    pub primary: String,
    pub relatives: Vec<String>,
}

/// Position in a [`Definitions`] list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark {
    pub units: usize,
    pub scales: usize,
}

/// Entries appended after a watermark
#[derive(Debug, Clone, Copy)]
pub struct Delta<'a> {
    pub units: &'a [UnitType],
    pub scales: &'a [ScaleType],
}

impl Delta<'_> {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.scales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len() + self.scales.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Definitions {
    units: Vec<UnitType>,
    scales: Vec<ScaleType>,
    families: BTreeMap<FamilyId, FamilyLink>,
    max_family: FamilyId,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[UnitType] {
        &self.units
    }

    pub fn scales(&self) -> &[ScaleType] {
        &self.scales
    }

    pub fn families(&self) -> &BTreeMap<FamilyId, FamilyLink> {
        &self.families
    }

    pub fn unit(&self, name: &str) -> Option<&UnitType> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn scale(&self, name: &str) -> Option<&ScaleType> {
        self.scales.iter().find(|s| s.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.unit(name).is_some() || self.scale(name).is_some()
    }

    /// Name of the entry owning `symbol`
    pub fn symbol_owner(&self, symbol: &str) -> Option<&str> {
        let unit = self.units.iter()
            .find(|u| u.symbols.iter().any(|s| s == symbol))
            .map(|u| u.name.as_str());
        unit.or_else(|| {
            self.scales.iter()
                .find(|s| s.symbols.iter().any(|x| x == symbol))
                .map(|s| s.name.as_str())
        })
    }

    /// Family of an earlier scale over the same unit family and reference point
    pub fn scale_family(&self, unit_family: FamilyId, reference_point: Option<&str>) -> Option<FamilyId> {
        self.scales.iter()
            .find(|s| {
                s.reference_point.as_deref() == reference_point
                    && self.unit(&s.unit).map(|u| u.family) == Some(unit_family)
            })
            .map(|s| s.family)
    }

    pub fn max_family(&self) -> FamilyId {
        self.max_family
    }

    /// Reserve ids up to `family` so fresh ones never collide with it
    pub fn note_family(&mut self, family: FamilyId) {
        self.max_family = self.max_family.max(family);
    }

    /// Allocate `max_family + 1`, `None` once the id space is exhausted
    pub fn next_family_id(&mut self) -> Option<FamilyId> {
        self.max_family = self.max_family.checked_add(1)?;
        Some(self.max_family)
    }

    fn link(&mut self, family: FamilyId, kind: MeasureKind, name: &str) {
        self.note_family(family);
        match self.families.get_mut(&family) {
            Some(link) => link.relatives.push(name.to_string()),
            None => {
                self.families.insert(family, FamilyLink {
                    kind,
                    primary: name.to_string(),
                    relatives: Vec::new(),
                });
            }
        }
    }

    pub fn add_unit(&mut self, unit: UnitType) {
        self.link(unit.family, MeasureKind::Unit, &unit.name);
        self.units.push(unit);
    }

    pub fn add_scale(&mut self, scale: ScaleType) {
        self.link(scale.family, MeasureKind::Scale, &scale.name);
        self.scales.push(scale);
    }

    pub fn watermark(&self) -> Watermark {
        Watermark {
            units: self.units.len(),
            scales: self.scales.len(),
        }
    }

    pub fn delta(&self, mark: Watermark) -> Delta<'_> {
        Delta {
            units: self.units.get(mark.units..).unwrap_or(&[]),
            scales: self.scales.get(mark.scales..).unwrap_or(&[]),
        }
    }
}
