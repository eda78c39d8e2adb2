//! Catalog - registry of units and scales for one numeric representation

use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, RwLock};
use thiserror::Error;
use metrica_core::Real;
use crate::{
    Dimension, FamilyId, Measure, Module, ModuleItem, Scale, ScaleItem, ScaleRef, Unit,
    UnitItem, UnitRef,
};

/// Process-wide catalog of `f64` measures, seeded from the built-in module
pub static CATALOG: LazyLock<RwLock<Catalog<f64>>> = LazyLock::new(|| {
    let mut catalog = Catalog::new();
    if let Err(e) = catalog.merge(&Module::builtin()) {
        tracing::error!(error = %e, "built-in module rejected");
    }
    RwLock::new(catalog)
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("symbol \"{symbol}\" of {name} is already used by {existing}")]
    DuplicateSymbol {
        symbol: String,
        name: String,
        existing: String,
    },
    #[error("scale {scale} refers to unknown unit {unit}")]
    UnresolvedUnit { scale: String, unit: String },
    #[error("{name} has an invalid {field} \"{literal}\"")]
    InvalidNumber {
        name: String,
        field: &'static str,
        literal: String,
    },
}

/// Which module items to take when populating a catalog
pub enum Selector<'a> {
    All,
    Family(FamilyId),
    Sense(Dimension),
    Predicate(&'a dyn Fn(&ModuleItem) -> bool),
}

impl Selector<'_> {
    fn accepts<T: Real>(&self, item: &ModuleItem, module: &Module, catalog: &Catalog<T>) -> bool {
        match self {
            Selector::All => true,
            Selector::Family(id) => item.family() == *id,
            Selector::Sense(dim) => item_sense(item, module, catalog) == Some(*dim),
            Selector::Predicate(pred) => pred(item),
        }
    }
}

/// A scale's sense is its unit's, found in the module first, then in the catalog
fn item_sense<T: Real>(item: &ModuleItem, module: &Module, catalog: &Catalog<T>) -> Option<Dimension> {
    match item {
        ModuleItem::Unit(u) => Some(u.sense),
        ModuleItem::Scale(s) => module.units()
            .find(|u| u.name == s.unit)
            .map(|u| u.sense)
            .or_else(|| catalog.unit_named(&s.unit).map(|u| u.sense())),
    }
}

/// Ordered registry of units and scales
pub struct Catalog<T> {
    entries: Vec<Measure<T>>,
    symbols: HashMap<String, usize>,
    names: HashMap<String, usize>,
}

impl<T: Real> Catalog<T> {
    pub fn new() -> Self {
        Catalog {
            entries: Vec::new(),
            symbols: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. Fails without side effects on a symbol collision.
    pub fn add(&mut self, measure: impl Into<Measure<T>>) -> Result<(), CatalogError> {
        let measure = measure.into();
        self.check_symbols(&measure, &HashSet::new())?;
        self.push(measure);
        Ok(())
    }

    fn check_symbols(&self, measure: &Measure<T>, pending: &HashSet<String>) -> Result<(), CatalogError> {
        for symbol in measure.symbols() {
            if let Some(&idx) = self.symbols.get(symbol) {
                return Err(CatalogError::DuplicateSymbol {
                    symbol: symbol.clone(),
                    name: measure.name().to_string(),
                    existing: self.entries[idx].name().to_string(),
                });
            }
            if pending.contains(symbol) {
                return Err(CatalogError::DuplicateSymbol {
                    symbol: symbol.clone(),
                    name: measure.name().to_string(),
                    existing: "an entry of the same module".to_string(),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, measure: Measure<T>) {
        let idx = self.entries.len();
        for symbol in measure.symbols() {
            self.symbols.insert(symbol.clone(), idx);
        }
        self.names.entry(measure.name().to_string()).or_insert(idx);
        tracing::debug!(name = measure.name(), family = measure.family(), "catalog entry added");
        self.entries.push(measure);
    }

    /// Entry whose symbol set contains `symbol`
    pub fn find(&self, symbol: &str) -> Option<&Measure<T>> {
        self.symbols.get(symbol).map(|&idx| &self.entries[idx])
    }

    pub fn unit(&self, symbol: &str) -> Option<&UnitRef<T>> {
        self.find(symbol).and_then(|m| m.as_unit())
    }

    pub fn scale(&self, symbol: &str) -> Option<&ScaleRef<T>> {
        self.find(symbol).and_then(|m| m.as_scale())
    }

    pub fn named(&self, name: &str) -> Option<&Measure<T>> {
        self.names.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn unit_named(&self, name: &str) -> Option<&UnitRef<T>> {
        self.named(name).and_then(|m| m.as_unit())
    }

    pub fn scale_named(&self, name: &str) -> Option<&ScaleRef<T>> {
        self.named(name).and_then(|m| m.as_scale())
    }

    /// First-registered member of a family
    pub fn primary(&self, family: FamilyId) -> Option<&Measure<T>> {
        self.entries.iter().find(|m| m.family() == family)
    }

    pub fn is_primary(&self, measure: &Measure<T>) -> bool {
        self.primary(measure.family()) == Some(measure)
    }

    pub fn items(&self) -> impl Iterator<Item = &Measure<T>> + Clone + '_ {
        self.entries.iter()
    }

    pub fn items_in_family(&self, family: FamilyId) -> impl Iterator<Item = &Measure<T>> + Clone + '_ {
        self.entries.iter().filter(move |m| m.family() == family)
    }

    pub fn items_with_sense(&self, sense: Dimension) -> impl Iterator<Item = &Measure<T>> + Clone + '_ {
        self.entries.iter().filter(move |m| m.sense() == sense)
    }

    pub fn items_where<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Measure<T>> + Clone + 'a
    where
        P: Fn(&Measure<T>) -> bool + Clone + 'a,
    {
        self.entries.iter().filter(move |m| predicate(m))
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitRef<T>> + Clone + '_ {
        self.entries.iter().filter_map(|m| m.as_unit())
    }

    pub fn scales(&self) -> impl Iterator<Item = &ScaleRef<T>> + Clone + '_ {
        self.entries.iter().filter_map(|m| m.as_scale())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().flat_map(|m| m.symbols().iter().map(|s| s.as_str()))
    }

    /// Highest family id in use (0 when empty)
    pub fn max_family(&self) -> FamilyId {
        self.entries.iter().map(|m| m.family()).max().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.symbols.clear();
        self.names.clear();
    }

    /// Append every item of `module`. All-or-nothing.
    pub fn merge(&mut self, module: &Module) -> Result<usize, CatalogError> {
        self.append_module(module, &Selector::All)
    }

    /// Append the items of `module` accepted by `selector`. All-or-nothing:
    /// nothing is appended unless every selected item can be.
    pub fn append_module(&mut self, module: &Module, selector: &Selector<'_>) -> Result<usize, CatalogError> {
        // Units are built for the whole module so selected scales can ride on
        // units that were filtered out.
        let mut units: HashMap<&str, UnitRef<T>> = HashMap::new();
        for item in module.units() {
            units.insert(&item.name, build_unit(item)?);
        }

        let mut batch: Vec<Measure<T>> = Vec::new();
        let mut pending: HashSet<String> = HashSet::new();
        for item in &module.items {
            if !selector.accepts(item, module, self) {
                continue;
            }
            let measure = match item {
                ModuleItem::Unit(u) => match units.get(u.name.as_str()) {
                    Some(unit) => Measure::Unit(unit.clone()),
                    None => Measure::Unit(build_unit(u)?),
                },
                ModuleItem::Scale(s) => {
                    let unit = match units.get(s.unit.as_str()) {
                        Some(unit) => unit.clone(),
                        None => self.unit_named(&s.unit).cloned().ok_or_else(|| CatalogError::UnresolvedUnit {
                            scale: s.name.clone(),
                            unit: s.unit.clone(),
                        })?,
                    };
                    Measure::Scale(build_scale(s, unit)?)
                }
            };
            self.check_symbols(&measure, &pending)?;
            pending.extend(measure.symbols().iter().cloned());
            batch.push(measure);
        }

        let count = batch.len();
        for measure in batch {
            self.push(measure);
        }
        tracing::info!(module = %module.name, added = count, "module merged into catalog");
        Ok(count)
    }
}

impl<T: Real> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_literal<T: Real>(name: &str, field: &'static str, literal: &str) -> Result<T, CatalogError> {
    T::from_literal(literal).ok_or_else(|| CatalogError::InvalidNumber {
        name: name.to_string(),
        field,
        literal: literal.to_string(),
    })
}

fn build_unit<T: Real>(item: &UnitItem) -> Result<UnitRef<T>, CatalogError> {
    let factor: T = parse_literal(&item.name, "factor", &item.factor)?;
    if factor.is_zero() {
        return Err(CatalogError::InvalidNumber {
            name: item.name.clone(),
            field: "factor",
            literal: item.factor.clone(),
        });
    }
    let symbols = item.symbols.iter().cloned();
    let unit = if item.rated {
        Unit::rated(&item.name, symbols, item.family, item.sense, factor)
    } else {
        Unit::new(&item.name, symbols, item.family, item.sense, factor)
    };
    Ok(UnitRef::new(unit))
}

fn build_scale<T: Real>(item: &ScaleItem, unit: UnitRef<T>) -> Result<ScaleRef<T>, CatalogError> {
    let offset: T = parse_literal(&item.name, "offset", &item.offset)?;
    Ok(ScaleRef::new(Scale::new(
        &item.name,
        item.symbols.iter().cloned(),
        unit,
        offset,
        item.reference_point.as_deref(),
        item.family,
    )))
}
