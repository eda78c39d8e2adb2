//! Metrica Units - Units, scales and the catalog that holds them
//!
//! Provides the measure model and its conversions:
//! - Dimension: exponent vector over eight base magnitudes
//! - Unit / Quantity: ratio measures converted by a factor
//! - Scale / Level: interval measures converted by a factor and an offset
//! - Catalog: registry of units and scales, populated from modules
//! - Parsing: locale-aware reading of "10 mm", "-80 deg.Re", "$ 12"
//!
//! Families, not dimensions, decide convertibility: torque (N·m) and
//! energy (J) share a dimension but never convert.

mod dimension;
mod unit;
mod scale;
mod quantity;
mod measure;
mod module;
mod catalog;
mod numfmt;
mod parse;
pub mod builtin;

pub use dimension::{Dimension, Magnitude, BASE_COUNT};
pub use unit::{ConversionError, FamilyId, Rate, Unit, UnitRef};
pub use scale::{Scale, ScaleRef};
pub use quantity::{Level, Quantity};
pub use measure::{Measure, MeasureKind};
pub use module::{Module, ModuleError, ModuleItem, ScaleItem, UnitItem, MODULE_FORMAT};
pub use catalog::{Catalog, CatalogError, Selector, CATALOG};
pub use numfmt::{parse_number, NumberFormat, NumberStyles};
pub use parse::{tokenize, try_parse, try_parse_level, try_parse_quantity, MatchMode, ParseFailure, Parsed, Token};
