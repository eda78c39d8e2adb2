//! Decompiler - rebuild definitions from loaded modules
//!
//! Modules carry their own manifest, so the definitions behind every loaded
//! unit and scale can be read back without inspecting compiled code.

use metrica_core::{Diagnostic, Number};
use metrica_lang::{Definitions, Origin, ScaleType, UnitType};
use metrica_units::{Module, ScaleItem, UnitItem};

pub struct Decompiler;

impl Decompiler {
    /// Walk `modules` in load order. The first entry seen for a family
    /// becomes its primary.
    pub fn decompile<'a, I>(modules: I) -> Result<Definitions, Diagnostic>
    where
        I: IntoIterator<Item = &'a Module>,
    {
        let mut defs = Definitions::new();
        let mut count = 0usize;
        for module in modules {
            for unit in module.units() {
                if defs.contains_name(&unit.name) {
                    tracing::warn!(module = %module.name, name = %unit.name, "name already decompiled, skipped");
                    continue;
                }
                defs.add_unit(unit_type(unit, &module.name)?);
                count += 1;
            }
            for scale in module.scales() {
                if defs.contains_name(&scale.name) {
                    tracing::warn!(module = %module.name, name = %scale.name, "name already decompiled, skipped");
                    continue;
                }
                defs.add_scale(scale_type(scale, &module.name)?);
                count += 1;
            }
            defs.note_family(module.max_family());
        }
        tracing::debug!(entries = count, max_family = defs.max_family(), "modules decompiled");
        Ok(defs)
    }
}

fn literal(module: &str, name: &str, text: &str) -> Result<Number, Diagnostic> {
    Number::from_str(text).map_err(|e| {
        Diagnostic::load(format!("{} in module {} has an unreadable value \"{}\": {}", name, module, text, e))
    })
}

fn unit_type(item: &UnitItem, module: &str) -> Result<UnitType, Diagnostic> {
    let factor = literal(module, &item.name, &item.factor)?;
    Ok(UnitType {
        name: item.name.clone(),
        symbols: item.symbols.clone(),
        sense: item.sense,
        sense_expr: item.sense.to_sense_literal(),
        factor_expr: item.expr.clone().unwrap_or_else(|| item.factor.clone()),
        factor,
        family: item.family,
        rated: item.rated,
        origin: Origin::Decompiled { module: module.to_string() },
    })
}

fn scale_type(item: &ScaleItem, module: &str) -> Result<ScaleType, Diagnostic> {
    Ok(ScaleType {
        name: item.name.clone(),
        symbols: item.symbols.clone(),
        reference_point: item.reference_point.clone(),
        unit: item.unit.clone(),
        offset: literal(module, &item.name, &item.offset)?,
        offset_expr: item.offset.clone(),
        family: item.family,
        origin: Origin::Decompiled { module: module.to_string() },
    })
}
