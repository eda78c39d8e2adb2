//! Generator - render the delta of a definition list as module source

use serde::Serialize;
use metrica_lang::{Definitions, Watermark};
use metrica_units::{Module, ModuleError, ModuleItem, ScaleItem, UnitItem};

/// Source handed to a compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSource {
    pub module_name: String,
    /// Module document text
    pub text: String,
    /// Number of units and scales rendered
    pub items: usize,
}

pub struct Generator;

impl Generator {
    /// Render only the entries appended after `mark`
    pub fn generate(defs: &Definitions, mark: Watermark, module_name: &str) -> Result<GeneratedSource, ModuleError> {
        let delta = defs.delta(mark);
        let mut module = Module::new(module_name);

        for unit in delta.units {
            module.items.push(ModuleItem::Unit(UnitItem {
                name: unit.name.clone(),
                symbols: unit.symbols.clone(),
                family: unit.family,
                sense: unit.sense,
                factor: unit.factor.to_literal(),
                rated: unit.rated,
                expr: Some(unit.factor_expr.clone()),
            }));
        }
        for scale in delta.scales {
            module.items.push(ModuleItem::Scale(ScaleItem {
                name: scale.name.clone(),
                symbols: scale.symbols.clone(),
                family: scale.family,
                unit: scale.unit.clone(),
                offset: scale.offset.to_literal(),
                reference_point: scale.reference_point.clone(),
            }));
        }

        let items = module.items.len();
        tracing::debug!(module = module_name, items, "source generated");
        Ok(GeneratedSource {
            module_name: module_name.to_string(),
            text: module.to_json()?,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decompiler;
    use metrica_core::Number;
    use metrica_lang::parse_definitions;
    use metrica_units::builtin::LENGTH_FAMILY;

    #[test]
    fn test_only_delta_is_rendered() {
        let builtin = Module::builtin();
        let mut defs = Decompiler::decompile([&builtin]).unwrap();
        let mark = defs.watermark();
        let outcome = parse_definitions(
            "unit NauticalMile \"nmi\" = 1852 * Meter;\nscale Gas \"°G\" = Kelvin 10;",
            &mut defs,
        );
        assert!(outcome.ok, "{:?}", outcome.diagnostics);

        let source = Generator::generate(&defs, mark, "metrica_nautical").unwrap();
        assert_eq!(source.items, 2);
        let module = Module::from_json(&source.text).unwrap();
        assert_eq!(module.name, "metrica_nautical");
        assert!(module.find("Meter").is_none());

        let Some(ModuleItem::Unit(nmi)) = module.find("NauticalMile") else {
            panic!("NauticalMile missing");
        };
        assert_eq!(nmi.family, LENGTH_FAMILY);
        assert_eq!(Number::from_str(&nmi.factor).unwrap(), Number::from_i64(1852));
        assert_eq!(nmi.expr.as_deref(), Some("1852 * Meter"));

        let Some(ModuleItem::Scale(gas)) = module.find("Gas") else {
            panic!("Gas missing");
        };
        assert_eq!(gas.unit, "Kelvin");
        assert_eq!(Number::from_str(&gas.offset).unwrap(), Number::from_i64(10));
    }

    #[test]
    fn test_empty_delta() {
        let defs = Definitions::new();
        let source = Generator::generate(&defs, defs.watermark(), "empty").unwrap();
        assert_eq!(source.items, 0);
    }
}
