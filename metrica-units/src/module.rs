//! Compiled module format
//!
//! A module is the loadable unit produced by the compiler: a named list of
//! unit and scale records. Factors and offsets travel as exact decimal
//! literals so every numeric representation can rebuild them.

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::{Dimension, FamilyId, MeasureKind};

/// Current module format version
pub const MODULE_FORMAT: u32 = 1;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("cannot access module {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed module: {0}")]
    Format(#[from] serde_json::Error),
}

/// Unit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitItem {
    pub name: String,
    pub symbols: Vec<String>,
    pub family: FamilyId,
    pub sense: Dimension,
    /// Size in units of the family primary, decimal literal
    pub factor: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rated: bool,
    /// Defining expression, kept for documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

/// Scale record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleItem {
    pub name: String,
    pub symbols: Vec<String>,
    pub family: FamilyId,
    /// Name of the underlying unit
    pub unit: String,
    /// Decimal literal, in the underlying unit
    pub offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<String>,
}

/// Exported measure of a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModuleItem {
    Unit(UnitItem),
    Scale(ScaleItem),
}

impl ModuleItem {
    pub fn name(&self) -> &str {
        match self {
            ModuleItem::Unit(u) => &u.name,
            ModuleItem::Scale(s) => &s.name,
        }
    }

    pub fn symbols(&self) -> &[String] {
        match self {
            ModuleItem::Unit(u) => &u.symbols,
            ModuleItem::Scale(s) => &s.symbols,
        }
    }

    pub fn family(&self) -> FamilyId {
        match self {
            ModuleItem::Unit(u) => u.family,
            ModuleItem::Scale(s) => s.family,
        }
    }

    pub fn kind(&self) -> MeasureKind {
        match self {
            ModuleItem::Unit(_) => MeasureKind::Unit,
            ModuleItem::Scale(_) => MeasureKind::Scale,
        }
    }
}

/// A loadable collection of measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default = "default_format")]
    pub format: u32,
    pub items: Vec<ModuleItem>,
}

fn default_format() -> u32 {
    MODULE_FORMAT
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_string(),
            format: MODULE_FORMAT,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: ModuleItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitItem> + '_ {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Unit(u) => Some(u),
            ModuleItem::Scale(_) => None,
        })
    }

    pub fn scales(&self) -> impl Iterator<Item = &ScaleItem> + '_ {
        self.items.iter().filter_map(|i| match i {
            ModuleItem::Scale(s) => Some(s),
            ModuleItem::Unit(_) => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<&ModuleItem> {
        self.items.iter().find(|i| i.name() == name)
    }

    /// Highest family id used by this module (0 when empty)
    pub fn max_family(&self) -> FamilyId {
        self.items.iter().map(|i| i.family()).max().unwrap_or(0)
    }

    pub fn from_json(text: &str) -> Result<Self, ModuleError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        let text = fs::read_to_string(path).map_err(|source| ModuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModuleError> {
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| ModuleError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Module {
        Module::new("sample")
            .with_item(ModuleItem::Unit(UnitItem {
                name: "Meter".to_string(),
                symbols: vec!["m".to_string()],
                family: 1,
                sense: Dimension::LENGTH,
                factor: "1".to_string(),
                rated: false,
                expr: Some("<Length>".to_string()),
            }))
            .with_item(ModuleItem::Scale(ScaleItem {
                name: "Ground".to_string(),
                symbols: vec!["m.agl".to_string()],
                family: 7,
                unit: "Meter".to_string(),
                offset: "0".to_string(),
                reference_point: None,
            }))
    }

    #[test]
    fn test_queries() {
        let m = sample();
        assert_eq!(m.units().count(), 1);
        assert_eq!(m.scales().count(), 1);
        assert_eq!(m.max_family(), 7);
        assert_eq!(m.find("Ground").map(|i| i.kind()), Some(MeasureKind::Scale));
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"kind\": \"unit\""));
        assert!(!json.contains("rated"));
        let back = Module::from_json(&json).unwrap();
        assert_eq!(back.items.len(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.module.json");
        sample().save(&path).unwrap();
        assert_eq!(Module::load(&path).unwrap().name, "sample");
        assert!(matches!(Module::load(&dir.path().join("missing.json")), Err(ModuleError::Io { .. })));
    }
}
