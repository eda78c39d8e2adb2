//! Compilers turn generated source into a loadable module
//!
//! A compiler never touches the catalog; merging is the loader's job.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use metrica_core::{Diagnostic, Number};
use metrica_units::{FamilyId, MeasureKind, Module, ModuleItem};
use crate::config::CompilerConfig;
use crate::GeneratedSource;

/// Rejected source, with the compiler's diagnostics
#[derive(Debug, Clone, PartialEq, Error)]
#[error("compilation failed with {} diagnostic(s)", .diagnostics.len())]
pub struct CompileFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    fn single(message: impl Into<String>) -> Self {
        CompileFailure { diagnostics: vec![Diagnostic::compile(message)] }
    }
}

pub trait Compiler: Send + Sync {
    /// Compile `source` against the modules at `references`, writing the
    /// result to `output` when one is given.
    fn compile(
        &self,
        source: &GeneratedSource,
        references: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<Module, CompileFailure>;
}

/// Build the compiler a configuration asks for
pub fn from_config(config: &CompilerConfig) -> Box<dyn Compiler> {
    match config {
        CompilerConfig::Manifest => Box::new(ManifestCompiler),
        CompilerConfig::Command { program, args } => Box::new(CommandCompiler::new(program, args.clone())),
    }
}

/// In-process compiler: validates the module document and emits it as is
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestCompiler;

impl ManifestCompiler {
    fn validate(module: &Module, references: &[Module]) -> Vec<Diagnostic> {
        let mut errors = Vec::new();

        let mut ref_names: HashMap<&str, &str> = HashMap::new();
        let mut ref_families: HashMap<FamilyId, MeasureKind> = HashMap::new();
        for r in references {
            for item in &r.items {
                ref_names.insert(item.name(), &r.name);
                ref_families.entry(item.family()).or_insert(item.kind());
            }
        }

        let local_units: HashSet<&str> = module.units().map(|u| u.name.as_str()).collect();
        let mut names: HashSet<&str> = HashSet::new();
        let mut symbols: HashSet<&str> = HashSet::new();

        for item in &module.items {
            let name = item.name();
            if name.trim().is_empty() {
                errors.push(Diagnostic::compile("item without a name"));
                continue;
            }
            if !names.insert(name) {
                errors.push(Diagnostic::compile(format!("{} is defined twice", name)));
            }
            if let Some(owner) = ref_names.get(name) {
                errors.push(Diagnostic::compile(format!("{} is already defined by module {}", name, owner)));
            }
            if item.symbols().is_empty() {
                errors.push(Diagnostic::compile(format!("{} has no symbol", name)));
            }
            for symbol in item.symbols() {
                if symbol.trim().is_empty() {
                    errors.push(Diagnostic::compile(format!("{} has an empty symbol", name)));
                } else if !symbols.insert(symbol) {
                    errors.push(Diagnostic::compile(format!("symbol \"{}\" of {} is used twice", symbol, name)));
                }
            }
            if let Some(kind) = ref_families.get(&item.family()) {
                if *kind != item.kind() {
                    errors.push(Diagnostic::compile(format!(
                        "{} reuses family {} of a referenced {:?} family",
                        name, item.family(), kind
                    )));
                }
            }

            match item {
                ModuleItem::Unit(u) => match Number::from_str(&u.factor) {
                    Ok(f) if f.is_zero() => {
                        errors.push(Diagnostic::compile(format!("{} has a zero factor", name)));
                    }
                    Ok(_) => {}
                    Err(_) => {
                        errors.push(Diagnostic::compile(format!("{} has a non-decimal factor \"{}\"", name, u.factor)));
                    }
                },
                ModuleItem::Scale(s) => {
                    if Number::from_str(&s.offset).is_err() {
                        errors.push(Diagnostic::compile(format!("{} has a non-decimal offset \"{}\"", name, s.offset)));
                    }
                    let known = local_units.contains(s.unit.as_str())
                        || references.iter().any(|r| r.units().any(|u| u.name == s.unit));
                    if !known {
                        errors.push(Diagnostic::compile(format!("{} rides on unknown unit {}", name, s.unit)));
                    }
                }
            }
        }
        errors
    }
}

impl Compiler for ManifestCompiler {
    fn compile(
        &self,
        source: &GeneratedSource,
        references: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<Module, CompileFailure> {
        let module = Module::from_json(&source.text)
            .map_err(|e| CompileFailure::single(format!("{}: {}", source.module_name, e)))?;

        let mut loaded = Vec::with_capacity(references.len());
        for path in references {
            let r = Module::load(path)
                .map_err(|e| CompileFailure::single(format!("cannot read reference: {}", e)))?;
            loaded.push(r);
        }

        let errors = Self::validate(&module, &loaded);
        if !errors.is_empty() {
            return Err(CompileFailure { diagnostics: errors });
        }

        if let Some(path) = output {
            module.save(path).map_err(|e| CompileFailure::single(e.to_string()))?;
        }
        tracing::debug!(module = %module.name, items = module.items.len(), "module compiled");
        Ok(module)
    }
}

/// Runs an external toolchain:
/// `program [args..] <source> <output> [--extern <reference>]..`
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        CommandCompiler { program: program.to_string(), args }
    }
}

impl Compiler for CommandCompiler {
    fn compile(
        &self,
        source: &GeneratedSource,
        references: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<Module, CompileFailure> {
        let scratch;
        let output = match output {
            Some(p) => p.to_path_buf(),
            None => {
                scratch = tempfile::tempdir()
                    .map_err(|e| CompileFailure::single(format!("cannot create a scratch directory: {}", e)))?;
                scratch.path().join(format!("{}.module.json", source.module_name))
            }
        };
        let source_path = output.with_extension("src.json");
        fs::write(&source_path, &source.text)
            .map_err(|e| CompileFailure::single(format!("cannot write {}: {}", source_path.display(), e)))?;

        let result = self.run(&source_path, &output, references);
        if let Err(e) = fs::remove_file(&source_path) {
            tracing::warn!(path = %source_path.display(), error = %e, "cannot remove compiler source");
        }
        result
    }
}

impl CommandCompiler {
    fn run(&self, source_path: &Path, output: &Path, references: &[PathBuf]) -> Result<Module, CompileFailure> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(source_path).arg(output);
        for r in references {
            command.arg("--extern").arg(r);
        }
        tracing::debug!(program = %self.program, source = %source_path.display(), "running compiler");

        let result = command.output()
            .map_err(|e| CompileFailure::single(format!("cannot run {}: {}", self.program, e)))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let mut diagnostics: Vec<Diagnostic> = stderr.lines()
                .filter(|l| !l.trim().is_empty())
                .map(Diagnostic::compile)
                .collect();
            if diagnostics.is_empty() {
                diagnostics.push(Diagnostic::compile(format!("{} exited with {}", self.program, result.status)));
            }
            return Err(CompileFailure { diagnostics });
        }

        Module::load(output).map_err(|e| CompileFailure::single(e.to_string()))
    }
}
