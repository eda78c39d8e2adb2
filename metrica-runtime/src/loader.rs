//! Runtime loader - one extension cycle per call
//!
//! ```text
//! Idle -> Decompiling -> Parsing -> NoDelta -> Done
//!                                -> Generating -> Compiling -> Loading -> Merging -> Done
//! ```
//! Any failure ends in `Done` with the catalog and the module list exactly
//! as they were before the call.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use serde::Serialize;
use thiserror::Error;
use metrica_core::{codes, Diagnostic, Real};
use metrica_lang::parse_definitions;
use metrica_units::{Catalog, CatalogError, Module};
use crate::compiler::{self, Compiler};
use crate::config::LoaderConfig;
use crate::{Decompiler, Generator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderState {
    Idle,
    Decompiling,
    Parsing,
    Generating,
    Compiling,
    Loading,
    Merging,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    /// Nothing new to add
    NoDelta,
    /// A module was generated, compiled and merged
    Compiled,
    /// A fresh compiled module was merged without recompiling
    Cached,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub outcome: LoadOutcome,
    /// Name of the merged module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Catalog entries appended
    pub added: usize,
    /// Non-fatal diagnostics (warnings)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

/// Stage an extension cycle failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStage {
    Read,
    Decompile,
    Parse,
    Generate,
    Compile,
    Load,
    Merge,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Read => "read",
            LoadStage::Decompile => "decompile",
            LoadStage::Parse => "parse",
            LoadStage::Generate => "generate",
            LoadStage::Compile => "compile",
            LoadStage::Load => "load",
            LoadStage::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("extension failed at {stage} with {} diagnostic(s)", .diagnostics.len())]
pub struct LoadError {
    pub stage: LoadStage,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadError {
    fn new(stage: LoadStage, diagnostic: Diagnostic) -> Self {
        LoadError { stage, diagnostics: vec![diagnostic] }
    }
}

/// A module merged into the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub module: Module,
    /// `None` for modules that only ever lived in memory
    pub location: Option<PathBuf>,
}

pub struct RuntimeLoader {
    config: LoaderConfig,
    compiler: Box<dyn Compiler>,
    modules: Vec<LoadedModule>,
    state: LoaderState,
    inline_count: usize,
}

impl RuntimeLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let compiler = compiler::from_config(&config.compiler);
        Self::with_compiler(config, compiler)
    }

    pub fn with_compiler(config: LoaderConfig, compiler: Box<dyn Compiler>) -> Self {
        RuntimeLoader {
            config,
            compiler,
            modules: Vec::new(),
            state: LoaderState::Idle,
            inline_count: 0,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    fn enter(&mut self, state: LoaderState) {
        tracing::debug!(from = ?self.state, to = ?state, "loader state");
        self.state = state;
    }

    fn fail(&mut self, error: LoadError) -> LoadError {
        self.enter(LoaderState::Done);
        tracing::warn!(stage = %error.stage, diagnostics = error.diagnostics.len(), "extension cycle failed");
        error
    }

    /// Merge an already compiled module and remember it for later cycles
    pub fn install<T: Real>(
        &mut self,
        catalog: &mut Catalog<T>,
        module: Module,
        location: Option<PathBuf>,
    ) -> Result<usize, LoadError> {
        let added = catalog.merge(&module).map_err(merge_error)?;
        self.modules.push(LoadedModule { module, location });
        Ok(added)
    }

    /// Extend the catalog with the definitions in `path`
    pub fn load_file<T: Real>(&mut self, catalog: &mut Catalog<T>, path: &Path) -> Result<LoadReport, LoadError> {
        self.enter(LoaderState::Idle);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let d = Diagnostic::io(format!("cannot read {}: {}", path.display(), e));
                return Err(self.fail(LoadError::new(LoadStage::Read, d)));
            }
        };

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("definitions");
        let module_name = format!("{}_{}", self.config.module_prefix, sanitize(stem));
        let Some(cache_dir) = self.config.cache_dir.clone() else {
            return self.run_cycle(catalog, &text, &module_name, None);
        };
        let cached = cache_dir.join(format!("{}.module.json", module_name));

        let fresh = is_fresh(&cached, path);
        if self.is_loaded(&cached) {
            if fresh {
                tracing::debug!(module = %module_name, "module already loaded");
                self.enter(LoaderState::Done);
                return Ok(LoadReport {
                    outcome: LoadOutcome::NoDelta,
                    module: None,
                    added: 0,
                    warnings: Vec::new(),
                });
            }
            // Edited since it was loaded: compile what is new into the next generation
            let (name, output) = self.next_generation(&cache_dir, &module_name);
            return self.run_cycle(catalog, &text, &name, Some(output));
        }

        if fresh {
            match self.load_cached(catalog, &cached) {
                Ok(report) => return Ok(report),
                Err(e) if e.stage == LoadStage::Load => {
                    tracing::warn!(path = %cached.display(), "stale or unreadable cached module, recompiling");
                }
                Err(e) => return Err(e),
            }
        }

        self.run_cycle(catalog, &text, &module_name, Some(cached))
    }

    fn is_loaded(&self, location: &Path) -> bool {
        self.modules.iter().any(|m| m.location.as_deref() == Some(location))
    }

    /// First `<name>_<n>` whose module file is not loaded yet
    fn next_generation(&self, cache_dir: &Path, module_name: &str) -> (String, PathBuf) {
        let mut generation = 2;
        loop {
            let name = format!("{}_{}", module_name, generation);
            let output = cache_dir.join(format!("{}.module.json", name));
            if !self.is_loaded(&output) {
                return (name, output);
            }
            generation += 1;
        }
    }

    /// Extend the catalog with in-memory definitions
    pub fn load_str<T: Real>(&mut self, catalog: &mut Catalog<T>, text: &str) -> Result<LoadReport, LoadError> {
        self.enter(LoaderState::Idle);
        self.inline_count += 1;
        let module_name = format!("{}_inline_{}", self.config.module_prefix, self.inline_count);
        self.run_cycle(catalog, text, &module_name, None)
    }

    fn load_cached<T: Real>(&mut self, catalog: &mut Catalog<T>, cached: &Path) -> Result<LoadReport, LoadError> {
        self.enter(LoaderState::Loading);
        let module = Module::load(cached)
            .map_err(|e| LoadError::new(LoadStage::Load, Diagnostic::load(e.to_string())))?;
        self.enter(LoaderState::Merging);
        let name = module.name.clone();
        match self.install(catalog, module, Some(cached.to_path_buf())) {
            Ok(added) => {
                self.enter(LoaderState::Done);
                tracing::info!(module = %name, added, "cached module merged");
                Ok(LoadReport {
                    outcome: LoadOutcome::Cached,
                    module: Some(name),
                    added,
                    warnings: Vec::new(),
                })
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn references(&self) -> Vec<PathBuf> {
        let mut refs: Vec<PathBuf> = Vec::new();
        for path in self.modules.iter().filter_map(|m| m.location.as_ref()) {
            if !refs.contains(path) {
                refs.push(path.clone());
            }
        }
        refs
    }

    fn run_cycle<T: Real>(
        &mut self,
        catalog: &mut Catalog<T>,
        text: &str,
        module_name: &str,
        output: Option<PathBuf>,
    ) -> Result<LoadReport, LoadError> {
        self.enter(LoaderState::Decompiling);
        let mut defs = match Decompiler::decompile(self.modules.iter().map(|m| &m.module)) {
            Ok(defs) => defs,
            Err(d) => return Err(self.fail(LoadError::new(LoadStage::Decompile, d))),
        };
        // Entries added to the catalog directly still own their family ids
        defs.note_family(catalog.max_family());
        let mark = defs.watermark();

        self.enter(LoaderState::Parsing);
        let outcome = parse_definitions(text, &mut defs);
        if !outcome.ok {
            return Err(self.fail(LoadError { stage: LoadStage::Parse, diagnostics: outcome.diagnostics }));
        }
        let warnings = outcome.diagnostics;

        if defs.delta(mark).is_empty() {
            self.enter(LoaderState::Done);
            tracing::info!(module = module_name, "no new definitions");
            return Ok(LoadReport { outcome: LoadOutcome::NoDelta, module: None, added: 0, warnings });
        }

        self.enter(LoaderState::Generating);
        let source = match Generator::generate(&defs, mark, module_name) {
            Ok(source) => source,
            Err(e) => return Err(self.fail(LoadError::new(LoadStage::Generate, Diagnostic::compile(e.to_string())))),
        };

        self.enter(LoaderState::Compiling);
        let references = self.references();
        let module = match self.compiler.compile(&source, &references, output.as_deref()) {
            Ok(module) => module,
            Err(failure) => {
                return Err(self.fail(LoadError { stage: LoadStage::Compile, diagnostics: failure.diagnostics }));
            }
        };

        self.enter(LoaderState::Loading);
        let name = module.name.clone();

        self.enter(LoaderState::Merging);
        match self.install(catalog, module, output.clone()) {
            Ok(added) => {
                self.enter(LoaderState::Done);
                tracing::info!(module = %name, added, "extension cycle complete");
                Ok(LoadReport { outcome: LoadOutcome::Compiled, module: Some(name), added, warnings })
            }
            Err(e) => {
                if let Some(path) = &output {
                    if let Err(io) = fs::remove_file(path) {
                        tracing::warn!(path = %path.display(), error = %io, "cannot remove rejected module");
                    }
                }
                Err(self.fail(e))
            }
        }
    }
}

fn merge_error(e: CatalogError) -> LoadError {
    let d = match &e {
        CatalogError::DuplicateSymbol { .. } => Diagnostic::new(codes::DUPLICATE_SYMBOL, e.to_string()),
        _ => Diagnostic::load(e.to_string()),
    };
    LoadError::new(LoadStage::Merge, d)
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Compiled module exists and is not older than its source
fn is_fresh(compiled: &Path, source: &Path) -> bool {
    match (modified(compiled), modified(source)) {
        (Some(c), Some(s)) => c >= s,
        _ => false,
    }
}
