//! Metrica Runtime - Extend a live catalog with new definitions
//!
//! One extension cycle: decompile the loaded modules, parse the new text
//! on top of them, generate a module for the delta, compile it, and merge
//! it into the catalog. Either the whole delta lands or nothing does.

mod config;
mod decompiler;
mod generator;
mod compiler;
mod loader;

pub use config::{CompilerConfig, ConfigError, LoaderConfig, DEFAULT_MODULE_PREFIX};
pub use decompiler::Decompiler;
pub use generator::{GeneratedSource, Generator};
pub use compiler::{from_config as compiler_from_config, CommandCompiler, CompileFailure, Compiler, ManifestCompiler};
pub use loader::{LoadError, LoadOutcome, LoadReport, LoadStage, LoadedModule, LoaderState, RuntimeLoader};
