//! Loader configuration

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default prefix of generated module names
pub const DEFAULT_MODULE_PREFIX: &str = "metrica";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Format(#[from] serde_json::Error),
}

/// Which compiler turns generated source into a module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CompilerConfig {
    /// Validate and emit the module in-process
    #[default]
    Manifest,
    /// Run an external toolchain
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Where compiled modules are written; enables the freshness check
    pub cache_dir: Option<PathBuf>,
    pub module_prefix: String,
    pub compiler: CompilerConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            cache_dir: None,
            module_prefix: DEFAULT_MODULE_PREFIX.to_string(),
            compiler: CompilerConfig::Manifest,
        }
    }
}

impl LoaderConfig {
    /// Read `METRICA_CACHE_DIR`, `METRICA_COMPILER` and `METRICA_COMPILER_ARGS`
    pub fn from_env() -> Self {
        let mut config = LoaderConfig::default();
        if let Ok(dir) = env::var("METRICA_CACHE_DIR") {
            if !dir.trim().is_empty() {
                config.cache_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(program) = env::var("METRICA_COMPILER") {
            if !program.trim().is_empty() {
                let args = env::var("METRICA_COMPILER_ARGS")
                    .map(|a| a.split_whitespace().map(String::from).collect())
                    .unwrap_or_default();
                config.compiler = CompilerConfig::Command { program, args };
            }
        }
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }
}
