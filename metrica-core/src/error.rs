//! Structured diagnostics
//!
//! Failures of the definition pipeline never abort the host. They are
//! collected as values carrying a machine-readable code, a message, and
//! the source position when one is known.

use crate::NumberError;
use serde::{Deserialize, Serialize};

/// Standard diagnostic codes (machine-readable)
pub mod codes {
    pub const LEXICAL_ERROR: &str = "LEXICAL_ERROR";
    pub const GRAMMAR_ERROR: &str = "GRAMMAR_ERROR";
    pub const UNDEFINED_REF: &str = "UNDEFINED_REF";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    pub const DIMENSION_MISMATCH: &str = "DIMENSION_MISMATCH";
    pub const NON_COHERENT: &str = "NON_COHERENT";
    pub const DUPLICATE_SYMBOL: &str = "DUPLICATE_SYMBOL";
    pub const INCOMPATIBLE_FAMILY: &str = "INCOMPATIBLE_FAMILY";
    pub const COMPILE_ERROR: &str = "COMPILE_ERROR";
    pub const LOAD_ERROR: &str = "LOAD_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const PARSE_FAILURE: &str = "PARSE_FAILURE";
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Processing continued, result may be degraded
    Warning,
    /// The current declaration or operation failed
    Error,
    /// The whole extension cycle failed
    Fatal,
}

/// Structured diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Machine-readable code, one of [`codes`]
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Suggestion for fixing the problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// 1-based line in the definitions source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// 1-based column in the definitions source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            line: None,
            column: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set source position
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity != Severity::Warning
    }

    // ========== Common Constructors ==========

    pub fn lexical(details: impl Into<String>) -> Self {
        Self::new(codes::LEXICAL_ERROR, format!("Lexical error: {}", details.into()))
    }

    pub fn grammar(details: impl Into<String>) -> Self {
        Self::new(codes::GRAMMAR_ERROR, format!("Syntax error: {}", details.into()))
    }

    pub fn undefined_ref(name: &str) -> Self {
        Self::new(codes::UNDEFINED_REF, format!("Undefined unit: {}", name))
            .with_suggestion(format!("Declare '{}' first or check spelling", name))
    }

    pub fn duplicate_name(name: &str) -> Self {
        Self::new(codes::DUPLICATE_NAME, format!("Duplicate definition: {}", name))
    }

    pub fn duplicate_symbol(symbol: &str, owner: &str) -> Self {
        Self::new(codes::DUPLICATE_SYMBOL,
            format!("Symbol \"{}\" is already used by {}", symbol, owner))
            .with_suggestion("Choose a different symbol")
    }

    pub fn dimension_mismatch(details: impl Into<String>) -> Self {
        Self::new(codes::DIMENSION_MISMATCH, format!("Dimension mismatch: {}", details.into()))
    }

    pub fn non_coherent(name: &str, magnitude: &str) -> Self {
        Self::new(codes::NON_COHERENT,
            format!("{} starts a new family but its magnitude is {}, not 1", name, magnitude))
            .with_suggestion("Add a 'relative to <Unit>' clause naming a unit of the same dimension")
    }

    pub fn compile(details: impl Into<String>) -> Self {
        Self::new(codes::COMPILE_ERROR, details.into())
            .with_severity(Severity::Fatal)
    }

    pub fn load(details: impl Into<String>) -> Self {
        Self::new(codes::LOAD_ERROR, format!("Load error: {}", details.into()))
            .with_severity(Severity::Fatal)
    }

    pub fn io(details: impl Into<String>) -> Self {
        Self::new(codes::IO_ERROR, format!("I/O error: {}", details.into()))
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "({},{}) ", line, column)?;
        }
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<NumberError> for Diagnostic {
    fn from(err: NumberError) -> Self {
        Self::grammar(err.to_string())
    }
}
