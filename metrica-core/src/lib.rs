//! Metrica Core - Fundamental types
//!
//! This crate provides the core types used throughout Metrica:
//! - `Number`: Arbitrary precision decimal numbers
//! - `Real`: The numeric representation a catalog is instantiated for
//! - `Diagnostic`: Structured, serializable error records

mod number;
mod real;
mod error;

pub use number::{Number, NumberError};
pub use real::Real;
pub use error::{Diagnostic, Severity, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Number, Real, Diagnostic, Severity};
    pub use crate::error::codes;
}
