//! Metrica Lang - The definition language
//!
//! ```text
//! unit NauticalMile "nmi" = 1852 * Meter;
//! rated unit Zloty "PLN" = 0.235 * EUR;
//! scale Celsius AbsoluteZero "°C" "deg.C" = DegCelsius 273.15;
//! ```
//!
//! [`parse_definitions`] appends declarations to a [`Definitions`] list,
//! resolving names against entries already in it.

mod lexer;
mod ast;
mod parser;

pub use lexer::{LexReport, Lexer, Token, TokenKind};
pub use ast::{Definitions, Delta, FamilyLink, Origin, ScaleType, UnitType, Watermark};
pub use parser::{parse_definitions, parse_definitions_with, ParseOutcome};
