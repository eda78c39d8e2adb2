//! Quantity and level parsing - split text like "10 mm" or "$ 12" into a
//! numeral and a symbol, then read the numeral

use std::fmt;
use thiserror::Error;
use metrica_core::Real;
use crate::numfmt::{parse_number, NumberFormat, NumberStyles};
use crate::{Level, Measure, Quantity, ScaleRef, UnitRef};

/// Where the symbol sits relative to the numeral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Symbol first: "EUR12", "$ 12"
    Prefixed,
    /// Symbol last: "10 mm", "-80 deg.Re"
    Postfixed,
}

/// A matched symbol and the numeral left beside it
#[derive(Debug, Clone)]
pub struct Token<T> {
    pub measure: Measure<T>,
    pub numeral: String,
    pub symbol: String,
}

/// Find the longest candidate symbol at the start (Prefixed) or end
/// (Postfixed) of `input`. Among equally long symbols the earliest
/// candidate wins.
pub fn tokenize<'a, T, I>(input: &str, candidates: I, mode: MatchMode) -> Option<Token<T>>
where
    T: Real,
    I: IntoIterator<Item = &'a Measure<T>>,
{
    let text = input.trim();
    let mut best: Option<(&'a Measure<T>, &'a str)> = None;
    for measure in candidates {
        for symbol in measure.symbols() {
            let hit = match mode {
                MatchMode::Prefixed => text.starts_with(symbol.as_str()),
                MatchMode::Postfixed => text.ends_with(symbol.as_str()),
            };
            if !hit || symbol.is_empty() {
                continue;
            }
            let longer = best.map_or(true, |(_, b)| symbol.chars().count() > b.chars().count());
            if longer {
                best = Some((measure, symbol.as_str()));
            }
        }
    }
    let (measure, symbol) = best?;
    let numeral = match mode {
        MatchMode::Prefixed => &text[symbol.len()..],
        MatchMode::Postfixed => &text[..text.len() - symbol.len()],
    };
    Some(Token {
        measure: measure.clone(),
        numeral: numeral.trim().to_string(),
        symbol: symbol.to_string(),
    })
}

/// Text that could not be read as a value of any allowed measure
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse \"{input}\": {reason} (allowed: {})", .allowed.join(", "))]
pub struct ParseFailure {
    pub input: String,
    pub reason: String,
    pub allowed: Vec<String>,
}

/// A successfully parsed value
#[derive(Debug, Clone)]
pub enum Parsed<T> {
    Quantity(Quantity<T>),
    Level(Level<T>),
}

impl<T: Real> Parsed<T> {
    pub fn value(&self) -> &T {
        match self {
            Parsed::Quantity(q) => &q.value,
            Parsed::Level(l) => &l.value,
        }
    }

    pub fn measure(&self) -> Measure<T> {
        match self {
            Parsed::Quantity(q) => Measure::Unit(q.unit.clone()),
            Parsed::Level(l) => Measure::Scale(l.scale.clone()),
        }
    }
}

impl<T: Real> fmt::Display for Parsed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parsed::Quantity(q) => write!(f, "{}", q),
            Parsed::Level(l) => write!(f, "{}", l),
        }
    }
}

fn failure<T: Real>(input: &str, reason: String, allowed: &[Measure<T>]) -> ParseFailure {
    ParseFailure {
        input: input.to_string(),
        reason,
        allowed: allowed.iter().flat_map(|m| m.symbols().iter().cloned()).collect(),
    }
}

fn read<T: Real>(
    input: &str,
    allowed: &[Measure<T>],
    styles: NumberStyles,
    format: &NumberFormat,
) -> Result<(Measure<T>, T), ParseFailure> {
    let mut reason = "no allowed symbol found".to_string();
    for mode in [MatchMode::Postfixed, MatchMode::Prefixed] {
        let Some(token) = tokenize(input, allowed, mode) else {
            continue;
        };
        match parse_number::<T>(&token.numeral, styles, format) {
            Some(value) => return Ok((token.measure, value)),
            None => {
                reason = format!("invalid numeral \"{}\" before symbol \"{}\"", token.numeral, token.symbol);
            }
        }
    }
    Err(failure(input, reason, allowed))
}

/// Parse a quantity of one of `allowed`
pub fn try_parse_quantity<T: Real>(
    input: &str,
    allowed: &[UnitRef<T>],
    styles: NumberStyles,
    format: &NumberFormat,
) -> Result<Quantity<T>, ParseFailure> {
    let measures: Vec<Measure<T>> = allowed.iter().cloned().map(Measure::Unit).collect();
    match read(input, &measures, styles, format)? {
        (Measure::Unit(unit), value) => Ok(Quantity::new(value, unit)),
        (Measure::Scale(_), _) => Err(failure(input, "not a unit".to_string(), &measures)),
    }
}

/// Parse a level of one of `allowed`
pub fn try_parse_level<T: Real>(
    input: &str,
    allowed: &[ScaleRef<T>],
    styles: NumberStyles,
    format: &NumberFormat,
) -> Result<Level<T>, ParseFailure> {
    let measures: Vec<Measure<T>> = allowed.iter().cloned().map(Measure::Scale).collect();
    match read(input, &measures, styles, format)? {
        (Measure::Scale(scale), value) => Ok(Level::new(value, scale)),
        (Measure::Unit(_), _) => Err(failure(input, "not a scale".to_string(), &measures)),
    }
}

/// Parse a quantity or level of any of `allowed`
pub fn try_parse<T: Real>(
    input: &str,
    allowed: &[Measure<T>],
    styles: NumberStyles,
    format: &NumberFormat,
) -> Result<Parsed<T>, ParseFailure> {
    let (measure, value) = read(input, allowed, styles, format)?;
    Ok(match measure {
        Measure::Unit(unit) => Parsed::Quantity(Quantity::new(value, unit)),
        Measure::Scale(scale) => Parsed::Level(Level::new(value, scale)),
    })
}
