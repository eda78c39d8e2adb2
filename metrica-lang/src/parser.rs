//! Recursive-descent parser for unit and scale declarations
//!
//! Declarations are evaluated as they are parsed, in [`Number`], against
//! the [`Definitions`] being extended. A failing declaration is dropped and
//! parsing resumes after the next `;` or at the next declaration keyword.

use serde::Serialize;
use metrica_core::{Diagnostic, Number, Severity};
use metrica_units::{Dimension, FamilyId, Magnitude};
use crate::ast::{Definitions, Origin, ScaleType, UnitType};
use crate::lexer::{LexReport, Lexer, Token, TokenKind};

/// Digits a derived magnitude may deviate from 1 and still count as coherent
const COHERENCE_DIGITS: i32 = 30;

/// Largest exponent magnitude accepted after `^`
pub const MAX_EXPONENT: i32 = 64;

/// Result of one parse pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    /// No lexical, grammar or semantic error was found
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse `text` and append its declarations to `defs`
pub fn parse_definitions(text: &str, defs: &mut Definitions) -> ParseOutcome {
    parse_definitions_with(text, defs, &mut |_| {})
}

/// Like [`parse_definitions`], also handing every lexer report to `observer`
pub fn parse_definitions_with(
    text: &str,
    defs: &mut Definitions,
    observer: &mut dyn FnMut(&LexReport),
) -> ParseOutcome {
    let mut diagnostics = Vec::new();
    let tokens = {
        let mut sink = |report: &LexReport| {
            observer(report);
            diagnostics.push(lex_diagnostic(report));
        };
        Lexer::new(text, &mut sink).tokenize()
    };

    let mut parser = Parser { tokens, pos: 0, defs, diagnostics };
    parser.parse_file();

    let ok = !parser.diagnostics.iter().any(|d| d.is_error());
    tracing::debug!(ok, diagnostics = parser.diagnostics.len(), "definitions parsed");
    ParseOutcome { ok, diagnostics: parser.diagnostics }
}

fn lex_diagnostic(report: &LexReport) -> Diagnostic {
    let d = Diagnostic::lexical(format!("{} near '{}'", report.message, report.token))
        .at(report.line, report.column);
    if report.is_error {
        d
    } else {
        d.with_severity(Severity::Warning)
    }
}

/// `None` marks a failure the lexer has already reported
type PResult<T> = Result<T, Option<Diagnostic>>;

/// Evaluated unit expression
#[derive(Debug, Clone)]
struct UnitValue {
    sense: Dimension,
    magnitude: Number,
    /// Referenced units with their net exponents, one entry per occurrence
    refs: Vec<(String, i32)>,
    has_sense: bool,
}

impl UnitValue {
    fn scalar(magnitude: Number) -> Self {
        UnitValue {
            sense: Dimension::DIMENSIONLESS,
            magnitude,
            refs: Vec::new(),
            has_sense: false,
        }
    }

    fn multiply(mut self, other: UnitValue) -> Result<Self, String> {
        self.sense = self.sense.checked_multiply(&other.sense).ok_or_else(exponent_overflow)?;
        self.magnitude = self.magnitude.mul(&other.magnitude);
        self.refs.extend(other.refs);
        self.has_sense |= other.has_sense;
        Ok(self)
    }

    fn divide(mut self, other: UnitValue) -> Result<Self, String> {
        self.sense = self.sense.checked_divide(&other.sense).ok_or_else(exponent_overflow)?;
        self.magnitude = self.magnitude.checked_div(&other.magnitude).map_err(|e| e.to_string())?;
        self.refs.extend(other.refs.into_iter().map(|(n, e)| (n, -e)));
        self.has_sense |= other.has_sense;
        Ok(self)
    }

    fn power(mut self, exp: i32) -> Result<Self, String> {
        self.sense = self.sense.checked_power(exp).ok_or_else(exponent_overflow)?;
        self.magnitude = self.magnitude.pow(exp).map_err(|e| e.to_string())?;
        for r in &mut self.refs {
            r.1 = r.1.checked_mul(exp).ok_or_else(exponent_overflow)?;
        }
        Ok(self)
    }
}

fn exponent_overflow() -> String {
    "dimension exponent out of range".to_string()
}

enum FamilyChoice {
    Existing(FamilyId),
    Fresh,
}

struct Parser<'d> {
    tokens: Vec<Token>,
    pos: usize,
    defs: &'d mut Definitions,
    diagnostics: Vec<Diagnostic>,
}

impl Parser<'_> {
    // ========== Token helpers ==========

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self, expected: &str) -> Option<Diagnostic> {
        let tok = self.peek();
        if let TokenKind::Invalid(_) = tok.kind {
            return None;
        }
        Some(Diagnostic::grammar(format!("expected {}, found {}", expected, tok.kind)).at(tok.line, tok.column))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
        if self.at(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> PResult<Token> {
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn text_since(&self, start: usize) -> String {
        self.tokens[start..self.pos].iter()
            .map(|t| t.raw.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn report(&mut self, error: Option<Diagnostic>) {
        if let Some(d) = error {
            tracing::debug!(code = %d.code, "{}", d.message);
            self.diagnostics.push(d);
        }
    }

    /// Skip past the next `;`, or up to the next declaration keyword
    fn recover(&mut self) {
        loop {
            let kind = &self.peek().kind;
            if *kind == TokenKind::Eof || kind.is_decl_start() {
                return;
            }
            let at_semicolon = *kind == TokenKind::Semicolon;
            self.advance();
            if at_semicolon {
                return;
            }
        }
    }

    // ========== Declarations ==========

    fn parse_file(&mut self) {
        loop {
            let result = if self.at(&TokenKind::Eof) {
                return;
            } else if self.at(&TokenKind::KwUnit) || self.at(&TokenKind::KwRated) {
                self.parse_unit_decl()
            } else if self.at(&TokenKind::KwScale) {
                self.parse_scale_decl()
            } else {
                Err(self.unexpected("'unit' or 'scale'"))
            };
            if let Err(error) = result {
                self.report(error);
                self.recover();
            }
        }
    }

    fn parse_symbols(&mut self) -> PResult<Vec<String>> {
        let first = self.peek().clone();
        let mut symbols: Vec<String> = Vec::new();
        let mut seen_string = false;
        while let TokenKind::Str(s) = &self.peek().kind {
            let s = s.trim().to_string();
            seen_string = true;
            self.advance();
            if !s.is_empty() && !symbols.contains(&s) {
                symbols.push(s);
            }
        }
        if !seen_string {
            return Err(self.unexpected("a quoted symbol"));
        }
        if symbols.is_empty() {
            return Err(Some(Diagnostic::grammar("at least one non-empty symbol is required")
                .at(first.line, first.column)));
        }
        Ok(symbols)
    }

    fn parse_unit_decl(&mut self) -> PResult<()> {
        let start = self.peek().clone();
        let rated = if self.at(&TokenKind::KwRated) {
            self.advance();
            true
        } else {
            false
        };
        self.expect(TokenKind::KwUnit, "'unit'")?;
        let name = self.expect_ident("a unit name")?;
        let annotated = if self.at(&TokenKind::Lt) {
            Some(self.parse_sense()?)
        } else {
            None
        };
        let symbols = self.parse_symbols()?;
        self.expect(TokenKind::Equals, "'='")?;
        let expr_start = self.pos;
        let value = self.parse_unit_expr()?;
        let factor_expr = self.text_since(expr_start);
        let relative = if self.at(&TokenKind::KwRelative) {
            self.advance();
            self.expect(TokenKind::KwTo, "'to'")?;
            Some(self.expect_ident("a unit name")?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let name_str = ident_text(&name);
        if let Some(sense) = annotated {
            if sense != value.sense {
                return Err(Some(Diagnostic::dimension_mismatch(format!(
                    "{} is declared {} but its expression is {}",
                    name_str, sense.to_sense_literal(), value.sense.to_sense_literal()
                )).at(name.line, name.column)));
            }
        }

        let (family, factor) = self.choose_unit_family(&name, &value, relative.as_ref())?;

        if let Some(existing) = self.defs.unit(&name_str) {
            let same = existing.origin.is_decompiled()
                && existing.symbols == symbols
                && existing.sense == value.sense
                && existing.rated == rated
                && existing.factor.approx_eq(&factor, COHERENCE_DIGITS)
                && match family {
                    FamilyChoice::Existing(id) => id == existing.family,
                    FamilyChoice::Fresh => self.defs.families()
                        .get(&existing.family)
                        .map_or(false, |l| l.primary == existing.name),
                };
            if same {
                tracing::debug!(name = %name_str, "redeclaration of a loaded unit skipped");
                return Ok(());
            }
        }
        self.check_unique(&name, &symbols)?;

        let family = match family {
            FamilyChoice::Existing(id) => id,
            FamilyChoice::Fresh => self.fresh_family(&name)?,
        };
        tracing::debug!(name = %name_str, family, factor = %factor, "unit defined");
        self.defs.add_unit(UnitType {
            name: name_str,
            symbols,
            sense: value.sense,
            sense_expr: value.sense.to_sense_literal(),
            factor,
            factor_expr,
            family,
            rated,
            origin: Origin::Parsed { line: start.line },
        });
        Ok(())
    }

    fn choose_unit_family(
        &self,
        name: &Token,
        value: &UnitValue,
        relative: Option<&Token>,
    ) -> PResult<(FamilyChoice, Number)> {
        if let Some(target) = relative {
            let target_name = ident_text(target);
            let Some(unit) = self.defs.unit(&target_name) else {
                return Err(Some(Diagnostic::undefined_ref(&target_name).at(target.line, target.column)));
            };
            if unit.sense != value.sense {
                return Err(Some(Diagnostic::dimension_mismatch(format!(
                    "{} is {} but {} is {}",
                    ident_text(name), value.sense.to_sense_literal(), unit.name, unit.sense.to_sense_literal()
                )).at(target.line, target.column)));
            }
            return Ok((FamilyChoice::Existing(unit.family), value.magnitude.clone()));
        }

        if let [(single, 1)] = value.refs.as_slice() {
            if !value.has_sense {
                if let Some(unit) = self.defs.unit(single) {
                    return Ok((FamilyChoice::Existing(unit.family), value.magnitude.clone()));
                }
            }
        }

        let one = Number::from_i64(1);
        if !value.magnitude.approx_eq(&one, COHERENCE_DIGITS) {
            return Err(Some(Diagnostic::non_coherent(&ident_text(name), &value.magnitude.to_literal())
                .at(name.line, name.column)));
        }
        Ok((FamilyChoice::Fresh, one))
    }

    fn fresh_family(&mut self, name: &Token) -> PResult<FamilyId> {
        self.defs.next_family_id().ok_or_else(|| {
            Some(Diagnostic::grammar(format!("no family id left for {}", ident_text(name)))
                .at(name.line, name.column))
        })
    }

    fn check_unique(&self, name: &Token, symbols: &[String]) -> PResult<()> {
        let name_str = ident_text(name);
        if self.defs.contains_name(&name_str) {
            return Err(Some(Diagnostic::duplicate_name(&name_str).at(name.line, name.column)));
        }
        for symbol in symbols {
            if let Some(owner) = self.defs.symbol_owner(symbol) {
                return Err(Some(Diagnostic::duplicate_symbol(symbol, owner).at(name.line, name.column)));
            }
        }
        Ok(())
    }

    fn parse_scale_decl(&mut self) -> PResult<()> {
        let start = self.expect(TokenKind::KwScale, "'scale'")?;
        let name = self.expect_ident("a scale name")?;
        let reference_point = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Some(ident_text(&self.advance()))
        } else {
            None
        };
        let symbols = self.parse_symbols()?;
        self.expect(TokenKind::Equals, "'='")?;
        let unit_tok = self.expect_ident("a unit name")?;
        let (offset, offset_expr) = if self.at(&TokenKind::Semicolon) {
            (Number::from_i64(0), "0".to_string())
        } else {
            let expr_start = self.pos;
            let offset = self.parse_num_expr()?;
            (offset, self.text_since(expr_start))
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let name_str = ident_text(&name);
        let unit_name = ident_text(&unit_tok);
        let Some(unit) = self.defs.unit(&unit_name) else {
            return Err(Some(Diagnostic::undefined_ref(&unit_name).at(unit_tok.line, unit_tok.column)));
        };
        let unit_family = unit.family;

        if let Some(existing) = self.defs.scale(&name_str) {
            if existing.origin.is_decompiled()
                && existing.symbols == symbols
                && existing.unit == unit_name
                && existing.reference_point == reference_point
                && existing.offset.approx_eq(&offset, COHERENCE_DIGITS)
            {
                tracing::debug!(name = %name_str, "redeclaration of a loaded scale skipped");
                return Ok(());
            }
        }
        self.check_unique(&name, &symbols)?;

        let family = match self.defs.scale_family(unit_family, reference_point.as_deref()) {
            Some(id) => id,
            None => self.fresh_family(&name)?,
        };
        tracing::debug!(name = %name_str, family, offset = %offset, "scale defined");
        self.defs.add_scale(ScaleType {
            name: name_str,
            symbols,
            reference_point,
            unit: unit_name,
            offset,
            offset_expr,
            family,
            origin: Origin::Parsed { line: start.line },
        });
        Ok(())
    }

    // ========== Sense expressions ==========

    fn parse_sense(&mut self) -> PResult<Dimension> {
        self.expect(TokenKind::Lt, "'<'")?;
        if self.at(&TokenKind::Gt) {
            self.advance();
            return Ok(Dimension::DIMENSIONLESS);
        }
        let mut dim = self.parse_dim_pow()?;
        loop {
            if self.at(&TokenKind::Star) {
                let op = self.advance();
                let rhs = self.parse_dim_pow()?;
                dim = dim.checked_multiply(&rhs).ok_or_else(|| arithmetic_error(&op, exponent_overflow()))?;
            } else if self.at(&TokenKind::Slash) {
                let op = self.advance();
                let rhs = self.parse_dim_pow()?;
                dim = dim.checked_divide(&rhs).ok_or_else(|| arithmetic_error(&op, exponent_overflow()))?;
            } else {
                break;
            }
        }
        self.expect(TokenKind::Gt, "'>'")?;
        Ok(dim)
    }

    fn parse_dim_pow(&mut self) -> PResult<Dimension> {
        let tok = self.expect_ident("a magnitude name")?;
        let name = ident_text(&tok);
        let Some(magnitude) = Magnitude::from_name(&name) else {
            return Err(Some(Diagnostic::grammar(format!("unknown magnitude '{}'", name))
                .with_suggestion("Use Length, Time, Mass, Temperature, ElectricCurrent, \
                    AmountOfSubstance, LuminousIntensity or Other")
                .at(tok.line, tok.column)));
        };
        let dim = Dimension::of(magnitude);
        if self.at(&TokenKind::Caret) {
            let op = self.advance();
            let exp = self.parse_exponent()?;
            return dim.checked_power(exp).ok_or_else(|| arithmetic_error(&op, exponent_overflow()));
        }
        Ok(dim)
    }

    fn parse_exponent(&mut self) -> PResult<i32> {
        let negative = if self.at(&TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };
        let tok = self.peek().clone();
        let TokenKind::Number(text) = &tok.kind else {
            return Err(self.unexpected("an integer exponent"));
        };
        let exp: i32 = text.parse().map_err(|_| {
            Some(Diagnostic::grammar(format!("exponent must be an integer, found {}", text))
                .at(tok.line, tok.column))
        })?;
        if exp > MAX_EXPONENT {
            return Err(Some(Diagnostic::grammar(format!(
                "exponent {} is out of range (at most {})", text, MAX_EXPONENT
            )).at(tok.line, tok.column)));
        }
        self.advance();
        Ok(if negative { -exp } else { exp })
    }

    // ========== Unit expressions ==========

    fn parse_unit_expr(&mut self) -> PResult<UnitValue> {
        let mut value = self.parse_unit_pow()?;
        loop {
            if self.at(&TokenKind::Star) {
                let op = self.advance();
                let rhs = self.parse_unit_pow()?;
                value = value.multiply(rhs).map_err(|e| arithmetic_error(&op, e))?;
            } else if self.at(&TokenKind::Slash) {
                let op = self.advance();
                let rhs = self.parse_unit_pow()?;
                value = value.divide(rhs).map_err(|e| arithmetic_error(&op, e))?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_unit_pow(&mut self) -> PResult<UnitValue> {
        let atom = self.parse_unit_atom()?;
        if self.at(&TokenKind::Caret) {
            let op = self.advance();
            let exp = self.parse_exponent()?;
            return atom.power(exp).map_err(|e| arithmetic_error(&op, e));
        }
        Ok(atom)
    }

    fn parse_unit_atom(&mut self) -> PResult<UnitValue> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Number(_) => {
                self.advance();
                Ok(UnitValue::scalar(number_value(&tok)?))
            }
            TokenKind::Ident(name) => {
                self.advance();
                let Some(unit) = self.defs.unit(name) else {
                    return Err(Some(Diagnostic::undefined_ref(name).at(tok.line, tok.column)));
                };
                Ok(UnitValue {
                    sense: unit.sense,
                    magnitude: unit.factor.clone(),
                    refs: vec![(name.clone(), 1)],
                    has_sense: false,
                })
            }
            TokenKind::Lt => {
                let sense = self.parse_sense()?;
                Ok(UnitValue {
                    sense,
                    magnitude: Number::from_i64(1),
                    refs: Vec::new(),
                    has_sense: true,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_unit_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a number, unit name or <sense>")),
        }
    }

    // ========== Numeric expressions ==========

    fn parse_num_expr(&mut self) -> PResult<Number> {
        let mut value = self.parse_num_term()?;
        loop {
            if self.at(&TokenKind::Plus) {
                self.advance();
                value = value.add(&self.parse_num_term()?);
            } else if self.at(&TokenKind::Minus) {
                self.advance();
                value = value.sub(&self.parse_num_term()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_num_term(&mut self) -> PResult<Number> {
        let mut value = self.parse_num_unary()?;
        loop {
            if self.at(&TokenKind::Star) {
                self.advance();
                value = value.mul(&self.parse_num_unary()?);
            } else if self.at(&TokenKind::Slash) {
                let op = self.advance();
                let rhs = self.parse_num_unary()?;
                value = value.checked_div(&rhs).map_err(|e| arithmetic_error(&op, e.to_string()))?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_num_unary(&mut self) -> PResult<Number> {
        if self.at(&TokenKind::Minus) {
            self.advance();
            return Ok(self.parse_num_primary()?.neg());
        }
        if self.at(&TokenKind::Plus) {
            self.advance();
        }
        self.parse_num_primary()
    }

    fn parse_num_primary(&mut self) -> PResult<Number> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(_) => {
                self.advance();
                number_value(&tok)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_num_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a number")),
        }
    }
}

fn ident_text(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Ident(s) => s.clone(),
        _ => tok.raw.clone(),
    }
}

fn number_value(tok: &Token) -> PResult<Number> {
    Number::from_str(&tok.raw).map_err(|e| {
        Some(Diagnostic::grammar(format!("invalid number {}: {}", tok.raw, e)).at(tok.line, tok.column))
    })
}

fn arithmetic_error(op: &Token, message: String) -> Option<Diagnostic> {
    Some(Diagnostic::grammar(format!("cannot evaluate expression: {}", message)).at(op.line, op.column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrica_core::codes;

    fn base() -> Definitions {
        let mut defs = Definitions::new();
        let outcome = parse_definitions(
            r#"
            unit Meter <Length> "m" = <Length>;
            unit Kilometer "km" = 1000 * Meter;
            unit Second "s" = <Time>;
            unit Hour "h" = 3600 * Second;
            unit Kelvin "K" = <Temperature>;
            unit DegCelsius "deltaC" = Kelvin;
            "#,
            &mut defs,
        );
        assert!(outcome.ok, "{:?}", outcome.diagnostics);
        defs
    }

    fn codes_of(outcome: &ParseOutcome) -> Vec<&str> {
        outcome.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_families() {
        let defs = base();
        let km = defs.unit("Kilometer").unwrap();
        assert_eq!(km.family, defs.unit("Meter").unwrap().family);
        assert_eq!(km.factor, Number::from_i64(1000));
        assert_eq!(km.factor_expr, "1000 * Meter");
        assert_ne!(defs.unit("Second").unwrap().family, km.family);
        assert_eq!(defs.families()[&km.family].primary, "Meter");
        assert_eq!(defs.unit("Meter").unwrap().origin, Origin::Parsed { line: 2 });
    }

    #[test]
    fn test_derived_unit_starts_family() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit MeterPerSecond \"m/s\" = Meter / Second;\n\
             unit KilometerPerHour \"km/h\" = Kilometer / Hour relative to MeterPerSecond;",
            &mut defs,
        );
        assert!(outcome.ok, "{:?}", outcome.diagnostics);
        let mps = defs.unit("MeterPerSecond").unwrap();
        assert_eq!(mps.sense, Dimension::VELOCITY);
        let kmh = defs.unit("KilometerPerHour").unwrap();
        assert_eq!(kmh.family, mps.family);
        assert!(kmh.factor.approx_eq(&Number::from_ratio(5, 18), 40));
    }

    #[test]
    fn test_non_coherent() {
        let mut defs = base();
        let outcome = parse_definitions("unit KmH \"kmh\" = Kilometer / Hour;", &mut defs);
        assert!(!outcome.ok);
        assert_eq!(codes_of(&outcome), vec![codes::NON_COHERENT]);
        assert!(defs.unit("KmH").is_none());
    }

    #[test]
    fn test_undefined_reference_adds_no_family() {
        let mut defs = base();
        let families = defs.families().len();
        let outcome = parse_definitions("unit NauticalMile \"nmi\" = 1852 * Metre;", &mut defs);
        assert!(!outcome.ok);
        assert_eq!(codes_of(&outcome), vec![codes::UNDEFINED_REF]);
        assert_eq!(outcome.diagnostics[0].column, Some(34));
        assert_eq!(defs.families().len(), families);
        assert!(defs.unit("NauticalMile").is_none());

        let outcome = parse_definitions("unit Nm \"nm2\" = 1852 * Meter relative to Furlong;", &mut defs);
        assert_eq!(codes_of(&outcome), vec![codes::UNDEFINED_REF]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit Bad <Time> \"bad\" = 2 * Meter;\nunit Worse \"worse\" = 2 * Meter relative to Second;",
            &mut defs,
        );
        assert_eq!(codes_of(&outcome), vec![codes::DIMENSION_MISMATCH, codes::DIMENSION_MISMATCH]);
    }

    #[test]
    fn test_duplicates() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit Meter \"mtr\" = <Length>;\nunit Metre \"m\" = Meter;",
            &mut defs,
        );
        assert_eq!(codes_of(&outcome), vec![codes::DUPLICATE_NAME, codes::DUPLICATE_SYMBOL]);
    }

    #[test]
    fn test_recovery_reports_every_error() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit A \"a\" = ;\nunit B \"b\" = 2 * Meter\nunit C \"c\" = 3 * Meter;\nscale D \"d\" = Nowhere;",
            &mut defs,
        );
        assert_eq!(codes_of(&outcome), vec![codes::GRAMMAR_ERROR, codes::GRAMMAR_ERROR, codes::UNDEFINED_REF]);
        assert_eq!(outcome.diagnostics[1].line, Some(3));
        assert!(defs.unit("C").is_some());
        assert!(defs.unit("B").is_none());
    }

    #[test]
    fn test_lexical_errors_surface() {
        let mut defs = base();
        let mut seen = 0;
        let outcome = parse_definitions_with("unit X \"x\" = 2 # Meter;", &mut defs, &mut |_| seen += 1);
        assert_eq!(seen, 1);
        assert!(!outcome.ok);
        assert_eq!(codes_of(&outcome), vec![codes::LEXICAL_ERROR]);
    }

    #[test]
    fn test_empty_symbol_is_a_warning() {
        let mut defs = base();
        let outcome = parse_definitions("unit Foot \"ft\" \"\" = 0.3048 * Meter;", &mut defs);
        assert!(outcome.ok);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(defs.unit("Foot").unwrap().symbols, vec!["ft"]);
    }

    #[test]
    fn test_scales() {
        let mut defs = base();
        let outcome = parse_definitions(
            "scale KelvinScale AbsoluteZero \"°K\" = Kelvin;\n\
             scale Celsius AbsoluteZero \"°C\" = DegCelsius 273.15;\n\
             scale Shifted \"°S\" = Kelvin (10 - 2) * 2;",
            &mut defs,
        );
        assert!(outcome.ok, "{:?}", outcome.diagnostics);
        let k = defs.scale("KelvinScale").unwrap();
        let c = defs.scale("Celsius").unwrap();
        assert_eq!(k.family, c.family);
        assert_eq!(c.offset, Number::from_str("273.15").unwrap());
        let s = defs.scale("Shifted").unwrap();
        assert_ne!(s.family, k.family);
        assert_eq!(s.offset, Number::from_i64(16));
        assert_eq!(s.offset_expr, "( 10 - 2 ) * 2");
    }

    #[test]
    fn test_rated_and_powers() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit Euro \"EUR\" = <Money>;\n\
             rated unit Dollar \"USD\" = 0.86 * Euro;\n\
             unit SquareMeter \"m2\" = Meter^2;\n\
             unit Hertz \"Hz\" = Second^-1;",
            &mut defs,
        );
        assert!(outcome.ok, "{:?}", outcome.diagnostics);
        assert!(defs.unit("Dollar").unwrap().rated);
        assert_eq!(defs.unit("SquareMeter").unwrap().sense, Dimension::AREA);
        assert_eq!(defs.unit("Hertz").unwrap().sense, Dimension::TIME.power(-1));
    }

    #[test]
    fn test_exponent_bound() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit Big \"bg\" = Meter^1000000000;\nunit Huge \"hg\" = <Length^2147483647*Length>;",
            &mut defs,
        );
        assert_eq!(codes_of(&outcome), vec![codes::GRAMMAR_ERROR, codes::GRAMMAR_ERROR]);
        assert!(outcome.diagnostics[0].message.contains("out of range"));
        assert_eq!(outcome.diagnostics[0].column, Some(23));
        assert!(defs.unit("Big").is_none());
        assert!(defs.unit("Huge").is_none());
    }

    #[test]
    fn test_dimension_overflow_is_reported() {
        let mut defs = base();
        let outcome = parse_definitions(
            "unit Huge \"hg\" = (((((<Length^64>)^64)^64)^64)^64)^64;\n\
             unit Sq \"sq\" = Meter^2;",
            &mut defs,
        );
        assert_eq!(codes_of(&outcome), vec![codes::GRAMMAR_ERROR]);
        assert!(outcome.diagnostics[0].message.contains("exponent out of range"));
        assert!(defs.unit("Huge").is_none());
        assert_eq!(defs.unit("Sq").unwrap().sense, Dimension::AREA);
    }

    #[test]
    fn test_family_ids_exhausted() {
        let mut defs = base();
        defs.note_family(FamilyId::MAX);
        let outcome = parse_definitions("unit Bit \"bit\" = <Other>;", &mut defs);
        assert_eq!(codes_of(&outcome), vec![codes::GRAMMAR_ERROR]);
        assert!(defs.unit("Bit").is_none());
    }
}
