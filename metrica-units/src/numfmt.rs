//! Locale-aware numeral scanning
//!
//! [`parse_number`] accepts a numeral written with a [`NumberFormat`]'s
//! separators, signs and digit glyphs, restricted by [`NumberStyles`].

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use metrica_core::Real;

/// Set of syntactic features a numeral may use
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberStyles(u16);

impl NumberStyles {
    pub const NONE: NumberStyles = NumberStyles(0);
    pub const ALLOW_LEADING_WHITE: NumberStyles = NumberStyles(1);
    pub const ALLOW_TRAILING_WHITE: NumberStyles = NumberStyles(1 << 1);
    pub const ALLOW_LEADING_SIGN: NumberStyles = NumberStyles(1 << 2);
    pub const ALLOW_TRAILING_SIGN: NumberStyles = NumberStyles(1 << 3);
    pub const ALLOW_PARENTHESES: NumberStyles = NumberStyles(1 << 4);
    pub const ALLOW_DECIMAL_POINT: NumberStyles = NumberStyles(1 << 5);
    pub const ALLOW_THOUSANDS: NumberStyles = NumberStyles(1 << 6);
    pub const ALLOW_EXPONENT: NumberStyles = NumberStyles(1 << 7);

    pub const INTEGER: NumberStyles = NumberStyles(
        Self::ALLOW_LEADING_WHITE.0 | Self::ALLOW_TRAILING_WHITE.0 | Self::ALLOW_LEADING_SIGN.0,
    );
    pub const FLOAT: NumberStyles = NumberStyles(
        Self::INTEGER.0 | Self::ALLOW_DECIMAL_POINT.0 | Self::ALLOW_EXPONENT.0,
    );
    pub const NUMBER: NumberStyles = NumberStyles(
        Self::INTEGER.0 | Self::ALLOW_TRAILING_SIGN.0 | Self::ALLOW_DECIMAL_POINT.0 | Self::ALLOW_THOUSANDS.0,
    );
    pub const ANY: NumberStyles = NumberStyles(
        Self::NUMBER.0 | Self::ALLOW_PARENTHESES.0 | Self::ALLOW_EXPONENT.0,
    );

    pub fn contains(self, other: NumberStyles) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NumberStyles {
    type Output = NumberStyles;

    fn bitor(self, rhs: NumberStyles) -> NumberStyles {
        NumberStyles(self.0 | rhs.0)
    }
}

impl BitOrAssign for NumberStyles {
    fn bitor_assign(&mut self, rhs: NumberStyles) {
        self.0 |= rhs.0;
    }
}

impl Default for NumberStyles {
    fn default() -> Self {
        NumberStyles::ANY
    }
}

impl fmt::Debug for NumberStyles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 8] = [
            "LeadingWhite", "TrailingWhite", "LeadingSign", "TrailingSign",
            "Parentheses", "DecimalPoint", "Thousands", "Exponent",
        ];
        let flags: Vec<&str> = NAMES.iter().enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, n)| *n)
            .collect();
        write!(f, "NumberStyles({})", flags.join(" | "))
    }
}

/// Culture-specific numeral conventions
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    pub decimal_separator: String,
    pub group_separator: String,
    /// Further group separators accepted on input
    pub group_alternates: Vec<String>,
    pub positive_sign: String,
    pub negative_sign: String,
    pub nan_symbol: String,
    pub positive_infinity: String,
    pub negative_infinity: String,
    /// Native digit glyphs for 0..=9, accepted alongside ASCII digits
    pub digits: Option<[char; 10]>,
}

const NBSP: &str = "\u{00A0}";
const NNBSP: &str = "\u{202F}";

impl NumberFormat {
    pub fn invariant() -> Self {
        NumberFormat {
            decimal_separator: ".".to_string(),
            group_separator: ",".to_string(),
            group_alternates: Vec::new(),
            positive_sign: "+".to_string(),
            negative_sign: "-".to_string(),
            nan_symbol: "NaN".to_string(),
            positive_infinity: "Infinity".to_string(),
            negative_infinity: "-Infinity".to_string(),
            digits: None,
        }
    }

    fn with_separators(mut self, decimal: &str, group: &str, alternates: &[&str]) -> Self {
        self.decimal_separator = decimal.to_string();
        self.group_separator = group.to_string();
        self.group_alternates = alternates.iter().map(|s| s.to_string()).collect();
        self
    }

    fn with_infinity(mut self, symbol: &str) -> Self {
        self.positive_infinity = symbol.to_string();
        self.negative_infinity = format!("{}{}", self.negative_sign, symbol);
        self
    }

    /// Preset for a language tag; unknown tags fall back to invariant
    pub fn for_locale(tag: &str) -> Self {
        match tag {
            "en-US" | "en-GB" | "en" => Self::invariant().with_infinity("∞"),
            "de-DE" | "de" => Self::invariant()
                .with_separators(",", ".", &[])
                .with_infinity("∞"),
            "fr-FR" | "fr" => Self::invariant()
                .with_separators(",", NNBSP, &[NBSP, " "])
                .with_infinity("∞"),
            "pl-PL" | "pl" => Self::invariant()
                .with_separators(",", NBSP, &[NNBSP, " "])
                .with_infinity("∞"),
            "ar-EG" | "ar" => {
                let mut f = Self::invariant()
                    .with_separators("\u{066B}", "\u{066C}", &[])
                    .with_infinity("∞");
                f.nan_symbol = "ليس رقم".to_string();
                f.digits = Some(['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩']);
                f
            }
            _ => Self::invariant(),
        }
    }

    fn digit(&self, c: char) -> Option<char> {
        if c.is_ascii_digit() {
            return Some(c);
        }
        let digits = self.digits.as_ref()?;
        digits.iter()
            .position(|d| *d == c)
            .and_then(|i| char::from_digit(i as u32, 10))
    }

    fn group_prefix<'a>(&self, s: &'a str) -> Option<&'a str> {
        std::iter::once(&self.group_separator)
            .chain(self.group_alternates.iter())
            .filter(|g| !g.is_empty())
            .find_map(|g| s.strip_prefix(g.as_str()))
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Strip a sign from the front of `s`, returning (negative, rest)
fn leading_sign<'a>(s: &'a str, format: &NumberFormat) -> Option<(bool, &'a str)> {
    if let Some(rest) = s.strip_prefix(format.negative_sign.as_str()) {
        return Some((true, rest));
    }
    s.strip_prefix(format.positive_sign.as_str()).map(|rest| (false, rest))
}

fn trailing_sign<'a>(s: &'a str, format: &NumberFormat) -> Option<(bool, &'a str)> {
    if let Some(rest) = s.strip_suffix(format.negative_sign.as_str()) {
        return Some((true, rest));
    }
    s.strip_suffix(format.positive_sign.as_str()).map(|rest| (false, rest))
}

/// Parse a complete numeral. Returns `None` when any character is left
/// over, no digit is present, or the representation cannot hold a special
/// value such as NaN.
pub fn parse_number<T: Real>(text: &str, styles: NumberStyles, format: &NumberFormat) -> Option<T> {
    let mut s = text;
    if styles.contains(NumberStyles::ALLOW_LEADING_WHITE) {
        s = s.trim_start();
    }
    if styles.contains(NumberStyles::ALLOW_TRAILING_WHITE) {
        s = s.trim_end();
    }

    let mut negative = false;
    if s.starts_with('(') {
        if !styles.contains(NumberStyles::ALLOW_PARENTHESES) {
            return None;
        }
        s = s.strip_prefix('(')?.strip_suffix(')')?;
        negative = true;
    } else {
        let mut signed = false;
        if styles.contains(NumberStyles::ALLOW_LEADING_SIGN) {
            if let Some((neg, rest)) = leading_sign(s, format) {
                negative = neg;
                signed = true;
                s = rest;
            }
        }
        if !signed && styles.contains(NumberStyles::ALLOW_TRAILING_SIGN) {
            if let Some((neg, rest)) = trailing_sign(s, format) {
                negative = neg;
                s = rest;
            }
        }
    }

    if s == format.nan_symbol {
        return T::nan();
    }
    if s == format.positive_infinity {
        return T::infinity(negative);
    }
    if s == format.negative_infinity && !negative {
        return T::infinity(true);
    }

    let literal = scan_digits(s, styles, format)?;
    let value = T::from_literal(&literal)?;
    Some(if negative { value.neg() } else { value })
}

/// Rewrite the unsigned body of a numeral as an ASCII literal
fn scan_digits(body: &str, styles: NumberStyles, format: &NumberFormat) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut mantissa_digits = 0usize;
    let mut seen_point = false;
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        if let Some(d) = format.digit(c) {
            out.push(d);
            mantissa_digits += 1;
            rest = &rest[c.len_utf8()..];
            continue;
        }
        if !seen_point && styles.contains(NumberStyles::ALLOW_DECIMAL_POINT) {
            if let Some(after) = rest.strip_prefix(format.decimal_separator.as_str()) {
                if out.is_empty() {
                    out.push('0');
                }
                out.push('.');
                seen_point = true;
                rest = after;
                continue;
            }
        }
        if !seen_point && mantissa_digits > 0 && styles.contains(NumberStyles::ALLOW_THOUSANDS) {
            if let Some(after) = format.group_prefix(rest) {
                rest = after;
                continue;
            }
        }
        if (c == 'e' || c == 'E') && mantissa_digits > 0 && styles.contains(NumberStyles::ALLOW_EXPONENT) {
            let exponent = scan_exponent(&rest[1..], format)?;
            if out.ends_with('.') {
                out.push('0');
            }
            out.push('e');
            out.push_str(&exponent);
            return Some(out);
        }
        return None;
    }

    if mantissa_digits == 0 {
        return None;
    }
    if out.ends_with('.') {
        out.push('0');
    }
    Some(out)
}

fn scan_exponent(s: &str, format: &NumberFormat) -> Option<String> {
    let (negative, digits) = match s.chars().next() {
        Some('-') => (true, &s[1..]),
        Some('+') => (false, &s[1..]),
        _ => match leading_sign(s, format) {
            Some((neg, rest)) => (neg, rest),
            None => (false, s),
        },
    };
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    for c in digits.chars() {
        out.push(format.digit(c)?);
    }
    if out.trim_start_matches('-').is_empty() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrica_core::Number;

    fn inv(text: &str, styles: NumberStyles) -> Option<f64> {
        parse_number(text, styles, &NumberFormat::invariant())
    }

    #[test]
    fn test_plain() {
        assert_eq!(inv("42", NumberStyles::INTEGER), Some(42.0));
        assert_eq!(inv("  -12.5 ", NumberStyles::FLOAT), Some(-12.5));
        assert_eq!(inv("+7", NumberStyles::INTEGER), Some(7.0));
        assert_eq!(inv(".5", NumberStyles::FLOAT), Some(0.5));
        assert_eq!(inv("5.", NumberStyles::FLOAT), Some(5.0));
    }

    #[test]
    fn test_rejects() {
        assert_eq!(inv("", NumberStyles::ANY), None);
        assert_eq!(inv("-", NumberStyles::ANY), None);
        assert_eq!(inv(".", NumberStyles::ANY), None);
        assert_eq!(inv("12x", NumberStyles::ANY), None);
        assert_eq!(inv("1.5", NumberStyles::INTEGER), None);
        assert_eq!(inv(" 1", NumberStyles::NONE), None);
        assert_eq!(inv("1e", NumberStyles::FLOAT), None);
        assert_eq!(inv("1e+", NumberStyles::FLOAT), None);
        assert_eq!(inv("(-1)", NumberStyles::ANY), None);
        assert_eq!(inv("(1", NumberStyles::ANY), None);
        assert_eq!(inv(",100", NumberStyles::ANY), None);
    }

    #[test]
    fn test_styles() {
        assert_eq!(inv("1,234.5", NumberStyles::NUMBER), Some(1234.5));
        assert_eq!(inv("1,234", NumberStyles::FLOAT), None);
        assert_eq!(inv("(15)", NumberStyles::ANY), Some(-15.0));
        assert_eq!(inv("15-", NumberStyles::NUMBER), Some(-15.0));
        assert_eq!(inv("2.5e3", NumberStyles::FLOAT), Some(2500.0));
        assert_eq!(inv("1E-2", NumberStyles::FLOAT), Some(0.01));
    }

    #[test]
    fn test_special_values() {
        assert!(inv("NaN", NumberStyles::ANY).map(|v| v.is_nan()).unwrap_or(false));
        assert_eq!(inv("-Infinity", NumberStyles::ANY), Some(f64::NEG_INFINITY));
        let en = NumberFormat::for_locale("en-US");
        assert_eq!(parse_number::<f64>("∞", NumberStyles::ANY, &en), Some(f64::INFINITY));
        assert_eq!(parse_number::<Number>("NaN", NumberStyles::ANY, &NumberFormat::invariant()), None);
    }

    #[test]
    fn test_locales() {
        let de = NumberFormat::for_locale("de-DE");
        assert_eq!(parse_number::<f64>("1.234,5", NumberStyles::NUMBER, &de), Some(1234.5));

        let fr = NumberFormat::for_locale("fr-FR");
        assert_eq!(parse_number::<f64>("1\u{202F}234,5", NumberStyles::NUMBER, &fr), Some(1234.5));
        assert_eq!(parse_number::<f64>("1\u{00A0}234,5", NumberStyles::NUMBER, &fr), Some(1234.5));

        let ar = NumberFormat::for_locale("ar-EG");
        assert_eq!(parse_number::<f64>("١٢٣٫٥", NumberStyles::NUMBER, &ar), Some(123.5));
        assert_eq!(parse_number::<f64>("12", NumberStyles::NUMBER, &ar), Some(12.0));

        assert_eq!(NumberFormat::for_locale("xx-YY"), NumberFormat::invariant());
    }

    #[test]
    fn test_decimal_target() {
        let v: Number = parse_number("-80", NumberStyles::FLOAT, &NumberFormat::invariant()).unwrap();
        assert_eq!(v, Number::from_i64(-80));
    }
}
