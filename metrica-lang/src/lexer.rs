//! Lexer for the definition language

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    KwUnit,
    KwScale,
    KwRated,
    KwRelative,
    KwTo,
    Lt,
    Gt,
    Equals,
    Semicolon,
    Star,
    Slash,
    Caret,
    Plus,
    Minus,
    LParen,
    RParen,
    /// Text the lexer already reported as malformed
    Invalid(String),
    Eof,
}

impl TokenKind {
    pub fn is_decl_start(&self) -> bool {
        matches!(self, TokenKind::KwUnit | TokenKind::KwScale | TokenKind::KwRated)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Number(s) => write!(f, "number {}", s),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::KwUnit => write!(f, "'unit'"),
            TokenKind::KwScale => write!(f, "'scale'"),
            TokenKind::KwRated => write!(f, "'rated'"),
            TokenKind::KwRelative => write!(f, "'relative'"),
            TokenKind::KwTo => write!(f, "'to'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Equals => write!(f, "'='"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Caret => write!(f, "'^'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Invalid(s) => write!(f, "'{}'", s),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub raw: String,
}

/// A problem noticed while scanning
#[derive(Debug, Clone, PartialEq)]
pub struct LexReport {
    pub is_error: bool,
    pub line: usize,
    pub column: usize,
    pub token: String,
    pub message: String,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    report: &'a mut dyn FnMut(&LexReport),
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, report: &'a mut dyn FnMut(&LexReport)) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            report,
        }
    }

    /// Scan the whole source. Always ends with an `Eof` token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, line, column, raw: String::new() });
                return tokens;
            };
            let start = self.pos;
            let kind = match c {
                '0'..='9' => self.read_number(),
                '"' => self.read_string(line, column),
                c if c.is_alphabetic() || c == '_' => self.read_word(),
                _ => {
                    self.advance();
                    match c {
                        '<' => TokenKind::Lt,
                        '>' => TokenKind::Gt,
                        '=' => TokenKind::Equals,
                        ';' => TokenKind::Semicolon,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        '^' => TokenKind::Caret,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        other => {
                            self.error(line, column, &other.to_string(), "unexpected character");
                            TokenKind::Invalid(other.to_string())
                        }
                    }
                }
            };
            let raw: String = self.chars[start..self.pos].iter().collect();
            tokens.push(Token { kind, line, column, raw });
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&mut self, line: usize, column: usize, token: &str, message: &str) {
        (self.report)(&LexReport {
            is_error: true,
            line,
            column,
            token: token.to_string(),
            message: message.to_string(),
        });
    }

    fn warn(&mut self, line: usize, column: usize, token: &str, message: &str) {
        (self.report)(&LexReport {
            is_error: false,
            line,
            column,
            token: token.to_string(),
            message: message.to_string(),
        });
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.advance() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.error(line, column, "/*", "unterminated block comment");
                    }
                }
                _ => return,
            }
        }
    }

    fn read_digits(&mut self, out: &mut String) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            out.push(c);
            self.advance();
        }
    }

    fn read_number(&mut self) -> TokenKind {
        let mut text = String::new();
        self.read_digits(&mut text);
        if self.peek() == Some('.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                text.push('e');
                self.advance();
                if signed {
                    if let Some(sign) = self.advance() {
                        text.push(sign);
                    }
                }
                self.read_digits(&mut text);
            }
        }
        TokenKind::Number(text)
    }

    fn read_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            word.push(c);
            self.advance();
        }
        match word.as_str() {
            "unit" => TokenKind::KwUnit,
            "scale" => TokenKind::KwScale,
            "rated" => TokenKind::KwRated,
            "relative" => TokenKind::KwRelative,
            "to" => TokenKind::KwTo,
            _ => TokenKind::Ident(word),
        }
    }

    fn read_string(&mut self, line: usize, column: usize) -> TokenKind {
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(line, column, &format!("\"{}", value), "unterminated string");
                    return TokenKind::Invalid(value);
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let (l, c) = (self.line, self.column);
                    self.advance();
                    match self.advance() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(other) => {
                            self.error(l, c, &format!("\\{}", other), "unknown escape sequence");
                            value.push(other);
                        }
                        None => {}
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        if value.trim().is_empty() {
            self.warn(line, column, "\"\"", "empty symbol string is ignored");
        }
        TokenKind::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<TokenKind>, Vec<LexReport>) {
        let mut reports = Vec::new();
        let mut sink = |r: &LexReport| reports.push(r.clone());
        let tokens = Lexer::new(source, &mut sink).tokenize();
        (tokens.into_iter().map(|t| t.kind).collect(), reports)
    }

    #[test]
    fn test_declaration() {
        let (kinds, reports) = lex("unit Mile \"mi\" = 1609.344 * Meter;");
        assert!(reports.is_empty());
        assert_eq!(kinds, vec![
            TokenKind::KwUnit,
            TokenKind::Ident("Mile".to_string()),
            TokenKind::Str("mi".to_string()),
            TokenKind::Equals,
            TokenKind::Number("1609.344".to_string()),
            TokenKind::Star,
            TokenKind::Ident("Meter".to_string()),
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_comments_and_positions() {
        let mut reports = Vec::new();
        let mut sink = |r: &LexReport| reports.push(r.clone());
        let tokens = Lexer::new("// header\n/* block\n */ scale", &mut sink).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::KwScale);
        assert_eq!((tokens[0].line, tokens[0].column), (3, 5));
        assert!(reports.is_empty());
    }

    #[test]
    fn test_unicode_strings_and_escapes() {
        let (kinds, _) = lex(r#""°Ré" "a\"b" "\\""#);
        assert_eq!(kinds[0], TokenKind::Str("°Ré".to_string()));
        assert_eq!(kinds[1], TokenKind::Str("a\"b".to_string()));
        assert_eq!(kinds[2], TokenKind::Str("\\".to_string()));
    }

    #[test]
    fn test_numbers() {
        let (kinds, _) = lex("1.5e-3 2E4 7 3.x");
        assert_eq!(kinds[0], TokenKind::Number("1.5e-3".to_string()));
        assert_eq!(kinds[1], TokenKind::Number("2e4".to_string()));
        assert_eq!(kinds[2], TokenKind::Number("7".to_string()));
        assert_eq!(kinds[3], TokenKind::Number("3".to_string()));
    }

    #[test]
    fn test_errors_are_reported_and_scanning_continues() {
        let (kinds, reports) = lex("unit # Foo \"oops\n;");
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.is_error));
        assert_eq!(reports[0].token, "#");
        assert_eq!((reports[0].line, reports[0].column), (1, 6));
        assert_eq!(reports[1].message, "unterminated string");
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
        assert!(kinds.contains(&TokenKind::Semicolon));
    }

    #[test]
    fn test_empty_symbol_warns() {
        let (_, reports) = lex("\"\"");
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_error);
    }
}
