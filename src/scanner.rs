//! Scanner/tokenizer for the restricted module-syntax subset.
//!
//! Source text goes in, an ordered token list with exact byte offsets comes
//! out. The token stream is the only interface the parser sees; offsets are
//! carried all the way through to the renderer, which edits the original
//! text in place.
//!
//! Scanning rules:
//! - whitespace is skipped, never emitted
//! - `[A-Za-z_$][A-Za-z0-9_$]*` runs become keywords or identifiers
//! - digit runs allow at most one `.`; a second `.` is a fatal syntax error
//! - `'`, `"` and `` ` `` quoted runs are taken verbatim, no escapes
//! - `*` is a namespace/export-all star only directly after `import` or
//!   `export` (one token of lookbehind), otherwise a multiply operator

use crate::diagnostics::SyntaxError;
use crate::span::Span;

/// Token types produced by the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Let,
    Const,
    Var,
    Function,
    Return,
    Import,
    Export,
    From,
    As,
    Default,
    // Atoms
    Identifier,
    Number,
    String,
    // Punctuation
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    Dot,
    Semicolon,
    Comma,
    Equals,
    /// `*` in namespace-import / export-all position.
    Star,
    /// Arithmetic and bitwise operators, including multiply `*`.
    Operator,
}

impl TokenKind {
    /// Display name used in expected-vs-actual error messages.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::From => "from",
            TokenKind::As => "as",
            TokenKind::Default => "default",
            TokenKind::Identifier => "Identifier",
            TokenKind::Number => "Number",
            TokenKind::String => "String",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftCurly => "{",
            TokenKind::RightCurly => "}",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Equals => "=",
            TokenKind::Star => "*",
            TokenKind::Operator => "Operator",
        }
    }

    fn from_word(word: &str) -> Option<TokenKind> {
        match word {
            "let" => Some(TokenKind::Let),
            "const" => Some(TokenKind::Const),
            "var" => Some(TokenKind::Var),
            "function" => Some(TokenKind::Function),
            "return" => Some(TokenKind::Return),
            "import" => Some(TokenKind::Import),
            "export" => Some(TokenKind::Export),
            "from" => Some(TokenKind::From),
            "as" => Some(TokenKind::As),
            "default" => Some(TokenKind::Default),
            _ => None,
        }
    }
}

/// A single lexical unit. Immutable, produced once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Decoded text: identifier/keyword characters, digits, operator
    /// characters, or the string value without its quotes.
    pub text: String,
    /// Raw quoted source text; only set for string tokens.
    pub raw: Option<String>,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            text: text.into(),
            raw: None,
            span,
        }
    }
}

/// Tokenizer state: a byte cursor over one module's source.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole source into a token list.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
                self.scan_word();
            } else if c.is_ascii_digit() {
                self.scan_number()?;
            } else if matches!(c, b'\'' | b'"' | b'`') {
                self.scan_string()?;
            } else {
                self.scan_punctuation()?;
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn char_span(&self) -> Span {
        Span::new(self.pos as u32, self.pos as u32 + 1)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let span = Span::new(start as u32, self.pos as u32);
        let text = &self.source[span.range()];
        self.tokens.push(Token::new(kind, text, span));
    }

    /// Maximal identifier run. `$` is a plain identifier character, the
    /// way conflict-renamed bindings spell it.
    fn scan_word(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        let kind = TokenKind::from_word(word).unwrap_or(TokenKind::Identifier);
        self.push(kind, start);
    }

    /// Digit run with at most one decimal point.
    fn scan_number(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        if seen_dot && self.peek() == Some(b'.') {
            return Err(SyntaxError::new(
                "unexpected character '.' in number literal",
                self.char_span(),
            ));
        }
        self.push(TokenKind::Number, start);
        Ok(())
    }

    /// Quoted run, verbatim, no escape processing.
    fn scan_string(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let quote = self.bytes[self.pos];
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(SyntaxError::new(
                "unterminated string literal",
                Span::new(start as u32, self.pos as u32),
            ));
        }
        self.pos += 1;
        let span = Span::new(start as u32, self.pos as u32);
        let raw = &self.source[span.range()];
        let value = &raw[1..raw.len() - 1];
        self.tokens.push(Token {
            kind: TokenKind::String,
            text: value.to_string(),
            raw: Some(raw.to_string()),
            span,
        });
        Ok(())
    }

    fn scan_punctuation(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let c = self.bytes[self.pos];
        let kind = match c {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftCurly,
            b'}' => TokenKind::RightCurly,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'=' => TokenKind::Equals,
            b'*' => {
                // Namespace/export-all star only directly after `import`
                // or `export`; otherwise it is multiplication.
                if self.after_import_or_export() {
                    TokenKind::Star
                } else {
                    TokenKind::Operator
                }
            }
            b'+' | b'-' | b'/' | b'%' | b'^' | b'&' | b'|' | b'~' => TokenKind::Operator,
            b'<' | b'>' => {
                // Only the shift forms `<<` and `>>` are in the operator set.
                if self.peek_next() == Some(c) {
                    self.pos += 1;
                    TokenKind::Operator
                } else {
                    return Err(SyntaxError::new(
                        format!("unexpected character '{}'", c as char),
                        self.char_span(),
                    ));
                }
            }
            _ => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{}'", c as char),
                    self.char_span(),
                ));
            }
        };
        self.pos += 1;
        self.push(kind, start);
        Ok(())
    }

    /// One token of lookbehind for the `*` disambiguation.
    fn after_import_or_export(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| t.kind),
            Some(TokenKind::Import) | Some(TokenKind::Export)
        )
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Scanner::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn arithmetic_token_sequence() {
        let tokens = tokenize("1 + 2; 3 * 4").unwrap();
        let expected = [
            (TokenKind::Number, "1"),
            (TokenKind::Operator, "+"),
            (TokenKind::Number, "2"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Number, "3"),
            (TokenKind::Operator, "*"),
            (TokenKind::Number, "4"),
        ];
        assert_eq!(tokens.len(), expected.len());
        for (token, (kind, text)) in tokens.iter().zip(expected) {
            assert_eq!(token.kind, kind);
            assert_eq!(token.text, text);
        }
        // Offsets are contiguous and non-overlapping.
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[6].span, Span::new(11, 12));
    }

    #[test]
    fn second_dot_in_number_fails() {
        let err = tokenize("123.45.6").unwrap_err();
        assert!(err.message.contains("'.'"), "got: {}", err.message);
        assert_eq!(err.span.start, 6);
    }

    #[test]
    fn float_scans_as_one_token() {
        let tokens = tokenize("123.45").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "123.45");
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("let foo_1 = bar$1"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Identifier,
            ]
        );
        let tokens = tokenize("bar$1").unwrap();
        assert_eq!(tokens[0].text, "bar$1");
    }

    #[test]
    fn star_is_contextual() {
        assert_eq!(
            kinds("import * as ns from 'm'"),
            vec![
                TokenKind::Import,
                TokenKind::Star,
                TokenKind::As,
                TokenKind::Identifier,
                TokenKind::From,
                TokenKind::String,
            ]
        );
        assert_eq!(
            kinds("export * from 'm'"),
            vec![
                TokenKind::Export,
                TokenKind::Star,
                TokenKind::From,
                TokenKind::String,
            ]
        );
        // Multiplication after an identifier stays an operator.
        assert_eq!(
            kinds("a * b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn string_records_value_and_raw() {
        let tokens = tokenize("'./module'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "./module");
        assert_eq!(tokens[0].raw.as_deref(), Some("'./module'"));
        assert_eq!(tokens[0].span, Span::new(0, 10));
    }

    #[test]
    fn unterminated_string_fails() {
        let err = tokenize("'abc").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn shift_operators_scan_as_one_token() {
        let tokens = tokenize("a << b >> c").unwrap();
        assert_eq!(tokens[1].text, "<<");
        assert_eq!(tokens[3].text, ">>");
    }

    #[test]
    fn lone_angle_bracket_fails() {
        assert!(tokenize("a < b").is_err());
    }
}
