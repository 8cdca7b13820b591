//! Tokenizer shared by the mesh and animation parsers
//!
//! MD5 text is whitespace separated. Tokens are bare words (keywords and numbers), quoted
//! strings, parentheses and braces. `//` starts a comment that runs to the end of the line.

use std::str::FromStr;

use glam::{Vec2, Vec3};

use crate::error::{BakeError, MD5_VERSION, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{}'", w),
            Token::Quoted(q) => format!("\"{}\"", q),
            Token::OpenParen => "'('".to_string(),
            Token::CloseParen => "')'".to_string(),
            Token::OpenBrace => "'{'".to_string(),
            Token::CloseBrace => "'}'".to_string(),
        }
    }
}

/// Result of scanning one numeric field
///
/// The parser decides per field whether `Missing`/`Malformed` is fatal or falls back to a
/// default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scan<'a, T> {
    Value(T),
    /// Next token is not a bare word (or input ended). Nothing was consumed.
    Missing,
    /// A word was consumed but did not parse.
    Malformed(&'a str),
}

impl<'a, T> Scan<'a, T> {
    /// Treat anything but a value as an error
    pub fn required(self, field: &'static str, line: usize) -> Result<T> {
        match self {
            Scan::Value(v) => Ok(v),
            Scan::Missing => Err(BakeError::format(line, format!("missing {}", field))),
            Scan::Malformed(found) => Err(BakeError::MalformedNumber {
                line,
                field,
                found: found.to_string(),
            }),
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Scan::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lexeme<'a> {
    token: Token<'a>,
    line: usize,
    offset: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    token_line: usize,
    token_offset: usize,
    peeked: Option<Lexeme<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            token_line: 1,
            token_offset: 0,
            peeked: None,
        }
    }

    /// Line of the most recently returned or peeked token
    pub fn line(&self) -> usize {
        self.token_line
    }

    /// Byte offset in the source of the most recently returned or peeked token
    pub fn offset(&self) -> usize {
        self.token_offset
    }

    pub fn peek(&mut self) -> Option<Token<'a>> {
        if self.peeked.is_none() {
            self.peeked = self.lex();
        }
        let lexeme = self.peeked?;
        Some(self.accept(lexeme))
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let lexeme = match self.peeked.take() {
            Some(peeked) => peeked,
            None => self.lex()?,
        };
        Some(self.accept(lexeme))
    }

    fn accept(&mut self, lexeme: Lexeme<'a>) -> Token<'a> {
        self.token_line = lexeme.line;
        self.token_offset = lexeme.offset;
        lexeme.token
    }

    fn lex(&mut self) -> Option<Lexeme<'a>> {
        let src = self.src;
        let bytes = src.as_bytes();
        loop {
            let &b = bytes.get(self.pos)?;
            match b {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }

        let line = self.line;
        let start = self.pos;
        let single = |token| {
            Some(Lexeme {
                token,
                line,
                offset: start,
            })
        };
        match bytes[start] {
            b'(' => {
                self.pos += 1;
                single(Token::OpenParen)
            }
            b')' => {
                self.pos += 1;
                single(Token::CloseParen)
            }
            b'{' => {
                self.pos += 1;
                single(Token::OpenBrace)
            }
            b'}' => {
                self.pos += 1;
                single(Token::CloseBrace)
            }
            b'"' => {
                // Unterminated strings end at the line break
                let body = start + 1;
                let mut end = body;
                while end < bytes.len() && bytes[end] != b'"' && bytes[end] != b'\n' {
                    end += 1;
                }
                self.pos = if bytes.get(end) == Some(&b'"') {
                    end + 1
                } else {
                    end
                };
                single(Token::Quoted(&src[body..end]))
            }
            _ => {
                let mut end = start;
                while end < bytes.len()
                    && !bytes[end].is_ascii_whitespace()
                    && !matches!(bytes[end], b'(' | b')' | b'{' | b'}' | b'"')
                {
                    end += 1;
                }
                self.pos = end;
                single(Token::Word(&src[start..end]))
            }
        }
    }

    /// Consume the next token, which must equal `expected`
    pub fn expect(&mut self, expected: Token<'_>, context: &'static str) -> Result<()> {
        match self.next_token() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(BakeError::format(
                self.line(),
                format!(
                    "expected {} {}, found {}",
                    expected.describe(),
                    context,
                    token.describe()
                ),
            )),
            None => Err(BakeError::UnexpectedEof { expected: context }),
        }
    }

    pub fn keyword(&mut self, keyword: &'static str) -> Result<()> {
        self.expect(Token::Word(keyword), keyword)
    }

    /// Consume a bare word
    pub fn word(&mut self, what: &'static str) -> Result<&'a str> {
        match self.next_token() {
            Some(Token::Word(w)) => Ok(w),
            Some(token) => Err(BakeError::format(
                self.line(),
                format!("expected {}, found {}", what, token.describe()),
            )),
            None => Err(BakeError::UnexpectedEof { expected: what }),
        }
    }

    /// Consume a quoted string
    pub fn quoted(&mut self, what: &'static str) -> Result<&'a str> {
        match self.next_token() {
            Some(Token::Quoted(q)) => Ok(q),
            Some(token) => Err(BakeError::format(
                self.line(),
                format!("expected quoted {}, found {}", what, token.describe()),
            )),
            None => Err(BakeError::UnexpectedEof { expected: what }),
        }
    }

    /// Scan a numeric field without deciding what a bad value means
    pub fn scan<T: FromStr>(&mut self) -> Scan<'a, T> {
        match self.peek() {
            Some(Token::Word(w)) => {
                self.next_token();
                match w.parse() {
                    Ok(v) => Scan::Value(v),
                    Err(_) => Scan::Malformed(w),
                }
            }
            _ => Scan::Missing,
        }
    }

    /// Scan a finite float; `inf` and `NaN` count as malformed
    pub fn scan_float(&mut self) -> Scan<'a, f32> {
        let word = match self.peek() {
            Some(Token::Word(w)) => w,
            _ => return Scan::Missing,
        };
        match self.scan::<f32>() {
            Scan::Value(v) if !v.is_finite() => Scan::Malformed(word),
            other => other,
        }
    }

    pub fn int(&mut self, field: &'static str) -> Result<i64> {
        let scan = self.scan::<i64>();
        scan.required(field, self.line())
    }

    /// Non-negative integer (counts and indices)
    pub fn count(&mut self, field: &'static str) -> Result<usize> {
        let scan = self.scan::<usize>();
        scan.required(field, self.line())
    }

    pub fn float(&mut self, field: &'static str) -> Result<f32> {
        let scan = self.scan_float();
        scan.required(field, self.line())
    }

    /// `( x y )`
    pub fn vec2(&mut self, field: &'static str) -> Result<Vec2> {
        self.expect(Token::OpenParen, field)?;
        let v = Vec2::new(self.float(field)?, self.float(field)?);
        self.expect(Token::CloseParen, field)?;
        Ok(v)
    }

    /// `( x y z )`
    pub fn vec3(&mut self, field: &'static str) -> Result<Vec3> {
        self.expect(Token::OpenParen, field)?;
        let v = Vec3::new(self.float(field)?, self.float(field)?, self.float(field)?);
        self.expect(Token::CloseParen, field)?;
        Ok(v)
    }

    /// `MD5Version <n>` header, which must open every document
    pub fn version(&mut self) -> Result<()> {
        self.keyword("MD5Version")?;
        let found = self.int("MD5Version")?;
        if found != MD5_VERSION {
            return Err(BakeError::UnsupportedVersion { found });
        }
        Ok(())
    }

    /// Consume a count and check it equals an index we already know
    pub fn index(&mut self, field: &'static str, expected: usize) -> Result<()> {
        let found = self.count(field)?;
        if found != expected {
            return Err(BakeError::format(
                self.line(),
                format!("{} {} out of order, expected {}", field, found, expected),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_and_comments() {
        let mut lexer = Lexer::new("joints {\n\t\"origin\"\t-1 ( 0 1.5 -2 ) // comment ( }\n}");
        assert_eq!(lexer.next_token(), Some(Token::Word("joints")));
        assert_eq!(lexer.next_token(), Some(Token::OpenBrace));
        assert_eq!(lexer.next_token(), Some(Token::Quoted("origin")));
        assert_eq!(lexer.line(), 2);
        assert_eq!(lexer.int("parent").unwrap(), -1);
        assert_eq!(lexer.vec3("pos").unwrap(), Vec3::new(0.0, 1.5, -2.0));
        assert_eq!(lexer.next_token(), Some(Token::CloseBrace));
        assert_eq!(lexer.line(), 3);
        assert_eq!(lexer.next_token(), None);
    }

    #[test]
    fn test_parens_without_spaces() {
        let mut lexer = Lexer::new("(0.5 0.25)");
        assert_eq!(lexer.vec2("uv").unwrap(), Vec2::new(0.5, 0.25));
    }

    #[test]
    fn test_scan_variants() {
        let mut lexer = Lexer::new("12 abc }");
        assert_eq!(lexer.scan::<i64>(), Scan::Value(12));
        assert_eq!(lexer.scan::<i64>(), Scan::Malformed("abc"));
        assert_eq!(lexer.scan::<i64>(), Scan::Missing);
        // Missing does not consume
        assert_eq!(lexer.next_token(), Some(Token::CloseBrace));
        assert_eq!(lexer.scan::<f32>(), Scan::Missing);
    }

    #[test]
    fn test_malformed_number_error() {
        let mut lexer = Lexer::new("\n\n1.0x");
        let err = lexer.float("bias").unwrap_err();
        match err {
            BakeError::MalformedNumber { line, field, found } => {
                assert_eq!(line, 3);
                assert_eq!(field, "bias");
                assert_eq!(found, "1.0x");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_is_error() {
        for word in ["inf", "-inf", "NaN", "infinity"] {
            let mut lexer = Lexer::new(word);
            assert!(
                matches!(
                    lexer.float("weight position"),
                    Err(BakeError::MalformedNumber { .. })
                ),
                "{} accepted",
                word
            );
        }
        let mut lexer = Lexer::new("1e3 -0.5");
        assert_eq!(lexer.scan_float(), Scan::Value(1000.0));
        assert_eq!(lexer.scan_float(), Scan::Value(-0.5));
        assert_eq!(lexer.scan_float(), Scan::Missing);
    }

    #[test]
    fn test_token_offsets() {
        let src = "MD5Version 10\ncommandline \"x\" // (\n{";
        let mut lexer = Lexer::new(src);
        lexer.next_token();
        assert_eq!(lexer.offset(), 0);
        lexer.next_token();
        assert_eq!(lexer.offset(), 11);
        lexer.next_token();
        assert_eq!(lexer.offset(), 14);
        assert_eq!(lexer.next_token(), Some(Token::Quoted("x")));
        assert_eq!(lexer.offset(), 26);
        assert_eq!(lexer.peek(), Some(Token::OpenBrace));
        assert_eq!(&src[lexer.offset()..], "{");
    }

    #[test]
    fn test_unterminated_quote_stops_at_line_end() {
        let mut lexer = Lexer::new("\"abc\nnext");
        assert_eq!(lexer.next_token(), Some(Token::Quoted("abc")));
        assert_eq!(lexer.next_token(), Some(Token::Word("next")));
    }

    #[test]
    fn test_version() {
        assert!(Lexer::new("MD5Version 10").version().is_ok());
        assert!(matches!(
            Lexer::new("MD5Version 6").version(),
            Err(BakeError::UnsupportedVersion { found: 6 })
        ));
        assert!(matches!(
            Lexer::new("numJoints 2").version(),
            Err(BakeError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn test_index_out_of_order() {
        let mut lexer = Lexer::new("3");
        assert!(matches!(
            lexer.index("vert", 2),
            Err(BakeError::Format { .. })
        ));
    }
}
