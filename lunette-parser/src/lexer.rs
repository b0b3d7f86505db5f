/// Single-pass lexer over raw source bytes.
use crate::ast::Span;
use crate::error::ParseError;
use crate::token::{keyword, Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn tokenize(source: &[u8]) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer {
            source,
            pos: 0,
            line: 1,
            col: 1,
        };
        lexer.skip_shebang();
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, sp: &Span) -> ParseError {
        ParseError::new(message, sp.line, sp.col)
    }

    fn skip_shebang(&mut self) {
        if self.peek() == Some(b'#') {
            while let Some(ch) = self.peek() {
                if ch == b'\n' {
                    break;
                }
                self.advance();
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c) => {
                    self.advance();
                }
                Some(b'-') if self.peek2() == Some(b'-') => {
                    let sp = self.span();
                    self.advance();
                    self.advance();
                    if self.peek() == Some(b'[') {
                        if let Some(level) = self.long_bracket_level() {
                            self.read_long_bracket(level, &sp, "comment")?;
                            continue;
                        }
                    }
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// At a `[`, returns the bracket level if a long bracket opens here.
    fn long_bracket_level(&self) -> Option<usize> {
        let mut i = self.pos + 1;
        let mut level = 0;
        while self.source.get(i) == Some(&b'=') {
            level += 1;
            i += 1;
        }
        (self.source.get(i) == Some(&b'[')).then_some(level)
    }

    fn read_long_bracket(
        &mut self,
        level: usize,
        start: &Span,
        what: &str,
    ) -> Result<Vec<u8>, ParseError> {
        // `[` `=`* `[`
        for _ in 0..level + 2 {
            self.advance();
        }
        // A newline right after the opening bracket is skipped.
        if self.peek() == Some(b'\r') {
            self.advance();
        }
        if self.peek() == Some(b'\n') {
            self.advance();
        }

        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.error(format!("unfinished long {what}"), start));
                }
                Some(b']') => {
                    let mut i = self.pos + 1;
                    let mut eq = 0;
                    while self.source.get(i) == Some(&b'=') {
                        eq += 1;
                        i += 1;
                    }
                    if eq == level && self.source.get(i) == Some(&b']') {
                        for _ in 0..level + 2 {
                            self.advance();
                        }
                        return Ok(out);
                    }
                    out.push(self.advance());
                }
                Some(_) => out.push(self.advance()),
            }
        }
    }

    fn token(&self, kind: TokenKind, span: Span, lexeme: Vec<u8>) -> Token {
        Token { kind, span, lexeme }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments()?;

        let sp = self.span();

        let Some(ch) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, sp, Vec::new()));
        };

        if ch.is_ascii_digit() || (ch == b'.' && self.peek2().is_some_and(|c| c.is_ascii_digit()))
        {
            return self.lex_number(sp);
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.lex_ident(sp));
        }

        if ch == b'"' || ch == b'\'' {
            return self.lex_string(sp);
        }

        if ch == b'[' {
            if let Some(level) = self.long_bracket_level() {
                let bytes = self.read_long_bracket(level, &sp, "string")?;
                return Ok(self.token(TokenKind::StringLit, sp, bytes));
            }
        }

        self.advance();
        let kind = match ch {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Caret,
            b'#' => TokenKind::Hash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'=' => self.pick(b'=', TokenKind::Eq, TokenKind::Assign),
            b'<' => self.pick(b'=', TokenKind::Le, TokenKind::Lt),
            b'>' => self.pick(b'=', TokenKind::Ge, TokenKind::Gt),
            b'~' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Neq
                } else {
                    return Err(self.error("unexpected character `~`", &sp));
                }
            }
            b'.' => {
                if self.peek() == Some(b'.') {
                    self.advance();
                    if self.peek() == Some(b'.') {
                        self.advance();
                        TokenKind::Ellipsis
                    } else {
                        TokenKind::Concat
                    }
                } else {
                    TokenKind::Dot
                }
            }
            other => {
                return Err(self.error(
                    format!("unexpected character `{}`", (other as char).escape_default()),
                    &sp,
                ));
            }
        };
        let lexeme = self.source[self.pos - kind_len(kind)..self.pos].to_vec();
        Ok(self.token(kind, sp, lexeme))
    }

    fn pick(&mut self, next: u8, two: TokenKind, one: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            two
        } else {
            one
        }
    }

    fn lex_ident(&mut self, sp: Span) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        let kind = keyword(word).unwrap_or(TokenKind::Ident);
        self.token(kind, sp, word.to_vec())
    }

    fn lex_number(&mut self, sp: Span) -> Result<Token, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x' | b'X')) {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
        } else {
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() || ch == b'.' {
                    self.advance();
                } else if ch == b'e' || ch == b'E' {
                    self.advance();
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.advance();
                    }
                } else {
                    break;
                }
            }
        }
        // A number running straight into a name is malformed (`3x`).
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
                self.advance();
            }
            let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
            return Err(self.error(format!("malformed number near `{text}`"), &sp));
        }
        let lexeme = self.source[start..self.pos].to_vec();
        if parse_number_literal(&lexeme).is_none() {
            let text = String::from_utf8_lossy(&lexeme).into_owned();
            return Err(self.error(format!("malformed number near `{text}`"), &sp));
        }
        Ok(self.token(TokenKind::Number, sp, lexeme))
    }

    fn lex_string(&mut self, sp: Span) -> Result<Token, ParseError> {
        let quote = self.advance();
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.error("unfinished string", &sp));
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    self.lex_escape(&mut out, &sp)?;
                }
                Some(_) => out.push(self.advance()),
            }
        }
        Ok(self.token(TokenKind::StringLit, sp, out))
    }

    fn lex_escape(&mut self, out: &mut Vec<u8>, sp: &Span) -> Result<(), ParseError> {
        let Some(ch) = self.peek() else {
            return Err(self.error("unfinished string", sp));
        };
        match ch {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'"' | b'\'' | b'\n' => out.push(ch),
            b'x' => {
                self.advance();
                let mut value = 0u8;
                for _ in 0..2 {
                    let Some(d) = self.peek().and_then(|c| (c as char).to_digit(16)) else {
                        return Err(self.error("hexadecimal digit expected", sp));
                    };
                    value = value * 16 + d as u8;
                    self.advance();
                }
                out.push(value);
                return Ok(());
            }
            b'0'..=b'9' => {
                let mut value: u32 = 0;
                for _ in 0..3 {
                    match self.peek() {
                        Some(d @ b'0'..=b'9') => {
                            value = value * 10 + (d - b'0') as u32;
                            self.advance();
                        }
                        _ => break,
                    }
                }
                if value > 255 {
                    return Err(self.error("escape sequence too large", sp));
                }
                out.push(value as u8);
                return Ok(());
            }
            other => {
                return Err(self.error(
                    format!("invalid escape sequence `\\{}`", (other as char).escape_default()),
                    sp,
                ));
            }
        }
        self.advance();
        Ok(())
    }
}

fn kind_len(kind: TokenKind) -> usize {
    match kind {
        TokenKind::Eq | TokenKind::Neq | TokenKind::Le | TokenKind::Ge | TokenKind::Concat => 2,
        TokenKind::Ellipsis => 3,
        _ => 1,
    }
}

/// A numeric literal as written in source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberLit {
    Int(i64),
    Float(f64),
}

/// Decimal literals without a fraction or exponent become integers when
/// they fit; hex literals wrap around to `i64`.
pub fn parse_number_literal(text: &[u8]) -> Option<NumberLit> {
    let s = std::str::from_utf8(text).ok()?;
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        let mut acc: u64 = 0;
        for c in hex.chars() {
            acc = acc.wrapping_mul(16).wrapping_add(c.to_digit(16)? as u64);
        }
        return Some(NumberLit::Int(acc as i64));
    }
    if !s.contains(['.', 'e', 'E']) {
        if let Ok(i) = s.parse::<i64>() {
            return Some(NumberLit::Int(i));
        }
    }
    s.parse::<f64>().ok().map(NumberLit::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src.as_bytes())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a .. b ... ~= == <= #"),
            vec![
                TokenKind::Ident,
                TokenKind::Concat,
                TokenKind::Ident,
                TokenKind::Ellipsis,
                TokenKind::Neq,
                TokenKind::Eq,
                TokenKind::Le,
                TokenKind::Hash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("-- line\nx --[[ block\n comment ]] y --[==[ ]] ]==]"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        let toks = Lexer::tokenize(br#"'a\tb\65\x41\\'"#).unwrap();
        assert_eq!(toks[0].lexeme, b"a\tbAA\\");
    }

    #[test]
    fn test_long_string_skips_first_newline() {
        let toks = Lexer::tokenize(b"[==[\nhello ]] world]==]").unwrap();
        assert_eq!(toks[0].kind, TokenKind::StringLit);
        assert_eq!(toks[0].lexeme, b"hello ]] world");
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(parse_number_literal(b"42"), Some(NumberLit::Int(42)));
        assert_eq!(parse_number_literal(b"0x10"), Some(NumberLit::Int(16)));
        assert_eq!(parse_number_literal(b"1e2"), Some(NumberLit::Float(100.0)));
        assert_eq!(parse_number_literal(b".5"), Some(NumberLit::Float(0.5)));
        assert_eq!(
            parse_number_literal(b"99999999999999999999"),
            Some(NumberLit::Float(1e20))
        );
        assert_eq!(parse_number_literal(b"0x"), None);
    }

    #[test]
    fn test_unfinished_string_reports_position() {
        let err = Lexer::tokenize(b"x = \"abc\ny").unwrap_err();
        assert_eq!((err.line, err.col), (1, 5));
    }

    #[test]
    fn test_shebang_line() {
        assert_eq!(kinds("#!/usr/bin/lunette\nreturn"), vec![TokenKind::Return, TokenKind::Eof]);
    }
}
