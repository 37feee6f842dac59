//! Tokenizer with inline `#file`/`#define` directive handling and a
//! single-token macro table, grounded on the original `lexer.c`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, HResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Int(i64),
    Char(i64),
    Str(String),
    Ident(String),

    Fn,
    Return,
    If,
    Else,
    While,
    For,
    In,
    Struct,
    Syscall,
    SizeOf,
    IntType,
    CharType,
    PtrType,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    DotDot,

    Assign,
    Plus,
    Inc,
    Minus,
    Star,
    Slash,
    Pipe,
    Amp,
    AmpAmp,
    PipePipe,
    Eq,
    NotEq,
    Lt,
    Gt,
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub file: Rc<str>,
    pub line: u32,
    pub col: u32,
    /// Byte offset of the token's first byte into the preprocessed buffer.
    pub offset: usize,
}

/// A substitutable macro body: everything the lexer can emit as a single
/// token, minus location (the call site's location always wins).
#[derive(Debug, Clone, PartialEq, Eq)]
enum MacroBody {
    Int(i64),
    Char(i64),
    Str(String),
    Ident(String),
}

pub struct Lexer {
    bytes: Vec<u8>,
    pos: usize,
    line: u32,
    col: u32,
    file: Rc<str>,
    macros: HashMap<String, MacroBody>,
}

impl Lexer {
    pub fn new(source: &str, file: impl Into<Rc<str>>) -> Self {
        Lexer {
            bytes: source.as_bytes().to_vec(),
            pos: 0,
            line: 1,
            col: 1,
            file: file.into(),
            macros: HashMap::new(),
        }
    }

    fn peek_byte(&self) -> u8 {
        self.byte_at(self.pos)
    }

    fn byte_at(&self, idx: usize) -> u8 {
        *self.bytes.get(idx).unwrap_or(&0)
    }

    fn bump(&mut self) -> u8 {
        let b = self.peek_byte();
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        b
    }

    fn error(&self, line: u32, col: u32, offset: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(crate::ast::SourceLoc::new(self.file.clone(), line, col, offset), message)
    }

    fn token(&self, kind: TokenKind, line: u32, col: u32, offset: usize) -> Token {
        Token { kind, file: self.file.clone(), line, col, offset }
    }

    /// Saves and restores all cursor fields so `peek` never consumes state.
    pub fn peek(&mut self) -> HResult<Token> {
        let saved_pos = self.pos;
        let saved_line = self.line;
        let saved_col = self.col;
        let saved_file = self.file.clone();
        let tok = self.advance()?;
        self.pos = saved_pos;
        self.line = saved_line;
        self.col = saved_col;
        self.file = saved_file;
        Ok(tok)
    }

    pub fn advance(&mut self) -> HResult<Token> {
        loop {
            while matches!(self.peek_byte(), b' ' | b'\t' | b'\r' | b'\n') && self.pos < self.bytes.len() {
                self.bump();
            }

            let start_line = self.line;
            let start_col = self.col;
            let start_offset = self.pos;

            if self.pos >= self.bytes.len() {
                return Ok(self.token(TokenKind::Eof, start_line, start_col, start_offset));
            }

            let c = self.peek_byte();

            if c.is_ascii_alphabetic() || c == b'_' {
                let mut buf = Vec::new();
                while self.peek_byte().is_ascii_alphanumeric() || self.peek_byte() == b'_' {
                    buf.push(self.bump());
                }
                let name = String::from_utf8(buf).unwrap();
                let kind = match name.as_str() {
                    "fn" => TokenKind::Fn,
                    "return" => TokenKind::Return,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "for" => TokenKind::For,
                    "in" => TokenKind::In,
                    "struct" => TokenKind::Struct,
                    "syscall" => TokenKind::Syscall,
                    "sizeof" => TokenKind::SizeOf,
                    "int" => TokenKind::IntType,
                    "char" => TokenKind::CharType,
                    "ptr" => TokenKind::PtrType,
                    _ => TokenKind::Ident(name.clone()),
                };

                if let Some(body) = self.macros.get(&name) {
                    let substituted = match body {
                        MacroBody::Int(v) => TokenKind::Int(*v),
                        MacroBody::Char(v) => TokenKind::Char(*v),
                        MacroBody::Str(s) => TokenKind::Str(s.clone()),
                        MacroBody::Ident(s) => TokenKind::Ident(s.clone()),
                    };
                    return Ok(self.token(substituted, start_line, start_col, start_offset));
                }

                return Ok(self.token(kind, start_line, start_col, start_offset));
            }

            if c.is_ascii_digit() {
                let mut value: i64 = 0;
                while self.peek_byte().is_ascii_digit() {
                    value = value * 10 + (self.bump() - b'0') as i64;
                }
                return Ok(self.token(TokenKind::Int(value), start_line, start_col, start_offset));
            }

            macro_rules! single {
                ($kind:expr) => {{
                    self.bump();
                    return Ok(self.token($kind, start_line, start_col, start_offset));
                }};
            }

            match c {
                b'(' => single!(TokenKind::LParen),
                b')' => single!(TokenKind::RParen),
                b'{' => single!(TokenKind::LBrace),
                b'}' => single!(TokenKind::RBrace),
                b'[' => single!(TokenKind::LBracket),
                b']' => single!(TokenKind::RBracket),
                b',' => single!(TokenKind::Comma),
                b';' => single!(TokenKind::Semi),
                b':' => single!(TokenKind::Colon),
                b'*' => single!(TokenKind::Star),
                b'.' => {
                    if self.byte_at(self.pos + 1) == b'.' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::DotDot, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Dot)
                }
                b'|' => {
                    if self.byte_at(self.pos + 1) == b'|' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::PipePipe, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Pipe)
                }
                b'&' => {
                    if self.byte_at(self.pos + 1) == b'&' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::AmpAmp, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Amp)
                }
                b'/' => {
                    if self.byte_at(self.pos + 1) == b'/' {
                        while self.pos < self.bytes.len() && self.peek_byte() != b'\n' {
                            self.bump();
                        }
                        continue;
                    }
                    single!(TokenKind::Slash)
                }
                b'-' => {
                    if self.byte_at(self.pos + 1) == b'>' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::Arrow, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Minus)
                }
                b'+' => {
                    if self.byte_at(self.pos + 1) == b'+' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::Inc, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Plus)
                }
                b'=' => {
                    if self.byte_at(self.pos + 1) == b'=' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::Eq, start_line, start_col, start_offset));
                    }
                    single!(TokenKind::Assign)
                }
                b'!' => {
                    if self.byte_at(self.pos + 1) == b'=' {
                        self.bump();
                        self.bump();
                        return Ok(self.token(TokenKind::NotEq, start_line, start_col, start_offset));
                    }
                    return Err(self.error(start_line, start_col, start_offset, "expected '!='"));
                }
                b'<' => single!(TokenKind::Lt),
                b'>' => single!(TokenKind::Gt),
                b'"' => {
                    self.bump();
                    let mut buf = String::new();
                    loop {
                        if self.pos >= self.bytes.len() {
                            return Err(self.error(start_line, start_col, start_offset, "unterminated string literal"));
                        }
                        if self.peek_byte() == b'"' {
                            break;
                        }
                        if self.peek_byte() == b'\\' && self.byte_at(self.pos + 1) == b'n' {
                            buf.push('\\');
                            buf.push('n');
                            self.bump();
                            self.bump();
                        } else {
                            buf.push(self.bump() as char);
                        }
                    }
                    self.bump();
                    return Ok(self.token(TokenKind::Str(buf), start_line, start_col, start_offset));
                }
                b'\'' => {
                    self.bump();
                    if self.peek_byte() == b'\'' {
                        return Err(self.error(start_line, start_col, start_offset, "empty character literal"));
                    }
                    let value: i64 = if self.peek_byte() == b'\\' {
                        self.bump();
                        let escape = self.bump();
                        match escape {
                            b'n' => 10,
                            b't' => 9,
                            b'0' => 0,
                            b'\\' => 92,
                            b'\'' => 39,
                            _ => return Err(self.error(start_line, start_col, start_offset, "unknown escape sequence")),
                        }
                    } else {
                        self.bump() as i64
                    };
                    if self.peek_byte() != b'\'' {
                        return Err(self.error(start_line, start_col, start_offset, "expected closing '\''"));
                    }
                    self.bump();
                    return Ok(self.token(TokenKind::Char(value), start_line, start_col, start_offset));
                }
                b'#' => {
                    self.bump();
                    while self.peek_byte() != b'\n' && self.pos < self.bytes.len() && self.peek_byte().is_ascii_whitespace() {
                        self.bump();
                    }
                    if self.bytes[self.pos..].starts_with(b"file") {
                        self.pos += 4;
                        self.col += 4;
                        while self.peek_byte() != b'"' && self.peek_byte() != b'\n' && self.pos < self.bytes.len() {
                            self.bump();
                        }
                        if self.peek_byte() == b'"' {
                            self.bump();
                            let mut name = String::new();
                            while self.peek_byte() != b'"' && self.pos < self.bytes.len() {
                                name.push(self.bump() as char);
                            }
                            self.bump();
                            self.file = Rc::from(name);
                        }
                        while !self.peek_byte().is_ascii_digit() && self.peek_byte() != b'\n' && self.pos < self.bytes.len() {
                            self.bump();
                        }
                        if self.peek_byte().is_ascii_digit() {
                            let mut num: i64 = 0;
                            while self.peek_byte().is_ascii_digit() {
                                num = num * 10 + (self.bump() - b'0') as i64;
                            }
                            self.line = (num - 1).max(0) as u32;
                        }
                        while self.peek_byte() != b'\n' && self.pos < self.bytes.len() {
                            self.bump();
                        }
                        continue;
                    }
                    if self.bytes[self.pos..].starts_with(b"define") {
                        self.pos += 6;
                        self.col += 6;
                        while self.peek_byte().is_ascii_whitespace() && self.pos < self.bytes.len() {
                            self.bump();
                        }
                        let mut name = String::new();
                        while self.peek_byte().is_ascii_alphanumeric() || self.peek_byte() == b'_' {
                            name.push(self.bump() as char);
                        }
                        let value = self.advance()?;
                        let body = match value.kind {
                            TokenKind::Minus => {
                                let next = self.advance()?;
                                match next.kind {
                                    TokenKind::Int(v) => MacroBody::Int(-v),
                                    _ => {
                                        return Err(self.error(
                                            start_line,
                                            start_col,
                                            start_offset,
                                            "macros must be single tokens or negative integers",
                                        ))
                                    }
                                }
                            }
                            TokenKind::Int(v) => MacroBody::Int(v),
                            TokenKind::Char(v) => MacroBody::Char(v),
                            TokenKind::Str(s) => MacroBody::Str(s),
                            TokenKind::Ident(s) => MacroBody::Ident(s),
                            _ => {
                                return Err(self.error(
                                    start_line,
                                    start_col,
                                    start_offset,
                                    "macros must be single tokens or negative integers",
                                ))
                            }
                        };
                        self.macros.insert(name, body);
                        continue;
                    }
                    while self.peek_byte() != b'\n' && self.pos < self.bytes.len() {
                        self.bump();
                    }
                    continue;
                }
                _ => return Err(self.error(start_line, start_col, start_offset, "unknown character")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lx = Lexer::new(src, "t.hel");
        let mut out = Vec::new();
        loop {
            let tok = lx.advance().unwrap();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_keywords_and_operators() {
        let ks = kinds("fn main() -> int { return 1 + 2; }");
        assert_eq!(ks[0], TokenKind::Fn);
        assert!(ks.contains(&TokenKind::Arrow));
        assert!(ks.contains(&TokenKind::Plus));
    }

    #[test]
    fn string_literal_preserves_backslash_n_as_two_chars() {
        let ks = kinds("\"a\\nb\"");
        assert_eq!(ks[0], TokenKind::Str("a\\nb".to_string()));
    }

    #[test]
    fn char_literal_escapes() {
        assert_eq!(kinds("'\\n'")[0], TokenKind::Char(10));
        assert_eq!(kinds("'A'")[0], TokenKind::Char(65));
    }

    #[test]
    fn define_macro_substitutes_negative_int() {
        let mut lx = Lexer::new("#define N -5\nN", "t.hel");
        let tok = lx.advance().unwrap();
        assert_eq!(tok.kind, TokenKind::Int(-5));
    }

    #[test]
    fn file_directive_retargets_filename_and_line() {
        let mut lx = Lexer::new("#file \"b.hel\" 10\nx", "a.hel");
        let tok = lx.advance().unwrap();
        assert_eq!(&*tok.file, "b.hel");
        assert_eq!(tok.line, 10);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lx = Lexer::new("1 2", "t.hel");
        let peeked = lx.peek().unwrap();
        assert_eq!(peeked.kind, TokenKind::Int(1));
        let advanced = lx.advance().unwrap();
        assert_eq!(advanced.kind, TokenKind::Int(1));
        let next = lx.advance().unwrap();
        assert_eq!(next.kind, TokenKind::Int(2));
    }

    #[test]
    fn comment_is_skipped() {
        let ks = kinds("1 // two\n2");
        assert_eq!(ks, vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_bang_is_an_error() {
        let mut lx = Lexer::new("!x", "t.hel");
        assert!(lx.advance().is_err());
    }
}
