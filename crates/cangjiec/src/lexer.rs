//! Byte-stream lexer.
//!
//! Grounded in `luars::compiler::parser::lua_tokenize::LuaTokenize`: a
//! hand-rolled, allocation-light scanner that switches on the current byte
//! and bumps a cursor, rather than building a DFA or pulling in a regex
//! crate. Numeral scanning (the state machine over Int/Float/Hex/HexFloat/
//! WithExpo) and the long-string/line-comment handling follow that file's
//! shape directly; string-literal escapes and `${...}` interpolation are new
//! surface (spec.md §4.A) layered on the same cursor.

use crate::error::{CangjieError, CangjieResult, CompileError};
use crate::interner::{Interner, Sym};
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    chunk_name: String,
    /// Count of currently-open `${...}` interpolation holes (spec.md §3.2).
    pub interp_depth: u32,
}

const MAX_TOKEN_LEN: usize = 1 << 20;

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, chunk_name: &str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            chunk_name: chunk_name.to_string(),
            interp_depth: 0,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn err(&self, kind: CangjieError, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, &self.chunk_name, self.line, message)
    }

    fn cur(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn bump(&mut self) -> u8 {
        let b = self.cur();
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
        b
    }

    fn newline(&mut self) {
        let first = self.bump();
        let second = self.cur();
        if (first == b'\n' && second == b'\r') || (first == b'\r' && second == b'\n') {
            self.bump();
        }
        self.line += 1;
    }

    fn skip_trivia(&mut self) -> CangjieResult<()> {
        loop {
            match self.cur() {
                b' ' | b'\t' | 0x0B | 0x0C => {
                    self.bump();
                }
                b'\n' | b'\r' => self.newline(),
                b'/' if self.peek(1) == b'/' => {
                    self.bump();
                    self.bump();
                    while !self.is_eof() && self.cur() != b'\n' && self.cur() != b'\r' {
                        self.bump();
                    }
                }
                b'/' if self.peek(1) == b'*' => {
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> CangjieResult<()> {
        let open_line = self.line;
        self.bump();
        self.bump();
        let mut depth = 1usize;
        loop {
            if self.is_eof() {
                return Err(self
                    .err(CangjieError::Lexical, "unfinished block comment")
                    .to_close('*', open_line));
            }
            match (self.cur(), self.peek(1)) {
                (b'/', b'*') => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                (b'*', b'/') => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                (b'\n', _) | (b'\r', _) => self.newline(),
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Advance to and return the next token. Call repeatedly to drive the
    /// parser's single lookahead slot (spec.md §3.3).
    pub fn next_token(&mut self, interner: &mut Interner) -> CangjieResult<Token> {
        self.skip_trivia()?;
        let line = self.line;
        if self.is_eof() {
            return Ok(Token::new(TokenKind::Eof, line));
        }

        let kind = match self.cur() {
            b'+' => {
                self.bump();
                if self.cur() == b'=' {
                    self.bump();
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                self.bump();
                if self.cur() == b'=' {
                    self.bump();
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                self.bump();
                match self.cur() {
                    b'*' => {
                        self.bump();
                        TokenKind::Pow
                    }
                    b'=' => {
                        self.bump();
                        TokenKind::StarEq
                    }
                    _ => TokenKind::Star,
                }
            }
            b'/' => {
                self.bump();
                if self.cur() == b'=' {
                    self.bump();
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                self.bump();
                TokenKind::Percent
            }
            b'&' => {
                self.bump();
                if self.cur() == b'&' {
                    self.bump();
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            b'|' => {
                self.bump();
                if self.cur() == b'|' {
                    self.bump();
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                self.bump();
                TokenKind::Caret
            }
            b'~' => {
                self.bump();
                TokenKind::Tilde
            }
            b'<' => {
                self.bump();
                match self.cur() {
                    b'=' => {
                        self.bump();
                        TokenKind::Le
                    }
                    b'<' => {
                        self.bump();
                        TokenKind::Shl
                    }
                    b'-' => {
                        self.bump();
                        TokenKind::LArrow
                    }
                    _ => TokenKind::Lt,
                }
            }
            b'>' => {
                self.bump();
                match self.cur() {
                    b'=' => {
                        self.bump();
                        TokenKind::Ge
                    }
                    b'>' => {
                        self.bump();
                        TokenKind::Shr
                    }
                    _ => TokenKind::Gt,
                }
            }
            b'=' => {
                self.bump();
                match self.cur() {
                    b'=' => {
                        self.bump();
                        TokenKind::EqEq
                    }
                    b'>' => {
                        self.bump();
                        TokenKind::FatArrow
                    }
                    _ => TokenKind::Eq,
                }
            }
            b'!' => {
                self.bump();
                if self.cur() == b'=' {
                    self.bump();
                    TokenKind::Ne
                } else {
                    TokenKind::Bang
                }
            }
            b'?' => {
                self.bump();
                if self.cur() == b'?' {
                    self.bump();
                    TokenKind::Coalesce
                } else {
                    TokenKind::Question
                }
            }
            b':' => {
                self.bump();
                if self.cur() == b':' {
                    self.bump();
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            b'(' => {
                self.bump();
                TokenKind::LParen
            }
            b')' => {
                self.bump();
                TokenKind::RParen
            }
            b'[' => {
                self.bump();
                TokenKind::LBracket
            }
            b']' => {
                self.bump();
                TokenKind::RBracket
            }
            b'{' => {
                self.bump();
                TokenKind::LBrace
            }
            b'}' => {
                self.bump();
                TokenKind::RBrace
            }
            b',' => {
                self.bump();
                TokenKind::Comma
            }
            b';' => {
                self.bump();
                TokenKind::Semi
            }
            b'#' => {
                self.bump();
                TokenKind::Hash
            }
            b'.' => {
                if self.peek(1).is_ascii_digit() {
                    self.lex_number()?
                } else {
                    self.bump();
                    if self.cur() == b'.' {
                        self.bump();
                        if self.cur() == b'.' {
                            self.bump();
                            TokenKind::Ellipsis
                        } else if self.cur() == b'=' {
                            self.bump();
                            TokenKind::ConcatEq
                        } else {
                            TokenKind::Concat
                        }
                    } else {
                        TokenKind::Dot
                    }
                }
            }
            b'0'..=b'9' => self.lex_number()?,
            b'"' | b'\'' => {
                let quote = self.bump();
                let (text, hit_interp) = self.lex_string_body(quote)?;
                let sym = interner.intern(&text);
                if hit_interp {
                    self.interp_depth += 1;
                    TokenKind::InterpHead(sym)
                } else {
                    TokenKind::Str(sym)
                }
            }
            b if is_ident_start(b) => {
                let start = self.pos;
                self.bump();
                while is_ident_continue(self.cur()) {
                    self.bump();
                }
                let text = &self.src[start..self.pos];
                if text.len() > MAX_TOKEN_LEN {
                    return Err(self.err(CangjieError::Lexical, "lexical element too long"));
                }
                match TokenKind::keyword_from_str(text) {
                    Some(kw) => kw,
                    None => TokenKind::Ident(interner.intern(text)),
                }
            }
            other => {
                self.bump();
                return Err(self.err(
                    CangjieError::Lexical,
                    format!("unexpected symbol near '{}'", other as char),
                ));
            }
        };

        Ok(Token::new(kind, line))
    }

    /// Re-entry point invoked by the parser right after it has consumed the
    /// expression inside a `${...}` hole and sees the closing `}`: resumes
    /// lexing the string tail (spec.md §3.2).
    pub fn continue_interpolated_string(
        &mut self,
        quote: u8,
        interner: &mut Interner,
    ) -> CangjieResult<Token> {
        let line = self.line;
        let (text, hit_interp) = self.lex_string_body(quote)?;
        let sym = interner.intern(&text);
        let kind = if hit_interp {
            TokenKind::InterpMid(sym)
        } else {
            self.interp_depth = self.interp_depth.saturating_sub(1);
            TokenKind::InterpTail(sym)
        };
        Ok(Token::new(kind, line))
    }

    /// Scans string content up to (and consuming) either the matching quote
    /// or a `${` marker. Returns the unescaped text and whether it stopped
    /// at `${`.
    fn lex_string_body(&mut self, quote: u8) -> CangjieResult<(String, bool)> {
        let start_line = self.line;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            if self.is_eof() {
                return Err(self
                    .err(CangjieError::Lexical, "unfinished string")
                    .to_close(quote as char, start_line));
            }
            let b = self.cur();
            if b == quote {
                self.bump();
                return Ok((to_string(buf), false));
            }
            if b == b'\n' || b == b'\r' {
                return Err(self.err(CangjieError::Lexical, "unfinished string"));
            }
            if b == b'$' && self.peek(1) == b'{' {
                self.bump();
                self.bump();
                return Ok((to_string(buf), true));
            }
            if b != b'\\' {
                buf.push(b);
                self.bump();
                continue;
            }
            self.bump(); // consume backslash
            self.lex_escape(&mut buf)?;
            if buf.len() > MAX_TOKEN_LEN {
                return Err(self.err(CangjieError::Lexical, "lexical element too long"));
            }
        }
    }

    fn lex_escape(&mut self, buf: &mut Vec<u8>) -> CangjieResult<()> {
        match self.cur() {
            b'a' => {
                self.bump();
                buf.push(0x07);
            }
            b'b' => {
                self.bump();
                buf.push(0x08);
            }
            b'f' => {
                self.bump();
                buf.push(0x0C);
            }
            b'n' => {
                self.bump();
                buf.push(b'\n');
            }
            b'r' => {
                self.bump();
                buf.push(b'\r');
            }
            b't' => {
                self.bump();
                buf.push(b'\t');
            }
            b'v' => {
                self.bump();
                buf.push(0x0B);
            }
            b'\\' => {
                self.bump();
                buf.push(b'\\');
            }
            b'"' => {
                self.bump();
                buf.push(b'"');
            }
            b'\'' => {
                self.bump();
                buf.push(b'\'');
            }
            b'z' => {
                self.bump();
                loop {
                    match self.cur() {
                        b' ' | b'\t' | 0x0B | 0x0C => {
                            self.bump();
                        }
                        b'\n' | b'\r' => self.newline(),
                        _ => break,
                    }
                }
            }
            b'x' => {
                self.bump();
                let hi = self.cur();
                if !hi.is_ascii_hexdigit() {
                    return Err(self.err(CangjieError::Lexical, "hexadecimal digit expected"));
                }
                self.bump();
                let lo = self.cur();
                if !lo.is_ascii_hexdigit() {
                    return Err(self.err(CangjieError::Lexical, "hexadecimal digit expected"));
                }
                self.bump();
                let hex = [hi, lo].map(|b| b as char).iter().collect::<String>();
                let value = u8::from_str_radix(&hex, 16).unwrap();
                buf.push(value);
            }
            b'u' => {
                self.bump();
                if self.cur() != b'{' {
                    return Err(self.err(CangjieError::Lexical, "missing '{' in unicode escape"));
                }
                self.bump();
                let mut hex = String::new();
                while self.cur() != b'}' {
                    if self.is_eof() || self.cur() == b'\n' || self.cur() == b'\r' {
                        return Err(self.err(CangjieError::Lexical, "unfinished unicode escape"));
                    }
                    if !self.cur().is_ascii_hexdigit() {
                        return Err(self.err(
                            CangjieError::Lexical,
                            "hexadecimal digit expected in unicode escape",
                        ));
                    }
                    hex.push(self.cur() as char);
                    self.bump();
                }
                self.bump(); // consume '}'
                if hex.is_empty() {
                    return Err(self.err(
                        CangjieError::Lexical,
                        "hexadecimal digit expected in unicode escape",
                    ));
                }
                let cp = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.err(CangjieError::Lexical, "UTF-8 value too large"))?;
                let ch = char::from_u32(cp)
                    .ok_or_else(|| self.err(CangjieError::Lexical, "UTF-8 value too large"))?;
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
            }
            b'0'..=b'9' => {
                let mut digits = String::new();
                for _ in 0..3 {
                    if self.cur().is_ascii_digit() {
                        digits.push(self.cur() as char);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let value: u16 = digits.parse().unwrap_or(256);
                if value > 255 {
                    return Err(self.err(CangjieError::Lexical, "decimal escape too large"));
                }
                buf.push(value as u8);
            }
            other => {
                return Err(self.err(
                    CangjieError::Lexical,
                    format!("invalid escape sequence '\\{}'", other as char),
                ));
            }
        }
        Ok(())
    }

    fn lex_number(&mut self) -> CangjieResult<TokenKind> {
        let start = self.pos;
        let mut is_hex = false;
        let mut is_float = false;

        if self.cur() == b'0' && matches!(self.peek(1), b'x' | b'X') {
            self.bump();
            self.bump();
            is_hex = true;
        }

        let digit = |b: u8, hex: bool| -> bool {
            if hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        };

        while digit(self.cur(), is_hex) {
            self.bump();
        }

        if self.cur() == b'.' {
            let next = self.peek(1);
            let exp_marker = if is_hex { b'p' } else { b'e' };
            let consume_dot = if next == b'.' {
                false
            } else if digit(next, is_hex) {
                true
            } else if next.to_ascii_lowercase() == exp_marker {
                matches!(self.peek(2), b'0'..=b'9' | b'+' | b'-')
            } else if next.is_ascii_alphabetic() {
                false
            } else {
                true
            };
            if consume_dot {
                self.bump();
                is_float = true;
                while digit(self.cur(), is_hex) {
                    self.bump();
                }
            }
        }

        let exp_chars: [u8; 2] = if is_hex { [b'p', b'P'] } else { [b'e', b'E'] };
        if exp_chars.contains(&self.cur()) {
            self.bump();
            if matches!(self.cur(), b'+' | b'-') {
                self.bump();
            }
            if !self.cur().is_ascii_digit() {
                return Err(self.err(CangjieError::Lexical, "malformed number"));
            }
            while self.cur().is_ascii_digit() {
                self.bump();
            }
            is_float = true;
        }

        if self.cur().is_ascii_alphabetic() || self.cur() == b'_' {
            return Err(self.err(CangjieError::Lexical, "malformed number"));
        }

        let text = &self.src[start..self.pos];
        if is_float {
            let parsed: f64 = if is_hex {
                parse_hex_float(text).ok_or_else(|| self.err(CangjieError::Lexical, "malformed number"))?
            } else {
                text.parse()
                    .map_err(|_| self.err(CangjieError::Lexical, "malformed number"))?
            };
            Ok(TokenKind::Float(parsed))
        } else if is_hex {
            let digits = &text[2..];
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.err(CangjieError::Lexical, "malformed number"))?;
            Ok(TokenKind::Int(value as i64))
        } else {
            match text.parse::<i64>() {
                Ok(v) => Ok(TokenKind::Int(v)),
                Err(_) => Ok(TokenKind::Float(
                    text.parse()
                        .map_err(|_| self.err(CangjieError::Lexical, "malformed number"))?,
                )),
            }
        }
    }
}

fn to_string(buf: Vec<u8>) -> String {
    String::from_utf8(buf).expect("string literal content is valid utf-8 by construction")
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Minimal hex-float parser: `0x1.8p3` style literals (mantissa in base 16,
/// exponent is a power of two).
fn parse_hex_float(text: &str) -> Option<f64> {
    let body = &text[2..]; // strip "0x"/"0X"
    let (mantissa, exp) = match body.find(['p', 'P']) {
        Some(idx) => (&body[..idx], body[idx + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };
    let mut value = 0f64;
    for c in int_part.chars() {
        value = value * 16.0 + c.to_digit(16)? as f64;
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += c.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    Some(value * 2f64.powi(exp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(src, "test");
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token(&mut interner).expect("lex ok");
            let eof = matches!(tok.kind, TokenKind::Eof);
            out.push(tok.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn skips_line_and_block_comments() {
        let toks = tokens("1 // comment\n/* block\ncomment */2");
        assert!(matches!(toks[0], TokenKind::Int(1)));
        assert!(matches!(toks[1], TokenKind::Int(2)));
    }

    #[test]
    fn nested_block_comments_track_depth() {
        let toks = tokens("/* outer /* inner */ still-comment */1");
        assert!(matches!(toks[0], TokenKind::Int(1)));
    }

    #[test]
    fn unterminated_block_comment_reports_opening_line() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("/* never closes", "test");
        let err = lexer.next_token(&mut interner).unwrap_err();
        assert_eq!(err.open_at, Some(('*', 1)));
    }

    #[test]
    fn multi_char_operators_are_distinct_tokens() {
        let toks = tokens("== >= <= != << >> :: => .. ..= ... && || ?? **");
        assert_eq!(
            toks,
            vec![
                TokenKind::EqEq,
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::Ne,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::ColonColon,
                TokenKind::FatArrow,
                TokenKind::Concat,
                TokenKind::ConcatEq,
                TokenKind::Ellipsis,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Coalesce,
                TokenKind::Pow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dotted_number_then_method_call_does_not_eat_identifier() {
        // "1.even()" must lex as Int(1), Dot, Ident(even), (, )
        let toks = tokens("1.even()");
        assert!(matches!(toks[0], TokenKind::Int(1)));
        assert!(matches!(toks[1], TokenKind::Dot));
        assert!(matches!(toks[2], TokenKind::Ident(_)));
    }

    #[test]
    fn scientific_notation_after_dot_is_consumed_into_numeral() {
        let toks = tokens("1.5e2");
        assert!(matches!(toks[0], TokenKind::Float(f) if (f - 150.0).abs() < 1e-9));
    }

    #[test]
    fn range_operator_after_integer_is_not_part_of_numeral() {
        let toks = tokens("1..10");
        assert!(matches!(toks[0], TokenKind::Int(1)));
        assert!(matches!(toks[1], TokenKind::Concat));
        assert!(matches!(toks[2], TokenKind::Int(10)));
    }

    #[test]
    fn hex_integer_and_hex_float() {
        let toks = tokens("0xFF 0x1.8p1");
        assert!(matches!(toks[0], TokenKind::Int(255)));
        assert!(matches!(toks[1], TokenKind::Float(f) if (f - 3.0).abs() < 1e-9));
    }

    #[test]
    fn string_with_escapes() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(r#""a\tb\x41\u{1F600}""#, "test");
        let tok = lexer.next_token(&mut interner).unwrap();
        match tok.kind {
            TokenKind::Str(sym) => {
                let text = interner.resolve(sym);
                assert!(text.starts_with("a\tbA"));
                assert!(text.contains('\u{1F600}'));
            }
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn unescaped_newline_in_string_is_an_error() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("\"abc\ndef\"", "test");
        assert!(lexer.next_token(&mut interner).is_err());
    }

    #[test]
    fn interpolation_head_then_resume_tail() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(r#""a${e}b""#, "test");
        let head = lexer.next_token(&mut interner).unwrap();
        match head.kind {
            TokenKind::InterpHead(sym) => assert_eq!(interner.resolve(sym), "a"),
            other => panic!("expected interp head, got {other:?}"),
        }
        assert_eq!(lexer.interp_depth, 1);
        // parser would now lex `e` as an identifier, then `}` closes the hole
        let e = lexer.next_token(&mut interner).unwrap();
        assert!(matches!(e.kind, TokenKind::Ident(_)));
        let rbrace = lexer.next_token(&mut interner).unwrap();
        assert!(matches!(rbrace.kind, TokenKind::RBrace));
        let tail = lexer.continue_interpolated_string(b'"', &mut interner).unwrap();
        match tail.kind {
            TokenKind::InterpTail(sym) => assert_eq!(interner.resolve(sym), "b"),
            other => panic!("expected interp tail, got {other:?}"),
        }
        assert_eq!(lexer.interp_depth, 0);
    }

    #[test]
    fn single_and_double_quote_strings_are_synonyms() {
        let toks_d = tokens(r#""hi""#);
        let toks_s = tokens("'hi'");
        assert!(matches!(toks_d[0], TokenKind::Str(_)));
        assert!(matches!(toks_s[0], TokenKind::Str(_)));
    }
}
