//! Token kinds and payloads.
//!
//! Grounded in `luars::compiler::parser::lua_token_kind::LuaTokenKind`: a
//! flat, `repr(u16)` enum covering keywords, punctuation and literals, with
//! the reserved-word / operator set widened to Cangjie surface syntax per
//! spec.md §3.1.

use crate::interner::Sym;

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u16)]
pub enum TokenKind {
    // Reserved words
    KwBreak,
    KwCase,
    KwClass,
    KwContinue,
    KwElse,
    KwEnum,
    KwExtend,
    KwFalse,
    KwFor,
    KwFunc,
    KwIf,
    KwIn,
    KwInterface,
    KwLet,
    KwMatch,
    KwNil,
    KwReturn,
    KwStruct,
    KwSuper,
    KwThis,
    KwTrue,
    KwVar,
    KwWhile,
    KwStatic,
    KwOperator,
    KwInit,

    // Multi-char operators
    Concat,      // ..
    ConcatEq,    // ..=
    Ellipsis,    // ...
    EqEq,        // ==
    Ge,          // >=
    Le,          // <=
    Ne,          // !=
    Shl,         // <<
    Shr,         // >>
    ColonColon,  // ::
    FatArrow,    // =>
    LArrow,      // <-
    AndAnd,      // &&
    OrOr,        // ||
    Bang,        // !
    Pow,         // **
    Coalesce,    // ??
    PlusEq,      // +=
    MinusEq,     // -=
    StarEq,      // *=
    SlashEq,     // /=

    // Single-char punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Lt,
    Gt,
    Eq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,
    Question,
    Hash,

    // Literals
    Int(i64),
    Float(f64),
    /// Complete, non-interpolated string literal.
    Str(Sym),
    /// `"prefix${` — the part before the first interpolation hole.
    InterpHead(Sym),
    /// `}mid${` — between two interpolation holes.
    InterpMid(Sym),
    /// `}suffix"` — the part after the last interpolation hole.
    InterpTail(Sym),
    Ident(Sym),

    Eof,
}

impl TokenKind {
    pub fn is_reserved_word(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KwBreak
                | KwCase
                | KwClass
                | KwContinue
                | KwElse
                | KwEnum
                | KwExtend
                | KwFalse
                | KwFor
                | KwFunc
                | KwIf
                | KwIn
                | KwInterface
                | KwLet
                | KwMatch
                | KwNil
                | KwReturn
                | KwStruct
                | KwSuper
                | KwThis
                | KwTrue
                | KwVar
                | KwWhile
                | KwStatic
                | KwOperator
                | KwInit
        )
    }

    pub fn keyword_from_str(name: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match name {
            "break" => KwBreak,
            "case" => KwCase,
            "class" => KwClass,
            "continue" => KwContinue,
            "else" => KwElse,
            "enum" => KwEnum,
            "extend" => KwExtend,
            "false" => KwFalse,
            "for" => KwFor,
            "func" => KwFunc,
            "if" => KwIf,
            "in" => KwIn,
            "interface" => KwInterface,
            "let" => KwLet,
            "match" => KwMatch,
            "nil" => KwNil,
            "return" => KwReturn,
            "struct" => KwStruct,
            "super" => KwSuper,
            "this" => KwThis,
            "true" => KwTrue,
            "var" => KwVar,
            "while" => KwWhile,
            "static" => KwStatic,
            "operator" => KwOperator,
            "init" => KwInit,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Token { kind, line }
    }
}
