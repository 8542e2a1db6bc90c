//! Compile-time error taxonomy.
//!
//! Grounded in `luars::lua_vm::lua_error::{LuaError, LuaFullError}`: a cheap
//! `Copy` kind tag plus a richer, `Display`-able value that carries the
//! human-readable message. Every failing path in this crate raises one of
//! these instead of panicking (spec.md §7).

use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CangjieError {
    Lexical,
    Syntax,
    TooManyLocals,
    TooManyUpvalues,
    TooManyConstants,
    Redefinition,
    ReadOnlyAssignment,
    BreakOutsideLoop,
    UnsupportedExtend,
}

impl fmt::Display for CangjieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CangjieError::Lexical => "lexical error",
            CangjieError::Syntax => "syntax error",
            CangjieError::TooManyLocals => "too many local variables",
            CangjieError::TooManyUpvalues => "too many upvalues",
            CangjieError::TooManyConstants => "too many constants",
            CangjieError::Redefinition => "redefinition",
            CangjieError::ReadOnlyAssignment => "assignment to read-only variable",
            CangjieError::BreakOutsideLoop => "break/continue outside loop",
            CangjieError::UnsupportedExtend => "unsupported extend target",
        };
        write!(f, "{s}")
    }
}

/// The value actually propagated out of `compile`/`compile_with_options`.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: CangjieError,
    pub chunk_name: SmolStr,
    pub line: u32,
    pub message: String,
    pub near: Option<String>,
    /// Line the mismatched opening delimiter was found at, for messages like
    /// `'}' expected (to close '{' at line N)`.
    pub open_at: Option<(char, u32)>,
}

impl CompileError {
    pub fn new(kind: CangjieError, chunk_name: &str, line: u32, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            chunk_name: SmolStr::new(chunk_name),
            line,
            message: message.into(),
            near: None,
            open_at: None,
        }
    }

    pub fn near(mut self, token_text: impl Into<String>) -> Self {
        self.near = Some(token_text.into());
        self
    }

    pub fn to_close(mut self, open_char: char, open_line: u32) -> Self {
        self.open_at = Some((open_char, open_line));
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.chunk_name, self.line, self.message)?;
        if let Some(near) = &self.near {
            write!(f, " near '{near}'")?;
        }
        if let Some((ch, line)) = self.open_at {
            write!(f, " (to close '{ch}' at line {line})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

pub type CangjieResult<T> = Result<T, CompileError>;
