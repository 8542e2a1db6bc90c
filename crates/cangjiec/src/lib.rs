//! Single-pass lexer, parser and register-VM bytecode emitter for the
//! Cangjie-flavored scripting language this crate targets.
//!
//! The pipeline never builds an AST: [`compiler::parser::Parser`] drives
//! [`lexer::Lexer`] token-by-token and emits [`opcode::Instruction`]s
//! directly into a [`compiler::func_state::FuncState`], mirroring the
//! teacher's `luars::compiler` single-pass design (spec.md §1, §3). The
//! target register VM — its interpreter loop, opcode execution and GC — is
//! entirely out of scope; this crate only emits a wire-compatible chunk
//! (spec.md §6.2).

pub mod compiler;
pub mod error;
pub mod interner;
pub mod lexer;
pub mod opcode;
pub mod runtime;
pub mod token;
pub mod value;

#[cfg(test)]
mod test;

pub use compiler::{compile, compile_with_options, CompileOptions};
pub use error::{CangjieError, CangjieResult, CompileError};
pub use value::{FunctionProto, Table, Value};
