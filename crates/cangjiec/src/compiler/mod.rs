//! Compiler entry point tying the lexer and parser together into the public
//! `compile`/`compile_with_options` API (spec.md §6.1).

pub mod decl;
pub mod expr;
pub mod func_state;
pub mod parser;
pub mod pattern;

use crate::error::CangjieResult;
use crate::value::FunctionProto;
use parser::Parser;
use std::rc::Rc;

/// Options controlling how a chunk is compiled. Grounded in
/// `luars::compiler::Compiler::CompileOption` (a handful of toggles plumbed
/// straight from the driver binary), widened with Cangjie-specific knobs.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name reported in error messages and embedded in the chunk's debug
    /// info, mirroring Lua's `@chunkname` convention.
    pub chunk_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { chunk_name: "chunk".to_string() }
    }
}

/// Compile Cangjie source into a top-level `FunctionProto`, the root of the
/// bytecode tree the target register VM would load and run. No AST is ever
/// materialized: `Parser` drives the lexer token-by-token and emits
/// instructions directly (spec.md §1, §3).
pub fn compile(source: &str) -> CangjieResult<Rc<FunctionProto>> {
    compile_with_options(source, CompileOptions::default())
}

pub fn compile_with_options(source: &str, options: CompileOptions) -> CangjieResult<Rc<FunctionProto>> {
    let mut parser = Parser::new(source, &options.chunk_name)?;
    parser.parse_chunk()?;
    let top = parser.funcs.pop().expect("top-level FuncState always present");
    Ok(Rc::new(FunctionProto {
        name: None,
        num_params: top.num_params,
        is_vararg: top.is_vararg,
        code: top.code,
        constants: top.constants,
        param_names: top.param_names,
        upvalue_names: top.upvalues.iter().map(|u| u.name).collect(),
        nested: Vec::new(),
    }))
}
