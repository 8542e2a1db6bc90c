//! Expression descriptor and discharge helpers.
//!
//! Grounded in `luars::compiler::{expdesc::ExpDesc, exp2reg, binop, code}`:
//! rather than building an expression tree, the parser keeps one `ExpDesc`
//! "in flight" per subexpression and discharges it into a register (or a
//! conditional jump list, for boolean contexts) exactly when the surrounding
//! grammar production needs a concrete value. This is what lets the whole
//! front end skip materializing an AST (spec.md §1, §3 "single-pass").

use crate::compiler::func_state::FuncState;
use crate::error::CangjieResult;
use crate::interner::{Interner, Sym};
use crate::opcode::{Instruction, OpCode};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum ExpKind {
    Nil,
    True,
    False,
    Int(i64),
    Float(f64),
    Str(Sym),
    /// Value already sitting in a local variable's register.
    Local(u8),
    /// Value captured from an enclosing function.
    Upval(u8),
    /// Value not yet computed: index into the constant pool for a global
    /// name, resolved through `__cangjie_*` global lookup at runtime.
    Global(Sym),
    /// Result of an indexing expression `t[k]` / `t.k`, not yet read.
    Indexed { table: u8, key: IndexKey },
    /// Value already computed and sitting in a register (a "relocatable" or
    /// pinned value, collapsing Lua's VRELOC/VNONRELOC distinction since this
    /// crate doesn't need the extra reuse optimization).
    Reg(u8),
    /// Outcome of a comparison or boolean combinator: not a value yet, just
    /// two patch lists (true-jumps, false-jumps) to resolve once the
    /// surrounding context (if/while condition vs. boolean value) is known.
    Jump { true_jumps: Vec<usize>, false_jumps: Vec<usize> },
    /// Result of a call still sitting as a pending multi-return at the top
    /// of the register stack.
    Call(u8),
    Vararg(u8),
}

#[derive(Debug, Clone)]
pub enum IndexKey {
    Const(u32),
    Reg(u8),
}

#[derive(Debug, Clone)]
pub struct ExpDesc {
    pub kind: ExpKind,
    pub line: u32,
}

impl ExpDesc {
    pub fn new(kind: ExpKind, line: u32) -> Self {
        ExpDesc { kind, line }
    }

    pub fn is_multi_ret(&self) -> bool {
        matches!(self.kind, ExpKind::Call(_) | ExpKind::Vararg(_))
    }
}

/// Discharge an `ExpDesc` into a specific register, emitting whatever load
/// instruction the value needs. Mirrors `luaK_exp2reg`/`luaK_dischargevars`.
pub fn discharge_to_reg(fs: &mut FuncState, interner: &Interner, e: &ExpDesc, reg: u8) -> CangjieResult<()> {
    let line = e.line;
    match &e.kind {
        ExpKind::Nil => {
            fs.emit_abc(OpCode::LoadNil, reg as u32, 0, 0, line);
        }
        ExpKind::True => {
            fs.emit_abc(OpCode::LoadBool, reg as u32, 1, 0, line);
        }
        ExpKind::False => {
            fs.emit_abc(OpCode::LoadBool, reg as u32, 0, 0, line);
        }
        ExpKind::Int(v) => {
            let k = fs.add_constant(Value::Int(*v), line)?;
            fs.emit(Instruction::abx(OpCode::LoadK, reg as u32, k), line);
        }
        ExpKind::Float(v) => {
            let k = fs.add_constant(Value::Float(*v), line)?;
            fs.emit(Instruction::abx(OpCode::LoadK, reg as u32, k), line);
        }
        ExpKind::Str(sym) => {
            let k = fs.add_constant(Value::Str(std::rc::Rc::new(interner.resolve(*sym).to_string())), line)?;
            fs.emit(Instruction::abx(OpCode::LoadK, reg as u32, k), line);
        }
        ExpKind::Local(src) => {
            if *src != reg {
                fs.emit_abc(OpCode::Move, reg as u32, *src as u32, 0, line);
            }
        }
        ExpKind::Upval(idx) => {
            fs.emit_abc(OpCode::GetUpval, reg as u32, *idx as u32, 0, line);
        }
        ExpKind::Global(sym) => {
            let k = fs.add_constant(Value::Str(std::rc::Rc::new(interner.resolve(*sym).to_string())), line)?;
            fs.emit(Instruction::abx(OpCode::GetGlobal, reg as u32, k), line);
        }
        ExpKind::Indexed { table, key } => match key {
            IndexKey::Const(k) => {
                fs.emit_abc(OpCode::GetField, reg as u32, *table as u32, *k, line);
            }
            IndexKey::Reg(kr) => {
                fs.emit_abc(OpCode::GetTable, reg as u32, *table as u32, *kr as u32, line);
            }
        },
        ExpKind::Reg(src) => {
            if *src != reg {
                fs.emit_abc(OpCode::Move, reg as u32, *src as u32, 0, line);
            }
        }
        ExpKind::Call(src) | ExpKind::Vararg(src) => {
            if *src != reg {
                fs.emit_abc(OpCode::Move, reg as u32, *src as u32, 0, line);
            }
        }
        ExpKind::Jump { true_jumps, false_jumps } => {
            // Materialize a boolean: jump-if-true over a LOADBOOL false,
            // then a LOADBOOL true, patching both jump lists to the
            // instruction that sets the matching boolean.
            let to_true = fs.emit_jump(line);
            let false_target = fs.code_len();
            for &j in false_jumps {
                fs.patch_jump_to(j, false_target);
            }
            fs.emit_abc(OpCode::LoadBool, reg as u32, 0, 1, line);
            let skip = fs.emit_jump(line);
            fs.patch_jump_here(to_true);
            fs.emit_abc(OpCode::LoadBool, reg as u32, 1, 0, line);
            fs.patch_jump_here(skip);
            for &j in true_jumps {
                fs.patch_jump_here(j);
            }
        }
    }
    Ok(())
}

/// Discharge into a fresh register and return it, advancing `freereg`.
pub fn discharge_to_any_reg(fs: &mut FuncState, interner: &Interner, e: &ExpDesc) -> CangjieResult<u8> {
    if let ExpKind::Local(r) = e.kind {
        return Ok(r);
    }
    let reg = fs.reserve_regs(1, e.line)?;
    discharge_to_reg(fs, interner, e, reg)?;
    Ok(reg)
}

/// Emit the comparison opcode for a binary relational operator, producing a
/// `Jump` ExpDesc (the two-register compare-then-conditional-jump pattern
/// every register VM with a Lua-style ISA uses).
pub fn emit_compare(fs: &mut FuncState, op: OpCode, invert: bool, a: u8, b: u8, line: u32) -> ExpDesc {
    fs.emit_abc(op, if invert { 0 } else { 1 }, a as u32, b as u32, line);
    let jump = fs.emit_jump(line);
    ExpDesc::new(
        ExpKind::Jump {
            true_jumps: vec![jump],
            false_jumps: vec![],
        },
        line,
    )
}

pub fn emit_arith(fs: &mut FuncState, op: OpCode, a: u8, b: u8, line: u32) -> CangjieResult<ExpDesc> {
    let dst = fs.reserve_regs(1, line)?;
    fs.emit_abc(op, dst as u32, a as u32, b as u32, line);
    Ok(ExpDesc::new(ExpKind::Reg(dst), line))
}
