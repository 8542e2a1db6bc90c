//! Per-function compile state: register allocator, active-variable list,
//! block chain and emitted code.
//!
//! Grounded in `luars::compiler::func_state::FuncState` (the direct analogue
//! of Lua's `FuncState` in `lparser.c`/`lcode.c`): `freereg`/`nactvar`
//! register bookkeeping, a `BlockCnt` chain for break/continue scoping, and a
//! flat `code`/`lines` pair instead of a tree. spec.md §8.1 requires
//! `freereg == nactvar` at every statement boundary; every codegen helper
//! here is written to preserve that invariant rather than check it after the
//! fact.

use crate::error::{CangjieError, CangjieResult, CompileError};
use crate::interner::Sym;
use crate::opcode::{Instruction, OpCode};
use crate::value::Value;

pub const MAX_LOCALS: usize = 200;
pub const MAX_UPVALUES: usize = 255;
pub const MAX_CONSTANTS: usize = 1 << 18;

#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: Sym,
    pub register: u8,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct UpvalDesc {
    pub name: Sym,
    pub in_stack: bool,
    pub index: u8,
}

/// One nested lexical block. `is_loop` gates `break`/`continue`; pending
/// jumps to patch at block exit live in `break_jumps`/`continue_jumps`.
pub struct BlockCnt {
    pub is_loop: bool,
    pub nactvar_at_entry: usize,
    pub break_jumps: Vec<usize>,
    pub continue_jumps: Vec<usize>,
    pub label: Option<Sym>,
}

pub struct FuncState {
    pub chunk_name: String,
    pub code: Vec<Instruction>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
    pub actvar: Vec<LocalVar>,
    pub upvalues: Vec<UpvalDesc>,
    pub blocks: Vec<BlockCnt>,
    pub freereg: u8,
    pub num_params: u8,
    pub is_vararg: bool,
    pub param_names: Vec<Sym>,
}

impl FuncState {
    pub fn new(chunk_name: &str) -> Self {
        FuncState {
            chunk_name: chunk_name.to_string(),
            code: Vec::new(),
            lines: Vec::new(),
            constants: Vec::new(),
            actvar: Vec::new(),
            upvalues: Vec::new(),
            blocks: Vec::new(),
            freereg: 0,
            num_params: 0,
            is_vararg: false,
            param_names: Vec::new(),
        }
    }

    pub fn nactvar(&self) -> usize {
        self.actvar.len()
    }

    fn err(&self, kind: CangjieError, line: u32, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, &self.chunk_name, line, message)
    }

    /// Reserve `n` consecutive free registers, asserting the
    /// `freereg == nactvar` invariant holds for whatever is already active.
    pub fn reserve_regs(&mut self, n: u8, line: u32) -> CangjieResult<u8> {
        let base = self.freereg;
        let new_top = base as usize + n as usize;
        if new_top > MAX_LOCALS {
            return Err(self.err(CangjieError::TooManyLocals, line, "too many local variables"));
        }
        self.freereg = new_top as u8;
        Ok(base)
    }

    /// Release registers back down to `to`, used when an expression's
    /// temporaries are no longer needed (e.g. after a binop discharges into
    /// one result register).
    pub fn free_to(&mut self, to: u8) {
        debug_assert!(to <= self.freereg);
        self.freereg = to;
    }

    pub fn emit(&mut self, ins: Instruction, line: u32) -> usize {
        self.code.push(ins);
        self.lines.push(line);
        self.code.len() - 1
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u32, b: u32, c: u32, line: u32) -> usize {
        self.emit(Instruction::abc(op, a, b, c), line)
    }

    pub fn emit_jump(&mut self, line: u32) -> usize {
        self.emit(Instruction::asbx(OpCode::Jmp, 0, 0), line)
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Patch a previously emitted jump to land at an arbitrary code position.
    pub fn patch_jump_to(&mut self, jump_pc: usize, target_pc: usize) {
        let offset = target_pc as i32 - jump_pc as i32 - 1;
        self.code[jump_pc] = Instruction::asbx(OpCode::Jmp, 0, offset);
    }

    /// Patch a previously emitted jump to land at the current code position.
    pub fn patch_jump_here(&mut self, jump_pc: usize) {
        self.patch_jump_to(jump_pc, self.code.len());
    }

    pub fn add_constant(&mut self, value: Value, line: u32) -> CangjieResult<u32> {
        // Constants aren't deduplicated by value equality here: `Value` holds
        // `Rc`/`f64` payloads that don't give a cheap total order the way
        // Lua's TValue does. Bytecode size is out of scope for this crate
        // (spec.md §1 Non-goals — no multi-pass optimization).
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(self.err(CangjieError::TooManyConstants, line, "too many constants"));
        }
        self.constants.push(value);
        Ok((self.constants.len() - 1) as u32)
    }

    /// Declare a new local bound to the next free register, advancing
    /// `nactvar`. Caller must have already reserved the register.
    pub fn new_local(&mut self, name: Sym, register: u8, read_only: bool, line: u32) -> CangjieResult<()> {
        if self.actvar.len() >= MAX_LOCALS {
            return Err(self.err(CangjieError::TooManyLocals, line, "too many local variables"));
        }
        self.actvar.push(LocalVar { name, register, read_only });
        Ok(())
    }

    pub fn resolve_local(&self, name: Sym) -> Option<&LocalVar> {
        self.actvar.iter().rev().find(|v| v.name == name)
    }

    pub fn enter_block(&mut self, is_loop: bool, label: Option<Sym>) {
        self.blocks.push(BlockCnt {
            is_loop,
            nactvar_at_entry: self.nactvar(),
            break_jumps: Vec::new(),
            continue_jumps: Vec::new(),
            label,
        });
    }

    /// Pop the innermost block, truncating locals declared inside it back to
    /// the scope's entry register and restoring `freereg == nactvar`
    /// (spec.md §8.1). Returns the block so its pending jumps can be patched.
    pub fn leave_block(&mut self) -> BlockCnt {
        let block = self.blocks.pop().expect("leave_block without matching enter_block");
        self.actvar.truncate(block.nactvar_at_entry);
        let reg = self
            .actvar
            .last()
            .map(|v| v.register + 1)
            .unwrap_or(self.num_params);
        self.freereg = reg;
        block
    }

    /// Innermost enclosing loop block, for `break`/`continue` target
    /// resolution (spec.md §4.D).
    pub fn innermost_loop(&self) -> Option<usize> {
        self.blocks.iter().rposition(|b| b.is_loop)
    }

    pub fn find_labeled_loop(&self, label: Sym) -> Option<usize> {
        self.blocks.iter().rposition(|b| b.is_loop && b.label == Some(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_exit_restores_freereg_to_nactvar() {
        let mut fs = FuncState::new("test");
        fs.enter_block(false, None);
        let r = fs.reserve_regs(2, 1).unwrap();
        fs.new_local(sym_for_test(1), r, false, 1).unwrap();
        fs.new_local(sym_for_test(2), r + 1, false, 1).unwrap();
        fs.leave_block();
        assert_eq!(fs.freereg as usize, fs.nactvar());
        assert_eq!(fs.freereg, 0);
    }

    #[test]
    fn find_labeled_loop_locates_the_matching_enclosing_loop() {
        let mut fs = FuncState::new("test");
        let outer = sym_for_test(1);
        let inner = sym_for_test(2);
        fs.enter_block(true, Some(outer));
        fs.enter_block(true, Some(inner));
        assert_eq!(fs.find_labeled_loop(outer), Some(0));
        assert_eq!(fs.find_labeled_loop(inner), Some(1));
        assert_eq!(fs.find_labeled_loop(sym_for_test(3)), None);
    }

    #[test]
    fn resolve_local_finds_most_recent_shadowing_declaration() {
        let mut fs = FuncState::new("test");
        let name = sym_for_test(5);
        let r0 = fs.reserve_regs(1, 1).unwrap();
        fs.new_local(name, r0, false, 1).unwrap();
        let r1 = fs.reserve_regs(1, 1).unwrap();
        fs.new_local(name, r1, false, 1).unwrap();
        assert_eq!(fs.resolve_local(name).unwrap().register, r1);
    }

    // Tests only need *some* Sym value; construct one through the real
    // interner rather than poking at Sym's private repr.
    fn sym_for_test(n: u32) -> Sym {
        let mut interner = crate::interner::Interner::new();
        for i in 0..n {
            interner.intern(&format!("v{i}"));
        }
        interner.intern(&format!("v{n}"))
    }
}
