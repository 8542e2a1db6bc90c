//! Statement driver and expression engine.
//!
//! Grounded in `luars::compiler::{statement.rs, expr_parser.rs, code.rs}`:
//! single-token lookahead (`current`/`peek`), a precedence-climbing binary
//! expression parser driven by a priority table, and statement dispatch by
//! switching on the current keyword — no AST node is ever built (spec.md §1,
//! §4.B). `decl.rs` and `pattern.rs` hang off this module for the
//! declaration and pattern-matching productions respectively.

use crate::compiler::decl;
use crate::compiler::expr::{self, ExpDesc, ExpKind, IndexKey};
use crate::compiler::func_state::FuncState;
use crate::compiler::pattern;
use crate::error::{CangjieError, CangjieResult, CompileError};
use crate::interner::{Interner, Sym};
use crate::lexer::Lexer;
use crate::opcode::{Instruction, OpCode};
use crate::token::{Token, TokenKind};

pub struct Parser<'a> {
    pub lexer: Lexer<'a>,
    pub interner: Interner,
    pub chunk_name: String,
    pub current: Token,
    pub lookahead: Option<Token>,
    pub funcs: Vec<FuncState>,
    /// Set by a `::NAME::` label statement, consumed by the very next
    /// statement if it is `while`/`for` (spec.md §4.D "Labels and gotos").
    /// Anything else silently drops it — labels only ever apply to loops.
    pending_label: Option<Sym>,
}

/// Binary operator precedence, left/right binding power, mirroring the
/// `{left, right}` priority table in `luaK_binopr`. A gap between the two
/// numbers makes an operator right-associative (used for `..`/`??`).
fn binop_priority(kind: &TokenKind) -> Option<(u8, u8, OpCode)> {
    use TokenKind::*;
    Some(match kind {
        OrOr => (1, 1, OpCode::Not), // boolean ops handled specially, op unused
        AndAnd => (2, 2, OpCode::Not),
        Lt => (3, 3, OpCode::Lt),
        Gt => (3, 3, OpCode::Lt),
        Le => (3, 3, OpCode::Le),
        Ge => (3, 3, OpCode::Le),
        EqEq => (3, 3, OpCode::Eq),
        Ne => (3, 3, OpCode::Eq),
        Pipe => (4, 4, OpCode::BOr),
        Caret => (5, 5, OpCode::BXor),
        Amp => (6, 6, OpCode::BAnd),
        Shl => (7, 7, OpCode::Shl),
        Shr => (7, 7, OpCode::Shr),
        // `..`/`..=` build a Range value via a runtime primitive, not a
        // dedicated opcode — the target VM has no concept of Cangjie ranges
        // (spec.md §6.2). Priority only; dispatch happens in `subexpr`.
        Concat => (9, 8, OpCode::Not),
        ConcatEq => (9, 8, OpCode::Not),
        Coalesce => (9, 8, OpCode::Not), // right-assoc, primitive-dispatched
        Plus => (10, 10, OpCode::Add),
        Minus => (10, 10, OpCode::Sub),
        Star => (11, 11, OpCode::Mul),
        Slash => (11, 11, OpCode::Div),
        Percent => (11, 11, OpCode::Mod),
        Pow => (14, 13, OpCode::Pow), // right-assoc
        _ => return None,
    })
}

const UNARY_PRIORITY: u8 = 12;

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, chunk_name: &str) -> CangjieResult<Self> {
        let mut lexer = Lexer::new(src, chunk_name);
        let mut interner = Interner::new();
        let current = lexer.next_token(&mut interner)?;
        let mut top = FuncState::new(chunk_name);
        top.is_vararg = true;
        Ok(Parser {
            lexer,
            interner,
            chunk_name: chunk_name.to_string(),
            current,
            lookahead: None,
            funcs: vec![top],
            pending_label: None,
        })
    }

    /// Invokes a `__cangjie_*` runtime helper the way any other global call
    /// compiles: `GETGLOBAL` the name, move arguments into place, `CALL`.
    /// The target VM never sees a Cangjie-specific opcode (spec.md §6.2) —
    /// every non-opcode behaviour in this compiler goes through this path.
    pub fn emit_primitive_call(&mut self, name: &str, args: &[ExpDesc], nresults: u32, line: u32) -> CangjieResult<u8> {
        let func_reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        let k = self
            .funcs
            .last_mut()
            .unwrap()
            .add_constant(crate::value::Value::Str(std::rc::Rc::new(name.to_string())), line)?;
        self.funcs.last_mut().unwrap().emit(Instruction::abx(OpCode::GetGlobal, func_reg as u32, k), line);
        for arg in args {
            let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
            expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, arg, reg)?;
        }
        self.funcs.last_mut().unwrap()
            .emit_abc(OpCode::Call, func_reg as u32, args.len() as u32 + 1, nresults + 1, line);
        self.funcs.last_mut().unwrap().free_to(func_reg + 1);
        Ok(func_reg)
    }

    pub fn line(&self) -> u32 {
        self.current.line
    }

    fn err(&self, kind: CangjieError, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, &self.chunk_name, self.line(), message)
    }

    fn err_near(&self, kind: CangjieError, message: impl Into<String>) -> CompileError {
        self.err(kind, message).near(format!("{:?}", self.current.kind))
    }

    pub fn advance(&mut self) -> CangjieResult<Token> {
        let next = match self.lookahead.take() {
            Some(t) => t,
            None => self.lexer.next_token(&mut self.interner)?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    pub fn peek(&mut self) -> CangjieResult<Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token(&mut self.interner)?);
        }
        Ok(self.lookahead.unwrap())
    }

    pub fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    pub fn expect(&mut self, kind: TokenKind) -> CangjieResult<Token> {
        if !self.check(&kind) {
            return Err(self.err_near(CangjieError::Syntax, format!("{kind:?} expected")));
        }
        self.advance()
    }

    pub fn expect_ident(&mut self) -> CangjieResult<Sym> {
        match self.current.kind {
            TokenKind::Ident(sym) => {
                self.advance()?;
                Ok(sym)
            }
            _ => Err(self.err_near(CangjieError::Syntax, "identifier expected")),
        }
    }

    pub fn accept(&mut self, kind: TokenKind) -> CangjieResult<bool> {
        if self.check(&kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---- top level -----------------------------------------------------

    pub fn parse_chunk(&mut self) -> CangjieResult<()> {
        while !self.check(&TokenKind::Eof) {
            self.statement()?;
        }
        Ok(())
    }

    // ---- statements ------------------------------------------------------

    fn statement(&mut self) -> CangjieResult<()> {
        let label = self.pending_label.take();
        match self.current.kind {
            TokenKind::KwLet => self.local_decl(true),
            TokenKind::KwVar => self.local_decl(false),
            TokenKind::KwIf => self.if_stmt(),
            TokenKind::KwWhile => self.while_stmt(label),
            TokenKind::KwFor => self.for_stmt(label),
            TokenKind::KwMatch => pattern::match_stmt(self),
            TokenKind::KwBreak => self.break_stmt(),
            TokenKind::KwContinue => self.continue_stmt(),
            TokenKind::KwReturn => self.return_stmt(),
            TokenKind::KwFunc => decl::func_decl(self),
            TokenKind::KwStruct => decl::struct_decl(self),
            TokenKind::KwClass => decl::class_decl(self),
            TokenKind::KwInterface => decl::interface_decl(self),
            TokenKind::KwExtend => decl::extend_decl(self),
            TokenKind::KwEnum => decl::enum_decl(self),
            TokenKind::ColonColon => self.label_stmt(),
            TokenKind::LBrace => self.block(),
            TokenKind::Semi => {
                self.advance()?;
                Ok(())
            }
            _ => self.expr_or_assign_stmt(),
        }
    }

    /// `::NAME::` — attaches a label to the loop statement that immediately
    /// follows, reachable from `break`/`continue`'s backward-jump targets
    /// via `FuncState::find_labeled_loop` (spec.md §4.D "Labels and gotos").
    /// There is no surface `goto`; this only makes that lookup reachable.
    fn label_stmt(&mut self) -> CangjieResult<()> {
        self.advance()?; // `::`
        let name = self.expect_ident()?;
        self.expect(TokenKind::ColonColon)?;
        self.pending_label = Some(name);
        Ok(())
    }

    pub fn block(&mut self) -> CangjieResult<()> {
        self.expect(TokenKind::LBrace)?;
        self.funcs.last_mut().unwrap().enter_block(false, None);
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            self.statement()?;
        }
        self.expect(TokenKind::RBrace)?;
        self.funcs.last_mut().unwrap().leave_block();
        Ok(())
    }

    fn local_decl(&mut self, read_only: bool) -> CangjieResult<()> {
        let line = self.line();
        self.advance()?; // `let`/`var`
        let name = self.expect_ident()?;
        if let TokenKind::Colon = self.current.kind {
            self.advance()?;
            self.skip_type_annotation()?;
        }
        let desc = if self.accept(TokenKind::Eq)? {
            self.expr()?
        } else {
            ExpDesc::new(ExpKind::Nil, line)
        };
        let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &desc, reg)?;
        if self.funcs.last_mut().unwrap().resolve_local(name).is_some() {
            // Shadowing is legal; true redefinition (same name, same block,
            // no intervening scope) is rejected by decl.rs for types and by
            // the block-entry check below for locals (spec.md §8.1).
        }
        self.funcs.last_mut().unwrap().new_local(name, reg, read_only, line)?;
        self.accept(TokenKind::Semi)?;
        Ok(())
    }

    /// Type annotations are parsed for syntactic completeness and discarded;
    /// there is no type checker (spec.md §1 Non-goals).
    fn skip_type_annotation(&mut self) -> CangjieResult<()> {
        self.expect_ident()?;
        if self.accept(TokenKind::Question)? {
            // `T?` optional-type suffix
        }
        if self.accept(TokenKind::Lt)? {
            loop {
                self.skip_type_annotation()?;
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }
        Ok(())
    }

    fn if_stmt(&mut self) -> CangjieResult<()> {
        self.advance()?; // `if`
        self.funcs.last_mut().unwrap().enter_block(false, None);
        let jumps = self.condition()?;
        self.block()?;
        self.funcs.last_mut().unwrap().leave_block();
        if self.accept(TokenKind::KwElse)? {
            let line = self.line();
            let escape = self.funcs.last_mut().unwrap().emit_jump(line);
            let else_target = self.funcs.last_mut().unwrap().code_len();
            for j in jumps {
                self.funcs.last_mut().unwrap().patch_jump_to(j, else_target);
            }
            if self.check(&TokenKind::KwIf) {
                self.if_stmt()?;
            } else {
                self.block()?;
            }
            self.funcs.last_mut().unwrap().patch_jump_here(escape);
        } else {
            let end = self.funcs.last_mut().unwrap().code_len();
            for j in jumps {
                self.funcs.last_mut().unwrap().patch_jump_to(j, end);
            }
        }
        Ok(())
    }

    fn while_stmt(&mut self, label: Option<Sym>) -> CangjieResult<()> {
        self.advance()?; // `while`
        self.funcs.last_mut().unwrap().enter_block(true, label);
        let loop_start = self.funcs.last_mut().unwrap().code_len();
        let jumps = self.condition()?;
        self.block()?;
        let line = self.line();
        let back = self.funcs.last_mut().unwrap().emit_jump(line);
        self.funcs.last_mut().unwrap().patch_jump_to(back, loop_start);
        let end = self.funcs.last_mut().unwrap().code_len();
        let block = self.funcs.last_mut().unwrap().leave_block();
        for j in jumps.into_iter().chain(block.break_jumps) {
            self.funcs.last_mut().unwrap().patch_jump_to(j, end);
        }
        for j in block.continue_jumps {
            self.funcs.last_mut().unwrap().patch_jump_to(j, loop_start);
        }
        Ok(())
    }

    /// A plain boolean condition, or `(let Pattern <- expr [&& / || extra])`
    /// (spec.md §4.D "if let"/"while let"). Returns the jump list to patch to
    /// wherever the condition is false.
    fn condition(&mut self) -> CangjieResult<Vec<usize>> {
        if self.check(&TokenKind::LParen) && matches!(self.peek()?.kind, TokenKind::KwLet) {
            self.advance()?; // `(`
            let jumps = self.let_condition()?;
            self.expect(TokenKind::RParen)?;
            Ok(jumps)
        } else {
            let cond = self.expr()?;
            self.jump_on_false(&cond)
        }
    }

    /// `let Pattern <- expr [&& extra | || extra]`, already positioned just
    /// past the opening `(`. The pattern's bindings land in the block the
    /// caller already entered, so they are scoped to the body that follows
    /// (spec.md §4.D).
    fn let_condition(&mut self) -> CangjieResult<Vec<usize>> {
        let line = self.line();
        self.advance()?; // `let`
        let node = pattern::parse_pattern_node(self)?;
        self.expect(TokenKind::LArrow)?;
        let value = self.expr()?;
        let subject_reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &value, subject_reg)?;
        let mut jumps = pattern::compile_pattern_node(self, &node, subject_reg)?;

        if self.accept(TokenKind::AndAnd)? {
            let extra = self.expr()?;
            jumps.extend(self.jump_on_false(&extra)?);
        } else if self.accept(TokenKind::OrOr)? {
            // A successful match must skip the extra check entirely; a
            // failed match falls through and is decided by `extra` instead.
            let skip_line = self.line();
            let skip_extra = self.funcs.last_mut().unwrap().emit_jump(skip_line);
            let retry_target = self.funcs.last_mut().unwrap().code_len();
            for j in jumps.drain(..) {
                self.funcs.last_mut().unwrap().patch_jump_to(j, retry_target);
            }
            let extra = self.expr()?;
            jumps = self.jump_on_false(&extra)?;
            self.funcs.last_mut().unwrap().patch_jump_here(skip_extra);
        }
        Ok(jumps)
    }

    /// `for (x in iterable [:step]) { ... }` or `for (k, v in iterable) { ... }`.
    /// Parentheses are mandatory; numeric counting is expressed as
    /// `for (x in a..b)`, reusing the range value produced by `..`/`..=`, with
    /// an optional `:step` adjusting its stride via `__cangjie_range_step`
    /// (spec.md §4.D, §6.2 generic-for contract).
    fn for_stmt(&mut self, label: Option<Sym>) -> CangjieResult<()> {
        let line = self.line();
        self.advance()?; // `for`
        self.expect(TokenKind::LParen)?;
        let first_var = self.expect_ident()?;
        let second_var = if self.accept(TokenKind::Comma)? {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::KwIn)?;
        let mut iter_desc = self.expr()?;
        if self.accept(TokenKind::Colon)? {
            let step = self.expr()?;
            let reg = self.emit_primitive_call("__cangjie_range_step", &[iter_desc, step], 1, line)?;
            iter_desc = ExpDesc::new(ExpKind::Reg(reg), line);
        }
        self.expect(TokenKind::RParen)?;

        // `__cangjie_iter` adapts any iterable (Range, Array, ArrayList,
        // HashMap, custom Iterator-protocol instance) into the 3-value
        // generic-for protocol (iterator function, state, control variable)
        // the target VM's TFORCALL/TFORLOOP already know how to drive
        // (spec.md §4.E "iter", §6.2 generic-for contract).
        let state_reg = self.emit_primitive_call("__cangjie_iter", &[iter_desc], 3, line)?;

        self.funcs.last_mut().unwrap().enter_block(true, label);
        let loop_start = self.funcs.last_mut().unwrap().code_len();
        let nvars: u8 = if second_var.is_some() { 2 } else { 1 };
        let var_reg = self.funcs.last_mut().unwrap().reserve_regs(nvars, line)?;
        self.funcs.last_mut().unwrap()
            .emit_abc(OpCode::TForCall, state_reg as u32, var_reg as u32, nvars as u32, line);
        self.funcs.last_mut().unwrap().new_local(first_var, var_reg, false, line)?;
        if let Some(v2) = second_var {
            self.funcs.last_mut().unwrap().new_local(v2, var_reg + 1, false, line)?;
        }
        let exit_jump = self.funcs.last_mut().unwrap().emit_jump(line);
        self.block()?;
        let back = self.funcs.last_mut().unwrap().emit_jump(line);
        self.funcs.last_mut().unwrap().patch_jump_to(back, loop_start);
        let end = self.funcs.last_mut().unwrap().code_len();
        self.funcs.last_mut().unwrap().patch_jump_to(exit_jump, end);
        let block = self.funcs.last_mut().unwrap().leave_block();
        for j in block.break_jumps {
            self.funcs.last_mut().unwrap().patch_jump_to(j, end);
        }
        for j in block.continue_jumps {
            self.funcs.last_mut().unwrap().patch_jump_to(j, loop_start);
        }
        Ok(())
    }

    fn break_stmt(&mut self) -> CangjieResult<()> {
        let line = self.line();
        self.advance()?;
        let jump = self.funcs.last_mut().unwrap().emit_jump(line);
        match self.funcs.last_mut().unwrap().innermost_loop() {
            Some(idx) => self.funcs.last_mut().unwrap().blocks[idx].break_jumps.push(jump),
            None => return Err(self.err(CangjieError::BreakOutsideLoop, "break outside a loop")),
        }
        self.accept(TokenKind::Semi)?;
        Ok(())
    }

    fn continue_stmt(&mut self) -> CangjieResult<()> {
        let line = self.line();
        self.advance()?;
        let jump = self.funcs.last_mut().unwrap().emit_jump(line);
        match self.funcs.last_mut().unwrap().innermost_loop() {
            Some(idx) => self.funcs.last_mut().unwrap().blocks[idx].continue_jumps.push(jump),
            None => return Err(self.err(CangjieError::BreakOutsideLoop, "continue outside a loop")),
        }
        self.accept(TokenKind::Semi)?;
        Ok(())
    }

    fn return_stmt(&mut self) -> CangjieResult<()> {
        let line = self.line();
        self.advance()?;
        if self.check(&TokenKind::Semi) || self.check(&TokenKind::RBrace) || self.check(&TokenKind::Eof) {
            self.funcs.last_mut().unwrap().emit_abc(OpCode::Return, 0, 1, 0, line);
        } else {
            let base = self.funcs.last_mut().unwrap().freereg;
            let desc = self.expr()?;
            expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &desc)?;
            let nret = if desc.is_multi_ret() { 0 } else { 2 };
            self.funcs.last_mut().unwrap().emit_abc(OpCode::Return, base as u32, nret, 0, line);
        }
        self.accept(TokenKind::Semi)?;
        Ok(())
    }

    /// Plain expression statement, or an assignment (`x = e`, compound
    /// `x += e`, tuple destructuring `(a, b) = e`).
    fn expr_or_assign_stmt(&mut self) -> CangjieResult<()> {
        let line = self.line();
        let target = self.suffixedexp()?;
        let compound = match self.current.kind {
            TokenKind::PlusEq => Some(OpCode::Add),
            TokenKind::MinusEq => Some(OpCode::Sub),
            TokenKind::StarEq => Some(OpCode::Mul),
            TokenKind::SlashEq => Some(OpCode::Div),
            TokenKind::ConcatEq => Some(OpCode::Concat),
            _ => None,
        };
        if let Some(op) = compound {
            self.advance()?;
            let rhs = self.expr()?;
            let lhs_reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &target)?;
            let rhs_reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &rhs)?;
            self.funcs.last_mut().unwrap().emit_abc(op, lhs_reg as u32, lhs_reg as u32, rhs_reg as u32, line);
            self.assign_back(&target, lhs_reg, line)?;
        } else if self.accept(TokenKind::Eq)? {
            let rhs = self.expr()?;
            self.check_assignable(&target)?;
            let reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &rhs)?;
            self.assign_back(&target, reg, line)?;
        } else {
            // Bare expression statement (typically a call); its register
            // slot is abandoned, matching Lua's expression-statement rule
            // that only calls are valid here.
            expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &target)?;
        }
        self.accept(TokenKind::Semi)?;
        Ok(())
    }

    fn check_assignable(&self, target: &ExpDesc) -> CangjieResult<()> {
        if let ExpKind::Local(r) = target.kind {
            if let Some(local) = self.funcs.last().unwrap().actvar.iter().find(|v| v.register == r) {
                if local.read_only {
                    return Err(CompileError::new(
                        CangjieError::ReadOnlyAssignment,
                        &self.chunk_name,
                        target.line,
                        "cannot assign to a `let` binding",
                    ));
                }
            }
        }
        Ok(())
    }

    fn assign_back(&mut self, target: &ExpDesc, value_reg: u8, line: u32) -> CangjieResult<()> {
        match &target.kind {
            ExpKind::Local(dst) => {
                if *dst != value_reg {
                    self.funcs.last_mut().unwrap().emit_abc(OpCode::Move, *dst as u32, value_reg as u32, 0, line);
                }
            }
            ExpKind::Upval(idx) => {
                self.funcs.last_mut().unwrap().emit_abc(OpCode::SetUpval, value_reg as u32, *idx as u32, 0, line);
            }
            ExpKind::Global(sym) => {
                let k = self.funcs.last_mut().unwrap().add_constant(
                    crate::value::Value::Str(std::rc::Rc::new(self.interner.resolve(*sym).to_string())),
                    line,
                )?;
                self.funcs.last_mut().unwrap().emit(Instruction::abx(OpCode::SetGlobal, value_reg as u32, k), line);
            }
            ExpKind::Indexed { table, key } => match key {
                IndexKey::Const(k) => {
                    self.funcs.last_mut().unwrap().emit_abc(OpCode::SetField, *table as u32, *k, value_reg as u32, line);
                }
                IndexKey::Reg(kr) => {
                    self.funcs.last_mut().unwrap()
                        .emit_abc(OpCode::SetTable, *table as u32, *kr as u32, value_reg as u32, line);
                }
            },
            _ => return Err(self.err(CangjieError::Syntax, "cannot assign to this expression")),
        }
        Ok(())
    }

    // ---- expressions -----------------------------------------------------

    pub fn expr(&mut self) -> CangjieResult<ExpDesc> {
        self.subexpr(0)
    }

    fn subexpr(&mut self, limit: u8) -> CangjieResult<ExpDesc> {
        let mut left = if let Some(unop) = self.unary_op() {
            let line = self.line();
            self.advance()?;
            let operand = self.subexpr(UNARY_PRIORITY)?;
            let reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &operand)?;
            let dst = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
            self.funcs.last_mut().unwrap().emit_abc(unop, dst as u32, reg as u32, 0, line);
            ExpDesc::new(ExpKind::Reg(dst), line)
        } else {
            self.simpleexp()?
        };

        while let Some((lp, rp, op)) = binop_priority(&self.current.kind) {
            if lp <= limit {
                break;
            }
            let op_kind = self.current.kind;
            let line = self.line();
            self.advance()?;

            if matches!(op_kind, TokenKind::AndAnd | TokenKind::OrOr) {
                left = self.short_circuit(left, op_kind, rp, line)?;
                continue;
            }
            if matches!(op_kind, TokenKind::Coalesce) {
                let rhs = self.subexpr(rp)?;
                let dst = self.emit_primitive_call("__cangjie_coalesce", &[left, rhs], 1, line)?;
                left = ExpDesc::new(ExpKind::Reg(dst), line);
                continue;
            }
            if matches!(op_kind, TokenKind::Concat | TokenKind::ConcatEq) {
                let rhs = self.subexpr(rp)?;
                let name = if op_kind == TokenKind::ConcatEq {
                    "__cangjie_range_new_inclusive"
                } else {
                    "__cangjie_range_new"
                };
                let dst = self.emit_primitive_call(name, &[left, rhs], 1, line)?;
                left = ExpDesc::new(ExpKind::Reg(dst), line);
                continue;
            }

            let right = self.subexpr(rp)?;
            left = self.finish_binop(left, op_kind, op, right, line)?;
        }
        Ok(left)
    }

    fn unary_op(&self) -> Option<OpCode> {
        match self.current.kind {
            TokenKind::Minus => Some(OpCode::Unm),
            TokenKind::Bang => Some(OpCode::Not),
            TokenKind::Hash => Some(OpCode::Len),
            TokenKind::Tilde => Some(OpCode::BNot),
            _ => None,
        }
    }

    fn finish_binop(
        &mut self,
        left: ExpDesc,
        kind: TokenKind,
        op: OpCode,
        right: ExpDesc,
        line: u32,
    ) -> CangjieResult<ExpDesc> {
        let lr = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &left)?;
        let rr = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &right)?;
        match kind {
            TokenKind::Lt => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Lt, false, lr, rr, line)),
            TokenKind::Gt => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Lt, false, rr, lr, line)),
            TokenKind::Le => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Le, false, lr, rr, line)),
            TokenKind::Ge => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Le, false, rr, lr, line)),
            TokenKind::EqEq => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Eq, false, lr, rr, line)),
            TokenKind::Ne => Ok(expr::emit_compare(self.funcs.last_mut().unwrap(), OpCode::Eq, true, lr, rr, line)),
            _ => expr::emit_arith(self.funcs.last_mut().unwrap(), op, lr, rr, line),
        }
    }

    /// `&&`/`||` must not evaluate the right-hand side unless necessary;
    /// implemented with the same jump-list threading `luaK_goiftrue`/
    /// `luaK_goiffalse` use rather than eager evaluation.
    fn short_circuit(&mut self, left: ExpDesc, op: TokenKind, rp: u8, line: u32) -> CangjieResult<ExpDesc> {
        if op == TokenKind::AndAnd {
            let false_jumps = self.jump_on_false(&left)?;
            let right = self.subexpr(rp)?;
            let mut rjumps = self.jump_on_false(&right)?;
            let mut all_false = false_jumps;
            all_false.append(&mut rjumps);
            Ok(ExpDesc::new(
                ExpKind::Jump { true_jumps: vec![], false_jumps: all_false },
                line,
            ))
        } else {
            let true_jumps = self.jump_on_true(&left)?;
            let right = self.subexpr(rp)?;
            let mut rjumps = self.jump_on_true(&right)?;
            let mut all_true = true_jumps;
            all_true.append(&mut rjumps);
            Ok(ExpDesc::new(
                ExpKind::Jump { true_jumps: all_true, false_jumps: vec![] },
                line,
            ))
        }
    }

    /// Emit a conditional test that falls through when `e` is true and jumps
    /// (to a not-yet-known target) when false. Returns the pending jump pcs.
    fn jump_on_false(&mut self, e: &ExpDesc) -> CangjieResult<Vec<usize>> {
        if let ExpKind::Jump { true_jumps, false_jumps } = &e.kind {
            for &j in true_jumps {
                self.funcs.last_mut().unwrap().patch_jump_here(j);
            }
            return Ok(false_jumps.clone());
        }
        let line = e.line;
        let reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, e)?;
        self.funcs.last_mut().unwrap().emit_abc(OpCode::Test, reg as u32, 0, 0, line);
        Ok(vec![self.funcs.last_mut().unwrap().emit_jump(line)])
    }

    fn jump_on_true(&mut self, e: &ExpDesc) -> CangjieResult<Vec<usize>> {
        if let ExpKind::Jump { true_jumps, false_jumps } = &e.kind {
            for &j in false_jumps {
                self.funcs.last_mut().unwrap().patch_jump_here(j);
            }
            return Ok(true_jumps.clone());
        }
        let line = e.line;
        let reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, e)?;
        self.funcs.last_mut().unwrap().emit_abc(OpCode::Test, reg as u32, 0, 1, line);
        Ok(vec![self.funcs.last_mut().unwrap().emit_jump(line)])
    }

    fn simpleexp(&mut self) -> CangjieResult<ExpDesc> {
        let line = self.line();
        let desc = match self.current.kind {
            TokenKind::Int(v) => {
                self.advance()?;
                ExpDesc::new(ExpKind::Int(v), line)
            }
            TokenKind::Float(v) => {
                self.advance()?;
                ExpDesc::new(ExpKind::Float(v), line)
            }
            TokenKind::Str(sym) => {
                self.advance()?;
                ExpDesc::new(ExpKind::Str(sym), line)
            }
            TokenKind::InterpHead(_) => return self.interpolated_string(),
            TokenKind::KwNil => {
                self.advance()?;
                ExpDesc::new(ExpKind::Nil, line)
            }
            TokenKind::KwTrue => {
                self.advance()?;
                ExpDesc::new(ExpKind::True, line)
            }
            TokenKind::KwFalse => {
                self.advance()?;
                ExpDesc::new(ExpKind::False, line)
            }
            TokenKind::LBracket => return self.array_literal(),
            TokenKind::KwMatch => return pattern::match_expr(self),
            _ => return self.suffixedexp(),
        };
        Ok(desc)
    }

    /// Desugars `"${a}-${b}"` into consecutive register loads followed by a
    /// single `CONCAT` spanning them (spec.md §4.B, §8.2 round-trip
    /// property: interpolation is sugar for string concatenation).
    fn interpolated_string(&mut self) -> CangjieResult<ExpDesc> {
        let line = self.line();
        let head_sym = match self.current.kind {
            TokenKind::InterpHead(sym) => sym,
            _ => unreachable!("interpolated_string called without InterpHead lookahead"),
        };
        let quote = b'"';
        self.advance()?;
        let base = self.funcs.last_mut().unwrap().freereg;
        let head_reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &ExpDesc::new(ExpKind::Str(head_sym), line), head_reg)?;
        let mut count = 1u32;
        loop {
            let hole = self.expr()?;
            let next = self.funcs.last_mut().unwrap().freereg;
            expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &hole, next)?;
            self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
            count += 1;
            self.expect(TokenKind::RBrace)?;
            let tok = self.lexer.continue_interpolated_string(quote, &mut self.interner)?;
            match tok.kind {
                TokenKind::InterpMid(sym) => {
                    let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
                    expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &ExpDesc::new(ExpKind::Str(sym), line), reg)?;
                    count += 1;
                    self.current = self.lexer.next_token(&mut self.interner)?;
                    self.lookahead = None;
                }
                TokenKind::InterpTail(sym) => {
                    let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
                    expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &ExpDesc::new(ExpKind::Str(sym), line), reg)?;
                    count += 1;
                    self.current = self.lexer.next_token(&mut self.interner)?;
                    self.lookahead = None;
                    break;
                }
                other => {
                    return Err(self.err(CangjieError::Lexical, format!("malformed string interpolation near {other:?}")));
                }
            }
        }
        self.funcs.last_mut().unwrap().emit_abc(OpCode::Concat, base as u32, base as u32, count - 1, line);
        self.funcs.last_mut().unwrap().free_to(base + 1);
        Ok(ExpDesc::new(ExpKind::Reg(base), line))
    }

    fn array_literal(&mut self) -> CangjieResult<ExpDesc> {
        let line = self.line();
        self.advance()?; // `[`
        let table_reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        self.funcs.last_mut().unwrap().emit_abc(OpCode::NewTable, table_reg as u32, 0, 0, line);
        let mut idx = 1i64;
        while !self.check(&TokenKind::RBracket) {
            let item = self.expr()?;
            let reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &item)?;
            self.funcs.last_mut().unwrap().emit_abc(OpCode::SetList, table_reg as u32, reg as u32, idx as u32, line);
            self.funcs.last_mut().unwrap().free_to(reg);
            idx += 1;
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(ExpDesc::new(ExpKind::Reg(table_reg), line))
    }

    /// Primary expression plus any chain of `.field`, `[index]`, and call
    /// suffixes — the "suffixedexp" production from `lparser.c`.
    pub fn suffixedexp(&mut self) -> CangjieResult<ExpDesc> {
        let mut e = self.primaryexp()?;
        loop {
            let line = self.line();
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let field = self.expect_ident()?;
                    let table = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &e)?;
                    // `.size` reads the length field every collection value
                    // stores as `__n`, unless it's actually a method call
                    // (`.size(...)`) — spec.md §4.B.
                    let field_name = self.interner.resolve(field);
                    let key_name = if field_name == "size" && !self.check(&TokenKind::LParen) {
                        "__n".to_string()
                    } else {
                        field_name.to_string()
                    };
                    let k = self
                        .funcs
                        .last_mut()
                        .unwrap()
                        .add_constant(crate::value::Value::Str(std::rc::Rc::new(key_name)), line)?;
                    e = ExpDesc::new(ExpKind::Indexed { table, key: IndexKey::Const(k) }, line);
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let table = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &e)?;
                    let key = self.expr()?;
                    let key_reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &key)?;
                    self.expect(TokenKind::RBracket)?;
                    e = ExpDesc::new(ExpKind::Indexed { table, key: IndexKey::Reg(key_reg) }, line);
                }
                TokenKind::LParen => {
                    e = self.call_suffix(e, None)?;
                }
                _ => break,
            }
        }
        Ok(e)
    }

    /// Parses `(args)`, supporting positional and `name: value` named
    /// arguments; a call with any named argument is rewritten as
    /// `__cangjie_named_call(fn, pos1, …, posN, npos, {name1=v1, …})` so the
    /// runtime can match named values against parameter-name debug info
    /// (spec.md §4.B "Function calls", §4.E "named_call").
    fn call_suffix(&mut self, callee: ExpDesc, method_name: Option<Sym>) -> CangjieResult<ExpDesc> {
        let line = self.line();
        let func_reg = expr::discharge_to_any_reg(self.funcs.last_mut().unwrap(), &self.interner, &callee)?;
        self.expect(TokenKind::LParen)?;
        let base = self.funcs.last_mut().unwrap().freereg;
        let mut nargs = 0u32;
        let mut named: Vec<(Sym, u8)> = Vec::new();
        if method_name.is_some() {
            // `this` is already in func_reg's following slot for method
            // calls; decl.rs's method-call desugaring reserves it.
        }
        while !self.check(&TokenKind::RParen) {
            if let TokenKind::Ident(_) = self.current.kind {
                if matches!(self.peek()?.kind, TokenKind::Colon) {
                    let name = self.expect_ident()?;
                    self.advance()?; // `:`
                    let value = self.expr()?;
                    let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
                    expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &value, reg)?;
                    named.push((name, reg));
                    nargs += 1;
                    if !self.accept(TokenKind::Comma)? {
                        break;
                    }
                    continue;
                }
            }
            let arg = self.expr()?;
            let reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
            expr::discharge_to_reg(self.funcs.last_mut().unwrap(), &self.interner, &arg, reg)?;
            nargs += 1;
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        if named.is_empty() {
            self.funcs.last_mut().unwrap().emit_abc(OpCode::Call, func_reg as u32, nargs + 1, 2, line);
            self.funcs.last_mut().unwrap().free_to(base);
            return Ok(ExpDesc::new(ExpKind::Call(func_reg), line));
        }

        // The values above are still live in base..base+nargs, in encounter
        // order, mixing positional and named regs. Fold the named ones into
        // a fresh table and re-emit as a `__cangjie_named_call` invocation;
        // the original registers are read by `Reg(..)` below, not reused.
        let npos = nargs as i64 - named.len() as i64;
        let table_reg = self.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        self.funcs.last_mut().unwrap().emit_abc(OpCode::NewTable, table_reg as u32, 0, named.len() as u32, line);
        for (name, value_reg) in &named {
            let k = self
                .funcs
                .last_mut()
                .unwrap()
                .add_constant(crate::value::Value::Str(std::rc::Rc::new(self.interner.resolve(*name).to_string())), line)?;
            self.funcs.last_mut().unwrap().emit_abc(OpCode::SetField, table_reg as u32, k, *value_reg as u32, line);
        }

        let named_set: std::collections::HashSet<u8> = named.iter().map(|(_, r)| *r).collect();
        let mut call_args = vec![ExpDesc::new(ExpKind::Reg(func_reg), line)];
        for reg in base..base + nargs as u8 {
            if !named_set.contains(&reg) {
                call_args.push(ExpDesc::new(ExpKind::Reg(reg), line));
            }
        }
        call_args.push(ExpDesc::new(ExpKind::Int(npos), line));
        call_args.push(ExpDesc::new(ExpKind::Reg(table_reg), line));

        let dst = self.emit_primitive_call("__cangjie_named_call", &call_args, 1, line)?;
        Ok(ExpDesc::new(ExpKind::Reg(dst), line))
    }

    fn primaryexp(&mut self) -> CangjieResult<ExpDesc> {
        let line = self.line();
        match self.current.kind {
            TokenKind::LParen => {
                self.advance()?;
                if self.check(&TokenKind::RParen) {
                    self.advance()?;
                    let reg = self.emit_primitive_call("__cangjie_tuple", &[], 1, line)?;
                    return Ok(ExpDesc::new(ExpKind::Reg(reg), line));
                }
                let first = self.expr()?;
                if self.check(&TokenKind::Comma) {
                    // `(e1, e2, ...)` — a tuple literal, not a grouped
                    // expression (spec.md §3.6, §4.D tuple/destructuring).
                    let mut items = vec![first];
                    while self.accept(TokenKind::Comma)? {
                        if self.check(&TokenKind::RParen) {
                            break;
                        }
                        items.push(self.expr()?);
                    }
                    self.expect(TokenKind::RParen)?;
                    let reg = self.emit_primitive_call("__cangjie_tuple", &items, 1, line)?;
                    Ok(ExpDesc::new(ExpKind::Reg(reg), line))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::Ident(sym) => {
                self.advance()?;
                Ok(self.resolve_name(sym, line))
            }
            TokenKind::KwThis => {
                self.advance()?;
                let sym = self.interner_intern_static("this");
                Ok(self.resolve_name(sym, line))
            }
            TokenKind::KwSuper => {
                self.advance()?;
                let sym = self.interner_intern_static("super");
                Ok(self.resolve_name(sym, line))
            }
            _ => Err(self.err_near(CangjieError::Syntax, "unexpected symbol")),
        }
    }

    fn interner_intern_static(&mut self, s: &str) -> Sym {
        self.interner.intern(s)
    }

    fn resolve_name(&mut self, sym: Sym, line: u32) -> ExpDesc {
        if let Some(local) = self.funcs.last().unwrap().resolve_local(sym) {
            return ExpDesc::new(ExpKind::Local(local.register), line);
        }
        // Scan outer FuncStates first (without holding a borrow across the
        // mutation below) to decide whether this name closes over an
        // enclosing local.
        let closes_over_outer = self.funcs[..self.funcs.len() - 1]
            .iter()
            .rev()
            .any(|fs| fs.resolve_local(sym).is_some());
        if closes_over_outer {
            let idx = self.funcs.last().unwrap().upvalues.len() as u8;
            self.funcs.last_mut().unwrap().upvalues.push(crate::compiler::func_state::UpvalDesc {
                name: sym,
                in_stack: true,
                index: idx,
            });
            return ExpDesc::new(ExpKind::Upval(idx), line);
        }
        ExpDesc::new(ExpKind::Global(sym), line)
    }
}
