//! Pattern matching: `match` statements/expressions, and pattern compilation
//! shared with `if let`/`while let` (spec.md §4.D).
//!
//! The teacher has nothing resembling this (Lua has no pattern matching);
//! the pattern shapes here (wildcard/binding/literal/tuple/enum-case) follow
//! the `Pattern` grammar in another pack example's parser AST, compiled down
//! the same way `decl.rs` compiles declarations: each pattern test becomes a
//! runtime-primitive call plus a conditional jump, never a dedicated opcode,
//! since the target VM doesn't know what a pattern is (spec.md §6.2).

use crate::compiler::expr::{discharge_to_any_reg, discharge_to_reg, ExpDesc, ExpKind};
use crate::compiler::parser::Parser;
use crate::error::{CangjieError, CangjieResult};
use crate::interner::Sym;
use crate::opcode::OpCode;
use crate::token::TokenKind;

/// A pattern parsed but not yet compiled. `match` parses and compiles a
/// pattern in the same pass since the value it tests is already sitting in
/// a register by the time the pattern's tokens appear; `if let`/`while let`
/// cannot do that because the pattern appears *before* the `<- expr` whose
/// value it tests, so `parser.rs` parses one of these first and compiles it
/// once the subject register exists (spec.md §4.D "while let").
pub enum PatternNode {
    Wildcard,
    Binding(Sym),
    EnumCase(Sym, Vec<PatternNode>),
    Tuple(Vec<PatternNode>),
    Literal(LiteralNode),
}

pub enum LiteralNode {
    Int(i64),
    Float(f64),
    Str(Sym),
    True,
    False,
    Nil,
}

/// Consumes one pattern's tokens without emitting anything.
pub fn parse_pattern_node(p: &mut Parser) -> CangjieResult<PatternNode> {
    let line = p.line();
    match p.current.kind {
        TokenKind::Ident(sym) if sym_is_wildcard(p, sym) => {
            p.advance()?;
            Ok(PatternNode::Wildcard)
        }
        TokenKind::Ident(sym) => {
            p.advance()?;
            if p.check(&TokenKind::LParen) {
                Ok(PatternNode::EnumCase(sym, parse_pattern_list(p)?))
            } else {
                Ok(PatternNode::Binding(sym))
            }
        }
        TokenKind::LParen => {
            p.advance()?; // `(`
            let mut items = Vec::new();
            while !p.check(&TokenKind::RParen) {
                items.push(parse_pattern_node(p)?);
                if !p.accept(TokenKind::Comma)? {
                    break;
                }
            }
            p.expect(TokenKind::RParen)?;
            Ok(PatternNode::Tuple(items))
        }
        TokenKind::Int(v) => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::Int(v)))
        }
        TokenKind::Float(v) => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::Float(v)))
        }
        TokenKind::Str(sym) => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::Str(sym)))
        }
        TokenKind::KwTrue => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::True))
        }
        TokenKind::KwFalse => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::False))
        }
        TokenKind::KwNil => {
            p.advance()?;
            Ok(PatternNode::Literal(LiteralNode::Nil))
        }
        _ => Err(crate::error::CompileError::new(
            CangjieError::Syntax,
            &p.chunk_name,
            line,
            "pattern expected",
        )),
    }
}

/// `(p1, p2, …)` following an enum-case name, already positioned at `(`.
fn parse_pattern_list(p: &mut Parser) -> CangjieResult<Vec<PatternNode>> {
    p.advance()?; // `(`
    let mut items = Vec::new();
    while !p.check(&TokenKind::RParen) {
        items.push(parse_pattern_node(p)?);
        if !p.accept(TokenKind::Comma)? {
            break;
        }
    }
    p.expect(TokenKind::RParen)?;
    Ok(items)
}

fn sym_is_wildcard(p: &Parser, sym: Sym) -> bool {
    p.interner.resolve(sym) == "_"
}

/// Compiles a buffered pattern against a value already sitting in
/// `subject_reg`, declaring any bindings it introduces as new locals in the
/// current block. Returns the list of "pattern failed" jump program
/// counters, still unpatched — the caller decides where they should land
/// (next arm, match-failure fallthrough, or the loop/if's false branch).
pub fn compile_pattern_node(p: &mut Parser, node: &PatternNode, subject_reg: u8) -> CangjieResult<Vec<usize>> {
    let line = p.line();
    match node {
        PatternNode::Wildcard => Ok(vec![]),
        PatternNode::Binding(sym) => {
            p.funcs.last_mut().unwrap().new_local(*sym, subject_reg, true, line)?;
            Ok(vec![])
        }
        PatternNode::Tuple(items) => {
            let mut jumps = Vec::new();
            for (idx, item) in items.iter().enumerate() {
                let elem_reg = p.emit_primitive_call(
                    "__cangjie_tuple_get",
                    &[ExpDesc::new(ExpKind::Reg(subject_reg), line), ExpDesc::new(ExpKind::Int(idx as i64), line)],
                    1,
                    line,
                )?;
                jumps.extend(compile_pattern_node(p, item, elem_reg)?);
            }
            Ok(jumps)
        }
        PatternNode::EnumCase(case_name, items) => {
            let tag_ok = p.emit_primitive_call(
                "__cangjie_match_tag",
                &[ExpDesc::new(ExpKind::Reg(subject_reg), line), ExpDesc::new(ExpKind::Str(*case_name), line)],
                1,
                line,
            )?;
            p.funcs.last_mut().unwrap().emit_abc(OpCode::Test, tag_ok as u32, 0, 0, line);
            let mut jumps = vec![p.funcs.last_mut().unwrap().emit_jump(line)];
            for (idx, item) in items.iter().enumerate() {
                let elem_reg = p.emit_primitive_call(
                    "__cangjie_enum_payload",
                    &[ExpDesc::new(ExpKind::Reg(subject_reg), line), ExpDesc::new(ExpKind::Int(idx as i64), line)],
                    1,
                    line,
                )?;
                jumps.extend(compile_pattern_node(p, item, elem_reg)?);
            }
            Ok(jumps)
        }
        PatternNode::Literal(lit) => {
            let desc = match lit {
                LiteralNode::Int(v) => ExpDesc::new(ExpKind::Int(*v), line),
                LiteralNode::Float(v) => ExpDesc::new(ExpKind::Float(*v), line),
                LiteralNode::Str(sym) => ExpDesc::new(ExpKind::Str(*sym), line),
                LiteralNode::True => ExpDesc::new(ExpKind::True, line),
                LiteralNode::False => ExpDesc::new(ExpKind::False, line),
                LiteralNode::Nil => ExpDesc::new(ExpKind::Nil, line),
            };
            let lit_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &desc)?;
            p.funcs.last_mut().unwrap().emit_abc(OpCode::Eq, 1, subject_reg as u32, lit_reg as u32, line);
            Ok(vec![p.funcs.last_mut().unwrap().emit_jump(line)])
        }
    }
}

/// Parses and immediately compiles one pattern against `subject_reg` —
/// `match`'s case, where the subject is already known when the pattern's
/// tokens are read.
fn compile_pattern(p: &mut Parser, subject_reg: u8) -> CangjieResult<Vec<usize>> {
    let node = parse_pattern_node(p)?;
    compile_pattern_node(p, &node, subject_reg)
}

/// `match subject { pattern => body, ... }` used as a statement: each arm's
/// body is a block or a bare expression statement, and no arm's value is
/// collected.
pub fn match_stmt(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `match`
    let subject = p.expr()?;
    let subject_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &subject)?;
    p.expect(TokenKind::LBrace)?;

    let mut escapes = Vec::new();
    while !p.check(&TokenKind::RBrace) {
        p.funcs.last_mut().unwrap().enter_block(false, None);
        let fail_jumps = compile_pattern(p, subject_reg)?;
        p.expect(TokenKind::FatArrow)?;
        if p.check(&TokenKind::LBrace) {
            p.block()?;
        } else {
            let arm_line = p.line();
            let value = p.expr()?;
            discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &value)?;
            let _ = arm_line;
        }
        p.funcs.last_mut().unwrap().leave_block();
        p.accept(TokenKind::Comma)?;
        if !p.check(&TokenKind::RBrace) {
            let esc = p.funcs.last_mut().unwrap().emit_jump(line);
            escapes.push(esc);
        }
        let next_arm = p.funcs.last_mut().unwrap().code_len();
        for j in fail_jumps {
            p.funcs.last_mut().unwrap().patch_jump_to(j, next_arm);
        }
    }
    p.expect(TokenKind::RBrace)?;
    let end = p.funcs.last_mut().unwrap().code_len();
    for j in escapes {
        p.funcs.last_mut().unwrap().patch_jump_to(j, end);
    }
    Ok(())
}

/// `match` used as an expression: every arm's value is discharged into the
/// same result register (spec.md §4.D "match as expression").
pub fn match_expr(p: &mut Parser) -> CangjieResult<ExpDesc> {
    let line = p.line();
    p.advance()?; // `match`
    let subject = p.expr()?;
    let subject_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &subject)?;
    let result_reg = p.funcs.last_mut().unwrap().reserve_regs(1, line)?;
    p.expect(TokenKind::LBrace)?;

    let mut escapes = Vec::new();
    while !p.check(&TokenKind::RBrace) {
        p.funcs.last_mut().unwrap().enter_block(false, None);
        let fail_jumps = compile_pattern(p, subject_reg)?;
        p.expect(TokenKind::FatArrow)?;
        let arm_line = p.line();
        let value = if p.check(&TokenKind::LBrace) {
            p.expect(TokenKind::LBrace)?;
            let v = p.expr()?;
            p.expect(TokenKind::RBrace)?;
            v
        } else {
            p.expr()?
        };
        discharge_to_reg(p.funcs.last_mut().unwrap(), &p.interner, &value, result_reg)?;
        let _ = arm_line;
        p.funcs.last_mut().unwrap().leave_block();
        p.accept(TokenKind::Comma)?;
        if !p.check(&TokenKind::RBrace) {
            let esc = p.funcs.last_mut().unwrap().emit_jump(line);
            escapes.push(esc);
        }
        let next_arm = p.funcs.last_mut().unwrap().code_len();
        for j in fail_jumps {
            p.funcs.last_mut().unwrap().patch_jump_to(j, next_arm);
        }
    }
    p.expect(TokenKind::RBrace)?;
    let end = p.funcs.last_mut().unwrap().code_len();
    for j in escapes {
        p.funcs.last_mut().unwrap().patch_jump_to(j, end);
    }
    Ok(ExpDesc::new(ExpKind::Reg(result_reg), line))
}
