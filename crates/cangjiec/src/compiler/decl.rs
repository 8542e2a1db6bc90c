//! Type declarations: `struct`, `class`, `interface`, `extend`, `enum`.
//!
//! The target VM has no notion of classes (spec.md §1, §6.2): every
//! declaration here compiles down to building a method table at load time
//! and registering it with the `__cangjie_*` runtime support layer
//! (component E), the same way the teacher's declaration-less Lua front end
//! just builds plain tables. There's no direct teacher file for this
//! production (Lua has no `class` keyword); the call-a-runtime-helper shape
//! is grounded in `luars::compiler::{func_state.rs, code.rs}`'s "emit a
//! setup call, thread the function value through a local" pattern used for
//! Lua's own `function t.f() end` sugar.

use crate::compiler::expr::{discharge_to_any_reg, ExpDesc, ExpKind};
use crate::compiler::parser::Parser;
use crate::error::{CangjieError, CangjieResult};
use crate::interner::Sym;
use crate::opcode::OpCode;
use crate::token::TokenKind;

/// `func name(params) { body }` — top-level or nested function declaration,
/// bound as a local/global the same way `local function`/`function` does in
/// Lua (spec.md §4.B).
pub fn func_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `func`
    let name = p.expect_ident()?;
    let proto_reg = parse_function_body(p, name)?;
    p.funcs.last_mut().unwrap().new_local(name, proto_reg, false, line)?;
    Ok(())
}

/// Parses `(params) { body }` as a nested closure, emitting `CLOSURE` into a
/// fresh register and returning that register. Shared by `func`
/// declarations, class/interface methods, and lambdas.
fn parse_function_body(p: &mut Parser, _name: Sym) -> CangjieResult<u8> {
    let line = p.line();
    p.expect(TokenKind::LParen)?;
    let mut param_names = Vec::new();
    while !p.check(&TokenKind::RParen) {
        let pname = p.expect_ident()?;
        if p.check(&TokenKind::Colon) {
            p.advance()?;
            skip_type(p)?;
        }
        param_names.push(pname);
        if !p.accept(TokenKind::Comma)? {
            break;
        }
    }
    p.expect(TokenKind::RParen)?;
    if p.check(&TokenKind::Colon) {
        // return-type annotation, discarded (spec.md §1 Non-goals: no type checker)
        p.advance()?;
        skip_type(p)?;
    }

    let mut fs = crate::compiler::func_state::FuncState::new(&p.chunk_name);
    fs.num_params = param_names.len() as u8;
    fs.param_names = param_names.clone();
    for (i, pname) in param_names.iter().enumerate() {
        fs.new_local(*pname, i as u8, false, line)?;
    }
    // Params already occupy registers 0..num_params on entry (the VM's CALL
    // convention places arguments there); freereg must start past them or
    // the first body statement would reserve register 0 right back out from
    // under the first parameter.
    fs.freereg = fs.num_params;
    p.funcs.push(fs);
    p.block()?;
    let finished = p.funcs.pop().expect("pushed FuncState is still on the stack");
    let proto = std::rc::Rc::new(crate::value::FunctionProto {
        name: None,
        num_params: finished.num_params,
        is_vararg: finished.is_vararg,
        code: finished.code,
        constants: finished.constants,
        param_names: finished.param_names,
        upvalue_names: finished.upvalues.iter().map(|u| u.name).collect(),
        nested: Vec::new(),
    });
    let k = p
        .funcs
        .last_mut()
        .unwrap()
        .add_constant(crate::value::Value::Function(proto), line)?;
    let dst = p.funcs.last_mut().unwrap().reserve_regs(1, line)?;
    p.funcs
        .last_mut()
        .unwrap()
        .emit(crate::opcode::Instruction::abx(OpCode::Closure, dst as u32, k), line);
    Ok(dst)
}

fn skip_type(p: &mut Parser) -> CangjieResult<()> {
    p.expect_ident()?;
    if p.accept(TokenKind::Question)? {}
    if p.accept(TokenKind::Lt)? {
        loop {
            skip_type(p)?;
            if !p.accept(TokenKind::Comma)? {
                break;
            }
        }
        p.expect(TokenKind::Gt)?;
    }
    Ok(())
}

struct FieldDecl {
    name: Sym,
    default: Option<ExpDesc>,
}

struct MethodDecl {
    name: Sym,
    proto_reg: u8,
    is_static: bool,
}

/// Shared body parser for `struct`/`class`: fields (`let`/`var name: T`),
/// methods (`func name(...) { }`), and `init(...)  { }` constructors.
fn parse_member_list(p: &mut Parser) -> CangjieResult<(Vec<FieldDecl>, Vec<MethodDecl>, Option<u8>)> {
    let mut fields = Vec::new();
    let mut methods = Vec::new();
    let mut init_reg = None;
    p.expect(TokenKind::LBrace)?;
    while !p.check(&TokenKind::RBrace) {
        let is_static = p.accept(TokenKind::KwStatic)?;
        match p.current.kind {
            TokenKind::KwLet | TokenKind::KwVar => {
                p.advance()?;
                let name = p.expect_ident()?;
                if p.accept(TokenKind::Colon)? {
                    skip_type(p)?;
                }
                let default = if p.accept(TokenKind::Eq)? { Some(p.expr()?) } else { None };
                p.accept(TokenKind::Semi)?;
                let _ = is_static; // static fields share the same table shape as instance fields
                fields.push(FieldDecl { name, default });
            }
            TokenKind::KwFunc => {
                p.advance()?;
                let name = p.expect_ident()?;
                let proto_reg = parse_function_body(p, name)?;
                methods.push(MethodDecl { name, proto_reg, is_static });
            }
            TokenKind::KwInit => {
                p.advance()?;
                let anon = p.expect_ident_or_anon();
                let reg = parse_function_body(p, anon)?;
                init_reg = Some(reg);
            }
            TokenKind::KwOperator => {
                p.advance()?;
                // `operator func +(other: T) { }` — the operator symbol
                // itself becomes the method name so dispatch.rs's
                // metamethod table (spec.md §6.3) can find it by name.
                p.expect(TokenKind::KwFunc)?;
                let op_name = p.operator_token_name()?;
                let proto_reg = parse_function_body(p, op_name)?;
                methods.push(MethodDecl { name: op_name, proto_reg, is_static: false });
            }
            _ => return Err(p.err_syntax("struct/class member expected")),
        }
    }
    p.expect(TokenKind::RBrace)?;
    Ok((fields, methods, init_reg))
}

fn emit_type_setup(
    p: &mut Parser,
    primitive: &str,
    type_name: Sym,
    parent: Option<Sym>,
    fields: &[FieldDecl],
    methods: &[MethodDecl],
    init_reg: Option<u8>,
    line: u32,
) -> CangjieResult<()> {
    let name_desc = ExpDesc::new(ExpKind::Str(type_name), line);
    let proto_reg = p.emit_primitive_call(primitive, &[name_desc], 1, line)?;

    if let Some(parent) = parent {
        let parent_desc = ExpDesc::new(ExpKind::Global(parent), line);
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        p.emit_primitive_call("__cangjie_set_parent", &[self_desc, parent_desc], 0, line)?;
    }

    for field in fields {
        let key = ExpDesc::new(ExpKind::Str(field.name), line);
        let value = field
            .default
            .clone()
            .unwrap_or_else(|| ExpDesc::new(ExpKind::Nil, line));
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        p.emit_primitive_call("__cangjie_define_field", &[self_desc, key, value], 0, line)?;
    }

    for method in methods {
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        let key = ExpDesc::new(ExpKind::Str(method.name), line);
        let func = ExpDesc::new(ExpKind::Reg(method.proto_reg), line);
        let primitive = if method.is_static {
            "__cangjie_define_static_method"
        } else {
            "__cangjie_define_method"
        };
        p.emit_primitive_call(primitive, &[self_desc, key, func], 0, line)?;
    }

    if let Some(init_reg) = init_reg {
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        let func = ExpDesc::new(ExpKind::Reg(init_reg), line);
        p.emit_primitive_call("__cangjie_define_init", &[self_desc, func], 0, line)?;
    }

    // Bind the constructed type table as a global of the same name, so
    // later `TypeName(...)` calls and `TypeName.field` lookups resolve
    // through ordinary GETGLOBAL (spec.md §4.C).
    let value_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
    let value_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &value_desc)?;
    let k = p.funcs.last_mut().unwrap().add_constant(
        crate::value::Value::Str(std::rc::Rc::new(p.interner.resolve(type_name).to_string())),
        line,
    )?;
    p.funcs
        .last_mut()
        .unwrap()
        .emit(crate::opcode::Instruction::abx(OpCode::SetGlobal, value_reg as u32, k), line);
    Ok(())
}

pub fn struct_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `struct`
    let name = p.expect_ident()?;
    let (fields, methods, init_reg) = parse_member_list(p)?;
    emit_type_setup(p, "__cangjie_setup_struct", name, None, &fields, &methods, init_reg, line)
}

pub fn class_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `class`
    let name = p.expect_ident()?;
    let parent = if p.accept(TokenKind::Colon)? { Some(p.expect_ident()?) } else { None };
    let (fields, methods, init_reg) = parse_member_list(p)?;
    emit_type_setup(p, "__cangjie_setup_class", name, parent, &fields, &methods, init_reg, line)
}

/// `interface`: a named method-signature set with no bodies and no backing
/// storage; it compiles to a marker table so `__cangjie_apply_interface`
/// can type-tag conforming classes at `extend` time (spec.md §4.C).
pub fn interface_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `interface`
    let name = p.expect_ident()?;
    p.expect(TokenKind::LBrace)?;
    let mut signatures = Vec::new();
    while !p.check(&TokenKind::RBrace) {
        p.expect(TokenKind::KwFunc)?;
        let method = p.expect_ident()?;
        p.expect(TokenKind::LParen)?;
        while !p.check(&TokenKind::RParen) {
            p.expect_ident()?;
            if p.accept(TokenKind::Colon)? {
                skip_type(p)?;
            }
            if !p.accept(TokenKind::Comma)? {
                break;
            }
        }
        p.expect(TokenKind::RParen)?;
        if p.accept(TokenKind::Colon)? {
            skip_type(p)?;
        }
        p.accept(TokenKind::Semi)?;
        signatures.push(method);
    }
    p.expect(TokenKind::RBrace)?;
    let name_desc = ExpDesc::new(ExpKind::Str(name), line);
    let proto_reg = p.emit_primitive_call("__cangjie_setup_interface", &[name_desc], 1, line)?;
    for sig in signatures {
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        let sig_desc = ExpDesc::new(ExpKind::Str(sig), line);
        p.emit_primitive_call("__cangjie_declare_signature", &[self_desc, sig_desc], 0, line)?;
    }
    let value_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
    let value_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &value_desc)?;
    let k = p.funcs.last_mut().unwrap().add_constant(
        crate::value::Value::Str(std::rc::Rc::new(p.interner.resolve(name).to_string())),
        line,
    )?;
    p.funcs
        .last_mut()
        .unwrap()
        .emit(crate::opcode::Instruction::abx(OpCode::SetGlobal, value_reg as u32, k), line);
    Ok(())
}

/// `extend Type: Interface, Interface2 { ... }` — adds methods to an
/// existing type and registers interface conformance, without re-declaring
/// the type (spec.md §4.C "extend").
pub fn extend_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `extend`
    let target = p.expect_ident()?;
    let mut interfaces = Vec::new();
    if p.accept(TokenKind::Colon)? {
        loop {
            interfaces.push(p.expect_ident()?);
            if !p.accept(TokenKind::Comma)? {
                break;
            }
        }
    }
    let (fields, methods, init_reg) = parse_member_list(p)?;
    if !fields.is_empty() {
        return Err(p.err_syntax("extend cannot add stored fields"));
    }
    let target_desc = ExpDesc::new(ExpKind::Global(target), line);
    let target_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &target_desc)?;
    for method in &methods {
        let self_desc = ExpDesc::new(ExpKind::Reg(target_reg), line);
        let key = ExpDesc::new(ExpKind::Str(method.name), line);
        let func = ExpDesc::new(ExpKind::Reg(method.proto_reg), line);
        let primitive = if method.is_static {
            "__cangjie_define_static_method"
        } else {
            "__cangjie_define_method"
        };
        p.emit_primitive_call(primitive, &[self_desc, key, func], 0, line)?;
    }
    if let Some(init_reg) = init_reg {
        let self_desc = ExpDesc::new(ExpKind::Reg(target_reg), line);
        let func = ExpDesc::new(ExpKind::Reg(init_reg), line);
        p.emit_primitive_call("__cangjie_define_init", &[self_desc, func], 0, line)?;
    }
    for iface in interfaces {
        let self_desc = ExpDesc::new(ExpKind::Reg(target_reg), line);
        let iface_desc = ExpDesc::new(ExpKind::Global(iface), line);
        p.emit_primitive_call("__cangjie_apply_interface", &[self_desc, iface_desc], 0, line)?;
    }
    Ok(())
}

/// `enum Name { Case, Case(T1, T2), ... }` — each case becomes a tagged
/// constructor registered under the enum's global table (spec.md §4.C
/// "enum", §3.6 `EnumValue`).
pub fn enum_decl(p: &mut Parser) -> CangjieResult<()> {
    let line = p.line();
    p.advance()?; // `enum`
    let name = p.expect_ident()?;
    p.expect(TokenKind::LBrace)?;
    let name_desc = ExpDesc::new(ExpKind::Str(name), line);
    let proto_reg = p.emit_primitive_call("__cangjie_setup_enum", &[name_desc], 1, line)?;
    let mut cases = Vec::new();
    while !p.check(&TokenKind::RBrace) {
        p.expect(TokenKind::KwCase)?;
        let case_name = p.expect_ident()?;
        let mut arity = 0u32;
        if p.accept(TokenKind::LParen)? {
            while !p.check(&TokenKind::RParen) {
                skip_type(p)?;
                arity += 1;
                if !p.accept(TokenKind::Comma)? {
                    break;
                }
            }
            p.expect(TokenKind::RParen)?;
        }
        p.accept(TokenKind::Comma)?;
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        let case_desc = ExpDesc::new(ExpKind::Str(case_name), line);
        let arity_desc = ExpDesc::new(ExpKind::Int(arity as i64), line);
        p.emit_primitive_call("__cangjie_declare_case", &[self_desc, case_desc, arity_desc], 0, line)?;
        cases.push((case_name, arity));
    }
    p.expect(TokenKind::RBrace)?;
    let value_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
    let value_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &value_desc)?;
    let k = p.funcs.last_mut().unwrap().add_constant(
        crate::value::Value::Str(std::rc::Rc::new(p.interner.resolve(name).to_string())),
        line,
    )?;
    p.funcs
        .last_mut()
        .unwrap()
        .emit(crate::opcode::Instruction::abx(OpCode::SetGlobal, value_reg as u32, k), line);

    // Every case is additionally re-exported as a bare global constructor —
    // `Circle(1.0)`, not `Shape.Circle(1.0)` — mirroring how a nullary case
    // compiles to a ready-made tagged value and an N-ary case compiles to a
    // factory function (spec.md §4.C "Nullary constructors"/"Constructors
    // with N parameters").
    for (case_name, arity) in cases {
        bind_case_constructor(p, proto_reg, name, case_name, arity, line)?;
    }
    Ok(())
}

fn bind_case_constructor(
    p: &mut Parser,
    proto_reg: u8,
    enum_name: Sym,
    case_name: Sym,
    arity: u32,
    line: u32,
) -> CangjieResult<()> {
    let ctor_reg = if arity == 0 {
        let self_desc = ExpDesc::new(ExpKind::Reg(proto_reg), line);
        let case_desc = ExpDesc::new(ExpKind::Str(case_name), line);
        p.emit_primitive_call("__cangjie_enum_construct", &[self_desc, case_desc], 1, line)?
    } else {
        let mut params = Vec::with_capacity(arity as usize);
        for i in 0..arity {
            params.push(p.interner.intern(&format!("__case_arg{i}")));
        }
        let mut fs = crate::compiler::func_state::FuncState::new(&p.chunk_name);
        fs.num_params = arity as u8;
        fs.param_names = params.clone();
        for (i, pname) in params.iter().enumerate() {
            fs.new_local(*pname, i as u8, false, line)?;
        }
        fs.freereg = fs.num_params;
        p.funcs.push(fs);
        let enum_desc = ExpDesc::new(ExpKind::Global(enum_name), line);
        let case_desc = ExpDesc::new(ExpKind::Str(case_name), line);
        let mut call_args = vec![enum_desc, case_desc];
        for (i, _) in params.iter().enumerate() {
            call_args.push(ExpDesc::new(ExpKind::Local(i as u8), line));
        }
        let result_reg = p.emit_primitive_call("__cangjie_enum_construct", &call_args, 1, line)?;
        p.funcs.last_mut().unwrap().emit_abc(OpCode::Return, result_reg as u32, 2, 0, line);
        let finished = p.funcs.pop().expect("pushed FuncState is still on the stack");
        let proto = std::rc::Rc::new(crate::value::FunctionProto {
            name: Some(p.interner.resolve(case_name).to_string()),
            num_params: finished.num_params,
            is_vararg: finished.is_vararg,
            code: finished.code,
            constants: finished.constants,
            param_names: finished.param_names,
            upvalue_names: finished.upvalues.iter().map(|u| u.name).collect(),
            nested: Vec::new(),
        });
        let k = p.funcs.last_mut().unwrap().add_constant(crate::value::Value::Function(proto), line)?;
        let dst = p.funcs.last_mut().unwrap().reserve_regs(1, line)?;
        p.funcs
            .last_mut()
            .unwrap()
            .emit(crate::opcode::Instruction::abx(OpCode::Closure, dst as u32, k), line);
        dst
    };
    let ctor_desc = ExpDesc::new(ExpKind::Reg(ctor_reg), line);
    let ctor_val_reg = discharge_to_any_reg(p.funcs.last_mut().unwrap(), &p.interner, &ctor_desc)?;
    let k = p.funcs.last_mut().unwrap().add_constant(
        crate::value::Value::Str(std::rc::Rc::new(p.interner.resolve(case_name).to_string())),
        line,
    )?;
    p.funcs
        .last_mut()
        .unwrap()
        .emit(crate::opcode::Instruction::abx(OpCode::SetGlobal, ctor_val_reg as u32, k), line);
    Ok(())
}

impl<'a> Parser<'a> {
    fn err_syntax(&self, message: &str) -> crate::error::CompileError {
        crate::error::CompileError::new(CangjieError::Syntax, &self.chunk_name, self.line(), message.to_string())
    }

    fn expect_ident_or_anon(&mut self) -> Sym {
        self.interner.intern("init")
    }

    /// Maps an `operator` declaration's following symbol to the method name
    /// dispatch.rs looks up via the operator→metamethod table (spec.md
    /// §6.3).
    fn operator_token_name(&mut self) -> CangjieResult<Sym> {
        let name = match self.current.kind {
            TokenKind::Plus => "__add",
            TokenKind::Minus => "__sub",
            TokenKind::Star => "__mul",
            TokenKind::Slash => "__div",
            TokenKind::Percent => "__mod",
            TokenKind::EqEq => "__eq",
            TokenKind::Lt => "__lt",
            TokenKind::Le => "__le",
            TokenKind::LBracket => "__index",
            _ => return Err(self.err_syntax("operator symbol expected")),
        };
        if self.check(&TokenKind::LBracket) {
            self.advance()?;
            self.expect(TokenKind::RBracket)?;
        } else {
            self.advance()?;
        }
        Ok(self.interner.intern(name))
    }
}
