//! The `__cangjie_*` runtime-support primitive catalog (spec.md §4.E, §6.4).
//!
//! The compiler never emits a custom opcode for class machinery, pattern
//! matching, ranges, or iteration — it compiles every one of those down to
//! an ordinary `GETGLOBAL`+`CALL` against a reserved name (`parser.rs`'s
//! `emit_primitive_call`). This module is the other half of that contract:
//! the native functions a host VM would bind under those names before
//! running a chunk this crate produced. Grounded in
//! `luars::stdlib::{base, string, table}`'s shape — a flat table of
//! `fn(&[LuaValue]) -> LuaResult<Vec<LuaValue>>` entries registered into the
//! global table by name — widened to the class/enum/pattern/iteration
//! catalog spec.md §4.E lists. Since the VM that would call these is out of
//! scope (spec.md §1, §6.2), nothing here is ever invoked by this crate; it
//! exists to be linked into an embedder the way `luars`' stdlib is.

pub mod bridges;
pub mod class;
pub mod collections;
pub mod data;
pub mod dispatch;
pub mod enum_;
pub mod iter;

use crate::interner::Interner;
use crate::value::{Table, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct RuntimeError(pub String);

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Every primitive takes the runtime's string interner (table field names
/// like `__parent`/`__class` are `Sym`-keyed, spec.md §3.2) and the call's
/// already-evaluated arguments, and returns however many values the VM's
/// `CALL` site asked for.
pub type NativeFn = fn(&mut Interner, &[Value]) -> RuntimeResult<Vec<Value>>;

fn err(msg: impl Into<String>) -> RuntimeError {
    RuntimeError(msg.into())
}

fn arg(args: &[Value], i: usize) -> RuntimeResult<&Value> {
    args.get(i).ok_or_else(|| err(format!("missing argument {i}")))
}

fn as_table(v: &Value) -> RuntimeResult<Rc<RefCell<Table>>> {
    match v {
        Value::Table(t) => Ok(t.clone()),
        other => Err(err(format!("expected table, got {}", other.type_name()))),
    }
}

fn as_str(v: &Value) -> RuntimeResult<Rc<String>> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        other => Err(err(format!("expected string, got {}", other.type_name()))),
    }
}

fn as_int(v: &Value) -> RuntimeResult<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        other => Err(err(format!("expected integer, got {}", other.type_name()))),
    }
}

fn new_table() -> Value {
    Value::Table(Rc::new(RefCell::new(Table::new())))
}

/// One entry in the catalog: the global name a compiled chunk's `GETGLOBAL`
/// would look up, and the native function bound to it.
pub struct Primitive {
    pub name: &'static str,
    pub func: NativeFn,
}

/// The full catalog a host would register into the global table before
/// running a chunk this crate compiled. Order is irrelevant; every name
/// here is one `parser.rs`/`decl.rs`/`pattern.rs` may emit a `GETGLOBAL` for.
pub fn catalog() -> Vec<Primitive> {
    vec![
        Primitive { name: "__cangjie_setup_struct", func: class::setup_struct },
        Primitive { name: "__cangjie_setup_class", func: class::setup_class },
        Primitive { name: "__cangjie_set_parent", func: class::set_parent },
        Primitive { name: "__cangjie_define_field", func: class::define_field },
        Primitive { name: "__cangjie_define_method", func: class::define_method },
        Primitive { name: "__cangjie_define_static_method", func: class::define_static_method },
        Primitive { name: "__cangjie_define_init", func: class::define_init },
        Primitive { name: "__cangjie_setup_interface", func: class::setup_interface },
        Primitive { name: "__cangjie_declare_signature", func: class::declare_signature },
        Primitive { name: "__cangjie_apply_interface", func: class::apply_interface },
        Primitive { name: "__cangjie_is_instance", func: class::is_instance },
        Primitive { name: "__cangjie_super_init", func: class::super_init },
        Primitive { name: "__cangjie_instantiate", func: class::instantiate },
        Primitive { name: "__cangjie_extend_type", func: class::extend_type },
        Primitive { name: "__cangjie_setup_enum", func: enum_::setup_enum },
        Primitive { name: "__cangjie_declare_case", func: enum_::declare_case },
        Primitive { name: "__cangjie_match_tag", func: enum_::match_tag },
        Primitive { name: "__cangjie_match_tuple", func: enum_::match_tuple },
        Primitive { name: "__cangjie_enum_payload", func: enum_::enum_payload },
        Primitive { name: "__cangjie_enum_construct", func: enum_::construct },
        Primitive { name: "__cangjie_range", func: data::range },
        Primitive { name: "__cangjie_range_new", func: data::range_new },
        Primitive { name: "__cangjie_range_new_inclusive", func: data::range_new_inclusive },
        Primitive { name: "__cangjie_range_step", func: data::range_step },
        Primitive { name: "__cangjie_coalesce", func: data::coalesce },
        Primitive { name: "__cangjie_tuple", func: data::tuple },
        Primitive { name: "__cangjie_tuple_get", func: data::tuple_get },
        Primitive { name: "__cangjie_option_wrap", func: data::option_wrap },
        Primitive { name: "__cangjie_overload", func: dispatch::overload },
        Primitive { name: "__cangjie_named_call", func: dispatch::named_call },
        Primitive { name: "__cangjie_iter", func: iter::iter },
        Primitive { name: "__cangjie_iter_step", func: iter::step },
        Primitive { name: "__cangjie_array_slice", func: iter::array_slice },
        Primitive { name: "__cangjie_array_slice_set", func: iter::array_slice_set },
        Primitive { name: "__cangjie_string_index", func: bridges::string_index },
        Primitive { name: "__cangjie_string_method", func: bridges::string_method },
        Primitive { name: "__cangjie_numeric_method", func: bridges::numeric_method },
        Primitive { name: "__cangjie_array_list_new", func: collections::array_list_new },
        Primitive { name: "__cangjie_array_stack_new", func: collections::array_stack_new },
        Primitive { name: "__cangjie_hash_map_new", func: collections::hash_map_new },
        Primitive { name: "__cangjie_hash_set_new", func: collections::hash_set_new },
    ]
}

/// Installs the full catalog into `globals` under its reserved names, the
/// way an embedder wires this crate's output to a concrete VM.
pub fn install(globals: &Rc<RefCell<Table>>, interner: &mut Interner) {
    for p in catalog() {
        let sym = interner.intern(p.name);
        globals.borrow_mut().set_str(sym, Value::Function(native_marker(p.name, p.func)));
    }
}

/// `Table`/`Value` have no native-function variant (spec.md §3.6 only lists
/// the value shapes user code can construct); a host VM would bind these by
/// name directly rather than boxing them as `Value`s. `install` still
/// documents the expected binding by constructing a zero-body `FunctionProto`
/// tagged with the primitive's name so a chunk's debug dump can show which
/// globals are runtime-provided rather than user-defined.
fn native_marker(name: &str, _func: NativeFn) -> Rc<crate::value::FunctionProto> {
    Rc::new(crate::value::FunctionProto {
        name: Some(name.to_string()),
        num_params: 0,
        is_vararg: true,
        code: Vec::new(),
        constants: Vec::new(),
        param_names: Vec::new(),
        upvalue_names: Vec::new(),
        nested: Vec::new(),
    })
}
