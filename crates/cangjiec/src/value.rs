//! Runtime value model consumed by the `__cangjie_*` primitive catalog.
//!
//! `luars::lua_value::lua_value::LuaValue` anchors tables and closures in a
//! GC-managed object pool addressed by id, because that crate owns a real
//! collector. Here the collector is an external black box we never implement
//! (spec.md §1, §6.2) — so table/closure sharing is expressed with
//! `Rc<RefCell<_>>` instead of GC ids. The variant set and the array+hash
//! split inside `Table` otherwise follow the teacher's `LuaValue`/`LuaTable`
//! shape directly, widened with the tagged variants spec.md §3.6 needs for
//! tuples, ranges, `Option`, and class/enum instances.

use crate::interner::Sym;
use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    Table(Rc<RefCell<Table>>),
    Function(Rc<FunctionProto>),
    /// Fixed-arity product, used for tuple literals and multi-value returns
    /// destructured positionally (spec.md §3.6, §4.D).
    Tuple(Rc<Vec<Value>>),
    /// Half-open or closed integer range produced by `a..b` / `a..=b`, or
    /// by a `for` loop's `:step` suffix (spec.md §3.6, §4.D).
    Range {
        start: i64,
        end: i64,
        inclusive: bool,
        step: i64,
    },
    /// `Option` is not a class instance: it is a first-class tag so pattern
    /// matching and `??` can dispatch on it without a table lookup.
    OptionSome(Rc<Value>),
    OptionNone,
    /// An instantiated `class`/`struct`: its own fields, plus a live
    /// reference back to the class table that produced it so `is`/pattern
    /// matching can walk the `__parent` chain without a side registry.
    Instance {
        class: Rc<RefCell<Table>>,
        fields: Rc<RefCell<Table>>,
    },
    /// An `enum` case value: the case's ordinal/name plus its payload, if the
    /// case declared associated values (spec.md §4.C "enum").
    EnumValue {
        type_name: Sym,
        case_name: Sym,
        payload: Rc<Vec<Value>>,
    },
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Table(_) => write!(f, "<table>"),
            Value::Function(p) => write!(f, "<function {}>", p.name.as_deref().unwrap_or("?")),
            Value::Tuple(items) => write!(f, "{items:?}"),
            Value::Range { start, end, inclusive, step } => {
                if *inclusive {
                    write!(f, "{start}..={end}")?;
                } else {
                    write!(f, "{start}..{end}")?;
                }
                if *step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
            Value::OptionSome(v) => write!(f, "Some({v:?})"),
            Value::OptionNone => write!(f, "None"),
            Value::Instance { .. } => write!(f, "<instance>"),
            Value::EnumValue { payload, .. } => write!(f, "<enum value {payload:?}>"),
        }
    }
}

impl Value {
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Tuple(_) => "tuple",
            Value::Range { .. } => "range",
            Value::OptionSome(_) | Value::OptionNone => "option",
            Value::Instance { .. } => "instance",
            Value::EnumValue { .. } => "enum",
        }
    }
}

/// Array part plus hash part, same split as Lua tables: small dense integer
/// keys live in `array`, everything else falls into `hash`.
#[derive(Default)]
pub struct Table {
    pub array: Vec<Value>,
    pub hash: AHashMap<TableKey, Value>,
    /// Backing type for metamethod-style operator dispatch (spec.md §6.3):
    /// the class/struct/enum's method table, consulted when a field lookup
    /// misses.
    pub metatable: Option<Rc<RefCell<Table>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Int(i64),
    Str(Sym),
    Bool(bool),
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn get_int(&self, idx: i64) -> Value {
        if idx >= 1 && (idx as usize) <= self.array.len() {
            return self.array[idx as usize - 1].clone();
        }
        self.hash.get(&TableKey::Int(idx)).cloned().unwrap_or(Value::Nil)
    }

    pub fn set_int(&mut self, idx: i64, value: Value) {
        if idx >= 1 && (idx as usize) <= self.array.len() + 1 {
            let i = idx as usize - 1;
            if i == self.array.len() {
                self.array.push(value);
            } else {
                self.array[i] = value;
            }
            return;
        }
        self.hash.insert(TableKey::Int(idx), value);
    }

    pub fn get_str(&self, sym: Sym) -> Value {
        self.hash.get(&TableKey::Str(sym)).cloned().unwrap_or(Value::Nil)
    }

    pub fn set_str(&mut self, sym: Sym, value: Value) {
        self.hash.insert(TableKey::Str(sym), value);
    }

    /// Length per the `#` operator: border of the array part, ignoring holes
    /// in the hash part (spec.md §4.E, matches Lua's `#t` border semantics).
    pub fn len(&self) -> i64 {
        self.array.len() as i64
    }
}

/// A compiled function: its instruction stream, constant pool, and debug
/// info needed for named-argument dispatch (spec.md §4.E "named_call").
#[derive(Debug)]
pub struct FunctionProto {
    pub name: Option<String>,
    pub num_params: u8,
    pub is_vararg: bool,
    pub code: Vec<crate::opcode::Instruction>,
    pub constants: Vec<Value>,
    pub param_names: Vec<Sym>,
    pub upvalue_names: Vec<Sym>,
    pub nested: Vec<Rc<FunctionProto>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_array_part_grows_contiguously() {
        let mut t = Table::new();
        t.set_int(1, Value::Int(10));
        t.set_int(2, Value::Int(20));
        assert_eq!(t.len(), 2);
        match t.get_int(2) {
            Value::Int(20) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sparse_int_key_falls_into_hash_part() {
        let mut t = Table::new();
        t.set_int(100, Value::Bool(true));
        assert_eq!(t.len(), 0);
        assert!(matches!(t.get_int(100), Value::Bool(true)));
    }

    #[test]
    fn nil_and_false_are_the_only_falsy_values() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(0).truthy());
    }
}
