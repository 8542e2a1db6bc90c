//! `enum` machinery: case registration, tag testing, payload access
//! (spec.md §4.C "enum", §4.D pattern matching).

use super::{arg, as_int, as_str, as_table, err, RuntimeResult};
use crate::interner::Interner;
use crate::value::{Table, Value};
use std::cell::RefCell;
use std::rc::Rc;

const NAME: &str = "__name";
const CASES: &str = "__cases";

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

pub fn setup_enum(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let name = as_str(arg(args, 0)?)?;
    let t = Rc::new(RefCell::new(Table::new()));
    let name_sym = interner.intern(NAME);
    t.borrow_mut().set_str(name_sym, Value::Str(name));
    nested(&t, interner, CASES);
    Ok(vec![Value::Table(t)])
}

/// Records a case's declared arity so `__cangjie_enum_construct` can check
/// the caller passed the right number of payload values.
pub fn declare_case(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let enum_table = as_table(arg(args, 0)?)?;
    let case_name = as_str(arg(args, 1)?)?;
    let arity = as_int(arg(args, 2)?)?;
    let cases = nested(&enum_table, interner, CASES);
    let case_sym = interner.intern(&case_name);
    cases.borrow_mut().set_str(case_sym, Value::Int(arity));
    Ok(vec![])
}

/// `Case(v1, …, vN)` construction: validates arity and builds the tagged
/// `EnumValue` (spec.md §3.6).
pub fn construct(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let enum_table = as_table(arg(args, 0)?)?;
    let case_name_str = as_str(arg(args, 1)?)?;
    let payload = args.get(2..).unwrap_or(&[]).to_vec();

    let cases = nested(&enum_table, interner, CASES);
    let case_sym = interner.intern(&case_name_str);
    let arity = match cases.borrow().get_str(case_sym) {
        Value::Int(n) => n,
        _ => return Err(err(format!("unknown enum case '{case_name_str}'"))),
    };
    if payload.len() as i64 != arity {
        return Err(err(format!(
            "case '{case_name_str}' expects {arity} value(s), got {}",
            payload.len()
        )));
    }
    let name_sym = interner.intern(NAME);
    let type_name = match enum_table.borrow().get_str(name_sym) {
        Value::Str(s) => interner.intern(&s),
        _ => case_sym,
    };
    Ok(vec![Value::EnumValue {
        type_name,
        case_name: case_sym,
        payload: Rc::new(payload),
    }])
}

/// `__cangjie_match_tag(v, "Tag")`: true iff `v` is an `EnumValue` (or
/// instance) whose tag equals `"Tag"` (spec.md §4.E, §6.4).
pub fn match_tag(interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let value = arg(args, 0)?;
    let tag = as_str(arg(args, 1)?)?;
    let tag_sym = interner.intern(&tag);
    let matches = match value {
        Value::EnumValue { case_name, .. } => *case_name == tag_sym,
        Value::OptionSome(_) => interner.resolve(tag_sym) == "Some",
        Value::OptionNone => interner.resolve(tag_sym) == "None",
        _ => false,
    };
    Ok(vec![Value::Bool(matches)])
}

/// `__cangjie_match_tuple(v, n)`: true iff `v` is a `Tuple` of arity `n`.
pub fn match_tuple(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let value = arg(args, 0)?;
    let n = as_int(arg(args, 1)?)?;
    let matches = matches!(value, Value::Tuple(items) if items.len() as i64 == n);
    Ok(vec![Value::Bool(matches)])
}

/// Extracts payload element `i` (0-based) from an `EnumValue`, or tuple
/// element `i` when given a `Tuple` — both are fixed-arity products at
/// pattern-match time (spec.md §4.D tuple/enum-case patterns).
pub fn enum_payload(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let value = arg(args, 0)?;
    let idx = as_int(arg(args, 1)?)? as usize;
    let item = match value {
        Value::EnumValue { payload, .. } => payload.get(idx).cloned(),
        Value::Tuple(items) => items.get(idx).cloned(),
        Value::OptionSome(inner) if idx == 0 => Some((**inner).clone()),
        _ => None,
    };
    Ok(vec![item.ok_or_else(|| err("payload index out of range"))?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_and_match_round_trip() {
        let mut interner = Interner::new();
        let shape = setup_enum(&mut interner, &[Value::Str(Rc::new("Shape".to_string()))]).unwrap().remove(0);
        declare_case(
            &mut interner,
            &[shape.clone(), Value::Str(Rc::new("Circle".to_string())), Value::Int(1)],
        )
        .unwrap();

        let circle = construct(
            &mut interner,
            &[shape, Value::Str(Rc::new("Circle".to_string())), Value::Float(2.0)],
        )
        .unwrap()
        .remove(0);

        let is_circle = match_tag(&mut interner, &[circle.clone(), Value::Str(Rc::new("Circle".to_string()))]).unwrap();
        assert!(matches!(is_circle[0], Value::Bool(true)));

        let radius = enum_payload(&mut interner, &[circle, Value::Int(0)]).unwrap();
        assert!(matches!(radius[0], Value::Float(r) if r == 2.0));
    }

    #[test]
    fn construct_rejects_wrong_arity() {
        let mut interner = Interner::new();
        let shape = setup_enum(&mut interner, &[Value::Str(Rc::new("Shape".to_string()))]).unwrap().remove(0);
        declare_case(
            &mut interner,
            &[shape.clone(), Value::Str(Rc::new("Circle".to_string())), Value::Int(1)],
        )
        .unwrap();
        let result = construct(&mut interner, &[shape, Value::Str(Rc::new("Circle".to_string()))]);
        assert!(result.is_err());
    }
}
