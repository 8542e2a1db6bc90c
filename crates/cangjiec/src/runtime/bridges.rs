//! Built-in type method bridges: `Int64`/`Float64`/`String`/`Bool`/`Rune`
//! (spec.md §4.C "extend" built-in-type case, §6.4 string-metatable bridge).
//!
//! Primitive values have nowhere to stash a metatable pointer the way
//! `Table`/`Instance` do, so method calls on them (`"abc".len()`,
//! `3.even()`) resolve through this fixed dispatch table instead of a
//! per-value `__index` slot. Grounded in `luars::stdlib::string`'s method
//! table shape (`len`, `sub`, `upper`, `lower`, `find`, …), widened with the
//! handful of numeric/bool helpers spec.md's examples exercise (`even`,
//! `abs`).

use super::{arg, as_int, as_str, err, RuntimeResult};
use crate::interner::Interner;
use crate::value::Value;

/// `s[i]`: 1-based, UTF-8 character indexing (not byte indexing), matching
/// the character-position semantics `array_slice` already uses for strings.
pub fn string_index(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let s = as_str(arg(args, 0)?)?;
    let idx = as_int(arg(args, 1)?)?;
    let ch = s.chars().nth((idx - 1).max(0) as usize);
    match ch {
        Some(c) => Ok(vec![Value::Str(std::rc::Rc::new(c.to_string()))]),
        None => Err(err(format!("string index {idx} out of range"))),
    }
}

/// `"abc".method(args…)` dispatch for the built-in `String` bridge.
pub fn string_method(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let s = as_str(arg(args, 0)?)?;
    let method = as_str(arg(args, 1)?)?;
    let rest = args.get(2..).unwrap_or(&[]);
    match method.as_str() {
        "len" => Ok(vec![Value::Int(s.chars().count() as i64)]),
        "upper" => Ok(vec![Value::Str(std::rc::Rc::new(s.to_uppercase()))]),
        "lower" => Ok(vec![Value::Str(std::rc::Rc::new(s.to_lowercase()))]),
        "trim" => Ok(vec![Value::Str(std::rc::Rc::new(s.trim().to_string()))]),
        "isEmpty" => Ok(vec![Value::Bool(s.is_empty())]),
        "contains" => {
            let needle = as_str(arg(rest, 0)?)?;
            Ok(vec![Value::Bool(s.contains(needle.as_str()))])
        }
        "split" => {
            let sep = as_str(arg(rest, 0)?)?;
            let parts: Vec<Value> = s.split(sep.as_str()).map(|p| Value::Str(std::rc::Rc::new(p.to_string()))).collect();
            Ok(vec![Value::Table(std::rc::Rc::new(std::cell::RefCell::new(crate::value::Table {
                array: parts,
                hash: Default::default(),
                metatable: None,
            })))])
        }
        other => Err(err(format!("String has no method '{other}'"))),
    }
}

/// `Int64`/`Float64` numeric bridge, dispatched the same way as
/// `string_method` (spec.md §4.C extend built-in-type case).
pub fn numeric_method(_interner: &mut Interner, args: &[Value]) -> RuntimeResult<Vec<Value>> {
    let method = as_str(arg(args, 1)?)?;
    match arg(args, 0)? {
        Value::Int(n) => match method.as_str() {
            "even" => Ok(vec![Value::Bool(n % 2 == 0)]),
            "odd" => Ok(vec![Value::Bool(n % 2 != 0)]),
            "abs" => Ok(vec![Value::Int(n.abs())]),
            "toFloat" => Ok(vec![Value::Float(*n as f64)]),
            other => Err(err(format!("Int64 has no method '{other}'"))),
        },
        Value::Float(x) => match method.as_str() {
            "abs" => Ok(vec![Value::Float(x.abs())]),
            "floor" => Ok(vec![Value::Float(x.floor())]),
            "ceil" => Ok(vec![Value::Float(x.ceil())]),
            "toInt" => Ok(vec![Value::Int(*x as i64)]),
            other => Err(err(format!("Float64 has no method '{other}'"))),
        },
        other => Err(err(format!("expected a number, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn string_method_len_counts_chars_not_bytes() {
        let mut interner = Interner::new();
        let result = string_method(
            &mut interner,
            &[Value::Str(Rc::new("héllo".to_string())), Value::Str(Rc::new("len".to_string()))],
        )
        .unwrap();
        assert!(matches!(result[0], Value::Int(5)));
    }

    #[test]
    fn numeric_method_even_checks_parity() {
        let mut interner = Interner::new();
        let result = numeric_method(&mut interner, &[Value::Int(4), Value::Str(Rc::new("even".to_string()))]).unwrap();
        assert!(matches!(result[0], Value::Bool(true)));
    }
}
