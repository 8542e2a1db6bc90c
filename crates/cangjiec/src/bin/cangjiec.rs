//! Compile-and-dump driver binary.
//!
//! Grounded in the teacher's `src/bin/bytecode_dump.rs`: read a source file,
//! compile it, print a PC/opcode/operand table plus the constant pool. This
//! crate has no VM to execute the result against (spec.md §1, §6.2 put the
//! interpreter loop out of scope), so unlike the teacher's `bin/main.rs` this
//! driver only compiles and reports — it never runs a script.

use cangjiec::compiler::{compile_with_options, CompileOptions};
use cangjiec::opcode::Instruction;
use cangjiec::value::{FunctionProto, Value};
use std::env;
use std::fs;
use std::rc::Rc;

fn print_usage() {
    eprintln!("usage: cangjiec [--dump] <source_file.cj>");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut dump = false;
    let mut path = None;
    for arg in args.iter().skip(1) {
        if arg == "--dump" {
            dump = true;
        } else {
            path = Some(arg);
        }
    }
    let path = match path {
        Some(p) => p,
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cangjiec: cannot open {path}: {e}");
            std::process::exit(1);
        }
    };

    let options = CompileOptions { chunk_name: path.clone() };
    match compile_with_options(&source, options) {
        Ok(proto) => {
            if dump {
                dump_proto(&proto, 0);
            } else {
                println!("{path}: OK ({} instructions)", proto.code.len());
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn dump_proto(proto: &Rc<FunctionProto>, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}function{} ({} params{}) -- {} instructions, {} constants",
        proto.name.as_deref().map(|n| format!(" {n}")).unwrap_or_default(),
        proto.num_params,
        if proto.is_vararg { ", vararg" } else { "" },
        proto.code.len(),
        proto.constants.len(),
    );
    println!("{indent}{:<4} {:<10} {:<4} {:<6} {:<6}", "PC", "OpCode", "A", "B", "C");
    for (pc, ins) in proto.code.iter().enumerate() {
        println!("{indent}{:<4} {:<10} {:<4} {:<6} {:<6}", pc, format!("{:?}", ins.op), ins.a, operand_b(ins), ins.c);
    }

    if !proto.constants.is_empty() {
        println!("{indent}constants:");
        for (i, k) in proto.constants.iter().enumerate() {
            println!("{indent}  K({i}) = {}", describe_constant(k));
        }
    }

    // Closures are stored as `Function` constants rather than in `nested`
    // (CLOSURE's Bx indexes straight into the constant pool), so recurse
    // through the constant pool to print every function this chunk defines.
    for k in &proto.constants {
        if let Value::Function(nested) = k {
            println!();
            dump_proto(nested, depth + 1);
        }
    }
}

fn operand_b(ins: &Instruction) -> String {
    match ins.op.mode() {
        cangjiec::opcode::OpMode::ABx => format!("{}", ins.bx()),
        cangjiec::opcode::OpMode::AsBx => format!("{}", ins.sbx()),
        _ => format!("{}", ins.b),
    }
}

fn describe_constant(v: &Value) -> String {
    match v {
        Value::Str(s) => format!("{s:?}"),
        other => format!("{other:?}"),
    }
}
