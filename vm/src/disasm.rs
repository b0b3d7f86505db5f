//! Human-readable listing of a prototype tree.

use crate::convert::number_to_string;
use crate::opcode::{instruction::*, OpCode};
use memory::{Heap, Value};
use std::fmt::Write;

fn constant_text(heap: &Heap, v: Value) -> String {
    match v {
        Value::String(h) => format!("{:?}", heap.get_string_lossy(h).unwrap_or_default()),
        Value::Int(_) | Value::Number(_) => number_to_string(v).unwrap_or_default(),
        Value::Nil => "nil".into(),
        Value::Bool(b) => b.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Render `function` and its nested prototypes, one instruction per line.
pub fn disassemble(heap: &Heap, function: u32) -> String {
    let mut out = String::new();
    disassemble_into(heap, function, "", &mut out);
    out
}

fn disassemble_into(heap: &Heap, handle: u32, path: &str, out: &mut String) {
    let Some(func) = heap.get_function(handle) else {
        let _ = writeln!(out, "== <missing function {}> ==", handle);
        return;
    };
    let _ = writeln!(
        out,
        "== {}{} (params {}{}, cells {}, constants {}) ==",
        func.name,
        path,
        func.arity,
        if func.is_vararg { "+" } else { "" },
        func.cell_count,
        func.constants.len()
    );

    for (i, &inst) in func.chunk.iter().enumerate() {
        let line = func
            .line_at(i)
            .map_or_else(|| "-".to_string(), |l| l.to_string());
        let op_byte = decode_opcode(inst);
        let Some(op) = OpCode::from_u8(op_byte) else {
            let _ = writeln!(out, "{:04} [{:>4}] UNKNOWN({})", i, line, op_byte);
            continue;
        };
        let operands = match op {
            OpCode::LoadConst | OpCode::GetGlobal | OpCode::SetGlobal | OpCode::SelfOp => {
                let k = decode_ax(inst);
                let shown = func
                    .constants
                    .get(k as usize)
                    .map_or_else(|| "?".to_string(), |&v| constant_text(heap, v));
                format!("K[{}] ; {}", k, shown)
            }
            OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfFalseKeep
            | OpCode::JumpIfTrueKeep => format!("-> {:04}", decode_ax(inst)),
            OpCode::Closure => format!("proto {}", decode_ax(inst)),
            _ if op.uses_ax() => format!("{}", decode_ax(inst)),
            OpCode::Call => format!(
                "args {}{}, results {}",
                decode_a(inst),
                if decode_b(inst) != 0 { "+multi" } else { "" },
                match decode_c(inst) {
                    0 => "all".to_string(),
                    c => (c - 1).to_string(),
                }
            ),
            OpCode::Return => format!(
                "{}{}",
                decode_a(inst),
                if decode_b(inst) != 0 { "+multi" } else { "" }
            ),
            OpCode::LoadNil | OpCode::Pop | OpCode::VarArg => format!("{}", decode_a(inst)),
            _ => String::new(),
        };
        let _ = writeln!(out, "{:04} [{:>4}] {:<18} {}", i, line, op.name(), operands);
    }

    for (n, &proto) in func.protos.iter().enumerate() {
        out.push('\n');
        disassemble_into(heap, proto, &format!("{}/{}", path, n), out);
    }
}
