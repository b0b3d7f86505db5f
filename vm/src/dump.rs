//! Serialize prototypes into the binary chunk format read by the loader.

use crate::loader::{
    FORMAT_VERSION, SIGNATURE, TAG_FALSE, TAG_INT, TAG_NIL, TAG_NUMBER, TAG_STRING, TAG_TRUE,
    UPVAL_PARENT_CELL, UPVAL_PARENT_UPVALUE,
};
use byteorder::{LittleEndian, WriteBytesExt};
use memory::{Heap, UpvalueDesc, Value};
use std::io::{self, Write};

/// Write the prototype `function` (and everything nested in it) to `out`.
pub fn dump_chunk<W: Write>(heap: &Heap, function: u32, out: &mut W) -> io::Result<()> {
    out.write_all(SIGNATURE)?;
    out.write_u8(FORMAT_VERSION)?;
    dump_function(heap, function, out)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_u32::<LittleEndian>(bytes.len() as u32)?;
    out.write_all(bytes)
}

fn dump_function<W: Write>(heap: &Heap, handle: u32, out: &mut W) -> io::Result<()> {
    let func = heap
        .get_function(handle)
        .ok_or_else(|| invalid(format!("dangling function handle {}", handle)))?;

    write_bytes(out, func.name.as_bytes())?;
    out.write_u8(func.arity)?;
    out.write_u8(func.is_vararg as u8)?;
    out.write_u16::<LittleEndian>(func.cell_count)?;

    out.write_u32::<LittleEndian>(func.constants.len() as u32)?;
    for c in &func.constants {
        match *c {
            Value::Nil => out.write_u8(TAG_NIL)?,
            Value::Bool(false) => out.write_u8(TAG_FALSE)?,
            Value::Bool(true) => out.write_u8(TAG_TRUE)?,
            Value::Int(i) => {
                out.write_u8(TAG_INT)?;
                out.write_i64::<LittleEndian>(i)?;
            }
            Value::Number(n) => {
                out.write_u8(TAG_NUMBER)?;
                out.write_f64::<LittleEndian>(n)?;
            }
            Value::String(h) => {
                let bytes = heap
                    .get_bytes(h)
                    .ok_or_else(|| invalid(format!("dangling string handle {}", h)))?;
                out.write_u8(TAG_STRING)?;
                write_bytes(out, bytes)?;
            }
            other => {
                return Err(invalid(format!(
                    "constant of type {} cannot be serialized",
                    other.type_name()
                )))
            }
        }
    }

    out.write_u32::<LittleEndian>(func.chunk.len() as u32)?;
    for inst in &func.chunk {
        out.write_u32::<LittleEndian>(*inst)?;
    }

    out.write_u32::<LittleEndian>(func.line_info.len() as u32)?;
    for line in &func.line_info {
        out.write_u32::<LittleEndian>(*line)?;
    }

    out.write_u32::<LittleEndian>(func.upvalue_info.len() as u32)?;
    for desc in &func.upvalue_info {
        let (kind, index) = match *desc {
            UpvalueDesc::ParentCell(i) => (UPVAL_PARENT_CELL, i),
            UpvalueDesc::ParentUpvalue(i) => (UPVAL_PARENT_UPVALUE, i),
        };
        out.write_u8(kind)?;
        out.write_u16::<LittleEndian>(index)?;
    }

    out.write_u32::<LittleEndian>(func.protos.len() as u32)?;
    for &proto in &func.protos {
        dump_function(heap, proto, out)?;
    }
    Ok(())
}
