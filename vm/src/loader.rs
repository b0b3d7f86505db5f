use crate::error::LoadError;
use crate::machine::VM;
use crate::opcode::{instruction::decode_opcode, OpCode};
use byteorder::{LittleEndian, ReadBytesExt};
use memory::{Function, Heap, UpvalueDesc, Value};
use std::io::Read;
use tracing::debug;

/// Leading bytes of a precompiled chunk.
pub const SIGNATURE: &[u8; 4] = b"\x1bLNT";
pub const FORMAT_VERSION: u8 = 1;

pub(crate) const TAG_NIL: u8 = 0;
pub(crate) const TAG_FALSE: u8 = 1;
pub(crate) const TAG_TRUE: u8 = 2;
pub(crate) const TAG_INT: u8 = 3;
pub(crate) const TAG_NUMBER: u8 = 4;
pub(crate) const TAG_STRING: u8 = 5;

pub(crate) const UPVAL_PARENT_CELL: u8 = 0;
pub(crate) const UPVAL_PARENT_UPVALUE: u8 = 1;

// Allocation-bomb limits for binary chunks.
const MAX_NAME_LEN: u32 = 1024;
const MAX_STRING_LEN: u32 = 16 * 1024 * 1024;
const MAX_CONSTANTS: u32 = 1_000_000;
const MAX_CODE_LEN: u32 = 1_000_000;
const MAX_UPVALUES: u32 = 1024;
const MAX_PROTOS: u32 = 100_000;
const MAX_NESTING: usize = 200;

/// Turns guest source text into a prototype.
///
/// Injected into the VM by the embedder; the VM itself only understands
/// the binary chunk format.
pub trait SourceCompiler {
    /// Compile `source` and allocate the resulting prototype (and its nested
    /// prototypes and string constants) in `heap`. Returns the handle of the
    /// main function.
    fn compile(&self, heap: &mut Heap, source: &[u8], chunk_name: &str)
        -> Result<u32, LoadError>;
}

/// Display form of a chunk name, used in error messages.
///
/// `=name` and `@name` show `name`; anything else is source text and shows
/// as `[string "first line..."]`.
pub fn chunk_id(chunk_name: &str) -> String {
    const MAX_SOURCE: usize = 45;
    if let Some(rest) = chunk_name.strip_prefix('=') {
        return rest.to_string();
    }
    if let Some(rest) = chunk_name.strip_prefix('@') {
        return rest.to_string();
    }
    let first_line = chunk_name.lines().next().unwrap_or("");
    let truncated = first_line.len() < chunk_name.len() || first_line.chars().count() > MAX_SOURCE;
    let mut shown: String = first_line.chars().take(MAX_SOURCE).collect();
    if truncated {
        shown.push_str("...");
    }
    format!("[string \"{}\"]", shown)
}

impl VM {
    /// Load one chunk from `reader`: binary chunks are decoded directly,
    /// anything else goes to the installed [`SourceCompiler`]. Returns the
    /// handle of the main prototype.
    pub fn decode_chunk(
        &mut self,
        reader: &mut dyn Read,
        chunk_name: &str,
    ) -> Result<u32, LoadError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| LoadError::Io {
                name: chunk_id(chunk_name),
                source,
            })?;
        self.decode_bytes(&bytes, chunk_name)
    }

    pub fn decode_bytes(&mut self, bytes: &[u8], chunk_name: &str) -> Result<u32, LoadError> {
        if let Some(body) = bytes.strip_prefix(&SIGNATURE[..]) {
            debug!(chunk = %chunk_id(chunk_name), size = bytes.len(), "undumping binary chunk");
            let mut cursor = body;
            let version = cursor.read_u8()?;
            if version != FORMAT_VERSION {
                return Err(LoadError::Format(format!(
                    "version mismatch (expected {}, found {})",
                    FORMAT_VERSION, version
                )));
            }
            return undump_function(&mut self.heap, &mut cursor, 0);
        }

        debug!(chunk = %chunk_id(chunk_name), size = bytes.len(), "compiling source chunk");
        match &self.compiler {
            Some(compiler) => compiler.compile(&mut self.heap, bytes, chunk_name),
            None => Err(LoadError::NoCompiler),
        }
    }
}

fn read_bytes<R: Read>(reader: &mut R, limit: u32, what: &str) -> Result<Vec<u8>, LoadError> {
    let len = reader.read_u32::<LittleEndian>()?;
    if len > limit {
        return Err(LoadError::Security(format!(
            "{} length exceeds limit of {}: {}",
            what, limit, len
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_count<R: Read>(reader: &mut R, limit: u32, what: &str) -> Result<usize, LoadError> {
    let count = reader.read_u32::<LittleEndian>()?;
    if count > limit {
        return Err(LoadError::Security(format!("{} count too large: {}", what, count)));
    }
    Ok(count as usize)
}

fn undump_function<R: Read>(
    heap: &mut Heap,
    reader: &mut R,
    depth: usize,
) -> Result<u32, LoadError> {
    if depth > MAX_NESTING {
        return Err(LoadError::Security("prototypes nested too deeply".into()));
    }

    let name = String::from_utf8(read_bytes(reader, MAX_NAME_LEN, "function name")?)
        .map_err(|_| LoadError::Format("invalid UTF-8 in function name".into()))?;
    let arity = reader.read_u8()?;
    let is_vararg = reader.read_u8()? != 0;
    let cell_count = reader.read_u16::<LittleEndian>()?;
    if (arity as u16) > cell_count {
        return Err(LoadError::Format(format!(
            "arity {} exceeds cell count {}",
            arity, cell_count
        )));
    }

    // --- Constants ---
    let const_count = read_count(reader, MAX_CONSTANTS, "constant")?;
    let mut constants = Vec::with_capacity(const_count);
    for _ in 0..const_count {
        let tag = reader.read_u8()?;
        let value = match tag {
            TAG_NIL => Value::nil(),
            TAG_FALSE => Value::false_val(),
            TAG_TRUE => Value::true_val(),
            TAG_INT => Value::int(reader.read_i64::<LittleEndian>()?),
            TAG_NUMBER => Value::number(reader.read_f64::<LittleEndian>()?),
            TAG_STRING => {
                let bytes = read_bytes(reader, MAX_STRING_LEN, "string")?;
                Value::string(heap.intern(&bytes))
            }
            _ => return Err(LoadError::Format(format!("unknown constant tag: {}", tag))),
        };
        constants.push(value);
    }

    // --- Code ---
    let code_len = read_count(reader, MAX_CODE_LEN, "bytecode")?;
    let mut chunk = Vec::with_capacity(code_len);
    for _ in 0..code_len {
        let inst = reader.read_u32::<LittleEndian>()?;
        let op = decode_opcode(inst);
        if OpCode::from_u8(op).is_none() {
            return Err(LoadError::Format(format!("unknown opcode {}", op)));
        }
        chunk.push(inst);
    }

    // --- Line info (parallel to code, or absent) ---
    let line_count = read_count(reader, MAX_CODE_LEN, "line info")?;
    if line_count != 0 && line_count != code_len {
        return Err(LoadError::Format(format!(
            "line info covers {} of {} instructions",
            line_count, code_len
        )));
    }
    let mut line_info = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        line_info.push(reader.read_u32::<LittleEndian>()?);
    }

    // --- Upvalues ---
    let upvalue_count = read_count(reader, MAX_UPVALUES, "upvalue")?;
    let mut upvalue_info = Vec::with_capacity(upvalue_count);
    for _ in 0..upvalue_count {
        let kind = reader.read_u8()?;
        let index = reader.read_u16::<LittleEndian>()?;
        upvalue_info.push(match kind {
            UPVAL_PARENT_CELL => UpvalueDesc::ParentCell(index),
            UPVAL_PARENT_UPVALUE => UpvalueDesc::ParentUpvalue(index),
            _ => return Err(LoadError::Format(format!("unknown upvalue kind: {}", kind))),
        });
    }

    // --- Nested prototypes ---
    let proto_count = read_count(reader, MAX_PROTOS, "prototype")?;
    let mut protos = Vec::with_capacity(proto_count);
    for _ in 0..proto_count {
        protos.push(undump_function(heap, reader, depth + 1)?);
    }

    Ok(heap.alloc_function(Function {
        name,
        arity,
        is_vararg,
        cell_count,
        chunk,
        constants,
        protos,
        upvalue_info,
        line_info,
    }))
}
