use super::chunk_name;
use anyhow::{Context, Result};
use compiler::ChunkCompiler;
use std::fs;
use vm::disasm::disassemble;
use vm::VM;

/// Instruction listing for a source file or binary chunk.
pub fn listing(path: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path))?;
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let main = vm.decode_bytes(&bytes, &chunk_name(path))?;
    Ok(disassemble(&vm.heap, main))
}

pub fn disassemble_file(path: &str) -> Result<()> {
    print!("{}", listing(path)?);
    Ok(())
}
