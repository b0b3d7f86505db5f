use super::chunk_name;
use anyhow::{bail, Context, Result};
use compiler::ChunkCompiler;
use memory::Heap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use vm::dump::dump_chunk;
use vm::{SourceCompiler, SIGNATURE};

/// Compile `path` to a binary chunk at `output` (default: `path` with a
/// `.luac` extension). Returns where the chunk was written.
pub fn compile_file(path: &str, output: Option<&str>) -> Result<PathBuf> {
    let source = fs::read(path).with_context(|| format!("cannot read '{}'", path))?;
    if source.starts_with(&SIGNATURE[..]) {
        bail!("'{}' is already a binary chunk", path);
    }

    let mut heap = Heap::new();
    let main = ChunkCompiler.compile(&mut heap, &source, &chunk_name(path))?;

    let out = output
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(path).with_extension("luac"));
    let file = File::create(&out).with_context(|| format!("cannot create '{}'", out.display()))?;
    let mut writer = BufWriter::new(file);
    dump_chunk(&heap, main, &mut writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("cannot write '{}'", out.display()))?;

    println!("Saved binary chunk to {}", out.display());
    Ok(out)
}
