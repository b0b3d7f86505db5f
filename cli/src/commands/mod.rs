pub mod compile;
pub mod disassemble;
pub mod run;

/// Chunk name for a script path, shown as the bare path in messages.
pub fn chunk_name(path: &str) -> String {
    format!("@{}", path)
}
