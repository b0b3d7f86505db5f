//! Lowers Lunette syntax trees to stack bytecode.
//!
//! ```
//! use compiler::compile_chunk;
//! use memory::Heap;
//!
//! let mut heap = Heap::new();
//! let main = compile_chunk(&mut heap, b"return 1 + 2", "=doc").unwrap();
//! assert!(heap.get_function(main).is_some());
//! ```

pub mod codegen;
pub mod control_flow;
pub mod error;
pub mod expressions;
pub mod function_compiler;
pub mod functions;
pub mod scopes;
pub mod statements;
pub mod types;

pub use codegen::{compile_chunk, ChunkCompiler, Compiler};
pub use error::CompilerError;
