//! # Lunette base library
//!
//! The builtins a Lunette script sees at startup, installed into a [`vm::VM`]
//! by [`Registry::install`]:
//!
//! - globals: `assert`, `collectgarbage`, `dofile`, `load`, `loadfile`,
//!   `loadstring`, `next`, `print`, `rawget`, `select`, `setfenv`,
//!   `tonumber`, `tostring`, `unpack`
//! - `math`: `abs`, `max`, `min`, `modf`, `sin`, `huge`, `pi`
//! - `string`: `rep`, `sub` (also reachable as methods on strings)
//!
//! ```no_run
//! use compiler::ChunkCompiler;
//! use lunette_std::Registry;
//! use vm::VM;
//!
//! let mut vm = VM::new();
//! vm.set_compiler(Box::new(ChunkCompiler));
//! Registry::install(&mut vm).unwrap();
//! let main = vm.decode_bytes(b"print(select('#', 1, 2, 3))", "=demo").unwrap();
//! vm.run_main(main).unwrap();
//! ```

pub mod base;
pub mod env;
pub mod loader;
pub mod math;
pub mod registry;
pub mod select;
pub mod string;

pub use loader::{load_file, load_from, load_string, stream_to_closure};
pub use registry::{FunctionId, Namespace, Registry};
