pub mod convert;
pub mod disasm;
pub mod dump;
pub mod error;
pub mod facade;
pub mod host;
pub mod loader;
pub mod machine;
pub mod native;
pub mod opcode;

pub use error::{LoadError, RuntimeError};
pub use facade::Facade;
pub use host::{ChunkReader, FsHost, Host, MemoryReader};
pub use loader::{SourceCompiler, SIGNATURE};
pub use machine::{ArithmeticOps, CallFrame, DataOps, NativeRegistry, VmOptions, VM};
pub use native::{NativeFn, NativeObj};
pub use opcode::OpCode;
