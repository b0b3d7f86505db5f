//! Machine module - VM implementation
//!
//! The interpreter is split by concern: each submodule contributes one
//! `*Ops` trait implemented for [`VM`].

mod arithmetic;
mod control;
mod data;
mod frame;
mod globals;
mod native;
mod stack;
mod vm;

// Public API
pub use arithmetic::ArithmeticOps;
pub use data::DataOps;
pub use frame::CallFrame;
pub use native::NativeRegistry;
pub use vm::{VmOptions, VM};
