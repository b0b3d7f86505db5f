use crate::native::{NativeFn, NativeObj};
use memory::Value;
use tracing::trace;

/// Trait for native function registration
pub trait NativeRegistry {
    /// Register `func` under `name` and return the callable value. Where the
    /// value is installed is up to the caller.
    fn define_native(&mut self, name: &str, func: NativeFn) -> Value;

    fn native_name(&self, handle: u32) -> Option<&str>;
}

impl NativeRegistry for super::vm::VM {
    fn define_native(&mut self, name: &str, func: NativeFn) -> Value {
        self.natives.push(NativeObj {
            name: name.to_string(),
            func,
        });
        let handle = (self.natives.len() - 1) as u32;
        trace!(name, handle, "native defined");
        Value::native(handle)
    }

    fn native_name(&self, handle: u32) -> Option<&str> {
        self.natives.get(handle as usize).map(|n| n.name.as_str())
    }
}
