use crate::error::RuntimeError;
use crate::machine::VM;

/// Signature shared by every builtin.
///
/// Arguments and results travel through the VM's native-call window
/// (see [`crate::Facade`]); whatever sits in the window when the function
/// returns is the result list. A builtin that never sets a result returns
/// its arguments unchanged.
pub type NativeFn = fn(vm: &mut VM) -> Result<(), RuntimeError>;

#[derive(Clone)]
pub struct NativeObj {
    pub name: String,
    pub func: NativeFn,
}

/// Bookkeeping for one active builtin invocation.
#[derive(Debug, Clone, Copy)]
pub struct NativeCall {
    pub native: u32,
    /// Stack index of the first argument (and of the first result).
    pub base: usize,
    pub arg_count: usize,
    pub expected: Option<usize>,
}
