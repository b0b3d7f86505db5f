//! `setfenv`: rebinding the global environment of a closure.

use memory::Value;
use tracing::trace;
use vm::{Facade, RuntimeError, VM};

/// Closure designated by the first `setfenv` argument: the closure itself,
/// or the one running `depth` guest frames up (1 = the caller).
fn resolve_target(vm: &VM) -> Result<Option<u32>, RuntimeError> {
    match vm.arg(0) {
        Value::Closure(handle) => Ok(Some(handle)),
        Value::Int(_) | Value::Number(_) | Value::String(_) => {
            let depth = vm.arg_as_int(0)?;
            if depth == 0 {
                return Err(RuntimeError::Unsupported(
                    "'setfenv' cannot change the running thread's environment".into(),
                ));
            }
            if depth < 0 {
                return Err(vm.bad_argument(0, "level must be non-negative"));
            }
            let frame = usize::try_from(depth)
                .ok()
                .and_then(|d| vm.call_frame(d));
            Ok(frame.map(|f| f.closure))
        }
        other => Err(vm.bad_argument(
            0,
            &format!("function or number expected, got {}", other.type_name()),
        )),
    }
}

pub fn native_setfenv(vm: &mut VM) -> Result<(), RuntimeError> {
    let target = resolve_target(vm)?;
    match (target, vm.arg(1)) {
        (Some(handle), Value::Table(env)) => {
            if let Some(closure) = vm.heap.get_closure_mut(handle) {
                closure.env = env;
            }
            trace!(closure = handle, env, "environment replaced");
            vm.set_result(&[Value::closure(handle)]);
        }
        _ => vm.set_result(&[]),
    }
    Ok(())
}
