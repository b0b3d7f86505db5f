//! Global builtins: assertion, coercion, raw access, `unpack`, `print`.

use memory::Value;
use tracing::trace;
use vm::convert::{str_to_int_radix, str_to_number};
use vm::{Facade, RuntimeError, VM};

/// Largest window `unpack` will produce.
const MAX_UNPACK: i64 = 1_000_000;

pub fn native_assert(vm: &mut VM) -> Result<(), RuntimeError> {
    if vm.arg(0).is_truthy() {
        // Arguments stay in place as the results.
        return Ok(());
    }
    let message = vm.arg(1);
    let value = if message.is_nil() {
        vm.str_value("assertion failed!")
    } else {
        message
    };
    Err(RuntimeError::AssertionFailed {
        value,
        text: vm.tostring_lossy(value),
    })
}

pub fn native_tonumber(vm: &mut VM) -> Result<(), RuntimeError> {
    let base = if vm.arg(1).is_nil() {
        10
    } else {
        vm.arg_as_int(1)?
    };
    if !(2..=36).contains(&base) {
        return Err(vm.bad_argument(1, "base out of range"));
    }

    let result = match vm.arg(0) {
        v @ (Value::Int(_) | Value::Number(_)) => v,
        Value::String(h) => {
            let bytes = vm.heap.get_bytes(h).unwrap_or_default();
            let parsed = if base == 10 {
                str_to_number(bytes)
            } else {
                str_to_int_radix(bytes, base as u32).map(Value::int)
            };
            parsed.unwrap_or_default()
        }
        _ => Value::nil(),
    };
    vm.set_result(&[result]);
    Ok(())
}

pub fn native_rawget(vm: &mut VM) -> Result<(), RuntimeError> {
    let value = vm.raw_get(vm.arg(0), vm.arg(1));
    vm.set_result(&[value]);
    Ok(())
}

pub fn native_tostring(vm: &mut VM) -> Result<(), RuntimeError> {
    let text = vm.tostring(vm.arg(0));
    let value = vm.bytes_value(&text);
    vm.set_result(&[value]);
    Ok(())
}

/// Omitted, nil and zero bounds all take the default.
fn unpack_bound(vm: &VM, i: usize, default: i64) -> Result<i64, RuntimeError> {
    if vm.arg(i).is_nil() {
        return Ok(default);
    }
    match vm.arg_as_int(i)? {
        0 => Ok(default),
        n => Ok(n),
    }
}

pub fn native_unpack(vm: &mut VM) -> Result<(), RuntimeError> {
    let list = vm.arg(0);
    let Value::Table(handle) = list else {
        return Err(RuntimeError::TypeMismatch(format!(
            "not a list: {}",
            vm.tostring_lossy(list)
        )));
    };
    let len = vm.heap.get_table(handle).map_or(0, |t| t.len()) as i64;

    let first = unpack_bound(vm, 1, 1)?;
    let last = unpack_bound(vm, 2, len)?;
    if first > last {
        vm.set_result(&[]);
        return Ok(());
    }
    match last.checked_sub(first) {
        Some(span) if span < MAX_UNPACK => {}
        _ => return Err(RuntimeError::TypeMismatch("too many results to unpack".into())),
    }

    let values: Vec<Value> = match vm.heap.get_table(handle) {
        Some(t) => (first..=last).map(|i| t.get_int(i)).collect(),
        None => Vec::new(),
    };
    vm.set_result(&values);
    Ok(())
}

pub fn native_next(_vm: &mut VM) -> Result<(), RuntimeError> {
    Err(RuntimeError::Unsupported(
        "'next' is not supported: tables cannot be traversed".into(),
    ))
}

pub fn native_print(vm: &mut VM) -> Result<(), RuntimeError> {
    let mut line = Vec::new();
    for i in 0..vm.arg_count() {
        if i > 0 {
            line.push(b'\t');
        }
        line.extend_from_slice(&vm.tostring(vm.arg(i)));
    }
    line.push(b'\n');
    let out = vm.host.stdout();
    out.write_all(&line)?;
    out.flush()?;
    vm.set_result(&[]);
    Ok(())
}

/// Collection belongs to the heap owner; this only keeps scripts that call
/// it running.
pub fn native_collectgarbage(vm: &mut VM) -> Result<(), RuntimeError> {
    trace!(args = vm.arg_count(), "collectgarbage ignored");
    vm.set_result(&[]);
    Ok(())
}
