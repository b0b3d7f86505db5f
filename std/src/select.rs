//! `select`: positional access to a variable-length argument list.

use memory::Value;
use vm::{Facade, RuntimeError, VM};

/// Position selected by `selector`, or `None` when it selects nothing.
///
/// Floats truncate toward zero; strings other than `"#"` and every
/// non-number select nothing.
fn selected_position(selector: Value) -> Option<usize> {
    let n = match selector {
        Value::Int(i) => i,
        Value::Number(f) if f.is_finite() => f.trunc() as i64,
        _ => return None,
    };
    if n <= 0 {
        return None;
    }
    usize::try_from(n).ok()
}

/// Length of the window starting at `position`: the trailing arguments,
/// but never fewer than the call site expects.
pub fn window_len(arg_count: usize, position: usize, expected: usize) -> usize {
    arg_count.saturating_sub(position).max(expected)
}

pub fn native_select(vm: &mut VM) -> Result<(), RuntimeError> {
    let argc = vm.arg_count();
    let selector = vm.arg(0);

    if vm.string_bytes(selector) == Some(b"#".as_slice()) {
        let count = argc.saturating_sub(1) as i64;
        vm.set_result(&[Value::int(count)]);
        return Ok(());
    }

    let Some(position) = selected_position(selector) else {
        vm.set_result(&[]);
        return Ok(());
    };
    let expected = vm.expected_result_count().unwrap_or(0);
    let len = window_len(argc, position, expected);

    // Results overwrite the argument window, so copy first.
    let buffer: Vec<Value> = (0..len)
        .map(|k| vm.arg(position.saturating_add(k)))
        .collect();
    vm.set_result(&buffer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_forms() {
        assert_eq!(selected_position(Value::int(2)), Some(2));
        assert_eq!(selected_position(Value::number(2.9)), Some(2));
        assert_eq!(selected_position(Value::int(0)), None);
        assert_eq!(selected_position(Value::int(-1)), None);
        assert_eq!(selected_position(Value::number(0.5)), None);
        assert_eq!(selected_position(Value::number(f64::NAN)), None);
        assert_eq!(selected_position(Value::nil()), None);
        assert_eq!(selected_position(Value::true_val()), None);
    }

    #[test]
    fn test_window_is_bounded_below_by_expected() {
        // select(2, a, b, c): four arguments including the selector.
        assert_eq!(window_len(4, 2, 0), 2);
        assert_eq!(window_len(4, 2, 5), 5);
        assert_eq!(window_len(4, 9, 0), 0);
        assert_eq!(window_len(4, 9, 1), 1);
    }
}
