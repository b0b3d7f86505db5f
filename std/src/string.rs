//! `string.sub` and `string.rep`.

use memory::Value;
use vm::{Facade, RuntimeError, VM};

/// Results longer than this are refused by `rep`.
pub const MAX_STRING_LEN: usize = i32::MAX as usize;

/// Turn 1-based, possibly negative `i`/`j` into a half-open byte range
/// inside `[0, len]`.
pub fn normalize_range(len: usize, i: i64, j: i64) -> (usize, usize) {
    let len = len as i64;
    let start = match i {
        i if i < 0 => len.saturating_add(i).max(0),
        0 => 0,
        i => i - 1,
    };
    let end = if j < 0 {
        start.max(len.saturating_add(j).saturating_add(1))
    } else {
        start.max(j).min(len)
    };
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    (start.min(end), end)
}

pub fn native_sub(vm: &mut VM) -> Result<(), RuntimeError> {
    let s = vm.arg_as_string(0)?;
    let i = vm.arg_as_int(1)?;
    let j = if vm.arg(2).is_nil() {
        -1
    } else {
        vm.arg_as_int(2)?
    };
    let (start, end) = normalize_range(s.len(), i, j);
    let value = vm.bytes_value(&s[start..end]);
    vm.set_result(&[value]);
    Ok(())
}

/// `s` repeated `n` times, or `None` if the result would be too large.
pub fn repeat(s: &[u8], n: usize) -> Option<Vec<u8>> {
    let total = s.len().checked_mul(n).filter(|&t| t <= MAX_STRING_LEN)?;
    let mut buffer = Vec::with_capacity(total);
    if total == 0 {
        return Some(buffer);
    }
    buffer.extend_from_slice(s);
    // Double the filled prefix until the buffer is full.
    while buffer.len() < total {
        let take = (total - buffer.len()).min(buffer.len());
        buffer.extend_from_within(..take);
    }
    Some(buffer)
}

pub fn native_rep(vm: &mut VM) -> Result<(), RuntimeError> {
    let s = vm.arg_as_string(0)?;
    let n = vm.arg_as_int(1)?;
    if n < 0 {
        vm.set_result(&[Value::nil()]);
        return Ok(());
    }
    let count = usize::try_from(n).map_err(|_| vm.bad_argument(1, "count too large"))?;
    let bytes = repeat(&s, count)
        .ok_or_else(|| RuntimeError::TypeMismatch("resulting string too large".into()))?;
    let value = vm.bytes_value(&bytes);
    vm.set_result(&[value]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize_range(5, 2, -1), (1, 5));
        assert_eq!(normalize_range(5, -3, -1), (2, 5));
        assert_eq!(normalize_range(5, 2, -2), (1, 4));
        assert_eq!(normalize_range(5, 10, -1), (5, 5));
        assert_eq!(normalize_range(5, 0, 0), (0, 0));
        assert_eq!(normalize_range(5, -100, 2), (0, 2));
        assert_eq!(normalize_range(0, 1, -1), (0, 0));
    }

    #[test]
    fn test_repeat() {
        assert_eq!(repeat(b"ab", 3).unwrap(), b"ababab");
        assert_eq!(repeat(b"ab", 0).unwrap(), b"");
        assert_eq!(repeat(b"", 1_000_000_000).unwrap(), b"");
        assert!(repeat(b"ab", usize::MAX).is_none());
    }

    proptest! {
        #[test]
        fn normalized_range_stays_in_bounds(len in 0usize..512, i in any::<i64>(), j in any::<i64>()) {
            let (start, end) = normalize_range(len, i, j);
            prop_assert!(start <= end);
            prop_assert!(end <= len);
        }

        #[test]
        fn positive_indices_select_inclusive_range(len in 1usize..64, a in 1i64..64, b in 1i64..64) {
            let (i, j) = (a.min(b), a.max(b));
            let (start, end) = normalize_range(len, i, j);
            let expected_end = (j as usize).min(len);
            let expected_start = ((i - 1) as usize).min(expected_end);
            prop_assert_eq!((start, end), (expected_start, expected_end));
        }
    }
}
