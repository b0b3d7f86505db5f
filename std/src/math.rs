//! The `math` subset: ordering-based `abs`/`max`/`min`, `modf` and `sin`.

use memory::Value;
use vm::{ArithmeticOps, Facade, OpCode, RuntimeError, VM};

/// Larger of `a` and `b`; equal operands yield `b`.
fn max2(vm: &VM, a: Value, b: Value) -> Result<Value, RuntimeError> {
    Ok(if vm.less_than(b, a)? { a } else { b })
}

/// Smaller of `a` and `b`; equal operands yield `a`.
fn min2(vm: &VM, a: Value, b: Value) -> Result<Value, RuntimeError> {
    Ok(if vm.less_than(b, a)? { b } else { a })
}

/// Left fold of `pick` over every argument.
fn fold_args(
    vm: &mut VM,
    pick: fn(&VM, Value, Value) -> Result<Value, RuntimeError>,
) -> Result<(), RuntimeError> {
    let argc = vm.arg_count();
    if argc == 0 {
        return Err(vm.bad_argument(0, "number expected, got no value"));
    }
    let mut acc = vm.arg(0);
    for i in 1..argc {
        let next = vm.arg(i);
        acc = pick(vm, acc, next)?;
    }
    vm.set_result(&[acc]);
    Ok(())
}

/// Numeric argument `i`, keeping integers as integers.
fn numeric_arg(vm: &VM, i: usize) -> Result<Value, RuntimeError> {
    match vm.arg(i) {
        v @ (Value::Int(_) | Value::Number(_)) => Ok(v),
        _ => vm.arg_as_double(i).map(Value::number),
    }
}

pub fn native_abs(vm: &mut VM) -> Result<(), RuntimeError> {
    let v = numeric_arg(vm, 0)?;
    let negated = vm.arith(OpCode::Sub, Value::int(0), v)?;
    let result = max2(vm, v, negated)?;
    vm.set_result(&[result]);
    Ok(())
}

pub fn native_max(vm: &mut VM) -> Result<(), RuntimeError> {
    fold_args(vm, max2)
}

pub fn native_min(vm: &mut VM) -> Result<(), RuntimeError> {
    fold_args(vm, min2)
}

/// Integer part truncated toward zero, and the remainder.
pub fn modf(v: f64) -> (f64, f64) {
    let int_part = if v > 0.0 { v.floor() } else { v.ceil() };
    (int_part, v - int_part)
}

pub fn native_modf(vm: &mut VM) -> Result<(), RuntimeError> {
    let (int_part, frac) = modf(vm.arg_as_double(0)?);
    vm.set_result(&[Value::number(int_part), Value::number(frac)]);
    Ok(())
}

pub fn native_sin(vm: &mut VM) -> Result<(), RuntimeError> {
    let v = vm.arg_as_double(0)?;
    vm.set_result(&[Value::number(v.sin())]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_modf_truncates_toward_zero() {
        let (i, f) = modf(-3.7);
        assert_eq!(i, -3.0);
        assert!((f + 0.7).abs() < 1e-12);
        assert_eq!(modf(2.5), (2.0, 0.5));
        assert_eq!(modf(4.0), (4.0, 0.0));
    }

    #[test]
    fn test_mixed_int_float_ordering() {
        let vm = VM::new();
        assert_eq!(max2(&vm, Value::int(1), Value::number(1.5)).unwrap(), Value::number(1.5));
        assert_eq!(min2(&vm, Value::int(1), Value::number(1.5)).unwrap(), Value::int(1));
        assert!(max2(&vm, Value::int(1), Value::nil()).is_err());
    }

    proptest! {
        #[test]
        fn ties_favor_second_for_max_and_first_for_min(n in -1000i64..1000) {
            let vm = VM::new();
            // 3 and 3.0 compare equal but are distinguishable values.
            let (a, b) = (Value::int(n), Value::number(n as f64));
            prop_assert_eq!(max2(&vm, a, b).unwrap(), b);
            prop_assert_eq!(min2(&vm, a, b).unwrap(), a);
        }

        #[test]
        fn modf_parts_recombine(v in -1.0e9f64..1.0e9) {
            let (i, f) = modf(v);
            prop_assert_eq!(i, i.trunc());
            prop_assert!(f.abs() < 1.0);
            prop_assert!((i + f - v).abs() <= 1e-6);
        }
    }
}
