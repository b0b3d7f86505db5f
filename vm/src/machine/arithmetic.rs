use crate::convert::{number_to_string, str_to_number};
use crate::error::RuntimeError;
use crate::opcode::OpCode;
use memory::Value;

use super::stack::StackOps;

/// Trait for arithmetic, comparison and the other operator instructions
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError>;

    /// Binary arithmetic with string coercion and int-to-float overflow.
    fn arith(&self, op: OpCode, a: Value, b: Value) -> Result<Value, RuntimeError>;

    fn concat(&mut self, a: Value, b: Value) -> Result<Value, RuntimeError>;

    /// `#v`: byte length of strings, border of tables.
    fn length(&self, v: Value) -> Result<Value, RuntimeError>;

    fn less_than(&self, a: Value, b: Value) -> Result<bool, RuntimeError>;
    fn less_equal(&self, a: Value, b: Value) -> Result<bool, RuntimeError>;
}

fn as_float(v: Value) -> f64 {
    v.as_number().unwrap_or(f64::NAN)
}

/// Integer op with float fallback when the result does not fit.
fn int_or_float(
    x: Value,
    y: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if let (Value::Int(p), Value::Int(q)) = (x, y) {
        if let Some(r) = int_op(p, q) {
            return Value::int(r);
        }
    }
    Value::number(float_op(as_float(x), as_float(y)))
}

fn floored_mod(x: Value, y: Value) -> Result<Value, RuntimeError> {
    match (x, y) {
        (Value::Int(_), Value::Int(0)) => {
            Err(RuntimeError::TypeMismatch("attempt to perform 'n%0'".into()))
        }
        (Value::Int(p), Value::Int(q)) => {
            let r = p.wrapping_rem(q);
            Ok(Value::int(if r != 0 && (r ^ q) < 0 { r + q } else { r }))
        }
        _ => {
            let (p, q) = (as_float(x), as_float(y));
            Ok(Value::number(p - (p / q).floor() * q))
        }
    }
}

fn compare_error(a: Value, b: Value) -> RuntimeError {
    let (ta, tb) = (a.type_name(), b.type_name());
    if ta == tb {
        RuntimeError::TypeMismatch(format!("attempt to compare two {} values", ta))
    } else {
        RuntimeError::TypeMismatch(format!("attempt to compare {} with {}", ta, tb))
    }
}

impl super::vm::VM {
    /// Numeric view of an operand: numbers as-is, numeric strings parsed.
    fn arith_operand(&self, v: Value) -> Option<Value> {
        match v {
            Value::Int(_) | Value::Number(_) => Some(v),
            Value::String(h) => self.heap.get_bytes(h).and_then(str_to_number),
            _ => None,
        }
    }

    /// Strings and numbers, as concatenation operands.
    fn concat_operand(&self, v: Value) -> Option<Vec<u8>> {
        match v {
            Value::String(h) => self.heap.get_bytes(h).map(<[u8]>::to_vec),
            Value::Int(_) | Value::Number(_) => number_to_string(v).map(String::into_bytes),
            _ => None,
        }
    }
}

impl ArithmeticOps for super::vm::VM {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let result = match op {
            OpCode::Unm => {
                let v = self.pop_value()?;
                match self.arith_operand(v) {
                    Some(Value::Int(i)) => match i.checked_neg() {
                        Some(n) => Value::int(n),
                        None => Value::number(-(i as f64)),
                    },
                    Some(n) => Value::number(-as_float(n)),
                    None => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "attempt to perform arithmetic on a {} value",
                            v.type_name()
                        )))
                    }
                }
            }
            OpCode::Not => Value::bool(self.pop_value()?.is_falsey()),
            OpCode::Len => {
                let v = self.pop_value()?;
                self.length(v)?
            }
            _ => {
                let b = self.pop_value()?;
                let a = self.pop_value()?;
                match op {
                    OpCode::Concat => self.concat(a, b)?,
                    OpCode::Eq => Value::bool(self.values_equal(a, b)),
                    OpCode::Ne => Value::bool(!self.values_equal(a, b)),
                    OpCode::Lt => Value::bool(self.less_than(a, b)?),
                    OpCode::Le => Value::bool(self.less_equal(a, b)?),
                    OpCode::Gt => Value::bool(self.less_than(b, a)?),
                    OpCode::Ge => Value::bool(self.less_equal(b, a)?),
                    _ => self.arith(op, a, b)?,
                }
            }
        };
        self.push_value(result)
    }

    fn arith(&self, op: OpCode, a: Value, b: Value) -> Result<Value, RuntimeError> {
        let (x, y) = match (self.arith_operand(a), self.arith_operand(b)) {
            (Some(x), Some(y)) => (x, y),
            (None, _) => return Err(arith_error(a)),
            (_, None) => return Err(arith_error(b)),
        };
        Ok(match op {
            OpCode::Add => int_or_float(x, y, i64::checked_add, |p, q| p + q),
            OpCode::Sub => int_or_float(x, y, i64::checked_sub, |p, q| p - q),
            OpCode::Mul => int_or_float(x, y, i64::checked_mul, |p, q| p * q),
            OpCode::Div => Value::number(as_float(x) / as_float(y)),
            OpCode::Pow => Value::number(as_float(x).powf(as_float(y))),
            OpCode::Mod => floored_mod(x, y)?,
            _ => return Err(RuntimeError::InvalidOperand),
        })
    }

    fn concat(&mut self, a: Value, b: Value) -> Result<Value, RuntimeError> {
        let bad = |v: Value| {
            RuntimeError::TypeMismatch(format!("attempt to concatenate a {} value", v.type_name()))
        };
        let mut left = self.concat_operand(a).ok_or_else(|| bad(a))?;
        let right = self.concat_operand(b).ok_or_else(|| bad(b))?;
        left.extend_from_slice(&right);
        Ok(self.bytes_value(&left))
    }

    fn length(&self, v: Value) -> Result<Value, RuntimeError> {
        match v {
            Value::String(h) => Ok(Value::int(
                self.heap.get_bytes(h).map_or(0, <[u8]>::len) as i64
            )),
            Value::Table(h) => Ok(Value::int(
                self.heap.get_table(h).map_or(0, |t| t.len()) as i64,
            )),
            other => Err(RuntimeError::TypeMismatch(format!(
                "attempt to get length of a {} value",
                other.type_name()
            ))),
        }
    }

    fn less_than(&self, a: Value, b: Value) -> Result<bool, RuntimeError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(x < y),
            (Value::Int(_) | Value::Number(_), Value::Int(_) | Value::Number(_)) => {
                Ok(as_float(a) < as_float(b))
            }
            (Value::String(x), Value::String(y)) => {
                Ok(self.heap.get_bytes(x) < self.heap.get_bytes(y))
            }
            _ => Err(compare_error(a, b)),
        }
    }

    fn less_equal(&self, a: Value, b: Value) -> Result<bool, RuntimeError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(x <= y),
            (Value::Int(_) | Value::Number(_), Value::Int(_) | Value::Number(_)) => {
                Ok(as_float(a) <= as_float(b))
            }
            (Value::String(x), Value::String(y)) => {
                Ok(self.heap.get_bytes(x) <= self.heap.get_bytes(y))
            }
            _ => Err(compare_error(a, b)),
        }
    }
}

fn arith_error(v: Value) -> RuntimeError {
    RuntimeError::TypeMismatch(format!(
        "attempt to perform arithmetic on a {} value",
        v.type_name()
    ))
}
