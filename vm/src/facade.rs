//! The surface builtins use to talk to the VM.
//!
//! A builtin sees a window of the operand stack: its arguments on entry and
//! its results on exit. Writing results overwrites the arguments in place,
//! so anything still needed from the arguments must be copied out first.

use crate::convert::{number_to_string, str_to_number};
use crate::error::{LoadError, RuntimeError};
use crate::machine::{CallFrame, NativeRegistry, VM};
use memory::Value;
use std::io::Read;
use tracing::trace;

pub trait Facade {
    /// Number of arguments passed to the running builtin.
    fn arg_count(&self) -> usize;

    /// Argument `i` (0-based); `nil` past the end.
    fn arg(&self, i: usize) -> Value;

    fn arg_as_int(&self, i: usize) -> Result<i64, RuntimeError>;
    fn arg_as_double(&self, i: usize) -> Result<f64, RuntimeError>;
    /// String argument; numbers are converted to their string form.
    fn arg_as_string(&self, i: usize) -> Result<Vec<u8>, RuntimeError>;
    fn arg_as_boolean(&self, i: usize) -> bool;

    /// Results the call site wants, `None` when it takes all of them.
    fn expected_result_count(&self) -> Option<usize>;

    /// Replace the pending results (and the argument window) with `values`.
    fn set_result(&mut self, values: &[Value]);

    /// Append one more result.
    fn push(&mut self, value: Value);

    /// Guest frame `depth` levels above the running builtin (1 = its caller).
    fn call_frame(&self, depth: usize) -> Option<&CallFrame>;

    fn invoke(&mut self, callable: Value, args: &[Value]) -> Result<Vec<Value>, RuntimeError>;

    /// Error that aborts the running call with `value` as its payload.
    fn raise_error(&self, value: Value) -> RuntimeError;

    fn decode_chunk(&mut self, reader: &mut dyn Read, chunk_name: &str)
        -> Result<u32, LoadError>;
}

impl VM {
    fn current_native(&self) -> Option<(usize, usize)> {
        self.native_calls.last().map(|c| (c.base, c.arg_count))
    }

    fn current_native_name(&self) -> &str {
        self.native_calls
            .last()
            .and_then(|c| self.native_name(c.native))
            .unwrap_or("?")
    }

    /// `bad argument #n to 'name' (detail)`
    pub fn bad_argument(&self, i: usize, detail: &str) -> RuntimeError {
        RuntimeError::TypeMismatch(format!(
            "bad argument #{} to '{}' ({})",
            i + 1,
            self.current_native_name(),
            detail
        ))
    }

    fn expected_type(&self, i: usize, expected: &str) -> RuntimeError {
        let got = match self.arg_count() {
            n if i >= n => "no value",
            _ => self.arg(i).type_name(),
        };
        self.bad_argument(i, &format!("{} expected, got {}", expected, got))
    }

    /// Numeric view of an argument, parsing numeric strings.
    fn arg_number(&self, i: usize) -> Option<Value> {
        match self.arg(i) {
            v @ (Value::Int(_) | Value::Number(_)) => Some(v),
            Value::String(h) => self.heap.get_bytes(h).and_then(str_to_number),
            _ => None,
        }
    }
}

impl Facade for VM {
    fn arg_count(&self) -> usize {
        self.current_native().map_or(0, |(_, n)| n)
    }

    fn arg(&self, i: usize) -> Value {
        match self.current_native() {
            Some((base, n)) if i < n => self.stack.get(base + i).copied().unwrap_or_default(),
            _ => Value::nil(),
        }
    }

    fn arg_as_int(&self, i: usize) -> Result<i64, RuntimeError> {
        self.arg_number(i)
            .and_then(|v| v.as_int())
            .ok_or_else(|| self.expected_type(i, "number"))
    }

    fn arg_as_double(&self, i: usize) -> Result<f64, RuntimeError> {
        self.arg_number(i)
            .and_then(|v| v.as_number())
            .ok_or_else(|| self.expected_type(i, "number"))
    }

    fn arg_as_string(&self, i: usize) -> Result<Vec<u8>, RuntimeError> {
        match self.arg(i) {
            Value::String(h) => Ok(self.heap.get_bytes(h).unwrap_or_default().to_vec()),
            v @ (Value::Int(_) | Value::Number(_)) => {
                Ok(number_to_string(v).unwrap_or_default().into_bytes())
            }
            _ => Err(self.expected_type(i, "string")),
        }
    }

    fn arg_as_boolean(&self, i: usize) -> bool {
        self.arg(i).is_truthy()
    }

    fn expected_result_count(&self) -> Option<usize> {
        self.native_calls.last().and_then(|c| c.expected)
    }

    fn set_result(&mut self, values: &[Value]) {
        if let Some((base, _)) = self.current_native() {
            self.stack.truncate(base);
            self.stack.extend_from_slice(values);
        }
    }

    fn push(&mut self, value: Value) {
        if self.current_native().is_some() {
            self.stack.push(value);
        }
    }

    fn call_frame(&self, depth: usize) -> Option<&CallFrame> {
        let index = self.frames.len().checked_sub(depth)?;
        if depth == 0 {
            return None;
        }
        self.frames.get(index)
    }

    fn invoke(&mut self, callable: Value, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        trace!(from = self.current_native_name(), "nested invoke");
        self.call_value(callable, args)
    }

    fn raise_error(&self, value: Value) -> RuntimeError {
        RuntimeError::Raised {
            value,
            text: self.tostring_lossy(value),
        }
    }

    fn decode_chunk(
        &mut self,
        reader: &mut dyn Read,
        chunk_name: &str,
    ) -> Result<u32, LoadError> {
        VM::decode_chunk(self, reader, chunk_name)
    }
}
