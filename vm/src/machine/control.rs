use crate::convert::str_to_number;
use crate::error::RuntimeError;
use crate::native::NativeCall;
use crate::opcode::{instruction::*, OpCode};
use memory::{Closure, UpvalueDesc, Value};
use tracing::trace;

use super::frame::CallFrame;
use super::stack::StackOps;

/// Trait for control flow instruction handlers
pub trait ControlFlowOps {
    /// `CALL`, `RETURN`, `VARARG`, `CLOSURE`. `Some` carries the results of
    /// a returning entry frame.
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<Option<Vec<Value>>, RuntimeError>;

    fn handle_numeric_for(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<(), RuntimeError>;

    /// Enter closure `handle` whose callee slot is `fpos` with `argc`
    /// arguments above it.
    fn push_closure_frame(
        &mut self,
        handle: u32,
        fpos: usize,
        argc: usize,
        expected: Option<usize>,
        entry: bool,
    ) -> Result<(), RuntimeError>;

    /// Run builtin `handle` on the `argc` values above `fpos` and return
    /// its result list. The callee slot and arguments are consumed.
    fn run_native(
        &mut self,
        handle: u32,
        fpos: usize,
        argc: usize,
        expected: Option<usize>,
    ) -> Result<Vec<Value>, RuntimeError>;

    /// Push `results` adjusted to `expected`, or all of them as multi.
    fn place_results(
        &mut self,
        results: Vec<Value>,
        expected: Option<usize>,
    ) -> Result<(), RuntimeError>;

    /// Pop the running frame and deliver `results` to its caller.
    fn return_values(&mut self, results: Vec<Value>)
        -> Result<Option<Vec<Value>>, RuntimeError>;
}

impl super::vm::VM {
    fn make_closure(&mut self, frame_idx: usize, proto_idx: usize) -> Result<Value, RuntimeError> {
        let (function, env, upvalues) = {
            let frame = &self.frames[frame_idx];
            let current = self
                .heap
                .get_closure(frame.closure)
                .ok_or(RuntimeError::FunctionNotFound)?;
            let proto = *self
                .heap
                .get_function(current.function)
                .and_then(|f| f.protos.get(proto_idx))
                .ok_or(RuntimeError::InvalidOperand)?;
            let descs = &self
                .heap
                .get_function(proto)
                .ok_or(RuntimeError::FunctionNotFound)?
                .upvalue_info;
            let mut upvalues = Vec::with_capacity(descs.len());
            for desc in descs {
                let cell = match *desc {
                    UpvalueDesc::ParentCell(i) => frame.cell(i as usize),
                    UpvalueDesc::ParentUpvalue(i) => current.upvalues.get(i as usize).copied(),
                };
                upvalues.push(cell.ok_or(RuntimeError::InvalidOperand)?);
            }
            (proto, current.env, upvalues)
        };
        let handle = self.heap.alloc_closure(Closure {
            function,
            env,
            upvalues,
        });
        Ok(Value::closure(handle))
    }

    fn for_cells(&self, frame_idx: usize, slot: usize) -> Result<[u32; 3], RuntimeError> {
        let frame = &self.frames[frame_idx];
        match (frame.cell(slot), frame.cell(slot + 1), frame.cell(slot + 2)) {
            (Some(a), Some(b), Some(c)) => Ok([a, b, c]),
            _ => Err(RuntimeError::InvalidOperand),
        }
    }

    fn for_number(&self, v: Value, what: &str) -> Result<Value, RuntimeError> {
        let n = match v {
            Value::Int(_) | Value::Number(_) => Some(v),
            Value::String(h) => self.heap.get_bytes(h).and_then(str_to_number),
            _ => None,
        };
        n.ok_or_else(|| RuntimeError::TypeMismatch(format!("'for' {} must be a number", what)))
    }
}

fn num_le(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x <= y,
        _ => a.as_number().unwrap_or(f64::NAN) <= b.as_number().unwrap_or(f64::NAN),
    }
}

fn is_positive(step: Value) -> bool {
    match step {
        Value::Int(s) => s > 0,
        other => other.as_number().map_or(false, |s| s > 0.0),
    }
}

impl ControlFlowOps for super::vm::VM {
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<Option<Vec<Value>>, RuntimeError> {
        match op {
            OpCode::Call => {
                let fixed = decode_a(instruction) as usize;
                let multi = decode_b(instruction) != 0;
                let c = decode_c(instruction) as usize;
                let argc = fixed + if multi { self.last_multi } else { 0 };
                let fpos = self
                    .stack
                    .len()
                    .checked_sub(argc + 1)
                    .ok_or(RuntimeError::InvalidOperand)?;
                let expected = c.checked_sub(1);
                match self.stack[fpos] {
                    Value::Closure(h) => self.push_closure_frame(h, fpos, argc, expected, false)?,
                    Value::Native(h) => {
                        let results = self.run_native(h, fpos, argc, expected)?;
                        self.place_results(results, expected)?;
                    }
                    other => return Err(self.call_error(other)),
                }
                Ok(None)
            }

            OpCode::Return => {
                let fixed = decode_a(instruction) as usize;
                let multi = decode_b(instruction) != 0;
                let n = fixed + if multi { self.last_multi } else { 0 };
                let results = self.pop_values(n)?;
                self.return_values(results)
            }

            OpCode::VarArg => {
                let wanted = decode_a(instruction) as usize;
                let varargs = self.frames[frame_idx].varargs.clone();
                match wanted.checked_sub(1) {
                    None => self.place_results(varargs, None)?,
                    Some(n) => self.place_results(varargs, Some(n))?,
                }
                Ok(None)
            }

            OpCode::Closure => {
                let closure = self.make_closure(frame_idx, decode_ax(instruction) as usize)?;
                self.push_value(closure)?;
                Ok(None)
            }

            _ => Err(RuntimeError::InvalidOperand),
        }
    }

    fn handle_numeric_for(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<(), RuntimeError> {
        let [idx_cell, limit_cell, step_cell] =
            self.for_cells(frame_idx, decode_ax(instruction) as usize)?;
        let idx = self.heap.get_cell(idx_cell);
        let limit = self.heap.get_cell(limit_cell);
        let step = self.heap.get_cell(step_cell);

        match op {
            OpCode::ForPrep => {
                let idx = self.for_number(idx, "initial value")?;
                let limit = self.for_number(limit, "limit")?;
                let step = self.for_number(step, "step")?;
                let all_int = idx.is_int() && limit.is_int() && step.is_int();
                let norm = |v: Value| {
                    if all_int {
                        v
                    } else {
                        Value::number(v.as_number().unwrap_or(f64::NAN))
                    }
                };
                self.heap.set_cell(idx_cell, norm(idx));
                self.heap.set_cell(limit_cell, norm(limit));
                self.heap.set_cell(step_cell, norm(step));
            }
            OpCode::ForTest => {
                let go = if is_positive(step) {
                    num_le(idx, limit)
                } else {
                    num_le(limit, idx)
                };
                self.push_value(Value::bool(go))?;
            }
            OpCode::ForStep => {
                let next = match (idx, step) {
                    (Value::Int(i), Value::Int(s)) => match i.checked_add(s) {
                        Some(n) => Value::int(n),
                        // Past the representable range the loop is over.
                        None => Value::number(i as f64 + s as f64),
                    },
                    _ => Value::number(
                        idx.as_number().unwrap_or(f64::NAN) + step.as_number().unwrap_or(f64::NAN),
                    ),
                };
                self.heap.set_cell(idx_cell, next);
            }
            _ => return Err(RuntimeError::InvalidOperand),
        }
        Ok(())
    }

    fn push_closure_frame(
        &mut self,
        handle: u32,
        fpos: usize,
        argc: usize,
        expected: Option<usize>,
        entry: bool,
    ) -> Result<(), RuntimeError> {
        self.check_depth()?;
        let (arity, is_vararg, cell_count) = {
            let closure = self
                .heap
                .get_closure(handle)
                .ok_or(RuntimeError::FunctionNotFound)?;
            let func = self
                .heap
                .get_function(closure.function)
                .ok_or(RuntimeError::FunctionNotFound)?;
            (func.arity as usize, func.is_vararg, func.cell_count as usize)
        };
        debug_assert_eq!(self.stack.len(), fpos + 1 + argc);

        let mut args = self.stack.split_off(fpos + 1);
        self.stack.truncate(fpos);

        let mut frame = CallFrame::new(handle, fpos, cell_count.max(arity));
        frame.expected = expected;
        frame.entry = entry;
        if is_vararg && args.len() > arity {
            frame.varargs = args.split_off(arity);
        }
        for i in 0..arity {
            let v = args.get(i).copied().unwrap_or_default();
            frame.cells[i] = self.heap.alloc_cell(v);
        }
        self.frames.push(frame);
        Ok(())
    }

    fn run_native(
        &mut self,
        handle: u32,
        fpos: usize,
        argc: usize,
        expected: Option<usize>,
    ) -> Result<Vec<Value>, RuntimeError> {
        self.check_depth()?;
        let native = self
            .natives
            .get(handle as usize)
            .ok_or(RuntimeError::FunctionNotFound)?;
        let func = native.func;
        trace!(native = %native.name, args = argc, "native call");

        let base = fpos + 1;
        self.native_calls.push(NativeCall {
            native: handle,
            base,
            arg_count: argc,
            expected,
        });
        let outcome = func(self);
        self.native_calls.pop();
        outcome?;

        let results = if self.stack.len() > base {
            self.stack.split_off(base)
        } else {
            Vec::new()
        };
        self.stack.truncate(fpos);
        Ok(results)
    }

    fn place_results(
        &mut self,
        results: Vec<Value>,
        expected: Option<usize>,
    ) -> Result<(), RuntimeError> {
        match expected {
            Some(n) => {
                for i in 0..n {
                    self.push_value(results.get(i).copied().unwrap_or_default())?;
                }
            }
            None => {
                self.last_multi = results.len();
                for v in results {
                    self.push_value(v)?;
                }
            }
        }
        Ok(())
    }

    fn return_values(
        &mut self,
        results: Vec<Value>,
    ) -> Result<Option<Vec<Value>>, RuntimeError> {
        let frame = self.frames.pop().ok_or(RuntimeError::FunctionNotFound)?;
        self.stack.truncate(frame.base);
        if frame.entry {
            return Ok(Some(results));
        }
        self.place_results(results, frame.expected)?;
        Ok(None)
    }
}
