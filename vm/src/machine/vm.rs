use crate::convert::number_to_string;
use crate::error::RuntimeError;
use crate::host::{FsHost, Host};
use crate::loader::SourceCompiler;
use crate::native::{NativeCall, NativeObj};
use crate::opcode::{instruction::*, OpCode};
use memory::{Closure, Heap, Key, Table, Value};
use tracing::{debug, trace};

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::frame::CallFrame;
use super::globals::GlobalOps;
use super::stack::StackOps;

/// Builtins and closures live in separate arenas; the tag keeps their
/// printed addresses apart.
const NATIVE_ADDRESS_TAG: u32 = 0x8000_0000;

/// Tunables for one interpreter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOptions {
    /// Guest frames plus active builtins before `stack overflow`.
    pub max_call_depth: usize,
    /// Operand stack capacity in values.
    pub max_stack: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 200,
            max_stack: 1_000_000,
        }
    }
}

/// The Virtual Machine struct
pub struct VM {
    pub heap: Heap,
    pub stack: Vec<Value>,
    pub frames: Vec<CallFrame>,
    pub natives: Vec<NativeObj>,
    /// Builtins currently executing, innermost last.
    pub native_calls: Vec<NativeCall>,

    /// Table handle of the default global environment.
    pub globals: u32,
    /// Table consulted when a string value is indexed (`s:upper()`).
    pub string_methods: u32,

    /// Where named resources and standard input come from.
    pub host: Box<dyn Host>,
    /// Turns source text into prototypes; binary chunks load without one.
    pub compiler: Option<Box<dyn SourceCompiler>>,

    pub options: VmOptions,

    /// Value count produced by the last multi-result instruction.
    pub last_multi: usize,

    /// Function name and source line where the last error surfaced.
    pub last_error_location: Option<(String, u32)>,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        let mut heap = Heap::new();
        let globals = heap.alloc_table(Table::new());
        let string_methods = heap.alloc_table(Table::new());
        Self {
            heap,
            stack: Vec::with_capacity(1024),
            frames: Vec::with_capacity(64),
            natives: Vec::new(),
            native_calls: Vec::new(),
            globals,
            string_methods,
            host: Box::new(FsHost::default()),
            compiler: None,
            options,
            last_multi: 0,
            last_error_location: None,
        }
    }

    pub fn set_host(&mut self, host: Box<dyn Host>) {
        self.host = host;
    }

    pub fn set_compiler(&mut self, compiler: Box<dyn SourceCompiler>) {
        self.compiler = Some(compiler);
    }

    // ------------------------------------------------------------------
    // Value helpers
    // ------------------------------------------------------------------

    /// Intern `s` and wrap it as a string value.
    pub fn str_value(&mut self, s: &str) -> Value {
        self.heap.string_value(s.as_bytes())
    }

    pub fn bytes_value(&mut self, bytes: &[u8]) -> Value {
        self.heap.string_value(bytes)
    }

    /// Bytes of a string value; `None` for every other kind.
    pub fn string_bytes(&self, v: Value) -> Option<&[u8]> {
        match v {
            Value::String(h) => self.heap.get_bytes(h),
            _ => None,
        }
    }

    pub fn new_table(&mut self) -> Value {
        Value::table(self.heap.alloc_table(Table::new()))
    }

    /// `t[k]` without any string-method fallback. Non-tables read as nil.
    pub fn raw_get(&self, table: Value, key: Value) -> Value {
        match table {
            Value::Table(h) => self
                .heap
                .get_table(h)
                .map_or(Value::nil(), |t| t.get_value(key)),
            _ => Value::nil(),
        }
    }

    pub fn raw_set(&mut self, table: Value, key: Value, value: Value) -> Result<(), RuntimeError> {
        self.set_index(table, key, value)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let key = self.heap.intern(name.as_bytes());
        if let Some(t) = self.heap.get_table_mut(self.globals) {
            t.set(Key::String(key), value);
        }
    }

    pub fn get_global(&self, name: &str) -> Value {
        match self.heap.find_string(name.as_bytes()) {
            Some(h) => self.raw_get(Value::table(self.globals), Value::string(h)),
            None => Value::nil(),
        }
    }

    /// Guest-visible string form of any value.
    pub fn tostring(&self, v: Value) -> Vec<u8> {
        match v {
            Value::Nil => b"nil".to_vec(),
            Value::Bool(true) => b"true".to_vec(),
            Value::Bool(false) => b"false".to_vec(),
            Value::Int(_) | Value::Number(_) => {
                number_to_string(v).unwrap_or_default().into_bytes()
            }
            Value::String(h) => self.heap.get_bytes(h).unwrap_or_default().to_vec(),
            Value::Table(h) => format!("table: 0x{:08x}", h).into_bytes(),
            Value::Closure(h) => format!("function: 0x{:08x}", h).into_bytes(),
            Value::Native(h) => {
                format!("function: 0x{:08x}", NATIVE_ADDRESS_TAG | h).into_bytes()
            }
        }
    }

    pub fn tostring_lossy(&self, v: Value) -> String {
        String::from_utf8_lossy(&self.tostring(v)).into_owned()
    }

    /// Primitive equality: numbers compare by value across int/float,
    /// everything else by identity (strings are interned).
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Int(x), Value::Number(y)) | (Value::Number(y), Value::Int(x)) => {
                (x as f64) == y
            }
            _ => a == b,
        }
    }

    /// Wrap prototype `function` in a closure whose environment is the
    /// default globals table.
    pub fn new_closure(&mut self, function: u32) -> Value {
        let handle = self.heap.alloc_closure(Closure {
            function,
            env: self.globals,
            upvalues: Vec::new(),
        });
        Value::closure(handle)
    }

    /// Run a freshly loaded prototype with no arguments.
    pub fn run_main(&mut self, function: u32) -> Result<Vec<Value>, RuntimeError> {
        let main = self.new_closure(function);
        self.call_value(main, &[])
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Call any callable value with `args` and collect every result.
    ///
    /// Re-entrant: builtins use this to call back into guest code. On error
    /// the stack, frames and builtin records are restored to their state at
    /// entry.
    pub fn call_value(&mut self, callee: Value, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let stack_mark = self.stack.len();
        let frames_mark = self.frames.len();
        let natives_mark = self.native_calls.len();
        if frames_mark == 0 && natives_mark == 0 {
            self.last_error_location = None;
        }
        trace!(callee = callee.type_name(), args = args.len(), depth = frames_mark, "call_value");

        let result = self.call_value_inner(callee, args, stack_mark);
        if result.is_err() {
            self.stack.truncate(stack_mark);
            self.frames.truncate(frames_mark);
            self.native_calls.truncate(natives_mark);
        }
        result
    }

    fn call_value_inner(
        &mut self,
        callee: Value,
        args: &[Value],
        fpos: usize,
    ) -> Result<Vec<Value>, RuntimeError> {
        self.push_value(callee)?;
        for &arg in args {
            self.push_value(arg)?;
        }
        match callee {
            Value::Closure(h) => {
                self.push_closure_frame(h, fpos, args.len(), None, true)?;
                self.execute()
            }
            Value::Native(h) => self.run_native(h, fpos, args.len(), None),
            other => Err(self.call_error(other)),
        }
    }

    pub(crate) fn call_error(&self, callee: Value) -> RuntimeError {
        RuntimeError::TypeMismatch(format!("attempt to call a {} value", callee.type_name()))
    }

    /// Guest frames plus active builtins must stay under the configured depth.
    pub(crate) fn check_depth(&self) -> Result<(), RuntimeError> {
        if self.frames.len() + self.native_calls.len() >= self.options.max_call_depth {
            debug!(depth = self.frames.len(), "call depth exceeded");
            return Err(RuntimeError::StackOverflow);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interpreter loop
    // ------------------------------------------------------------------

    /// Run until the innermost entry frame returns.
    pub(crate) fn execute(&mut self) -> Result<Vec<Value>, RuntimeError> {
        loop {
            match self.step() {
                Ok(Some(results)) => return Ok(results),
                Ok(None) => {}
                Err(e) => {
                    self.record_error_location();
                    return Err(e);
                }
            }
        }
    }

    /// Remember where the innermost failing guest function was. Only the
    /// first (deepest) location of an unwinding error is kept.
    fn record_error_location(&mut self) {
        if self.last_error_location.is_some() {
            return;
        }
        let Some(frame) = self.frames.last() else {
            return;
        };
        let Some(func) = self
            .heap
            .get_closure(frame.closure)
            .and_then(|c| self.heap.get_function(c.function))
        else {
            return;
        };
        let line = func.line_at(frame.ip.saturating_sub(1)).unwrap_or(0);
        self.last_error_location = Some((func.name.clone(), line));
    }

    fn constant(&self, function: u32, index: u32) -> Result<Value, RuntimeError> {
        self.heap
            .get_function(function)
            .and_then(|f| f.constants.get(index as usize).copied())
            .ok_or(RuntimeError::InvalidOperand)
    }

    /// Execute one instruction. `Some` carries the results of a returning
    /// entry frame.
    fn step(&mut self) -> Result<Option<Vec<Value>>, RuntimeError> {
        let frame_idx = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(RuntimeError::FunctionNotFound)?;
        let (closure_idx, ip) = {
            let f = &self.frames[frame_idx];
            (f.closure, f.ip)
        };
        let func_idx = self
            .heap
            .get_closure(closure_idx)
            .ok_or(RuntimeError::FunctionNotFound)?
            .function;
        let func = self
            .heap
            .get_function(func_idx)
            .ok_or(RuntimeError::FunctionNotFound)?;

        // Falling off the end is an implicit `return`.
        let Some(&instruction) = func.chunk.get(ip) else {
            return self.return_values(Vec::new());
        };
        self.frames[frame_idx].ip += 1;

        let op_byte = decode_opcode(instruction);
        let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;

        use crate::opcode::OpCode::*;

        match op {
            LoadNil => {
                for _ in 0..decode_a(instruction) {
                    self.push_value(Value::nil())?;
                }
            }
            LoadTrue => self.push_value(Value::true_val())?,
            LoadFalse => self.push_value(Value::false_val())?,
            LoadConst => {
                let k = self.constant(func_idx, decode_ax(instruction))?;
                self.push_value(k)?;
            }

            // Cells, upvalues and globals (delegated to globals.rs)
            GetCell | SetCell | NewCell | GetUpval | SetUpval => {
                self.handle_variables(op, instruction, frame_idx)?;
            }
            GetGlobal | SetGlobal => {
                let key = self.constant(func_idx, decode_ax(instruction))?;
                self.handle_globals(op, key, closure_idx)?;
            }

            // Tables (delegated to data.rs)
            GetIndex | StoreIndex | NewTable | InitIndex | SetList => {
                self.handle_data(op, instruction)?;
            }
            SelfOp => {
                let key = self.constant(func_idx, decode_ax(instruction))?;
                let obj = self.pop_value()?;
                let method = self.index_value(obj, key)?;
                self.push_value(method)?;
                self.push_value(obj)?;
            }

            // Arithmetic and comparison (delegated to arithmetic.rs)
            Add | Sub | Mul | Div | Mod | Pow | Unm | Concat | Len | Not | Eq | Ne | Lt
            | Le | Gt | Ge => {
                self.handle_arithmetic(op)?;
            }

            Jump => {
                self.frames[frame_idx].ip = decode_ax(instruction) as usize;
            }
            JumpIfFalse => {
                if self.pop_value()?.is_falsey() {
                    self.frames[frame_idx].ip = decode_ax(instruction) as usize;
                }
            }
            JumpIfFalseKeep => {
                if self.peek_value()?.is_falsey() {
                    self.frames[frame_idx].ip = decode_ax(instruction) as usize;
                } else {
                    self.pop_value()?;
                }
            }
            JumpIfTrueKeep => {
                if self.peek_value()?.is_truthy() {
                    self.frames[frame_idx].ip = decode_ax(instruction) as usize;
                } else {
                    self.pop_value()?;
                }
            }
            Pop => {
                self.pop_values(decode_a(instruction) as usize)?;
            }

            // Numeric for and function plumbing (delegated to control.rs)
            ForPrep | ForTest | ForStep => {
                self.handle_numeric_for(op, instruction, frame_idx)?;
            }
            Call | Return | VarArg | Closure => {
                return self.handle_control(op, instruction, frame_idx);
            }
        }
        Ok(None)
    }
}
