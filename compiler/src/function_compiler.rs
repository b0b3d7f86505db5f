use crate::error::CompilerError;
use crate::types::{Local, LoopContext};
use memory::{UpvalueDesc, Value};
use vm::opcode::instruction::{encode_abc, encode_ax, MAX_AX};
use vm::opcode::OpCode;

/// State specific to ONE function being compiled
pub struct FunctionCompiler {
    pub name: String,
    pub arity: u8,
    pub is_vararg: bool,
    pub locals: Vec<Local>,
    pub scope_depth: u32,
    pub bytecode: Vec<u32>,
    pub line_info: Vec<u32>,
    pub constants: Vec<Value>,
    /// Captured names, in upvalue index order.
    pub upvalues: Vec<(String, UpvalueDesc)>,
    /// Heap handles of nested prototypes, in `CLOSURE` operand order.
    pub protos: Vec<u32>,
    pub loop_stack: Vec<LoopContext>,

    /// Next free cell slot; slots are reused once their scope closes.
    pub next_cell: u16,
    pub max_cells: u16,

    /// Line stamped on emitted instructions.
    pub current_line: u32,
}

impl FunctionCompiler {
    /// Parameters occupy the first `params.len()` cell slots.
    pub fn new(name: String, params: &[String], is_vararg: bool, line: u32) -> Self {
        let arity = params.len() as u8;
        let locals = params
            .iter()
            .enumerate()
            .map(|(i, p)| Local {
                name: p.clone(),
                depth: 0,
                cell: i as u16,
            })
            .collect();
        Self {
            name,
            arity,
            is_vararg,
            locals,
            scope_depth: 0,
            bytecode: Vec::new(),
            line_info: Vec::new(),
            constants: Vec::new(),
            upvalues: Vec::new(),
            protos: Vec::new(),
            loop_stack: Vec::new(),
            next_cell: arity as u16,
            max_cells: arity as u16,
            current_line: line,
        }
    }

    pub fn alloc_cell(&mut self) -> Result<u16, CompilerError> {
        let cell = self.next_cell;
        self.next_cell = cell
            .checked_add(1)
            .ok_or_else(|| CompilerError::limit("too many local variables", self.current_line))?;
        self.max_cells = self.max_cells.max(self.next_cell);
        Ok(cell)
    }

    pub fn add_constant(&mut self, val: Value) -> Result<u32, CompilerError> {
        // Floats compare bitwise so 0.0 and -0.0 stay distinct.
        let same = |c: &Value| match (c, &val) {
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            _ => c == &val,
        };
        if let Some(idx) = self.constants.iter().position(same) {
            return Ok(idx as u32);
        }
        if self.constants.len() as u32 > MAX_AX {
            return Err(CompilerError::limit("too many constants", self.current_line));
        }
        self.constants.push(val);
        Ok((self.constants.len() - 1) as u32)
    }

    pub fn add_upvalue(&mut self, name: &str, desc: UpvalueDesc) -> Result<u16, CompilerError> {
        if let Some(i) = self.upvalues.iter().position(|(_, d)| *d == desc) {
            return Ok(i as u16);
        }
        if self.upvalues.len() >= u16::MAX as usize {
            return Err(CompilerError::limit("too many upvalues", self.current_line));
        }
        self.upvalues.push((name.to_string(), desc));
        Ok((self.upvalues.len() - 1) as u16)
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) -> usize {
        self.bytecode.push(encode_abc(op.as_u8(), a, b, c));
        self.line_info.push(self.current_line);
        self.bytecode.len() - 1
    }

    pub fn emit_ax(&mut self, op: OpCode, ax: u32) -> usize {
        self.bytecode.push(encode_ax(op.as_u8(), ax));
        self.line_info.push(self.current_line);
        self.bytecode.len() - 1
    }

    /// Emit a jump whose target is filled in by [`Self::patch_jump`].
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_ax(op, 0)
    }

    pub fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), CompilerError> {
        if target as u32 > MAX_AX {
            return Err(CompilerError::limit("control structure too long", self.current_line));
        }
        let op = (self.bytecode[at] >> 24) as u8;
        self.bytecode[at] = encode_ax(op, target as u32);
        Ok(())
    }

    /// Patch `at` to jump to the next instruction emitted.
    pub fn patch_here(&mut self, at: usize) -> Result<(), CompilerError> {
        let here = self.bytecode.len();
        self.patch_jump(at, here)
    }

    pub fn resolve_local(&self, name: &str) -> Option<u16> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| local.cell)
    }
}
