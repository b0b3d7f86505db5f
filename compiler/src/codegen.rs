use crate::error::CompilerError;
use crate::function_compiler::FunctionCompiler;
use crate::scopes::ScopeCompiler;
use crate::statements::StatementCompiler;
use lunette_parser::ast::Block;
use lunette_parser::parse_chunk;
use memory::{Function, Heap, UpvalueDesc, Value};
use tracing::debug;
use vm::loader::{chunk_id, SourceCompiler};
use vm::opcode::OpCode;
use vm::LoadError;

/// Lowers one chunk into prototypes allocated in `heap`.
///
/// `compilers` is the stack of functions being compiled; the innermost one
/// is last and receives every emitted instruction.
pub struct Compiler<'h> {
    pub heap: &'h mut Heap,
    pub compilers: Vec<FunctionCompiler>,
    /// Display form of the chunk name, used for anonymous function names.
    pub chunk_id: String,
}

impl<'h> Compiler<'h> {
    pub fn new(heap: &'h mut Heap, chunk_name: &str) -> Self {
        Self {
            heap,
            compilers: Vec::new(),
            chunk_id: chunk_id(chunk_name),
        }
    }

    /// Parse and compile `source`; returns the main prototype's handle.
    pub fn compile(&mut self, source: &[u8]) -> Result<u32, CompilerError> {
        let chunk = parse_chunk(source)?;
        // The main chunk is an anonymous vararg function.
        self.compilers
            .push(FunctionCompiler::new("main chunk".into(), &[], true, 0));
        self.compile_body(&chunk.block)?;
        let handle = self.finish_function()?;
        debug!(chunk = %self.chunk_id, handle, "chunk compiled");
        Ok(handle)
    }

    pub fn current(&mut self) -> &mut FunctionCompiler {
        self.compilers
            .last_mut()
            .expect("compiler stack is never empty while compiling")
    }

    pub fn current_ref(&self) -> &FunctionCompiler {
        self.compilers
            .last()
            .expect("compiler stack is never empty while compiling")
    }

    pub fn line(&self) -> u32 {
        self.current_ref().current_line
    }

    pub fn set_line(&mut self, line: usize) {
        self.current().current_line = line as u32;
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) -> usize {
        self.current().emit_abc(op, a, b, c)
    }

    pub fn emit_ax(&mut self, op: OpCode, ax: u32) -> usize {
        self.current().emit_ax(op, ax)
    }

    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.current().emit_jump(op)
    }

    pub fn patch_here(&mut self, at: usize) -> Result<(), CompilerError> {
        self.current().patch_here(at)
    }

    pub fn add_constant(&mut self, val: Value) -> Result<u32, CompilerError> {
        self.current().add_constant(val)
    }

    /// Intern `bytes` and add the string as a constant.
    pub fn string_constant(&mut self, bytes: &[u8]) -> Result<u32, CompilerError> {
        let v = self.heap.string_value(bytes);
        self.add_constant(v)
    }

    /// Push `n` nils.
    pub fn emit_nils(&mut self, mut n: usize) {
        while n > 0 {
            let chunk = n.min(u8::MAX as usize);
            self.emit_abc(OpCode::LoadNil, chunk as u8, 0, 0);
            n -= chunk;
        }
    }

    /// Drop the top `n` operand values.
    pub fn emit_pops(&mut self, mut n: usize) {
        while n > 0 {
            let chunk = n.min(u8::MAX as usize);
            self.emit_abc(OpCode::Pop, chunk as u8, 0, 0);
            n -= chunk;
        }
    }

    /// A function body: its statements in a fresh scope, then an implicit
    /// empty return.
    pub fn compile_body(&mut self, block: &Block) -> Result<(), CompilerError> {
        self.compile_block(block)?;
        self.emit_abc(OpCode::Return, 0, 0, 0);
        Ok(())
    }

    pub fn compile_block(&mut self, block: &Block) -> Result<(), CompilerError> {
        self.begin_scope();
        for stmt in &block.stmts {
            self.compile_stmt(stmt)?;
        }
        self.end_scope();
        Ok(())
    }

    /// Pop the innermost function compiler and allocate its prototype.
    pub fn finish_function(&mut self) -> Result<u32, CompilerError> {
        let func = self
            .compilers
            .pop()
            .ok_or_else(|| CompilerError::semantic("compiler stack underflow", 0))?;
        let upvalue_info: Vec<UpvalueDesc> = func.upvalues.iter().map(|(_, d)| *d).collect();
        Ok(self.heap.alloc_function(Function {
            name: func.name,
            arity: func.arity,
            is_vararg: func.is_vararg,
            cell_count: func.max_cells,
            chunk: func.bytecode,
            constants: func.constants,
            protos: func.protos,
            upvalue_info,
            line_info: func.line_info,
        }))
    }
}

/// Compile `source` into `heap` and return the main prototype's handle.
pub fn compile_chunk(heap: &mut Heap, source: &[u8], chunk_name: &str) -> Result<u32, CompilerError> {
    Compiler::new(heap, chunk_name).compile(source)
}

/// The [`SourceCompiler`] installed into a VM.
///
/// Errors are rendered as `chunk:line: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkCompiler;

impl SourceCompiler for ChunkCompiler {
    fn compile(&self, heap: &mut Heap, source: &[u8], chunk_name: &str) -> Result<u32, LoadError> {
        compile_chunk(heap, source, chunk_name).map_err(|e| {
            LoadError::Syntax(format!("{}:{}: {}", chunk_id(chunk_name), e.line(), e))
        })
    }
}
