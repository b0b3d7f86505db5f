use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::{AtomCompiler, ExpressionCompiler};
use crate::scopes::ScopeCompiler;
use crate::statements::StatementCompiler;
use crate::types::LoopContext;
use lunette_parser::ast::{Block, Expr};
use memory::Value;
use vm::opcode::OpCode;

pub trait ControlFlowCompiler {
    fn compile_if(
        &mut self,
        branches: &[(Expr, Block)],
        else_block: Option<&Block>,
    ) -> Result<(), CompilerError>;
    fn compile_while(&mut self, cond: &Expr, body: &Block) -> Result<(), CompilerError>;
    fn compile_repeat(&mut self, body: &Block, cond: &Expr) -> Result<(), CompilerError>;
    fn compile_numeric_for(
        &mut self,
        var: &str,
        start: &Expr,
        limit: &Expr,
        step: Option<&Expr>,
        body: &Block,
    ) -> Result<(), CompilerError>;
    fn compile_break(&mut self, line: usize) -> Result<(), CompilerError>;
}

impl Compiler<'_> {
    fn here(&self) -> usize {
        self.current_ref().bytecode.len()
    }

    fn begin_loop(&mut self) {
        self.current().loop_stack.push(LoopContext::default());
    }

    /// Close the innermost loop: its `break`s now land on the next instruction.
    fn end_loop(&mut self) -> Result<(), CompilerError> {
        let ctx = self.current().loop_stack.pop().unwrap_or_default();
        for jump in ctx.break_jumps {
            self.patch_here(jump)?;
        }
        Ok(())
    }
}

impl ControlFlowCompiler for Compiler<'_> {
    fn compile_if(
        &mut self,
        branches: &[(Expr, Block)],
        else_block: Option<&Block>,
    ) -> Result<(), CompilerError> {
        let mut end_jumps = Vec::with_capacity(branches.len());
        for (i, (cond, block)) in branches.iter().enumerate() {
            self.compile_expr(cond)?;
            let next = self.emit_jump(OpCode::JumpIfFalse);
            self.compile_block(block)?;
            let is_last = i + 1 == branches.len() && else_block.is_none();
            if !is_last {
                end_jumps.push(self.emit_jump(OpCode::Jump));
            }
            self.patch_here(next)?;
        }
        if let Some(block) = else_block {
            self.compile_block(block)?;
        }
        for jump in end_jumps {
            self.patch_here(jump)?;
        }
        Ok(())
    }

    fn compile_while(&mut self, cond: &Expr, body: &Block) -> Result<(), CompilerError> {
        let start = self.here();
        self.compile_expr(cond)?;
        let exit = self.emit_jump(OpCode::JumpIfFalse);
        self.begin_loop();
        self.compile_block(body)?;
        self.emit_ax(OpCode::Jump, start as u32);
        self.patch_here(exit)?;
        self.end_loop()
    }

    fn compile_repeat(&mut self, body: &Block, cond: &Expr) -> Result<(), CompilerError> {
        let start = self.here();
        self.begin_loop();
        // The condition sees the body's locals.
        self.begin_scope();
        for stmt in &body.stmts {
            self.compile_stmt(stmt)?;
        }
        self.compile_expr(cond)?;
        self.emit_ax(OpCode::JumpIfFalse, start as u32);
        self.end_scope();
        self.end_loop()
    }

    fn compile_numeric_for(
        &mut self,
        var: &str,
        start: &Expr,
        limit: &Expr,
        step: Option<&Expr>,
        body: &Block,
    ) -> Result<(), CompilerError> {
        self.begin_scope();

        self.compile_expr(start)?;
        self.compile_expr(limit)?;
        match step {
            Some(step) => self.compile_expr(step)?,
            None => self.compile_constant(Value::int(1))?,
        }
        // Hidden control variables; the names cannot clash with identifiers.
        let base = self.declare_local("(for index)")?;
        self.declare_local("(for limit)")?;
        self.declare_local("(for step)")?;
        for offset in (0..3).rev() {
            self.emit_ax(OpCode::NewCell, base as u32 + offset);
        }
        self.emit_ax(OpCode::ForPrep, base as u32);

        let loop_start = self.here();
        self.emit_ax(OpCode::ForTest, base as u32);
        let exit = self.emit_jump(OpCode::JumpIfFalse);

        self.begin_loop();
        self.begin_scope();
        // Each iteration gets its own cell, so closures capture one value each.
        let var_cell = self.declare_local(var)?;
        self.emit_ax(OpCode::GetCell, base as u32);
        self.emit_ax(OpCode::NewCell, var_cell as u32);
        self.compile_block(body)?;
        self.end_scope();

        self.emit_ax(OpCode::ForStep, base as u32);
        self.emit_ax(OpCode::Jump, loop_start as u32);
        self.patch_here(exit)?;
        self.end_loop()?;

        self.end_scope();
        Ok(())
    }

    fn compile_break(&mut self, line: usize) -> Result<(), CompilerError> {
        if self.current_ref().loop_stack.is_empty() {
            return Err(CompilerError::semantic("no loop to break", line as u32));
        }
        let jump = self.emit_jump(OpCode::Jump);
        if let Some(ctx) = self.current().loop_stack.last_mut() {
            ctx.break_jumps.push(jump);
        }
        Ok(())
    }
}
