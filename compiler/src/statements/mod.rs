use crate::codegen::Compiler;
use crate::control_flow::ControlFlowCompiler;
use crate::error::CompilerError;
use crate::expressions::{ExpressionCompiler, PostfixCompiler};
use crate::types::Want;
use lunette_parser::ast::*;
use vm::opcode::OpCode;

pub mod declarations;

pub use declarations::DeclarationCompiler;

pub trait StatementCompiler {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompilerError>;
}

/// Source line of a statement (1-based).
fn stmt_line(stmt: &Stmt) -> usize {
    match stmt {
        Stmt::Local { span, .. }
        | Stmt::LocalFunction { span, .. }
        | Stmt::Function { span, .. }
        | Stmt::Assign { span, .. }
        | Stmt::While { span, .. }
        | Stmt::Repeat { span, .. }
        | Stmt::If { span, .. }
        | Stmt::NumericFor { span, .. }
        | Stmt::GenericFor { span, .. }
        | Stmt::Return { span, .. }
        | Stmt::Break { span } => span.line,
        Stmt::Call(expr) => expr.span().line,
        Stmt::Do(block) => block.span.line,
    }
}

impl StatementCompiler for Compiler<'_> {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompilerError> {
        // Track source line for error reporting
        self.set_line(stmt_line(stmt));

        match stmt {
            Stmt::Local { names, values, .. } => self.compile_local(names, values),
            Stmt::LocalFunction { name, func, .. } => self.compile_local_function(name, func),
            Stmt::Function { name, func, .. } => self.compile_function_stmt(name, func),
            Stmt::Assign {
                targets, values, ..
            } => self.compile_assignment(targets, values),
            Stmt::Call(expr) => self.compile_call(expr, Some(0)),
            Stmt::Do(block) => self.compile_block(block),
            Stmt::While { cond, body, .. } => self.compile_while(cond, body),
            Stmt::Repeat { body, cond, .. } => self.compile_repeat(body, cond),
            Stmt::If {
                branches,
                else_block,
                ..
            } => self.compile_if(branches, else_block.as_ref()),
            Stmt::NumericFor {
                var,
                start,
                limit,
                step,
                body,
                ..
            } => self.compile_numeric_for(var, start, limit, step.as_ref(), body),
            Stmt::GenericFor { span, .. } => Err(CompilerError::Unsupported {
                what: "generic 'for'",
                line: span.line as u32,
            }),
            Stmt::Break { span } => self.compile_break(span.line),
            Stmt::Return { values, span } => {
                let (fixed, multi) = self.compile_expr_list(values, Want::All)?;
                if fixed > u8::MAX as usize {
                    return Err(CompilerError::limit("too many return values", span.line as u32));
                }
                self.set_line(span.line);
                self.emit_abc(OpCode::Return, fixed as u8, multi as u8, 0);
                Ok(())
            }
        }
    }
}
