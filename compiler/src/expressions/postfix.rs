use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::ExpressionCompiler;
use crate::types::Want;
use lunette_parser::ast::Expr;
use vm::opcode::OpCode;

pub trait PostfixCompiler {
    /// Compile a call or method call. `results`: values to leave on the
    /// stack, `None` for all of them.
    fn compile_call(&mut self, expr: &Expr, results: Option<usize>) -> Result<(), CompilerError>;
}

impl PostfixCompiler for Compiler<'_> {
    fn compile_call(&mut self, expr: &Expr, results: Option<usize>) -> Result<(), CompilerError> {
        let (args, receiver, span) = match expr {
            Expr::Call { callee, args, span } => {
                self.compile_expr(callee)?;
                (args, 0usize, span)
            }
            Expr::Method {
                object,
                name,
                args,
                span,
            } => {
                self.compile_expr(object)?;
                let k = self.string_constant(name.as_bytes())?;
                self.set_line(span.line);
                // [object] -> [method, object]; the object is the first argument.
                self.emit_ax(OpCode::SelfOp, k);
                (args, 1usize, span)
            }
            other => {
                return Err(CompilerError::semantic(
                    "expected a call",
                    other.span().line as u32,
                ))
            }
        };
        let line = span.line as u32;

        let (fixed, multi) = self.compile_expr_list(args, Want::All)?;
        let fixed = fixed + receiver;
        if fixed > u8::MAX as usize {
            return Err(CompilerError::limit("too many arguments", line));
        }
        let c = match results {
            None => 0,
            Some(n) if n < u8::MAX as usize => n + 1,
            Some(_) => return Err(CompilerError::limit("too many results", line)),
        };
        self.current().current_line = line;
        self.emit_abc(OpCode::Call, fixed as u8, multi as u8, c as u8);
        Ok(())
    }
}
