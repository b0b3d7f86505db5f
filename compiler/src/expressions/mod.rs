use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::functions::FunctionDefinitionCompiler;
use crate::types::Want;
use lunette_parser::ast::Expr;
use vm::opcode::OpCode;

pub mod atoms;
pub mod binary;
pub mod postfix;

pub use atoms::AtomCompiler;
pub use binary::BinaryCompiler;
pub use postfix::PostfixCompiler;

pub trait ExpressionCompiler {
    /// Leave exactly one value on the operand stack.
    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompilerError>;

    /// Compile a call or `...` so it leaves exactly `n` values.
    fn compile_expr_results(&mut self, expr: &Expr, n: usize) -> Result<(), CompilerError>;

    /// Compile a call or `...` open-ended; the VM records how many values
    /// it produced for the consuming instruction.
    fn compile_multi(&mut self, expr: &Expr) -> Result<(), CompilerError>;

    /// Returns the fixed value count pushed and whether an open-ended
    /// multi value follows them.
    fn compile_expr_list(&mut self, exprs: &[Expr], want: Want)
        -> Result<(usize, bool), CompilerError>;
}

impl ExpressionCompiler for Compiler<'_> {
    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        match expr {
            Expr::Nil { .. }
            | Expr::True { .. }
            | Expr::False { .. }
            | Expr::Int { .. }
            | Expr::Number { .. }
            | Expr::Str { .. }
            | Expr::Name { .. }
            | Expr::Table { .. } => self.compile_atom(expr),
            Expr::VarArg { .. } | Expr::Call { .. } | Expr::Method { .. } => {
                self.compile_expr_results(expr, 1)
            }
            Expr::Index { object, key, span } => {
                self.compile_expr(object)?;
                self.compile_expr(key)?;
                self.set_line(span.line);
                self.emit_abc(OpCode::GetIndex, 0, 0, 0);
                Ok(())
            }
            Expr::Function(body) => self.compile_function(body, None),
            Expr::BinOp { op, lhs, rhs, span } => self.compile_binary(*op, lhs, rhs, span),
            Expr::UnaryOp { op, operand, span } => self.compile_unary(*op, operand, span),
            Expr::Paren { inner, .. } => self.compile_expr(inner),
        }
    }

    fn compile_expr_results(&mut self, expr: &Expr, n: usize) -> Result<(), CompilerError> {
        match expr {
            Expr::Call { .. } | Expr::Method { .. } => self.compile_call(expr, Some(n)),
            Expr::VarArg { span } => {
                self.check_vararg(span.line)?;
                if n >= u8::MAX as usize {
                    return Err(CompilerError::limit("too many results", span.line as u32));
                }
                self.emit_abc(OpCode::VarArg, (n + 1) as u8, 0, 0);
                Ok(())
            }
            _ => {
                // Single-valued: adjust by padding or dropping.
                self.compile_expr(expr)?;
                match n {
                    0 => self.emit_pops(1),
                    _ => self.emit_nils(n - 1),
                }
                Ok(())
            }
        }
    }

    fn compile_multi(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        match expr {
            Expr::Call { .. } | Expr::Method { .. } => self.compile_call(expr, None),
            Expr::VarArg { span } => {
                self.check_vararg(span.line)?;
                self.emit_abc(OpCode::VarArg, 0, 0, 0);
                Ok(())
            }
            _ => Err(CompilerError::semantic(
                "expression cannot produce multiple values",
                expr.span().line as u32,
            )),
        }
    }

    fn compile_expr_list(
        &mut self,
        exprs: &[Expr],
        want: Want,
    ) -> Result<(usize, bool), CompilerError> {
        let mut pushed = 0usize;
        for (i, expr) in exprs.iter().enumerate() {
            let last = i + 1 == exprs.len();
            if last && expr.is_multi() {
                match want {
                    Want::All => {
                        self.compile_multi(expr)?;
                        return Ok((pushed, true));
                    }
                    Want::Exactly(n) => {
                        let rest = n.saturating_sub(pushed);
                        self.compile_expr_results(expr, rest)?;
                        pushed += rest;
                    }
                }
            } else {
                self.compile_expr(expr)?;
                pushed += 1;
            }
        }
        if let Want::Exactly(n) = want {
            if pushed < n {
                self.emit_nils(n - pushed);
            } else {
                self.emit_pops(pushed - n);
            }
            pushed = n;
        }
        Ok((pushed, false))
    }
}

impl Compiler<'_> {
    fn check_vararg(&self, line: usize) -> Result<(), CompilerError> {
        if self.current_ref().is_vararg {
            Ok(())
        } else {
            Err(CompilerError::semantic(
                "cannot use '...' outside a vararg function",
                line as u32,
            ))
        }
    }
}
