use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::{AtomCompiler, ExpressionCompiler};
use lunette_parser::ast::{BinOp, Expr, Span, UnaryOp};
use memory::Value;
use vm::opcode::OpCode;

pub trait BinaryCompiler {
    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        span: &Span,
    ) -> Result<(), CompilerError>;

    fn compile_unary(&mut self, op: UnaryOp, operand: &Expr, span: &Span)
        -> Result<(), CompilerError>;
}

fn binop_code(op: BinOp) -> Option<OpCode> {
    Some(match op {
        BinOp::Add => OpCode::Add,
        BinOp::Sub => OpCode::Sub,
        BinOp::Mul => OpCode::Mul,
        BinOp::Div => OpCode::Div,
        BinOp::Mod => OpCode::Mod,
        BinOp::Pow => OpCode::Pow,
        BinOp::Concat => OpCode::Concat,
        BinOp::Eq => OpCode::Eq,
        BinOp::Neq => OpCode::Ne,
        BinOp::Lt => OpCode::Lt,
        BinOp::Le => OpCode::Le,
        BinOp::Gt => OpCode::Gt,
        BinOp::Ge => OpCode::Ge,
        BinOp::And | BinOp::Or => return None,
    })
}

impl BinaryCompiler for Compiler<'_> {
    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        span: &Span,
    ) -> Result<(), CompilerError> {
        match op {
            // The left value is the result unless it lets evaluation through.
            BinOp::And | BinOp::Or => {
                self.compile_expr(lhs)?;
                let jump_op = if op == BinOp::And {
                    OpCode::JumpIfFalseKeep
                } else {
                    OpCode::JumpIfTrueKeep
                };
                let skip = self.emit_jump(jump_op);
                self.compile_expr(rhs)?;
                self.patch_here(skip)
            }
            _ => {
                let code = binop_code(op)
                    .ok_or_else(|| CompilerError::semantic("unexpected operator", span.line as u32))?;
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.set_line(span.line);
                self.emit_abc(code, 0, 0, 0);
                Ok(())
            }
        }
    }

    fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        span: &Span,
    ) -> Result<(), CompilerError> {
        // Fold negative numeric literals.
        if op == UnaryOp::Neg {
            match operand {
                Expr::Int { value, .. } => {
                    if let Some(n) = value.checked_neg() {
                        return self.compile_constant(Value::int(n));
                    }
                }
                Expr::Number { value, .. } => return self.compile_constant(Value::number(-*value)),
                _ => {}
            }
        }
        self.compile_expr(operand)?;
        self.set_line(span.line);
        let code = match op {
            UnaryOp::Neg => OpCode::Unm,
            UnaryOp::Not => OpCode::Not,
            UnaryOp::Len => OpCode::Len,
        };
        self.emit_abc(code, 0, 0, 0);
        Ok(())
    }
}
