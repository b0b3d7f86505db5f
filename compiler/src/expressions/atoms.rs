use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::ExpressionCompiler;
use crate::scopes::ScopeCompiler;
use crate::types::Resolved;
use lunette_parser::ast::{Expr, TableField};
use memory::Value;
use vm::opcode::OpCode;

pub trait AtomCompiler {
    fn compile_atom(&mut self, expr: &Expr) -> Result<(), CompilerError>;
    fn compile_name(&mut self, name: &str) -> Result<(), CompilerError>;
    fn compile_constant(&mut self, val: Value) -> Result<(), CompilerError>;
    fn compile_table(&mut self, fields: &[TableField]) -> Result<(), CompilerError>;
}

impl AtomCompiler for Compiler<'_> {
    fn compile_atom(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        match expr {
            Expr::Nil { .. } => {
                self.emit_abc(OpCode::LoadNil, 1, 0, 0);
            }
            Expr::True { .. } => {
                self.emit_abc(OpCode::LoadTrue, 0, 0, 0);
            }
            Expr::False { .. } => {
                self.emit_abc(OpCode::LoadFalse, 0, 0, 0);
            }
            Expr::Int { value, .. } => self.compile_constant(Value::int(*value))?,
            Expr::Number { value, .. } => self.compile_constant(Value::number(*value))?,
            Expr::Str { value, .. } => {
                let k = self.string_constant(value)?;
                self.emit_ax(OpCode::LoadConst, k);
            }
            Expr::Name { name, span } => {
                self.set_line(span.line);
                self.compile_name(name)?;
            }
            Expr::Table { fields, span } => {
                self.set_line(span.line);
                self.compile_table(fields)?;
            }
            other => {
                return Err(CompilerError::semantic(
                    "unexpected expression",
                    other.span().line as u32,
                ))
            }
        }
        Ok(())
    }

    fn compile_name(&mut self, name: &str) -> Result<(), CompilerError> {
        match self.resolve_name(name)? {
            Resolved::Cell(cell) => {
                self.emit_ax(OpCode::GetCell, cell as u32);
            }
            Resolved::Upvalue(up) => {
                self.emit_ax(OpCode::GetUpval, up as u32);
            }
            Resolved::Global => {
                let k = self.string_constant(name.as_bytes())?;
                self.emit_ax(OpCode::GetGlobal, k);
            }
        }
        Ok(())
    }

    fn compile_constant(&mut self, val: Value) -> Result<(), CompilerError> {
        let k = self.add_constant(val)?;
        self.emit_ax(OpCode::LoadConst, k);
        Ok(())
    }

    /// `NEW_TABLE`, then one `INIT_INDEX` per field; a trailing multi value
    /// is stored with `SET_LIST` from the next positional index.
    fn compile_table(&mut self, fields: &[TableField]) -> Result<(), CompilerError> {
        self.emit_abc(OpCode::NewTable, 0, 0, 0);
        let mut next_index: i64 = 1;
        for (i, field) in fields.iter().enumerate() {
            let last = i + 1 == fields.len();
            match field {
                TableField::Positional(value) if last && value.is_multi() => {
                    self.compile_multi(value)?;
                    self.emit_ax(OpCode::SetList, next_index as u32);
                }
                TableField::Positional(value) => {
                    self.compile_constant(Value::int(next_index))?;
                    self.compile_expr(value)?;
                    self.emit_abc(OpCode::InitIndex, 0, 0, 0);
                    next_index += 1;
                }
                TableField::Keyed { key, value } => {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                    self.emit_abc(OpCode::InitIndex, 0, 0, 0);
                }
            }
        }
        Ok(())
    }
}
