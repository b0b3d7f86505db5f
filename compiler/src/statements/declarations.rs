use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::{AtomCompiler, ExpressionCompiler};
use crate::functions::FunctionDefinitionCompiler;
use crate::scopes::ScopeCompiler;
use crate::types::{Resolved, Want};
use lunette_parser::ast::{Expr, FuncBody, FuncName};
use vm::opcode::OpCode;

pub trait DeclarationCompiler {
    fn compile_local(&mut self, names: &[String], values: &[Expr]) -> Result<(), CompilerError>;
    fn compile_local_function(&mut self, name: &str, func: &FuncBody)
        -> Result<(), CompilerError>;
    fn compile_function_stmt(&mut self, name: &FuncName, func: &FuncBody)
        -> Result<(), CompilerError>;
    fn compile_assignment(&mut self, targets: &[Expr], values: &[Expr])
        -> Result<(), CompilerError>;
    /// Pop the top value into the variable `name`.
    fn store_name(&mut self, name: &str) -> Result<(), CompilerError>;
}

impl DeclarationCompiler for Compiler<'_> {
    fn compile_local(&mut self, names: &[String], values: &[Expr]) -> Result<(), CompilerError> {
        // Values are evaluated before the names come into scope.
        self.compile_expr_list(values, Want::Exactly(names.len()))?;
        let mut cells = Vec::with_capacity(names.len());
        for name in names {
            cells.push(self.declare_local(name)?);
        }
        for cell in cells.into_iter().rev() {
            self.emit_ax(OpCode::NewCell, cell as u32);
        }
        Ok(())
    }

    fn compile_local_function(
        &mut self,
        name: &str,
        func: &FuncBody,
    ) -> Result<(), CompilerError> {
        // Bind the cell first so the body can refer to itself.
        let cell = self.declare_local(name)?;
        self.emit_abc(OpCode::LoadNil, 1, 0, 0);
        self.emit_ax(OpCode::NewCell, cell as u32);
        self.compile_function(func, Some(name.to_string()))?;
        self.emit_ax(OpCode::SetCell, cell as u32);
        Ok(())
    }

    fn compile_function_stmt(
        &mut self,
        name: &FuncName,
        func: &FuncBody,
    ) -> Result<(), CompilerError> {
        self.compile_function(func, Some(name.display()))?;

        let (first, fields) = match name.path.split_first() {
            Some(parts) => parts,
            None => return Err(CompilerError::semantic("empty function name", self.line())),
        };
        let mut keys: Vec<&String> = fields.iter().collect();
        if let Some(method) = &name.method {
            keys.push(method);
        }
        let Some((last, prefix)) = keys.split_last() else {
            return self.store_name(first);
        };

        // value, object, key -> STORE_INDEX
        self.compile_name(first)?;
        for key in prefix {
            let k = self.string_constant(key.as_bytes())?;
            self.emit_ax(OpCode::LoadConst, k);
            self.emit_abc(OpCode::GetIndex, 0, 0, 0);
        }
        let k = self.string_constant(last.as_bytes())?;
        self.emit_ax(OpCode::LoadConst, k);
        self.emit_abc(OpCode::StoreIndex, 0, 0, 0);
        Ok(())
    }

    fn compile_assignment(
        &mut self,
        targets: &[Expr],
        values: &[Expr],
    ) -> Result<(), CompilerError> {
        // Every value is evaluated first; targets then take them from the
        // top of the stack, last target first.
        self.compile_expr_list(values, Want::Exactly(targets.len()))?;
        for target in targets.iter().rev() {
            match target {
                Expr::Name { name, span } => {
                    self.set_line(span.line);
                    self.store_name(name)?;
                }
                Expr::Index { object, key, span } => {
                    self.compile_expr(object)?;
                    self.compile_expr(key)?;
                    self.set_line(span.line);
                    self.emit_abc(OpCode::StoreIndex, 0, 0, 0);
                }
                other => {
                    return Err(CompilerError::semantic(
                        "cannot assign to this expression",
                        other.span().line as u32,
                    ))
                }
            }
        }
        Ok(())
    }

    fn store_name(&mut self, name: &str) -> Result<(), CompilerError> {
        match self.resolve_name(name)? {
            Resolved::Cell(cell) => {
                self.emit_ax(OpCode::SetCell, cell as u32);
            }
            Resolved::Upvalue(up) => {
                self.emit_ax(OpCode::SetUpval, up as u32);
            }
            Resolved::Global => {
                let k = self.string_constant(name.as_bytes())?;
                self.emit_ax(OpCode::SetGlobal, k);
            }
        }
        Ok(())
    }
}
