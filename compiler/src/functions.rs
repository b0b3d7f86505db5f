use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::function_compiler::FunctionCompiler;
use lunette_parser::ast::FuncBody;
use vm::opcode::OpCode;

pub trait FunctionDefinitionCompiler {
    /// Compile `body` as a nested prototype and push a closure over it.
    fn compile_function(&mut self, body: &FuncBody, name: Option<String>)
        -> Result<(), CompilerError>;
}

impl FunctionDefinitionCompiler for Compiler<'_> {
    fn compile_function(
        &mut self,
        body: &FuncBody,
        name: Option<String>,
    ) -> Result<(), CompilerError> {
        let line = body.span.line as u32;
        if body.params.len() > u8::MAX as usize {
            return Err(CompilerError::limit("too many parameters", line));
        }
        let name =
            name.unwrap_or_else(|| format!("function <{}:{}>", self.chunk_id, body.span.line));

        self.compilers
            .push(FunctionCompiler::new(name, &body.params, body.is_vararg, line));
        self.compile_body(&body.body)?;
        let proto = self.finish_function()?;

        let parent = self.current();
        parent.current_line = line;
        let index = parent.protos.len() as u32;
        parent.protos.push(proto);
        parent.emit_ax(OpCode::Closure, index);
        Ok(())
    }
}
