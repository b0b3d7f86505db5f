use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::types::{Local, Resolved};
use memory::UpvalueDesc;

pub trait ScopeCompiler {
    fn begin_scope(&mut self);
    fn end_scope(&mut self);
    /// Bind `name` to a fresh cell slot; visible from now on.
    fn declare_local(&mut self, name: &str) -> Result<u16, CompilerError>;
    fn resolve_name(&mut self, name: &str) -> Result<Resolved, CompilerError>;
    fn resolve_upvalue(
        &mut self,
        compiler_idx: usize,
        name: &str,
    ) -> Result<Option<u16>, CompilerError>;
}

impl ScopeCompiler for Compiler<'_> {
    fn begin_scope(&mut self) {
        self.current().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let func = self.current();
        func.scope_depth -= 1;
        let depth = func.scope_depth;
        while func.locals.last().map_or(false, |l| l.depth > depth) {
            if let Some(local) = func.locals.pop() {
                // Slots are handed out in stack order, so the lowest popped
                // slot is where the next declaration starts again.
                func.next_cell = func.next_cell.min(local.cell);
            }
        }
    }

    fn declare_local(&mut self, name: &str) -> Result<u16, CompilerError> {
        let func = self.current();
        let cell = func.alloc_cell()?;
        let depth = func.scope_depth;
        func.locals.push(Local {
            name: name.to_string(),
            depth,
            cell,
        });
        Ok(cell)
    }

    fn resolve_name(&mut self, name: &str) -> Result<Resolved, CompilerError> {
        if let Some(cell) = self.current_ref().resolve_local(name) {
            return Ok(Resolved::Cell(cell));
        }
        let idx = self.compilers.len() - 1;
        Ok(match self.resolve_upvalue(idx, name)? {
            Some(up) => Resolved::Upvalue(up),
            None => Resolved::Global,
        })
    }

    fn resolve_upvalue(
        &mut self,
        compiler_idx: usize,
        name: &str,
    ) -> Result<Option<u16>, CompilerError> {
        if compiler_idx == 0 {
            return Ok(None); // The main chunk has no enclosing function
        }
        let parent_idx = compiler_idx - 1;

        // 1. A local of the enclosing function
        if let Some(cell) = self.compilers[parent_idx].resolve_local(name) {
            let up = self.compilers[compiler_idx].add_upvalue(name, UpvalueDesc::ParentCell(cell))?;
            return Ok(Some(up));
        }

        // 2. Recursive check (upvalue of upvalue)
        if let Some(parent_up) = self.resolve_upvalue(parent_idx, name)? {
            let up = self.compilers[compiler_idx]
                .add_upvalue(name, UpvalueDesc::ParentUpvalue(parent_up))?;
            return Ok(Some(up));
        }

        Ok(None)
    }
}
