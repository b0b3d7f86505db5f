use crate::error::RuntimeError;
use crate::opcode::{instruction::decode_ax, OpCode};
use memory::Value;

use super::data::DataOps;
use super::stack::StackOps;

/// Trait for variable access: frame cells, captured upvalues and globals
pub trait GlobalOps {
    fn handle_variables(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<(), RuntimeError>;

    /// `GET_GLOBAL` / `SET_GLOBAL` against the running closure's environment.
    fn handle_globals(&mut self, op: OpCode, key: Value, closure_idx: u32)
        -> Result<(), RuntimeError>;
}

impl super::vm::VM {
    fn frame_cell(&self, frame_idx: usize, slot: usize) -> Result<u32, RuntimeError> {
        self.frames
            .get(frame_idx)
            .and_then(|f| f.cell(slot))
            .ok_or(RuntimeError::InvalidOperand)
    }

    fn upvalue_cell(&self, frame_idx: usize, slot: usize) -> Result<u32, RuntimeError> {
        let closure = self
            .frames
            .get(frame_idx)
            .and_then(|f| self.heap.get_closure(f.closure))
            .ok_or(RuntimeError::FunctionNotFound)?;
        closure
            .upvalues
            .get(slot)
            .copied()
            .ok_or(RuntimeError::InvalidOperand)
    }
}

impl GlobalOps for super::vm::VM {
    fn handle_variables(
        &mut self,
        op: OpCode,
        instruction: u32,
        frame_idx: usize,
    ) -> Result<(), RuntimeError> {
        let slot = decode_ax(instruction) as usize;
        match op {
            OpCode::GetCell => {
                let cell = self.frame_cell(frame_idx, slot)?;
                let v = self.heap.get_cell(cell);
                self.push_value(v)?;
            }
            OpCode::SetCell => {
                let cell = self.frame_cell(frame_idx, slot)?;
                let v = self.pop_value()?;
                self.heap.set_cell(cell, v);
            }
            OpCode::NewCell => {
                let v = self.pop_value()?;
                let cell = self.heap.alloc_cell(v);
                let target = self.frames[frame_idx]
                    .cells
                    .get_mut(slot)
                    .ok_or(RuntimeError::InvalidOperand)?;
                *target = cell;
            }
            OpCode::GetUpval => {
                let cell = self.upvalue_cell(frame_idx, slot)?;
                let v = self.heap.get_cell(cell);
                self.push_value(v)?;
            }
            OpCode::SetUpval => {
                let cell = self.upvalue_cell(frame_idx, slot)?;
                let v = self.pop_value()?;
                self.heap.set_cell(cell, v);
            }
            _ => return Err(RuntimeError::InvalidOperand),
        }
        Ok(())
    }

    fn handle_globals(
        &mut self,
        op: OpCode,
        key: Value,
        closure_idx: u32,
    ) -> Result<(), RuntimeError> {
        let env = self
            .heap
            .get_closure(closure_idx)
            .ok_or(RuntimeError::FunctionNotFound)?
            .env;
        match op {
            OpCode::GetGlobal => {
                let v = self.raw_get(Value::table(env), key);
                self.push_value(v)
            }
            OpCode::SetGlobal => {
                let v = self.pop_value()?;
                self.set_index(Value::table(env), key, v)
            }
            _ => Err(RuntimeError::InvalidOperand),
        }
    }
}
