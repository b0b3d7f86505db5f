use crate::error::RuntimeError;
use memory::Value;

/// Trait for operand stack access
pub trait StackOps {
    fn push_value(&mut self, val: Value) -> Result<(), RuntimeError>;
    fn pop_value(&mut self) -> Result<Value, RuntimeError>;
    fn peek_value(&self) -> Result<Value, RuntimeError>;
    /// Remove the top `n` values, oldest first.
    fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError>;
}

impl StackOps for super::vm::VM {
    #[inline(always)]
    fn push_value(&mut self, val: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.options.max_stack {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    #[inline(always)]
    fn pop_value(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::InvalidOperand)
    }

    #[inline(always)]
    fn peek_value(&self) -> Result<Value, RuntimeError> {
        self.stack.last().copied().ok_or(RuntimeError::InvalidOperand)
    }

    fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::InvalidOperand)?;
        Ok(self.stack.split_off(start))
    }
}
