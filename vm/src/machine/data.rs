use crate::error::RuntimeError;
use crate::opcode::{instruction::decode_ax, OpCode};
use memory::{Key, Table, Value};

use super::stack::StackOps;

/// Trait for table construction and indexing
pub trait DataOps {
    fn handle_data(&mut self, op: OpCode, instruction: u32) -> Result<(), RuntimeError>;

    /// `obj[key]`: raw on tables, through the string method table on strings.
    fn index_value(&self, obj: Value, key: Value) -> Result<Value, RuntimeError>;

    /// `obj[key] = value` on a table.
    fn set_index(&mut self, obj: Value, key: Value, value: Value) -> Result<(), RuntimeError>;
}

fn index_error(obj: Value) -> RuntimeError {
    RuntimeError::TypeMismatch(format!("attempt to index a {} value", obj.type_name()))
}

impl DataOps for super::vm::VM {
    fn handle_data(&mut self, op: OpCode, instruction: u32) -> Result<(), RuntimeError> {
        match op {
            OpCode::NewTable => {
                let t = self.heap.alloc_table(Table::new());
                self.push_value(Value::table(t))?;
            }
            OpCode::GetIndex => {
                let key = self.pop_value()?;
                let obj = self.pop_value()?;
                let v = self.index_value(obj, key)?;
                self.push_value(v)?;
            }
            OpCode::StoreIndex => {
                let key = self.pop_value()?;
                let obj = self.pop_value()?;
                let value = self.pop_value()?;
                self.set_index(obj, key, value)?;
            }
            OpCode::InitIndex => {
                let value = self.pop_value()?;
                let key = self.pop_value()?;
                let table = self.peek_value()?;
                self.set_index(table, key, value)?;
            }
            OpCode::SetList => {
                let start = decode_ax(instruction) as i64;
                let count = self.last_multi;
                let values = self.pop_values(count)?;
                let Value::Table(h) = self.peek_value()? else {
                    return Err(RuntimeError::InvalidOperand);
                };
                let table = self
                    .heap
                    .get_table_mut(h)
                    .ok_or(RuntimeError::InvalidOperand)?;
                for (i, v) in values.into_iter().enumerate() {
                    table.set(Key::Int(start + i as i64), v);
                }
            }
            _ => return Err(RuntimeError::InvalidOperand),
        }
        Ok(())
    }

    fn index_value(&self, obj: Value, key: Value) -> Result<Value, RuntimeError> {
        let table = match obj {
            Value::Table(h) => h,
            Value::String(_) => self.string_methods,
            other => return Err(index_error(other)),
        };
        Ok(self
            .heap
            .get_table(table)
            .map_or(Value::nil(), |t| t.get_value(key)))
    }

    fn set_index(&mut self, obj: Value, key: Value, value: Value) -> Result<(), RuntimeError> {
        let Value::Table(h) = obj else {
            return Err(index_error(obj));
        };
        let key = match Key::from_value(key) {
            Some(k) => k,
            None if key.is_nil() => {
                return Err(RuntimeError::TypeMismatch("table index is nil".into()))
            }
            None => return Err(RuntimeError::TypeMismatch("table index is NaN".into())),
        };
        let table = self
            .heap
            .get_table_mut(h)
            .ok_or(RuntimeError::InvalidOperand)?;
        table.set(key, value);
        Ok(())
    }
}
