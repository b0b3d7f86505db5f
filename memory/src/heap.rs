use crate::{Table, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Where a closure finds one of its captured cells when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueDesc {
    /// Cell `n` of the enclosing frame.
    ParentCell(u16),
    /// Upvalue `n` of the enclosing closure.
    ParentUpvalue(u16),
}

/// A compiled function prototype.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub arity: u8,
    pub is_vararg: bool,
    /// Number of local cells a frame of this function needs.
    pub cell_count: u16,
    pub chunk: Vec<u32>,
    pub constants: Vec<Value>,
    /// Function handles of nested prototypes, indexed by `Closure` operands.
    pub protos: Vec<u32>,
    pub upvalue_info: Vec<UpvalueDesc>,
    /// Source line per instruction, parallel to `chunk`.
    pub line_info: Vec<u32>,
}

impl Function {
    pub fn line_at(&self, ip: usize) -> Option<u32> {
        self.line_info.get(ip).copied()
    }
}

/// A prototype bound to its captured cells and its environment table.
#[derive(Debug, Clone)]
pub struct Closure {
    pub function: u32,
    /// Table used by global reads and writes inside this closure.
    pub env: u32,
    pub upvalues: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    pub data: Vec<T>,
    pub free_indices: Vec<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    pub fn alloc(&mut self, item: T) -> u32 {
        if let Some(idx) = self.free_indices.pop() {
            self.data[idx as usize] = item;
            idx
        } else {
            let index = self.data.len() as u32;
            self.data.push(item);
            index
        }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.data.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.data.get_mut(index as usize)
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.free_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Object storage for one interpreter.
///
/// Strings are interned: two string handles are equal exactly when their
/// bytes are equal, which lets `Value`'s derived equality and the table
/// key hash work on handles. Nothing is reclaimed while the heap lives.
#[derive(Default)]
pub struct Heap {
    strings: Vec<Rc<[u8]>>,
    interned: HashMap<Rc<[u8]>, u32>,
    pub tables: Arena<Table>,
    pub functions: Arena<Function>,
    pub closures: Arena<Closure>,
    pub cells: Arena<Value>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, bytes: &[u8]) -> u32 {
        if let Some(&h) = self.interned.get(bytes) {
            return h;
        }
        let rc: Rc<[u8]> = Rc::from(bytes);
        let handle = self.strings.len() as u32;
        self.strings.push(rc.clone());
        self.interned.insert(rc, handle);
        handle
    }

    /// Handle of an already-interned string, without interning it.
    pub fn find_string(&self, bytes: &[u8]) -> Option<u32> {
        self.interned.get(bytes).copied()
    }

    pub fn alloc_string(&mut self, s: &str) -> u32 {
        self.intern(s.as_bytes())
    }

    /// Interns `bytes` and wraps the handle.
    pub fn string_value(&mut self, bytes: &[u8]) -> Value {
        Value::string(self.intern(bytes))
    }

    pub fn get_bytes(&self, handle: u32) -> Option<&[u8]> {
        self.strings.get(handle as usize).map(|b| &b[..])
    }

    /// Lossy UTF-8 view, for diagnostics.
    pub fn get_string_lossy(&self, handle: u32) -> Option<String> {
        self.get_bytes(handle)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn alloc_table(&mut self, t: Table) -> u32 {
        self.tables.alloc(t)
    }

    pub fn get_table(&self, handle: u32) -> Option<&Table> {
        self.tables.get(handle)
    }

    pub fn get_table_mut(&mut self, handle: u32) -> Option<&mut Table> {
        self.tables.get_mut(handle)
    }

    pub fn alloc_function(&mut self, f: Function) -> u32 {
        self.functions.alloc(f)
    }

    pub fn get_function(&self, handle: u32) -> Option<&Function> {
        self.functions.get(handle)
    }

    pub fn alloc_closure(&mut self, c: Closure) -> u32 {
        self.closures.alloc(c)
    }

    pub fn get_closure(&self, handle: u32) -> Option<&Closure> {
        self.closures.get(handle)
    }

    pub fn get_closure_mut(&mut self, handle: u32) -> Option<&mut Closure> {
        self.closures.get_mut(handle)
    }

    pub fn alloc_cell(&mut self, v: Value) -> u32 {
        self.cells.alloc(v)
    }

    pub fn get_cell(&self, handle: u32) -> Value {
        self.cells.get(handle).copied().unwrap_or_default()
    }

    pub fn set_cell(&mut self, handle: u32, v: Value) {
        if let Some(slot) = self.cells.get_mut(handle) {
            *slot = v;
        }
    }
}
