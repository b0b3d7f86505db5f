use memory::Value;

/// Placeholder for a cell slot that no `NEW_CELL` has bound yet.
pub const NO_CELL: u32 = u32::MAX;

/// One activation of a guest function.
///
/// - `closure`: handle of the running closure
/// - `ip`: index of the next instruction
/// - `base`: stack index of the callee slot; the frame's operand stack
///   starts here and everything from `base` up is discarded on return
/// - `cells`: per-frame local variable cells, indexed by `GET_CELL` / `SET_CELL`
/// - `varargs`: arguments past the fixed parameters (vararg functions only)
/// - `expected`: how many results the caller wants (`None` = all)
/// - `entry`: set on frames pushed by [`crate::VM::call_value`]; returning
///   from one hands the results back to the host instead of the caller frame
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub closure: u32,
    pub ip: usize,
    pub base: usize,
    pub cells: Vec<u32>,
    pub varargs: Vec<Value>,
    pub expected: Option<usize>,
    pub entry: bool,
}

impl CallFrame {
    pub fn new(closure: u32, base: usize, cell_count: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base,
            cells: vec![NO_CELL; cell_count],
            varargs: Vec::new(),
            expected: None,
            entry: false,
        }
    }

    /// Cell bound to slot `index`, if any.
    pub fn cell(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied().filter(|&c| c != NO_CELL)
    }
}
