/// A named local bound to a frame cell slot.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub depth: u32,
    pub cell: u16,
}

#[derive(Debug, Clone, Default)]
pub struct LoopContext {
    /// `JUMP`s emitted by `break`, patched to the loop exit.
    pub break_jumps: Vec<usize>,
}

/// Where a name resolves inside the function being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Cell(u16),
    Upvalue(u16),
    Global,
}

/// How many values an expression list must leave on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    Exactly(usize),
    /// Everything; a trailing multi expression stays open-ended.
    All,
}
