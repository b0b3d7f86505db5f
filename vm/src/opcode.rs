//! OpCode definitions for the Lunette VM
//!
//! Instructions are 32-bit values in one of two formats:
//!
//! Format ABC: [8-bit opcode][8-bit A][8-bit B][8-bit C]
//! Format Ax:  [8-bit opcode][24-bit Ax]
//!
//! The machine is stack based: operands are popped from and results pushed
//! onto the current frame's operand stack. Locals live in heap cells and are
//! addressed by cell index (Ax). "Multi" operands refer to the value count
//! left by the most recent multi-result instruction (`Call` with C = 0 or
//! `VarArg` with A = 0).

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ===== Constants =====
    /// Push A nils
    LoadNil = 0,
    /// Push true
    LoadTrue = 1,
    /// Push false
    LoadFalse = 2,
    /// Push K[Ax]
    LoadConst = 3,

    // ===== Locals & upvalues =====
    /// Push the value of cell Ax
    GetCell = 10,
    /// Pop into cell Ax
    SetCell = 11,
    /// Pop into a fresh cell bound to slot Ax
    NewCell = 12,
    /// Push upvalue Ax of the running closure
    GetUpval = 13,
    /// Pop into upvalue Ax
    SetUpval = 14,

    // ===== Globals =====
    /// Push Env[K[Ax]]
    GetGlobal = 20,
    /// Pop into Env[K[Ax]]
    SetGlobal = 21,

    // ===== Tables =====
    /// Pop key, pop object, push object[key]
    GetIndex = 30,
    /// Pop key, pop object, pop value; object[key] = value
    StoreIndex = 31,
    /// Push a new empty table
    NewTable = 32,
    /// Pop value, pop key; table below them gets table[key] = value
    InitIndex = 33,
    /// Pop the multi values; table below them gets them at Ax, Ax+1, ...
    SetList = 34,
    /// Replace object with (object[K[Ax]], object)
    SelfOp = 35,

    // ===== Arithmetic =====
    Add = 40,
    Sub = 41,
    Mul = 42,
    Div = 43,
    Mod = 44,
    Pow = 45,
    Unm = 46,
    Concat = 47,
    Len = 48,
    Not = 49,

    // ===== Comparison =====
    Eq = 50,
    Ne = 51,
    Lt = 52,
    Le = 53,
    Gt = 54,
    Ge = 55,

    // ===== Flow Control =====
    /// IP = Ax
    Jump = 60,
    /// Pop; if falsey IP = Ax
    JumpIfFalse = 61,
    /// If top is falsey IP = Ax (keep it), else pop
    JumpIfFalseKeep = 62,
    /// If top is truthy IP = Ax (keep it), else pop
    JumpIfTrueKeep = 63,
    /// Pop A values
    Pop = 64,
    /// Coerce the loop control cells Ax, Ax+1, Ax+2 to numbers
    ForPrep = 65,
    /// Push whether the loop at cells Ax.. should run another iteration
    ForTest = 66,
    /// Advance the loop counter in cell Ax by its step
    ForStep = 67,

    // ===== Functions =====
    /// Call with A fixed args (+ multi if B), C = results + 1 (0 = all)
    Call = 70,
    /// Return A fixed values (+ multi if B)
    Return = 71,
    /// Push A - 1 varargs (A = 0: all, as multi)
    VarArg = 72,
    /// Push a closure over nested prototype Ax
    Closure = 73,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        use OpCode::*;
        Some(match byte {
            0 => LoadNil,
            1 => LoadTrue,
            2 => LoadFalse,
            3 => LoadConst,
            10 => GetCell,
            11 => SetCell,
            12 => NewCell,
            13 => GetUpval,
            14 => SetUpval,
            20 => GetGlobal,
            21 => SetGlobal,
            30 => GetIndex,
            31 => StoreIndex,
            32 => NewTable,
            33 => InitIndex,
            34 => SetList,
            35 => SelfOp,
            40 => Add,
            41 => Sub,
            42 => Mul,
            43 => Div,
            44 => Mod,
            45 => Pow,
            46 => Unm,
            47 => Concat,
            48 => Len,
            49 => Not,
            50 => Eq,
            51 => Ne,
            52 => Lt,
            53 => Le,
            54 => Gt,
            55 => Ge,
            60 => Jump,
            61 => JumpIfFalse,
            62 => JumpIfFalseKeep,
            63 => JumpIfTrueKeep,
            64 => Pop,
            65 => ForPrep,
            66 => ForTest,
            67 => ForStep,
            70 => Call,
            71 => Return,
            72 => VarArg,
            73 => Closure,
            _ => return None,
        })
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::LoadNil => "LOAD_NIL",
            OpCode::LoadTrue => "LOAD_TRUE",
            OpCode::LoadFalse => "LOAD_FALSE",
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::GetCell => "GET_CELL",
            OpCode::SetCell => "SET_CELL",
            OpCode::NewCell => "NEW_CELL",
            OpCode::GetUpval => "GET_UPVAL",
            OpCode::SetUpval => "SET_UPVAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetIndex => "GET_INDEX",
            OpCode::StoreIndex => "STORE_INDEX",
            OpCode::NewTable => "NEW_TABLE",
            OpCode::InitIndex => "INIT_INDEX",
            OpCode::SetList => "SET_LIST",
            OpCode::SelfOp => "SELF",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Pow => "POW",
            OpCode::Unm => "UNM",
            OpCode::Concat => "CONCAT",
            OpCode::Len => "LEN",
            OpCode::Not => "NOT",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfFalseKeep => "JUMP_IF_FALSE_KEEP",
            OpCode::JumpIfTrueKeep => "JUMP_IF_TRUE_KEEP",
            OpCode::Pop => "POP",
            OpCode::ForPrep => "FOR_PREP",
            OpCode::ForTest => "FOR_TEST",
            OpCode::ForStep => "FOR_STEP",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::VarArg => "VARARG",
            OpCode::Closure => "CLOSURE",
        }
    }

    /// Whether the operand is the 24-bit Ax field.
    pub fn uses_ax(self) -> bool {
        matches!(
            self,
            OpCode::LoadConst
                | OpCode::GetCell
                | OpCode::SetCell
                | OpCode::NewCell
                | OpCode::GetUpval
                | OpCode::SetUpval
                | OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::SetList
                | OpCode::SelfOp
                | OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfFalseKeep
                | OpCode::JumpIfTrueKeep
                | OpCode::ForPrep
                | OpCode::ForTest
                | OpCode::ForStep
                | OpCode::Closure
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Instruction encoding/decoding utilities
pub mod instruction {
    /// Largest value an Ax operand can hold.
    pub const MAX_AX: u32 = (1 << 24) - 1;

    /// Encode instruction in ABC format
    #[inline]
    pub fn encode_abc(opcode: u8, a: u8, b: u8, c: u8) -> u32 {
        ((opcode as u32) << 24) | ((a as u32) << 16) | ((b as u32) << 8) | (c as u32)
    }

    /// Encode instruction in Ax format. `ax` is masked to 24 bits.
    #[inline]
    pub fn encode_ax(opcode: u8, ax: u32) -> u32 {
        ((opcode as u32) << 24) | (ax & MAX_AX)
    }

    /// Decode instruction opcode
    #[inline]
    pub fn decode_opcode(instruction: u32) -> u8 {
        (instruction >> 24) as u8
    }

    /// Decode A operand
    #[inline]
    pub fn decode_a(instruction: u32) -> u8 {
        ((instruction >> 16) & 0xFF) as u8
    }

    /// Decode B operand
    #[inline]
    pub fn decode_b(instruction: u32) -> u8 {
        ((instruction >> 8) & 0xFF) as u8
    }

    /// Decode C operand
    #[inline]
    pub fn decode_c(instruction: u32) -> u8 {
        (instruction & 0xFF) as u8
    }

    /// Decode Ax operand (24-bit)
    #[inline]
    pub fn decode_ax(instruction: u32) -> u32 {
        instruction & MAX_AX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instruction::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(OpCode::Add.as_u8(), 40);
        assert_eq!(OpCode::from_u8(40), Some(OpCode::Add));
        assert_eq!(OpCode::from_u8(73), Some(OpCode::Closure));
        assert_eq!(OpCode::from_u8(205), None);
    }

    #[test]
    fn test_every_opcode_round_trips_through_its_byte() {
        for byte in 0..=u8::MAX {
            if let Some(op) = OpCode::from_u8(byte) {
                assert_eq!(op.as_u8(), byte, "{}", op.name());
            }
        }
    }

    #[test]
    fn test_instruction_encoding() {
        let inst = encode_abc(OpCode::Call.as_u8(), 1, 2, 3);
        assert_eq!(decode_opcode(inst), OpCode::Call.as_u8());
        assert_eq!(decode_a(inst), 1);
        assert_eq!(decode_b(inst), 2);
        assert_eq!(decode_c(inst), 3);
    }

    #[test]
    fn test_instruction_encoding_ax() {
        let inst = encode_ax(OpCode::Jump.as_u8(), 0x00AB_CDEF);
        assert_eq!(decode_opcode(inst), OpCode::Jump.as_u8());
        assert_eq!(decode_ax(inst), 0x00AB_CDEF);
        // Out-of-range operands are masked, never bleed into the opcode.
        let inst = encode_ax(OpCode::Jump.as_u8(), u32::MAX);
        assert_eq!(decode_opcode(inst), OpCode::Jump.as_u8());
    }
}
