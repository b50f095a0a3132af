//! Instruction set of the target stack machine.
//!
//! One byte per opcode, operands inline. Arithmetic and comparison
//! instructions come in width/signedness variants; the generator picks
//! the variant from its shadow operand-type stack at emission time.
//! Sub-32-bit values compute at 32 bits; 128-bit arithmetic never
//! appears here - it lowers to calls into the runtime's wide-integer
//! support routines.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A bytecode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from the pool. Operand: u16 pool index.
    Const = 0,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Push the null value.
    PushNull,
    /// Push integer 0.
    PushZero,
    /// Push integer 1.
    PushOne,

    // =========================================================================
    // Stack
    // =========================================================================
    /// Pop the top value.
    Pop,
    /// Duplicate the top value.
    Dup,

    // =========================================================================
    // Locals and arguments
    // =========================================================================
    /// Load a local. Operand: u16 slot.
    LoadLocal,
    /// Store to a local. Operand: u16 slot.
    StoreLocal,
    /// Push the address of a local. Operand: u16 slot.
    AddrLocal,
    /// Load an argument. Operand: u16 slot.
    LoadArg,
    /// Store to an argument. Operand: u16 slot.
    StoreArg,
    /// Push the receiver of an instance method.
    LoadThis,

    // =========================================================================
    // Module-level fields
    // =========================================================================
    /// Load a holder field by name. Operand: u16 name-constant index.
    LoadStatic,
    /// Store to a holder field by name. Operand: u16 name-constant index.
    StoreStatic,
    /// Push the address of a holder field. Operand: u16 name-constant index.
    AddrStatic,

    // =========================================================================
    // Instance fields
    // =========================================================================
    /// Load a field from the instance on the stack. Operand: u16 field slot.
    LoadField,
    /// Store to a field; expects instance then value. Operand: u16 field slot.
    StoreField,
    /// Push the address of a field of the instance on the stack.
    /// Operand: u16 field slot.
    AddrField,

    // =========================================================================
    // Indirection
    // =========================================================================
    /// Replace the reference on the stack with the value it points at.
    LoadIndirect,
    /// Store through a reference; expects reference then value.
    StoreIndirect,

    // =========================================================================
    // Slices
    // =========================================================================
    /// Build a slice from the top N values. Operand: u16 element count.
    NewSlice,
    /// Load an element; expects slice then index.
    LoadElem,
    /// Store an element; expects slice, index, then value.
    StoreElem,
    /// Push the length of the slice or string on the stack.
    SliceLen,

    // =========================================================================
    // Calls and returns
    // =========================================================================
    /// Call by name. Operands: u16 name-constant index, u8 argument count.
    Call,
    /// Virtual dispatch through the receiver's table.
    /// Operands: u16 dispatch slot, u8 argument count (receiver excluded).
    CallVirtual,
    /// Return the top value.
    Ret,
    /// Return from a void function.
    RetVoid,

    // =========================================================================
    // Jumps
    // =========================================================================
    /// Unconditional forward jump. Operand: u16 offset.
    Jump,
    /// Forward jump when the popped condition is false. Operand: u16 offset.
    JumpIfFalse,
    /// Forward jump when the popped condition is true. Operand: u16 offset.
    JumpIfTrue,
    /// Unconditional backward jump. Operand: u16 offset.
    Loop,
    /// Backward jump when the popped condition is true. Operand: u16 offset.
    LoopIfTrue,

    // =========================================================================
    // Conversions
    // =========================================================================
    /// Integer width/signedness conversion.
    /// Operands: u8 source code, u8 destination code; each code is
    /// `0x80 * signed + bits` with bits in 1..=64.
    Conv,

    // =========================================================================
    // Arithmetic (i32)
    // =========================================================================
    AddI32,
    SubI32,
    MulI32,
    DivI32,
    ModI32,
    NegI32,
    NotI32,
    AndI32,
    OrI32,
    XorI32,
    ShlI32,
    ShrI32,

    // =========================================================================
    // Arithmetic (u32)
    // =========================================================================
    AddU32,
    SubU32,
    MulU32,
    DivU32,
    ModU32,
    NotU32,
    AndU32,
    OrU32,
    XorU32,
    ShlU32,
    ShrU32,

    // =========================================================================
    // Arithmetic (i64)
    // =========================================================================
    AddI64,
    SubI64,
    MulI64,
    DivI64,
    ModI64,
    NegI64,
    NotI64,
    AndI64,
    OrI64,
    XorI64,
    ShlI64,
    ShrI64,

    // =========================================================================
    // Arithmetic (u64)
    // =========================================================================
    AddU64,
    SubU64,
    MulU64,
    DivU64,
    ModU64,
    NotU64,
    AndU64,
    OrU64,
    XorU64,
    ShlU64,
    ShrU64,

    // =========================================================================
    // Comparisons (i32)
    // =========================================================================
    EqI32,
    NeI32,
    LtI32,
    LeI32,
    GtI32,
    GeI32,

    // =========================================================================
    // Comparisons (u32)
    // =========================================================================
    EqU32,
    NeU32,
    LtU32,
    LeU32,
    GtU32,
    GeU32,

    // =========================================================================
    // Comparisons (i64)
    // =========================================================================
    EqI64,
    NeI64,
    LtI64,
    LeI64,
    GtI64,
    GeI64,

    // =========================================================================
    // Comparisons (u64)
    // =========================================================================
    EqU64,
    NeU64,
    LtU64,
    LeU64,
    GtU64,
    GeU64,

    // =========================================================================
    // Booleans and strings
    // =========================================================================
    /// Logical complement of the boolean on the stack.
    NotBool,
    /// Concatenate the two strings on the stack.
    ConcatStr,
    /// String equality.
    EqStr,
    /// String inequality.
    NeStr,
}

impl OpCode {
    /// Whether this instruction ends a code path.
    pub fn is_return(self) -> bool {
        matches!(self, OpCode::Ret | OpCode::RetVoid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for op in [
            OpCode::Const,
            OpCode::LoadLocal,
            OpCode::CallVirtual,
            OpCode::AddI32,
            OpCode::ShrU64,
            OpCode::NeStr,
        ] {
            let byte: u8 = op.into();
            assert_eq!(OpCode::try_from(byte), Ok(op));
        }
    }

    #[test]
    fn unknown_byte_rejected() {
        assert!(OpCode::try_from(0xFE).is_err());
    }

    #[test]
    fn returns_recognized() {
        assert!(OpCode::Ret.is_return());
        assert!(OpCode::RetVoid.is_return());
        assert!(!OpCode::Jump.is_return());
    }
}
