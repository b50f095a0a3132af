//! High-level bytecode emitter.
//!
//! Wraps a per-method [`BytecodeChunk`] and the shared module constant
//! pool with convenience emission for constants, jumps, and calls.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::chunk::BytecodeChunk;
use super::image::{Constant, ConstantPool};
use super::opcode::OpCode;

/// A forward jump awaiting its target.
#[derive(Debug, Clone, Copy)]
pub struct JumpLabel(usize);

/// Emits one method's instructions into a chunk, pooling constants at
/// module level.
pub struct Emitter<'pool> {
    chunk: BytecodeChunk,
    constants: &'pool mut ConstantPool,
    line: u32,
}

impl<'pool> Emitter<'pool> {
    /// Create an emitter over the shared pool.
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            line: 1,
        }
    }

    /// Set the source line for subsequent instructions.
    pub fn set_line(&mut self, line: u32) {
        if line > 0 {
            self.line = line;
        }
    }

    /// Emit a bare opcode.
    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.line);
    }

    /// Emit an opcode with one byte operand.
    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_byte(byte, self.line);
    }

    /// Emit an opcode with a 16-bit operand.
    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_u16(value, self.line);
    }

    /// Append a bare operand byte to the previous instruction.
    pub fn emit_raw_byte(&mut self, byte: u8) {
        self.chunk.write_byte(byte, self.line);
    }

    /// Emit a pooled constant load.
    pub fn emit_constant(&mut self, constant: Constant) {
        let at = self.constants.add(constant);
        self.emit_u16(OpCode::Const, at);
    }

    /// Emit an integer constant, using the short forms for 0 and 1.
    pub fn emit_int(&mut self, value: &BigInt, signed: bool) {
        if value.to_u8() == Some(0) {
            return self.emit(OpCode::PushZero);
        }
        if value.to_u8() == Some(1) {
            return self.emit(OpCode::PushOne);
        }
        let constant = if signed {
            Constant::Int(value.to_i64().unwrap_or_default())
        } else {
            Constant::Uint(value.to_u64().unwrap_or_default())
        };
        self.emit_constant(constant);
    }

    /// Emit a 128-bit integer constant.
    pub fn emit_wide(&mut self, value: &BigInt, signed: bool) {
        let bytes = if signed {
            value.to_i128().unwrap_or_default().to_le_bytes()
        } else {
            value.to_u128().unwrap_or_default().to_le_bytes()
        };
        self.emit_constant(Constant::Wide(bytes));
    }

    /// Emit a call by mangled name.
    pub fn emit_call(&mut self, name: &str, argc: u8) {
        let at = self.constants.add(Constant::Name(name.to_string()));
        self.chunk.write_op(OpCode::Call, self.line);
        self.chunk.write_u16(at, self.line);
        self.chunk.write_byte(argc, self.line);
    }

    /// Emit a virtual call through a dispatch slot.
    pub fn emit_call_virtual(&mut self, slot: u16, argc: u8) {
        self.chunk.write_op(OpCode::CallVirtual, self.line);
        self.chunk.write_u16(slot, self.line);
        self.chunk.write_byte(argc, self.line);
    }

    /// Pool a name constant and return its index.
    pub fn name_index(&mut self, name: &str) -> u16 {
        self.constants.add(Constant::Name(name.to_string()))
    }

    /// Emit a forward jump to be patched later.
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.write_jump(op, self.line))
    }

    /// Patch a forward jump to the current position.
    pub fn patch(&mut self, label: JumpLabel) {
        self.chunk.patch_jump(label.0);
    }

    /// Current offset, used as a backward jump target.
    pub fn mark(&self) -> usize {
        self.chunk.offset()
    }

    /// Emit a backward jump to a marked offset.
    pub fn emit_back_jump(&mut self, op: OpCode, target: usize) {
        self.chunk.write_back_jump(op, target, self.line);
    }

    /// The opcode starting the last emitted instruction.
    pub fn last_op(&self) -> Option<OpCode> {
        self.chunk.last_op()
    }

    /// Finish and take the chunk.
    pub fn finish(self) -> BytecodeChunk {
        self.chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_int_constants_use_short_forms() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.emit_int(&BigInt::from(0), true);
        emitter.emit_int(&BigInt::from(1), true);
        emitter.emit_int(&BigInt::from(7), true);
        let chunk = emitter.finish();
        assert_eq!(chunk.code()[0], u8::from(OpCode::PushZero));
        assert_eq!(chunk.code()[1], u8::from(OpCode::PushOne));
        assert_eq!(chunk.code()[2], u8::from(OpCode::Const));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn calls_pool_the_target_name_once() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        emitter.emit_call("app.f(i32)", 1);
        emitter.emit_call("app.f(i32)", 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn jump_patch_round_trip() {
        let mut pool = ConstantPool::new();
        let mut emitter = Emitter::new(&mut pool);
        let label = emitter.emit_jump(OpCode::Jump);
        emitter.emit(OpCode::PushNull);
        emitter.patch(label);
        let chunk = emitter.finish();
        assert_eq!(&chunk.code()[1..3], &[0, 1]);
    }
}
