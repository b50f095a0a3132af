//! Code generation.
//!
//! Lowers the analyzed program into a stack-machine bytecode module
//! image: one type per struct, one synthetic holder type per module, and
//! one method per function.

mod chunk;
mod emit;
mod generator;
mod image;
mod opcode;

pub use chunk::BytecodeChunk;
pub use emit::{Emitter, JumpLabel};
pub use generator::{mangled_name, run};
pub use image::{Constant, ConstantPool, ImageField, ImageLocal, ImageMethod, ImageType, ModuleImage};
pub use opcode::OpCode;
