//! The target bytecode module image.
//!
//! The image carries one type per struct with explicit sequential field
//! layout, one synthetic static holder type per source module housing its
//! top-level functions and fields, and one method per compiled function.
//! Writing the image to disk is the concern of an external module writer;
//! this is the in-memory form it consumes.

use rustc_hash::FxHashMap;

use super::chunk::BytecodeChunk;
use crate::types::StringEncoding;

/// A value in the module-level constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i64),
    Uint(u64),
    /// A 128-bit value, little-endian bytes.
    Wide([u8; 16]),
    Str {
        bytes: Vec<u8>,
        encoding: StringEncoding,
    },
    /// A call target or field reference by mangled name.
    Name(String),
}

/// Deduplicated module-level constant pool shared by every method.
#[derive(Debug, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<Constant, u16>,
}

impl ConstantPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, reusing the slot of an equal existing entry.
    pub fn add(&mut self, constant: Constant) -> u16 {
        if let Some(&at) = self.index.get(&constant) {
            return at;
        }
        let at = self.constants.len() as u16;
        self.index.insert(constant.clone(), at);
        self.constants.push(constant);
        at
    }

    /// Look up a constant by pool index.
    pub fn get(&self, at: u16) -> Option<&Constant> {
        self.constants.get(at as usize)
    }

    /// Number of pooled constants.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

/// One declared local of a compiled method.
#[derive(Debug, Clone)]
pub struct ImageLocal {
    pub name: String,
    /// Rendered type name, for the module writer's metadata.
    pub ty: String,
}

/// One compiled method.
#[derive(Debug, Clone)]
pub struct ImageMethod {
    /// Mangled name: dotted path plus parameter signature.
    pub name: String,
    /// Foreign-export name, when declared.
    pub export_name: Option<String>,
    pub param_count: u16,
    pub locals: Vec<ImageLocal>,
    pub is_static: bool,
    /// Dispatch slot in the owning type's virtual table.
    pub vslot: Option<u16>,
    pub chunk: BytecodeChunk,
}

/// One field of an image type, in sequential layout order.
#[derive(Debug, Clone)]
pub struct ImageField {
    pub name: String,
    /// Rendered type name.
    pub ty: String,
    pub is_static: bool,
    /// Constant initial value, when an initializer was declared.
    pub initial: Option<Constant>,
}

/// One type of the image: a struct, or a module's synthetic holder.
#[derive(Debug, Clone, Default)]
pub struct ImageType {
    /// Dotted type name.
    pub name: String,
    /// Whether this is a module's static holder type.
    pub holder: bool,
    /// Dotted name of the base type, if any.
    pub base: Option<String>,
    pub fields: Vec<ImageField>,
    pub methods: Vec<ImageMethod>,
}

/// The complete compiled module.
#[derive(Debug, Default)]
pub struct ModuleImage {
    pub types: Vec<ImageType>,
    pub constants: ConstantPool,
}

impl ModuleImage {
    /// Find a type by dotted name.
    pub fn type_named(&self, name: &str) -> Option<&ImageType> {
        self.types.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_deduplicates_equal_constants() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Int(42));
        let b = pool.add(Constant::Int(42));
        let c = pool.add(Constant::Int(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn names_and_strings_pool_separately() {
        let mut pool = ConstantPool::new();
        let name = pool.add(Constant::Name("app.f(i32)".into()));
        let s = pool.add(Constant::Str {
            bytes: b"app.f(i32)".to_vec(),
            encoding: StringEncoding::Utf8,
        });
        assert_ne!(name, s);
        assert_eq!(pool.get(name), Some(&Constant::Name("app.f(i32)".into())));
    }
}
