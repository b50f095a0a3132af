//! Structural type descriptors.
//!
//! [`TypeRef`] is the compiler's description of a type: either a solved
//! structural form, or `Unsolved` carrying the original type expression for
//! the lazy second resolution attempt. Resolution is monotonic - once a
//! reference is solved it is never re-marked unsolved.

use std::fmt;

use vesper_ast::TypeExpr;

use crate::symbol::{SymbolArena, SymbolId, SymbolKind};

/// Bit width of a runtime integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// A fixed width, 1 to 128 bits.
    Bits(u16),
    /// The target's pointer width.
    PointerSized,
}

impl IntWidth {
    /// Concrete bit count. Pointer-sized resolves to the native word.
    pub fn bits(self) -> u16 {
        match self {
            IntWidth::Bits(n) => n,
            IntWidth::PointerSized => NATIVE_WORD_BITS,
        }
    }
}

/// Encoding of a string type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    Utf8,
    Utf16,
}

/// Bits per native machine word.
pub const NATIVE_WORD_BITS: u16 = 64;

/// Storage size as whole native words plus leftover sub-word bits.
///
/// Irregular widths (a 1-bit boolean, a 24-bit integer) coexist with
/// word-sized aggregates by carrying both components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    /// Bits beyond the last whole word, always < the native word width.
    pub bits: u32,
    /// Whole native words.
    pub words: u32,
}

impl TypeLayout {
    fn from_bits(total: u32) -> Self {
        Self {
            bits: total % NATIVE_WORD_BITS as u32,
            words: total / NATIVE_WORD_BITS as u32,
        }
    }

    fn words(words: u32) -> Self {
        Self { bits: 0, words }
    }

    /// Total size in bits.
    pub fn total_bits(&self) -> u32 {
        self.words * NATIVE_WORD_BITS as u32 + self.bits
    }

    /// Size rounded up to whole words, as aggregates store it.
    pub fn word_aligned(&self) -> u32 {
        self.words + if self.bits > 0 { 1 } else { 0 }
    }
}

/// A structural type description, solved or pending resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Not yet resolved; carries the syntax for the lazy second attempt.
    Unsolved(Box<TypeExpr>),
    /// An untyped local awaiting its first assignment.
    Infer,
    Void,
    /// Diverging; a call of this type never returns.
    NoReturn,
    Bool,
    Char,
    Str(StringEncoding),
    /// Arbitrary-precision integer literal not yet narrowed.
    ComptimeInt,
    Int {
        signed: bool,
        width: IntWidth,
    },
    Slice(Box<TypeRef>),
    Reference(Box<TypeRef>),
    Nullable(Box<TypeRef>),
    Function {
        ret: Box<TypeRef>,
        params: Vec<TypeRef>,
    },
    /// A resolved struct declaration.
    Struct(SymbolId),
    /// A resolved typedef declaration.
    Typedef(SymbolId),
    /// Accepts any argument type.
    Anytype,
    /// A type used as a value, e.g. a struct name in expression position.
    Type(Box<TypeRef>),
}

impl TypeRef {
    /// Shorthand for a fixed-width integer type.
    pub fn int(signed: bool, bits: u16) -> Self {
        TypeRef::Int {
            signed,
            width: IntWidth::Bits(bits),
        }
    }

    /// The signed default type comptime integers promote to.
    pub fn default_int() -> Self {
        TypeRef::int(true, 32)
    }

    /// Whether no unsolved node remains anywhere in this reference.
    pub fn is_solved(&self, arena: &SymbolArena) -> bool {
        match self {
            TypeRef::Unsolved(_) | TypeRef::Infer => false,
            TypeRef::Slice(elem) | TypeRef::Reference(elem) | TypeRef::Nullable(elem) => {
                elem.is_solved(arena)
            }
            TypeRef::Function { ret, params } => {
                ret.is_solved(arena) && params.iter().all(|p| p.is_solved(arena))
            }
            TypeRef::Type(inner) => inner.is_solved(arena),
            _ => true,
        }
    }

    /// Signedness and width, for runtime integers only.
    pub fn int_parts(&self) -> Option<(bool, IntWidth)> {
        match self {
            TypeRef::Int { signed, width } => Some((*signed, *width)),
            _ => None,
        }
    }

    /// Whether this is a runtime integer type.
    pub fn is_runtime_int(&self) -> bool {
        matches!(self, TypeRef::Int { .. })
    }

    /// Whether this is the comptime integer literal type.
    pub fn is_comptime_int(&self) -> bool {
        matches!(self, TypeRef::ComptimeInt)
    }

    /// Storage size as (sub-word bits, native words).
    pub fn layout(&self, arena: &SymbolArena) -> TypeLayout {
        match self {
            TypeRef::Unsolved(_) | TypeRef::Infer | TypeRef::Void | TypeRef::NoReturn => {
                TypeLayout::words(0)
            }
            TypeRef::Bool => TypeLayout::from_bits(1),
            TypeRef::Char => TypeLayout::from_bits(32),
            // Pointer + length pair.
            TypeRef::Str(_) | TypeRef::Slice(_) => TypeLayout::words(2),
            TypeRef::Reference(_) | TypeRef::Nullable(_) | TypeRef::Function { .. } => {
                TypeLayout::words(1)
            }
            TypeRef::ComptimeInt => TypeLayout::words(2),
            TypeRef::Int { width, .. } => TypeLayout::from_bits(width.bits() as u32),
            TypeRef::Struct(id) => {
                let mut words = 0u32;
                if let SymbolKind::Struct(data) = &arena.get(*id).kind {
                    if let Some(TypeRef::Struct(base)) = &data.extends {
                        words += TypeRef::Struct(*base).layout(arena).word_aligned();
                    }
                    for &field in &data.fields {
                        if let SymbolKind::Field(f) = &arena.get(field).kind {
                            words += f.ty.layout(arena).word_aligned();
                        }
                    }
                }
                TypeLayout::words(words)
            }
            TypeRef::Typedef(id) => {
                if let SymbolKind::Typedef(data) = &arena.get(*id).kind {
                    data.underlying.layout(arena)
                } else {
                    TypeLayout::words(0)
                }
            }
            TypeRef::Anytype | TypeRef::Type(_) => TypeLayout::words(1),
        }
    }

    /// Human-readable rendering for diagnostics.
    pub fn display(&self, arena: &SymbolArena) -> String {
        match self {
            TypeRef::Unsolved(expr) => format!("unsolved({})", expr.display_name()),
            TypeRef::Infer => "<inferred>".to_string(),
            TypeRef::Void => "void".to_string(),
            TypeRef::NoReturn => "noreturn".to_string(),
            TypeRef::Bool => "bool".to_string(),
            TypeRef::Char => "char".to_string(),
            TypeRef::Str(StringEncoding::Utf8) => "string".to_string(),
            TypeRef::Str(StringEncoding::Utf16) => "string16".to_string(),
            TypeRef::ComptimeInt => "comptime_int".to_string(),
            TypeRef::Int { signed, width } => {
                let prefix = if *signed { "i" } else { "u" };
                match width {
                    IntWidth::Bits(n) => format!("{prefix}{n}"),
                    IntWidth::PointerSized => format!("{prefix}size"),
                }
            }
            TypeRef::Slice(elem) => format!("[]{}", elem.display(arena)),
            TypeRef::Reference(elem) => format!("*{}", elem.display(arena)),
            TypeRef::Nullable(elem) => format!("?{}", elem.display(arena)),
            TypeRef::Function { ret, params } => {
                let params: Vec<_> = params.iter().map(|p| p.display(arena)).collect();
                format!("fn({}) {}", params.join(", "), ret.display(arena))
            }
            TypeRef::Struct(id) | TypeRef::Typedef(id) => arena.get(*id).path.to_string(),
            TypeRef::Anytype => "anytype".to_string(),
            TypeRef::Type(inner) => format!("type({})", inner.display(arena)),
        }
    }
}

impl fmt::Display for IntWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntWidth::Bits(n) => write!(f, "{n}"),
            IntWidth::PointerSized => write!(f, "size"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_is_one_bit() {
        let arena = SymbolArena::new();
        let l = TypeRef::Bool.layout(&arena);
        assert_eq!((l.bits, l.words), (1, 0));
    }

    #[test]
    fn u64_is_one_word() {
        let arena = SymbolArena::new();
        let l = TypeRef::int(false, 64).layout(&arena);
        assert_eq!((l.bits, l.words), (0, 1));
    }

    #[test]
    fn i128_is_two_words() {
        let arena = SymbolArena::new();
        let l = TypeRef::int(true, 128).layout(&arena);
        assert_eq!((l.bits, l.words), (0, 2));
        assert_eq!(l.word_aligned(), 2);
    }

    #[test]
    fn irregular_width_keeps_sub_word_bits() {
        let arena = SymbolArena::new();
        let l = TypeRef::int(false, 24).layout(&arena);
        assert_eq!((l.bits, l.words), (24, 0));
        assert_eq!(l.word_aligned(), 1);
    }

    #[test]
    fn unsolved_nested_in_slice_is_not_solved() {
        let arena = SymbolArena::new();
        let inner = TypeRef::Unsolved(Box::new(TypeExpr::named("Mystery")));
        let ty = TypeRef::Slice(Box::new(inner));
        assert!(!ty.is_solved(&arena));
        let solved = TypeRef::Slice(Box::new(TypeRef::int(true, 32)));
        assert!(solved.is_solved(&arena));
    }

    #[test]
    fn display_names() {
        let arena = SymbolArena::new();
        assert_eq!(TypeRef::int(false, 8).display(&arena), "u8");
        assert_eq!(
            TypeRef::Int {
                signed: true,
                width: IntWidth::PointerSized
            }
            .display(&arena),
            "isize"
        );
        assert_eq!(
            TypeRef::Nullable(Box::new(TypeRef::Str(StringEncoding::Utf8))).display(&arena),
            "?string"
        );
    }
}
