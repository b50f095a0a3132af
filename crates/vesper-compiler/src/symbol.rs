//! The symbol model.
//!
//! Every declaration becomes a [`Symbol`] owned by the [`SymbolArena`].
//! Symbols form a tree through `parent`/`children` links expressed as
//! [`SymbolId`] handles; cross-references (a struct's base, a dispatch
//! slot's target) are non-owning ids as well, so cyclic-capable graphs
//! never duplicate ownership.

use num_bigint::BigInt;
use vesper_ast::{AttributeNode, BlockNode, ExprNode, FunctionKind, ImportNode};
use vesper_core::{Span, SymbolPath};

use crate::ir;
use crate::types::TypeRef;

/// Non-owning handle to a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Modifier flags applied by header resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u16 {
        const STATIC    = 1 << 0;
        const PUBLIC    = 1 << 1;
        const PRIVATE   = 1 << 2;
        const INTERNAL  = 1 << 3;
        const FINAL     = 1 << 4;
        const ABSTRACT  = 1 << 5;
        const INTERFACE = 1 << 6;
        const VIRTUAL   = 1 << 7;
        const OVERRIDE  = 1 << 8;
        const CONSTEXP  = 1 << 9;
        const EXTERN    = 1 << 10;
        const EXPORT    = 1 << 11;
    }
}

/// Optional per-symbol-kind facilities an attribute may require.
///
/// Attribute application asks "does this symbol support capability X"
/// instead of switching over symbol kinds at every use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Static,
    Visibility,
    Final,
    Abstract,
    Interface,
    Virtual,
    Override,
    ConstExp,
    Foreign,
    Export,
}

/// Binding data for foreign-imported symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignBinding {
    pub library: String,
    pub module: Option<String>,
    pub symbol: Option<String>,
}

/// One dispatch slot of a struct's virtual table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VtableSlot {
    /// The function that introduced the slot.
    pub declared: SymbolId,
    /// The override bound to the slot, if any.
    pub overridden: Option<SymbolId>,
}

/// Payload of a struct symbol.
#[derive(Debug, Clone, Default)]
pub struct StructData {
    /// Declared base type; `None` for root structs.
    pub extends: Option<TypeRef>,
    /// Field members in declaration order.
    pub fields: Vec<SymbolId>,
    /// Dispatch table, built once during the topological inheritance pass.
    pub vtable: Vec<VtableSlot>,
    /// Whether the topological pass has completed this struct.
    pub vtable_built: bool,
}

/// Payload of a function symbol.
#[derive(Debug, Clone)]
pub struct FunctionData {
    pub kind: FunctionKind,
    /// Parameter symbols in declaration order; slot i is parameter i.
    pub params: Vec<SymbolId>,
    /// Local symbols in declaration order; slot i is local i.
    pub locals: Vec<SymbolId>,
    pub return_type: TypeRef,
    /// Body syntax, consumed by lowering.
    pub ast_body: Option<BlockNode>,
    /// Lowered body, populated by the body lowerer and rewritten in place
    /// by semantic analysis.
    pub body: Option<ir::Block>,
    /// The group this overload belongs to.
    pub group: Option<SymbolId>,
}

/// Payload of a field symbol.
#[derive(Debug, Clone)]
pub struct FieldData {
    pub ty: TypeRef,
    /// Initializer syntax, consumed by lowering.
    pub ast_init: Option<ExprNode>,
    /// Lowered and analyzed initializer.
    pub init: Option<ir::Expr>,
    /// Position among the owner's fields.
    pub index: u32,
}

/// Payload of a typedef symbol.
#[derive(Debug, Clone)]
pub struct TypedefData {
    pub underlying: TypeRef,
    /// Item members in declaration order.
    pub items: Vec<SymbolId>,
}

/// Payload of a typedef item.
#[derive(Debug, Clone)]
pub struct TypedefItemData {
    pub ast_value: Option<ExprNode>,
    /// Constant value, assigned during semantic analysis.
    pub value: Option<BigInt>,
}

/// Payload of a parameter symbol.
#[derive(Debug, Clone)]
pub struct ParamData {
    pub ty: TypeRef,
    /// 0-based position in the parameter list.
    pub slot: u32,
}

/// Payload of a local symbol.
#[derive(Debug, Clone)]
pub struct LocalData {
    pub ty: TypeRef,
    /// 0-based position in the function's local list.
    pub slot: u32,
}

/// The tagged symbol variant.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Module,
    Namespace,
    Struct(StructData),
    /// Groups same-path function overloads.
    FunctionGroup { overloads: Vec<SymbolId> },
    Function(FunctionData),
    Field(FieldData),
    Typedef(TypedefData),
    TypedefItem(TypedefItemData),
    Parameter(ParamData),
    Local(LocalData),
    /// A renamed view of another path.
    Alias { target: SymbolPath },
}

impl SymbolKind {
    /// Kind name used in diagnostics and dumps.
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Struct(_) => "struct",
            SymbolKind::FunctionGroup { .. } => "function-group",
            SymbolKind::Function(_) => "function",
            SymbolKind::Field(_) => "field",
            SymbolKind::Typedef(_) => "typedef",
            SymbolKind::TypedefItem(_) => "typedef-item",
            SymbolKind::Parameter(_) => "parameter",
            SymbolKind::Local(_) => "local",
            SymbolKind::Alias { .. } => "alias",
        }
    }

    /// Whether this kind of symbol supports a capability.
    pub fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::Static => matches!(
                self,
                SymbolKind::Function(_) | SymbolKind::Field(_) | SymbolKind::Struct(_)
            ),
            Capability::Visibility => matches!(
                self,
                SymbolKind::Struct(_)
                    | SymbolKind::Function(_)
                    | SymbolKind::Field(_)
                    | SymbolKind::Typedef(_)
                    | SymbolKind::Namespace
            ),
            Capability::Final => {
                matches!(self, SymbolKind::Struct(_) | SymbolKind::Function(_))
            }
            Capability::Abstract => {
                matches!(self, SymbolKind::Struct(_) | SymbolKind::Function(_))
            }
            Capability::Interface => matches!(self, SymbolKind::Struct(_)),
            Capability::Virtual | Capability::Override => {
                matches!(self, SymbolKind::Function(_))
            }
            Capability::ConstExp => {
                matches!(self, SymbolKind::Function(_) | SymbolKind::Field(_))
            }
            Capability::Foreign => matches!(self, SymbolKind::Function(_)),
            Capability::Export => {
                matches!(self, SymbolKind::Function(_) | SymbolKind::Field(_))
            }
        }
    }
}

/// A named, path-addressable declaration.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Dotted-path identity; parents' path plus this symbol's name.
    pub path: SymbolPath,
    /// Lexical parent; never owned, only referenced.
    pub parent: Option<SymbolId>,
    /// Lexical children in declaration order.
    pub children: Vec<SymbolId>,
    /// Attributes attached during collection, consumed by header resolution.
    pub attributes: Vec<AttributeNode>,
    pub modifiers: Modifiers,
    /// `@static(bool)` given explicitly, overriding inherited static-ness.
    pub explicit_static: Option<bool>,
    pub foreign: Option<ForeignBinding>,
    pub export_name: Option<String>,
    /// Import directives scoped to this symbol (namespaces and modules).
    pub imports: Vec<ImportNode>,
    /// Source file this symbol was declared in, for error attribution.
    pub file: Option<String>,
    pub span: Span,
    pub kind: SymbolKind,
}

impl Symbol {
    /// Build a bare symbol; the collector fills in links and attributes.
    pub fn new(
        name: impl Into<String>,
        path: SymbolPath,
        parent: Option<SymbolId>,
        span: Span,
        kind: SymbolKind,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
            modifiers: Modifiers::default(),
            explicit_static: None,
            foreign: None,
            export_name: None,
            imports: Vec::new(),
            file: None,
            span,
            kind,
        }
    }

    /// Whether header resolution marked this symbol static.
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    /// Whether this function participates in virtual dispatch.
    pub fn is_virtual_member(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::VIRTUAL | Modifiers::ABSTRACT)
    }
}

/// Append-only arena owning every symbol of one compilation session.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol, returning its handle.
    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Borrow a symbol.
    ///
    /// # Panics
    ///
    /// Panics on a handle from a different arena; handles are never
    /// constructed externally.
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Mutably borrow a symbol.
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Iterate all symbols with their handles, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// All handles, in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + use<> {
        (0..self.symbols.len() as u32).map(SymbolId)
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Find a direct child of `parent` by name.
    pub fn child_named(&self, parent: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|&c| self.get(c).name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(arena: &mut SymbolArena, name: &str, parent: Option<SymbolId>) -> SymbolId {
        let path = match parent {
            Some(p) => arena.get(p).path.child(name),
            None => SymbolPath::single(name),
        };
        let id = arena.alloc(Symbol::new(
            name,
            path,
            parent,
            Span::default(),
            SymbolKind::Namespace,
        ));
        if let Some(p) = parent {
            arena.get_mut(p).children.push(id);
        }
        id
    }

    #[test]
    fn paths_follow_parent_chain() {
        let mut arena = SymbolArena::new();
        let app = leaf(&mut arena, "app", None);
        let math = leaf(&mut arena, "math", Some(app));
        let parent_path = arena.get(app).path.clone();
        assert_eq!(
            arena.get(math).path,
            parent_path.child(&arena.get(math).name)
        );
    }

    #[test]
    fn child_lookup_by_name() {
        let mut arena = SymbolArena::new();
        let app = leaf(&mut arena, "app", None);
        let math = leaf(&mut arena, "math", Some(app));
        assert_eq!(arena.child_named(app, "math"), Some(math));
        assert_eq!(arena.child_named(app, "missing"), None);
    }

    #[test]
    fn capability_dispatch() {
        let func = SymbolKind::Function(FunctionData {
            kind: FunctionKind::Plain,
            params: vec![],
            locals: vec![],
            return_type: TypeRef::Void,
            ast_body: None,
            body: None,
            group: None,
        });
        assert!(func.supports(Capability::Virtual));
        assert!(!SymbolKind::Namespace.supports(Capability::Virtual));
        assert!(SymbolKind::Namespace.supports(Capability::Visibility));
        assert!(!SymbolKind::Module.supports(Capability::Static));
    }

    #[test]
    fn virtual_member_includes_abstract() {
        let mut s = Symbol::new(
            "f",
            SymbolPath::single("f"),
            None,
            Span::default(),
            SymbolKind::Namespace,
        );
        assert!(!s.is_virtual_member());
        s.modifiers |= Modifiers::ABSTRACT;
        assert!(s.is_virtual_member());
    }
}
