//! Declaration nodes.

use vesper_core::Span;

use crate::{BlockNode, ExprNode, TypeExpr};

/// A namespace and the declarations it contains.
#[derive(Debug, Clone)]
pub struct NamespaceNode {
    /// Dotted namespace name segments; empty for a file's unnamed root.
    pub name: Vec<String>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// Anything that can appear in a namespace or struct body.
///
/// Attributes are their own items: the parser emits them in source order
/// and the collector attaches each run of attributes to the declaration
/// that follows it.
#[derive(Debug, Clone)]
pub enum Item {
    Attribute(AttributeNode),
    Import(ImportNode),
    Namespace(NamespaceNode),
    Function(FunctionDecl),
    Struct(StructDecl),
    Field(FieldDecl),
    Typedef(TypedefDecl),
}

/// `@name(args...)` preceding a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub name: String,
    pub args: Vec<ExprNode>,
    pub span: Span,
}

impl AttributeNode {
    /// Build an argument-less attribute with a default span.
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            span: Span::default(),
        }
    }
}

/// The names an import directive brings into scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportNames {
    /// `from X import *`
    All,
    /// `from X import a, b`
    Names(Vec<String>),
}

/// `from X import ...` recorded as raw path segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub from: Vec<String>,
    pub names: ImportNames,
    pub span: Span,
}

/// What flavor of callable a function declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    Constructor,
    Destructor,
}

/// A function declaration. Overloads are separate declarations sharing a
/// name; grouping happens during symbol collection.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<ParamDecl>,
    /// Missing return type means `void`.
    pub return_type: Option<TypeExpr>,
    /// Bodyless declarations are foreign or abstract.
    pub body: Option<BlockNode>,
    pub span: Span,
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A struct declaration, optionally extending a base struct.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub extends: Option<TypeExpr>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// A field declaration. At namespace level this is a module-scoped field
/// housed by the module's holder type in the compiled image.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    /// Missing type means the initializer supplies it.
    pub ty: Option<TypeExpr>,
    pub init: Option<ExprNode>,
    pub span: Span,
}

/// A typedef with named items, e.g. an enumeration over an underlying
/// integer type.
#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub name: String,
    /// Missing underlying type defaults to `i32`.
    pub underlying: Option<TypeExpr>,
    pub items: Vec<TypedefItemDecl>,
    pub span: Span,
}

/// One named item of a typedef. Items without an explicit value continue
/// from the previous item, starting at zero.
#[derive(Debug, Clone)]
pub struct TypedefItemDecl {
    pub name: String,
    pub value: Option<ExprNode>,
    pub span: Span,
}
