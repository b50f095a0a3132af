//! Syntax tree node types for Vesper source files.
//!
//! The lexer and parser live outside this repository; they hand the
//! compiler one [`SourceUnit`] per file, already grouped by module and
//! namespace. This crate defines the owned node types that make up those
//! trees. Every node carries a [`Span`](vesper_core::Span) for diagnostics.

mod decl;
mod expr;
mod stmt;
mod types;

pub use decl::{
    AttributeNode, FieldDecl, FunctionDecl, FunctionKind, ImportNames, ImportNode, Item,
    NamespaceNode, ParamDecl, StructDecl, TypedefDecl, TypedefItemDecl,
};
pub use expr::{BinaryOp, CompareOp, ExprNode, LogicalOp, UnaryOp};
pub use stmt::{BlockNode, IfArm, StmtNode};
pub use types::TypeExpr;

use vesper_core::Span;

/// One parsed source file: a module name and its namespace tree.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Module this file belongs to.
    pub module: String,
    /// File path, used to key diagnostics.
    pub file: String,
    /// Root of the file's declarations. The root namespace may be unnamed.
    pub root: NamespaceNode,
}

impl SourceUnit {
    /// Build a unit with an unnamed root namespace holding `items`.
    pub fn new(module: impl Into<String>, file: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            module: module.into(),
            file: file.into(),
            root: NamespaceNode {
                name: Vec::new(),
                items,
                span: Span::default(),
            },
        }
    }
}
