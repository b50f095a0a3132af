//! Vesper - the semantic core of a compiler for a statically-typed,
//! namespace-based systems language.
//!
//! The lexer and parser live outside this crate; they hand over one
//! syntax tree per source file ([`ast::SourceUnit`]). This facade runs
//! the full pipeline over those trees and produces a stack-based
//! bytecode [`ModuleImage`]:
//!
//! ```text
//! syntax trees
//!   -> symbol collection        (global table keyed by dotted path)
//!   -> header resolution        (attributes, inherited modifiers)
//!   -> type resolution          (lazy two-phase, vtables over a
//!                                topological inheritance pass)
//!   -> body lowering            (untyped IR)
//!   -> semantic analysis        (references, overloads, casts, folding)
//!   -> code generation          (typed stack-machine bytecode)
//! ```
//!
//! ## Example
//!
//! ```
//! use vesper::ast::{FunctionDecl, FunctionKind, Item, SourceUnit};
//! use vesper_core::Span;
//!
//! let unit = SourceUnit::new(
//!     "app",
//!     "app.vsp",
//!     vec![Item::Function(FunctionDecl {
//!         name: "main".into(),
//!         kind: FunctionKind::Plain,
//!         params: vec![],
//!         return_type: None,
//!         body: Some(vesper::ast::BlockNode::default()),
//!         span: Span::default(),
//!     })],
//! );
//! let image = vesper::compile(&[unit]).unwrap();
//! assert!(image.type_named("app").is_some());
//! ```

pub use vesper_ast as ast;
pub use vesper_compiler::{
    CompileFailure, CompileOptions, CompileSession, ModuleImage, OpCode, TypeRef, compile_units,
};
pub use vesper_core::{CompileError, DiagnosticSink, Span, SymbolPath};

/// Compile source units with default options.
pub fn compile(units: &[ast::SourceUnit]) -> Result<ModuleImage, CompileFailure> {
    compile_units(units, &CompileOptions::default())
}
