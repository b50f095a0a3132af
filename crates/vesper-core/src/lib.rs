//! Shared foundations for the Vesper compiler.
//!
//! This crate holds the pieces every other crate agrees on: source spans,
//! dotted symbol paths, the error taxonomy, and the diagnostic sink that
//! collects errors across the whole pipeline.

mod error;
mod path;
mod sink;
mod span;

pub use error::{CollectError, CompileError, HeaderError, ResolveError, SemanticError};
pub use path::SymbolPath;
pub use sink::DiagnosticSink;
pub use span::Span;
