//! Error types for the compilation pipeline.
//!
//! One enum per phase, unified under [`CompileError`]:
//!
//! ```text
//! CompileError
//! ├── CollectError   - structural errors while building the symbol table
//! ├── HeaderError    - attribute/header interpretation errors
//! ├── ResolveError   - type and reference resolution errors
//! └── SemanticError  - overload, cast, and constant-expression errors
//! ```
//!
//! Collection errors are recorded and the pass moves on to the next sibling
//! declaration. Header errors are fatal for the offending symbol's header
//! only. Resolution and semantic errors abort the compile once their pass
//! has run to completion, so every error in a file is reported together.

use thiserror::Error;

use crate::{Span, SymbolPath};

/// Structural errors raised while collecting declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    /// Two declarations computed the same dotted path.
    #[error("at {span}: duplicate declaration '{path}'")]
    DuplicatePath { path: SymbolPath, span: Span },

    /// An import directive could not be interpreted.
    #[error("at {span}: malformed import: {detail}")]
    MalformedImport { detail: String, span: Span },

    /// An attribute was buffered but no declaration followed in its scope.
    #[error("at {span}: attribute '{name}' not assigned to any member")]
    UnboundAttribute { name: String, span: Span },
}

impl CollectError {
    /// The source position of this error.
    pub fn span(&self) -> Span {
        match self {
            CollectError::DuplicatePath { span, .. } => *span,
            CollectError::MalformedImport { span, .. } => *span,
            CollectError::UnboundAttribute { span, .. } => *span,
        }
    }
}

/// Errors raised while interpreting symbol attributes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeaderError {
    /// The attribute is not part of the built-in attribute table.
    #[error("at {span}: unknown attribute '{name}'")]
    UnknownAttribute { name: String, span: Span },

    /// The attribute does not apply to this kind of symbol.
    #[error("at {span}: attribute '{name}' cannot be applied to a {symbol_kind}")]
    WrongTarget {
        name: String,
        symbol_kind: &'static str,
        span: Span,
    },

    /// The attribute received the wrong number of arguments.
    #[error("at {span}: attribute '{name}' expects {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: &'static str,
        got: usize,
        span: Span,
    },

    /// The attribute received an argument of the wrong literal kind.
    #[error("at {span}: attribute '{name}' expects {expected} arguments")]
    WrongArgument {
        name: String,
        expected: &'static str,
        span: Span,
    },
}

impl HeaderError {
    /// The source position of this error.
    pub fn span(&self) -> Span {
        match self {
            HeaderError::UnknownAttribute { span, .. } => *span,
            HeaderError::WrongTarget { span, .. } => *span,
            HeaderError::WrongArity { span, .. } => *span,
            HeaderError::WrongArgument { span, .. } => *span,
        }
    }
}

/// Errors raised during type and reference resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// The inheritance graph contains a cycle through this struct.
    #[error("at {span}: cyclic dependency in inheritance of '{name}'")]
    CyclicInheritance { name: String, span: Span },

    /// A declared type never resolved to a type-position symbol.
    #[error("at {span}: cannot resolve type '{name}'")]
    UnresolvedType { name: String, span: Span },

    /// A name designates a symbol that is not usable as a type.
    #[error("at {span}: '{name}' is not a type")]
    NotAType { name: String, span: Span },

    /// Every resolution step was exhausted without a match.
    #[error("at {span}: cannot find reference '{name}'")]
    CannotFindReference { name: String, span: Span },

    /// An override member matched no open inherited dispatch slot.
    #[error("at {span}: no virtual function to override for '{name}'")]
    NoVirtualToOverride { name: String, span: Span },

    /// A local declaration reuses a name already declared in the callable.
    #[error("at {span}: '{name}' shadows declaration in enclosing scope")]
    ShadowsDeclaration { name: String, span: Span },
}

impl ResolveError {
    /// The source position of this error.
    pub fn span(&self) -> Span {
        match self {
            ResolveError::CyclicInheritance { span, .. } => *span,
            ResolveError::UnresolvedType { span, .. } => *span,
            ResolveError::NotAType { span, .. } => *span,
            ResolveError::CannotFindReference { span, .. } => *span,
            ResolveError::NoVirtualToOverride { span, .. } => *span,
            ResolveError::ShadowsDeclaration { span, .. } => *span,
        }
    }
}

/// Errors raised during semantic analysis of function bodies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    /// No overload in the group was viable for the argument types.
    #[error("at {span}: no overload of '{name}' matches ({args})")]
    NoOverloadMatches {
        name: String,
        args: String,
        span: Span,
    },

    /// Value of one type used where another was required.
    #[error("at {span}: expected '{expected}', found '{found}'")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    /// String concatenation between differently-encoded operands.
    #[error("at {span}: cannot concatenate '{left}' and '{right}'")]
    CannotConcatenate {
        left: String,
        right: String,
        span: Span,
    },

    /// A constant expression divided by a literal zero.
    #[error("at {span}: division by zero in constant expression")]
    DivisionByZero { span: Span },

    /// A context that requires a compile-time constant got a runtime value.
    #[error("at {span}: {what} must be a compile-time constant")]
    NotConstant { what: &'static str, span: Span },

    /// Call target is not callable.
    #[error("at {span}: '{name}' is not callable")]
    NotCallable { name: String, span: Span },

    /// Assignment target is not an assignable place.
    #[error("at {span}: expression is not assignable")]
    NotAssignable { span: Span },

    /// Member access found no such member.
    #[error("at {span}: no member '{member}' on '{type_name}'")]
    NoSuchMember {
        member: String,
        type_name: String,
        span: Span,
    },

    /// Indexing applied to a non-indexable type.
    #[error("at {span}: type '{type_name}' cannot be indexed")]
    NotIndexable { type_name: String, span: Span },

    /// An operator was applied to operands it does not support.
    #[error("at {span}: operator '{op}' not defined for '{operand}'")]
    BadOperand {
        op: String,
        operand: String,
        span: Span,
    },

    /// Object construction in a position with no target to initialize.
    #[error("at {span}: object construction requires an assignment target")]
    ConstructionWithoutTarget { span: Span },
}

impl SemanticError {
    /// The source position of this error.
    pub fn span(&self) -> Span {
        match self {
            SemanticError::NoOverloadMatches { span, .. } => *span,
            SemanticError::TypeMismatch { span, .. } => *span,
            SemanticError::CannotConcatenate { span, .. } => *span,
            SemanticError::DivisionByZero { span } => *span,
            SemanticError::NotConstant { span, .. } => *span,
            SemanticError::NotCallable { span, .. } => *span,
            SemanticError::NotAssignable { span } => *span,
            SemanticError::NoSuchMember { span, .. } => *span,
            SemanticError::NotIndexable { span, .. } => *span,
            SemanticError::BadOperand { span, .. } => *span,
            SemanticError::ConstructionWithoutTarget { span } => *span,
        }
    }
}

/// Unified error type funneled into the diagnostic sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// An internal invariant failed; always a bug in the compiler itself.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompileError {
    /// The source position, where one exists.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Collect(e) => Some(e.span()),
            CompileError::Header(e) => Some(e.span()),
            CompileError::Resolve(e) => Some(e.span()),
            CompileError::Semantic(e) => Some(e.span()),
            CompileError::Internal { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_error_display() {
        let err = CollectError::DuplicatePath {
            path: SymbolPath::parse("app.main"),
            span: Span::new(4, 1, 4),
        };
        assert_eq!(format!("{err}"), "at 4:1: duplicate declaration 'app.main'");
    }

    #[test]
    fn resolve_error_display() {
        let err = ResolveError::CannotFindReference {
            name: "frob".into(),
            span: Span::new(9, 12, 4),
        };
        assert_eq!(format!("{err}"), "at 9:12: cannot find reference 'frob'");
    }

    #[test]
    fn transparent_wrapping_preserves_message() {
        let inner = SemanticError::DivisionByZero {
            span: Span::new(2, 8, 1),
        };
        let err: CompileError = inner.into();
        assert_eq!(
            format!("{err}"),
            "at 2:8: division by zero in constant expression"
        );
        assert_eq!(err.span(), Some(Span::new(2, 8, 1)));
    }

    #[test]
    fn internal_error_has_no_span() {
        let err = CompileError::Internal {
            message: "bad state".into(),
        };
        assert_eq!(err.span(), None);
    }
}
