//! Intermediate representation of function and initializer bodies.
//!
//! The body lowerer produces this tree untyped; semantic analysis rewrites
//! it in place, replacing unresolved references with solved ones and
//! recomputing each node's type whenever a child changes. Code generation
//! consumes the finished tree.

use num_bigint::BigInt;
use vesper_ast::{BinaryOp, CompareOp, LogicalOp, UnaryOp};
use vesper_core::Span;

use crate::symbol::SymbolId;
use crate::types::TypeRef;

/// A statement list plus the locals its scope introduces.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Locals declared directly in this block, in declaration order.
    pub scope: Vec<SymbolId>,
    pub stmts: Vec<Stmt>,
}

/// One arm of an if/elif chain.
#[derive(Debug, Clone)]
pub struct IfArm {
    pub condition: Expr,
    pub body: Block,
}

/// A lowered statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    If {
        arms: Vec<IfArm>,
        else_body: Option<Block>,
    },
    While {
        define: Option<Block>,
        condition: Expr,
        step: Option<Block>,
        body: Block,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Assign {
        target: Expr,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
    Block(Block),
}

/// A reference resolved to exactly one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvedRef {
    Local(SymbolId),
    Parameter(SymbolId),
    Field(SymbolId),
    /// A specific overload, chosen by overload resolution.
    Function(SymbolId),
    /// An overload group; narrowed to one function at the invoke site.
    Group(SymbolId),
    Struct(SymbolId),
    Typedef(SymbolId),
    TypedefItem(SymbolId),
    Namespace(SymbolId),
    Module(SymbolId),
}

impl SolvedRef {
    /// The referenced symbol.
    pub fn symbol(self) -> SymbolId {
        match self {
            SolvedRef::Local(id)
            | SolvedRef::Parameter(id)
            | SolvedRef::Field(id)
            | SolvedRef::Function(id)
            | SolvedRef::Group(id)
            | SolvedRef::Struct(id)
            | SolvedRef::Typedef(id)
            | SolvedRef::TypedefItem(id)
            | SolvedRef::Namespace(id)
            | SolvedRef::Module(id) => id,
        }
    }
}

/// A lowered expression with its computed type.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeRef,
    pub span: Span,
}

impl Expr {
    /// An expression whose type analysis has not yet computed.
    pub fn untyped(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            ty: TypeRef::Infer,
            span,
        }
    }

    /// An expression with a known type.
    pub fn typed(kind: ExprKind, ty: TypeRef, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// Whether this is a literal the constant folder can consume.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Null
        )
    }
}

/// The expression variants.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal at arbitrary precision; `ty` narrows it.
    Int(BigInt),
    Str(String),
    Bool(bool),
    Null,
    Collection(Vec<Expr>),
    /// An identifier not yet resolved to a declaration.
    Unsolved(String),
    Solved(SolvedRef),
    /// `base.member` before the member is resolved.
    Access { base: Box<Expr>, member: String },
    /// `base.field` after resolution, reading an instance field.
    FieldAccess { base: Box<Expr>, field: SymbolId },
    /// A call before overload resolution.
    Invoke { callee: Box<Expr>, args: Vec<Expr> },
    /// A call bound to one function. `receiver` is present for instance
    /// methods; `vslot` is present for virtual dispatch.
    Call {
        function: SymbolId,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
        vslot: Option<u16>,
    },
    /// `new T(args)` before analysis rewrites it into [`ExprKind::ConstructInto`].
    New { ty: TypeRef, args: Vec<Expr> },
    /// In-place construction: invoke `ctor` with the address of `target`
    /// as the implicit first argument.
    ConstructInto {
        target: Box<Expr>,
        ctor: SymbolId,
        args: Vec<Expr>,
    },
    /// Explicit representation change inserted by cast insertion.
    Conv { value: Box<Expr>, to: TypeRef },
    Unary { op: UnaryOp, value: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index { base: Box<Expr>, index: Box<Expr> },
    LengthOf(Box<Expr>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_starts_as_infer() {
        let e = Expr::untyped(ExprKind::Bool(true), Span::default());
        assert_eq!(e.ty, TypeRef::Infer);
    }

    #[test]
    fn literals_are_foldable() {
        assert!(Expr::untyped(ExprKind::Int(BigInt::from(3)), Span::default()).is_literal());
        assert!(Expr::untyped(ExprKind::Null, Span::default()).is_literal());
        let call = Expr::untyped(
            ExprKind::Unsolved("f".into()),
            Span::default(),
        );
        assert!(!call.is_literal());
    }
}
