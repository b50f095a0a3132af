//! Statement and block nodes.

use vesper_core::Span;

use crate::{ExprNode, TypeExpr};

/// A braced statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockNode {
    pub stmts: Vec<StmtNode>,
    pub span: Span,
}

impl BlockNode {
    /// Build a block with a default span.
    pub fn new(stmts: Vec<StmtNode>) -> Self {
        Self {
            stmts,
            span: Span::default(),
        }
    }
}

/// One `condition { body }` arm of an if/elif chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub condition: ExprNode,
    pub body: BlockNode,
}

/// A statement as parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtNode {
    /// `var name: T = init` - a local declaration. The type annotation and
    /// the initializer are both optional; an untyped local takes its type
    /// from its first assignment.
    Local {
        name: String,
        ty: Option<TypeExpr>,
        init: Option<ExprNode>,
        span: Span,
    },
    /// `if ... elif ... else ...` chain; arms are ordered.
    If {
        arms: Vec<IfArm>,
        else_body: Option<BlockNode>,
        span: Span,
    },
    /// `while` with an optional setup block run once before the loop and an
    /// optional step block run after each iteration.
    While {
        define: Option<BlockNode>,
        condition: ExprNode,
        step: Option<BlockNode>,
        body: BlockNode,
        span: Span,
    },
    Return {
        value: Option<ExprNode>,
        span: Span,
    },
    Assign {
        target: ExprNode,
        value: ExprNode,
        span: Span,
    },
    /// An expression evaluated for effect.
    Expr(ExprNode),
    /// A nested bare block opening its own scope.
    Block(BlockNode),
}
