//! Expression nodes.

use num_bigint::BigInt;
use vesper_core::Span;

use crate::TypeExpr;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
}

/// Arithmetic and bitwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Source notation, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// Comparison operators. Always produce `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Source notation, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// An expression as parsed.
///
/// Integer literals keep arbitrary precision until semantic analysis
/// narrows them to a concrete runtime width.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Int {
        value: BigInt,
        span: Span,
    },
    Str {
        value: String,
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    Null {
        span: Span,
    },
    /// `[a, b, c]`
    Collection {
        items: Vec<ExprNode>,
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    /// `base.member`
    Access {
        base: Box<ExprNode>,
        member: String,
        span: Span,
    },
    /// `callee(args...)`
    Invoke {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
        span: Span,
    },
    /// `new T(args...)`
    New {
        ty: TypeExpr,
        args: Vec<ExprNode>,
        span: Span,
    },
    /// `value as T`
    Cast {
        value: Box<ExprNode>,
        ty: TypeExpr,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        value: Box<ExprNode>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
        span: Span,
    },
    Compare {
        op: CompareOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
        span: Span,
    },
    Logical {
        op: LogicalOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
        span: Span,
    },
    /// `base[index]`
    Index {
        base: Box<ExprNode>,
        index: Box<ExprNode>,
        span: Span,
    },
    /// `lengthof value`
    LengthOf {
        value: Box<ExprNode>,
        span: Span,
    },
}

impl ExprNode {
    /// Integer literal with a default span.
    pub fn int(value: impl Into<BigInt>) -> Self {
        ExprNode::Int {
            value: value.into(),
            span: Span::default(),
        }
    }

    /// String literal with a default span.
    pub fn string(value: impl Into<String>) -> Self {
        ExprNode::Str {
            value: value.into(),
            span: Span::default(),
        }
    }

    /// Identifier with a default span.
    pub fn ident(name: impl Into<String>) -> Self {
        ExprNode::Ident {
            name: name.into(),
            span: Span::default(),
        }
    }

    /// The source position of this expression.
    pub fn span(&self) -> Span {
        match self {
            ExprNode::Int { span, .. }
            | ExprNode::Str { span, .. }
            | ExprNode::Bool { span, .. }
            | ExprNode::Null { span }
            | ExprNode::Collection { span, .. }
            | ExprNode::Ident { span, .. }
            | ExprNode::Access { span, .. }
            | ExprNode::Invoke { span, .. }
            | ExprNode::New { span, .. }
            | ExprNode::Cast { span, .. }
            | ExprNode::Unary { span, .. }
            | ExprNode::Binary { span, .. }
            | ExprNode::Compare { span, .. }
            | ExprNode::Logical { span, .. }
            | ExprNode::Index { span, .. }
            | ExprNode::LengthOf { span, .. } => *span,
        }
    }
}
