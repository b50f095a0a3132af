//! Body lowering.
//!
//! Walks function bodies and field initializers from syntax into untyped
//! IR. Local declarations allocate local symbols with their 0-based slot
//! here; everything else lowers structurally, leaving identifiers
//! unresolved for the semantic analyzer.

use log::debug;
use vesper_ast::{BlockNode, ExprNode, StmtNode};
use vesper_core::ResolveError;

use crate::ir;
use crate::session::CompileSession;
use crate::symbol::{LocalData, Symbol, SymbolId, SymbolKind};
use crate::type_resolver;
use crate::types::TypeRef;

/// Lower every function body and field initializer.
pub fn run(session: &mut CompileSession) {
    let ids: Vec<_> = session.arena.ids().collect();
    let mut lowered = 0usize;
    for id in ids {
        match &session.symbol(id).kind {
            SymbolKind::Function(data) if data.ast_body.is_some() => {
                lower_function(session, id);
                lowered += 1;
            }
            SymbolKind::Field(data) if data.ast_init.is_some() => {
                let init = match &session.symbol(id).kind {
                    SymbolKind::Field(data) => data.ast_init.clone(),
                    _ => None,
                };
                if let Some(init) = init {
                    let expr = lower_expr(&init);
                    if let SymbolKind::Field(data) = &mut session.symbol_mut(id).kind {
                        data.init = Some(expr);
                    }
                }
            }
            _ => {}
        }
    }
    debug!("lowered {lowered} function bodies");
}

fn lower_function(session: &mut CompileSession, function: SymbolId) {
    let ast = match &mut session.symbol_mut(function).kind {
        SymbolKind::Function(data) => data.ast_body.take(),
        _ => return,
    };
    let Some(ast) = ast else { return };
    let mut lowerer = Lowerer { session, function };
    let block = lowerer.lower_block(&ast);
    if let SymbolKind::Function(data) = &mut session.symbol_mut(function).kind {
        data.body = Some(block);
    }
}

struct Lowerer<'s> {
    session: &'s mut CompileSession,
    function: SymbolId,
}

impl Lowerer<'_> {
    fn lower_block(&mut self, block: &BlockNode) -> ir::Block {
        let mut out = ir::Block::default();
        for stmt in &block.stmts {
            self.lower_stmt(stmt, &mut out);
        }
        out
    }

    fn lower_stmt(&mut self, stmt: &StmtNode, out: &mut ir::Block) {
        match stmt {
            StmtNode::Local {
                name,
                ty,
                init,
                span,
            } => {
                let Some(local) = self.declare_local(name, ty.as_ref(), *span) else {
                    return;
                };
                out.scope.push(local);
                if let Some(init) = init {
                    out.stmts.push(ir::Stmt::Assign {
                        target: ir::Expr::untyped(
                            ir::ExprKind::Solved(ir::SolvedRef::Local(local)),
                            *span,
                        ),
                        value: lower_expr(init),
                        span: *span,
                    });
                }
            }
            StmtNode::If {
                arms, else_body, ..
            } => {
                out.stmts.push(ir::Stmt::If {
                    arms: arms
                        .iter()
                        .map(|arm| ir::IfArm {
                            condition: lower_expr(&arm.condition),
                            body: self.lower_block(&arm.body),
                        })
                        .collect(),
                    else_body: else_body.as_ref().map(|b| self.lower_block(b)),
                });
            }
            StmtNode::While {
                define,
                condition,
                step,
                body,
                ..
            } => {
                out.stmts.push(ir::Stmt::While {
                    define: define.as_ref().map(|b| self.lower_block(b)),
                    condition: lower_expr(condition),
                    step: step.as_ref().map(|b| self.lower_block(b)),
                    body: self.lower_block(body),
                });
            }
            StmtNode::Return { value, span } => {
                out.stmts.push(ir::Stmt::Return {
                    value: value.as_ref().map(lower_expr),
                    span: *span,
                });
            }
            StmtNode::Assign {
                target,
                value,
                span,
            } => {
                out.stmts.push(ir::Stmt::Assign {
                    target: lower_expr(target),
                    value: lower_expr(value),
                    span: *span,
                });
            }
            StmtNode::Expr(expr) => out.stmts.push(ir::Stmt::Expr(lower_expr(expr))),
            StmtNode::Block(block) => {
                let lowered = self.lower_block(block);
                out.stmts.push(ir::Stmt::Block(lowered));
            }
        }
    }

    /// Allocate a local symbol in the current callable.
    ///
    /// The callable's local namespace is flat: reusing any declared local
    /// name is the fatal shadowing error, and the declaration is dropped.
    fn declare_local(
        &mut self,
        name: &str,
        ty: Option<&vesper_ast::TypeExpr>,
        span: vesper_core::Span,
    ) -> Option<SymbolId> {
        let locals = match &self.session.symbol(self.function).kind {
            SymbolKind::Function(data) => data.locals.clone(),
            _ => return None,
        };
        if locals
            .iter()
            .any(|&l| self.session.symbol(l).name == name)
        {
            self.session.error_for(
                self.function,
                ResolveError::ShadowsDeclaration {
                    name: name.to_string(),
                    span,
                },
            );
            return None;
        }

        let declared = match ty {
            Some(expr) => {
                let shallow = type_resolver::shallow_resolve(expr);
                match type_resolver::lazy_resolve(self.session, self.function, &shallow) {
                    Ok(solved) => solved,
                    Err(err) => {
                        self.session.error_for(self.function, err);
                        TypeRef::Infer
                    }
                }
            }
            None => TypeRef::Infer,
        };

        let path = self.session.symbol(self.function).path.child(name);
        let local = self.session.declare(Symbol::new(
            name,
            path,
            Some(self.function),
            span,
            SymbolKind::Local(LocalData {
                ty: declared,
                slot: locals.len() as u32,
            }),
        ));
        if let SymbolKind::Function(data) = &mut self.session.symbol_mut(self.function).kind {
            data.locals.push(local);
        }
        Some(local)
    }
}

/// Lower one expression to untyped IR.
pub fn lower_expr(expr: &ExprNode) -> ir::Expr {
    let span = expr.span();
    let kind = match expr {
        ExprNode::Int { value, .. } => ir::ExprKind::Int(value.clone()),
        ExprNode::Str { value, .. } => ir::ExprKind::Str(value.clone()),
        ExprNode::Bool { value, .. } => ir::ExprKind::Bool(*value),
        ExprNode::Null { .. } => ir::ExprKind::Null,
        ExprNode::Collection { items, .. } => {
            ir::ExprKind::Collection(items.iter().map(lower_expr).collect())
        }
        ExprNode::Ident { name, .. } => ir::ExprKind::Unsolved(name.clone()),
        ExprNode::Access { base, member, .. } => ir::ExprKind::Access {
            base: Box::new(lower_expr(base)),
            member: member.clone(),
        },
        ExprNode::Invoke { callee, args, .. } => ir::ExprKind::Invoke {
            callee: Box::new(lower_expr(callee)),
            args: args.iter().map(lower_expr).collect(),
        },
        ExprNode::New { ty, args, .. } => ir::ExprKind::New {
            ty: TypeRef::Unsolved(Box::new(ty.clone())),
            args: args.iter().map(lower_expr).collect(),
        },
        ExprNode::Cast { value, ty, .. } => ir::ExprKind::Conv {
            value: Box::new(lower_expr(value)),
            to: TypeRef::Unsolved(Box::new(ty.clone())),
        },
        ExprNode::Unary { op, value, .. } => ir::ExprKind::Unary {
            op: *op,
            value: Box::new(lower_expr(value)),
        },
        ExprNode::Binary {
            op, left, right, ..
        } => ir::ExprKind::Binary {
            op: *op,
            left: Box::new(lower_expr(left)),
            right: Box::new(lower_expr(right)),
        },
        ExprNode::Compare {
            op, left, right, ..
        } => ir::ExprKind::Compare {
            op: *op,
            left: Box::new(lower_expr(left)),
            right: Box::new(lower_expr(right)),
        },
        ExprNode::Logical {
            op, left, right, ..
        } => ir::ExprKind::Logical {
            op: *op,
            left: Box::new(lower_expr(left)),
            right: Box::new(lower_expr(right)),
        },
        ExprNode::Index { base, index, .. } => ir::ExprKind::Index {
            base: Box::new(lower_expr(base)),
            index: Box::new(lower_expr(index)),
        },
        ExprNode::LengthOf { value, .. } => ir::ExprKind::LengthOf(Box::new(lower_expr(value))),
    };
    ir::Expr::untyped(kind, span)
}
