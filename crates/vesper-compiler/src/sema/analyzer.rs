//! The semantic analysis pass.
//!
//! Walks every lowered body bottom-up: resolves identifier references,
//! performs overload resolution at call sites, inserts casts, folds
//! constant expressions, and assigns each node its final type. Nodes are
//! rewritten in place; a node's type is recomputed whenever one of its
//! children is replaced.

use std::mem;

use log::debug;
use num_bigint::BigInt;
use vesper_ast::{BinaryOp, CompareOp, LogicalOp, UnaryOp};
use vesper_core::{SemanticError, Span};

use crate::ir::{Block, Expr, ExprKind, SolvedRef, Stmt};
use crate::resolve::{self, ResolveCtx};
use crate::sema::cast::coerce;
use crate::sema::fold::{FoldError, fold_binary, fold_compare, narrow_to_width};
use crate::sema::overload::{param_types, resolve_among, resolve_overload};
use crate::session::CompileSession;
use crate::symbol::{SymbolId, SymbolKind};
use crate::type_resolver;
use crate::types::{IntWidth, StringEncoding, TypeRef};

/// Run semantic analysis over typedef items, field initializers, and
/// function bodies.
pub fn run(session: &mut CompileSession, allow_implicit: bool) {
    analyze_typedef_items(session);
    analyze_field_initializers(session, allow_implicit);
    analyze_function_bodies(session, allow_implicit);
    debug!("semantic analysis complete");
}

fn analyze_typedef_items(session: &mut CompileSession) {
    let typedefs: Vec<_> = session
        .arena
        .iter()
        .filter(|(_, s)| matches!(s.kind, SymbolKind::Typedef(_)))
        .map(|(id, _)| id)
        .collect();
    for typedef in typedefs {
        let (underlying, items) = match &session.symbol(typedef).kind {
            SymbolKind::Typedef(data) => (data.underlying.clone(), data.items.clone()),
            _ => continue,
        };
        let mut next = BigInt::ZERO;
        for item in items {
            let ast_value = match &session.symbol(item).kind {
                SymbolKind::TypedefItem(data) => data.ast_value.clone(),
                _ => continue,
            };
            let value = match ast_value {
                None => next.clone(),
                Some(expr) => {
                    let mut lowered = crate::lower::lower_expr(&expr);
                    let mut analyzer = Analyzer::new(session, item, TypeRef::Void, true);
                    analyzer.analyze_expr(&mut lowered);
                    match lowered.kind {
                        ExprKind::Int(v) => match &underlying {
                            TypeRef::Int { signed, width } => {
                                narrow_to_width(&v, *signed, width.bits())
                            }
                            _ => v,
                        },
                        _ => {
                            session.error_for(
                                item,
                                SemanticError::NotConstant {
                                    what: "typedef item value",
                                    span: expr.span(),
                                },
                            );
                            next.clone()
                        }
                    }
                }
            };
            next = &value + 1;
            if let SymbolKind::TypedefItem(data) = &mut session.symbol_mut(item).kind {
                data.value = Some(value);
            }
        }
    }
}

fn analyze_field_initializers(session: &mut CompileSession, allow_implicit: bool) {
    let fields: Vec<_> = session
        .arena
        .iter()
        .filter(|(_, s)| matches!(s.kind, SymbolKind::Field(_)))
        .map(|(id, _)| id)
        .collect();
    for field in fields {
        let init = match &mut session.symbol_mut(field).kind {
            SymbolKind::Field(data) => data.init.take(),
            _ => None,
        };
        let Some(mut init) = init else { continue };

        let mut analyzer = Analyzer::new(session, field, TypeRef::Void, allow_implicit);
        analyzer.analyze_expr(&mut init);

        let declared = match &session.symbol(field).kind {
            SymbolKind::Field(data) => data.ty.clone(),
            _ => TypeRef::Infer,
        };
        if matches!(declared, TypeRef::Infer) {
            let inferred = effective_type(&init.ty);
            if let SymbolKind::Field(data) = &mut session.symbol_mut(field).kind {
                data.ty = inferred;
            }
        } else {
            let mut analyzer = Analyzer::new(session, field, TypeRef::Void, allow_implicit);
            analyzer.coerce_in_place(&mut init, &declared);
        }

        // The module image stores field initial values as constants.
        if !init.is_literal() {
            let span = init.span;
            session.error_for(
                field,
                SemanticError::NotConstant {
                    what: "field initializer",
                    span,
                },
            );
        }
        if let SymbolKind::Field(data) = &mut session.symbol_mut(field).kind {
            data.init = Some(init);
        }
    }
}

fn analyze_function_bodies(session: &mut CompileSession, allow_implicit: bool) {
    let functions: Vec<_> = session
        .arena
        .iter()
        .filter(|(_, s)| matches!(&s.kind, SymbolKind::Function(data) if data.body.is_some()))
        .map(|(id, _)| id)
        .collect();
    for function in functions {
        let (mut body, return_type) = match &mut session.symbol_mut(function).kind {
            SymbolKind::Function(data) => (data.body.take(), data.return_type.clone()),
            _ => (None, TypeRef::Void),
        };
        if let Some(block) = &mut body {
            let mut analyzer = Analyzer::new(session, function, return_type, allow_implicit);
            analyzer.analyze_block(block);
        }
        if let SymbolKind::Function(data) = &mut session.symbol_mut(function).kind {
            data.body = body;
        }
    }
}

/// The comptime-integer literal type promotes to the signed default when
/// a concrete type must be materialized.
fn effective_type(ty: &TypeRef) -> TypeRef {
    match ty {
        TypeRef::ComptimeInt => TypeRef::default_int(),
        other => other.clone(),
    }
}

fn placeholder(span: Span) -> Expr {
    Expr::untyped(ExprKind::Null, span)
}

struct Analyzer<'s> {
    session: &'s mut CompileSession,
    /// Resolution context: the containing callable, field, or typedef item.
    owner: SymbolId,
    return_type: TypeRef,
    allow_implicit: bool,
    /// Active block scopes, innermost last.
    scopes: Vec<Vec<SymbolId>>,
}

impl<'s> Analyzer<'s> {
    fn new(
        session: &'s mut CompileSession,
        owner: SymbolId,
        return_type: TypeRef,
        allow_implicit: bool,
    ) -> Self {
        Self {
            session,
            owner,
            return_type,
            allow_implicit,
            scopes: Vec::new(),
        }
    }

    fn err(&mut self, error: SemanticError) {
        self.session.error_for(self.owner, error);
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn analyze_block(&mut self, block: &mut Block) {
        self.scopes.push(block.scope.clone());
        for stmt in &mut block.stmts {
            self.analyze_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn analyze_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::If { arms, else_body } => {
                for arm in arms.iter_mut() {
                    self.analyze_condition(&mut arm.condition);
                    self.analyze_block(&mut arm.body);
                }
                if let Some(else_body) = else_body {
                    self.analyze_block(else_body);
                }
            }
            Stmt::While {
                define,
                condition,
                step,
                body,
            } => {
                // Locals of the define block stay visible to the
                // condition, the step block, and the body.
                let defined = define.is_some();
                if let Some(define) = define {
                    self.scopes.push(define.scope.clone());
                    for stmt in &mut define.stmts {
                        self.analyze_stmt(stmt);
                    }
                }
                self.analyze_condition(condition);
                if let Some(step) = step {
                    self.analyze_block(step);
                }
                self.analyze_block(body);
                if defined {
                    self.scopes.pop();
                }
            }
            Stmt::Return { value, span } => self.analyze_return(value, *span),
            Stmt::Assign {
                target,
                value,
                span,
            } => {
                self.analyze_expr(target);
                if matches!(value.kind, ExprKind::New { .. }) {
                    let span = *span;
                    let target = mem::replace(target, placeholder(span));
                    let value = mem::replace(value, placeholder(span));
                    *stmt = Stmt::Expr(self.build_construction(target, value, span));
                } else {
                    self.analyze_assignment(target, value);
                }
            }
            Stmt::Expr(expr) => {
                if matches!(expr.kind, ExprKind::New { .. }) {
                    self.err(SemanticError::ConstructionWithoutTarget { span: expr.span });
                } else {
                    self.analyze_expr(expr);
                }
            }
            Stmt::Block(block) => self.analyze_block(block),
        }
    }

    fn analyze_condition(&mut self, condition: &mut Expr) {
        self.analyze_expr(condition);
        if !matches!(condition.ty, TypeRef::Bool | TypeRef::Infer) {
            let found = condition.ty.display(&self.session.arena);
            self.err(SemanticError::TypeMismatch {
                expected: "bool".into(),
                found,
                span: condition.span,
            });
        }
    }

    fn analyze_return(&mut self, value: &mut Option<Expr>, span: Span) {
        match value {
            Some(expr) => {
                self.analyze_expr(expr);
                if matches!(self.return_type, TypeRef::Void) {
                    let found = expr.ty.display(&self.session.arena);
                    self.err(SemanticError::TypeMismatch {
                        expected: "void".into(),
                        found,
                        span,
                    });
                } else {
                    let target = self.return_type.clone();
                    self.coerce_in_place(expr, &target);
                }
            }
            None => {
                if !matches!(self.return_type, TypeRef::Void | TypeRef::NoReturn) {
                    let expected = self.return_type.display(&self.session.arena);
                    self.err(SemanticError::TypeMismatch {
                        expected,
                        found: "void".into(),
                        span,
                    });
                }
            }
        }
    }

    fn analyze_assignment(&mut self, target: &mut Expr, value: &mut Expr) {
        self.analyze_expr(value);

        // The first assignment to an untyped local establishes its type.
        if let ExprKind::Solved(SolvedRef::Local(local)) = target.kind
            && matches!(self.local_type(local), TypeRef::Infer)
        {
            let inferred = effective_type(&value.ty);
            self.set_local_type(local, inferred.clone());
            target.ty = inferred;
        }

        if !is_assignable(&target.kind) {
            self.err(SemanticError::NotAssignable { span: target.span });
            return;
        }
        let target_ty = target.ty.clone();
        if !matches!(target_ty, TypeRef::Infer) {
            self.coerce_in_place(value, &target_ty);
        }
    }

    /// Rewrite `target = new T(args)` into an in-place constructor
    /// invocation whose first implicit argument is the target's address.
    fn build_construction(&mut self, mut target: Expr, value: Expr, span: Span) -> Expr {
        let ExprKind::New { ty, args } = value.kind else {
            return placeholder(span);
        };
        let solved = match type_resolver::lazy_resolve(self.session, self.owner, &ty) {
            Ok(solved) => solved,
            Err(err) => {
                self.session.error_for(self.owner, err);
                return placeholder(span);
            }
        };
        let TypeRef::Struct(struct_id) = solved else {
            let found = solved.display(&self.session.arena);
            self.err(SemanticError::TypeMismatch {
                expected: "struct type".into(),
                found,
                span,
            });
            return placeholder(span);
        };

        if let ExprKind::Solved(SolvedRef::Local(local)) = target.kind
            && matches!(self.local_type(local), TypeRef::Infer)
        {
            self.set_local_type(local, TypeRef::Struct(struct_id));
            target.ty = TypeRef::Struct(struct_id);
        }
        if target.ty != TypeRef::Struct(struct_id) {
            let expected = target.ty.display(&self.session.arena);
            let found = TypeRef::Struct(struct_id).display(&self.session.arena);
            self.err(SemanticError::TypeMismatch {
                expected,
                found,
                span,
            });
        }

        let mut args = args;
        for arg in &mut args {
            self.analyze_expr(arg);
        }
        let arg_types: Vec<_> = args.iter().map(|a| a.ty.clone()).collect();
        let ctors = constructors_of(self.session, struct_id);
        let name = self.session.symbol(struct_id).name.clone();
        let ctor = match resolve_among(
            self.session,
            &name,
            &ctors,
            &arg_types,
            self.allow_implicit,
            span,
        ) {
            Ok(ctor) => ctor,
            Err(err) => {
                self.err(err);
                return placeholder(span);
            }
        };
        self.coerce_args(&mut args, ctor);

        Expr::typed(
            ExprKind::ConstructInto {
                target: Box::new(target),
                ctor,
                args,
            },
            TypeRef::Void,
            span,
        )
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn analyze_expr(&mut self, expr: &mut Expr) {
        let span = expr.span;
        let kind = mem::replace(&mut expr.kind, ExprKind::Null);
        let (kind, ty) = self.analyze_kind(kind, span);
        expr.kind = kind;
        expr.ty = ty;
    }

    fn analyze_kind(&mut self, kind: ExprKind, span: Span) -> (ExprKind, TypeRef) {
        match kind {
            ExprKind::Int(v) => (ExprKind::Int(v), TypeRef::ComptimeInt),
            ExprKind::Str(s) => (ExprKind::Str(s), TypeRef::Str(StringEncoding::Utf8)),
            ExprKind::Bool(b) => (ExprKind::Bool(b), TypeRef::Bool),
            ExprKind::Null => (
                ExprKind::Null,
                TypeRef::Nullable(Box::new(TypeRef::Anytype)),
            ),
            ExprKind::Collection(mut items) => {
                for item in &mut items {
                    self.analyze_expr(item);
                }
                let elem = items
                    .first()
                    .map(|i| i.ty.clone())
                    .unwrap_or(TypeRef::Anytype);
                (ExprKind::Collection(items), TypeRef::Slice(Box::new(elem)))
            }
            ExprKind::Unsolved(name) => match self.resolve_ident(&name, span) {
                Some(solved) => {
                    let ty = self.ref_type(solved);
                    (ExprKind::Solved(solved), ty)
                }
                None => (ExprKind::Unsolved(name), TypeRef::Infer),
            },
            ExprKind::Solved(solved) => {
                let ty = self.ref_type(solved);
                (ExprKind::Solved(solved), ty)
            }
            ExprKind::Access { mut base, member } => {
                self.analyze_expr(&mut base);
                self.analyze_access(base, member, span)
            }
            ExprKind::FieldAccess { mut base, field } => {
                self.analyze_expr(&mut base);
                let ty = self.field_type(field);
                (ExprKind::FieldAccess { base, field }, ty)
            }
            ExprKind::Invoke { callee, mut args } => {
                for arg in &mut args {
                    self.analyze_expr(arg);
                }
                self.analyze_invoke(*callee, args, span)
            }
            ExprKind::Call {
                function,
                receiver,
                args,
                vslot,
            } => {
                let ty = self.function_return(function);
                (
                    ExprKind::Call {
                        function,
                        receiver,
                        args,
                        vslot,
                    },
                    ty,
                )
            }
            ExprKind::New { ty, args } => {
                self.err(SemanticError::ConstructionWithoutTarget { span });
                (ExprKind::New { ty, args }, TypeRef::Infer)
            }
            ExprKind::ConstructInto {
                target,
                ctor,
                args,
            } => (
                ExprKind::ConstructInto {
                    target,
                    ctor,
                    args,
                },
                TypeRef::Void,
            ),
            ExprKind::Conv { mut value, to } => {
                self.analyze_expr(&mut value);
                self.analyze_explicit_cast(value, to, span)
            }
            ExprKind::Unary { op, mut value } => {
                self.analyze_expr(&mut value);
                self.analyze_unary(op, value, span)
            }
            ExprKind::Binary {
                op,
                mut left,
                mut right,
            } => {
                self.analyze_expr(&mut left);
                self.analyze_expr(&mut right);
                self.analyze_binary(op, left, right, span)
            }
            ExprKind::Compare {
                op,
                mut left,
                mut right,
            } => {
                self.analyze_expr(&mut left);
                self.analyze_expr(&mut right);
                self.analyze_compare(op, left, right, span)
            }
            ExprKind::Logical {
                op,
                mut left,
                mut right,
            } => {
                self.analyze_expr(&mut left);
                self.analyze_expr(&mut right);
                self.analyze_logical(op, left, right, span)
            }
            ExprKind::Index {
                mut base,
                mut index,
            } => {
                self.analyze_expr(&mut base);
                self.analyze_expr(&mut index);
                let usize_ty = TypeRef::Int {
                    signed: false,
                    width: IntWidth::PointerSized,
                };
                self.coerce_in_place(&mut index, &usize_ty);
                let ty = match &base.ty {
                    TypeRef::Slice(elem) => (**elem).clone(),
                    TypeRef::Str(_) => TypeRef::Char,
                    TypeRef::Infer => TypeRef::Infer,
                    other => {
                        let type_name = other.display(&self.session.arena);
                        self.err(SemanticError::NotIndexable { type_name, span });
                        TypeRef::Infer
                    }
                };
                (ExprKind::Index { base, index }, ty)
            }
            ExprKind::LengthOf(mut value) => {
                self.analyze_expr(&mut value);
                match &value.ty {
                    TypeRef::Slice(_) | TypeRef::Str(_) | TypeRef::Infer => {}
                    other => {
                        let operand = other.display(&self.session.arena);
                        self.err(SemanticError::BadOperand {
                            op: "lengthof".into(),
                            operand,
                            span,
                        });
                    }
                }
                (
                    ExprKind::LengthOf(value),
                    TypeRef::Int {
                        signed: false,
                        width: IntWidth::PointerSized,
                    },
                )
            }
        }
    }

    /// Member access once the base is analyzed: scoped access through a
    /// namespace, module, struct, or typedef resolves among children;
    /// instance access searches the struct's field chain.
    fn analyze_access(&mut self, base: Box<Expr>, member: String, span: Span) -> (ExprKind, TypeRef) {
        if let ExprKind::Solved(solved) = &base.kind {
            let scope = match solved {
                SolvedRef::Namespace(id)
                | SolvedRef::Module(id)
                | SolvedRef::Struct(id)
                | SolvedRef::Typedef(id) => Some(*id),
                _ => None,
            };
            if let Some(scope) = scope {
                return match self.session.arena.child_named(scope, &member) {
                    Some(child) => {
                        let solved = self.classify(child);
                        let ty = self.ref_type(solved);
                        (ExprKind::Solved(solved), ty)
                    }
                    None => {
                        let type_name = self.session.symbol(scope).path.to_string();
                        self.err(SemanticError::NoSuchMember {
                            member,
                            type_name,
                            span,
                        });
                        (ExprKind::Null, TypeRef::Infer)
                    }
                };
            }
        }

        match self.instance_struct(&base.ty) {
            Some(struct_id) => match self.find_field(struct_id, &member) {
                Some(field) => {
                    let ty = self.field_type(field);
                    (ExprKind::FieldAccess { base, field }, ty)
                }
                None => {
                    let type_name = self.session.symbol(struct_id).path.to_string();
                    self.err(SemanticError::NoSuchMember {
                        member,
                        type_name,
                        span,
                    });
                    (ExprKind::Null, TypeRef::Infer)
                }
            },
            None => {
                if !matches!(base.ty, TypeRef::Infer) {
                    let type_name = base.ty.display(&self.session.arena);
                    self.err(SemanticError::NoSuchMember {
                        member,
                        type_name,
                        span,
                    });
                }
                (ExprKind::Null, TypeRef::Infer)
            }
        }
    }

    /// Overload resolution at a call site. Arguments are already analyzed.
    fn analyze_invoke(
        &mut self,
        callee: Expr,
        mut args: Vec<Expr>,
        span: Span,
    ) -> (ExprKind, TypeRef) {
        let arg_types: Vec<_> = args.iter().map(|a| a.ty.clone()).collect();

        let resolved = match callee.kind {
            ExprKind::Unsolved(ref name) => match self.resolve_ident(name, span) {
                Some(SolvedRef::Group(group)) | Some(SolvedRef::Function(group)) => {
                    match resolve_overload(
                        self.session,
                        group,
                        &arg_types,
                        self.allow_implicit,
                        span,
                    ) {
                        Ok(winner) => {
                            // An unqualified call to an instance method
                            // dispatches on the implicit receiver.
                            let vslot = self
                                .enclosing_struct()
                                .and_then(|s| self.vslot_for(s, winner));
                            Some((winner, None, vslot))
                        }
                        Err(err) => {
                            self.err(err);
                            None
                        }
                    }
                }
                Some(_) => {
                    self.err(SemanticError::NotCallable {
                        name: name.clone(),
                        span,
                    });
                    None
                }
                None => None,
            },
            ExprKind::Access { mut base, member } => {
                self.analyze_expr(&mut base);
                self.resolve_member_call(*base, member, &arg_types, span)
            }
            _ => {
                let name = callee.ty.display(&self.session.arena);
                self.err(SemanticError::NotCallable { name, span });
                None
            }
        };

        match resolved {
            Some((function, receiver, vslot)) => {
                self.coerce_args(&mut args, function);
                let ty = self.function_return(function);
                (
                    ExprKind::Call {
                        function,
                        receiver,
                        args,
                        vslot,
                    },
                    ty,
                )
            }
            None => (ExprKind::Null, TypeRef::Infer),
        }
    }

    /// Resolve `base.member(args)`: scoped call or instance method call.
    #[allow(clippy::type_complexity)]
    fn resolve_member_call(
        &mut self,
        base: Expr,
        member: String,
        arg_types: &[TypeRef],
        span: Span,
    ) -> Option<(SymbolId, Option<Box<Expr>>, Option<u16>)> {
        if let ExprKind::Solved(solved) = &base.kind {
            let scope = match solved {
                SolvedRef::Namespace(id)
                | SolvedRef::Module(id)
                | SolvedRef::Struct(id)
                | SolvedRef::Typedef(id) => Some(*id),
                _ => None,
            };
            if let Some(scope) = scope {
                let Some(child) = self.session.arena.child_named(scope, &member) else {
                    let type_name = self.session.symbol(scope).path.to_string();
                    self.err(SemanticError::NoSuchMember {
                        member,
                        type_name,
                        span,
                    });
                    return None;
                };
                return match resolve_overload(
                    self.session,
                    child,
                    arg_types,
                    self.allow_implicit,
                    span,
                ) {
                    Ok(winner) => Some((winner, None, None)),
                    Err(err) => {
                        self.err(err);
                        None
                    }
                };
            }
        }

        let struct_id = match self.instance_struct(&base.ty) {
            Some(id) => id,
            None => {
                if !matches!(base.ty, TypeRef::Infer) {
                    let type_name = base.ty.display(&self.session.arena);
                    self.err(SemanticError::NoSuchMember {
                        member,
                        type_name,
                        span,
                    });
                }
                return None;
            }
        };
        let Some(group) = self.find_method_group(struct_id, &member) else {
            let type_name = self.session.symbol(struct_id).path.to_string();
            self.err(SemanticError::NoSuchMember {
                member,
                type_name,
                span,
            });
            return None;
        };
        match resolve_overload(self.session, group, arg_types, self.allow_implicit, span) {
            Ok(winner) => {
                let vslot = self.vslot_for(struct_id, winner);
                Some((winner, Some(Box::new(base)), vslot))
            }
            Err(err) => {
                self.err(err);
                None
            }
        }
    }

    fn analyze_explicit_cast(
        &mut self,
        value: Box<Expr>,
        to: TypeRef,
        span: Span,
    ) -> (ExprKind, TypeRef) {
        let target = match type_resolver::lazy_resolve(self.session, self.owner, &to) {
            Ok(solved) => solved,
            Err(err) => {
                self.session.error_for(self.owner, err);
                return (ExprKind::Conv { value, to }, TypeRef::Infer);
            }
        };

        // Casting to the value's own type collapses the node entirely.
        if value.ty == target {
            let inner = *value;
            return (inner.kind, target);
        }

        let ok = matches!(
            (&value.ty, &target),
            (TypeRef::ComptimeInt, TypeRef::Int { .. })
                | (TypeRef::Int { .. }, TypeRef::Int { .. })
                | (TypeRef::Typedef(_), TypeRef::Int { .. })
                | (TypeRef::Int { .. }, TypeRef::Typedef(_))
                | (TypeRef::Struct(_), TypeRef::Struct(_))
                | (TypeRef::Reference(_), TypeRef::Reference(_))
                | (_, TypeRef::Nullable(_))
                | (TypeRef::Infer, _)
        );
        if !ok {
            let from = value.ty.display(&self.session.arena);
            let to_name = target.display(&self.session.arena);
            self.err(SemanticError::TypeMismatch {
                expected: to_name,
                found: from,
                span,
            });
        }

        // A comptime literal narrows in place instead of converting.
        if matches!(value.ty, TypeRef::ComptimeInt)
            && let TypeRef::Int { signed, width } = &target
            && let ExprKind::Int(v) = &value.kind
        {
            let narrowed = narrow_to_width(v, *signed, width.bits());
            return (ExprKind::Int(narrowed), target);
        }

        (
            ExprKind::Conv {
                value,
                to: target.clone(),
            },
            target,
        )
    }

    fn analyze_unary(&mut self, op: UnaryOp, value: Box<Expr>, span: Span) -> (ExprKind, TypeRef) {
        let ty = value.ty.clone();
        match op {
            UnaryOp::Neg | UnaryOp::BitNot => {
                if !matches!(ty, TypeRef::ComptimeInt | TypeRef::Int { .. } | TypeRef::Infer) {
                    let operand = ty.display(&self.session.arena);
                    self.err(SemanticError::BadOperand {
                        op: if op == UnaryOp::Neg { "-" } else { "~" }.into(),
                        operand,
                        span,
                    });
                    return (ExprKind::Unary { op, value }, TypeRef::Infer);
                }
                if let ExprKind::Int(v) = &value.kind {
                    // Two's complement: !x == -x - 1.
                    let folded = match op {
                        UnaryOp::Neg => -v,
                        _ => -v - 1,
                    };
                    let folded = match &ty {
                        TypeRef::Int { signed, width } => {
                            narrow_to_width(&folded, *signed, width.bits())
                        }
                        _ => folded,
                    };
                    return (ExprKind::Int(folded), ty);
                }
                (ExprKind::Unary { op, value }, ty)
            }
            UnaryOp::Not => {
                if !matches!(ty, TypeRef::Bool | TypeRef::Infer) {
                    let operand = ty.display(&self.session.arena);
                    self.err(SemanticError::BadOperand {
                        op: "!".into(),
                        operand,
                        span,
                    });
                    return (ExprKind::Unary { op, value }, TypeRef::Infer);
                }
                if let ExprKind::Bool(b) = value.kind {
                    return (ExprKind::Bool(!b), TypeRef::Bool);
                }
                (ExprKind::Unary { op, value }, TypeRef::Bool)
            }
        }
    }

    /// Result type of an integer binary expression: two comptime operands
    /// stay comptime; a comptime operand adopts the runtime side; two
    /// runtime operands pick the wider (the left on equal width).
    fn binary_result_type(&self, left: &TypeRef, right: &TypeRef) -> Option<TypeRef> {
        match (left, right) {
            (TypeRef::ComptimeInt, TypeRef::ComptimeInt) => Some(TypeRef::ComptimeInt),
            (TypeRef::ComptimeInt, TypeRef::Int { .. }) => Some(right.clone()),
            (TypeRef::Int { .. }, TypeRef::ComptimeInt) => Some(left.clone()),
            (TypeRef::Int { width: lw, .. }, TypeRef::Int { width: rw, .. }) => {
                if rw.bits() > lw.bits() {
                    Some(right.clone())
                } else {
                    Some(left.clone())
                }
            }
            _ => None,
        }
    }

    fn analyze_binary(
        &mut self,
        op: BinaryOp,
        mut left: Box<Expr>,
        mut right: Box<Expr>,
        span: Span,
    ) -> (ExprKind, TypeRef) {
        if matches!(left.ty, TypeRef::Infer) || matches!(right.ty, TypeRef::Infer) {
            return (ExprKind::Binary { op, left, right }, TypeRef::Infer);
        }

        // String concatenation.
        if let (TypeRef::Str(le), TypeRef::Str(re)) = (&left.ty, &right.ty) {
            if op != BinaryOp::Add || le != re {
                let l = left.ty.display(&self.session.arena);
                let r = right.ty.display(&self.session.arena);
                self.err(SemanticError::CannotConcatenate {
                    left: l,
                    right: r,
                    span,
                });
                return (ExprKind::Binary { op, left, right }, TypeRef::Infer);
            }
            let ty = left.ty.clone();
            if let (ExprKind::Str(l), ExprKind::Str(r)) = (&left.kind, &right.kind) {
                return (ExprKind::Str(format!("{l}{r}")), ty);
            }
            return (ExprKind::Binary { op, left, right }, ty);
        }

        let Some(result) = self.binary_result_type(&left.ty, &right.ty) else {
            let operand = format!(
                "{}, {}",
                left.ty.display(&self.session.arena),
                right.ty.display(&self.session.arena)
            );
            self.err(SemanticError::BadOperand {
                op: op.symbol().into(),
                operand,
                span,
            });
            return (ExprKind::Binary { op, left, right }, TypeRef::Infer);
        };

        if !matches!(result, TypeRef::ComptimeInt) {
            self.coerce_in_place(&mut left, &result);
            self.coerce_in_place(&mut right, &result);
        }

        // Both operands literal: replace the node with the folded literal,
        // computed at unbounded precision and narrowed to the result width.
        if let (ExprKind::Int(l), ExprKind::Int(r)) = (&left.kind, &right.kind) {
            match fold_binary(op, l, r) {
                Ok(folded) => {
                    let folded = match &result {
                        TypeRef::Int { signed, width } => {
                            narrow_to_width(&folded, *signed, width.bits())
                        }
                        _ => folded,
                    };
                    return (ExprKind::Int(folded), result);
                }
                Err(FoldError::DivisionByZero) => {
                    self.err(SemanticError::DivisionByZero { span });
                }
                Err(FoldError::ShiftOutOfRange) => {
                    self.err(SemanticError::BadOperand {
                        op: op.symbol().into(),
                        operand: "shift amount".into(),
                        span,
                    });
                }
            }
        }

        (ExprKind::Binary { op, left, right }, result)
    }

    fn analyze_compare(
        &mut self,
        op: CompareOp,
        mut left: Box<Expr>,
        mut right: Box<Expr>,
        span: Span,
    ) -> (ExprKind, TypeRef) {
        if matches!(left.ty, TypeRef::Infer) || matches!(right.ty, TypeRef::Infer) {
            return (ExprKind::Compare { op, left, right }, TypeRef::Bool);
        }

        match (&left.ty, &right.ty) {
            (TypeRef::Bool, TypeRef::Bool) if matches!(op, CompareOp::Eq | CompareOp::Ne) => {
                if let (ExprKind::Bool(l), ExprKind::Bool(r)) = (&left.kind, &right.kind) {
                    let value = if op == CompareOp::Eq { l == r } else { l != r };
                    return (ExprKind::Bool(value), TypeRef::Bool);
                }
            }
            (TypeRef::Str(le), TypeRef::Str(re))
                if le == re && matches!(op, CompareOp::Eq | CompareOp::Ne) => {}
            _ => {
                let Some(common) = self.binary_result_type(&left.ty, &right.ty) else {
                    let operand = format!(
                        "{}, {}",
                        left.ty.display(&self.session.arena),
                        right.ty.display(&self.session.arena)
                    );
                    self.err(SemanticError::BadOperand {
                        op: op.symbol().into(),
                        operand,
                        span,
                    });
                    return (ExprKind::Compare { op, left, right }, TypeRef::Bool);
                };
                if !matches!(common, TypeRef::ComptimeInt) {
                    self.coerce_in_place(&mut left, &common);
                    self.coerce_in_place(&mut right, &common);
                }
                if let (ExprKind::Int(l), ExprKind::Int(r)) = (&left.kind, &right.kind) {
                    return (ExprKind::Bool(fold_compare(op, l, r)), TypeRef::Bool);
                }
            }
        }

        (ExprKind::Compare { op, left, right }, TypeRef::Bool)
    }

    fn analyze_logical(
        &mut self,
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    ) -> (ExprKind, TypeRef) {
        for side in [&left, &right] {
            if !matches!(side.ty, TypeRef::Bool | TypeRef::Infer) {
                let operand = side.ty.display(&self.session.arena);
                self.err(SemanticError::BadOperand {
                    op: if op == LogicalOp::And { "&&" } else { "||" }.into(),
                    operand,
                    span,
                });
            }
        }
        if let (ExprKind::Bool(l), ExprKind::Bool(r)) = (&left.kind, &right.kind) {
            let value = match op {
                LogicalOp::And => *l && *r,
                LogicalOp::Or => *l || *r,
            };
            return (ExprKind::Bool(value), TypeRef::Bool);
        }
        (ExprKind::Logical { op, left, right }, TypeRef::Bool)
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    fn resolve_ident(&mut self, name: &str, span: Span) -> Option<SolvedRef> {
        let ctx = ResolveCtx {
            owner: self.owner,
            scopes: &self.scopes,
        };
        match resolve::resolve_name(self.session, &ctx, name, span) {
            Ok(found) => Some(self.classify(found)),
            Err(err) => {
                self.session.error_for(self.owner, err);
                None
            }
        }
    }

    fn classify(&self, id: SymbolId) -> SolvedRef {
        match &self.session.symbol(id).kind {
            SymbolKind::Local(_) => SolvedRef::Local(id),
            SymbolKind::Parameter(_) => SolvedRef::Parameter(id),
            SymbolKind::Field(_) => SolvedRef::Field(id),
            SymbolKind::Function(_) => SolvedRef::Function(id),
            SymbolKind::FunctionGroup { .. } => SolvedRef::Group(id),
            SymbolKind::Struct(_) => SolvedRef::Struct(id),
            SymbolKind::Typedef(_) => SolvedRef::Typedef(id),
            SymbolKind::TypedefItem(_) => SolvedRef::TypedefItem(id),
            SymbolKind::Module => SolvedRef::Module(id),
            _ => SolvedRef::Namespace(id),
        }
    }

    fn ref_type(&self, solved: SolvedRef) -> TypeRef {
        match solved {
            SolvedRef::Local(id) => self.local_type(id),
            SolvedRef::Parameter(id) => match &self.session.symbol(id).kind {
                SymbolKind::Parameter(data) => data.ty.clone(),
                _ => TypeRef::Infer,
            },
            SolvedRef::Field(id) => self.field_type(id),
            SolvedRef::Function(id) => TypeRef::Function {
                ret: Box::new(self.function_return(id)),
                params: param_types(self.session, id),
            },
            SolvedRef::Group(id) => match &self.session.symbol(id).kind {
                SymbolKind::FunctionGroup { overloads } if !overloads.is_empty() => {
                    TypeRef::Function {
                        ret: Box::new(self.function_return(overloads[0])),
                        params: param_types(self.session, overloads[0]),
                    }
                }
                _ => TypeRef::Infer,
            },
            SolvedRef::Struct(id) => TypeRef::Type(Box::new(TypeRef::Struct(id))),
            SolvedRef::Typedef(id) => TypeRef::Type(Box::new(TypeRef::Typedef(id))),
            SolvedRef::TypedefItem(id) => match self.session.symbol(id).parent {
                Some(parent) => TypeRef::Typedef(parent),
                None => TypeRef::Infer,
            },
            SolvedRef::Namespace(_) | SolvedRef::Module(_) => TypeRef::Void,
        }
    }

    fn local_type(&self, id: SymbolId) -> TypeRef {
        match &self.session.symbol(id).kind {
            SymbolKind::Local(data) => data.ty.clone(),
            _ => TypeRef::Infer,
        }
    }

    fn set_local_type(&mut self, id: SymbolId, ty: TypeRef) {
        if let SymbolKind::Local(data) = &mut self.session.symbol_mut(id).kind {
            data.ty = ty;
        }
    }

    fn field_type(&self, id: SymbolId) -> TypeRef {
        match &self.session.symbol(id).kind {
            SymbolKind::Field(data) => data.ty.clone(),
            _ => TypeRef::Infer,
        }
    }

    fn function_return(&self, id: SymbolId) -> TypeRef {
        match &self.session.symbol(id).kind {
            SymbolKind::Function(data) => data.return_type.clone(),
            _ => TypeRef::Infer,
        }
    }

    /// The struct a value of this type exposes members of.
    fn instance_struct(&self, ty: &TypeRef) -> Option<SymbolId> {
        match ty {
            TypeRef::Struct(id) => Some(*id),
            TypeRef::Reference(inner) => match inner.as_ref() {
                TypeRef::Struct(id) => Some(*id),
                _ => None,
            },
            _ => None,
        }
    }

    /// Search a struct and its base chain for a field member.
    fn find_field(&self, struct_id: SymbolId, name: &str) -> Option<SymbolId> {
        let mut cursor = Some(struct_id);
        while let Some(current) = cursor {
            if let Some(child) = self.session.arena.child_named(current, name)
                && matches!(self.session.symbol(child).kind, SymbolKind::Field(_))
            {
                return Some(child);
            }
            cursor = resolve::base_of(self.session, current);
        }
        None
    }

    /// Search a struct and its base chain for a method group.
    fn find_method_group(&self, struct_id: SymbolId, name: &str) -> Option<SymbolId> {
        let mut cursor = Some(struct_id);
        while let Some(current) = cursor {
            if let Some(child) = self.session.arena.child_named(current, name)
                && matches!(
                    self.session.symbol(child).kind,
                    SymbolKind::FunctionGroup { .. }
                )
            {
                return Some(child);
            }
            cursor = resolve::base_of(self.session, current);
        }
        None
    }

    /// The struct lexically containing the analysis owner, if any.
    fn enclosing_struct(&self) -> Option<SymbolId> {
        let mut cursor = self.session.symbol(self.owner).parent;
        while let Some(current) = cursor {
            if matches!(self.session.symbol(current).kind, SymbolKind::Struct(_)) {
                return Some(current);
            }
            cursor = self.session.symbol(current).parent;
        }
        None
    }

    /// Dispatch slot of a function in a struct's virtual table.
    fn vslot_for(&self, struct_id: SymbolId, function: SymbolId) -> Option<u16> {
        let SymbolKind::Struct(data) = &self.session.symbol(struct_id).kind else {
            return None;
        };
        data.vtable
            .iter()
            .position(|slot| slot.declared == function || slot.overridden == Some(function))
            .map(|i| i as u16)
    }

    /// Coerce call arguments against the winner's declared parameters.
    fn coerce_args(&mut self, args: &mut [Expr], function: SymbolId) {
        let params = param_types(self.session, function);
        for (arg, param) in args.iter_mut().zip(params) {
            self.coerce_in_place(arg, &param);
        }
    }

    fn coerce_in_place(&mut self, expr: &mut Expr, target: &TypeRef) {
        if matches!(expr.ty, TypeRef::Infer) {
            // A child that already failed analysis; avoid cascades.
            return;
        }
        let span = expr.span;
        let owned = mem::replace(expr, placeholder(span));
        match coerce(self.session, owned, target) {
            Ok(coerced) => *expr = coerced,
            Err(err) => {
                self.err(err);
                *expr = Expr::typed(ExprKind::Null, target.clone(), span);
            }
        }
    }
}

fn is_assignable(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Solved(SolvedRef::Local(_))
            | ExprKind::Solved(SolvedRef::Parameter(_))
            | ExprKind::Solved(SolvedRef::Field(_))
            | ExprKind::FieldAccess { .. }
            | ExprKind::Index { .. }
    )
}

/// Constructor members of a struct, in declaration order.
fn constructors_of(session: &CompileSession, struct_id: SymbolId) -> Vec<SymbolId> {
    session
        .symbol(struct_id)
        .children
        .iter()
        .copied()
        .flat_map(|child| match &session.symbol(child).kind {
            SymbolKind::FunctionGroup { overloads } => overloads.clone(),
            _ => Vec::new(),
        })
        .filter(|&f| match &session.symbol(f).kind {
            SymbolKind::Function(data) => data.kind == vesper_ast::FunctionKind::Constructor,
            _ => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect, headers, lower};
    use vesper_ast::{
        BlockNode, ExprNode, FieldDecl, FunctionDecl, FunctionKind, Item, ParamDecl, SourceUnit,
        StmtNode, StructDecl, TypeExpr,
    };
    use vesper_core::SymbolPath;

    fn pipeline(items: Vec<Item>) -> CompileSession {
        let mut session = CompileSession::new();
        collect::run(&mut session, &[SourceUnit::new("app", "app.vsp", items)]);
        headers::run(&mut session);
        type_resolver::run(&mut session);
        lower::run(&mut session);
        run(&mut session, true);
        session
    }

    fn function(name: &str, params: Vec<(&str, &str)>, ret: Option<&str>, body: Vec<StmtNode>) -> Item {
        Item::Function(FunctionDecl {
            name: name.into(),
            kind: FunctionKind::Plain,
            params: params
                .into_iter()
                .map(|(n, t)| ParamDecl {
                    name: n.into(),
                    ty: TypeExpr::named(t),
                    span: Span::default(),
                })
                .collect(),
            return_type: ret.map(TypeExpr::named),
            body: Some(BlockNode::new(body)),
            span: Span::default(),
        })
    }

    fn local(name: &str, init: Option<ExprNode>) -> StmtNode {
        StmtNode::Local {
            name: name.into(),
            ty: None,
            init,
            span: Span::default(),
        }
    }

    fn binary(op: BinaryOp, l: ExprNode, r: ExprNode) -> ExprNode {
        ExprNode::Binary {
            op,
            left: Box::new(l),
            right: Box::new(r),
            span: Span::default(),
        }
    }

    fn overload_at(session: &CompileSession, path: &str, index: usize) -> SymbolId {
        let group = session.lookup(&SymbolPath::parse(path)).unwrap();
        match &session.symbol(group).kind {
            SymbolKind::FunctionGroup { overloads } => overloads[index],
            other => panic!("expected group, got {}", other.name()),
        }
    }

    fn body_of(session: &CompileSession, path: &str) -> Block {
        let f = overload_at(session, path, 0);
        match &session.symbol(f).kind {
            SymbolKind::Function(data) => data.body.clone().unwrap(),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn literal_addition_folds_to_single_literal() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            None,
            vec![local(
                "x",
                Some(binary(BinaryOp::Add, ExprNode::int(2), ExprNode::int(3))),
            )],
        )]);
        assert!(!session.sink.has_errors());
        let body = body_of(&session, "app.f");
        match &body.stmts[0] {
            Stmt::Assign { value, .. } => match &value.kind {
                ExprKind::Int(v) => assert_eq!(*v, BigInt::from(5)),
                other => panic!("expected folded literal, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn untyped_local_takes_default_int_from_comptime_literal() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            None,
            vec![local("x", Some(ExprNode::int(5)))],
        )]);
        assert!(!session.sink.has_errors());
        let body = body_of(&session, "app.f");
        let local = body.scope[0];
        match &session.symbol(local).kind {
            SymbolKind::Local(data) => assert_eq!(data.ty, TypeRef::default_int()),
            _ => panic!("expected local"),
        }
    }

    #[test]
    fn comptime_call_resolves_to_first_declared_width() {
        let session = pipeline(vec![
            function("f", vec![("a", "i32")], None, vec![]),
            function("f", vec![("a", "i64")], None, vec![]),
            function(
                "main",
                vec![],
                None,
                vec![StmtNode::Expr(ExprNode::Invoke {
                    callee: Box::new(ExprNode::ident("f")),
                    args: vec![ExprNode::int(5)],
                    span: Span::default(),
                })],
            ),
        ]);
        assert!(!session.sink.has_errors());
        let narrow = overload_at(&session, "app.f", 0);
        let body = body_of(&session, "app.main");
        match &body.stmts[0] {
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::Call { function, args, .. } => {
                    assert_eq!(*function, narrow);
                    // The literal was retyped, not wrapped.
                    assert!(matches!(args[0].kind, ExprKind::Int(_)));
                    assert_eq!(args[0].ty, TypeRef::int(true, 32));
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn construction_rewrites_into_single_constructor_invocation() {
        let point = Item::Struct(StructDecl {
            name: "Point".into(),
            extends: None,
            items: vec![
                Item::Field(FieldDecl {
                    name: "x".into(),
                    ty: Some(TypeExpr::named("i32")),
                    init: None,
                    span: Span::default(),
                }),
                Item::Field(FieldDecl {
                    name: "y".into(),
                    ty: Some(TypeExpr::named("i32")),
                    init: None,
                    span: Span::default(),
                }),
                Item::Function(FunctionDecl {
                    name: "init".into(),
                    kind: FunctionKind::Constructor,
                    params: vec![
                        ParamDecl {
                            name: "x".into(),
                            ty: TypeExpr::named("i32"),
                            span: Span::default(),
                        },
                        ParamDecl {
                            name: "y".into(),
                            ty: TypeExpr::named("i32"),
                            span: Span::default(),
                        },
                    ],
                    return_type: None,
                    body: Some(BlockNode::new(vec![])),
                    span: Span::default(),
                }),
            ],
            span: Span::default(),
        });
        let session = pipeline(vec![
            point,
            function(
                "main",
                vec![],
                None,
                vec![
                    local("p", None),
                    StmtNode::Assign {
                        target: ExprNode::ident("p"),
                        value: ExprNode::New {
                            ty: TypeExpr::named("Point"),
                            args: vec![ExprNode::int(1), ExprNode::int(2)],
                            span: Span::default(),
                        },
                        span: Span::default(),
                    },
                ],
            ),
        ]);
        assert!(!session.sink.has_errors(), "{}", session.sink);
        let body = body_of(&session, "app.main");
        // One local declaration, then exactly one construction statement -
        // no separate allocate-then-assign pair.
        assert_eq!(body.stmts.len(), 1);
        match &body.stmts[0] {
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::ConstructInto { target, args, .. } => {
                    assert!(matches!(
                        target.kind,
                        ExprKind::Solved(SolvedRef::Local(_))
                    ));
                    assert_eq!(args.len(), 2);
                }
                other => panic!("expected construction, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
        // The local's type was established by the construction.
        let local = body.scope[0];
        match &session.symbol(local).kind {
            SymbolKind::Local(data) => assert!(matches!(data.ty, TypeRef::Struct(_))),
            _ => panic!("expected local"),
        }
    }

    #[test]
    fn division_by_literal_zero_is_reported() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            None,
            vec![local(
                "x",
                Some(binary(BinaryOp::Div, ExprNode::int(1), ExprNode::int(0))),
            )],
        )]);
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert!(errors.iter().any(|e| e.contains("division by zero")));
    }

    #[test]
    fn string_concatenation_folds() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            None,
            vec![local(
                "s",
                Some(binary(
                    BinaryOp::Add,
                    ExprNode::string("ab"),
                    ExprNode::string("cd"),
                )),
            )],
        )]);
        assert!(!session.sink.has_errors());
        let body = body_of(&session, "app.f");
        match &body.stmts[0] {
            Stmt::Assign { value, .. } => match &value.kind {
                ExprKind::Str(s) => assert_eq!(s, "abcd"),
                other => panic!("expected folded string, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn unknown_reference_reported_with_position() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            None,
            vec![StmtNode::Expr(ExprNode::Ident {
                name: "ghost".into(),
                span: Span::new(3, 9, 5),
            })],
        )]);
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert!(errors.iter().any(|e| e.contains("cannot find reference 'ghost'")));
        assert!(errors.iter().any(|e| e.contains("3:9")));
    }

    #[test]
    fn return_value_coerced_to_declared_type() {
        let session = pipeline(vec![function(
            "f",
            vec![],
            Some("i64"),
            vec![StmtNode::Return {
                value: Some(ExprNode::int(1)),
                span: Span::default(),
            }],
        )]);
        assert!(!session.sink.has_errors());
        let body = body_of(&session, "app.f");
        match &body.stmts[0] {
            Stmt::Return { value, .. } => {
                assert_eq!(value.as_ref().unwrap().ty, TypeRef::int(true, 64));
            }
            other => panic!("expected return, got {other:?}"),
        }
    }

    #[test]
    fn widening_argument_gets_conversion_node() {
        let session = pipeline(vec![
            function("wide", vec![("a", "i64")], None, vec![]),
            function(
                "main",
                vec![("v", "i32")],
                None,
                vec![StmtNode::Expr(ExprNode::Invoke {
                    callee: Box::new(ExprNode::ident("wide")),
                    args: vec![ExprNode::ident("v")],
                    span: Span::default(),
                })],
            ),
        ]);
        assert!(!session.sink.has_errors());
        let body = body_of(&session, "app.main");
        match &body.stmts[0] {
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::Call { args, .. } => {
                    assert!(matches!(args[0].kind, ExprKind::Conv { .. }));
                    assert_eq!(args[0].ty, TypeRef::int(true, 64));
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }
}
