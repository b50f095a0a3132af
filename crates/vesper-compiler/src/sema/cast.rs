//! Cast insertion.
//!
//! After overload resolution (and at assignments and returns), every
//! value is passed through [`coerce`] against its destination type.
//! Comptime literals retype in place with no conversion node; runtime
//! integer changes wrap in an explicit conversion; identical types pass
//! through untouched, so coercion is idempotent.

use vesper_core::SemanticError;

use crate::ir::{Expr, ExprKind};
use crate::sema::fold::narrow_to_width;
use crate::sema::overload::extends_chain;
use crate::session::CompileSession;
use crate::types::TypeRef;

/// Coerce `expr` to `target`, inserting a conversion node when the
/// representation changes.
pub fn coerce(
    session: &CompileSession,
    expr: Expr,
    target: &TypeRef,
) -> Result<Expr, SemanticError> {
    // Identical types pass through unchanged.
    if expr.ty == *target {
        return Ok(expr);
    }

    // anytype destinations take the value as-is.
    if matches!(target, TypeRef::Anytype) {
        return Ok(expr);
    }

    match (&expr.ty, target) {
        // A comptime literal is retyped in place; the value narrows to the
        // destination width so code generation sees a fitting constant.
        (TypeRef::ComptimeInt, TypeRef::Int { signed, width }) => {
            let mut expr = expr;
            if let ExprKind::Int(value) = &expr.kind {
                let narrowed = narrow_to_width(value, *signed, width.bits());
                expr.kind = ExprKind::Int(narrowed);
            }
            expr.ty = target.clone();
            Ok(expr)
        }

        // Runtime integer to runtime integer of different width or
        // signedness becomes an explicit conversion node.
        (TypeRef::Int { .. }, TypeRef::Int { .. }) => Ok(wrap_conv(expr, target.clone())),

        // Collection literals cast element-wise against the slice's
        // element type.
        (TypeRef::Slice(_), TypeRef::Slice(elem_target)) => {
            let span = expr.span;
            match expr.kind {
                ExprKind::Collection(items) => {
                    let items = items
                        .into_iter()
                        .map(|item| coerce(session, item, elem_target))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Expr::typed(
                        ExprKind::Collection(items),
                        target.clone(),
                        span,
                    ))
                }
                kind => Err(mismatch(
                    session,
                    &Expr::typed(kind, expr.ty, span),
                    target,
                )),
            }
        }

        // The null literal takes on any nullable destination type.
        (TypeRef::Nullable(inner), TypeRef::Nullable(_)) if **inner == TypeRef::Anytype => {
            let mut expr = expr;
            expr.ty = target.clone();
            Ok(expr)
        }

        // Lifting a plain value into its nullable form.
        (source, TypeRef::Nullable(inner)) if *source == **inner => {
            Ok(wrap_conv(expr, target.clone()))
        }

        // A derived struct narrows to any base it extends.
        (TypeRef::Struct(derived), TypeRef::Struct(base))
            if extends_chain(session, *derived, *base) =>
        {
            Ok(wrap_conv(expr, target.clone()))
        }
        (TypeRef::Reference(source), TypeRef::Reference(dest)) => {
            match (source.as_ref(), dest.as_ref()) {
                (TypeRef::Struct(derived), TypeRef::Struct(base))
                    if extends_chain(session, *derived, *base) =>
                {
                    Ok(wrap_conv(expr, target.clone()))
                }
                _ => Err(mismatch(session, &expr, target)),
            }
        }

        _ => Err(mismatch(session, &expr, target)),
    }
}

fn wrap_conv(expr: Expr, to: TypeRef) -> Expr {
    let span = expr.span;
    Expr::typed(
        ExprKind::Conv {
            value: Box::new(expr),
            to: to.clone(),
        },
        to,
        span,
    )
}

fn mismatch(session: &CompileSession, expr: &Expr, target: &TypeRef) -> SemanticError {
    SemanticError::TypeMismatch {
        expected: target.display(&session.arena),
        found: expr.ty.display(&session.arena),
        span: expr.span,
    }
}
