//! Suitability scoring and overload resolution.

use vesper_core::{SemanticError, Span};

use crate::session::CompileSession;
use crate::symbol::{SymbolId, SymbolKind};
use crate::types::TypeRef;

/// How well an argument's type fits a parameter's declared type.
///
/// The ordering is the score: better fits compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Suitability {
    /// Not viable.
    None,
    /// Requires a representation-changing cast.
    NeedsHardCast,
    /// Requires a value-preserving cast.
    NeedsSoftCast,
    /// Fits as declared.
    Perfect,
}

impl Suitability {
    /// Numeric score used by overload ranking.
    pub fn score(self) -> u32 {
        match self {
            Suitability::None => 0,
            Suitability::NeedsHardCast => 1,
            Suitability::NeedsSoftCast => 2,
            Suitability::Perfect => 3,
        }
    }
}

/// Whether `derived` has `base` somewhere in its resolved base chain.
pub fn extends_chain(session: &CompileSession, derived: SymbolId, base: SymbolId) -> bool {
    let mut cursor = crate::resolve::base_of(session, derived);
    while let Some(current) = cursor {
        if current == base {
            return true;
        }
        cursor = crate::resolve::base_of(session, current);
    }
    false
}

/// Score one (declared parameter type, argument type) pair.
pub fn suitability(
    session: &CompileSession,
    param: &TypeRef,
    arg: &TypeRef,
    allow_implicit: bool,
) -> Suitability {
    if param == arg {
        return Suitability::Perfect;
    }
    match (param, arg) {
        // anytype accepts anything, but never as a perfect fit.
        (TypeRef::Anytype, _) => Suitability::NeedsSoftCast,

        // A comptime literal narrows to any runtime integer in place.
        (TypeRef::Int { .. }, TypeRef::ComptimeInt) => Suitability::Perfect,

        (
            TypeRef::Int {
                signed: ps,
                width: pw,
            },
            TypeRef::Int {
                signed: as_,
                width: aw,
            },
        ) => {
            if ps != as_ {
                if allow_implicit {
                    Suitability::NeedsHardCast
                } else {
                    Suitability::None
                }
            } else if pw.bits() > aw.bits() {
                Suitability::NeedsSoftCast
            } else if allow_implicit {
                // Narrowing within the same signedness.
                Suitability::NeedsSoftCast
            } else {
                Suitability::None
            }
        }

        // Struct identity is required for a perfect fit; a derived value
        // still binds to its base at soft-cast strength.
        (TypeRef::Struct(p), TypeRef::Struct(a)) => {
            if extends_chain(session, *a, *p) {
                Suitability::NeedsSoftCast
            } else {
                Suitability::None
            }
        }
        (TypeRef::Reference(p), TypeRef::Reference(a)) => {
            match (p.as_ref(), a.as_ref()) {
                (TypeRef::Struct(pb), TypeRef::Struct(ab)) if extends_chain(session, *ab, *pb) => {
                    Suitability::NeedsSoftCast
                }
                _ => Suitability::None,
            }
        }

        // The null literal fits any nullable parameter exactly; a plain
        // value lifts into its nullable form.
        (TypeRef::Nullable(_), TypeRef::Nullable(inner)) if **inner == TypeRef::Anytype => {
            Suitability::Perfect
        }
        (TypeRef::Nullable(inner), _) => {
            match suitability(session, inner, arg, allow_implicit) {
                Suitability::None => Suitability::None,
                _ => Suitability::NeedsSoftCast,
            }
        }

        _ => Suitability::None,
    }
}

/// Declared parameter types of a function overload.
pub fn param_types(session: &CompileSession, function: SymbolId) -> Vec<TypeRef> {
    match &session.symbol(function).kind {
        SymbolKind::Function(data) => data
            .params
            .iter()
            .map(|&p| match &session.symbol(p).kind {
                SymbolKind::Parameter(pd) => pd.ty.clone(),
                _ => TypeRef::Void,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Pick the best overload of a group for the given argument types.
///
/// Candidates with the wrong arity drop out first; each survivor is scored
/// as `sum(suitability) * 100 / param_count` (a zero-parameter overload
/// scores as all-perfect). Any position scoring `None` disqualifies the
/// candidate. The strictly highest score wins, ties resolving to the
/// first-seen overload, which keeps resolution deterministic and
/// order-stable.
pub fn resolve_overload(
    session: &CompileSession,
    group: SymbolId,
    args: &[TypeRef],
    allow_implicit: bool,
    span: Span,
) -> Result<SymbolId, SemanticError> {
    let overloads = match &session.symbol(group).kind {
        SymbolKind::FunctionGroup { overloads } => overloads.clone(),
        // A single function stands in for a group of one.
        SymbolKind::Function(_) => vec![group],
        _ => Vec::new(),
    };
    let name = session.symbol(group).name.clone();
    resolve_among(session, &name, &overloads, args, allow_implicit, span)
}

/// Pick the best candidate from an explicit overload list.
///
/// Used directly for constructor lookup, where the candidates are the
/// struct's constructor members rather than a named group.
pub fn resolve_among(
    session: &CompileSession,
    name: &str,
    candidates: &[SymbolId],
    args: &[TypeRef],
    allow_implicit: bool,
    span: Span,
) -> Result<SymbolId, SemanticError> {
    let mut best: Option<(SymbolId, u32)> = None;
    for &candidate in candidates {
        let params = param_types(session, candidate);
        if params.len() != args.len() {
            continue;
        }
        let mut sum = 0u32;
        let mut viable = true;
        for (param, arg) in params.iter().zip(args) {
            let fit = suitability(session, param, arg, allow_implicit);
            if fit == Suitability::None {
                viable = false;
                break;
            }
            sum += fit.score();
        }
        if !viable {
            continue;
        }
        let score = if params.is_empty() {
            Suitability::Perfect.score() * 100
        } else {
            sum * 100 / params.len() as u32
        };
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    match best {
        Some((winner, _)) => Ok(winner),
        None => Err(SemanticError::NoOverloadMatches {
            name: name.to_string(),
            args: args
                .iter()
                .map(|t| t.display(&session.arena))
                .collect::<Vec<_>>()
                .join(", "),
            span,
        }),
    }
}
