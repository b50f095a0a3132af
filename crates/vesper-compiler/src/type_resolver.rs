//! Type resolution.
//!
//! Two phases. Shallow resolution maps primitive names and structural
//! modifiers straight to solved descriptors; everything else stays
//! `Unsolved`. The lazy phase re-attempts shallow resolution and then
//! falls back to full reference resolution restricted to type-position
//! symbols. After headers are solved, a topological pass over the
//! `extends` edges builds each struct's virtual table - parents strictly
//! before children - and binds `override` members to inherited slots.

use log::debug;
use rustc_hash::FxHashMap;
use vesper_ast::TypeExpr;
use vesper_core::ResolveError;

use crate::resolve::{self, ResolveCtx};
use crate::sema::{Suitability, suitability};
use crate::session::CompileSession;
use crate::symbol::{SymbolId, SymbolKind, VtableSlot};
use crate::types::{StringEncoding, TypeRef};

/// Resolve every declared header type, then build virtual tables.
pub fn run(session: &mut CompileSession) {
    resolve_headers(session);
    resolve_inheritance(session);
    debug!("type resolution complete over {} symbols", session.arena.len());
}

/// Map a type expression to a descriptor without looking at any symbol.
///
/// Primitive names and the `[]`/`*`/`?` modifiers solve directly; any
/// other form is deferred as `Unsolved`.
pub fn shallow_resolve(expr: &TypeExpr) -> TypeRef {
    match expr {
        TypeExpr::Named { segments, .. } if segments.len() == 1 => {
            match primitive_by_name(&segments[0]) {
                Some(ty) => ty,
                None => TypeRef::Unsolved(Box::new(expr.clone())),
            }
        }
        TypeExpr::Named { .. } => TypeRef::Unsolved(Box::new(expr.clone())),
        TypeExpr::Slice { elem, .. } => TypeRef::Slice(Box::new(shallow_resolve(elem))),
        TypeExpr::Reference { elem, .. } => TypeRef::Reference(Box::new(shallow_resolve(elem))),
        TypeExpr::Nullable { elem, .. } => TypeRef::Nullable(Box::new(shallow_resolve(elem))),
    }
}

fn primitive_by_name(name: &str) -> Option<TypeRef> {
    Some(match name {
        "void" => TypeRef::Void,
        "noreturn" => TypeRef::NoReturn,
        "bool" => TypeRef::Bool,
        "char" => TypeRef::Char,
        "string" => TypeRef::Str(StringEncoding::Utf8),
        "string16" => TypeRef::Str(StringEncoding::Utf16),
        "int" => TypeRef::int(true, 32),
        "uint" => TypeRef::int(false, 32),
        "isize" => TypeRef::Int {
            signed: true,
            width: crate::types::IntWidth::PointerSized,
        },
        "usize" => TypeRef::Int {
            signed: false,
            width: crate::types::IntWidth::PointerSized,
        },
        "anytype" => TypeRef::Anytype,
        "type" => TypeRef::Type(Box::new(TypeRef::Anytype)),
        _ => return sized_int(name),
    })
}

/// `iN` / `uN` with 1 <= N <= 128.
fn sized_int(name: &str) -> Option<TypeRef> {
    let (signed, digits) = match name.as_bytes() {
        [b'i', rest @ ..] if !rest.is_empty() => (true, rest),
        [b'u', rest @ ..] if !rest.is_empty() => (false, rest),
        _ => return None,
    };
    let digits = std::str::from_utf8(digits).ok()?;
    let bits: u16 = digits.parse().ok()?;
    if (1..=128).contains(&bits) {
        Some(TypeRef::int(signed, bits))
    } else {
        None
    }
}

/// Fully resolve a descriptor in the lexical context of `owner`.
///
/// Re-attempts shallow resolution first; on failure falls back to the
/// reference search restricted to type-position symbols. Resolution is
/// monotonic: already-solved parts pass through untouched.
pub fn lazy_resolve(
    session: &CompileSession,
    owner: SymbolId,
    ty: &TypeRef,
) -> Result<TypeRef, ResolveError> {
    match ty {
        TypeRef::Unsolved(expr) => {
            let shallow = shallow_resolve(expr);
            match shallow {
                TypeRef::Unsolved(_) => resolve_named(session, owner, expr),
                other => lazy_resolve(session, owner, &other),
            }
        }
        TypeRef::Slice(elem) => Ok(TypeRef::Slice(Box::new(lazy_resolve(
            session, owner, elem,
        )?))),
        TypeRef::Reference(elem) => Ok(TypeRef::Reference(Box::new(lazy_resolve(
            session, owner, elem,
        )?))),
        TypeRef::Nullable(elem) => Ok(TypeRef::Nullable(Box::new(lazy_resolve(
            session, owner, elem,
        )?))),
        TypeRef::Function { ret, params } => Ok(TypeRef::Function {
            ret: Box::new(lazy_resolve(session, owner, ret)?),
            params: params
                .iter()
                .map(|p| lazy_resolve(session, owner, p))
                .collect::<Result<_, _>>()?,
        }),
        TypeRef::Type(inner) => Ok(TypeRef::Type(Box::new(lazy_resolve(
            session, owner, inner,
        )?))),
        solved => Ok(solved.clone()),
    }
}

/// Resolve a named type expression to a struct or typedef symbol.
fn resolve_named(
    session: &CompileSession,
    owner: SymbolId,
    expr: &TypeExpr,
) -> Result<TypeRef, ResolveError> {
    let TypeExpr::Named { segments, span } = expr else {
        return Err(ResolveError::UnresolvedType {
            name: expr.display_name(),
            span: expr.span(),
        });
    };
    let found = resolve::resolve_segments(session, &ResolveCtx::of(owner), segments, *span)?;
    match &session.symbol(found).kind {
        SymbolKind::Struct(_) => Ok(TypeRef::Struct(found)),
        SymbolKind::Typedef(_) => Ok(TypeRef::Typedef(found)),
        _ => Err(ResolveError::NotAType {
            name: segments.join("."),
            span: *span,
        }),
    }
}

/// Resolve the declared types of every function, field, typedef, and
/// struct base. Failures are recorded and the symbol keeps its unsolved
/// descriptor; later passes skip it.
fn resolve_headers(session: &mut CompileSession) {
    let ids: Vec<_> = session.arena.ids().collect();
    for id in ids {
        match &session.symbol(id).kind {
            SymbolKind::Function(_) => resolve_function_header(session, id),
            SymbolKind::Field(_) => {
                let ty = match &session.symbol(id).kind {
                    SymbolKind::Field(data) => data.ty.clone(),
                    _ => unreachable!(),
                };
                if let Some(solved) = resolve_or_report(session, id, &ty)
                    && let SymbolKind::Field(data) = &mut session.symbol_mut(id).kind
                {
                    data.ty = solved;
                }
            }
            SymbolKind::Typedef(_) => {
                let ty = match &session.symbol(id).kind {
                    SymbolKind::Typedef(data) => data.underlying.clone(),
                    _ => unreachable!(),
                };
                if let Some(solved) = resolve_or_report(session, id, &ty)
                    && let SymbolKind::Typedef(data) = &mut session.symbol_mut(id).kind
                {
                    data.underlying = solved;
                }
            }
            SymbolKind::Struct(_) => {
                let extends = match &session.symbol(id).kind {
                    SymbolKind::Struct(data) => data.extends.clone(),
                    _ => unreachable!(),
                };
                if let Some(ty) = extends
                    && let Some(solved) = resolve_or_report(session, id, &ty)
                    && let SymbolKind::Struct(data) = &mut session.symbol_mut(id).kind
                {
                    data.extends = Some(solved);
                }
            }
            _ => {}
        }
    }
}

fn resolve_function_header(session: &mut CompileSession, id: SymbolId) {
    let (return_type, params) = match &session.symbol(id).kind {
        SymbolKind::Function(data) => (data.return_type.clone(), data.params.clone()),
        _ => return,
    };
    if let Some(solved) = resolve_or_report(session, id, &return_type)
        && let SymbolKind::Function(data) = &mut session.symbol_mut(id).kind
    {
        data.return_type = solved;
    }
    for param in params {
        let ty = match &session.symbol(param).kind {
            SymbolKind::Parameter(data) => data.ty.clone(),
            _ => continue,
        };
        if let Some(solved) = resolve_or_report(session, id, &ty)
            && let SymbolKind::Parameter(data) = &mut session.symbol_mut(param).kind
        {
            data.ty = solved;
        }
    }
}

/// Lazy-resolve in `owner`'s context, reporting any failure against the
/// symbol's source file. `Infer` passes through for the analyzer.
fn resolve_or_report(
    session: &mut CompileSession,
    owner: SymbolId,
    ty: &TypeRef,
) -> Option<TypeRef> {
    if matches!(ty, TypeRef::Infer) {
        return None;
    }
    match lazy_resolve(session, owner, ty) {
        Ok(solved) => Some(solved),
        Err(err) => {
            session.error_for(owner, err);
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Topological pass over the `extends` edges.
///
/// Depth-first with a visiting marker: re-entering a struct already being
/// visited is the cyclic-dependency error, and the edge is severed so the
/// pass terminates. A struct's virtual table is only built once its
/// parent's is complete.
fn resolve_inheritance(session: &mut CompileSession) {
    let structs: Vec<_> = session
        .arena
        .iter()
        .filter(|(_, s)| matches!(s.kind, SymbolKind::Struct(_)))
        .map(|(id, _)| id)
        .collect();
    let mut marks: FxHashMap<SymbolId, Mark> = FxHashMap::default();
    for id in structs {
        visit_struct(session, id, &mut marks);
    }
}

fn visit_struct(session: &mut CompileSession, id: SymbolId, marks: &mut FxHashMap<SymbolId, Mark>) {
    match marks.get(&id) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => return,
        None => {}
    }
    marks.insert(id, Mark::Visiting);

    let base = resolve::base_of(session, id);
    if let Some(base) = base {
        match marks.get(&base) {
            Some(Mark::Visiting) => {
                let name = session.symbol(id).name.clone();
                let span = session.symbol(id).span;
                session.error_for(id, ResolveError::CyclicInheritance { name, span });
                // Sever the edge so the table still gets built and the
                // pass cannot loop.
                if let SymbolKind::Struct(data) = &mut session.symbol_mut(id).kind {
                    data.extends = None;
                }
            }
            Some(Mark::Done) => {}
            None => visit_struct(session, base, marks),
        }
    }

    build_vtable(session, id);
    marks.insert(id, Mark::Done);
}

/// Build the dispatch table: the parent's slots (overrides carried
/// forward) extended with one new slot per own virtual/abstract member,
/// then bind each `override` member to the first matching open inherited
/// slot.
fn build_vtable(session: &mut CompileSession, id: SymbolId) {
    let mut vtable: Vec<VtableSlot> = match resolve::base_of(session, id) {
        Some(base) => match &session.symbol(base).kind {
            SymbolKind::Struct(data) => data.vtable.clone(),
            _ => Vec::new(),
        },
        None => Vec::new(),
    };
    let inherited = vtable.len();

    let members = member_functions(session, id);
    for &member in &members {
        if session.symbol(member).is_virtual_member() {
            vtable.push(VtableSlot {
                declared: member,
                overridden: None,
            });
        }
    }

    for &member in &members {
        if !session
            .symbol(member)
            .modifiers
            .contains(crate::symbol::Modifiers::OVERRIDE)
        {
            continue;
        }
        match find_override_slot(session, &vtable[..inherited], member) {
            Some(slot) => vtable[slot].overridden = Some(member),
            None => {
                let name = session.symbol(member).name.clone();
                let span = session.symbol(member).span;
                session.error_for(member, ResolveError::NoVirtualToOverride { name, span });
            }
        }
    }

    if let SymbolKind::Struct(data) = &mut session.symbol_mut(id).kind {
        data.vtable = vtable;
        data.vtable_built = true;
    }
}

/// Function members of a struct in declaration order, overloads expanded.
fn member_functions(session: &CompileSession, id: SymbolId) -> Vec<SymbolId> {
    session
        .symbol(id)
        .children
        .iter()
        .copied()
        .filter(|&c| matches!(session.symbol(c).kind, SymbolKind::Function(_)))
        .collect()
}

/// First open inherited slot whose declared function matches the override
/// by name, parameter count, and per-position perfect suitability.
fn find_override_slot(
    session: &CompileSession,
    inherited: &[VtableSlot],
    member: SymbolId,
) -> Option<usize> {
    let member_name = session.symbol(member).name.clone();
    let member_params = crate::sema::param_types(session, member);
    for (i, slot) in inherited.iter().enumerate() {
        if slot.overridden.is_some() {
            continue;
        }
        let declared = slot.declared;
        if session.symbol(declared).name != member_name {
            continue;
        }
        let declared_params = crate::sema::param_types(session, declared);
        if declared_params.len() != member_params.len() {
            continue;
        }
        let perfect = declared_params
            .iter()
            .zip(&member_params)
            .all(|(d, m)| suitability(session, d, m, false) == Suitability::Perfect);
        if perfect {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect, headers};
    use vesper_ast::{
        AttributeNode, FunctionDecl, FunctionKind, Item, ParamDecl, SourceUnit, StructDecl,
    };
    use vesper_core::{Span, SymbolPath};

    fn attr(name: &str) -> Item {
        Item::Attribute(AttributeNode::marker(name))
    }

    fn method(name: &str, params: Vec<ParamDecl>) -> Item {
        Item::Function(FunctionDecl {
            name: name.into(),
            kind: FunctionKind::Plain,
            params,
            return_type: None,
            body: None,
            span: Span::default(),
        })
    }

    fn param(name: &str, ty: &str) -> ParamDecl {
        ParamDecl {
            name: name.into(),
            ty: TypeExpr::named(ty),
            span: Span::default(),
        }
    }

    fn strukt(name: &str, extends: Option<&str>, items: Vec<Item>) -> Item {
        Item::Struct(StructDecl {
            name: name.into(),
            extends: extends.map(TypeExpr::named),
            items,
            span: Span::default(),
        })
    }

    fn analyze(items: Vec<Item>) -> CompileSession {
        let mut session = CompileSession::new();
        collect::run(&mut session, &[SourceUnit::new("app", "app.vsp", items)]);
        headers::run(&mut session);
        run(&mut session);
        session
    }

    fn struct_id(session: &CompileSession, path: &str) -> SymbolId {
        session.lookup(&SymbolPath::parse(path)).unwrap()
    }

    fn vtable_of(session: &CompileSession, path: &str) -> Vec<VtableSlot> {
        match &session.symbol(struct_id(session, path)).kind {
            SymbolKind::Struct(data) => data.vtable.clone(),
            _ => panic!("not a struct"),
        }
    }

    #[test]
    fn shallow_resolves_primitives_and_modifiers() {
        assert_eq!(shallow_resolve(&TypeExpr::named("bool")), TypeRef::Bool);
        assert_eq!(
            shallow_resolve(&TypeExpr::named("u16")),
            TypeRef::int(false, 16)
        );
        assert_eq!(
            shallow_resolve(&TypeExpr::named("i128")),
            TypeRef::int(true, 128)
        );
        let slice = TypeExpr::Slice {
            elem: Box::new(TypeExpr::named("u8")),
            span: Span::default(),
        };
        assert_eq!(
            shallow_resolve(&slice),
            TypeRef::Slice(Box::new(TypeRef::int(false, 8)))
        );
    }

    #[test]
    fn shallow_defers_unknown_names() {
        let ty = shallow_resolve(&TypeExpr::named("Entity"));
        assert!(matches!(ty, TypeRef::Unsolved(_)));
        // i0 and i129 are outside the supported width range.
        assert!(matches!(
            shallow_resolve(&TypeExpr::named("i0")),
            TypeRef::Unsolved(_)
        ));
        assert!(matches!(
            shallow_resolve(&TypeExpr::named("u129")),
            TypeRef::Unsolved(_)
        ));
    }

    #[test]
    fn headers_solve_struct_references() {
        let session = analyze(vec![
            strukt("Point", None, vec![]),
            Item::Function(FunctionDecl {
                name: "origin".into(),
                kind: FunctionKind::Plain,
                params: vec![param("p", "Point")],
                return_type: Some(TypeExpr::named("Point")),
                body: None,
                span: Span::default(),
            }),
        ]);
        assert!(!session.sink.has_errors());
        let group = struct_id(&session, "app.origin");
        let SymbolKind::FunctionGroup { overloads } = &session.symbol(group).kind else {
            panic!("expected group");
        };
        let SymbolKind::Function(data) = &session.symbol(overloads[0]).kind else {
            panic!("expected function");
        };
        let point = struct_id(&session, "app.Point");
        assert_eq!(data.return_type, TypeRef::Struct(point));
        assert!(data.return_type.is_solved(&session.arena));
    }

    #[test]
    fn vtable_extends_parent_table() {
        let session = analyze(vec![
            strukt(
                "Base",
                None,
                vec![attr("virtual"), method("update", vec![]), attr("virtual"), method("draw", vec![])],
            ),
            strukt(
                "Child",
                Some("Base"),
                vec![attr("virtual"), method("extra", vec![])],
            ),
        ]);
        assert!(!session.sink.has_errors());
        assert_eq!(vtable_of(&session, "app.Base").len(), 2);
        // parent length + own virtual count
        assert_eq!(vtable_of(&session, "app.Child").len(), 3);
    }

    #[test]
    fn override_binds_first_matching_open_slot() {
        let session = analyze(vec![
            strukt(
                "Base",
                None,
                vec![attr("virtual"), method("update", vec![param("dt", "i32")])],
            ),
            strukt(
                "Child",
                Some("Base"),
                vec![attr("override"), method("update", vec![param("dt", "i32")])],
            ),
        ]);
        assert!(!session.sink.has_errors());
        let vtable = vtable_of(&session, "app.Child");
        assert_eq!(vtable.len(), 1);
        assert!(vtable[0].overridden.is_some());
    }

    #[test]
    fn override_with_wrong_signature_is_fatal() {
        let session = analyze(vec![
            strukt(
                "Base",
                None,
                vec![attr("virtual"), method("update", vec![param("dt", "i32")])],
            ),
            strukt(
                "Child",
                Some("Base"),
                vec![attr("override"), method("update", vec![param("dt", "i64")])],
            ),
        ]);
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert!(errors.iter().any(|e| e.contains("no virtual function to override")));
    }

    #[test]
    fn direct_two_cycle_reports_and_terminates() {
        let session = analyze(vec![
            strukt("A", Some("B"), vec![]),
            strukt("B", Some("A"), vec![]),
        ]);
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert!(errors.iter().any(|e| e.contains("cyclic dependency")));
        // Both structs still end the pass with built tables.
        for name in ["app.A", "app.B"] {
            match &session.symbol(struct_id(&session, name)).kind {
                SymbolKind::Struct(data) => assert!(data.vtable_built),
                _ => panic!("not a struct"),
            }
        }
    }

    #[test]
    fn self_extension_is_a_cycle() {
        let session = analyze(vec![strukt("A", Some("A"), vec![])]);
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert!(errors.iter().any(|e| e.contains("cyclic dependency")));
    }

    #[test]
    fn unknown_base_type_reported() {
        let session = analyze(vec![strukt("A", Some("Ghost"), vec![])]);
        assert!(session.sink.has_errors());
    }
}
