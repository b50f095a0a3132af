//! Reference resolution.
//!
//! Given an identifier and a resolution context (containing callable plus
//! active lexical scope), the search proceeds in a fixed order and the
//! first match wins:
//!
//! 1. locals of the active block scopes, innermost first
//! 2. the callable's declared parameters
//! 3. ancestors up the owning-symbol chain until a namespace boundary,
//!    matching among each ancestor's children
//! 4. the same ancestor walk repeated over the owning struct's base chain
//! 5. direct children of the enclosing namespace
//! 6. names bound by that namespace's import table
//! 7. single-segment top-level entries of the global table
//! 8. the fully-qualified `namespace.name` path in the global table
//!
//! Exhausting every step is the fatal "cannot find reference" error.

use vesper_ast::ImportNames;
use vesper_core::{ResolveError, Span, SymbolPath};

use crate::session::CompileSession;
use crate::symbol::{SymbolId, SymbolKind};
use crate::types::TypeRef;

/// Where a reference occurs.
#[derive(Debug, Clone, Copy)]
pub struct ResolveCtx<'a> {
    /// The symbol lexically containing the reference: the callable for
    /// body references, the declaring symbol for type positions.
    pub owner: SymbolId,
    /// Active block scopes of the current callable, innermost last.
    /// Empty outside function bodies.
    pub scopes: &'a [Vec<SymbolId>],
}

impl<'a> ResolveCtx<'a> {
    /// A context with no active block scopes.
    pub fn of(owner: SymbolId) -> Self {
        Self {
            owner,
            scopes: &[],
        }
    }
}

/// Resolve a single identifier.
pub fn resolve_name(
    session: &CompileSession,
    ctx: &ResolveCtx<'_>,
    name: &str,
    span: Span,
) -> Result<SymbolId, ResolveError> {
    // 1: block-scope locals, innermost first.
    for scope in ctx.scopes.iter().rev() {
        for &local in scope {
            if session.symbol(local).name == name {
                return Ok(follow_alias(session, local));
            }
        }
    }

    // 2: the callable's parameters.
    if let SymbolKind::Function(data) = &session.symbol(ctx.owner).kind {
        for &param in &data.params {
            if session.symbol(param).name == name {
                return Ok(follow_alias(session, param));
            }
        }
    }

    // 3: ancestors up to the namespace boundary.
    let mut cursor = Some(ctx.owner);
    let mut owning_struct = None;
    while let Some(current) = cursor {
        let symbol = session.symbol(current);
        if matches!(symbol.kind, SymbolKind::Module | SymbolKind::Namespace) {
            break;
        }
        if owning_struct.is_none() && matches!(symbol.kind, SymbolKind::Struct(_)) {
            owning_struct = Some(current);
        }
        if let Some(found) = session.arena.child_named(current, name) {
            return Ok(follow_alias(session, found));
        }
        cursor = symbol.parent;
    }

    // 4: the same walk over the owning struct's resolved base chain.
    let mut base = owning_struct.and_then(|s| base_of(session, s));
    while let Some(current) = base {
        if let Some(found) = session.arena.child_named(current, name) {
            return Ok(follow_alias(session, found));
        }
        base = base_of(session, current);
    }

    // 5: direct children of the enclosing namespace.
    let namespace = enclosing_namespace(session, ctx.owner);
    if let Some(ns) = namespace
        && let Some(found) = session.arena.child_named(ns, name)
    {
        return Ok(follow_alias(session, found));
    }

    // 6: names bound by the namespace's import table.
    if let Some(ns) = namespace {
        for import in &session.symbol(ns).imports {
            let bound = match &import.names {
                ImportNames::All => true,
                ImportNames::Names(names) => names.iter().any(|n| n == name),
            };
            if !bound {
                continue;
            }
            let mut segments = import.from.clone();
            segments.push(name.to_string());
            if let Some(found) = session.table.get_segments(&segments) {
                return Ok(follow_alias(session, found));
            }
        }
    }

    // 7: single-segment top-level entries.
    if let Some(found) = session.lookup(&SymbolPath::single(name)) {
        return Ok(follow_alias(session, found));
    }

    // 8: the namespace-qualified path.
    if let Some(ns) = namespace {
        let qualified = session.symbol(ns).path.child(name);
        if let Some(found) = session.lookup(&qualified) {
            return Ok(follow_alias(session, found));
        }
    }

    Err(ResolveError::CannotFindReference {
        name: name.to_string(),
        span,
    })
}

/// Resolve a dotted path: the head by the full search order, each
/// following segment among the previous symbol's children.
pub fn resolve_segments(
    session: &CompileSession,
    ctx: &ResolveCtx<'_>,
    segments: &[String],
    span: Span,
) -> Result<SymbolId, ResolveError> {
    let mut current = resolve_name(session, ctx, &segments[0], span)?;
    for segment in &segments[1..] {
        match session.arena.child_named(current, segment) {
            Some(next) => current = follow_alias(session, next),
            None => {
                return Err(ResolveError::CannotFindReference {
                    name: segments.join("."),
                    span,
                });
            }
        }
    }
    Ok(current)
}

/// The nearest enclosing namespace or module, including `from` itself.
pub fn enclosing_namespace(session: &CompileSession, from: SymbolId) -> Option<SymbolId> {
    let mut cursor = Some(from);
    while let Some(current) = cursor {
        let symbol = session.symbol(current);
        if matches!(symbol.kind, SymbolKind::Module | SymbolKind::Namespace) {
            return Some(current);
        }
        cursor = symbol.parent;
    }
    None
}

/// The resolved base struct of a struct symbol, if any.
pub fn base_of(session: &CompileSession, id: SymbolId) -> Option<SymbolId> {
    match &session.symbol(id).kind {
        SymbolKind::Struct(data) => match &data.extends {
            Some(TypeRef::Struct(base)) => Some(*base),
            _ => None,
        },
        _ => None,
    }
}

/// Follow alias symbols to their targets. Unresolvable aliases stay as
/// themselves and surface later as unusable references.
fn follow_alias(session: &CompileSession, id: SymbolId) -> SymbolId {
    let mut current = id;
    // Alias chains are finite in practice; the hop bound guards against a
    // self-referential alias.
    for _ in 0..16 {
        match &session.symbol(current).kind {
            SymbolKind::Alias { target } => match session.lookup(target) {
                Some(next) => current = next,
                None => return current,
            },
            _ => return current,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{
        FieldData, FunctionData, LocalData, StructData, Symbol, SymbolKind,
    };
    use vesper_ast::{FunctionKind, ImportNode};
    use vesper_core::Span;

    struct Fixture {
        session: CompileSession,
        method: SymbolId,
        local: SymbolId,
        base_field: SymbolId,
        ns_func: SymbolId,
        top: SymbolId,
    }

    /// app (module)
    ///   geometry (namespace)
    ///     Base (struct) { field origin }
    ///     Shape extends Base { field area, fn measure(scale) { local tmp } }
    ///     helper (function group placeholder as namespace child)
    /// util (module, top-level)
    fn fixture() -> Fixture {
        let mut session = CompileSession::new();
        let app = session.declare(Symbol::new(
            "app",
            SymbolPath::single("app"),
            None,
            Span::default(),
            SymbolKind::Module,
        ));
        let geo = session.declare(Symbol::new(
            "geometry",
            SymbolPath::parse("app.geometry"),
            Some(app),
            Span::default(),
            SymbolKind::Namespace,
        ));
        let base = session.declare(Symbol::new(
            "Base",
            SymbolPath::parse("app.geometry.Base"),
            Some(geo),
            Span::default(),
            SymbolKind::Struct(StructData::default()),
        ));
        let base_field = session.declare(Symbol::new(
            "origin",
            SymbolPath::parse("app.geometry.Base.origin"),
            Some(base),
            Span::default(),
            SymbolKind::Field(FieldData {
                ty: TypeRef::int(true, 32),
                ast_init: None,
                init: None,
                index: 0,
            }),
        ));
        let shape = session.declare(Symbol::new(
            "Shape",
            SymbolPath::parse("app.geometry.Shape"),
            Some(geo),
            Span::default(),
            SymbolKind::Struct(StructData {
                extends: Some(TypeRef::Struct(base)),
                ..StructData::default()
            }),
        ));
        session.declare(Symbol::new(
            "area",
            SymbolPath::parse("app.geometry.Shape.area"),
            Some(shape),
            Span::default(),
            SymbolKind::Field(FieldData {
                ty: TypeRef::int(true, 32),
                ast_init: None,
                init: None,
                index: 0,
            }),
        ));
        let method = session.declare(Symbol::new(
            "measure",
            SymbolPath::parse("app.geometry.Shape.measure"),
            Some(shape),
            Span::default(),
            SymbolKind::Function(FunctionData {
                kind: FunctionKind::Plain,
                params: Vec::new(),
                locals: Vec::new(),
                return_type: TypeRef::Void,
                ast_body: None,
                body: None,
                group: None,
            }),
        ));
        let param = session.declare(Symbol::new(
            "scale",
            SymbolPath::parse("app.geometry.Shape.measure.scale"),
            Some(method),
            Span::default(),
            SymbolKind::Parameter(crate::symbol::ParamData {
                ty: TypeRef::int(true, 32),
                slot: 0,
            }),
        ));
        if let SymbolKind::Function(data) = &mut session.symbol_mut(method).kind {
            data.params.push(param);
        }
        let local = session.declare(Symbol::new(
            "tmp",
            SymbolPath::parse("app.geometry.Shape.measure.tmp"),
            Some(method),
            Span::default(),
            SymbolKind::Local(LocalData {
                ty: TypeRef::Infer,
                slot: 0,
            }),
        ));
        let ns_func = session.declare(Symbol::new(
            "helper",
            SymbolPath::parse("app.geometry.helper"),
            Some(geo),
            Span::default(),
            SymbolKind::FunctionGroup {
                overloads: Vec::new(),
            },
        ));
        let top = session.declare(Symbol::new(
            "util",
            SymbolPath::single("util"),
            None,
            Span::default(),
            SymbolKind::Module,
        ));
        Fixture {
            session,
            method,
            local,
            base_field,
            ns_func,
            top,
        }
    }

    #[test]
    fn locals_shadow_everything_else() {
        let f = fixture();
        let scopes = vec![vec![f.local]];
        let ctx = ResolveCtx {
            owner: f.method,
            scopes: &scopes,
        };
        let found = resolve_name(&f.session, &ctx, "tmp", Span::default()).unwrap();
        assert_eq!(found, f.local);
    }

    #[test]
    fn parameters_found_after_locals() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "scale", Span::default()).unwrap();
        assert!(matches!(
            f.session.symbol(found).kind,
            SymbolKind::Parameter(_)
        ));
    }

    #[test]
    fn owning_struct_members_visible_in_method() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "area", Span::default()).unwrap();
        assert_eq!(f.session.symbol(found).name, "area");
    }

    #[test]
    fn base_struct_members_visible_in_method() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "origin", Span::default()).unwrap();
        assert_eq!(found, f.base_field);
    }

    #[test]
    fn enclosing_namespace_children_found() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "helper", Span::default()).unwrap();
        assert_eq!(found, f.ns_func);
    }

    #[test]
    fn import_table_binds_names() {
        let mut f = fixture();
        let lib = f.session.declare(Symbol::new(
            "clamp",
            SymbolPath::parse("util.clamp"),
            Some(f.top),
            Span::default(),
            SymbolKind::FunctionGroup {
                overloads: Vec::new(),
            },
        ));
        let geo = f
            .session
            .lookup(&SymbolPath::parse("app.geometry"))
            .unwrap();
        f.session.symbol_mut(geo).imports.push(ImportNode {
            from: vec!["util".into()],
            names: ImportNames::Names(vec!["clamp".into()]),
            span: Span::default(),
        });
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "clamp", Span::default()).unwrap();
        assert_eq!(found, lib);
    }

    #[test]
    fn top_level_entries_are_last_resort_before_qualified() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_name(&f.session, &ctx, "util", Span::default()).unwrap();
        assert_eq!(found, f.top);
    }

    #[test]
    fn exhausted_search_is_an_error() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let err = resolve_name(&f.session, &ctx, "nonesuch", Span::new(7, 3, 8));
        match err {
            Err(ResolveError::CannotFindReference { name, span }) => {
                assert_eq!(name, "nonesuch");
                assert_eq!(span, Span::new(7, 3, 8));
            }
            other => panic!("expected missing-reference error, got {other:?}"),
        }
    }

    #[test]
    fn dotted_path_walks_children() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let found = resolve_segments(
            &f.session,
            &ctx,
            &[
                "app".into(),
                "geometry".into(),
                "Base".into(),
                "origin".into(),
            ],
            Span::default(),
        )
        .unwrap();
        assert_eq!(found, f.base_field);
    }

    #[test]
    fn dotted_path_dead_end_is_an_error() {
        let f = fixture();
        let ctx = ResolveCtx::of(f.method);
        let err = resolve_segments(
            &f.session,
            &ctx,
            &["app".into(), "nonesuch".into()],
            Span::default(),
        );
        assert!(matches!(
            err,
            Err(ResolveError::CannotFindReference { .. })
        ));
    }
}
