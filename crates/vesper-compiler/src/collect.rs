//! Symbol collection.
//!
//! The first pass: walk every source unit's namespace tree, create a
//! symbol for each declaration, and register it in the global table under
//! its dotted path. Attributes are buffered per lexical scope and attached
//! to the next declaration; overloads are grouped under one function group
//! per path. Structural errors are recorded and the walk continues with
//! the next sibling.

use log::debug;
use vesper_ast::{
    AttributeNode, FieldDecl, FunctionDecl, ImportNames, ImportNode, Item, NamespaceNode,
    SourceUnit, StructDecl, TypedefDecl,
};
use vesper_core::{CollectError, Span, SymbolPath};

use crate::session::CompileSession;
use crate::symbol::{
    FieldData, FunctionData, ParamData, StructData, Symbol, SymbolId, SymbolKind, TypedefData,
    TypedefItemData,
};
use crate::types::TypeRef;

/// Run symbol collection over every unit.
pub fn run(session: &mut CompileSession, units: &[SourceUnit]) {
    for unit in units {
        session.set_file(Some(&unit.file));
        let module = module_symbol(session, &unit.module, unit.root.span);
        collect_namespace(session, module, &unit.root);
    }
    session.set_file(None);
    debug!(
        "collected {} symbols, {} table entries",
        session.arena.len(),
        session.table.len()
    );
}

/// Find or create the module symbol; units of one module share it.
fn module_symbol(session: &mut CompileSession, name: &str, span: Span) -> SymbolId {
    let path = SymbolPath::single(name);
    if let Some(existing) = session.lookup(&path) {
        return existing;
    }
    session.declare(Symbol::new(name, path, None, span, SymbolKind::Module))
}

fn collect_namespace(session: &mut CompileSession, parent: SymbolId, node: &NamespaceNode) {
    // Multi-segment namespace names open one scope per segment; an unnamed
    // root collects straight into the parent.
    let mut owner = parent;
    for segment in &node.name {
        owner = match session.arena.child_named(owner, segment) {
            Some(existing) => existing,
            None => {
                let path = session.symbol(owner).path.child(segment);
                session.declare(Symbol::new(
                    segment,
                    path,
                    Some(owner),
                    node.span,
                    SymbolKind::Namespace,
                ))
            }
        };
    }
    collect_items(session, owner, &node.items);
}

/// Collect a scope's items, buffering attributes until a declaration
/// claims them.
fn collect_items(session: &mut CompileSession, owner: SymbolId, items: &[Item]) {
    let mut pending: Vec<AttributeNode> = Vec::new();
    for item in items {
        match item {
            Item::Attribute(attr) => pending.push(attr.clone()),
            Item::Import(import) => collect_import(session, owner, import),
            Item::Namespace(node) => {
                // Attributes cannot bind across a namespace boundary.
                flush_unbound(session, &mut pending);
                collect_namespace(session, owner, node);
            }
            Item::Function(decl) => {
                collect_function(session, owner, decl, std::mem::take(&mut pending));
            }
            Item::Struct(decl) => {
                collect_struct(session, owner, decl, std::mem::take(&mut pending));
            }
            Item::Field(decl) => {
                collect_field(session, owner, decl, std::mem::take(&mut pending));
            }
            Item::Typedef(decl) => {
                collect_typedef(session, owner, decl, std::mem::take(&mut pending));
            }
        }
    }
    flush_unbound(session, &mut pending);
}

/// Report attributes that reached scope end without a declaration.
fn flush_unbound(session: &mut CompileSession, pending: &mut Vec<AttributeNode>) {
    for attr in pending.drain(..) {
        session.error(CollectError::UnboundAttribute {
            name: attr.name,
            span: attr.span,
        });
    }
}

fn collect_import(session: &mut CompileSession, owner: SymbolId, import: &ImportNode) {
    if import.from.is_empty() {
        session.error(CollectError::MalformedImport {
            detail: "empty source path".into(),
            span: import.span,
        });
        return;
    }
    if let ImportNames::Names(names) = &import.names
        && names.is_empty()
    {
        session.error(CollectError::MalformedImport {
            detail: "no names listed".into(),
            span: import.span,
        });
        return;
    }
    session.symbol_mut(owner).imports.push(import.clone());
}

fn collect_function(
    session: &mut CompileSession,
    owner: SymbolId,
    decl: &FunctionDecl,
    attributes: Vec<AttributeNode>,
) {
    let path = session.symbol(owner).path.child(&decl.name);

    // The group is created lazily on the first overload and reused after.
    let group = match session.lookup(&path) {
        Some(existing) => {
            if matches!(session.symbol(existing).kind, SymbolKind::FunctionGroup { .. }) {
                existing
            } else {
                session.error(CollectError::DuplicatePath {
                    path,
                    span: decl.span,
                });
                return;
            }
        }
        None => session.declare(Symbol::new(
            &decl.name,
            path.clone(),
            Some(owner),
            decl.span,
            SymbolKind::FunctionGroup {
                overloads: Vec::new(),
            },
        )),
    };

    let mut function = Symbol::new(
        &decl.name,
        path.clone(),
        Some(owner),
        decl.span,
        SymbolKind::Function(FunctionData {
            kind: decl.kind,
            params: Vec::new(),
            locals: Vec::new(),
            return_type: match &decl.return_type {
                Some(ty) => TypeRef::Unsolved(Box::new(ty.clone())),
                None => TypeRef::Void,
            },
            ast_body: decl.body.clone(),
            body: None,
            group: Some(group),
        }),
    );
    function.attributes = attributes;
    let function = session.declare(function);

    let mut params = Vec::with_capacity(decl.params.len());
    for (slot, param) in decl.params.iter().enumerate() {
        params.push(session.declare(Symbol::new(
            &param.name,
            path.child(&param.name),
            Some(function),
            param.span,
            SymbolKind::Parameter(ParamData {
                ty: TypeRef::Unsolved(Box::new(param.ty.clone())),
                slot: slot as u32,
            }),
        )));
    }
    if let SymbolKind::Function(data) = &mut session.symbol_mut(function).kind {
        data.params = params;
    }
    if let SymbolKind::FunctionGroup { overloads } = &mut session.symbol_mut(group).kind {
        overloads.push(function);
    }
}

fn collect_struct(
    session: &mut CompileSession,
    owner: SymbolId,
    decl: &StructDecl,
    attributes: Vec<AttributeNode>,
) {
    let path = session.symbol(owner).path.child(&decl.name);
    let mut symbol = Symbol::new(
        &decl.name,
        path,
        Some(owner),
        decl.span,
        SymbolKind::Struct(StructData {
            extends: decl
                .extends
                .as_ref()
                .map(|ty| TypeRef::Unsolved(Box::new(ty.clone()))),
            ..StructData::default()
        }),
    );
    symbol.attributes = attributes;
    let id = session.declare(symbol);
    collect_items(session, id, &decl.items);

    // Record field members in declaration order for layout.
    let fields: Vec<_> = session
        .symbol(id)
        .children
        .iter()
        .copied()
        .filter(|&c| matches!(session.symbol(c).kind, SymbolKind::Field(_)))
        .collect();
    if let SymbolKind::Struct(data) = &mut session.symbol_mut(id).kind {
        data.fields = fields;
    }
}

fn collect_field(
    session: &mut CompileSession,
    owner: SymbolId,
    decl: &FieldDecl,
    attributes: Vec<AttributeNode>,
) {
    let path = session.symbol(owner).path.child(&decl.name);
    let index = session
        .symbol(owner)
        .children
        .iter()
        .filter(|&&c| matches!(session.symbol(c).kind, SymbolKind::Field(_)))
        .count() as u32;
    let mut symbol = Symbol::new(
        &decl.name,
        path,
        Some(owner),
        decl.span,
        SymbolKind::Field(FieldData {
            ty: match &decl.ty {
                Some(ty) => TypeRef::Unsolved(Box::new(ty.clone())),
                None => TypeRef::Infer,
            },
            ast_init: decl.init.clone(),
            init: None,
            index,
        }),
    );
    symbol.attributes = attributes;
    session.declare(symbol);
}

fn collect_typedef(
    session: &mut CompileSession,
    owner: SymbolId,
    decl: &TypedefDecl,
    attributes: Vec<AttributeNode>,
) {
    let path = session.symbol(owner).path.child(&decl.name);
    let mut symbol = Symbol::new(
        &decl.name,
        path.clone(),
        Some(owner),
        decl.span,
        SymbolKind::Typedef(TypedefData {
            underlying: match &decl.underlying {
                Some(ty) => TypeRef::Unsolved(Box::new(ty.clone())),
                None => TypeRef::default_int(),
            },
            items: Vec::new(),
        }),
    );
    symbol.attributes = attributes;
    let id = session.declare(symbol);

    let mut items = Vec::with_capacity(decl.items.len());
    for item in &decl.items {
        items.push(session.declare(Symbol::new(
            &item.name,
            path.child(&item.name),
            Some(id),
            item.span,
            SymbolKind::TypedefItem(TypedefItemData {
                ast_value: item.value.clone(),
                value: None,
            }),
        )));
    }
    if let SymbolKind::Typedef(data) = &mut session.symbol_mut(id).kind {
        data.items = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_ast::{ExprNode, FunctionKind, ParamDecl, TypeExpr, TypedefItemDecl};

    fn unit(items: Vec<Item>) -> SourceUnit {
        SourceUnit::new("app", "app.vsp", items)
    }

    fn plain_fn(name: &str, params: Vec<ParamDecl>) -> Item {
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

    #[test]
    fn paths_append_names_down_the_tree() {
        let mut session = CompileSession::new();
        let ns = NamespaceNode {
            name: vec!["math".into()],
            items: vec![plain_fn("abs", vec![param("v", "i32")])],
            span: Span::default(),
        };
        run(&mut session, &[unit(vec![Item::Namespace(ns)])]);
        let group = session.lookup(&SymbolPath::parse("app.math.abs")).unwrap();
        let symbol = session.symbol(group);
        assert!(matches!(symbol.kind, SymbolKind::FunctionGroup { .. }));
        let parent = session.symbol(symbol.parent.unwrap());
        assert_eq!(symbol.path, parent.path.child(&symbol.name));
    }

    #[test]
    fn overloads_share_one_group() {
        let mut session = CompileSession::new();
        run(
            &mut session,
            &[unit(vec![
                plain_fn("f", vec![param("a", "i32")]),
                plain_fn("f", vec![param("a", "i64")]),
            ])],
        );
        let group = session.lookup(&SymbolPath::parse("app.f")).unwrap();
        match &session.symbol(group).kind {
            SymbolKind::FunctionGroup { overloads } => assert_eq!(overloads.len(), 2),
            other => panic!("expected group, got {}", other.name()),
        }
        assert!(!session.sink.has_errors());
    }

    #[test]
    fn attributes_attach_to_next_declaration() {
        let mut session = CompileSession::new();
        run(
            &mut session,
            &[unit(vec![
                Item::Attribute(AttributeNode::marker("public")),
                plain_fn("f", vec![]),
            ])],
        );
        let group = session.lookup(&SymbolPath::parse("app.f")).unwrap();
        let SymbolKind::FunctionGroup { overloads } = &session.symbol(group).kind else {
            panic!("expected group");
        };
        let function = session.symbol(overloads[0]);
        assert_eq!(function.attributes.len(), 1);
        assert_eq!(function.attributes[0].name, "public");
    }

    #[test]
    fn unbound_attribute_is_reported_but_not_fatal() {
        let mut session = CompileSession::new();
        run(
            &mut session,
            &[unit(vec![
                plain_fn("f", vec![]),
                Item::Attribute(AttributeNode::marker("public")),
            ])],
        );
        assert!(session.lookup(&SymbolPath::parse("app.f")).is_some());
        let errors: Vec<_> = session.sink.iter().map(|(_, e)| e.to_string()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not assigned to any member"));
    }

    #[test]
    fn struct_fields_keep_declaration_order() {
        let mut session = CompileSession::new();
        let decl = StructDecl {
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
            ],
            span: Span::default(),
        };
        run(&mut session, &[unit(vec![Item::Struct(decl)])]);
        let id = session.lookup(&SymbolPath::parse("app.Point")).unwrap();
        let SymbolKind::Struct(data) = &session.symbol(id).kind else {
            panic!("expected struct");
        };
        let names: Vec<_> = data
            .fields
            .iter()
            .map(|&f| session.symbol(f).name.clone())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        let SymbolKind::Field(fd) = &session.symbol(data.fields[1]).kind else {
            panic!("expected field");
        };
        assert_eq!(fd.index, 1);
    }

    #[test]
    fn typedef_items_are_registered_children() {
        let mut session = CompileSession::new();
        let decl = TypedefDecl {
            name: "Color".into(),
            underlying: None,
            items: vec![
                TypedefItemDecl {
                    name: "Red".into(),
                    value: None,
                    span: Span::default(),
                },
                TypedefItemDecl {
                    name: "Green".into(),
                    value: Some(ExprNode::int(5)),
                    span: Span::default(),
                },
            ],
            span: Span::default(),
        };
        run(&mut session, &[unit(vec![Item::Typedef(decl)])]);
        assert!(session.lookup(&SymbolPath::parse("app.Color.Red")).is_some());
        assert!(
            session
                .lookup(&SymbolPath::parse("app.Color.Green"))
                .is_some()
        );
    }

    #[test]
    fn malformed_import_recorded_and_pass_continues() {
        let mut session = CompileSession::new();
        run(
            &mut session,
            &[unit(vec![
                Item::Import(ImportNode {
                    from: vec![],
                    names: ImportNames::All,
                    span: Span::default(),
                }),
                plain_fn("f", vec![]),
            ])],
        );
        assert!(session.sink.has_errors());
        assert!(session.lookup(&SymbolPath::parse("app.f")).is_some());
    }

    #[test]
    fn table_is_injective_over_paths() {
        let mut session = CompileSession::new();
        run(
            &mut session,
            &[unit(vec![
                Item::Field(FieldDecl {
                    name: "x".into(),
                    ty: Some(TypeExpr::named("i32")),
                    init: None,
                    span: Span::default(),
                }),
                Item::Field(FieldDecl {
                    name: "x".into(),
                    ty: Some(TypeExpr::named("i64")),
                    init: None,
                    span: Span::default(),
                }),
            ])],
        );
        assert!(session.sink.has_errors());
        assert_eq!(session.table.len(), 2); // module + first field
    }
}
