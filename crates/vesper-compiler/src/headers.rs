//! Header resolution.
//!
//! The second pass interprets every symbol's attached attributes against
//! the fixed table of built-in attribute kinds, then applies inherited
//! modifiers. An attribute is only legal on a symbol whose kind exposes
//! the matching capability; anywhere else it is fatal for that symbol's
//! header, and the pass moves on so every bad header in a file is
//! reported together.

use log::debug;
use vesper_ast::{AttributeNode, ExprNode};
use vesper_core::HeaderError;

use crate::session::CompileSession;
use crate::symbol::{Capability, ForeignBinding, Modifiers, SymbolId, SymbolKind};

/// The fixed table of built-in attribute kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinAttribute {
    Static,
    Public,
    Private,
    Internal,
    Final,
    Abstract,
    Interface,
    Virtual,
    Override,
    ConstExp,
    Extern,
    Export,
    ForeignImport,
}

impl BuiltinAttribute {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "static" => BuiltinAttribute::Static,
            "public" => BuiltinAttribute::Public,
            "private" => BuiltinAttribute::Private,
            "internal" => BuiltinAttribute::Internal,
            "final" => BuiltinAttribute::Final,
            "abstract" => BuiltinAttribute::Abstract,
            "interface" => BuiltinAttribute::Interface,
            "virtual" => BuiltinAttribute::Virtual,
            "override" => BuiltinAttribute::Override,
            "constexp" => BuiltinAttribute::ConstExp,
            "extern" => BuiltinAttribute::Extern,
            "export" => BuiltinAttribute::Export,
            "import" => BuiltinAttribute::ForeignImport,
            _ => return None,
        })
    }

    fn capability(self) -> Capability {
        match self {
            BuiltinAttribute::Static => Capability::Static,
            BuiltinAttribute::Public | BuiltinAttribute::Private | BuiltinAttribute::Internal => {
                Capability::Visibility
            }
            BuiltinAttribute::Final => Capability::Final,
            BuiltinAttribute::Abstract => Capability::Abstract,
            BuiltinAttribute::Interface => Capability::Interface,
            BuiltinAttribute::Virtual => Capability::Virtual,
            BuiltinAttribute::Override => Capability::Override,
            BuiltinAttribute::ConstExp => Capability::ConstExp,
            BuiltinAttribute::Extern | BuiltinAttribute::ForeignImport => Capability::Foreign,
            BuiltinAttribute::Export => Capability::Export,
        }
    }
}

/// Run header resolution over every collected symbol, then apply
/// inherited static-ness top-down.
pub fn run(session: &mut CompileSession) {
    let ids: Vec<_> = session.arena.ids().collect();
    for id in &ids {
        resolve_symbol(session, *id);
    }
    let roots: Vec<_> = ids
        .iter()
        .copied()
        .filter(|&id| session.symbol(id).parent.is_none())
        .collect();
    for root in roots {
        inherit_static(session, root, false, false);
    }
    debug!("resolved headers for {} symbols", ids.len());
}

fn resolve_symbol(session: &mut CompileSession, id: SymbolId) {
    let attributes = std::mem::take(&mut session.symbol_mut(id).attributes);
    for attr in &attributes {
        apply_attribute(session, id, attr);
    }
    session.symbol_mut(id).attributes = attributes;
}

fn apply_attribute(session: &mut CompileSession, id: SymbolId, attr: &AttributeNode) {
    let Some(builtin) = BuiltinAttribute::from_name(&attr.name) else {
        session.error_for(
            id,
            HeaderError::UnknownAttribute {
                name: attr.name.clone(),
                span: attr.span,
            },
        );
        return;
    };

    if !session.symbol(id).kind.supports(builtin.capability()) {
        let symbol_kind = session.symbol(id).kind.name();
        session.error_for(
            id,
            HeaderError::WrongTarget {
                name: attr.name.clone(),
                symbol_kind,
                span: attr.span,
            },
        );
        return;
    }

    match builtin {
        BuiltinAttribute::Static => apply_static(session, id, attr),
        BuiltinAttribute::Public => session.symbol_mut(id).modifiers |= Modifiers::PUBLIC,
        BuiltinAttribute::Private => session.symbol_mut(id).modifiers |= Modifiers::PRIVATE,
        BuiltinAttribute::Internal => session.symbol_mut(id).modifiers |= Modifiers::INTERNAL,
        BuiltinAttribute::Final => session.symbol_mut(id).modifiers |= Modifiers::FINAL,
        BuiltinAttribute::Abstract => session.symbol_mut(id).modifiers |= Modifiers::ABSTRACT,
        BuiltinAttribute::Interface => session.symbol_mut(id).modifiers |= Modifiers::INTERFACE,
        BuiltinAttribute::Virtual => session.symbol_mut(id).modifiers |= Modifiers::VIRTUAL,
        BuiltinAttribute::Override => session.symbol_mut(id).modifiers |= Modifiers::OVERRIDE,
        BuiltinAttribute::ConstExp => session.symbol_mut(id).modifiers |= Modifiers::CONSTEXP,
        BuiltinAttribute::Extern => apply_extern(session, id, attr),
        BuiltinAttribute::Export => apply_export(session, id, attr),
        BuiltinAttribute::ForeignImport => apply_foreign_import(session, id, attr),
    }
}

/// `@static` or `@static(bool)`; the explicit form overrides inherited
/// static-ness in either direction.
fn apply_static(session: &mut CompileSession, id: SymbolId, attr: &AttributeNode) {
    let value = match attr.args.as_slice() {
        [] => true,
        [ExprNode::Bool { value, .. }] => *value,
        [_] => {
            session.error_for(
                id,
                HeaderError::WrongArgument {
                    name: attr.name.clone(),
                    expected: "boolean",
                    span: attr.span,
                },
            );
            return;
        }
        args => {
            session.error_for(
                id,
                HeaderError::WrongArity {
                    name: attr.name.clone(),
                    expected: "0 or 1",
                    got: args.len(),
                    span: attr.span,
                },
            );
            return;
        }
    };
    session.symbol_mut(id).explicit_static = Some(value);
}

/// Collect 1..=max string-literal arguments or report the arity error.
fn string_args(
    session: &mut CompileSession,
    id: SymbolId,
    attr: &AttributeNode,
    expected: &'static str,
    max: usize,
) -> Option<Vec<String>> {
    if attr.args.is_empty() || attr.args.len() > max {
        session.error_for(
            id,
            HeaderError::WrongArity {
                name: attr.name.clone(),
                expected,
                got: attr.args.len(),
                span: attr.span,
            },
        );
        return None;
    }
    let mut out = Vec::with_capacity(attr.args.len());
    for arg in &attr.args {
        match arg {
            ExprNode::Str { value, .. } => out.push(value.clone()),
            _ => {
                session.error_for(
                    id,
                    HeaderError::WrongArgument {
                        name: attr.name.clone(),
                        expected: "string-literal",
                        span: attr.span,
                    },
                );
                return None;
            }
        }
    }
    Some(out)
}

/// `@extern("lib")` or `@extern("lib", "symbol")`.
fn apply_extern(session: &mut CompileSession, id: SymbolId, attr: &AttributeNode) {
    let Some(mut args) = string_args(session, id, attr, "1 or 2", 2) else {
        return;
    };
    let library = args.remove(0);
    let symbol = args.pop();
    let sym = session.symbol_mut(id);
    sym.foreign = Some(ForeignBinding {
        library,
        module: None,
        symbol,
    });
    sym.modifiers |= Modifiers::EXTERN;
}

/// `@export("name")`.
fn apply_export(session: &mut CompileSession, id: SymbolId, attr: &AttributeNode) {
    let Some(mut args) = string_args(session, id, attr, "1", 1) else {
        return;
    };
    let sym = session.symbol_mut(id);
    sym.export_name = Some(args.remove(0));
    sym.modifiers |= Modifiers::EXPORT;
}

/// `@import("lib")`, `@import("lib", "symbol")`, or
/// `@import("lib", "module", "symbol")`.
fn apply_foreign_import(session: &mut CompileSession, id: SymbolId, attr: &AttributeNode) {
    let Some(mut args) = string_args(session, id, attr, "1 to 3", 3) else {
        return;
    };
    let library = args.remove(0);
    let (module, symbol) = match args.len() {
        0 => (None, None),
        1 => (None, Some(args.remove(0))),
        _ => (Some(args.remove(0)), Some(args.remove(0))),
    };
    let sym = session.symbol_mut(id);
    sym.foreign = Some(ForeignBinding {
        library,
        module,
        symbol,
    });
    sym.modifiers |= Modifiers::EXTERN;
}

/// Apply static-ness top-down.
///
/// A function or field directly inside a module or namespace is implicitly
/// static; members of a static struct inherit static-ness. An explicit
/// `@static(bool)` wins over the inherited value.
fn inherit_static(
    session: &mut CompileSession,
    id: SymbolId,
    parent_static: bool,
    parent_namespace_like: bool,
) {
    let symbol = session.symbol(id);
    let implicit = match &symbol.kind {
        SymbolKind::Function(_) | SymbolKind::Field(_) => parent_namespace_like || parent_static,
        SymbolKind::Struct(_) => parent_static,
        _ => false,
    };
    let is_static = symbol.explicit_static.unwrap_or(implicit);
    let namespace_like = matches!(symbol.kind, SymbolKind::Module | SymbolKind::Namespace);
    let supports = symbol.kind.supports(Capability::Static);
    if supports && is_static {
        session.symbol_mut(id).modifiers |= Modifiers::STATIC;
    }
    let children = session.symbol(id).children.clone();
    let child_parent_static = supports && is_static;
    for child in children {
        inherit_static(session, child, child_parent_static, namespace_like);
    }
}
