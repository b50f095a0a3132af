//! Diagnostic dump formats.
//!
//! Two non-normative developer dumps: a flat listing of every global
//! symbol table entry, and a recursive rendering of the analyzed symbol
//! tree. Neither affects compiled output.

use std::fmt::Write as _;

use crate::session::CompileSession;
use crate::symbol::SymbolId;

/// Flat `kind<TAB>dotted.path` listing of every table entry, one per
/// line, sorted by path.
pub fn symbol_listing(session: &CompileSession) -> String {
    let mut out = String::new();
    for (path, id) in session.table.sorted() {
        let kind = session.symbol(id).kind.name();
        let _ = writeln!(out, "{kind}\t{path}");
    }
    out
}

/// Recursive rendering of the module/namespace/symbol tree.
pub fn render_tree(session: &CompileSession) -> String {
    let mut out = String::new();
    let roots: Vec<_> = session
        .arena
        .iter()
        .filter(|(_, s)| s.parent.is_none())
        .map(|(id, _)| id)
        .collect();
    for root in roots {
        render_symbol(session, root, 0, &mut out);
    }
    out
}

fn render_symbol(session: &CompileSession, id: SymbolId, depth: usize, out: &mut String) {
    let symbol = session.symbol(id);
    let indent = "  ".repeat(depth);
    let name = if symbol.name.is_empty() {
        "<root>"
    } else {
        &symbol.name
    };
    let _ = writeln!(out, "{indent}{} {name}", symbol.kind.name());
    for &child in &symbol.children {
        render_symbol(session, child, depth + 1, out);
    }
}
