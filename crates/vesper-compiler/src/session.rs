//! Per-compile session state.

use vesper_core::{CollectError, CompileError, DiagnosticSink, SymbolPath};

use crate::symbol::{Symbol, SymbolArena, SymbolId, SymbolKind};
use crate::table::GlobalSymbolTable;

/// All mutable state shared by the pipeline passes.
///
/// A session is created at the start of one compile invocation, passed
/// explicitly into every pass, and dropped at the end. Nothing survives
/// into the next invocation. Access is strictly single-threaded; passes
/// run to completion in sequence and never observe a later pass's partial
/// results.
#[derive(Debug, Default)]
pub struct CompileSession {
    pub arena: SymbolArena,
    pub table: GlobalSymbolTable,
    pub sink: DiagnosticSink,
    /// The source file currently being processed, for error attribution.
    current_file: Option<String>,
}

impl CompileSession {
    /// Create a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active source file for subsequent error reports.
    pub fn set_file(&mut self, file: Option<&str>) {
        self.current_file = file.map(str::to_string);
    }

    /// The active source file.
    pub fn file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    /// Record an error against the active file.
    pub fn error(&mut self, error: impl Into<CompileError>) {
        self.sink.report(self.current_file.as_deref(), error);
    }

    /// Record an error against the file a symbol was declared in.
    pub fn error_for(&mut self, symbol: SymbolId, error: impl Into<CompileError>) {
        let file = self.arena.get(symbol).file.clone();
        self.sink.report(file.as_deref(), error);
    }

    /// Borrow a symbol.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.arena.get(id)
    }

    /// Mutably borrow a symbol.
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.arena.get_mut(id)
    }

    /// Allocate a symbol, link it under its parent, and register its path.
    ///
    /// Parameters and locals are linked but not registered; they are not
    /// path-addressable. Function overloads share their group's path, so
    /// the group occupies the table entry and the overloads stay
    /// unregistered. Duplicate paths report the structural error and leave
    /// the original entry committed.
    pub fn declare(&mut self, symbol: Symbol) -> SymbolId {
        let register = !matches!(
            symbol.kind,
            SymbolKind::Parameter(_) | SymbolKind::Local(_) | SymbolKind::Function(_)
        );
        let path = symbol.path.clone();
        let span = symbol.span;
        let parent = symbol.parent;
        let mut symbol = symbol;
        if symbol.file.is_none() {
            symbol.file = self.current_file.clone();
        }
        let id = self.arena.alloc(symbol);
        if let Some(parent) = parent {
            self.arena.get_mut(parent).children.push(id);
        }
        if register && let Err(_existing) = self.table.insert(path.clone(), id) {
            self.error(CollectError::DuplicatePath { path, span });
        }
        id
    }

    /// Look up a path in the global table.
    pub fn lookup(&self, path: &SymbolPath) -> Option<SymbolId> {
        self.table.get(path)
    }
}
