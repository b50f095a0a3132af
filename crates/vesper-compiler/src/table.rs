//! The global symbol table.

use rustc_hash::FxHashMap;
use vesper_core::SymbolPath;

use crate::symbol::SymbolId;

/// Map from dotted path to symbol, one entry per unique path.
///
/// Keys compare structurally over their segments; two paths spelled the
/// same are the same entry regardless of where they were built. Committed
/// entries are never removed during a compile.
#[derive(Debug, Default)]
pub struct GlobalSymbolTable {
    entries: FxHashMap<SymbolPath, SymbolId>,
}

impl GlobalSymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol at a path.
    ///
    /// Returns the already-registered symbol on a duplicate path, leaving
    /// the table unchanged; duplicate declarations are link-time errors
    /// reported by the caller.
    pub fn insert(&mut self, path: SymbolPath, id: SymbolId) -> Result<(), SymbolId> {
        match self.entries.entry(path) {
            std::collections::hash_map::Entry::Occupied(e) => Err(*e.get()),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(id);
                Ok(())
            }
        }
    }

    /// Look up a path.
    pub fn get(&self, path: &SymbolPath) -> Option<SymbolId> {
        self.entries.get(path).copied()
    }

    /// Look up by raw segments without building a `SymbolPath` caller-side.
    pub fn get_segments(&self, segments: &[String]) -> Option<SymbolId> {
        self.get(&SymbolPath::new(segments.to_vec()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&SymbolPath, SymbolId)> {
        self.entries.iter().map(|(p, &id)| (p, id))
    }

    /// All entries sorted by dotted path, for deterministic output.
    pub fn sorted(&self) -> Vec<(&SymbolPath, SymbolId)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(p, _)| p.to_string());
        entries
    }
}
