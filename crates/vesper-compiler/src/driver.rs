//! The compilation driver.
//!
//! Runs the passes in dependency order over one session: collect,
//! resolve headers, resolve types, lower bodies, analyze, generate.
//! Every pass runs to completion over the whole symbol set before the
//! next starts. Errors accumulate in the session's sink; the driver
//! halts after type resolution and again after analysis when the sink is
//! non-empty, and code generation never runs while file-scoped errors
//! are present.

use std::fmt;
use std::path::PathBuf;

use log::{debug, warn};
use vesper_ast::SourceUnit;
use vesper_core::CompileError;

use crate::codegen::{self, ModuleImage};
use crate::session::CompileSession;
use crate::{collect, dump, headers, lower, sema, type_resolver};

/// Options for one compile invocation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Whether implicit narrowing and signedness-changing casts are
    /// accepted during overload scoring and coercion.
    pub allow_implicit_casts: bool,
    /// When set, write the flat symbol-table listing here.
    pub dump_symbols: Option<PathBuf>,
    /// When set, write the recursive symbol-tree rendering here.
    pub dump_tree: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            allow_implicit_casts: true,
            dump_symbols: None,
            dump_tree: None,
        }
    }
}

/// A failed compile: every recorded error, keyed by source file.
#[derive(Debug)]
pub struct CompileFailure {
    pub errors: Vec<(Option<String>, CompileError)>,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (file, error)) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match file {
                Some(file) => write!(f, "{file}: {error}")?,
                None => write!(f, "{error}")?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}

/// Compile a set of source units into a module image.
///
/// A fresh session is created for this invocation and dropped at the
/// end; nothing persists into the next compile.
pub fn compile_units(
    units: &[SourceUnit],
    options: &CompileOptions,
) -> Result<ModuleImage, CompileFailure> {
    let mut session = CompileSession::new();

    debug!("compiling {} source units", units.len());
    collect::run(&mut session, units);
    headers::run(&mut session);
    type_resolver::run(&mut session);
    if session.sink.has_errors() {
        return Err(failure(session));
    }

    lower::run(&mut session);
    sema::run(&mut session, options.allow_implicit_casts);
    if session.sink.has_errors() {
        return Err(failure(session));
    }

    write_dumps(&session, options);

    debug_assert!(!session.sink.has_file_errors());
    Ok(codegen::run(&session))
}

fn failure(session: CompileSession) -> CompileFailure {
    CompileFailure {
        errors: session.sink.into_errors(),
    }
}

fn write_dumps(session: &CompileSession, options: &CompileOptions) {
    if let Some(path) = &options.dump_symbols
        && let Err(err) = std::fs::write(path, dump::symbol_listing(session))
    {
        warn!("failed to write symbol listing to {}: {err}", path.display());
    }
    if let Some(path) = &options.dump_tree
        && let Err(err) = std::fs::write(path, dump::render_tree(session))
    {
        warn!("failed to write symbol tree to {}: {err}", path.display());
    }
}
