//! Shared diagnostic sink.
//!
//! Every error produced anywhere in the pipeline funnels into one
//! [`DiagnosticSink`], keyed by the source file that was active when the
//! error occurred. Errors with no file context land in a general bucket.
//! The sink accumulates everything before any output; the driver decides
//! whether to halt, and code generation never runs while file-scoped errors
//! are present.

use std::collections::BTreeMap;
use std::fmt;

use crate::CompileError;

/// Accumulates compile errors grouped per source file.
///
/// `BTreeMap` keeps report order deterministic: the general bucket first,
/// then files in path order.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    buckets: BTreeMap<Option<String>, Vec<CompileError>>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a file, or the general bucket when `None`.
    pub fn report(&mut self, file: Option<&str>, error: impl Into<CompileError>) {
        self.buckets
            .entry(file.map(str::to_string))
            .or_default()
            .push(error.into());
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.buckets.values().any(|v| !v.is_empty())
    }

    /// Whether any error is attributed to a specific source file.
    pub fn has_file_errors(&self) -> bool {
        self.buckets
            .iter()
            .any(|(file, errors)| file.is_some() && !errors.is_empty())
    }

    /// Total number of recorded errors.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(file, error)` pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &CompileError)> {
        self.buckets
            .iter()
            .flat_map(|(file, errors)| errors.iter().map(move |e| (file.as_deref(), e)))
    }

    /// Drain the sink into a flat list in deterministic order.
    pub fn into_errors(self) -> Vec<(Option<String>, CompileError)> {
        self.buckets
            .into_iter()
            .flat_map(|(file, errors)| {
                errors.into_iter().map(move |e| (file.clone(), e))
            })
            .collect()
    }
}

impl fmt::Display for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (file, error) in self.iter() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            match file {
                Some(file) => write!(f, "{file}: {error}")?,
                None => write!(f, "{error}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResolveError, Span};

    fn sample(name: &str) -> CompileError {
        ResolveError::CannotFindReference {
            name: name.into(),
            span: Span::new(1, 1, 1),
        }
        .into()
    }

    #[test]
    fn empty_sink_reports_nothing() {
        let sink = DiagnosticSink::new();
        assert!(sink.is_empty());
        assert!(!sink.has_errors());
        assert!(!sink.has_file_errors());
    }

    #[test]
    fn general_bucket_is_not_file_scoped() {
        let mut sink = DiagnosticSink::new();
        sink.report(None, sample("x"));
        assert!(sink.has_errors());
        assert!(!sink.has_file_errors());
    }

    #[test]
    fn file_errors_detected() {
        let mut sink = DiagnosticSink::new();
        sink.report(Some("main.vsp"), sample("x"));
        assert!(sink.has_file_errors());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn iteration_order_general_then_files() {
        let mut sink = DiagnosticSink::new();
        sink.report(Some("b.vsp"), sample("b"));
        sink.report(None, sample("g"));
        sink.report(Some("a.vsp"), sample("a"));
        let files: Vec<_> = sink.iter().map(|(f, _)| f).collect();
        assert_eq!(files, vec![None, Some("a.vsp"), Some("b.vsp")]);
    }
}
