//! Dotted symbol paths.
//!
//! Every declaration is addressable by the ordered list of names leading to
//! it from its module root. [`SymbolPath`] compares and hashes structurally
//! over its segments, so two paths built independently from the same names
//! are the same key.

use std::fmt;

/// Ordered segment list identifying a declaration, e.g. `app.math.Vec2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SymbolPath {
    segments: Vec<String>,
}

impl SymbolPath {
    /// The empty root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Build a single-segment path.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parse a dotted string, ignoring empty segments.
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// The path of a child declaration named `name`.
    ///
    /// An empty name yields this path unchanged; unnamed scopes share their
    /// parent's identity.
    pub fn child(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// The final segment, or `None` at the root.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for SymbolPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for SymbolPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
