//! Semantic analysis.
//!
//! Re-walks lowered bodies bottom-up: resolves references, performs
//! overload resolution, inserts casts, folds constant expressions, and
//! assigns every node its final type.

mod analyzer;
mod cast;
mod fold;
mod overload;

pub use analyzer::run;
pub use cast::coerce;
pub use fold::{FoldError, fold_binary, fold_compare, narrow_to_width};
pub use overload::{Suitability, param_types, resolve_among, resolve_overload, suitability};
