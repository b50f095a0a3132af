//! Type expressions as they appear in source.

use vesper_core::Span;

/// A type written in source, before resolution.
///
/// Structural modifiers nest: `?[]*T` parses outside-in to
/// `Nullable(Slice(Reference(Named)))`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A dotted name, e.g. `i32` or `game.world.Entity`.
    Named { segments: Vec<String>, span: Span },
    /// `[]T`
    Slice { elem: Box<TypeExpr>, span: Span },
    /// `*T`
    Reference { elem: Box<TypeExpr>, span: Span },
    /// `?T`
    Nullable { elem: Box<TypeExpr>, span: Span },
}

impl TypeExpr {
    /// Shorthand for a named type with a default span.
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            segments: name.split('.').map(str::to_string).collect(),
            span: Span::default(),
        }
    }

    /// The source position of this type expression.
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. }
            | TypeExpr::Slice { span, .. }
            | TypeExpr::Reference { span, .. }
            | TypeExpr::Nullable { span, .. } => *span,
        }
    }

    /// Render the expression the way it was written.
    pub fn display_name(&self) -> String {
        match self {
            TypeExpr::Named { segments, .. } => segments.join("."),
            TypeExpr::Slice { elem, .. } => format!("[]{}", elem.display_name()),
            TypeExpr::Reference { elem, .. } => format!("*{}", elem.display_name()),
            TypeExpr::Nullable { elem, .. } => format!("?{}", elem.display_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_splits_on_dots() {
        let t = TypeExpr::named("game.Entity");
        match &t {
            TypeExpr::Named { segments, .. } => {
                assert_eq!(segments, &["game".to_string(), "Entity".to_string()]);
            }
            _ => panic!("expected named type"),
        }
        assert_eq!(t.display_name(), "game.Entity");
    }

    #[test]
    fn modifiers_render_outside_in() {
        let t = TypeExpr::Nullable {
            elem: Box::new(TypeExpr::Slice {
                elem: Box::new(TypeExpr::named("u8")),
                span: Span::default(),
            }),
            span: Span::default(),
        };
        assert_eq!(t.display_name(), "?[]u8");
    }
}
