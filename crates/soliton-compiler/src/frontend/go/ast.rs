//! Go-specific AST types.

use std::path::PathBuf;

use crate::diagnostic::Span;

/// A parsed Go file.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub package: String,
    pub structs: Vec<StructDecl>,
}

/// A named struct type declaration.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    /// Doc comment lines directly above the declaration, markers stripped.
    pub doc: Vec<CommentLine>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub text: String,
    pub line: usize,
}

/// One field declaration. `A, B int` declares two names with one type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Empty for an embedded field.
    pub names: Vec<String>,
    pub type_expr: TypeExpr,
    /// Raw tag content without its quotes.
    pub tag: Option<String>,
    pub span: Span,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// Type expression AST nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `T` or `pkg.T`
    Named {
        package: Option<String>,
        name: String,
    },

    /// `*T`
    Pointer(Box<TypeExpr>),

    /// `[]T` or `[N]T`
    Slice(Box<TypeExpr>),

    /// Maps, channels, generics and anything else, kept as source text.
    Other(String),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            package: None,
            name: name.to_string(),
        }
    }
}
