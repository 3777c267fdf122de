//! Go parser using tree-sitter.

use std::path::Path;

use tree_sitter::{Node, Parser};

use super::ast::*;
use crate::diagnostic::{CompilerError, Span};

/// Go parser.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    /// Creates a new Go parser.
    pub fn new() -> Result<Self, CompilerError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|_| CompilerError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses a Go source file.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<ParsedFile, CompilerError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| CompilerError::ParseFailed { path: path.to_path_buf() })?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error(root)
                .map(|n| (n.start_position().row + 1, n.start_position().column + 1))
                .unwrap_or((1, 1));
            return Err(CompilerError::SyntaxError {
                message: "invalid Go syntax".to_string(),
                file: path.to_path_buf(),
                line,
                column,
            });
        }

        let mut visitor = Visitor::new(source, path);
        visitor.visit_source_file(root);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            package: visitor.package,
            structs: visitor.structs,
        })
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

/// AST visitor that extracts struct declarations from tree-sitter nodes.
struct Visitor<'a> {
    source: &'a str,
    path: &'a Path,
    package: String,
    structs: Vec<StructDecl>,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str, path: &'a Path) -> Self {
        Self {
            source,
            path,
            package: String::new(),
            structs: Vec::new(),
        }
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            self.path,
            node.start_position().row + 1,
            node.start_position().column + 1,
        )
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn visit_source_file(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    let mut inner = child.walk();
                    let name = child
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "package_identifier");
                    if let Some(name) = name {
                        self.package = self.node_text(name).to_string();
                    }
                }
                "type_declaration" => self.visit_type_declaration(child),
                _ => {}
            }
        }
    }

    fn visit_type_declaration(&mut self, node: Node) {
        let outer_doc = self.doc_comments(node);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "type_spec" {
                continue;
            }
            // A spec inside `type ( ... )` carries its own comments; a lone
            // spec inherits the comments above the `type` keyword.
            let mut doc = self.doc_comments(child);
            if doc.is_empty() {
                doc = outer_doc.clone();
            }
            if let Some(decl) = self.visit_type_spec(child, doc) {
                self.structs.push(decl);
            }
        }
    }

    fn visit_type_spec(&self, node: Node, doc: Vec<CommentLine>) -> Option<StructDecl> {
        let name = node.child_by_field_name("name")?;
        let type_node = node.child_by_field_name("type")?;
        if type_node.kind() != "struct_type" {
            return None;
        }

        let mut fields = Vec::new();
        let mut cursor = type_node.walk();
        for list in type_node.named_children(&mut cursor) {
            if list.kind() != "field_declaration_list" {
                continue;
            }
            let mut inner = list.walk();
            for field in list.named_children(&mut inner) {
                if field.kind() == "field_declaration" {
                    fields.push(self.visit_field(field));
                }
            }
        }

        Some(StructDecl {
            name: self.node_text(name).to_string(),
            doc,
            fields,
            span: self.span(node),
        })
    }

    fn visit_field(&self, node: Node) -> FieldDecl {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.node_text(n).to_string())
            .collect();

        let type_expr = node
            .child_by_field_name("type")
            .map(|t| self.visit_type(t))
            .unwrap_or_else(|| TypeExpr::Other(String::new()));

        let tag = node
            .child_by_field_name("tag")
            .map(|t| strip_quotes(self.node_text(t)).to_string());

        FieldDecl {
            names,
            type_expr,
            tag,
            span: self.span(node),
        }
    }

    fn visit_type(&self, node: Node) -> TypeExpr {
        match node.kind() {
            "type_identifier" => TypeExpr::named(self.node_text(node)),
            "qualified_type" => {
                let package = node
                    .child_by_field_name("package")
                    .map(|p| self.node_text(p).to_string());
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.node_text(n).to_string())
                    .unwrap_or_default();
                TypeExpr::Named { package, name }
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::Pointer(Box::new(self.visit_type(inner))),
                None => TypeExpr::Other(self.node_text(node).to_string()),
            },
            "slice_type" | "array_type" => match node.child_by_field_name("element") {
                Some(element) => TypeExpr::Slice(Box::new(self.visit_type(element))),
                None => TypeExpr::Other(self.node_text(node).to_string()),
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.visit_type(inner),
                None => TypeExpr::Other(self.node_text(node).to_string()),
            },
            _ => TypeExpr::Other(self.node_text(node).to_string()),
        }
    }

    /// Contiguous comment lines ending on the line above `node`.
    fn doc_comments(&self, node: Node) -> Vec<CommentLine> {
        let mut lines = Vec::new();
        let mut expected_row = node.start_position().row;
        let mut current = node.prev_sibling();

        while let Some(sibling) = current {
            if sibling.kind() != "comment" || sibling.end_position().row + 1 != expected_row {
                break;
            }
            let first_line = sibling.start_position().row + 1;
            let text = self.node_text(sibling);
            for (offset, line) in comment_lines(text).into_iter().enumerate().rev() {
                lines.push(CommentLine {
                    text: line,
                    line: first_line + offset,
                });
            }
            expected_row = sibling.start_position().row;
            current = sibling.prev_sibling();
        }

        lines.reverse();
        lines
    }
}

/// Splits a `//` or `/* */` comment into its text lines.
fn comment_lines(text: &str) -> Vec<String> {
    if let Some(line) = text.strip_prefix("//") {
        return vec![line.trim().to_string()];
    }
    let body = text
        .strip_prefix("/*")
        .and_then(|t| t.strip_suffix("*/"))
        .unwrap_or(text);
    body.lines()
        .map(|l| l.trim().trim_start_matches('*').trim().to_string())
        .collect()
}

fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .or_else(|| trimmed.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> ParsedFile {
        let mut parser = GoParser::new().unwrap();
        parser.parse(source, &PathBuf::from("order.go")).unwrap()
    }

    #[test]
    fn test_parses_struct_with_doc_and_tags() {
        let file = parse(
            r#"package model

import "time"

// Order is a customer order.
// +soliton:aggregate
type Order struct {
	ID         int64      `db:"id"`
	CustomerID int64      `db:"customer_id" +soliton:ref`
	Items      []*OrderItem `+soliton:entity`
	PaidAt     *time.Time
	Width, Height int
}
"#,
        );

        assert_eq!(file.package, "model");
        assert_eq!(file.structs.len(), 1);
        let order = &file.structs[0];
        assert_eq!(order.name, "Order");
        assert_eq!(order.doc.len(), 2);
        assert_eq!(order.doc[1].text, "+soliton:aggregate");
        assert_eq!(order.doc[1].line, 6);

        assert_eq!(order.fields.len(), 5);
        assert_eq!(order.fields[1].tag.as_deref(), Some("db:\"customer_id\" +soliton:ref"));
        assert_eq!(
            order.fields[2].type_expr,
            TypeExpr::Slice(Box::new(TypeExpr::Pointer(Box::new(TypeExpr::named("OrderItem")))))
        );
        assert_eq!(
            order.fields[3].type_expr,
            TypeExpr::Pointer(Box::new(TypeExpr::Named {
                package: Some("time".to_string()),
                name: "Time".to_string(),
            }))
        );
        assert_eq!(order.fields[4].names, ["Width", "Height"]);
    }

    #[test]
    fn test_detached_comment_is_not_doc() {
        let file = parse(
            r#"package model

// +soliton:aggregate

type Loose struct {
	ID int64
}
"#,
        );
        assert!(file.structs[0].doc.is_empty());
    }

    #[test]
    fn test_embedded_field() {
        let file = parse(
            r#"package model

type User struct {
	framework.BaseEntity
	Name string
}
"#,
        );
        let user = &file.structs[0];
        assert!(user.fields[0].is_embedded());
        assert!(!user.fields[1].is_embedded());
    }

    #[test]
    fn test_syntax_error() {
        let mut parser = GoParser::new().unwrap();
        let err = parser
            .parse("package model\n\ntype Broken struct {\n", &PathBuf::from("broken.go"))
            .unwrap_err();
        assert!(matches!(err, CompilerError::SyntaxError { .. }));
    }
}
