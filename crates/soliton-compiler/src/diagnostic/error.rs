//! Compiler error types.
#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Fatal errors. Any of these aborts the run before generation starts.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read '{}': {message}", path.display())]
    #[diagnostic(code(soliton::io::read_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(soliton::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(soliton::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    #[error("Syntax error in {}:{line}:{column}: {message}", file.display())]
    #[diagnostic(code(soliton::parse::syntax_error))]
    SyntaxError {
        message: String,
        file: PathBuf,
        line: usize,
        column: usize,
    },

    // =========================================================================
    // Annotation Errors
    // =========================================================================
    #[error("Unknown directive '+soliton:{directive}' in {}:{line}", file.display())]
    #[diagnostic(
        code(soliton::annotation::unknown_directive),
        help("Known directives: aggregate, baseEntity(Name), manyToMany, ref, ref(Target), unique, required, entity, valueObject, index, enum(A,B)")
    )]
    UnknownDirective {
        directive: String,
        file: PathBuf,
        line: usize,
    },

    #[error("Malformed directive '+soliton:{directive}' in {}:{line}: {message}", file.display())]
    #[diagnostic(code(soliton::annotation::malformed_directive))]
    MalformedDirective {
        directive: String,
        message: String,
        file: PathBuf,
        line: usize,
    },

    #[error("Directive '+soliton:{directive}' is not allowed on {target} ({}:{line})", file.display())]
    #[diagnostic(
        code(soliton::annotation::misplaced_directive),
        help("aggregate, baseEntity, manyToMany and ref(Target) belong in the struct comment; field directives belong in the struct tag")
    )]
    MisplacedDirective {
        directive: String,
        target: String,
        file: PathBuf,
        line: usize,
    },

    // =========================================================================
    // Structure Errors
    // =========================================================================
    #[error("Aggregate '{aggregate}' maps more than one field to column '{column}'")]
    #[diagnostic(
        code(soliton::structure::duplicate_column),
        help("Give one of the fields a distinct db tag, or mark it transient with db:\"-\"")
    )]
    DuplicateColumn {
        aggregate: String,
        column: String,
    },

    #[error("Field '{aggregate}.{field}' declares enum values but is not a basic type")]
    #[diagnostic(code(soliton::structure::enum_on_reference))]
    EnumOnReference {
        aggregate: String,
        field: String,
    },

    // =========================================================================
    // Analysis Errors
    // =========================================================================
    #[error("No aggregates found in model directory")]
    #[diagnostic(
        code(soliton::analysis::no_aggregates),
        help("Mark aggregate roots with a '// +soliton:aggregate' comment above the struct")
    )]
    NoAggregates,

    #[error("{} relation(s) reference unknown aggregates", errors.len())]
    #[diagnostic(
        code(soliton::analysis::relation_validation_failed),
        help("Declare the missing aggregates, or run without --strict to generate anyway")
    )]
    RelationValidationFailed {
        #[related]
        errors: Vec<RelationValidationError>,
    },

    #[error("Generation cancelled before it started")]
    #[diagnostic(code(soliton::analysis::cancelled))]
    Cancelled,

    // =========================================================================
    // Frontend / Config Errors
    // =========================================================================
    #[error("Unsupported language: {language}")]
    #[diagnostic(code(soliton::frontend::unsupported_language))]
    UnsupportedLanguage {
        language: String,
    },

    #[error("Invalid config file '{}': {message}", path.display())]
    #[diagnostic(code(soliton::config::invalid))]
    ConfigError {
        path: PathBuf,
        message: String,
    },
}

impl CompilerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A relation whose target aggregate is not registered.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{} references unknown aggregate '{target}'", describe_origin(.aggregate, .field))]
#[diagnostic(code(soliton::relation::unknown_target))]
pub struct RelationValidationError {
    /// The aggregate declaring the relation.
    pub aggregate: String,
    pub field: Option<String>,
    pub target: String,
}

fn describe_origin(aggregate: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("Field '{}.{}'", aggregate, field),
        None => format!("Aggregate '{}'", aggregate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_error_message() {
        let err = RelationValidationError {
            aggregate: "Order".into(),
            field: Some("WarehouseID".into()),
            target: "Warehouse".into(),
        };
        assert_eq!(
            err.to_string(),
            "Field 'Order.WarehouseID' references unknown aggregate 'Warehouse'"
        );

        let err = RelationValidationError {
            aggregate: "User".into(),
            field: None,
            target: "Team".into(),
        };
        assert_eq!(err.to_string(), "Aggregate 'User' references unknown aggregate 'Team'");
    }
}
