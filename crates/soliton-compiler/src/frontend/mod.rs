//! Language frontends for parsing model sources into aggregate descriptors.
//!
//! Each frontend is responsible for:
//! 1. Parsing source files in its language
//! 2. Turning annotated declarations into [`AggregateDescriptor`]s
//!
//! Everything downstream (analysis, generation) only sees descriptors.

pub mod go;

use std::path::Path;

use crate::diagnostic::CompilerError;
use crate::ir::AggregateDescriptor;

/// Trait for language frontends.
pub trait Frontend {
    /// Returns the language name (e.g., "go").
    fn language(&self) -> &str;

    /// Returns file extensions this frontend handles (e.g., ["go"]).
    fn extensions(&self) -> &[&str];

    /// Parses all source files in the given directory.
    fn parse_directory(&mut self, dir: &Path) -> Result<Vec<AggregateDescriptor>, CompilerError>;
}

/// Creates a frontend for the given language.
pub fn create_frontend(language: &str) -> Result<Box<dyn Frontend>, CompilerError> {
    match language {
        "go" | "golang" => Ok(Box::new(go::GoFrontend::new()?)),
        _ => Err(CompilerError::UnsupportedLanguage {
            language: language.to_string(),
        }),
    }
}
