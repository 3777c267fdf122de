//! Go frontend for the Soliton compiler.

pub mod annotations;
pub mod ast;
pub mod module;
pub mod parser;
pub mod to_ir;

use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::Frontend;
use crate::diagnostic::CompilerError;
use crate::ir::AggregateDescriptor;
use parser::GoParser;

/// Go frontend implementation.
pub struct GoFrontend {
    parser: GoParser,
}

impl GoFrontend {
    /// Creates a new Go frontend.
    pub fn new() -> Result<Self, CompilerError> {
        Ok(Self {
            parser: GoParser::new()?,
        })
    }
}

impl Frontend for GoFrontend {
    fn language(&self) -> &str {
        "go"
    }

    fn extensions(&self) -> &[&str] {
        &["go"]
    }

    fn parse_directory(&mut self, dir: &Path) -> Result<Vec<AggregateDescriptor>, CompilerError> {
        if !dir.is_dir() {
            return Err(CompilerError::io(dir, "model directory does not exist"));
        }

        let mut parsed_files = Vec::new();

        // Sorted so every run sees files in the same order
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension() else {
                continue;
            };
            if !self.extensions().contains(&ext.to_string_lossy().as_ref())
                || path.to_string_lossy().ends_with("_test.go")
            {
                continue;
            }

            let source = std::fs::read_to_string(path).map_err(|e| CompilerError::IoError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            debug!(file = %path.display(), "parsing");
            parsed_files.push(self.parser.parse(&source, path)?);
        }

        let module = module::find_module(dir)?;
        if let Some(module) = &module {
            debug!(module = %module.name, root = %module.root.display(), "found go.mod");
        }

        let aggregates = to_ir::to_ir(&parsed_files, module.as_ref())?;
        info!(files = parsed_files.len(), aggregates = aggregates.len(), "parsed model directory");
        Ok(aggregates)
    }
}
