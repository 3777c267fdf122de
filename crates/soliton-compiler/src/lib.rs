//! # Soliton Compiler
//!
//! This crate turns annotated Go domain models into the infrastructure a
//! DDD service needs around them: entity methods, enums, gorm persisted
//! objects and convertors, typed query fields, repositories, services and
//! MySQL schema DDL.
//!
//! ## Supported Languages
//!
//! - Go (default)
//!
//! ## Architecture
//!
//! ```text
//! Model sources (*.go)
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Frontend   │  tree-sitter parse, +soliton: directives
//! │  (Go → IR)   │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Analyze    │  Phase A: registry, relations, junctions,
//! │   (IR)       │  referential validation, enums
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  Phase B: concurrent generators, atomic writes,
//! │  (IR → Go)   │  splices into authored model files
//! └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soliton_compiler::{CancellationFlag, Compiler, CompilerConfig};
//!
//! let config = CompilerConfig::for_model_dir("app/domain/model");
//! let compiler = Compiler::new(config);
//! let result = compiler.compile(CancellationFlag::new()).await?;
//! println!("{} files written", result.report.written.len());
//! ```

pub mod analyze;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod frontend;
pub mod ir;
pub mod naming;
pub mod validate;

use std::sync::Arc;

use tracing::info;

pub use analyze::Analysis;
pub use codegen::{CancellationFlag, GenerationReport};
pub use config::{CompilerConfig, RelationPolicy};
pub use diagnostic::CompilerError;

/// The main compiler struct that runs both phases.
pub struct Compiler {
    config: CompilerConfig,
}

/// Result of a compilation.
#[derive(Debug)]
pub struct CompileResult {
    /// Number of aggregates analysed.
    pub aggregates: usize,
    /// Number of relation records inferred.
    pub relations: usize,
    /// Number of junction tables synthesised.
    pub junctions: usize,
    /// Number of enums collected.
    pub enums: usize,
    pub report: GenerationReport,
}

impl CompileResult {
    /// True when every generator succeeded and nothing was cancelled.
    pub fn is_clean(&self) -> bool {
        !self.report.has_failures() && !self.report.cancelled
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs Phase A only: parse the model directory and analyse it.
    ///
    /// Fails on syntax errors, bad directives, duplicate columns, an empty
    /// model and, under [`RelationPolicy::Strict`], relation failures.
    pub fn analyze(&self) -> Result<Analysis, CompilerError> {
        let mut frontend = frontend::create_frontend(&self.config.language)?;
        let aggregates = frontend.parse_directory(&self.config.model_dir)?;
        analyze::analyze_model(aggregates, self.config.relation_policy)
    }

    /// Runs both phases.
    ///
    /// Per-artifact failures do not fail the compilation; they are in
    /// `report.failures`. Phase B is skipped with [`CompilerError::Cancelled`]
    /// when `cancel` is set before it starts.
    pub async fn compile(&self, cancel: CancellationFlag) -> Result<CompileResult, CompilerError> {
        let analysis = self.analyze()?;

        if cancel.is_cancelled() {
            return Err(CompilerError::Cancelled);
        }

        let mut config = self.config.clone();
        if config.out_dir.is_relative() {
            let cwd = std::env::current_dir().map_err(|e| CompilerError::io(".", e.to_string()))?;
            config.out_dir = cwd.join(&config.out_dir);
        }

        let registry = Arc::new(analysis.registry);
        let mut report = codegen::run_generation(Arc::clone(&registry), &config, cancel).await;
        report.validation = analysis.validation;

        let result = CompileResult {
            aggregates: registry.len(),
            relations: registry.relations().len(),
            junctions: registry.junctions().len(),
            enums: registry.enums().len(),
            report,
        };
        info!(
            aggregates = result.aggregates,
            written = result.report.written.len(),
            failures = result.report.total_failed(),
            "compilation finished"
        );
        Ok(result)
    }
}
