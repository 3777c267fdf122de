//! Go code generation from the analysed model.
//!
//! Generators are stateless transforms from an aggregate plus the read-only
//! registry to a list of artifacts:
//! - Entity methods, spliced into the aggregate's own model file
//! - Enums, persisted objects, convertors and query fields
//! - Repository and service interfaces with their implementations
//! - Schema DDL for the whole model
//!
//! The orchestrator fans the per-aggregate generators out across a worker
//! pool and hands every artifact to the writer.

mod cancel;
mod convertor;
mod entity;
mod enums;
mod go_types;
mod methods;
mod orchestrator;
mod persisted;
mod query;
mod report;
mod repository;
mod schema;
mod service;
pub mod splice;
mod writer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

pub use cancel::CancellationFlag;
pub use go_types::{column_mapping, table_name, ColumnMapping};
pub use methods::{extension_accessors, Accessor, AccessorKind};
pub use orchestrator::run_generation;
pub use report::{GenerationError, GenerationReason, GenerationReport, KindCount};
pub use splice::SpliceError;
pub use writer::{ArtifactWriter, WriteOutcome};

use crate::config::{CompilerConfig, OutputLayout};
use crate::ir::{AggregateDescriptor, GoModule, Registry};

/// The artifact families, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    EntityTrait,
    Enum,
    PersistedObject,
    Convertor,
    QueryField,
    RepositoryInterface,
    RepositoryImplementation,
    ServiceInterface,
    ServiceImplementation,
    SchemaDdl,
}

impl ArtifactKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::EntityTrait => "entity-trait",
            ArtifactKind::Enum => "enum",
            ArtifactKind::PersistedObject => "persisted-object",
            ArtifactKind::Convertor => "convertor",
            ArtifactKind::QueryField => "query-field",
            ArtifactKind::RepositoryInterface => "repository-interface",
            ArtifactKind::RepositoryImplementation => "repository-implementation",
            ArtifactKind::ServiceInterface => "service-interface",
            ArtifactKind::ServiceImplementation => "service-implementation",
            ArtifactKind::SchemaDdl => "schema-ddl",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an artifact reaches the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file with `content`.
    Create,
    /// Splice `content` below the marker of an existing, authored file.
    Splice,
}

/// One generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Relative to the output root, or absolute for splice targets.
    pub path: PathBuf,
    pub content: String,
    pub mode: WriteMode,
}

impl Artifact {
    pub fn create(kind: ArtifactKind, path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            kind,
            path: path.into(),
            content,
            mode: WriteMode::Create,
        }
    }

    pub fn splice(kind: ArtifactKind, path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            kind,
            path: path.into(),
            content,
            mode: WriteMode::Splice,
        }
    }
}

/// Read-only inputs shared by every generator during a run.
#[derive(Debug)]
pub struct GenerationContext {
    registry: Arc<Registry>,
    layout: OutputLayout,
    out_dir: PathBuf,
    framework_import: String,
    module: Option<GoModule>,
}

impl GenerationContext {
    /// `config.out_dir` is expected to be absolute.
    pub fn new(registry: Arc<Registry>, config: &CompilerConfig) -> Self {
        let module = registry
            .get_all()
            .find_map(|a| a.origin().module.clone());
        Self {
            registry,
            layout: config.layout.clone(),
            out_dir: config.out_dir.clone(),
            framework_import: config.framework_import.clone(),
            module,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn framework_import(&self) -> &str {
        &self.framework_import
    }

    /// `<domain>/<sub>`, relative to the output root.
    pub fn domain_dir(&self, sub: &str) -> PathBuf {
        Path::new(&self.layout.domain).join(sub)
    }

    /// `<infrastructure>/<sub>`, relative to the output root.
    pub fn infrastructure_dir(&self, sub: &str) -> PathBuf {
        Path::new(&self.layout.infrastructure).join(sub)
    }

    /// Go import path of a generated package directory.
    ///
    /// Resolved against the model's `go.mod` when there is one; otherwise
    /// the slash-separated relative directory is used.
    pub fn import_path(&self, relative_dir: &Path) -> String {
        let relative = slash_path(relative_dir);
        let Some(module) = &self.module else {
            return relative;
        };
        let absolute = self.out_dir.join(relative_dir);
        crate::frontend::go::module::import_path(module, &absolute).unwrap_or(relative)
    }

    /// Import path and package name of the aggregate's model package.
    pub fn model_package(&self, aggregate: &AggregateDescriptor) -> (String, String) {
        let origin = aggregate.origin();
        let package = origin.package.clone().unwrap_or_else(|| "model".to_string());
        let import = origin
            .import_path
            .clone()
            .unwrap_or_else(|| self.import_path(&self.domain_dir("model")));
        (import, package)
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// A generator run once per aggregate.
pub trait AggregateGenerator: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason>;
}

/// When a model-wide generator runs relative to the per-aggregate fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BeforeFanOut,
    AfterFanOut,
}

/// A generator run once for the whole model.
///
/// Each output carries its own failure so one bad enum does not hide the
/// others.
pub trait ModelGenerator: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    fn stage(&self) -> Stage;

    fn generate(&self, ctx: &GenerationContext) -> Vec<Result<Artifact, GenerationError>>;
}

/// The fixed, ordered per-aggregate generator set.
pub fn aggregate_generators() -> Vec<Box<dyn AggregateGenerator>> {
    vec![
        Box::new(entity::EntityTraitGenerator),
        Box::new(persisted::PersistedObjectGenerator),
        Box::new(convertor::ConvertorGenerator),
        Box::new(query::QueryFieldGenerator),
        Box::new(repository::RepositoryInterfaceGenerator),
        Box::new(repository::RepositoryImplementationGenerator),
        Box::new(service::ServiceInterfaceGenerator),
        Box::new(service::ServiceImplementationGenerator),
    ]
}

/// Model-wide generators: enums and query field types before the fan-out,
/// schema DDL after it.
pub fn model_generators() -> Vec<Box<dyn ModelGenerator>> {
    vec![
        Box::new(enums::EnumGenerator),
        Box::new(query::FieldTypesGenerator),
        Box::new(schema::SchemaGenerator),
    ]
}
