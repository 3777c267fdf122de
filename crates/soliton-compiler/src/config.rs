//! Compiler configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostic::CompilerError;

/// Name of the optional project configuration file.
pub const CONFIG_FILE_NAME: &str = "soliton.toml";

/// Import path of the runtime persistence library generated code calls into.
pub const DEFAULT_FRAMEWORK_IMPORT: &str = "github.com/soliton-go/soliton/pkg/framework";

/// What to do with relations that point at unknown aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationPolicy {
    /// Report the failures and generate anyway.
    #[default]
    Advisory,
    /// Abort before generation.
    Strict,
}

/// Sub-directories of the output root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// Domain layer: enums, repository and service interfaces, schema.
    pub domain: String,
    /// Infrastructure layer: persisted objects, convertors, queries,
    /// repository implementations.
    pub infrastructure: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            domain: "domain".to_string(),
            infrastructure: "infrastructure".to_string(),
        }
    }
}

/// Configuration for the Soliton compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Directory containing the annotated model sources.
    pub model_dir: PathBuf,

    /// Root every generated path is relative to.
    pub out_dir: PathBuf,

    /// Source language (default: "go").
    pub language: String,

    pub relation_policy: RelationPolicy,

    /// Upper bound on concurrently generating aggregates.
    pub jobs: usize,

    pub layout: OutputLayout,

    pub framework_import: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("domain/model"),
            out_dir: PathBuf::from("."),
            language: "go".to_string(),
            relation_policy: RelationPolicy::default(),
            jobs: default_jobs(),
            layout: OutputLayout::default(),
            framework_import: DEFAULT_FRAMEWORK_IMPORT.to_string(),
        }
    }
}

impl CompilerConfig {
    /// A configuration for `model_dir` with every other setting defaulted.
    ///
    /// The output root is the grandparent of the model directory, so
    /// `app/domain/model` generates into `app/`.
    pub fn for_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        let out_dir = default_out_dir(&model_dir);
        Self {
            model_dir,
            out_dir,
            ..Self::default()
        }
    }

    /// Overlays the values set in a config file.
    ///
    /// A relative `out_dir` in the file is resolved against the file's
    /// directory.
    pub fn apply_file(&mut self, file: &FileConfig, file_dir: &Path) {
        if let Some(out_dir) = &file.out_dir {
            self.out_dir = file_dir.join(out_dir);
        }
        if let Some(policy) = file.relation_policy {
            self.relation_policy = policy;
        }
        if let Some(jobs) = file.jobs {
            self.jobs = jobs.max(1);
        }
        if let Some(layout) = &file.layout {
            self.layout = layout.clone();
        }
        if let Some(framework_import) = &file.framework_import {
            self.framework_import = framework_import.clone();
        }
        if let Some(language) = &file.language {
            self.language = language.clone();
        }
    }
}

/// Contents of `soliton.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub out_dir: Option<PathBuf>,
    pub language: Option<String>,
    pub relation_policy: Option<RelationPolicy>,
    pub jobs: Option<usize>,
    pub framework_import: Option<String>,
    pub layout: Option<OutputLayout>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let content = std::fs::read_to_string(path).map_err(|e| CompilerError::io(path, e.to_string()))?;
        toml::from_str(&content).map_err(|e| CompilerError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Looks for `soliton.toml` in the model directory and its ancestors,
    /// stopping at the first directory that holds a `go.mod`.
    pub fn discover(model_dir: &Path) -> Option<PathBuf> {
        for dir in model_dir.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join("go.mod").is_file() {
                break;
            }
        }
        None
    }
}

fn default_out_dir(model_dir: &Path) -> PathBuf {
    model_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_out_dir_defaults_to_grandparent() {
        let config = CompilerConfig::for_model_dir("app/domain/model");
        assert_eq!(config.out_dir, PathBuf::from("app"));
        assert_eq!(config.language, "go");
        assert_eq!(config.relation_policy, RelationPolicy::Advisory);
    }

    #[test]
    fn test_file_overrides() {
        let file: FileConfig = toml::from_str(
            r#"
            out_dir = "gen"
            relation_policy = "strict"
            jobs = 0

            [layout]
            infrastructure = "infra"
            "#,
        )
        .unwrap();

        let mut config = CompilerConfig::for_model_dir("app/domain/model");
        config.apply_file(&file, Path::new("app"));

        assert_eq!(config.out_dir, PathBuf::from("app/gen"));
        assert_eq!(config.relation_policy, RelationPolicy::Strict);
        assert_eq!(config.jobs, 1);
        assert_eq!(config.layout.domain, "domain");
        assert_eq!(config.layout.infrastructure, "infra");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "outdir = \"x\"\n").unwrap();
        assert!(matches!(FileConfig::load(&path), Err(CompilerError::ConfigError { .. })));
    }

    #[test]
    fn test_discover_stops_at_module_root() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let model = project.join("domain").join("model");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(project.join("go.mod"), "module example.com/shop\n").unwrap();

        assert_eq!(FileConfig::discover(&model), None);

        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(FileConfig::discover(&model), None);

        std::fs::write(project.join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(FileConfig::discover(&model), Some(project.join(CONFIG_FILE_NAME)));
    }
}
