//! Phase B: runs every generator and writes what they produce.
//!
//! Model-wide generators of the first stage run once, then the
//! per-aggregate generators fan out across at most `jobs` blocking workers,
//! then the last stage runs. A failure is recorded against its
//! `(aggregate, kind)` pair and never stops other work. Cancellation is
//! observed before each aggregate starts and between its generators.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::{
    aggregate_generators, model_generators, AggregateGenerator, ArtifactKind, ArtifactWriter,
    CancellationFlag, GenerationContext, GenerationError, GenerationReason, GenerationReport,
    ModelGenerator, Stage, WriteOutcome,
};
use crate::config::CompilerConfig;
use crate::ir::Registry;

/// Result of running one generator for one aggregate (or the model).
#[derive(Debug)]
struct Outcome {
    kind: ArtifactKind,
    files: Vec<(PathBuf, WriteOutcome)>,
    error: Option<GenerationError>,
}

impl Outcome {
    fn failed(error: GenerationError) -> Self {
        Self {
            kind: error.kind,
            files: Vec::new(),
            error: Some(error),
        }
    }
}

/// Generates and writes every artifact of the model.
///
/// `config.out_dir` must be absolute. The returned report is sorted, so two
/// runs over the same model produce equal reports.
pub async fn run_generation(
    registry: Arc<Registry>,
    config: &CompilerConfig,
    cancel: CancellationFlag,
) -> GenerationReport {
    run_with(registry, config, cancel, model_generators(), aggregate_generators()).await
}

async fn run_with(
    registry: Arc<Registry>,
    config: &CompilerConfig,
    cancel: CancellationFlag,
    models: Vec<Box<dyn ModelGenerator>>,
    generators: Vec<Box<dyn AggregateGenerator>>,
) -> GenerationReport {
    let ctx = Arc::new(GenerationContext::new(registry, config));
    let writer = Arc::new(ArtifactWriter::new(ctx.out_dir()));
    let models: Vec<Arc<dyn ModelGenerator>> = models.into_iter().map(Arc::from).collect();
    let generators: Arc<Vec<Box<dyn AggregateGenerator>>> = Arc::new(generators);
    let jobs = config.jobs.max(1);

    let mut report = GenerationReport::default();
    info!(
        aggregates = ctx.registry().len(),
        jobs,
        out_dir = %ctx.out_dir().display(),
        "generation started"
    );

    run_model_stage(Stage::BeforeFanOut, &models, &ctx, &writer, &cancel, &mut report).await;

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();
    let names: Vec<String> = ctx.registry().get_all().map(|a| a.name().to_string()).collect();

    for name in names {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        if cancel.is_cancelled() {
            drop(permit);
            report.cancelled = true;
            for generator in generators.iter() {
                report.record_failure(GenerationError::new(
                    Some(&name),
                    generator.kind(),
                    GenerationReason::Cancelled,
                ));
            }
            continue;
        }

        let ctx = Arc::clone(&ctx);
        let writer = Arc::clone(&writer);
        let generators = Arc::clone(&generators);
        let cancel = cancel.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let kinds: Vec<ArtifactKind> = generators.iter().map(|g| g.kind()).collect();
            guard_worker(&name, &kinds, || generate_aggregate(&name, &ctx, &generators, &writer, &cancel))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcomes) => absorb(&mut report, outcomes),
            Err(e) => error!(error = %e, "generation worker failed"),
        }
    }

    run_model_stage(Stage::AfterFanOut, &models, &ctx, &writer, &cancel, &mut report).await;

    if cancel.is_cancelled() {
        report.cancelled = true;
    }
    report.finish();
    info!(
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        failed = report.total_failed(),
        cancelled = report.cancelled,
        "generation finished"
    );
    report
}

async fn run_model_stage(
    stage: Stage,
    models: &[Arc<dyn ModelGenerator>],
    ctx: &Arc<GenerationContext>,
    writer: &Arc<ArtifactWriter>,
    cancel: &CancellationFlag,
    report: &mut GenerationReport,
) {
    let staged: Vec<Arc<dyn ModelGenerator>> = models.iter().filter(|g| g.stage() == stage).cloned().collect();
    if staged.is_empty() {
        return;
    }

    if cancel.is_cancelled() {
        report.cancelled = true;
        for generator in &staged {
            report.record_failure(GenerationError::new(None, generator.kind(), GenerationReason::Cancelled));
        }
        return;
    }

    debug!(?stage, generators = staged.len(), "model stage started");
    let ctx = Arc::clone(ctx);
    let writer = Arc::clone(writer);
    let task = tokio::task::spawn_blocking(move || {
        staged
            .iter()
            .flat_map(|generator| run_model_generator(generator.as_ref(), &ctx, &writer))
            .collect::<Vec<_>>()
    });

    match task.await {
        Ok(outcomes) => absorb(report, outcomes),
        Err(e) => error!(error = %e, ?stage, "model stage failed"),
    }
}

fn run_model_generator(
    generator: &dyn ModelGenerator,
    ctx: &GenerationContext,
    writer: &ArtifactWriter,
) -> Vec<Outcome> {
    let kind = generator.kind();
    let results = catch_unwind(AssertUnwindSafe(|| generator.generate(ctx))).unwrap_or_else(|payload| {
        vec![Err(GenerationError::new(
            None,
            kind,
            GenerationReason::Panicked(panic_message(payload)),
        ))]
    });

    results
        .into_iter()
        .map(|result| match result {
            Ok(artifact) => match writer.write(&artifact) {
                Ok(file) => Outcome {
                    kind,
                    files: vec![file],
                    error: None,
                },
                Err(reason) => Outcome::failed(GenerationError::new(None, kind, reason)),
            },
            Err(error) => Outcome::failed(error),
        })
        .collect()
}

/// Turns a panic that escaped the per-generator guard into a failure for
/// every kind of the aggregate, so it still shows up in the report.
fn guard_worker(name: &str, kinds: &[ArtifactKind], work: impl FnOnce() -> Vec<Outcome>) -> Vec<Outcome> {
    catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let message = panic_message(payload);
        error!(aggregate = name, %message, "generation worker panicked");
        kinds
            .iter()
            .map(|&kind| {
                Outcome::failed(GenerationError::new(
                    Some(name),
                    kind,
                    GenerationReason::Panicked(message.clone()),
                ))
            })
            .collect()
    })
}

/// Runs the per-aggregate generators in order on a blocking worker.
fn generate_aggregate(
    name: &str,
    ctx: &GenerationContext,
    generators: &[Box<dyn AggregateGenerator>],
    writer: &ArtifactWriter,
    cancel: &CancellationFlag,
) -> Vec<Outcome> {
    let Ok(aggregate) = ctx.registry().get(name) else {
        return Vec::new();
    };
    debug!(aggregate = name, "aggregate started");

    let mut outcomes = Vec::with_capacity(generators.len());
    for generator in generators {
        let kind = generator.kind();
        let fail = |reason| Outcome::failed(GenerationError::new(Some(name), kind, reason));

        if cancel.is_cancelled() {
            outcomes.push(fail(GenerationReason::Cancelled));
            continue;
        }

        let generated = catch_unwind(AssertUnwindSafe(|| generator.generate(aggregate, ctx)))
            .unwrap_or_else(|payload| Err(GenerationReason::Panicked(panic_message(payload))));
        let artifacts = match generated {
            Ok(artifacts) => artifacts,
            Err(reason) => {
                debug!(aggregate = name, %kind, %reason, "generator failed");
                outcomes.push(fail(reason));
                continue;
            }
        };

        let mut outcome = Outcome {
            kind,
            files: Vec::with_capacity(artifacts.len()),
            error: None,
        };
        for artifact in &artifacts {
            match writer.write(artifact) {
                Ok(file) => outcome.files.push(file),
                Err(reason) => {
                    outcome.error = Some(GenerationError::new(Some(name), kind, reason));
                    break;
                }
            }
        }
        outcomes.push(outcome);
    }
    outcomes
}

fn absorb(report: &mut GenerationReport, outcomes: Vec<Outcome>) {
    for outcome in outcomes {
        for (path, write) in outcome.files {
            match write {
                WriteOutcome::Written => report.written.push(path),
                WriteOutcome::Unchanged => report.unchanged.push(path),
            }
        }
        match outcome.error {
            Some(error) => {
                if error.is_cancellation() {
                    report.cancelled = true;
                }
                report.record_failure(error);
            }
            None => report.record_success(outcome.kind),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::order;
    use crate::codegen::Artifact;
    use crate::ir::{AggregateAnnotations, AggregateDescriptor, BasicType, FieldDescriptor, SemanticType};
    use std::fs;
    use tempfile::TempDir;

    fn setup(temp: &TempDir, aggregates: Vec<AggregateDescriptor>) -> (Arc<Registry>, CompilerConfig) {
        let mut registry = Registry::new();
        for aggregate in aggregates {
            registry.register(aggregate);
        }
        registry.collect_enums();
        let config = CompilerConfig {
            out_dir: temp.path().to_path_buf(),
            jobs: 2,
            ..CompilerConfig::default()
        };
        (Arc::new(registry), config)
    }

    #[tokio::test]
    async fn test_full_run_writes_every_kind() {
        let temp = TempDir::new().unwrap();
        let model = temp.path().join("order.go");
        fs::write(&model, "package model\n\ntype Order struct {\n\tID int64\n}\n").unwrap();
        let mut origin = order().origin().clone();
        origin.file = Some(model.clone());
        let order = order().with_origin(origin);
        let (registry, config) = setup(&temp, vec![order]);

        let report = run_generation(registry, &config, CancellationFlag::new()).await;
        assert!(!report.has_failures(), "{:?}", report.failures);
        assert!(!report.cancelled);
        assert_eq!(report.counts.len(), 10);
        assert!(temp.path().join("domain/sql/schema.sql").is_file());
        assert!(temp.path().join("infrastructure/query/field_types.go").is_file());
        assert!(fs::read_to_string(&model)
            .unwrap()
            .contains("func (e *Order) GetID() int64"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let invoice = AggregateDescriptor::new(
            "Invoice",
            vec![
                FieldDescriptor::basic("ID", BasicType::Int64),
                FieldDescriptor::new("Total", SemanticType::from_go("Money")),
            ],
            AggregateAnnotations::default(),
        );
        let tag = AggregateDescriptor::new(
            "Tag",
            vec![FieldDescriptor::basic("ID", BasicType::Int64)],
            AggregateAnnotations::default(),
        );
        let temp = TempDir::new().unwrap();
        let (registry, config) = setup(&temp, vec![invoice, tag]);

        let report = run_generation(registry, &config, CancellationFlag::new()).await;
        let failed: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.aggregate.as_deref(), f.kind))
            .collect();
        assert!(failed.contains(&(Some("Invoice"), ArtifactKind::PersistedObject)));
        assert!(failed.contains(&(Some("Invoice"), ArtifactKind::SchemaDdl)));
        assert!(failed.iter().all(|(aggregate, _)| *aggregate == Some("Invoice")));
        assert!(temp.path().join("infrastructure/do/tag_do.go").is_file());
        assert!(!temp.path().join("infrastructure/do/invoice_do.go").exists());
        assert!(temp.path().join("domain/repository/invoice_repository.go").is_file());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let tag = AggregateDescriptor::new(
            "Tag",
            vec![FieldDescriptor::basic("ID", BasicType::Int64)],
            AggregateAnnotations::default(),
        );
        let temp = TempDir::new().unwrap();
        let (registry, config) = setup(&temp, vec![tag]);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let report = run_generation(registry, &config, cancel).await;
        assert!(report.cancelled);
        assert!(report.written.is_empty());
        assert!(report.failures.iter().all(|f| f.is_cancellation()));
        assert_eq!(report.errors().count(), 0);
        assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    /// Writes one marker file per aggregate, then requests cancellation.
    struct CancelAfterWrite(CancellationFlag);

    impl AggregateGenerator for CancelAfterWrite {
        fn kind(&self) -> ArtifactKind {
            ArtifactKind::PersistedObject
        }

        fn generate(
            &self,
            aggregate: &AggregateDescriptor,
            _ctx: &GenerationContext,
        ) -> Result<Vec<Artifact>, GenerationReason> {
            self.0.cancel();
            Ok(vec![Artifact::create(
                self.kind(),
                format!("{}.txt", aggregate.name()),
                "first\n".to_string(),
            )])
        }
    }

    struct WriteOnly;

    impl AggregateGenerator for WriteOnly {
        fn kind(&self) -> ArtifactKind {
            ArtifactKind::Convertor
        }

        fn generate(
            &self,
            aggregate: &AggregateDescriptor,
            _ctx: &GenerationContext,
        ) -> Result<Vec<Artifact>, GenerationReason> {
            Ok(vec![Artifact::create(
                self.kind(),
                format!("{}_second.txt", aggregate.name()),
                "second\n".to_string(),
            )])
        }
    }

    #[tokio::test]
    async fn test_cancelled_mid_run() {
        let aggregates = ["Alpha", "Beta"]
            .iter()
            .map(|name| {
                AggregateDescriptor::new(
                    *name,
                    vec![FieldDescriptor::basic("ID", BasicType::Int64)],
                    AggregateAnnotations::default(),
                )
            })
            .collect();
        let temp = TempDir::new().unwrap();
        let (registry, mut config) = setup(&temp, aggregates);
        config.jobs = 1;
        let cancel = CancellationFlag::new();
        let generators: Vec<Box<dyn AggregateGenerator>> =
            vec![Box::new(CancelAfterWrite(cancel.clone())), Box::new(WriteOnly)];

        let report = run_with(registry, &config, cancel, Vec::new(), generators).await;

        assert!(report.cancelled);
        // The in-flight artifact is finished, nothing after it starts.
        assert_eq!(fs::read_to_string(temp.path().join("Alpha.txt")).unwrap(), "first\n");
        assert_eq!(report.written, vec![temp.path().join("Alpha.txt")]);
        assert!(!temp.path().join("Alpha_second.txt").exists());
        assert!(!temp.path().join("Beta.txt").exists());

        let cancelled: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.aggregate.as_deref(), f.kind, f.is_cancellation()))
            .collect();
        assert_eq!(
            cancelled,
            [
                (Some("Alpha"), ArtifactKind::Convertor, true),
                (Some("Beta"), ArtifactKind::PersistedObject, true),
                (Some("Beta"), ArtifactKind::Convertor, true),
            ]
        );

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["Alpha.txt"]);
    }

    #[test]
    fn test_worker_panic_reported_per_kind() {
        let kinds = [ArtifactKind::PersistedObject, ArtifactKind::Convertor];
        let outcomes = guard_worker("Order", &kinds, || panic!("writer exploded"));

        let mut report = GenerationReport::default();
        absorb(&mut report, outcomes);
        report.finish();

        assert_eq!(report.failures.len(), 2);
        for (failure, kind) in report.failures.iter().zip(kinds) {
            assert_eq!(failure.aggregate.as_deref(), Some("Order"));
            assert_eq!(failure.kind, kind);
            assert_eq!(failure.reason, GenerationReason::Panicked("writer exploded".into()));
        }
    }
}
