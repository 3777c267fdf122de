//! Soliton CLI.
//!
//! Generates DDD infrastructure from an annotated Go model directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use soliton_compiler::config::FileConfig;
use soliton_compiler::{
    Analysis, CancellationFlag, CompileResult, Compiler, CompilerConfig, RelationPolicy,
};

mod ui;

/// Exit status when the run finished but some generators failed.
const EXIT_GENERATION_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "soliton")]
#[command(version, about = "Soliton - generates DDD infrastructure code from annotated Go domain models")]
struct Cli {
    /// Directory containing the annotated model sources
    model_dir: PathBuf,

    /// Output root (default: the model directory's grandparent)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Treat relations to unknown aggregates as fatal
    #[arg(long)]
    strict: bool,

    /// Maximum number of aggregates generated concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Import path of the runtime persistence library
    #[arg(long)]
    framework_import: Option<String>,

    /// Config file (default: soliton.toml found above the model directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyse only and print the model
    #[arg(long)]
    inspect: bool,

    /// With --inspect, print JSON instead of a summary
    #[arg(long, requires = "inspect")]
    json: bool,

    /// More log output on stderr (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    let compiler = Compiler::new(config);

    if cli.inspect {
        let analysis = compiler.analyze()?;
        if cli.json {
            print_json(&analysis)?;
        } else {
            print_analysis(&analysis);
        }
        return Ok(());
    }

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    ui::print_header(env!("CARGO_PKG_VERSION"));
    let start = Instant::now();
    let spinner = ui::spinner("Generating...");
    let result = compiler.compile(cancel).await;
    spinner.finish_and_clear();
    let result = result?;

    print_report(&result, compiler.config());
    ui::timing("Done", start.elapsed().as_millis());
    println!();

    if result.report.has_failures() {
        std::process::exit(EXIT_GENERATION_FAILED);
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("soliton_compiler={0},soliton={0}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the config file, then flags.
fn resolve_config(cli: &Cli) -> miette::Result<CompilerConfig> {
    let mut config = CompilerConfig::for_model_dir(&cli.model_dir);

    let file = cli
        .config
        .clone()
        .or_else(|| FileConfig::discover(&cli.model_dir));
    if let Some(path) = file {
        let file_config = FileConfig::load(&path)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        config.apply_file(&file_config, dir);
        tracing::info!(path = %path.display(), "loaded config file");
    }

    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    if cli.strict {
        config.relation_policy = RelationPolicy::Strict;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs.max(1);
    }
    if let Some(framework_import) = &cli.framework_import {
        config.framework_import = framework_import.clone();
    }
    Ok(config)
}

fn print_json(analysis: &Analysis) -> miette::Result<()> {
    let mut document = serde_json::Map::new();
    document.insert(
        "registry".to_string(),
        serde_json::to_value(&analysis.registry).into_diagnostic()?,
    );
    document.insert(
        "validation".to_string(),
        serde_json::to_value(&analysis.validation).into_diagnostic()?,
    );
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(document)).into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

fn print_analysis(analysis: &Analysis) {
    let registry = &analysis.registry;

    ui::box_header("AGGREGATES");
    ui::box_line("");
    for aggregate in registry.get_all() {
        let id = aggregate
            .id_field()
            .map(|f| f.name.as_str())
            .or(aggregate.annotations().base_entity_trait.as_deref())
            .unwrap_or("-");
        ui::box_line(&format!(
            "{} {:<20} {:>2} fields  id: {}",
            ui::symbols::TRIANGLE,
            aggregate.name(),
            aggregate.fields().len(),
            id
        ));
    }
    ui::box_line("");
    ui::box_footer();

    if !registry.relations().is_empty() {
        ui::section("Relations");
        for relation in registry.relations() {
            let via = relation.field().map(|f| format!(".{}", f.name)).unwrap_or_default();
            ui::dim(&format!(
                "{}{} {} {} ({})",
                relation.source(),
                via,
                ui::symbols::ARROW,
                relation.target(),
                relation.kind()
            ));
        }
    }

    if !registry.junctions().is_empty() {
        ui::section("Junction tables");
        for junction in registry.junctions() {
            ui::dim(&format!(
                "{} ({}, {})",
                junction.table_name, junction.left_column, junction.right_column
            ));
        }
    }

    if !registry.enums().is_empty() {
        ui::section("Enums");
        for descriptor in registry.enums() {
            ui::dim(&format!("{} [{}]", descriptor.name, descriptor.values.join(", ")));
        }
    }

    print_validation(analysis.validation.iter().map(ToString::to_string));
    println!();
}

fn print_validation(messages: impl Iterator<Item = String>) {
    let messages: Vec<String> = messages.collect();
    if messages.is_empty() {
        return;
    }
    ui::section("Relation warnings");
    for message in &messages {
        ui::warning(message);
    }
}

fn print_report(result: &CompileResult, config: &CompilerConfig) {
    let report = &result.report;

    ui::info(&format!(
        "{} aggregates, {} relations, {} junction tables, {} enums",
        result.aggregates, result.relations, result.junctions, result.enums
    ));
    println!();

    ui::section("Artifacts");
    for (kind, count) in &report.counts {
        ui::kind_line(kind.as_str(), count.succeeded, count.failed);
    }

    print_validation(report.validation.iter().map(ToString::to_string));

    let errors: Vec<_> = report.errors().collect();
    if !errors.is_empty() {
        ui::section("Generation failures");
        for failure in errors {
            ui::error(&failure.to_string());
        }
    }
    if report.cancelled {
        println!();
        ui::warning("Cancelled: some artifacts were not generated");
    }

    println!();
    if result.is_clean() {
        ui::success(&format!(
            "{} written, {} unchanged in {}",
            report.written.len(),
            report.unchanged.len(),
            config.out_dir.display()
        ));
    } else {
        ui::dim(&format!(
            "{} written, {} unchanged, {} failed",
            report.written.len(),
            report.unchanged.len(),
            report.total_failed()
        ));
    }
}
