mod config;
mod runs;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use fakeit_generate::model::DEFAULT_SEED;
use fakeit_generate::{
    ConsoleDestination, Destination, DirectoryDestination, FsInputLoader, GenerateOptions,
    GenerationEngine, GenerationError, GeneratorRegistry, OutputFormat, compile_models,
    write_outputs,
};
use fakeit_model::{
    InputOverflow, ModelError, ModelRegistry, Rounding, ValidatedModels, ValidationIssue,
    ValidationReport, load_models, model_json_schema, validate_generators,
};
use thiserror::Error;
use uuid::Uuid;

use config::{ConfigError, DestinationKind, Settings, load_settings};
use runs::{RunContext, RunError, init_logging, start_run, write_outputs_manifest, write_report};

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("run error: {0}")]
    Run(#[from] RunError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "fakeit", version, about = "Model-driven synthetic document generator")]
struct Cli {
    /// Config file (defaults to ./fakeit.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate documents for every model.
    Generate(GenerateArgs),
    /// Validate model declarations without generating.
    Validate(ModelsArgs),
    /// Print the generation order.
    Order(OrderArgs),
    /// Print the JSON Schema for model files.
    Schema(SchemaArgs),
    /// List generator ids available to `base` nodes.
    Generators,
}

#[derive(Args, Debug)]
struct ModelsArgs {
    /// Model file or directory of model files.
    #[arg(value_name = "MODELS")]
    models: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    models: ModelsArgs,
    /// Run seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads per model phase.
    #[arg(long)]
    concurrency: Option<usize>,
    /// Directory input sources are resolved against.
    #[arg(long)]
    inputs_dir: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    #[arg(long, value_enum)]
    destination: Option<DestinationArg>,
    /// Directory for `directory` output.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    rounding: Option<RoundingArg>,
    #[arg(long, value_enum)]
    input_overflow: Option<OverflowArg>,
}

#[derive(Args, Debug)]
struct OrderArgs {
    #[command(flatten)]
    models: ModelsArgs,
    /// Print the graph report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Ndjson,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Ndjson => OutputFormat::Ndjson,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DestinationArg {
    Directory,
    Console,
}

impl From<DestinationArg> for DestinationKind {
    fn from(value: DestinationArg) -> Self {
        match value {
            DestinationArg::Directory => DestinationKind::Directory,
            DestinationArg::Console => DestinationKind::Console,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoundingArg {
    Nearest,
    Floor,
    Ceil,
}

impl From<RoundingArg> for Rounding {
    fn from(value: RoundingArg) -> Self {
        match value {
            RoundingArg::Nearest => Rounding::Nearest,
            RoundingArg::Floor => Rounding::Floor,
            RoundingArg::Ceil => Rounding::Ceil,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverflowArg {
    Clamp,
    Cycle,
}

impl From<OverflowArg> for InputOverflow {
    fn from(value: OverflowArg) -> Self {
        match value {
            OverflowArg::Clamp => InputOverflow::Clamp,
            OverflowArg::Cycle => InputOverflow::Cycle,
        }
    }
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args, cli.config.as_deref(), cli.verbose),
        Command::Validate(args) => {
            init_logging(None, cli.verbose)?;
            run_validate(args)
        }
        Command::Order(args) => {
            init_logging(None, cli.verbose)?;
            run_order(args)
        }
        Command::Schema(args) => run_schema(args),
        Command::Generators => run_generators(),
    }
}

fn apply_overrides(settings: &mut Settings, args: &GenerateArgs) {
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = Some(concurrency);
    }
    if let Some(dir) = &args.inputs_dir {
        settings.inputs_dir = dir.clone();
    }
    if let Some(dir) = &args.run_dir {
        settings.run_dir = dir.clone();
    }
    if let Some(format) = args.format {
        settings.output.format = format.into();
    }
    if let Some(destination) = args.destination {
        settings.output.destination = destination.into();
    }
    if let Some(dir) = &args.out {
        settings.output.directory = dir.clone();
    }
    if let Some(rounding) = args.rounding {
        settings.sampling.rounding = rounding.into();
    }
    if let Some(overflow) = args.input_overflow {
        settings.sampling.input_overflow = overflow.into();
    }
}

fn run_generate(args: GenerateArgs, config: Option<&Path>, verbose: u8) -> Result<(), CliError> {
    let mut settings = load_settings(config)?;
    apply_overrides(&mut settings, &args);

    // Invalid declarations fail here, before a run directory exists.
    let (registry, warnings) = compile_checked(&args.models.models, settings.seed)?;
    registry.resolve_order()?;

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        models: args.models.models.clone(),
        settings,
    };
    let run_paths = start_run(&run_ctx)?;
    init_logging(Some(&run_paths.logs_path), verbose)?;
    log_warnings(&warnings);
    let settings = &run_ctx.settings;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        run_dir = %run_paths.root.display()
    );
    let timer = Instant::now();

    let options = GenerateOptions {
        seed: settings.seed,
        concurrency: settings.concurrency,
        sampling: settings.sampling,
    };
    let engine = GenerationEngine::new(options, FsInputLoader::new(&settings.inputs_dir))
        .with_run_id(run_ctx.run_id.clone());
    let result = engine.run(&registry)?;

    write_report(&run_paths, &result.report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let formatter = settings.output.format.formatter();
    let mut destination: Box<dyn Destination> = match settings.output.destination {
        DestinationKind::Directory => {
            Box::new(DirectoryDestination::new(&settings.output.directory))
        }
        DestinationKind::Console => Box::new(ConsoleDestination),
    };
    let outputs = write_outputs(&result.stores, formatter.as_ref(), destination.as_mut())?;
    write_outputs_manifest(&run_paths, &outputs)?;

    let status = if result.report.is_success() {
        "success"
    } else {
        "partial"
    };
    tracing::info!(
        event = "run_finished",
        status,
        documents = outputs.iter().map(|file| file.documents).sum::<usize>(),
        duration_ms = timer.elapsed().as_millis() as u64
    );

    result.into_result()?;
    Ok(())
}

fn run_validate(args: ModelsArgs) -> Result<(), CliError> {
    let generators = GeneratorRegistry::new();
    let validated = match load_checked(&args.models, &generators) {
        Ok(validated) => validated,
        Err(CliError::Model(ModelError::Invalid(report))) => {
            print_report(&report)?;
            return Err(ModelError::Invalid(report).into());
        }
        Err(err) => return Err(err),
    };

    // Binding params and resolving the order catch what the structural pass cannot.
    let registry = compile_models(&validated.models, &generators, DEFAULT_SEED)?;
    let order = registry.resolve_order()?;

    let mut stdout = std::io::stdout().lock();
    for warning in &validated.warnings {
        writeln!(stdout, "warning {} at {}: {}", warning.code, warning.path, warning.message)?;
    }
    writeln!(
        stdout,
        "ok: {} models ({})",
        registry.len(),
        order.names().join(" -> ")
    )?;
    Ok(())
}

fn run_order(args: OrderArgs) -> Result<(), CliError> {
    let (registry, warnings) = compile_checked(&args.models.models, DEFAULT_SEED)?;
    log_warnings(&warnings);
    let mut stdout = std::io::stdout().lock();
    if args.json {
        let report = registry.graph()?.report();
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    let order = registry.resolve_order()?;
    for (position, spec) in order.order.iter().enumerate() {
        let deps: Vec<&str> = spec.dependency_names().collect();
        if deps.is_empty() {
            writeln!(stdout, "{:>3}. {}", position + 1, spec.name())?;
        } else {
            writeln!(
                stdout,
                "{:>3}. {} (after {})",
                position + 1,
                spec.name(),
                deps.join(", ")
            )?;
        }
    }
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&model_json_schema())?;
    match args.out {
        Some(path) => std::fs::write(path, format!("{schema}\n"))?,
        None => writeln!(std::io::stdout().lock(), "{schema}")?,
    }
    Ok(())
}

fn run_generators() -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    for id in GeneratorRegistry::new().ids() {
        writeln!(stdout, "{id}")?;
    }
    Ok(())
}

/// Load declarations and check generator ids against the catalogue.
fn load_checked(path: &Path, generators: &GeneratorRegistry) -> Result<ValidatedModels, CliError> {
    let validated = load_models(path)?;
    let report = validate_generators(&validated.models, |id| generators.contains(id));
    if !report.is_ok() {
        return Err(ModelError::Invalid(report).into());
    }
    Ok(validated)
}

fn compile_checked(
    path: &Path,
    seed: u64,
) -> Result<(ModelRegistry, Vec<ValidationIssue>), CliError> {
    let generators = GeneratorRegistry::new();
    let validated = load_checked(path, &generators)?;
    let registry = compile_models(&validated.models, &generators, seed)?;
    Ok((registry, validated.warnings))
}

fn log_warnings(warnings: &[ValidationIssue]) {
    for warning in warnings {
        tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }
}

fn print_report(report: &ValidationReport) -> Result<(), CliError> {
    let mut stderr = std::io::stderr().lock();
    for issue in report.errors.iter().chain(&report.warnings) {
        writeln!(
            stderr,
            "{:?} {} at {}: {}",
            issue.severity, issue.code, issue.path, issue.message
        )?;
        if let Some(hint) = &issue.hint {
            writeln!(stderr, "  hint: {hint}")?;
        }
    }
    Ok(())
}
