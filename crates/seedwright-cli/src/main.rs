mod config;
mod registry;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use seedwright_adapter::{AdapterError, read_data_model};
use seedwright_core::{DataModel, Error as CoreError, build_dependency_report, validate_data_model};
use seedwright_generate::{GenerationError, Seeder};
use seedwright_plan::{ValidationReport, load_plan, plan_json_schema, validate_config};
use thiserror::Error;
use uuid::Uuid;

use config::{ConfigError, SeedwrightConfig};
use registry::{
    RegistryError, RunContext, init_console_logging, init_run_logging, start_run, write_report,
    write_sql,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("validation failed with {0} error(s)")]
    ValidationFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "seedwright", version, about = "Seedwright CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a plan and write the SQL for it into a new run directory.
    Generate(GenerateArgs),
    /// Check a data model, and optionally a plan and config, without generating.
    Validate(ValidateArgs),
    /// Print a JSON Schema.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to dataModel.json.
    #[arg(long)]
    data_model: PathBuf,
    /// Path to the plan document.
    #[arg(long)]
    plan: PathBuf,
    /// Path to seedwright.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    output: PathBuf,
    /// Run seed; overrides the config file.
    #[arg(long)]
    seed: Option<String>,
    /// Attempts per record before a unique collision fails; overrides the config file.
    #[arg(long)]
    max_unique_attempts: Option<u32>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[arg(long)]
    data_model: PathBuf,
    #[arg(long)]
    plan: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    #[arg(long, value_enum)]
    kind: SchemaKind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaKind {
    DataModel,
    Plan,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<SeedwrightConfig, CliError> {
    match path {
        Some(path) => Ok(SeedwrightConfig::load(path)?),
        None => Ok(SeedwrightConfig::default()),
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, CliError> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

async fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let GenerateArgs {
        data_model,
        plan,
        config,
        output,
        seed,
        max_unique_attempts,
    } = args;

    let settings = load_config(config.as_deref())?;
    let options = settings.generate_options(seed, max_unique_attempts);

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: output,
        data_model: data_model.clone(),
        plan: plan.clone(),
        config,
        options: options.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, run_seed = %options.seed);
    let timer = Instant::now();

    let data_model = read_data_model(&data_model)?;
    tracing::info!(event = "data_model_loaded", models = data_model.models.len());

    let validated = load_plan(&read_json(&plan)?, &data_model)
        .map_err(|report| CliError::InvalidPlan(report.render_errors()))?;
    for issue in &validated.warnings {
        tracing::warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
    tracing::info!(event = "plan_loaded", entries = validated.plan.entries.len());

    let SeedwrightConfig {
        models,
        fingerprint,
        ..
    } = settings;
    let mut seeder = Seeder::new(data_model, options)?
        .with_fingerprint(fingerprint)?
        .with_user_models(models)?;

    let store = seeder.generate(&validated.plan).await?;
    let mut statements = seeder.to_sql(&store)?;
    statements.extend(seeder.sequence_sync_statements());

    write_sql(&run_paths, &statements)?;
    tracing::info!(event = "sql_written", path = %run_paths.sql_path.display(), statements = statements.len());

    write_report(&run_paths, seeder.report())?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        status = "success",
        rows = store.len(),
        duration_ms = duration_ms
    );

    println!("{}", run_paths.root.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_console_logging()?;

    let data_model = DataModel::from_json_str(&fs::read_to_string(&args.data_model)?)?;
    let mut errors = 0;

    if let Err(err) = validate_data_model(&data_model) {
        println!("error invalid_data_model: {err}");
        return Err(CliError::ValidationFailed(1));
    }
    println!("data model ok: {} models", data_model.models.len());

    let dependencies = build_dependency_report(&data_model);
    println!("{}", serde_json::to_string_pretty(&dependencies)?);
    if let Some(cycle) = &dependencies.cycle {
        println!("error unbreakable_cycle: {}", cycle.join(", "));
        errors += 1;
    }

    let settings = load_config(args.config.as_deref())?;
    if args.config.is_some() {
        let report = validate_config(&settings.fingerprint, &settings.models, &data_model);
        errors += print_issues("config", &report);
    }

    if let Some(plan) = &args.plan {
        match load_plan(&read_json(plan)?, &data_model) {
            Ok(validated) => {
                let report = ValidationReport {
                    errors: Vec::new(),
                    warnings: validated.warnings,
                };
                print_issues("plan", &report);
            }
            Err(report) => errors += print_issues("plan", &report),
        }
    }

    if errors > 0 {
        return Err(CliError::ValidationFailed(errors));
    }
    Ok(())
}

/// Print one line per issue and return the error count.
fn print_issues(subject: &str, report: &ValidationReport) -> usize {
    for issue in &report.errors {
        println!("error {} {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            println!("  hint: {hint}");
        }
    }
    for issue in &report.warnings {
        println!("warning {} {}: {}", issue.code, issue.path, issue.message);
    }
    println!(
        "{subject}: {} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );
    report.errors.len()
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = match args.kind {
        SchemaKind::DataModel => serde_json::to_string_pretty(&schemars::schema_for!(DataModel))?,
        SchemaKind::Plan => serde_json::to_string_pretty(&plan_json_schema())?,
    };
    println!("{schema}");
    Ok(())
}
