#![forbid(unsafe_code)]

mod git;
mod snapshot;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand, ValueEnum};
use dbt_lens_core::{
    ExitCode, MachineError, ENV_DBT_LENS_LOG_JSON, ENV_DBT_LENS_LOG_LEVEL,
};
use dbt_lens_ingest::{load_artifacts, IngestEvent, LoadOptions};
use dbt_lens_model::{
    check_minimum_coverage, check_no_regression, CoverageDiff, CoverageFormat, CoverageReport,
    CoverageType,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode as ProcessExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dbt-lens")]
#[command(version)]
#[command(about = "Compute and compare dbt documentation/test coverage")]
#[command(
    after_help = "Environment:\n  DBT_LENS_LOG_LEVEL   Log verbosity override\n  DBT_LENS_LOG_JSON    Emit logs as JSON when set to 1/true"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Compute {
        #[arg(value_enum)]
        cov_type: CovTypeCli,
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
        #[arg(long)]
        run_artifacts_dir: Option<PathBuf>,
        #[arg(long, default_value = "coverage.json")]
        cov_report: PathBuf,
        #[arg(long)]
        cov_fail_under: Option<f64>,
        #[arg(long)]
        cov_fail_compare: Option<PathBuf>,
        #[arg(long)]
        model_path_filter: Vec<String>,
        #[arg(long, value_enum, default_value_t = CovFormatCli::String)]
        cov_format: CovFormatCli,
    },
    Compare {
        report: PathBuf,
        compare_report: PathBuf,
    },
    CompareGit {
        commit: String,
        #[arg(long, default_value = "coverage.json")]
        cov_report: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CovTypeCli {
    Doc,
    Test,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CovFormatCli {
    String,
    Markdown,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError::usage(&format!(
                    "invalid command line arguments: {err}"
                )));
            }
        },
    };
    init_tracing(cli.verbose);

    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;

    match command {
        Commands::Compute {
            cov_type,
            project_dir,
            run_artifacts_dir,
            cov_report,
            cov_fail_under,
            cov_fail_compare,
            model_path_filter,
            cov_format,
        } => run_compute(
            ComputeArgs {
                cov_type: cov_type.into(),
                project_dir,
                run_artifacts_dir,
                cov_report,
                cov_fail_under,
                cov_fail_compare,
                model_path_filter,
                cov_format: cov_format.into(),
            },
            cli.json,
        ),
        Commands::Compare {
            report,
            compare_report,
        } => run_compare(&report, &compare_report),
        Commands::CompareGit { commit, cov_report } => run_compare_git(&commit, &cov_report),
    }
}

impl From<CovTypeCli> for CoverageType {
    fn from(value: CovTypeCli) -> Self {
        match value {
            CovTypeCli::Doc => CoverageType::Doc,
            CovTypeCli::Test => CoverageType::Test,
        }
    }
}

impl From<CovFormatCli> for CoverageFormat {
    fn from(value: CovFormatCli) -> Self {
        match value {
            CovFormatCli::String => CoverageFormat::StringTable,
            CovFormatCli::Markdown => CoverageFormat::MarkdownTable,
        }
    }
}

fn init_tracing(verbose: u8) {
    if verbose >= 2 {
        std::env::set_var(ENV_DBT_LENS_LOG_LEVEL, "trace");
    } else if verbose == 1 {
        std::env::set_var(ENV_DBT_LENS_LOG_LEVEL, "debug");
    }
    let filter = std::env::var(ENV_DBT_LENS_LOG_LEVEL)
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let log_json = matches!(
        std::env::var(ENV_DBT_LENS_LOG_JSON).as_deref(),
        Ok("1") | Ok("true")
    );
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

struct ComputeArgs {
    cov_type: CoverageType,
    project_dir: PathBuf,
    run_artifacts_dir: Option<PathBuf>,
    cov_report: PathBuf,
    cov_fail_under: Option<f64>,
    cov_fail_compare: Option<PathBuf>,
    model_path_filter: Vec<String>,
    cov_format: CoverageFormat,
}

fn run_compute(args: ComputeArgs, machine_json: bool) -> Result<(), CliError> {
    let loaded = load_artifacts(&LoadOptions {
        project_dir: args.project_dir.clone(),
        run_artifacts_dir: args.run_artifacts_dir.clone(),
    })
    .map_err(|e| CliError::dependency(&e.to_string()))?;
    surface_events(&loaded.events);

    let mut catalog = loaded.catalog;
    if !args.model_path_filter.is_empty() {
        catalog = catalog.filter_by_path(&args.model_path_filter);
        info!(tables = catalog.tables.len(), "filtered catalog by model path");
        if catalog.tables.is_empty() {
            return Err(CliError::validation(
                "no tables left after filtering; check --model-path-filter",
            ));
        }
    }

    let report = CoverageReport::from_catalog(&catalog, args.cov_type);
    if machine_json {
        println!("{}", snapshot::render_document(&report)?);
    } else {
        print!("{}", report.render(args.cov_format));
    }
    snapshot::write_report(&report, &args.cov_report)?;

    if let Some(threshold) = args.cov_fail_under {
        check_minimum_coverage(&report, threshold)?;
    }
    if let Some(baseline_path) = &args.cov_fail_compare {
        let baseline = snapshot::read_report(baseline_path)?;
        let diff = CoverageDiff::new(Some(&baseline), &report)?;
        print!("{}", diff.summary());
        print!("{}", diff.new_misses_summary());
        check_no_regression(&diff)?;
    }
    Ok(())
}

fn run_compare(report_path: &Path, compare_path: &Path) -> Result<(), CliError> {
    let current = snapshot::read_report(report_path)?;
    let previous = snapshot::read_report(compare_path)?;
    let diff = CoverageDiff::new(Some(&previous), &current)?;
    print!("{}", diff.summary());
    print!("{}", diff.new_misses_summary());
    Ok(())
}

fn run_compare_git(commit: &str, cov_report: &Path) -> Result<(), CliError> {
    let old_raw = git::show_file(commit, cov_report).map_err(|e| CliError::dependency(&e))?;
    let previous = CoverageReport::from_json(&old_raw)?;
    let current = snapshot::read_report(cov_report)?;
    let diff = CoverageDiff::new(Some(&previous), &current)?;
    print!("{}", diff.summary());
    print!("{}", diff.new_misses_summary());
    Ok(())
}

fn surface_events(events: &[IngestEvent]) {
    for event in events {
        if event.name == "manifest.schema_version.unsupported" {
            warn!(
                fields = ?event.fields,
                "unsupported manifest.json schema version, unexpected behavior can occur"
            );
        } else {
            debug!(name = %event.name, fields = ?event.fields, "ingest event");
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    fn usage(message: &str) -> Self {
        Self::with_exit(ExitCode::Usage, "usage_error", message)
    }

    fn validation(message: &str) -> Self {
        Self::with_exit(ExitCode::Validation, "validation_error", message)
    }

    fn dependency(message: &str) -> Self {
        Self::with_exit(ExitCode::DependencyFailure, "dependency_failure", message)
    }

    fn internal(message: &str) -> Self {
        Self::with_exit(ExitCode::Internal, "internal_error", message)
    }

    fn with_exit(exit_code: ExitCode, code: &str, message: &str) -> Self {
        Self {
            exit_code,
            machine: MachineError::new(code, message).with_detail("exit", exit_code.as_str()),
        }
    }
}

impl From<dbt_lens_model::CoverageError> for CliError {
    fn from(err: dbt_lens_model::CoverageError) -> Self {
        use dbt_lens_model::CoverageError;
        let code = match &err {
            CoverageError::UnsupportedCoverageType(_) => "unsupported_coverage_type",
            CoverageError::IncompatibleReports(_) => "incompatible_reports",
            CoverageError::MalformedDocument(_) => "malformed_document",
            CoverageError::BelowThreshold { .. } => "below_threshold",
            CoverageError::CoverageRegressed { .. } => "coverage_regressed",
        };
        Self::with_exit(ExitCode::Validation, code, &err.to_string())
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}
