#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the court cause-list retrieval tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use causelist_captcha::anti_captcha::AntiCaptchaSolver;
use causelist_cli_utils::{IndicatifProgress, MultiProgress, init_logger};
use causelist_scraper::executor::RequestExecutor;
use causelist_scraper::session::ReqwestSession;
use causelist_source::config::Config;
use causelist_source::pipeline::{self, Portal, RunContext, RunOptions};
use causelist_source::registry::{DEFAULT_SOURCE, default_config};
use causelist_source::sink::CsvSink;
use causelist_source_models::CourtOutcome;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Directory CSV files are written to unless `--output-dir` is given.
const DEFAULT_OUTPUT_DIR: &str = "DATA";

#[derive(Parser)]
#[command(name = "causelist", about = "Court cause-list retrieval tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every court's cause list for a hearing date (default)
    Run(RunArgs),
    /// List configured sources
    Sources {
        /// Config file to read instead of the built-in one
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Bootstrap a session and print the court list
    Courts(SourceArgs),
}

#[derive(Args, Default)]
struct SourceArgs {
    /// Config file to read instead of the built-in one
    #[arg(long)]
    config: Option<PathBuf>,
    /// Source to process (default: `ecourtservices.kehakiman.gov`)
    #[arg(long)]
    source: Option<String>,
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Directory to write CSV files into (default: `DATA`)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Hearing date as YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Comma-separated list of court IDs to process
    #[arg(long, value_delimiter = ',')]
    courts: Option<Vec<String>>,
    /// Maximum number of courts to process
    #[arg(long)]
    limit: Option<usize>,
    /// Attempts per request (overrides `http.max_attempts`)
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let multi = init_logger();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(args, &multi).await,
        Commands::Sources { config } => list_sources(config.as_deref()),
        Commands::Courts(args) => list_courts(&args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            Ok(Config::load(path)?)
        }
        None => Ok(default_config()),
    }
}

async fn run(args: RunArgs, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.source.config.as_deref())?;
    let source_name = args.source.source.as_deref().unwrap_or(DEFAULT_SOURCE);
    let source = config.source(source_name)?;
    let api_key = config.api_key()?;

    let mut executor_config = config.http.executor_config();
    if let Some(max_attempts) = args.max_attempts {
        executor_config.max_attempts = max_attempts;
    }

    let session = ReqwestSession::new(&config.http.session_options())?;
    let executor = RequestExecutor::new(executor_config);
    let solver = AntiCaptchaSolver::new(&config.captcha, &api_key)?;
    let sink = CsvSink::new(args.output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)));
    let hearing_date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let progress = IndicatifProgress::courts_bar(multi, &format!("{source_name}: bootstrapping"));

    let ctx = RunContext {
        portal: Portal {
            name: source_name,
            source,
            session: &session,
            executor: &executor,
        },
        solver: &solver,
        sink: &sink,
        hearing_date,
        progress,
    };
    let options = RunOptions {
        court_ids: args.courts,
        limit: args.limit,
    };

    let start = Instant::now();
    let report = pipeline::run(&ctx, &options).await?;

    for entry in &report.courts {
        if let CourtOutcome::Skipped { stage, reason } = &entry.outcome {
            log::warn!("[{}] skipped at {stage}: {reason}", entry.court.name);
        }
    }
    log::info!(
        "Run for {} complete in {:.1}s: {} saved, {} skipped, output in {}",
        report.hearing_date.format("%Y-%m-%d"),
        start.elapsed().as_secs_f64(),
        report.saved_count(),
        report.skipped_count(),
        sink.output_dir().display()
    );

    Ok(())
}

fn list_sources(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    println!("{:<36} HOMEPAGE", "SOURCE");
    println!("{}", "-".repeat(80));
    for (name, source) in &config.source {
        println!("{name:<36} {}", source.homepage);
    }
    Ok(())
}

async fn list_courts(args: &SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let source_name = args.source.as_deref().unwrap_or(DEFAULT_SOURCE);
    let source = config.source(source_name)?;

    let session = ReqwestSession::new(&config.http.session_options())?;
    let executor = RequestExecutor::new(config.http.executor_config());
    let portal = Portal {
        name: source_name,
        source,
        session: &session,
        executor: &executor,
    };

    pipeline::bootstrap(&portal).await?;
    let courts = pipeline::fetch_courts(&portal).await?;

    println!("{:<10} NAME", "ID");
    println!("{}", "-".repeat(60));
    for court in &courts {
        println!("{:<10} {}", court.id, court.name);
    }
    Ok(())
}
