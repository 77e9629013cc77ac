//! # Docket CLI Application
//!
//! Command-line interface for the cause-list ingestion pipeline.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `run`: discover, download, structure and store one or more dates
//!   - `process`: structure and store documents already in a date directory
//!   - `dates`: list dates with stored cause lists
//!   - `show`: print one date's cause lists as JSON
//!   - `tag`: apply the rule-based tagger to stored cases
//!   - `tags`: list tags with usage counts
//!   - `stats`: row counts per table
//!
//! The process exits non-zero when a date ends `FAILED` or when every
//! attempt to persist a document failed.

mod telemetry;

use anyhow::{Context, anyhow};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use docket::extract::{Extractor, GeminiConfig, MockExtractor};
use docket::fetcher::{Fetcher, FetcherConfig};
use docket::pipeline::{Pipeline, PipelineConfig, ProgressEvent, RunReport};
use docket::profile::CourtProfile;
use docket::store::Repository;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::instrument;

const DATABASE_ENV: &str = "DOCKET_DATABASE";
const DEFAULT_DATABASE: &str = "docket.db";

#[derive(Parser)]
#[command(author, version, about = "Court cause-list ingestion pipeline", long_about = None)]
struct Cli {
    /// Directory for a daily rolling log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover, download, structure and store cause lists
    Run(RunArgs),

    /// Structure and store documents already in a date directory
    Process(ProcessArgs),

    /// List dates with stored cause lists, newest first
    Dates(StoreArgs),

    /// Print the cause lists of a date as JSON
    Show(ShowArgs),

    /// Apply the rule-based tagger to every stored case
    Tag(StoreArgs),

    /// List tags with usage counts
    Tags(StoreArgs),

    /// Print row counts per table
    Stats(StoreArgs),
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Database path (default: $DOCKET_DATABASE or docket.db)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Court profile JSON file (default: Delhi High Court)
    #[arg(long)]
    profile: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Target date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Number of dates to run, counting back from --date
    #[arg(long, default_value = "1")]
    days: u32,

    /// Skip discovery and downloads; use documents already on disk
    #[arg(long)]
    no_scrape: bool,

    /// Skip structuring and storage
    #[arg(long)]
    no_process: bool,

    /// Run downloads and structuring one at a time
    #[arg(long)]
    sequential: bool,

    /// Concurrent downloads
    #[arg(long, default_value = "5")]
    download_workers: usize,

    /// Concurrent structuring calls
    #[arg(long, default_value = "3")]
    processing_workers: usize,

    /// Apply the rule-based tagger after storing
    #[arg(long)]
    auto_tag: bool,

    /// Root of the data directory
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Date directory holding the documents
    #[arg(required = true)]
    dir: PathBuf,

    /// Apply the rule-based tagger after storing
    #[arg(long)]
    auto_tag: bool,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Date, YYYY-MM-DD
    #[arg(required = true)]
    date: NaiveDate,

    #[command(flatten)]
    store: StoreArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing_subscriber(cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::Process(args) => process_command(args).await,
        Commands::Dates(args) => dates_command(args).await,
        Commands::Show(args) => show_command(args).await,
        Commands::Tag(args) => tag_command(args).await,
        Commands::Tags(args) => tags_command(args).await,
        Commands::Stats(args) => stats_command(args).await,
    }
}

#[instrument]
async fn run_command(args: RunArgs) -> anyhow::Result<()> {
    let profile = load_profile(args.store.profile.as_deref())?;
    let database = database_path(args.store.database.as_deref())?;

    let start = args.date.unwrap_or_else(|| Local::now().date_naive());
    let dates: Vec<NaiveDate> = (0..args.days.max(1))
        .map(|offset| start - ChronoDuration::days(i64::from(offset)))
        .collect();

    let config = PipelineConfig::builder()
        .output_dir(&args.output_dir)
        .parallel(!args.sequential)
        .download_workers(args.download_workers)
        .processing_workers(args.processing_workers)
        .scrape(!args.no_scrape)
        .process(!args.no_process)
        .auto_tag(args.auto_tag)
        .build();

    println!(
        "Running {} for {} date(s) from {}",
        profile.name,
        dates.len(),
        start
    );

    let report = if args.no_process {
        // Extraction is never called when processing is off
        let repo = Repository::new_from_path(&database)
            .await
            .with_context(|| format!("opening database {}", database))?;
        let fetcher = Fetcher::new(FetcherConfig::default())?;
        let pipeline = Pipeline::new(profile, fetcher, MockExtractor::new(), repo, config);
        run_with_progress(pipeline, |p| async move { p.run(&dates).await }).await
    } else {
        let pipeline = Pipeline::connect(
            profile,
            FetcherConfig::default(),
            GeminiConfig::from_env()?,
            &database,
            config,
        )
        .await?;
        run_with_progress(pipeline, |p| async move { p.run(&dates).await }).await
    };

    print_report(&report);
    exit_status(&report)
}

#[instrument]
async fn process_command(args: ProcessArgs) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        return Err(anyhow!("{} is not a directory", args.dir.display()));
    }
    let profile = load_profile(args.store.profile.as_deref())?;
    let database = database_path(args.store.database.as_deref())?;

    let config = PipelineConfig::builder().auto_tag(args.auto_tag).build();
    let pipeline = Pipeline::connect(
        profile,
        FetcherConfig::default(),
        GeminiConfig::from_env()?,
        &database,
        config,
    )
    .await?;
    let dir = args.dir.clone();
    let report =
        run_with_progress(pipeline, |p| async move { p.process_directory(&dir).await }).await;

    print_report(&report);
    exit_status(&report)
}

#[instrument]
async fn dates_command(args: StoreArgs) -> anyhow::Result<()> {
    let profile = load_profile(args.profile.as_deref())?;
    let repo = open_repository(args.database.as_deref()).await?;

    let dates = repo.get_available_dates(&profile.code).await?;
    if dates.is_empty() {
        println!("No cause lists stored for {}", profile.code);
    }
    for date in dates {
        println!("{}", date);
    }
    Ok(())
}

#[instrument]
async fn show_command(args: ShowArgs) -> anyhow::Result<()> {
    let profile = load_profile(args.store.profile.as_deref())?;
    let repo = open_repository(args.store.database.as_deref()).await?;

    let lists = repo.get_cause_lists_by_date(&profile.code, args.date).await?;
    println!("{}", serde_json::to_string_pretty(&lists)?);
    Ok(())
}

#[instrument]
async fn tag_command(args: StoreArgs) -> anyhow::Result<()> {
    let repo = open_repository(args.database.as_deref()).await?;

    let summary = docket::tagging::apply_auto_tags(&repo).await?;
    println!(
        "Tagged {} cases: {} tags added, {} failures",
        summary.cases_seen, summary.tags_added, summary.failures
    );
    Ok(())
}

#[instrument]
async fn tags_command(args: StoreArgs) -> anyhow::Result<()> {
    let repo = open_repository(args.database.as_deref()).await?;

    let tags = repo.list_tags().await?;
    if tags.is_empty() {
        println!("No tags");
    }
    for tag in tags {
        println!("{:<32} {}", tag.name, tag.count);
    }
    Ok(())
}

#[instrument]
async fn stats_command(args: StoreArgs) -> anyhow::Result<()> {
    let repo = open_repository(args.database.as_deref()).await?;

    let counts = repo.table_counts().await?;
    println!("courts:      {}", counts.courts);
    println!("benches:     {}", counts.benches);
    println!("cause_lists: {}", counts.cause_lists);
    println!("cases:       {}", counts.cases);
    println!("tags:        {}", counts.tags);
    println!("case_tags:   {}", counts.case_tags);
    Ok(())
}

/// Drive a pipeline future while a spinner follows its progress events
async fn run_with_progress<E, F, Fut>(pipeline: Pipeline<E>, drive: F) -> RunReport
where
    E: Extractor + 'static,
    F: FnOnce(Pipeline<E>) -> Fut,
    Fut: std::future::Future<Output = RunReport>,
{
    let (progress_sender, mut progress_receiver) = mpsc::channel(100);
    let pipeline = pipeline.with_progress(progress_sender);

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let progress_handle = tokio::spawn({
        let spinner = spinner.clone();
        async move {
            while let Some(event) = progress_receiver.recv().await {
                match event {
                    ProgressEvent::Stage { date, stage } => {
                        spinner.set_message(format!("{} {}", date, stage))
                    }
                    ProgressEvent::Document { date, name } => {
                        spinner.set_message(format!("{} {}", date, name))
                    }
                }
            }
            spinner.finish_and_clear();
        }
    });

    // The pipeline owns the sender; dropping it inside `drive` ends the spinner task
    let report = drive(pipeline).await;
    let _ = progress_handle.await;
    report
}

fn print_report(report: &RunReport) {
    for date in &report.dates {
        let c = &date.counts;
        println!(
            "{} {:<7} discovered {:>3}  downloaded {:>3}  structured {:>3}  persisted {:>3}  failures {:>3}",
            date.date,
            date.stage.to_string(),
            c.discovered,
            c.downloaded,
            c.structured,
            c.persisted,
            c.failures
        );
        if let Some(error) = &date.error {
            println!("    {}", error);
        }
    }
    if let Some(tagging) = &report.tagging {
        println!(
            "Tagged {} cases: {} tags added",
            tagging.cases_seen, tagging.tags_added
        );
    }
}

fn exit_status(report: &RunReport) -> anyhow::Result<()> {
    if report.has_failed_date() {
        return Err(anyhow!("one or more dates failed"));
    }
    if report.storage_unavailable() {
        return Err(anyhow!("no document could be persisted; is the database reachable?"));
    }
    Ok(())
}

fn load_profile(path: Option<&Path>) -> anyhow::Result<CourtProfile> {
    let profile = match path {
        Some(path) => CourtProfile::from_json_file(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => CourtProfile::default(),
    };
    profile.validate()?;
    Ok(profile)
}

fn database_path(path: Option<&Path>) -> anyhow::Result<String> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os(DATABASE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
    };
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("database path {} is not UTF-8", path.display()))
}

async fn open_repository(path: Option<&Path>) -> anyhow::Result<Repository> {
    let database = database_path(path)?;
    Repository::new_from_path(&database)
        .await
        .with_context(|| format!("opening database {}", database))
}
