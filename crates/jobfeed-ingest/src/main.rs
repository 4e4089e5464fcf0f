//! jobfeed - job posting ingestion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobfeed_common::logging::{init_logging, LogConfig, LogLevel};
use jobfeed_ingest::config::IngestConfig;
use jobfeed_ingest::document::RawDocument;
use jobfeed_ingest::normalize::RecordNormalizer;
use jobfeed_ingest::pipeline::Pipeline;
use jobfeed_ingest::sink::{JsonLinesSink, RecordSink};
use jobfeed_ingest::stages::{JsonFileStore, StageTracker};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "jobfeed")]
#[command(author, version, about = "Job posting ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for the stage snapshot and raw postings
    #[arg(long, global = true, env = "JOBFEED_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find posting ids on listing pages
    Discover {
        #[arg(long, default_value_t = 1)]
        from_page: u32,

        #[arg(long, default_value_t = 1)]
        to_page: u32,
    },

    /// Download found postings
    Download {
        /// Maximum number of postings to download
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Normalize downloaded postings and export them
    Export {
        #[command(flatten)]
        target: ExportTarget,

        /// Maximum number of postings to export
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Discover, download and export in one go
    Run {
        #[arg(long, default_value_t = 1)]
        from_page: u32,

        #[arg(long, default_value_t = 1)]
        to_page: u32,

        #[command(flatten)]
        target: ExportTarget,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the normalized record and diagnostics for one raw posting
    Normalize {
        /// Raw posting JSON file
        path: PathBuf,

        /// Posting id, defaults to the file name
        #[arg(long)]
        id: Option<String>,
    },

    /// Show how many postings are in each stage
    Status,
}

#[derive(clap::Args, Debug)]
struct ExportTarget {
    /// JSON Lines output file
    #[arg(short, long, default_value = "./local/offers.jsonl")]
    output: PathBuf,

    /// Export into PostgreSQL instead (needs the `database` feature)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("jobfeed")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = IngestConfig::from_env()?;
    if let Some(dir) = cli.data_dir.clone() {
        config = config.with_data_dir(dir);
    }
    let show_progress = !cli.no_progress;

    match cli.command {
        Command::Discover { from_page, to_page } => {
            let mut pipeline = Pipeline::from_config(&config)?.with_progress(show_progress);
            pipeline.discover(from_page..=to_page).await?;
        },
        Command::Download { limit } => {
            let mut pipeline = Pipeline::from_config(&config)?.with_progress(show_progress);
            pipeline.download(limit).await?;
        },
        Command::Export { target, limit } => {
            let sink = open_sink(&target).await?;
            let mut pipeline = Pipeline::from_config(&config)?.with_progress(show_progress);
            pipeline.export(sink.as_ref(), limit).await?;
        },
        Command::Run {
            from_page,
            to_page,
            target,
            limit,
        } => {
            let sink = open_sink(&target).await?;
            let mut pipeline = Pipeline::from_config(&config)?.with_progress(show_progress);
            pipeline.run(from_page..=to_page, limit, sink.as_ref()).await?;
        },
        Command::Normalize { path, id } => {
            normalize_file(&config, &path, id)?;
            return Ok(());
        },
        Command::Status => {
            let tracker = StageTracker::open(JsonFileStore::new(config.stages_path()))?;
            let counts = tracker.counts();
            println!("found:      {}", counts.found);
            println!("downloaded: {}", counts.downloaded);
            println!("exported:   {}", counts.exported);
            return Ok(());
        },
    }

    info!("Ingestion complete");
    Ok(())
}

async fn open_sink(target: &ExportTarget) -> Result<Box<dyn RecordSink>> {
    match &target.database_url {
        Some(url) => open_database_sink(url).await,
        None => {
            info!(path = %target.output.display(), "Exporting to JSON Lines");
            Ok(Box::new(JsonLinesSink::new(target.output.clone())))
        },
    }
}

#[cfg(feature = "database")]
async fn open_database_sink(url: &str) -> Result<Box<dyn RecordSink>> {
    let sink = jobfeed_ingest::sink::PostgresSink::connect(url)
        .await
        .context("Failed to connect to the offers database")?;
    info!("Exporting to PostgreSQL");
    Ok(Box::new(sink))
}

#[cfg(not(feature = "database"))]
async fn open_database_sink(_url: &str) -> Result<Box<dyn RecordSink>> {
    anyhow::bail!("jobfeed was built without the `database` feature")
}

fn normalize_file(config: &IngestConfig, path: &Path, id: Option<String>) -> Result<()> {
    let id = match id {
        Some(id) => id,
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .context("Cannot derive a posting id from the file name, pass --id")?,
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = RawDocument::parse(id, &text)?;

    let normalized = RecordNormalizer::new(config.posting_base_url.clone()).normalize(&doc);
    let output = serde_json::json!({
        "record": normalized.record,
        "diagnostics": normalized.diagnostics,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
