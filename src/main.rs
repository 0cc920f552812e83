use anyhow::Context;
use clap::Parser;
use healthstat_scraper::config::Config;
use healthstat_scraper::constants::DEFAULT_DATA_DIR;
use healthstat_scraper::infra::http_client::ReqwestHttp;
use healthstat_scraper::observability::{self, metrics, LogOptions};
use healthstat_scraper::pipeline::ingestion::Fetcher;
use healthstat_scraper::pipeline::status::RunStatus;
use healthstat_scraper::pipeline::{Pipeline, RunOptions, StorageLayout};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Refresh the data files for the Montréal health statistics dashboard.
#[derive(Parser)]
#[command(name = "healthstat-scraper")]
#[command(version)]
struct Cli {
    /// Storage directory holding sources/, processed/ and the run lock
    #[arg(short = 'd', long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Do not fetch remote files, only process local copies
    #[arg(short = 'l', long)]
    local: bool,

    /// Increase verbosity
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show debugging information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Append progress to LOG_FILE
    #[arg(short = 'L', long)]
    log_file: Option<PathBuf>,

    /// TOML configuration overriding the built-in sources and schema
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write Prometheus text metrics to this file when the run ends
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Print the last run status and whether a run is in progress, then exit.
    /// Never touches the run lock.
    #[arg(long)]
    status: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables (RUST_LOG may live in .env)
    dotenv::dotenv().ok();

    let _log_guard = observability::init_logging(&LogOptions {
        verbose: cli.verbose,
        debug: cli.debug,
        log_file: cli.log_file.clone(),
    })
    .context("failed to initialize logging")?;

    if cli.status {
        return print_status(&cli.data_dir);
    }

    let metrics_handle = match &cli.metrics_file {
        Some(_) => Some(metrics::install()?),
        None => None,
    };

    let result = run(&cli);

    if let (Some(handle), Some(path)) = (&metrics_handle, &cli.metrics_file) {
        if let Err(e) = metrics::write_snapshot(handle, path) {
            error!("Could not write metrics to {}: {}", path.display(), e);
        }
    }

    if let Err(e) = &result {
        error!("Fatal: {:#}", e);
    }
    result
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let http = ReqwestHttp::new(config.fetch.timeout(), &config.fetch.user_agent)?;
    let fetcher = Fetcher::new(Box::new(http), config.fetch.policy());

    let pipeline = Pipeline::new(config, StorageLayout::new(&cli.data_dir), fetcher);
    let report = pipeline.run(&RunOptions {
        local_only: cli.local,
    })?;

    info!(
        "Refreshed {} sources ({} failed), wrote {} tables",
        report.sources.len(),
        report.sources_failed(),
        report.tables_written()
    );
    Ok(())
}

fn print_status(data_dir: &Path) -> anyhow::Result<()> {
    match RunStatus::read(data_dir)? {
        Some(status) => {
            println!("{}", serde_json::to_string_pretty(&status)?);
            println!("running: {}", status.is_running());
        }
        None => println!("no run recorded in {}", data_dir.display()),
    }
    Ok(())
}
