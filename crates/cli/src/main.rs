mod prompt;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sha2::{Digest, Sha256};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use harvester_core::{
    load_config, load_default_config, metrics, validate_config, Config, MovieSource,
    PersistentCache, RealDebridClient, SanitizedConfig, ScrapeError, ScrapeRunner,
    UploadOrchestrator, YtsClient,
};

use prompt::StdinPrompt;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "harvester", version, about = "Harvest movie releases as magnet descriptors and upload them to a debrid service")]
struct Cli {
    /// Configuration file (default: harvester.toml when present)
    #[arg(long, short, global = true, env = "HARVESTER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "HARVESTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also append logs to a daily file in this directory
    #[arg(long, global = true, env = "HARVESTER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch listings and write magnet descriptors
    Scrape(ScrapeArgs),
    /// Upload queued descriptors to the debrid service
    Upload(UploadArgs),
    /// Print the effective configuration with secrets redacted
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Scrape(_) => "scrape",
            Command::Upload(_) => "upload",
            Command::Config => "config",
        }
    }
}

#[derive(Debug, Args)]
struct ScrapeArgs {
    /// First listing page to fetch
    #[arg(long)]
    page: Option<u32>,

    /// Quality to keep (all, 720p, 1080p, 2160p, 3d)
    #[arg(long)]
    quality: Option<String>,

    /// Never ask before continuing past existing descriptors
    #[arg(long)]
    auto_continue: bool,

    /// Write CSV rows instead of descriptors
    #[arg(long)]
    csv_only: bool,
}

#[derive(Debug, Args)]
struct UploadArgs {
    /// Upload only descriptors the service already has cached
    #[arg(long)]
    cached_only: bool,

    /// Descriptors to consider this run
    #[arg(long)]
    max: Option<usize>,

    /// Descriptor directory
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_dir.as_deref());

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat, log_dir: Option<&Path>) {
    let (file, file_error) = match log_dir.map(open_log_file) {
        Some(Ok(opened)) => (Some(opened), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let log_path = file.as_ref().map(|(path, _)| path.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file_layer(file))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file_layer(file))
            .init(),
    }

    if let Some(path) = log_path {
        info!(path = %path.display(), "Logging to file");
    }
    if let Some(e) = file_error {
        warn!(error = %e, "Could not open log file, logging to stderr only");
    }
}

type FileLayer<S> = fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, Mutex<File>>;

/// Plain-text layer for the daily log file.
fn file_layer<S>(file: Option<(PathBuf, File)>) -> Option<FileLayer<S>> {
    file.map(|(_, f)| fmt::layer().with_ansi(false).with_writer(Mutex::new(f)))
}

/// `harvester_YYYYMMDD.log` for the given day.
fn log_file_name(day: chrono::NaiveDate) -> String {
    format!("harvester_{}.log", day.format("%Y%m%d"))
}

/// Open today's log file in `dir` for appending, creating both if needed.
fn open_log_file(dir: &Path) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(chrono::Local::now().date_naive()));
    let file = File::options().create(true).append(true).open(&path)?;
    Ok((path, file))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load configuration")?,
    };
    apply_overrides(&mut config, &cli.command);
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    if let Command::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, command = cli.command.name());
    async {
        info!(
            version = VERSION,
            config_hash = &config_hash[..16],
            "Starting harvester"
        );
        let result = match &cli.command {
            Command::Scrape(_) => scrape(&config).await,
            Command::Upload(_) => upload(&config).await,
            Command::Config => Ok(()),
        };
        write_metrics(&config).await;
        result
    }
    .instrument(span)
    .await
}

/// Command-line flags win over file and environment.
fn apply_overrides(config: &mut Config, command: &Command) {
    match command {
        Command::Scrape(args) => {
            if let Some(page) = args.page {
                config.scraper.start_page = page;
            }
            if let Some(quality) = &args.quality {
                config.scraper.quality = quality.clone();
            }
            config.scraper.auto_continue |= args.auto_continue;
            config.scraper.csv_only |= args.csv_only;
        }
        Command::Upload(args) => {
            config.upload.cached_only |= args.cached_only;
            if let Some(max) = args.max {
                config.upload.max_per_run = max;
                config.upload.max_cached_per_run = max;
            }
            if let Some(dir) = &args.dir {
                config.upload.descriptor_dir = dir.clone();
            }
        }
        Command::Config => {}
    }
}

async fn scrape(config: &Config) -> Result<()> {
    let source: Arc<dyn MovieSource> = Arc::new(
        YtsClient::new(config.source.clone()).context("Failed to create listing client")?,
    );

    let mut cache = PersistentCache::load(config.cache.path.clone(), config.cache.retention()).await;
    info!(
        path = %config.cache.path.display(),
        entries = cache.len(),
        "Release cache loaded"
    );

    let mut runner = ScrapeRunner::new(config.scraper.clone(), source);
    if !config.scraper.auto_continue {
        runner = runner.with_decider(Arc::new(StdinPrompt));
    }

    match runner.run(&mut cache).await {
        Ok(summary) => {
            if summary.aborted {
                info!("Scrape stopped at the continue prompt");
            }
            Ok(())
        }
        // Nothing to do until the listing is reachable again; the next run retries.
        Err(ScrapeError::SourceUnavailable(e)) => {
            warn!(error = %e, "Listing source unreachable, skipping this run");
            Ok(())
        }
    }
}

async fn upload(config: &Config) -> Result<()> {
    if config.upload.api_key.is_empty() {
        bail!("No debrid API key configured (set REAL_DEBRID_API_KEY or upload.api_key)");
    }

    let client = Arc::new(
        RealDebridClient::new(config.upload.debrid_config())
            .context("Failed to create debrid client")?,
    );
    let orchestrator = UploadOrchestrator::new(config.upload.clone(), client);
    let summary = orchestrator.run().await.context("Upload run failed")?;

    if let Some(reason) = summary.halted {
        warn!(%reason, "Upload run stopped early");
    }
    if config.upload.cached_only {
        info!(
            checked = summary.cache_checked,
            cached = summary.cached,
            cache_rate = format!("{:.1}%", summary.cache_rate()),
            "Cache summary"
        );
    }
    Ok(())
}

async fn write_metrics(config: &Config) {
    let Some(path) = &config.metrics.textfile else {
        return;
    };
    match metrics::write_textfile(path).await {
        Ok(()) => info!(path = %path.display(), "Metrics written"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write metrics"),
    }
}
