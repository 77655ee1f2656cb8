//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use ainews_core::pipeline::{CrawlStats, Orchestrator, ProcessStats, ProgressReporter};
use ainews_shared::{AppConfig, config_file_path, init_config, load_config};
use ainews_storage::Storage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ainews: collect and enrich AI news from research and tech sources.
#[derive(Parser)]
#[command(
    name = "ainews",
    version,
    about = "Crawl AI news sources into a local store and enrich them with summaries and scores.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Database path (overrides `[storage] database_path`).
    #[arg(long, env = "AINEWS_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Fetch every enabled source and store new articles.
    Crawl,

    /// Enrich pending articles.
    Process {
        /// Maximum articles to enrich (defaults to `[enrichment] batch_limit`).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Crawl, then enrich pending articles.
    Run {
        /// Maximum articles to enrich (defaults to `[enrichment] batch_limit`).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store counts and the last crawl run.
    Stats,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const CRATES: [&str; 5] = [
    "ainews_cli",
    "ainews_core",
    "ainews_crawler",
    "ainews_shared",
    "ainews_storage",
];

/// Directive string for a verbosity count, one entry per workspace crate.
fn filter_directives(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(cli.verbose)));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl => cmd_crawl(cli.db.as_deref()).await,
        Command::Process { limit } => cmd_process(cli.db.as_deref(), limit).await,
        Command::Run { limit } => cmd_run(cli.db.as_deref(), limit).await,
        Command::Stats => cmd_stats(cli.db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Config file plus the `--db` override.
fn resolve_db_path(config: &AppConfig, db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config.storage.resolved_path()?),
    }
}

async fn open_store(config: &AppConfig, db: Option<&Path>) -> Result<Storage> {
    let path = resolve_db_path(config, db)?;
    Storage::open(&path)
        .await
        .wrap_err_with(|| format!("cannot open database at {}", path.display()))
}

async fn cmd_crawl(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_store(&config, db).await?;
    let orchestrator = Orchestrator::from_config(&config)?;

    info!(sources = ?orchestrator.registry().names(), "starting crawl");

    let reporter = CliProgress::new();
    let stats = orchestrator.crawl_all(&storage, &reporter).await;
    reporter.finish();

    print_crawl(&stats);
    Ok(())
}

async fn cmd_process(db: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let storage = open_store(&config, db).await?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let limit = limit.unwrap_or(config.enrichment.batch_limit);

    info!(limit, enricher = orchestrator.enricher_name(), "processing pending articles");

    let reporter = CliProgress::new();
    let stats = orchestrator
        .process_pending(&storage, limit, &reporter)
        .await;
    reporter.finish();

    print_process(&stats);
    Ok(())
}

async fn cmd_run(db: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let storage = open_store(&config, db).await?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let limit = limit.unwrap_or(config.enrichment.batch_limit);

    info!(limit, "starting scheduled run");

    let reporter = CliProgress::new();
    let (crawl, process) = orchestrator.run_once(&storage, limit, &reporter).await;
    reporter.finish();

    print_crawl(&crawl);
    print_process(&process);
    Ok(())
}

async fn cmd_stats(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let path = resolve_db_path(&config, db)?;
    let storage = Storage::open_readonly(&path)
        .await
        .wrap_err_with(|| format!("no article store at {}; run `ainews crawl` first", path.display()))?;

    let stats = storage.stats().await?;
    let last_run = storage.last_crawl_run().await?;

    println!();
    println!("  Articles:  {}", stats.total);
    println!("  Processed: {}", stats.processed);
    println!("  Pending:   {}", stats.pending);
    println!("  Failed:    {}", stats.failed);
    match stats.avg_quality {
        Some(avg) => println!("  Quality:   {avg:.1} avg"),
        None => println!("  Quality:   -"),
    }
    if !stats.by_source.is_empty() {
        println!("  Sources:");
        for (source, count) in &stats.by_source {
            println!("    {source:<16} {count}");
        }
    }
    match last_run {
        Some(run) => {
            let finished = run
                .finished_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unfinished".to_string());
            println!("  Last run:  {} ({finished})", run.started_at.to_rfc3339());
            if let Some(json) = run.stats_json {
                println!("             {json}");
            }
        }
        None => println!("  Last run:  never"),
    }
    println!();

    Ok(())
}

fn print_crawl(stats: &CrawlStats) {
    println!();
    println!("  Crawl finished");
    println!("  Crawled: {}", stats.crawled);
    println!("  New:     {}", stats.new);
    println!("  Errors:  {}", stats.errors);
    println!();
}

fn print_process(stats: &ProcessStats) {
    println!();
    println!("  Enrichment finished");
    println!("  Selected:  {}", stats.selected);
    println!("  Processed: {}", stats.processed);
    println!("  Failed:    {}", stats.failed);
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn adapter_started(&self, name: &str) {
        self.spinner.set_message(format!("Fetching {name}"));
    }

    fn adapter_finished(&self, name: &str, drafts: usize, failed: bool) {
        if failed {
            self.spinner.println(format!("  ✗ {name}: failed"));
        } else {
            self.spinner.println(format!("  ✓ {name}: {drafts} articles"));
        }
    }

    fn article_enriched(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {title}"));
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let enrichment = &config.enrichment;
    println!("# credentials");
    for var in [&enrichment.openai_api_key_env, &enrichment.anthropic_api_key_env] {
        println!("# {var}: {}", credential_status(var));
    }
    let transport = match enrichment.resolve_credential() {
        Some(credential) => {
            ainews_core::enrichment::Transport::from_credential(credential, enrichment)
                .label()
                .to_string()
        }
        None => "fallback only".to_string(),
    };
    println!("# enrichment: {transport}");
    Ok(())
}

fn credential_status(var: &str) -> &'static str {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => "set",
        _ => "unset",
    }
}
