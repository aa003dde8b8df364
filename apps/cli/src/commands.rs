//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use topicforge_core::export::{output_path, render_markdown};
use topicforge_core::pipeline::{EventSink, Pipeline, ProgressEvent, ResultEvent};
use topicforge_llm::{ChatClient, TitleExtractor};
use topicforge_shared::{AppConfig, cache_db_path, init_config, load_config, validate_api_key};
use topicforge_storage::Store;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicForge: turn topic titles into researched briefs.
#[derive(Parser)]
#[command(
    name = "topicforge",
    version,
    about = "Resolve topic titles into generated research briefs, cached locally.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve every title in a file and export the results as markdown.
    Run {
        /// Input file: free-form text, or one title per line with --titles.
        input: PathBuf,

        /// Treat the input as one title per line, skipping extraction.
        #[arg(long)]
        titles: bool,

        /// Output path (defaults to the input with a .md extension).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Extract topic titles from free-form text and print them.
    Extract {
        /// Input text file.
        input: PathBuf,
    },

    /// Result cache management.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show the cache location and entry count.
    Stats,
    /// Remove every cached result.
    Clear,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topicforge=info",
        1 => "topicforge=debug",
        _ => "topicforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
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
        Command::Run { input, titles, out } => cmd_run(&input, titles, out.as_deref()).await,
        Command::Extract { input } => cmd_extract(&input).await,
        Command::Cache { action } => match action {
            CacheAction::Stats => cmd_cache_stats().await,
            CacheAction::Clear => cmd_cache_clear().await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(input: &Path, titles_only: bool, out: Option<&Path>) -> Result<()> {
    // Validate config and the export destination before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;
    let out_path = output_path(input, out)?;

    let raw = std::fs::read_to_string(input)
        .map_err(|e| eyre!("cannot read '{}': {e}", input.display()))?;

    let titles: Vec<String> = if titles_only {
        raw.lines().map(str::to_string).collect()
    } else {
        let extracted = extract_titles(&config, &raw).await?;
        println!(
            "Extracted {} titles:",
            extracted.iter().filter(|t| !t.trim().is_empty()).count()
        );
        for title in extracted.iter().filter(|t| !t.trim().is_empty()) {
            println!("  - {title}");
        }
        extracted
    };

    info!(titles = titles.len(), "starting resolution run");

    let pipeline = Arc::new(Pipeline::from_config(&config).await?);
    let sink = Arc::new(CliProgress::new());
    let handle = pipeline.spawn(titles.clone(), sink.clone());

    // Ctrl-C requests cancellation; the run stops before the next title
    let cancel = handle.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let report = handle.wait().await;
    sink.finish();

    let document = render_markdown(&titles, &report.results);
    std::fs::write(&out_path, document)
        .map_err(|e| eyre!("cannot write '{}': {e}", out_path.display()))?;

    println!();
    println!("  Run {}", report.state);
    println!("  Titles:   {}", report.total);
    println!("  Resolved: {}", report.processed);
    println!("  Output:   {}", out_path.display());
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_extract(input: &Path) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let raw = std::fs::read_to_string(input)
        .map_err(|e| eyre!("cannot read '{}': {e}", input.display()))?;

    let titles = extract_titles(&config, &raw).await?;
    let non_blank: Vec<&String> = titles.iter().filter(|t| !t.trim().is_empty()).collect();
    info!(count = non_blank.len(), "extraction finished");

    // Bare titles on stdout so the output pipes straight into `run --titles`
    for title in non_blank {
        println!("{title}");
    }

    Ok(())
}

async fn extract_titles(config: &AppConfig, raw: &str) -> Result<Vec<String>> {
    let client = ChatClient::from_config(config)?;
    let extractor = TitleExtractor::new(client, config.openai.extraction_model.clone());

    info!("extracting titles from input text");
    Ok(extractor.extract(raw).await?)
}

async fn cmd_cache_stats() -> Result<()> {
    let config = load_config()?;
    let db_path = cache_db_path(&config)?;
    let store = Store::open(&db_path).await?;
    let entries = store.count().await?;

    println!();
    println!("  Cache:   {}", db_path.display());
    println!("  Entries: {entries}");
    println!();

    Ok(())
}

async fn cmd_cache_clear() -> Result<()> {
    let config = load_config()?;
    let db_path = cache_db_path(&config)?;
    let store = Store::open(&db_path).await?;
    let removed = store.clear().await?;

    println!("Removed {removed} cached results");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress sink
// ---------------------------------------------------------------------------

/// Pipeline event sink backed by an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EventSink for CliProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.spinner.set_message(format!(
            "Resolving [{}/{}] {:.0}%",
            event.completed, event.total, event.percent
        ));
    }

    fn on_result(&self, event: &ResultEvent) {
        self.spinner.println(format!("  resolved: {}", event.title));
    }
}
