// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, warn};
use std::io::Write;
use std::path::PathBuf;

use crate::app_config::{Config, LogLevel};
use crate::app_controller::Controller;

mod app_config;
mod app_controller;
mod catalog;
mod errors;
mod file_utils;
mod language_utils;
mod providers;
mod translation;

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for potrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// potrans - translate gettext catalogs with AI
///
/// Translates a .po message catalog into one or more target languages by
/// batching strings to an LLM completion endpoint, with budgets, retries
/// and terminology dictionaries.
#[derive(Parser, Debug)]
#[command(name = "potrans")]
#[command(version)]
#[command(about = "AI-powered gettext catalog translation")]
#[command(long_about = "potrans translates gettext .po catalogs using an \
OpenAI-compatible completion endpoint.

EXAMPLES:
    potrans messages.po -l fr                     # Translate to French
    potrans messages.po -l de,fr,ja -o out/       # Three languages into out/
    potrans messages.po -l fr --dry-run           # Exercise the pipeline offline
    potrans messages.po -l fr --max-cost 2.50     # Stop after ~$2.50 of usage
    potrans messages.po -l fr --force             # Re-translate everything
    potrans completions bash > potrans.bash       # Generate bash completions

The API key is read from --api-key or the POTRANS_API_KEY environment
variable. Existing translations in the input catalog are preserved unless
--force is given.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input catalog (.po) to translate
    #[arg(value_name = "CATALOG")]
    input: Option<PathBuf>,

    /// Target language codes, comma separated (e.g. 'de,fr,pt_BR')
    #[arg(short = 'l', long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    /// Source language code
    #[arg(short, long)]
    source_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the completion endpoint
    #[arg(long, env = "POTRANS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Custom OpenAI-compatible endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory with per-language dictionaries (<lang>.json)
    #[arg(long)]
    dictionary_dir: Option<PathBuf>,

    /// Entries per request (1-100)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Languages translated concurrently (1-10)
    #[arg(long)]
    concurrent_jobs: Option<usize>,

    /// Additional attempts per failed batch (0-10)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between attempts in milliseconds (500-30000)
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Re-translate entries that already carry a translation
    #[arg(short, long)]
    force: bool,

    /// Run the full pipeline without calling the remote model
    #[arg(long)]
    dry_run: bool,

    /// Stop dispatching for a language after this many strings
    #[arg(long)]
    max_strings_per_job: Option<u64>,

    /// Stop the whole run after this many strings (forces sequential jobs)
    #[arg(long)]
    max_strings_total: Option<u64>,

    /// Stop the whole run once estimated cost reaches this amount in USD
    #[arg(long)]
    max_cost: Option<f64>,

    /// Abort the entire run when a batch exhausts its retries
    #[arg(long)]
    stop_on_failure: bool,

    /// Skip only the failing language when a batch exhausts its retries
    #[arg(long)]
    skip_on_failure: bool,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// Minimal timestamped stderr logger, colored per level
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Default to info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "potrans", &mut std::io::stdout());
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .ok_or_else(|| anyhow!("CATALOG is required"))?;

    let config = build_config(&cli)?;

    let filter = match config.log_level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    };
    log::set_max_level(filter);

    let controller = Controller::new(config)?;
    let outcome = controller.run(&input, cli.output_dir.as_deref()).await?;

    std::process::exit(outcome.exit_code());
}

/// Load the optional config file and apply CLI overrides on top
fn build_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = match &cli.config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => Config::default(),
    };

    if !cli.languages.is_empty() {
        config.target_languages = cli.languages.clone();
    }
    if let Some(source) = &cli.source_language {
        config.translation.source_language = source.clone();
    }
    if let Some(model) = &cli.model {
        config.translation.model = model.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.provider.api_key = api_key.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.provider.endpoint = endpoint.clone();
    }
    if let Some(dir) = &cli.dictionary_dir {
        config.dictionary_dir = Some(dir.clone());
    }
    if let Some(batch_size) = cli.batch_size {
        config.translation.batch_size = batch_size;
    }
    if let Some(concurrent_jobs) = cli.concurrent_jobs {
        config.translation.concurrent_jobs = concurrent_jobs;
    }
    if let Some(max_retries) = cli.max_retries {
        config.translation.max_retries = max_retries;
    }
    if let Some(retry_delay_ms) = cli.retry_delay_ms {
        config.translation.retry_delay_ms = retry_delay_ms;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.translation.request_timeout_secs = timeout_secs;
    }
    if cli.force {
        config.translation.force_translate = true;
    }
    if cli.dry_run {
        config.translation.dry_run = true;
    }
    if let Some(cap) = cli.max_strings_per_job {
        config.translation.max_strings_per_job = Some(cap);
    }
    if let Some(cap) = cli.max_strings_total {
        config.translation.max_strings_total = Some(cap);
    }
    if let Some(cap) = cli.max_cost {
        config.translation.max_cost = Some(cap);
    }
    if cli.stop_on_failure {
        config.translation.stop_on_max_retries_failure = true;
    }
    if cli.skip_on_failure {
        config.translation.skip_job_on_max_retries_failure = true;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }

    if cli.stop_on_failure && cli.skip_on_failure {
        warn!("--stop-on-failure and --skip-on-failure both set; stop takes precedence");
    }

    Ok(config)
}
