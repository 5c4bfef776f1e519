use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::language_utils::validate_language_code;

/// Application configuration module
/// This module handles loading and validating configuration settings. The
/// translation engine receives `TranslationSettings` as a single immutable
/// object at construction and never reads ambient configuration itself.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language codes to translate into
    #[serde(default)]
    pub target_languages: Vec<String>,

    /// Provider transport settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Engine settings
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Directory holding per-language dictionary files (`<lang>.json`)
    #[serde(default)]
    pub dictionary_dir: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Transport settings for the completion provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL; empty selects the public OpenAI API
    #[serde(default = "String::new")]
    pub endpoint: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
        }
    }
}

/// The engine's tunables, fixed for the duration of a run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    /// Source language code
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature parameter for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Entries per remote request (1-100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Languages translated concurrently (1-10)
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,

    /// Additional attempts per batch after the first failure (0-10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds (500-30000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Re-translate entries that already carry a translation
    #[serde(default)]
    pub force_translate: bool,

    /// Skip the remote model entirely, producing placeholder output
    #[serde(default)]
    pub dry_run: bool,

    /// Cap on strings dispatched per language
    #[serde(default)]
    pub max_strings_per_job: Option<u64>,

    /// Cap on strings dispatched across the whole run.
    /// Setting this forces sequential job execution.
    #[serde(default)]
    pub max_strings_total: Option<u64>,

    /// Cap on modeled cost in USD across the whole run
    #[serde(default)]
    pub max_cost: Option<f64>,

    /// Abort the entire run when one batch exhausts its retries
    #[serde(default)]
    pub stop_on_max_retries_failure: bool,

    /// Abandon only the failing language and continue with the next
    #[serde(default)]
    pub skip_job_on_max_retries_failure: bool,

    /// Test mode: fraction of calls to fail artificially (0.0-1.0)
    #[serde(default)]
    pub test_retry_failure_rate: Option<f64>,

    /// Test mode: allow even the final retry attempt to fail
    #[serde(default)]
    pub test_allow_complete_failure: bool,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            concurrent_jobs: default_concurrent_jobs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            force_translate: false,
            dry_run: false,
            max_strings_per_job: None,
            max_strings_total: None,
            max_cost: None,
            stop_on_max_retries_failure: false,
            skip_job_on_max_retries_failure: false,
            test_retry_failure_rate: None,
            test_allow_complete_failure: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_batch_size() -> usize {
    20
}

fn default_concurrent_jobs() -> usize {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000 // Fixed delay, no backoff growth; attempt counts are small
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_languages: Vec::new(),
            provider: ProviderConfig::default(),
            translation: TranslationSettings::default(),
            dictionary_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationSettings {
    /// Validate tunable ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.batch_size) {
            return Err(anyhow!(
                "batch_size must be between 1 and 100, got {}",
                self.batch_size
            ));
        }
        if !(1..=10).contains(&self.concurrent_jobs) {
            return Err(anyhow!(
                "concurrent_jobs must be between 1 and 10, got {}",
                self.concurrent_jobs
            ));
        }
        if self.max_retries > 10 {
            return Err(anyhow!(
                "max_retries must be at most 10, got {}",
                self.max_retries
            ));
        }
        if !(500..=30_000).contains(&self.retry_delay_ms) {
            return Err(anyhow!(
                "retry_delay_ms must be between 500 and 30000, got {}",
                self.retry_delay_ms
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be positive"));
        }
        if let Some(rate) = self.test_retry_failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(anyhow!(
                    "test_retry_failure_rate must be between 0.0 and 1.0, got {}",
                    rate
                ));
            }
        }
        validate_language_code(&self.source_language)?;
        Ok(())
    }
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.translation.validate()?;

        if self.target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for language in &self.target_languages {
            validate_language_code(language)?;
        }

        if !self.provider.endpoint.is_empty() {
            url::Url::parse(&self.provider.endpoint)
                .map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", self.provider.endpoint, e))?;
        }

        // Dry runs never authenticate; local endpoints often need no key
        if !self.translation.dry_run
            && self.provider.api_key.is_empty()
            && self.provider.endpoint.is_empty()
        {
            return Err(anyhow!(
                "An API key is required (set --api-key or POTRANS_API_KEY) unless \
                 --dry-run or a custom endpoint is used"
            ));
        }

        Ok(())
    }
}
