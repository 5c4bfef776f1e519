/*!
 * The per-language batch pipeline.
 *
 * A job owns every batch for one target language and runs them strictly in
 * order: batch N is dispatched only after batch N-1 has fully resolved. The
 * remote call is the only suspension point; encoding, decoding and
 * validation are synchronous and fast relative to network latency.
 *
 * Per batch: `Pending -> Dispatched -> {Succeeded, Retrying, FailedFinal}`.
 * Retries fire only on call failure (timeout, non-2xx, transport error, or a
 * reply with no tagged blocks at all). Data-quality flags are advisory and
 * never trigger a retry.
 */

use log::{debug, error, info, warn};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::TranslationSettings;
use crate::catalog::{CatalogEntry, TranslationResult};
use crate::errors::ProviderError;
use crate::language_utils::language_display_name;
use crate::providers::{ChatMessage, ChatProvider, ChatRequest, TokenUsage};
use crate::translation::ValidationStats;
use crate::translation::budget::RunBudget;
use crate::translation::dictionary::{self, Dictionary};
use crate::translation::plural;
use crate::translation::pricing;
use crate::translation::protocol;

/// Terminal status of one language's job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every entry was translated
    Succeeded,
    /// Some batches failed or coverage was cut short
    PartiallyFailed,
    /// The job failed and aborted the run
    Failed,
    /// The job was abandoned (skip policy or run abort)
    Skipped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::PartiallyFailed => "partially failed",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        };
        write!(f, "{}", label)
    }
}

/// Cumulative usage for one job
#[derive(Debug, Clone, Default)]
pub struct JobUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Modeled cost in USD
    pub cost: f64,

    /// Total time spent waiting on the remote model
    pub api_duration: Duration,

    /// Number of remote calls that resolved, successfully or not
    pub calls: u32,
}

impl JobUsage {
    /// Fold one call's reported usage into the totals
    pub fn record(&mut self, usage: Option<&TokenUsage>, cost: f64) {
        if let Some(usage) = usage {
            self.prompt_tokens += usage.prompt_tokens;
            self.completion_tokens += usage.completion_tokens;
        }
        self.cost += cost;
    }

    /// Total tokens in both directions
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Everything one job produced
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Target language of this job
    pub language: String,

    /// Terminal status
    pub status: JobStatus,

    /// Translations produced, one per dispatched entry
    pub results: Vec<TranslationResult>,

    /// Usage totals
    pub usage: JobUsage,

    /// Data-quality issues found while decoding and validating
    pub stats: ValidationStats,

    /// Entries actually dispatched to the model
    pub dispatched_strings: u64,

    /// Batches that exhausted their retries
    pub failed_batches: u32,

    /// Whether a budget ceiling cut this job short
    pub budget_exhausted: bool,
}

impl JobReport {
    fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            status: JobStatus::Succeeded,
            results: Vec::new(),
            usage: JobUsage::default(),
            stats: ValidationStats::default(),
            dispatched_strings: 0,
            failed_batches: 0,
            budget_exhausted: false,
        }
    }

    /// Report for a job that never started because the run was aborted
    pub fn skipped(language: &str) -> Self {
        Self {
            status: JobStatus::Skipped,
            ..Self::new(language)
        }
    }
}

/// Outcome of one batch after its full retry cycle
enum BatchOutcome {
    Succeeded(Vec<Vec<String>>),
    FailedFinal,
}

/// Drives all batches of one target language
pub struct JobRunner {
    provider: Arc<dyn ChatProvider>,
    settings: Arc<TranslationSettings>,
    budget: Arc<RunBudget>,
}

impl JobRunner {
    /// Create a runner bound to the shared provider, settings and budget
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        settings: Arc<TranslationSettings>,
        budget: Arc<RunBudget>,
    ) -> Self {
        Self {
            provider,
            settings,
            budget,
        }
    }

    /// Run the whole job for `language` over `entries`.
    ///
    /// `progress` is invoked with the number of entries a finished batch
    /// covered, successful or not.
    pub async fn run(
        &self,
        language: &str,
        entries: &[CatalogEntry],
        dictionary: &Dictionary,
        progress: Arc<dyn Fn(u64) + Send + Sync>,
    ) -> JobReport {
        let mut report = JobReport::new(language);
        let plural_forms = plural::required_forms(language);
        let language_name = language_display_name(language);

        let batches: Vec<&[CatalogEntry]> = entries.chunks(self.settings.batch_size).collect();
        let total_batches = batches.len();

        info!(
            "[{}] {} entries in {} batches ({} plural forms)",
            language,
            entries.len(),
            total_batches,
            plural_forms
        );

        for (batch_index, full_batch) in batches.into_iter().enumerate() {
            if self.budget.is_aborted() {
                report.status = JobStatus::Skipped;
                return report;
            }

            if let Some(cap) = self.settings.max_strings_per_job {
                if report.dispatched_strings >= cap {
                    info!(
                        "[{}] per-job string cap of {} reached, leaving {} entries untranslated",
                        language,
                        cap,
                        entries.len() - report.results.len()
                    );
                    report.budget_exhausted = true;
                    break;
                }
            }

            let granted = self.budget.take_strings(full_batch.len());
            if granted == 0 {
                info!(
                    "[{}] run budget exhausted before batch {}/{}",
                    language,
                    batch_index + 1,
                    total_batches
                );
                report.budget_exhausted = true;
                break;
            }
            if granted < full_batch.len() {
                // The global cap trimmed this batch; nothing more will start
                report.budget_exhausted = true;
            }
            let batch = &full_batch[..granted.min(full_batch.len())];
            report.dispatched_strings += batch.len() as u64;

            let outcome = self
                .run_batch(
                    language,
                    &language_name,
                    batch,
                    dictionary,
                    plural_forms,
                    batch_index,
                    total_batches,
                    &mut report,
                )
                .await;

            progress(batch.len() as u64);

            match outcome {
                BatchOutcome::Succeeded(forms) => {
                    for (entry, entry_forms) in batch.iter().zip(forms) {
                        report.results.push(TranslationResult {
                            msgid: entry.msgid.clone(),
                            msgctxt: entry.msgctxt.clone(),
                            forms: entry_forms,
                        });
                    }
                }
                BatchOutcome::FailedFinal => {
                    report.failed_batches += 1;

                    if self.settings.stop_on_max_retries_failure {
                        error!(
                            "[{}] batch {}/{} exhausted its retries, aborting the run",
                            language,
                            batch_index + 1,
                            total_batches
                        );
                        self.budget.abort();
                        report.status = JobStatus::Failed;
                        return report;
                    }

                    if self.settings.skip_job_on_max_retries_failure {
                        warn!(
                            "[{}] batch {}/{} exhausted its retries, skipping this language",
                            language,
                            batch_index + 1,
                            total_batches
                        );
                        report.status = JobStatus::Skipped;
                        return report;
                    }

                    // Permissive default: emit empty translations and keep going
                    warn!(
                        "[{}] batch {}/{} exhausted its retries, continuing with empty translations",
                        language,
                        batch_index + 1,
                        total_batches
                    );
                    for entry in batch {
                        let count = if entry.has_plural() { plural_forms } else { 1 };
                        report.results.push(TranslationResult {
                            msgid: entry.msgid.clone(),
                            msgctxt: entry.msgctxt.clone(),
                            forms: vec![String::new(); count],
                        });
                    }
                }
            }
        }

        report.status = if report.failed_batches > 0 {
            JobStatus::PartiallyFailed
        } else if report.results.len() < entries.len() {
            // Budget or per-job cap stopped dispatch before full coverage
            JobStatus::PartiallyFailed
        } else {
            JobStatus::Succeeded
        };

        report
    }

    /// Run one batch through dispatch and its retry cycle
    #[allow(clippy::too_many_arguments)]
    async fn run_batch(
        &self,
        language: &str,
        language_name: &str,
        batch: &[CatalogEntry],
        dictionary: &Dictionary,
        plural_forms: usize,
        batch_index: usize,
        total_batches: usize,
        report: &mut JobReport,
    ) -> BatchOutcome {
        if self.settings.dry_run {
            debug!(
                "[{}] dry run, echoing batch {}/{}",
                language,
                batch_index + 1,
                total_batches
            );
            return BatchOutcome::Succeeded(
                batch
                    .iter()
                    .map(|entry| dry_run_forms(entry, plural_forms))
                    .collect(),
            );
        }

        let matches = dictionary::find_matches(batch, dictionary);
        let document = protocol::encode_request(batch, &matches, plural_forms);
        let mut messages = vec![
            ChatMessage::system(system_prompt(
                &self.settings.source_language,
                language_name,
                plural_forms,
            )),
            ChatMessage::user(document),
        ];
        messages.extend(dictionary::priming_messages(&matches));

        let request = ChatRequest::new(&self.settings.model, self.settings.max_tokens)
            .messages(messages)
            .temperature(self.settings.temperature);

        let max_retries = self.settings.max_retries;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.retry_delay_ms)).await;
                info!(
                    "[{}] retrying batch {}/{} (attempt {}/{})",
                    language,
                    batch_index + 1,
                    total_batches,
                    attempt + 1,
                    max_retries + 1
                );
            }

            let started = Instant::now();
            let result = self.call_once(request.clone(), attempt).await;
            report.usage.api_duration += started.elapsed();
            report.usage.calls += 1;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "[{}] batch {}/{} attempt {}/{} failed: {}",
                        language,
                        batch_index + 1,
                        total_batches,
                        attempt + 1,
                        max_retries + 1,
                        e
                    );
                    continue;
                }
            };

            let cost = response
                .usage
                .as_ref()
                .map(|usage| pricing::cost_for_usage(&self.settings.model, usage))
                .unwrap_or(0.0);
            report.usage.record(response.usage.as_ref(), cost);
            self.budget.record_cost(cost);

            let decoded =
                protocol::decode_reply(&response.content, batch, matches.len(), plural_forms);

            if decoded.is_unparseable() {
                // A fresh generation may parse; spend a retry on it
                report.stats.merge(&decoded.stats);
                warn!(
                    "[{}] batch {}/{} reply was unparseable on attempt {}/{}",
                    language,
                    batch_index + 1,
                    total_batches,
                    attempt + 1,
                    max_retries + 1
                );
                continue;
            }

            report.stats.merge(&decoded.stats);

            let forms = decoded
                .forms
                .into_iter()
                .zip(batch)
                .map(|(entry_forms, entry)| {
                    let expected = if entry.has_plural() { plural_forms } else { 1 };
                    let validated = plural::validate_forms(entry_forms, expected);
                    if validated.insufficient {
                        report.stats.insufficient_forms += 1;
                    }
                    if validated.excess {
                        report.stats.excess_forms += 1;
                    }
                    if validated.incomplete {
                        report.stats.incomplete_forms += 1;
                    }
                    validated.forms
                })
                .collect();

            return BatchOutcome::Succeeded(forms);
        }

        BatchOutcome::FailedFinal
    }

    /// One provider call under the configured timeout, with optional fault
    /// injection for tests
    async fn call_once(
        &self,
        request: ChatRequest,
        attempt: u32,
    ) -> Result<crate::providers::ChatResponse, ProviderError> {
        if self.should_inject_failure(attempt) {
            return Err(ProviderError::RequestFailed(
                "injected failure (test mode)".to_string(),
            ));
        }

        let timeout = Duration::from_secs(self.settings.request_timeout_secs);
        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.request_timeout_secs)),
        }
    }

    /// Fault injection dice roll. When complete failure is disallowed, the
    /// final attempt is never failed so tests can still reach completion.
    fn should_inject_failure(&self, attempt: u32) -> bool {
        let Some(rate) = self.settings.test_retry_failure_rate else {
            return false;
        };
        if !self.settings.test_allow_complete_failure && attempt >= self.settings.max_retries {
            return false;
        }
        rand::rng().random::<f64>() < rate
    }
}

/// Deterministic placeholder used by dry runs: the source text echoed back
fn dry_run_forms(entry: &CatalogEntry, plural_forms: usize) -> Vec<String> {
    match &entry.msgid_plural {
        Some(plural) => {
            let mut forms = vec![entry.msgid.clone()];
            forms.resize(plural_forms.max(1), plural.clone());
            forms
        }
        None => vec![entry.msgid.clone()],
    }
}

fn system_prompt(source_language: &str, target_language_name: &str, plural_forms: usize) -> String {
    format!(
        "You are a professional translator working on a software message catalog. \
         Translate each tagged entry from {} into {}. \
         Reply with one <string id=\"N\">translation</string> block per entry, keeping the \
         same id attribute. For entries carrying a plural attribute, reply with exactly {} \
         sub-forms tagged <f0>..</f0> through <f{}>..</f{}> inside the block. \
         Keep placeholders such as %s, %d, {{name}} and escape sequences unchanged. \
         Do not add any text outside the tagged blocks.",
        language_display_name(source_language),
        target_language_name,
        plural_forms,
        plural_forms.saturating_sub(1),
        plural_forms.saturating_sub(1)
    )
}
