/*!
 * The job scheduler.
 *
 * Runs one batch pipeline per target language, bounded by the configured
 * concurrency. Jobs share nothing but the run budget; a failure in one job
 * never terminates a sibling mid-flight, it only stops further dispatch.
 */

use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::app_config::TranslationSettings;
use crate::catalog::{Catalog, CatalogEntry};
use crate::providers::ChatProvider;
use crate::translation::budget::{BudgetLimits, BudgetSnapshot, RunBudget};
use crate::translation::dictionary::Dictionary;
use crate::translation::pipeline::{JobReport, JobRunner, JobStatus};

/// Aggregated result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every language succeeded
    Success,
    /// Some languages succeeded or partially succeeded, others did not
    PartialSuccess,
    /// The run was aborted or no language made it
    Failure,
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::PartialSuccess => 2,
            RunOutcome::Failure => 1,
        }
    }
}

/// Everything a run produced, job reports in configured language order
#[derive(Debug)]
pub struct RunReport {
    /// Per-language reports, ordered by the configured language list
    pub jobs: Vec<JobReport>,

    /// Aggregated outcome
    pub outcome: RunOutcome,

    /// Final budget counters
    pub budget: BudgetSnapshot,

    /// Entries per language that were skipped because they already carried
    /// a translation
    pub skipped_entries: usize,

    /// Whether a failing job aborted the run
    pub aborted: bool,
}

/// Runs one pipeline per target language under a global concurrency cap
pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    settings: Arc<TranslationSettings>,
}

impl Orchestrator {
    /// Create an orchestrator over the given provider and settings
    pub fn new(provider: Arc<dyn ChatProvider>, settings: Arc<TranslationSettings>) -> Self {
        Self { provider, settings }
    }

    /// The entries a run will dispatch: untranslated ones, or everything
    /// under `force_translate`. The header and empty msgids never dispatch.
    pub fn plan_entries(&self, catalog: &Catalog) -> Vec<CatalogEntry> {
        catalog
            .entries
            .iter()
            .filter(|entry| !entry.msgid.is_empty())
            .filter(|entry| self.settings.force_translate || !entry.is_translated())
            .cloned()
            .collect()
    }

    /// Effective job concurrency. A run-wide string cap must be checked and
    /// decremented between calls, which concurrent dispatch would race, so
    /// it forces sequential execution.
    pub fn effective_concurrency(&self) -> usize {
        if self.settings.max_strings_total.is_some() && self.settings.concurrent_jobs > 1 {
            warn!("max_strings_total is set, overriding concurrent_jobs to 1");
            1
        } else {
            self.settings.concurrent_jobs
        }
    }

    /// Translate the catalog into every requested language.
    ///
    /// `progress` is invoked with the entry count of each finished batch
    /// across all jobs.
    pub async fn run(
        &self,
        catalog: &Catalog,
        languages: &[String],
        dictionaries: &HashMap<String, Dictionary>,
        progress: Arc<dyn Fn(u64) + Send + Sync>,
    ) -> RunReport {
        let budget = Arc::new(RunBudget::new(BudgetLimits {
            max_strings_total: self.settings.max_strings_total,
            max_cost: self.settings.max_cost,
        }));

        let pending = Arc::new(self.plan_entries(catalog));
        let skipped_entries = catalog
            .entries
            .iter()
            .filter(|entry| !entry.msgid.is_empty())
            .count()
            - pending.len();

        if skipped_entries > 0 {
            info!(
                "Skipping {} already-translated entries (use force_translate to re-translate)",
                skipped_entries
            );
        }

        let concurrency = self.effective_concurrency();
        info!(
            "Translating {} entries into {} languages ({} concurrent jobs)",
            pending.len(),
            languages.len(),
            concurrency
        );

        let mut reports: Vec<(usize, JobReport)> = stream::iter(languages.iter().enumerate())
            .map(|(index, language)| {
                let runner = JobRunner::new(
                    Arc::clone(&self.provider),
                    Arc::clone(&self.settings),
                    Arc::clone(&budget),
                );
                let entries = Arc::clone(&pending);
                let dictionary: Dictionary =
                    dictionaries.get(language).cloned().unwrap_or_default();
                let language = language.clone();
                let budget = Arc::clone(&budget);
                let progress = Arc::clone(&progress);

                async move {
                    if budget.is_aborted() {
                        // The run died before this job's slot opened
                        return (index, JobReport::skipped(&language));
                    }
                    let report = runner.run(&language, &entries, &dictionary, progress).await;
                    info!("[{}] job {}", language, report.status);
                    (index, report)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        // Restore the configured language order
        reports.sort_by_key(|(index, _)| *index);
        let jobs: Vec<JobReport> = reports.into_iter().map(|(_, report)| report).collect();

        let aborted = budget.is_aborted();
        let outcome = aggregate_outcome(&jobs, aborted);

        RunReport {
            jobs,
            outcome,
            budget: budget.snapshot(),
            skipped_entries,
            aborted,
        }
    }
}

/// Fold per-job statuses into the run outcome.
///
/// Success requires every language to succeed; partial success means at
/// least one language made progress; anything else is failure.
fn aggregate_outcome(jobs: &[JobReport], aborted: bool) -> RunOutcome {
    if aborted {
        return RunOutcome::Failure;
    }
    if jobs.iter().all(|job| job.status == JobStatus::Succeeded) {
        return RunOutcome::Success;
    }
    if jobs.iter().any(|job| {
        matches!(
            job.status,
            JobStatus::Succeeded | JobStatus::PartiallyFailed
        )
    }) {
        return RunOutcome::PartialSuccess;
    }
    RunOutcome::Failure
}
