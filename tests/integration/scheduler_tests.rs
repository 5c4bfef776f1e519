/*!
 * Whole-run orchestration tests: concurrency, budgets, failure policies,
 * merge semantics
 */

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::fixtures::{
    catalog_of, catalog_with_entries, echo_responder, entry, fast_settings, init_test_logging,
    language_gated_responder, translated_entry,
};
use potrans::app_config::TranslationSettings;
use potrans::providers::mock::MockProvider;
use potrans::translation::dictionary::Dictionary;
use potrans::translation::pipeline::JobStatus;
use potrans::translation::scheduler::{Orchestrator, RunOutcome};

fn orchestrator(provider: Arc<MockProvider>, settings: TranslationSettings) -> Orchestrator {
    Orchestrator::new(provider, Arc::new(settings))
}

fn no_progress() -> Arc<dyn Fn(u64) + Send + Sync> {
    Arc::new(|_| {})
}

fn no_dictionaries() -> HashMap<String, Dictionary> {
    HashMap::new()
}

fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_run_withDryRun_shouldNeverCallProviderAndCostNothing() {
    init_test_logging();

    // A failing provider proves the model is never consulted
    let provider = Arc::new(MockProvider::failing());
    let mut settings = fast_settings();
    settings.dry_run = true;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_with_entries(5);
    let report = orchestrator
        .run(&catalog, &languages(&["fr", "ja"]), &no_dictionaries(), no_progress())
        .await;

    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(provider.call_count(), 0);
    assert_eq!(report.budget.cost, 0.0);
    assert_eq!(report.jobs.len(), 2);
    for job in &report.jobs {
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.results.len(), 5);
        // Deterministic placeholder: the source text echoed back
        assert_eq!(job.results[0].forms, vec!["String number 0"]);
    }
}

#[tokio::test]
async fn test_run_withGlobalStringCap_shouldDispatchAtMostTheCapAndGoSequential() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("T")));
    let mut settings = fast_settings();
    settings.batch_size = 20;
    settings.max_strings_total = Some(25);
    settings.concurrent_jobs = 2;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    assert_eq!(orchestrator.effective_concurrency(), 1);

    let catalog = catalog_with_entries(20);
    let report = orchestrator
        .run(&catalog, &languages(&["fr", "de"]), &no_dictionaries(), no_progress())
        .await;

    // 20 for the first language, then only 5 remain for the second
    assert_eq!(report.budget.strings_dispatched, 25);
    assert_eq!(report.jobs[0].results.len(), 20);
    assert_eq!(report.jobs[0].status, JobStatus::Succeeded);
    assert_eq!(report.jobs[1].results.len(), 5);
    assert_eq!(report.jobs[1].status, JobStatus::PartiallyFailed);
    assert!(report.jobs[1].budget_exhausted);
    assert_eq!(report.outcome, RunOutcome::PartialSuccess);
}

#[tokio::test]
async fn test_run_withSkipOnFailure_shouldFinishHealthyLanguages() {
    // German replies parse; French replies never do, exhausting its retries
    let provider = Arc::new(
        MockProvider::working().with_responder(language_gated_responder("German", "DE")),
    );
    let mut settings = fast_settings();
    settings.max_retries = 1;
    settings.skip_job_on_max_retries_failure = true;
    settings.concurrent_jobs = 1;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_with_entries(4);
    let report = orchestrator
        .run(&catalog, &languages(&["fr", "de"]), &no_dictionaries(), no_progress())
        .await;

    assert_eq!(report.jobs[0].status, JobStatus::Skipped);
    assert!(report.jobs[0].results.is_empty());
    assert_eq!(report.jobs[1].status, JobStatus::Succeeded);
    assert_eq!(report.jobs[1].results.len(), 4);
    assert_eq!(report.outcome, RunOutcome::PartialSuccess);
    assert_eq!(report.outcome.exit_code(), 2);
}

#[tokio::test]
async fn test_run_withStopOnFailure_shouldAbortTheWholeRun() {
    let provider = Arc::new(MockProvider::failing());
    let mut settings = fast_settings();
    settings.max_retries = 0;
    settings.stop_on_max_retries_failure = true;
    settings.concurrent_jobs = 1;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_with_entries(3);
    let report = orchestrator
        .run(&catalog, &languages(&["fr", "de", "ja"]), &no_dictionaries(), no_progress())
        .await;

    assert!(report.aborted);
    assert_eq!(report.outcome, RunOutcome::Failure);
    assert_eq!(report.outcome.exit_code(), 1);
    assert_eq!(report.jobs[0].status, JobStatus::Failed);
    // Later languages never dispatch a single batch
    for job in &report.jobs[1..] {
        assert_eq!(job.status, JobStatus::Skipped);
        assert_eq!(job.dispatched_strings, 0);
    }
}

#[tokio::test]
async fn test_run_withPermissiveFailurePolicy_shouldEmitEmptyTranslations() {
    let provider = Arc::new(MockProvider::failing());
    let mut settings = fast_settings();
    settings.max_retries = 0;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_with_entries(3);
    let report = orchestrator
        .run(&catalog, &languages(&["fr"]), &no_dictionaries(), no_progress())
        .await;

    assert_eq!(report.jobs[0].status, JobStatus::PartiallyFailed);
    assert_eq!(report.jobs[0].results.len(), 3);
    assert!(
        report.jobs[0]
            .results
            .iter()
            .all(|result| result.forms.iter().all(String::is_empty))
    );
    assert_eq!(report.outcome, RunOutcome::PartialSuccess);
}

#[tokio::test]
async fn test_run_withFullyTranslatedCatalog_shouldDispatchNothing() {
    // Merge idempotence: a second run over completed output is a no-op
    let provider = Arc::new(MockProvider::failing());
    let orchestrator = orchestrator(Arc::clone(&provider), fast_settings());

    let catalog = catalog_of(vec![
        translated_entry("Hello", "Bonjour"),
        translated_entry("Bye", "Au revoir"),
    ]);
    let report = orchestrator
        .run(&catalog, &languages(&["fr"]), &no_dictionaries(), no_progress())
        .await;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(report.budget.strings_dispatched, 0);
    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.skipped_entries, 2);

    let merged = catalog.merge(&report.jobs[0].results, false);
    assert_eq!(merged.entries, catalog.entries);
}

#[tokio::test]
async fn test_run_withForceTranslate_shouldRedispatchEverything() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("NEW")));
    let mut settings = fast_settings();
    settings.force_translate = true;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_of(vec![
        translated_entry("Hello", "Bonjour"),
        entry("Fresh string"),
    ]);
    let report = orchestrator
        .run(&catalog, &languages(&["fr"]), &no_dictionaries(), no_progress())
        .await;

    assert_eq!(report.budget.strings_dispatched, 2);
    let merged = catalog.merge(&report.jobs[0].results, true);
    assert_eq!(merged.entries[0].msgstr, vec!["NEW Hello"]);
    assert_eq!(merged.entries[1].msgstr, vec!["NEW Fresh string"]);
}

#[tokio::test]
async fn test_run_withConcurrentJobs_shouldKeepConfiguredLanguageOrder() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("X")));
    let mut settings = fast_settings();
    settings.concurrent_jobs = 3;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let catalog = catalog_with_entries(2);
    let codes = languages(&["ja", "fr", "de"]);
    let report = orchestrator
        .run(&catalog, &codes, &no_dictionaries(), no_progress())
        .await;

    let reported: Vec<&str> = report.jobs.iter().map(|j| j.language.as_str()).collect();
    assert_eq!(reported, vec!["ja", "fr", "de"]);
    assert_eq!(report.outcome, RunOutcome::Success);
}

#[tokio::test]
async fn test_run_withProgressCallback_shouldCountEveryDispatchedEntry() {
    use std::sync::atomic::{AtomicU64, Ordering};

    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("X")));
    let mut settings = fast_settings();
    settings.batch_size = 2;
    let orchestrator = orchestrator(Arc::clone(&provider), settings);

    let counted = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&counted);
    let progress: Arc<dyn Fn(u64) + Send + Sync> =
        Arc::new(move |entries| {
            counter.fetch_add(entries, Ordering::SeqCst);
        });

    let catalog = catalog_with_entries(5);
    orchestrator
        .run(&catalog, &languages(&["fr"]), &no_dictionaries(), progress)
        .await;

    assert_eq!(counted.load(Ordering::SeqCst), 5);
}
