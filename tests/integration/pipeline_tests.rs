/*!
 * Per-language pipeline tests: retries, fault injection, caps, timeouts
 */

use std::sync::Arc;

use crate::common::fixtures::{echo_responder, entry, fast_settings, plural_entry};
use potrans::app_config::TranslationSettings;
use potrans::catalog::CatalogEntry;
use potrans::providers::ChatProvider;
use potrans::providers::mock::MockProvider;
use potrans::translation::budget::{BudgetLimits, RunBudget};
use potrans::translation::pipeline::{JobRunner, JobStatus};

fn runner(provider: Arc<MockProvider>, settings: TranslationSettings) -> JobRunner {
    JobRunner::new(
        provider,
        Arc::new(settings),
        Arc::new(RunBudget::new(BudgetLimits::default())),
    )
}

fn no_progress() -> Arc<dyn Fn(u64) + Send + Sync> {
    Arc::new(|_| {})
}

fn small_batch() -> Vec<CatalogEntry> {
    vec![entry("One"), entry("Two"), plural_entry("%d cat", "%d cats")]
}

#[tokio::test]
async fn test_run_withEchoProvider_shouldTranslateEveryEntry() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let job = runner(Arc::clone(&provider), fast_settings());

    let report = job.run("fr", &small_batch(), &Vec::new(), no_progress()).await;

    assert_eq!(report.status, JobStatus::Succeeded);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results[0].forms, vec!["FR One"]);
    // French needs two plural forms and the responder supplies both
    assert_eq!(report.results[2].forms.len(), 2);
    assert!(!report.stats.has_issues());
    assert_eq!(report.dispatched_strings, 3);
    assert!(report.usage.total_tokens() > 0);
    assert!(report.usage.cost > 0.0);
}

#[tokio::test]
async fn test_run_withFailingProvider_shouldSpendAllAttemptsThenContinueEmpty() {
    let provider = Arc::new(MockProvider::failing());
    let mut settings = fast_settings();
    settings.max_retries = 2;
    let job = runner(Arc::clone(&provider), settings);

    let report = job.run("fr", &small_batch(), &Vec::new(), no_progress()).await;

    // Permissive default: entries emitted with empty translations
    assert_eq!(report.status, JobStatus::PartiallyFailed);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.forms.iter().all(String::is_empty)));
    // One initial attempt plus two retries
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_run_withUnparseableReplies_shouldRetryAndRecordStats() {
    let provider = Arc::new(MockProvider::malformed());
    let mut settings = fast_settings();
    settings.max_retries = 1;
    let job = runner(Arc::clone(&provider), settings);

    let report = job.run("fr", &small_batch(), &Vec::new(), no_progress()).await;

    assert_eq!(report.status, JobStatus::PartiallyFailed);
    assert_eq!(provider.call_count(), 2);
    assert!(report.stats.unparseable_replies >= 2);
}

#[tokio::test]
async fn test_run_withInjectedFailures_shouldSucceedOnGuaranteedFinalAttempt() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let mut settings = fast_settings();
    settings.max_retries = 2;
    settings.test_retry_failure_rate = Some(1.0);
    settings.test_allow_complete_failure = false;
    let job = runner(Arc::clone(&provider), settings);

    let report = job.run("fr", &small_batch(), &Vec::new(), no_progress()).await;

    // Attempts 1 and 2 are injected failures before the provider is reached;
    // the final attempt is guaranteed to go through
    assert_eq!(report.status, JobStatus::Succeeded);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_run_withInjectedCompleteFailure_shouldNeverReachProvider() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let mut settings = fast_settings();
    settings.max_retries = 2;
    settings.test_retry_failure_rate = Some(1.0);
    settings.test_allow_complete_failure = true;
    let job = runner(Arc::clone(&provider), settings);

    let report = job.run("fr", &small_batch(), &Vec::new(), no_progress()).await;

    assert_eq!(report.status, JobStatus::PartiallyFailed);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_run_withTimeout_shouldFailTheAttempt() {
    let provider = Arc::new(MockProvider::slow(1500).with_responder(echo_responder("FR")));
    let mut settings = fast_settings();
    settings.request_timeout_secs = 1;
    settings.max_retries = 0;
    let job = runner(Arc::clone(&provider), settings);

    let report = job.run("fr", &[entry("One")], &Vec::new(), no_progress()).await;

    assert_eq!(report.status, JobStatus::PartiallyFailed);
    assert_eq!(report.failed_batches, 1);
}

#[tokio::test]
async fn test_run_withPerJobCap_shouldStopDispatchingAtCap() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let mut settings = fast_settings();
    settings.batch_size = 5;
    settings.max_strings_per_job = Some(5);
    let job = runner(Arc::clone(&provider), settings);

    let entries: Vec<CatalogEntry> = (0..12).map(|i| entry(&format!("S{}", i))).collect();
    let report = job.run("fr", &entries, &Vec::new(), no_progress()).await;

    assert_eq!(report.dispatched_strings, 5);
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.status, JobStatus::PartiallyFailed);
    assert!(report.budget_exhausted);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_run_withCostCeiling_shouldStopAfterObservedSpend() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let mut settings = fast_settings();
    settings.batch_size = 2;
    settings.max_cost = Some(1e-9);
    let budget = Arc::new(RunBudget::new(BudgetLimits {
        max_strings_total: None,
        max_cost: settings.max_cost,
    }));
    let job = JobRunner::new(Arc::clone(&provider) as Arc<dyn ChatProvider>, Arc::new(settings), Arc::clone(&budget));

    let entries: Vec<CatalogEntry> = (0..6).map(|i| entry(&format!("S{}", i))).collect();
    let report = job.run("fr", &entries, &Vec::new(), no_progress()).await;

    // The first batch's observed cost trips the ceiling; nothing else starts
    assert_eq!(report.dispatched_strings, 2);
    assert!(report.budget_exhausted);
    assert_eq!(provider.call_count(), 1);
    assert!(budget.snapshot().cost > 0.0);
}

#[tokio::test]
async fn test_run_withDictionary_shouldPrimeConversation() {
    let provider = Arc::new(MockProvider::working().with_responder(echo_responder("FR")));
    let job = runner(Arc::clone(&provider), fast_settings());

    let dictionary = vec![("cat".to_string(), "chat".to_string())];
    let report = job
        .run("fr", &small_batch(), &dictionary, no_progress())
        .await;

    // The echo responder also answers the dictionary example block; the
    // decoder must discard the echo instead of shifting entry results
    assert_eq!(report.status, JobStatus::Succeeded);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results[0].forms, vec!["FR One"]);
}
