/*!
 * Application controller.
 *
 * Wires the excluded collaborators together: loads the catalog and the
 * per-language dictionaries, builds the provider client, drives the
 * orchestrator with a progress bar, merges and writes the translated
 * catalogs, and prints the end-of-run summary.
 */

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::app_config::Config;
use crate::catalog::Catalog;
use crate::file_utils;
use crate::providers::ChatProvider;
use crate::providers::openai::OpenAI;
use crate::translation::dictionary::{self, Dictionary};
use crate::translation::pipeline::JobStatus;
use crate::translation::scheduler::{Orchestrator, RunOutcome, RunReport};

/// Main application controller
pub struct Controller {
    config: Config,
    provider: Arc<dyn ChatProvider>,
}

impl Controller {
    /// Create a controller with the OpenAI-compatible provider from config
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let provider: Arc<dyn ChatProvider> = Arc::new(OpenAI::new(
            config.provider.api_key.clone(),
            config.provider.endpoint.clone(),
        ));
        Ok(Self { config, provider })
    }

    /// Create a controller with an explicit provider (used by tests)
    pub fn with_provider(config: Config, provider: Arc<dyn ChatProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    /// Translate `input` into every configured language and write the
    /// results. Returns the aggregated outcome for the process exit code.
    pub async fn run(&self, input: &Path, output_dir: Option<&Path>) -> Result<RunOutcome> {
        let catalog = Catalog::load(input)
            .with_context(|| format!("Failed to load catalog: {}", input.display()))?;
        info!(
            "Loaded {} entries from {} ({} untranslated)",
            catalog.entries.len(),
            input.display(),
            catalog.untranslated_count()
        );

        let dictionaries = self.load_dictionaries()?;

        let settings = Arc::new(self.config.translation.clone());
        let orchestrator = Orchestrator::new(Arc::clone(&self.provider), Arc::clone(&settings));

        let progress_bar = self.build_progress_bar(&orchestrator, &catalog);
        let bar = progress_bar.clone();
        let progress: Arc<dyn Fn(u64) + Send + Sync> =
            Arc::new(move |entries| bar.inc(entries));

        let report = orchestrator
            .run(
                &catalog,
                &self.config.target_languages,
                &dictionaries,
                progress,
            )
            .await;
        progress_bar.finish_and_clear();

        self.write_outputs(&catalog, &report, input, output_dir)?;
        self.log_summary(&report);

        Ok(report.outcome)
    }

    fn load_dictionaries(&self) -> Result<HashMap<String, Dictionary>> {
        let mut dictionaries = HashMap::new();
        let Some(dir) = &self.config.dictionary_dir else {
            return Ok(dictionaries);
        };

        for language in &self.config.target_languages {
            let dictionary = dictionary::load_dictionary(dir, language)?;
            if !dictionary.is_empty() {
                info!("[{}] loaded {} dictionary terms", language, dictionary.len());
            }
            dictionaries.insert(language.clone(), dictionary);
        }

        Ok(dictionaries)
    }

    fn build_progress_bar(&self, orchestrator: &Orchestrator, catalog: &Catalog) -> ProgressBar {
        let per_language = orchestrator.plan_entries(catalog).len() as u64;
        let total = per_language * self.config.target_languages.len() as u64;

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} entries ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar
    }

    fn write_outputs(
        &self,
        catalog: &Catalog,
        report: &RunReport,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<()> {
        for job in &report.jobs {
            let abandoned = matches!(job.status, JobStatus::Skipped | JobStatus::Failed);
            if job.results.is_empty() && abandoned {
                warn!("[{}] no output written ({})", job.language, job.status);
                continue;
            }

            let merged = catalog.merge(&job.results, self.config.translation.force_translate);
            let path = file_utils::translated_catalog_path(input, &job.language, output_dir);
            file_utils::write_text(&path, &merged.render(Some(&job.language)))?;
            info!("[{}] wrote {}", job.language, path.display());
        }
        Ok(())
    }

    fn log_summary(&self, report: &RunReport) {
        for job in &report.jobs {
            info!(
                "[{}] {}: {} strings dispatched, {} calls, {} prompt + {} completion tokens, ${:.4}",
                job.language,
                job.status,
                job.dispatched_strings,
                job.usage.calls,
                job.usage.prompt_tokens,
                job.usage.completion_tokens,
                job.usage.cost
            );
            if job.stats.has_issues() {
                warn!("[{}] validation: {}", job.language, job.stats.summary());
            }
            if job.budget_exhausted {
                warn!("[{}] stopped early by a budget ceiling", job.language);
            }
        }

        info!(
            "Run {}: {} strings dispatched in total, estimated cost ${:.4}",
            match report.outcome {
                RunOutcome::Success => "succeeded",
                RunOutcome::PartialSuccess => "partially succeeded",
                RunOutcome::Failure => "failed",
            },
            report.budget.strings_dispatched,
            report.budget.cost
        );
        if report.aborted {
            warn!("Run was aborted after a batch exhausted its retries");
        }
    }
}
