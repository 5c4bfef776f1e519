/*!
 * The batch translation engine.
 *
 * Submodules, leaf first:
 * - `protocol`: tagged-block request/reply codec used to exchange strings
 *   with the model
 * - `plural`: plural form counts per target language and form validation
 * - `dictionary`: terminology matching and priming
 * - `pricing`: per-model token pricing for cost estimation
 * - `budget`: run-wide string and cost ceilings
 * - `pipeline`: the per-language batch pipeline (chunking, dispatch, retry)
 * - `scheduler`: the orchestrator running one pipeline per target language
 */

pub mod budget;
pub mod dictionary;
pub mod pipeline;
pub mod plural;
pub mod pricing;
pub mod protocol;
pub mod scheduler;

pub use pipeline::{JobReport, JobRunner, JobStatus, JobUsage};
pub use scheduler::{Orchestrator, RunOutcome, RunReport};

/// Per-job accumulator of recoverable data-quality issues.
///
/// These are advisory: they never fail a batch or a run, but they are always
/// reported at the end so a reviewer knows which translations to double-check.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationStats {
    /// Replies in which no tagged block could be found at all
    pub unparseable_replies: u64,

    /// Reply blocks whose index fell outside the batch (discarded)
    pub discarded_blocks: u64,

    /// Entries for which the reply carried no block (left empty)
    pub missing_entries: u64,

    /// Entries whose reply carried fewer forms than the language requires
    pub insufficient_forms: u64,

    /// Entries whose reply carried more forms than the language requires
    pub excess_forms: u64,

    /// Entries with the right form count but some forms left empty
    pub incomplete_forms: u64,
}

impl ValidationStats {
    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &ValidationStats) {
        self.unparseable_replies += other.unparseable_replies;
        self.discarded_blocks += other.discarded_blocks;
        self.missing_entries += other.missing_entries;
        self.insufficient_forms += other.insufficient_forms;
        self.excess_forms += other.excess_forms;
        self.incomplete_forms += other.incomplete_forms;
    }

    /// Total number of recorded issues
    pub fn total(&self) -> u64 {
        self.unparseable_replies
            + self.discarded_blocks
            + self.missing_entries
            + self.insufficient_forms
            + self.excess_forms
            + self.incomplete_forms
    }

    /// Whether any issue was recorded
    pub fn has_issues(&self) -> bool {
        self.total() > 0
    }

    /// One-line summary for the end-of-run report
    pub fn summary(&self) -> String {
        format!(
            "{} issues (unparseable replies: {}, discarded blocks: {}, missing entries: {}, \
             insufficient forms: {}, excess forms: {}, incomplete forms: {})",
            self.total(),
            self.unparseable_replies,
            self.discarded_blocks,
            self.missing_entries,
            self.insufficient_forms,
            self.excess_forms,
            self.incomplete_forms
        )
    }
}
