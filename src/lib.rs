/*!
 * # potrans - PO catalog translation with AI
 *
 * A Rust library for translating gettext message catalogs using LLM
 * chat-completion endpoints.
 *
 * ## Features
 *
 * - Batch translation of `.po` catalogs into many languages at once
 * - Tagged-block request/reply protocol resilient to malformed model output
 * - Plural form handling per target language
 * - Terminology dictionaries with priming for consistent vocabulary
 * - Run-wide string and cost budgets with resumable, merge-based output
 * - Retry with fixed backoff, timeouts, and configurable failure policies
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `catalog`: PO catalog model, parsing, writing and merging
 * - `translation`: The batch translation engine:
 *   - `translation::protocol`: Tagged-block request/reply codec
 *   - `translation::plural`: Plural form policy
 *   - `translation::dictionary`: Terminology matching and priming
 *   - `translation::pipeline`: Per-language batch pipeline
 *   - `translation::budget`: Run-wide budget guard
 *   - `translation::scheduler`: Job orchestration across languages
 * - `providers`: Client implementations for completion endpoints
 * - `app_controller`: Main application controller
 * - `language_utils`: Locale code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod catalog;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, TranslationSettings};
pub use catalog::{Catalog, CatalogEntry, TranslationResult};
pub use errors::{AppError, CatalogError, ProviderError};
pub use translation::{JobReport, JobStatus, Orchestrator, RunOutcome, RunReport};
