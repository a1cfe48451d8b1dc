/*!
 * # TraductAL - Translation router for low-resource languages
 *
 * A Rust library that routes translation requests between a broad-coverage
 * neural model and a specialist language model, and checks the output with
 * language-specific validators.
 *
 * ## Features
 *
 * - Engine selection per language pair (NLLB-200 or Apertus)
 * - Segmentation of long texts into chunks that fit the model window
 * - Ordered, fail-fast chunk translation with optional parallelism
 * - Validation of the output:
 *   - Symbolic Coptic parsing through a Prolog subprocess
 *   - Romansh and Swiss German pattern rules
 *   - Generic length, repetition and leakage heuristics
 * - One-shot correction of flagged translations
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: Request pipeline:
 *   - `translation::segmenter`: Paragraph and sentence splitting
 *   - `translation::selector`: Engine selection
 *   - `translation::cache`: Lazy model handles
 *   - `translation::orchestrator`: Pipeline state machine
 * - `validation`: Validator dispatch, validators and corrector
 * - `providers`: Backend adapters:
 *   - `providers::nllb`: NLLB inference server client
 *   - `providers::apertus`: Apertus client (Ollama-compatible API)
 *   - `providers::mock`: Deterministic backend for tests
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: Language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, BackendError, PipelineError};
pub use language_utils::{display_name, get_language_name};
pub use translation::{TranslateOptions, TranslationPipeline, TranslationResult};
