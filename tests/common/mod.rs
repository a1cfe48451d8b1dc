/*!
 * Common test utilities for the traductal test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use traductal::app_config::Config;
use traductal::app_controller::build_pipeline;
use traductal::providers::mock::MockBackend;
use traductal::providers::{BackendId, BackendRegistry};
use traductal::translation::{ModelCache, Segmenter, TranslationPipeline};

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Registry holding one mock per given backend
pub fn registry_of(backends: &[MockBackend]) -> BackendRegistry {
    backends
        .iter()
        .fold(BackendRegistry::new(), |registry, backend| registry.with(Arc::new(backend.clone())))
}

/// Pipeline wired from the default configuration around mock backends
pub fn mock_pipeline(backends: &[MockBackend]) -> TranslationPipeline {
    build_pipeline(&Config::default(), registry_of(backends), ModelCache::new())
}

/// Same as `mock_pipeline`, with a small token budget so short texts split
pub fn chunking_pipeline(backends: &[MockBackend], max_tokens: usize) -> TranslationPipeline {
    mock_pipeline(backends).with_segmenter(Segmenter::new(max_tokens))
}

/// A broad mock answering as NLLB
pub fn broad_mock(backend: MockBackend) -> MockBackend {
    backend.impersonating(BackendId::Nllb)
}

/// A specialist mock answering as Apertus
pub fn specialist_mock(backend: MockBackend) -> MockBackend {
    backend
        .impersonating(BackendId::Apertus)
        .with_languages(["de", "en", "fr", "it", "es", "pt", "rm"])
}

/// Three paragraphs of three words each
pub fn three_paragraphs() -> &'static str {
    "Alpha beta gamma.\n\nDelta epsilon zeta.\n\nEta theta iota."
}

/// Reverse each word so the output shares no words with the input
pub fn reversed_words(request: &traductal::providers::mock::MockRequest) -> String {
    request
        .text
        .split_whitespace()
        .map(|w| w.chars().rev().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Route library logs through the test harness; repeated calls are no-ops
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
