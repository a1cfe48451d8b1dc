/*!
 * Mock backend implementation for testing.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with a tagged copy of the text
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockBackend::fail_on_call(n)` - Fails on the n-th call only
 * - `MockBackend::intermittent(n)` - Fails every n-th call with an unavailable backend
 * - `MockBackend::staggered(..)` - Earlier calls answer later, to exercise ordering
 *
 * The mock impersonates one of the real backend identifiers so it can be
 * registered in place of that backend.
 */

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::BackendError;

use super::{BackendId, TranslationBackend, language_set, model_list};

/// A translation call as seen by the mock
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
    /// Model requested by the caller, if any
    pub model: Option<String>,
}

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with a model failure
    Failing,
    /// Fails on the given 1-based call number, succeeds otherwise
    FailOnCall { call: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Simulates slow response
    Slow { delay_ms: u64 },
    /// Call k waits `step_ms * (calls - k)`, so earlier calls finish last
    Staggered { step_ms: u64, calls: usize },
    /// Returns empty response
    Empty,
}

/// Mock backend for testing pipeline behavior
#[derive(Debug)]
pub struct MockBackend {
    /// Identifier the mock answers to
    id: BackendId,
    /// Behavior mode
    behavior: MockBehavior,
    /// Languages reported to the selector
    languages: HashSet<String>,
    /// Whether any ISO code is taken
    open_coverage: bool,
    /// Model names, the default first
    models: Vec<String>,
    /// Whether the pipeline may call in parallel
    concurrent: bool,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Calls currently running
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous calls seen
    peak_in_flight: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            id: BackendId::Nllb,
            behavior,
            languages: language_set(["en", "de", "fr", "it", "es", "pt", "fi", "cop", "gsw"]),
            open_coverage: false,
            models: vec!["mock-model".to_string()],
            concurrent: false,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that fails on one call
    pub fn fail_on_call(call: usize) -> Self {
        Self::new(MockBehavior::FailOnCall { call })
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock whose earlier calls answer later
    pub fn staggered(step_ms: u64, calls: usize) -> Self {
        Self::new(MockBehavior::Staggered { step_ms, calls })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Answer to another backend identifier
    pub fn impersonating(mut self, id: BackendId) -> Self {
        self.id = id;
        self
    }

    /// Replace the reported language set
    pub fn with_languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.languages = language_set(codes);
        self
    }

    /// Also take any ISO code missing from the language set
    pub fn with_open_coverage(mut self, open_coverage: bool) -> Self {
        self.open_coverage = open_coverage;
        self
    }

    /// Replace the model list; the first name is the default
    pub fn with_models<I, S>(mut self, default: &str, others: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let others: Vec<String> = others.into_iter().map(Into::into).collect();
        self.models = model_list(default, &others);
        self
    }

    /// Allow parallel calls
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping calls observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &MockRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}] {}", request.target_language, request.text),
        }
    }

    async fn run(&self, count: usize, request: MockRequest) -> Result<String, BackendError> {
        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Failing => Err(BackendError::ModelFailure("Simulated backend failure".to_string())),

            MockBehavior::FailOnCall { call } => {
                if count + 1 == call {
                    Err(BackendError::ModelFailure(format!(
                        "Simulated failure on call #{}",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(BackendError::Unavailable(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }

            MockBehavior::Staggered { step_ms, calls } => {
                let remaining = calls.saturating_sub(count) as u64;
                tokio::time::sleep(Duration::from_millis(step_ms * remaining)).await;
                Ok(self.respond(&request))
            }

            MockBehavior::Empty => Ok(String::new()),
        }
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            behavior: self.behavior,
            languages: self.languages.clone(),
            open_coverage: self.open_coverage,
            models: self.models.clone(),
            concurrent: self.concurrent,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn supported_languages(&self) -> &HashSet<String> {
        &self.languages
    }

    fn accepts_any_language(&self) -> bool {
        self.open_coverage
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn supports_concurrent_calls(&self) -> bool {
        self.concurrent
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model: Option<&str>,
    ) -> Result<String, BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let request = MockRequest {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            model: model.map(str::to_string),
        };
        let result = self.run(count, request).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
