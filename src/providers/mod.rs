/*!
 * Translation backend implementations.
 *
 * This module contains the adapters for the translation engines:
 * - NLLB: broad-coverage sequence-to-sequence model behind an inference server
 * - Apertus: instruction-tuned causal LM served through an Ollama-compatible API
 * - Mock: deterministic backend for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::BackendError;

pub mod apertus;
pub mod http;
pub mod mock;
pub mod nllb;

/// Identifier of a translation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Broad-coverage NLLB-200
    Nllb,
    /// Specialist Apertus LLM
    Apertus,
}

impl BackendId {
    /// Human readable backend name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nllb => "NLLB-200",
            Self::Apertus => "Apertus-8B",
        }
    }

    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nllb => "nllb",
            Self::Apertus => "apertus",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "nllb" => Ok(Self::Nllb),
            "apertus" => Ok(Self::Apertus),
            _ => Err(anyhow::anyhow!("Invalid backend: {}", s)),
        }
    }
}

/// Common interface of all translation backends
///
/// The pipeline drives every backend through this trait, whatever the
/// underlying model architecture. Model loading is the backend's own
/// business and must happen at most once per handle.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Identifier of this backend
    fn id(&self) -> BackendId;

    /// Language codes this backend accepts, consulted by the engine selector
    fn supported_languages(&self) -> &HashSet<String>;

    /// Whether the backend also takes ISO codes missing from its table
    fn accepts_any_language(&self) -> bool {
        false
    }

    /// Model names a request may ask for, the default model first
    fn models(&self) -> Vec<String>;

    /// Whether chunks may be sent to this backend in parallel
    fn supports_concurrent_calls(&self) -> bool {
        false
    }

    /// Translate one chunk of text, with the default model unless `model` names another
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model: Option<&str>,
    ) -> Result<String, BackendError>;
}

/// Lookup table from backend identifier to implementation
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendId, Arc<dyn TranslationBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own identifier
    pub fn register(&mut self, backend: Arc<dyn TranslationBackend>) {
        self.backends.insert(backend.id(), backend);
    }

    /// Builder-style registration
    pub fn with(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Get a backend by identifier
    pub fn get(&self, id: BackendId) -> Option<Arc<dyn TranslationBackend>> {
        self.backends.get(&id).cloned()
    }

    /// Supported languages of a backend, empty when it is not registered
    pub fn languages(&self, id: BackendId) -> HashSet<String> {
        self.backends
            .get(&id)
            .map(|b| b.supported_languages().clone())
            .unwrap_or_default()
    }

    /// Whether a backend takes any ISO code, false when it is not registered
    pub fn accepts_any_language(&self, id: BackendId) -> bool {
        self.backends
            .get(&id)
            .is_some_and(|b| b.accepts_any_language())
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<BackendId> {
        let mut ids: Vec<BackendId> = self.backends.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Build a language set from string slices
pub fn language_set<I, S>(codes: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes.into_iter().map(|c| c.as_ref().to_lowercase()).collect()
}

/// Model list with the default model first and without duplicates
pub(crate) fn model_list(default: &str, available: &[String]) -> Vec<String> {
    let mut models = vec![default.to_string()];
    for model in available {
        if !models.contains(model) {
            models.push(model.clone());
        }
    }
    models
}

/// Keep the first non-empty line of a model answer
pub(crate) fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Truncate text for log output
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
