/*!
 * Apertus backend.
 *
 * Apertus is an instruction-tuned causal language model with good coverage
 * of Swiss languages, including the Romansh idioms. It is served through an
 * Ollama-compatible `/api/generate` endpoint and prompted to answer with the
 * translation only; generation is serialized because the model server holds
 * one decoding context.
 *
 * The language table below lists the languages Apertus is known to handle
 * well. With `catch_all` set the backend also takes any other ISO 639 code,
 * which makes it the fallback for languages no other engine covers.
 */

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::app_config::ApertusConfig;
use crate::errors::BackendError;
use crate::language_utils::{display_name, romansh_variants};
use crate::translation::cache::{LoadedModel, ModelCache};

use super::http::JsonClient;
use super::{BackendId, TranslationBackend, first_line, language_set, model_list, preview};

/// Languages Apertus handles well besides the Romansh variants
const BASE_LANGUAGES: &[&str] = &[
    "de", "fr", "it", "en", "es", "pt", "ru", "zh", "hi", "ar", "ja", "ko", "gsw",
];

/// Generate request for the Ollama-compatible API
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Sampling options
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    temperature: f32,
    top_p: f32,
    /// Maximum number of tokens to generate
    num_predict: u32,
}

impl GenerationRequest {
    /// Create a non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: None,
            stream: false,
            keep_alive: None,
        }
    }

    /// Set the sampling options
    pub fn sampling(mut self, temperature: f32, top_p: f32, num_predict: u32) -> Self {
        self.options = Some(GenerationOptions {
            temperature,
            top_p,
            num_predict,
        });
        self
    }

    /// Set the keep-alive duration
    pub fn keep_alive(mut self, keep_alive: Option<String>) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Generation response
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
}

/// Build the instruction prompt for one chunk
pub fn build_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    let source_name = display_name(source_language);
    let target_name = display_name(target_language);

    format!(
        "Translate the following text from {src} to {tgt}.\n\
         Provide only the translation, without explanations.\n\n\
         {src}: {text}\n{tgt}:",
        src = source_name,
        tgt = target_name,
        text = text
    )
}

/// Languages listed for the Apertus backend
pub fn supported_codes() -> HashSet<String> {
    language_set(BASE_LANGUAGES.iter().copied().chain(romansh_variants()))
}

/// Specialist backend over an Apertus model server
#[derive(Debug)]
pub struct ApertusBackend {
    config: ApertusConfig,
    client: JsonClient,
    cache: ModelCache,
    languages: HashSet<String>,
    /// One generation at a time
    generation_lock: Mutex<()>,
}

impl ApertusBackend {
    pub fn new(config: ApertusConfig, cache: ModelCache) -> Self {
        let client = JsonClient::new(
            "Apertus",
            config.endpoint.clone(),
            config.timeout_secs,
            config.retry_count,
            config.retry_backoff_ms,
        );

        Self {
            config,
            client,
            cache,
            languages: supported_codes(),
            generation_lock: Mutex::new(()),
        }
    }

    /// Warm a model up with an empty prompt unless its handle already did
    pub async fn ensure_loaded(&self, model: &str) -> Result<Arc<LoadedModel>, BackendError> {
        self.cache
            .handle(BackendId::Apertus, model)
            .get_or_load(|| async {
                info!("Loading Apertus model '{}'", model);
                let request = GenerationRequest::new(model, "").keep_alive(self.config.keep_alive.clone());
                let response: GenerationResponse = self
                    .client
                    .post("/api/generate", &request)
                    .await
                    .map_err(|e| BackendError::Unavailable(format!("Apertus model load failed: {}", e)))?;
                Ok::<_, BackendError>(LoadedModel::new(response.model, None))
            })
            .await
    }
}

#[async_trait]
impl TranslationBackend for ApertusBackend {
    fn id(&self) -> BackendId {
        BackendId::Apertus
    }

    fn supported_languages(&self) -> &HashSet<String> {
        &self.languages
    }

    fn accepts_any_language(&self) -> bool {
        self.config.catch_all
    }

    fn models(&self) -> Vec<String> {
        model_list(&self.config.model, &self.config.available_models)
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model: Option<&str>,
    ) -> Result<String, BackendError> {
        let model_name = model.unwrap_or(self.config.model.as_str());
        if !self.models().iter().any(|m| m == model_name) {
            return Err(BackendError::ModelFailure(format!("Unknown Apertus model '{}'", model_name)));
        }
        self.ensure_loaded(model_name).await?;

        let prompt = build_prompt(text, source_language, target_language);
        let request = GenerationRequest::new(model_name, prompt)
            .sampling(self.config.temperature, self.config.top_p, self.config.max_new_tokens)
            .keep_alive(self.config.keep_alive.clone());

        let _guard = self.generation_lock.lock().await;
        debug!(
            "Apertus {} -> {}: '{}'",
            source_language,
            target_language,
            preview(text, 60)
        );
        let response: GenerationResponse = self.client.post("/api/generate", &request).await?;

        let translation = first_line(&response.response);
        if translation.is_empty() && !text.trim().is_empty() {
            return Err(BackendError::ModelFailure("Apertus returned an empty answer".to_string()));
        }

        Ok(translation)
    }
}
