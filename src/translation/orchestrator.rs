/*!
 * Pipeline orchestrator for a single translation request.
 *
 * A request walks a fixed state machine:
 *
 * ```text
 * Init -> Segmented -> Translated -> [Validated] -> [Corrected] -> Done
 *   \________________________|_______________________________/
 *                          Failed
 * ```
 *
 * Engine selection runs before anything touches a backend. Chunks are
 * translated in order; the first failing chunk aborts the whole request and
 * no partial translation is returned. When the backend allows it, several
 * chunks may be in flight at once, but results are always reassembled in
 * chunk order and errors are reported for the first failing chunk in that
 * order.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::errors::PipelineError;
use crate::providers::{BackendId, BackendRegistry, TranslationBackend};
use crate::validation::{Corrector, ValidationService, ValidationVerdict};

use super::cache::ModelCache;
use super::segmenter::{Chunk, ChunkKind, Segmenter, reassemble};
use super::selector::{BackendCatalog, EngineDecision, LanguagePair, SelectionReason, force_engine, select_engine};

/// Cooperative cancellation, checked before each chunk starts
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; chunks already running are allowed to finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Validate the output; `None` uses the service default
    pub validate: Option<bool>,
    /// Bypass engine selection
    pub engine: Option<BackendId>,
    /// Model of the selected backend; `None` uses its default model
    pub model: Option<String>,
    /// Cancellation handle
    pub cancel: CancellationFlag,
    /// Parallel chunk limit; `None` uses the pipeline default
    pub max_concurrent_chunks: Option<usize>,
}

impl TranslateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn with_engine(mut self, engine: Option<BackendId>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_concurrent_chunks(mut self, limit: usize) -> Self {
        self.max_concurrent_chunks = Some(limit);
        self
    }
}

/// States a request passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Segmented,
    Translated,
    Validated,
    Corrected,
    Done,
    Failed,
}

/// Wall-clock time spent per stage, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub selection: u64,
    pub segmentation: u64,
    pub translation: u64,
    pub validation: u64,
    pub correction: u64,
    pub total: u64,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Final product of a successful request
#[derive(Debug, Clone, Serialize)]
pub struct TranslationResult {
    /// Delivered translation (corrected when validation flagged it)
    pub translation: String,
    /// Raw backend output, kept when a correction was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_neural: Option<String>,
    /// Whether the corrector ran
    pub corrected: bool,
    /// Validation outcome (`skipped` when not requested)
    pub verdict: ValidationVerdict,
    /// Backend that produced the translation
    pub backend: BackendId,
    /// Model the backend used
    pub model: String,
    /// Why that backend was chosen
    pub selection_reason: SelectionReason,
    /// Number of chunks sent to the backend
    pub chunk_count: usize,
    /// Split granularity of each chunk, in order
    pub chunk_kinds: Vec<ChunkKind>,
    /// States visited, in order
    pub states: Vec<PipelineState>,
    /// Stage timings
    pub timings: StageTimings,
}

/// Segmentation, selection, translation, validation and correction for one request at a time
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    registry: BackendRegistry,
    catalog: BackendCatalog,
    segmenter: Segmenter,
    validation: ValidationService,
    corrector: Corrector,
    models: ModelCache,
    max_concurrent_chunks: usize,
}

impl TranslationPipeline {
    /// Create a pipeline over registered backends with default components
    pub fn new(registry: BackendRegistry, catalog: BackendCatalog) -> Self {
        Self {
            registry,
            catalog,
            segmenter: Segmenter::new(400),
            validation: ValidationService::new(),
            corrector: Corrector::default(),
            models: ModelCache::new(),
            max_concurrent_chunks: 1,
        }
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_validation(mut self, validation: ValidationService) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_corrector(mut self, corrector: Corrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Share the model handles the backends were built with
    pub fn with_model_cache(mut self, models: ModelCache) -> Self {
        self.models = models;
        self
    }

    pub fn with_max_concurrent_chunks(mut self, limit: usize) -> Self {
        self.max_concurrent_chunks = limit.max(1);
        self
    }

    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn validation(&self) -> &ValidationService {
        &self.validation
    }

    pub fn models(&self) -> &ModelCache {
        &self.models
    }

    /// Engine decision for a pair, honouring a forced engine
    pub fn select(&self, pair: &LanguagePair, engine: Option<BackendId>) -> EngineDecision {
        match engine {
            Some(id) => force_engine(pair, &self.catalog, id),
            None => select_engine(pair, &self.catalog),
        }
    }

    /// Translate `text` from `source_language` into `target_language`
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<TranslationResult, PipelineError> {
        let mut states = vec![PipelineState::Init];
        let result = self
            .run(text, source_language, target_language, options, &mut states)
            .await;

        if let Err(e) = &result {
            states.push(PipelineState::Failed);
            error!("Translation failed at {} stage: {}", e.stage(), e);
            debug!("States visited: {:?}", states);
        }

        result
    }

    async fn run(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
        states: &mut Vec<PipelineState>,
    ) -> Result<TranslationResult, PipelineError> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        // Selection
        let stage_start = Instant::now();
        let pair = LanguagePair::new(source_language, target_language);
        let decision = self.select(&pair, options.engine);
        let Some(backend_id) = decision.backend else {
            return Err(PipelineError::EngineUnsupported {
                source_language: source_language.to_string(),
                target_language: target_language.to_string(),
            });
        };
        let backend = self
            .registry
            .get(backend_id)
            .ok_or(PipelineError::BackendMissing(backend_id))?;
        let models = backend.models();
        let model = match &options.model {
            Some(requested) if !models.contains(requested) => {
                return Err(PipelineError::ModelUnavailable {
                    backend: backend_id,
                    model: requested.clone(),
                });
            }
            Some(requested) => requested.clone(),
            None => models.first().cloned().unwrap_or_default(),
        };
        timings.selection = elapsed_ms(stage_start);
        info!("Engine for {}: {} ({:?})", pair, backend_id.display_name(), decision.reason);

        // Segmentation
        let stage_start = Instant::now();
        let chunks = self.segmenter.segment(text);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        timings.segmentation = elapsed_ms(stage_start);
        self.transition(states, PipelineState::Segmented);
        debug!("Segmented input into {} chunk(s)", chunks.len());

        // Translation
        let stage_start = Instant::now();
        let translations = self
            .translate_chunks(backend.as_ref(), &chunks, &pair, options)
            .await?;
        let raw = reassemble(&chunks, &translations);
        timings.translation = elapsed_ms(stage_start);
        self.transition(states, PipelineState::Translated);

        // Validation
        let stage_start = Instant::now();
        let validate = options.validate.unwrap_or_else(|| self.validation.is_enabled());
        let verdict = if validate {
            let verdict = self.validation.validate(target_language, text, &raw).await;
            self.transition(states, PipelineState::Validated);
            verdict
        } else {
            ValidationVerdict::skipped(target_language)
        };
        timings.validation = elapsed_ms(stage_start);

        // Correction
        let stage_start = Instant::now();
        let (translation, original_neural) = if verdict.has_errors() {
            let corrected = self.corrector.correct(&raw, &verdict.errors);
            self.transition(states, PipelineState::Corrected);
            (corrected, Some(raw))
        } else {
            (raw, None)
        };
        timings.correction = elapsed_ms(stage_start);

        self.transition(states, PipelineState::Done);
        timings.total = elapsed_ms(total_start);

        Ok(TranslationResult {
            corrected: original_neural.is_some(),
            translation,
            original_neural,
            verdict,
            backend: backend_id,
            model,
            selection_reason: decision.reason,
            chunk_count: chunks.len(),
            chunk_kinds: chunks.iter().map(|c| c.kind).collect(),
            states: states.clone(),
            timings,
        })
    }

    fn transition(&self, states: &mut Vec<PipelineState>, next: PipelineState) {
        if let Some(current) = states.last() {
            debug!("Pipeline state {:?} -> {:?}", current, next);
        }
        states.push(next);
    }

    /// Translate every chunk, in order, failing fast
    async fn translate_chunks(
        &self,
        backend: &dyn TranslationBackend,
        chunks: &[Chunk],
        pair: &LanguagePair,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, PipelineError> {
        let total = chunks.len();
        let backend_id = backend.id();
        let cancel = &options.cancel;
        let model = options.model.as_deref();

        let limit = if backend.supports_concurrent_calls() {
            options
                .max_concurrent_chunks
                .unwrap_or(self.max_concurrent_chunks)
                .max(1)
        } else {
            1
        };
        debug!("Translating {} chunk(s) with up to {} in flight", total, limit);

        let mut results = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| async move {
                if cancel.is_cancelled() {
                    return Ok(None);
                }

                backend
                    .translate(&chunk.text, &pair.source, &pair.target, model)
                    .await
                    .map(Some)
                    .map_err(|source| PipelineError::Translation {
                        chunk: index + 1,
                        total,
                        backend: backend_id,
                        source,
                    })
            })
            .buffered(limit);

        let mut translations = Vec::with_capacity(total);
        while let Some(result) = results.next().await {
            match result? {
                Some(translation) => {
                    translations.push(translation);
                    info!("Translated chunk {}/{}", translations.len(), total);
                }
                None => {
                    info!("Translation cancelled after {}/{} chunks", translations.len(), total);
                    return Err(PipelineError::Cancelled {
                        completed: translations.len(),
                        total,
                    });
                }
            }
        }

        Ok(translations)
    }
}
