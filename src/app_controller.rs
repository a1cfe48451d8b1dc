use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::apertus::ApertusBackend;
use crate::providers::nllb::NllbBackend;
use crate::providers::{BackendId, BackendRegistry};
use crate::translation::selector::{BackendCatalog, BackendProfile};
use crate::translation::{ModelCache, Segmenter, TranslateOptions, TranslationPipeline, TranslationResult};
use crate::validation::{Corrector, SymbolicValidator, ValidationService};

// @module: Application controller for text translation

/// One row of the language listing
#[derive(Debug, Clone, Serialize)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
    /// Backends accepting the code
    pub engines: Vec<BackendId>,
}

/// Models one backend offers
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub backend: BackendId,
    /// Model used when a request names none
    pub default_model: String,
    /// Every model a request may name, the default first
    pub models: Vec<String>,
    /// Models currently held in the cache
    pub loaded: Vec<String>,
}

/// Outcome of one backend in a comparison run
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub backend: BackendId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TranslationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability of the symbolic validator
#[derive(Debug, Clone, Serialize)]
pub struct ValidatorStatus {
    pub interpreter: String,
    pub interpreter_available: bool,
    pub parser_path: PathBuf,
    pub parser_found: bool,
}

impl ValidatorStatus {
    pub fn is_ready(&self) -> bool {
        self.interpreter_available && self.parser_found
    }
}

/// Build the selector catalog from registered backends and the selection policy
pub fn build_catalog(config: &Config, registry: &BackendRegistry) -> BackendCatalog {
    BackendCatalog {
        broad: BackendProfile::new(BackendId::Nllb, registry.languages(BackendId::Nllb)),
        specialist: BackendProfile::new(BackendId::Apertus, registry.languages(BackendId::Apertus))
            .with_open_coverage(registry.accepts_any_language(BackendId::Apertus)),
        specialist_family: config.selection.specialist_family.clone(),
        preferred_for_specialist: crate::providers::language_set(&config.selection.preferred_for_specialist),
    }
}

/// Assemble the pipeline around an existing backend registry
pub fn build_pipeline(config: &Config, registry: BackendRegistry, models: ModelCache) -> TranslationPipeline {
    let catalog = build_catalog(config, &registry);
    let segmenter = Segmenter::new(config.segmentation.max_tokens)
        .with_sentence_packing(config.segmentation.pack_sentences);

    TranslationPipeline::new(registry, catalog)
        .with_segmenter(segmenter)
        .with_validation(ValidationService::with_config(config.validation.clone()))
        .with_corrector(Corrector::new(config.pipeline.correction_tag.clone()))
        .with_model_cache(models)
        .with_max_concurrent_chunks(config.pipeline.max_concurrent_chunks)
}

/// Main application controller for text translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translation pipeline
    pipeline: TranslationPipeline,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let models = ModelCache::new();
        let registry = BackendRegistry::new()
            .with(Arc::new(NllbBackend::new(config.engines.nllb.clone(), models.clone())))
            .with(Arc::new(ApertusBackend::new(config.engines.apertus.clone(), models.clone())));

        let pipeline = build_pipeline(&config, registry, models);
        Ok(Self { config, pipeline })
    }

    /// Create a controller over custom backends
    pub fn with_registry(config: Config, registry: BackendRegistry) -> Self {
        let pipeline = build_pipeline(&config, registry, ModelCache::new());
        Self { config, pipeline }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    /// Translate a text
    pub async fn translate_text(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
    ) -> Result<TranslationResult, AppError> {
        let result = self
            .pipeline
            .translate(text, source_language, target_language, options)
            .await?;

        info!(
            "Translated {} chunk(s) with {} in {}ms",
            result.chunk_count,
            result.backend.display_name(),
            result.timings.total
        );
        if result.corrected {
            warn!("Translation flagged by validation: {}", result.verdict.errors.join("; "));
        }

        Ok(result)
    }

    /// Translate a text file and write the result next to it or to `output`
    pub async fn translate_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        source_language: &str,
        target_language: &str,
        options: &TranslateOptions,
        force_overwrite: bool,
    ) -> Result<(PathBuf, TranslationResult), AppError> {
        if !FileManager::file_exists(input) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input)));
        }

        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| FileManager::generate_output_path(input, target_language));
        if output_path.exists() && !force_overwrite {
            return Err(AppError::File(format!(
                "Output file already exists: {:?} (use -f to force overwrite)",
                output_path
            )));
        }

        let text = FileManager::read_to_string(input).map_err(|e| AppError::File(e.to_string()))?;
        let result = self
            .translate_text(&text, source_language, target_language, options)
            .await?;

        FileManager::write_to_file(&output_path, &result.translation)
            .map_err(|e| AppError::File(e.to_string()))?;
        info!("Translation written to {:?}", output_path);

        Ok((output_path, result))
    }

    /// Every code some backend accepts, with the engines that accept it
    pub fn list_languages(&self) -> Vec<LanguageEntry> {
        let catalog = self.pipeline.catalog();

        catalog
            .all_languages()
            .into_iter()
            .map(|code| {
                let engines = self
                    .pipeline
                    .registry()
                    .ids()
                    .into_iter()
                    .filter(|id| catalog.supports(*id, &code))
                    .collect();
                LanguageEntry {
                    name: language_utils::display_name(&code),
                    code,
                    engines,
                }
            })
            .collect()
    }

    /// Models of every registered backend
    pub fn list_models(&self) -> Vec<ModelEntry> {
        let registry = self.pipeline.registry();
        let loaded = self.pipeline.models().loaded();

        registry
            .ids()
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(|backend| {
                let id = backend.id();
                let models = backend.models();
                ModelEntry {
                    backend: id,
                    default_model: models.first().cloned().unwrap_or_default(),
                    loaded: loaded
                        .iter()
                        .filter(|(owner, _)| *owner == id)
                        .map(|(_, model)| model.model.clone())
                        .collect(),
                    models,
                }
            })
            .collect()
    }

    /// Translate the same text with every registered backend
    pub async fn compare(&self, text: &str, source_language: &str, target_language: &str) -> Vec<ComparisonEntry> {
        let mut entries = Vec::new();

        for backend in self.pipeline.registry().ids() {
            let options = TranslateOptions::new().with_engine(Some(backend));
            let entry = match self
                .pipeline
                .translate(text, source_language, target_language, &options)
                .await
            {
                Ok(result) => ComparisonEntry {
                    backend,
                    result: Some(result),
                    error: None,
                },
                Err(e) => ComparisonEntry {
                    backend,
                    result: None,
                    error: Some(e.to_string()),
                },
            };
            entries.push(entry);
        }

        entries
    }

    /// Probe the Prolog interpreter and the parser file
    pub async fn check_validator(&self) -> ValidatorStatus {
        let validator = SymbolicValidator::new(self.config.validation.symbolic.clone());
        let config = validator.config();

        ValidatorStatus {
            interpreter: config.interpreter.clone(),
            interpreter_available: validator.is_available().await,
            parser_path: config.parser_path.clone(),
            parser_found: FileManager::file_exists(&config.parser_path),
        }
    }
}
