use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use url::Url;

use crate::validation::ValidationConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default source language code
    pub source_language: String,

    /// Default target language code
    pub target_language: String,

    /// Translation engines
    #[serde(default)]
    pub engines: EnginesConfig,

    /// Engine selection policy
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Text segmentation
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Translation validation
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend configurations
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EnginesConfig {
    /// Broad-coverage NLLB inference server
    #[serde(default)]
    pub nllb: NllbConfig,

    /// Specialist Apertus model behind an Ollama-compatible server
    #[serde(default)]
    pub apertus: ApertusConfig,
}

/// NLLB inference server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NllbConfig {
    /// Default model name (e.g., "facebook/nllb-200-distilled-600M")
    #[serde(default = "default_nllb_model")]
    pub model: String,

    /// Other models the server can load on request
    #[serde(default = "default_nllb_available_models")]
    pub available_models: Vec<String>,

    /// Service endpoint URL
    #[serde(default = "default_nllb_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_nllb_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum generated sequence length
    #[serde(default = "default_nllb_max_length")]
    pub max_length: u32,

    /// Beam search width
    #[serde(default = "default_nllb_num_beams")]
    pub num_beams: u32,
}

impl Default for NllbConfig {
    fn default() -> Self {
        Self {
            model: default_nllb_model(),
            available_models: default_nllb_available_models(),
            endpoint: default_nllb_endpoint(),
            timeout_secs: default_nllb_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_length: default_nllb_max_length(),
            num_beams: default_nllb_num_beams(),
        }
    }
}

/// Apertus service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApertusConfig {
    /// Default model name as known by the server
    #[serde(default = "default_apertus_model")]
    pub model: String,

    /// Other models the server can load on request
    #[serde(default)]
    pub available_models: Vec<String>,

    /// Take any ISO 639 code, not only the listed languages
    #[serde(default = "default_apertus_catch_all")]
    pub catch_all: bool,

    /// Service endpoint URL
    #[serde(default = "default_apertus_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_apertus_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sampling temperature
    #[serde(default = "default_apertus_temperature")]
    pub temperature: f32,

    /// Nucleus sampling threshold
    #[serde(default = "default_apertus_top_p")]
    pub top_p: f32,

    /// Maximum number of generated tokens
    #[serde(default = "default_apertus_max_new_tokens")]
    pub max_new_tokens: u32,

    /// How long the server keeps the model in memory (e.g. "10m")
    #[serde(default)]
    pub keep_alive: Option<String>,
}

impl Default for ApertusConfig {
    fn default() -> Self {
        Self {
            model: default_apertus_model(),
            available_models: Vec::new(),
            catch_all: default_apertus_catch_all(),
            endpoint: default_apertus_endpoint(),
            timeout_secs: default_apertus_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_apertus_temperature(),
            top_p: default_apertus_top_p(),
            max_new_tokens: default_apertus_max_new_tokens(),
            keep_alive: None,
        }
    }
}

/// Engine selection policy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectionConfig {
    /// Language family routed to the specialist backend
    #[serde(default = "default_specialist_family")]
    pub specialist_family: String,

    /// Partner languages for which the specialist is preferred
    #[serde(default = "default_preferred_for_specialist")]
    pub preferred_for_specialist: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            specialist_family: default_specialist_family(),
            preferred_for_specialist: default_preferred_for_specialist(),
        }
    }
}

/// Text segmentation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Token budget per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Pack consecutive sentences into one chunk while they fit
    #[serde(default)]
    pub pack_sentences: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            pack_sentences: false,
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Chunks translated in parallel when the backend allows it
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,

    /// Tag the corrector puts in front of a flagged translation
    #[serde(default = "default_correction_tag")]
    pub correction_tag: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chunks: default_max_concurrent_chunks(),
            correction_tag: default_correction_tag(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` level filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_nllb_model() -> String {
    "facebook/nllb-200-distilled-600M".to_string()
}

fn default_nllb_available_models() -> Vec<String> {
    [
        "facebook/nllb-200-distilled-600M",
        "facebook/nllb-200-distilled-1.3B",
        "facebook/nllb-200-1.3B",
        "facebook/nllb-200-3.3B",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_nllb_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_nllb_timeout_secs() -> u64 {
    60
}

fn default_nllb_max_length() -> u32 {
    512
}

fn default_nllb_num_beams() -> u32 {
    5
}

fn default_apertus_model() -> String {
    "apertus-8b-instruct".to_string()
}

fn default_apertus_catch_all() -> bool {
    true
}

fn default_apertus_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_apertus_timeout_secs() -> u64 {
    120 // Causal LM generation on CPU is slow
}

fn default_apertus_temperature() -> f32 {
    0.7
}

fn default_apertus_top_p() -> f32 {
    0.9
}

fn default_apertus_max_new_tokens() -> u32 {
    512
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_specialist_family() -> String {
    "rm".to_string()
}

fn default_preferred_for_specialist() -> Vec<String> {
    ["de", "en", "fr", "it", "es", "pt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_tokens() -> usize {
    400 // Safe margin below the 512 token model window
}

fn default_max_concurrent_chunks() -> usize {
    1
}

fn default_correction_tag() -> String {
    "[VALIDATED]".to_string()
}

/// Environment variable overriding the Prolog interpreter
pub const ENV_TREALLA_PATH: &str = "TREALLA_PATH";
/// Environment variable overriding the NLLB endpoint
pub const ENV_NLLB_ENDPOINT: &str = "NLLB_ENDPOINT";
/// Environment variable overriding the Apertus endpoint
pub const ENV_APERTUS_ENDPOINT: &str = "APERTUS_ENDPOINT";

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable lookup; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(interpreter) = value(ENV_TREALLA_PATH) {
            self.validation.symbolic.interpreter = interpreter;
        }
        if let Some(endpoint) = value(ENV_NLLB_ENDPOINT) {
            self.engines.nllb.endpoint = endpoint;
        }
        if let Some(endpoint) = value(ENV_APERTUS_ENDPOINT) {
            self.engines.apertus.endpoint = endpoint;
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        Url::parse(&self.engines.nllb.endpoint)
            .map_err(|e| anyhow!("Invalid NLLB endpoint '{}': {}", self.engines.nllb.endpoint, e))?;
        Url::parse(&self.engines.apertus.endpoint)
            .map_err(|e| anyhow!("Invalid Apertus endpoint '{}': {}", self.engines.apertus.endpoint, e))?;

        if self.engines.nllb.model.trim().is_empty() || self.engines.apertus.model.trim().is_empty() {
            return Err(anyhow!("Engine model names must not be empty"));
        }

        if self.selection.specialist_family.trim().is_empty() {
            return Err(anyhow!("Specialist language family must not be empty"));
        }

        if self.segmentation.max_tokens == 0 {
            return Err(anyhow!("Segmentation max_tokens must be greater than zero"));
        }

        if self.pipeline.max_concurrent_chunks == 0 {
            return Err(anyhow!("Pipeline max_concurrent_chunks must be at least 1"));
        }

        self.validation.validate()?;

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            engines: EnginesConfig::default(),
            selection: SelectionConfig::default(),
            segmentation: SegmentationConfig::default(),
            validation: ValidationConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
