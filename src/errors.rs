/*!
 * Error types for the traductal application.
 *
 * Backend adapters report `BackendError`, the pipeline reports `PipelineError`
 * tagged with the stage that failed, and the application edge wraps both in
 * `AppError`. All of them use the thiserror crate.
 */

use serde::Serialize;
use thiserror::Error;

use crate::providers::BackendId;

/// Errors a translation backend can report for a single chunk
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend could not be reached or its model could not be loaded
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time
    #[error("Backend timed out: {0}")]
    Timeout(String),

    /// The model ran but produced an error or an unusable answer
    #[error("Model failure: {0}")]
    ModelFailure(String),
}

/// Coarse classification of a backend error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    Unavailable,
    Timeout,
    ModelFailure,
}

impl BackendError {
    /// Get the kind of this error
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            Self::Unavailable(_) => BackendErrorKind::Unavailable,
            Self::Timeout(_) => BackendErrorKind::Timeout,
            Self::ModelFailure(_) => BackendErrorKind::ModelFailure,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::Unavailable(error.to_string())
        } else {
            Self::ModelFailure(error.to_string())
        }
    }
}

/// Pipeline stage a fatal error originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Segmentation,
    Selection,
    Translation,
    Validation,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Segmentation => "segmentation",
            Self::Selection => "selection",
            Self::Translation => "translation",
            Self::Validation => "validation",
        };
        write!(f, "{}", name)
    }
}

/// Fatal errors that abort a translation request
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Nothing to translate
    #[error("Input text is empty")]
    EmptyInput,

    /// No backend covers the language pair
    #[error("No translation engine supports {source_language} -> {target_language}")]
    EngineUnsupported {
        source_language: String,
        target_language: String,
    },

    /// The selected backend is not registered with the pipeline
    #[error("Backend {0} is not registered")]
    BackendMissing(BackendId),

    /// The selected backend does not offer the requested model
    #[error("Backend {backend} has no model '{model}'")]
    ModelUnavailable { backend: BackendId, model: String },

    /// A chunk failed to translate; `chunk` is 1-based
    #[error("Chunk {chunk}/{total} failed on {backend}: {source}")]
    Translation {
        chunk: usize,
        total: usize,
        backend: BackendId,
        #[source]
        source: BackendError,
    },

    /// The caller cancelled the request between chunks
    #[error("Translation cancelled after {completed}/{total} chunks")]
    Cancelled { completed: usize, total: usize },
}

impl PipelineError {
    /// Get the stage this error belongs to
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::EmptyInput => PipelineStage::Segmentation,
            Self::EngineUnsupported { .. } | Self::BackendMissing(_) | Self::ModelUnavailable { .. } => {
                PipelineStage::Selection
            }
            Self::Translation { .. } | Self::Cancelled { .. } => PipelineStage::Translation,
        }
    }

    /// 1-based index of the failing chunk, when the error is tied to one
    pub fn chunk(&self) -> Option<usize> {
        match self {
            Self::Translation { chunk, .. } => Some(*chunk),
            _ => None,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
