/*!
 * Translation routing.
 *
 * This module turns a text and a language pair into a translation. It is
 * split into several submodules:
 *
 * - `segmenter`: Splits input into chunks that fit the model window
 * - `selector`: Picks the backend for a language pair
 * - `cache`: Lazily loaded, shareable model handles
 * - `orchestrator`: Drives one request through the pipeline state machine
 */

// Re-export main types for easier usage
pub use self::cache::{LoadedModel, ModelCache, ModelHandle};
pub use self::orchestrator::{
    CancellationFlag, PipelineState, StageTimings, TranslateOptions, TranslationPipeline, TranslationResult,
};
pub use self::segmenter::{Chunk, ChunkKind, SegmentationStats, Segmenter, TokenEstimator};
pub use self::selector::{BackendCatalog, BackendProfile, EngineDecision, LanguagePair, SelectionReason};

// Submodules
pub mod cache;
pub mod orchestrator;
pub mod segmenter;
pub mod selector;
