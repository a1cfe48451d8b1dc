/*!
 * Tests for error types and their classification
 */

use std::error::Error;

use traductal::errors::{AppError, BackendError, BackendErrorKind, PipelineError, PipelineStage};
use traductal::providers::BackendId;

#[test]
fn test_backendError_kind_shouldMatchVariant() {
    assert_eq!(BackendError::Unavailable("down".into()).kind(), BackendErrorKind::Unavailable);
    assert_eq!(BackendError::Timeout("slow".into()).kind(), BackendErrorKind::Timeout);
    assert_eq!(BackendError::ModelFailure("oom".into()).kind(), BackendErrorKind::ModelFailure);
}

#[test]
fn test_pipelineError_translation_shouldCarryChunkAndSource() {
    let error = PipelineError::Translation {
        chunk: 2,
        total: 3,
        backend: BackendId::Nllb,
        source: BackendError::Timeout("no answer after 60s".into()),
    };

    assert_eq!(error.stage(), PipelineStage::Translation);
    assert_eq!(error.chunk(), Some(2));
    assert_eq!(
        error.to_string(),
        "Chunk 2/3 failed on nllb: Backend timed out: no answer after 60s"
    );
    assert!(error.source().is_some());
}

#[test]
fn test_pipelineError_stage_shouldClassifyEachVariant() {
    assert_eq!(PipelineError::EmptyInput.stage(), PipelineStage::Segmentation);
    assert_eq!(
        PipelineError::EngineUnsupported {
            source_language: "xx".into(),
            target_language: "yy".into(),
        }
        .stage(),
        PipelineStage::Selection
    );
    assert_eq!(PipelineError::BackendMissing(BackendId::Apertus).stage(), PipelineStage::Selection);
    assert_eq!(
        PipelineError::Cancelled { completed: 1, total: 4 }.stage(),
        PipelineStage::Translation
    );
    assert_eq!(PipelineError::EmptyInput.chunk(), None);
}

#[test]
fn test_appError_fromPipelineError_shouldWrapMessage() {
    let error: AppError = PipelineError::EmptyInput.into();
    assert!(matches!(error, AppError::Pipeline(PipelineError::EmptyInput)));
    assert_eq!(error.to_string(), "Pipeline error: Input text is empty");
}
