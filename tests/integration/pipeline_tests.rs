/*!
 * Integration tests for the translation pipeline.
 *
 * Drives whole requests through selection, segmentation, translation,
 * validation and correction with mock backends standing in for the models.
 */

use std::time::Duration;

use traductal::errors::{BackendError, PipelineError, PipelineStage};
use traductal::providers::mock::{MockBackend, MockBehavior};
use traductal::providers::{BackendId, language_set};
use traductal::translation::{
    BackendCatalog, BackendProfile, CancellationFlag, ChunkKind, PipelineState, SelectionReason, TranslateOptions,
    TranslationPipeline,
};
use traductal::validation::{ValidatorKind, VerdictStatus};

use crate::common::{
    broad_mock, chunking_pipeline, init_test_logging, mock_pipeline, registry_of, reversed_words, specialist_mock,
    three_paragraphs,
};

#[tokio::test]
async fn test_translate_withShortText_shouldRunEveryStage() {
    init_test_logging();
    let broad = broad_mock(MockBackend::working().with_custom_response(reversed_words));
    let pipeline = mock_pipeline(&[broad.clone()]);

    let result = pipeline
        .translate("Hello brave new world", "en", "fr", &TranslateOptions::new())
        .await
        .unwrap();

    assert_eq!(result.translation, "olleH evarb wen dlrow");
    assert_eq!(result.backend, BackendId::Nllb);
    assert_eq!(result.selection_reason, SelectionReason::BroadCoverage);
    assert_eq!(result.chunk_count, 1);
    assert_eq!(result.chunk_kinds, vec![ChunkKind::Full]);
    assert_eq!(result.verdict.status, VerdictStatus::Valid);
    assert!(!result.corrected);
    assert!(result.original_neural.is_none());
    assert_eq!(
        result.states,
        vec![
            PipelineState::Init,
            PipelineState::Segmented,
            PipelineState::Translated,
            PipelineState::Validated,
            PipelineState::Done,
        ]
    );
    assert!(result.timings.total >= result.timings.translation);
    assert_eq!(broad.call_count(), 1);
}

#[tokio::test]
async fn test_translate_withFailingSecondChunk_shouldFailFastWithoutPartialOutput() {
    init_test_logging();
    let broad = broad_mock(MockBackend::fail_on_call(2));
    let pipeline = chunking_pipeline(&[broad.clone()], 5);

    let error = pipeline
        .translate(three_paragraphs(), "en", "fr", &TranslateOptions::new())
        .await
        .unwrap_err();

    match error {
        PipelineError::Translation {
            chunk,
            total,
            backend,
            source,
        } => {
            assert_eq!(chunk, 2);
            assert_eq!(total, 3);
            assert_eq!(backend, BackendId::Nllb);
            assert!(matches!(source, BackendError::ModelFailure(_)));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(broad.call_count(), 2);
}

#[tokio::test]
async fn test_translate_withIntermittentBackend_shouldFailOneRequestAndServeTheNext() {
    init_test_logging();
    let broad = broad_mock(MockBackend::intermittent(3));
    let pipeline = chunking_pipeline(&[broad.clone()], 5);
    let options = TranslateOptions::new().with_validation(false);

    let error = pipeline
        .translate(three_paragraphs(), "en", "fr", &options)
        .await
        .unwrap_err();
    match error {
        PipelineError::Translation { chunk, total, source, .. } => {
            assert_eq!((chunk, total), (3, 3));
            assert!(matches!(source, BackendError::Unavailable(_)));
        }
        other => panic!("unexpected error: {}", other),
    }

    let result = pipeline.translate("Hello", "en", "fr", &options).await.unwrap();
    assert_eq!(result.translation, "[fr] Hello");
    assert_eq!(broad.call_count(), 4);
}

#[tokio::test]
async fn test_translate_withParallelChunks_shouldKeepChunkOrder() {
    let broad = broad_mock(MockBackend::staggered(30, 3).concurrent(true));
    let pipeline = chunking_pipeline(&[broad.clone()], 5);
    let options = TranslateOptions::new()
        .with_validation(false)
        .with_max_concurrent_chunks(3);

    let result = pipeline.translate(three_paragraphs(), "en", "fr", &options).await.unwrap();

    assert_eq!(
        result.translation,
        "[fr] Alpha beta gamma.\n\n[fr] Delta epsilon zeta.\n\n[fr] Eta theta iota."
    );
    assert_eq!(result.chunk_kinds, vec![ChunkKind::Paragraph; 3]);
    assert_eq!(broad.peak_concurrency(), 3);
}

#[tokio::test]
async fn test_translate_withSequentialBackend_shouldIgnoreConcurrencyLimit() {
    let broad = broad_mock(MockBackend::staggered(5, 3));
    let pipeline = chunking_pipeline(&[broad.clone()], 5).with_max_concurrent_chunks(4);
    let options = TranslateOptions::new().with_validation(false);

    let result = pipeline.translate(three_paragraphs(), "en", "fr", &options).await.unwrap();

    assert_eq!(result.chunk_count, 3);
    assert_eq!(broad.peak_concurrency(), 1);
}

#[tokio::test]
async fn test_translate_withParallelChunksAndFailure_shouldReportFirstFailingChunk() {
    let broad = broad_mock(MockBackend::failing().concurrent(true));
    let pipeline = chunking_pipeline(&[broad], 5);
    let options = TranslateOptions::new().with_max_concurrent_chunks(3);

    let error = pipeline
        .translate(three_paragraphs(), "en", "fr", &options)
        .await
        .unwrap_err();

    assert_eq!(error.chunk(), Some(1));
}

#[tokio::test]
async fn test_translate_withCancelledFlag_shouldStopBeforeFirstChunk() {
    let broad = broad_mock(MockBackend::working());
    let pipeline = chunking_pipeline(&[broad.clone()], 5);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let error = pipeline
        .translate(
            three_paragraphs(),
            "en",
            "fr",
            &TranslateOptions::new().with_cancellation(cancel),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Cancelled { completed: 0, total: 3 }));
    assert_eq!(broad.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withCancellationMidRun_shouldLetRunningChunkFinish() {
    let broad = broad_mock(MockBackend::new(MockBehavior::Slow { delay_ms: 200 }));
    let pipeline = chunking_pipeline(&[broad.clone()], 5);
    let cancel = CancellationFlag::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let error = pipeline
        .translate(
            three_paragraphs(),
            "en",
            "fr",
            &TranslateOptions::new().with_cancellation(cancel),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Cancelled { completed: 2, total: 3 }));
    assert_eq!(broad.call_count(), 2);
}

#[tokio::test]
async fn test_translate_withValidationDisabled_shouldReturnSkippedVerdict() {
    let broad = broad_mock(MockBackend::empty());
    let pipeline = mock_pipeline(&[broad]);

    let result = pipeline
        .translate("Hello", "en", "fr", &TranslateOptions::new().with_validation(false))
        .await
        .unwrap();

    assert_eq!(result.verdict.status, VerdictStatus::Skipped);
    assert!(!result.corrected);
    assert!(!result.states.contains(&PipelineState::Validated));
}

#[tokio::test]
async fn test_translate_withEmptyOutput_shouldCorrectOnce() {
    let broad = broad_mock(MockBackend::empty());
    let pipeline = mock_pipeline(&[broad.clone()]);

    let result = pipeline
        .translate("Hello there", "en", "fr", &TranslateOptions::new())
        .await
        .unwrap();

    assert_eq!(result.verdict.status, VerdictStatus::Invalid);
    assert_eq!(
        result.verdict.errors,
        vec![
            "Translation too short (ratio: 0.00)".to_string(),
            "Empty translation".to_string()
        ]
    );
    assert!(result.corrected);
    assert!(result.translation.starts_with("[VALIDATED]"));
    assert_eq!(result.original_neural.as_deref(), Some(""));
    assert_eq!(broad.call_count(), 1);
    assert!(result.states.ends_with(&[PipelineState::Corrected, PipelineState::Done]));
}

#[tokio::test]
async fn test_translate_withRomanshTarget_shouldRouteToSpecialistAndCorrect() {
    let broad = broad_mock(MockBackend::working());
    let specialist = specialist_mock(MockBackend::working().with_custom_response(|_| "Schöne Grüße".to_string()));
    let pipeline = mock_pipeline(&[broad.clone(), specialist.clone()]);

    let result = pipeline
        .translate("Schöne Grüsse", "de", "rm-vallader", &TranslateOptions::new())
        .await
        .unwrap();

    assert_eq!(result.backend, BackendId::Apertus);
    assert_eq!(result.selection_reason, SelectionReason::SpecialistPreferred);
    assert_eq!(result.verdict.errors, vec!["Possible German contamination".to_string()]);
    assert_eq!(result.translation, "[VALIDATED] Schöne Grüße");
    assert_eq!(result.original_neural.as_deref(), Some("Schöne Grüße"));
    assert_eq!(broad.call_count(), 0);
    assert_eq!(specialist.call_count(), 1);
}

#[tokio::test]
async fn test_translate_withSwissGermanTarget_shouldCatchAllToSpecialistAndRunPatterns() {
    let broad = broad_mock(MockBackend::working()).with_languages(["en", "de", "fr"]);
    let specialist = specialist_mock(
        MockBackend::working().with_custom_response(|_| "Ich habe das nicht gesehen".to_string()),
    )
    .with_open_coverage(true);
    let pipeline = mock_pipeline(&[broad.clone(), specialist.clone()]);

    let result = pipeline
        .translate("Ich habe das nicht gesehen", "de", "gsw", &TranslateOptions::new())
        .await
        .unwrap();

    assert_eq!(result.backend, BackendId::Apertus);
    assert_eq!(result.selection_reason, SelectionReason::CatchAll);
    assert_eq!(result.verdict.validator, Some(ValidatorKind::SwissGerman));
    assert!(result
        .verdict
        .errors
        .contains(&"Standard German form detected: nicht".to_string()));
    assert!(result.corrected);
    assert_eq!(broad.call_count(), 0);
    assert_eq!(specialist.call_count(), 1);
}

#[tokio::test]
async fn test_translate_withRequestedModel_shouldPassItToEveryChunk() {
    let broad = broad_mock(
        MockBackend::working()
            .with_models("nllb-600M", ["nllb-3.3B"])
            .with_custom_response(|req| format!("{}:{}", req.model.as_deref().unwrap_or("default"), req.text)),
    );
    let pipeline = chunking_pipeline(&[broad.clone()], 5);
    let options = TranslateOptions::new()
        .with_validation(false)
        .with_model(Some("nllb-3.3B".to_string()));

    let result = pipeline.translate(three_paragraphs(), "en", "fr", &options).await.unwrap();

    assert_eq!(result.model, "nllb-3.3B");
    assert_eq!(
        result.translation,
        "nllb-3.3B:Alpha beta gamma.\n\nnllb-3.3B:Delta epsilon zeta.\n\nnllb-3.3B:Eta theta iota."
    );

    let default = pipeline
        .translate("Hello", "en", "fr", &TranslateOptions::new().with_validation(false))
        .await
        .unwrap();
    assert_eq!(default.model, "nllb-600M");
    assert_eq!(default.translation, "default:Hello");
}

#[tokio::test]
async fn test_translate_withUnknownModel_shouldFailAtSelection() {
    let broad = broad_mock(MockBackend::working().with_models("nllb-600M", ["nllb-3.3B"]));
    let pipeline = mock_pipeline(&[broad.clone()]);
    let options = TranslateOptions::new().with_model(Some("m2m100".to_string()));

    let error = pipeline.translate("Hello", "en", "fr", &options).await.unwrap_err();

    assert_eq!(error.stage(), PipelineStage::Selection);
    assert!(matches!(
        error,
        PipelineError::ModelUnavailable { backend: BackendId::Nllb, ref model } if model == "m2m100"
    ));
    assert_eq!(broad.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withForcedEngine_shouldBypassSelection() {
    let broad = broad_mock(MockBackend::working());
    let specialist = specialist_mock(MockBackend::working());
    let pipeline = mock_pipeline(&[broad.clone(), specialist.clone()]);
    let options = TranslateOptions::new()
        .with_engine(Some(BackendId::Apertus))
        .with_validation(false);

    let result = pipeline.translate("Good evening", "en", "fr", &options).await.unwrap();

    assert_eq!(result.backend, BackendId::Apertus);
    assert_eq!(result.selection_reason, SelectionReason::Forced);
    assert_eq!(broad.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withUnsupportedPair_shouldFailBeforeAnyBackendCall() {
    let broad = broad_mock(MockBackend::working());
    let pipeline = mock_pipeline(&[broad.clone()]);

    let error = pipeline
        .translate("Hello", "en", "tlh", &TranslateOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        PipelineError::EngineUnsupported { ref target_language, .. } if target_language == "tlh"
    ));
    assert_eq!(broad.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withUnregisteredSelection_shouldReportMissingBackend() {
    let broad = broad_mock(MockBackend::working());
    let catalog = BackendCatalog {
        broad: BackendProfile::new(BackendId::Nllb, language_set(["en", "de"])),
        specialist: BackendProfile::new(BackendId::Apertus, language_set(["en", "de"])),
        specialist_family: "rm".to_string(),
        preferred_for_specialist: language_set(["de"]),
    };
    let pipeline = TranslationPipeline::new(registry_of(&[broad]), catalog);

    let error = pipeline
        .translate("Guten Tag", "de", "rm", &TranslateOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::BackendMissing(BackendId::Apertus)));
}

#[tokio::test]
async fn test_translate_withBlankInput_shouldFailWithEmptyInput() {
    let broad = broad_mock(MockBackend::working());
    let pipeline = mock_pipeline(&[broad.clone()]);

    let error = pipeline
        .translate("  \n\n \t", "en", "fr", &TranslateOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::EmptyInput));
    assert_eq!(broad.call_count(), 0);
}
