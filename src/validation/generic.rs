/*!
 * Language-independent translation heuristics.
 *
 * Used for every target that has no dedicated validator. Checks the
 * character length ratio, empty output, runs of a repeated token (a typical
 * hallucination symptom) and word overlap with the source (the model copied
 * instead of translating).
 */

use async_trait::async_trait;
use log::debug;
use std::collections::HashSet;
use std::fmt;

use super::{ValidationVerdict, Validator, ValidatorKind, VerdictStatus};

/// Thresholds for the generic checks
#[derive(Debug, Clone)]
pub struct GenericValidatorConfig {
    /// Smallest accepted translation/source length ratio
    pub min_ratio: f64,
    /// Largest accepted translation/source length ratio
    pub max_ratio: f64,
    /// Number of consecutive identical tokens reported as repetition
    pub repetition_window: usize,
    /// Share of translation words also found in the source above which leakage is reported
    pub leakage_threshold: f64,
}

impl Default for GenericValidatorConfig {
    fn default() -> Self {
        Self {
            min_ratio: 0.3,
            max_ratio: 3.0,
            repetition_window: 3,
            leakage_threshold: 0.5,
        }
    }
}

/// Issue found by the generic checks
#[derive(Debug, Clone, PartialEq)]
pub enum GenericIssue {
    TooLong { ratio: f64 },
    TooShort { ratio: f64 },
    Empty,
    Repetition,
    SourceLeakage,
}

impl GenericIssue {
    /// Blocking issues make the verdict `Invalid`, others only `Warning`
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::TooLong { .. } | Self::TooShort { .. } | Self::Empty)
    }
}

impl fmt::Display for GenericIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { ratio } => write!(f, "Translation too long (ratio: {:.2})", ratio),
            Self::TooShort { ratio } => write!(f, "Translation too short (ratio: {:.2})", ratio),
            Self::Empty => write!(f, "Empty translation"),
            Self::Repetition => write!(f, "Token repetition detected (possible hallucination)"),
            Self::SourceLeakage => write!(f, "Source language leakage detected"),
        }
    }
}

/// Character length ratio of translation to source
pub fn length_ratio(source: &str, translation: &str) -> f64 {
    let source_len = source.chars().count().max(1);
    translation.chars().count() as f64 / source_len as f64
}

/// Whether `window` consecutive whitespace tokens are all the same token
pub fn has_token_repetition(text: &str, window: usize) -> bool {
    if window < 2 {
        return false;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .windows(window)
        .any(|w| w.iter().all(|token| *token == w[0]))
}

/// Share of the translation's distinct lower-cased words that also appear in the source
pub fn word_overlap(source: &str, translation: &str) -> f64 {
    let translation_words: HashSet<String> = translation
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if translation_words.is_empty() {
        return 0.0;
    }

    let source_words: HashSet<String> = source.split_whitespace().map(str::to_lowercase).collect();
    let shared = translation_words.intersection(&source_words).count();
    shared as f64 / translation_words.len() as f64
}

/// Generic heuristics validator
#[derive(Debug, Clone, Default)]
pub struct GenericValidator {
    config: GenericValidatorConfig,
}

impl GenericValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GenericValidatorConfig) -> Self {
        Self { config }
    }

    /// Run every check in order and collect the issues
    pub fn check(&self, source: &str, translation: &str) -> Vec<GenericIssue> {
        let mut issues = Vec::new();
        let ratio = length_ratio(source, translation);

        if ratio > self.config.max_ratio {
            issues.push(GenericIssue::TooLong { ratio });
        } else if ratio < self.config.min_ratio {
            issues.push(GenericIssue::TooShort { ratio });
        }

        if translation.trim().is_empty() {
            issues.push(GenericIssue::Empty);
        }

        if has_token_repetition(translation, self.config.repetition_window) {
            issues.push(GenericIssue::Repetition);
        }

        if word_overlap(source, translation) > self.config.leakage_threshold {
            issues.push(GenericIssue::SourceLeakage);
        }

        issues
    }
}

#[async_trait]
impl Validator for GenericValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Generic
    }

    async fn validate(&self, source: &str, translation: &str, language: &str) -> ValidationVerdict {
        let issues = self.check(source, translation);
        let ratio = length_ratio(source, translation);

        let severity = if issues.iter().any(GenericIssue::is_blocking) {
            VerdictStatus::Invalid
        } else {
            VerdictStatus::Warning
        };

        debug!(
            "Generic validation for '{}': ratio {:.2}, {} issue(s)",
            language,
            ratio,
            issues.len()
        );

        let errors = issues.iter().map(ToString::to_string).collect();
        ValidationVerdict::from_errors(ValidatorKind::Generic, language, errors, severity)
            .with_extra("length_ratio", ratio)
    }
}
