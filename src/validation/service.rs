/*!
 * Validation service that dispatches to the validator of each target language.
 *
 * The dispatch table is built once at construction: every `ValidatorKind`
 * is bound to one implementation, and a target language code is mapped to
 * its kind on each call.
 */

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::generic::{GenericValidator, GenericValidatorConfig};
use super::patterns::PatternValidator;
use super::symbolic::{SymbolicConfig, SymbolicValidator};
use super::{ValidationVerdict, Validator, ValidatorKind, VerdictStatus};

/// Configuration for the validation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether translations are validated unless the request says otherwise
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum acceptable length ratio
    #[serde(default = "default_min_ratio")]
    pub length_ratio_min: f64,

    /// Maximum acceptable length ratio
    #[serde(default = "default_max_ratio")]
    pub length_ratio_max: f64,

    /// Consecutive identical tokens reported as repetition
    #[serde(default = "default_repetition_window")]
    pub repetition_window: usize,

    /// Word overlap with the source above which leakage is reported
    #[serde(default = "default_leakage_threshold")]
    pub leakage_threshold: f64,

    /// Prolog parser used for Coptic
    #[serde(default)]
    pub symbolic: SymbolicConfig,
}

fn default_true() -> bool {
    true
}

fn default_min_ratio() -> f64 {
    0.3
}

fn default_max_ratio() -> f64 {
    3.0
}

fn default_repetition_window() -> usize {
    3
}

fn default_leakage_threshold() -> f64 {
    0.5
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            length_ratio_min: default_min_ratio(),
            length_ratio_max: default_max_ratio(),
            repetition_window: default_repetition_window(),
            leakage_threshold: default_leakage_threshold(),
            symbolic: SymbolicConfig::default(),
        }
    }
}

impl ValidationConfig {
    /// Check thresholds for consistency
    pub fn validate(&self) -> Result<()> {
        if self.length_ratio_min < 0.0 || self.length_ratio_min >= self.length_ratio_max {
            return Err(anyhow!(
                "Invalid length ratio bounds: min {} must be non-negative and below max {}",
                self.length_ratio_min,
                self.length_ratio_max
            ));
        }

        if self.repetition_window < 2 {
            return Err(anyhow!("Repetition window must be at least 2"));
        }

        if !(0.0..=1.0).contains(&self.leakage_threshold) {
            return Err(anyhow!("Leakage threshold must be between 0 and 1"));
        }

        if self.symbolic.interpreter.trim().is_empty() {
            return Err(anyhow!("Symbolic validator interpreter must not be empty"));
        }

        if self.symbolic.timeout_secs == 0 {
            return Err(anyhow!("Symbolic validator timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Thresholds for the generic validator
    pub fn generic(&self) -> GenericValidatorConfig {
        GenericValidatorConfig {
            min_ratio: self.length_ratio_min,
            max_ratio: self.length_ratio_max,
            repetition_window: self.repetition_window,
            leakage_threshold: self.leakage_threshold,
        }
    }
}

/// Validation service routing translations to language-specific validators
#[derive(Debug, Clone)]
pub struct ValidationService {
    config: ValidationConfig,
    validators: HashMap<ValidatorKind, Arc<dyn Validator>>,
}

impl ValidationService {
    /// Create a new validation service with default configuration
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    /// Create a new validation service with custom configuration
    pub fn with_config(config: ValidationConfig) -> Self {
        let mut validators: HashMap<ValidatorKind, Arc<dyn Validator>> = HashMap::new();
        validators.insert(
            ValidatorKind::Symbolic,
            Arc::new(SymbolicValidator::new(config.symbolic.clone())),
        );
        validators.insert(ValidatorKind::Romansh, Arc::new(PatternValidator::romansh()));
        validators.insert(ValidatorKind::SwissGerman, Arc::new(PatternValidator::swiss_german()));
        validators.insert(
            ValidatorKind::Generic,
            Arc::new(GenericValidator::with_config(config.generic())),
        );

        Self { config, validators }
    }

    /// Replace the implementation bound to a validator's kind
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.insert(validator.kind(), validator);
        self
    }

    /// Check if validation is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validator responsible for a target language
    pub fn validator_for(&self, target_language: &str) -> Option<&Arc<dyn Validator>> {
        self.validators.get(&ValidatorKind::for_language(target_language))
    }

    /// Validate a translation of `source` into `target_language`
    ///
    /// Never fails: a validator that cannot run yields a `Timeout` or `Error`
    /// verdict instead.
    pub async fn validate(&self, target_language: &str, source: &str, translation: &str) -> ValidationVerdict {
        let kind = ValidatorKind::for_language(target_language);
        let Some(validator) = self.validators.get(&kind) else {
            warn!("No validator bound to {}", kind);
            return ValidationVerdict::error(kind, target_language, format!("Validation error: no {} validator", kind));
        };

        debug!("Validating '{}' translation with {} validator", target_language, kind);
        let verdict = validator.validate(source, translation, target_language).await;

        match verdict.status {
            VerdictStatus::Timeout | VerdictStatus::Error => {
                warn!("Translation left unvalidated: {}", verdict.errors.join("; "))
            }
            VerdictStatus::Invalid | VerdictStatus::Warning => {
                debug!("Validation found {} issue(s)", verdict.errors.len())
            }
            _ => {}
        }

        verdict
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}
