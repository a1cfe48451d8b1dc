/*!
 * Pattern rules for low-resource targets.
 *
 * Each validator is an ordered table of rules evaluated against the
 * translation. Every failing rule contributes one message; the verdict is
 * valid only when no rule fired.
 */

use async_trait::async_trait;
use log::debug;

use super::{ValidationVerdict, Validator, ValidatorKind, VerdictStatus};

/// Texts at most this many characters long skip the marker requirement
const MIN_CHARS_FOR_MARKERS: usize = 20;

/// One rule of a pattern table
#[derive(Debug, Clone)]
pub enum PatternRule {
    /// Every alphabetic character must be a Latin letter
    LatinScript { message: &'static str },
    /// Longer texts must contain at least one marker
    RequireAny {
        markers: &'static [&'static str],
        min_chars: usize,
        message: &'static str,
    },
    /// None of the markers may appear
    ForbidAny {
        markers: &'static [&'static str],
        message: &'static str,
    },
    /// Each marker found is reported on its own, with `prefix` in front
    ForbidEach {
        markers: &'static [&'static str],
        prefix: &'static str,
    },
}

impl PatternRule {
    /// Messages produced by this rule for `text`
    fn evaluate(&self, text: &str, lowered: &str) -> Vec<String> {
        match self {
            Self::LatinScript { message } => {
                if text.chars().filter(|c| c.is_alphabetic()).all(is_latin_letter) {
                    vec![]
                } else {
                    vec![message.to_string()]
                }
            }
            Self::RequireAny {
                markers,
                min_chars,
                message,
            } => {
                if text.chars().count() > *min_chars && !markers.iter().any(|m| lowered.contains(m)) {
                    vec![message.to_string()]
                } else {
                    vec![]
                }
            }
            Self::ForbidAny { markers, message } => {
                if markers.iter().any(|m| lowered.contains(m)) {
                    vec![message.to_string()]
                } else {
                    vec![]
                }
            }
            Self::ForbidEach { markers, prefix } => markers
                .iter()
                .filter(|m| lowered.contains(*m))
                .map(|m| format!("{}: {}", prefix, m))
                .collect(),
        }
    }
}

/// ASCII letters plus the Latin-1 Supplement and Latin Extended blocks
fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c as u32, 0x00C0..=0x024F | 0x1E00..=0x1EFF)
}

/// Rule table validator
#[derive(Debug, Clone)]
pub struct PatternValidator {
    kind: ValidatorKind,
    rules: Vec<PatternRule>,
}

impl PatternValidator {
    pub fn new(kind: ValidatorKind, rules: Vec<PatternRule>) -> Self {
        Self { kind, rules }
    }

    /// Romansh (all idioms and Rumantsch Grischun)
    pub fn romansh() -> Self {
        Self::new(
            ValidatorKind::Romansh,
            vec![
                PatternRule::LatinScript {
                    message: "Invalid character set for Romansh",
                },
                PatternRule::RequireAny {
                    markers: &["ch", "tg", "gl"],
                    min_chars: MIN_CHARS_FOR_MARKERS,
                    message: "Missing typical Romansh patterns",
                },
                PatternRule::ForbidAny {
                    markers: &["ß", "ä", "ö", "ü"],
                    message: "Possible German contamination",
                },
            ],
        )
    }

    /// Swiss German dialects
    pub fn swiss_german() -> Self {
        Self::new(
            ValidatorKind::SwissGerman,
            vec![
                PatternRule::ForbidEach {
                    markers: &["ich habe", "wir haben", "sie haben", "nicht", "keine"],
                    prefix: "Standard German form detected",
                },
                PatternRule::RequireAny {
                    markers: &["ha ", "händ", "gah", "gsi", "gsäh", "nöd", "ned", "kei"],
                    min_chars: MIN_CHARS_FOR_MARKERS,
                    message: "Missing typical Swiss-German patterns",
                },
            ],
        )
    }

    /// Run the rules in order
    pub fn check(&self, translation: &str) -> Vec<String> {
        let lowered = translation.to_lowercase();
        self.rules
            .iter()
            .flat_map(|rule| rule.evaluate(translation, &lowered))
            .collect()
    }
}

#[async_trait]
impl Validator for PatternValidator {
    fn kind(&self) -> ValidatorKind {
        self.kind
    }

    async fn validate(&self, _source: &str, translation: &str, language: &str) -> ValidationVerdict {
        let errors = self.check(translation);
        debug!("{} rules for '{}': {} issue(s)", self.kind, language, errors.len());
        ValidationVerdict::from_errors(self.kind, language, errors, VerdictStatus::Invalid)
    }
}
