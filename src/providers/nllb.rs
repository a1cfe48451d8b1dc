/*!
 * NLLB-200 backend.
 *
 * Talks to an inference server hosting the NLLB sequence-to-sequence model.
 * ISO 639-1 codes are mapped to NLLB's `lang_Script` codes before each
 * request. The server handles one request per call without shared decoding
 * state, so chunks may be sent in parallel. Several model sizes can be
 * loaded side by side; each has its own handle in the model cache.
 */

use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::app_config::NllbConfig;
use crate::errors::BackendError;
use crate::translation::cache::{LoadedModel, ModelCache};

use super::http::JsonClient;
use super::{BackendId, TranslationBackend, model_list, preview};

/// ISO 639-1 to NLLB language code table
static NLLB_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("en", "eng_Latn"),
        ("fr", "fra_Latn"),
        ("de", "deu_Latn"),
        ("es", "spa_Latn"),
        ("it", "ita_Latn"),
        ("pt", "por_Latn"),
        ("ru", "rus_Cyrl"),
        ("zh", "zho_Hans"),
        ("ja", "jpn_Jpan"),
        ("ko", "kor_Hang"),
        ("ar", "arb_Arab"),
        ("hi", "hin_Deva"),
        ("tr", "tur_Latn"),
        ("pl", "pol_Latn"),
        ("nl", "nld_Latn"),
        ("sv", "swe_Latn"),
        ("da", "dan_Latn"),
        ("no", "nor_Latn"),
        ("fi", "fin_Latn"),
        ("cs", "ces_Latn"),
        ("hu", "hun_Latn"),
        ("ro", "ron_Latn"),
        ("bg", "bul_Cyrl"),
        ("hr", "hrv_Latn"),
        ("sk", "slk_Latn"),
        ("sl", "slv_Latn"),
        ("et", "est_Latn"),
        ("lv", "lav_Latn"),
        ("lt", "lit_Latn"),
        ("el", "ell_Grek"),
        ("he", "heb_Hebr"),
        ("th", "tha_Thai"),
        ("vi", "vie_Latn"),
        ("id", "ind_Latn"),
        ("ms", "zsm_Latn"),
        ("tl", "tgl_Latn"),
        ("sw", "swh_Latn"),
        ("am", "amh_Ethi"),
        ("yo", "yor_Latn"),
        ("ig", "ibo_Latn"),
        ("ha", "hau_Latn"),
        ("zu", "zul_Latn"),
        ("af", "afr_Latn"),
        ("is", "isl_Latn"),
        ("mt", "mlt_Latn"),
        ("cy", "cym_Latn"),
        ("ga", "gle_Latn"),
        ("eu", "eus_Latn"),
        ("ca", "cat_Latn"),
        ("gl", "glg_Latn"),
    ])
});

/// NLLB code for an ISO code
pub fn nllb_code(code: &str) -> Option<&'static str> {
    NLLB_CODES.get(code.to_lowercase().as_str()).copied()
}

/// ISO codes the NLLB table covers
pub fn supported_codes() -> HashSet<String> {
    NLLB_CODES.keys().map(|code| code.to_string()).collect()
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    model: String,
    #[serde(default)]
    device: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
    model: &'a str,
    max_length: u32,
    num_beams: u32,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: String,
}

/// Broad-coverage backend over an NLLB inference server
#[derive(Debug)]
pub struct NllbBackend {
    config: NllbConfig,
    client: JsonClient,
    cache: ModelCache,
    languages: HashSet<String>,
}

impl NllbBackend {
    pub fn new(config: NllbConfig, cache: ModelCache) -> Self {
        let client = JsonClient::new(
            "NLLB",
            config.endpoint.clone(),
            config.timeout_secs,
            config.retry_count,
            config.retry_backoff_ms,
        );

        Self {
            config,
            client,
            cache,
            languages: supported_codes(),
        }
    }

    /// Load a model on the server unless its handle already did
    pub async fn ensure_loaded(&self, model: &str) -> Result<Arc<LoadedModel>, BackendError> {
        self.cache
            .handle(BackendId::Nllb, model)
            .get_or_load(|| async {
                info!("Loading NLLB model '{}'", model);
                let response: LoadResponse = self
                    .client
                    .post("/load", &LoadRequest { model })
                    .await
                    .map_err(|e| BackendError::Unavailable(format!("NLLB model load failed: {}", e)))?;
                Ok::<_, BackendError>(LoadedModel::new(response.model, response.device))
            })
            .await
    }
}

#[async_trait]
impl TranslationBackend for NllbBackend {
    fn id(&self) -> BackendId {
        BackendId::Nllb
    }

    fn supported_languages(&self) -> &HashSet<String> {
        &self.languages
    }

    fn models(&self) -> Vec<String> {
        model_list(&self.config.model, &self.config.available_models)
    }

    fn supports_concurrent_calls(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model: Option<&str>,
    ) -> Result<String, BackendError> {
        let model_name = model.unwrap_or(self.config.model.as_str());
        if !self.models().iter().any(|m| m == model_name) {
            return Err(BackendError::ModelFailure(format!("Unknown NLLB model '{}'", model_name)));
        }

        let source_lang = nllb_code(source_language)
            .ok_or_else(|| BackendError::ModelFailure(format!("NLLB has no code for '{}'", source_language)))?;
        let target_lang = nllb_code(target_language)
            .ok_or_else(|| BackendError::ModelFailure(format!("NLLB has no code for '{}'", target_language)))?;

        let model = self.ensure_loaded(model_name).await?;
        debug!(
            "NLLB {} -> {}: '{}'",
            source_lang,
            target_lang,
            preview(text, 60)
        );

        let request = TranslateRequest {
            text,
            source_lang,
            target_lang,
            model: &model.model,
            max_length: self.config.max_length,
            num_beams: self.config.num_beams,
        };
        let response: TranslateResponse = self.client.post("/translate", &request).await?;

        Ok(response.translation.trim().to_string())
    }
}
