/*!
 * JSON-over-HTTP client shared by the model server adapters.
 */

use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::BackendError;

use super::preview;

/// HTTP client with retry and exponential backoff
#[derive(Debug, Clone)]
pub struct JsonClient {
    /// Base URL of the model server, without trailing slash
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Name used in log messages
    label: &'static str,
}

impl JsonClient {
    /// Create a client for `base_url`
    ///
    /// Uses connection pooling for concurrent chunk requests.
    pub fn new(
        label: &'static str,
        base_url: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            max_retries,
            backoff_base_ms,
            label,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `path` and decode the JSON answer.
    ///
    /// Server errors and network failures are retried with exponential
    /// backoff, client errors and undecodable answers are not.
    pub async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.client.post(&url).json(body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        return serde_json::from_str::<Resp>(&text).map_err(|e| {
                            error!(
                                "Failed to parse {} response: {}. Raw response: {}",
                                self.label,
                                e,
                                preview(&text, 500)
                            );
                            BackendError::ModelFailure(format!("Invalid {} response: {}", self.label, e))
                        });
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());

                    if status.is_server_error() {
                        // Server error - can retry
                        error!(
                            "{} API error ({}): {} - attempt {}/{}",
                            self.label,
                            status,
                            error_text,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        last_error = Some(status_error(self.label, status, &error_text));
                    } else {
                        // Client error - don't retry
                        error!("{} API error ({}): {}", self.label, status, error_text);
                        return Err(status_error(self.label, status, &error_text));
                    }
                }
                Err(e) => {
                    // Network error - can retry
                    error!(
                        "{} network error: {} - attempt {}/{}",
                        self.label,
                        e,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(BackendError::from(e));
                }
            }

            attempt += 1;

            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                debug!("Retrying {} request in {}ms", self.label, backoff_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BackendError::Unavailable(format!(
                "{} request failed after {} attempts",
                self.label,
                self.max_retries + 1
            ))
        }))
    }
}

fn status_error(label: &str, status: StatusCode, body: &str) -> BackendError {
    let message = format!("{} API error ({}): {}", label, status, body);
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => BackendError::Unavailable(message),
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => BackendError::Timeout(message),
        _ => BackendError::ModelFailure(message),
    }
}
