//! HTTP client for the structured-extraction service.
//!
//! Wraps `reqwest` with endpoint normalisation, optional bearer auth, typed
//! response decoding, and [`crate::retry`] for transient failures.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::ExtractError;
use crate::retry::retry_with_backoff;
use crate::types::{
    decode_records, ExtractedHours, ExtractionRequest, ExtractionResponse, HoursInput,
};

const EXTRACT_PATH: &str = "v1/extract/operating-hours";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// How many extra attempts a transient failure gets, and the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Per-attempt HTTP timeout that leaves room for every retry inside a
    /// batch budget of `batch_timeout_secs`, never below one second.
    #[must_use]
    pub fn attempt_timeout_secs(self, batch_timeout_secs: u64) -> u64 {
        let attempts = u64::from(self.max_retries).saturating_add(1);
        (batch_timeout_secs / attempts).max(1)
    }
}

/// Client for `POST {endpoint}/v1/extract/operating-hours`.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    client: Client,
    api_key: Option<String>,
    url: Url,
    retry: RetryPolicy,
}

impl ExtractionClient {
    /// Creates a client for the service at `endpoint`.
    ///
    /// `timeout_secs` bounds each HTTP attempt; derive it from the batch
    /// budget with [`RetryPolicy::attempt_timeout_secs`] so a timed-out attempt
    /// can still be retried. The caller bounds the whole batch separately.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ExtractError::InvalidEndpoint`] if
    /// `endpoint` is not a valid base URL.
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("outletdb/0.1 (hours-extraction)")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.map(str::to_owned),
            url: build_url(endpoint)?,
            retry,
        })
    }

    /// The fully-resolved request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends one batch and returns whatever records the service produced.
    ///
    /// Records are returned in service order, which need not match `batch`;
    /// ids outside the batch and duplicates are passed through untouched for
    /// the caller to reconcile. A record without a usable `outlet_id` is
    /// dropped, so only that outlet goes without a schedule.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Status`] on a non-2xx response after retries.
    /// - [`ExtractError::Http`] on network failure after retries.
    /// - [`ExtractError::Deserialize`] if the body is not an `{"outlets": [...]}`
    ///   envelope.
    pub async fn extract_hours(
        &self,
        batch: &[HoursInput],
    ) -> Result<Vec<ExtractedHours>, ExtractError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_ms, || {
            self.send_once(batch)
        })
        .await
    }

    async fn send_once(&self, batch: &[HoursInput]) -> Result<Vec<ExtractedHours>, ExtractError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .json(&ExtractionRequest { outlets: batch });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ExtractionResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: format!("extract batch of {}", batch.len()),
                source: e,
            })?;
        Ok(decode_records(parsed.outlets))
    }
}

/// Normalise the endpoint to end in exactly one slash, then join the
/// extraction path so a base with a path prefix keeps it.
fn build_url(endpoint: &str) -> Result<Url, ExtractError> {
    let normalised = format!("{}/", endpoint.trim().trim_end_matches('/'));
    let invalid = |reason: String| ExtractError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason,
    };
    let base = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }
    base.join(EXTRACT_PATH).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
