//! HTTP client for the raw outlet feed.

use std::time::Duration;

use outletdb_core::OutletRecord;
use reqwest::{Client, Url};

use crate::error::SourceError;
use crate::normalize::{normalize_record, SkippedRecord};
use crate::types::{FeedBody, RawOutletRecord};

/// One fetch of the feed: usable records in feed order, plus whatever was
/// skipped along the way.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub records: Vec<OutletRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Reads the outlet feed at a fixed URL.
///
/// Any transport failure, non-2xx status, or a body that is not a JSON array
/// of objects fails the whole fetch. Individual entries that do not validate
/// are collected in [`SourceBatch::skipped`] instead.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: Client,
    url: Url,
}

impl SourceClient {
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidUrl`] if `url` does not parse, or
    /// [`SourceError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        let parsed = Url::parse(url.trim()).map_err(|e| SourceError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("outletdb/0.1 (outlet-ingest)")
            .build()?;
        Ok(Self {
            client,
            url: parsed,
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches and validates the whole feed.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::UnexpectedStatus`] on any non-2xx status.
    /// - [`SourceError::Deserialize`] if the body is not a JSON array (bare or
    ///   wrapped in `{"outlets": [...]}`).
    pub async fn fetch(&self) -> Result<SourceBatch, SourceError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.text().await?;
        let feed: FeedBody =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: format!("outlet feed from {}", self.url),
                source: e,
            })?;

        let batch = validate_feed(feed.into_values());
        if !batch.skipped.is_empty() {
            tracing::warn!(
                skipped = batch.skipped.len(),
                kept = batch.records.len(),
                "source: skipped malformed outlet records"
            );
        }
        Ok(batch)
    }
}

fn validate_feed(values: Vec<serde_json::Value>) -> SourceBatch {
    let mut batch = SourceBatch::default();
    for (index, value) in values.into_iter().enumerate() {
        let raw = match serde_json::from_value::<RawOutletRecord>(value) {
            Ok(raw) => raw,
            Err(e) => {
                batch.skipped.push(SkippedRecord {
                    index,
                    label: None,
                    reason: format!("malformed record: {e}"),
                });
                continue;
            }
        };
        match normalize_record(index, raw) {
            Ok(record) => batch.records.push(record),
            Err(skipped) => {
                tracing::debug!(
                    index = skipped.index,
                    label = skipped.label.as_deref().unwrap_or("-"),
                    reason = %skipped.reason,
                    "source: record skipped"
                );
                batch.skipped.push(skipped);
            }
        }
    }
    batch
}
