//! Hosted PostgREST backend
//!
//! Calls are read from `/rest/v1/calls` with the related evaluation and review
//! rows embedded in the same response, one page at a time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use super::rows::CallRow;
use super::{CallFilter, CallSource};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::CallRecord;

/// Embedded-resource select for calls with their related rows.
const CALL_SELECT: &str = "*,lead_evaluations(*),prompt_adherence_reviews(*)";

/// HTTP client for the hosted backend
pub struct RestSource {
    http_client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl RestSource {
    /// Create a source from configuration.
    ///
    /// Returns an error if the URL or API key is missing.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("source.url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| Error::Config("source.api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&api_key)
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            page_size: config.page_size.max(1),
        })
    }

    /// URL for one page of calls matching `filter`.
    pub fn calls_url(&self, filter: &CallFilter, offset: usize) -> String {
        let mut url = format!(
            "{}/rest/v1/calls?select={}&created_at=gte.{}&created_at=lte.{}",
            self.base_url,
            urlencoding::encode(CALL_SELECT),
            urlencoding::encode(&format_timestamp(filter.start)),
            urlencoding::encode(&format_timestamp(filter.end)),
        );
        if let Some(client_id) = &filter.client_id {
            url.push_str(&format!("&client_id=eq.{}", urlencoding::encode(client_id)));
        }
        url.push_str(&format!(
            "&order=created_at.asc&limit={}&offset={}",
            self.page_size, offset
        ));
        url
    }

    async fn fetch_page(&self, filter: &CallFilter, offset: usize) -> Result<Vec<CallRow>> {
        let url = self.calls_url(filter, offset);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Source(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Source(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Source(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl CallSource for RestSource {
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        let mut calls = Vec::new();
        let mut offset = 0;

        // The server may cap a page below `page_size` (PostgREST `max-rows`),
        // so only an empty page ends the scan.
        loop {
            let page = self.fetch_page(filter, offset).await?;
            let page_len = page.len();

            tracing::debug!(offset, rows = page_len, "Fetched call page");

            if page_len == 0 {
                break;
            }
            calls.extend(page.into_iter().map(CallRow::into_record));
            offset += page_len;
        }

        Ok(calls)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
