//! Call data sources
//!
//! Every analyzer reads through [`CallSource`], the single suspension point
//! of an analytics request. Implementations:
//!
//! - [`Database`](crate::db::Database): the local SQLite store
//! - [`RestSource`]: a hosted PostgREST backend
//! - [`MemorySource`]: an in-memory call set, for tests and embedding
//!
//! Fetch errors are returned as-is; sources do not retry.

pub mod rest;
pub mod rows;

pub use rest::RestSource;
pub use rows::{CallRow, EvaluationRow, ReviewRow};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::types::{AnalyticsRequest, CallRecord};

/// Row-level filter pushed down to a source.
///
/// The single-model filter is not pushed down: model identifiers are resolved
/// per category after the fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFilter {
    /// Inclusive lower bound on `created_at`
    pub start: DateTime<Utc>,
    /// Inclusive upper bound on `created_at`
    pub end: DateTime<Utc>,
    pub client_id: Option<String>,
}

impl CallFilter {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            client_id: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Whether a call falls inside this filter.
    pub fn matches(&self, call: &CallRecord) -> bool {
        call.created_at >= self.start
            && call.created_at <= self.end
            && self
                .client_id
                .as_ref()
                .map_or(true, |client| call.client_id.as_ref() == Some(client))
    }
}

impl From<&AnalyticsRequest> for CallFilter {
    fn from(request: &AnalyticsRequest) -> Self {
        Self {
            start: request.start_date,
            end: request.end_date,
            client_id: request.client_id.clone(),
        }
    }
}

/// Read access to call records with their evaluation and adherence review.
#[async_trait]
pub trait CallSource: Send + Sync {
    /// Calls created within the filter's range, oldest first.
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<S: CallSource + ?Sized> CallSource for Arc<S> {
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        (**self).fetch_calls(filter).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[async_trait]
impl<S: CallSource + ?Sized> CallSource for Box<S> {
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        (**self).fetch_calls(filter).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// A fixed set of calls held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    calls: Vec<CallRecord>,
}

impl MemorySource {
    pub fn new(calls: Vec<CallRecord>) -> Self {
        Self { calls }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[async_trait]
impl CallSource for MemorySource {
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        let mut calls: Vec<CallRecord> = self
            .calls
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order
        calls.sort_by_key(|c| c.created_at);
        Ok(calls)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
