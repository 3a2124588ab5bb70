//! Analytics facade
//!
//! [`AnalyticsService`] fetches calls through a [`CallSource`] and runs the
//! analyzers over them. Each analyzer is a pure function; the only
//! suspension point is the fetch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use callscope_core::analytics::AnalyticsService;
//! use callscope_core::{AnalyticsRequest, Database};
//!
//! let db = Database::open_in_memory()?;
//! db.migrate()?;
//!
//! let service = AnalyticsService::new(db);
//! let request = AnalyticsRequest::parse("2024-01-01", "2024-01-31")?;
//! let report = service.generate_report(&request).await?;
//!
//! println!("best model: {}", report.model_performance.best_performing_model);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use super::failures::{analyze_failure_patterns, FailureReport};
use super::keywords::{analyze_keywords, KeywordAnalysis};
use super::models::{analyze_model_performance, compare_models, ModelComparison, ModelPerformanceMetrics};
use super::quality::{analyze_conversation_quality, QualityReport};
use super::technical::{analyze_technical_metrics, TechnicalMetrics};
use super::trends::{analyze_accuracy_trends, AccuracyTrends};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::source::{CallFilter, CallSource};
use crate::types::{AnalyticsRequest, CallRecord};

/// Everything the analyzers produce for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub request: AnalyticsRequest,
    pub model_performance: ModelPerformanceMetrics,
    pub accuracy_trends: AccuracyTrends,
    pub failure_patterns: FailureReport,
    pub keywords: KeywordAnalysis,
    pub conversation_quality: QualityReport,
    pub technical: TechnicalMetrics,
}

/// Request-scoped analytics over a call source.
///
/// Holds no mutable state; concurrent requests share nothing but the source.
pub struct AnalyticsService<S> {
    source: S,
    config: AnalyticsConfig,
}

impl<S: CallSource> AnalyticsService<S> {
    /// Create a service with default analytics settings.
    pub fn new(source: S) -> Self {
        Self::with_config(source, AnalyticsConfig::default())
    }

    pub fn with_config(source: S, config: AnalyticsConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Fetch calls for the request, without the single-model filter.
    async fn fetch_unfiltered(&self, request: &AnalyticsRequest, branch: &str) -> Result<Vec<CallRecord>> {
        let start = Instant::now();
        let filter = CallFilter::from(request);

        let calls = self.source.fetch_calls(&filter).await.map_err(|e| {
            tracing::error!(
                branch,
                source = self.source.name(),
                error = %e,
                "Failed to fetch calls"
            );
            e
        })?;

        tracing::debug!(
            branch,
            source = self.source.name(),
            rows = calls.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched calls"
        );
        Ok(calls)
    }

    /// Fetch calls for the request and apply its model filter.
    async fn fetch(&self, request: &AnalyticsRequest, branch: &str) -> Result<Vec<CallRecord>> {
        let mut calls = self.fetch_unfiltered(request, branch).await?;
        if request.model.is_some() {
            calls.retain(|c| request.matches_model(c));
            tracing::debug!(branch, rows = calls.len(), "Applied model filter");
        }
        Ok(calls)
    }

    pub async fn model_performance(&self, request: &AnalyticsRequest) -> Result<ModelPerformanceMetrics> {
        let calls = self.fetch(request, "model_performance").await?;
        Ok(analyze_model_performance(&calls, request.category))
    }

    pub async fn accuracy_trends(&self, request: &AnalyticsRequest) -> Result<AccuracyTrends> {
        let calls = self.fetch(request, "accuracy_trends").await?;
        Ok(analyze_accuracy_trends(
            &calls,
            request.granularity,
            request.category,
            self.config.moving_average_window,
        ))
    }

    pub async fn failure_patterns(&self, request: &AnalyticsRequest) -> Result<FailureReport> {
        let calls = self.fetch(request, "failure_patterns").await?;
        Ok(analyze_failure_patterns(&calls, request.category))
    }

    pub async fn keyword_analysis(&self, request: &AnalyticsRequest) -> Result<KeywordAnalysis> {
        let calls = self.fetch(request, "keywords").await?;
        Ok(analyze_keywords(
            &calls,
            self.config.top_keywords,
            self.config.trending_keywords,
        ))
    }

    pub async fn conversation_quality(&self, request: &AnalyticsRequest) -> Result<QualityReport> {
        let calls = self.fetch(request, "conversation_quality").await?;
        Ok(analyze_conversation_quality(&calls, request.category))
    }

    pub async fn technical_metrics(&self, request: &AnalyticsRequest) -> Result<TechnicalMetrics> {
        let calls = self.fetch(request, "technical").await?;
        Ok(analyze_technical_metrics(&calls, request.category))
    }

    /// Welch's t-test between two models' raw scores.
    ///
    /// The request's own model filter is ignored; the two named models select
    /// the samples.
    pub async fn compare_models(
        &self,
        request: &AnalyticsRequest,
        model_a: &str,
        model_b: &str,
    ) -> Result<ModelComparison> {
        let calls = self.fetch_unfiltered(request, "compare_models").await?;
        Ok(compare_models(&calls, request.category, model_a, model_b))
    }

    /// Run every analysis concurrently and assemble the combined report.
    ///
    /// The first failing branch fails the whole report.
    pub async fn generate_report(&self, request: &AnalyticsRequest) -> Result<AnalyticsReport> {
        let start = Instant::now();

        tracing::info!(
            start = %request.start_date.to_rfc3339(),
            end = %request.end_date.to_rfc3339(),
            client = request.client_id.as_deref().unwrap_or("all"),
            model = request.model.as_deref().unwrap_or("all"),
            category = request.category.as_str(),
            granularity = request.granularity.as_str(),
            source = self.source.name(),
            "Generating analytics report"
        );

        let (
            model_performance,
            accuracy_trends,
            failure_patterns,
            keywords,
            conversation_quality,
            technical,
        ) = tokio::try_join!(
            self.model_performance(request),
            self.accuracy_trends(request),
            self.failure_patterns(request),
            self.keyword_analysis(request),
            self.conversation_quality(request),
            self.technical_metrics(request),
        )?;

        tracing::info!(
            calls = model_performance.total_calls,
            models = model_performance.models_used.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Analytics report complete"
        );

        Ok(AnalyticsReport {
            generated_at: Utc::now(),
            request: request.clone(),
            model_performance,
            accuracy_trends,
            failure_patterns,
            keywords,
            conversation_quality,
            technical,
        })
    }
}
