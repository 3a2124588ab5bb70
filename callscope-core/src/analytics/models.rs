//! Model performance analysis.
//!
//! Groups calls by the model that handled them (for one [`ModelCategory`])
//! and derives usage, accuracy, failure, and cost metrics per model, plus a
//! statistical comparison record built from the raw per-call scores.
//!
//! "Accuracy" here is derived: the mean of a model's average quality score
//! and average adherence score. It is not a ground-truth correctness measure.

use serde::Serialize;

use super::stats::{self, round2, ConfidenceInterval, TTestResult, DEFAULT_CONFIDENCE_LEVEL};
use super::{group_by_first_seen, percentage};
use crate::types::{CallRecord, ModelCategory};

/// Placeholder for best/worst model when nothing was analyzed.
pub const NO_MODEL: &str = "N/A";

/// Minimum calls before a model's scores can be flagged as significant.
pub const SIGNIFICANCE_MIN_CALLS: usize = 30;

/// Score variance must stay below this for the significance flag.
pub const SIGNIFICANCE_MAX_VARIANCE: f64 = 0.5;

/// Usage and quality metrics for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageMetrics {
    pub model: String,
    pub call_count: usize,
    /// Share of all analyzed calls (0-100)
    pub usage_percentage: f64,
    pub average_accuracy: f64,
    pub average_quality_score: f64,
    pub average_adherence_score: f64,
    /// Percent of calls with a critical-failure summary (0-100)
    pub failure_rate: f64,
    /// Mean cost per call
    pub cost_efficiency: f64,
    /// Mean call duration in whole seconds
    pub response_time: i64,
}

/// Per-model comparison record computed from raw per-call scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparisonRecord {
    pub model: String,
    pub accuracy: f64,
    pub quality_score: f64,
    pub adherence_score: f64,
    pub failure_rate: f64,
    pub cost_efficiency: f64,
    /// Heuristic gate, not a hypothesis test against another model
    pub is_statistically_significant: bool,
    pub confidence_interval: ConfidenceInterval,
    pub sample_size: usize,
    pub standard_deviation: f64,
}

/// Model performance across all analyzed calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPerformanceMetrics {
    pub category: ModelCategory,
    pub total_calls: usize,
    pub models_used: Vec<ModelUsageMetrics>,
    /// Unweighted mean of per-model accuracy
    pub average_accuracy: f64,
    pub best_performing_model: String,
    pub worst_performing_model: String,
    pub model_comparison: Vec<ModelComparisonRecord>,
}

/// Pairwise significance test between two models.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub category: ModelCategory,
    pub model_a: String,
    pub model_b: String,
    pub sample_size_a: usize,
    pub sample_size_b: usize,
    /// Welch test over overall evaluation scores
    pub quality: TTestResult,
    /// Welch test over adherence scores
    pub adherence: TTestResult,
}

/// Raw per-call values for one model, kept unrounded.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModelSamples {
    pub model: String,
    pub call_count: usize,
    pub quality_scores: Vec<f64>,
    pub adherence_scores: Vec<f64>,
    pub failures: usize,
    pub costs: Vec<f64>,
    pub durations: Vec<f64>,
}

impl ModelSamples {
    fn from_calls(model: String, calls: &[&CallRecord]) -> Self {
        Self {
            model,
            call_count: calls.len(),
            quality_scores: calls.iter().filter_map(|c| c.quality_score()).collect(),
            adherence_scores: calls.iter().filter_map(|c| c.adherence_score()).collect(),
            failures: calls
                .iter()
                .filter(|c| c.critical_failure().is_some())
                .count(),
            costs: calls.iter().map(|c| c.total_cost).collect(),
            durations: calls.iter().map(|c| c.duration_seconds).collect(),
        }
    }

    fn accuracy(&self) -> f64 {
        (stats::mean(&self.quality_scores) + stats::mean(&self.adherence_scores)) / 2.0
    }

    fn failure_rate(&self) -> f64 {
        percentage(self.failures, self.call_count)
    }

    fn usage(&self, total_calls: usize) -> ModelUsageMetrics {
        ModelUsageMetrics {
            model: self.model.clone(),
            call_count: self.call_count,
            usage_percentage: round2(percentage(self.call_count, total_calls)),
            average_accuracy: round2(self.accuracy()),
            average_quality_score: round2(stats::mean(&self.quality_scores)),
            average_adherence_score: round2(stats::mean(&self.adherence_scores)),
            failure_rate: round2(self.failure_rate()),
            cost_efficiency: round2(stats::mean(&self.costs)),
            response_time: stats::mean(&self.durations).round() as i64,
        }
    }

    fn is_significant(&self) -> bool {
        self.call_count >= SIGNIFICANCE_MIN_CALLS
            && stats::variance(&self.quality_scores) < SIGNIFICANCE_MAX_VARIANCE
            && stats::variance(&self.adherence_scores) < SIGNIFICANCE_MAX_VARIANCE
    }

    fn comparison(&self) -> ModelComparisonRecord {
        let combined: Vec<f64> = self
            .quality_scores
            .iter()
            .chain(&self.adherence_scores)
            .copied()
            .collect();

        ModelComparisonRecord {
            model: self.model.clone(),
            accuracy: round2(self.accuracy()),
            quality_score: round2(stats::mean(&self.quality_scores)),
            adherence_score: round2(stats::mean(&self.adherence_scores)),
            failure_rate: round2(self.failure_rate()),
            cost_efficiency: round2(stats::mean(&self.costs)),
            is_statistically_significant: self.is_significant(),
            confidence_interval: stats::confidence_interval(&combined, DEFAULT_CONFIDENCE_LEVEL)
                .rounded(),
            sample_size: self.call_count,
            standard_deviation: round2(stats::standard_deviation(&combined)),
        }
    }
}

/// Group calls by resolved model identifier, first-seen order.
pub(crate) fn collect_samples(calls: &[CallRecord], category: ModelCategory) -> Vec<ModelSamples> {
    group_by_first_seen(calls, |c| c.model_id(category))
        .into_iter()
        .map(|(model, group)| ModelSamples::from_calls(model, &group))
        .collect()
}

/// Compute per-model usage, accuracy, failure, and cost metrics.
pub fn analyze_model_performance(
    calls: &[CallRecord],
    category: ModelCategory,
) -> ModelPerformanceMetrics {
    let samples = collect_samples(calls, category);
    let total_calls = calls.len();

    let models_used: Vec<ModelUsageMetrics> =
        samples.iter().map(|s| s.usage(total_calls)).collect();
    let model_comparison = samples.iter().map(ModelSamples::comparison).collect();

    tracing::debug!(
        category = category.as_str(),
        total_calls,
        models = models_used.len(),
        "Analyzed model performance"
    );

    summarize(category, total_calls, models_used, model_comparison)
}

/// Keep only models whose average accuracy reaches `threshold`.
///
/// The overall average, best/worst model, and total call count are
/// recomputed from the retained models.
pub fn filter_by_accuracy(
    metrics: &ModelPerformanceMetrics,
    threshold: f64,
) -> ModelPerformanceMetrics {
    let models_used: Vec<ModelUsageMetrics> = metrics
        .models_used
        .iter()
        .filter(|m| m.average_accuracy >= threshold)
        .cloned()
        .collect();
    let model_comparison = metrics
        .model_comparison
        .iter()
        .filter(|c| models_used.iter().any(|m| m.model == c.model))
        .cloned()
        .collect();
    let total_calls = models_used.iter().map(|m| m.call_count).sum();

    summarize(metrics.category, total_calls, models_used, model_comparison)
}

/// Welch comparison of two models' raw quality and adherence scores.
pub fn compare_models(
    calls: &[CallRecord],
    category: ModelCategory,
    model_a: &str,
    model_b: &str,
) -> ModelComparison {
    let samples = collect_samples(calls, category);
    let find = |name: &str| {
        samples
            .iter()
            .find(|s| s.model == name)
            .cloned()
            .unwrap_or_default()
    };
    let a = find(model_a);
    let b = find(model_b);

    ModelComparison {
        category,
        model_a: model_a.to_string(),
        model_b: model_b.to_string(),
        sample_size_a: a.call_count,
        sample_size_b: b.call_count,
        quality: stats::welch_t_test(&a.quality_scores, &b.quality_scores),
        adherence: stats::welch_t_test(&a.adherence_scores, &b.adherence_scores),
    }
}

fn summarize(
    category: ModelCategory,
    total_calls: usize,
    models_used: Vec<ModelUsageMetrics>,
    model_comparison: Vec<ModelComparisonRecord>,
) -> ModelPerformanceMetrics {
    let accuracies: Vec<f64> = models_used.iter().map(|m| m.average_accuracy).collect();
    let (best, worst) = best_and_worst(&models_used);

    ModelPerformanceMetrics {
        category,
        total_calls,
        average_accuracy: round2(stats::mean(&accuracies)),
        best_performing_model: best,
        worst_performing_model: worst,
        models_used,
        model_comparison,
    }
}

/// Argmax/argmin of accuracy; the first model wins ties.
fn best_and_worst(models: &[ModelUsageMetrics]) -> (String, String) {
    let Some(first) = models.first() else {
        return (NO_MODEL.to_string(), NO_MODEL.to_string());
    };

    let mut best = first;
    let mut worst = first;
    for model in &models[1..] {
        if model.average_accuracy > best.average_accuracy {
            best = model;
        }
        if model.average_accuracy < worst.average_accuracy {
            worst = model;
        }
    }
    (best.model.clone(), worst.model.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdherenceReview, Evaluation, UNKNOWN_MODEL};
    use chrono::{TimeZone, Utc};

    fn make_call(id: &str, model: Option<&str>, quality: f64, adherence: f64) -> CallRecord {
        let mut call = CallRecord::new(id, Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        call.llm_model = model.map(str::to_string);
        call.duration_seconds = 120.0;
        call.total_cost = 0.5;
        call.evaluation = Some(Evaluation {
            overall_score: Some(quality),
            ..Default::default()
        });
        call.adherence = Some(AdherenceReview {
            adherence_score: Some(adherence),
            ..Default::default()
        });
        call
    }

    fn scenario() -> Vec<CallRecord> {
        vec![
            make_call("1", Some("gpt-4"), 8.5, 85.0),
            make_call("2", Some("gpt-4"), 9.0, 88.0),
            make_call("3", Some("gpt-3.5"), 7.0, 75.0),
            make_call("4", Some("gpt-3.5"), 6.5, 70.0),
        ]
    }

    fn model<'a>(metrics: &'a ModelPerformanceMetrics, name: &str) -> &'a ModelUsageMetrics {
        metrics
            .models_used
            .iter()
            .find(|m| m.model == name)
            .unwrap()
    }

    #[test]
    fn test_four_call_scenario() {
        let metrics = analyze_model_performance(&scenario(), ModelCategory::Llm);

        assert_eq!(metrics.total_calls, 4);
        assert_eq!(metrics.models_used.len(), 2);
        assert!((model(&metrics, "gpt-4").average_quality_score - 8.75).abs() < 1e-9);
        assert!((model(&metrics, "gpt-3.5").average_quality_score - 6.75).abs() < 1e-9);
        assert_eq!(model(&metrics, "gpt-4").average_adherence_score, 86.5);
        assert_eq!(model(&metrics, "gpt-4").average_accuracy, 47.63);
        assert_eq!(metrics.best_performing_model, "gpt-4");
        assert_eq!(metrics.worst_performing_model, "gpt-3.5");
        assert_eq!(model(&metrics, "gpt-4").response_time, 120);
        assert_eq!(model(&metrics, "gpt-4").cost_efficiency, 0.5);
    }

    #[test]
    fn test_usage_percentages_sum_to_100() {
        let mut calls = scenario();
        calls.push(make_call("5", Some("claude"), 8.0, 90.0));
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);

        let total: f64 = metrics.models_used.iter().map(|m| m.usage_percentage).sum();
        assert!((total - 100.0).abs() < 0.05);
    }

    #[test]
    fn test_empty_input() {
        let metrics = analyze_model_performance(&[], ModelCategory::Llm);
        assert_eq!(metrics.total_calls, 0);
        assert!(metrics.models_used.is_empty());
        assert_eq!(metrics.average_accuracy, 0.0);
        assert_eq!(metrics.best_performing_model, NO_MODEL);
        assert_eq!(metrics.worst_performing_model, NO_MODEL);
    }

    #[test]
    fn test_missing_model_grouped_as_unknown() {
        let calls = vec![
            make_call("1", None, 8.0, 80.0),
            make_call("2", Some(""), 6.0, 60.0),
        ];
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        assert_eq!(metrics.models_used.len(), 1);
        assert_eq!(metrics.models_used[0].model, UNKNOWN_MODEL);
        assert_eq!(metrics.models_used[0].call_count, 2);
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let calls = vec![
            make_call("1", Some("b-model"), 8.0, 80.0),
            make_call("2", Some("a-model"), 8.0, 80.0),
        ];
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        assert_eq!(metrics.models_used[0].model, "b-model");
        assert_eq!(metrics.best_performing_model, "b-model");
        assert_eq!(metrics.worst_performing_model, "b-model");
    }

    #[test]
    fn test_failure_rate_counts_critical_summaries() {
        let mut calls = scenario();
        calls[0].adherence.as_mut().unwrap().critical_failures_summary =
            Some("Quoted a fabricated price".to_string());
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        assert_eq!(model(&metrics, "gpt-4").failure_rate, 50.0);
        assert_eq!(model(&metrics, "gpt-3.5").failure_rate, 0.0);
    }

    #[test]
    fn test_unscored_calls_still_counted() {
        let mut calls = scenario();
        let mut bare = CallRecord::new("5", Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        bare.llm_model = Some("gpt-4".to_string());
        calls.push(bare);

        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        let gpt4 = model(&metrics, "gpt-4");
        assert_eq!(gpt4.call_count, 3);
        // Averages only consider present scores
        assert_eq!(gpt4.average_quality_score, 8.75);
    }

    #[test]
    fn test_comparison_uses_raw_scores() {
        let metrics = analyze_model_performance(&scenario(), ModelCategory::Llm);
        let record = metrics
            .model_comparison
            .iter()
            .find(|r| r.model == "gpt-4")
            .unwrap();

        let combined = [8.5, 9.0, 85.0, 88.0];
        assert_eq!(record.sample_size, 2);
        assert_eq!(
            record.standard_deviation,
            round2(stats::standard_deviation(&combined))
        );
        assert!(record.confidence_interval.lower <= stats::mean(&combined));
        assert!(record.confidence_interval.upper >= stats::mean(&combined));
        assert!(!record.is_statistically_significant);
    }

    #[test]
    fn test_significance_gate() {
        let calls: Vec<CallRecord> = (0..30)
            .map(|i| make_call(&i.to_string(), Some("steady"), 8.0, 90.0))
            .collect();
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        assert!(metrics.model_comparison[0].is_statistically_significant);

        let short = &calls[..29];
        let metrics = analyze_model_performance(short, ModelCategory::Llm);
        assert!(!metrics.model_comparison[0].is_statistically_significant);
    }

    #[test]
    fn test_filter_by_accuracy() {
        let metrics = analyze_model_performance(&scenario(), ModelCategory::Llm);

        let filtered = filter_by_accuracy(&metrics, 10.0);
        assert_eq!(filtered.models_used.len(), 2);

        let filtered = filter_by_accuracy(&metrics, 45.0);
        assert_eq!(filtered.models_used.len(), 1);
        assert_eq!(filtered.average_accuracy, 47.63);
        assert_eq!(filtered.total_calls, 2);
        assert_eq!(filtered.model_comparison.len(), 1);

        let filtered = filter_by_accuracy(&metrics, 1000.0);
        assert!(filtered.models_used.is_empty());
        assert_eq!(filtered.average_accuracy, 0.0);
        assert_eq!(filtered.best_performing_model, NO_MODEL);
    }

    #[test]
    fn test_filter_at_ten_with_quality_only_scale() {
        // Only quality scores (0-10): accuracy never reaches 10
        let calls: Vec<CallRecord> = scenario()
            .into_iter()
            .map(|mut c| {
                c.adherence = None;
                c
            })
            .collect();
        let metrics = analyze_model_performance(&calls, ModelCategory::Llm);
        let filtered = filter_by_accuracy(&metrics, 10.0);
        assert!(filtered.models_used.is_empty());
        assert_eq!(filtered.average_accuracy, 0.0);
        assert!(!filtered.average_accuracy.is_nan());
    }

    #[test]
    fn test_compare_models() {
        let comparison = compare_models(&scenario(), ModelCategory::Llm, "gpt-4", "gpt-3.5");
        assert_eq!(comparison.sample_size_a, 2);
        assert_eq!(comparison.sample_size_b, 2);
        assert!(comparison.quality.t_statistic > 0.0);
        assert!(comparison.quality.effect_size > 0.0);

        let missing = compare_models(&scenario(), ModelCategory::Llm, "gpt-4", "nope");
        assert_eq!(missing.sample_size_b, 0);
        assert_eq!(
            missing.quality.test_type,
            stats::TestType::InsufficientData
        );
    }

    #[test]
    fn test_voice_category_grouping() {
        let mut calls = scenario();
        for call in &mut calls {
            call.voice_provider = Some("elevenlabs".to_string());
            call.voice_model = Some("turbo".to_string());
        }
        let metrics = analyze_model_performance(&calls, ModelCategory::Voice);
        assert_eq!(metrics.models_used.len(), 1);
        assert_eq!(metrics.models_used[0].model, "elevenlabs/turbo");
        assert_eq!(metrics.category, ModelCategory::Voice);
    }
}
