//! Analytics module for callscope
//!
//! Turns a set of fetched calls into aggregate metrics:
//! - Model performance and statistical comparison ([`models`])
//! - Accuracy trends with moving averages ([`trends`])
//! - Conversation quality, correlations, and thresholds ([`quality`])
//! - Failure categorization ([`failures`]) and keywords ([`keywords`])
//! - Duration and cost metrics ([`technical`])
//!
//! Every analyzer is a pure, deterministic function of its input slice:
//! groups are reported in first-seen order and frequency ties sort
//! alphabetically. [`engine`] wires the analyzers to a call source.

pub mod engine;
pub mod failures;
pub mod keywords;
pub mod models;
pub mod quality;
pub mod stats;
pub mod technical;
pub mod trends;

use std::collections::HashMap;
use std::hash::Hash;

// Facade exports
pub use engine::{AnalyticsReport, AnalyticsService};

// Analyzer exports
pub use failures::{analyze_failure_patterns, categorize, parse_free_text, FailureCategory, FailureReport};
pub use keywords::{analyze_keywords, KeywordAnalysis};
pub use models::{
    analyze_model_performance, compare_models, filter_by_accuracy, ModelComparison,
    ModelComparisonRecord, ModelPerformanceMetrics, ModelUsageMetrics,
};
pub use quality::{analyze_conversation_quality, QualityDataPoint, QualityReport};
pub use stats::{ConfidenceInterval, TTestResult};
pub use technical::{analyze_technical_metrics, TechnicalMetrics};
pub use trends::{analyze_accuracy_trends, period_key, AccuracyTrends, TrendPoint};

/// Group items by key, preserving the order in which keys are first seen.
pub(crate) fn group_by_first_seen<T, K, F>(items: &[T], mut key: F) -> Vec<(K, Vec<&T>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&T>)> = Vec::new();

    for item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}

/// `part / total * 100`, or 0 when `total` is 0. Not rounded.
pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Count occurrences and keep the `limit` most frequent, ties alphabetical.
pub(crate) fn top_by_frequency<I>(texts: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        *counts.entry(text).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_first_seen_order() {
        let items = ["b1", "a1", "b2", "c1", "a2"];
        let groups = group_by_first_seen(&items, |s| s[..1].to_string());
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].1, vec![&"b1", &"b2"]);
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(1, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }

    #[test]
    fn test_top_by_frequency_ties() {
        let texts = ["b", "a", "c", "c"].iter().map(|s| s.to_string());
        let ranked = top_by_frequency(texts, 2);
        assert_eq!(ranked, vec![("c".to_string(), 2), ("a".to_string(), 1)]);
    }
}
