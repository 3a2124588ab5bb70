//! Technical and cost metrics: call durations, spend, and their spread.

use serde::Serialize;
use std::collections::BTreeMap;

use super::group_by_first_seen;
use super::stats::{self, round2};
use crate::types::{CallRecord, ModelCategory};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSummary {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl PercentileSummary {
    fn of(values: &[f64]) -> Self {
        Self {
            p50: round2(stats::percentile(values, 50.0)),
            p90: round2(stats::percentile(values, 90.0)),
            p95: round2(stats::percentile(values, 95.0)),
            p99: round2(stats::percentile(values, 99.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCostBreakdown {
    pub model: String,
    pub call_count: usize,
    pub total_cost: f64,
    pub average_cost: f64,
    /// Seconds
    pub average_duration: f64,
    /// 0 when the model has no recorded duration
    pub cost_per_minute: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCost {
    pub date: String,
    pub call_count: usize,
    pub total_cost: f64,
    pub average_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetrics {
    pub category: ModelCategory,
    pub total_calls: usize,
    pub total_cost: f64,
    pub average_cost: f64,
    /// Seconds
    pub average_duration: f64,
    pub duration_percentiles: PercentileSummary,
    pub cost_percentiles: PercentileSummary,
    pub by_model: Vec<ModelCostBreakdown>,
    /// Ascending by date
    pub daily_costs: Vec<DailyCost>,
}

fn cost_per_minute(total_cost: f64, total_seconds: f64) -> f64 {
    if total_seconds <= 0.0 {
        return 0.0;
    }
    total_cost / (total_seconds / 60.0)
}

pub fn analyze_technical_metrics(calls: &[CallRecord], category: ModelCategory) -> TechnicalMetrics {
    let costs: Vec<f64> = calls.iter().map(|c| c.total_cost).collect();
    let durations: Vec<f64> = calls.iter().map(|c| c.duration_seconds).collect();

    let by_model = group_by_first_seen(calls, |c| c.model_id(category))
        .into_iter()
        .map(|(model, group)| {
            let total_cost: f64 = group.iter().map(|c| c.total_cost).sum();
            let total_seconds: f64 = group.iter().map(|c| c.duration_seconds).sum();
            let n = group.len() as f64;
            ModelCostBreakdown {
                model,
                call_count: group.len(),
                total_cost: round2(total_cost),
                average_cost: round2(total_cost / n),
                average_duration: round2(total_seconds / n),
                cost_per_minute: round2(cost_per_minute(total_cost, total_seconds)),
            }
        })
        .collect();

    let mut days: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for call in calls {
        let day = days
            .entry(call.date().format("%Y-%m-%d").to_string())
            .or_default();
        day.0 += 1;
        day.1 += call.total_cost;
    }
    let daily_costs = days
        .into_iter()
        .map(|(date, (count, total))| DailyCost {
            date,
            call_count: count,
            total_cost: round2(total),
            average_cost: round2(total / count as f64),
        })
        .collect();

    TechnicalMetrics {
        category,
        total_calls: calls.len(),
        total_cost: round2(costs.iter().sum()),
        average_cost: round2(stats::mean(&costs)),
        average_duration: round2(stats::mean(&durations)),
        duration_percentiles: PercentileSummary::of(&durations),
        cost_percentiles: PercentileSummary::of(&costs),
        by_model,
        daily_costs,
    }
}
