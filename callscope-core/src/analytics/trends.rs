//! Accuracy trends over time.
//!
//! Calls are bucketed by `(period, model)`; each bucket reports its quality,
//! adherence, and accuracy averages, smoothed per model with a trailing
//! moving average.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::group_by_first_seen;
use super::stats::{self, round2};
use crate::types::{CallRecord, Granularity, ModelCategory};

/// Default number of trailing periods in the moving average.
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 3;

/// One `(period, model)` bucket.
///
/// A bucket with no scored calls reports zero scores; check `call_count`
/// before reading zero as "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub period: String,
    pub model: String,
    pub quality_score: f64,
    pub adherence_score: f64,
    pub accuracy_score: f64,
    pub call_count: usize,
    pub moving_average: f64,
}

/// Accuracy trend series, ascending by period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyTrends {
    pub granularity: Granularity,
    pub category: ModelCategory,
    pub moving_average_window: usize,
    pub points: Vec<TrendPoint>,
}

/// Bucket label for a timestamp (UTC).
///
/// Daily: `YYYY-MM-DD`. Weekly: the Sunday on or before the date,
/// `YYYY-MM-DD`. Monthly: `YYYY-MM`.
pub fn period_key(ts: DateTime<Utc>, granularity: Granularity) -> String {
    let date = ts.date_naive();
    match granularity {
        Granularity::Daily => date.format("%Y-%m-%d").to_string(),
        Granularity::Weekly => {
            let offset = date.weekday().num_days_from_sunday() as i64;
            (date - Duration::days(offset))
                .format("%Y-%m-%d")
                .to_string()
        }
        Granularity::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Trailing moving average; the window shrinks at the start of the series.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            stats::mean(&values[start..=i])
        })
        .collect()
}

/// Bucket calls into periods per model and smooth accuracy per model.
pub fn analyze_accuracy_trends(
    calls: &[CallRecord],
    granularity: Granularity,
    category: ModelCategory,
    window: usize,
) -> AccuracyTrends {
    let buckets = group_by_first_seen(calls, |c| {
        (period_key(c.created_at, granularity), c.model_id(category))
    });

    let mut raw: Vec<(String, String, f64, f64, f64, usize)> = buckets
        .into_iter()
        .map(|((period, model), group)| {
            let quality: Vec<f64> = group.iter().filter_map(|c| c.quality_score()).collect();
            let adherence: Vec<f64> = group.iter().filter_map(|c| c.adherence_score()).collect();
            let quality = stats::mean(&quality);
            let adherence = stats::mean(&adherence);
            let accuracy = (quality + adherence) / 2.0;
            (period, model, quality, adherence, accuracy, group.len())
        })
        .collect();
    raw.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    // Per-model accuracy series in chronological order
    let mut series: HashMap<&str, Vec<f64>> = HashMap::new();
    for (_, model, _, _, accuracy, _) in &raw {
        series.entry(model.as_str()).or_default().push(*accuracy);
    }
    let mut smoothed: HashMap<&str, std::vec::IntoIter<f64>> = series
        .iter()
        .map(|(model, values)| (*model, moving_average(values, window).into_iter()))
        .collect();

    let points = raw
        .iter()
        .map(|(period, model, quality, adherence, accuracy, count)| {
            let moving = smoothed
                .get_mut(model.as_str())
                .and_then(Iterator::next)
                .unwrap_or(*accuracy);
            TrendPoint {
                period: period.clone(),
                model: model.clone(),
                quality_score: round2(*quality),
                adherence_score: round2(*adherence),
                accuracy_score: round2(*accuracy),
                call_count: *count,
                moving_average: round2(moving),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        granularity = granularity.as_str(),
        buckets = points.len(),
        "Computed accuracy trends"
    );

    AccuracyTrends {
        granularity,
        category,
        moving_average_window: window.max(1),
        points,
    }
}
