//! Conversation quality analysis.
//!
//! Works on [`QualityDataPoint`]s, one per evaluated call. Calls without an
//! evaluation are dropped here rather than zero-filled.
//!
//! Dimension strengths use a 4.0 cutoff, which reads as a 0-5 scale, while
//! overall scores and the score thresholds are on a 0-10 scale. Both are kept
//! as stored data defines them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stats::{self, round2, ConfidenceInterval, DEFAULT_CONFIDENCE_LEVEL};
use super::{group_by_first_seen, percentage};
use crate::types::{CallRecord, ModelCategory, Sentiment};

/// Dimension mean at or above this counts as a strength.
pub const STRENGTH_THRESHOLD: f64 = 4.0;

/// Overall-score thresholds reported by the threshold analysis.
pub const SCORE_THRESHOLDS: [f64; 4] = [6.0, 7.0, 8.0, 9.0];

/// The five scored conversation-quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ClarityPoliteness,
    Naturalness,
    RelevanceQuestions,
    ObjectionHandling,
    LeadIntent,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::ClarityPoliteness,
        Dimension::Naturalness,
        Dimension::RelevanceQuestions,
        Dimension::ObjectionHandling,
        Dimension::LeadIntent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::ClarityPoliteness => "clarity_politeness",
            Dimension::Naturalness => "naturalness",
            Dimension::RelevanceQuestions => "relevance_questions",
            Dimension::ObjectionHandling => "objection_handling",
            Dimension::LeadIntent => "lead_intent",
        }
    }

    /// Human-readable name used in strengths and improvements.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::ClarityPoliteness => "Clarity & Politeness",
            Dimension::Naturalness => "Naturalness",
            Dimension::RelevanceQuestions => "Relevance of Questions",
            Dimension::ObjectionHandling => "Objection Handling",
            Dimension::LeadIntent => "Lead Intent",
        }
    }
}

/// One evaluated call, reduced to what quality analysis needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityDataPoint {
    pub model: String,
    pub overall_score: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub clarity_politeness: Option<f64>,
    pub naturalness: Option<f64>,
    pub relevance_questions: Option<f64>,
    pub objection_handling: Option<f64>,
    pub lead_intent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl QualityDataPoint {
    /// Build a point for an evaluated call; `None` when the call has no evaluation.
    pub fn from_call(call: &CallRecord, category: ModelCategory) -> Option<Self> {
        let evaluation = call.evaluation.as_ref()?;
        Some(Self {
            model: call.model_id(category),
            overall_score: evaluation.overall_score,
            sentiment: evaluation.sentiment,
            clarity_politeness: evaluation.clarity_politeness_score,
            naturalness: evaluation.naturalness_score,
            relevance_questions: evaluation.relevance_questions_score,
            objection_handling: evaluation.objection_handling_score,
            lead_intent: evaluation.lead_intent_score,
            created_at: call.created_at,
        })
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::ClarityPoliteness => self.clarity_politeness,
            Dimension::Naturalness => self.naturalness,
            Dimension::RelevanceQuestions => self.relevance_questions,
            Dimension::ObjectionHandling => self.objection_handling,
            Dimension::LeadIntent => self.lead_intent,
        }
    }
}

/// Mean of each dimension over the points that carry it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionAverages {
    pub clarity_politeness: f64,
    pub naturalness: f64,
    pub relevance_questions: f64,
    pub objection_handling: f64,
    pub lead_intent: f64,
}

/// Sentiment shares (0-100) over all points in scope.
///
/// Points without a sentiment count toward the denominator only, so the
/// shares may sum to less than 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentDistribution {
    fn from_points(points: &[&QualityDataPoint]) -> Self {
        let share = |target: Sentiment| {
            let count = points
                .iter()
                .filter(|p| p.sentiment == Some(target))
                .count();
            round2(percentage(count, points.len()))
        };
        Self {
            positive: share(Sentiment::Positive),
            neutral: share(Sentiment::Neutral),
            negative: share(Sentiment::Negative),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelQualityMetrics {
    pub model: String,
    pub evaluation_count: usize,
    pub average_overall_score: f64,
    pub dimensions: DimensionAverages,
    pub sentiment: SentimentDistribution,
    /// Standard deviation of overall scores
    pub standard_deviation: f64,
    pub confidence_interval: ConfidenceInterval,
    /// `100 / (1 + sd)`, capped at 100
    pub consistency_score: f64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn from_coefficient(r: f64) -> Self {
        let r = r.abs();
        if r >= 0.7 {
            CorrelationStrength::Strong
        } else if r >= 0.4 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

/// Pearson correlation between two dimensions on the pooled point set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationEntry {
    pub dimension_a: Dimension,
    pub dimension_b: Dimension,
    pub correlation: f64,
    pub strength: CorrelationStrength,
    /// Points where both dimensions are present
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdShare {
    pub threshold: f64,
    /// Percent of scored points at or above the threshold
    pub percentage: f64,
}

/// Overall-score buckets as percentages of a model's scored points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDistribution {
    /// `>= 9`
    pub excellent: f64,
    /// `[8, 9)`
    pub good: f64,
    /// `[7, 8)`
    pub satisfactory: f64,
    /// `< 7`
    pub needs_improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelThresholdBreakdown {
    pub model: String,
    pub scored_count: usize,
    pub at_or_above: Vec<ThresholdShare>,
    pub distribution: ScoreDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRanking {
    /// 1-based
    pub rank: usize,
    pub model: String,
    pub average_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAnalysis {
    pub models: Vec<ModelThresholdBreakdown>,
    pub rankings: Vec<ModelRanking>,
}

/// Conversation quality across all evaluated calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub category: ModelCategory,
    pub total_evaluations: usize,
    pub average_overall_score: f64,
    pub sentiment: SentimentDistribution,
    pub models: Vec<ModelQualityMetrics>,
    pub correlations: Vec<CorrelationEntry>,
    pub thresholds: ThresholdAnalysis,
}

/// Analyze conversation quality for the evaluated calls in `calls`.
pub fn analyze_conversation_quality(calls: &[CallRecord], category: ModelCategory) -> QualityReport {
    let points: Vec<QualityDataPoint> = calls
        .iter()
        .filter_map(|c| QualityDataPoint::from_call(c, category))
        .collect();
    let all: Vec<&QualityDataPoint> = points.iter().collect();

    let groups = group_by_first_seen(&points, |p| p.model.clone());

    let models = groups
        .iter()
        .map(|(model, group)| model_quality(model, group))
        .collect();

    let thresholds = threshold_analysis(&groups);
    let correlations = correlation_matrix(&points);

    let overall: Vec<f64> = points.iter().filter_map(|p| p.overall_score).collect();

    QualityReport {
        category,
        total_evaluations: points.len(),
        average_overall_score: round2(stats::mean(&overall)),
        sentiment: SentimentDistribution::from_points(&all),
        models,
        correlations,
        thresholds,
    }
}

fn model_quality(model: &str, points: &[&QualityDataPoint]) -> ModelQualityMetrics {
    let overall: Vec<f64> = points.iter().filter_map(|p| p.overall_score).collect();
    let sd = stats::standard_deviation(&overall);

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut means = [0.0; 5];
    for (slot, dimension) in means.iter_mut().zip(Dimension::ALL) {
        let values: Vec<f64> = points.iter().filter_map(|p| p.dimension(dimension)).collect();
        // Unscored dimensions are neither a strength nor an improvement
        if values.is_empty() {
            continue;
        }
        *slot = stats::mean(&values);
        if *slot >= STRENGTH_THRESHOLD {
            strengths.push(dimension.label().to_string());
        } else {
            improvements.push(dimension.label().to_string());
        }
    }

    ModelQualityMetrics {
        model: model.to_string(),
        evaluation_count: points.len(),
        average_overall_score: round2(stats::mean(&overall)),
        dimensions: DimensionAverages {
            clarity_politeness: round2(means[0]),
            naturalness: round2(means[1]),
            relevance_questions: round2(means[2]),
            objection_handling: round2(means[3]),
            lead_intent: round2(means[4]),
        },
        sentiment: SentimentDistribution::from_points(points),
        standard_deviation: round2(sd),
        confidence_interval: stats::confidence_interval(&overall, DEFAULT_CONFIDENCE_LEVEL)
            .rounded(),
        consistency_score: round2((100.0 / (1.0 + sd)).min(100.0)),
        strengths,
        improvements,
    }
}

/// All ten dimension pairs, in dimension order.
fn correlation_matrix(points: &[QualityDataPoint]) -> Vec<CorrelationEntry> {
    let mut entries = Vec::with_capacity(10);
    for (i, &a) in Dimension::ALL.iter().enumerate() {
        for &b in &Dimension::ALL[i + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = points
                .iter()
                .filter_map(|p| Some((p.dimension(a)?, p.dimension(b)?)))
                .unzip();
            let r = stats::pearson_correlation(&xs, &ys);
            entries.push(CorrelationEntry {
                dimension_a: a,
                dimension_b: b,
                correlation: round2(r),
                strength: CorrelationStrength::from_coefficient(r),
                sample_size: xs.len(),
            });
        }
    }
    entries
}

fn threshold_analysis(groups: &[(String, Vec<&QualityDataPoint>)]) -> ThresholdAnalysis {
    let mut averages = Vec::with_capacity(groups.len());

    let models = groups
        .iter()
        .map(|(model, points)| {
            let scores: Vec<f64> = points.iter().filter_map(|p| p.overall_score).collect();
            averages.push((model.clone(), stats::mean(&scores)));

            let share = |pred: &dyn Fn(f64) -> bool| {
                round2(percentage(
                    scores.iter().filter(|&&s| pred(s)).count(),
                    scores.len(),
                ))
            };

            ModelThresholdBreakdown {
                model: model.clone(),
                scored_count: scores.len(),
                at_or_above: SCORE_THRESHOLDS
                    .iter()
                    .map(|&threshold| ThresholdShare {
                        threshold,
                        percentage: share(&|s| s >= threshold),
                    })
                    .collect(),
                distribution: ScoreDistribution {
                    excellent: share(&|s| s >= 9.0),
                    good: share(&|s| (8.0..9.0).contains(&s)),
                    satisfactory: share(&|s| (7.0..8.0).contains(&s)),
                    needs_improvement: share(&|s| s < 7.0),
                },
            }
        })
        .collect();

    // sort_by is stable: equal averages keep first-seen order
    averages.sort_by(|a, b| b.1.total_cmp(&a.1));
    let rankings = averages
        .into_iter()
        .enumerate()
        .map(|(i, (model, average))| ModelRanking {
            rank: i + 1,
            model,
            average_score: round2(average),
        })
        .collect();

    ThresholdAnalysis { models, rankings }
}
