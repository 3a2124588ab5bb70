//! Wire rows as returned by the hosted backend and accepted by `import`.
//!
//! Related evaluations and reviews arrive as arrays holding at most one
//! element. Conversion to [`CallRecord`] reads index 0 and tolerates an
//! empty or missing array.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::types::{
    parse_date_bound, AdherenceReview, CallRecord, DateBound, Evaluation, FreeText, Sentiment,
};

/// One call row with its embedded related rows.
#[derive(Debug, Clone, Deserialize)]
pub struct CallRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub voice_provider: Option<String>,
    #[serde(default)]
    pub voice_model: Option<String>,
    #[serde(default)]
    pub transcriber_provider: Option<String>,
    #[serde(default)]
    pub transcriber_model: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub lead_evaluations: Vec<EvaluationRow>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub prompt_adherence_reviews: Vec<ReviewRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRow {
    #[serde(default)]
    pub overall_score: Option<f64>,
    /// Unrecognized labels are dropped on conversion
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub clarity_politeness_score: Option<f64>,
    #[serde(default)]
    pub naturalness_score: Option<f64>,
    #[serde(default)]
    pub relevance_questions_score: Option<f64>,
    #[serde(default)]
    pub objection_handling_score: Option<f64>,
    #[serde(default)]
    pub lead_intent_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRow {
    #[serde(default)]
    pub adherence_score: Option<f64>,
    #[serde(default)]
    pub what_went_wrong: Option<FreeText>,
    #[serde(default)]
    pub critical_failures_summary: Option<String>,
    #[serde(default)]
    pub recommendations: Option<FreeText>,
}

impl From<EvaluationRow> for Evaluation {
    fn from(row: EvaluationRow) -> Self {
        Self {
            overall_score: row.overall_score,
            sentiment: row.sentiment.as_deref().and_then(Sentiment::parse_lenient),
            clarity_politeness_score: row.clarity_politeness_score,
            naturalness_score: row.naturalness_score,
            relevance_questions_score: row.relevance_questions_score,
            objection_handling_score: row.objection_handling_score,
            lead_intent_score: row.lead_intent_score,
        }
    }
}

impl From<ReviewRow> for AdherenceReview {
    fn from(row: ReviewRow) -> Self {
        Self {
            adherence_score: row.adherence_score,
            what_went_wrong: row.what_went_wrong,
            critical_failures_summary: row.critical_failures_summary,
            recommendations: row.recommendations,
        }
    }
}

impl CallRow {
    /// Convert to a [`CallRecord`]; missing duration and cost become 0.
    pub fn into_record(self) -> CallRecord {
        CallRecord {
            id: self.id,
            client_id: self.client_id,
            llm_model: self.llm_model,
            voice_provider: self.voice_provider,
            voice_model: self.voice_model,
            transcriber_provider: self.transcriber_provider,
            transcriber_model: self.transcriber_model,
            created_at: self.created_at,
            duration_seconds: self.duration_seconds.unwrap_or(0.0),
            total_cost: self.total_cost.unwrap_or(0.0),
            evaluation: self.lead_evaluations.into_iter().next().map(Evaluation::from),
            adherence: self
                .prompt_adherence_reviews
                .into_iter()
                .next()
                .map(AdherenceReview::from),
        }
    }
}

impl From<CallRow> for CallRecord {
    fn from(row: CallRow) -> Self {
        row.into_record()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Accepts RFC 3339 and zone-less timestamps (taken as UTC).
fn timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_bound(&raw, DateBound::Start).map_err(serde::de::Error::custom)
}

fn nullable_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_related_arrays() {
        let json = r#"{
            "id": "call-1",
            "client_id": "acme",
            "llm_model": "gpt-4",
            "created_at": "2024-01-15T10:30:00+00:00",
            "duration_seconds": 125.5,
            "total_cost": 0.42,
            "lead_evaluations": [
                {"overall_score": 8.5, "sentiment": "Positive", "naturalness_score": 4.2},
                {"overall_score": 1.0}
            ],
            "prompt_adherence_reviews": [{
                "adherence_score": 85,
                "what_went_wrong": ["Missed greeting"],
                "critical_failures_summary": null,
                "recommendations": "Rule: greet first"
            }]
        }"#;
        let record = serde_json::from_str::<CallRow>(json).unwrap().into_record();

        assert_eq!(record.id, "call-1");
        assert_eq!(record.quality_score(), Some(8.5));
        let evaluation = record.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.sentiment, Some(Sentiment::Positive));
        assert_eq!(evaluation.naturalness_score, Some(4.2));
        assert_eq!(record.adherence_score(), Some(85.0));
        assert_eq!(record.critical_failure(), None);
        let review = record.adherence.as_ref().unwrap();
        assert_eq!(
            review.what_went_wrong,
            Some(FreeText::List(vec!["Missed greeting".to_string()]))
        );
        assert_eq!(
            review.recommendations,
            Some(FreeText::Raw("Rule: greet first".to_string()))
        );
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let json = r#"{
            "id": 42,
            "created_at": "2024-01-15T10:30:00",
            "duration_seconds": null,
            "lead_evaluations": null
        }"#;
        let record = serde_json::from_str::<CallRow>(json).unwrap().into_record();

        assert_eq!(record.id, "42");
        assert_eq!(record.created_at.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert_eq!(record.duration_seconds, 0.0);
        assert_eq!(record.total_cost, 0.0);
        assert!(record.evaluation.is_none());
        assert!(record.adherence.is_none());
    }

    #[test]
    fn test_unknown_sentiment_dropped() {
        let row = EvaluationRow {
            sentiment: Some("mixed".to_string()),
            ..Default::default()
        };
        assert_eq!(Evaluation::from(row).sentiment, None);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let json = r#"{"id": "c1", "created_at": "last tuesday"}"#;
        assert!(serde_json::from_str::<CallRow>(json).is_err());
    }
}
