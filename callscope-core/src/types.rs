//! Core domain types for callscope
//!
//! These types represent the read-only call data that every analyzer consumes,
//! plus the request shape that scopes an analytics run.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Call** | One AI-handled phone call with its cost and duration |
//! | **Evaluation** | A lead evaluation scoring the call's conversation quality (0-10) |
//! | **Adherence review** | A review of how closely the call followed its prompt and rules |
//! | **Model category** | Which AI role a model played: reasoning (LLM), voice, or transcriber |
//! | **Critical failure** | A free-text summary flagging a severe deviation in one call |
//! | **Period key** | Bucket label for trends: a date, a week-start date, or `YYYY-MM` |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier used when a call carries no model for the requested category.
pub const UNKNOWN_MODEL: &str = "Unknown";

// ============================================
// Model categories
// ============================================

/// The three independent AI roles in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    /// Primary reasoning model
    #[default]
    Llm,
    /// Speech-synthesis model, keyed by `provider/model`
    Voice,
    /// Speech-recognition model, keyed by `provider/model`
    Transcriber,
}

impl ModelCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::Llm => "llm",
            ModelCategory::Voice => "voice",
            ModelCategory::Transcriber => "transcriber",
        }
    }
}

impl std::str::FromStr for ModelCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(ModelCategory::Llm),
            "voice" => Ok(ModelCategory::Voice),
            "transcriber" => Ok(ModelCategory::Transcriber),
            _ => Err(format!("unknown model category: {}", s)),
        }
    }
}

// ============================================
// Trend granularity
// ============================================

/// Size of the buckets used for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    /// Weeks start on Sunday
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(format!("unknown granularity: {}", s)),
        }
    }
}

// ============================================
// Evaluation
// ============================================

/// Caller sentiment recorded by a lead evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Lenient parse used for stored values; unknown labels map to `None`.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            _ => Err(format!("unknown sentiment: {}", s)),
        }
    }
}

/// Lead evaluation attached to at most one call.
///
/// All scores share the overall score's numeric scale. Any of them may be
/// missing in stored data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub clarity_politeness_score: Option<f64>,
    pub naturalness_score: Option<f64>,
    pub relevance_questions_score: Option<f64>,
    pub objection_handling_score: Option<f64>,
    pub lead_intent_score: Option<f64>,
}

// ============================================
// Adherence review
// ============================================

/// A review text field that is either already a list or an encoded string.
///
/// Stored values arrive as JSON arrays from the hosted backend and as raw
/// strings (JSON-encoded or labeled sections) from older rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreeText {
    List(Vec<String>),
    Raw(String),
}

impl FreeText {
    /// Storage form: lists are JSON-encoded, raw strings kept as-is.
    pub fn to_storage(&self) -> String {
        match self {
            FreeText::List(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| items.join("\n"))
            }
            FreeText::Raw(raw) => raw.clone(),
        }
    }
}

/// Prompt-adherence review attached to at most one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdherenceReview {
    pub adherence_score: Option<f64>,
    pub what_went_wrong: Option<FreeText>,
    pub critical_failures_summary: Option<String>,
    pub recommendations: Option<FreeText>,
}

// ============================================
// Call record
// ============================================

/// One call with its zero-or-one evaluation and adherence review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub client_id: Option<String>,
    pub llm_model: Option<String>,
    pub voice_provider: Option<String>,
    pub voice_model: Option<String>,
    pub transcriber_provider: Option<String>,
    pub transcriber_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total_cost: f64,
    pub evaluation: Option<Evaluation>,
    pub adherence: Option<AdherenceReview>,
}

impl CallRecord {
    /// Minimal record with no model fields, evaluation, or review.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            llm_model: None,
            voice_provider: None,
            voice_model: None,
            transcriber_provider: None,
            transcriber_model: None,
            created_at,
            duration_seconds: 0.0,
            total_cost: 0.0,
            evaluation: None,
            adherence: None,
        }
    }

    /// Resolve the model identifier for a category.
    ///
    /// Speech roles join provider and model with `/`. A missing or blank value
    /// resolves to [`UNKNOWN_MODEL`].
    pub fn model_id(&self, category: ModelCategory) -> String {
        match category {
            ModelCategory::Llm => non_blank(&self.llm_model)
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            ModelCategory::Voice => join_provider_model(&self.voice_provider, &self.voice_model),
            ModelCategory::Transcriber => {
                join_provider_model(&self.transcriber_provider, &self.transcriber_model)
            }
        }
    }

    /// Overall evaluation score, if evaluated and scored.
    pub fn quality_score(&self) -> Option<f64> {
        self.evaluation.as_ref().and_then(|e| e.overall_score)
    }

    /// Adherence score, if reviewed and scored.
    pub fn adherence_score(&self) -> Option<f64> {
        self.adherence.as_ref().and_then(|a| a.adherence_score)
    }

    /// Critical-failure summary, if the review recorded one.
    pub fn critical_failure(&self) -> Option<&str> {
        self.adherence
            .as_ref()
            .and_then(|a| a.critical_failures_summary.as_deref())
    }

    /// Calendar date of the call (UTC).
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn join_provider_model(provider: &Option<String>, model: &Option<String>) -> String {
    match (non_blank(provider), non_blank(model)) {
        (Some(p), Some(m)) => format!("{}/{}", p, m),
        (Some(single), None) | (None, Some(single)) => single.to_string(),
        (None, None) => UNKNOWN_MODEL.to_string(),
    }
}

// ============================================
// Analytics request
// ============================================

/// Scope of one analytics run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub client_id: Option<String>,
    /// Restrict to one model identifier (resolved for `category`)
    pub model: Option<String>,
    pub category: ModelCategory,
    pub granularity: Granularity,
}

impl AnalyticsRequest {
    /// Create a request for an inclusive date range.
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<Self> {
        if start_date > end_date {
            return Err(Error::InvalidRequest(format!(
                "start date {} is after end date {}",
                start_date.to_rfc3339(),
                end_date.to_rfc3339()
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            client_id: None,
            model: None,
            category: ModelCategory::default(),
            granularity: Granularity::default(),
        })
    }

    /// Create a request from ISO-8601 bounds.
    ///
    /// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC),
    /// or bare dates. A bare end date covers the whole day.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start_date = parse_date_bound(start, DateBound::Start)?;
        let end_date = parse_date_bound(end, DateBound::End)?;
        Self::new(start_date, end_date)
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_category(mut self, category: ModelCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Whether a call passes the single-model filter for this request.
    pub fn matches_model(&self, call: &CallRecord) -> bool {
        match &self.model {
            Some(model) => call.model_id(self.category) == *model,
            None => true,
        }
    }
}

/// Which end of a range a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parse an ISO-8601 range bound into a UTC timestamp.
pub fn parse_date_bound(value: &str, bound: DateBound) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        Error::InvalidRequest(format!("invalid date '{}': expected ISO-8601", value))
    })?;

    let time = match bound {
        DateBound::Start => NaiveTime::from_hms_opt(0, 0, 0),
        DateBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(|| Error::InvalidRequest("invalid range bound time".to_string()))?;

    Ok(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_model_id_resolution() {
        let mut call = CallRecord::new("c1", ts());
        assert_eq!(call.model_id(ModelCategory::Llm), UNKNOWN_MODEL);
        assert_eq!(call.model_id(ModelCategory::Voice), UNKNOWN_MODEL);

        call.llm_model = Some("gpt-4".to_string());
        call.voice_provider = Some("elevenlabs".to_string());
        call.voice_model = Some("turbo-v2".to_string());
        call.transcriber_model = Some("nova-2".to_string());

        assert_eq!(call.model_id(ModelCategory::Llm), "gpt-4");
        assert_eq!(call.model_id(ModelCategory::Voice), "elevenlabs/turbo-v2");
        assert_eq!(call.model_id(ModelCategory::Transcriber), "nova-2");
    }

    #[test]
    fn test_blank_model_is_unknown() {
        let mut call = CallRecord::new("c1", ts());
        call.llm_model = Some("   ".to_string());
        assert_eq!(call.model_id(ModelCategory::Llm), UNKNOWN_MODEL);
    }

    #[test]
    fn test_free_text_untagged() {
        let list: FreeText = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(list, FreeText::List(vec!["a".to_string(), "b".to_string()]));

        let raw: FreeText = serde_json::from_str(r#""Rule: greet""#).unwrap();
        assert_eq!(raw, FreeText::Raw("Rule: greet".to_string()));
        assert_eq!(list.to_storage(), r#"["a","b"]"#);
    }

    #[test]
    fn test_sentiment_parse() {
        assert_eq!(Sentiment::parse_lenient("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse_lenient(" negative "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse_lenient("mixed"), None);
    }

    #[test]
    fn test_parse_request_dates() {
        let request = AnalyticsRequest::parse("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(request.start_date.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(
            request.end_date.to_rfc3339(),
            "2024-01-31T23:59:59.999+00:00"
        );

        let request =
            AnalyticsRequest::parse("2024-01-01T00:00:00Z", "2024-01-02T10:30:00+02:00").unwrap();
        assert_eq!(request.end_date.to_rfc3339(), "2024-01-02T08:30:00+00:00");
        assert_eq!(request.category, ModelCategory::Llm);
        assert_eq!(request.granularity, Granularity::Daily);
    }

    #[test]
    fn test_parse_request_rejects_bad_input() {
        assert!(matches!(
            AnalyticsRequest::parse("yesterday", "2024-01-31"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalyticsRequest::parse("2024-02-01", "2024-01-31"),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_matches_model_uses_category() {
        let mut call = CallRecord::new("c1", ts());
        call.voice_provider = Some("elevenlabs".to_string());
        call.voice_model = Some("turbo-v2".to_string());

        let request = AnalyticsRequest::new(ts(), ts())
            .unwrap()
            .with_category(ModelCategory::Voice)
            .with_model("elevenlabs/turbo-v2");
        assert!(request.matches_model(&call));

        let request = request.with_category(ModelCategory::Llm);
        assert!(!request.matches_model(&call));
    }

    #[test]
    fn test_category_and_granularity_from_str() {
        assert_eq!("Voice".parse::<ModelCategory>(), Ok(ModelCategory::Voice));
        assert!("tts".parse::<ModelCategory>().is_err());
        assert_eq!("monthly".parse::<Granularity>(), Ok(Granularity::Monthly));
        assert!("hourly".parse::<Granularity>().is_err());
    }
}
