//! Database repository layer
//!
//! Stores calls with their lead evaluations and adherence reviews, and reads
//! them back as [`CallRecord`]s for analysis.

use crate::error::Result;
use crate::source::{CallFilter, CallSource};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Joins each call to its first evaluation and first review (lowest rowid).
const SELECT_CALLS: &str = r#"
    SELECT c.id, c.client_id, c.llm_model, c.voice_provider, c.voice_model,
           c.transcriber_provider, c.transcriber_model, c.created_at,
           c.duration_seconds, c.total_cost,
           e.id AS evaluation_id, e.overall_score, e.sentiment,
           e.clarity_politeness_score, e.naturalness_score,
           e.relevance_questions_score, e.objection_handling_score,
           e.lead_intent_score,
           r.id AS review_id, r.adherence_score, r.what_went_wrong,
           r.critical_failures_summary, r.recommendations
    FROM calls c
    LEFT JOIN lead_evaluations e
        ON e.id = (SELECT MIN(id) FROM lead_evaluations WHERE call_id = c.id)
    LEFT JOIN prompt_adherence_reviews r
        ON r.id = (SELECT MIN(id) FROM prompt_adherence_reviews WHERE call_id = c.id)
    WHERE c.created_at >= ?1 AND c.created_at <= ?2
"#;

/// Fixed-width UTC timestamp used for storage and range comparison.
fn storage_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Stored review text: JSON string arrays come back as lists.
fn free_text_from_storage(value: Option<String>) -> Option<FreeText> {
    value.map(|raw| match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(items) => FreeText::List(items),
        Err(_) => FreeText::Raw(raw),
    })
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    ///
    /// A poisoned lock is recovered rather than propagated.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================
    // Call operations
    // ============================================

    /// Insert or replace a call with its evaluation and review
    pub fn insert_call(&self, call: &CallRecord) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        Self::write_call(&tx, call)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace multiple calls in a transaction
    pub fn insert_calls(&self, calls: &[CallRecord]) -> Result<usize> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        for call in calls {
            Self::write_call(&tx, call)?;
        }

        tx.commit()?;
        tracing::info!(count = calls.len(), "Stored calls");
        Ok(calls.len())
    }

    fn write_call(conn: &Connection, call: &CallRecord) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO calls (id, client_id, llm_model, voice_provider, voice_model,
                               transcriber_provider, transcriber_model, created_at,
                               duration_seconds, total_cost)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                llm_model = excluded.llm_model,
                voice_provider = excluded.voice_provider,
                voice_model = excluded.voice_model,
                transcriber_provider = excluded.transcriber_provider,
                transcriber_model = excluded.transcriber_model,
                created_at = excluded.created_at,
                duration_seconds = excluded.duration_seconds,
                total_cost = excluded.total_cost
            "#,
            params![
                call.id,
                call.client_id,
                call.llm_model,
                call.voice_provider,
                call.voice_model,
                call.transcriber_provider,
                call.transcriber_model,
                storage_timestamp(call.created_at),
                call.duration_seconds,
                call.total_cost,
            ],
        )?;

        // Replacing a call replaces its related rows
        conn.execute("DELETE FROM lead_evaluations WHERE call_id = ?", [&call.id])?;
        conn.execute(
            "DELETE FROM prompt_adherence_reviews WHERE call_id = ?",
            [&call.id],
        )?;

        if let Some(evaluation) = &call.evaluation {
            conn.execute(
                r#"
                INSERT INTO lead_evaluations (call_id, overall_score, sentiment,
                                              clarity_politeness_score, naturalness_score,
                                              relevance_questions_score, objection_handling_score,
                                              lead_intent_score)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    call.id,
                    evaluation.overall_score,
                    evaluation.sentiment.map(|s| s.as_str()),
                    evaluation.clarity_politeness_score,
                    evaluation.naturalness_score,
                    evaluation.relevance_questions_score,
                    evaluation.objection_handling_score,
                    evaluation.lead_intent_score,
                ],
            )?;
        }

        if let Some(review) = &call.adherence {
            conn.execute(
                r#"
                INSERT INTO prompt_adherence_reviews (call_id, adherence_score, what_went_wrong,
                                                      critical_failures_summary, recommendations)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    call.id,
                    review.adherence_score,
                    review.what_went_wrong.as_ref().map(FreeText::to_storage),
                    review.critical_failures_summary,
                    review.recommendations.as_ref().map(FreeText::to_storage),
                ],
            )?;
        }

        Ok(())
    }

    /// List calls in the filter's range, oldest first
    pub fn list_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        let conn = self.connection();

        let mut sql = String::from(SELECT_CALLS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(storage_timestamp(filter.start)),
            Box::new(storage_timestamp(filter.end)),
        ];

        if let Some(client_id) = &filter.client_id {
            sql.push_str(" AND c.client_id = ?3");
            params.push(Box::new(client_id.clone()));
        }

        sql.push_str(" ORDER BY c.created_at ASC, c.rowid ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let calls = stmt
            .query_map(params_refs.as_slice(), Self::row_to_call)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(calls)
    }

    /// Count all stored calls
    pub fn count_calls(&self) -> Result<i64> {
        let conn = self.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM calls", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_call(row: &Row) -> rusqlite::Result<CallRecord> {
        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let evaluation_id: Option<i64> = row.get("evaluation_id")?;
        let evaluation = match evaluation_id {
            Some(_) => {
                let sentiment: Option<String> = row.get("sentiment")?;
                Some(Evaluation {
                    overall_score: row.get("overall_score")?,
                    sentiment: sentiment.as_deref().and_then(Sentiment::parse_lenient),
                    clarity_politeness_score: row.get("clarity_politeness_score")?,
                    naturalness_score: row.get("naturalness_score")?,
                    relevance_questions_score: row.get("relevance_questions_score")?,
                    objection_handling_score: row.get("objection_handling_score")?,
                    lead_intent_score: row.get("lead_intent_score")?,
                })
            }
            None => None,
        };

        let review_id: Option<i64> = row.get("review_id")?;
        let adherence = match review_id {
            Some(_) => Some(AdherenceReview {
                adherence_score: row.get("adherence_score")?,
                what_went_wrong: free_text_from_storage(row.get("what_went_wrong")?),
                critical_failures_summary: row.get("critical_failures_summary")?,
                recommendations: free_text_from_storage(row.get("recommendations")?),
            }),
            None => None,
        };

        let duration: Option<f64> = row.get("duration_seconds")?;
        let cost: Option<f64> = row.get("total_cost")?;

        Ok(CallRecord {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            llm_model: row.get("llm_model")?,
            voice_provider: row.get("voice_provider")?,
            voice_model: row.get("voice_model")?,
            transcriber_provider: row.get("transcriber_provider")?,
            transcriber_model: row.get("transcriber_model")?,
            created_at,
            duration_seconds: duration.unwrap_or(0.0),
            total_cost: cost.unwrap_or(0.0),
            evaluation,
            adherence,
        })
    }
}

#[async_trait]
impl CallSource for Database {
    async fn fetch_calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        self.list_calls(filter)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
