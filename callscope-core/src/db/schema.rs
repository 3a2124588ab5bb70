//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: calls with their evaluations and adherence reviews
    r#"
    CREATE TABLE IF NOT EXISTS calls (
        id                   TEXT PRIMARY KEY,
        client_id            TEXT,
        llm_model            TEXT,
        voice_provider       TEXT,
        voice_model          TEXT,
        transcriber_provider TEXT,
        transcriber_model    TEXT,
        -- RFC 3339, fixed-width UTC so text comparison orders correctly
        created_at           TEXT NOT NULL,
        duration_seconds     REAL,
        total_cost           REAL
    );

    CREATE TABLE IF NOT EXISTS lead_evaluations (
        id                        INTEGER PRIMARY KEY AUTOINCREMENT,
        call_id                   TEXT NOT NULL REFERENCES calls(id) ON DELETE CASCADE,
        overall_score             REAL,
        sentiment                 TEXT,
        clarity_politeness_score  REAL,
        naturalness_score         REAL,
        relevance_questions_score REAL,
        objection_handling_score  REAL,
        lead_intent_score         REAL
    );

    CREATE TABLE IF NOT EXISTS prompt_adherence_reviews (
        id                        INTEGER PRIMARY KEY AUTOINCREMENT,
        call_id                   TEXT NOT NULL REFERENCES calls(id) ON DELETE CASCADE,
        adherence_score           REAL,
        -- JSON array or raw labeled text
        what_went_wrong           TEXT,
        critical_failures_summary TEXT,
        recommendations           TEXT
    );
    "#,
    // Version 2: range and join indexes
    r#"
    CREATE INDEX IF NOT EXISTS idx_calls_created ON calls(created_at);
    CREATE INDEX IF NOT EXISTS idx_calls_client_created ON calls(client_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_lead_evaluations_call ON lead_evaluations(call_id);
    CREATE INDEX IF NOT EXISTS idx_adherence_reviews_call ON prompt_adherence_reviews(call_id);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
