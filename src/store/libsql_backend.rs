//! libSQL-backed progress store.
//!
//! One row per quiz session. Writes merge into the existing row so a partial
//! update never erases what an earlier one recorded.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::{DatabaseError, SubmissionError};
use crate::estimator::{BreakdownEntry, SavingsEstimate, UrgencyLevel};
use crate::leads::{ContactDetails, LeadSink, ProgressRecord, ProgressSource};
use crate::quiz::AnswerSet;
use crate::store::migrations;

const SESSION_COLUMNS: &str = "session_id, started_at, last_updated, current_question, completed, \
     drop_off_point, answers, email, name, phone, referral_source, savings_min, savings_max, \
     urgency_level, urgency_message, savings_breakdown";

/// libSQL progress store.
///
/// `libsql::Connection` is `Send + Sync`; a single connection is shared.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;
        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// In-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Insert a new row or merge into the existing one.
    ///
    /// `started_at` is kept from the first write, `completed` never reverts,
    /// and null or empty values leave stored columns untouched. Answers are
    /// merged key by key. A record older than the stored row cannot move
    /// `last_updated` or `current_question` back, and its answers only fill
    /// keys the row does not have yet.
    pub async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), DatabaseError> {
        let answers = serde_json::to_string(&record.answers)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let contact = record.contact.as_ref();
        let estimate = record.estimate.as_ref();
        let breakdown = estimate
            .map(|e| serde_json::to_string(&e.breakdown))
            .transpose()
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO quiz_sessions (session_id, started_at, last_updated, current_question,
                     completed, drop_off_point, answers, email, name, phone, referral_source,
                     savings_min, savings_max, urgency_level, urgency_message, savings_breakdown)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                 ON CONFLICT (session_id) DO UPDATE SET
                     last_updated = MAX(quiz_sessions.last_updated, excluded.last_updated),
                     current_question = CASE WHEN excluded.last_updated >= quiz_sessions.last_updated
                         THEN COALESCE(NULLIF(excluded.current_question, ''), quiz_sessions.current_question)
                         ELSE quiz_sessions.current_question END,
                     completed = MAX(quiz_sessions.completed, excluded.completed),
                     drop_off_point = COALESCE(NULLIF(excluded.drop_off_point, ''), quiz_sessions.drop_off_point),
                     answers = CASE WHEN excluded.last_updated >= quiz_sessions.last_updated
                         THEN json_patch(quiz_sessions.answers, excluded.answers)
                         ELSE json_patch(excluded.answers, quiz_sessions.answers) END,
                     email = COALESCE(NULLIF(excluded.email, ''), quiz_sessions.email),
                     name = COALESCE(NULLIF(excluded.name, ''), quiz_sessions.name),
                     phone = COALESCE(NULLIF(excluded.phone, ''), quiz_sessions.phone),
                     referral_source = COALESCE(NULLIF(excluded.referral_source, ''), quiz_sessions.referral_source),
                     savings_min = COALESCE(excluded.savings_min, quiz_sessions.savings_min),
                     savings_max = COALESCE(excluded.savings_max, quiz_sessions.savings_max),
                     urgency_level = COALESCE(excluded.urgency_level, quiz_sessions.urgency_level),
                     urgency_message = COALESCE(excluded.urgency_message, quiz_sessions.urgency_message),
                     savings_breakdown = COALESCE(excluded.savings_breakdown, quiz_sessions.savings_breakdown)",
                params![
                    record.session_id.as_str(),
                    timestamp(record.started_at),
                    timestamp(record.last_updated),
                    opt_text(record.current_question.as_deref()),
                    record.completed as i64,
                    opt_text(record.drop_off_point.as_deref()),
                    answers,
                    opt_text(contact.map(|c| c.email.as_str())),
                    opt_text(contact.and_then(|c| c.name.as_deref())),
                    opt_text(contact.and_then(|c| c.phone.as_deref())),
                    opt_text(contact.and_then(|c| c.referral_source.as_deref())),
                    opt_int(estimate.map(|e| e.total_min)),
                    opt_int(estimate.map(|e| e.total_max)),
                    opt_text(estimate.map(|e| e.urgency_level.to_string()).as_deref()),
                    opt_text(estimate.and_then(|e| e.urgency_message.as_deref())),
                    opt_text(breakdown.as_deref()),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_progress: {e}")))?;

        debug!(session_id = %record.session_id, completed = record.completed, "Progress stored");
        Ok(())
    }

    /// Load the merged row for a session.
    pub async fn get_progress(
        &self,
        session_id: &str,
    ) -> Result<Option<ProgressRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE session_id = ?1"),
                params![session_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_progress: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_record(&row).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_progress: {e}"))),
        }
    }
}

#[async_trait]
impl LeadSink for LibSqlStore {
    fn name(&self) -> &str {
        "libsql"
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<(), SubmissionError> {
        Ok(self.upsert_progress(record).await?)
    }
}

#[async_trait]
impl ProgressSource for LibSqlStore {
    async fn load(&self, session_id: &str) -> Result<Option<ProgressRecord>, DatabaseError> {
        self.get_progress(session_id).await
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn opt_int(n: Option<u64>) -> libsql::Value {
    match n.and_then(|n| i64::try_from(n).ok()) {
        Some(n) => libsql::Value::Integer(n),
        None => libsql::Value::Null,
    }
}

/// Fixed-width UTC timestamps so stored values order correctly as text.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 string, falling back to the epoch minimum on corrupt rows.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Map a row selected with `SESSION_COLUMNS`.
fn row_to_record(row: &libsql::Row) -> Result<ProgressRecord, DatabaseError> {
    let text = |idx: i32| row.get::<String>(idx).ok();
    let int = |idx: i32| row.get::<i64>(idx).ok().and_then(|n| u64::try_from(n).ok());

    let session_id = row
        .get::<String>(0)
        .map_err(|e| DatabaseError::Query(format!("session_id column: {e}")))?;
    let answers: AnswerSet = serde_json::from_str(&text(6).unwrap_or_else(|| "{}".into()))
        .map_err(|e| DatabaseError::Serialization(format!("answers for {session_id}: {e}")))?;

    let contact = text(7).map(|email| ContactDetails {
        email,
        name: text(8),
        phone: text(9),
        referral_source: text(10),
    });

    let estimate = match (int(11), int(12)) {
        (Some(total_min), Some(total_max)) => {
            let breakdown: Vec<BreakdownEntry> = text(15)
                .map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(|e| DatabaseError::Serialization(format!("breakdown: {e}")))?
                .unwrap_or_default();
            let urgency_level: UrgencyLevel = text(13)
                .and_then(|level| serde_json::from_value(serde_json::Value::String(level)).ok())
                .unwrap_or_default();
            Some(SavingsEstimate {
                total_min,
                total_max,
                breakdown,
                urgency_level,
                urgency_message: text(14),
            })
        }
        _ => None,
    };

    Ok(ProgressRecord {
        started_at: parse_datetime(&text(1).unwrap_or_default()),
        last_updated: parse_datetime(&text(2).unwrap_or_default()),
        current_question: text(3),
        completed: row.get::<i64>(4).unwrap_or(0) != 0,
        drop_off_point: text(5),
        contact,
        answers,
        estimate,
        session_id,
    })
}
