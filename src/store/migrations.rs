//! Version-tracked schema migrations.
//!
//! Each migration has a version number and SQL. `run_migrations()` reads the
//! highest applied version from `_migrations` and applies the newer ones in order.

use libsql::Connection;
use tracing::info;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "quiz_sessions",
        sql: r#"
            CREATE TABLE IF NOT EXISTS quiz_sessions (
                session_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                current_question TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                drop_off_point TEXT,
                answers TEXT NOT NULL DEFAULT '{}'
            );
            CREATE INDEX IF NOT EXISTS idx_quiz_sessions_last_updated
                ON quiz_sessions(last_updated);
        "#,
    },
    Migration {
        version: 2,
        name: "lead_capture",
        sql: r#"
            ALTER TABLE quiz_sessions ADD COLUMN email TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN name TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN phone TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN referral_source TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN savings_min INTEGER;
            ALTER TABLE quiz_sessions ADD COLUMN savings_max INTEGER;
            ALTER TABLE quiz_sessions ADD COLUMN urgency_level TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN urgency_message TEXT;
            ALTER TABLE quiz_sessions ADD COLUMN savings_breakdown TEXT;
            CREATE INDEX IF NOT EXISTS idx_quiz_sessions_email ON quiz_sessions(email);
        "#,
    },
];

/// Create the `_migrations` table if needed and apply pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    Ok(())
}

/// Highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
