use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migration chain.
///
/// Each version is applied once and recorded in `schema_migrations`; a
/// database stamped with only older versions picks up the missing steps on
/// the next startup. Version 1 creates the current schema (runs, attempt
/// logs, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS runs (
                    save_id TEXT PRIMARY KEY,
                    topic_pointer INTEGER NOT NULL CHECK (topic_pointer >= 0),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    completed_questions INTEGER NOT NULL CHECK (completed_questions >= 0),
                    aggressive_progression INTEGER NOT NULL CHECK (aggressive_progression IN (0, 1)),
                    remediation_mode INTEGER NOT NULL CHECK (remediation_mode IN (0, 1)),
                    status TEXT NOT NULL,
                    last_updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempt_logs (
                    id INTEGER PRIMARY KEY,
                    save_id TEXT NOT NULL,
                    topic_pointer INTEGER NOT NULL CHECK (topic_pointer >= 0),
                    outcome INTEGER NOT NULL CHECK (outcome BETWEEN 0 AND 1),
                    promoted INTEGER NOT NULL CHECK (promoted IN (0, 1)),
                    answered_at TEXT NOT NULL,
                    FOREIGN KEY (save_id) REFERENCES runs(save_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_runs_last_updated
                    ON runs(last_updated_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempt_logs_save_answered
                    ON attempt_logs(save_id, answered_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
