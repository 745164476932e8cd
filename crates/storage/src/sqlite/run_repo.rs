use practice_core::model::{Run, SaveId};
use tracing::warn;

use super::{SqliteRepository, mapping};
use crate::repository::{
    AttemptLogRecord, AttemptPersistence, RunRepository, RunSummary, StorageError,
};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

const UPSERT_RUN_SQL: &str = r"
    INSERT INTO runs (
        save_id, topic_pointer, streak, completed_questions,
        aggressive_progression, remediation_mode, status, last_updated_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(save_id) DO UPDATE SET
        topic_pointer = excluded.topic_pointer,
        streak = excluded.streak,
        completed_questions = excluded.completed_questions,
        aggressive_progression = excluded.aggressive_progression,
        remediation_mode = excluded.remediation_mode,
        status = excluded.status,
        last_updated_at = excluded.last_updated_at
";

fn upsert_run_query(
    run: &Run,
) -> Result<sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>>, StorageError> {
    Ok(sqlx::query(UPSERT_RUN_SQL)
        .bind(run.save_id().as_str())
        .bind(mapping::pointer_to_i64(run.topic_pointer())?)
        .bind(i64::from(run.streak()))
        .bind(mapping::completed_to_i64(run.completed_questions())?)
        .bind(i64::from(run.aggressive_progression()))
        .bind(i64::from(run.remediation_mode()))
        .bind(mapping::status_to_str(run.status()))
        .bind(run.last_updated_at()))
}

impl SqliteRepository {
    async fn discard_run(&self, save_id: &SaveId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM runs WHERE save_id = ?1")
            .bind(save_id.as_str())
            .execute(self.pool())
            .await
            .map_err(conn)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RunRepository for SqliteRepository {
    async fn load_run(&self, save_id: &SaveId) -> Result<Run, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    save_id, topic_pointer, streak, completed_questions,
                    aggressive_progression, remediation_mode, status, last_updated_at
                FROM runs
                WHERE save_id = ?1
            ",
        )
        .bind(save_id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        match mapping::map_run_row(&row) {
            Ok(run) => Ok(run),
            Err(StorageError::Corrupted(reason)) => {
                // The contract on corrupt slots is a full reset: drop the
                // bytes so the caller starts a fresh run.
                warn!(save_id = save_id.as_str(), %reason, "discarding corrupt run record");
                self.discard_run(save_id).await?;
                Err(StorageError::NotFound)
            }
            Err(other) => Err(other),
        }
    }

    async fn upsert_run(&self, run: &Run) -> Result<(), StorageError> {
        upsert_run_query(run)?
            .execute(self.pool())
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    save_id, topic_pointer, streak, completed_questions,
                    aggressive_progression, remediation_mode, status, last_updated_at
                FROM runs
                ORDER BY last_updated_at DESC, save_id ASC
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            match mapping::map_run_row(&row) {
                Ok(run) => summaries.push(RunSummary::from_run(&run)),
                Err(StorageError::Corrupted(reason)) => {
                    // The slot picker should keep working even if one slot
                    // went bad; the corrupt record is handled at load time.
                    warn!(%reason, "skipping corrupt run record in listing");
                }
                Err(other) => return Err(other),
            }
        }

        Ok(summaries)
    }

    async fn delete_run(&self, save_id: &SaveId) -> Result<(), StorageError> {
        self.discard_run(save_id).await
    }
}

#[async_trait::async_trait]
impl AttemptPersistence for SqliteRepository {
    async fn apply_attempt(
        &self,
        run: &Run,
        record: &AttemptLogRecord,
    ) -> Result<i64, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        upsert_run_query(run)?
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let result = sqlx::query(
            r"
                INSERT INTO attempt_logs (
                    save_id, topic_pointer, outcome, promoted, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.save_id.as_str())
        .bind(mapping::pointer_to_i64(record.topic_pointer)?)
        .bind(mapping::outcome_to_i64(record.outcome)?)
        .bind(i64::from(record.promoted))
        .bind(record.answered_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let id = result.last_insert_rowid();
        tx.commit().await.map_err(conn)?;
        Ok(id)
    }
}
