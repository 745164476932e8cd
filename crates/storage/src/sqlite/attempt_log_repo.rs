use practice_core::model::SaveId;

use super::{SqliteRepository, mapping};
use crate::repository::{AttemptLogRecord, AttemptLogRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl AttemptLogRepository for SqliteRepository {
    async fn append_attempt(&self, record: &AttemptLogRecord) -> Result<i64, StorageError> {
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
        .execute(self.pool())
        .await
        .map_err(conn)?;

        Ok(result.last_insert_rowid())
    }

    async fn attempts_for_save(
        &self,
        save_id: &SaveId,
        limit: u32,
    ) -> Result<Vec<AttemptLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, save_id, topic_pointer, outcome, promoted, answered_at
                FROM attempt_logs
                WHERE save_id = ?1
                ORDER BY answered_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(save_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(mapping::map_attempt_row(&row)?);
        }

        Ok(out)
    }
}
