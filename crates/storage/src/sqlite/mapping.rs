use practice_core::model::{AttemptOutcome, Run, RunStatus, SaveId};
use sqlx::Row;

use crate::repository::{AttemptLogRecord, RunRecord, StorageError};

fn corrupt<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Corrupted(e.to_string())
}

pub(crate) fn save_id_from_text(raw: &str) -> Result<SaveId, StorageError> {
    SaveId::new(raw).map_err(corrupt)
}

pub(crate) fn pointer_from_i64(v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Corrupted(format!("invalid topic_pointer: {v}")))
}

pub(crate) fn pointer_to_i64(v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("topic_pointer overflow".into()))
}

pub(crate) fn streak_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Corrupted(format!("invalid streak: {v}")))
}

pub(crate) fn completed_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v)
        .map_err(|_| StorageError::Corrupted(format!("invalid completed_questions: {v}")))
}

pub(crate) fn completed_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v)
        .map_err(|_| StorageError::Serialization("completed_questions overflow".into()))
}

pub(crate) fn bool_from_i64(field: &'static str, v: i64) -> Result<bool, StorageError> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::Corrupted(format!("invalid {field}: {other}"))),
    }
}

/// Converts a `RunStatus` to its storage representation.
pub(crate) fn status_to_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Active => "active",
        RunStatus::Completed => "completed",
    }
}

/// Converts a stored status string back into `RunStatus`.
/// This must stay consistent with `status_to_str`.
pub(crate) fn parse_status(s: &str) -> Result<RunStatus, StorageError> {
    match s {
        "active" => Ok(RunStatus::Active),
        "completed" => Ok(RunStatus::Completed),
        _ => Err(StorageError::Corrupted(format!("invalid status: {s}"))),
    }
}

/// Converts an `AttemptOutcome` to its storage representation.
/// Storage encoding uses 0..=1: Incorrect=0, Correct=1.
/// Outcome variants this build does not know cannot be encoded.
pub(crate) fn outcome_to_i64(outcome: AttemptOutcome) -> Result<i64, StorageError> {
    match outcome {
        AttemptOutcome::Incorrect => Ok(0),
        AttemptOutcome::Correct => Ok(1),
        other => Err(StorageError::Serialization(format!(
            "unencodable outcome: {other:?}"
        ))),
    }
}

/// Converts a stored integer outcome back into `AttemptOutcome`.
/// This must stay consistent with `outcome_to_i64`.
pub(crate) fn outcome_from_i64(value: i64) -> Result<AttemptOutcome, StorageError> {
    let byte =
        u8::try_from(value).map_err(|_| StorageError::Corrupted(format!("invalid outcome: {value}")))?;
    AttemptOutcome::from_u8(byte).map_err(corrupt)
}

pub(crate) fn map_run_row(row: &sqlx::sqlite::SqliteRow) -> Result<Run, StorageError> {
    let record = RunRecord {
        save_id: save_id_from_text(row.try_get::<String, _>("save_id").map_err(corrupt)?.as_str())?,
        topic_pointer: pointer_from_i64(row.try_get::<i64, _>("topic_pointer").map_err(corrupt)?)?,
        streak: streak_from_i64(row.try_get::<i64, _>("streak").map_err(corrupt)?)?,
        completed_questions: completed_from_i64(
            row.try_get::<i64, _>("completed_questions").map_err(corrupt)?,
        )?,
        aggressive_progression: bool_from_i64(
            "aggressive_progression",
            row.try_get::<i64, _>("aggressive_progression")
                .map_err(corrupt)?,
        )?,
        remediation_mode: bool_from_i64(
            "remediation_mode",
            row.try_get::<i64, _>("remediation_mode").map_err(corrupt)?,
        )?,
        last_updated_at: row.try_get("last_updated_at").map_err(corrupt)?,
        status: parse_status(row.try_get::<String, _>("status").map_err(corrupt)?.as_str())?,
    };

    Ok(record.into_run())
}

pub(crate) fn map_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptLogRecord, StorageError> {
    Ok(AttemptLogRecord {
        id: Some(row.try_get("id").map_err(corrupt)?),
        save_id: save_id_from_text(row.try_get::<String, _>("save_id").map_err(corrupt)?.as_str())?,
        topic_pointer: pointer_from_i64(row.try_get::<i64, _>("topic_pointer").map_err(corrupt)?)?,
        outcome: outcome_from_i64(row.try_get::<i64, _>("outcome").map_err(corrupt)?)?,
        promoted: bool_from_i64("promoted", row.try_get::<i64, _>("promoted").map_err(corrupt)?)?,
        answered_at: row.try_get("answered_at").map_err(corrupt)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_encoding_round_trips() {
        for status in [RunStatus::Active, RunStatus::Completed] {
            assert_eq!(parse_status(status_to_str(status)).unwrap(), status);
        }
        assert!(matches!(
            parse_status("paused"),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn outcome_encoding_round_trips() {
        for outcome in [AttemptOutcome::Incorrect, AttemptOutcome::Correct] {
            assert_eq!(
                outcome_from_i64(outcome_to_i64(outcome).unwrap()).unwrap(),
                outcome
            );
        }
        assert!(matches!(
            outcome_from_i64(9),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn negative_counters_are_corrupt() {
        assert!(matches!(
            pointer_from_i64(-1),
            Err(StorageError::Corrupted(_))
        ));
        assert!(matches!(
            streak_from_i64(-3),
            Err(StorageError::Corrupted(_))
        ));
        assert!(matches!(
            completed_from_i64(-10),
            Err(StorageError::Corrupted(_))
        ));
        assert!(matches!(
            bool_from_i64("promoted", 2),
            Err(StorageError::Corrupted(_))
        ));
    }
}
