use async_trait::async_trait;
use chrono::{DateTime, Utc};
use practice_core::model::{AttemptLog, AttemptOutcome, Run, RunStatus, SaveId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A stored record failed shape validation. Absorbed at the load
    /// boundary: `load_run` discards the record and reports `NotFound` so
    /// the caller can start a fresh run instead of crashing.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a run.
///
/// Mirrors the domain `Run` so repositories can serialize/deserialize
/// without leaking storage concerns into the domain layer.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub save_id: SaveId,
    pub topic_pointer: usize,
    pub streak: u32,
    pub completed_questions: u64,
    pub aggressive_progression: bool,
    pub remediation_mode: bool,
    pub last_updated_at: DateTime<Utc>,
    pub status: RunStatus,
}

impl RunRecord {
    #[must_use]
    pub fn from_run(run: &Run) -> Self {
        Self {
            save_id: run.save_id().clone(),
            topic_pointer: run.topic_pointer(),
            streak: run.streak(),
            completed_questions: run.completed_questions(),
            aggressive_progression: run.aggressive_progression(),
            remediation_mode: run.remediation_mode(),
            last_updated_at: run.last_updated_at(),
            status: run.status(),
        }
    }

    /// Convert the record back into a domain `Run`.
    #[must_use]
    pub fn into_run(self) -> Run {
        Run::from_persisted(
            self.save_id,
            self.topic_pointer,
            self.streak,
            self.completed_questions,
            self.aggressive_progression,
            self.remediation_mode,
            self.last_updated_at,
            self.status,
        )
    }
}

/// Listing projection for the save-slot picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub save_id: SaveId,
    pub topic_pointer: usize,
    pub completed_questions: u64,
    pub status: RunStatus,
    pub last_updated_at: DateTime<Utc>,
}

impl RunSummary {
    #[must_use]
    pub fn from_run(run: &Run) -> Self {
        Self {
            save_id: run.save_id().clone(),
            topic_pointer: run.topic_pointer(),
            completed_questions: run.completed_questions(),
            status: run.status(),
            last_updated_at: run.last_updated_at(),
        }
    }
}

/// Persisted attempt-history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptLogRecord {
    pub id: Option<i64>,
    pub save_id: SaveId,
    pub topic_pointer: usize,
    pub outcome: AttemptOutcome,
    pub promoted: bool,
    pub answered_at: DateTime<Utc>,
}

impl AttemptLogRecord {
    #[must_use]
    pub fn from_log(log: &AttemptLog, promoted: bool) -> Self {
        Self {
            id: None,
            save_id: log.save_id.clone(),
            topic_pointer: log.topic_pointer,
            outcome: log.outcome,
            promoted,
            answered_at: log.answered_at,
        }
    }
}

/// Repository contract for run save slots.
///
/// Writes are last-write-wins per slot; the store keeps no locks. A single
/// logical writer per slot is a caller discipline, not an enforced
/// invariant.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Load the run for a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the slot was never created, was
    /// deleted, or held a record that failed shape validation (corrupt
    /// records are discarded, never repaired in place).
    async fn load_run(&self, save_id: &SaveId) -> Result<Run, StorageError>;

    /// Overwrite the slot identified by the run's save id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the run cannot be stored.
    async fn upsert_run(&self, run: &Run) -> Result<(), StorageError>;

    /// Summaries for every slot, ordered by `last_updated_at` descending
    /// (most recently active first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage faults; corrupt rows are skipped,
    /// not fatal.
    async fn list_runs(&self) -> Result<Vec<RunSummary>, StorageError>;

    /// Delete a slot. Deleting a slot that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only on storage faults.
    async fn delete_run(&self, save_id: &SaveId) -> Result<(), StorageError>;
}

/// Transactional write of one recorded attempt: the run overwrite and the
/// history append land together or not at all.
#[async_trait]
pub trait AttemptPersistence: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if either write fails; neither is applied.
    async fn apply_attempt(
        &self,
        run: &Run,
        record: &AttemptLogRecord,
    ) -> Result<i64, StorageError>;
}

/// Read/append access to the attempt history.
#[async_trait]
pub trait AttemptLogRepository: Send + Sync {
    /// Append a single history row, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_attempt(&self, record: &AttemptLogRecord) -> Result<i64, StorageError>;

    /// Most recent attempts for a slot, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage faults.
    async fn attempts_for_save(
        &self,
        save_id: &SaveId,
        limit: u32,
    ) -> Result<Vec<AttemptLogRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    runs: Arc<Mutex<HashMap<SaveId, Run>>>,
    attempts: Arc<Mutex<Vec<AttemptLogRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn next_attempt_id(len: usize) -> Result<i64, StorageError> {
    i64::try_from(len + 1).map_err(|_| StorageError::Serialization("attempt id overflow".into()))
}

#[async_trait]
impl RunRepository for InMemoryRepository {
    async fn load_run(&self, save_id: &SaveId) -> Result<Run, StorageError> {
        let guard = self.runs.lock().map_err(lock_err)?;
        guard.get(save_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn upsert_run(&self, run: &Run) -> Result<(), StorageError> {
        let mut guard = self.runs.lock().map_err(lock_err)?;
        guard.insert(run.save_id().clone(), run.clone());
        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, StorageError> {
        let guard = self.runs.lock().map_err(lock_err)?;
        let mut summaries: Vec<RunSummary> = guard.values().map(RunSummary::from_run).collect();
        summaries.sort_by(|a, b| {
            b.last_updated_at
                .cmp(&a.last_updated_at)
                .then_with(|| a.save_id.cmp(&b.save_id))
        });
        Ok(summaries)
    }

    async fn delete_run(&self, save_id: &SaveId) -> Result<(), StorageError> {
        let mut guard = self.runs.lock().map_err(lock_err)?;
        guard.remove(save_id);
        Ok(())
    }
}

#[async_trait]
impl AttemptPersistence for InMemoryRepository {
    async fn apply_attempt(
        &self,
        run: &Run,
        record: &AttemptLogRecord,
    ) -> Result<i64, StorageError> {
        let mut runs = self.runs.lock().map_err(lock_err)?;
        let mut attempts = self.attempts.lock().map_err(lock_err)?;

        let id = next_attempt_id(attempts.len())?;
        runs.insert(run.save_id().clone(), run.clone());
        let mut stored = record.clone();
        stored.id = Some(id);
        attempts.push(stored);
        Ok(id)
    }
}

#[async_trait]
impl AttemptLogRepository for InMemoryRepository {
    async fn append_attempt(&self, record: &AttemptLogRecord) -> Result<i64, StorageError> {
        let mut attempts = self.attempts.lock().map_err(lock_err)?;
        let id = next_attempt_id(attempts.len())?;
        let mut stored = record.clone();
        stored.id = Some(id);
        attempts.push(stored);
        Ok(id)
    }

    async fn attempts_for_save(
        &self,
        save_id: &SaveId,
        limit: u32,
    ) -> Result<Vec<AttemptLogRecord>, StorageError> {
        let attempts = self.attempts.lock().map_err(lock_err)?;
        Ok(attempts
            .iter()
            .rev()
            .filter(|record| &record.save_id == save_id)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Aggregates the store's repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub runs: Arc<dyn RunRepository>,
    pub attempts: Arc<dyn AttemptPersistence>,
    pub attempt_logs: Arc<dyn AttemptLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let runs: Arc<dyn RunRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptPersistence> = Arc::new(repo.clone());
        let attempt_logs: Arc<dyn AttemptLogRepository> = Arc::new(repo);
        Self {
            runs,
            attempts,
            attempt_logs,
        }
    }
}
