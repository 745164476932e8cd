use std::sync::Arc;

use practice_core::Clock;
use practice_core::model::{Run, SaveId};
use storage::repository::{RunRepository, RunSummary};

use crate::error::RunStoreError;

/// Durable mapping from save slots to runs, with write-time stamping.
///
/// Every `save` refreshes the run's `last_updated_at` before the overwrite,
/// so the most-recent-first slot listing and last-write-wins conflict
/// visibility both key off the actual write moment. The store keeps no
/// locks: a single logical writer per slot is a caller discipline.
#[derive(Clone)]
pub struct RunStore {
    clock: Clock,
    runs: Arc<dyn RunRepository>,
}

impl RunStore {
    #[must_use]
    pub fn new(clock: Clock, runs: Arc<dyn RunRepository>) -> Self {
        Self { clock, runs }
    }

    /// Load the run for a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) for absent slots; corrupt
    /// records were already discarded below this boundary and read the same
    /// way.
    pub async fn load(&self, save_id: &SaveId) -> Result<Run, RunStoreError> {
        Ok(self.runs.load_run(save_id).await?)
    }

    /// Stamp and overwrite the slot, returning the stamped run.
    ///
    /// # Errors
    ///
    /// Returns `RunStoreError` if the write fails; nothing was persisted.
    pub async fn save(&self, run: &Run) -> Result<Run, RunStoreError> {
        let stamped = run.stamped(self.clock.now());
        self.runs.upsert_run(&stamped).await?;
        Ok(stamped)
    }

    /// Slot summaries, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RunStoreError` on storage faults.
    pub async fn list(&self) -> Result<Vec<RunSummary>, RunStoreError> {
        Ok(self.runs.list_runs().await?)
    }

    /// Delete a slot. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RunStoreError` on storage faults.
    pub async fn delete(&self, save_id: &SaveId) -> Result<(), RunStoreError> {
        Ok(self.runs.delete_run(save_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, StorageError};

    fn build_store(clock: Clock) -> RunStore {
        RunStore::new(clock, Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn save_stamps_at_write_time() {
        let mut clock = fixed_clock();
        clock.advance(Duration::minutes(10));
        let store = build_store(clock);

        let run = Run::new(SaveId::new("slot-1").unwrap(), fixed_now());
        let saved = store.save(&run).await.unwrap();

        assert_eq!(saved.last_updated_at(), fixed_now() + Duration::minutes(10));
        assert!(saved.last_updated_at() >= run.last_updated_at());

        let loaded = store.load(run.save_id()).await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn load_of_missing_slot_is_not_found() {
        let store = build_store(fixed_clock());
        let err = store
            .load(&SaveId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RunStoreError::Storage(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_reflects_save_order() {
        let mut clock = fixed_clock();
        let store = build_store(clock);
        let first = Run::new(SaveId::new("first").unwrap(), fixed_now());
        store.save(&first).await.unwrap();

        clock.advance(Duration::minutes(1));
        let store = RunStore::new(clock, store.runs);
        let second = Run::new(SaveId::new("second").unwrap(), fixed_now());
        store.save(&second).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].save_id.as_str(), "second");
        assert_eq!(listed[1].save_id.as_str(), "first");
    }

    #[tokio::test]
    async fn delete_then_load_is_not_found() {
        let store = build_store(fixed_clock());
        let run = Run::new(SaveId::new("slot-1").unwrap(), fixed_now());
        store.save(&run).await.unwrap();

        store.delete(run.save_id()).await.unwrap();
        store.delete(run.save_id()).await.unwrap();

        assert!(matches!(
            store.load(run.save_id()).await,
            Err(RunStoreError::Storage(StorageError::NotFound))
        ));
    }
}
