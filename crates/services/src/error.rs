//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::sequencer::SequencerError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors internal to the AI question path. These never reach orchestrator
/// callers: the generator absorbs them by falling back to templates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("question generation returned an empty response")]
    EmptyResponse,
    #[error("question generation failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `RunStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AutoModeOrchestrator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] RunStoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

/// Errors emitted while bootstrapping the orchestrator over `SQLite`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
