use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::SaveId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when decoding attempt outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("invalid outcome value: {0}")]
    InvalidOutcome(u8),
}

//
// ─── ATTEMPT OUTCOME ──────────────────────────────────────────────────────────
//

/// Result of one answered question.
///
/// A tagged variant rather than a bool so future outcomes (skipped,
/// timed out) can be added without changing the progression engine's
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptOutcome {
    /// The learner answered correctly.
    Correct,
    /// The learner answered incorrectly. Resets the streak; never advances
    /// the topic pointer.
    Incorrect,
}

impl AttemptOutcome {
    /// Converts a stored numeric outcome (0 or 1) to an `AttemptOutcome`.
    ///
    /// # Errors
    ///
    /// Returns `OutcomeError::InvalidOutcome` for any other value.
    pub fn from_u8(value: u8) -> Result<Self, OutcomeError> {
        match value {
            0 => Ok(Self::Incorrect),
            1 => Ok(Self::Correct),
            _ => Err(OutcomeError::InvalidOutcome(value)),
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

//
// ─── ATTEMPT LOG ──────────────────────────────────────────────────────────────
//

/// Record of a single answered question within a run.
///
/// Captures the topic pointer at answer time so history stays meaningful
/// even after the run promotes past the topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptLog {
    pub save_id: SaveId,
    pub topic_pointer: usize,
    pub outcome: AttemptOutcome,
    pub answered_at: DateTime<Utc>,
}

impl AttemptLog {
    #[must_use]
    pub fn new(
        save_id: SaveId,
        topic_pointer: usize,
        outcome: AttemptOutcome,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            save_id,
            topic_pointer,
            outcome,
            answered_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
