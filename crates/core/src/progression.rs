use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AttemptLog, AttemptOutcome, Run, RunStatus, RunToggle};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("promotion threshold must be >= 1, got {provided}")]
    InvalidThreshold { provided: u32 },

    #[error("aggressive threshold ({aggressive}) cannot exceed the default ({default})")]
    ThresholdOrder { aggressive: u32, default: u32 },
}

//
// ─── THRESHOLDS ────────────────────────────────────────────────────────────────
//

/// Consecutive correct answers required for promotion by default.
pub const DEFAULT_PROMOTION_THRESHOLD: u32 = 3;

/// Threshold in effect while aggressive progression is enabled.
pub const AGGRESSIVE_PROMOTION_THRESHOLD: u32 = 2;

//
// ─── APPLIED ATTEMPT ───────────────────────────────────────────────────────────
//

/// Result of applying one attempt: the updated run, the history entry, and
/// whether the attempt promoted the learner to the next topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAttempt {
    pub run: Run,
    pub log: AttemptLog,
    pub promoted: bool,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Pure decision logic for run progression. No I/O.
///
/// Given a run and an attempt outcome, computes the next run state: streak,
/// topic pointer, completion counter, and status. The engine is the only
/// component that mutates a run; the orchestrator persists what it returns.
///
/// The curriculum is passed in as its flattened length so the engine stays
/// decoupled from the catalog: the pointer is promoted up to, and frozen
/// at, the terminal index (`curriculum_len`).
#[derive(Debug, Clone, Copy)]
pub struct ProgressionEngine {
    default_threshold: u32,
    aggressive_threshold: u32,
}

impl ProgressionEngine {
    /// Engine with the standard thresholds (3, or 2 under aggressive
    /// progression).
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_threshold: DEFAULT_PROMOTION_THRESHOLD,
            aggressive_threshold: AGGRESSIVE_PROMOTION_THRESHOLD,
        }
    }

    /// Engine with custom promotion thresholds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidThreshold` if either threshold is zero, and
    /// `ThresholdOrder` if the aggressive threshold would demand more
    /// correct answers than the default one.
    pub fn try_with_thresholds(
        default_threshold: u32,
        aggressive_threshold: u32,
    ) -> Result<Self, ProgressionError> {
        for provided in [default_threshold, aggressive_threshold] {
            if provided == 0 {
                return Err(ProgressionError::InvalidThreshold { provided });
            }
        }
        if aggressive_threshold > default_threshold {
            return Err(ProgressionError::ThresholdOrder {
                aggressive: aggressive_threshold,
                default: default_threshold,
            });
        }

        Ok(Self {
            default_threshold,
            aggressive_threshold,
        })
    }

    /// Promotion threshold in effect for this run.
    ///
    /// The topic sequencer projects progress percentages from the same
    /// value, so the UI can never contradict the promotion rule.
    #[must_use]
    pub fn threshold_for(&self, run: &Run) -> u32 {
        if run.aggressive_progression() {
            self.aggressive_threshold
        } else {
            self.default_threshold
        }
    }

    /// Applies one attempt outcome to a run.
    ///
    /// - `completed_questions` always increments, including on a completed
    ///   run (free practice continues past the curriculum).
    /// - An incorrect answer resets the streak and never moves the pointer.
    ///   Remediation mode needs no extra handling here: the reset alone
    ///   guarantees at least one more repetition before the same-topic
    ///   threshold can be met again.
    /// - A correct answer extends the streak; at the threshold the run is
    ///   promoted and the streak resets. The pointer freezes at the
    ///   terminal index once the curriculum is exhausted.
    #[must_use]
    pub fn advance(
        &self,
        run: &Run,
        outcome: AttemptOutcome,
        curriculum_len: usize,
        answered_at: DateTime<Utc>,
    ) -> AppliedAttempt {
        let log = AttemptLog::new(
            run.save_id().clone(),
            run.topic_pointer(),
            outcome,
            answered_at,
        );

        let mut next = run.clone();
        next.increment_completed();
        next.touch(answered_at);

        let mut promoted = false;
        match outcome {
            AttemptOutcome::Incorrect => {
                next.set_streak(0);
            }
            AttemptOutcome::Correct => {
                let streak = next.streak().saturating_add(1);
                next.set_streak(streak);

                if streak >= self.threshold_for(run) && next.topic_pointer() < curriculum_len {
                    next.set_topic_pointer(next.topic_pointer() + 1);
                    next.set_streak(0);
                    promoted = true;
                }
            }
        }

        next.set_status(if next.topic_pointer() >= curriculum_len {
            RunStatus::Completed
        } else {
            RunStatus::Active
        });

        AppliedAttempt {
            run: next,
            log,
            promoted,
        }
    }

    /// Flips a learner toggle and refreshes the mutation timestamp.
    #[must_use]
    pub fn set_toggle(
        &self,
        run: &Run,
        toggle: RunToggle,
        enabled: bool,
        updated_at: DateTime<Utc>,
    ) -> Run {
        let mut next = run.clone();
        next.set_toggle_value(toggle, enabled);
        next.touch(updated_at);
        next
    }

    /// Clamps a rehydrated run against the current curriculum length.
    ///
    /// A pointer past the terminal index (the curriculum shrank between app
    /// versions) is pulled back to it, and the status is recomputed. Runs
    /// that are already consistent are returned unchanged, timestamp
    /// included.
    #[must_use]
    pub fn reconcile(&self, run: &Run, curriculum_len: usize, now: DateTime<Utc>) -> Run {
        let pointer = run.topic_pointer().min(curriculum_len);
        let status = if pointer >= curriculum_len {
            RunStatus::Completed
        } else {
            RunStatus::Active
        };

        if pointer == run.topic_pointer() && status == run.status() {
            return run.clone();
        }

        let mut next = run.clone();
        next.set_topic_pointer(pointer);
        next.set_status(status);
        next.touch(now);
        next
    }
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
