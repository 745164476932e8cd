use chrono::{DateTime, Utc};

use crate::model::ids::SaveId;

//
// ─── STATUS & TOGGLES ─────────────────────────────────────────────────────────
//

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run is still working through the curriculum.
    Active,
    /// The topic pointer has reached the end of the curriculum. Further
    /// attempts are free practice: they count questions but never move the
    /// pointer.
    Completed,
}

/// Learner-controlled toggles persisted with the run.
///
/// Addressed as a variant so the progression engine stays the single
/// mutation path for every run field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunToggle {
    /// Lowers the promotion threshold from 3 to 2 consecutive correct
    /// answers.
    AggressiveProgression,
    /// Guarantees extra same-topic repetition after a mistake. The streak
    /// reset already provides the repetition; the flag records the
    /// learner's choice and is persisted for the UI.
    RemediationMode,
}

//
// ─── RUN ──────────────────────────────────────────────────────────────────────
//

/// One learner's progress through the adaptive curriculum, owned by exactly
/// one save slot.
///
/// All fields are private; state changes go through the progression engine
/// and timestamps through [`Run::stamped`] at persistence time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    save_id: SaveId,
    topic_pointer: usize,
    streak: u32,
    completed_questions: u64,
    aggressive_progression: bool,
    remediation_mode: bool,
    last_updated_at: DateTime<Utc>,
    status: RunStatus,
}

impl Run {
    /// Fresh run for a slot that has never been saved: pointer at the first
    /// topic, no streak, nothing answered.
    #[must_use]
    pub fn new(save_id: SaveId, created_at: DateTime<Utc>) -> Self {
        Self {
            save_id,
            topic_pointer: 0,
            streak: 0,
            completed_questions: 0,
            aggressive_progression: false,
            remediation_mode: false,
            last_updated_at: created_at,
            status: RunStatus::Active,
        }
    }

    /// Rehydrate a run from persisted storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        save_id: SaveId,
        topic_pointer: usize,
        streak: u32,
        completed_questions: u64,
        aggressive_progression: bool,
        remediation_mode: bool,
        last_updated_at: DateTime<Utc>,
        status: RunStatus,
    ) -> Self {
        Self {
            save_id,
            topic_pointer,
            streak,
            completed_questions,
            aggressive_progression,
            remediation_mode,
            last_updated_at,
            status,
        }
    }

    #[must_use]
    pub fn save_id(&self) -> &SaveId {
        &self.save_id
    }

    #[must_use]
    pub fn topic_pointer(&self) -> usize {
        self.topic_pointer
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn completed_questions(&self) -> u64 {
        self.completed_questions
    }

    #[must_use]
    pub fn aggressive_progression(&self) -> bool {
        self.aggressive_progression
    }

    #[must_use]
    pub fn remediation_mode(&self) -> bool {
        self.remediation_mode
    }

    #[must_use]
    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Copy of the run with the persistence timestamp refreshed.
    ///
    /// The store calls this at write time so `last_updated_at` always
    /// reflects the actual write, which drives the most-recent-first slot
    /// listing and last-write-wins conflict visibility.
    #[must_use]
    pub fn stamped(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.last_updated_at = at;
        next
    }

    pub(crate) fn set_topic_pointer(&mut self, pointer: usize) {
        self.topic_pointer = pointer;
    }

    pub(crate) fn set_streak(&mut self, streak: u32) {
        self.streak = streak;
    }

    pub(crate) fn increment_completed(&mut self) {
        self.completed_questions = self.completed_questions.saturating_add(1);
    }

    pub(crate) fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    pub(crate) fn set_toggle_value(&mut self, toggle: RunToggle, enabled: bool) {
        match toggle {
            RunToggle::AggressiveProgression => self.aggressive_progression = enabled,
            RunToggle::RemediationMode => self.remediation_mode = enabled,
        }
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated_at = at;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn fresh_run_starts_at_origin() {
        let run = Run::new(SaveId::new("slot-1").unwrap(), fixed_now());

        assert_eq!(run.topic_pointer(), 0);
        assert_eq!(run.streak(), 0);
        assert_eq!(run.completed_questions(), 0);
        assert!(!run.aggressive_progression());
        assert!(!run.remediation_mode());
        assert_eq!(run.status(), RunStatus::Active);
        assert_eq!(run.last_updated_at(), fixed_now());
    }

    #[test]
    fn stamped_only_touches_timestamp() {
        let run = Run::new(SaveId::new("slot-1").unwrap(), fixed_now());
        let later = fixed_now() + chrono::Duration::minutes(5);

        let stamped = run.stamped(later);

        assert_eq!(stamped.last_updated_at(), later);
        assert_eq!(stamped.topic_pointer(), run.topic_pointer());
        assert_eq!(stamped.streak(), run.streak());
        assert_eq!(stamped.completed_questions(), run.completed_questions());
        assert_eq!(stamped.status(), run.status());
    }

    #[test]
    fn from_persisted_round_trips_fields() {
        let save_id = SaveId::new("slot-2").unwrap();
        let run = Run::from_persisted(
            save_id.clone(),
            5,
            2,
            17,
            true,
            false,
            fixed_now(),
            RunStatus::Active,
        );

        assert_eq!(run.save_id(), &save_id);
        assert_eq!(run.topic_pointer(), 5);
        assert_eq!(run.streak(), 2);
        assert_eq!(run.completed_questions(), 17);
        assert!(run.aggressive_progression());
        assert!(!run.remediation_mode());
    }
}
