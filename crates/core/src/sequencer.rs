use std::sync::Arc;

use thiserror::Error;

use crate::curriculum::Curriculum;
use crate::model::{Run, Topic};
use crate::progression::ProgressionEngine;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequencerError {
    /// The run's pointer does not address a topic. Reaching this through a
    /// completed run is expected (there is no current topic to serve);
    /// reaching it otherwise means an invariant was broken upstream and the
    /// call should be treated as fatal rather than retried.
    #[error("topic pointer {pointer} is outside the curriculum (len {len})")]
    OutOfRange { pointer: usize, len: usize },
}

//
// ─── PROGRESS VIEWS ────────────────────────────────────────────────────────────
//

/// Streak progress toward the next promotion, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicProgress {
    /// Consecutive correct answers so far.
    pub current: u32,
    /// Threshold in effect (2 under aggressive progression, else 3).
    pub total: u32,
    /// `round(100 * current / total)`, capped at 100.
    pub percent: u8,
}

/// Overall position within the curriculum, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurriculumProgress {
    pub completed_topics: usize,
    pub total_topics: usize,
    pub percent: u8,
}

//
// ─── SEQUENCER ─────────────────────────────────────────────────────────────────
//

/// Translates a run's topic pointer into user-facing topic and progress
/// views over the immutable curriculum catalog.
///
/// Progress percentages come from the progression engine's own threshold
/// logic so the display can never contradict the promotion rule.
#[derive(Debug, Clone)]
pub struct TopicSequencer {
    curriculum: Arc<Curriculum>,
    engine: ProgressionEngine,
}

impl TopicSequencer {
    #[must_use]
    pub fn new(curriculum: Arc<Curriculum>) -> Self {
        Self {
            curriculum,
            engine: ProgressionEngine::new(),
        }
    }

    /// Uses a non-default engine, keeping threshold projections in sync
    /// with whatever the orchestrator advances runs with.
    #[must_use]
    pub fn with_engine(mut self, engine: ProgressionEngine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    /// The topic currently being served.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::OutOfRange` when the pointer is at or past
    /// the terminal index — a completed run has no current topic.
    pub fn current_topic(&self, run: &Run) -> Result<&Topic, SequencerError> {
        self.curriculum
            .topic_at(run.topic_pointer())
            .ok_or(SequencerError::OutOfRange {
                pointer: run.topic_pointer(),
                len: self.curriculum.len(),
            })
    }

    /// The topic the run will promote into, or `None` on the last topic or
    /// once completed.
    #[must_use]
    pub fn next_topic(&self, run: &Run) -> Option<&Topic> {
        if run.is_completed() {
            return None;
        }
        self.curriculum.topic_at(run.topic_pointer() + 1)
    }

    /// Streak progress toward the promotion threshold in effect.
    #[must_use]
    pub fn topic_progress(&self, run: &Run) -> TopicProgress {
        let total = self.engine.threshold_for(run);
        let current = run.streak();
        TopicProgress {
            current,
            total,
            percent: percent_of(u64::from(current), u64::from(total)),
        }
    }

    /// Topics completed out of the whole curriculum.
    #[must_use]
    pub fn curriculum_progress(&self, run: &Run) -> CurriculumProgress {
        let total_topics = self.curriculum.len();
        let completed_topics = run.topic_pointer().min(total_topics);
        CurriculumProgress {
            completed_topics,
            total_topics,
            percent: percent_of(completed_topics as u64, total_topics as u64),
        }
    }
}

/// Rounded percentage, capped at 100. An empty denominator counts as fully
/// complete (nothing left to do).
fn percent_of(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let rounded = (current * 100 + total / 2) / total;
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttemptOutcome, ModuleId, RunStatus, RunToggle, SaveId, SubtopicId, TopicId};
    use crate::time::fixed_now;

    fn build_curriculum(len: usize) -> Arc<Curriculum> {
        let topics = (0..len)
            .map(|position| {
                Topic::new(
                    TopicId::new(position as u64 + 1),
                    format!("Topic {}", position + 1),
                    ModuleId::new(1),
                    SubtopicId::new(1),
                    position,
                )
                .unwrap()
            })
            .collect();
        Arc::new(Curriculum::new(topics).unwrap())
    }

    fn build_run() -> Run {
        Run::new(SaveId::new("slot-1").unwrap(), fixed_now())
    }

    #[test]
    fn current_and_next_follow_the_pointer() {
        let sequencer = TopicSequencer::new(build_curriculum(3));
        let run = build_run();

        assert_eq!(sequencer.current_topic(&run).unwrap().id(), TopicId::new(1));
        assert_eq!(sequencer.next_topic(&run).unwrap().id(), TopicId::new(2));
    }

    #[test]
    fn last_topic_has_no_next() {
        let sequencer = TopicSequencer::new(build_curriculum(3));
        let run = Run::from_persisted(
            SaveId::new("slot-1").unwrap(),
            2,
            0,
            0,
            false,
            false,
            fixed_now(),
            RunStatus::Active,
        );

        assert_eq!(sequencer.current_topic(&run).unwrap().id(), TopicId::new(3));
        assert!(sequencer.next_topic(&run).is_none());
    }

    #[test]
    fn completed_run_has_no_current_or_next_topic() {
        let sequencer = TopicSequencer::new(build_curriculum(2));
        let run = Run::from_persisted(
            SaveId::new("slot-1").unwrap(),
            2,
            0,
            9,
            false,
            false,
            fixed_now(),
            RunStatus::Completed,
        );

        let err = sequencer.current_topic(&run).unwrap_err();
        assert!(matches!(err, SequencerError::OutOfRange { pointer: 2, len: 2 }));
        assert!(sequencer.next_topic(&run).is_none());
    }

    #[test]
    fn topic_progress_tracks_default_threshold() {
        let sequencer = TopicSequencer::new(build_curriculum(3));
        let engine = ProgressionEngine::new();
        let run = engine
            .advance(&build_run(), AttemptOutcome::Correct, 3, fixed_now())
            .run;

        let progress = sequencer.topic_progress(&run);
        assert_eq!(progress.current, 1);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.percent, 33);
    }

    #[test]
    fn topic_progress_matches_aggressive_threshold() {
        let sequencer = TopicSequencer::new(build_curriculum(3));
        let engine = ProgressionEngine::new();
        let run = engine.set_toggle(
            &build_run(),
            RunToggle::AggressiveProgression,
            true,
            fixed_now(),
        );
        let run = engine
            .advance(&run, AttemptOutcome::Correct, 3, fixed_now())
            .run;

        let progress = sequencer.topic_progress(&run);
        assert_eq!(progress.current, 1);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.percent, 50);
    }

    #[test]
    fn topic_progress_percent_caps_at_hundred() {
        let sequencer = TopicSequencer::new(build_curriculum(2));
        // Free practice on a completed run keeps extending the streak.
        let run = Run::from_persisted(
            SaveId::new("slot-1").unwrap(),
            2,
            7,
            30,
            false,
            false,
            fixed_now(),
            RunStatus::Completed,
        );

        assert_eq!(sequencer.topic_progress(&run).percent, 100);
    }

    #[test]
    fn curriculum_progress_counts_completed_topics() {
        let sequencer = TopicSequencer::new(build_curriculum(4));
        let run = Run::from_persisted(
            SaveId::new("slot-1").unwrap(),
            3,
            0,
            12,
            false,
            false,
            fixed_now(),
            RunStatus::Active,
        );

        let progress = sequencer.curriculum_progress(&run);
        assert_eq!(progress.completed_topics, 3);
        assert_eq!(progress.total_topics, 4);
        assert_eq!(progress.percent, 75);
    }

    #[test]
    fn empty_curriculum_reports_full_progress() {
        let sequencer = TopicSequencer::new(build_curriculum(0));
        let run = build_run();

        let progress = sequencer.curriculum_progress(&run);
        assert_eq!(progress.completed_topics, 0);
        assert_eq!(progress.total_topics, 0);
        assert_eq!(progress.percent, 100);
    }
}
