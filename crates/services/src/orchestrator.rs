use std::sync::Arc;

use tracing::debug;

use practice_core::Clock;
use practice_core::banding::{Difficulty, DifficultyPolicy, ThirdsBanding};
use practice_core::curriculum::Curriculum;
use practice_core::model::{AttemptOutcome, Run, RunToggle, SaveId, Topic};
use practice_core::progression::ProgressionEngine;
use practice_core::sequencer::{CurriculumProgress, TopicProgress, TopicSequencer};
use storage::repository::{
    AttemptLogRecord, AttemptPersistence, RunSummary, Storage, StorageError,
};

use crate::error::{OrchestratorError, RunStoreError, ServicesInitError};
use crate::generator::{QuestionContent, QuestionGenerator};
use crate::run_store::RunStore;

/// What to ask the content generator for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub topic: Topic,
    pub difficulty: Difficulty,
}

/// Façade for the Auto Mode practice loop.
///
/// Composes the run store, progression engine, topic sequencer, and the
/// external question generator; it is the only component that performs
/// I/O. One cycle flows one direction: load the run, resolve a topic,
/// fetch content, record the outcome, persist.
///
/// Writes are last-write-wins per slot and nothing here locks: callers
/// must not interleave `record_outcome` calls for the same slot, and each
/// call must receive the run most recently returned for that slot. Hosting
/// two surfaces on one slot loses updates by design (documented
/// limitation, not a hidden bug).
pub struct AutoModeOrchestrator {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    engine: ProgressionEngine,
    sequencer: TopicSequencer,
    policy: Arc<dyn DifficultyPolicy>,
    generator: Arc<dyn QuestionGenerator>,
    store: RunStore,
    attempts: Arc<dyn AttemptPersistence>,
}

impl AutoModeOrchestrator {
    #[must_use]
    pub fn new(
        clock: Clock,
        curriculum: Arc<Curriculum>,
        storage: &Storage,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let engine = ProgressionEngine::new();
        Self {
            clock,
            sequencer: TopicSequencer::new(Arc::clone(&curriculum)).with_engine(engine),
            curriculum,
            engine,
            policy: Arc::new(ThirdsBanding),
            generator,
            store: RunStore::new(clock, Arc::clone(&storage.runs)),
            attempts: Arc::clone(&storage.attempts),
        }
    }

    /// Build an orchestrator backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ServicesInitError` if the connection or migrations fail.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        curriculum: Arc<Curriculum>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Result<Self, ServicesInitError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(clock, curriculum, &storage, generator))
    }

    /// Uses a non-default progression engine, keeping the sequencer's
    /// threshold projections in sync.
    #[must_use]
    pub fn with_engine(mut self, engine: ProgressionEngine) -> Self {
        self.engine = engine;
        self.sequencer = self.sequencer.with_engine(engine);
        self
    }

    /// Swaps the difficulty banding policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn DifficultyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn sequencer(&self) -> &TopicSequencer {
        &self.sequencer
    }

    /// Load the slot's run, creating and persisting a fresh one if the slot
    /// is absent (or held a discarded corrupt record). Resumed runs are
    /// reconciled against the current curriculum before use.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` on storage faults other than the
    /// recovered not-found path.
    pub async fn start_or_resume(&self, save_id: SaveId) -> Result<Run, OrchestratorError> {
        match self.store.load(&save_id).await {
            Ok(run) => {
                let reconciled = self.engine.reconcile(&run, self.curriculum.len(), self.clock.now());
                if reconciled == run {
                    return Ok(run);
                }
                debug!(save_id = %save_id, "run reconciled against a changed curriculum");
                Ok(self.store.save(&reconciled).await?)
            }
            Err(RunStoreError::Storage(StorageError::NotFound)) => {
                let fresh = Run::new(save_id, self.clock.now());
                let fresh = self
                    .engine
                    .reconcile(&fresh, self.curriculum.len(), self.clock.now());
                Ok(self.store.save(&fresh).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve the topic and difficulty to request content for.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::OutOfRange` (wrapped) when the run has no
    /// current topic; for an active run that means a broken invariant
    /// upstream and the call is fatal rather than retryable.
    pub fn next_question_request(&self, run: &Run) -> Result<QuestionRequest, OrchestratorError> {
        let topic = self.sequencer.current_topic(run)?.clone();
        let difficulty = self
            .policy
            .difficulty_for(run.topic_pointer(), self.curriculum.len());
        Ok(QuestionRequest { topic, difficulty })
    }

    /// Resolve the next request and fetch its content from the generator.
    /// The generator is best effort and never fails; any error is on the
    /// sequencing side.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_question_request`].
    pub async fn next_question(&self, run: &Run) -> Result<QuestionContent, OrchestratorError> {
        let request = self.next_question_request(run)?;
        Ok(self
            .generator
            .generate(&request.topic, request.difficulty)
            .await)
    }

    /// Record an attempt outcome: advance the run, persist it together with
    /// the attempt-history entry, and return the updated run.
    ///
    /// This is the sole mutation entry point; callers never change a run
    /// directly and must pass the run most recently returned for the slot.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if the transactional write fails; the
    /// previous persisted state is untouched in that case.
    pub async fn record_outcome(
        &self,
        run: &Run,
        outcome: AttemptOutcome,
    ) -> Result<Run, OrchestratorError> {
        let now = self.clock.now();
        let applied = self.engine.advance(run, outcome, self.curriculum.len(), now);
        if applied.promoted {
            debug!(
                save_id = %applied.run.save_id(),
                topic_pointer = applied.run.topic_pointer(),
                "promoted to next topic"
            );
        }

        let record = AttemptLogRecord::from_log(&applied.log, applied.promoted);
        let stamped = applied.run.stamped(now);
        self.attempts.apply_attempt(&stamped, &record).await?;
        Ok(stamped)
    }

    /// Enable or disable aggressive progression (promotion after 2 correct
    /// answers instead of 3) and persist the change.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if the write fails.
    pub async fn set_aggressive_progression(
        &self,
        run: &Run,
        enabled: bool,
    ) -> Result<Run, OrchestratorError> {
        self.apply_toggle(run, RunToggle::AggressiveProgression, enabled)
            .await
    }

    /// Enable or disable remediation mode and persist the change.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if the write fails.
    pub async fn set_remediation_mode(
        &self,
        run: &Run,
        enabled: bool,
    ) -> Result<Run, OrchestratorError> {
        self.apply_toggle(run, RunToggle::RemediationMode, enabled)
            .await
    }

    async fn apply_toggle(
        &self,
        run: &Run,
        toggle: RunToggle,
        enabled: bool,
    ) -> Result<Run, OrchestratorError> {
        let updated = self.engine.set_toggle(run, toggle, enabled, self.clock.now());
        Ok(self.store.save(&updated).await?)
    }

    /// Streak progress toward the next promotion, for display.
    #[must_use]
    pub fn topic_progress(&self, run: &Run) -> TopicProgress {
        self.sequencer.topic_progress(run)
    }

    /// Overall curriculum position, for display.
    #[must_use]
    pub fn curriculum_progress(&self, run: &Run) -> CurriculumProgress {
        self.sequencer.curriculum_progress(run)
    }

    /// Save-slot summaries, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` on storage faults.
    pub async fn saves(&self) -> Result<Vec<RunSummary>, OrchestratorError> {
        Ok(self.store.list().await?)
    }

    /// Delete a save slot. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` on storage faults.
    pub async fn delete_save(&self, save_id: &SaveId) -> Result<(), OrchestratorError> {
        Ok(self.store.delete(save_id).await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{ModuleId, RunStatus, SubtopicId, TopicId};
    use practice_core::sequencer::SequencerError;
    use practice_core::time::{fixed_clock, fixed_now};
    use crate::generator::TemplateGenerator;

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

    fn build_orchestrator(len: usize) -> AutoModeOrchestrator {
        AutoModeOrchestrator::new(
            fixed_clock(),
            build_curriculum(len),
            &Storage::in_memory(),
            Arc::new(TemplateGenerator),
        )
    }

    fn save_id(name: &str) -> SaveId {
        SaveId::new(name).unwrap()
    }

    #[tokio::test]
    async fn start_or_resume_creates_and_persists_fresh_runs() {
        let orchestrator = build_orchestrator(3);

        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        assert_eq!(run.topic_pointer(), 0);
        assert_eq!(run.streak(), 0);
        assert_eq!(run.completed_questions(), 0);
        assert_eq!(run.status(), RunStatus::Active);

        // The fresh run is durable: resuming returns the same state.
        let resumed = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        assert_eq!(resumed, run);
    }

    #[tokio::test]
    async fn next_question_request_serves_the_current_topic() {
        let orchestrator = build_orchestrator(9);
        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();

        let request = orchestrator.next_question_request(&run).unwrap();
        assert_eq!(request.topic.id(), TopicId::new(1));
        assert_eq!(request.difficulty, Difficulty::Beginner);
    }

    #[tokio::test]
    async fn next_question_request_fails_for_completed_runs() {
        let orchestrator = build_orchestrator(1);
        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();

        let mut run = run;
        for _ in 0..3 {
            run = orchestrator
                .record_outcome(&run, AttemptOutcome::Correct)
                .await
                .unwrap();
        }
        assert_eq!(run.status(), RunStatus::Completed);

        let err = orchestrator.next_question_request(&run).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Sequencer(SequencerError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn record_outcome_persists_the_advanced_run() {
        let orchestrator = build_orchestrator(3);
        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();

        let updated = orchestrator
            .record_outcome(&run, AttemptOutcome::Correct)
            .await
            .unwrap();
        assert_eq!(updated.streak(), 1);
        assert_eq!(updated.completed_questions(), 1);

        let resumed = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        assert_eq!(resumed, updated);
    }

    #[tokio::test]
    async fn toggles_persist_and_change_the_threshold() {
        let orchestrator = build_orchestrator(3);
        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();

        let run = orchestrator
            .set_aggressive_progression(&run, true)
            .await
            .unwrap();
        assert!(run.aggressive_progression());
        assert_eq!(orchestrator.topic_progress(&run).total, 2);

        let run = orchestrator.set_remediation_mode(&run, true).await.unwrap();
        assert!(run.remediation_mode());

        let resumed = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        assert!(resumed.aggressive_progression());
        assert!(resumed.remediation_mode());
    }

    #[tokio::test]
    async fn resume_reconciles_runs_against_a_shrunk_curriculum() {
        let storage = Storage::in_memory();
        let wide = AutoModeOrchestrator::new(
            fixed_clock(),
            build_curriculum(9),
            &storage,
            Arc::new(TemplateGenerator),
        );

        let mut run = wide.start_or_resume(save_id("slot-1")).await.unwrap();
        for _ in 0..9 {
            run = wide
                .record_outcome(&run, AttemptOutcome::Correct)
                .await
                .unwrap();
        }
        assert_eq!(run.topic_pointer(), 3);

        // A later app version ships a two-topic curriculum.
        let narrow = AutoModeOrchestrator::new(
            fixed_clock(),
            build_curriculum(2),
            &storage,
            Arc::new(TemplateGenerator),
        );
        let reconciled = narrow.start_or_resume(save_id("slot-1")).await.unwrap();
        assert_eq!(reconciled.topic_pointer(), 2);
        assert_eq!(reconciled.status(), RunStatus::Completed);
    }

    #[tokio::test]
    async fn empty_curriculum_yields_a_completed_run() {
        let orchestrator = build_orchestrator(0);

        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        assert_eq!(run.status(), RunStatus::Completed);
        assert!(orchestrator.next_question_request(&run).is_err());
    }

    #[tokio::test]
    async fn custom_engine_and_policy_are_honored() {
        struct FlatBanding;
        impl DifficultyPolicy for FlatBanding {
            fn difficulty_for(&self, _topic_pointer: usize, _curriculum_len: usize) -> Difficulty {
                Difficulty::Advanced
            }
        }

        let engine = ProgressionEngine::try_with_thresholds(1, 1).unwrap();
        let orchestrator = build_orchestrator(3)
            .with_engine(engine)
            .with_policy(Arc::new(FlatBanding));
        assert_eq!(orchestrator.curriculum().len(), 3);

        let run = orchestrator.start_or_resume(save_id("slot-1")).await.unwrap();
        let request = orchestrator.next_question_request(&run).unwrap();
        assert_eq!(request.difficulty, Difficulty::Advanced);

        // Threshold 1: every correct answer promotes.
        let run = orchestrator
            .record_outcome(&run, AttemptOutcome::Correct)
            .await
            .unwrap();
        assert_eq!(run.topic_pointer(), 1);
        assert_eq!(orchestrator.sequencer().topic_progress(&run).total, 1);
    }

    #[tokio::test]
    async fn saves_and_delete_manage_slots() {
        let orchestrator = build_orchestrator(3);
        orchestrator.start_or_resume(save_id("slot-a")).await.unwrap();
        orchestrator.start_or_resume(save_id("slot-b")).await.unwrap();

        let saves = orchestrator.saves().await.unwrap();
        assert_eq!(saves.len(), 2);

        orchestrator.delete_save(&save_id("slot-a")).await.unwrap();
        orchestrator.delete_save(&save_id("slot-a")).await.unwrap();

        let saves = orchestrator.saves().await.unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].save_id.as_str(), "slot-b");
    }
}
