use chrono::Duration;
use practice_core::model::{AttemptLog, AttemptOutcome, Run, RunStatus, SaveId};
use practice_core::time::fixed_now;
use storage::repository::{
    AttemptLogRecord, AttemptLogRepository, AttemptPersistence, RunRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn save_id(name: &str) -> SaveId {
    SaveId::new(name).unwrap()
}

#[tokio::test]
async fn sqlite_round_trips_a_run() {
    let repo = connect("memdb_roundtrip").await;

    let before_save = fixed_now();
    let run = Run::from_persisted(
        save_id("slot-1"),
        3,
        2,
        11,
        true,
        true,
        before_save + Duration::minutes(1),
        RunStatus::Active,
    );
    repo.upsert_run(&run).await.unwrap();

    let loaded = repo.load_run(run.save_id()).await.unwrap();
    assert_eq!(loaded.topic_pointer(), 3);
    assert_eq!(loaded.streak(), 2);
    assert_eq!(loaded.completed_questions(), 11);
    assert!(loaded.aggressive_progression());
    assert!(loaded.remediation_mode());
    assert_eq!(loaded.status(), RunStatus::Active);
    assert!(loaded.last_updated_at() >= before_save);
}

#[tokio::test]
async fn sqlite_load_of_unknown_slot_is_not_found() {
    let repo = connect("memdb_unknown").await;

    let err = repo.load_run(&save_id("never-created")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_upsert_overwrites_last_write_wins() {
    let repo = connect("memdb_overwrite").await;
    let id = save_id("slot-1");

    let first = Run::new(id.clone(), fixed_now());
    repo.upsert_run(&first).await.unwrap();

    let second = Run::from_persisted(
        id.clone(),
        5,
        1,
        20,
        false,
        false,
        fixed_now() + Duration::minutes(2),
        RunStatus::Active,
    );
    repo.upsert_run(&second).await.unwrap();

    let loaded = repo.load_run(&id).await.unwrap();
    assert_eq!(loaded.topic_pointer(), 5);
    assert_eq!(loaded.completed_questions(), 20);
}

#[tokio::test]
async fn sqlite_lists_runs_most_recent_first() {
    let repo = connect("memdb_listing").await;

    let older = Run::new(save_id("older"), fixed_now());
    let newer = Run::new(save_id("newer"), fixed_now()).stamped(fixed_now() + Duration::hours(1));
    repo.upsert_run(&older).await.unwrap();
    repo.upsert_run(&newer).await.unwrap();

    let summaries = repo.list_runs().await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].save_id.as_str(), "newer");
    assert_eq!(summaries[1].save_id.as_str(), "older");
}

#[tokio::test]
async fn sqlite_delete_is_idempotent() {
    let repo = connect("memdb_delete").await;
    let id = save_id("slot-1");

    repo.upsert_run(&Run::new(id.clone(), fixed_now())).await.unwrap();
    repo.delete_run(&id).await.unwrap();
    repo.delete_run(&id).await.unwrap();

    assert!(matches!(
        repo.load_run(&id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_corrupt_record_reads_as_not_found_and_is_discarded() {
    let repo = connect("memdb_corrupt").await;
    let id = save_id("slot-1");

    // Bypass the typed API to plant a record with an unknown status.
    sqlx::query(
        r"
            INSERT INTO runs (
                save_id, topic_pointer, streak, completed_questions,
                aggressive_progression, remediation_mode, status, last_updated_at
            )
            VALUES (?1, 0, 0, 0, 0, 0, 'paused', ?2)
        ",
    )
    .bind(id.as_str())
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo.load_run(&id).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    // The bytes are gone: a raw count shows the row was deleted, not kept.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs WHERE save_id = ?1")
        .bind(id.as_str())
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn sqlite_listing_skips_corrupt_rows() {
    let repo = connect("memdb_list_corrupt").await;

    repo.upsert_run(&Run::new(save_id("good"), fixed_now()))
        .await
        .unwrap();
    sqlx::query(
        r"
            INSERT INTO runs (
                save_id, topic_pointer, streak, completed_questions,
                aggressive_progression, remediation_mode, status, last_updated_at
            )
            VALUES ('bad', 0, 0, 0, 0, 0, 'paused', ?1)
        ",
    )
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let summaries = repo.list_runs().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].save_id.as_str(), "good");
}

#[tokio::test]
async fn sqlite_apply_attempt_persists_run_and_history() {
    let repo = connect("memdb_apply").await;
    let id = save_id("slot-1");

    let run = Run::from_persisted(
        id.clone(),
        1,
        0,
        3,
        false,
        false,
        fixed_now(),
        RunStatus::Active,
    );
    let log = AttemptLog::new(id.clone(), 0, AttemptOutcome::Correct, fixed_now());
    let record = AttemptLogRecord::from_log(&log, true);

    let log_id = repo.apply_attempt(&run, &record).await.unwrap();

    let loaded = repo.load_run(&id).await.unwrap();
    assert_eq!(loaded.topic_pointer(), 1);
    assert_eq!(loaded.completed_questions(), 3);

    let history = repo.attempts_for_save(&id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, Some(log_id));
    assert_eq!(history[0].outcome, AttemptOutcome::Correct);
    assert!(history[0].promoted);
}

#[tokio::test]
async fn sqlite_attempt_history_is_newest_first_and_limited() {
    let repo = connect("memdb_history").await;
    let id = save_id("slot-1");

    let run = Run::new(id.clone(), fixed_now());
    repo.upsert_run(&run).await.unwrap();

    for i in 0..3_i64 {
        let log = AttemptLog::new(
            id.clone(),
            usize::try_from(i).unwrap(),
            AttemptOutcome::Incorrect,
            fixed_now() + Duration::minutes(i),
        );
        repo.append_attempt(&AttemptLogRecord::from_log(&log, false))
            .await
            .unwrap();
    }

    let history = repo.attempts_for_save(&id, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].topic_pointer, 2);
    assert_eq!(history[1].topic_pointer, 1);
}

#[tokio::test]
async fn sqlite_deleting_a_run_cascades_to_history() {
    let repo = connect("memdb_cascade").await;
    let id = save_id("slot-1");

    let run = Run::new(id.clone(), fixed_now());
    let log = AttemptLog::new(id.clone(), 0, AttemptOutcome::Correct, fixed_now());
    repo.apply_attempt(&run, &AttemptLogRecord::from_log(&log, false))
        .await
        .unwrap();

    repo.delete_run(&id).await.unwrap();

    let history = repo.attempts_for_save(&id, 10).await.unwrap();
    assert!(history.is_empty());
}
