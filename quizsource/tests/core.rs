//! Integration tests for the event log and repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::executor::block_on;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use quizsource::{
    Aggregate, Error, EventRecord, EventStore,
    participant::Participant,
    repository::{GenericRepository, Repository},
    store::in_memory::InMemoryEventStore,
};

fn timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn record(aggregate_id: &str, event_type: &str, version: u64, payload: serde_json::Value) -> EventRecord {
    EventRecord {
        aggregate_id: aggregate_id.to_string(),
        event_type: event_type.to_string(),
        version,
        payload,
        created_at: timestamp(),
    }
}

fn repository(store: &InMemoryEventStore) -> GenericRepository<Participant, InMemoryEventStore> {
    GenericRepository::new(Arc::new(store.clone()))
}

// -- Event store -------------------------------------------------------------

#[test]
fn in_memory_event_store_append_and_load() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();

    block_on(store.append(
        &id,
        vec![
            record(&id, "ParticipantCreated", 0, json!({})),
            record(&id, "StartedQuiz", 1, json!({"quizId": "Q1"})),
        ],
    ))
    .expect("append should succeed");

    let loaded = block_on(store.load(&id)).expect("load should succeed");
    assert_eq!(loaded.len(), 2, "two events in stream");
    assert_eq!(loaded[0].event_type, "ParticipantCreated");
    assert_eq!(loaded[1].version, 1);
}

#[test]
fn in_memory_event_store_not_found() {
    let store = InMemoryEventStore::new();
    let err = block_on(store.load("nobody")).expect_err("nothing stored");
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn in_memory_event_store_conflict() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();
    block_on(store.append(&id, vec![record(&id, "ParticipantCreated", 0, json!({}))]))
        .expect("initial append");

    // Re-using an occupied version yields a conflict.
    let err = block_on(store.append(&id, vec![record(&id, "StartedQuiz", 0, json!({"quizId": "Q1"}))]))
        .expect_err("should conflict");
    assert_eq!(err, Error::Conflict);

    // So does leaving a gap.
    let err = block_on(store.append(&id, vec![record(&id, "StartedQuiz", 2, json!({"quizId": "Q1"}))]))
        .expect_err("should conflict");
    assert_eq!(err, Error::Conflict);

    assert_eq!(block_on(store.load(&id)).expect("load").len(), 1);
}

#[test]
fn in_memory_event_store_rejects_batches_atomically() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();

    let err = block_on(store.append(
        &id,
        vec![
            record(&id, "ParticipantCreated", 0, json!({})),
            record(&id, "StartedQuiz", 5, json!({"quizId": "Q1"})),
        ],
    ))
    .expect_err("second record breaks the sequence");
    assert_eq!(err, Error::Conflict);
    assert!(matches!(block_on(store.load(&id)), Err(Error::NotFound(_))));
}

#[test]
fn event_record_json_shape() {
    let value = serde_json::to_value(record("p", "StartedQuiz", 3, json!({"quizId": "Q1"})))
        .expect("serialize");
    assert_eq!(
        value,
        json!({
            "aggregate_id": "p",
            "type": "StartedQuiz",
            "version": 3,
            "payload": {"quizId": "Q1"},
            "created_at": "2023-11-14T22:13:20Z",
        })
    );
}

// -- Repository --------------------------------------------------------------

#[test_log::test]
fn repository_save_and_load() {
    let store = InMemoryEventStore::new();
    let repo = repository(&store);
    let id = Uuid::new_v4().to_string();

    let mut participant = Participant::create(&id).expect("create");
    participant
        .start_quiz("Q1", vec!["A".into()])
        .expect("start quiz");
    block_on(repo.save(&mut participant)).expect("save events");
    assert_eq!(participant.persisted_version(), 2);

    let loaded: Participant = block_on(repo.load(&id)).expect("load");
    assert_eq!(loaded.id(), id);
    assert_eq!(loaded.current_version(), 2, "aggregate version after replay");
    assert_eq!(loaded.persisted_version(), 2);
    assert_eq!(loaded.started_quiz_count(), 1);
    assert_eq!(loaded.events(), participant.events());
}

#[test]
fn repository_save_without_pending_events_is_noop() {
    let store = InMemoryEventStore::new();
    let repo = repository(&store);
    let id = Uuid::new_v4().to_string();

    let mut participant = Participant::create(&id).expect("create");
    block_on(repo.save(&mut participant)).expect("first save");

    let mut loaded: Participant = block_on(repo.load(&id)).expect("load");
    block_on(repo.save(&mut loaded)).expect("nothing to save");
    assert_eq!(block_on(store.load(&id)).expect("load").len(), 1);
}

#[test]
fn repository_load_missing_aggregate() {
    let store = InMemoryEventStore::new();
    let repo = repository(&store);
    let result: quizsource::Result<Participant> = block_on(repo.load("missing"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test_log::test]
fn repository_rejects_unknown_event_type() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();
    block_on(store.append(
        &id,
        vec![
            record(&id, "ParticipantCreated", 0, json!({})),
            record(&id, "QuizRenamed", 1, json!({"quizId": "Q1"})),
        ],
    ))
    .expect("the store itself does not interpret records");

    let result: quizsource::Result<Participant> = block_on(repository(&store).load(&id));
    let err = result.expect_err("unknown discriminator must not be skipped");
    assert!(
        matches!(&err, Error::Corruption(msg) if msg.contains("QuizRenamed")),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.public_message(), "internal error");
}

#[test]
fn repository_rejects_malformed_payload() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();
    block_on(store.append(
        &id,
        vec![
            record(&id, "ParticipantCreated", 0, json!({})),
            record(&id, "StartedQuiz", 1, json!({"quiz": 7})),
        ],
    ))
    .expect("append");

    let result: quizsource::Result<Participant> = block_on(repository(&store).load(&id));
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[test]
fn repository_rejects_invalid_history() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();
    block_on(store.append(
        &id,
        vec![
            record(&id, "ParticipantCreated", 0, json!({})),
            record(&id, "FinishedQuiz", 1, json!({"quizId": "Q1"})),
        ],
    ))
    .expect("append");

    // A stored history that breaks a business rule replays into the same
    // rejection it would have produced when first applied.
    let result: quizsource::Result<Participant> = block_on(repository(&store).load(&id));
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn repository_rejects_history_without_creation() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();
    block_on(store.append(&id, vec![record(&id, "StartedQuiz", 0, json!({"quizId": "Q1"}))]))
        .expect("append");

    let result: quizsource::Result<Participant> = block_on(repository(&store).load(&id));
    let err = result.expect_err("history must open with a creation event");
    assert!(matches!(err, Error::Corruption(_)), "unexpected error: {err:?}");
    assert!(!err.is_retryable());
}

#[test_log::test]
fn concurrent_sessions_only_one_append_wins() {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4().to_string();

    let mut participant = Participant::create(&id).expect("create");
    block_on(repository(&store).save(&mut participant)).expect("initial save");

    // Two sessions load the participant at the same version.
    let session_a = repository(&store);
    let session_b = repository(&store);
    let mut a: Participant = block_on(session_a.load(&id)).expect("load a");
    let mut b: Participant = block_on(session_b.load(&id)).expect("load b");
    assert_eq!(a.current_version(), b.current_version());

    a.start_quiz("Q1", Vec::new()).expect("start in a");
    b.start_quiz("Q2", Vec::new()).expect("start in b");

    block_on(session_a.save(&mut a)).expect("first writer wins");
    let err = block_on(session_b.save(&mut b)).expect_err("second writer loses");
    assert_eq!(err, Error::Conflict);
    assert!(err.is_retryable());

    // The loser reloads and retries from scratch.
    let mut retried: Participant = block_on(session_b.load(&id)).expect("reload");
    retried.start_quiz("Q2", Vec::new()).expect("start again");
    block_on(session_b.save(&mut retried)).expect("retry succeeds");

    let reloaded: Participant = block_on(session_a.load(&id)).expect("load");
    assert_eq!(reloaded.started_quiz_count(), 2);
    assert_eq!(reloaded.current_version(), 3);
}
