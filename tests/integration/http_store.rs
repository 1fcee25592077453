//! Integration tests for the HTTP store against an in-process server.
//!
//! Starts `kanban-server` on an OS-assigned port and drives it through
//! [`HttpStore`], both directly and underneath a [`TaskBoard`].
//!
//! Verification command: `cargo test --test http_store`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use kanban::board::retry::RecordingSleeper;
use kanban::board::{LOAD_ERROR, TaskBoard, UPDATE_ERROR};
use kanban::store::http::HttpStore;
use kanban::store::{StoreError, TaskStore};
use kanban_proto::{NewTask, TaskId, TaskPatch, TaskPriority, TaskStatus};
use kanban_server::api::{self, AppState, FailureRates};
use kanban_server::store::TaskTable;

// =============================================================================
// Helpers
// =============================================================================

/// Starts a server holding the demo tasks and returns a store pointed at it.
async fn start(rates: FailureRates) -> (HttpStore, tokio::task::JoinHandle<()>) {
    let state = Arc::new(AppState::new(TaskTable::default(), rates));
    let (addr, handle) = api::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server");
    let store = HttpStore::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    (store, handle)
}

fn id(s: &str) -> TaskId {
    TaskId::new(s)
}

// =============================================================================
// Store contract
// =============================================================================

#[tokio::test]
async fn list_returns_seeded_tasks() {
    let (store, handle) = start(FailureRates::NONE).await;
    let tasks = store.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 5);
    assert_eq!(tasks[0].id, id("1"));
    handle.abort();
}

#[tokio::test]
async fn create_assigns_id_and_todo_status() {
    let (store, handle) = start(FailureRates::NONE).await;
    let task = store
        .create_task(NewTask::new("From HTTP", "body", TaskPriority::High))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.description, "body");
    assert!(!task.id.as_str().is_empty());

    let tasks = store.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 6);
    assert_eq!(tasks.last().unwrap(), &task);
    handle.abort();
}

#[tokio::test]
async fn update_returns_server_copy() {
    let (store, handle) = start(FailureRates::NONE).await;
    let before = store.list_tasks().await.unwrap()[1].clone();
    let task = store
        .update_task(&id("2"), TaskPatch::status(TaskStatus::Done))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.title, before.title);
    assert!(task.updated_at > before.updated_at);
    handle.abort();
}

#[tokio::test]
async fn unknown_id_maps_to_not_found() {
    let (store, handle) = start(FailureRates::NONE).await;
    let err = store
        .update_task(&id("missing"), TaskPatch::status(TaskStatus::Done))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref missing) if *missing == id("missing")));

    let err = store.delete_task(&id("missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    handle.abort();
}

#[tokio::test]
async fn delete_removes_task() {
    let (store, handle) = start(FailureRates::NONE).await;
    store.delete_task(&id("4")).await.unwrap();
    let tasks = store.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| t.id != id("4")));
    handle.abort();
}

#[tokio::test]
async fn invalid_patch_maps_to_http_400() {
    let (store, handle) = start(FailureRates::NONE).await;
    let patch = TaskPatch {
        title: Some("   ".to_string()),
        ..TaskPatch::default()
    };
    let err = store.update_task(&id("1"), patch).await.unwrap_err();
    assert!(matches!(err, StoreError::Http { status: 400, .. }));
    handle.abort();
}

#[tokio::test]
async fn injected_failure_carries_server_message() {
    let (store, handle) = start(FailureRates {
        read: 1.0,
        write: 0.0,
    })
    .await;
    let err = store.list_tasks().await.unwrap_err();
    match err {
        StoreError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, api::SIMULATED_ERROR);
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    handle.abort();
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let store = HttpStore::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = store.list_tasks().await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    assert!(err.is_transient());
}

// =============================================================================
// Board over HTTP
// =============================================================================

#[tokio::test]
async fn board_move_and_undo_round_trip() {
    let (store, handle) = start(FailureRates::NONE).await;
    let board = TaskBoard::new(Arc::new(store));
    assert!(board.load().await);

    assert!(board.move_task(&id("1"), TaskStatus::Done).await);
    let remote = board.store().list_tasks().await.unwrap();
    assert_eq!(remote[0].status, TaskStatus::Done);

    assert!(board.undo().await);
    let remote = board.store().list_tasks().await.unwrap();
    assert_eq!(remote[0].status, TaskStatus::Todo);
    assert_eq!(board.task(&id("1")).unwrap(), remote[0]);
    handle.abort();
}

#[tokio::test]
async fn board_rolls_back_on_server_failure() {
    let (store, handle) = start(FailureRates {
        read: 0.0,
        write: 1.0,
    })
    .await;
    let board = TaskBoard::new(Arc::new(store));
    assert!(board.load().await);
    let before = board.task(&id("3")).unwrap();

    assert!(!board.move_task(&id("3"), TaskStatus::Done).await);
    assert_eq!(board.task(&id("3")).unwrap(), before);
    assert_eq!(board.error().unwrap().message, UPDATE_ERROR);
    assert!(board.undo_action().is_none());

    assert!(!board.remove(&id("3")).await);
    assert_eq!(board.tasks().len(), 5);
    handle.abort();
}

#[tokio::test]
async fn board_load_gives_up_on_unreachable_server() {
    let store = HttpStore::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let sleeper = Arc::new(RecordingSleeper::new());
    let board = TaskBoard::new(Arc::new(store)).with_sleeper(Arc::clone(&sleeper));

    assert!(!board.load().await);
    assert_eq!(board.error().unwrap().message, LOAD_ERROR);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}
