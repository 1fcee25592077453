//! Integration tests for the optimistic task board over the mock store.
//!
//! Covers load retry, rollback on failed writes, the undo window and
//! overlapping intents, with tokio's paused clock standing in for real time.
//!
//! Verification command: `cargo test --test optimistic_board`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kanban::board::retry::RecordingSleeper;
use kanban::board::{BoardErrorKind, LOAD_ERROR, TaskBoard};
use kanban::store::memory::{FaultPolicy, MemoryStore};
use kanban::store::{OpClass, StoreOp};
use kanban_proto::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

// =============================================================================
// Helpers
// =============================================================================

fn id(s: &str) -> TaskId {
    TaskId::new(s)
}

/// Seeded board whose store starts out reliable, already loaded.
async fn loaded_board() -> TaskBoard<MemoryStore> {
    let board = TaskBoard::new(Arc::new(MemoryStore::seeded(FaultPolicy::reliable())));
    assert!(board.load().await);
    board
}

/// Board with a single todo task `"1"` over a store using `policy` for writes.
async fn single_task_board(policy: FaultPolicy) -> TaskBoard<MemoryStore> {
    let task = Task::from_new(
        id("1"),
        NewTask::new("Only task", "", TaskPriority::Medium),
        Utc::now(),
    );
    let store = MemoryStore::with_tasks(vec![task], FaultPolicy::reliable());
    let board = TaskBoard::new(Arc::new(store));
    assert!(board.load().await);
    board.store().set_policy(policy);
    board
}

fn status_of(board: &TaskBoard<MemoryStore>, task: &str) -> TaskStatus {
    board.task(&id(task)).unwrap().status
}

// =============================================================================
// Load and retry
// =============================================================================

#[tokio::test]
async fn load_recovers_on_third_attempt() {
    let sleeper = Arc::new(RecordingSleeper::new());
    let board = TaskBoard::new(Arc::new(MemoryStore::seeded(FaultPolicy::reliable())))
        .with_sleeper(Arc::clone(&sleeper));
    board.store().fail_next(OpClass::Read, 2);

    assert!(board.load().await);
    assert_eq!(board.tasks().len(), 5);
    assert!(board.error().is_none());
    assert!(!board.is_loading());
    assert_eq!(board.store().stats().calls(StoreOp::List), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn load_gives_up_after_three_attempts() {
    let sleeper = Arc::new(RecordingSleeper::new());
    let board = TaskBoard::new(Arc::new(MemoryStore::seeded(FaultPolicy::reliable())))
        .with_sleeper(Arc::clone(&sleeper));
    board.store().fail_next(OpClass::Read, 3);

    assert!(!board.load().await);
    assert!(board.tasks().is_empty());
    let error = board.error().unwrap();
    assert!(error.is_persistent());
    assert_eq!(error.message, LOAD_ERROR);
    assert_eq!(board.store().stats().calls(StoreOp::List), 3);
    assert_eq!(sleeper.delays().len(), 2);
}

#[tokio::test]
async fn failed_reload_keeps_cached_list() {
    let board = loaded_board().await;
    let before = board.tasks();
    let board = board.with_sleeper(RecordingSleeper::new());
    board.store().fail_next(OpClass::Read, 3);

    assert!(!board.load().await);
    assert_eq!(board.tasks(), before);
    assert_eq!(board.error().unwrap().kind, BoardErrorKind::Load);
}

#[tokio::test(start_paused = true)]
async fn loading_flag_is_set_while_fetching() {
    let policy = FaultPolicy {
        read_failure_rate: 0.0,
        write_failure_rate: 0.0,
        ..FaultPolicy::default()
    };
    let board = TaskBoard::new(Arc::new(MemoryStore::seeded(policy)));

    let (loaded, was_loading) = tokio::join!(board.load(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        board.is_loading()
    });
    assert!(loaded);
    assert!(was_loading);
    assert!(!board.is_loading());
}

#[tokio::test(start_paused = true)]
async fn loading_flag_holds_until_last_overlapping_load_ends() {
    let policy = FaultPolicy {
        read_failure_rate: 0.0,
        write_failure_rate: 0.0,
        list_latency: Duration::from_millis(200),
        ..FaultPolicy::default()
    };
    let board = TaskBoard::new(Arc::new(MemoryStore::seeded(policy)));

    // First load ends at 200 ms, second at 300 ms.
    let (first, second, still_loading) = tokio::join!(
        board.load(),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            board.load().await
        },
        async {
            tokio::time::sleep(Duration::from_millis(220)).await;
            board.is_loading()
        },
    );
    assert!(first && second);
    assert!(still_loading);
    assert!(!board.is_loading());
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn created_ids_are_unique() {
    let board = loaded_board().await;
    let mut seen: HashSet<TaskId> = board.tasks().into_iter().map(|t| t.id).collect();

    for i in 0..25 {
        let title = format!("Task {i}");
        assert!(
            board
                .create(NewTask::new(title, "", TaskPriority::Low))
                .await
        );
        let created = board.tasks().last().unwrap().id.clone();
        assert!(seen.insert(created), "duplicate id on create {i}");
    }
    assert_eq!(board.tasks().len(), 30);
}

// =============================================================================
// Rollback
// =============================================================================

#[tokio::test]
async fn failed_move_rolls_back_without_undo() {
    let board = single_task_board(FaultPolicy::failing_writes()).await;

    assert!(!board.move_task(&id("1"), TaskStatus::Done).await);
    assert_eq!(status_of(&board, "1"), TaskStatus::Todo);
    assert_eq!(board.error().unwrap().kind, BoardErrorKind::Update);
    assert!(board.undo_action().is_none());
}

#[tokio::test]
async fn failed_update_restores_pre_call_status() {
    let board = loaded_board().await;
    let moves = [
        ("1", TaskStatus::InProgress),
        ("3", TaskStatus::Done),
        ("5", TaskStatus::Todo),
    ];
    for (task, target) in moves {
        let before = board.task(&id(task)).unwrap();
        board.store().fail_next(OpClass::Write, 1);
        assert!(!board.move_task(&id(task), target).await);
        assert_eq!(board.task(&id(task)).unwrap(), before);
    }
    assert!(board.undo_action().is_none());
}

// =============================================================================
// Undo
// =============================================================================

#[tokio::test]
async fn move_then_undo_issues_two_updates() {
    let board = single_task_board(FaultPolicy::reliable()).await;

    assert!(board.move_task(&id("1"), TaskStatus::InProgress).await);
    assert!(board.undo().await);

    assert_eq!(status_of(&board, "1"), TaskStatus::Todo);
    assert!(board.undo_action().is_none());
    assert_eq!(board.store().stats().calls(StoreOp::Update), 2);
    let stored = board.store().snapshot().await;
    assert_eq!(stored[0].status, TaskStatus::Todo);
}

#[tokio::test(start_paused = true)]
async fn undo_within_window_restores_status() {
    let board = loaded_board().await;
    assert!(board.move_task(&id("3"), TaskStatus::Done).await);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(board.undo().await);
    assert_eq!(status_of(&board, "3"), TaskStatus::InProgress);
    assert!(board.undo_action().is_none());
}

#[tokio::test(start_paused = true)]
async fn undo_expires_after_window() {
    let board = loaded_board().await;
    assert!(board.move_task(&id("3"), TaskStatus::Done).await);

    tokio::time::sleep(Duration::from_secs(5) + Duration::from_millis(1)).await;
    assert!(board.undo_action().is_none());
    assert!(!board.undo().await);
    assert_eq!(status_of(&board, "3"), TaskStatus::Done);
    assert_eq!(board.store().stats().calls(StoreOp::Update), 1);
}

#[tokio::test(start_paused = true)]
async fn second_move_discards_first_undo() {
    let board = loaded_board().await;
    assert!(board.move_task(&id("1"), TaskStatus::Done).await);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(board.move_task(&id("2"), TaskStatus::InProgress).await);

    assert_eq!(board.undo_action().unwrap().task_id, id("2"));
    assert!(board.undo().await);
    assert_eq!(status_of(&board, "2"), TaskStatus::Todo);
    assert_eq!(status_of(&board, "1"), TaskStatus::Done);
    assert!(!board.undo().await);
}

#[tokio::test(start_paused = true)]
async fn second_move_gets_a_full_window() {
    let board = loaded_board().await;
    assert!(board.move_task(&id("1"), TaskStatus::Done).await);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(board.move_task(&id("2"), TaskStatus::Done).await);

    // Past the first move's deadline, inside the second's.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(board.undo_action().unwrap().task_id, id("2"));
}

// =============================================================================
// Overlapping intents
// =============================================================================

#[tokio::test(start_paused = true)]
async fn overlapping_moves_on_different_tasks() {
    let policy = FaultPolicy {
        read_failure_rate: 0.0,
        write_failure_rate: 0.0,
        ..FaultPolicy::default()
    };
    let board = loaded_board().await;
    board.store().set_policy(policy);

    let (first, last) = (id("1"), id("5"));
    let (a, b) = tokio::join!(
        board.move_task(&first, TaskStatus::InProgress),
        board.move_task(&last, TaskStatus::Todo),
    );
    assert!(a && b);
    assert_eq!(status_of(&board, "1"), TaskStatus::InProgress);
    assert_eq!(status_of(&board, "5"), TaskStatus::Todo);

    // Only the later commit stays undoable.
    let armed = board.undo_action().unwrap().task_id;
    assert!(armed == id("1") || armed == id("5"));
}

#[tokio::test(start_paused = true)]
async fn overlapping_failure_rolls_back_only_its_task() {
    let policy = FaultPolicy {
        read_failure_rate: 0.0,
        write_failure_rate: 0.0,
        ..FaultPolicy::default()
    };
    let board = loaded_board().await;
    board.store().set_policy(policy);
    board.store().fail_next(OpClass::Write, 1);

    let (first, second) = (id("1"), id("2"));
    let (a, b) = tokio::join!(
        board.move_task(&first, TaskStatus::Done),
        board.move_task(&second, TaskStatus::Done),
    );
    assert!(a ^ b, "exactly one write should fail");

    let (failed, succeeded) = if a { ("2", "1") } else { ("1", "2") };
    assert_eq!(status_of(&board, failed), TaskStatus::Todo);
    assert_eq!(status_of(&board, succeeded), TaskStatus::Done);
    assert_eq!(board.undo_action().unwrap().task_id, id(succeeded));
    assert_eq!(board.error().unwrap().kind, BoardErrorKind::Update);
}
