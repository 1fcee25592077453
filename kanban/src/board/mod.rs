//! Optimistic task-state manager.
//!
//! [`TaskBoard`] owns the client-side view of the task list and routes every
//! mutation through a [`TaskStore`]:
//!
//! 1. snapshot the affected task(s),
//! 2. apply the change locally,
//! 3. call the store,
//! 4. commit on success, or restore the snapshot and record an error.
//!
//! Status changes made through [`TaskBoard::move_task`] arm a single-slot
//! undo that expires on its own (see [`undo`]). The initial load retries
//! with linear backoff (see [`retry`]); writes never retry.
//!
//! Operations report success as `bool`. Store errors are logged and turned
//! into a [`BoardError`]; callers never see them directly.
//!
//! # Concurrency
//!
//! All operations take `&self`, so overlapping intents (a double-clicked
//! move, say) run concurrently. Nothing serializes mutations of the same
//! task id: two overlapping updates may interleave their optimistic apply
//! and rollback, leaving the local list out of step with the store until
//! the next [`TaskBoard::load`].

pub mod retry;
pub mod undo;
pub mod view;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kanban_proto::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use parking_lot::Mutex;

use crate::store::TaskStore;

pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use undo::{DEFAULT_UNDO_WINDOW, UndoAction, UndoSlot};
pub use view::{BoardView, TaskFilter};

/// Message shown when the initial load gives up.
pub const LOAD_ERROR: &str = "Unable to load tasks. Please check your connection and try again.";
/// Message shown when a create fails.
pub const CREATE_ERROR: &str = "Failed to create task";
/// Message shown when an update (or undo) fails.
pub const UPDATE_ERROR: &str = "Failed to update task";
/// Message shown when a delete fails.
pub const DELETE_ERROR: &str = "Failed to delete task";

/// Which operation produced the current error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardErrorKind {
    /// Loading gave up after retries. Persistent until cleared or reloaded.
    Load,
    /// A create failed.
    Create,
    /// An update, move or undo failed.
    Update,
    /// A delete failed.
    Delete,
}

/// User-facing error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardError {
    /// Originating operation.
    pub kind: BoardErrorKind,
    /// Banner text.
    pub message: String,
}

impl BoardError {
    fn new(kind: BoardErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `true` for errors that stay until the next successful load.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.kind == BoardErrorKind::Load
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Direction for keyboard-style column shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards `todo`.
    Left,
    /// Towards `done`.
    Right,
}

/// Tunables for a [`TaskBoard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// How long a move stays undoable.
    pub undo_window: Duration,
    /// Retry policy for [`TaskBoard::load`].
    pub load_retry: RetryPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            undo_window: DEFAULT_UNDO_WINDOW,
            load_retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    tasks: Vec<Task>,
    loads_in_flight: u32,
    error: Option<BoardError>,
}

/// Client-side task list with optimistic mutations, rollback and undo.
pub struct TaskBoard<S, Z = TokioSleeper> {
    store: Arc<S>,
    state: Mutex<BoardState>,
    undo: UndoSlot,
    load_retry: RetryPolicy,
    sleeper: Z,
}

impl<S: TaskStore> TaskBoard<S> {
    /// Creates an empty board over `store` with default settings.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, BoardConfig::default())
    }

    /// Creates an empty board over `store`.
    #[must_use]
    pub fn with_config(store: Arc<S>, config: BoardConfig) -> Self {
        Self {
            store,
            state: Mutex::new(BoardState::default()),
            undo: UndoSlot::new(config.undo_window),
            load_retry: config.load_retry,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: TaskStore, Z: Sleeper> TaskBoard<S, Z> {
    /// Replaces the sleeper used between load retries.
    #[must_use]
    pub fn with_sleeper<Z2: Sleeper>(self, sleeper: Z2) -> TaskBoard<S, Z2> {
        TaskBoard {
            store: self.store,
            state: self.state,
            undo: self.undo,
            load_retry: self.load_retry,
            sleeper,
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Copy of the current task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Copy of a single task.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == *id).cloned()
    }

    /// Filtered, grouped projection of the current list.
    #[must_use]
    pub fn view(&self, filter: &TaskFilter) -> BoardView {
        BoardView::build(&self.state.lock().tasks, filter)
    }

    /// Current error, if any.
    #[must_use]
    pub fn error(&self) -> Option<BoardError> {
        self.state.lock().error.clone()
    }

    /// `true` while any load (including its retries) is in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().loads_in_flight > 0
    }

    /// The armed undo, if any.
    #[must_use]
    pub fn undo_action(&self) -> Option<UndoAction> {
        self.undo.current().map(|armed| armed.action)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Fetches the full list, retrying transient failures.
    ///
    /// The list is replaced wholesale on success and left untouched on
    /// failure. Overlapping loads are not deduplicated: the last response to
    /// arrive wins.
    pub async fn load(&self) -> bool {
        {
            let mut state = self.state.lock();
            state.loads_in_flight = state.loads_in_flight.saturating_add(1);
            state.error = None;
        }

        let store = &self.store;
        let result = retry::retry(self.load_retry, &self.sleeper, |attempt| async move {
            tracing::debug!(attempt, "fetching tasks");
            store.list_tasks().await
        })
        .await;

        let mut state = self.state.lock();
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        match result {
            Ok(tasks) => {
                tracing::info!(count = tasks.len(), "tasks loaded");
                state.tasks = tasks;
                state.error = None;
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempts = self.load_retry.max_attempts(),
                    "giving up on loading tasks"
                );
                state.error = Some(BoardError::new(BoardErrorKind::Load, LOAD_ERROR));
                false
            }
        }
    }

    /// Creates a task and appends the store's copy on success.
    ///
    /// Nothing is inserted before the store answers.
    pub async fn create(&self, new: NewTask) -> bool {
        if let Err(e) = new.validate() {
            tracing::debug!(error = %e, "rejecting invalid task");
            self.set_error(BoardErrorKind::Create, format!("{CREATE_ERROR}: {e}"));
            return false;
        }

        match self.store.create_task(new).await {
            Ok(task) => {
                tracing::info!(task_id = %task.id, "task created");
                self.state.lock().tasks.push(task);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "create failed");
                self.set_error(BoardErrorKind::Create, CREATE_ERROR);
                false
            }
        }
    }

    /// Applies `patch` optimistically, then confirms with the store.
    ///
    /// Returns `false` without calling the store if `id` is not in the local
    /// list. On store failure the task is restored to its exact pre-call
    /// snapshot. When `arm_undo` is set and the committed patch changed the
    /// task's status, the change becomes the armed undo.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch, arm_undo: bool) -> bool {
        if let Err(e) = patch.validate() {
            tracing::debug!(task_id = %id, error = %e, "rejecting invalid update");
            self.set_error(BoardErrorKind::Update, format!("{UPDATE_ERROR}: {e}"));
            return false;
        }

        let Some(snapshot) = self.apply_optimistic(id, &patch) else {
            tracing::debug!(task_id = %id, "update of unknown task ignored");
            return false;
        };

        match self.store.update_task(id, patch.clone()).await {
            Ok(stored) => {
                tracing::debug!(task_id = %id, "update committed");
                self.commit(stored);
                if arm_undo
                    && let Some(new_status) = patch.status
                    && new_status != snapshot.status
                {
                    self.undo.arm(UndoAction {
                        task_id: id.clone(),
                        from_status: new_status,
                        to_status: snapshot.status,
                        timestamp: Utc::now(),
                    });
                }
                true
            }
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "update failed, rolling back");
                self.restore(snapshot);
                self.set_error(BoardErrorKind::Update, UPDATE_ERROR);
                false
            }
        }
    }

    /// Removes a task optimistically, restoring the whole list on failure.
    pub async fn remove(&self, id: &TaskId) -> bool {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.tasks.iter().any(|t| t.id == *id) {
                tracing::debug!(task_id = %id, "delete of unknown task ignored");
                return false;
            }
            let snapshot = state.tasks.clone();
            state.tasks.retain(|t| t.id != *id);
            snapshot
        };

        match self.store.delete_task(id).await {
            Ok(()) => {
                tracing::info!(task_id = %id, "task deleted");
                true
            }
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "delete failed, rolling back");
                let mut state = self.state.lock();
                state.tasks = snapshot;
                state.error = Some(BoardError::new(BoardErrorKind::Delete, DELETE_ERROR));
                false
            }
        }
    }

    /// Moves a task to `status` and arms undo on success.
    pub async fn move_task(&self, id: &TaskId, status: TaskStatus) -> bool {
        self.update(id, TaskPatch::status(status), true).await
    }

    /// Moves a task one column left or right.
    ///
    /// Returns `false` without calling the store if the task is unknown or
    /// already in the edge column.
    pub async fn shift(&self, id: &TaskId, direction: Direction) -> bool {
        match self.shift_target(id, direction) {
            Some(status) => self.move_task(id, status).await,
            None => false,
        }
    }

    /// Column a [`shift`](Self::shift) would move the task into, or `None`
    /// if the task is unknown or already in the edge column.
    #[must_use]
    pub fn shift_target(&self, id: &TaskId, direction: Direction) -> Option<TaskStatus> {
        let current = self.task(id)?.status;
        match direction {
            Direction::Left => current.prev(),
            Direction::Right => current.next(),
        }
    }

    /// Reverts the armed move.
    ///
    /// Returns `false` if nothing is armed. On failure the action stays
    /// armed so it can be retried until it expires.
    pub async fn undo(&self) -> bool {
        let Some(armed) = self.undo.current() else {
            return false;
        };
        let action = armed.action;

        let reverted = self
            .update(&action.task_id, TaskPatch::status(action.to_status), false)
            .await;
        if reverted {
            tracing::info!(
                task_id = %action.task_id,
                status = %action.to_status,
                "move undone"
            );
            self.undo.clear_generation(armed.generation);
        }
        reverted
    }

    /// Drops the armed undo without reverting anything.
    pub fn dismiss_undo(&self) -> bool {
        self.undo.clear().is_some()
    }

    /// Clears the error state. Tasks and undo are untouched.
    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Applies `patch` to the local copy and returns the pre-patch snapshot.
    fn apply_optimistic(&self, id: &TaskId, patch: &TaskPatch) -> Option<Task> {
        let mut state = self.state.lock();
        let task = state.tasks.iter_mut().find(|t| t.id == *id)?;
        let snapshot = task.clone();
        patch.apply_to(task);
        task.touch(Utc::now());
        Some(snapshot)
    }

    /// Replaces the local entry with the store's copy, if it is still listed.
    fn commit(&self, stored: Task) {
        let mut state = self.state.lock();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == stored.id) {
            *task = stored;
        }
    }

    /// Puts `snapshot` back in place of its entry, if it is still listed.
    fn restore(&self, snapshot: Task) {
        let mut state = self.state.lock();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == snapshot.id) {
            *task = snapshot;
        }
    }

    fn set_error(&self, kind: BoardErrorKind, message: impl Into<String>) {
        self.state.lock().error = Some(BoardError::new(kind, message));
    }
}
