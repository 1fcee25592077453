//! Single-slot undo buffer with timed expiry.
//!
//! At most one [`UndoAction`] is armed at a time. Arming replaces the
//! previous action and aborts its expiry timer; every armed action carries a
//! generation number so a timer can only ever clear the action it was
//! spawned for.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kanban_proto::{TaskId, TaskStatus};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Default time an undo stays available.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

/// A reversible status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoAction {
    /// Task that was moved. May have been deleted since.
    pub task_id: TaskId,
    /// Status the task was moved to.
    pub from_status: TaskStatus,
    /// Status an undo restores.
    pub to_status: TaskStatus,
    /// When the move was committed.
    pub timestamp: DateTime<Utc>,
}

/// An armed action together with the generation that armed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedUndo {
    /// Monotonic arming counter.
    pub generation: u64,
    /// The armed action.
    pub action: UndoAction,
}

struct Armed {
    undo: ArmedUndo,
    expiry: JoinHandle<()>,
}

#[derive(Default)]
struct SlotInner {
    armed: Option<Armed>,
    generation: u64,
}

/// Owner of the live [`UndoAction`] and its expiry timer.
pub struct UndoSlot {
    inner: Arc<Mutex<SlotInner>>,
    window: Duration,
}

impl Default for UndoSlot {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_WINDOW)
    }
}

impl UndoSlot {
    /// Creates an empty slot whose actions expire after `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner::default())),
            window,
        }
    }

    /// How long an armed action stays available.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Arms `action`, discarding any previously armed one.
    ///
    /// Must be called from within a tokio runtime: the expiry timer is a
    /// spawned task.
    pub fn arm(&self, action: UndoAction) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let generation = inner.generation;

        let slot = Arc::clone(&self.inner);
        let window = self.window;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut inner = slot.lock();
            if inner
                .armed
                .as_ref()
                .is_some_and(|a| a.undo.generation == generation)
            {
                inner.armed = None;
                tracing::debug!(generation, "undo window expired");
            }
        });

        tracing::debug!(
            task_id = %action.task_id,
            from = %action.from_status,
            to = %action.to_status,
            generation,
            "undo armed"
        );
        let previous = inner.armed.replace(Armed {
            undo: ArmedUndo { generation, action },
            expiry,
        });
        drop(inner);

        if let Some(previous) = previous {
            previous.expiry.abort();
            tracing::debug!(
                task_id = %previous.undo.action.task_id,
                generation = previous.undo.generation,
                "previous undo discarded"
            );
        }
        generation
    }

    /// The currently armed action, if any.
    #[must_use]
    pub fn current(&self) -> Option<ArmedUndo> {
        self.inner.lock().armed.as_ref().map(|a| a.undo.clone())
    }

    /// Clears whatever is armed and cancels its timer.
    pub fn clear(&self) -> Option<UndoAction> {
        let armed = self.inner.lock().armed.take()?;
        armed.expiry.abort();
        Some(armed.undo.action)
    }

    /// Clears the slot only if `generation` is still the armed one.
    pub fn clear_generation(&self, generation: u64) -> bool {
        let armed = {
            let mut inner = self.inner.lock();
            if inner
                .armed
                .as_ref()
                .is_none_or(|a| a.undo.generation != generation)
            {
                return false;
            }
            inner.armed.take()
        };
        if let Some(armed) = armed {
            armed.expiry.abort();
        }
        true
    }
}

impl Drop for UndoSlot {
    fn drop(&mut self) {
        if let Some(armed) = self.inner.lock().armed.take() {
            armed.expiry.abort();
        }
    }
}
