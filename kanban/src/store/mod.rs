//! Task store abstraction.
//!
//! Defines the [`TaskStore`] trait that every backend must satisfy.
//! Concrete implementations:
//! - [`memory::MemoryStore`]: in-process mock with injected latency and failures
//! - [`http::HttpStore`]: client for the `kanban-server` HTTP API

pub mod http;
pub mod memory;

use std::fmt;
use std::future::Future;

use kanban_proto::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};

/// Individual store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Fetch the whole task list.
    List,
    /// Create a task.
    Create,
    /// Patch a task.
    Update,
    /// Delete a task.
    Delete,
}

impl StoreOp {
    /// Failure class this operation belongs to.
    #[must_use]
    pub const fn class(self) -> OpClass {
        match self {
            Self::List => OpClass::Read,
            Self::Create | Self::Update | Self::Delete => OpClass::Write,
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Read and write operations fail (and are retried) under different policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// `list`.
    Read,
    /// `create`, `update` and `delete`.
    Write,
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Simulated failure injected by the store's fault policy.
    #[error("simulated {op} failure")]
    Injected {
        /// The operation that was failed.
        op: StoreOp,
    },

    /// No task with the given id exists in the store.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The store rejected the input.
    #[error("invalid task: {0}")]
    Invalid(#[from] TaskValidationError),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The request never produced a response (connect, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the same call could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Injected { .. } | Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Invalid(_) | Self::Decode(_) => false,
        }
    }
}

/// Async CRUD contract for the authoritative task list.
///
/// Every call may fail. Stores own id generation and timestamps: the
/// returned [`Task`] values are authoritative.
pub trait TaskStore: Send + Sync {
    /// Fetch every task.
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Create a task in the `todo` column and return it with its id and
    /// timestamps.
    fn create_task(&self, new: NewTask) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Merge `patch` into the task and return the stored result.
    ///
    /// Fails with [`StoreError::NotFound`] if the id is unknown.
    fn update_task(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Delete the task.
    ///
    /// Fails with [`StoreError::NotFound`] if the id is unknown.
    fn delete_task(&self, id: &TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
