//! Shared task model and JSON wire format for the kanban board.

pub mod codec;
pub mod fault;
pub mod seed;
pub mod task;

pub use task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskId, TaskPatch, TaskPriority, TaskStatus,
    TaskValidationError,
};
