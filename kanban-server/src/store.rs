//! Server-side task table with optional JSON file persistence.
//!
//! The [`TaskTable`] is the authoritative task list. When opened on a data
//! file, the whole list is rewritten to that file after every successful
//! mutation. Write failures are logged and never fail the request.

use std::path::{Path, PathBuf};

use chrono::Utc;
use kanban_proto::codec::{self, TaskFile};
use kanban_proto::seed::demo_tasks;
use kanban_proto::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};
use tokio::sync::RwLock;

/// Errors returned by table mutations.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// No task has the given id.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The input failed validation.
    #[error(transparent)]
    Invalid(#[from] TaskValidationError),
}

/// Thread-safe task list, persisted to `data_file` when one is set.
pub struct TaskTable {
    tasks: RwLock<Vec<Task>>,
    data_file: Option<PathBuf>,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::with_tasks(demo_tasks())
    }
}

impl TaskTable {
    /// Creates an in-memory table holding `tasks`.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            data_file: None,
        }
    }

    /// Opens a table backed by `path`.
    ///
    /// A missing file starts from the demo tasks and writes them out. An
    /// unreadable or malformed file starts empty.
    pub async fn open(path: PathBuf) -> Self {
        let tasks = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match codec::decode_file(&text) {
                Ok(file) => {
                    tracing::info!(path = %path.display(), count = file.tasks.len(), "tasks loaded");
                    file.tasks
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "malformed data file, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no data file, starting from demo tasks");
                let tasks = demo_tasks();
                save(&path, &tasks).await;
                tasks
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "unreadable data file, starting empty");
                Vec::new()
            }
        };
        Self {
            tasks: RwLock::new(tasks),
            data_file: Some(path),
        }
    }

    /// The persistence file, if any.
    #[must_use]
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// All tasks, in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// One task by id.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == *id).cloned()
    }

    /// Validates `new`, assigns an id and appends it in the `todo` column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Invalid`] if the title is empty or too long.
    pub async fn insert(&self, new: NewTask) -> Result<Task, TableError> {
        new.validate()?;
        let task = Task::from_new(TaskId::generate(), new, Utc::now());
        let mut tasks = self.tasks.write().await;
        tasks.push(task.clone());
        self.persist(&tasks).await;
        drop(tasks);
        Ok(task)
    }

    /// Applies `patch` to the task and bumps its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Invalid`] for an invalid patch and
    /// [`TableError::NotFound`] for an unknown id.
    pub async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, TableError> {
        patch.validate()?;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| TableError::NotFound(id.clone()))?;
        patch.apply_to(task);
        task.touch(Utc::now());
        let updated = task.clone();
        self.persist(&tasks).await;
        drop(tasks);
        Ok(updated)
    }

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NotFound`] for an unknown id.
    pub async fn remove(&self, id: &TaskId) -> Result<(), TableError> {
        let mut tasks = self.tasks.write().await;
        let index = tasks
            .iter()
            .position(|t| t.id == *id)
            .ok_or_else(|| TableError::NotFound(id.clone()))?;
        tasks.remove(index);
        self.persist(&tasks).await;
        drop(tasks);
        Ok(())
    }

    /// Rewrites the data file. Called with the write lock held so saves
    /// land in mutation order.
    async fn persist(&self, tasks: &[Task]) {
        if let Some(path) = &self.data_file {
            save(path, tasks).await;
        }
    }
}

async fn save(path: &Path, tasks: &[Task]) {
    let file = TaskFile {
        tasks: tasks.to_vec(),
    };
    let text = match codec::encode_file(&file) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode tasks");
            return;
        }
    };
    if let Err(e) = tokio::fs::write(path, text).await {
        tracing::error!(path = %path.display(), error = %e, "failed to save tasks");
    }
}
