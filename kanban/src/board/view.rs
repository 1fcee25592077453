//! Read-only projections of the task list: filtering and column grouping.

use kanban_proto::{Task, TaskPriority, TaskStatus};

/// Search and priority filter applied before grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring matched against the title. Empty matches all.
    pub query: String,
    /// Only tasks with this priority; `None` matches all.
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    /// A filter that matches every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns `true` if `task` passes both criteria.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let matches_query = self.query.is_empty()
            || task
                .title
                .to_lowercase()
                .contains(&self.query.to_lowercase());
        let matches_priority = self.priority.is_none_or(|p| p == task.priority);
        matches_query && matches_priority
    }
}

/// Tasks grouped into the three board columns, preserving input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    /// `todo` column.
    pub todo: Vec<Task>,
    /// `in-progress` column.
    pub in_progress: Vec<Task>,
    /// `done` column.
    pub done: Vec<Task>,
}

impl BoardView {
    /// Filters `tasks` and groups the survivors by status.
    #[must_use]
    pub fn build<'a>(tasks: impl IntoIterator<Item = &'a Task>, filter: &TaskFilter) -> Self {
        let mut view = Self::default();
        for task in tasks.into_iter().filter(|t| filter.matches(t)) {
            view.column_mut(task.status).push(task.clone());
        }
        view
    }

    /// Tasks in the given column.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Done => &mut self.done,
        }
    }

    /// Total number of tasks across all columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    /// Returns `true` if no task survived the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
