//! Demo board contents used when a store starts without data.

use chrono::{DateTime, TimeZone, Utc};

use crate::task::{Task, TaskId, TaskPriority, TaskStatus};

fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn demo(
    id: &str,
    title: &str,
    description: &str,
    status: TaskStatus,
    priority: TaskPriority,
    hour: u32,
) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: description.to_string(),
        status,
        priority,
        created_at: at_hour(hour),
        updated_at: at_hour(hour),
    }
}

/// Five tasks spread across all three columns.
#[must_use]
pub fn demo_tasks() -> Vec<Task> {
    vec![
        demo(
            "1",
            "Wire nav",
            "Sketch top nav",
            TaskStatus::Todo,
            TaskPriority::Medium,
            10,
        ),
        demo(
            "2",
            "Design user interface",
            "Create mockups for the main dashboard",
            TaskStatus::Todo,
            TaskPriority::High,
            11,
        ),
        demo(
            "3",
            "Setup database",
            "Configure database connections and models",
            TaskStatus::InProgress,
            TaskPriority::High,
            12,
        ),
        demo(
            "4",
            "Write unit tests",
            "Add comprehensive test coverage",
            TaskStatus::InProgress,
            TaskPriority::Medium,
            13,
        ),
        demo(
            "5",
            "Deploy to staging",
            "Set up staging environment",
            TaskStatus::Done,
            TaskPriority::Low,
            14,
        ),
    ]
}
