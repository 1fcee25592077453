//! Property-based tests for the task model.
//!
//! Uses proptest to verify:
//! 1. Title validation accepts exactly the non-blank titles within the limit.
//! 2. Applying a patch changes only the fields it carries.
//! 3. `touch` never moves `updated_at` backwards.
//! 4. Arbitrary JSON never panics the task decoder.

use chrono::{DateTime, TimeZone, Utc};
use kanban_proto::codec;
use kanban_proto::{
    MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskId, TaskPatch, TaskPriority, TaskStatus,
    TaskValidationError,
};
use proptest::prelude::*;

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

fn arb_priority() -> impl Strategy<Value = TaskPriority> {
    prop::sample::select(vec![
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
    ])
}

fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9]{1,12}",
        "[A-Za-z ]{1,40}",
        ".{0,40}",
        arb_status(),
        arb_priority(),
        arb_time(),
    )
        .prop_map(|(id, title, description, status, priority, at)| Task {
            id: TaskId::new(id),
            title,
            description,
            status,
            priority,
            created_at: at,
            updated_at: at,
        })
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        prop::option::of("[A-Za-z]{1,20}"),
        prop::option::of(".{0,20}"),
        prop::option::of(arb_priority()),
        prop::option::of(arb_status()),
    )
        .prop_map(|(title, description, priority, status)| TaskPatch {
            title,
            description,
            priority,
            status,
        })
}

proptest! {
    #[test]
    fn non_blank_titles_within_limit_are_valid(title in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,200}") {
        let new = NewTask::new(title, "", TaskPriority::Medium);
        prop_assert_eq!(new.validate(), Ok(()));
    }

    #[test]
    fn blank_titles_are_rejected(title in "[ \t\n]{0,20}") {
        let new = NewTask::new(title, "", TaskPriority::Medium);
        prop_assert_eq!(new.validate(), Err(TaskValidationError::TitleEmpty));
    }

    #[test]
    fn overlong_titles_are_rejected(extra in 1usize..64) {
        let title = "x".repeat(MAX_TASK_TITLE_LENGTH + extra);
        let new = NewTask::new(title, "", TaskPriority::Medium);
        prop_assert_eq!(new.validate(), Err(TaskValidationError::TitleTooLong));
    }

    #[test]
    fn patch_changes_only_present_fields(task in arb_task(), patch in arb_patch()) {
        let mut patched = task.clone();
        patch.apply_to(&mut patched);

        prop_assert_eq!(&patched.id, &task.id);
        prop_assert_eq!(patched.created_at, task.created_at);
        prop_assert_eq!(patched.updated_at, task.updated_at);
        prop_assert_eq!(&patched.title, patch.title.as_ref().unwrap_or(&task.title));
        prop_assert_eq!(
            &patched.description,
            patch.description.as_ref().unwrap_or(&task.description)
        );
        prop_assert_eq!(patched.priority, patch.priority.unwrap_or(task.priority));
        prop_assert_eq!(patched.status, patch.status.unwrap_or(task.status));
    }

    #[test]
    fn empty_patch_is_identity(task in arb_task()) {
        let mut patched = task.clone();
        let patch = TaskPatch::default();
        prop_assert!(patch.is_empty());
        patch.apply_to(&mut patched);
        prop_assert_eq!(patched, task);
    }

    #[test]
    fn touch_is_monotonic(mut task in arb_task(), stamps in prop::collection::vec(arb_time(), 1..10)) {
        let mut high_water = task.updated_at;
        for stamp in stamps {
            task.touch(stamp);
            prop_assert!(task.updated_at >= high_water);
            high_water = high_water.max(stamp);
            prop_assert_eq!(task.updated_at, high_water);
        }
    }

    #[test]
    fn status_neighbours_are_inverse(status in arb_status()) {
        if let Some(next) = status.next() {
            prop_assert_eq!(next.prev(), Some(status));
        }
        if let Some(prev) = status.prev() {
            prop_assert_eq!(prev.next(), Some(status));
        }
    }

    #[test]
    fn decode_never_panics(text in ".{0,256}") {
        let _ = codec::decode_file(&text);
        let _ = serde_json::from_str::<Task>(&text);
    }
}
