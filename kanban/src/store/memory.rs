//! In-memory mock store with injected latency and failures.
//!
//! [`MemoryStore`] holds the authoritative task list in process. Each call
//! sleeps for a per-operation latency and then fails with a per-class
//! probability taken from its [`FaultPolicy`]. Tests pin behaviour with
//! [`FaultPolicy::reliable`], [`FaultPolicy::always_fail`] or
//! [`MemoryStore::fail_next`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use kanban_proto::fault::roll_failure;
use kanban_proto::seed::demo_tasks;
use kanban_proto::{NewTask, Task, TaskId, TaskPatch};
use parking_lot::Mutex;
use tokio::sync::RwLock;

use super::{OpClass, StoreError, StoreOp, TaskStore};

/// Failure rates and simulated latency, tunable per operation class.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultPolicy {
    /// Probability in `[0, 1]` that a read fails.
    pub read_failure_rate: f64,
    /// Probability in `[0, 1]` that a write fails.
    pub write_failure_rate: f64,
    /// Delay before `list_tasks` answers.
    pub list_latency: Duration,
    /// Delay before `create_task` answers.
    pub create_latency: Duration,
    /// Delay before `update_task` answers.
    pub update_latency: Duration,
    /// Delay before `delete_task` answers.
    pub delete_latency: Duration,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            read_failure_rate: 0.01,
            write_failure_rate: 0.05,
            list_latency: Duration::from_millis(200),
            create_latency: Duration::from_millis(300),
            update_latency: Duration::from_millis(250),
            delete_latency: Duration::from_millis(200),
        }
    }
}

impl FaultPolicy {
    /// Never fails, never sleeps.
    #[must_use]
    pub const fn reliable() -> Self {
        Self {
            read_failure_rate: 0.0,
            write_failure_rate: 0.0,
            list_latency: Duration::ZERO,
            create_latency: Duration::ZERO,
            update_latency: Duration::ZERO,
            delete_latency: Duration::ZERO,
        }
    }

    /// Every call fails, with no latency.
    #[must_use]
    pub const fn always_fail() -> Self {
        Self {
            read_failure_rate: 1.0,
            write_failure_rate: 1.0,
            ..Self::reliable()
        }
    }

    /// Reliable reads, failing writes.
    #[must_use]
    pub const fn failing_writes() -> Self {
        Self {
            write_failure_rate: 1.0,
            ..Self::reliable()
        }
    }

    /// Returns the latency configured for `op`.
    #[must_use]
    pub const fn latency(&self, op: StoreOp) -> Duration {
        match op {
            StoreOp::List => self.list_latency,
            StoreOp::Create => self.create_latency,
            StoreOp::Update => self.update_latency,
            StoreOp::Delete => self.delete_latency,
        }
    }

    /// Returns the failure rate configured for `class`.
    #[must_use]
    pub const fn failure_rate(&self, class: OpClass) -> f64 {
        match class {
            OpClass::Read => self.read_failure_rate,
            OpClass::Write => self.write_failure_rate,
        }
    }
}

/// Number of calls received per operation, failed or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    calls: HashMap<StoreOp, u32>,
}

impl StoreStats {
    /// Calls received for `op`.
    #[must_use]
    pub fn calls(&self, op: StoreOp) -> u32 {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Calls received across all operations.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.calls.values().sum()
    }

    fn record(&mut self, op: StoreOp) {
        *self.calls.entry(op).or_default() += 1;
    }
}

/// Mock task store backed by an in-memory list.
pub struct MemoryStore {
    tasks: RwLock<Vec<Task>>,
    policy: Mutex<FaultPolicy>,
    /// Failures still owed per class, consumed before the random roll.
    forced: Mutex<HashMap<OpClass, u32>>,
    stats: Mutex<StoreStats>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(FaultPolicy::default())
    }
}

impl MemoryStore {
    /// Creates an empty store with the given fault policy.
    #[must_use]
    pub fn new(policy: FaultPolicy) -> Self {
        Self::with_tasks(Vec::new(), policy)
    }

    /// Creates a store preloaded with `tasks`.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>, policy: FaultPolicy) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            policy: Mutex::new(policy),
            forced: Mutex::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
        }
    }

    /// Creates a store holding the five demo tasks.
    #[must_use]
    pub fn seeded(policy: FaultPolicy) -> Self {
        Self::with_tasks(demo_tasks(), policy)
    }

    /// Replaces the fault policy for subsequent calls.
    pub fn set_policy(&self, policy: FaultPolicy) {
        *self.policy.lock() = policy;
    }

    /// Returns the current fault policy.
    #[must_use]
    pub fn policy(&self) -> FaultPolicy {
        self.policy.lock().clone()
    }

    /// Forces the next `count` calls of `class` to fail regardless of the
    /// policy's rates.
    pub fn fail_next(&self, class: OpClass, count: u32) {
        *self.forced.lock().entry(class).or_default() += count;
    }

    /// Returns a copy of the call counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    /// Returns a copy of the authoritative task list, bypassing latency and
    /// fault injection.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Counts the call, waits out the latency, then decides whether to fail.
    async fn begin(&self, op: StoreOp) -> Result<(), StoreError> {
        self.stats.lock().record(op);
        let policy = self.policy();
        let latency = policy.latency(op);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let class = op.class();
        let forced = {
            let mut forced = self.forced.lock();
            match forced.get_mut(&class) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if forced || roll_failure(policy.failure_rate(class)) {
            tracing::debug!(op = %op, forced, "injecting store failure");
            return Err(StoreError::Injected { op });
        }
        Ok(())
    }
}

impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.begin(StoreOp::List).await?;
        Ok(self.tasks.read().await.clone())
    }

    async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        self.begin(StoreOp::Create).await?;
        new.validate()?;

        let task = Task::from_new(TaskId::generate(), new, Utc::now());
        self.tasks.write().await.push(task.clone());
        tracing::debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.begin(StoreOp::Update).await?;
        patch.validate()?;

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(task);
        task.touch(Utc::now());
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        self.begin(StoreOp::Delete).await?;

        let mut tasks = self.tasks.write().await;
        let index = tasks
            .iter()
            .position(|t| t.id == *id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        tasks.remove(index);
        drop(tasks);
        Ok(())
    }
}
