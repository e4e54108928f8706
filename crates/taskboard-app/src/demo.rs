//! In-process task backend persisted to local storage.
//!
//! Emulates the REST API with simulated latency so the client can run
//! without a server. Tasks live under `mockTasks`, audit entries under
//! `auditLog`.

use std::time::Duration;

use serde_json::json;
use taskboard_core::{
    Task, TaskId, TaskPriority, TaskStatus, User, UserId, filter_tasks,
};
use taskboard_store_fs::{KeyValueStore, StoreError};
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{CreateTaskRequest, Page, TaskPage, TaskQuery};
use crate::audit::{AuditAction, AuditLogEntry};
use crate::backend::TaskBackend;
use crate::error::BackendError;
use crate::task_patch::TaskUpdate;

/// Storage key of the persisted task list.
pub const TASKS_KEY: &str = "mockTasks";
/// Storage key of the persisted audit log.
pub const AUDIT_KEY: &str = "auditLog";

const LIST_DELAY_MS: u64 = 500;
const GET_DELAY_MS: u64 = 200;
const CREATE_DELAY_MS: u64 = 300;
const UPDATE_DELAY_MS: u64 = 300;
const DELETE_DELAY_MS: u64 = 200;
const STATUS_DELAY_MS: u64 = 200;
const AUDIT_DELAY_MS: u64 = 200;

/// Artificial response delay, scaled from the nominal per-endpoint latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedLatency {
    scale: f64,
}

impl Default for SimulatedLatency {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SimulatedLatency {
    /// No delay at all.
    pub const NONE: Self = Self { scale: 0.0 };

    /// Multiply every nominal delay by `scale`. Zero, negative and non-finite scales disable delays.
    #[must_use]
    pub const fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Effective delay for an endpoint whose nominal latency is `base_ms`.
    #[must_use]
    pub fn scaled(&self, base_ms: u64) -> Duration {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(Duration::from_millis(base_ms).as_secs_f64() * self.scale)
            .unwrap_or(Duration::ZERO)
    }

    /// Sleep for the scaled delay.
    pub async fn wait(&self, base_ms: u64) {
        let delay = self.scaled(base_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Tunables for [`DemoBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoOptions {
    /// Response delay.
    pub latency: SimulatedLatency,
    /// Status given to tasks created without one.
    pub default_status: TaskStatus,
    /// Populate empty storage with the sample tasks.
    pub seed: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            latency: SimulatedLatency::default(),
            default_status: TaskStatus::Todo,
            seed: true,
        }
    }
}

struct DemoState {
    tasks: Vec<Task>,
    audit: Vec<AuditLogEntry>,
}

/// Task backend emulated in-process on top of a [`KeyValueStore`].
pub struct DemoBackend<K> {
    storage: K,
    options: DemoOptions,
    state: Mutex<DemoState>,
}

impl<K: KeyValueStore> DemoBackend<K> {
    /// Load persisted state, falling back to the sample tasks when storage is empty or unreadable.
    ///
    /// # Errors
    /// Returns an error if the storage medium itself fails.
    pub fn open(storage: K, options: DemoOptions) -> Result<Self, BackendError> {
        let initial = || if options.seed { default_tasks() } else { Vec::new() };
        let tasks = load_or(&storage, TASKS_KEY, initial)?;
        let audit = load_or(&storage, AUDIT_KEY, Vec::new)?;
        info!(tasks = tasks.len(), audit = audit.len(), "Opened demo backend");
        Ok(Self {
            storage,
            options,
            state: Mutex::new(DemoState { tasks, audit }),
        })
    }

    /// Restore the sample tasks and drop the audit log.
    ///
    /// # Errors
    /// Returns an error if the reset state cannot be persisted.
    pub async fn reset(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let tasks = default_tasks();
        self.storage.remove(AUDIT_KEY)?;
        self.storage.set_json(TASKS_KEY, &tasks)?;
        state.tasks = tasks;
        state.audit.clear();
        info!("Reset demo data to defaults");
        Ok(())
    }

    /// Number of tasks currently held.
    pub async fn task_count(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    fn commit_tasks(&self, state: &mut DemoState, tasks: Vec<Task>) -> Result<(), BackendError> {
        self.storage.set_json(TASKS_KEY, &tasks)?;
        state.tasks = tasks;
        Ok(())
    }

    fn record(&self, state: &mut DemoState, entry: AuditLogEntry) {
        debug!(action = entry.action.as_str(), task = %entry.entity_id, "Recorded audit entry");
        state.audit.push(entry);
        if let Err(err) = self.storage.set_json(AUDIT_KEY, &state.audit) {
            warn!(error = %err, "Failed to persist audit log");
        }
    }
}

fn load_or<K, T, F>(storage: &K, key: &str, fallback: F) -> Result<T, BackendError>
where
    K: KeyValueStore,
    T: serde::de::DeserializeOwned,
    F: FnOnce() -> T,
{
    match storage.get_json(key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(fallback()),
        Err(StoreError::Decode { key, source }) => {
            warn!(%key, error = %source, "Discarding unreadable demo data");
            Ok(fallback())
        }
        Err(err) => Err(err.into()),
    }
}

fn position(tasks: &[Task], id: &TaskId) -> Result<usize, BackendError> {
    tasks
        .iter()
        .position(|task| task.id == *id)
        .ok_or_else(|| BackendError::NotFound(id.clone()))
}

impl<K: KeyValueStore> TaskBackend for DemoBackend<K> {
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, BackendError> {
        self.options.latency.wait(LIST_DELAY_MS).await;
        let state = self.state.lock().await;
        let mut matched = filter_tasks(&state.tasks, &query.filter);
        drop(state);
        query.sort.unwrap_or_default().sort_in_place(&mut matched);
        Ok(Page::paginate(matched, query.page(), query.limit()))
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, BackendError> {
        self.options.latency.wait(GET_DELAY_MS).await;
        let state = self.state.lock().await;
        let idx = position(&state.tasks, id)?;
        Ok(state.tasks[idx].clone())
    }

    async fn create_task(&self, actor: &User, request: &CreateTaskRequest) -> Result<Task, BackendError> {
        self.options.latency.wait(CREATE_DELAY_MS).await;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(BackendError::Rejected("title must not be empty".into()));
        }

        let now = OffsetDateTime::now_utc();
        let mut task = Task::new(TaskId::new(), title, actor.id.clone(), now);
        task.description.clone_from(&request.description);
        task.status = request.status.unwrap_or(self.options.default_status);
        task.priority = request.priority;
        task.tags.clone_from(&request.tags);
        task.due_date = request.due_date;
        task.assignee_id.clone_from(&request.assignee_id);
        task.visibility = request.visibility;

        let mut state = self.state.lock().await;
        let mut tasks = state.tasks.clone();
        tasks.insert(0, task.clone());
        self.commit_tasks(&mut state, tasks)?;
        let changes = json!({
            "title": task.title,
            "status": task.status.as_str(),
            "priority": task.priority.as_str(),
        });
        self.record(
            &mut state,
            AuditLogEntry::for_task(AuditAction::Create, &task.id, actor, changes, now),
        );
        info!(task = %task.id, "Created demo task");
        Ok(task)
    }

    async fn update_task(&self, actor: &User, id: &TaskId, update: &TaskUpdate) -> Result<Task, BackendError> {
        self.options.latency.wait(UPDATE_DELAY_MS).await;
        let now = OffsetDateTime::now_utc();
        let mut state = self.state.lock().await;
        let idx = position(&state.tasks, id)?;

        let mut tasks = state.tasks.clone();
        let changes = update.describe_changes(&tasks[idx]);
        update.apply_to(&mut tasks[idx]);
        tasks[idx].touch(now);
        let updated = tasks[idx].clone();
        self.commit_tasks(&mut state, tasks)?;
        self.record(
            &mut state,
            AuditLogEntry::for_task(AuditAction::Update, id, actor, changes, now),
        );
        info!(task = %id, "Updated demo task");
        Ok(updated)
    }

    async fn delete_task(&self, actor: &User, id: &TaskId) -> Result<(), BackendError> {
        self.options.latency.wait(DELETE_DELAY_MS).await;
        let mut state = self.state.lock().await;
        let idx = position(&state.tasks, id)?;

        let mut tasks = state.tasks.clone();
        let removed = tasks.remove(idx);
        self.commit_tasks(&mut state, tasks)?;
        self.record(
            &mut state,
            AuditLogEntry::for_task(
                AuditAction::Delete,
                id,
                actor,
                json!({ "title": removed.title }),
                OffsetDateTime::now_utc(),
            ),
        );
        info!(task = %id, "Deleted demo task");
        Ok(())
    }

    async fn update_status(&self, actor: &User, id: &TaskId, status: TaskStatus) -> Result<Task, BackendError> {
        self.options.latency.wait(STATUS_DELAY_MS).await;
        let now = OffsetDateTime::now_utc();
        let mut state = self.state.lock().await;
        let idx = position(&state.tasks, id)?;

        let mut tasks = state.tasks.clone();
        let previous = tasks[idx].status;
        tasks[idx].status = status;
        tasks[idx].touch(now);
        let updated = tasks[idx].clone();
        self.commit_tasks(&mut state, tasks)?;
        let changes = json!({ "status": { "from": previous.as_str(), "to": status.as_str() } });
        self.record(
            &mut state,
            AuditLogEntry::for_task(AuditAction::StatusChange, id, actor, changes, now),
        );
        info!(task = %id, from = %previous, to = %status, "Changed demo task status");
        Ok(updated)
    }

    async fn audit_log(&self) -> Result<Vec<AuditLogEntry>, BackendError> {
        self.options.latency.wait(AUDIT_DELAY_MS).await;
        let state = self.state.lock().await;
        Ok(state.audit.iter().rev().cloned().collect())
    }
}

struct SeedTask {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    status: TaskStatus,
    priority: TaskPriority,
    tag: &'static str,
    due_date: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    assignee: Option<&'static str>,
    created_by: &'static str,
}

impl SeedTask {
    fn to_task(&self) -> Task {
        let mut task = Task::new(
            TaskId::from(self.id),
            self.title,
            UserId::from(self.created_by),
            self.created_at,
        );
        task.description = self.description.to_owned();
        task.status = self.status;
        task.priority = self.priority;
        task.tags = vec![self.tag.to_owned()];
        task.due_date = self.due_date;
        task.assignee_id = self.assignee.map(UserId::from);
        task.updated_at = self.updated_at;
        task
    }
}

const SEED_TASKS: [SeedTask; 6] = [
    SeedTask {
        id: "1",
        title: "Design new landing page",
        description: "Create a modern, responsive landing page for the new product launch",
        status: TaskStatus::Todo,
        priority: TaskPriority::High,
        tag: "work",
        due_date: Some(datetime!(2024-02-15 0:00 UTC)),
        created_at: datetime!(2024-01-15 10:00 UTC),
        updated_at: datetime!(2024-01-15 10:00 UTC),
        assignee: Some("2"),
        created_by: "1",
    },
    SeedTask {
        id: "2",
        title: "Buy groceries",
        description: "Weekly grocery shopping for the family",
        status: TaskStatus::InProgress,
        priority: TaskPriority::Medium,
        tag: "shopping",
        due_date: Some(datetime!(2024-01-20 0:00 UTC)),
        created_at: datetime!(2024-01-14 14:30 UTC),
        updated_at: datetime!(2024-01-16 9:15 UTC),
        assignee: Some("1"),
        created_by: "2",
    },
    SeedTask {
        id: "3",
        title: "Review quarterly reports",
        description: "Analyze Q4 performance metrics and prepare summary",
        status: TaskStatus::Done,
        priority: TaskPriority::High,
        tag: "work",
        due_date: Some(datetime!(2024-01-18 0:00 UTC)),
        created_at: datetime!(2024-01-10 8:00 UTC),
        updated_at: datetime!(2024-01-18 16:45 UTC),
        assignee: Some("1"),
        created_by: "1",
    },
    SeedTask {
        id: "4",
        title: "Schedule dentist appointment",
        description: "Book regular dental checkup",
        status: TaskStatus::Todo,
        priority: TaskPriority::Low,
        tag: "health",
        due_date: None,
        created_at: datetime!(2024-01-16 11:20 UTC),
        updated_at: datetime!(2024-01-16 11:20 UTC),
        assignee: None,
        created_by: "3",
    },
    SeedTask {
        id: "5",
        title: "Plan weekend trip",
        description: "Research and book accommodation for weekend getaway",
        status: TaskStatus::InProgress,
        priority: TaskPriority::Medium,
        tag: "personal",
        due_date: Some(datetime!(2024-01-25 0:00 UTC)),
        created_at: datetime!(2024-01-12 15:45 UTC),
        updated_at: datetime!(2024-01-17 10:30 UTC),
        assignee: Some("2"),
        created_by: "2",
    },
    SeedTask {
        id: "6",
        title: "Update project documentation",
        description: "Review and update technical documentation for the current project",
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        tag: "work",
        due_date: Some(datetime!(2024-01-22 0:00 UTC)),
        created_at: datetime!(2024-01-15 13:15 UTC),
        updated_at: datetime!(2024-01-15 13:15 UTC),
        assignee: Some("3"),
        created_by: "1",
    },
];

/// The sample tasks a fresh demo backend starts with.
#[must_use]
pub fn default_tasks() -> Vec<Task> {
    SEED_TASKS.iter().map(SeedTask::to_task).collect()
}
