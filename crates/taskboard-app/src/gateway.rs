//! Authorized, validated task mutations.
//!
//! Every mutation is checked against the access policy before anything else
//! happens, then validated, dispatched to the backend and finally applied to
//! the [`TaskStore`]. A failure at any step leaves the store untouched.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use taskboard_core::{Operation, Task, TaskId, TaskStatus, User};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::api::{CreateTaskRequest, TaskQuery};
use crate::audit::AuditLogEntry;
use crate::backend::TaskBackend;
use crate::config::DeploymentProfile;
use crate::error::{BackendError, TaskError};
use crate::sequencer::{LoadOutcome, RequestSeq, RequestSequencer};
use crate::task_patch::TaskUpdate;
use crate::task_store::TaskStore;

/// Result of [`TaskGateway::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Request number of the load.
    pub seq: RequestSeq,
    /// Whether the response replaced the store contents.
    pub outcome: LoadOutcome,
    /// Total matching tasks on the backend.
    pub total: usize,
    /// Page returned.
    pub page: usize,
    /// Number of pages available.
    pub total_pages: usize,
}

/// Mutation front door over a [`TaskBackend`] and the shared [`TaskStore`].
pub struct TaskGateway<B> {
    backend: B,
    store: RwLock<TaskStore>,
    sequencer: RequestSequencer,
    profile: DeploymentProfile,
}

impl<B> TaskGateway<B> {
    /// Gateway with an empty store.
    pub fn new(backend: B, profile: DeploymentProfile) -> Self {
        Self::with_store(backend, profile, TaskStore::new())
    }

    /// Gateway over an existing store.
    pub fn with_store(backend: B, profile: DeploymentProfile, store: TaskStore) -> Self {
        Self {
            backend,
            store: RwLock::new(store),
            sequencer: RequestSequencer::new(),
            profile,
        }
    }

    /// Underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Deployment profile in force.
    pub const fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    /// Read access to the store.
    pub fn store(&self) -> RwLockReadGuard<'_, TaskStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the store for view criteria and selection.
    pub fn store_mut(&self) -> RwLockWriteGuard<'_, TaskStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, actor: &User, operation: Operation, task: Option<&Task>) -> Result<(), TaskError> {
        self.profile
            .access_policy()
            .authorize(actor, operation, task)
            .map_err(|denied| {
                warn!(user = %actor.id, role = %actor.role, %operation, "Operation denied");
                TaskError::from(denied)
            })
    }

    fn ensure_status_allowed(&self, status: TaskStatus) -> Result<(), TaskError> {
        if self.profile.allows(status) {
            return Ok(());
        }
        Err(TaskError::Validation(format!(
            "status '{status}' is not available. Allowed values: {}",
            self.profile.status_hint()
        )))
    }

    fn existing(&self, id: &TaskId) -> Option<Task> {
        self.store().get(id).cloned()
    }

    fn apply_upsert(&self, seq: RequestSeq, task: Task) -> Task {
        let mut store = self.store_mut();
        let stored = store.upsert(task, OffsetDateTime::now_utc()).clone();
        self.sequencer.record_mutation(seq);
        stored
    }
}

fn dispatch_failed(seq: RequestSeq, err: BackendError) -> TaskError {
    warn!(%seq, error = %err, "Backend request failed");
    TaskError::from(err)
}

impl<B: TaskBackend> TaskGateway<B> {
    /// Load a page of tasks into the store.
    ///
    /// The response is discarded when a request issued later has already
    /// been applied.
    ///
    /// # Errors
    /// Returns an error when the actor may not view tasks or the backend fails.
    pub async fn refresh(&self, actor: &User, query: &TaskQuery) -> Result<LoadReport, TaskError> {
        self.authorize(actor, Operation::ViewTasks, None)?;
        let seq = self.sequencer.issue();
        debug!(%seq, "Loading tasks");
        let page = self
            .backend
            .list_tasks(query)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;

        let mut report = LoadReport {
            seq,
            outcome: LoadOutcome::Superseded,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        };
        let mut store = self.store_mut();
        report.outcome = self.sequencer.admit_load(seq);
        match report.outcome {
            LoadOutcome::Applied => {
                store.replace_all(page.data);
                info!(%seq, total = report.total, "Loaded tasks");
            }
            LoadOutcome::Superseded => info!(%seq, "Discarding superseded task load"),
        }
        Ok(report)
    }

    /// Fetch a single task and merge it into the store as loaded.
    ///
    /// Like a list load, the result is not merged when a request issued later
    /// has already been applied.
    ///
    /// # Errors
    /// Returns [`TaskError::NotFound`] for unknown ids.
    pub async fn fetch(&self, actor: &User, id: &TaskId) -> Result<Task, TaskError> {
        self.authorize(actor, Operation::ViewTasks, None)?;
        let seq = self.sequencer.issue();
        let task = self
            .backend
            .get_task(id)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;
        let mut store = self.store_mut();
        match self.sequencer.admit_load(seq) {
            LoadOutcome::Applied => {
                store.merge_loaded(task.clone());
            }
            LoadOutcome::Superseded => debug!(%seq, task = %id, "Discarding superseded task fetch"),
        }
        Ok(task)
    }

    /// Create a task.
    ///
    /// # Errors
    /// Returns [`TaskError::Unauthorized`] for roles that may not create tasks
    /// and [`TaskError::Validation`] for a blank title or a status outside the
    /// deployment profile.
    pub async fn create(&self, actor: &User, mut request: CreateTaskRequest) -> Result<Task, TaskError> {
        self.authorize(actor, Operation::CreateTask, None)?;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("title must not be empty".into()));
        }
        request.title = title.to_owned();
        let status = request.status.unwrap_or(self.profile.default_status());
        self.ensure_status_allowed(status)?;
        request.status = Some(status);

        let seq = self.sequencer.issue();
        let created = self
            .backend
            .create_task(actor, &request)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;
        let task = self.apply_upsert(seq, created);
        info!(task = %task.id, %seq, "Created task");
        Ok(task)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    /// Returns [`TaskError::Unauthorized`], [`TaskError::Validation`] for an
    /// empty update, a blank title or a disallowed status, and
    /// [`TaskError::NotFound`] when the task is not in the store.
    pub async fn update(&self, actor: &User, id: &TaskId, update: &TaskUpdate) -> Result<Task, TaskError> {
        let existing = self.existing(id);
        self.authorize(actor, Operation::EditTask, existing.as_ref())?;
        if update.is_empty() {
            return Err(TaskError::Validation("update contains no changes".into()));
        }
        if update.title.as_ref().is_some_and(|title| title.trim().is_empty()) {
            return Err(TaskError::Validation("title must not be empty".into()));
        }
        if let Some(status) = update.status {
            self.ensure_status_allowed(status)?;
        }
        if existing.is_none() {
            return Err(TaskError::NotFound(id.clone()));
        }

        let seq = self.sequencer.issue();
        let updated = self
            .backend
            .update_task(actor, id, update)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;
        let task = self.apply_upsert(seq, updated);
        info!(task = %task.id, %seq, "Updated task");
        Ok(task)
    }

    /// Move a task to another status.
    ///
    /// # Errors
    /// Returns [`TaskError::Unauthorized`], [`TaskError::Validation`] for a
    /// status outside the deployment profile and [`TaskError::NotFound`] when
    /// the task is not in the store.
    pub async fn change_status(&self, actor: &User, id: &TaskId, status: TaskStatus) -> Result<Task, TaskError> {
        let existing = self.existing(id);
        self.authorize(actor, Operation::ChangeStatus, existing.as_ref())?;
        self.ensure_status_allowed(status)?;
        if existing.is_none() {
            return Err(TaskError::NotFound(id.clone()));
        }

        let seq = self.sequencer.issue();
        let updated = self
            .backend
            .update_status(actor, id, status)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;
        let task = self.apply_upsert(seq, updated);
        info!(task = %task.id, %status, %seq, "Changed task status");
        Ok(task)
    }

    /// Delete a task.
    ///
    /// # Errors
    /// Returns [`TaskError::Unauthorized`] for roles that may not delete and
    /// [`TaskError::NotFound`] when the task is not in the store.
    pub async fn delete(&self, actor: &User, id: &TaskId) -> Result<(), TaskError> {
        let existing = self.existing(id);
        self.authorize(actor, Operation::DeleteTask, existing.as_ref())?;
        if existing.is_none() {
            return Err(TaskError::NotFound(id.clone()));
        }

        let seq = self.sequencer.issue();
        self.backend
            .delete_task(actor, id)
            .await
            .map_err(|err| dispatch_failed(seq, err))?;
        let mut store = self.store_mut();
        store.remove(id);
        self.sequencer.record_mutation(seq);
        info!(task = %id, %seq, "Deleted task");
        Ok(())
    }

    /// Read the audit log, newest first.
    ///
    /// # Errors
    /// Returns [`TaskError::Unauthorized`] for roles without audit access.
    pub async fn audit_log(&self, actor: &User) -> Result<Vec<AuditLogEntry>, TaskError> {
        self.authorize(actor, Operation::ViewAuditLog, None)?;
        let seq = self.sequencer.issue();
        self.backend
            .audit_log()
            .await
            .map_err(|err| dispatch_failed(seq, err))
    }
}
