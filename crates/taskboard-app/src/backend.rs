//! Backend boundaries.
//!
//! The traits mirror the REST contract (`/tasks`, `/auth`). The acting user is
//! passed explicitly so in-process backends can attribute changes without a
//! transport-level token.

use std::sync::Arc;

use taskboard_core::{Task, TaskId, TaskStatus, User};

use crate::api::{AuthResponse, CreateTaskRequest, LoginRequest, TaskPage, TaskQuery};
use crate::audit::AuditLogEntry;
use crate::error::{AuthError, BackendError};
use crate::task_patch::TaskUpdate;

/// Task endpoints.
#[allow(async_fn_in_trait)]
pub trait TaskBackend: Send + Sync {
    /// `GET /tasks`
    ///
    /// # Errors
    /// Returns a backend error when the list cannot be produced.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, BackendError>;

    /// `GET /tasks/{id}`
    ///
    /// # Errors
    /// Returns [`BackendError::NotFound`] for unknown ids.
    async fn get_task(&self, id: &TaskId) -> Result<Task, BackendError>;

    /// `POST /tasks`
    ///
    /// # Errors
    /// Returns a backend error when the task cannot be created.
    async fn create_task(&self, actor: &User, request: &CreateTaskRequest) -> Result<Task, BackendError>;

    /// `PUT /tasks/{id}`
    ///
    /// # Errors
    /// Returns [`BackendError::NotFound`] for unknown ids.
    async fn update_task(&self, actor: &User, id: &TaskId, update: &TaskUpdate) -> Result<Task, BackendError>;

    /// `DELETE /tasks/{id}`
    ///
    /// # Errors
    /// Returns [`BackendError::NotFound`] for unknown ids.
    async fn delete_task(&self, actor: &User, id: &TaskId) -> Result<(), BackendError>;

    /// `PATCH /tasks/{id}/status`
    ///
    /// # Errors
    /// Returns [`BackendError::NotFound`] for unknown ids.
    async fn update_status(&self, actor: &User, id: &TaskId, status: TaskStatus) -> Result<Task, BackendError>;

    /// `GET /tasks/audit-log`, newest first.
    ///
    /// # Errors
    /// Returns a backend error when the log cannot be read.
    async fn audit_log(&self) -> Result<Vec<AuditLogEntry>, BackendError>;
}

/// Authentication endpoints.
#[allow(async_fn_in_trait)]
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/login`
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] for unknown accounts or wrong passwords.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError>;

    /// `POST /auth/logout`
    ///
    /// # Errors
    /// Returns an error when the backend cannot be reached.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;

    /// `POST /auth/refresh`
    ///
    /// # Errors
    /// Returns [`AuthError::TokenExpired`] when `token` can no longer be refreshed.
    async fn refresh(&self, token: &str) -> Result<AuthResponse, AuthError>;

    /// `GET /auth/me`
    ///
    /// # Errors
    /// Returns [`AuthError::TokenExpired`] or [`AuthError::MalformedToken`] for unusable tokens.
    async fn profile(&self, token: &str) -> Result<User, AuthError>;
}

impl<B: TaskBackend> TaskBackend for Arc<B> {
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, BackendError> {
        (**self).list_tasks(query).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, BackendError> {
        (**self).get_task(id).await
    }

    async fn create_task(&self, actor: &User, request: &CreateTaskRequest) -> Result<Task, BackendError> {
        (**self).create_task(actor, request).await
    }

    async fn update_task(&self, actor: &User, id: &TaskId, update: &TaskUpdate) -> Result<Task, BackendError> {
        (**self).update_task(actor, id, update).await
    }

    async fn delete_task(&self, actor: &User, id: &TaskId) -> Result<(), BackendError> {
        (**self).delete_task(actor, id).await
    }

    async fn update_status(&self, actor: &User, id: &TaskId, status: TaskStatus) -> Result<Task, BackendError> {
        (**self).update_status(actor, id, status).await
    }

    async fn audit_log(&self) -> Result<Vec<AuditLogEntry>, BackendError> {
        (**self).audit_log().await
    }
}
