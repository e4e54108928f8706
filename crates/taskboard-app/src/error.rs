//! Error types surfaced by the application layer.

use taskboard_core::{Operation, PolicyDenied, Role, TaskId};
use taskboard_store_fs::StoreError;
use thiserror::Error;

/// Failure reported by a [`crate::backend::TaskBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested task does not exist on the backend.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// The backend refused the payload.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The backend requires a fresh session (HTTP 401).
    #[error("authentication required")]
    Unauthenticated,
    /// Transport or server failure.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// Persisted backend state could not be read or written.
    #[error("backend storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Failure reported by an [`crate::backend::AuthBackend`] or the session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Token lifetime has elapsed.
    #[error("token expired")]
    TokenExpired,
    /// Token could not be decoded.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// No session is active.
    #[error("not logged in")]
    NotLoggedIn,
    /// Transport or server failure.
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
    /// Session state could not be persisted.
    #[error("session storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Unified error returned by gateway and session operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Input failed validation before reaching the backend.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The acting user's role does not permit the operation.
    #[error("role {role} is not allowed to {operation}")]
    Unauthorized {
        /// Role of the acting user.
        role: Role,
        /// Rejected operation.
        operation: Operation,
    },
    /// Target task is unknown.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// Backend request failed.
    #[error("request failed: {0}")]
    Network(String),
    /// Session is missing or expired.
    #[error("session expired")]
    AuthExpired,
    /// Local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TaskError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::Validation(reason) => format!("Invalid input: {reason}"),
            Self::Unauthorized { role, operation } => {
                format!("Your role ({role}) does not allow you to {operation}.")
            }
            Self::NotFound(id) => format!("Task {id} does not exist."),
            Self::Network(_) => "Could not reach the task service. Please try again.".to_owned(),
            Self::AuthExpired => "Your session has expired. Please log in again.".to_owned(),
            Self::Storage(_) => "Local data could not be read or written.".to_owned(),
        }
    }

    /// Whether the caller should drop the session and ask for a new login.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

impl From<PolicyDenied> for TaskError {
    fn from(denied: PolicyDenied) -> Self {
        Self::Unauthorized {
            role: denied.role,
            operation: denied.operation,
        }
    }
}

impl From<BackendError> for TaskError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(id) => Self::NotFound(id),
            BackendError::Rejected(reason) => Self::Validation(reason),
            BackendError::Unauthenticated => Self::AuthExpired,
            BackendError::Unavailable(message) => Self::Network(message),
            BackendError::Storage(source) => Self::Storage(source),
        }
    }
}

impl From<AuthError> for TaskError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Validation(err.to_string()),
            AuthError::TokenExpired | AuthError::MalformedToken(_) | AuthError::NotLoggedIn => {
                Self::AuthExpired
            }
            AuthError::Unavailable(message) => Self::Network(message),
            AuthError::Storage(source) => Self::Storage(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_map_onto_task_errors() {
        let id = TaskId::from("42");
        assert!(matches!(
            TaskError::from(BackendError::NotFound(id.clone())),
            TaskError::NotFound(found) if found == id
        ));
        assert!(TaskError::from(BackendError::Unauthenticated).requires_login());
        assert!(matches!(
            TaskError::from(BackendError::Unavailable("timeout".into())),
            TaskError::Network(_)
        ));
    }

    #[test]
    fn auth_errors_map_onto_task_errors() {
        assert!(TaskError::from(AuthError::TokenExpired).requires_login());
        assert!(TaskError::from(AuthError::MalformedToken("x".into())).requires_login());
        let TaskError::Validation(reason) = TaskError::from(AuthError::InvalidCredentials) else {
            panic!("bad credentials are a validation failure");
        };
        assert_eq!(reason, "invalid email or password");
    }

    #[test]
    fn user_facing_messages_hide_transport_details() {
        let err = TaskError::Network("connection reset by peer at 10.0.0.1".into());
        assert!(!err.describe_user_facing().contains("10.0.0.1"));

        let denied = TaskError::from(PolicyDenied {
            role: Role::Viewer,
            operation: Operation::DeleteTask,
        });
        assert_eq!(
            denied.describe_user_facing(),
            "Your role (viewer) does not allow you to delete tasks."
        );
    }
}
