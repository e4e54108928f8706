use std::fmt;
use thiserror::Error;

use crate::task::Task;
use crate::user::{Role, User};

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read the task list.
    ViewTasks,
    /// Create a task.
    CreateTask,
    /// Edit task attributes.
    EditTask,
    /// Delete a task.
    DeleteTask,
    /// Move a task to another status.
    ChangeStatus,
    /// Read the audit log.
    ViewAuditLog,
}

impl Operation {
    /// Every operation.
    pub const ALL: [Self; 6] = [
        Self::ViewTasks,
        Self::CreateTask,
        Self::EditTask,
        Self::DeleteTask,
        Self::ChangeStatus,
        Self::ViewAuditLog,
    ];

    /// Short name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewTasks => "view tasks",
            Self::CreateTask => "create tasks",
            Self::EditTask => "edit tasks",
            Self::DeleteTask => "delete tasks",
            Self::ChangeStatus => "change task status",
            Self::ViewAuditLog => "view the audit log",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role table. Pure and total; unknown roles may only view.
#[must_use]
pub const fn can_perform(role: Role, operation: Operation) -> bool {
    match (role, operation) {
        (_, Operation::ViewTasks) | (Role::Owner, _) => true,
        (Role::Admin, op) => !matches!(op, Operation::DeleteTask),
        (Role::Viewer | Role::Unrecognized, _) => false,
    }
}

/// Rejection produced by [`AccessPolicy::authorize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("role {role} may not {operation}")]
pub struct PolicyDenied {
    /// Role of the rejected user.
    pub role: Role,
    /// Operation that was attempted.
    pub operation: Operation,
}

/// Role table plus deployment-specific exceptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Let the assignee of a task change its status regardless of role.
    pub assignee_status_changes: bool,
}

impl AccessPolicy {
    /// Build a policy.
    #[must_use]
    pub const fn new(assignee_status_changes: bool) -> Self {
        Self {
            assignee_status_changes,
        }
    }

    /// Decide whether `user` may perform `operation`, optionally on `task`.
    ///
    /// # Errors
    /// Returns [`PolicyDenied`] when the operation is not permitted.
    pub fn authorize(&self, user: &User, operation: Operation, task: Option<&Task>) -> Result<(), PolicyDenied> {
        if can_perform(user.role, operation) {
            return Ok(());
        }
        if self.assignee_status_changes
            && operation == Operation::ChangeStatus
            && task.is_some_and(|task| task.is_assigned_to(&user.id))
        {
            return Ok(());
        }
        Err(PolicyDenied {
            role: user.role,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{TaskId, UserId};
    use time::OffsetDateTime;

    fn user(role: Role) -> User {
        User {
            id: UserId::from("7"),
            name: "Someone".into(),
            email: "someone@example.com".into(),
            role,
        }
    }

    #[test]
    fn role_table() {
        use Operation::{ChangeStatus, CreateTask, DeleteTask, EditTask, ViewAuditLog, ViewTasks};

        let expected = [
            (Role::Owner, [true, true, true, true, true, true]),
            (Role::Admin, [true, true, true, false, true, true]),
            (Role::Viewer, [true, false, false, false, false, false]),
            (Role::Unrecognized, [true, false, false, false, false, false]),
        ];
        let ops = [ViewTasks, CreateTask, EditTask, DeleteTask, ChangeStatus, ViewAuditLog];
        for (role, row) in expected {
            for (op, allowed) in ops.into_iter().zip(row) {
                assert_eq!(can_perform(role, op), allowed, "{role} / {op}");
            }
        }
    }

    #[test]
    fn owner_can_do_everything_and_viewer_never_deletes() {
        for op in Operation::ALL {
            assert!(can_perform(Role::Owner, op));
        }
        assert!(!can_perform(Role::Viewer, Operation::DeleteTask));
    }

    #[test]
    fn assignee_exception_only_covers_status_changes() {
        let viewer = user(Role::Viewer);
        let mut task = Task::new(TaskId::from("1"), "t", UserId::from("1"), OffsetDateTime::UNIX_EPOCH);
        task.assignee_id = Some(viewer.id.clone());

        let strict = AccessPolicy::default();
        let Err(denied) = strict.authorize(&viewer, Operation::ChangeStatus, Some(&task)) else {
            panic!("strict policy must deny viewers");
        };
        assert_eq!(denied.to_string(), "role viewer may not change task status");

        let relaxed = AccessPolicy::new(true);
        assert!(relaxed.authorize(&viewer, Operation::ChangeStatus, Some(&task)).is_ok());
        assert!(relaxed.authorize(&viewer, Operation::EditTask, Some(&task)).is_err());
        assert!(relaxed.authorize(&viewer, Operation::ChangeStatus, None).is_err());

        task.assignee_id = Some(UserId::from("8"));
        assert!(relaxed.authorize(&viewer, Operation::ChangeStatus, Some(&task)).is_err());
    }
}
