//! Audit trail of task mutations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskboard_core::{TaskId, User, UserId};
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Task created.
    Create,
    /// Task attributes edited.
    Update,
    /// Task deleted.
    Delete,
    /// Task moved to another status.
    StatusChange,
}

impl AuditAction {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::StatusChange => "STATUS_CHANGE",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Entry identifier.
    pub id: String,
    /// Recorded action.
    pub action: AuditAction,
    /// Kind of entity touched; always `task` today.
    pub entity_type: String,
    /// Identifier of the touched task.
    pub entity_id: TaskId,
    /// Acting user.
    pub user_id: UserId,
    /// Display name of the acting user at the time of the action.
    pub user_name: String,
    /// Action-specific payload.
    #[serde(default)]
    pub changes: Value,
    /// When the action happened.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl AuditLogEntry {
    /// Record `action` on `task` performed by `actor` at `now`.
    #[must_use]
    pub fn for_task(action: AuditAction, task: &TaskId, actor: &User, changes: Value, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            action,
            entity_type: "task".to_owned(),
            entity_id: task.clone(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            changes,
            timestamp: now,
        }
    }
}
