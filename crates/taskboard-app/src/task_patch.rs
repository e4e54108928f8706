use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use taskboard_core::{Task, TaskPriority, TaskStatus, UserId, Visibility};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Difference between two sets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// Entries present in the desired set but missing from the current set.
    pub added: Vec<T>,
    /// Entries present in the current set but removed from the desired set.
    pub removed: Vec<T>,
}

impl<T> SetDiff<T> {
    /// Returns true when both added/removed are empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute differences between two sets.
#[must_use]
pub fn diff_sets<T: Ord + Clone>(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff {
        added: desired.difference(current).cloned().collect(),
        removed: current.difference(desired).cloned().collect(),
    }
}

/// Patch for the due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuePatch {
    /// Set a new due date.
    Set(OffsetDateTime),
    /// Remove the due date.
    Clear,
}

/// Patch for the assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneePatch {
    /// Assign to the given user.
    Set(UserId),
    /// Leave the task unassigned.
    Clear,
}

/// Partial task update (`PUT /tasks/{id}`). Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Overwrite the title.
    pub title: Option<String>,
    /// Overwrite the description.
    pub description: Option<String>,
    /// Move to another status.
    pub status: Option<TaskStatus>,
    /// Overwrite the priority.
    pub priority: Option<TaskPriority>,
    /// Replace the tag list.
    pub tags: Option<Vec<String>>,
    /// Patch the due date.
    pub due_date: Option<DuePatch>,
    /// Patch the assignee.
    pub assignee: Option<AssigneePatch>,
    /// Overwrite visibility.
    pub visibility: Option<Visibility>,
}

impl TaskUpdate {
    /// Returns true when applying the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.due_date.is_none()
            && self.assignee.is_none()
            && self.visibility.is_none()
    }

    /// Write every present field into `task`. Timestamps are left to the caller.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(tags) = &self.tags {
            task.tags.clone_from(tags);
        }
        match &self.due_date {
            Some(DuePatch::Set(due)) => task.due_date = Some(*due),
            Some(DuePatch::Clear) => task.due_date = None,
            None => {}
        }
        match &self.assignee {
            Some(AssigneePatch::Set(user)) => task.assignee_id = Some(user.clone()),
            Some(AssigneePatch::Clear) => task.assignee_id = None,
            None => {}
        }
        if let Some(visibility) = self.visibility {
            task.visibility = Some(visibility);
        }
    }

    /// Describe what the update changes relative to `before` as a JSON object
    /// of `{field: {from, to}}` entries. Unchanged fields are omitted; tags are
    /// reported as added/removed sets.
    #[must_use]
    pub fn describe_changes(&self, before: &Task) -> Value {
        let mut after = before.clone();
        self.apply_to(&mut after);

        let mut changes = Map::new();
        let mut record = |field: &str, from: Value, to: Value| {
            if from != to {
                changes.insert(field.to_owned(), json!({ "from": from, "to": to }));
            }
        };
        record("title", before.title.as_str().into(), after.title.as_str().into());
        record(
            "description",
            before.description.as_str().into(),
            after.description.as_str().into(),
        );
        record("status", before.status.as_str().into(), after.status.as_str().into());
        record(
            "priority",
            before.priority.as_str().into(),
            after.priority.as_str().into(),
        );
        record("dueDate", format_due(before.due_date), format_due(after.due_date));
        record(
            "assigneeId",
            optional_str(before.assignee_id.as_ref().map(UserId::as_str)),
            optional_str(after.assignee_id.as_ref().map(UserId::as_str)),
        );
        record(
            "visibility",
            optional_str(before.visibility.map(Visibility::as_str)),
            optional_str(after.visibility.map(Visibility::as_str)),
        );

        let before_tags: BTreeSet<String> = before.tags.iter().cloned().collect();
        let after_tags: BTreeSet<String> = after.tags.iter().cloned().collect();
        let tag_diff = diff_sets(&before_tags, &after_tags);
        if !tag_diff.is_empty() {
            changes.insert(
                "tags".to_owned(),
                json!({ "added": tag_diff.added, "removed": tag_diff.removed }),
            );
        }
        Value::Object(changes)
    }
}

fn optional_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn format_due(due: Option<OffsetDateTime>) -> Value {
    due.and_then(|due| due.format(&Rfc3339).ok())
        .map_or(Value::Null, Value::from)
}
