use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::id::{TaskId, UserId};
use crate::status::{TaskPriority, TaskStatus};

/// Whether a task is visible outside its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone.
    Public,
    /// Visible to members only.
    Private,
}

impl Visibility {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// A unit of trackable work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Free-form description (may be empty).
    #[serde(default)]
    pub description: String,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Free-form labels. A single `category` is accepted as a one-element list.
    #[serde(default, alias = "category", deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
    /// Optional due date.
    #[serde(default, with = "due_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<OffsetDateTime>,
    /// Optional visibility flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Author of the task.
    #[serde(alias = "createdById")]
    pub created_by: UserId,
    /// Current assignee, if any.
    #[serde(default, alias = "assignedTo", skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    /// Creation timestamp; immutable once set.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Timestamp of the latest mutation; never earlier than `created_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// Create a task with default attributes, stamped at `now`.
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, created_by: UserId, now: OffsetDateTime) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            tags: Vec::new(),
            due_date: None,
            visibility: None,
            created_by,
            assignee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A task is overdue when its due date lies strictly before `now` and it is not done.
    #[must_use]
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < now)
    }

    /// Whether `user` is the current assignee.
    #[must_use]
    pub fn is_assigned_to(&self, user: &UserId) -> bool {
        self.assignee_id.as_ref() == Some(user)
    }

    /// Refresh `updated_at`, keeping it monotonic and never before `created_at`.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}

/// Parse a due date given either as RFC 3339 or as a plain `YYYY-MM-DD` date (midnight UTC).
///
/// # Errors
/// Returns an error if the input matches neither format.
pub fn parse_due_date(input: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let trimmed = input.trim();
    OffsetDateTime::parse(trimmed, &Rfc3339).or_else(|err| {
        Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
            .map(|date| date.midnight().assume_utc())
            .map_err(|_| err)
    })
}

fn one_or_many<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(d)? {
        None => Vec::new(),
        Some(OneOrMany::One(tag)) if tag.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(tag)) => vec![tag],
        Some(OneOrMany::Many(tags)) => tags,
    })
}

mod due_date {
    use serde::{Deserialize, Deserializer, Serializer, de, ser};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(due) => {
                let text = due.format(&Rfc3339).map_err(ser::Error::custom)?;
                s.serialize_some(&text)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.filter(|text| !text.trim().is_empty())
            .map(|text| super::parse_due_date(&text))
            .transpose()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    fn sample(now: OffsetDateTime) -> Task {
        Task::new(TaskId::from("1"), "Design landing page", UserId::from("1"), now)
    }

    #[test]
    fn deserializes_board_profile_payload() {
        let json = r#"{
            "id": "1",
            "title": "Design new landing page",
            "description": "Create a modern landing page",
            "status": "completed",
            "priority": "high",
            "category": "work",
            "dueDate": "2024-02-15",
            "createdAt": "2024-01-15T10:00:00Z",
            "updatedAt": "2024-01-15T10:00:00Z",
            "assigneeId": "2",
            "createdById": "1"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.tags, vec!["work".to_owned()]);
        assert_eq!(task.due_date, Some(datetime!(2024-02-15 0:00 UTC)));
        assert_eq!(task.assignee_id, Some(UserId::from("2")));
        assert_eq!(task.created_by, UserId::from("1"));
    }

    #[test]
    fn deserializes_workspace_profile_payload() {
        let json = r#"{
            "id": "t-9",
            "title": "Review",
            "description": "",
            "status": "IN_REVIEW",
            "priority": "URGENT",
            "tags": ["ops", "infra"],
            "dueDate": null,
            "visibility": "public",
            "createdBy": "u1",
            "assignedTo": null,
            "createdAt": "2024-01-15T10:00:00Z",
            "updatedAt": "2024-01-16T10:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(task.status, TaskStatus::InReview);
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert_eq!(task.tags.len(), 2);
        assert!(task.due_date.is_none());
        assert!(task.assignee_id.is_none());
        assert_eq!(task.visibility, Some(Visibility::Public));
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_fields() {
        let task = sample(datetime!(2024-01-15 10:00 UTC));
        let value = serde_json::to_value(&task).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(value["createdBy"], "1");
        assert_eq!(value["createdAt"], "2024-01-15T10:00:00Z");
        assert!(value.get("dueDate").is_none());
        assert!(value.get("assigneeId").is_none());
    }

    #[test]
    fn overdue_requires_past_due_date_and_open_status() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let mut task = sample(now);
        assert!(!task.is_overdue(now));

        task.due_date = Some(now - Duration::days(1));
        assert!(task.is_overdue(now));

        task.due_date = Some(now);
        assert!(!task.is_overdue(now), "due exactly now is not strictly before");

        task.due_date = Some(now - Duration::days(1));
        task.status = TaskStatus::Done;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn touch_never_moves_backwards() {
        let created = datetime!(2024-01-15 10:00 UTC);
        let mut task = sample(created);
        task.touch(created + Duration::hours(1));
        assert_eq!(task.updated_at, created + Duration::hours(1));

        task.touch(created - Duration::hours(5));
        assert_eq!(task.updated_at, created + Duration::hours(1));
        assert_eq!(task.created_at, created);
    }

    #[test]
    fn parse_due_date_accepts_both_formats() {
        let day = parse_due_date("2024-02-15").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(day, datetime!(2024-02-15 0:00 UTC));
        let exact = parse_due_date("2024-02-15T09:30:00+09:00").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(exact.unix_timestamp(), datetime!(2024-02-15 0:30 UTC).unix_timestamp());
        assert!(parse_due_date("next tuesday").is_err());
    }
}
