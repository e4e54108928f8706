use taskboard_core::{
    AssigneeFilter, ParseTokenError, TaskFilter, TaskFilterBuilder as CoreTaskFilterBuilder, TaskPriority,
    TaskStatus, UserId, Visibility, parse_due_date,
};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

use crate::api::UNASSIGNED_TOKEN;

/// Assignee token resolved to the logged-in user.
pub const ME_TOKEN: &str = "me";

/// Error type returned while constructing task filters from user-facing inputs.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    #[error("invalid status: {token}")]
    InvalidStatus { token: String },
    #[error("invalid priority: {token}")]
    InvalidPriority { token: String },
    #[error("invalid visibility: {token}")]
    InvalidVisibility { token: String },
    #[error("'me' requires a logged-in user")]
    MissingCurrentUser,
    #[error("invalid {field} timestamp: {source}")]
    InvalidTimestamp {
        field: &'static str,
        #[source]
        source: time::error::Parse,
    },
}

impl FilterBuildError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::InvalidStatus { token } => format!(
                "Unknown status '{token}'. Use one of: {}.",
                TaskStatus::ALL.map(TaskStatus::as_str).join(", ")
            ),
            Self::InvalidPriority { token } => format!(
                "Unknown priority '{token}'. Use one of: {}.",
                TaskPriority::ALL.map(TaskPriority::as_str).join(", ")
            ),
            Self::InvalidVisibility { token } => {
                format!("Unknown visibility '{token}'. Use public or private.")
            }
            Self::MissingCurrentUser => format!("Log in before filtering by '{ME_TOKEN}'."),
            Self::InvalidTimestamp { field, .. } => {
                format!("The {field} must be a date (YYYY-MM-DD) or an RFC 3339 timestamp.")
            }
        }
    }
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`TaskFilter`] values.
#[derive(Debug, Clone, Default)]
pub struct TaskFilterBuilder {
    statuses: Vec<TaskStatus>,
    priorities: Vec<TaskPriority>,
    tags: Vec<String>,
    assignee: Option<AssigneeFilter>,
    created_by: Option<UserId>,
    visibility: Option<Visibility>,
    text: Option<String>,
}

impl TaskFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the status filter. Each token may hold a comma-separated list.
    ///
    /// # Errors
    /// Returns an error if a token is not a known status.
    pub fn with_statuses(mut self, tokens: &[String]) -> FilterBuildResult<Self> {
        for token in split_tokens(tokens) {
            let status = token
                .parse()
                .map_err(|err: ParseTokenError| FilterBuildError::InvalidStatus { token: err.token })?;
            self.statuses.push(status);
        }
        Ok(self)
    }

    /// Extend the priority filter. Each token may hold a comma-separated list.
    ///
    /// # Errors
    /// Returns an error if a token is not a known priority.
    pub fn with_priorities(mut self, tokens: &[String]) -> FilterBuildResult<Self> {
        for token in split_tokens(tokens) {
            let priority = token
                .parse()
                .map_err(|err: ParseTokenError| FilterBuildError::InvalidPriority { token: err.token })?;
            self.priorities.push(priority);
        }
        Ok(self)
    }

    /// Extend the tag filter (a task matches when it carries any of them).
    #[must_use]
    pub fn with_tags(mut self, tags: &[String]) -> Self {
        self.tags.extend(split_tokens(tags).map(str::to_owned));
        self
    }

    /// Constrain the assignee. Accepts a user id, `unassigned`, or `me`.
    ///
    /// # Errors
    /// Returns an error for `me` when no user is logged in.
    pub fn with_assignee(mut self, token: Option<&str>, me: Option<&UserId>) -> FilterBuildResult<Self> {
        let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
            return Ok(self);
        };
        self.assignee = Some(if token.eq_ignore_ascii_case(UNASSIGNED_TOKEN) {
            AssigneeFilter::Unassigned
        } else if token.eq_ignore_ascii_case(ME_TOKEN) {
            AssigneeFilter::User(me.cloned().ok_or(FilterBuildError::MissingCurrentUser)?)
        } else {
            AssigneeFilter::User(UserId::from(token))
        });
        Ok(self)
    }

    /// Constrain the author.
    #[must_use]
    pub fn with_created_by(mut self, author: Option<UserId>) -> Self {
        self.created_by = author;
        self
    }

    /// Constrain visibility (`public` or `private`).
    ///
    /// # Errors
    /// Returns an error for any other token.
    pub fn with_visibility(mut self, token: Option<&str>) -> FilterBuildResult<Self> {
        self.visibility = token.map(parse_visibility).transpose()?;
        Ok(self)
    }

    /// Configure the optional search text (whitespace-only inputs become `None`).
    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text.and_then(|raw| {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        });
        self
    }

    /// Build the final [`TaskFilter`].
    #[must_use]
    pub fn build(self) -> TaskFilter {
        let mut builder = CoreTaskFilterBuilder::new()
            .statuses(self.statuses)
            .priorities(self.priorities)
            .tags(self.tags);

        if let Some(assignee) = self.assignee {
            builder = builder.assignee(assignee);
        }
        if let Some(author) = self.created_by {
            builder = builder.created_by(author);
        }
        if let Some(visibility) = self.visibility {
            builder = builder.visibility(visibility);
        }
        if let Some(text) = self.text {
            builder = builder.text(text);
        }

        builder.build()
    }
}

fn split_tokens(tokens: &[String]) -> impl Iterator<Item = &str> {
    tokens
        .iter()
        .flat_map(|token| token.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Parse `public` or `private`.
///
/// # Errors
/// Returns an error for any other token.
pub fn parse_visibility(token: &str) -> FilterBuildResult<Visibility> {
    match token.trim().to_ascii_lowercase().as_str() {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        _ => Err(FilterBuildError::InvalidVisibility {
            token: token.to_owned(),
        }),
    }
}

/// Parse a due date (`YYYY-MM-DD` or RFC 3339), normalized to UTC.
///
/// # Errors
/// Returns an error naming `field` if the value does not parse.
pub fn parse_due(field: &'static str, value: &str) -> FilterBuildResult<OffsetDateTime> {
    parse_due_date(value)
        .map(normalize_timestamp)
        .map_err(|source| FilterBuildError::InvalidTimestamp { field, source })
}

/// Normalize timestamps to UTC to avoid offset mismatches across interfaces.
#[must_use]
pub const fn normalize_timestamp(dt: OffsetDateTime) -> OffsetDateTime {
    dt.to_offset(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn builder_collects_comma_separated_tokens() {
        let filter = TaskFilterBuilder::new()
            .with_statuses(&strings(&["todo,in-progress", " done "]))
            .and_then(|builder| builder.with_priorities(&strings(&["high"])))
            .unwrap_or_else(|err| panic!("build: {err}"))
            .with_tags(&strings(&["work,home"]))
            .with_text(Some("  report ".into()))
            .build();

        assert_eq!(filter.statuses.len(), 3);
        assert!(filter.statuses.contains(&TaskStatus::InProgress));
        assert!(filter.priorities.contains(&TaskPriority::High));
        assert_eq!(filter.tags.len(), 2);
        assert_eq!(filter.text.as_deref(), Some("report"));
    }

    #[test]
    fn unknown_tokens_are_reported() {
        let Err(err) = TaskFilterBuilder::new().with_statuses(&strings(&["todo,someday"])) else {
            panic!("unknown status must fail");
        };
        assert!(matches!(&err, FilterBuildError::InvalidStatus { token } if token == "someday"));
        assert!(err.describe_user_facing().contains("in-progress"));

        assert!(TaskFilterBuilder::new().with_priorities(&strings(&["extreme"])).is_err());
        assert!(TaskFilterBuilder::new().with_visibility(Some("secret")).is_err());
    }

    #[test]
    fn assignee_tokens_resolve() {
        let me = UserId::from("2");
        let mine = TaskFilterBuilder::new()
            .with_assignee(Some("me"), Some(&me))
            .unwrap_or_else(|err| panic!("me: {err}"))
            .build();
        assert_eq!(mine.assignee, Some(AssigneeFilter::User(me)));

        let nobody = TaskFilterBuilder::new()
            .with_assignee(Some("Unassigned"), None)
            .unwrap_or_else(|err| panic!("unassigned: {err}"))
            .build();
        assert_eq!(nobody.assignee, Some(AssigneeFilter::Unassigned));

        assert!(matches!(
            TaskFilterBuilder::new().with_assignee(Some("me"), None),
            Err(FilterBuildError::MissingCurrentUser)
        ));

        let blank = TaskFilterBuilder::new()
            .with_assignee(Some("  "), None)
            .unwrap_or_else(|err| panic!("blank: {err}"))
            .build();
        assert!(blank.is_empty());
    }

    #[test]
    fn due_dates_accept_plain_dates_and_offsets() {
        let plain = parse_due("due date", "2024-02-15").unwrap_or_else(|err| panic!("plain: {err}"));
        assert_eq!(plain, datetime!(2024-02-15 0:00 UTC));

        let offset = parse_due("due date", "2024-02-15T09:00:00+09:00").unwrap_or_else(|err| panic!("offset: {err}"));
        assert_eq!(offset, datetime!(2024-02-15 0:00 UTC));
        assert_eq!(offset.offset(), UtcOffset::UTC);

        let Err(err) = parse_due("due date", "next week") else {
            panic!("free text must fail");
        };
        assert!(err.describe_user_facing().starts_with("The due date"));
    }
}
