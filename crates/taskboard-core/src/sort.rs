use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::{fmt, str::FromStr};
use time::OffsetDateTime;

use crate::status::ParseTokenError;
use crate::task::Task;

/// Task attribute a list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Case-insensitive title.
    Title,
    /// Priority rank.
    Priority,
    /// Due date; absent dates sort as the epoch.
    DueDate,
    /// Creation timestamp.
    CreatedAt,
    /// Last update timestamp.
    UpdatedAt,
    /// Workflow rank.
    Status,
}

impl SortField {
    /// Wire representation (`sortBy` query value).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Priority => "priority",
            Self::DueDate => "dueDate",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
            Self::Status => "status",
        }
    }

    /// Compare two tasks on this field in ascending order.
    #[must_use]
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::Title => compare_case_insensitive(&a.title, &b.title),
            Self::Priority => a.priority.rank().cmp(&b.priority.rank()),
            Self::DueDate => due_key(a).cmp(&due_key(b)),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::Status => a.status.rank().cmp(&b.status.rank()),
        }
    }
}

fn due_key(task: &Task) -> OffsetDateTime {
    task.due_date.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

impl FromStr for SortField {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "title" => Ok(Self::Title),
            "priority" => Ok(Self::Priority),
            "duedate" | "due" => Ok(Self::DueDate),
            "createdat" | "created" => Ok(Self::CreatedAt),
            "updatedat" | "updated" => Ok(Self::UpdatedAt),
            "status" => Ok(Self::Status),
            _ => Err(ParseTokenError {
                kind: "sort field",
                token: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// Wire representation (`sortOrder` query value).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ParseTokenError {
                kind: "sort direction",
                token: s.to_owned(),
            }),
        }
    }
}

/// Field + direction pair determining display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskSort {
    /// Field to compare.
    pub field: SortField,
    /// Direction of the ordering.
    pub direction: SortDirection,
}

impl Default for TaskSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl TaskSort {
    /// Construct sort criteria.
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Compare two tasks honoring the direction. Equal keys compare equal in both directions.
    #[must_use]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Sort a slice in place with a stable algorithm.
    pub fn sort_in_place(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

impl FromStr for TaskSort {
    type Err = ParseTokenError;

    /// Parse `field` or `field:direction` (direction defaults to ascending).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field.parse()?, direction.parse()?),
            None => (s.parse()?, SortDirection::Asc),
        };
        Ok(Self { field, direction })
    }
}

impl fmt::Display for TaskSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction.as_str())
    }
}

/// Return a sorted copy of `tasks`. Equal keys keep their relative input order.
#[must_use]
pub fn sort_tasks(tasks: &[Task], sort: &TaskSort) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sort.sort_in_place(&mut sorted);
    sorted
}
