//! Request and response payloads exchanged with task and auth backends.

use serde::{Deserialize, Serialize};
use taskboard_core::{
    AssigneeFilter, Task, TaskFilter, TaskPriority, TaskSort, TaskStatus, User, UserId, Visibility,
};
use time::OffsetDateTime;

/// Page size used when a list query does not specify one.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Wire token for [`AssigneeFilter::Unassigned`] in list queries.
pub const UNASSIGNED_TOKEN: &str = "unassigned";

/// One page of a paginated list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Number of items across all pages.
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    /// Maximum number of items per page.
    pub limit: usize,
    /// `ceil(total / limit)`.
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut `items` into the requested page. Zero page/limit values are clamped to one.
    #[must_use]
    pub fn paginate(items: Vec<T>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = items.len();
        let start = (page - 1).saturating_mul(limit);
        let data = items.into_iter().skip(start).take(limit).collect();
        Self {
            data,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// Parameters of a `GET /tasks` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Server-side filter.
    pub filter: TaskFilter,
    /// Server-side sort; the backend default applies when absent.
    pub sort: Option<TaskSort>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
}

impl TaskQuery {
    /// Effective page number.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1)
    }

    /// Encode as query-string pairs in the order the REST contract lists them.
    ///
    /// Multi-valued fields are joined with commas. Author and visibility
    /// constraints have no query parameter and are applied client-side only.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let filter = &self.filter;
        let mut pairs = Vec::new();
        if !filter.statuses.is_empty() {
            pairs.push(("status", join(filter.statuses.iter().map(|status| status.as_str()))));
        }
        if !filter.priorities.is_empty() {
            pairs.push((
                "priority",
                join(filter.priorities.iter().map(|priority| priority.as_str())),
            ));
        }
        if !filter.tags.is_empty() {
            pairs.push(("category", join(filter.tags.iter().map(String::as_str))));
        }
        match &filter.assignee {
            Some(AssigneeFilter::User(user)) => pairs.push(("assigneeId", user.to_string())),
            Some(AssigneeFilter::Unassigned) => pairs.push(("assigneeId", UNASSIGNED_TOKEN.to_owned())),
            None => {}
        }
        if let Some(text) = filter.text.as_deref().map(str::trim)
            && !text.is_empty()
        {
            pairs.push(("search", text.to_owned()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sortBy", sort.field.as_str().to_owned()));
            pairs.push(("sortOrder", sort.direction.as_str().to_owned()));
        }
        pairs.push(("page", self.page().to_string()));
        pairs.push(("limit", self.limit().to_string()));
        pairs
    }
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(",")
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title; must not be blank.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Initial status; the deployment default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Priority.
    pub priority: TaskPriority,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional due date.
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<OffsetDateTime>,
    /// Optional assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    /// Optional visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl CreateTaskRequest {
    /// Request with the given title and default attributes.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: None,
            priority: TaskPriority::Medium,
            tags: Vec::new(),
            due_date: None,
            assignee_id: None,
            visibility: None,
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Response of `POST /auth/login` and `POST /auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token.
    pub token: String,
    /// Authenticated account.
    pub user: User,
}

/// Page of tasks returned by a list load.
pub type TaskPage = Page<Task>;

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::{SortDirection, SortField, TaskFilterBuilder};

    #[test]
    fn paginate_computes_total_pages() {
        let page = Page::paginate((1..=7).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.data, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);

        let last = Page::paginate((1..=7).collect::<Vec<_>>(), 3, 3);
        assert_eq!(last.data, vec![7]);

        let beyond = Page::paginate((1..=7).collect::<Vec<_>>(), 9, 3);
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total, 7);
    }

    #[test]
    fn paginate_handles_empty_input_and_zero_arguments() {
        let page = Page::<u8>::paginate(Vec::new(), 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn page_serializes_camel_case() {
        let value = serde_json::to_value(Page::paginate(vec![1], 1, 50))
            .unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(value["totalPages"], 1);
        assert_eq!(value["limit"], 50);
    }

    #[test]
    fn default_query_only_carries_paging() {
        let pairs = TaskQuery::default().to_query_pairs();
        assert_eq!(pairs, vec![("page", "1".to_owned()), ("limit", "50".to_owned())]);
    }

    #[test]
    fn query_pairs_follow_rest_contract() {
        let query = TaskQuery {
            filter: TaskFilterBuilder::new()
                .statuses([TaskStatus::InProgress, TaskStatus::Todo])
                .priorities([TaskPriority::High])
                .tags(["work", "home"])
                .assignee(AssigneeFilter::User(UserId::from("2")))
                .text("  report ")
                .build(),
            sort: Some(TaskSort::new(SortField::DueDate, SortDirection::Asc)),
            page: Some(2),
            limit: Some(10),
        };
        let pairs = query.to_query_pairs();
        let expected = vec![
            ("status", "todo,in-progress".to_owned()),
            ("priority", "high".to_owned()),
            ("category", "home,work".to_owned()),
            ("assigneeId", "2".to_owned()),
            ("search", "report".to_owned()),
            ("sortBy", "dueDate".to_owned()),
            ("sortOrder", "asc".to_owned()),
            ("page", "2".to_owned()),
            ("limit", "10".to_owned()),
        ];
        assert_eq!(pairs, expected);
    }

    #[test]
    fn unassigned_filter_uses_reserved_token() {
        let query = TaskQuery {
            filter: TaskFilterBuilder::new().assignee(AssigneeFilter::Unassigned).build(),
            ..TaskQuery::default()
        };
        assert!(query.to_query_pairs().contains(&("assigneeId", UNASSIGNED_TOKEN.to_owned())));
    }

    #[test]
    fn create_request_accepts_minimal_body() {
        let json = r#"{"title":"Write docs","priority":"low"}"#;
        let request: CreateTaskRequest =
            serde_json::from_str(json).unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(request.title, "Write docs");
        assert!(request.status.is_none());
        assert!(request.due_date.is_none());
    }
}
