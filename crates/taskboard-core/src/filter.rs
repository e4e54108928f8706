use std::collections::BTreeSet;

use crate::id::UserId;
use crate::status::{TaskPriority, TaskStatus};
use crate::task::{Task, Visibility};
use crate::text_matcher::TextMatcher;

/// Constraint on the assignee of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeFilter {
    /// Only tasks without an assignee.
    Unassigned,
    /// Only tasks assigned to exactly this user.
    User(UserId),
}

impl AssigneeFilter {
    fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Unassigned => task.assignee_id.is_none(),
            Self::User(user) => task.is_assigned_to(user),
        }
    }
}

/// Optional constraints narrowing a task list.
///
/// Fields are combined with logical AND; multi-valued fields match when any
/// of their values matches. Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Accepted statuses.
    pub statuses: BTreeSet<TaskStatus>,
    /// Accepted priorities.
    pub priorities: BTreeSet<TaskPriority>,
    /// A task passes when it carries at least one of these tags.
    pub tags: BTreeSet<String>,
    /// Assignee constraint.
    pub assignee: Option<AssigneeFilter>,
    /// Author constraint.
    pub created_by: Option<UserId>,
    /// Visibility constraint.
    pub visibility: Option<Visibility>,
    /// Free-text query over title and description.
    pub text: Option<String>,
}

impl TaskFilter {
    /// Returns true when the filter imposes no constraint at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.tags.is_empty()
            && self.assignee.is_none()
            && self.created_by.is_none()
            && self.visibility.is_none()
            && self.text.as_deref().is_none_or(|text| text.trim().is_empty())
    }

    /// Check a single task against every present constraint.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.compile().matches(task)
    }

    /// Overlay `update` on top of this filter; fields present in `update` win.
    #[must_use]
    pub fn merge(mut self, update: Self) -> Self {
        if !update.statuses.is_empty() {
            self.statuses = update.statuses;
        }
        if !update.priorities.is_empty() {
            self.priorities = update.priorities;
        }
        if !update.tags.is_empty() {
            self.tags = update.tags;
        }
        if update.assignee.is_some() {
            self.assignee = update.assignee;
        }
        if update.created_by.is_some() {
            self.created_by = update.created_by;
        }
        if update.visibility.is_some() {
            self.visibility = update.visibility;
        }
        if update.text.is_some() {
            self.text = update.text;
        }
        self
    }

    fn compile(&self) -> CompiledFilter<'_> {
        CompiledFilter {
            filter: self,
            text: self.text.as_deref().and_then(TextMatcher::new),
        }
    }
}

struct CompiledFilter<'a> {
    filter: &'a TaskFilter,
    text: Option<TextMatcher>,
}

impl CompiledFilter<'_> {
    fn matches(&self, task: &Task) -> bool {
        let filter = self.filter;
        if !filter.statuses.is_empty() && !filter.statuses.contains(&task.status) {
            return false;
        }
        if !filter.priorities.is_empty() && !filter.priorities.contains(&task.priority) {
            return false;
        }
        if !filter.tags.is_empty() && !task.tags.iter().any(|tag| filter.tags.contains(tag)) {
            return false;
        }
        if let Some(assignee) = &filter.assignee
            && !assignee.matches(task)
        {
            return false;
        }
        if let Some(author) = &filter.created_by
            && task.created_by != *author
        {
            return false;
        }
        if let Some(visibility) = filter.visibility
            && task.visibility != Some(visibility)
        {
            return false;
        }
        self.text.as_ref().is_none_or(|matcher| matcher.matches(task))
    }
}

/// Return the tasks that satisfy `filter`, preserving input order.
#[must_use]
pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    if filter.is_empty() {
        return tasks.to_vec();
    }
    let compiled = filter.compile();
    tasks
        .iter()
        .filter(|task| compiled.matches(task))
        .cloned()
        .collect()
}

/// Fluent builder for [`TaskFilter`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilterBuilder {
    filter: TaskFilter,
}

impl TaskFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any of the given statuses.
    #[must_use]
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.filter.statuses.extend(statuses);
        self
    }

    /// Accept any of the given priorities.
    #[must_use]
    pub fn priorities(mut self, priorities: impl IntoIterator<Item = TaskPriority>) -> Self {
        self.filter.priorities.extend(priorities);
        self
    }

    /// Require at least one of the given tags.
    #[must_use]
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.filter.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Constrain the assignee.
    #[must_use]
    pub fn assignee(mut self, assignee: AssigneeFilter) -> Self {
        self.filter.assignee = Some(assignee);
        self
    }

    /// Constrain the author.
    #[must_use]
    pub fn created_by(mut self, author: UserId) -> Self {
        self.filter.created_by = Some(author);
        self
    }

    /// Constrain visibility.
    #[must_use]
    pub const fn visibility(mut self, visibility: Visibility) -> Self {
        self.filter.visibility = Some(visibility);
        self
    }

    /// Free-text search; blank input is ignored.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        self.filter.text = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> TaskFilter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use time::macros::datetime;

    fn task(id: &str, status: TaskStatus, priority: TaskPriority) -> Task {
        let mut task = Task::new(
            TaskId::from(id),
            format!("task {id}"),
            UserId::from("1"),
            datetime!(2024-01-15 10:00 UTC),
        );
        task.status = status;
        task.priority = priority;
        task
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    fn fixture() -> Vec<Task> {
        let mut first = task("1", TaskStatus::Todo, TaskPriority::High);
        first.tags = vec!["work".into()];
        first.assignee_id = Some(UserId::from("2"));
        first.description = "Quarterly REPORT".into();

        let mut second = task("2", TaskStatus::Done, TaskPriority::Low);
        second.tags = vec!["home".into(), "shopping".into()];

        let mut third = task("3", TaskStatus::InProgress, TaskPriority::High);
        third.assignee_id = Some(UserId::from("22"));
        third.visibility = Some(Visibility::Public);
        third.created_by = UserId::from("3");

        vec![first, second, third]
    }

    #[test]
    fn empty_filter_is_identity() {
        let tasks = fixture();
        assert!(TaskFilter::default().is_empty());
        assert_eq!(filter_tasks(&tasks, &TaskFilter::default()), tasks);
    }

    #[test]
    fn status_filter_preserves_order() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new()
            .statuses([TaskStatus::InProgress, TaskStatus::Todo])
            .build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1", "3"]);
    }

    #[test]
    fn fields_combine_with_and() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new()
            .priorities([TaskPriority::High])
            .statuses([TaskStatus::Todo])
            .build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1"]);
    }

    #[test]
    fn tags_match_any() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new().tags(["shopping", "work"]).build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1", "2"]);
    }

    #[test]
    fn assignee_is_exact_match() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new()
            .assignee(AssigneeFilter::User(UserId::from("2")))
            .build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1"]);
    }

    #[test]
    fn unassigned_matches_absent_assignee_only() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new().assignee(AssigneeFilter::Unassigned).build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["2"]);
    }

    #[test]
    fn author_and_visibility_constraints() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new().created_by(UserId::from("3")).build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["3"]);

        let filter = TaskFilterBuilder::new().visibility(Visibility::Public).build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["3"]);
    }

    #[test]
    fn text_searches_title_or_description() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new().text("report").build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["1"]);

        let filter = TaskFilterBuilder::new().text("TASK 2").build();
        assert_eq!(ids(&filter_tasks(&tasks, &filter)), vec!["2"]);
    }

    #[test]
    fn blank_text_is_not_a_constraint() {
        let filter = TaskFilterBuilder::new().text("   ").build();
        assert!(filter.is_empty());

        let raw = TaskFilter {
            text: Some("  ".into()),
            ..TaskFilter::default()
        };
        assert!(raw.is_empty());
        assert_eq!(filter_tasks(&fixture(), &raw).len(), 3);
    }

    #[test]
    fn filtering_is_idempotent() {
        let tasks = fixture();
        let filter = TaskFilterBuilder::new()
            .priorities([TaskPriority::High])
            .text("task")
            .build();
        let once = filter_tasks(&tasks, &filter);
        let twice = filter_tasks(&once, &filter);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_overlays_present_fields() {
        let base = TaskFilterBuilder::new()
            .statuses([TaskStatus::Todo])
            .text("report")
            .build();
        let update = TaskFilterBuilder::new().priorities([TaskPriority::Low]).build();
        let merged = base.merge(update);
        assert!(merged.statuses.contains(&TaskStatus::Todo));
        assert!(merged.priorities.contains(&TaskPriority::Low));
        assert_eq!(merged.text.as_deref(), Some("report"));
    }

    #[test]
    fn two_task_scenario_filters_by_todo() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let mut first = task("1", TaskStatus::Todo, TaskPriority::High);
        first.due_date = Some(now - time::Duration::days(1));
        let mut second = task("2", TaskStatus::Done, TaskPriority::Low);
        second.due_date = Some(now - time::Duration::days(1));

        let filter = TaskFilterBuilder::new().statuses([TaskStatus::Todo]).build();
        assert_eq!(ids(&filter_tasks(&[first, second], &filter)), vec!["1"]);
    }
}
