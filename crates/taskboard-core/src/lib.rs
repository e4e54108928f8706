//! Domain types and pure view logic for taskboard.
//!
//! Everything here is synchronous and side-effect free: filtering, sorting,
//! statistics and the role policy operate on borrowed task slices.

/// Filter engine.
pub mod filter;
/// Identifier types.
pub mod id;
/// Role-based authorization.
pub mod policy;
/// Sort engine.
pub mod sort;
/// Statistics aggregator.
pub mod stats;
/// Status and priority vocabularies.
pub mod status;
/// Task record.
pub mod task;
/// Case-insensitive text search.
pub mod text_matcher;
/// User accounts and roles.
pub mod user;

pub use filter::{AssigneeFilter, TaskFilter, TaskFilterBuilder, filter_tasks};
pub use id::{TaskId, UserId};
pub use policy::{AccessPolicy, Operation, PolicyDenied, can_perform};
pub use sort::{SortDirection, SortField, TaskSort, sort_tasks};
pub use stats::TaskStats;
pub use status::{ParseTokenError, TaskPriority, TaskStatus};
pub use task::{Task, Visibility, parse_due_date};
pub use user::{Role, User};

/// Filter then sort, the order every visible list is derived in.
#[must_use]
pub fn view(tasks: &[Task], filter: &TaskFilter, sort: &TaskSort) -> Vec<Task> {
    let mut visible = filter_tasks(tasks, filter);
    sort.sort_in_place(&mut visible);
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn view_filters_before_sorting() {
        let now = datetime!(2024-03-01 12:00 UTC);
        let mut high = Task::new(TaskId::from("1"), "a", UserId::from("1"), now);
        high.priority = TaskPriority::High;
        let mut low = Task::new(TaskId::from("2"), "b", UserId::from("1"), now);
        low.priority = TaskPriority::Low;
        let mut done = Task::new(TaskId::from("3"), "c", UserId::from("1"), now);
        done.priority = TaskPriority::Urgent;
        done.status = TaskStatus::Done;

        let filter = TaskFilterBuilder::new().statuses([TaskStatus::Todo]).build();
        let sort = TaskSort::new(SortField::Priority, SortDirection::Desc);
        let visible = view(&[low, done, high], &filter, &sort);
        let ids: Vec<_> = visible.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
