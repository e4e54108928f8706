use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::status::{TaskPriority, TaskStatus};
use crate::task::Task;

/// Aggregate counts over a task list.
///
/// Maps only contain keys that occur at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Count per status.
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Count per priority.
    pub by_priority: BTreeMap<TaskPriority, usize>,
    /// Tasks whose due date lies in the past and which are not done.
    pub overdue: usize,
}

impl TaskStats {
    /// Compute statistics against an explicit clock reading.
    #[must_use]
    pub fn aggregate(tasks: &[Task], now: OffsetDateTime) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            *stats.by_status.entry(task.status).or_default() += 1;
            *stats.by_priority.entry(task.priority).or_default() += 1;
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            stats
        })
    }

    /// Compute statistics against the current wall clock.
    #[must_use]
    pub fn aggregate_now(tasks: &[Task]) -> Self {
        Self::aggregate(tasks, OffsetDateTime::now_utc())
    }

    /// Count for a single status, zero when absent.
    #[must_use]
    pub fn status_count(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or_default()
    }

    /// Count for a single priority, zero when absent.
    #[must_use]
    pub fn priority_count(&self, priority: TaskPriority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{TaskId, UserId};
    use time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn task(id: &str, status: TaskStatus, priority: TaskPriority, due: Option<OffsetDateTime>) -> Task {
        let mut task = Task::new(TaskId::from(id), format!("task {id}"), UserId::from("1"), NOW);
        task.status = status;
        task.priority = priority;
        task.due_date = due;
        task
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = TaskStats::aggregate(&[], NOW);
        assert_eq!(stats, TaskStats::default());
        assert!(stats.by_status.is_empty());
        assert!(stats.by_priority.is_empty());
    }

    #[test]
    fn two_task_scenario() {
        let yesterday = Some(NOW - Duration::days(1));
        let tasks = vec![
            task("1", TaskStatus::Todo, TaskPriority::High, yesterday),
            task("2", TaskStatus::Done, TaskPriority::Low, yesterday),
        ];
        let stats = TaskStats::aggregate(&tasks, NOW);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.status_count(TaskStatus::Todo), 1);
        assert_eq!(stats.status_count(TaskStatus::Done), 1);
        assert_eq!(stats.status_count(TaskStatus::InProgress), 0);
        assert_eq!(stats.priority_count(TaskPriority::High), 1);
        assert_eq!(stats.priority_count(TaskPriority::Low), 1);
    }

    #[test]
    fn done_tasks_are_never_overdue() {
        let long_ago = Some(NOW - Duration::days(365));
        let tasks = vec![
            task("1", TaskStatus::Done, TaskPriority::Low, long_ago),
            task("2", TaskStatus::Done, TaskPriority::Urgent, long_ago),
        ];
        assert_eq!(TaskStats::aggregate(&tasks, NOW).overdue, 0);
    }

    #[test]
    fn cancelled_and_undated_tasks() {
        let tasks = vec![
            task("1", TaskStatus::Cancelled, TaskPriority::Low, Some(NOW - Duration::hours(1))),
            task("2", TaskStatus::Todo, TaskPriority::Low, None),
            task("3", TaskStatus::Todo, TaskPriority::Low, Some(NOW + Duration::days(1))),
        ];
        let stats = TaskStats::aggregate(&tasks, NOW);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn serializes_with_wire_keys() {
        let tasks = vec![task("1", TaskStatus::InProgress, TaskPriority::High, None)];
        let value = serde_json::to_value(TaskStats::aggregate(&tasks, NOW))
            .unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(value["total"], 1);
        assert_eq!(value["byStatus"]["in-progress"], 1);
        assert_eq!(value["byPriority"]["high"], 1);
        assert_eq!(value["overdue"], 0);
    }
}
