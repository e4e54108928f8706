//! In-memory task state shared by every view.

use std::collections::HashMap;

use taskboard_core::{Task, TaskFilter, TaskId, TaskSort, TaskStats};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// The whole task list was replaced by a load.
    Replaced {
        /// Number of tasks after the replacement.
        count: usize,
    },
    /// A task was created or updated.
    Upserted(TaskId),
    /// A task was removed.
    Removed(TaskId),
    /// Filter criteria changed.
    FilterChanged,
    /// Sort criteria changed.
    SortChanged,
    /// Selected task changed.
    SelectionChanged(Option<TaskId>),
}

/// Notification delivered to subscribers after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// Store revision after the change.
    pub revision: u64,
    /// The change itself.
    pub change: StoreChange,
}

/// Task list, lookup index, view criteria and selection.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
    filter: TaskFilter,
    sort: TaskSort,
    selected: Option<TaskId>,
    revision: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::with_sort(TaskSort::default())
    }
}

impl TaskStore {
    /// Empty store with the default sort.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with an explicit initial sort.
    #[must_use]
    pub fn with_sort(sort: TaskSort) -> Self {
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
            filter: TaskFilter::default(),
            sort,
            selected: None,
            revision: 0,
            events,
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Number of changes applied so far.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Every task in raw (unfiltered, unsorted) order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the store holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).and_then(|&idx| self.tasks.get(idx))
    }

    /// Whether a task with `id` is held.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.index.contains_key(id)
    }

    /// Replace the whole task list. Later duplicates of an id overwrite earlier ones in place.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        self.index.clear();
        for task in tasks {
            if let Some(&idx) = self.index.get(&task.id) {
                self.tasks[idx] = task;
            } else {
                self.index.insert(task.id.clone(), self.tasks.len());
                self.tasks.push(task);
            }
        }
        if let Some(selected) = &self.selected
            && !self.index.contains_key(selected)
        {
            self.selected = None;
        }
        let count = self.tasks.len();
        debug!(count, "Replaced task list");
        self.notify(StoreChange::Replaced { count });
    }

    /// Insert or update a task as the result of a mutation at `now`.
    ///
    /// An existing `created_at` is kept; `updated_at` is refreshed and never
    /// moves backwards or before `created_at`. New tasks go to the front.
    pub fn upsert(&mut self, mut task: Task, now: OffsetDateTime) -> &Task {
        let idx = if let Some(&idx) = self.index.get(&task.id) {
            let existing = &self.tasks[idx];
            task.created_at = existing.created_at;
            task.updated_at = task.updated_at.max(existing.updated_at);
            task.touch(now);
            self.tasks[idx] = task;
            idx
        } else {
            task.touch(now);
            self.tasks.insert(0, task);
            self.rebuild_index();
            0
        };
        let id = self.tasks[idx].id.clone();
        debug!(task = %id, "Upserted task");
        self.notify(StoreChange::Upserted(id));
        &self.tasks[idx]
    }

    /// Merge a task read from the backend without stamping it.
    ///
    /// Timestamps are taken as loaded. Returns `false` when the stored copy is
    /// already identical, in which case nothing is notified.
    pub fn merge_loaded(&mut self, task: Task) -> bool {
        let id = task.id.clone();
        if let Some(&idx) = self.index.get(&id) {
            if self.tasks[idx] == task {
                return false;
            }
            self.tasks[idx] = task;
        } else {
            self.tasks.insert(0, task);
            self.rebuild_index();
        }
        debug!(task = %id, "Merged loaded task");
        self.notify(StoreChange::Upserted(id));
        true
    }

    /// Remove a task, clearing the selection when it pointed at it.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.index.get(id).copied()?;
        let removed = self.tasks.remove(idx);
        self.rebuild_index();
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        debug!(task = %id, "Removed task");
        self.notify(StoreChange::Removed(id.clone()));
        Some(removed)
    }

    /// Current filter criteria.
    #[must_use]
    pub const fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// Replace the filter criteria.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
        self.notify(StoreChange::FilterChanged);
    }

    /// Overlay `update` on the current filter; present fields win.
    pub fn merge_filter(&mut self, update: TaskFilter) {
        self.filter = std::mem::take(&mut self.filter).merge(update);
        self.notify(StoreChange::FilterChanged);
    }

    /// Drop every filter constraint.
    pub fn clear_filter(&mut self) {
        self.set_filter(TaskFilter::default());
    }

    /// Current sort criteria.
    #[must_use]
    pub const fn sort(&self) -> &TaskSort {
        &self.sort
    }

    /// Replace the sort criteria.
    pub fn set_sort(&mut self, sort: TaskSort) {
        self.sort = sort;
        self.notify(StoreChange::SortChanged);
    }

    /// Select a task by id, or clear the selection with `None`.
    ///
    /// Returns `false` and leaves the selection untouched when the id is unknown.
    pub fn select(&mut self, id: Option<TaskId>) -> bool {
        if let Some(candidate) = &id
            && !self.contains(candidate)
        {
            return false;
        }
        self.selected.clone_from(&id);
        self.notify(StoreChange::SelectionChanged(id));
        true
    }

    /// Currently selected task.
    #[must_use]
    pub fn selected(&self) -> Option<&Task> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Tasks passing the filter, in sort order.
    #[must_use]
    pub fn visible(&self) -> Vec<Task> {
        taskboard_core::view(&self.tasks, &self.filter, &self.sort)
    }

    /// Statistics over every held task, ignoring the filter.
    #[must_use]
    pub fn stats(&self, now: OffsetDateTime) -> TaskStats {
        TaskStats::aggregate(&self.tasks, now)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| (task.id.clone(), idx))
            .collect();
    }

    fn notify(&mut self, change: StoreChange) {
        self.revision += 1;
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(StoreEvent {
            revision: self.revision,
            change,
        });
    }
}
