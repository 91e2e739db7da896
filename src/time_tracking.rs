//! Per-task time accumulation.
//!
//! Logged work is an append-only list of entries; the per-task counter only
//! ever increases. Nothing cascades to parents — subtree totals are a
//! read-time sum so that one log write never touches more than one task.

use chrono::{DateTime, Utc};

use crate::error::{Result, TaskGraphError};
use crate::model::{TaskId, TimeLogEntry};
use crate::store::TaskStore;

impl TaskStore {
    /// Append a time-log entry and bump the task's counter.
    ///
    /// `minutes` must be at least 1; this core never subtracts logged time.
    pub fn log_time(
        &mut self,
        id: TaskId,
        minutes: i64,
        logged_by: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TimeLogEntry> {
        if minutes <= 0 {
            return Err(TaskGraphError::InvalidDuration(minutes));
        }
        self.get(id)?;

        let entry = TimeLogEntry {
            task_id: id,
            minutes,
            logged_by: logged_by.to_string(),
            description: description.map(str::to_string),
            logged_at: now,
        };
        self.push_time_log(entry.clone());
        self.get_mut(id)?.time_spent_minutes += minutes;

        tracing::debug!(task_id = id, minutes, logged_by, "logged time");
        Ok(entry)
    }

    /// All log entries for one task, oldest first.
    pub fn time_logs(&self, id: TaskId) -> Result<&[TimeLogEntry]> {
        self.get(id)?;
        Ok(self.time_log_entries(id))
    }

    /// Total minutes across a task and its whole subtree. Computed at read
    /// time; never stored.
    pub fn time_spent_subtree(&self, id: TaskId) -> Result<i64> {
        let mut total = self.get(id)?.time_spent_minutes;
        let descendants: Vec<TaskId> = self.descendants(id)?.collect();
        for descendant in descendants {
            total += self.get(descendant)?.time_spent_minutes;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use crate::test_utils::now;

    #[test]
    fn test_log_time_accumulates() {
        let mut store = TaskStore::new();
        let id = store.create_task(NewTask::titled("work"), now()).unwrap();

        store.log_time(id, 30, "alice", None, now()).unwrap();
        store.log_time(id, 45, "bob", Some("code review"), now()).unwrap();

        assert_eq!(store.get(id).unwrap().time_spent_minutes, 75);
        let logs = store.time_logs(id).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].logged_by, "alice");
        assert_eq!(logs[1].description.as_deref(), Some("code review"));
    }

    #[test]
    fn test_log_time_rejects_non_positive() {
        let mut store = TaskStore::new();
        let id = store.create_task(NewTask::titled("work"), now()).unwrap();

        assert_eq!(
            store.log_time(id, 0, "alice", None, now()),
            Err(TaskGraphError::InvalidDuration(0))
        );
        assert_eq!(
            store.log_time(id, -15, "alice", None, now()),
            Err(TaskGraphError::InvalidDuration(-15))
        );
        assert_eq!(store.get(id).unwrap().time_spent_minutes, 0);
        assert!(store.time_logs(id).unwrap().is_empty());
    }

    #[test]
    fn test_log_time_unknown_task() {
        let mut store = TaskStore::new();
        assert_eq!(
            store.log_time(9, 10, "alice", None, now()),
            Err(TaskGraphError::TaskNotFound(9))
        );
    }

    #[test]
    fn test_no_cascade_to_parent() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let child = store.create_task(NewTask::under("child", parent), now()).unwrap();

        store.log_time(child, 60, "alice", None, now()).unwrap();
        assert_eq!(store.get(parent).unwrap().time_spent_minutes, 0);
    }

    #[test]
    fn test_subtree_total_is_read_time_sum() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let child = store.create_task(NewTask::under("child", parent), now()).unwrap();
        let grandchild = store
            .create_task(NewTask::under("grandchild", child), now())
            .unwrap();

        store.log_time(parent, 10, "a", None, now()).unwrap();
        store.log_time(child, 20, "a", None, now()).unwrap();
        store.log_time(grandchild, 30, "a", None, now()).unwrap();

        assert_eq!(store.time_spent_subtree(parent).unwrap(), 60);
        assert_eq!(store.time_spent_subtree(child).unwrap(), 50);
        assert_eq!(store.time_spent_subtree(grandchild).unwrap(), 30);
    }
}
