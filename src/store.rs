//! In-memory task collection with derived adjacency indexes.
//!
//! `TaskStore` is the single consistency domain shared by the tree and
//! dependency views: child lists and reverse dependency edges are maintained
//! here so that every mutation is immediately visible to both. The store is
//! synchronous and does no I/O; callers own persistence and the transaction
//! boundary around cascades.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Result, TaskGraphError};
use crate::model::{NewTask, StoreStats, TaskId, TaskPatch, TaskRecord, TaskStatus, TimeLogEntry};

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, TaskRecord>,
    /// Child ids per parent, kept in ascending id order. Ids are assigned
    /// monotonically, so id order is creation order.
    children: HashMap<TaskId, Vec<TaskId>>,
    /// Reverse dependency edges: tasks that list the key in `depends_on`.
    dependents: HashMap<TaskId, Vec<TaskId>>,
    time_logs: HashMap<TaskId, Vec<TimeLogEntry>>,
    next_id: TaskId,
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Create a task with initial `todo` status.
    ///
    /// Project inheritance is first-write-wins: an explicit project is kept,
    /// otherwise the parent's project is inherited, otherwise the project of
    /// the referenced milestone (as supplied by the milestone collaborator).
    pub fn create_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<TaskId> {
        let parent_project = match new.parent_id {
            Some(pid) => self.get(pid)?.project.clone(),
            None => None,
        };

        validate_date_range(new.start_date, new.due_date)?;
        if new.is_recurring {
            validate_recurrence_window(new.start_date, new.recurrence_end_date)?;
        }

        let project = new
            .project
            .or(parent_project)
            .or(if new.milestone.is_some() {
                new.milestone_project
            } else {
                None
            });

        let id = self.next_id;
        self.next_id += 1;

        let task = TaskRecord {
            id,
            title: new.title,
            description: new.description,
            parent_id: new.parent_id,
            project,
            milestone: new.milestone,
            assignees: new.assignees,
            status: TaskStatus::Todo,
            priority: new.priority,
            manual_completion_percentage: 0,
            start_date: new.start_date,
            due_date: new.due_date,
            completion_date: None,
            time_spent_minutes: 0,
            depends_on: Vec::new(),
            is_recurring: new.is_recurring,
            recurrence_pattern: new.recurrence_pattern,
            recurrence_end_date: new.recurrence_end_date,
            created_at: now,
        };

        if let Some(pid) = task.parent_id {
            self.attach_child(pid, id);
        }
        self.tasks.insert(id, task);

        tracing::debug!(task_id = id, "created task");
        Ok(id)
    }

    pub fn get(&self, id: TaskId) -> Result<&TaskRecord> {
        self.tasks.get(&id).ok_or(TaskGraphError::TaskNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Result<&mut TaskRecord> {
        self.tasks
            .get_mut(&id)
            .ok_or(TaskGraphError::TaskNotFound(id))
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.values()
    }

    /// Apply direct field edits. All invariants are checked against the
    /// merged result before anything is written.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<&TaskRecord> {
        let task = self.get(id)?;

        let start = patch.start_date.unwrap_or(task.start_date);
        let due = patch.due_date.unwrap_or(task.due_date);
        let recurrence_end = patch.recurrence_end_date.unwrap_or(task.recurrence_end_date);
        validate_date_range(start, due)?;
        if task.is_recurring {
            validate_recurrence_window(start, recurrence_end)?;
        }

        if let Some(pct) = patch.manual_completion_percentage {
            if pct > 100 {
                return Err(TaskGraphError::InvalidInput(format!(
                    "Completion percentage must be 0-100, got {}",
                    pct
                )));
            }
        }

        let task = self.get_mut(id)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assignees) = patch.assignees {
            task.assignees = assignees;
        }
        task.start_date = start;
        task.due_date = due;
        task.recurrence_end_date = recurrence_end;
        if let Some(pct) = patch.manual_completion_percentage {
            task.manual_completion_percentage = pct;
        }

        Ok(&*task)
    }

    /// Pre-delete check: tasks outside the subtree rooted at `id` that
    /// depend on a task inside it. These would be left with dangling edges
    /// if the subtree were removed.
    pub fn orphaned_dependents(&self, id: TaskId) -> Result<Vec<TaskId>> {
        let mut doomed: HashSet<TaskId> = HashSet::from([id]);
        doomed.extend(self.descendants(id)?);

        let mut orphaned: Vec<TaskId> = doomed
            .iter()
            .flat_map(|&member| self.dependent_ids(member))
            .copied()
            .filter(|dependent| !doomed.contains(dependent))
            .collect();
        orphaned.sort_unstable();
        orphaned.dedup();
        Ok(orphaned)
    }

    /// Remove a task and its whole subtree, along with every dependency
    /// edge referencing a removed task. Returns the removed ids.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Vec<TaskId>> {
        let mut removed: Vec<TaskId> = vec![id];
        removed.extend(self.descendants(id)?);
        let removed_set: HashSet<TaskId> = removed.iter().copied().collect();

        if let Some(pid) = self.get(id)?.parent_id {
            self.detach_child(pid, id);
        }

        for &victim in &removed {
            let task = self
                .tasks
                .remove(&victim)
                .ok_or(TaskGraphError::TaskNotFound(victim))?;
            self.children.remove(&victim);
            self.time_logs.remove(&victim);

            // Strip the victim from the reverse index of everything it
            // depended on.
            for dep in task.depends_on {
                if !removed_set.contains(&dep) {
                    self.unregister_dependent(dep, victim);
                }
            }
            // Strip the victim from the forward edges of every survivor
            // that depended on it.
            if let Some(dependents) = self.dependents.remove(&victim) {
                for dependent in dependents {
                    if let Some(survivor) = self.tasks.get_mut(&dependent) {
                        survivor.depends_on.retain(|&d| d != victim);
                    }
                }
            }
        }

        tracing::debug!(task_id = id, removed = removed.len(), "deleted subtree");
        Ok(removed)
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_tasks: self.tasks.len(),
            ..Default::default()
        };
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Review => stats.review += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    pub(crate) fn child_ids(&self, id: TaskId) -> &[TaskId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn dependent_ids(&self, id: TaskId) -> &[TaskId] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn attach_child(&mut self, parent: TaskId, child: TaskId) {
        let list = self.children.entry(parent).or_default();
        let pos = list.binary_search(&child).unwrap_or_else(|p| p);
        list.insert(pos, child);
    }

    pub(crate) fn detach_child(&mut self, parent: TaskId, child: TaskId) {
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|&c| c != child);
        }
    }

    pub(crate) fn register_dependent(&mut self, blocking: TaskId, dependent: TaskId) {
        let list = self.dependents.entry(blocking).or_default();
        let pos = list.binary_search(&dependent).unwrap_or_else(|p| p);
        list.insert(pos, dependent);
    }

    pub(crate) fn unregister_dependent(&mut self, blocking: TaskId, dependent: TaskId) {
        if let Some(list) = self.dependents.get_mut(&blocking) {
            list.retain(|&d| d != dependent);
        }
    }

    pub(crate) fn push_time_log(&mut self, entry: TimeLogEntry) {
        self.time_logs.entry(entry.task_id).or_default().push(entry);
    }

    pub(crate) fn time_log_entries(&self, id: TaskId) -> &[TimeLogEntry] {
        self.time_logs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn validate_date_range(
    start: Option<DateTime<Utc>>,
    due: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if start > due {
            return Err(TaskGraphError::InvalidDateRange(format!(
                "start date {} is after due date {}",
                start, due
            )));
        }
    }
    Ok(())
}

fn validate_recurrence_window(
    start: Option<DateTime<Utc>>,
    recurrence_end: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, recurrence_end) {
        if end < start {
            return Err(TaskGraphError::InvalidDateRange(format!(
                "recurrence end {} is before start date {}",
                end, start
            )));
        }
    }
    Ok(())
}
