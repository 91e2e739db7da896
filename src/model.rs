use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskGraphError};
use crate::priority::Priority;
use crate::recurrence::RecurrencePattern;

/// Opaque task identifier, assigned by the store at creation.
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Active statuses are the ones a blocked task may not hold while it
    /// still has unresolved dependencies.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Review)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskGraphError;

    fn from_str(s: &str) -> Result<TaskStatus> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(TaskGraphError::InvalidInput(format!(
                "Invalid status '{}'. Valid values: todo, in_progress, review, completed, blocked, cancelled",
                s
            ))),
        }
    }
}

/// A unit of work, possibly nested under a parent task.
///
/// Field invariants (enforced by the store before any write):
/// - `start_date <= due_date` when both are set
/// - `recurrence_end_date >= start_date` for recurring tasks
/// - `status == Completed` exactly when `completion_date` is set
/// - `time_spent_minutes` only ever increases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    /// Opaque project reference owned by the project collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Opaque milestone reference owned by the milestone collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    /// Opaque user ids; never validated by this core.
    pub assignees: Vec<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Meaningful only for leaf tasks; a task with subtasks derives its
    /// completion from them instead.
    pub manual_completion_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    pub time_spent_minutes: i64,
    /// Tasks this one is blocked by.
    pub depends_on: Vec<TaskId>,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Creation payload supplied by the API-layer collaborator.
///
/// `milestone_project` is the project the referenced milestone belongs to,
/// resolved by the milestone collaborator. The core applies it only when
/// neither an explicit project nor a parent project is available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<TaskId>,
    pub project: Option<String>,
    pub milestone: Option<String>,
    pub milestone_project: Option<String>,
    pub assignees: Vec<String>,
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn titled(title: &str) -> Self {
        NewTask {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn under(title: &str, parent_id: TaskId) -> Self {
        NewTask {
            title: title.to_string(),
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }
}

/// Direct field edits. `None` leaves a field untouched; the double-`Option`
/// fields distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub assignees: Option<Vec<String>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub manual_completion_percentage: Option<u8>,
    pub recurrence_end_date: Option<Option<DateTime<Utc>>>,
}

/// One observable status change produced by a transition, for the
/// notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task_id: TaskId,
    pub old_status: TaskStatus,
    pub new_status: TaskStatus,
}

/// Everything a single `transition()` call changed: the origin task plus
/// every cascade target, in application order (origin, descendants,
/// unblocked dependents, then ancestors).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub changes: Vec<StatusChange>,
    /// Successor tasks created by the recurrence scheduler.
    pub spawned: Vec<TaskId>,
}

impl TransitionResult {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.spawned.is_empty()
    }

    pub fn new_status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.changes
            .iter()
            .find(|c| c.task_id == id)
            .map(|c| c.new_status)
    }
}

/// An immutable unit of logged work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub task_id: TaskId,
    pub minutes: i64,
    pub logged_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// The complete family tree of a task, for UI collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext {
    pub task: TaskRecord,
    /// Parent chain, immediate parent first, root last.
    pub ancestors: Vec<TaskRecord>,
    pub siblings: Vec<TaskRecord>,
    pub children: Vec<TaskRecord>,
    /// Tasks this one depends on.
    pub blocking_tasks: Vec<TaskRecord>,
    /// Tasks that depend on this one.
    pub blocked_by_tasks: Vec<TaskRecord>,
}

/// Status breakdown across the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_tasks: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub review: usize,
    pub completed: usize,
    pub blocked: usize,
    pub cancelled: usize,
}
