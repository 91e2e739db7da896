//! The status state machine.
//!
//! `transition` is the single mutating entry point for status changes. It is
//! total: invalid requests are corrected (the blocked override) rather than
//! rejected, and the only failure mode is an unknown task id. Every cascade
//! target is reported in the returned change set so the notification
//! collaborator can react to all of them; the caller persists the whole set
//! atomically.
//!
//! Ordering inside one call: the downward cascade runs before the upward
//! cascade, and dependents are re-evaluated only after the completions they
//! might be waiting on are in place.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{StatusChange, TaskId, TaskStatus, TransitionResult};
use crate::recurrence;
use crate::store::TaskStore;

/// Request a status change on one task and drive every cascade it implies.
///
/// - Requesting `in_progress`/`review` while dependencies are unresolved
///   stores `blocked` instead; the requested intent is not persisted.
/// - Requesting `completed` completes the whole subtree, frees dependents
///   (`blocked` → `todo`), and bubbles completion up through parents whose
///   children are now all complete. A recurring task spawns its successor.
/// - Moving a completed task away from `completed` clears its completion
///   date and reopens completed ancestors to `in_progress`; children are
///   never forced to reopen.
/// - Everything else is a plain field write.
///
/// `actor` is an opaque user id carried for audit logging only.
pub fn transition(
    store: &mut TaskStore,
    id: TaskId,
    requested: TaskStatus,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<TransitionResult> {
    let current = store.get(id)?.status;

    let effective = if requested.is_active() && !store.is_unblocked(id)? {
        tracing::warn!(
            task_id = id,
            requested = %requested,
            actor,
            "unresolved dependencies, storing blocked instead"
        );
        TaskStatus::Blocked
    } else {
        requested
    };

    let mut result = TransitionResult::default();

    if effective == TaskStatus::Completed {
        complete(store, id, now, &mut result)?;
        if result.new_status_of(id) == Some(TaskStatus::Completed) {
            if let Some(successor) = recurrence::on_completed(store, id, now)? {
                result.spawned.push(successor);
            }
        }
    } else if current == TaskStatus::Completed {
        reopen(store, id, effective, &mut result)?;
    } else if current != effective {
        store.get_mut(id)?.status = effective;
        result.changes.push(StatusChange {
            task_id: id,
            old_status: current,
            new_status: effective,
        });
    }

    tracing::debug!(
        task_id = id,
        actor,
        changes = result.changes.len(),
        spawned = result.spawned.len(),
        "transition applied"
    );
    Ok(result)
}

/// Complete `id` and everything under it, then free dependents and bubble
/// completion upward. Planned read-only first so an integrity fault (a
/// missing task mid-walk) aborts before any mutation.
fn complete(
    store: &mut TaskStore,
    id: TaskId,
    now: DateTime<Utc>,
    result: &mut TransitionResult,
) -> Result<()> {
    let mut targets: Vec<TaskId> = Vec::new();
    if store.get(id)?.status != TaskStatus::Completed {
        targets.push(id);
    }
    let descendants: Vec<TaskId> = store.descendants(id)?.collect();
    for descendant in descendants {
        if store.get(descendant)?.status != TaskStatus::Completed {
            targets.push(descendant);
        }
    }
    if targets.is_empty() {
        // Repeated completion of an already-consistent subtree is a no-op.
        return Ok(());
    }

    tracing::debug!(task_id = id, cascade = targets.len(), "completion cascade");
    for &target in &targets {
        mark_completed(store, target, now, result)?;
    }
    for &target in &targets {
        free_dependents(store, target, result)?;
    }

    // Upward: keep completing parents while all of their children are done.
    let mut child = id;
    while let Some(parent) = store.get(child)?.parent_id {
        if store.get(parent)?.status == TaskStatus::Completed
            || !all_children_completed(store, parent)?
        {
            break;
        }
        mark_completed(store, parent, now, result)?;
        free_dependents(store, parent, result)?;
        child = parent;
    }
    Ok(())
}

fn mark_completed(
    store: &mut TaskStore,
    id: TaskId,
    now: DateTime<Utc>,
    result: &mut TransitionResult,
) -> Result<()> {
    let task = store.get_mut(id)?;
    let old_status = task.status;
    task.status = TaskStatus::Completed;
    if task.completion_date.is_none() {
        task.completion_date = Some(now);
    }
    task.manual_completion_percentage = 100;
    result.changes.push(StatusChange {
        task_id: id,
        old_status,
        new_status: TaskStatus::Completed,
    });
    Ok(())
}

/// Re-evaluate every dependent of a freshly completed task: the ones stored
/// as `blocked` whose last unresolved dependency just cleared go back to
/// `todo` (never straight to `in_progress`).
fn free_dependents(
    store: &mut TaskStore,
    completed: TaskId,
    result: &mut TransitionResult,
) -> Result<()> {
    let dependents = store.dependents(completed)?.to_vec();
    for dependent in dependents {
        if store.get(dependent)?.status == TaskStatus::Blocked
            && store.is_unblocked(dependent)?
        {
            store.get_mut(dependent)?.status = TaskStatus::Todo;
            result.changes.push(StatusChange {
                task_id: dependent,
                old_status: TaskStatus::Blocked,
                new_status: TaskStatus::Todo,
            });
        }
    }
    Ok(())
}

/// Move a completed task back to an active state. Ancestors marked
/// completed must reopen too ("all children complete" no longer holds for
/// them); descendants are left alone.
fn reopen(
    store: &mut TaskStore,
    id: TaskId,
    new_status: TaskStatus,
    result: &mut TransitionResult,
) -> Result<()> {
    let task = store.get_mut(id)?;
    task.status = new_status;
    task.completion_date = None;
    result.changes.push(StatusChange {
        task_id: id,
        old_status: TaskStatus::Completed,
        new_status,
    });

    let mut child = id;
    while let Some(parent) = store.get(child)?.parent_id {
        if store.get(parent)?.status != TaskStatus::Completed {
            break;
        }
        let parent_task = store.get_mut(parent)?;
        parent_task.status = TaskStatus::InProgress;
        parent_task.completion_date = None;
        result.changes.push(StatusChange {
            task_id: parent,
            old_status: TaskStatus::Completed,
            new_status: TaskStatus::InProgress,
        });
        child = parent;
    }
    Ok(())
}

fn all_children_completed(store: &TaskStore, id: TaskId) -> Result<bool> {
    for &child in store.children(id)? {
        if store.get(child)?.status != TaskStatus::Completed {
            return Ok(false);
        }
    }
    Ok(true)
}
