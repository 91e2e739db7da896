//! The dependency graph: "blocked by" edges between arbitrary tasks, with
//! cycle prevention and blocking queries.
//!
//! Cycle detection is a depth-first reachability check from the new
//! prerequisite back to the dependent before the edge is committed. O(V+E)
//! worst case, which is fine at the scale of tasks-per-project.

use std::collections::HashSet;

use crate::error::{Result, TaskGraphError};
use crate::model::{TaskId, TaskStatus};
use crate::store::TaskStore;

impl TaskStore {
    /// Record that `id` is blocked by `depends_on`.
    ///
    /// Rejected with `SelfDependency` for a self-edge and with `Cycle` when
    /// `depends_on` already (transitively) depends on `id`. Adding an edge
    /// that already exists is a no-op.
    pub fn add_dependency(&mut self, id: TaskId, depends_on: TaskId) -> Result<()> {
        if id == depends_on {
            return Err(TaskGraphError::SelfDependency(id));
        }
        self.get(id)?;
        self.get(depends_on)?;

        if self.get(id)?.depends_on.contains(&depends_on) {
            return Ok(());
        }
        if self.dependency_path_exists(depends_on, id) {
            return Err(TaskGraphError::Cycle {
                from: id,
                to: depends_on,
            });
        }

        self.get_mut(id)?.depends_on.push(depends_on);
        self.register_dependent(depends_on, id);
        tracing::debug!(task_id = id, depends_on, "added dependency");
        Ok(())
    }

    /// Remove the `id` → `depends_on` edge. Removing an edge that does not
    /// exist is a no-op success.
    pub fn remove_dependency(&mut self, id: TaskId, depends_on: TaskId) -> Result<()> {
        let task = self.get_mut(id)?;
        let before = task.depends_on.len();
        task.depends_on.retain(|&d| d != depends_on);
        if task.depends_on.len() != before {
            self.unregister_dependent(depends_on, id);
        }
        Ok(())
    }

    /// The subset of `id`'s dependencies that are not yet completed.
    ///
    /// A dependency id with no backing task never blocks; edges are
    /// stripped on delete, so such an id can only come from external
    /// state and is treated as resolved.
    pub fn unresolved_dependencies(&self, id: TaskId) -> Result<Vec<TaskId>> {
        let task = self.get(id)?;
        Ok(task
            .depends_on
            .iter()
            .copied()
            .filter(|&dep| {
                self.get(dep)
                    .map(|t| t.status != TaskStatus::Completed)
                    .unwrap_or(false)
            })
            .collect())
    }

    /// True when every dependency of `id` is completed. A task stored as
    /// `blocked` with an empty unresolved set is stale; the status engine
    /// corrects it on the next evaluation.
    pub fn is_unblocked(&self, id: TaskId) -> Result<bool> {
        Ok(self.unresolved_dependencies(id)?.is_empty())
    }

    /// Tasks that list `id` as a dependency, in id order.
    pub fn dependents(&self, id: TaskId) -> Result<&[TaskId]> {
        self.get(id)?;
        Ok(self.dependent_ids(id))
    }

    /// DFS along dependency edges: is there a path `from` → ... → `to`?
    fn dependency_path_exists(&self, from: TaskId, to: TaskId) -> bool {
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Ok(task) = self.get(current) {
                stack.extend(task.depends_on.iter().copied());
            }
        }
        false
    }
}
