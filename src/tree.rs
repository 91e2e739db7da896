//! Tree queries over the task forest: parent/child adjacency, ancestor and
//! descendant walks, and parent reassignment with cycle prevention.

use crate::error::{Result, TaskGraphError};
use crate::model::{TaskContext, TaskId, TaskRecord};
use crate::store::TaskStore;

impl TaskStore {
    /// Immediate children in creation order (ties broken by id).
    pub fn children(&self, id: TaskId) -> Result<&[TaskId]> {
        self.get(id)?;
        Ok(self.child_ids(id))
    }

    /// Lazy depth-first walk over everything transitively under `id`,
    /// parent before children. The task itself is not included.
    pub fn descendants(&self, id: TaskId) -> Result<Descendants<'_>> {
        self.get(id)?;
        let mut stack: Vec<TaskId> = self.child_ids(id).to_vec();
        stack.reverse();
        Ok(Descendants { store: self, stack })
    }

    /// Parent chain from the immediate parent up to the forest root.
    pub fn ancestry(&self, id: TaskId) -> Result<Vec<TaskId>> {
        let mut chain = Vec::new();
        let mut current = self.get(id)?.parent_id;
        while let Some(ancestor) = current {
            chain.push(ancestor);
            current = self.get(ancestor)?.parent_id;
        }
        Ok(chain)
    }

    /// The root of the tree containing `id` (the task itself when it has no
    /// parent). Used by collaborators for permission scoping.
    pub fn root(&self, id: TaskId) -> Result<TaskId> {
        Ok(self.ancestry(id)?.last().copied().unwrap_or(id))
    }

    /// All tasks without a parent, in id order.
    pub fn roots(&self) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| t.parent_id.is_none())
            .map(|t| t.id)
            .collect()
    }

    /// Move a task to a new parent (or to the forest root with `None`).
    ///
    /// Fails with `Cycle` when the new parent is the task itself or one of
    /// its current descendants. On success, a task without a project picks
    /// up the new parent's project; an explicitly set project is never
    /// overwritten.
    pub fn set_parent(&mut self, id: TaskId, new_parent: Option<TaskId>) -> Result<()> {
        let old_parent = self.get(id)?.parent_id;

        if let Some(pid) = new_parent {
            if pid == id {
                return Err(TaskGraphError::Cycle { from: id, to: pid });
            }
            // Walk up from the candidate parent; reaching `id` means the
            // candidate sits inside `id`'s subtree.
            let mut current = Some(pid);
            while let Some(ancestor) = current {
                if ancestor == id {
                    return Err(TaskGraphError::Cycle { from: id, to: pid });
                }
                current = self.get(ancestor)?.parent_id;
            }
        }

        if let Some(old) = old_parent {
            self.detach_child(old, id);
        }
        if let Some(pid) = new_parent {
            self.attach_child(pid, id);
        }

        let parent_project = new_parent.and_then(|pid| {
            self.get(pid)
                .ok()
                .and_then(|parent| parent.project.clone())
        });
        let task = self.get_mut(id)?;
        task.parent_id = new_parent;
        if task.project.is_none() {
            task.project = parent_project;
        }
        Ok(())
    }

    /// The complete family tree of a task, for UI collaborators: ancestors
    /// (immediate parent first), siblings, children, and both directions of
    /// the dependency relation.
    pub fn task_context(&self, id: TaskId) -> Result<TaskContext> {
        let task = self.get(id)?.clone();

        let ancestors = self.collect_records(&self.ancestry(id)?)?;

        // Root tasks treat other roots as siblings.
        let sibling_ids: Vec<TaskId> = match task.parent_id {
            Some(pid) => self.child_ids(pid).to_vec(),
            None => self.roots(),
        };
        let sibling_ids: Vec<TaskId> =
            sibling_ids.into_iter().filter(|&s| s != id).collect();

        Ok(TaskContext {
            ancestors,
            siblings: self.collect_records(&sibling_ids)?,
            children: self.collect_records(self.child_ids(id))?,
            blocking_tasks: self.collect_records(&task.depends_on)?,
            blocked_by_tasks: self.collect_records(self.dependent_ids(id))?,
            task,
        })
    }

    fn collect_records(&self, ids: &[TaskId]) -> Result<Vec<TaskRecord>> {
        ids.iter().map(|&id| self.get(id).cloned()).collect()
    }
}

/// Lazy, restartable depth-first descendant traversal.
pub struct Descendants<'a> {
    store: &'a TaskStore,
    stack: Vec<TaskId>,
}

impl Iterator for Descendants<'_> {
    type Item = TaskId;

    fn next(&mut self) -> Option<TaskId> {
        let id = self.stack.pop()?;
        let children = self.store.child_ids(id);
        self.stack.extend(children.iter().rev());
        Some(id)
    }
}
