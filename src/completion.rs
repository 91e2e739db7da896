//! Weighted completion percentage.
//!
//! A leaf task reports its manual percentage (100 once completed). A task
//! with subtasks derives its percentage from them: completed children
//! contribute their full share, children that are underway (`in_progress`,
//! `review`, `blocked`) contribute their own recursive percentage averaged
//! over their share, and `todo`/`cancelled` children contribute nothing.
//! Every node floors its result and clamps to [0, 100].

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{TaskId, TaskStatus};
use crate::store::TaskStore;

/// Completion percentage of one task, in [0, 100].
pub fn percentage(store: &TaskStore, id: TaskId) -> Result<u8> {
    let mut memo = HashMap::new();
    Ok(node_percentage(store, id, &mut memo)? as u8)
}

/// Percentages for a whole subtree in one pass, sharing the memo so shared
/// work is computed once. O(subtree size).
pub fn subtree_percentages(store: &TaskStore, root: TaskId) -> Result<HashMap<TaskId, u8>> {
    let mut memo = HashMap::new();
    let mut out = HashMap::new();
    out.insert(root, node_percentage(store, root, &mut memo)? as u8);
    let descendants: Vec<TaskId> = store.descendants(root)?.collect();
    for id in descendants {
        out.insert(id, node_percentage(store, id, &mut memo)? as u8);
    }
    Ok(out)
}

fn node_percentage(
    store: &TaskStore,
    id: TaskId,
    memo: &mut HashMap<TaskId, f64>,
) -> Result<f64> {
    if let Some(&cached) = memo.get(&id) {
        return Ok(cached);
    }

    let task = store.get(id)?;
    let children = store.children(id)?.to_vec();

    let value = if children.is_empty() {
        if task.status == TaskStatus::Completed {
            100.0
        } else {
            f64::from(task.manual_completion_percentage)
        }
    } else {
        let n = children.len() as f64;
        let mut completed = 0usize;
        let mut underway: Vec<TaskId> = Vec::new();
        for &child in &children {
            match store.get(child)?.status {
                TaskStatus::Completed => completed += 1,
                TaskStatus::InProgress | TaskStatus::Review | TaskStatus::Blocked => {
                    underway.push(child)
                },
                TaskStatus::Todo | TaskStatus::Cancelled => {},
            }
        }

        if completed == children.len() {
            100.0
        } else {
            let completed_weight = completed as f64 / n * 100.0;
            let underway_contribution = if underway.is_empty() {
                0.0
            } else {
                let mut sum = 0.0;
                for &child in &underway {
                    sum += node_percentage(store, child, memo)?;
                }
                let average = sum / underway.len() as f64;
                underway.len() as f64 / n * average
            };
            (completed_weight + underway_contribution)
                .floor()
                .clamp(0.0, 100.0)
        }
    };

    memo.insert(id, value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, TaskPatch};
    use crate::status;
    use crate::test_utils::now;

    fn set_manual(store: &mut TaskStore, id: TaskId, pct: u8) {
        store
            .update_task(
                id,
                TaskPatch {
                    manual_completion_percentage: Some(pct),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_leaf_reports_manual_percentage() {
        let mut store = TaskStore::new();
        let id = store.create_task(NewTask::titled("leaf"), now()).unwrap();
        set_manual(&mut store, id, 37);
        assert_eq!(percentage(&store, id).unwrap(), 37);
    }

    #[test]
    fn test_completed_leaf_is_100() {
        let mut store = TaskStore::new();
        let id = store.create_task(NewTask::titled("leaf"), now()).unwrap();
        status::transition(&mut store, id, TaskStatus::Completed, "t", now()).unwrap();
        assert_eq!(percentage(&store, id).unwrap(), 100);
    }

    #[test]
    fn test_parent_ignores_manual_percentage() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        store.create_task(NewTask::under("child", parent), now()).unwrap();
        set_manual(&mut store, parent, 90);
        // Derived from the todo child, not the manual field
        assert_eq!(percentage(&store, parent).unwrap(), 0);
    }

    #[test]
    fn test_half_completed_children() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let c1 = store.create_task(NewTask::under("c1", parent), now()).unwrap();
        store.create_task(NewTask::under("c2", parent), now()).unwrap();

        status::transition(&mut store, c1, TaskStatus::Completed, "t", now()).unwrap();
        assert_eq!(percentage(&store, parent).unwrap(), 50);
    }

    #[test]
    fn test_underway_child_contributes_its_share() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let c1 = store.create_task(NewTask::under("c1", parent), now()).unwrap();
        store.create_task(NewTask::under("c2", parent), now()).unwrap();

        set_manual(&mut store, c1, 50);
        status::transition(&mut store, c1, TaskStatus::InProgress, "t", now()).unwrap();
        // One of two children underway at 50% -> (1/2) * 50 = 25
        assert_eq!(percentage(&store, parent).unwrap(), 25);
    }

    #[test]
    fn test_blocked_child_counts_as_underway() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let child = store.create_task(NewTask::under("child", parent), now()).unwrap();
        let dep = store.create_task(NewTask::titled("dep"), now()).unwrap();
        store.add_dependency(child, dep).unwrap();

        set_manual(&mut store, child, 60);
        status::transition(&mut store, child, TaskStatus::InProgress, "t", now()).unwrap();
        assert_eq!(store.get(child).unwrap().status, TaskStatus::Blocked);
        assert_eq!(percentage(&store, parent).unwrap(), 60);
    }

    #[test]
    fn test_todo_and_cancelled_children_contribute_nothing() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        store.create_task(NewTask::under("c1", parent), now()).unwrap();
        let c2 = store.create_task(NewTask::under("c2", parent), now()).unwrap();
        status::transition(&mut store, c2, TaskStatus::Cancelled, "t", now()).unwrap();
        assert_eq!(percentage(&store, parent).unwrap(), 0);
    }

    #[test]
    fn test_all_children_completed_is_100() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        let c1 = store.create_task(NewTask::under("c1", parent), now()).unwrap();
        let c2 = store.create_task(NewTask::under("c2", parent), now()).unwrap();
        status::transition(&mut store, c1, TaskStatus::Completed, "t", now()).unwrap();
        status::transition(&mut store, c2, TaskStatus::Completed, "t", now()).unwrap();
        assert_eq!(percentage(&store, parent).unwrap(), 100);
    }

    #[test]
    fn test_nested_subtree_rollup() {
        // root -> (a -> (a1 done, a2 in_progress@50), b todo)
        let mut store = TaskStore::new();
        let root = store.create_task(NewTask::titled("root"), now()).unwrap();
        let a = store.create_task(NewTask::under("a", root), now()).unwrap();
        let a1 = store.create_task(NewTask::under("a1", a), now()).unwrap();
        let a2 = store.create_task(NewTask::under("a2", a), now()).unwrap();
        store.create_task(NewTask::under("b", root), now()).unwrap();

        status::transition(&mut store, a1, TaskStatus::Completed, "t", now()).unwrap();
        set_manual(&mut store, a2, 50);
        status::transition(&mut store, a2, TaskStatus::InProgress, "t", now()).unwrap();

        // a: 1/2 complete + (1/2)*50 = 75
        assert_eq!(percentage(&store, a).unwrap(), 75);
        status::transition(&mut store, a, TaskStatus::InProgress, "t", now()).unwrap();
        // root: 0 complete + (1/2)*75 = 37.5 -> 37
        assert_eq!(percentage(&store, root).unwrap(), 37);
    }

    #[test]
    fn test_subtree_percentages_match_individual_calls() {
        let mut store = TaskStore::new();
        let root = store.create_task(NewTask::titled("root"), now()).unwrap();
        let a = store.create_task(NewTask::under("a", root), now()).unwrap();
        let b = store.create_task(NewTask::under("b", root), now()).unwrap();
        status::transition(&mut store, a, TaskStatus::Completed, "t", now()).unwrap();
        set_manual(&mut store, b, 20);
        status::transition(&mut store, b, TaskStatus::InProgress, "t", now()).unwrap();

        let all = subtree_percentages(&store, root).unwrap();
        for &id in &[root, a, b] {
            assert_eq!(all[&id], percentage(&store, id).unwrap());
        }
    }

    #[test]
    fn test_bounds_hold() {
        let mut store = TaskStore::new();
        let parent = store.create_task(NewTask::titled("parent"), now()).unwrap();
        for i in 0..3 {
            let c = store
                .create_task(NewTask::under(&format!("c{}", i), parent), now())
                .unwrap();
            set_manual(&mut store, c, 100);
            status::transition(&mut store, c, TaskStatus::InProgress, "t", now()).unwrap();
        }
        let p = percentage(&store, parent).unwrap();
        assert!(p <= 100);
    }
}
