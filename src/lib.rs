//! Task hierarchy and dependency engine.
//!
//! A forest of tasks (subtasks under parents), a DAG of "blocked by" edges
//! between arbitrary tasks, a total status state machine with bidirectional
//! completion cascades, a weighted completion calculator, per-task time
//! logs, and calendar-aware recurrence.
//!
//! The engine is synchronous and storage-agnostic: it operates on an
//! in-memory [`store::TaskStore`] and every mutating operation either
//! validates-then-commits in full or mutates nothing. Status changes go
//! through [`status::transition`], which returns the complete set of tasks
//! it touched so the caller can persist and announce them atomically.
//! Current time is always an explicit parameter for deterministic tests.

pub mod completion;
pub mod deps;
pub mod error;
pub mod model;
pub mod priority;
pub mod recurrence;
pub mod status;
pub mod store;
pub mod time_tracking;
pub mod tree;

#[cfg(test)]
pub mod test_utils;
