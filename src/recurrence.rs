//! Recurrence scheduling for repeating tasks.
//!
//! When a recurring task completes, a successor is created as a sibling with
//! its dates advanced by one recurrence interval. Month and year steps use
//! calendar-correct arithmetic (chrono `Months`), not fixed day counts, so a
//! monthly task anchored on Jan 31 lands on Feb 28/29 rather than drifting.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskGraphError};
use crate::model::{NewTask, TaskId};
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl RecurrenceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceUnit::Days => "days",
            RecurrenceUnit::Weeks => "weeks",
            RecurrenceUnit::Months => "months",
            RecurrenceUnit::Years => "years",
        }
    }
}

/// How often a recurring task repeats.
///
/// Wire format is a plain string: `daily`, `weekly`, `monthly`, `yearly`, or
/// the generalized `every_<N>_<unit>` form (`every_2_weeks`, `every_3_months`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Every { count: u32, unit: RecurrenceUnit },
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrencePattern::Daily => f.write_str("daily"),
            RecurrencePattern::Weekly => f.write_str("weekly"),
            RecurrencePattern::Monthly => f.write_str("monthly"),
            RecurrencePattern::Yearly => f.write_str("yearly"),
            RecurrencePattern::Every { count, unit } => {
                write!(f, "every_{}_{}", count, unit.as_str())
            },
        }
    }
}

impl From<RecurrencePattern> for String {
    fn from(pattern: RecurrencePattern) -> String {
        pattern.to_string()
    }
}

impl FromStr for RecurrencePattern {
    type Err = TaskGraphError;

    fn from_str(s: &str) -> Result<RecurrencePattern> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            "yearly" => Ok(RecurrencePattern::Yearly),
            other => parse_every(other).ok_or_else(|| {
                TaskGraphError::InvalidInput(format!(
                    "Invalid recurrence pattern '{}'. Valid values: daily, weekly, monthly, yearly, every_<N>_<days|weeks|months|years>",
                    s
                ))
            }),
        }
    }
}

impl TryFrom<String> for RecurrencePattern {
    type Error = TaskGraphError;

    fn try_from(s: String) -> Result<RecurrencePattern> {
        s.parse()
    }
}

fn parse_every(s: &str) -> Option<RecurrencePattern> {
    let rest = s.strip_prefix("every_")?;
    let (count_str, unit_str) = rest.split_once('_')?;
    let count: u32 = count_str.parse().ok().filter(|&n| n >= 1)?;
    let unit = match unit_str {
        "day" | "days" => RecurrenceUnit::Days,
        "week" | "weeks" => RecurrenceUnit::Weeks,
        "month" | "months" => RecurrenceUnit::Months,
        "year" | "years" => RecurrenceUnit::Years,
        _ => return None,
    };
    Some(RecurrencePattern::Every { count, unit })
}

/// Advance a date by one recurrence interval.
///
/// Returns `None` only when the calendar arithmetic overflows chrono's
/// representable range, in which case no successor should be scheduled.
pub fn advance(date: DateTime<Utc>, pattern: RecurrencePattern) -> Option<DateTime<Utc>> {
    match pattern {
        RecurrencePattern::Daily => date.checked_add_days(Days::new(1)),
        RecurrencePattern::Weekly => date.checked_add_signed(Duration::weeks(1)),
        RecurrencePattern::Monthly => date.checked_add_months(Months::new(1)),
        RecurrencePattern::Yearly => date.checked_add_months(Months::new(12)),
        RecurrencePattern::Every { count, unit } => match unit {
            RecurrenceUnit::Days => date.checked_add_days(Days::new(u64::from(count))),
            RecurrenceUnit::Weeks => date.checked_add_signed(Duration::weeks(i64::from(count))),
            RecurrenceUnit::Months => date.checked_add_months(Months::new(count)),
            RecurrenceUnit::Years => date.checked_add_months(Months::new(count.checked_mul(12)?)),
        },
    }
}

/// Create the next occurrence of a completed recurring task.
///
/// The successor is a new sibling: same parent, title, description, project,
/// milestone, assignees, priority and recurrence metadata, with `todo` status
/// and both dates shifted by the start-date delta. Dependencies are
/// instance-specific and are never copied.
///
/// No-op (returns `Ok(None)`) when the task is not recurring, has no start
/// date to advance from, or the next start would land past
/// `recurrence_end_date`.
pub fn on_completed(store: &mut TaskStore, id: TaskId, now: DateTime<Utc>) -> Result<Option<TaskId>> {
    let task = store.get(id)?;

    if !task.is_recurring {
        return Ok(None);
    }
    let (Some(pattern), Some(start)) = (task.recurrence_pattern, task.start_date) else {
        return Ok(None);
    };

    let Some(next_start) = advance(start, pattern) else {
        return Ok(None);
    };
    if let Some(end) = task.recurrence_end_date {
        if next_start > end {
            tracing::debug!(task_id = id, %next_start, "recurrence ended, no successor");
            return Ok(None);
        }
    }

    let delta = next_start - start;
    let successor = NewTask {
        title: task.title.clone(),
        description: task.description.clone(),
        parent_id: task.parent_id,
        project: task.project.clone(),
        milestone: task.milestone.clone(),
        milestone_project: None,
        assignees: task.assignees.clone(),
        priority: task.priority,
        start_date: Some(next_start),
        due_date: task.due_date.map(|due| due + delta),
        is_recurring: true,
        recurrence_pattern: Some(pattern),
        recurrence_end_date: task.recurrence_end_date,
    };

    let successor_id = store.create_task(successor, now)?;
    tracing::debug!(task_id = id, successor_id, "spawned recurrence successor");
    Ok(Some(successor_id))
}
