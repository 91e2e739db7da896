use serde::Serialize;
use thiserror::Error;

use crate::model::TaskId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskGraphError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Cycle detected: task {from} would transitively reach task {to}")]
    Cycle { from: TaskId, to: TaskId },

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid time-log duration: {0} minutes (must be a positive integer)")]
    InvalidDuration(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl TaskGraphError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            TaskGraphError::TaskNotFound(_) => "TASK_NOT_FOUND",
            TaskGraphError::Cycle { .. } => "CYCLE",
            TaskGraphError::SelfDependency(_) => "SELF_DEPENDENCY",
            TaskGraphError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            TaskGraphError::InvalidDuration(_) => "INVALID_DURATION",
            TaskGraphError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskGraphError>;
