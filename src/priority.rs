use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskGraphError};

/// Task priority levels, ordered from least to most urgent so that
/// `Ord` sorts low-priority work first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Parse an optional priority string (API layers pass these through).
    pub fn parse_optional(s: Option<&str>) -> Result<Option<Priority>> {
        match s {
            Some(priority_str) => Ok(Some(priority_str.parse()?)),
            None => Ok(None),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskGraphError;

    fn from_str(s: &str) -> Result<Priority> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(TaskGraphError::InvalidInput(format!(
                "Invalid priority '{}'. Valid values: low, medium, high, urgent",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_str() {
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent); // case insensitive
    }

    #[test]
    fn test_priority_from_str_invalid() {
        assert!("critical".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_round_trip() {
        for p in [
            Priority::Low,
            Priority::Medium,
            Priority::High,
            Priority::Urgent,
        ] {
            assert_eq!(p.as_str().parse::<Priority>().unwrap(), p);
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Urgent);
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(
            Priority::parse_optional(Some("high")).unwrap(),
            Some(Priority::High)
        );
        assert_eq!(Priority::parse_optional(None).unwrap(), None);
        assert!(Priority::parse_optional(Some("invalid")).is_err());
    }
}
