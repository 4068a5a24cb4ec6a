//! Enumerations and field types for task management.
//!
//! This module defines the structured values a task carries (priority and
//! status) together with the selector enums that drive the list and calendar
//! views (status filter, sort key, group key, calendar granularity).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    /// Sort rank; higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// Display label ("Low", "Urgent", ...).
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    /// Next value in display order, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Urgent,
            Priority::Urgent => Priority::Low,
        }
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    /// Sort rank; pending tasks come first.
    pub fn rank(self) -> u8 {
        match self {
            Status::Pending => 1,
            Status::InProgress => 2,
            Status::Completed => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }

    /// The quick-toggle transition: pending is completed, anything else
    /// goes back to pending. Never lands on in-progress.
    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Completed,
            Status::InProgress | Status::Completed => Status::Pending,
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Status::Pending => Status::InProgress,
            Status::InProgress => Status::Completed,
            Status::Completed => Status::Pending,
        }
    }
}

/// Status selector for task lists; `All` passes every task.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == Status::Pending,
            StatusFilter::InProgress => status == Status::InProgress,
            StatusFilter::Completed => status == Status::Completed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All Tasks",
            StatusFilter::Pending => "Pending",
            StatusFilter::InProgress => "In Progress",
            StatusFilter::Completed => "Completed",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::InProgress,
            StatusFilter::InProgress => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Store order, i.e. the manual drag order.
    #[default]
    Manual,
    Priority,
    DueDate,
    Status,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Manual => "Manual",
            SortKey::Priority => "Priority",
            SortKey::DueDate => "Due Date",
            SortKey::Status => "Status",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            SortKey::Manual => SortKey::Priority,
            SortKey::Priority => SortKey::DueDate,
            SortKey::DueDate => SortKey::Status,
            SortKey::Status => SortKey::Manual,
        }
    }
}

/// Grouping options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum GroupKey {
    #[default]
    None,
    Priority,
    Status,
}

impl GroupKey {
    pub fn label(self) -> &'static str {
        match self {
            GroupKey::None => "None",
            GroupKey::Priority => "Priority",
            GroupKey::Status => "Status",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            GroupKey::None => GroupKey::Priority,
            GroupKey::Priority => GroupKey::Status,
            GroupKey::Status => GroupKey::None,
        }
    }
}

/// Calendar zoom level.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
}

impl Granularity {
    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Granularity::Day => Granularity::Week,
            Granularity::Week => Granularity::Month,
            Granularity::Month => Granularity::Day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_never_lands_on_in_progress() {
        assert_eq!(Status::Pending.toggled(), Status::Completed);
        assert_eq!(Status::InProgress.toggled(), Status::Pending);
        assert_eq!(Status::Completed.toggled(), Status::Pending);
    }

    #[test]
    fn test_ranks() {
        let ranks: Vec<u8> = Priority::ALL.iter().map(|p| p.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        let ranks: Vec<u8> = Status::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_status_serialises_kebab_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let p: Priority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(p, Priority::Urgent);
    }

    #[test]
    fn test_status_filter() {
        assert!(StatusFilter::All.matches(Status::Completed));
        assert!(StatusFilter::InProgress.matches(Status::InProgress));
        assert!(!StatusFilter::Pending.matches(Status::InProgress));
    }
}
