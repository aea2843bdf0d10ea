//! Task board state for `TechFlow`.
//!
//! Holds the locally displayed task list and reconciles optimistic status
//! changes (including kanban drags) with the service, polling refreshes,
//! and filter-driven pagination.

pub mod board;

use std::fmt;
use std::str::FromStr;

use techflow_proto::Id;
use techflow_proto::task::{Task, TaskStatus};
use thiserror::Error;

pub use board::{BoardSnapshot, MoveOutcome, PollOutcome, TaskBoard};

use crate::api::ApiError;

/// Errors that can occur during board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The task is not on the current page.
    #[error("task {0} is not on the board")]
    UnknownTask(Id),

    /// Page number outside `1..=total_pages`.
    #[error("page {page} is out of range (1..={total_pages})")]
    PageOutOfRange {
        /// Requested page.
        page: u32,
        /// Pages available.
        total_pages: u32,
    },

    /// The service call failed. The board has been re-fetched.
    #[error(transparent)]
    Remote(#[from] ApiError),
}

impl BoardError {
    /// Best-effort message suitable for showing to a user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// A kanban column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// `todo`
    Todo,
    /// `in-progress`
    InProgress,
    /// `completed`
    Completed,
}

impl Column {
    /// Columns in display order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Completed];

    /// Column identifier used by drag-and-drop targets.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Status a card takes when dropped in this column.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::Todo => TaskStatus::Todo,
            Self::InProgress => TaskStatus::InProgress,
            Self::Completed => TaskStatus::Completed,
        }
    }

    /// Column a task with `status` is shown in.
    #[must_use]
    pub const fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Completed => Self::Completed,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned for a column id that is not on the board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column: {0} (expected todo, in-progress, or completed)")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// Groups tasks into kanban columns, keeping list order inside each column.
#[must_use]
pub fn group_by_column(tasks: &[Task]) -> Vec<(Column, Vec<Task>)> {
    Column::ALL
        .into_iter()
        .map(|column| {
            let cards = tasks
                .iter()
                .filter(|t| Column::for_status(t.status) == column)
                .cloned()
                .collect();
            (column, cards)
        })
        .collect()
}
