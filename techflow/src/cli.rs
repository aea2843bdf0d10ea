//! Command-line surface of the `techflow` binary.
//!
//! Global options live in [`CliArgs`] and apply to every subcommand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use techflow_proto::Id;
use techflow_proto::project::{ProjectDraft, ProjectStatus};
use techflow_proto::task::{TaskDraft, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};

use crate::config::CliArgs;
use crate::tasks::Column;

/// `TechFlow` project and task management client.
#[derive(Parser, Debug)]
#[command(name = "techflow", version, about)]
pub struct Cli {
    /// Options shared by all commands.
    #[command(flatten)]
    pub args: CliArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and print the session token.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "TECHFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account, then log in with it.
    Register {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "TECHFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the logged-in user.
    Profile,
    /// Task operations.
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// Project operations.
    #[command(subcommand)]
    Projects(ProjectCommand),
    /// Team operations.
    #[command(subcommand)]
    Team(TeamCommand),
    /// Show counts, recent tasks, and due-date alerts.
    Dashboard,
    /// Search projects and tasks.
    Search {
        /// Text to look for (at least two characters).
        query: String,
    },
    /// Export tasks as CSV.
    Export {
        /// Output file (default: `tasks-YYYY-MM-DD.csv`).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Filters for the exported tasks.
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Keep the task board on screen, refreshing on an interval.
    Watch {
        /// Filters for the board.
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Task list filters.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Only tasks of this project.
    #[arg(long)]
    pub project: Option<String>,
    /// Only tasks with this status.
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority.
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Only tasks assigned to this member.
    #[arg(long)]
    pub assignee: Option<String>,
}

impl FilterArgs {
    /// Builds a filter for page 1. Blank ids are ignored.
    #[must_use]
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            project_id: non_blank(self.project.as_deref()).map(Id::from),
            status: self.status,
            priority: self.priority,
            assigned_to: non_blank(self.assignee.as_deref()).map(Id::from),
            page: None,
            limit: None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `techflow tasks ...`
#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List one page of tasks.
    List {
        /// Filters.
        #[command(flatten)]
        filter: FilterArgs,
        /// 1-based page.
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one task.
    Show {
        /// Task id.
        id: String,
    },
    /// Create a task.
    Create {
        /// Title.
        #[arg(long)]
        title: String,
        /// Owning project id.
        #[arg(long)]
        project: String,
        /// Priority.
        #[arg(long, default_value = "MEDIUM")]
        priority: TaskPriority,
        /// Description.
        #[arg(long)]
        description: Option<String>,
        /// Due date (`YYYY-MM-DD`).
        #[arg(long)]
        due: Option<String>,
        /// Assignee member id.
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Update fields of a task.
    Update {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New status.
        #[arg(long)]
        status: Option<TaskStatus>,
        /// New priority.
        #[arg(long)]
        priority: Option<TaskPriority>,
        /// New due date; an empty value clears it.
        #[arg(long)]
        due: Option<String>,
        /// New assignee; an empty value unassigns.
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Change a task's status through the board.
    Status {
        /// Task id.
        id: String,
        /// Target status.
        status: TaskStatus,
    },
    /// Move a card to a kanban column.
    Move {
        /// Task id.
        id: String,
        /// Column: todo, in-progress, or completed.
        column: Column,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Print the board in kanban columns.
    Board {
        /// Filters.
        #[command(flatten)]
        filter: FilterArgs,
    },
}

impl TaskCommand {
    /// Draft for `tasks create`, or `None` for other variants.
    #[must_use]
    pub fn draft(&self) -> Option<TaskDraft> {
        let Self::Create {
            title,
            project,
            priority,
            description,
            due,
            assignee,
        } = self
        else {
            return None;
        };
        Some(TaskDraft {
            title: title.clone(),
            description: description.clone(),
            project_id: Id::from(project.as_str()),
            priority: *priority,
            due_date: due.clone(),
            assigned_to: assignee.clone(),
        })
    }

    /// Update for `tasks update`, or `None` for other variants.
    ///
    /// A blank `--due` or `--assignee` becomes a clear.
    #[must_use]
    pub fn update(&self) -> Option<TaskUpdate> {
        let Self::Update {
            title,
            description,
            status,
            priority,
            due,
            assignee,
            ..
        } = self
        else {
            return None;
        };
        let clearable =
            |v: &Option<String>| v.as_ref().map(|s| Some(s.clone()).filter(|s| !s.trim().is_empty()));
        Some(TaskUpdate {
            title: title.clone(),
            description: description.clone(),
            status: *status,
            priority: *priority,
            due_date: clearable(due),
            assigned_to: clearable(assignee),
        })
    }
}

/// `techflow projects ...`
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List one page of projects.
    List {
        /// 1-based page.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Page size.
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Free-text search.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a project and its tasks.
    Show {
        /// Project id.
        id: String,
    },
    /// Create a project.
    Create {
        /// Fields.
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Update a project.
    Update {
        /// Project id.
        id: String,
        /// Fields to change.
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Delete a project.
    Delete {
        /// Project id.
        id: String,
    },
}

/// Editable project fields.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ProjectFields {
    /// Name.
    #[arg(long)]
    pub name: Option<String>,
    /// Description.
    #[arg(long)]
    pub description: Option<String>,
    /// Status.
    #[arg(long)]
    pub status: Option<ProjectStatus>,
}

impl From<&ProjectFields> for ProjectDraft {
    fn from(fields: &ProjectFields) -> Self {
        Self {
            name: fields.name.clone(),
            description: fields.description.clone(),
            status: fields.status,
        }
    }
}

/// `techflow team ...`
#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// List team members.
    Members,
    /// List tasks assigned to a member.
    Tasks {
        /// Member id.
        id: String,
    },
}
