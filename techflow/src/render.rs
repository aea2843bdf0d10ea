//! Plain-text rendering for terminal output.
//!
//! Everything here returns a `String`; the binary decides where it goes.

use std::fmt::Write as _;

use techflow_proto::auth::User;
use techflow_proto::project::Project;
use techflow_proto::task::Task;
use techflow_proto::team::TeamMember;

use crate::config::ViewMode;
use crate::dashboard::Dashboard;
use crate::pagination::render_window;
use crate::search::SearchResults;
use crate::tasks::{BoardSnapshot, group_by_column};

/// One-line summary of a task.
#[must_use]
pub fn task_line(task: &Task) -> String {
    let mut line = format!(
        "#{} [{}] {} ({})",
        task.id,
        task.status.label(),
        task.title,
        task.priority
    );
    if let Some(due) = &task.due_date {
        let _ = write!(line, " due {}", due.get(..10).unwrap_or(due));
    }
    if let Some(user) = &task.assigned_user {
        let _ = write!(line, " @{}", user.name);
    }
    line
}

/// Full view of one task.
#[must_use]
pub fn task_detail(task: &Task) -> String {
    let mut out = task_line(task);
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = write!(out, "\n\n{description}");
    }
    if let Some(project) = &task.project {
        let _ = write!(out, "\nProject: {} (#{})", project.name, project.id);
    }
    if let Some(created) = &task.created_at {
        let _ = write!(out, "\nCreated: {created}");
    }
    out
}

/// Tasks one per line, or a placeholder when empty.
#[must_use]
pub fn grid(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.".to_string();
    }
    tasks.iter().map(task_line).collect::<Vec<_>>().join("\n")
}

/// Tasks in one section per kanban column, with card counts.
#[must_use]
pub fn kanban(tasks: &[Task]) -> String {
    group_by_column(tasks)
        .into_iter()
        .map(|(column, cards)| {
            let mut section = format!("== {} ({}) ==", column.status().label(), cards.len());
            for card in &cards {
                let _ = write!(section, "\n  {}", task_line(card));
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A board snapshot in the chosen view, followed by its page bar.
#[must_use]
pub fn board(snapshot: &BoardSnapshot, view: ViewMode) -> String {
    let mut out = match view {
        ViewMode::Grid => grid(&snapshot.tasks),
        ViewMode::Kanban => kanban(&snapshot.tasks),
    };
    let pages = render_window(snapshot.current_page, snapshot.total_pages);
    if !pages.is_empty() {
        let _ = write!(out, "\n\nPage {pages}");
    }
    out
}

/// One-line summary of a project.
#[must_use]
pub fn project_line(project: &Project) -> String {
    let mut line = format!("#{} {}", project.id, project.name);
    if let Some(status) = project.status {
        let _ = write!(line, " [{status}]");
    }
    line
}

/// One-line summary of a team member.
#[must_use]
pub fn member_line(member: &TeamMember) -> String {
    format!("#{} {} <{}>", member.id, member.name, member.email)
}

/// One-line summary of a user.
#[must_use]
pub fn user_line(user: &User) -> String {
    format!("#{} {} <{}>", user.id, user.name, user.email)
}

/// Dashboard counts, due-date alerts, and recent tasks.
#[must_use]
pub fn dashboard(dashboard: &Dashboard) -> String {
    let s = &dashboard.stats;
    let mut out = format!(
        "Tasks: {} total, {} completed, {} pending, {} overdue\n\
         Open high priority: {}, urgent: {}\n\
         Completed this week: {}\n\
         Projects: {}",
        s.total,
        s.completed,
        s.pending,
        s.overdue,
        s.high_priority,
        s.urgent,
        s.completed_this_week,
        s.total_projects
    );
    if !dashboard.alerts.is_empty() {
        out.push_str("\n\nAlerts:");
        for alert in &dashboard.alerts {
            let _ = write!(out, "\n  {}", alert.describe());
        }
    }
    if !s.recent.is_empty() {
        out.push_str("\n\nRecent tasks:");
        for task in &s.recent {
            let _ = write!(out, "\n  {}", task_line(task));
        }
    }
    out
}

/// Search results grouped by kind.
#[must_use]
pub fn search_results(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No results.".to_string();
    }
    let mut sections = Vec::new();
    if !results.projects.is_empty() {
        let lines: Vec<String> = results.projects.iter().map(project_line).collect();
        sections.push(format!("Projects:\n  {}", lines.join("\n  ")));
    }
    if !results.tasks.is_empty() {
        let lines: Vec<String> = results.tasks.iter().map(task_line).collect();
        sections.push(format!("Tasks:\n  {}", lines.join("\n  ")));
    }
    sections.join("\n\n")
}
