//! Dashboard statistics and due-date alerts.
//!
//! All date arithmetic is done on UTC calendar days.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use techflow_proto::Id;
use techflow_proto::project::ProjectQuery;
use techflow_proto::task::{Task, TaskFilter, TaskPriority, TaskStatus};

use crate::api::{ApiError, ProjectService, TaskService};
use crate::config::ClientConfig;

/// Tasks fetched for the dashboard.
pub const DASHBOARD_TASK_LIMIT: u32 = 100;

/// Projects fetched for the dashboard.
pub const DASHBOARD_PROJECT_LIMIT: u32 = 100;

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// All tasks.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Tasks not completed.
    pub pending: usize,
    /// Open tasks whose due day is before today.
    pub overdue: usize,
    /// Open tasks with high priority.
    pub high_priority: usize,
    /// Open tasks with urgent priority.
    pub urgent: usize,
    /// Completed tasks updated in the last seven days.
    pub completed_this_week: usize,
    /// Projects on the first page.
    pub total_projects: usize,
    /// The first tasks of the list.
    pub recent: Vec<Task>,
}

/// Kind of due-date alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueAlertKind {
    /// Due day is in the past.
    Overdue,
    /// Due today or within the due-soon window.
    DueSoon,
}

/// A task that needs attention because of its due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAlert {
    /// Task id.
    pub task_id: Id,
    /// Task title.
    pub title: String,
    /// Due day.
    pub due: NaiveDate,
    /// Days from today to the due day; negative when overdue.
    pub days_until_due: i64,
    /// Alert kind.
    pub kind: DueAlertKind,
}

impl DueAlert {
    /// One-line description for terminal output.
    #[must_use]
    pub fn describe(&self) -> String {
        match (self.kind, self.days_until_due) {
            (DueAlertKind::Overdue, days) => {
                format!("Overdue: \"{}\" was due {} ({} day(s) ago)", self.title, self.due, -days)
            }
            (DueAlertKind::DueSoon, 0) => format!("Due today: \"{}\"", self.title),
            (DueAlertKind::DueSoon, days) => {
                format!("Due soon: \"{}\" is due in {days} day(s)", self.title)
            }
        }
    }
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// Counts.
    pub stats: DashboardStats,
    /// Due-date alerts, in task order.
    pub alerts: Vec<DueAlert>,
}

/// Tunables for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Size of the recent list.
    pub recent_count: usize,
    /// Upper bound (inclusive, in days) of the due-soon window.
    pub due_soon_days: i64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            recent_count: 5,
            due_soon_days: 3,
        }
    }
}

impl From<&ClientConfig> for DashboardOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            recent_count: config.recent_count,
            due_soon_days: config.due_soon_days,
        }
    }
}

/// Parses a task's due date (`YYYY-MM-DD` or RFC 3339) into a UTC day.
#[must_use]
pub fn due_day(task: &Task) -> Option<NaiveDate> {
    let raw = task.due_date.as_deref()?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

fn is_open(task: &Task) -> bool {
    task.status != TaskStatus::Completed
}

/// Computes dashboard counts.
///
/// `now` fixes both "today" (for overdue) and the seven-day window (for
/// completed this week).
#[must_use]
pub fn compute_stats(
    tasks: &[Task],
    total_projects: usize,
    now: DateTime<Utc>,
    recent_count: usize,
) -> DashboardStats {
    let today = now.date_naive();
    let week_ago = now - Duration::days(7);
    let open_with = |priority| {
        tasks
            .iter()
            .filter(|t| is_open(t) && t.priority == priority)
            .count()
    };

    let completed = tasks.iter().filter(|t| !is_open(t)).count();
    DashboardStats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
        overdue: tasks
            .iter()
            .filter(|t| is_open(t) && due_day(t).is_some_and(|d| d < today))
            .count(),
        high_priority: open_with(TaskPriority::High),
        urgent: open_with(TaskPriority::Urgent),
        completed_this_week: tasks
            .iter()
            .filter(|t| !is_open(t))
            .filter_map(|t| t.updated_at.as_deref())
            .filter_map(|u| DateTime::parse_from_rfc3339(u).ok())
            .filter(|u| u.with_timezone(&Utc) >= week_ago)
            .count(),
        total_projects,
        recent: tasks.iter().take(recent_count).cloned().collect(),
    }
}

/// Open tasks that are overdue or due within `due_soon_days` of `today`.
#[must_use]
pub fn due_alerts(tasks: &[Task], today: NaiveDate, due_soon_days: i64) -> Vec<DueAlert> {
    tasks
        .iter()
        .filter(|t| is_open(t))
        .filter_map(|t| {
            let due = due_day(t)?;
            let days_until_due = (due - today).num_days();
            let kind = if days_until_due < 0 {
                DueAlertKind::Overdue
            } else if days_until_due <= due_soon_days {
                DueAlertKind::DueSoon
            } else {
                return None;
            };
            Some(DueAlert {
                task_id: t.id.clone(),
                title: t.title.clone(),
                due,
                days_until_due,
                kind,
            })
        })
        .collect()
}

/// Fetches tasks and projects concurrently and builds the dashboard.
///
/// # Errors
///
/// Returns the first [`ApiError`] of either fetch.
pub async fn load_dashboard<T, P>(
    tasks: &T,
    projects: &P,
    options: DashboardOptions,
) -> Result<Dashboard, ApiError>
where
    T: TaskService,
    P: ProjectService,
{
    let task_filter = TaskFilter {
        limit: Some(DASHBOARD_TASK_LIMIT),
        ..TaskFilter::default()
    };
    let project_query = ProjectQuery {
        page: 1,
        limit: DASHBOARD_PROJECT_LIMIT,
        search: None,
    };
    let (task_page, project_page) = tokio::try_join!(
        tasks.list_tasks(&task_filter),
        projects.list_projects(&project_query)
    )?;

    let now = Utc::now();
    let stats = compute_stats(
        &task_page.tasks,
        project_page.projects.len(),
        now,
        options.recent_count,
    );
    let alerts = due_alerts(&task_page.tasks, now.date_naive(), options.due_soon_days);
    tracing::debug!(
        total = stats.total,
        overdue = stats.overdue,
        alerts = alerts.len(),
        "dashboard loaded"
    );
    Ok(Dashboard { stats, alerts })
}
