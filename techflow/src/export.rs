//! CSV export of task lists.
//!
//! Every cell is quoted and embedded quotes are doubled. Missing values
//! become empty cells. Rows are joined with `\n`.

use chrono::NaiveDate;
use techflow_proto::task::Task;

/// Column headers, in order.
pub const HEADERS: [&str; 8] = [
    "Title",
    "Description",
    "Status",
    "Priority",
    "Project",
    "Due Date",
    "Assignee",
    "Created",
];

/// Errors that can occur when exporting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// There are no tasks to export.
    #[error("no data to export")]
    NoData,
}

/// Projects a task onto the export columns.
#[must_use]
pub fn task_row(task: &Task) -> [String; 8] {
    [
        task.title.clone(),
        task.description.clone().unwrap_or_default(),
        task.status.as_str().to_string(),
        task.priority.as_str().to_string(),
        task.project
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        task.due_date.clone().unwrap_or_default(),
        task.assigned_user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_default(),
        task.created_at.clone().unwrap_or_default(),
    ]
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn line<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| quote(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders tasks as CSV text with a header row.
///
/// # Errors
///
/// Returns [`ExportError::NoData`] if `tasks` is empty.
pub fn tasks_to_csv(tasks: &[Task]) -> Result<String, ExportError> {
    if tasks.is_empty() {
        return Err(ExportError::NoData);
    }
    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(line(&HEADERS));
    lines.extend(tasks.iter().map(|t| line(&task_row(t))));
    Ok(lines.join("\n"))
}

/// Default export file name for `today`, e.g. `tasks-2024-06-15.csv`.
#[must_use]
pub fn default_file_name(today: NaiveDate) -> String {
    format!("tasks-{}.csv", today.format("%Y-%m-%d"))
}
