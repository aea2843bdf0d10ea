//! Global search across projects and tasks.

use techflow_proto::project::{Project, ProjectQuery};
use techflow_proto::task::{Task, TaskFilter};

use crate::api::{ApiError, ProjectService, TaskService};

/// Queries shorter than this (after trimming) are not sent.
pub const MIN_QUERY_LEN: usize = 2;

/// Page size for both searches.
pub const SEARCH_LIMIT: u32 = 20;

/// Matching projects and tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Projects the service matched.
    pub projects: Vec<Project>,
    /// Tasks whose title or description contains the query.
    pub tasks: Vec<Task>,
}

impl SearchResults {
    /// Returns `true` when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.tasks.is_empty()
    }
}

/// Case-insensitive substring match on title or description.
#[must_use]
pub fn task_matches(task: &Task, query: &str) -> bool {
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Searches projects server-side and tasks client-side.
///
/// Projects come from `GET /projects?search=`; tasks are the first
/// [`SEARCH_LIMIT`] tasks filtered locally. Both requests run concurrently.
/// A query shorter than [`MIN_QUERY_LEN`] returns no results without
/// calling the service.
///
/// # Errors
///
/// Returns the first [`ApiError`] of either request.
pub async fn search<T, P>(tasks: &T, projects: &P, query: &str) -> Result<SearchResults, ApiError>
where
    T: TaskService,
    P: ProjectService,
{
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(SearchResults::default());
    }

    let project_query = ProjectQuery {
        page: 1,
        limit: SEARCH_LIMIT,
        search: Some(query.to_string()),
    };
    let task_filter = TaskFilter {
        limit: Some(SEARCH_LIMIT),
        ..TaskFilter::default()
    };
    let (project_page, task_page) = tokio::try_join!(
        projects.list_projects(&project_query),
        tasks.list_tasks(&task_filter)
    )?;

    let results = SearchResults {
        projects: project_page.projects,
        tasks: task_page
            .tasks
            .into_iter()
            .filter(|t| task_matches(t, query))
            .collect(),
    };
    tracing::debug!(
        query,
        projects = results.projects.len(),
        tasks = results.tasks.len(),
        "search finished"
    );
    Ok(results)
}
