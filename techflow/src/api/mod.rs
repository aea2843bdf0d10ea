//! Service layer for the `TechFlow` REST API.
//!
//! Defines one trait per resource family. Concrete implementations:
//! - [`http::HttpClient`]: reqwest client for the real service
//! - [`memory::MemoryTaskService`]: in-process task store for tests and demos
//!
//! Every implementation speaks the camelCase document shape; the HTTP
//! client is the only place that touches snake_case.

pub mod http;
pub mod memory;
pub mod payload;

use std::future::Future;

use techflow_proto::Id;
use techflow_proto::auth::{Credentials, LoginResponse, RegisterResponse, Registration, User};
use techflow_proto::error::ServerError;
use techflow_proto::project::{Project, ProjectDraft, ProjectPage, ProjectQuery};
use techflow_proto::task::{Task, TaskDraft, TaskFilter, TaskPage, TaskStatus, TaskUpdate};
use techflow_proto::team::TeamMember;

pub use payload::ValidationError;

/// Errors that can occur during a service call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Input was rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service answered with a non-2xx status.
    #[error("server returned {status}: {}", .body.message())]
    Status {
        /// HTTP status code.
        status: u16,
        /// Parsed error body.
        body: ServerError,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot be used.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    /// The requested entity does not exist (in-memory services only).
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `task`.
        kind: &'static str,
        /// Requested id.
        id: Id,
    },

    /// A scripted failure from an in-memory service.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl ApiError {
    /// Best-effort message suitable for showing to a user.
    ///
    /// Prefers the server-provided text; falls back to a generic line per
    /// error kind.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, body } if body.is_blank() => {
                format!("Request failed with status {status}")
            }
            Self::Status { body, .. } => body.message(),
            Self::Validation(e) => e.to_string(),
            Self::Transport(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            Self::Transport(_) => "Could not reach the server".to_string(),
            Self::Decode(_) => "The server sent an unexpected response".to_string(),
            Self::InvalidUrl(url) => format!("Invalid server address: {url}"),
            Self::NotFound { kind, id } => format!("{kind} {id} not found"),
            Self::Injected(message) => message.clone(),
        }
    }

    /// Returns `true` for HTTP 401, which means the token is missing or
    /// expired.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// Task operations.
pub trait TaskService: Send + Sync {
    /// Lists one page of tasks matching `filter`.
    fn list_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<TaskPage, ApiError>> + Send;

    /// Fetches one task.
    fn get_task(&self, id: &Id) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Creates a task. The draft is validated before any network call.
    fn create_task(&self, draft: &TaskDraft)
    -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Applies a partial update.
    fn update_task(
        &self,
        id: &Id,
        update: &TaskUpdate,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Changes only the status of a task.
    fn update_task_status(
        &self,
        id: &Id,
        status: TaskStatus,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Deletes a task.
    fn delete_task(&self, id: &Id) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Project operations.
pub trait ProjectService: Send + Sync {
    /// Lists one page of projects.
    fn list_projects(
        &self,
        query: &ProjectQuery,
    ) -> impl Future<Output = Result<ProjectPage, ApiError>> + Send;

    /// Fetches one project, with its tasks when the service embeds them.
    fn get_project(&self, id: &Id) -> impl Future<Output = Result<Project, ApiError>> + Send;

    /// Creates a project. A name is required.
    fn create_project(
        &self,
        draft: &ProjectDraft,
    ) -> impl Future<Output = Result<Project, ApiError>> + Send;

    /// Updates the supplied fields of a project.
    fn update_project(
        &self,
        id: &Id,
        draft: &ProjectDraft,
    ) -> impl Future<Output = Result<Project, ApiError>> + Send;

    /// Deletes a project.
    fn delete_project(&self, id: &Id) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Team roster operations.
pub trait TeamService: Send + Sync {
    /// Lists team members.
    fn list_members(&self) -> impl Future<Output = Result<Vec<TeamMember>, ApiError>> + Send;

    /// Lists the tasks assigned to one member.
    fn member_tasks(&self, id: &Id) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;
}

/// Account operations.
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for a token.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// Creates an account.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<RegisterResponse, ApiError>> + Send;

    /// Returns the user the current token belongs to.
    fn profile(&self) -> impl Future<Output = Result<User, ApiError>> + Send;
}

/// Creates an account and then logs in with the same credentials.
///
/// # Errors
///
/// Returns the error of whichever call fails first.
pub async fn register_and_login<A: AuthService>(
    auth: &A,
    registration: &Registration,
) -> Result<LoginResponse, ApiError> {
    let created = auth.register(registration).await?;
    tracing::info!(email = %registration.email, message = %created.message, "account created");
    auth.login(&registration.credentials()).await
}

/// Lists every page of tasks matching `filter`, in service order.
///
/// Paging fields of `filter` are ignored apart from `limit`.
///
/// # Errors
///
/// Returns the first failed page's error.
pub async fn list_all_tasks<T: TaskService>(
    tasks: &T,
    filter: &TaskFilter,
) -> Result<Vec<Task>, ApiError> {
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let query = TaskFilter {
            page: Some(page),
            ..filter.clone()
        };
        let fetched = tasks.list_tasks(&query).await?;
        let done = fetched.tasks.is_empty() || page >= fetched.total_pages;
        all.extend(fetched.tasks);
        if done {
            return Ok(all);
        }
        page += 1;
    }
}
