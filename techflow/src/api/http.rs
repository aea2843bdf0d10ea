//! reqwest-backed client for the `TechFlow` REST API.
//!
//! Every outgoing body goes through [`frontend_to_api`] and every incoming
//! body through [`api_to_frontend`], so the rest of the crate only sees the
//! camelCase document shape. Non-2xx responses become
//! [`ApiError::Status`] with the body parsed as a [`ServerError`].
//! Requests are never retried.

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use techflow_proto::Id;
use techflow_proto::auth::{Credentials, LoginResponse, RegisterResponse, Registration, User};
use techflow_proto::case::{api_to_frontend, frontend_to_api};
use techflow_proto::error::ServerError;
use techflow_proto::project::{Project, ProjectDraft, ProjectPage, ProjectQuery};
use techflow_proto::task::{
    MemberTasks, StatusChange, Task, TaskDraft, TaskFilter, TaskPage, TaskStatus, TaskUpdate,
};
use techflow_proto::team::{TeamMember, TeamRoster};
use url::Url;

use super::payload::{
    create_task_body, update_task_body, validate_credentials, validate_new_project,
    validate_registration,
};
use super::{ApiError, AuthService, ProjectService, TaskService, TeamService};
use crate::config::ClientConfig;
use crate::session::Session;

/// HTTP client bound to one base URL and, optionally, one bearer token.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpClient {
    /// Builds a client from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the base URL cannot carry a path,
    /// or [`ApiError::Transport`] if the TLS backend fails to initialise.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let mut builder = Client::builder().user_agent(concat!("techflow/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base,
            token: None,
        })
    }

    /// Attaches a session; subsequent requests send its bearer token.
    #[must_use]
    pub fn with_session(mut self, session: &Session) -> Self {
        self.set_session(session);
        self
    }

    /// Replaces the bearer token.
    pub fn set_session(&mut self, session: &Session) {
        self.token = Some(session.token().to_string());
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends path segments to the base URL. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "request");
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends a request and returns the raw body of a 2xx response.
    async fn send(request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let body = ServerError::from_body(&text);
            tracing::warn!(status = status.as_u16(), message = %body.message(), "request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(text)
    }

    /// Sends a request and decodes the camelCase form of the response body.
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let text = Self::send(request).await?;
        let wire: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(api_to_frontend(wire))?)
    }

    /// Converts a camelCase document to a snake_case wire body.
    fn wire_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        Ok(frontend_to_api(serde_json::to_value(body)?))
    }
}

impl TaskService for HttpClient {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<TaskPage, ApiError> {
        let request = self
            .request(Method::GET, &["tasks"])?
            .query(&filter.query_pairs());
        let mut page: TaskPage = Self::send_json(request).await?;
        if page.current_page.is_none() {
            page.current_page = Some(filter.page.unwrap_or(1));
        }
        Ok(page)
    }

    async fn get_task(&self, id: &Id) -> Result<Task, ApiError> {
        Self::send_json(self.request(Method::GET, &["tasks", id.as_str()])?).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let body = Self::wire_body(&create_task_body(draft)?)?;
        Self::send_json(self.request(Method::POST, &["tasks"])?.json(&body)).await
    }

    async fn update_task(&self, id: &Id, update: &TaskUpdate) -> Result<Task, ApiError> {
        let body = Self::wire_body(&update_task_body(update)?)?;
        Self::send_json(
            self.request(Method::PUT, &["tasks", id.as_str()])?
                .json(&body),
        )
        .await
    }

    async fn update_task_status(&self, id: &Id, status: TaskStatus) -> Result<Task, ApiError> {
        let body = Self::wire_body(&StatusChange { status })?;
        Self::send_json(
            self.request(Method::PATCH, &["tasks", id.as_str(), "status"])?
                .json(&body),
        )
        .await
    }

    async fn delete_task(&self, id: &Id) -> Result<(), ApiError> {
        Self::send(self.request(Method::DELETE, &["tasks", id.as_str()])?).await?;
        Ok(())
    }
}

impl ProjectService for HttpClient {
    async fn list_projects(&self, query: &ProjectQuery) -> Result<ProjectPage, ApiError> {
        let request = self
            .request(Method::GET, &["projects"])?
            .query(&query.query_pairs());
        Self::send_json(request).await
    }

    async fn get_project(&self, id: &Id) -> Result<Project, ApiError> {
        Self::send_json(self.request(Method::GET, &["projects", id.as_str()])?).await
    }

    async fn create_project(&self, draft: &ProjectDraft) -> Result<Project, ApiError> {
        validate_new_project(draft)?;
        let body = Self::wire_body(draft)?;
        Self::send_json(self.request(Method::POST, &["projects"])?.json(&body)).await
    }

    async fn update_project(&self, id: &Id, draft: &ProjectDraft) -> Result<Project, ApiError> {
        let body = Self::wire_body(draft)?;
        Self::send_json(
            self.request(Method::PUT, &["projects", id.as_str()])?
                .json(&body),
        )
        .await
    }

    async fn delete_project(&self, id: &Id) -> Result<(), ApiError> {
        Self::send(self.request(Method::DELETE, &["projects", id.as_str()])?).await?;
        Ok(())
    }
}

impl TeamService for HttpClient {
    async fn list_members(&self) -> Result<Vec<TeamMember>, ApiError> {
        let roster: TeamRoster =
            Self::send_json(self.request(Method::GET, &["team", "members"])?).await?;
        Ok(roster.members)
    }

    async fn member_tasks(&self, id: &Id) -> Result<Vec<Task>, ApiError> {
        let tasks: MemberTasks = Self::send_json(self.request(
            Method::GET,
            &["team", "members", id.as_str(), "tasks"],
        )?)
        .await?;
        Ok(tasks.tasks)
    }
}

impl AuthService for HttpClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        validate_credentials(credentials)?;
        let body = Self::wire_body(credentials)?;
        Self::send_json(self.request(Method::POST, &["auth", "login"])?.json(&body)).await
    }

    async fn register(&self, registration: &Registration) -> Result<RegisterResponse, ApiError> {
        validate_registration(registration)?;
        let body = Self::wire_body(registration)?;
        Self::send_json(
            self.request(Method::POST, &["auth", "register"])?
                .json(&body),
        )
        .await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        Self::send_json(self.request(Method::GET, &["auth", "profile"])?).await
    }
}
