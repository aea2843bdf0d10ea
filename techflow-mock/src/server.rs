//! HTTP surface of the mock service.
//!
//! Routes live under `/v1` and speak snake_case JSON: every response body
//! passes through [`frontend_to_api`] and every request body through
//! [`api_to_frontend`] before it reaches the [`MockStore`]. List filters are
//! camelCase query parameters. Everything except register and login needs
//! `Authorization: Bearer <token>`.
//!
//! Tests can script failures with [`MockState::fail_next`] and slow the
//! service down with [`MockState::set_delay`].

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use techflow_proto::Id;
use techflow_proto::auth::{Credentials, Registration, User};
use techflow_proto::case::{api_to_frontend, frontend_to_api};
use techflow_proto::project::ProjectDraft;
use techflow_proto::task::{MemberTasks, StatusChange, TaskFilter, TaskPriority, TaskStatus};
use techflow_proto::team::TeamRoster;
use tokio::task::JoinHandle;

use crate::store::{MockStore, StoreError};

/// A scripted response returned instead of running the next request.
#[derive(Debug, Clone)]
struct InjectedFailure {
    status: StatusCode,
    body: Value,
}

/// Shared server state: the store plus scripted behaviour.
#[derive(Debug, Default)]
pub struct MockState {
    /// Backing data.
    pub store: MockStore,
    failures: Mutex<VecDeque<InjectedFailure>>,
    delay: Mutex<Option<Duration>>,
}

impl MockState {
    /// Creates state around an existing store.
    #[must_use]
    pub fn with_store(store: MockStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Queues a failure: the next request gets `status` and `body` without
    /// touching the store. Failures are consumed in FIFO order.
    pub fn fail_next(&self, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.failures
            .lock()
            .push_back(InjectedFailure { status, body });
    }

    /// Delays every subsequent request by `delay`. `None` removes the delay.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type of every handler. Renders a JSON body in one of the shapes
/// the real service uses.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The body could not be decoded.
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),

    /// A query parameter could not be parsed.
    #[error("invalid query parameter {name}: {value}")]
    Query {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            Self::Store(StoreError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            Self::Store(StoreError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            Self::Store(StoreError::EmailTaken) => {
                (StatusCode::CONFLICT, json!({ "message": message }))
            }
            Self::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            Self::Store(StoreError::Invalid(_)) | Self::Body(_) | Self::Query { .. } => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
        };
        tracing::debug!(status = status.as_u16(), %message, "request rejected");
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Extractors and helpers
// ---------------------------------------------------------------------------

/// The user a bearer token belongs to.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<MockState>> for CurrentUser {
    type Rejection = MockError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<MockState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(StoreError::Unauthorized)?;
        Ok(Self(state.store.authenticate(token.trim()).await?))
    }
}

/// A snake_case request body, converted to document shape.
struct WireJson(Value);

impl WireJson {
    fn decode<T: serde::de::DeserializeOwned>(self) -> Result<T, MockError> {
        Ok(serde_json::from_value(self.0)?)
    }
}

impl<S: Send + Sync> FromRequest<S> for WireJson {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(api_to_frontend(value)))
    }
}

/// Serializes a document-shaped value as a snake_case JSON response.
fn wire<T: Serialize>(value: &T) -> Result<Json<Value>, MockError> {
    Ok(Json(frontend_to_api(serde_json::to_value(value)?)))
}

/// Runs scripted delays and failures before the real handler.
async fn scripted(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let delay = *state.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let failure = state.failures.lock().pop_front();
    if let Some(failure) = failure {
        tracing::debug!(
            status = failure.status.as_u16(),
            uri = %request.uri(),
            "returning injected failure"
        );
        return (failure.status, Json(failure.body)).into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskQuery {
    project_id: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    assigned_to: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl TaskQuery {
    fn into_filter(self) -> Result<TaskFilter, MockError> {
        let status = self
            .status
            .map(|v| {
                v.parse::<TaskStatus>()
                    .map_err(|_| MockError::Query { name: "status", value: v })
            })
            .transpose()?;
        let priority = self
            .priority
            .map(|v| {
                v.parse::<TaskPriority>()
                    .map_err(|_| MockError::Query { name: "priority", value: v })
            })
            .transpose()?;
        Ok(TaskFilter {
            project_id: self.project_id.map(Id::from),
            status,
            priority,
            assigned_to: self.assigned_to.map(Id::from),
            page: self.page,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProjectListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
}

async fn register(
    State(state): State<Arc<MockState>>,
    body: WireJson,
) -> Result<impl IntoResponse, MockError> {
    let registration: Registration = body.decode()?;
    state
        .store
        .register(&registration.email, &registration.password, &registration.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

async fn login(
    State(state): State<Arc<MockState>>,
    body: WireJson,
) -> Result<Json<Value>, MockError> {
    let credentials: Credentials = body.decode()?;
    let response = state
        .store
        .login(&credentials.email, &credentials.password)
        .await?;
    wire(&response)
}

async fn profile(CurrentUser(user): CurrentUser) -> Result<Json<Value>, MockError> {
    wire(&user)
}

async fn list_projects(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Value>, MockError> {
    let page = state
        .store
        .list_projects(query.page, query.limit, query.search.as_deref())
        .await;
    wire(&page)
}

async fn get_project(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    wire(&state.store.project(&Id::from(id)).await?)
}

async fn create_project(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    body: WireJson,
) -> Result<impl IntoResponse, MockError> {
    let draft: ProjectDraft = body.decode()?;
    let project = state.store.create_project(draft).await?;
    Ok((StatusCode::CREATED, wire(&project)?))
}

async fn update_project(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
    body: WireJson,
) -> Result<Json<Value>, MockError> {
    let draft: ProjectDraft = body.decode()?;
    wire(&state.store.update_project(&Id::from(id), draft).await?)
}

async fn delete_project(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    state.store.delete_project(&Id::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Value>, MockError> {
    let filter = query.into_filter()?;
    wire(&state.store.list_tasks(&filter).await)
}

async fn get_task(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    wire(&state.store.task(&Id::from(id)).await?)
}

async fn create_task(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    body: WireJson,
) -> Result<impl IntoResponse, MockError> {
    let task = state.store.create_task(body.0).await?;
    Ok((StatusCode::CREATED, wire(&task)?))
}

async fn update_task(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
    body: WireJson,
) -> Result<Json<Value>, MockError> {
    let Value::Object(fields) = body.0 else {
        return Err(StoreError::Invalid("expected a JSON object".to_string()).into());
    };
    wire(&state.store.update_task(&Id::from(id), fields).await?)
}

async fn update_task_status(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
    body: WireJson,
) -> Result<Json<Value>, MockError> {
    let change: StatusChange = body.decode()?;
    let task = state
        .store
        .set_task_status(&Id::from(id), change.status)
        .await?;
    tracing::debug!(task_id = %task.id, status = %task.status, "status changed");
    wire(&task)
}

async fn delete_task(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    state.store.delete_task(&Id::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
) -> Result<Json<Value>, MockError> {
    wire(&TeamRoster {
        members: state.store.members().await,
    })
}

async fn member_tasks(
    State(state): State<Arc<MockState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    wire(&MemberTasks {
        tasks: state.store.member_tasks(&Id::from(id)).await?,
    })
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Builds the router with every route mounted under `/v1`.
pub fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/status", patch(update_task_status))
        .route("/team/members", get(list_members))
        .route("/team/members/{id}/tasks", get(member_tasks))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), scripted));
    Router::new().nest("/v1", api).with_state(state)
}

/// Starts the mock service on the given address with empty state and
/// returns the bound address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_state(addr, Arc::new(MockState::default())).await
}

/// Starts the mock service with a pre-built [`MockState`]. Keep a clone of
/// the `Arc` to script failures from a test.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<MockState>,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "mock server error");
        }
    });

    Ok((bound_addr, handle))
}
