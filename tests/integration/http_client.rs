//! Integration tests for the HTTP client against the in-process mock.
//!
//! Validates end to end:
//! - Register, login, and profile with a bearer token
//! - snake_case on the wire, camelCase in the client's types
//! - Task and project CRUD, filters, and paging
//! - Error bodies in every shape the service uses
//! - Validation before any request, and the opt-in request timeout

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use techflow::api::http::HttpClient;
use techflow::api::{
    self, ApiError, AuthService, ProjectService, TaskService, TeamService, ValidationError,
};
use techflow::config::ClientConfig;
use techflow::session::Session;
use techflow_mock::server::{MockState, start_server_with_state};
use techflow_proto::Id;
use techflow_proto::auth::{Registration, User};
use techflow_proto::project::{Project, ProjectDraft, ProjectQuery, ProjectStatus};
use techflow_proto::task::{TaskDraft, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};

struct Harness {
    state: Arc<MockState>,
    config: ClientConfig,
    _handle: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let (addr, handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
            .await
            .expect("failed to start mock server");
        let config = ClientConfig {
            base_url: format!("http://{addr}/v1"),
            ..ClientConfig::default()
        };
        Self {
            state,
            config,
            _handle: handle,
        }
    }

    fn anonymous(&self) -> HttpClient {
        HttpClient::new(&self.config).unwrap()
    }

    async fn signed_up(&self, name: &str, email: &str) -> (HttpClient, User) {
        let client = self.anonymous();
        let response = api::register_and_login(
            &client,
            &Registration {
                email: email.to_string(),
                password: "secret".to_string(),
                name: name.to_string(),
            },
        )
        .await
        .unwrap();
        let session = Session::try_from(response).unwrap();
        let user = session.user().cloned().unwrap();
        (client.with_session(&session), user)
    }
}

async fn project(client: &HttpClient, name: &str) -> Project {
    client
        .create_project(&ProjectDraft {
            name: Some(name.to_string()),
            description: Some(format!("{name} work")),
            status: None,
        })
        .await
        .unwrap()
}

fn draft(title: &str, project: &Project) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: None,
        project_id: project.id.clone(),
        priority: TaskPriority::Medium,
        due_date: None,
        assigned_to: None,
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn register_login_and_profile() {
    let harness = Harness::start().await;
    let (client, user) = harness.signed_up("Ana", "ana@example.com").await;

    assert_eq!(user.name, "Ana");
    assert!(user.created_at.is_some());
    let profile = client.profile().await.unwrap();
    assert_eq!(profile, user);
}

#[tokio::test]
async fn calls_without_a_token_are_unauthorized() {
    let harness = Harness::start().await;
    let err = harness
        .anonymous()
        .list_tasks(&TaskFilter::default())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Unauthorized");
}

#[tokio::test]
async fn wrong_password_reports_server_error_text() {
    let harness = Harness::start().await;
    harness.signed_up("Ana", "ana@example.com").await;

    let err = harness
        .anonymous()
        .login(&techflow_proto::auth::Credentials {
            email: "ana@example.com".to_string(),
            password: "guess".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let harness = Harness::start().await;
    harness.signed_up("Ana", "ana@example.com").await;

    let err = harness
        .anonymous()
        .register(&Registration {
            email: "ana@example.com".to_string(),
            password: "x".to_string(),
            name: "Other".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 409, .. }));
}

// =============================================================================
// Tasks
// =============================================================================

#[tokio::test]
async fn create_task_normalizes_due_date_and_embeds_relations() {
    let harness = Harness::start().await;
    let (client, user) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;

    let task = client
        .create_task(&TaskDraft {
            description: Some("  copy edits  ".to_string()),
            priority: TaskPriority::High,
            due_date: Some("2024-07-01".to_string()),
            assigned_to: Some(user.id.to_string()),
            ..draft("  Launch page ", &website)
        })
        .await
        .unwrap();

    assert_eq!(task.title, "Launch page");
    assert_eq!(task.description.as_deref(), Some("copy edits"));
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, TaskPriority::High);
    assert_eq!(task.due_date.as_deref(), Some("2024-07-01T00:00:00.000Z"));
    assert_eq!(task.project_id.as_ref(), Some(&website.id));
    assert_eq!(task.project.as_ref().map(|p| p.name.as_str()), Some("Website"));
    assert_eq!(task.assigned_to.as_ref(), Some(&user.id));
    assert_eq!(task.assigned_user.as_ref(), Some(&user));
}

#[tokio::test]
async fn update_clears_fields_and_status_patch_persists() {
    let harness = Harness::start().await;
    let (client, user) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;
    let task = client
        .create_task(&TaskDraft {
            due_date: Some("2024-07-01".to_string()),
            assigned_to: Some(user.id.to_string()),
            ..draft("Launch", &website)
        })
        .await
        .unwrap();

    let updated = client
        .update_task(
            &task.id,
            &TaskUpdate {
                title: Some(" Launch v2 ".to_string()),
                due_date: Some(None),
                assigned_to: Some(Some(String::new())),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Launch v2");
    assert_eq!(updated.due_date, None);
    assert_eq!(updated.assigned_to, None);
    assert_eq!(updated.assigned_user, None);

    let moved = client
        .update_task_status(&task.id, TaskStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(moved.status, TaskStatus::InProgress);
    let fetched = client.get_task(&task.id).await.unwrap();
    assert_eq!(fetched.status, TaskStatus::InProgress);
    assert_eq!(fetched.title, "Launch v2");
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;
    let task = client.create_task(&draft("Gone soon", &website)).await.unwrap();

    client.delete_task(&task.id).await.unwrap();
    let err = client.get_task(&task.id).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert_eq!(err.user_message(), "Task not found");
}

#[tokio::test]
async fn list_filters_and_pages() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;
    let mobile = project(&client, "Mobile").await;

    for n in 0..5 {
        client
            .create_task(&draft(&format!("web {n}"), &website))
            .await
            .unwrap();
    }
    let other = client.create_task(&draft("app", &mobile)).await.unwrap();
    client
        .update_task_status(&other.id, TaskStatus::Completed)
        .await
        .unwrap();

    let page = client
        .list_tasks(&TaskFilter {
            project_id: Some(website.id.clone()),
            page: Some(2),
            limit: Some(2),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, Some(2));
    let titles: Vec<&str> = page.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["web 2", "web 3"]);

    let done = client
        .list_tasks(&TaskFilter {
            status: Some(TaskStatus::Completed),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(done.tasks.len(), 1);
    assert_eq!(done.tasks[0].id, other.id);

    let all = api::list_all_tasks(
        &client,
        &TaskFilter {
            limit: Some(4),
            ..TaskFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_service() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;

    // A queued failure would be returned by the next request that arrives.
    harness.state.fail_next(500, json!({ "message": "should not be seen" }));

    let err = client.create_task(&draft("   ", &website)).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::TitleRequired)
    ));
    let err = client
        .create_task(&TaskDraft {
            due_date: Some("next week".to_string()),
            ..draft("Plan", &website)
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::InvalidDueDate(_))
    ));
    let err = client
        .create_project(&ProjectDraft::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::NameRequired)));

    let err = client.list_tasks(&TaskFilter::default()).await.unwrap_err();
    assert_eq!(err.user_message(), "should not be seen");
}

// =============================================================================
// Projects and team
// =============================================================================

#[tokio::test]
async fn project_crud_and_search() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    let website = project(&client, "Website").await;
    project(&client, "Mobile").await;
    client.create_task(&draft("Hero", &website)).await.unwrap();

    assert_eq!(website.status, Some(ProjectStatus::Active));
    let detail = client.get_project(&website.id).await.unwrap();
    assert_eq!(detail.tasks.as_ref().map(Vec::len), Some(1));

    let found = client
        .list_projects(&ProjectQuery {
            search: Some("WEB".to_string()),
            ..ProjectQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(found.projects.len(), 1);
    assert_eq!(found.current_page, 1);

    let renamed = client
        .update_project(
            &website.id,
            &ProjectDraft {
                name: Some("Marketing site".to_string()),
                status: Some(ProjectStatus::OnHold),
                ..ProjectDraft::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Marketing site");
    assert_eq!(renamed.status, Some(ProjectStatus::OnHold));
    assert_eq!(renamed.description.as_deref(), Some("Website work"));

    client.delete_project(&website.id).await.unwrap();
    let err = client.get_project(&website.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert!(client.list_tasks(&TaskFilter::default()).await.unwrap().tasks.is_empty());
}

#[tokio::test]
async fn team_members_and_their_tasks() {
    let harness = Harness::start().await;
    let (client, ana) = harness.signed_up("Ana", "ana@example.com").await;
    let (_, bo) = harness.signed_up("Bo", "bo@example.com").await;
    let website = project(&client, "Website").await;
    client
        .create_task(&TaskDraft {
            assigned_to: Some(bo.id.to_string()),
            ..draft("For Bo", &website)
        })
        .await
        .unwrap();
    client.create_task(&draft("Unassigned", &website)).await.unwrap();

    let members = client.list_members().await.unwrap();
    let ids: Vec<&Id> = members.iter().map(|m| &m.id).collect();
    assert_eq!(ids, vec![&ana.id, &bo.id]);

    let tasks = client.member_tasks(&bo.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "For Bo");
    assert!(client.member_tasks(&ana.id).await.unwrap().is_empty());
}

// =============================================================================
// Error shapes and transport
// =============================================================================

#[tokio::test]
async fn every_error_body_shape_renders_a_message() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    let filter = TaskFilter::default();

    let cases = [
        (400, json!("plain text"), "plain text"),
        (400, json!({ "detail": "bad filter" }), "bad filter"),
        (
            422,
            json!([{ "message": "title too long" }, { "message": "bad date" }]),
            "title too long\nbad date",
        ),
        (500, json!({}), "{}"),
        (502, json!(null), "Request failed with status 502"),
    ];
    for (status, body, expected) in cases {
        harness.state.fail_next(status, body);
        let err = client.list_tasks(&filter).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: s, .. } if s == status));
        assert_eq!(err.user_message(), expected);
    }
}

#[tokio::test]
async fn request_timeout_is_opt_in() {
    let harness = Harness::start().await;
    let (client, _) = harness.signed_up("Ana", "ana@example.com").await;
    harness.state.set_delay(Some(Duration::from_millis(300)));

    // Without a timeout the slow call still succeeds.
    client.list_tasks(&TaskFilter::default()).await.unwrap();

    let impatient = HttpClient::new(&ClientConfig {
        request_timeout: Some(Duration::from_millis(50)),
        ..harness.config.clone()
    })
    .unwrap();
    let err = impatient.list_projects(&ProjectQuery::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.user_message(), "The server took too long to respond");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = HttpClient::new(&ClientConfig {
        base_url: "http://127.0.0.1:1/v1".to_string(),
        ..ClientConfig::default()
    })
    .unwrap();
    let err = client.list_tasks(&TaskFilter::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.user_message(), "Could not reach the server");
}
