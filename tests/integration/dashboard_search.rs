//! Integration tests for the read-only views over a live mock service.
//!
//! Validates end to end:
//! - Dashboard counts and due-date alerts from concurrent fetches
//! - Global search over projects (server-side) and tasks (client-side)
//! - Short queries never reach the service
//! - CSV export of every page of a filtered task list

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use techflow::api::http::HttpClient;
use techflow::api::{self, ProjectService, TaskService, TeamService};
use techflow::config::ClientConfig;
use techflow::dashboard::{DashboardOptions, DueAlertKind, load_dashboard};
use techflow::export;
use techflow::search::search;
use techflow::session::Session;
use techflow_mock::server::{MockState, start_server_with_state};
use techflow_proto::auth::{Registration, User};
use techflow_proto::project::{Project, ProjectDraft};
use techflow_proto::task::{Task, TaskDraft, TaskFilter, TaskPriority, TaskStatus};

struct Workspace {
    state: Arc<MockState>,
    client: HttpClient,
    user: User,
    website: Project,
    mobile: Project,
    _handle: tokio::task::JoinHandle<()>,
}

/// Starts a mock service with one account and two projects.
async fn workspace() -> Workspace {
    let state = Arc::new(MockState::default());
    let (addr, handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start mock server");
    let client = HttpClient::new(&ClientConfig {
        base_url: format!("http://{addr}/v1"),
        ..ClientConfig::default()
    })
    .unwrap();
    let login = api::register_and_login(
        &client,
        &Registration {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
            name: "Ana".to_string(),
        },
    )
    .await
    .unwrap();
    let session = Session::try_from(login).unwrap();
    let user = session.user().cloned().unwrap();
    let client = client.with_session(&session);

    let mut projects = Vec::new();
    for (name, description) in [("Website", "Marketing site relaunch"), ("Mobile", "iOS app")] {
        projects.push(
            client
                .create_project(&ProjectDraft {
                    name: Some(name.to_string()),
                    description: Some(description.to_string()),
                    status: None,
                })
                .await
                .unwrap(),
        );
    }
    let mobile = projects.pop().unwrap();
    let website = projects.pop().unwrap();

    Workspace {
        state,
        client,
        user,
        website,
        mobile,
        _handle: handle,
    }
}

impl Workspace {
    async fn task(
        &self,
        title: &str,
        project: &Project,
        priority: TaskPriority,
        due_in_days: Option<i64>,
    ) -> Task {
        let today = Utc::now().date_naive();
        self.client
            .create_task(&TaskDraft {
                title: title.to_string(),
                description: None,
                project_id: project.id.clone(),
                priority,
                due_date: due_in_days
                    .map(|d| (today + Duration::days(d)).format("%Y-%m-%d").to_string()),
                assigned_to: Some(self.user.id.to_string()),
            })
            .await
            .unwrap()
    }
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn dashboard_counts_and_alerts() {
    let ws = workspace().await;
    ws.task("Late copy", &ws.website, TaskPriority::High, Some(-2)).await;
    ws.task("Ship today", &ws.website, TaskPriority::Urgent, Some(0)).await;
    ws.task("Store listing", &ws.mobile, TaskPriority::Low, Some(2)).await;
    ws.task("Someday", &ws.mobile, TaskPriority::High, Some(30)).await;
    let done = ws.task("Old bug", &ws.mobile, TaskPriority::Urgent, Some(-9)).await;
    ws.client
        .update_task_status(&done.id, TaskStatus::Completed)
        .await
        .unwrap();

    let dashboard = load_dashboard(&ws.client, &ws.client, DashboardOptions::default())
        .await
        .unwrap();
    let stats = &dashboard.stats;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 4);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.high_priority, 2);
    assert_eq!(stats.urgent, 1);
    assert_eq!(stats.completed_this_week, 1);
    assert_eq!(stats.total_projects, 2);
    assert_eq!(stats.recent.len(), 5);
    assert_eq!(stats.recent[0].title, "Late copy");

    let alerts: Vec<(&str, DueAlertKind, i64)> = dashboard
        .alerts
        .iter()
        .map(|a| (a.title.as_str(), a.kind, a.days_until_due))
        .collect();
    assert_eq!(
        alerts,
        vec![
            ("Late copy", DueAlertKind::Overdue, -2),
            ("Ship today", DueAlertKind::DueSoon, 0),
            ("Store listing", DueAlertKind::DueSoon, 2),
        ]
    );
}

#[tokio::test]
async fn dashboard_of_an_empty_workspace() {
    let ws = workspace().await;
    let options = DashboardOptions {
        recent_count: 3,
        due_soon_days: 7,
    };
    let dashboard = load_dashboard(&ws.client, &ws.client, options).await.unwrap();
    assert_eq!(dashboard.stats.total, 0);
    assert_eq!(dashboard.stats.total_projects, 2);
    assert!(dashboard.stats.recent.is_empty());
    assert!(dashboard.alerts.is_empty());
}

#[tokio::test]
async fn dashboard_fails_when_either_fetch_fails() {
    let ws = workspace().await;
    ws.state.fail_next(503, json!({ "error": "Service unavailable" }));

    let err = load_dashboard(&ws.client, &ws.client, DashboardOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Service unavailable");
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn search_matches_projects_and_tasks() {
    let ws = workspace().await;
    ws.task("Relaunch checklist", &ws.mobile, TaskPriority::Medium, None)
        .await;
    ws.task("Fix login", &ws.mobile, TaskPriority::Medium, None).await;

    let results = search(&ws.client, &ws.client, "  LAUNCH ").await.unwrap();
    let projects: Vec<&str> = results.projects.iter().map(|p| p.name.as_str()).collect();
    let tasks: Vec<&str> = results.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(projects, vec!["Website"]);
    assert_eq!(tasks, vec!["Relaunch checklist"]);

    let none = search(&ws.client, &ws.client, "zzz").await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn short_query_makes_no_request() {
    let ws = workspace().await;
    // The queued failure is handed to whichever request arrives next.
    ws.state.fail_next(500, json!({ "message": "first request after search" }));

    let results = search(&ws.client, &ws.client, " a ").await.unwrap();
    assert!(results.is_empty());

    let err = ws.client.list_members().await.unwrap_err();
    assert_eq!(err.user_message(), "first request after search");
    assert_eq!(ws.client.list_members().await.unwrap().len(), 1);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn export_walks_every_page_of_a_filter() {
    let ws = workspace().await;
    for n in 0..5 {
        ws.task(&format!("web {n}"), &ws.website, TaskPriority::Medium, Some(1))
            .await;
    }
    ws.task("app", &ws.mobile, TaskPriority::Low, None).await;

    let tasks = api::list_all_tasks(
        &ws.client,
        &TaskFilter {
            project_id: Some(ws.website.id.clone()),
            limit: Some(2),
            ..TaskFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(tasks.len(), 5);

    let csv = export::tasks_to_csv(&tasks).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        r#""Title","Description","Status","Priority","Project","Due Date","Assignee","Created""#
    );
    let due = (Utc::now().date_naive() + Duration::days(1)).format("%Y-%m-%d");
    assert!(lines[1].starts_with(&format!(
        r#""web 0","","TODO","MEDIUM","Website","{due}T00:00:00.000Z","Ana","#
    )));
}

#[tokio::test]
async fn export_of_an_empty_filter_has_no_data() {
    let ws = workspace().await;
    ws.task("web", &ws.website, TaskPriority::Medium, None).await;

    let tasks = api::list_all_tasks(
        &ws.client,
        &TaskFilter {
            status: Some(TaskStatus::Completed),
            ..TaskFilter::default()
        },
    )
    .await
    .unwrap();
    assert!(tasks.is_empty());
    assert_eq!(
        export::tasks_to_csv(&tasks),
        Err(export::ExportError::NoData)
    );
}

#[tokio::test]
async fn project_detail_lists_its_tasks() {
    let ws = workspace().await;
    ws.task("web", &ws.website, TaskPriority::Medium, None).await;
    ws.task("app", &ws.mobile, TaskPriority::Medium, None).await;

    let project = ws.client.get_project(&ws.mobile.id).await.unwrap();
    let titles: Vec<String> = project
        .tasks
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["app".to_string()]);
}
