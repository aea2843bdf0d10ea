//! In-memory data behind the mock service.
//!
//! The [`MockStore`] holds accounts, bearer tokens, projects, and tasks.
//! Every method speaks the camelCase document types from `techflow-proto`;
//! translating to and from the snake_case wire format is the server's job.
//! Ids are sequential integers shared by every entity kind.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use techflow_proto::Id;
use techflow_proto::auth::{LoginResponse, User};
use techflow_proto::optimistic::Patch;
use techflow_proto::project::{Project, ProjectDraft, ProjectPage, ProjectStatus};
use techflow_proto::task::{Task, TaskFilter, TaskPage, TaskPriority, TaskStatus};
use techflow_proto::team::TeamMember;
use tokio::sync::RwLock;

/// Page size used when a list request has no `limit`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Task fields a `PUT /tasks/{id}` body may change.
const UPDATABLE_TASK_FIELDS: [&str; 6] = [
    "title",
    "description",
    "status",
    "priority",
    "dueDate",
    "assignedTo",
];

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Missing or unknown bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong email or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration with an email that is already taken.
    #[error("Email already registered")]
    EmailTaken,

    /// No entity with the requested id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request body was rejected.
    #[error("{0}")]
    Invalid(String),
}

/// Body of `POST /tasks`, in document shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
    project_id: Id,
    priority: TaskPriority,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    assigned_to: Option<Id>,
}

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct Data {
    accounts: Vec<Account>,
    tokens: HashMap<String, Id>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    last_id: i64,
}

impl Data {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        Id::from(self.last_id)
    }

    fn user(&self, id: &Id) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| &u.id == id)
    }

    fn project_index(&self, id: &Id) -> Result<usize, StoreError> {
        self.projects
            .iter()
            .position(|p| &p.id == id)
            .ok_or(StoreError::NotFound("Project"))
    }

    fn task_index(&self, id: &Id) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or(StoreError::NotFound("Task"))
    }

    /// A copy of `task` with its project summary and assignee embedded.
    fn expand(&self, task: &Task) -> Task {
        let mut expanded = task.clone();
        expanded.project = task
            .project_id
            .as_ref()
            .and_then(|id| self.projects.iter().find(|p| &p.id == id))
            .map(|p| {
                Box::new(Project {
                    tasks: None,
                    ..p.clone()
                })
            });
        expanded.assigned_user = task.assigned_to.as_ref().and_then(|id| self.user(id)).cloned();
        expanded
    }

    fn check_assignee(&self, assignee: Option<&Id>) -> Result<(), StoreError> {
        match assignee {
            Some(id) if self.user(id).is_none() => Err(StoreError::NotFound("User")),
            _ => Ok(()),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn page_bounds(page: u32, limit: u32, len: usize) -> (usize, usize, u32) {
    let limit = limit.max(1) as usize;
    let total_pages = u32::try_from(len.div_ceil(limit).max(1)).unwrap_or(u32::MAX);
    let start = (page.max(1) as usize - 1).saturating_mul(limit).min(len);
    let end = start.saturating_add(limit).min(len);
    (start, end, total_pages)
}

fn required(value: Option<&str>, message: &str) -> Result<String, StoreError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Invalid(message.to_string()))
}

/// Thread-safe in-memory store.
#[derive(Debug)]
pub struct MockStore {
    data: RwLock<Data>,
    default_page_size: u32,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates an empty store with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates an empty store whose lists default to `page_size` items.
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            data: RwLock::new(Data::default()),
            default_page_size: page_size.max(1),
        }
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// [`StoreError::Invalid`] for a blank field, [`StoreError::EmailTaken`]
    /// if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, StoreError> {
        let email = required(Some(email), "Email is required")?;
        let name = required(Some(name), "Name is required")?;
        if password.is_empty() {
            return Err(StoreError::Invalid("Password is required".to_string()));
        }

        let mut data = self.data.write().await;
        if data
            .accounts
            .iter()
            .any(|a| a.user.email.eq_ignore_ascii_case(&email))
        {
            return Err(StoreError::EmailTaken);
        }
        let user = User {
            id: data.next_id(),
            email,
            name,
            created_at: Some(now()),
        };
        data.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        tracing::info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Checks credentials and issues a fresh token.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCredentials`] on an unknown email or a wrong
    /// password.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, StoreError> {
        let mut data = self.data.write().await;
        let user = data
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email.trim()) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or(StoreError::InvalidCredentials)?;
        let token = uuid::Uuid::now_v7().simple().to_string();
        data.tokens.insert(token.clone(), user.id.clone());
        tracing::debug!(user_id = %user.id, "token issued");
        Ok(LoginResponse { token, user })
    }

    /// Resolves a bearer token to its user.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] if the token was never issued.
    pub async fn authenticate(&self, token: &str) -> Result<User, StoreError> {
        let data = self.data.read().await;
        data.tokens
            .get(token)
            .and_then(|id| data.user(id))
            .cloned()
            .ok_or(StoreError::Unauthorized)
    }

    /// Every registered user, as team members.
    pub async fn members(&self) -> Vec<TeamMember> {
        self.data
            .read()
            .await
            .accounts
            .iter()
            .map(|a| TeamMember {
                id: a.user.id.clone(),
                name: a.user.name.clone(),
                email: a.user.email.clone(),
            })
            .collect()
    }

    /// Tasks assigned to member `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such member.
    pub async fn member_tasks(&self, id: &Id) -> Result<Vec<Task>, StoreError> {
        let data = self.data.read().await;
        if data.user(id).is_none() {
            return Err(StoreError::NotFound("Member"));
        }
        Ok(data
            .tasks
            .iter()
            .filter(|t| t.assigned_to.as_ref() == Some(id))
            .map(|t| data.expand(t))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// One page of projects whose name or description contains `search`
    /// (case-insensitive).
    pub async fn list_projects(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        search: Option<&str>,
    ) -> ProjectPage {
        let data = self.data.read().await;
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let matching: Vec<&Project> = data
            .projects
            .iter()
            .filter(|p| {
                needle.as_ref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n)
                        || p.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n))
                })
            })
            .collect();

        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.default_page_size);
        let (start, end, total_pages) = page_bounds(page, limit, matching.len());
        ProjectPage {
            projects: matching[start..end].iter().map(|p| (*p).clone()).collect(),
            total_pages,
            current_page: page,
        }
    }

    /// A project with its tasks embedded.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such project.
    pub async fn project(&self, id: &Id) -> Result<Project, StoreError> {
        let data = self.data.read().await;
        let mut project = data.projects[data.project_index(id)?].clone();
        project.tasks = Some(
            data.tasks
                .iter()
                .filter(|t| t.project_id.as_ref() == Some(id))
                .map(|t| data.expand(t))
                .collect(),
        );
        Ok(project)
    }

    /// Creates a project. New projects are `ACTIVE` unless a status is given.
    ///
    /// # Errors
    ///
    /// [`StoreError::Invalid`] if the name is missing or blank.
    pub async fn create_project(&self, draft: ProjectDraft) -> Result<Project, StoreError> {
        let name = required(draft.name.as_deref(), "Project name is required")?;
        let mut data = self.data.write().await;
        let stamp = now();
        let project = Project {
            id: data.next_id(),
            name,
            description: draft.description,
            status: Some(draft.status.unwrap_or(ProjectStatus::Active)),
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
            tasks: None,
        };
        data.projects.push(project.clone());
        Ok(project)
    }

    /// Overwrites the fields present in `draft`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown project,
    /// [`StoreError::Invalid`] for a blank name.
    pub async fn update_project(&self, id: &Id, draft: ProjectDraft) -> Result<Project, StoreError> {
        let name = match draft.name.as_deref() {
            Some(name) => Some(required(Some(name), "Project name is required")?),
            None => None,
        };
        let mut data = self.data.write().await;
        let index = data.project_index(id)?;
        let project = &mut data.projects[index];
        if let Some(name) = name {
            project.name = name;
        }
        if draft.description.is_some() {
            project.description = draft.description;
        }
        if draft.status.is_some() {
            project.status = draft.status;
        }
        project.updated_at = Some(now());
        Ok(project.clone())
    }

    /// Deletes a project and its tasks.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such project.
    pub async fn delete_project(&self, id: &Id) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let index = data.project_index(id)?;
        data.projects.remove(index);
        data.tasks.retain(|t| t.project_id.as_ref() != Some(id));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// One page of tasks matching `filter`, in creation order.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> TaskPage {
        let data = self.data.read().await;
        let matching: Vec<&Task> = data.tasks.iter().filter(|t| filter.matches(t)).collect();
        let page = filter.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = filter
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(self.default_page_size);
        let (start, end, total_pages) = page_bounds(page, limit, matching.len());
        TaskPage {
            tasks: matching[start..end].iter().map(|t| data.expand(t)).collect(),
            total_pages,
            current_page: Some(page),
        }
    }

    /// One task, expanded.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such task.
    pub async fn task(&self, id: &Id) -> Result<Task, StoreError> {
        let data = self.data.read().await;
        Ok(data.expand(&data.tasks[data.task_index(id)?]))
    }

    /// Creates a task from a document-shaped body. New tasks start as `TODO`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Invalid`] for a malformed body or blank title,
    /// [`StoreError::NotFound`] for an unknown project or assignee.
    pub async fn create_task(&self, body: Value) -> Result<Task, StoreError> {
        let new: NewTask =
            serde_json::from_value(body).map_err(|e| StoreError::Invalid(e.to_string()))?;
        let title = required(Some(new.title.as_str()), "Title is required")?;

        let mut data = self.data.write().await;
        data.project_index(&new.project_id)?;
        data.check_assignee(new.assigned_to.as_ref())?;
        let stamp = now();
        let task = Task {
            id: data.next_id(),
            title,
            description: new.description,
            status: TaskStatus::Todo,
            priority: new.priority,
            project_id: Some(new.project_id),
            assigned_to: new.assigned_to,
            due_date: new.due_date,
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
            project: None,
            assigned_user: None,
        };
        data.tasks.push(task.clone());
        tracing::debug!(task_id = %task.id, "task created");
        Ok(data.expand(&task))
    }

    /// Applies a partial, document-shaped update. `null` clears optional
    /// fields; keys outside the updatable set are ignored.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown task or assignee,
    /// [`StoreError::Invalid`] if the result is not a valid task.
    pub async fn update_task(&self, id: &Id, fields: Map<String, Value>) -> Result<Task, StoreError> {
        let patch: Map<String, Value> = fields
            .into_iter()
            .filter(|(key, _)| UPDATABLE_TASK_FIELDS.contains(&key.as_str()))
            .collect();

        let mut data = self.data.write().await;
        let index = data.task_index(id)?;
        let current = serde_json::to_value(&data.tasks[index])
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        let mut updated: Task = serde_json::from_value(patch.apply(&current))
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        updated.title = required(Some(updated.title.as_str()), "Title is required")?;
        data.check_assignee(updated.assigned_to.as_ref())?;
        updated.updated_at = Some(now());
        data.tasks[index] = updated.clone();
        Ok(data.expand(&updated))
    }

    /// Changes only the status of a task.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such task.
    pub async fn set_task_status(&self, id: &Id, status: TaskStatus) -> Result<Task, StoreError> {
        let mut data = self.data.write().await;
        let index = data.task_index(id)?;
        let task = &mut data.tasks[index];
        task.status = status;
        task.updated_at = Some(now());
        let task = task.clone();
        Ok(data.expand(&task))
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such task.
    pub async fn delete_task(&self, id: &Id) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let index = data.task_index(id)?;
        data.tasks.remove(index);
        Ok(())
    }
}
