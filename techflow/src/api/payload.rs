//! Request bodies for task and account mutations.
//!
//! Builders here produce camelCase documents; the HTTP layer converts them
//! to snake_case with [`techflow_proto::case::frontend_to_api`]. Validation
//! happens here, before any network call.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use techflow_proto::auth::{Credentials, Registration};
use techflow_proto::project::ProjectDraft;
use techflow_proto::task::{TaskDraft, TaskUpdate};

/// Input rejected before it reaches the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title is blank.
    #[error("title is required")]
    TitleRequired,
    /// Task has no project.
    #[error("project is required")]
    ProjectRequired,
    /// Project name is blank.
    #[error("project name is required")]
    NameRequired,
    /// Email is blank.
    #[error("email is required")]
    EmailRequired,
    /// Password is blank.
    #[error("password is required")]
    PasswordRequired,
    /// Due date is neither `YYYY-MM-DD` nor RFC 3339.
    #[error("invalid due date {0:?}: expected YYYY-MM-DD")]
    InvalidDueDate(String),
}

/// Normalizes a due date for the wire.
///
/// A calendar date becomes that day's UTC midnight with millisecond
/// precision (`2024-05-01` → `2024-05-01T00:00:00.000Z`). A full RFC 3339
/// timestamp is passed through.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDueDate`] for anything else.
pub fn normalize_due_date(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")));
    }
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return Ok(raw.to_string());
    }
    Err(ValidationError::InvalidDueDate(raw.to_string()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an assignee id; only integers are sent.
fn assignee_id(raw: &str) -> Option<Value> {
    raw.trim().parse::<i64>().ok().map(Value::from)
}

/// Builds the body of `POST /tasks`.
///
/// The title is trimmed and required, the project is required, the
/// description is only sent when non-blank, and the assignee is only sent
/// when it is an integer.
///
/// # Errors
///
/// Returns a [`ValidationError`] for a blank title, a missing project, or
/// a malformed due date.
pub fn create_task_body(draft: &TaskDraft) -> Result<Value, ValidationError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if draft.project_id.as_str().trim().is_empty() {
        return Err(ValidationError::ProjectRequired);
    }

    let mut body = Map::new();
    body.insert("title".to_string(), Value::from(title));
    body.insert("projectId".to_string(), Value::from(&draft.project_id));
    body.insert("priority".to_string(), Value::from(draft.priority.as_str()));
    if let Some(description) = non_blank(draft.description.as_deref()) {
        body.insert("description".to_string(), Value::from(description));
    }
    if let Some(due) = non_blank(draft.due_date.as_deref()) {
        body.insert("dueDate".to_string(), Value::from(normalize_due_date(due)?));
    }
    if let Some(assignee) = draft.assigned_to.as_deref().and_then(assignee_id) {
        body.insert("assignedTo".to_string(), assignee);
    }
    Ok(Value::Object(body))
}

/// Builds the body of `PUT /tasks/{id}`.
///
/// Only supplied fields are sent. Title and description are trimmed. A
/// cleared or blank due date or assignee is sent as `null`; a non-integer
/// assignee is dropped.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDueDate`] for a malformed due date.
pub fn update_task_body(update: &TaskUpdate) -> Result<Value, ValidationError> {
    let mut body = Map::new();
    if let Some(title) = &update.title {
        body.insert("title".to_string(), Value::from(title.trim()));
    }
    if let Some(description) = &update.description {
        body.insert("description".to_string(), Value::from(description.trim()));
    }
    if let Some(status) = update.status {
        body.insert("status".to_string(), Value::from(status.as_str()));
    }
    if let Some(priority) = update.priority {
        body.insert("priority".to_string(), Value::from(priority.as_str()));
    }
    if let Some(due) = &update.due_date {
        let value = match non_blank(due.as_deref()) {
            Some(due) => Value::from(normalize_due_date(due)?),
            None => Value::Null,
        };
        body.insert("dueDate".to_string(), value);
    }
    if let Some(assignee) = &update.assigned_to {
        match non_blank(assignee.as_deref()) {
            Some(raw) => {
                if let Some(id) = assignee_id(raw) {
                    body.insert("assignedTo".to_string(), id);
                }
            }
            None => {
                body.insert("assignedTo".to_string(), Value::Null);
            }
        }
    }
    Ok(Value::Object(body))
}

/// Checks a project draft used for creation.
///
/// # Errors
///
/// Returns [`ValidationError::NameRequired`] if the name is missing or blank.
pub fn validate_new_project(draft: &ProjectDraft) -> Result<(), ValidationError> {
    if non_blank(draft.name.as_deref()).is_none() {
        return Err(ValidationError::NameRequired);
    }
    Ok(())
}

/// Checks login credentials.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the email or password is blank.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.email.trim().is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if credentials.password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    Ok(())
}

/// Checks a registration form.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any field is blank.
pub fn validate_registration(registration: &Registration) -> Result<(), ValidationError> {
    validate_credentials(&registration.credentials())?;
    if registration.name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }
    Ok(())
}
