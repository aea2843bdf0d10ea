//! In-memory task service for tests and offline demos.
//!
//! Behaves like the REST service's task endpoints (filtering, paging,
//! payload rules) without any I/O. Writes and reads can be held behind a
//! gate so tests can observe state while a call is still in flight, and
//! status updates can be scripted to fail.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use techflow_proto::Id;
use techflow_proto::error::ServerError;
use techflow_proto::optimistic::Patch;
use techflow_proto::task::{Task, TaskDraft, TaskFilter, TaskPage, TaskStatus, TaskUpdate};
use tokio::sync::watch;

use super::payload::{create_task_body, update_task_body};
use super::{ApiError, TaskService};

/// Page size used when a filter does not set one.
const DEFAULT_LIMIT: u32 = 10;

/// Mutable store behind the service.
#[derive(Debug, Default)]
struct Store {
    tasks: Vec<Task>,
    next_id: u64,
    status_failure: Option<String>,
}

/// In-process [`TaskService`] backed by a `Vec<Task>`.
#[derive(Debug)]
pub struct MemoryTaskService {
    store: Mutex<Store>,
    /// `true` while writes may proceed.
    write_gate: watch::Sender<bool>,
    /// `true` while reads may proceed.
    read_gate: watch::Sender<bool>,
    list_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for MemoryTaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTaskService {
    /// Creates an empty service with both gates open.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_id: 1,
                ..Store::default()
            }),
            write_gate: watch::Sender::new(true),
            read_gate: watch::Sender::new(true),
            list_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a service seeded with `tasks`. New ids continue after the
    /// largest integer id present.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let service = Self::new();
        {
            let mut store = service.store.lock();
            store.next_id = tasks
                .iter()
                .filter_map(|t| t.id.as_i64())
                .filter_map(|n| u64::try_from(n).ok())
                .max()
                .map_or(1, |n| n + 1);
            store.tasks = tasks;
        }
        service
    }

    /// Copy of every stored task, in insertion order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.store.lock().tasks.clone()
    }

    /// Makes every status update fail with a 500 carrying `message`, or
    /// clears the failure with `None`.
    pub fn fail_status_updates(&self, message: Option<&str>) {
        self.store.lock().status_failure = message.map(str::to_string);
    }

    /// Holds writes until [`resume_writes`](Self::resume_writes).
    pub fn pause_writes(&self) {
        self.write_gate.send_replace(false);
    }

    /// Releases held writes.
    pub fn resume_writes(&self) {
        self.write_gate.send_replace(true);
    }

    /// Holds reads until [`resume_reads`](Self::resume_reads).
    pub fn pause_reads(&self) {
        self.read_gate.send_replace(false);
    }

    /// Releases held reads.
    pub fn resume_reads(&self) {
        self.read_gate.send_replace(true);
    }

    /// Number of `list_tasks` calls received so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_task_status` calls received so far.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn wait_open(gate: &watch::Sender<bool>) -> Result<(), ApiError> {
        let mut rx = gate.subscribe();
        if rx.wait_for(|open| *open).await.is_err() {
            return Err(ApiError::Injected("service shut down".to_string()));
        }
        Ok(())
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn not_found(id: &Id) -> ApiError {
        ApiError::NotFound {
            kind: "task",
            id: id.clone(),
        }
    }

    /// Spreads a camelCase body over a stored task.
    fn merge(task: &Task, body: Value) -> Result<Task, ApiError> {
        let Value::Object(mut fields) = body else {
            return Ok(task.clone());
        };
        fields.insert("updatedAt".to_string(), Value::from(Self::now()));
        let merged = fields.apply(&serde_json::to_value(task)?);
        Ok(serde_json::from_value(merged)?)
    }
}

impl TaskService for MemoryTaskService {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<TaskPage, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait_open(&self.read_gate).await?;

        let store = self.store.lock();
        let matching: Vec<&Task> = store.tasks.iter().filter(|t| filter.matches(t)).collect();
        let limit = filter.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT) as usize;
        let page = filter.page.filter(|p| *p > 0).unwrap_or(1);
        let total_pages = matching.len().div_ceil(limit).max(1);
        let tasks = matching
            .into_iter()
            .skip((page as usize - 1) * limit)
            .take(limit)
            .cloned()
            .collect();

        Ok(TaskPage {
            tasks,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            current_page: Some(page),
        })
    }

    async fn get_task(&self, id: &Id) -> Result<Task, ApiError> {
        Self::wait_open(&self.read_gate).await?;
        let store = self.store.lock();
        store
            .tasks
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let Value::Object(mut fields) = create_task_body(draft)? else {
            return Err(ApiError::Injected("task body is not an object".to_string()));
        };
        Self::wait_open(&self.write_gate).await?;

        let mut store = self.store.lock();
        let id = store.next_id;
        store.next_id += 1;
        let now = Self::now();
        fields.insert("id".to_string(), Value::from(id));
        fields.insert("status".to_string(), Value::from(TaskStatus::Todo.as_str()));
        fields.insert("createdAt".to_string(), Value::from(now.clone()));
        fields.insert("updatedAt".to_string(), Value::from(now));
        let task: Task = serde_json::from_value(Value::Object(fields))?;
        store.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &Id, update: &TaskUpdate) -> Result<Task, ApiError> {
        let body = update_task_body(update)?;
        Self::wait_open(&self.write_gate).await?;

        let mut store = self.store.lock();
        let slot = store
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        *slot = Self::merge(slot, body)?;
        Ok(slot.clone())
    }

    async fn update_task_status(&self, id: &Id, status: TaskStatus) -> Result<Task, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait_open(&self.write_gate).await?;

        let mut store = self.store.lock();
        if let Some(message) = &store.status_failure {
            return Err(ApiError::Status {
                status: 500,
                body: ServerError::Message(message.clone()),
            });
        }
        let slot = store
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        let mut body = Map::new();
        body.insert("status".to_string(), Value::from(status.as_str()));
        *slot = Self::merge(slot, Value::Object(body))?;
        Ok(slot.clone())
    }

    async fn delete_task(&self, id: &Id) -> Result<(), ApiError> {
        Self::wait_open(&self.write_gate).await?;
        let mut store = self.store.lock();
        let before = store.tasks.len();
        store.tasks.retain(|t| &t.id != id);
        if store.tasks.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
