//! Optimistic task board.
//!
//! [`TaskBoard`] owns the task list shown for the current filter and page.
//! Status changes are applied locally before the service confirms them and
//! reverted by a full re-fetch when the service rejects them.
//!
//! # Races
//!
//! The board keeps an epoch that is bumped by every optimistic write and
//! every applied fetch. A poll refresh records the epoch before fetching
//! and drops its result if a write is still in flight or the epoch moved
//! while it was waiting. Explicit refreshes always apply and then re-apply
//! the patches of writes still in flight, so a confirmed or pending status
//! is never replaced by an older server view. The same holds when an older
//! write to a task is confirmed while a newer one is still in flight.
//!
//! A rejected write puts back the task as it was before its patch, then
//! re-fetches. The board never keeps a rejected guess, even when that
//! re-fetch fails.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use techflow_proto::Id;
use techflow_proto::optimistic::{apply_optimistic_in_place, confirm_or_revert};
use techflow_proto::task::{Task, TaskFilter, TaskPage, TaskPatch, TaskStatus};

use super::{BoardError, Column, group_by_column};
use crate::api::TaskService;

/// Result of a drag-and-drop move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing to do: unknown card, or dropped on its own column.
    Unchanged,
    /// The status change was confirmed by the service.
    Moved(Box<Task>),
}

/// Result of a poll refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The fetched list replaced the board.
    Applied,
    /// A write was in flight, so nothing was fetched.
    Skipped,
    /// The fetched list was older than the board and was dropped.
    Discarded,
}

/// Copy of the board state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// Tasks on the current page, in service order.
    pub tasks: Vec<Task>,
    /// Active filter (without paging).
    pub filter: TaskFilter,
    /// 1-based current page.
    pub current_page: u32,
    /// Total pages for the active filter.
    pub total_pages: u32,
}

/// A status write that has not settled yet.
#[derive(Debug, Clone)]
struct PendingWrite {
    ticket: u64,
    status: TaskStatus,
    /// The task as it was shown before this write's patch.
    previous: Task,
}

#[derive(Debug)]
struct BoardState {
    tasks: Vec<Task>,
    filter: TaskFilter,
    current_page: u32,
    total_pages: u32,
    page_size: u32,
    epoch: u64,
    next_ticket: u64,
    pending: HashMap<Id, PendingWrite>,
}

impl BoardState {
    /// The list query for the current filter and page.
    fn query(&self) -> TaskFilter {
        TaskFilter {
            page: Some(self.current_page),
            limit: Some(self.page_size),
            ..self.filter.clone()
        }
    }

    fn apply_page(&mut self, page: TaskPage, requested: u32) {
        self.tasks = page.tasks;
        self.total_pages = page.total_pages.max(1);
        self.current_page = page.current_page.unwrap_or(requested);
        for (id, write) in &self.pending {
            apply_optimistic_in_place(&mut self.tasks, id, &TaskPatch::status(write.status));
        }
        self.epoch += 1;
    }

    /// Forgets the write `ticket` for `id`. Returns it if it was still the
    /// latest write to that task.
    fn settle(&mut self, id: &Id, ticket: u64) -> Option<PendingWrite> {
        if self.pending.get(id).is_some_and(|w| w.ticket == ticket) {
            self.pending.remove(id)
        } else {
            None
        }
    }

    /// Takes a confirmed task from the service, keeping the status of a
    /// newer write that is still in flight.
    fn confirm(&mut self, id: &Id, confirmed: &Task) {
        let Some(slot) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return;
        };
        slot.clone_from(confirmed);
        if let Some(newer) = self.pending.get(id) {
            slot.status = newer.status;
        }
    }

    /// Puts back the task a rejected write had replaced.
    fn restore(&mut self, previous: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == previous.id) {
            *slot = previous;
            self.epoch += 1;
        }
    }
}

/// The task list for one filter and page, kept in sync with a
/// [`TaskService`].
///
/// The lock around the state is only held for short synchronous sections,
/// never across a service call.
#[derive(Debug)]
pub struct TaskBoard<S> {
    service: Arc<S>,
    state: Mutex<BoardState>,
}

impl<S: TaskService> TaskBoard<S> {
    /// Creates an empty board on page 1 with no filter. Call
    /// [`refresh`](Self::refresh) to load it.
    #[must_use]
    pub fn new(service: Arc<S>, page_size: u32) -> Self {
        Self {
            service,
            state: Mutex::new(BoardState {
                tasks: Vec::new(),
                filter: TaskFilter::default(),
                current_page: 1,
                total_pages: 1,
                page_size: page_size.max(1),
                epoch: 0,
                next_ticket: 0,
                pending: HashMap::new(),
            }),
        }
    }

    /// The service this board talks to.
    #[must_use]
    pub const fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Fetches the current filter and page and replaces the list.
    ///
    /// Patches of writes still in flight are re-applied on top of the
    /// fetched list. A fetch whose filter or page was changed while it was
    /// running is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Remote`] if the fetch fails; the list is left
    /// as it was.
    pub async fn refresh(&self) -> Result<(), BoardError> {
        let query = self.state.lock().query();
        let page = self.service.list_tasks(&query).await?;

        let mut state = self.state.lock();
        if state.query() != query {
            tracing::debug!("dropping refresh for a superseded query");
            return Ok(());
        }
        state.apply_page(page, query.page.unwrap_or(1));
        tracing::debug!(
            tasks = state.tasks.len(),
            page = state.current_page,
            total_pages = state.total_pages,
            "board refreshed"
        );
        Ok(())
    }

    /// Refresh driven by the poller.
    ///
    /// Does nothing while a status write is in flight, and drops the
    /// fetched list if the board changed while it was being fetched.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Remote`] if the fetch fails.
    pub async fn poll_refresh(&self) -> Result<PollOutcome, BoardError> {
        let (epoch, query) = {
            let state = self.state.lock();
            if !state.pending.is_empty() {
                return Ok(PollOutcome::Skipped);
            }
            (state.epoch, state.query())
        };

        let page = self.service.list_tasks(&query).await?;

        let mut state = self.state.lock();
        if !state.pending.is_empty() || state.epoch != epoch || state.query() != query {
            tracing::debug!(epoch, current = state.epoch, "discarding stale poll result");
            return Ok(PollOutcome::Discarded);
        }
        state.apply_page(page, query.page.unwrap_or(1));
        Ok(PollOutcome::Applied)
    }

    /// Changes a task's status optimistically.
    ///
    /// The new status is visible in [`snapshot`](Self::snapshot) before the
    /// service call settles. On success the board is refreshed; on failure
    /// the task is put back as it was and the board is re-fetched, and the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`] without calling the service if
    /// the task is not on the board, or [`BoardError::Remote`] if the
    /// service rejects the change.
    pub async fn set_status(&self, id: &Id, status: TaskStatus) -> Result<Task, BoardError> {
        let ticket = {
            let mut state = self.state.lock();
            let Some(previous) = state.tasks.iter().find(|t| &t.id == id).cloned() else {
                return Err(BoardError::UnknownTask(id.clone()));
            };
            apply_optimistic_in_place(&mut state.tasks, id, &TaskPatch::status(status));
            state.epoch += 1;
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            state.pending.insert(
                id.clone(),
                PendingWrite {
                    ticket,
                    status,
                    previous,
                },
            );
            ticket
        };
        tracing::debug!(task_id = %id, %status, ticket, "optimistic status change");

        let confirmed = confirm_or_revert(
            self.service.update_task_status(id, status),
            move || async move {
                {
                    let mut state = self.state.lock();
                    // A newer write to the same task keeps its own guess.
                    if let Some(write) = state.settle(id, ticket) {
                        state.restore(write.previous);
                    }
                }
                tracing::warn!(task_id = %id, "status change rejected, reverting");
                if let Err(e) = self.refresh().await {
                    tracing::warn!(task_id = %id, error = %e, "revert refresh failed");
                }
            },
        )
        .await?;

        {
            let mut state = self.state.lock();
            state.settle(id, ticket);
            state.confirm(id, &confirmed);
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(task_id = %id, error = %e, "refresh after status change failed");
        }
        Ok(confirmed)
    }

    /// Handles a card dropped on `column`.
    ///
    /// Returns [`MoveOutcome::Unchanged`] without calling the service when
    /// the card is unknown or already has the column's status.
    ///
    /// # Errors
    ///
    /// Returns the error of [`set_status`](Self::set_status).
    pub async fn move_card(&self, id: &Id, column: Column) -> Result<MoveOutcome, BoardError> {
        let target = column.status();
        let current = self
            .state
            .lock()
            .tasks
            .iter()
            .find(|t| &t.id == id)
            .map(|t| t.status);
        match current {
            None => {
                tracing::debug!(task_id = %id, %column, "drop of unknown card ignored");
                Ok(MoveOutcome::Unchanged)
            }
            Some(status) if status == target => Ok(MoveOutcome::Unchanged),
            Some(_) => {
                let task = self.set_status(id, target).await?;
                Ok(MoveOutcome::Moved(Box::new(task)))
            }
        }
    }

    /// Replaces the filter, goes back to page 1, and refreshes.
    ///
    /// Paging fields of `filter` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Remote`] if the fetch fails.
    pub async fn set_filter(&self, filter: TaskFilter) -> Result<(), BoardError> {
        {
            let mut state = self.state.lock();
            state.filter = TaskFilter {
                page: None,
                limit: None,
                ..filter
            };
            state.current_page = 1;
        }
        self.refresh().await
    }

    /// Removes every filter, goes back to page 1, and refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Remote`] if the fetch fails.
    pub async fn clear_filter(&self) -> Result<(), BoardError> {
        self.set_filter(TaskFilter::default()).await
    }

    /// Moves to `page` and refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PageOutOfRange`] if `page` is not in
    /// `1..=total_pages`, or [`BoardError::Remote`] if the fetch fails.
    pub async fn goto_page(&self, page: u32) -> Result<(), BoardError> {
        {
            let mut state = self.state.lock();
            if page == 0 || page > state.total_pages {
                return Err(BoardError::PageOutOfRange {
                    page,
                    total_pages: state.total_pages,
                });
            }
            state.current_page = page;
        }
        self.refresh().await
    }

    /// Copy of the current board state.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        let state = self.state.lock();
        BoardSnapshot {
            tasks: state.tasks.clone(),
            filter: state.filter.clone(),
            current_page: state.current_page,
            total_pages: state.total_pages,
        }
    }

    /// The current tasks grouped into kanban columns.
    #[must_use]
    pub fn columns(&self) -> Vec<(Column, Vec<Task>)> {
        group_by_column(&self.state.lock().tasks)
    }

    /// Returns `true` while any status write is in flight.
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }
}
