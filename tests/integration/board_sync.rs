//! Integration tests for the optimistic task board under concurrency.
//!
//! Validates end to end:
//! - Optimistic status is visible before the service confirms it
//! - Poll refreshes never overwrite an in-flight or newer board
//! - Rejected writes leave the board equal to a fresh fetch
//! - Filter changes drop results of superseded fetches
//! - The background poller picks up changes made elsewhere

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use techflow::api::TaskService;
use techflow::api::memory::MemoryTaskService;
use techflow::poller;
use techflow::tasks::{Column, MoveOutcome, PollOutcome, TaskBoard};
use techflow_proto::Id;
use techflow_proto::task::{Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};

const PAGE_SIZE: u32 = 10;

fn task(id: i64, project: i64, status: TaskStatus) -> Task {
    Task {
        id: Id::from(id),
        title: format!("task {id}"),
        description: None,
        status,
        priority: TaskPriority::Medium,
        project_id: Some(Id::from(project)),
        assigned_to: None,
        due_date: None,
        created_at: None,
        updated_at: None,
        project: None,
        assigned_user: None,
    }
}

async fn loaded_board(tasks: Vec<Task>) -> Arc<TaskBoard<MemoryTaskService>> {
    let service = Arc::new(MemoryTaskService::with_tasks(tasks));
    let board = Arc::new(TaskBoard::new(service, PAGE_SIZE));
    board.refresh().await.unwrap();
    board
}

fn status_on_board(board: &TaskBoard<MemoryTaskService>, id: &Id) -> Option<TaskStatus> {
    board
        .snapshot()
        .tasks
        .iter()
        .find(|t| &t.id == id)
        .map(|t| t.status)
}

fn status_in_service(service: &MemoryTaskService, id: &Id) -> Option<TaskStatus> {
    service
        .tasks()
        .iter()
        .find(|t| &t.id == id)
        .map(|t| t.status)
}

/// Polls `condition` until it holds, failing the test after two seconds.
async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

// =============================================================================
// Optimistic writes
// =============================================================================

#[tokio::test]
async fn status_change_is_visible_before_confirmation() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo), task(2, 1, TaskStatus::Todo)]).await;
    let service = Arc::clone(board.service());
    let id = Id::from(1);
    service.pause_writes();

    let write = {
        let board = Arc::clone(&board);
        let id = id.clone();
        tokio::spawn(async move { board.set_status(&id, TaskStatus::InProgress).await })
    };
    eventually("write to reach the service", || service.status_calls() == 1).await;

    assert_eq!(status_on_board(&board, &id), Some(TaskStatus::InProgress));
    assert!(board.has_pending_writes());
    assert_eq!(status_in_service(&service, &id), Some(TaskStatus::Todo));

    service.resume_writes();
    let confirmed = write.await.unwrap().unwrap();
    assert_eq!(confirmed.status, TaskStatus::InProgress);
    assert!(!board.has_pending_writes());
    assert_eq!(status_on_board(&board, &id), Some(TaskStatus::InProgress));
    assert_eq!(status_in_service(&service, &id), Some(TaskStatus::InProgress));
}

#[tokio::test]
async fn rejected_write_matches_a_fresh_fetch() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo), task(2, 1, TaskStatus::InProgress)]).await;
    let service = Arc::clone(board.service());

    // Another client renames task 2 after this board last fetched.
    service
        .update_task(
            &Id::from(2),
            &TaskUpdate {
                title: Some("renamed elsewhere".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
    service.fail_status_updates(Some("Task is locked"));

    let err = board
        .set_status(&Id::from(1), TaskStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Task is locked");

    let fresh = service
        .list_tasks(&TaskFilter {
            page: Some(1),
            limit: Some(PAGE_SIZE),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    let snapshot = board.snapshot();
    assert_eq!(snapshot.tasks, fresh.tasks);
    assert_eq!(snapshot.tasks[0].status, TaskStatus::Todo);
    assert_eq!(snapshot.tasks[1].title, "renamed elsewhere");
    assert!(!board.has_pending_writes());
}

#[tokio::test]
async fn drag_between_columns() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo), task(2, 1, TaskStatus::Completed)]).await;

    let outcome = board.move_card(&Id::from(1), Column::InProgress).await.unwrap();
    assert!(matches!(outcome, MoveOutcome::Moved(t) if t.status == TaskStatus::InProgress));
    let outcome = board.move_card(&Id::from(2), Column::Completed).await.unwrap();
    assert_eq!(outcome, MoveOutcome::Unchanged);

    let columns = board.columns();
    let counts: Vec<(Column, usize)> = columns.iter().map(|(c, t)| (*c, t.len())).collect();
    assert_eq!(
        counts,
        vec![(Column::Todo, 0), (Column::InProgress, 1), (Column::Completed, 1)]
    );
    assert_eq!(board.service().status_calls(), 1);
}

// =============================================================================
// Refresh races
// =============================================================================

#[tokio::test]
async fn poll_is_skipped_while_a_write_is_in_flight() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo)]).await;
    let service = Arc::clone(board.service());
    service.pause_writes();

    let write = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.set_status(&Id::from(1), TaskStatus::Completed).await })
    };
    eventually("write to reach the service", || service.status_calls() == 1).await;

    let lists_before = service.list_calls();
    assert_eq!(board.poll_refresh().await.unwrap(), PollOutcome::Skipped);
    assert_eq!(service.list_calls(), lists_before);
    assert_eq!(status_on_board(&board, &Id::from(1)), Some(TaskStatus::Completed));

    service.resume_writes();
    write.await.unwrap().unwrap();
    assert_eq!(board.poll_refresh().await.unwrap(), PollOutcome::Applied);
    assert_eq!(status_on_board(&board, &Id::from(1)), Some(TaskStatus::Completed));
}

#[tokio::test]
async fn poll_started_before_a_write_is_discarded() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo)]).await;
    let service = Arc::clone(board.service());
    let lists_before = service.list_calls();
    service.pause_reads();

    // The poll fetches while task 1 is still TODO on the server.
    let poll = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.poll_refresh().await })
    };
    eventually("poll to reach the service", || {
        service.list_calls() == lists_before + 1
    })
    .await;

    let write = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.set_status(&Id::from(1), TaskStatus::Completed).await })
    };
    eventually("write to reach the service", || service.status_calls() == 1).await;

    service.resume_reads();
    assert_eq!(poll.await.unwrap().unwrap(), PollOutcome::Discarded);
    write.await.unwrap().unwrap();
    assert_eq!(status_on_board(&board, &Id::from(1)), Some(TaskStatus::Completed));
}

#[tokio::test]
async fn explicit_refresh_keeps_pending_status() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo), task(2, 1, TaskStatus::Todo)]).await;
    let service = Arc::clone(board.service());
    service.pause_writes();

    let write = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.set_status(&Id::from(2), TaskStatus::InProgress).await })
    };
    eventually("write to reach the service", || service.status_calls() == 1).await;

    board.refresh().await.unwrap();
    assert_eq!(status_in_service(&service, &Id::from(2)), Some(TaskStatus::Todo));
    assert_eq!(status_on_board(&board, &Id::from(2)), Some(TaskStatus::InProgress));

    service.resume_writes();
    write.await.unwrap().unwrap();
    assert!(!board.has_pending_writes());
}

#[tokio::test]
async fn filter_change_drops_the_older_fetch() {
    let tasks = vec![
        task(1, 1, TaskStatus::Todo),
        task(2, 2, TaskStatus::Todo),
        task(3, 1, TaskStatus::InProgress),
        task(4, 2, TaskStatus::Completed),
    ];
    let board = loaded_board(tasks).await;
    let service = Arc::clone(board.service());
    let lists_before = service.list_calls();
    service.pause_reads();

    let unfiltered = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.refresh().await })
    };
    eventually("first fetch to start", || service.list_calls() == lists_before + 1).await;

    let filtered = {
        let board = Arc::clone(&board);
        tokio::spawn(async move {
            board
                .set_filter(TaskFilter {
                    project_id: Some(Id::from(2)),
                    ..TaskFilter::default()
                })
                .await
        })
    };
    eventually("second fetch to start", || service.list_calls() == lists_before + 2).await;

    service.resume_reads();
    unfiltered.await.unwrap().unwrap();
    filtered.await.unwrap().unwrap();

    let snapshot = board.snapshot();
    assert_eq!(snapshot.filter.project_id, Some(Id::from(2)));
    let ids: Vec<&Id> = snapshot.tasks.iter().map(|t| &t.id).collect();
    assert_eq!(ids, vec![&Id::from(2), &Id::from(4)]);
}

#[tokio::test]
async fn paging_through_a_filtered_board() {
    let tasks = (1..=25)
        .map(|n| task(n, 1, if n % 5 == 0 { TaskStatus::Completed } else { TaskStatus::Todo }))
        .collect();
    let board = loaded_board(tasks).await;
    assert_eq!(board.snapshot().total_pages, 3);

    board.goto_page(3).await.unwrap();
    let snapshot = board.snapshot();
    assert_eq!(snapshot.current_page, 3);
    assert_eq!(snapshot.tasks.len(), 5);

    board
        .set_filter(TaskFilter {
            status: Some(TaskStatus::Completed),
            ..TaskFilter::default()
        })
        .await
        .unwrap();
    let snapshot = board.snapshot();
    assert_eq!(snapshot.current_page, 1);
    assert_eq!(snapshot.total_pages, 1);
    assert_eq!(snapshot.tasks.len(), 5);
    assert!(board.goto_page(2).await.is_err());
}

// =============================================================================
// Poller
// =============================================================================

#[tokio::test]
async fn poller_picks_up_changes_made_elsewhere() {
    let board = loaded_board(vec![task(1, 1, TaskStatus::Todo)]).await;
    let service = Arc::clone(board.service());
    let handle = poller::spawn_board(Arc::clone(&board), Duration::from_millis(20));

    service
        .update_task_status(&Id::from(1), TaskStatus::Completed)
        .await
        .unwrap();
    eventually("poller to apply the change", || {
        status_on_board(&board, &Id::from(1)) == Some(TaskStatus::Completed)
    })
    .await;

    handle.stop().await;
    let calls = service.list_calls();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(service.list_calls(), calls);
}
