//! Fixed-interval refresh driver.
//!
//! The first tick fires immediately, later ticks every `period`. A tick
//! that would have fired while the previous refresh was still running is
//! skipped rather than bursted. The loop ends on [`PollerHandle::stop`] or
//! when the handle is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::TaskService;
use crate::tasks::{PollOutcome, TaskBoard};

/// Owner of a running poll loop.
///
/// Dropping the handle aborts the loop.
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
}

impl PollerHandle {
    /// Stops the loop and waits for it to finish. A refresh already in
    /// progress runs to completion first.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await
            && e.is_panic()
        {
            tracing::error!(error = %e, "poller task panicked");
        }
    }

    /// Returns `true` once the loop has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs `tick` now and then every `period` until stopped.
///
/// # Panics
///
/// Panics if `period` is zero or if called outside a tokio runtime.
pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                _ = ticker.tick() => tick().await,
            }
        }
        tracing::debug!("poller stopped");
    });
    PollerHandle {
        task,
        stop: Some(stop_tx),
    }
}

/// Polls `board` every `period`, logging each outcome.
pub fn spawn_board<S>(board: Arc<TaskBoard<S>>, period: Duration) -> PollerHandle
where
    S: TaskService + 'static,
{
    spawn(period, move || {
        let board = Arc::clone(&board);
        async move {
            match board.poll_refresh().await {
                Ok(PollOutcome::Applied) => tracing::trace!("poll applied"),
                Ok(outcome) => tracing::debug!(?outcome, "poll result not applied"),
                Err(e) => tracing::warn!(error = %e, "poll refresh failed"),
            }
        }
    })
}
