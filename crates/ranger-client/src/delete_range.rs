//! Cancelable, long-running delete of a key range.
//!
//! [`DeleteRangeTask`] deletes `[start, end)` one region at a time using
//! the administrative [`Command::DeleteRange`]. Unlike
//! [`RawClient::delete_range`](crate::RawClient::delete_range), it retries
//! shard errors inline against a single budget covering the whole task, and
//! checks its cancellation signal before every attempt.

use std::sync::Arc;
use std::time::Duration;

use ranger_net::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backoff::RetryBudget;
use crate::config::READ_TIMEOUT_MEDIUM;
use crate::dispatch::{Attempt, Dispatcher};
use crate::error::ClientError;

/// Lifecycle of a [`DeleteRangeTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not finished (including not yet started).
    Running,
    /// The whole range was deleted.
    Done,
    /// Cancellation was observed before the end of the range.
    Canceled,
    /// An error stopped the task.
    Failed,
}

/// A delete-range operation that reports its progress.
///
/// Owned by one caller and mutated only through [`execute`](Self::execute).
pub struct DeleteRangeTask {
    dispatcher: Arc<Dispatcher>,
    cancel: watch::Receiver<bool>,
    budget: Box<dyn RetryBudget>,
    timeout: Duration,
    /// Next key to delete from; advances region by region.
    start_key: Vec<u8>,
    end_key: Vec<u8>,
    shards_affected: usize,
    canceled: bool,
    state: TaskState,
}

impl DeleteRangeTask {
    /// Create a task over `[start_key, end_key)`. An empty `end_key` means
    /// the end of the keyspace.
    ///
    /// Nothing is sent until [`execute`](Self::execute) is called.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        cancel: watch::Receiver<bool>,
        budget: Box<dyn RetryBudget>,
        start_key: &[u8],
        end_key: &[u8],
    ) -> Self {
        Self {
            dispatcher,
            cancel,
            budget,
            timeout: READ_TIMEOUT_MEDIUM,
            start_key: start_key.to_vec(),
            end_key: end_key.to_vec(),
            shards_affected: 0,
            canceled: false,
            state: TaskState::Running,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of regions whose part of the range was deleted.
    pub fn shards_affected(&self) -> usize {
        self.shards_affected
    }

    /// Whether the task stopped early because it was canceled.
    pub fn was_canceled(&self) -> bool {
        self.canceled
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run the task until the range is deleted, it is canceled, or it fails.
    ///
    /// Cancellation is not an error: it returns `Ok(())` with
    /// [`was_canceled`](Self::was_canceled) set. Calling `execute` on a task
    /// that already left [`TaskState::Running`] does nothing.
    pub async fn execute(&mut self) -> Result<(), ClientError> {
        if self.state != TaskState::Running {
            return Ok(());
        }

        match self.run().await {
            Ok(state) => {
                self.state = state;
                self.canceled = state == TaskState::Canceled;
                info!(
                    shards_affected = self.shards_affected,
                    canceled = self.canceled,
                    "delete range task finished"
                );
                Ok(())
            }
            Err(e) => {
                self.state = TaskState::Failed;
                warn!(
                    shards_affected = self.shards_affected,
                    error = %e,
                    "delete range task failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> Result<TaskState, ClientError> {
        if !self.end_key.is_empty() && self.end_key < self.start_key {
            return Err(ClientError::InvalidRange {
                start: self.start_key.clone(),
                end: self.end_key.clone(),
            });
        }
        if !self.end_key.is_empty() && self.start_key == self.end_key {
            return Ok(TaskState::Done);
        }

        loop {
            let canceled = *self.cancel.borrow();
            if canceled {
                return Ok(TaskState::Canceled);
            }

            let loc = self.dispatcher.locator().locate(&self.start_key).await?;
            let end = loc.clamp_end(&self.end_key);
            let cmd = Command::DeleteRange {
                start_key: self.start_key.clone(),
                end_key: end.clone(),
            };

            let resp = match self.dispatcher.attempt(&loc, cmd, self.timeout).await? {
                Attempt::Served(resp) => resp,
                Attempt::Rejected { kind, error } => {
                    debug!(
                        region = %loc.region,
                        %error,
                        "delete range task: shard error, retrying"
                    );
                    self.budget.backoff(kind, error.to_string()).await?;
                    continue;
                }
            };

            let body = resp.into_delete_range().ok_or(ClientError::BodyMissing {
                command: "delete_range",
            })?;
            if !body.error.is_empty() {
                return Err(ClientError::Store(format!(
                    "unexpected delete range error: {}",
                    body.error
                )));
            }

            self.shards_affected += 1;
            debug!(
                region = %loc.region,
                shards_affected = self.shards_affected,
                "delete range task: region done"
            );
            if end == self.end_key {
                return Ok(TaskState::Done);
            }
            self.start_key = end;
        }
    }
}

impl std::fmt::Debug for DeleteRangeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteRangeTask")
            .field("start_key", &self.start_key)
            .field("end_key", &self.end_key)
            .field("shards_affected", &self.shards_affected)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
