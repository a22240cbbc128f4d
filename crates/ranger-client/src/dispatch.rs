//! The locate → send → classify → retry loop.
//!
//! Every client operation is built from [`Dispatcher::dispatch`] (or
//! [`Dispatcher::dispatch_with`] when the command depends on the resolved
//! region). One attempt has exactly three outcomes:
//!
//! - success: the store executed the command, the response and the
//!   location that served it go back to the caller;
//! - retryable failure: the store rejected the routing with a
//!   [`ShardError`], the budget decides whether to try again;
//! - terminal failure: locator or transport errors, returned as-is.

use std::sync::Arc;
use std::time::Duration;

use ranger_locate::ShardLocator;
use ranger_net::{Command, NetError, Request, Response, ShardError, Transport};
use ranger_types::ShardLocation;
use tracing::debug;

use crate::backoff::{BackoffKind, RetryBudget};
use crate::error::ClientError;

/// Result of one routed attempt that reached a store.
#[derive(Debug)]
pub enum Attempt {
    /// The store accepted the routing.
    Served(Response),
    /// The store rejected the routing; retry after backing off with `kind`.
    Rejected {
        /// Backoff kind matching the rejection.
        kind: BackoffKind,
        /// The rejection itself.
        error: ShardError,
    },
}

/// Routes commands to the stores owning their keys.
///
/// Holds no per-call state and is shared freely between concurrent calls.
pub struct Dispatcher {
    locator: Arc<dyn ShardLocator>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Create a dispatcher over `locator` and `transport`.
    pub fn new(locator: Arc<dyn ShardLocator>, transport: Arc<dyn Transport>) -> Self {
        Self { locator, transport }
    }

    /// Return the shard locator.
    pub fn locator(&self) -> &Arc<dyn ShardLocator> {
        &self.locator
    }

    /// Route `cmd` by `key` until a store serves it or `budget` runs out.
    ///
    /// Returns the response together with the location that served it.
    pub async fn dispatch(
        &self,
        budget: &mut dyn RetryBudget,
        key: &[u8],
        cmd: Command,
        timeout: Duration,
    ) -> Result<(Response, ShardLocation), ClientError> {
        self.dispatch_with(budget, key, timeout, |_| cmd.clone()).await
    }

    /// Like [`dispatch`](Self::dispatch), but builds the command from the
    /// location resolved on each attempt.
    pub async fn dispatch_with<F>(
        &self,
        budget: &mut dyn RetryBudget,
        key: &[u8],
        timeout: Duration,
        build: F,
    ) -> Result<(Response, ShardLocation), ClientError>
    where
        F: Fn(&ShardLocation) -> Command + Send + Sync,
    {
        loop {
            let loc = self.locator.locate(key).await?;
            let cmd = build(&loc);
            match self.attempt(&loc, cmd, timeout).await? {
                Attempt::Served(resp) => return Ok((resp, loc)),
                Attempt::Rejected { kind, error } => {
                    debug!(
                        region = %loc.region,
                        store = %loc.leader,
                        %error,
                        "shard error, retrying"
                    );
                    budget.backoff(kind, error.to_string()).await?;
                }
            }
        }
    }

    /// Send `cmd` once to the leader of `loc` and classify the response.
    ///
    /// A rejection is reported to the locator before returning.
    pub async fn attempt(
        &self,
        loc: &ShardLocation,
        cmd: Command,
        timeout: Duration,
    ) -> Result<Attempt, ClientError> {
        let resp = self.send(loc, cmd, timeout).await?;
        Ok(self.classify(loc, resp).await)
    }

    /// Send `cmd` to the leader of `loc`, bounded by `timeout`.
    pub async fn send(
        &self,
        loc: &ShardLocation,
        cmd: Command,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let request = Request::new(loc, cmd);
        let resp = tokio::time::timeout(timeout, self.transport.send(loc.leader, request, timeout))
            .await
            .map_err(|_| NetError::Timeout(timeout))??;
        Ok(resp)
    }

    /// Split a response into served or rejected.
    pub async fn classify(&self, loc: &ShardLocation, mut resp: Response) -> Attempt {
        let Some(error) = resp.shard_error.take() else {
            return Attempt::Served(resp);
        };

        self.locator.on_shard_error(loc, &error).await;
        let kind = match error {
            ShardError::ServerIsBusy { .. } => BackoffKind::ServerBusy,
            _ => BackoffKind::RegionMiss,
        };
        Attempt::Rejected { kind, error }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
