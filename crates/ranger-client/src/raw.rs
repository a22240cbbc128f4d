//! Raw key/value operations.
//!
//! Single-key operations dispatch one command. Range operations walk the
//! keyspace region by region in increasing key order, one sub-request at a
//! time, each with its own retry budget.

use std::sync::Arc;

use ranger_locate::{PlacementDriver, RegionCache, ShardLocator};
use ranger_net::{Command, Transport};
use ranger_types::KvPair;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::backoff::Backoffer;
use crate::config::ClientConfig;
use crate::delete_range::DeleteRangeTask;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;

/// Client for raw (non-transactional) key/value access.
///
/// Cheap to share behind an `Arc`; calls never block each other.
#[derive(Debug)]
pub struct RawClient {
    dispatcher: Arc<Dispatcher>,
    config: ClientConfig,
    cluster_id: Option<u64>,
}

impl RawClient {
    /// Create a client over an existing locator and transport.
    pub fn new(
        config: ClientConfig,
        locator: Arc<dyn ShardLocator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(locator, transport)),
            config,
            cluster_id: None,
        }
    }

    /// Create a client routing through a [`RegionCache`] over `pd`.
    pub async fn connect(
        config: ClientConfig,
        pd: Arc<dyn PlacementDriver>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let cluster_id = pd.cluster_id().await?;
        let locator = Arc::new(RegionCache::new(pd));
        info!(cluster_id, "raw client connected");

        let mut client = Self::new(config, locator, transport);
        client.cluster_id = Some(cluster_id);
        Ok(client)
    }

    /// Cluster identifier, when connected through a placement driver.
    pub fn cluster_id(&self) -> Option<u64> {
        self.cluster_id
    }

    /// Return the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return the dispatcher shared by this client's operations.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn backoffer(&self) -> Backoffer {
        Backoffer::new(self.config.raw_max_backoff())
    }

    // ------------------------------------------------------------------
    // Single-key operations
    // ------------------------------------------------------------------

    /// Read the value of `key`.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ClientError> {
        let cmd = Command::RawGet { key: key.to_vec() };
        let (resp, _) = self
            .dispatcher
            .dispatch(
                &mut self.backoffer(),
                key,
                cmd,
                self.config.read_timeout_short(),
            )
            .await?;

        let body = resp.into_raw_get().ok_or(ClientError::BodyMissing {
            command: "raw_get",
        })?;
        if !body.error.is_empty() {
            return Err(ClientError::Store(body.error));
        }
        if body.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(body.value))
    }

    /// Store `value` under `key`.
    ///
    /// Empty values cannot be stored and are rejected before any request is
    /// sent.
    pub async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), ClientError> {
        if value.is_empty() {
            return Err(ClientError::EmptyValue);
        }

        let cmd = Command::RawPut {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        let (resp, _) = self
            .dispatcher
            .dispatch(
                &mut self.backoffer(),
                key,
                cmd,
                self.config.read_timeout_short(),
            )
            .await?;

        let body = resp.into_raw_put().ok_or(ClientError::BodyMissing {
            command: "raw_put",
        })?;
        if !body.error.is_empty() {
            return Err(ClientError::Store(body.error));
        }
        Ok(())
    }

    /// Remove `key`. Removing a missing key succeeds.
    pub async fn delete(&self, key: &[u8]) -> Result<(), ClientError> {
        let cmd = Command::RawDelete { key: key.to_vec() };
        let (resp, _) = self
            .dispatcher
            .dispatch(
                &mut self.backoffer(),
                key,
                cmd,
                self.config.read_timeout_short(),
            )
            .await?;

        let body = resp.into_raw_delete().ok_or(ClientError::BodyMissing {
            command: "raw_delete",
        })?;
        if !body.error.is_empty() {
            return Err(ClientError::Store(body.error));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Range operations
    // ------------------------------------------------------------------

    /// Read up to `limit` pairs with keys `>= start_key`, in key order.
    ///
    /// Nothing is returned on error, not even the pairs already read.
    pub async fn scan(&self, start_key: &[u8], limit: usize) -> Result<Vec<KvPair>, ClientError> {
        let max = self.config.max_scan_limit();
        if limit > max {
            return Err(ClientError::ScanLimitExceeded { limit, max });
        }

        let mut kvs: Vec<KvPair> = Vec::with_capacity(limit);
        let mut start = start_key.to_vec();
        let mut regions = 0usize;

        while kvs.len() < limit {
            let remaining = limit - kvs.len();
            let cmd = Command::RawScan {
                start_key: start.clone(),
                limit: u32::try_from(remaining).unwrap_or(u32::MAX),
            };
            let (resp, loc) = self
                .dispatcher
                .dispatch(
                    &mut self.backoffer(),
                    &start,
                    cmd,
                    self.config.read_timeout_short(),
                )
                .await?;
            regions += 1;

            let body = resp.into_raw_scan().ok_or(ClientError::BodyMissing {
                command: "raw_scan",
            })?;
            let mut pairs = body.kvs;
            pairs.truncate(remaining);
            kvs.extend(pairs);

            if loc.is_last() {
                break;
            }
            start = loc.end_key;
        }

        debug!(limit, found = kvs.len(), regions, "scan finished");
        Ok(kvs)
    }

    /// Remove every key in `[start_key, end_key)`.
    ///
    /// An empty `end_key` extends the range to the end of the keyspace
    /// unless `start_key` is empty too: equal keys always name an empty
    /// range. The range is deleted one region at a time; a failure leaves
    /// the regions before it already deleted.
    pub async fn delete_range(&self, start_key: &[u8], end_key: &[u8]) -> Result<(), ClientError> {
        if !end_key.is_empty() && end_key < start_key {
            return Err(ClientError::InvalidRange {
                start: start_key.to_vec(),
                end: end_key.to_vec(),
            });
        }
        if start_key == end_key {
            return Ok(());
        }

        let mut start = start_key.to_vec();
        let mut regions = 0usize;
        loop {
            let (resp, loc) = self
                .dispatcher
                .dispatch_with(
                    &mut self.backoffer(),
                    &start,
                    self.config.read_timeout_short(),
                    |loc| Command::RawDeleteRange {
                        start_key: start.clone(),
                        end_key: loc.clamp_end(end_key),
                    },
                )
                .await?;
            regions += 1;

            let body = resp
                .into_raw_delete_range()
                .ok_or(ClientError::BodyMissing {
                    command: "raw_delete_range",
                })?;
            if !body.error.is_empty() {
                return Err(ClientError::Store(body.error));
            }

            let served_end = loc.clamp_end(end_key);
            if served_end == end_key {
                break;
            }
            start = served_end;
        }

        debug!(regions, "delete range finished");
        Ok(())
    }

    /// Build a cancelable delete-range task over `[start_key, end_key)`.
    ///
    /// The task gets one retry budget for its whole lifetime. Nothing is
    /// sent until [`DeleteRangeTask::execute`] is called; setting `cancel`
    /// to `true` stops it before the next region.
    pub fn delete_range_task(
        &self,
        start_key: &[u8],
        end_key: &[u8],
        cancel: watch::Receiver<bool>,
    ) -> DeleteRangeTask {
        let budget = Box::new(Backoffer::new(self.config.delete_range_max_backoff()));
        DeleteRangeTask::new(
            Arc::clone(&self.dispatcher),
            cancel,
            budget,
            start_key,
            end_key,
        )
        .with_timeout(self.config.read_timeout_medium())
    }
}
