// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waiting for long-running operations.
//!
//! Two pollers are provided:
//!
//! - [`wait_for_condition`] repeatedly fetches a state until a predicate
//!   accepts it. The `wait_for_*` methods on [`LinodeClient`] are built on it.
//! - [`EventPoller`] watches the account event feed for one entity and action
//!   until the operation finishes or fails.
//!
//! Both poll on a fixed interval, skip the sleep before the first check and
//! give up at a fixed deadline. Fetch errors are returned immediately; retrying
//! transient failures is the request runtime's job. A
//! [`CancellationToken`] in [`PollOptions`] stops either poller during a fetch
//! or a sleep with [`LinodeError::Cancelled`].
//!
//! # Example
//!
//! ```no_run
//! use linode_api_rs::{InstanceStatus, LinodeClient};
//!
//! # async fn example(client: LinodeClient) -> linode_api_rs::Result<()> {
//! let instance = client
//!     .wait_for_instance_status(123, InstanceStatus::Running, 240)
//!     .await?;
//! println!("{} is up", instance.label);
//! # Ok(())
//! # }
//! ```

mod events;

pub use events::{EventPoller, EventWatermark};

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{LinodeClient, DEFAULT_POLL_INTERVAL};
use crate::error::{LinodeError, Result};
use crate::pagination::ListOptions;
use crate::resources::{
    Database, DatabaseStatus, DiskStatus, Instance, InstanceDisk, InstanceSnapshot,
    InstanceStatus, LkeCluster, LkeClusterStatus, LkeNodePool, SnapshotStatus, Volume,
    VolumeStatus,
};

pub(crate) const LOG_TARGET: &str = "linode_api::waiter";

/// Timing and cancellation for one wait.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause between checks.
    pub interval: Duration,
    /// Deadline measured from the start of the wait.
    pub timeout: Duration,
    pub cancel: Option<CancellationToken>,
}

impl PollOptions {
    /// Poll on the default interval until `timeout` elapses.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
            cancel: None,
        }
    }

    #[must_use]
    pub fn from_secs(timeout_seconds: u64) -> Self {
        Self::new(Duration::from_secs(timeout_seconds))
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop the wait when `token` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Deadline and attempt bookkeeping shared by both pollers.
pub(crate) struct PollState<'a> {
    what: String,
    opts: &'a PollOptions,
    deadline: Instant,
    attempts: u32,
}

impl<'a> PollState<'a> {
    pub(crate) fn new(what: String, opts: &'a PollOptions) -> Self {
        Self {
            what,
            opts,
            deadline: Instant::now() + opts.timeout,
            attempts: 0,
        }
    }

    pub(crate) fn what(&self) -> &str {
        &self.what
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sleep before every check but the first.
    pub(crate) async fn next_attempt(&mut self) -> Result<()> {
        if self.attempts > 0 {
            let wake = (Instant::now() + self.opts.interval).min(self.deadline);
            self.guard(sleep_until(wake)).await?;
        }
        self.attempts += 1;
        Ok(())
    }

    /// Run `fut` unless the wait is cancelled or its deadline passes first.
    pub(crate) async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        let cancelled = async {
            match &self.opts.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(LinodeError::Cancelled(self.what.clone())),
            () = sleep_until(self.deadline) => Err(LinodeError::PollTimeout {
                what: self.what.clone(),
                timeout: self.opts.timeout,
            }),
            out = fut => Ok(out),
        }
    }
}

/// Fetch a state until `is_done` accepts it.
///
/// The first fetch happens immediately, later ones `opts.interval` apart.
/// Returns the accepted state, the first fetch error, or
/// [`LinodeError::PollTimeout`] once `opts.timeout` has elapsed.
pub async fn wait_for_condition<S, F, Fut, P>(
    what: impl Into<String>,
    opts: &PollOptions,
    mut fetch: F,
    mut is_done: P,
) -> Result<S>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    P: FnMut(&S) -> bool,
{
    let mut state = PollState::new(what.into(), opts);
    info!(
        target: LOG_TARGET,
        "Waiting up to {:?} for {}",
        opts.timeout,
        state.what()
    );

    loop {
        state.next_attempt().await?;
        let current = state.guard(fetch()).await??;
        if is_done(&current) {
            debug!(
                target: LOG_TARGET,
                "{} satisfied after {} checks",
                state.what(),
                state.attempts()
            );
            return Ok(current);
        }
        debug!(
            target: LOG_TARGET,
            "{} not yet satisfied (check {})",
            state.what(),
            state.attempts()
        );
    }
}

impl LinodeClient {
    /// Poll options on this client's interval.
    #[must_use]
    pub fn poll_options(&self, timeout_seconds: u64) -> PollOptions {
        PollOptions::from_secs(timeout_seconds).with_interval(self.poll_interval())
    }

    /// Wait for an instance to reach `status`.
    pub async fn wait_for_instance_status(
        &self,
        instance_id: u64,
        status: InstanceStatus,
        timeout_seconds: u64,
    ) -> Result<Instance> {
        self.wait_for_instance_status_with(instance_id, status, &self.poll_options(timeout_seconds))
            .await
    }

    pub async fn wait_for_instance_status_with(
        &self,
        instance_id: u64,
        status: InstanceStatus,
        opts: &PollOptions,
    ) -> Result<Instance> {
        wait_for_condition(
            format!("instance {instance_id} to be {status:?}"),
            opts,
            || self.get_instance(instance_id),
            |instance| instance.status == status,
        )
        .await
    }

    /// Wait for a disk to reach `status`.
    ///
    /// The disk is looked up in the instance's disk list, since a disk that is
    /// still being created may not be addressable on its own yet.
    pub async fn wait_for_instance_disk_status(
        &self,
        instance_id: u64,
        disk_id: u64,
        status: DiskStatus,
        timeout_seconds: u64,
    ) -> Result<InstanceDisk> {
        self.wait_for_instance_disk_status_with(
            instance_id,
            disk_id,
            status,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_instance_disk_status_with(
        &self,
        instance_id: u64,
        disk_id: u64,
        status: DiskStatus,
        opts: &PollOptions,
    ) -> Result<InstanceDisk> {
        let found = wait_for_condition(
            format!("disk {disk_id} of instance {instance_id} to be {status:?}"),
            opts,
            move || async move {
                let disks = self
                    .list_instance_disks(instance_id, &ListOptions::new())
                    .await?;
                Ok(disks.into_iter().find(|disk| disk.id == disk_id))
            },
            |disk| disk.as_ref().is_some_and(|d| d.status == status),
        )
        .await?;
        found.ok_or_else(|| LinodeError::Validation(format!("disk {disk_id} not found")))
    }

    /// Wait for a volume to reach `status`.
    pub async fn wait_for_volume_status(
        &self,
        volume_id: u64,
        status: VolumeStatus,
        timeout_seconds: u64,
    ) -> Result<Volume> {
        self.wait_for_volume_status_with(volume_id, status, &self.poll_options(timeout_seconds))
            .await
    }

    pub async fn wait_for_volume_status_with(
        &self,
        volume_id: u64,
        status: VolumeStatus,
        opts: &PollOptions,
    ) -> Result<Volume> {
        wait_for_condition(
            format!("volume {volume_id} to be {status:?}"),
            opts,
            || self.get_volume(volume_id),
            |volume| volume.status == status,
        )
        .await
    }

    /// Wait for a volume to be attached to `linode_id`, or detached for `None`.
    pub async fn wait_for_volume_linode_id(
        &self,
        volume_id: u64,
        linode_id: Option<u64>,
        timeout_seconds: u64,
    ) -> Result<Volume> {
        self.wait_for_volume_linode_id_with(
            volume_id,
            linode_id,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_volume_linode_id_with(
        &self,
        volume_id: u64,
        linode_id: Option<u64>,
        opts: &PollOptions,
    ) -> Result<Volume> {
        let what = match linode_id {
            Some(id) => format!("volume {volume_id} to attach to instance {id}"),
            None => format!("volume {volume_id} to detach"),
        };
        wait_for_condition(
            what,
            opts,
            || self.get_volume(volume_id),
            |volume| volume.linode_id == linode_id,
        )
        .await
    }

    /// Wait for a backup snapshot to reach `status`.
    pub async fn wait_for_snapshot_status(
        &self,
        instance_id: u64,
        snapshot_id: u64,
        status: SnapshotStatus,
        timeout_seconds: u64,
    ) -> Result<InstanceSnapshot> {
        self.wait_for_snapshot_status_with(
            instance_id,
            snapshot_id,
            status,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_snapshot_status_with(
        &self,
        instance_id: u64,
        snapshot_id: u64,
        status: SnapshotStatus,
        opts: &PollOptions,
    ) -> Result<InstanceSnapshot> {
        wait_for_condition(
            format!("snapshot {snapshot_id} of instance {instance_id} to be {status:?}"),
            opts,
            || self.get_instance_snapshot(instance_id, snapshot_id),
            |snapshot| snapshot.status == status,
        )
        .await
    }

    /// Wait for an LKE cluster to reach `status`.
    pub async fn wait_for_lke_cluster_status(
        &self,
        cluster_id: u64,
        status: LkeClusterStatus,
        timeout_seconds: u64,
    ) -> Result<LkeCluster> {
        self.wait_for_lke_cluster_status_with(
            cluster_id,
            status,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_lke_cluster_status_with(
        &self,
        cluster_id: u64,
        status: LkeClusterStatus,
        opts: &PollOptions,
    ) -> Result<LkeCluster> {
        wait_for_condition(
            format!("LKE cluster {cluster_id} to be {status:?}"),
            opts,
            || self.get_lke_cluster(cluster_id),
            |cluster| cluster.status == status,
        )
        .await
    }

    /// Wait until every node of a pool exists and is ready.
    pub async fn wait_for_lke_node_pool_ready(
        &self,
        cluster_id: u64,
        pool_id: u64,
        timeout_seconds: u64,
    ) -> Result<LkeNodePool> {
        self.wait_for_lke_node_pool_ready_with(
            cluster_id,
            pool_id,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_lke_node_pool_ready_with(
        &self,
        cluster_id: u64,
        pool_id: u64,
        opts: &PollOptions,
    ) -> Result<LkeNodePool> {
        wait_for_condition(
            format!("node pool {pool_id} of LKE cluster {cluster_id} to be ready"),
            opts,
            || self.get_lke_node_pool(cluster_id, pool_id),
            LkeNodePool::is_ready,
        )
        .await
    }

    /// Wait for a database to reach `status`.
    pub async fn wait_for_database_status(
        &self,
        engine: &str,
        database_id: u64,
        status: DatabaseStatus,
        timeout_seconds: u64,
    ) -> Result<Database> {
        self.wait_for_database_status_with(
            engine,
            database_id,
            status,
            &self.poll_options(timeout_seconds),
        )
        .await
    }

    pub async fn wait_for_database_status_with(
        &self,
        engine: &str,
        database_id: u64,
        status: DatabaseStatus,
        opts: &PollOptions,
    ) -> Result<Database> {
        wait_for_condition(
            format!("{engine} database {database_id} to be {status:?}"),
            opts,
            || self.get_database(engine, database_id),
            |database| database.status == status,
        )
        .await
    }
}
