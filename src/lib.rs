// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod resources;
pub mod runtime;
pub mod testkit;
pub mod waiter;

pub use client::{ApiRequest, LinodeClient, LinodeClientConfig, SharedClient};
pub use error::{ApiError, ErrorReason, LinodeError, Result};
pub use filter::{Comparison, Filter, Operator};
pub use pagination::{ListOptions, PageResult, SortOrder};
pub use resources::{
    DatabaseStatus, DiskStatus, EntityType, Event, EventStatus, InstanceStatus, LkeClusterStatus,
    SnapshotStatus, VolumeStatus,
};
pub use runtime::{RetryCondition, RetryConfig};
pub use waiter::{wait_for_condition, EventPoller, PollOptions};
