// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed resource wrappers.
//!
//! Every wrapper is a thin `impl LinodeClient` method over the request
//! runtime; the types here carry only the fields the waiters and callers
//! commonly need. Unknown fields are ignored and unknown status values decode
//! to an `Unknown` variant.

mod databases;
mod events;
mod instances;
mod lke;
mod regions;
mod volumes;

pub use databases::{Database, DatabaseStatus, ENGINE_MYSQL, ENGINE_POSTGRESQL};
pub use events::{actions, EntityType, Event, EventEntity, EventStatus};
pub use instances::{
    DiskStatus, Instance, InstanceDisk, InstanceSnapshot, InstanceStatus, SnapshotStatus,
};
pub use lke::{LkeCluster, LkeClusterStatus, LkeKubeconfig, LkeNode, LkeNodePool, LkeNodeStatus};
pub use regions::{Kernel, Region};
pub use volumes::{Volume, VolumeStatus};
