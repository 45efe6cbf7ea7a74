// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instances, their disks and their backup snapshots.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::LinodeClient;
use crate::error::Result;
use crate::pagination::ListOptions;

// =============================================================================
// Instance
// =============================================================================

/// Power and lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Offline,
    Booting,
    Rebooting,
    ShuttingDown,
    Provisioning,
    Deleting,
    Migrating,
    Rebuilding,
    Cloning,
    Restoring,
    Stopped,
    Resizing,
    BillingSuspension,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub label: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "type", default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

// =============================================================================
// Disks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiskStatus {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "not ready")]
    NotReady,
    #[serde(rename = "deleting")]
    Deleting,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDisk {
    pub id: u64,
    pub label: String,
    pub status: DiskStatus,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub filesystem: Option<String>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

// =============================================================================
// Snapshots
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotStatus {
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "needsPostProcessing")]
    NeedsPostProcessing,
    #[serde(rename = "successful")]
    Successful,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "userAborted")]
    UserAborted,
    #[serde(other)]
    Unknown,
}

/// A backup snapshot of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub id: u64,
    #[serde(default)]
    pub label: Option<String>,
    pub status: SnapshotStatus,
    #[serde(rename = "type", default)]
    pub snapshot_type: Option<String>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
    #[serde(default)]
    pub finished: Option<NaiveDateTime>,
}

impl LinodeClient {
    /// Get an instance.
    pub async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        self.get(&format!("linode/instances/{instance_id}")).await
    }

    /// List the disks of an instance.
    pub async fn list_instance_disks(
        &self,
        instance_id: u64,
        opts: &ListOptions,
    ) -> Result<Vec<InstanceDisk>> {
        self.list(&format!("linode/instances/{instance_id}/disks"), opts)
            .await
    }

    /// Get a backup snapshot of an instance.
    pub async fn get_instance_snapshot(
        &self,
        instance_id: u64,
        snapshot_id: u64,
    ) -> Result<InstanceSnapshot> {
        self.get(&format!(
            "linode/instances/{instance_id}/backups/{snapshot_id}"
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_decoding() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "id": 123,
                "label": "web-1",
                "status": "shutting_down",
                "region": "us-east",
                "type": "g6-standard-1",
                "ipv4": ["192.0.2.1"],
                "created": "2018-01-01T00:01:01",
                "specs": {"disk": 81920}
            }"#,
        )
        .unwrap();
        assert_eq!(instance.status, InstanceStatus::ShuttingDown);
        assert_eq!(instance.instance_type.as_deref(), Some("g6-standard-1"));
        assert!(instance.created.is_some());
        assert!(instance.tags.is_empty());
    }

    #[test]
    fn test_unknown_status_does_not_break_decoding() {
        let instance: Instance =
            serde_json::from_str(r#"{"id": 1, "label": "a", "status": "teleporting"}"#).unwrap();
        assert_eq!(instance.status, InstanceStatus::Unknown);
    }

    #[test]
    fn test_disk_status_with_space() {
        let disk: InstanceDisk =
            serde_json::from_str(r#"{"id": 5, "label": "boot", "status": "not ready"}"#).unwrap();
        assert_eq!(disk.status, DiskStatus::NotReady);
    }

    #[test]
    fn test_snapshot_status_camel_case() {
        let snapshot: InstanceSnapshot =
            serde_json::from_str(r#"{"id": 9, "status": "needsPostProcessing"}"#).unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::NeedsPostProcessing);
    }
}
