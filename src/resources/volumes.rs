// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block storage volumes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::LinodeClient;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    Creating,
    Active,
    Resizing,
    ContactSupport,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: u64,
    pub label: String,
    pub status: VolumeStatus,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Instance the volume is attached to.
    #[serde(default)]
    pub linode_id: Option<u64>,
    #[serde(default)]
    pub filesystem_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

impl LinodeClient {
    /// Get a volume.
    pub async fn get_volume(&self, volume_id: u64) -> Result<Volume> {
        self.get(&format!("volumes/{volume_id}")).await
    }
}
