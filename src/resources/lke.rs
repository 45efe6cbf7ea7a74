// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kubernetes (LKE) clusters and node pools.

use base64::Engine;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::LinodeClient;
use crate::error::{LinodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LkeClusterStatus {
    Ready,
    NotReady,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LkeNodeStatus {
    Ready,
    NotReady,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LkeCluster {
    pub id: u64,
    pub label: String,
    pub status: LkeClusterStatus,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub k8s_version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

/// A node in a pool. Node ids are strings, unlike most entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LkeNode {
    pub id: String,
    #[serde(default)]
    pub instance_id: Option<u64>,
    pub status: LkeNodeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LkeNodePool {
    pub id: u64,
    pub count: u32,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub nodes: Vec<LkeNode>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LkeNodePool {
    /// Every requested node exists and reports ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.nodes.len() == self.count as usize
            && self
                .nodes
                .iter()
                .all(|node| node.status == LkeNodeStatus::Ready)
    }
}

/// Kubeconfig as returned by the API, base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LkeKubeconfig {
    pub kubeconfig: String,
}

impl LkeKubeconfig {
    /// Decode the kubeconfig YAML.
    pub fn decode(&self) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.kubeconfig.trim())
            .map_err(|e| LinodeError::Validation(format!("invalid kubeconfig encoding: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| LinodeError::Validation(format!("kubeconfig is not UTF-8: {e}")))
    }
}

impl LinodeClient {
    /// Get a cluster.
    pub async fn get_lke_cluster(&self, cluster_id: u64) -> Result<LkeCluster> {
        self.get(&format!("lke/clusters/{cluster_id}")).await
    }

    /// Get a node pool of a cluster.
    pub async fn get_lke_node_pool(&self, cluster_id: u64, pool_id: u64) -> Result<LkeNodePool> {
        self.get(&format!("lke/clusters/{cluster_id}/pools/{pool_id}"))
            .await
    }

    /// Get the kubeconfig of a cluster.
    pub async fn get_lke_cluster_kubeconfig(&self, cluster_id: u64) -> Result<LkeKubeconfig> {
        self.get(&format!("lke/clusters/{cluster_id}/kubeconfig"))
            .await
    }
}
