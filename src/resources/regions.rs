// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog endpoints. Their content rarely changes, so they go through the
//! response cache.

use serde::{Deserialize, Serialize};

use crate::client::LinodeClient;
use crate::error::Result;
use crate::pagination::ListOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub kvm: bool,
    #[serde(default)]
    pub deprecated: bool,
}

impl LinodeClient {
    pub async fn list_regions(&self, opts: &ListOptions) -> Result<Vec<Region>> {
        self.list_cached("regions", opts).await
    }

    pub async fn get_region(&self, region_id: &str) -> Result<Region> {
        self.get_cached(&format!(
            "regions/{}",
            crate::client::encode_segment(region_id)
        ))
        .await
    }

    pub async fn list_kernels(&self, opts: &ListOptions) -> Result<Vec<Kernel>> {
        self.list_cached("linode/kernels", opts).await
    }
}
