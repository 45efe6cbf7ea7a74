// SPDX-License-Identifier: MIT OR Apache-2.0

//! Managed databases.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::{encode_segment, LinodeClient};
use crate::error::Result;

/// Engine path segments accepted by the database endpoints.
pub const ENGINE_MYSQL: &str = "mysql";
pub const ENGINE_POSTGRESQL: &str = "postgresql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    Provisioning,
    Active,
    Deleting,
    Deleted,
    Suspending,
    Suspended,
    Resuming,
    Restoring,
    Failed,
    Degraded,
    Updating,
    BackingUp,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: u64,
    pub label: String,
    pub status: DatabaseStatus,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cluster_size: u32,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated: Option<NaiveDateTime>,
}

impl LinodeClient {
    /// Get a database instance of the given engine.
    pub async fn get_database(&self, engine: &str, database_id: u64) -> Result<Database> {
        self.get(&format!(
            "databases/{}/instances/{database_id}",
            encode_segment(engine)
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_status() {
        let db: Database = serde_json::from_str(
            r#"{"id": 7, "label": "pg", "status": "backing_up", "engine": "postgresql"}"#,
        )
        .unwrap();
        assert_eq!(db.status, DatabaseStatus::BackingUp);
        assert_eq!(db.engine.as_deref(), Some(ENGINE_POSTGRESQL));
    }
}
