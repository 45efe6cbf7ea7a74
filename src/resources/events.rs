// SPDX-License-Identifier: MIT OR Apache-2.0

//! The account event feed.
//!
//! Asynchronous operations report their progress here. Each event names the
//! entity it concerns, the action that was performed and the action's status.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::LinodeClient;
use crate::error::Result;
use crate::pagination::ListOptions;

/// Event actions the waiters are commonly used with.
pub mod actions {
    pub const LINODE_BOOT: &str = "linode_boot";
    pub const LINODE_CREATE: &str = "linode_create";
    pub const LINODE_DELETE: &str = "linode_delete";
    pub const LINODE_REBOOT: &str = "linode_reboot";
    pub const LINODE_RESIZE: &str = "linode_resize";
    pub const LINODE_SHUTDOWN: &str = "linode_shutdown";
    pub const LINODE_CLONE: &str = "linode_clone";
    pub const LINODE_SNAPSHOT: &str = "linode_snapshot";
    pub const DISK_CREATE: &str = "disk_create";
    pub const DISK_RESIZE: &str = "disk_resize";
    pub const DISK_DELETE: &str = "disk_delete";
    pub const VOLUME_CREATE: &str = "volume_create";
    pub const VOLUME_ATTACH: &str = "volume_attach";
    pub const VOLUME_DETACH: &str = "volume_detach";
    pub const IMAGE_UPLOAD: &str = "image_upload";
    pub const LKE_NODE_RECYCLE: &str = "lke_node_recycle";
    pub const DATABASE_CREATE: &str = "database_create";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Started,
    Finished,
    Failed,
    Notification,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    /// No further transition is expected.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Finished | EventStatus::Failed)
    }

    /// The operation behind the event is queued or running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::Started)
    }
}

/// Kind of entity an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Linode,
    Disk,
    Database,
    Domain,
    Firewall,
    Image,
    Lkecluster,
    Nodebalancer,
    Volume,
    Vpc,
    #[serde(other)]
    Unknown,
}

impl EntityType {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Linode => "linode",
            EntityType::Disk => "disk",
            EntityType::Database => "database",
            EntityType::Domain => "domain",
            EntityType::Firewall => "firewall",
            EntityType::Image => "image",
            EntityType::Lkecluster => "lkecluster",
            EntityType::Nodebalancer => "nodebalancer",
            EntityType::Volume => "volume",
            EntityType::Vpc => "vpc",
            EntityType::Unknown => "unknown",
        }
    }

    /// The events endpoint accepts `entity.id` and `entity.type` filters for
    /// this type. Events of other types are matched client-side.
    #[must_use]
    pub fn supports_feed_filter(&self) -> bool {
        matches!(
            self,
            EntityType::Disk | EntityType::Linode | EntityType::Domain | EntityType::Nodebalancer
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity an event refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntity {
    /// Numeric for most entities, a string for some (images, LKE nodes).
    #[serde(default)]
    pub id: Value,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl EventEntity {
    /// The id as a string, regardless of its JSON type.
    #[must_use]
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(default)]
    pub status: EventStatus,
    pub action: String,
    #[serde(default)]
    pub percent_complete: Option<u32>,
    #[serde(default)]
    pub created: Option<NaiveDateTime>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub entity: Option<EventEntity>,
    #[serde(default)]
    pub secondary_entity: Option<EventEntity>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub time_remaining: Option<u64>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Event {
    /// The event refers to this entity.
    #[must_use]
    pub fn concerns(&self, entity_type: EntityType, entity_id: &str) -> bool {
        self.entity
            .as_ref()
            .is_some_and(|e| e.entity_type == entity_type && e.id_string() == entity_id)
    }
}

impl LinodeClient {
    /// List account events, newest first unless `opts` sorts otherwise.
    pub async fn list_events(&self, opts: &ListOptions) -> Result<Vec<Event>> {
        self.list("account/events", opts).await
    }

    pub async fn get_event(&self, event_id: u64) -> Result<Event> {
        self.get(&format!("account/events/{event_id}")).await
    }

    /// Mark this event and every older one as seen.
    pub async fn mark_event_seen(&self, event_id: u64) -> Result<()> {
        let _: Value = self
            .post(&format!("account/events/{event_id}/seen"), &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
