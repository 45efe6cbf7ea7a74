// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for tests against mock servers and live accounts.

use std::env;
use std::time::Duration;

use serde_json::{json, Value};

use crate::client::{LinodeClient, LinodeClientConfig};
use crate::config::ENV_LINODE_TOKEN;
use crate::error::Result;

/// Environment variable that opts in to tests against a real account.
pub const ENV_LINODE_LIVE_TESTS: &str = "LINODE_LIVE_TESTS";

/// A list envelope as returned by every list endpoint.
pub fn paged_body(page: u32, pages: u32, results: u32, data: Vec<Value>) -> Value {
    json!({
        "data": data,
        "page": page,
        "pages": pages,
        "results": results,
    })
}

/// An error body with one entry per `(field, reason)`.
pub fn error_body(reasons: &[(Option<&str>, &str)]) -> Value {
    let errors: Vec<Value> = reasons
        .iter()
        .map(|(field, reason)| match field {
            Some(field) => json!({"field": field, "reason": reason}),
            None => json!({"reason": reason}),
        })
        .collect();
    json!({ "errors": errors })
}

/// An account event concerning a numeric entity.
pub fn event_json(id: u64, action: &str, status: &str, entity_type: &str, entity_id: u64) -> Value {
    json!({
        "id": id,
        "action": action,
        "status": status,
        "created": "2024-05-01T10:00:00",
        "seen": false,
        "read": false,
        "percent_complete": if status == "finished" { 100 } else { 0 },
        "entity": {
            "id": entity_id,
            "type": entity_type,
            "label": format!("{entity_type}-{entity_id}"),
        },
    })
}

/// An instance in the given status.
pub fn instance_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "label": format!("linode{id}"),
        "status": status,
        "region": "us-east",
        "type": "g6-nanode-1",
        "ipv4": ["192.0.2.10"],
    })
}

/// A client for a live account.
///
/// Returns `None` unless `LINODE_LIVE_TESTS` and `LINODE_TOKEN` are both set,
/// so live tests skip themselves by default.
pub fn live_client() -> Option<LinodeClient> {
    if env::var(ENV_LINODE_LIVE_TESTS).is_err() {
        println!("Skipping live test: {ENV_LINODE_LIVE_TESTS} not set");
        return None;
    }
    if env::var(ENV_LINODE_TOKEN).map_or(true, |t| t.is_empty()) {
        println!("Skipping live test: {ENV_LINODE_TOKEN} not set");
        return None;
    }

    match LinodeClient::new(LinodeClientConfig::from_env()) {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Failed to build live client: {e}");
            None
        }
    }
}

/// A client pointed at a mock server, polling every 10ms.
pub fn mock_client(base_url: &str) -> Result<LinodeClient> {
    LinodeClient::new(
        LinodeClientConfig::builder()
            .base_url(base_url)
            .token("test-token")
            .poll_interval(Duration::from_millis(10))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageResult;
    use crate::resources::{Event, EventStatus, Instance, InstanceStatus};

    #[test]
    fn test_fixtures_decode() {
        let page: PageResult<Instance> =
            serde_json::from_value(paged_body(1, 2, 3, vec![instance_json(7, "booting")])).unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].status, InstanceStatus::Booting);

        let event: Event =
            serde_json::from_value(event_json(3, "linode_boot", "finished", "linode", 7)).unwrap();
        assert_eq!(event.status, EventStatus::Finished);
        assert_eq!(event.percent_complete, Some(100));
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_body(&[(Some("label"), "too long"), (None, "nope")]);
        assert_eq!(body["errors"][0]["field"], "label");
        assert!(body["errors"][1].get("field").is_none());
    }
}
