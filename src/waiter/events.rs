// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event feed poller.
//!
//! Operations such as cluster creation or an image upload expose no single
//! status field to poll. Their progress shows up in the account event feed,
//! so the poller correlates feed entries to one entity and action.
//!
//! Each poller keeps a watermark: the highest event id it no longer needs to
//! look at. Every cycle asks only for events above it, newest first, and
//! examines them oldest first. The watermark never moves past an event that
//! matched but was still pending, so the same event is looked at again on the
//! next cycle and its transition to `finished` is seen.
//!
//! The feed only filters on entity for some entity types (see
//! [`EntityType::supports_feed_filter`]). For the rest the query is bounded by
//! the watermark alone and entity matching happens here.

use std::fmt;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::{wait_for_condition, PollOptions, PollState, LOG_TARGET};
use crate::client::LinodeClient;
use crate::error::{LinodeError, Result};
use crate::filter::{Filter, Operator};
use crate::pagination::{ListOptions, SortOrder};
use crate::resources::{EntityType, Event, EventStatus};

/// What a poller is watching for and how far it has read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWatermark {
    /// Events with this id or lower are not examined again.
    pub last_seen_event_id: u64,
    /// Empty until known for pollers created ahead of a create call.
    pub entity_id: String,
    pub entity_type: EntityType,
    /// When set, only events whose secondary entity has this id match.
    pub secondary_entity_id: Option<String>,
    pub action: String,
}

/// Page 1 of the feed for one entity, newest first.
///
/// `entity.id` is only sent for numeric ids of filterable types, and
/// `entity.type` only for filterable types.
fn feed_query(entity_type: EntityType, entity_id: &str, after: Option<u64>) -> ListOptions {
    let mut clauses = Vec::new();
    if entity_type.supports_feed_filter() {
        if let Ok(id) = entity_id.parse::<u64>() {
            clauses.push(Filter::eq("entity.id", id));
        }
        clauses.push(Filter::eq("entity.type", entity_type.as_str()));
    }
    if let Some(after) = after {
        clauses.push(Filter::compare("id", Operator::Gt, after));
    }

    let opts = ListOptions::new()
        .with_page(1)
        .sorted_by("created", SortOrder::Descending);
    let filter = match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Filter::and(clauses)),
    };
    match filter {
        Some(filter) => opts.with_filter_expr(&filter),
        None => opts,
    }
}

/// Waits for one (entity, action) operation to finish.
///
/// A poller is single-use: [`wait_for_finished`](Self::wait_for_finished)
/// consumes it.
pub struct EventPoller<'a> {
    client: &'a LinodeClient,
    watermark: EventWatermark,
    since: Option<NaiveDateTime>,
}

impl fmt::Debug for EventPoller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPoller")
            .field("watermark", &self.watermark)
            .field("since", &self.since)
            .finish_non_exhaustive()
    }
}

impl<'a> EventPoller<'a> {
    /// A poller that considers every event in the feed.
    pub(crate) fn unprimed(
        client: &'a LinodeClient,
        entity_id: String,
        entity_type: EntityType,
        action: String,
    ) -> Self {
        Self {
            client,
            watermark: EventWatermark {
                last_seen_event_id: 0,
                entity_id,
                entity_type,
                secondary_entity_id: None,
                action,
            },
            since: None,
        }
    }

    /// Ignore events created before `since`.
    #[must_use]
    pub fn with_since(mut self, since: NaiveDateTime) -> Self {
        self.since = Some(since);
        self
    }

    /// Fill in the entity once it exists.
    ///
    /// Used with [`LinodeClient::new_event_poller_without_entity`] after the
    /// create call has returned the new id.
    pub fn set_entity_id(&mut self, entity_id: impl fmt::Display) {
        self.watermark.entity_id = entity_id.to_string();
        debug!(target: LOG_TARGET, "Poller now watching {}", self.describe());
    }

    pub fn watermark(&self) -> &EventWatermark {
        &self.watermark
    }

    fn describe(&self) -> String {
        let entity_id = match self.watermark.entity_id.as_str() {
            "" => "(pending)",
            id => id,
        };
        let mut what = format!(
            "{} event on {} {}",
            self.watermark.action, self.watermark.entity_type, entity_id
        );
        if let Some(secondary) = &self.watermark.secondary_entity_id {
            what.push_str(&format!(" (secondary {secondary})"));
        }
        what
    }

    fn query(&self) -> ListOptions {
        feed_query(
            self.watermark.entity_type,
            &self.watermark.entity_id,
            Some(self.watermark.last_seen_event_id),
        )
    }

    /// Same action and entity, ignoring `since`. An unset entity id matches
    /// any entity of the right type.
    fn matches_operation(&self, event: &Event) -> bool {
        if event.action != self.watermark.action {
            return false;
        }
        let Some(entity) = &event.entity else {
            return false;
        };
        if entity.entity_type != self.watermark.entity_type {
            return false;
        }
        if !self.watermark.entity_id.is_empty() && entity.id_string() != self.watermark.entity_id
        {
            return false;
        }
        match &self.watermark.secondary_entity_id {
            Some(secondary) => event
                .secondary_entity
                .as_ref()
                .is_some_and(|e| e.id_string() == *secondary),
            None => true,
        }
    }

    fn is_target(&self, event: &Event) -> bool {
        if !self.matches_operation(event) {
            return false;
        }
        match (self.since, event.created) {
            (Some(since), Some(created)) => created >= since,
            _ => true,
        }
    }

    /// Set the watermark to the newest event of this operation already in
    /// the feed. Events of other actions or entities do not move it.
    pub(crate) async fn prime(&mut self) -> Result<()> {
        let events = self.client.list_events(&self.query()).await?;
        self.prime_from(&events);
        debug!(
            target: LOG_TARGET,
            "Primed poller for {} at event {}",
            self.describe(),
            self.watermark.last_seen_event_id
        );
        Ok(())
    }

    fn prime_from(&mut self, events: &[Event]) {
        if let Some(newest) = events
            .iter()
            .filter(|e| self.matches_operation(e))
            .map(|e| e.id)
            .max()
        {
            self.watermark.last_seen_event_id = self.watermark.last_seen_event_id.max(newest);
        }
    }

    /// Run one poll cycle.
    ///
    /// Returns the finished event if one was found, and
    /// [`LinodeError::EventFailed`] if the operation failed.
    pub async fn poll_once(&mut self) -> Result<Option<Event>> {
        if self.watermark.entity_id.is_empty() {
            return Err(LinodeError::Validation(format!(
                "entity id not set for {}",
                self.describe()
            )));
        }
        let events = self.client.list_events(&self.query()).await?;
        self.examine(events)
    }

    fn examine(&mut self, mut events: Vec<Event>) -> Result<Option<Event>> {
        events.sort_by_key(|e| e.id);

        let floor = self.watermark.last_seen_event_id;
        let mut newest = floor;
        let mut oldest_pending: Option<u64> = None;

        for event in events.into_iter().filter(|e| e.id > floor) {
            newest = newest.max(event.id);
            if !self.is_target(&event) {
                continue;
            }
            match event.status {
                EventStatus::Finished => {
                    self.watermark.last_seen_event_id = event.id;
                    return Ok(Some(event));
                }
                EventStatus::Failed => {
                    self.watermark.last_seen_event_id = event.id;
                    let message = format!(
                        "{} failed (event {}){}",
                        self.describe(),
                        event.id,
                        event
                            .message
                            .as_deref()
                            .map(|m| format!(": {m}"))
                            .unwrap_or_default()
                    );
                    return Err(LinodeError::EventFailed {
                        message,
                        event: Box::new(event),
                    });
                }
                _ => {
                    debug!(
                        target: LOG_TARGET,
                        "Event {} for {} is {:?} ({}%)",
                        event.id,
                        self.describe(),
                        event.status,
                        event.percent_complete.unwrap_or(0)
                    );
                    oldest_pending = Some(oldest_pending.map_or(event.id, |p| p.min(event.id)));
                }
            }
        }

        self.watermark.last_seen_event_id = match oldest_pending {
            Some(pending) => floor.max(pending - 1),
            None => newest,
        };
        Ok(None)
    }

    /// Poll until the operation finishes, on the client's poll interval.
    pub async fn wait_for_finished(self, timeout_seconds: u64) -> Result<Event> {
        let opts = self.client.poll_options(timeout_seconds);
        self.wait_for_finished_with(&opts).await
    }

    pub async fn wait_for_finished_with(mut self, opts: &PollOptions) -> Result<Event> {
        let mut state = PollState::new(self.describe(), opts);
        info!(
            target: LOG_TARGET,
            "Waiting up to {:?} for {} after event {}",
            opts.timeout,
            state.what(),
            self.watermark.last_seen_event_id
        );

        loop {
            state.next_attempt().await?;
            if let Some(event) = state.guard(self.poll_once()).await?? {
                info!(
                    target: LOG_TARGET,
                    "{} finished after {} checks",
                    state.what(),
                    state.attempts()
                );
                return Ok(event);
            }
        }
    }
}

impl LinodeClient {
    /// Create a poller for an operation that is about to be started.
    ///
    /// Call this before triggering the operation. Earlier events of the same
    /// operation are skipped, so only the new one can satisfy the wait.
    pub async fn new_event_poller(
        &self,
        entity_id: impl fmt::Display,
        entity_type: EntityType,
        action: impl Into<String>,
    ) -> Result<EventPoller<'_>> {
        let mut poller =
            EventPoller::unprimed(self, entity_id.to_string(), entity_type, action.into());
        poller.prime().await?;
        Ok(poller)
    }

    /// Create a poller for an entity that does not exist yet.
    ///
    /// The watermark covers every entity of `entity_type`. Set the id with
    /// [`EventPoller::set_entity_id`] before waiting.
    pub async fn new_event_poller_without_entity(
        &self,
        entity_type: EntityType,
        action: impl Into<String>,
    ) -> Result<EventPoller<'_>> {
        let mut poller = EventPoller::unprimed(self, String::new(), entity_type, action.into());
        poller.prime().await?;
        Ok(poller)
    }

    /// Create a poller that also matches on the event's secondary entity,
    /// e.g. a `disk_delete` on an instance with the disk as secondary.
    pub async fn new_event_poller_with_secondary(
        &self,
        entity_id: impl fmt::Display,
        entity_type: EntityType,
        secondary_entity_id: impl fmt::Display,
        action: impl Into<String>,
    ) -> Result<EventPoller<'_>> {
        let mut poller =
            EventPoller::unprimed(self, entity_id.to_string(), entity_type, action.into());
        poller.watermark.secondary_entity_id = Some(secondary_entity_id.to_string());
        poller.prime().await?;
        Ok(poller)
    }

    /// Wait for an `action` event on an entity to finish.
    ///
    /// Only events created at or after `since` are considered, so pass the
    /// time the operation was started. Events without a creation time are
    /// not excluded.
    pub async fn wait_for_event_finished(
        &self,
        entity_id: impl fmt::Display,
        entity_type: EntityType,
        action: impl Into<String>,
        since: NaiveDateTime,
        timeout_seconds: u64,
    ) -> Result<Event> {
        let opts = self.poll_options(timeout_seconds);
        self.wait_for_event_finished_with(entity_id, entity_type, action, since, &opts)
            .await
    }

    pub async fn wait_for_event_finished_with(
        &self,
        entity_id: impl fmt::Display,
        entity_type: EntityType,
        action: impl Into<String>,
        since: NaiveDateTime,
        opts: &PollOptions,
    ) -> Result<Event> {
        EventPoller::unprimed(self, entity_id.to_string(), entity_type, action.into())
            .with_since(since)
            .wait_for_finished_with(opts)
            .await
    }

    /// Wait until no event for an entity is scheduled or started.
    pub async fn wait_for_resource_free(
        &self,
        entity_type: EntityType,
        entity_id: impl fmt::Display,
        timeout_seconds: u64,
    ) -> Result<()> {
        let opts = self.poll_options(timeout_seconds);
        self.wait_for_resource_free_with(entity_type, entity_id, &opts)
            .await
    }

    pub async fn wait_for_resource_free_with(
        &self,
        entity_type: EntityType,
        entity_id: impl fmt::Display,
        opts: &PollOptions,
    ) -> Result<()> {
        let entity_id = entity_id.to_string();
        let query = feed_query(entity_type, &entity_id, None);
        wait_for_condition(
            format!("{entity_type} {entity_id} to have no running events"),
            opts,
            || self.list_events(&query),
            |events| {
                !events
                    .iter()
                    .any(|e| e.status.is_in_progress() && e.concerns(entity_type, &entity_id))
            },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LinodeClientConfig;
    use serde_json::{json, Value};

    fn client() -> LinodeClient {
        LinodeClient::new(LinodeClientConfig::default()).unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn event_at(id: u64, action: &str, status: &str, entity_id: u64, created: &str) -> Event {
        serde_json::from_value(json!({
            "id": id,
            "action": action,
            "status": status,
            "created": created,
            "entity": {"id": entity_id, "type": "linode"},
        }))
        .unwrap()
    }

    fn event(id: u64, action: &str, status: &str, entity_id: u64) -> Event {
        event_at(id, action, status, entity_id, "2024-05-01T10:00:00")
    }

    fn disk_delete(id: u64, status: &str, linode_id: u64, disk_id: u64) -> Event {
        serde_json::from_value(json!({
            "id": id,
            "action": "disk_delete",
            "status": status,
            "entity": {"id": linode_id, "type": "linode"},
            "secondary_entity": {"id": disk_id, "type": "disk"},
        }))
        .unwrap()
    }

    fn boot_poller(client: &LinodeClient) -> EventPoller<'_> {
        EventPoller::unprimed(
            client,
            "11".to_string(),
            EntityType::Linode,
            "linode_boot".to_string(),
        )
    }

    fn filter_of(poller: &EventPoller<'_>) -> Value {
        let header = poller.query().filter_header().unwrap().unwrap();
        serde_json::from_str(&header).unwrap()
    }

    #[test]
    fn test_query_filters_on_entity_and_watermark() {
        let client = client();
        let mut poller = boot_poller(&client);
        poller.watermark.last_seen_event_id = 40;

        assert_eq!(
            filter_of(&poller),
            json!({
                "+and": [
                    {"entity.id": 11},
                    {"entity.type": "linode"},
                    {"id": {"+gt": 40}},
                ],
                "+order_by": "created",
                "+order": "desc",
            })
        );
        assert_eq!(poller.query().page, 1);
    }

    #[test]
    fn test_query_leaves_entity_matching_local_for_unfilterable_types() {
        let client = client();
        let mut poller = EventPoller::unprimed(
            &client,
            "4".to_string(),
            EntityType::Volume,
            "volume_create".to_string(),
        );
        poller.watermark.last_seen_event_id = 7;

        assert_eq!(
            filter_of(&poller),
            json!({
                "id": {"+gt": 7},
                "+order_by": "created",
                "+order": "desc",
            })
        );
    }

    #[test]
    fn test_query_without_entity_id_filters_on_type_only() {
        let client = client();
        let poller = EventPoller::unprimed(
            &client,
            String::new(),
            EntityType::Linode,
            "linode_create".to_string(),
        );

        assert_eq!(
            filter_of(&poller)["+and"],
            json!([{"entity.type": "linode"}, {"id": {"+gt": 0}}])
        );
    }

    #[test]
    fn test_pending_event_holds_watermark() {
        let client = client();
        let mut poller = boot_poller(&client);

        let found = poller
            .examine(vec![
                event(12, "linode_boot", "started", 11),
                event(10, "linode_boot", "scheduled", 11),
                event(11, "linode_shutdown", "finished", 11),
            ])
            .unwrap();
        assert!(found.is_none());
        assert_eq!(poller.watermark().last_seen_event_id, 9);

        let found = poller
            .examine(vec![event(10, "linode_boot", "finished", 11)])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 10);
        assert_eq!(poller.watermark().last_seen_event_id, 10);

        // Already returned: never reported again.
        let again = poller
            .examine(vec![event(10, "linode_boot", "finished", 11)])
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_watermark_advances_past_unrelated_events() {
        let client = client();
        let mut poller = boot_poller(&client);

        poller
            .examine(vec![
                event(20, "linode_reboot", "finished", 11),
                event(21, "linode_boot", "finished", 99),
            ])
            .unwrap();
        assert_eq!(poller.watermark().last_seen_event_id, 21);
    }

    #[test]
    fn test_failed_event() {
        let client = client();
        let mut poller = boot_poller(&client);

        let mut failed = event(30, "linode_boot", "failed", 11);
        failed.message = Some("out of capacity".to_string());
        let err = poller.examine(vec![failed]).unwrap_err();
        match err {
            LinodeError::EventFailed { message, event } => {
                assert!(message.contains("out of capacity"));
                assert_eq!(event.id, 30);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_since_excludes_older_events() {
        let client = client();
        let mut poller = boot_poller(&client).with_since(at("2024-06-01T00:00:00"));

        let found = poller
            .examine(vec![event(5, "linode_boot", "finished", 11)])
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_old_finished_event_does_not_end_a_running_operation() {
        let client = client();
        let mut poller = boot_poller(&client).with_since(at("2024-05-01T10:00:00"));

        let found = poller
            .examine(vec![
                event_at(101, "linode_boot", "started", 11, "2024-05-01T10:00:05"),
                event_at(90, "linode_boot", "finished", 11, "2024-04-30T08:00:00"),
            ])
            .unwrap();
        assert!(found.is_none());
        assert_eq!(poller.watermark().last_seen_event_id, 100);

        let found = poller
            .examine(vec![event_at(
                101,
                "linode_boot",
                "finished",
                11,
                "2024-05-01T10:00:05",
            )])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 101);
    }

    #[test]
    fn test_prime_ignores_other_actions() {
        let client = client();
        let mut poller = boot_poller(&client);

        poller.prime_from(&[
            event(50, "linode_shutdown", "finished", 11),
            event(42, "linode_boot", "finished", 11),
            event(60, "linode_boot", "finished", 99),
        ]);
        assert_eq!(poller.watermark().last_seen_event_id, 42);

        // A later event of another action does not hide a new boot at 45.
        let found = poller
            .examine(vec![
                event(50, "linode_shutdown", "finished", 11),
                event(45, "linode_boot", "finished", 11),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 45);
    }

    #[test]
    fn test_poller_without_entity() {
        let client = client();
        let mut poller = EventPoller::unprimed(
            &client,
            String::new(),
            EntityType::Linode,
            "linode_create".to_string(),
        );

        poller.prime_from(&[
            event(70, "linode_create", "finished", 3),
            event(71, "linode_boot", "finished", 3),
            event(68, "linode_create", "finished", 5),
        ]);
        assert_eq!(poller.watermark().last_seen_event_id, 70);

        poller.set_entity_id(8);
        assert_eq!(poller.watermark().entity_id, "8");
        let found = poller
            .examine(vec![
                event(72, "linode_create", "finished", 9),
                event(73, "linode_create", "finished", 8),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 73);
    }

    #[tokio::test]
    async fn test_poll_without_entity_id_is_rejected() {
        let client = client();
        let mut poller = EventPoller::unprimed(
            &client,
            String::new(),
            EntityType::Linode,
            "linode_create".to_string(),
        );

        let err = poller.poll_once().await.unwrap_err();
        assert!(matches!(err, LinodeError::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_secondary_entity_must_match() {
        let client = client();
        let mut poller = EventPoller::unprimed(
            &client,
            "11".to_string(),
            EntityType::Linode,
            "disk_delete".to_string(),
        );
        poller.watermark.secondary_entity_id = Some("500".to_string());

        poller.prime_from(&[disk_delete(80, "finished", 11, 400)]);
        assert_eq!(poller.watermark().last_seen_event_id, 0);

        let found = poller
            .examine(vec![
                disk_delete(81, "finished", 11, 400),
                disk_delete(82, "finished", 11, 500),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 82);
    }
}
