//! Frozen client configuration.
//!
//! A [`ClientConfiguration`] is produced by a builder, never mutated
//! afterwards, and shared read-only by the facade that owns it. Translation
//! into the broker client's key/value form happens once, at client creation.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rdkafka::config::ClientConfig;
use rdkafka::Offset;
use siphasher::sip::SipHasher13;

use crate::subscription::TopicSubscription;

#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    brokers: Vec<String>,
    subscriptions: Vec<TopicSubscription>,
    options: BTreeMap<String, String>,
    group_id: Option<String>,
}

impl ClientConfiguration {
    pub(crate) fn new(
        brokers: Vec<String>,
        subscriptions: Vec<TopicSubscription>,
        options: BTreeMap<String, String>,
        group_id: Option<String>,
    ) -> Self {
        Self {
            brokers,
            subscriptions,
            options,
            group_id,
        }
    }

    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }

    pub fn subscriptions(&self) -> &[TopicSubscription] {
        &self.subscriptions
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The consumer-group id, if this configuration belongs to a consumer.
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Translate into the broker client's key/value configuration:
    /// `bootstrap.servers` from the broker list, `group.id` when present, and
    /// every option verbatim.
    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", self.brokers.join(","));
        if let Some(group_id) = &self.group_id {
            config.set("group.id", group_id);
        }
        for (key, value) in &self.options {
            config.set(key, value);
        }
        config
    }
}

/// Deterministic group id for configurations that do not name one: identical
/// subscription lists always land in the same consumer group, across
/// processes and restarts. Callers wanting distinct groups over the same
/// topics must set `group.id` explicitly.
pub(crate) fn derive_group_id(subscriptions: &[TopicSubscription]) -> String {
    let mut hasher = SipHasher13::new();
    for subscription in subscriptions {
        subscription.topic().hash(&mut hasher);
        subscription.partitions().hash(&mut hasher);
        offset_discriminant(subscription.start_offset()).hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

fn offset_discriminant(offset: Offset) -> (u8, i64) {
    match offset {
        Offset::Beginning => (0, 0),
        Offset::End => (1, 0),
        Offset::Stored => (2, 0),
        Offset::Invalid => (3, 0),
        Offset::Offset(value) => (4, value),
        Offset::OffsetTail(value) => (5, value),
    }
}
