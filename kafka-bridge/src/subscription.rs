//! Topic subscription requests and their resolution into either a group
//! subscription or a manual partition assignment.
//!
//! A request with no explicit partitions and the stored offset is eligible for
//! a group subscription: the broker assigns partitions and rebalances on
//! membership changes. Any other request pins the consumer to concrete
//! partitions, which disables broker-driven reassignment, so the two modes are
//! mutually exclusive on one consumer.

use rdkafka::error::KafkaError;
use rdkafka::{Offset, TopicPartitionList};

use crate::error::{ConfigError, SubscriptionError};

/// One configured topic request: which topic, optionally which partitions,
/// and where to start reading. Immutable once handed to the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSubscription {
    topic: String,
    partitions: Vec<i32>,
    offset: Offset,
}

impl TopicSubscription {
    /// A group-eligible request: no explicit partitions, stored offset.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partitions: Vec::new(),
            offset: Offset::Stored,
        }
    }

    /// Pin the request to explicit partitions, making it a manual assignment.
    pub fn with_partitions(mut self, partitions: impl IntoIterator<Item = i32>) -> Self {
        self.partitions = partitions.into_iter().collect();
        self
    }

    /// Start reading at the given offset instead of the stored one. Any
    /// non-stored offset makes the request a manual assignment.
    pub fn starting_at(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partitions(&self) -> &[i32] {
        &self.partitions
    }

    pub fn start_offset(&self) -> Offset {
        self.offset
    }

    fn is_group_eligible(&self) -> bool {
        self.partitions.is_empty() && self.offset == Offset::Stored
    }
}

/// What a set of subscription requests resolved to. Derived at subscribe time,
/// never stored.
#[derive(Debug, Clone)]
pub enum ResolvedSubscription {
    /// Broker-managed group subscription over the given topics.
    Group(Vec<String>),
    /// Explicit partition/offset assignment. An empty list is a legal
    /// "unassign everything".
    Manual(TopicPartitionList),
}

fn split(
    subscriptions: &[TopicSubscription],
) -> (Vec<&TopicSubscription>, Vec<&TopicSubscription>) {
    subscriptions
        .iter()
        .partition(|subscription| subscription.is_group_eligible())
}

/// Reject configurations that mix group subscriptions with manual
/// assignments. Run at build time so the conflict never reaches the broker.
pub(crate) fn validate_modes(subscriptions: &[TopicSubscription]) -> Result<(), ConfigError> {
    let (group, manual) = split(subscriptions);
    if !group.is_empty() && !manual.is_empty() {
        return Err(ConfigError::MixedSubscriptionModes);
    }
    Ok(())
}

/// Resolve the configured requests into one of the two consumption modes.
///
/// `partitions_for` is consulted only for manual requests that name no
/// explicit partitions: the requested offset then applies to every partition
/// of the topic.
pub fn resolve_subscriptions<F>(
    subscriptions: &[TopicSubscription],
    mut partitions_for: F,
) -> Result<ResolvedSubscription, SubscriptionError>
where
    F: FnMut(&str) -> Result<Vec<i32>, KafkaError>,
{
    let (group, manual) = split(subscriptions);

    if !group.is_empty() && !manual.is_empty() {
        return Err(SubscriptionError::MixedSubscriptionModes);
    }

    if !group.is_empty() {
        let topics = group
            .into_iter()
            .map(|subscription| subscription.topic().to_string())
            .collect();
        return Ok(ResolvedSubscription::Group(topics));
    }

    let mut assignment = TopicPartitionList::new();
    for subscription in manual {
        let partitions = if subscription.partitions().is_empty() {
            partitions_for(subscription.topic())?
        } else {
            subscription.partitions().to_vec()
        };

        for partition in partitions {
            assignment.add_partition_offset(
                subscription.topic(),
                partition,
                subscription.start_offset(),
            )?;
        }
    }

    Ok(ResolvedSubscription::Manual(assignment))
}
