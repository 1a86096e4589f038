//! The consumer facade.
//!
//! Wraps a [`ConsumerTransport`] with the subscription state machine and the
//! commit coalescer. One instance per thread; all callbacks run on the thread
//! calling [`Consumer::consume`], and faults they park are surfaced by the
//! same call.

use rdkafka::consumer::CommitMode;
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::util::Timeout;
use rdkafka::TopicPartitionList;
use tracing::debug;

use crate::commit::{coalesce_commit_offsets, to_partition_list};
use crate::config::ClientConfiguration;
use crate::context::FaultSlot;
use crate::error::{CommitError, ConsumeError, SubscriptionError};
use crate::message::ConsumerRecord;
use crate::subscription::{resolve_subscriptions, ResolvedSubscription};
use crate::transport::{ConsumerTransport, RdConsumerTransport};
use crate::types::Partition;

/// High-level consumer over a broker transport. Build one with
/// [`crate::builder::ConsumerBuilder`].
pub struct Consumer<T: ConsumerTransport = RdConsumerTransport> {
    transport: T,
    configuration: ClientConfiguration,
    faults: FaultSlot,
    subscribed: bool,
}

impl<T: ConsumerTransport> Consumer<T> {
    pub(crate) fn new(transport: T, configuration: ClientConfiguration, faults: FaultSlot) -> Self {
        Self {
            transport,
            configuration,
            faults,
            subscribed: false,
        }
    }

    /// Resolve the configured subscriptions and activate them: a group
    /// subscription for group-eligible requests, a manual assignment
    /// otherwise. The metadata lookup for partition expansion is bounded by
    /// `timeout`. On failure the consumer stays unsubscribed.
    pub fn subscribe(&mut self, timeout: Timeout) -> Result<(), SubscriptionError> {
        let resolved = resolve_subscriptions(self.configuration.subscriptions(), |topic| {
            self.transport.partitions_for(topic, timeout)
        })?;

        match resolved {
            ResolvedSubscription::Group(topics) => {
                debug!(?topics, "subscribing as group member");
                let names: Vec<&str> = topics.iter().map(String::as_str).collect();
                self.transport.subscribe(&names)?;
            }
            ResolvedSubscription::Manual(assignment) => {
                debug!(partitions = assignment.count(), "assigning partitions");
                self.transport.assign(&assignment)?;
            }
        }

        self.subscribed = true;
        Ok(())
    }

    /// Drop the subscription and any manual assignment.
    pub fn unsubscribe(&mut self) -> Result<(), SubscriptionError> {
        self.transport.unsubscribe();
        self.transport.unassign()?;
        self.subscribed = false;
        Ok(())
    }

    /// One poll cycle. Runs pending callbacks on this thread, then returns the
    /// next message, a [`ConsumeError::Timeout`] if none arrived in time, or
    /// the fault a callback parked while this call was polling.
    pub fn consume(&mut self, timeout: Timeout) -> Result<ConsumerRecord, ConsumeError> {
        if !self.subscribed {
            return Err(ConsumeError::NotSubscribed);
        }

        let polled = self.transport.poll(timeout);

        if let Some(fault) = self.faults.take() {
            return Err(fault.into());
        }

        match polled {
            None => Err(ConsumeError::Timeout),
            Some(Err(KafkaError::PartitionEOF(partition))) => {
                Err(ConsumeError::PartitionEof(partition))
            }
            Some(Err(error)) => Err(error.into()),
            Some(Ok(message)) => Ok(ConsumerRecord::from_message(&message)),
        }
    }

    /// Commit the acknowledged records, blocking until the broker confirms.
    /// The batch is coalesced to one entry per partition holding the highest
    /// offset plus one; an empty batch is a no-op.
    pub fn commit(&mut self, records: &[ConsumerRecord]) -> Result<(), CommitError> {
        self.commit_with_mode(records, CommitMode::Sync)
    }

    /// Like [`Consumer::commit`] but returns as soon as the commit is queued.
    /// The outcome is reported through
    /// [`crate::handlers::EventHandlers::on_offset_commit`].
    pub fn commit_async(&mut self, records: &[ConsumerRecord]) -> Result<(), CommitError> {
        self.commit_with_mode(records, CommitMode::Async)
    }

    fn commit_with_mode(
        &mut self,
        records: &[ConsumerRecord],
        mode: CommitMode,
    ) -> Result<(), CommitError> {
        let offsets = coalesce_commit_offsets(records);
        if offsets.is_empty() {
            return Ok(());
        }
        let list = to_partition_list(&offsets)?;
        self.transport.commit(&list, mode)?;
        Ok(())
    }

    /// The partitions currently assigned to this consumer.
    pub fn assignment(&self) -> KafkaResult<Vec<Partition>> {
        let assignment = self.transport.assignment()?;
        Ok(assignment.elements().into_iter().map(Partition::from).collect())
    }

    /// Last committed offsets for the given partitions.
    pub fn committed_offsets(
        &self,
        partitions: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        self.transport.committed_offsets(partitions, timeout)
    }

    /// Earliest offsets at or after the per-partition timestamps in
    /// `timestamps`.
    pub fn offsets_for_times(
        &self,
        timestamps: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        self.transport.offsets_for_times(timestamps, timeout)
    }

    /// Next offsets this consumer will read from its assigned partitions.
    pub fn position(&self) -> KafkaResult<TopicPartitionList> {
        self.transport.position()
    }

    /// Low and high watermarks of one partition.
    pub fn query_watermark_offsets(
        &self,
        topic: &str,
        partition: i32,
        timeout: Timeout,
    ) -> KafkaResult<(i64, i64)> {
        self.transport.query_watermark_offsets(topic, partition, timeout)
    }

    /// The earliest available offset of one partition.
    pub fn first_offset(
        &self,
        topic: &str,
        partition: i32,
        timeout: Timeout,
    ) -> KafkaResult<i64> {
        Ok(self.query_watermark_offsets(topic, partition, timeout)?.0)
    }

    /// The offset one past the newest message of one partition.
    pub fn last_offset(
        &self,
        topic: &str,
        partition: i32,
        timeout: Timeout,
    ) -> KafkaResult<i64> {
        Ok(self.query_watermark_offsets(topic, partition, timeout)?.1)
    }

    /// Partition ids of a topic, from broker metadata.
    pub fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>> {
        self.transport.partitions_for(topic, timeout)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }
}
