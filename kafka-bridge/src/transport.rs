//! The broker boundary.
//!
//! [`ConsumerTransport`] and [`ProducerTransport`] cover exactly the broker
//! client operations the facades need; the rdkafka-backed implementations
//! below are thin pass-throughs. Everything above this boundary (subscription
//! resolution, commit coalescing, the topic cache, flow control) is tested
//! against in-memory fakes.

use rdkafka::consumer::{BaseConsumer, CommitMode, Consumer};
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::{Header, OwnedHeaders, OwnedMessage};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer, PurgeConfig};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::TopicPartitionList;

use crate::context::CallbackContext;
use crate::message::ProducerRecord;

/// Consumer-side broker operations.
pub trait ConsumerTransport {
    fn subscribe(&self, topics: &[&str]) -> KafkaResult<()>;
    fn unsubscribe(&self);
    fn assign(&self, assignment: &TopicPartitionList) -> KafkaResult<()>;
    fn unassign(&self) -> KafkaResult<()>;
    /// One poll cycle. `None` means the timeout elapsed without a message.
    fn poll(&self, timeout: Timeout) -> Option<KafkaResult<OwnedMessage>>;
    fn commit(&self, offsets: &TopicPartitionList, mode: CommitMode) -> KafkaResult<()>;
    fn assignment(&self) -> KafkaResult<TopicPartitionList>;
    fn committed_offsets(
        &self,
        partitions: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList>;
    fn offsets_for_times(
        &self,
        timestamps: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList>;
    fn position(&self) -> KafkaResult<TopicPartitionList>;
    fn query_watermark_offsets(
        &self,
        topic: &str,
        partition: i32,
        timeout: Timeout,
    ) -> KafkaResult<(i64, i64)>;
    fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>>;
}

/// Producer-side broker operations. `TopicHandle` is whatever the transport
/// hands back for a topic; the facade caches one per topic.
pub trait ProducerTransport {
    type TopicHandle: Clone;

    fn create_topic_handle(&self, topic: &str) -> Self::TopicHandle;
    fn enqueue(
        &self,
        handle: &Self::TopicHandle,
        record: &ProducerRecord,
    ) -> Result<(), KafkaError>;
    /// Serve queued delivery-report and error callbacks.
    fn poll(&self, timeout: Timeout);
    fn flush(&self, timeout: Timeout) -> KafkaResult<()>;
    fn purge(&self, flags: PurgeConfig);
    /// Messages queued or awaiting a delivery report.
    fn queued_count(&self) -> i32;
    fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>>;
}

fn partition_ids(
    metadata: &rdkafka::metadata::Metadata,
    topic: &str,
) -> KafkaResult<Vec<i32>> {
    let Some(topic_metadata) = metadata
        .topics()
        .iter()
        .find(|candidate| candidate.name() == topic)
    else {
        return Err(KafkaError::MetadataFetch(
            RDKafkaErrorCode::UnknownTopicOrPartition,
        ));
    };
    if let Some(error) = topic_metadata.error() {
        return Err(KafkaError::MetadataFetch(error.into()));
    }
    Ok(topic_metadata
        .partitions()
        .iter()
        .map(|partition| partition.id())
        .collect())
}

/// rdkafka-backed consumer transport.
pub struct RdConsumerTransport {
    consumer: BaseConsumer<CallbackContext>,
}

impl RdConsumerTransport {
    pub(crate) fn new(consumer: BaseConsumer<CallbackContext>) -> Self {
        Self { consumer }
    }
}

impl ConsumerTransport for RdConsumerTransport {
    fn subscribe(&self, topics: &[&str]) -> KafkaResult<()> {
        self.consumer.subscribe(topics)
    }

    fn unsubscribe(&self) {
        self.consumer.unsubscribe();
    }

    fn assign(&self, assignment: &TopicPartitionList) -> KafkaResult<()> {
        self.consumer.assign(assignment)
    }

    fn unassign(&self) -> KafkaResult<()> {
        self.consumer.unassign()
    }

    fn poll(&self, timeout: Timeout) -> Option<KafkaResult<OwnedMessage>> {
        self.consumer
            .poll(timeout)
            .map(|result| result.map(|message| message.detach()))
    }

    fn commit(&self, offsets: &TopicPartitionList, mode: CommitMode) -> KafkaResult<()> {
        self.consumer.commit(offsets, mode)
    }

    fn assignment(&self) -> KafkaResult<TopicPartitionList> {
        self.consumer.assignment()
    }

    fn committed_offsets(
        &self,
        partitions: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        self.consumer.committed_offsets(partitions, timeout)
    }

    fn offsets_for_times(
        &self,
        timestamps: TopicPartitionList,
        timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        self.consumer.offsets_for_times(timestamps, timeout)
    }

    fn position(&self) -> KafkaResult<TopicPartitionList> {
        self.consumer.position()
    }

    fn query_watermark_offsets(
        &self,
        topic: &str,
        partition: i32,
        timeout: Timeout,
    ) -> KafkaResult<(i64, i64)> {
        self.consumer.fetch_watermarks(topic, partition, timeout)
    }

    fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>> {
        let metadata = self.consumer.fetch_metadata(Some(topic), timeout)?;
        partition_ids(&metadata, topic)
    }
}

/// rdkafka-backed producer transport. rdkafka manages topic objects
/// internally, so the handle is just the topic name.
pub struct RdProducerTransport {
    producer: BaseProducer<CallbackContext>,
}

impl RdProducerTransport {
    pub(crate) fn new(producer: BaseProducer<CallbackContext>) -> Self {
        Self { producer }
    }
}

impl ProducerTransport for RdProducerTransport {
    type TopicHandle = String;

    fn create_topic_handle(&self, topic: &str) -> String {
        topic.to_string()
    }

    fn enqueue(&self, handle: &String, record: &ProducerRecord) -> Result<(), KafkaError> {
        let mut base = BaseRecord::<[u8], [u8]>::to(handle);
        if let Some(partition) = record.partition() {
            base = base.partition(partition);
        }
        if let Some(key) = record.key() {
            base = base.key(key);
        }
        if let Some(payload) = record.payload() {
            base = base.payload(payload);
        }
        if !record.headers().is_empty() {
            let mut headers = OwnedHeaders::new_with_capacity(record.headers().len());
            for (key, value) in record.headers() {
                headers = headers.insert(Header {
                    key,
                    value: Some(value),
                });
            }
            base = base.headers(headers);
        }
        self.producer.send(base).map_err(|(error, _)| error)
    }

    fn poll(&self, timeout: Timeout) {
        self.producer.poll(timeout);
    }

    fn flush(&self, timeout: Timeout) -> KafkaResult<()> {
        self.producer.flush(timeout)
    }

    fn purge(&self, flags: PurgeConfig) {
        self.producer.purge(flags);
    }

    fn queued_count(&self) -> i32 {
        self.producer.in_flight_count()
    }

    fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>> {
        let metadata = self.producer.client().fetch_metadata(Some(topic), timeout)?;
        partition_ids(&metadata, topic)
    }
}
