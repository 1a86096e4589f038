//! The producer facade.
//!
//! Wraps a [`ProducerTransport`] with a per-topic handle cache and the flow
//! control primitives. Enqueueing is non-blocking; delivery reports arrive
//! through [`crate::handlers::EventHandlers::on_delivery`] while this thread
//! is inside [`Producer::poll`] or [`Producer::flush`], and fatal reports are
//! surfaced by the call that drove them.

use std::collections::HashMap;

use rdkafka::error::KafkaResult;
use rdkafka::producer::PurgeConfig;
use rdkafka::util::Timeout;
use tracing::{debug, trace};

use crate::config::ClientConfiguration;
use crate::context::FaultSlot;
use crate::error::ProduceError;
use crate::message::ProducerRecord;
use crate::transport::{ProducerTransport, RdProducerTransport};

/// High-level producer over a broker transport. Build one with
/// [`crate::builder::ProducerBuilder`].
pub struct Producer<T: ProducerTransport = RdProducerTransport> {
    transport: T,
    configuration: ClientConfiguration,
    faults: FaultSlot,
    topics: HashMap<String, T::TopicHandle>,
}

impl<T: ProducerTransport> Producer<T> {
    pub(crate) fn new(transport: T, configuration: ClientConfiguration, faults: FaultSlot) -> Self {
        Self {
            transport,
            configuration,
            faults,
            topics: HashMap::new(),
        }
    }

    /// At most one handle per topic per producer; created on first use.
    fn handle_for(&mut self, topic: &str) -> T::TopicHandle {
        if let Some(handle) = self.topics.get(topic) {
            return handle.clone();
        }
        debug!(topic, "creating topic handle");
        let handle = self.transport.create_topic_handle(topic);
        self.topics.insert(topic.to_string(), handle.clone());
        handle
    }

    /// Queue a record without driving callbacks. The record is not on the
    /// wire yet when this returns.
    pub fn enqueue(&mut self, record: &ProducerRecord) -> Result<(), ProduceError> {
        let handle = self.handle_for(record.topic());
        self.transport
            .enqueue(&handle, record)
            .map_err(|source| ProduceError::Enqueue {
                topic: record.topic().to_string(),
                source,
            })
    }

    /// Queue a record and run one poll cycle bounded by `poll_timeout`.
    pub fn produce(
        &mut self,
        record: &ProducerRecord,
        poll_timeout: Timeout,
    ) -> Result<(), ProduceError> {
        self.enqueue(record)?;
        self.poll(poll_timeout)
    }

    /// Queue a record and poll without a deadline.
    pub fn sync_produce(&mut self, record: &ProducerRecord) -> Result<(), ProduceError> {
        self.produce(record, Timeout::Never)
    }

    /// Serve pending delivery-report and error callbacks on this thread,
    /// surfacing any fault they park.
    pub fn poll(&mut self, timeout: Timeout) -> Result<(), ProduceError> {
        self.transport.poll(timeout);
        match self.faults.take() {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    /// Poll until at most `target` messages remain queued. The backpressure
    /// primitive: `poll_until_queue_size(timeout, 0)` returns only once the
    /// queue is drained.
    pub fn poll_until_queue_size(
        &mut self,
        poll_timeout: Timeout,
        target: i32,
    ) -> Result<(), ProduceError> {
        loop {
            let queued = self.transport.queued_count();
            if queued <= target {
                return Ok(());
            }
            trace!(queued, target, "waiting for producer queue to drain");
            self.poll(poll_timeout)?;
        }
    }

    /// Block until every queued message is delivered or `timeout` elapses.
    /// [`ProduceError::FlushIncomplete`] means the remaining messages are at
    /// risk if the process exits now.
    pub fn flush(&mut self, timeout: Timeout) -> Result<(), ProduceError> {
        let result = self.transport.flush(timeout);

        if let Some(fault) = self.faults.take() {
            return Err(fault.into());
        }

        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                let remaining = self.transport.queued_count();
                if remaining > 0 {
                    Err(ProduceError::FlushIncomplete { remaining })
                } else {
                    Err(error.into())
                }
            }
        }
    }

    /// Best-effort drop of queued and/or in-flight messages. Purged messages
    /// come back as failed delivery reports on the next poll.
    pub fn purge(&mut self, flags: PurgeConfig) {
        self.transport.purge(flags);
    }

    /// Messages queued or awaiting a delivery report.
    pub fn queued_count(&self) -> i32 {
        self.transport.queued_count()
    }

    /// Partition ids of a topic, from broker metadata.
    pub fn partitions_for(&self, topic: &str, timeout: Timeout) -> KafkaResult<Vec<i32>> {
        self.transport.partitions_for(topic, timeout)
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ClientFault;
    use crate::test_utils::FakeProducerTransport;
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;
    use std::collections::BTreeMap;

    fn producer(transport: FakeProducerTransport) -> Producer<FakeProducerTransport> {
        let configuration = ClientConfiguration::new(
            vec!["broker-1:9092".to_string()],
            vec![],
            BTreeMap::new(),
            None,
        );
        Producer::new(transport, configuration, FaultSlot::default())
    }

    fn record(topic: &str) -> ProducerRecord {
        ProducerRecord::to(topic).with_payload("body")
    }

    #[test]
    fn topic_handle_is_created_once_and_reused() {
        let mut producer = producer(FakeProducerTransport::default());

        producer.enqueue(&record("orders")).unwrap();
        producer.enqueue(&record("orders")).unwrap();
        producer.enqueue(&record("payments")).unwrap();

        assert_eq!(producer.transport.handles_created("orders"), 1);
        assert_eq!(producer.transport.handles_created("payments"), 1);
        assert_eq!(producer.transport.enqueued().len(), 3);
    }

    #[test]
    fn enqueue_failure_names_the_topic() {
        let transport = FakeProducerTransport::default();
        transport.fail_enqueue(KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull));
        let mut producer = producer(transport);

        let result = producer.enqueue(&record("orders"));
        match result {
            Err(ProduceError::Enqueue { topic, .. }) => assert_eq!(topic, "orders"),
            other => panic!("expected enqueue error, got {other:?}"),
        }
    }

    #[test]
    fn produce_enqueues_and_polls_once() {
        let mut producer = producer(FakeProducerTransport::default());

        producer
            .produce(&record("orders"), Timeout::Never)
            .unwrap();

        assert_eq!(producer.transport.enqueued().len(), 1);
        assert_eq!(producer.transport.poll_count(), 1);
    }

    #[test]
    fn poll_until_queue_size_zero_returns_only_when_drained() {
        let transport = FakeProducerTransport::default().draining(1);
        transport.set_queued(3);
        let mut producer = producer(transport);

        producer
            .poll_until_queue_size(Timeout::Never, 0)
            .unwrap();

        assert_eq!(producer.queued_count(), 0);
        assert_eq!(producer.transport.poll_count(), 3);
    }

    #[test]
    fn poll_until_queue_size_stops_at_the_target() {
        let transport = FakeProducerTransport::default().draining(1);
        transport.set_queued(3);
        let mut producer = producer(transport);

        producer
            .poll_until_queue_size(Timeout::Never, 1)
            .unwrap();

        assert_eq!(producer.queued_count(), 1);
        assert_eq!(producer.transport.poll_count(), 2);
    }

    #[test]
    fn poll_until_queue_size_at_target_does_not_poll() {
        let transport = FakeProducerTransport::default();
        transport.set_queued(2);
        let mut producer = producer(transport);

        producer
            .poll_until_queue_size(Timeout::Never, 2)
            .unwrap();

        assert_eq!(producer.transport.poll_count(), 0);
    }

    #[test]
    fn incomplete_flush_reports_the_remaining_count() {
        let transport = FakeProducerTransport::default();
        transport.set_queued(2);
        transport.fail_flush();
        let mut producer = producer(transport);

        let result = producer.flush(Timeout::Never);
        assert!(matches!(
            result,
            Err(ProduceError::FlushIncomplete { remaining: 2 })
        ));
    }

    #[test]
    fn successful_flush_leaves_nothing_queued() {
        let transport = FakeProducerTransport::default();
        transport.set_queued(5);
        let mut producer = producer(transport);

        producer.flush(Timeout::Never).unwrap();
        assert_eq!(producer.queued_count(), 0);
    }

    #[test]
    fn delivery_fault_surfaces_from_the_driving_poll() {
        let transport = FakeProducerTransport::default();
        let faults = FaultSlot::default();
        let configuration = ClientConfiguration::new(
            vec!["broker-1:9092".to_string()],
            vec![],
            BTreeMap::new(),
            None,
        );
        let mut producer = Producer::new(transport, configuration, faults.clone());

        faults.record(ClientFault::Delivery {
            topic: "orders".to_string(),
            partition: 2,
            source: KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut),
        });

        let result = producer.poll(Timeout::Never);
        match result {
            Err(ProduceError::Delivery {
                topic, partition, ..
            }) => {
                assert_eq!(topic, "orders");
                assert_eq!(partition, 2);
            }
            other => panic!("expected delivery error, got {other:?}"),
        }

        // Drained; the next poll is clean.
        producer.poll(Timeout::Never).unwrap();
    }

    #[test]
    fn purge_drops_queued_messages() {
        let transport = FakeProducerTransport::default();
        transport.set_queued(4);
        let mut producer = producer(transport);

        producer.purge(PurgeConfig::default().queue().inflight());

        assert!(producer.transport.purged());
        assert_eq!(producer.queued_count(), 0);
    }

    #[test]
    fn partitions_for_passes_through_metadata() {
        let transport = FakeProducerTransport::default().with_partitions("orders", vec![0, 1]);
        let producer = producer(transport);

        assert_eq!(
            producer.partitions_for("orders", Timeout::Never).unwrap(),
            vec![0, 1]
        );
        assert!(producer.partitions_for("missing", Timeout::Never).is_err());
    }
}
