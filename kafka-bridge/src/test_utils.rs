//! In-memory transports for unit-testing the facades without a broker.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rdkafka::consumer::CommitMode;
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::OwnedMessage;
use rdkafka::producer::PurgeConfig;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::TopicPartitionList;

use crate::message::ProducerRecord;
use crate::transport::{ConsumerTransport, ProducerTransport};

fn metadata_for(
    partitions: &HashMap<String, Vec<i32>>,
    topic: &str,
) -> KafkaResult<Vec<i32>> {
    partitions.get(topic).cloned().ok_or(KafkaError::MetadataFetch(
        RDKafkaErrorCode::UnknownTopicOrPartition,
    ))
}

/// Records every call the consumer facade makes; scripted poll outcomes.
#[derive(Default)]
pub(crate) struct FakeConsumerTransport {
    partitions: HashMap<String, Vec<i32>>,
    subscribed: Mutex<Option<Vec<String>>>,
    assigned: Mutex<Option<TopicPartitionList>>,
    unassigned: Mutex<bool>,
    polls: Mutex<VecDeque<Option<KafkaResult<OwnedMessage>>>>,
    poll_count: AtomicUsize,
    commits: Mutex<Vec<(TopicPartitionList, bool)>>,
    watermarks: Mutex<HashMap<(String, i32), (i64, i64)>>,
    fail_subscribe: Mutex<Option<KafkaError>>,
    fail_commit: Mutex<Option<KafkaError>>,
}

impl FakeConsumerTransport {
    pub(crate) fn with_partitions(mut self, topic: &str, partitions: Vec<i32>) -> Self {
        self.partitions.insert(topic.to_string(), partitions);
        self
    }

    pub(crate) fn push_poll(&self, outcome: Option<KafkaResult<OwnedMessage>>) {
        self.polls.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn set_watermarks(&self, topic: &str, partition: i32, low: i64, high: i64) {
        self.watermarks
            .lock()
            .unwrap()
            .insert((topic.to_string(), partition), (low, high));
    }

    pub(crate) fn fail_subscribe(&self, error: KafkaError) {
        *self.fail_subscribe.lock().unwrap() = Some(error);
    }

    pub(crate) fn fail_commit(&self, error: KafkaError) {
        *self.fail_commit.lock().unwrap() = Some(error);
    }

    pub(crate) fn subscribed_topics(&self) -> Option<Vec<String>> {
        self.subscribed.lock().unwrap().clone()
    }

    pub(crate) fn assigned(&self) -> Option<TopicPartitionList> {
        self.assigned.lock().unwrap().clone()
    }

    pub(crate) fn unassigned(&self) -> bool {
        *self.unassigned.lock().unwrap()
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub(crate) fn commits(&self) -> Vec<(TopicPartitionList, bool)> {
        self.commits.lock().unwrap().clone()
    }
}

impl ConsumerTransport for FakeConsumerTransport {
    fn subscribe(&self, topics: &[&str]) -> KafkaResult<()> {
        if let Some(error) = self.fail_subscribe.lock().unwrap().take() {
            return Err(error);
        }
        *self.subscribed.lock().unwrap() =
            Some(topics.iter().map(|topic| topic.to_string()).collect());
        Ok(())
    }

    fn unsubscribe(&self) {
        *self.subscribed.lock().unwrap() = None;
    }

    fn assign(&self, assignment: &TopicPartitionList) -> KafkaResult<()> {
        *self.assigned.lock().unwrap() = Some(assignment.clone());
        Ok(())
    }

    fn unassign(&self) -> KafkaResult<()> {
        *self.unassigned.lock().unwrap() = true;
        *self.assigned.lock().unwrap() = None;
        Ok(())
    }

    fn poll(&self, _timeout: Timeout) -> Option<KafkaResult<OwnedMessage>> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.polls.lock().unwrap().pop_front().flatten()
    }

    fn commit(&self, offsets: &TopicPartitionList, mode: CommitMode) -> KafkaResult<()> {
        if let Some(error) = self.fail_commit.lock().unwrap().take() {
            return Err(error);
        }
        self.commits
            .lock()
            .unwrap()
            .push((offsets.clone(), matches!(mode, CommitMode::Sync)));
        Ok(())
    }

    fn assignment(&self) -> KafkaResult<TopicPartitionList> {
        Ok(self
            .assigned
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(TopicPartitionList::new))
    }

    fn committed_offsets(
        &self,
        partitions: TopicPartitionList,
        _timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        Ok(partitions)
    }

    fn offsets_for_times(
        &self,
        timestamps: TopicPartitionList,
        _timeout: Timeout,
    ) -> KafkaResult<TopicPartitionList> {
        Ok(timestamps)
    }

    fn position(&self) -> KafkaResult<TopicPartitionList> {
        self.assignment()
    }

    fn query_watermark_offsets(
        &self,
        topic: &str,
        partition: i32,
        _timeout: Timeout,
    ) -> KafkaResult<(i64, i64)> {
        Ok(self
            .watermarks
            .lock()
            .unwrap()
            .get(&(topic.to_string(), partition))
            .copied()
            .unwrap_or((0, 0)))
    }

    fn partitions_for(&self, topic: &str, _timeout: Timeout) -> KafkaResult<Vec<i32>> {
        metadata_for(&self.partitions, topic)
    }
}

/// Producer transport with a scripted queue: each poll drains
/// `drain_per_poll` messages.
#[derive(Default)]
pub(crate) struct FakeProducerTransport {
    partitions: HashMap<String, Vec<i32>>,
    drain_per_poll: i32,
    handles_created: Mutex<HashMap<String, usize>>,
    enqueued: Mutex<Vec<(String, ProducerRecord)>>,
    queued: Mutex<i32>,
    poll_count: AtomicUsize,
    purged: Mutex<bool>,
    fail_enqueue: Mutex<Option<KafkaError>>,
    fail_flush: Mutex<bool>,
}

impl FakeProducerTransport {
    pub(crate) fn with_partitions(mut self, topic: &str, partitions: Vec<i32>) -> Self {
        self.partitions.insert(topic.to_string(), partitions);
        self
    }

    pub(crate) fn draining(mut self, per_poll: i32) -> Self {
        self.drain_per_poll = per_poll;
        self
    }

    pub(crate) fn set_queued(&self, count: i32) {
        *self.queued.lock().unwrap() = count;
    }

    pub(crate) fn fail_enqueue(&self, error: KafkaError) {
        *self.fail_enqueue.lock().unwrap() = Some(error);
    }

    /// Make flush time out, leaving whatever is queued in flight.
    pub(crate) fn fail_flush(&self) {
        *self.fail_flush.lock().unwrap() = true;
    }

    pub(crate) fn handles_created(&self, topic: &str) -> usize {
        self.handles_created
            .lock()
            .unwrap()
            .get(topic)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn enqueued(&self) -> Vec<(String, ProducerRecord)> {
        self.enqueued.lock().unwrap().clone()
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub(crate) fn purged(&self) -> bool {
        *self.purged.lock().unwrap()
    }
}

impl ProducerTransport for FakeProducerTransport {
    type TopicHandle = String;

    fn create_topic_handle(&self, topic: &str) -> String {
        *self
            .handles_created
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_insert(0) += 1;
        topic.to_string()
    }

    fn enqueue(&self, handle: &String, record: &ProducerRecord) -> Result<(), KafkaError> {
        if let Some(error) = self.fail_enqueue.lock().unwrap().take() {
            return Err(error);
        }
        self.enqueued
            .lock()
            .unwrap()
            .push((handle.clone(), record.clone()));
        *self.queued.lock().unwrap() += 1;
        Ok(())
    }

    fn poll(&self, _timeout: Timeout) {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let mut queued = self.queued.lock().unwrap();
        *queued = (*queued - self.drain_per_poll).max(0);
    }

    fn flush(&self, _timeout: Timeout) -> KafkaResult<()> {
        if *self.fail_flush.lock().unwrap() {
            return Err(KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut));
        }
        *self.queued.lock().unwrap() = 0;
        Ok(())
    }

    fn purge(&self, _flags: PurgeConfig) {
        *self.purged.lock().unwrap() = true;
        *self.queued.lock().unwrap() = 0;
    }

    fn queued_count(&self) -> i32 {
        *self.queued.lock().unwrap()
    }

    fn partitions_for(&self, topic: &str, _timeout: Timeout) -> KafkaResult<Vec<i32>> {
        metadata_for(&self.partitions, topic)
    }
}
