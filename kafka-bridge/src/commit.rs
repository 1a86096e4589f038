//! Offset-commit coalescing.
//!
//! A batch of acknowledged messages collapses into at most one commit record
//! per partition, holding the highest acknowledged offset plus one (the next
//! offset to read on restart). Duplicates and out-of-order offsets within a
//! batch are superseded silently, never committed separately, so committing
//! the same batch twice is idempotent.

use std::collections::HashMap;

use rdkafka::error::KafkaResult;
use rdkafka::{Offset, TopicPartitionList};

use crate::message::ConsumerRecord;
use crate::types::Partition;

/// Reduce acknowledged records to the minimal per-partition commit set.
pub fn coalesce_commit_offsets<'a>(
    records: impl IntoIterator<Item = &'a ConsumerRecord>,
) -> HashMap<Partition, i64> {
    let mut offsets: HashMap<Partition, i64> = HashMap::new();

    for record in records {
        let partition = Partition::new(record.topic().to_string(), record.partition());
        let next_offset = record.offset() + 1;
        offsets
            .entry(partition)
            .and_modify(|existing| {
                if next_offset > *existing {
                    *existing = next_offset;
                }
            })
            .or_insert(next_offset);
    }

    offsets
}

/// Convert a coalesced commit set into the broker client's list form.
pub fn to_partition_list(offsets: &HashMap<Partition, i64>) -> KafkaResult<TopicPartitionList> {
    let mut list = TopicPartitionList::with_capacity(offsets.len());
    for (partition, next_offset) in offsets {
        list.add_partition_offset(
            partition.topic(),
            partition.partition_number(),
            Offset::Offset(*next_offset),
        )?;
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str, partition: i32, offset: i64) -> ConsumerRecord {
        ConsumerRecord::new(
            topic.to_string(),
            partition,
            offset,
            None,
            None,
            Some(b"payload".to_vec()),
            vec![],
        )
    }

    #[test]
    fn single_record_commits_next_offset() {
        let offsets = coalesce_commit_offsets(&[record("orders", 0, 5)]);
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets[&Partition::new("orders".to_string(), 0)], 6);
    }

    #[test]
    fn batch_collapses_to_one_record_per_partition() {
        let records = [
            record("orders", 0, 5),
            record("orders", 0, 3),
            record("orders", 1, 9),
        ];

        let offsets = coalesce_commit_offsets(&records);
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[&Partition::new("orders".to_string(), 0)], 6);
        assert_eq!(offsets[&Partition::new("orders".to_string(), 1)], 10);
    }

    #[test]
    fn duplicates_and_out_of_order_offsets_take_the_maximum() {
        let records = [
            record("orders", 0, 7),
            record("orders", 0, 7),
            record("orders", 0, 2),
            record("orders", 0, 11),
            record("orders", 0, 4),
        ];

        let offsets = coalesce_commit_offsets(&records);
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets[&Partition::new("orders".to_string(), 0)], 12);
    }

    #[test]
    fn partitions_of_different_topics_do_not_collide() {
        let records = [record("orders", 0, 5), record("payments", 0, 8)];

        let offsets = coalesce_commit_offsets(&records);
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[&Partition::new("orders".to_string(), 0)], 6);
        assert_eq!(offsets[&Partition::new("payments".to_string(), 0)], 9);
    }

    #[test]
    fn coalescing_is_idempotent() {
        let records = [record("orders", 0, 5), record("orders", 0, 9)];
        let first = coalesce_commit_offsets(&records);

        // Re-acknowledge a record carrying the already-coalesced offset.
        let highest = record("orders", 0, 9);
        let second = coalesce_commit_offsets(&[highest]);
        assert_eq!(first, second);
    }

    #[test]
    fn partition_list_carries_explicit_offsets() {
        let records = [record("orders", 0, 5), record("orders", 1, 9)];
        let offsets = coalesce_commit_offsets(&records);

        let list = to_partition_list(&offsets).unwrap();
        assert_eq!(list.count(), 2);
        for element in list.elements() {
            let expected = offsets[&Partition::new(
                element.topic().to_string(),
                element.partition(),
            )];
            assert_eq!(element.offset(), Offset::Offset(expected));
        }
    }
}
