//! Error types for every failure path of the facade.
//!
//! The broker client's original error is carried along wherever one exists so
//! callers can branch on the underlying code. Transient broker errors are the
//! single exception to the no-swallowing rule: rdkafka already retries those
//! internally, so the default error handler drops them (see
//! [`crate::handlers::EventHandlers::on_error`]).

use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use thiserror::Error;

/// Raised while freezing a builder into a client. Never raised at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one broker must be configured")]
    NoBrokers,
    #[error("at least one topic subscription must be configured")]
    NoSubscriptions,
    #[error(
        "group subscriptions and manual assignments cannot be mixed on one consumer"
    )]
    MixedSubscriptionModes,
    #[error("failed to create broker client: {0}")]
    Kafka(#[from] KafkaError),
}

/// Subscribe/unsubscribe/assign failures.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(
        "group subscriptions and manual assignments cannot be mixed on one consumer"
    )]
    MixedSubscriptionModes,
    #[error(transparent)]
    Kafka(#[from] KafkaError),
}

/// Outcomes of a single `consume` call. `Timeout` and `PartitionEof` are
/// ordinary loop conditions for callers, not terminal failures.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("consumer is not subscribed to any topic")]
    NotSubscribed,
    #[error("no message received within the poll timeout")]
    Timeout,
    #[error("reached the end of partition {0}")]
    PartitionEof(i32),
    #[error("rebalance handling failed: {0}")]
    Rebalance(#[source] KafkaError),
    #[error("fatal broker error {code:?}: {reason}")]
    Broker {
        code: RDKafkaErrorCode,
        reason: String,
    },
    #[error(transparent)]
    Kafka(#[from] KafkaError),
}

/// A coalesced offset commit failed, partially or totally. The facade does not
/// retry; the caller decides whether to re-commit the batch.
#[derive(Debug, Error)]
#[error("offset commit failed: {0}")]
pub struct CommitError(#[from] pub KafkaError);

/// Producer-side failures: enqueue, flush, purge and delivery reports.
#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("failed to enqueue message for topic {topic}: {source}")]
    Enqueue {
        topic: String,
        #[source]
        source: KafkaError,
    },
    #[error("{remaining} message(s) still in flight after flush timeout")]
    FlushIncomplete { remaining: i32 },
    #[error("delivery to {topic}[{partition}] failed: {source}")]
    Delivery {
        topic: String,
        partition: i32,
        #[source]
        source: KafkaError,
    },
    #[error("fatal broker error {code:?}: {reason}")]
    Broker {
        code: RDKafkaErrorCode,
        reason: String,
    },
    #[error(transparent)]
    Kafka(#[from] KafkaError),
}
