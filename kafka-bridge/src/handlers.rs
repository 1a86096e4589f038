//! Event handlers for broker-driven callbacks.
//!
//! The broker client delivers five kinds of events while a thread is inside a
//! poll: errors, rebalances, delivery reports, log lines and offset-commit
//! completions. [`EventHandlers`] exposes one method per kind; the default
//! implementations carry the built-in policy, and callers may override any
//! subset via [`crate::builder::ConsumerBuilder::with_handlers`] /
//! [`crate::builder::ProducerBuilder::with_handlers`].
//!
//! # Rebalance state machine
//!
//! The broker client does not apply group assignments automatically here: on a
//! partitions-assigned event the handler must assign exactly the given set,
//! and on a revoke (or any other rebalance event) it must clear the
//! assignment, relinquishing ownership immediately. Holding a revoked
//! partition across a rebalance means another group member consumes it
//! concurrently. The handler gets a single attempt; an assign failure ends
//! that rebalance cycle and surfaces from the `consume` call that drove the
//! callback.

use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::Rebalance;
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::BorrowedMessage;
use rdkafka::producer::DeliveryResult;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::{Message, TopicPartitionList};
use tracing::{debug, error, info, warn};

/// How a broker-reported error should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Already retried internally by the broker client; not surfaced.
    Transient,
    /// Escalated to the application on its next call into the client.
    Fatal,
}

/// The outcome of one produced message, extracted from the broker client's
/// delivery callback.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub error: Option<KafkaError>,
}

impl DeliveryReport {
    pub(crate) fn from_result(result: &DeliveryResult<'_>) -> Self {
        let (message, error): (&BorrowedMessage<'_>, Option<KafkaError>) = match result {
            Ok(message) => (message, None),
            Err((error, message)) => (message, Some(error.clone())),
        };
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            error,
        }
    }
}

/// The one capability a rebalance handler needs from the consumer: replacing
/// or clearing its partition assignment.
pub trait PartitionAssigner {
    fn assign_partitions(&self, assignment: &TopicPartitionList) -> KafkaResult<()>;
    fn clear_partitions(&self) -> KafkaResult<()>;
}

/// One method per callback kind, with the built-in policy as default
/// behavior. Implementations must be `Send + Sync`: the broker client invokes
/// them from whichever thread is driving a poll.
pub trait EventHandlers: Send + Sync {
    /// Classify a broker-reported error. The default escalates only the
    /// connection-failure class; everything else is already retried by the
    /// broker client.
    fn on_error(&self, code: RDKafkaErrorCode, reason: &str) -> ErrorClass {
        let _ = reason;
        if code == RDKafkaErrorCode::Fail {
            ErrorClass::Fatal
        } else {
            ErrorClass::Transient
        }
    }

    /// React to a group-membership change. See the module docs for the state
    /// machine the default implements.
    fn on_rebalance(
        &self,
        assigner: &dyn PartitionAssigner,
        event: &Rebalance<'_>,
    ) -> KafkaResult<()> {
        match event {
            Rebalance::Assign(partitions) => {
                info!(count = partitions.count(), "assigning partitions");
                assigner.assign_partitions(partitions)
            }
            Rebalance::Revoke(partitions) => {
                info!(count = partitions.count(), "relinquishing partitions");
                assigner.clear_partitions()
            }
            Rebalance::Error(error) => {
                warn!(%error, "rebalance reported an error; clearing assignment");
                assigner.clear_partitions()
            }
        }
    }

    /// Delivery report for one produced message. The default escalates
    /// failed deliveries.
    fn on_delivery(&self, report: &DeliveryReport) -> ErrorClass {
        match &report.error {
            Some(error) => {
                error!(
                    topic = %report.topic,
                    partition = report.partition,
                    %error,
                    "message delivery failed"
                );
                ErrorClass::Fatal
            }
            None => {
                debug!(
                    topic = %report.topic,
                    partition = report.partition,
                    offset = report.offset,
                    "message delivered"
                );
                ErrorClass::Transient
            }
        }
    }

    /// Log line forwarded from the broker client. The default routes it
    /// through `tracing` at a matching level.
    fn on_log(&self, level: RDKafkaLogLevel, facility: &str, message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => error!(facility, "{message}"),
            RDKafkaLogLevel::Warning => warn!(facility, "{message}"),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => info!(facility, "{message}"),
            RDKafkaLogLevel::Debug => debug!(facility, "{message}"),
        }
    }

    /// Completion of a non-blocking offset commit.
    fn on_offset_commit(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        match result {
            Ok(()) => debug!(
                partitions = offsets.count(),
                "committed offsets for partitions"
            ),
            Err(error) => warn!(%error, "offset commit failed"),
        }
    }
}

/// The built-in policy: every `EventHandlers` method at its default.
#[derive(Debug, Default)]
pub struct DefaultEventHandlers;

impl EventHandlers for DefaultEventHandlers {}
