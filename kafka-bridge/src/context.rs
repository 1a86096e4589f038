//! Glue between the broker client's callback traits and [`EventHandlers`].
//!
//! Callbacks fire on whichever thread drives a poll and cannot return errors
//! through the broker client. Fatal outcomes are parked in a [`FaultSlot`]
//! instead; the facade checks the slot after every poll and surfaces the
//! fault from that call. The first fault wins: once the slot is occupied,
//! later faults are logged and dropped until the caller takes it.

use std::sync::{Arc, Mutex, PoisonError};

use rdkafka::client::ClientContext;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance};
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::producer::{DeliveryResult, ProducerContext};
use rdkafka::types::{RDKafkaErrorCode, RDKafkaRespErr};
use rdkafka::TopicPartitionList;
use tracing::{error, warn};

use crate::error::{ConsumeError, ProduceError};
use crate::handlers::{DeliveryReport, ErrorClass, EventHandlers, PartitionAssigner};

/// A fatal outcome recorded inside a broker-client callback.
#[derive(Debug)]
pub(crate) enum ClientFault {
    Broker {
        code: RDKafkaErrorCode,
        reason: String,
    },
    Rebalance(KafkaError),
    Delivery {
        topic: String,
        partition: i32,
        source: KafkaError,
    },
}

impl From<ClientFault> for ConsumeError {
    fn from(fault: ClientFault) -> Self {
        match fault {
            ClientFault::Broker { code, reason } => ConsumeError::Broker { code, reason },
            ClientFault::Rebalance(error) => ConsumeError::Rebalance(error),
            ClientFault::Delivery { source, .. } => ConsumeError::Kafka(source),
        }
    }
}

impl From<ClientFault> for ProduceError {
    fn from(fault: ClientFault) -> Self {
        match fault {
            ClientFault::Broker { code, reason } => ProduceError::Broker { code, reason },
            ClientFault::Delivery {
                topic,
                partition,
                source,
            } => ProduceError::Delivery {
                topic,
                partition,
                source,
            },
            ClientFault::Rebalance(error) => ProduceError::Kafka(error),
        }
    }
}

/// Single-slot mailbox shared between the callback context and the facade.
#[derive(Clone, Default)]
pub(crate) struct FaultSlot {
    inner: Arc<Mutex<Option<ClientFault>>>,
}

impl FaultSlot {
    /// Park a fault unless one is already waiting.
    pub(crate) fn record(&self, fault: ClientFault) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.as_ref() {
            warn!(?pending, dropped = ?fault, "fault slot occupied, dropping later fault");
            return;
        }
        *slot = Some(fault);
    }

    /// Take the pending fault, leaving the slot empty.
    pub(crate) fn take(&self) -> Option<ClientFault> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// The context installed on every broker client this crate creates. Routes
/// each callback through the configured [`EventHandlers`] and records fatal
/// classifications in the shared [`FaultSlot`].
pub struct CallbackContext {
    handlers: Arc<dyn EventHandlers>,
    faults: FaultSlot,
}

impl CallbackContext {
    pub(crate) fn new(handlers: Arc<dyn EventHandlers>) -> Self {
        Self {
            handlers,
            faults: FaultSlot::default(),
        }
    }

    pub(crate) fn faults(&self) -> FaultSlot {
        self.faults.clone()
    }
}

impl ClientContext for CallbackContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        self.handlers.on_log(level, fac, log_message);
    }

    fn error(&self, error: KafkaError, reason: &str) {
        let code = error
            .rdkafka_error_code()
            .unwrap_or(RDKafkaErrorCode::Unknown);
        match self.handlers.on_error(code, reason) {
            ErrorClass::Fatal => {
                error!(?code, reason, "fatal broker error");
                self.faults.record(ClientFault::Broker {
                    code,
                    reason: reason.to_string(),
                });
            }
            ErrorClass::Transient => {
                warn!(?code, reason, "transient broker error");
            }
        }
    }
}

/// Bridges the consumer handle into the narrow assignment interface the
/// rebalance handler sees.
struct ConsumerAssigner<'a> {
    consumer: &'a BaseConsumer<CallbackContext>,
}

impl PartitionAssigner for ConsumerAssigner<'_> {
    fn assign_partitions(&self, assignment: &TopicPartitionList) -> KafkaResult<()> {
        self.consumer.assign(assignment)
    }

    fn clear_partitions(&self) -> KafkaResult<()> {
        self.consumer.unassign()
    }
}

impl ConsumerContext for CallbackContext {
    /// Replaces the broker client's automatic assignment handling: the
    /// configured handler decides what the new assignment is, and a handler
    /// failure is parked as a fault instead of being applied half-way.
    fn rebalance(
        &self,
        base_consumer: &BaseConsumer<Self>,
        err: RDKafkaRespErr,
        tpl: &mut TopicPartitionList,
    ) {
        let event = match err {
            RDKafkaRespErr::RD_KAFKA_RESP_ERR__ASSIGN_PARTITIONS => Rebalance::Assign(tpl),
            RDKafkaRespErr::RD_KAFKA_RESP_ERR__REVOKE_PARTITIONS => Rebalance::Revoke(tpl),
            _ => Rebalance::Error(KafkaError::Rebalance(err.into())),
        };

        let assigner = ConsumerAssigner {
            consumer: base_consumer,
        };
        if let Err(error) = self.handlers.on_rebalance(&assigner, &event) {
            error!(%error, "rebalance handler failed");
            self.faults.record(ClientFault::Rebalance(error));
        }
    }

    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        self.handlers.on_offset_commit(result, offsets);
    }
}

impl ProducerContext for CallbackContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _delivery_opaque: ()) {
        let report = DeliveryReport::from_result(delivery_result);
        if self.handlers.on_delivery(&report) == ErrorClass::Fatal {
            if let Some(source) = report.error {
                self.faults.record(ClientFault::Delivery {
                    topic: report.topic,
                    partition: report.partition,
                    source,
                });
            }
        }
    }
}
