//! Builders for the two facades.
//!
//! A builder collects brokers, subscriptions and options, then freezes them
//! into a [`ClientConfiguration`] at [`ConsumerBuilder::build`] /
//! [`ProducerBuilder::build`]. All validation that needs no broker happens at
//! build time; a misconfigured client never gets created.

use std::collections::BTreeMap;
use std::sync::Arc;

use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::BaseConsumer;
use rdkafka::producer::BaseProducer;

use crate::config::{derive_group_id, ClientConfiguration};
use crate::consumer::Consumer;
use crate::context::CallbackContext;
use crate::error::ConfigError;
use crate::handlers::{DefaultEventHandlers, EventHandlers};
use crate::producer::Producer;
use crate::subscription::{validate_modes, TopicSubscription};
use crate::transport::{RdConsumerTransport, RdProducerTransport};

fn seed_default(options: &mut BTreeMap<String, String>, key: &str, value: &str) {
    options
        .entry(key.to_string())
        .or_insert_with(|| value.to_string());
}

/// Builds a [`Consumer`].
///
/// ```no_run
/// use kafka_bridge::ConsumerBuilder;
///
/// let consumer = ConsumerBuilder::new()
///     .with_broker("localhost:9092")
///     .with_topic("orders")
///     .with_group_id("checkout")
///     .build()?;
/// # Ok::<(), kafka_bridge::ConfigError>(())
/// ```
pub struct ConsumerBuilder {
    brokers: Vec<String>,
    subscriptions: Vec<TopicSubscription>,
    options: BTreeMap<String, String>,
    group_id: Option<String>,
    handlers: Arc<dyn EventHandlers>,
    log_level: RDKafkaLogLevel,
}

impl Default for ConsumerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerBuilder {
    pub fn new() -> Self {
        Self {
            brokers: Vec::new(),
            subscriptions: Vec::new(),
            options: BTreeMap::new(),
            group_id: None,
            handlers: Arc::new(DefaultEventHandlers),
            log_level: RDKafkaLogLevel::Info,
        }
    }

    pub fn with_broker(mut self, broker: impl Into<String>) -> Self {
        self.brokers.push(broker.into());
        self
    }

    pub fn with_brokers(mut self, brokers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.brokers.extend(brokers.into_iter().map(Into::into));
        self
    }

    /// Subscribe to a topic as a group member, reading from the stored
    /// offset. For explicit partitions or offsets use
    /// [`ConsumerBuilder::with_subscription`].
    pub fn with_topic(self, topic: impl Into<String>) -> Self {
        self.with_subscription(TopicSubscription::new(topic))
    }

    pub fn with_subscription(mut self, subscription: TopicSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Fixed consumer-group id. When unset, a deterministic id is derived
    /// from the subscription list.
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Raw broker-client option, passed through verbatim. Values stringify
    /// via `ToString`, so booleans become `"true"`/`"false"`.
    pub fn with_option(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.insert(key.into(), value.to_string());
        self
    }

    /// Toggle broker-side auto commit. Off by default: offsets are only
    /// committed through [`Consumer::commit`] / [`Consumer::commit_async`].
    pub fn with_auto_commit(self, enabled: bool) -> Self {
        self.with_option("enable.auto.commit", enabled)
            .with_option("enable.auto.offset.store", enabled)
    }

    pub fn with_handlers(mut self, handlers: Arc<dyn EventHandlers>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_log_level(mut self, level: RDKafkaLogLevel) -> Self {
        self.log_level = level;
        self
    }

    fn freeze(self) -> Result<(ClientConfiguration, Arc<dyn EventHandlers>, RDKafkaLogLevel), ConfigError>
    {
        if self.brokers.is_empty() {
            return Err(ConfigError::NoBrokers);
        }
        if self.subscriptions.is_empty() {
            return Err(ConfigError::NoSubscriptions);
        }
        validate_modes(&self.subscriptions)?;

        let mut options = self.options;
        seed_default(&mut options, "auto.offset.reset", "latest");
        seed_default(&mut options, "enable.auto.commit", "false");
        seed_default(&mut options, "enable.auto.offset.store", "false");

        let group_id = self
            .group_id
            .unwrap_or_else(|| derive_group_id(&self.subscriptions));

        let configuration =
            ClientConfiguration::new(self.brokers, self.subscriptions, options, Some(group_id));
        Ok((configuration, self.handlers, self.log_level))
    }

    /// Validate, freeze the configuration and create the broker client. The
    /// consumer starts unsubscribed; call [`Consumer::subscribe`] next.
    pub fn build(self) -> Result<Consumer, ConfigError> {
        let (configuration, handlers, log_level) = self.freeze()?;

        let mut client_config = configuration.client_config();
        client_config.set_log_level(log_level);

        let context = CallbackContext::new(handlers);
        let faults = context.faults();
        let base: BaseConsumer<CallbackContext> = client_config.create_with_context(context)?;

        Ok(Consumer::new(
            RdConsumerTransport::new(base),
            configuration,
            faults,
        ))
    }
}

/// Builds a [`Producer`].
///
/// ```no_run
/// use kafka_bridge::ProducerBuilder;
///
/// let producer = ProducerBuilder::new()
///     .with_broker("localhost:9092")
///     .build()?;
/// # Ok::<(), kafka_bridge::ConfigError>(())
/// ```
pub struct ProducerBuilder {
    brokers: Vec<String>,
    options: BTreeMap<String, String>,
    handlers: Arc<dyn EventHandlers>,
    log_level: RDKafkaLogLevel,
}

impl Default for ProducerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerBuilder {
    pub fn new() -> Self {
        Self {
            brokers: Vec::new(),
            options: BTreeMap::new(),
            handlers: Arc::new(DefaultEventHandlers),
            log_level: RDKafkaLogLevel::Info,
        }
    }

    pub fn with_broker(mut self, broker: impl Into<String>) -> Self {
        self.brokers.push(broker.into());
        self
    }

    pub fn with_brokers(mut self, brokers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.brokers.extend(brokers.into_iter().map(Into::into));
        self
    }

    /// Raw broker-client option, passed through verbatim.
    pub fn with_option(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.insert(key.into(), value.to_string());
        self
    }

    pub fn with_handlers(mut self, handlers: Arc<dyn EventHandlers>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_log_level(mut self, level: RDKafkaLogLevel) -> Self {
        self.log_level = level;
        self
    }

    fn freeze(self) -> Result<(ClientConfiguration, Arc<dyn EventHandlers>, RDKafkaLogLevel), ConfigError>
    {
        if self.brokers.is_empty() {
            return Err(ConfigError::NoBrokers);
        }

        // Low-latency defaults; a caller-supplied value always wins.
        let mut options = self.options;
        seed_default(&mut options, "socket.timeout.ms", "50");
        seed_default(&mut options, "queue.buffering.max.ms", "1");

        let configuration = ClientConfiguration::new(self.brokers, Vec::new(), options, None);
        Ok((configuration, self.handlers, self.log_level))
    }

    /// Validate, freeze the configuration and create the broker client.
    pub fn build(self) -> Result<Producer, ConfigError> {
        let (configuration, handlers, log_level) = self.freeze()?;

        let mut client_config = configuration.client_config();
        client_config.set_log_level(log_level);

        let context = CallbackContext::new(handlers);
        let faults = context.faults();
        let base: BaseProducer<CallbackContext> = client_config.create_with_context(context)?;

        Ok(Producer::new(
            RdProducerTransport::new(base),
            configuration,
            faults,
        ))
    }
}
