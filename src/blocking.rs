// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Blocking Bus
//!
//! Thread-blocking front for [`RabbitMQBus`]. Each call occupies the calling
//! thread until the operation finishes, which for the consume operations means
//! until the broker ends the subscription. Run several subscriptions by calling
//! from several threads; each gets its own connection and channel.
//!
//! Must not be called from inside an async runtime.

use crate::{
    broker::Broker, bus::RabbitMQBus, channel::AmqpBroker, config::Config, errors::AmqpError,
};
use tokio::runtime::{Builder, Runtime};
use tracing::error;

pub struct BlockingRabbitMQBus<B = AmqpBroker> {
    bus: RabbitMQBus<B>,
    runtime: Runtime,
}

impl BlockingRabbitMQBus<AmqpBroker> {
    pub fn new(config: Config) -> Result<BlockingRabbitMQBus<AmqpBroker>, AmqpError> {
        BlockingRabbitMQBus::with_broker(config, AmqpBroker)
    }
}

impl<B> BlockingRabbitMQBus<B>
where
    B: Broker,
{
    pub fn with_broker(config: Config, broker: B) -> Result<BlockingRabbitMQBus<B>, AmqpError> {
        let runtime = match Builder::new_current_thread().enable_all().build() {
            Ok(rt) => Ok(rt),
            Err(err) => {
                error!(error = err.to_string(), "failure to build the runtime");
                Err(AmqpError::InternalError)
            }
        }?;

        Ok(BlockingRabbitMQBus {
            bus: RabbitMQBus::with_broker(config, broker),
            runtime,
        })
    }

    pub fn config(&self) -> &Config {
        self.bus.config()
    }

    pub fn publish(&self, exchange: &str, routing_key: &str, msg: &str) -> Result<(), AmqpError> {
        self.runtime
            .block_on(self.bus.publish(exchange, routing_key, msg))
    }

    pub fn consume<F>(
        &self,
        exchange: &str,
        routing_keys: &[&str],
        callback: F,
    ) -> Result<(), AmqpError>
    where
        F: FnMut(&[u8]),
    {
        self.runtime
            .block_on(self.bus.consume(exchange, routing_keys, callback))
    }

    pub fn consume_ack<F>(
        &self,
        exchange: &str,
        routing_keys: &[&str],
        callback: F,
    ) -> Result<(), AmqpError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.runtime
            .block_on(self.bus.consume_ack(exchange, routing_keys, callback))
    }
}
