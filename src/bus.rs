// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Bus
//!
//! `RabbitMQBus` is the caller facing client. It only holds the connection
//! configuration: every operation opens its own connection and channel, runs
//! the resource setup it needs, and closes the channel then the connection
//! before returning, whether it succeeded or not. A bus can therefore be shared
//! freely between concurrent operations; they never share broker resources.
//!
//! Consuming state progression, one way only:
//! `Idle -> Connecting -> ChannelOpen -> ExchangeReady -> QueueReady -> Bound
//! -> Subscribed -> Draining -> Closed`.

use crate::{
    broker::{AckMode, Broker, BrokerChannel, BrokerConnection, DeliveryStream},
    channel::AmqpBroker,
    config::Config,
    consumer,
    errors::AmqpError,
    publisher,
    topology::ConsumerTopology,
};
use tracing::{debug, info};

/// Client publishing to and consuming from direct exchanges.
#[derive(Debug, Clone)]
pub struct RabbitMQBus<B = AmqpBroker> {
    config: Config,
    broker: B,
}

impl RabbitMQBus<AmqpBroker> {
    /// Creates a bus talking to a real broker. No I/O happens here.
    pub fn new(config: Config) -> RabbitMQBus<AmqpBroker> {
        RabbitMQBus::with_broker(config, AmqpBroker)
    }
}

impl<B> RabbitMQBus<B>
where
    B: Broker,
{
    /// Creates a bus driving the given broker implementation.
    pub fn with_broker(config: Config, broker: B) -> RabbitMQBus<B> {
        RabbitMQBus { config, broker }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends `msg` as a `text/plain` message to `exchange` under `routing_key`.
    ///
    /// The exchange is declared first; if that or anything before it fails,
    /// nothing is sent.
    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        msg: &str,
    ) -> Result<(), AmqpError> {
        let (conn, channel) = self.open().await?;

        let result = publisher::publish(channel.as_ref(), exchange, routing_key, msg).await;

        release(conn, channel).await;
        result
    }

    /// Subscribes a fresh queue bound to `routing_keys` on `exchange` in
    /// automatic acknowledgement mode and calls `callback` with each message
    /// body until the broker ends the subscription.
    pub async fn consume<F>(
        &self,
        exchange: &str,
        routing_keys: &[&str],
        callback: F,
    ) -> Result<(), AmqpError>
    where
        F: FnMut(&[u8]),
    {
        let (conn, channel) = self.open().await?;

        let result = match subscribe(channel.as_ref(), exchange, routing_keys, AckMode::Auto).await
        {
            Ok((queue, stream)) => {
                info!(queue = queue.as_str(), "queue run");
                consumer::drain_auto(stream, callback).await;
                info!(queue = queue.as_str(), "queue end");
                Ok(())
            }
            Err(err) => Err(err),
        };

        release(conn, channel).await;
        result
    }

    /// Like [`RabbitMQBus::consume`] in manual acknowledgement mode: a message
    /// is acknowledged only when `callback` returns `true`, otherwise it is left
    /// unacknowledged.
    pub async fn consume_ack<F>(
        &self,
        exchange: &str,
        routing_keys: &[&str],
        callback: F,
    ) -> Result<(), AmqpError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let (conn, channel) = self.open().await?;

        let result =
            match subscribe(channel.as_ref(), exchange, routing_keys, AckMode::Manual).await {
                Ok((queue, stream)) => {
                    info!(queue = queue.as_str(), "queue run");
                    consumer::drain_manual(channel.as_ref(), stream, callback).await;
                    info!(queue = queue.as_str(), "queue end");
                    Ok(())
                }
                Err(err) => Err(err),
            };

        release(conn, channel).await;
        result
    }

    async fn open(
        &self,
    ) -> Result<(Box<dyn BrokerConnection>, Box<dyn BrokerChannel>), AmqpError> {
        debug!(
            host = self.config.host.as_str(),
            port = self.config.port.as_str(),
            "connecting"
        );
        let conn = self.broker.connect(&self.config.connection_string()).await?;

        match conn.create_channel().await {
            Ok(channel) => {
                debug!("channel open");
                Ok((conn, channel))
            }
            Err(err) => {
                conn.close().await;
                Err(err)
            }
        }
    }
}

async fn subscribe(
    channel: &dyn BrokerChannel,
    exchange: &str,
    routing_keys: &[&str],
    mode: AckMode,
) -> Result<(String, DeliveryStream), AmqpError> {
    let queue = ConsumerTopology::new(exchange, routing_keys)
        .install(channel)
        .await?;

    let stream = channel.subscribe(&queue, mode).await?;
    debug!(queue = queue.as_str(), ?mode, "subscribed");

    Ok((queue, stream))
}

async fn release(conn: Box<dyn BrokerConnection>, channel: Box<dyn BrokerChannel>) {
    channel.close().await;
    conn.close().await;
    debug!("closed");
}
