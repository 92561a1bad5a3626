// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Collaborator Contract
//!
//! The bus never talks to the wire directly. It drives a `Broker` through the
//! calls below, one connection and one channel per operation. The production
//! implementation lives in [`crate::channel`] and is backed by `lapin`; tests
//! substitute the `mockall` generated mocks.

use crate::{
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;

#[cfg(any(test, feature = "mocks"))]
use mockall::automock;

/// String-valued message headers.
pub type Headers = BTreeMap<String, String>;

/// Stream of deliveries produced by a subscription. It ends when the broker
/// closes the channel or the connection.
pub type DeliveryStream = BoxStream<'static, Result<InboundMessage, AmqpError>>;

/// Acknowledgement discipline selected when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// The broker considers a message acknowledged as soon as it is delivered.
    Auto,
    /// Messages stay unacknowledged until `BrokerChannel::ack` is called.
    Manual,
}

/// A message delivered by the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub body: Vec<u8>,
    /// Channel scoped identifier used to acknowledge this delivery.
    pub delivery_tag: u64,
    pub routing_key: String,
    pub headers: Headers,
}

/// A message about to be published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub message_id: String,
    pub headers: Headers,
    pub payload: Vec<u8>,
}

/// Entry point of the transport: opens connections from a target URI.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    async fn connect(&self, target: &str) -> Result<Box<dyn BrokerConnection>, AmqpError>;
}

/// An open connection to the broker.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn create_channel(&self) -> Result<Box<dyn BrokerChannel>, AmqpError>;

    /// Closes the connection. Failures are reported through logs only.
    async fn close(&self);
}

/// A communication channel multiplexed on a connection.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_exchange(&self, def: &ExchangeDefinition) -> Result<(), AmqpError>;

    /// Declares a queue and returns the name the broker assigned to it.
    async fn declare_queue(&self, def: &QueueDefinition) -> Result<String, AmqpError>;

    async fn bind_queue(&self, binding: &QueueBinding) -> Result<(), AmqpError>;

    async fn publish(&self, msg: &OutboundMessage) -> Result<(), AmqpError>;

    /// Registers a consumer without tag, exclusivity, no-local or no-wait.
    async fn subscribe(&self, queue: &str, mode: AckMode) -> Result<DeliveryStream, AmqpError>;

    /// Acknowledges a single delivery (never cumulative).
    async fn ack(&self, delivery_tag: u64) -> Result<(), AmqpError>;

    /// Closes the channel. Failures are reported through logs only.
    async fn close(&self);
}
