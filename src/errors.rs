// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the RabbitMQ Bus
//!
//! `AmqpError` covers every way a bus operation can fail. Failures fall into two
//! groups: setup failures (connection, channel, exchange, queue, binding or
//! subscription) and publish failures (the broker refused the message). Neither
//! is retried; the error is returned to the caller who decides what to do next.

use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange: exchange, queue, routing key
    #[error("failure to bind exchange `{0}` to queue `{1}` with key `{2}`")]
    BindingExchangeToQueueError(String, String, String),

    /// Error registering a consumer on a queue
    #[error("failure to declare consumer `{0}`")]
    BindingConsumerError(String),

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,
}

impl AmqpError {
    /// True for failures of the resource setup steps shared by all operations.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            AmqpError::ConnectionError
                | AmqpError::ChannelError
                | AmqpError::DeclareExchangeError(_)
                | AmqpError::DeclareQueueError(_)
                | AmqpError::BindingExchangeToQueueError(..)
                | AmqpError::BindingConsumerError(_)
        )
    }

    /// True when the broker rejected a message being sent.
    pub fn is_publish_failure(&self) -> bool {
        matches!(self, AmqpError::PublishingError)
    }
}
