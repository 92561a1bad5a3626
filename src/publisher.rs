// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Publisher
//!
//! Declares the target exchange and sends a single plain-text message to it.

use crate::{
    broker::{BrokerChannel, Headers, OutboundMessage},
    errors::AmqpError,
    exchange::ExchangeDefinition,
    otel,
    topology::install_exchange,
};
use tracing::debug;
use uuid::Uuid;

/// Content type attached to every published message.
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Builds the message published under `routing_key` on `exchange`.
pub fn text_message(exchange: &str, routing_key: &str, msg: &str) -> OutboundMessage {
    let mut headers = Headers::new();
    otel::inject_current(&mut headers);

    OutboundMessage {
        exchange: exchange.to_owned(),
        routing_key: routing_key.to_owned(),
        content_type: TEXT_CONTENT_TYPE.to_owned(),
        message_id: Uuid::new_v4().to_string(),
        headers,
        payload: msg.as_bytes().to_vec(),
    }
}

pub(crate) async fn publish(
    channel: &dyn BrokerChannel,
    exchange: &str,
    routing_key: &str,
    msg: &str,
) -> Result<(), AmqpError> {
    install_exchange(channel, &ExchangeDefinition::direct(exchange)).await?;

    let message = text_message(exchange, routing_key, msg);
    channel.publish(&message).await?;

    debug!(
        exchange,
        routing_key,
        message_id = message.message_id.as_str(),
        "message published"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBrokerChannel;
    use mockall::Sequence;

    #[test]
    fn builds_plain_text_message() {
        let msg = text_message("orders", "created", "order-42");

        assert_eq!(msg.exchange, "orders");
        assert_eq!(msg.routing_key, "created");
        assert_eq!(msg.content_type, "text/plain");
        assert_eq!(msg.payload, b"order-42");
        assert!(Uuid::parse_str(&msg.message_id).is_ok());
    }

    #[test]
    fn message_ids_are_unique() {
        let a = text_message("orders", "created", "x");
        let b = text_message("orders", "created", "x");

        assert_ne!(a.message_id, b.message_id);
    }

    #[tokio::test]
    async fn declares_exchange_before_publishing() {
        let mut seq = Sequence::new();
        let mut channel = MockBrokerChannel::new();

        channel
            .expect_declare_exchange()
            .withf(|def| def.name() == "orders")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_publish()
            .withf(|msg| {
                msg.exchange == "orders"
                    && msg.routing_key == "created"
                    && msg.payload == b"order-42"
                    && msg.content_type == TEXT_CONTENT_TYPE
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        publish(&channel, "orders", "created", "order-42")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn exchange_failure_sends_nothing() {
        let mut channel = MockBrokerChannel::new();

        channel
            .expect_declare_exchange()
            .returning(|def| Err(AmqpError::DeclareExchangeError(def.name().to_owned())));
        channel.expect_publish().never();

        let err = publish(&channel, "orders", "created", "order-42")
            .await
            .unwrap_err();

        assert_eq!(err, AmqpError::DeclareExchangeError("orders".into()));
    }

    #[tokio::test]
    async fn broker_refusal_is_a_publish_failure() {
        let mut channel = MockBrokerChannel::new();

        channel.expect_declare_exchange().returning(|_| Ok(()));
        channel
            .expect_publish()
            .returning(|_| Err(AmqpError::PublishingError));

        let err = publish(&channel, "orders", "created", "order-42")
            .await
            .unwrap_err();

        assert!(err.is_publish_failure());
    }
}
