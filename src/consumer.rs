// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Consumer
//!
//! Drains a subscription until the broker ends it, handing each message body to
//! the caller's callback. Two acknowledgement disciplines are supported:
//!
//! - automatic: the broker acknowledged the message on delivery, the callback
//!   outcome has no effect on it;
//! - manual: the delivery is acknowledged (alone, never cumulatively) only when
//!   the callback returns `true`. A `false` leaves it unacknowledged, with no
//!   nack and no requeue, so redelivery is up to the broker once the channel
//!   closes.

use crate::{
    broker::{BrokerChannel, DeliveryStream},
    otel,
};
use futures_util::StreamExt;
use opentelemetry::{
    global,
    trace::{Span, Status},
};
use std::borrow::Cow;
use tracing::{debug, error};

pub(crate) async fn drain_auto<F>(mut stream: DeliveryStream, mut callback: F)
where
    F: FnMut(&[u8]),
{
    let tracer = global::tracer(otel::TRACER_NAME);

    while let Some(result) = stream.next().await {
        match result {
            Ok(msg) => {
                debug!(routing_key = msg.routing_key.as_str(), "received message");
                let _span = otel::new_span(&msg.headers, &tracer, &msg.routing_key);
                callback(&msg.body);
            }
            Err(err) => error!(error = err.to_string(), "errors consume msg"),
        }
    }
}

pub(crate) async fn drain_manual<F>(
    channel: &dyn BrokerChannel,
    mut stream: DeliveryStream,
    mut callback: F,
) where
    F: FnMut(&[u8]) -> bool,
{
    let tracer = global::tracer(otel::TRACER_NAME);

    while let Some(result) = stream.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(err) => {
                error!(error = err.to_string(), "errors consume msg");
                continue;
            }
        };

        debug!(
            routing_key = msg.routing_key.as_str(),
            delivery_tag = msg.delivery_tag,
            "received message"
        );
        let mut span = otel::new_span(&msg.headers, &tracer, &msg.routing_key);

        if !callback(&msg.body) {
            debug!(
                delivery_tag = msg.delivery_tag,
                "message not processed, leaving it unacknowledged"
            );
            continue;
        }

        match channel.ack(msg.delivery_tag).await {
            Err(err) => {
                error!(error = err.to_string(), "error whiling ack msg");
                span.record_error(&err);
                span.set_status(Status::Error {
                    description: Cow::from("error to ack msg"),
                });
            }
            _ => span.set_status(Status::Ok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        broker::{InboundMessage, MockBrokerChannel},
        errors::AmqpError,
    };
    use futures_util::stream;
    use mockall::predicate::eq;

    fn delivery(tag: u64, body: &str) -> Result<InboundMessage, AmqpError> {
        Ok(InboundMessage {
            body: body.as_bytes().to_vec(),
            delivery_tag: tag,
            routing_key: "created".to_owned(),
            ..Default::default()
        })
    }

    fn stream_of(items: Vec<Result<InboundMessage, AmqpError>>) -> DeliveryStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn auto_invokes_callback_in_delivery_order() {
        let mut seen = vec![];

        drain_auto(
            stream_of(vec![delivery(1, "a"), delivery(2, "b"), delivery(3, "c")]),
            |body| seen.push(String::from_utf8(body.to_vec()).unwrap()),
        )
        .await;

        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn auto_skips_stream_errors() {
        let mut count = 0;

        drain_auto(
            stream_of(vec![
                delivery(1, "a"),
                Err(AmqpError::InternalError),
                delivery(2, "b"),
            ]),
            |_| count += 1,
        )
        .await;

        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn manual_acks_only_accepted_deliveries() {
        let mut channel = MockBrokerChannel::new();
        channel
            .expect_ack()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));
        channel
            .expect_ack()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok(()));

        drain_manual(
            &channel,
            stream_of(vec![delivery(1, "ok"), delivery(2, "nope"), delivery(3, "ok")]),
            |body| body == b"ok",
        )
        .await;
    }

    #[tokio::test]
    async fn manual_rejecting_callback_never_acks() {
        let mut channel = MockBrokerChannel::new();
        channel.expect_ack().never();

        let mut calls = 0;
        drain_manual(
            &channel,
            stream_of(vec![delivery(7, "x"), delivery(8, "y")]),
            |_| {
                calls += 1;
                false
            },
        )
        .await;

        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn manual_keeps_draining_after_ack_failure() {
        let mut channel = MockBrokerChannel::new();
        channel
            .expect_ack()
            .times(2)
            .returning(|tag| {
                if tag == 1 {
                    Err(AmqpError::AckMessageError)
                } else {
                    Ok(())
                }
            });

        let mut seen = vec![];
        drain_manual(
            &channel,
            stream_of(vec![delivery(1, "a"), delivery(2, "b")]),
            |body| {
                seen.push(body.to_vec());
                true
            },
        )
        .await;

        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
