// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consumer Topology
//!
//! Declares the broker resources a subscription needs, in order: the exchange,
//! a server-named queue, then one binding per routing key. The first failing
//! step aborts the install. Bindings follow the caller's key order and repeated
//! keys are bound again; the broker treats a repeated binding as a no-op.

use crate::{
    broker::BrokerChannel,
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
};
use tracing::debug;

pub struct ConsumerTopology<'tp> {
    exchange: ExchangeDefinition,
    queue: QueueDefinition,
    routing_keys: &'tp [&'tp str],
}

impl<'tp> ConsumerTopology<'tp> {
    /// Topology of a direct exchange feeding an anonymous queue.
    pub fn new(exchange: &str, routing_keys: &'tp [&'tp str]) -> ConsumerTopology<'tp> {
        ConsumerTopology {
            exchange: ExchangeDefinition::direct(exchange),
            queue: QueueDefinition::anonymous(),
            routing_keys,
        }
    }

    /// Installs the topology and returns the name the broker gave the queue.
    pub async fn install(&self, channel: &dyn BrokerChannel) -> Result<String, AmqpError> {
        install_exchange(channel, &self.exchange).await?;

        debug!("creating queue...");
        let queue = channel.declare_queue(&self.queue).await?;
        debug!("queue: {} was created", queue);

        for key in self.routing_keys {
            debug!(
                "binding queue: {} to the exchange: {} with the key: {}",
                queue, self.exchange.name, key
            );

            let binding = QueueBinding::new(&queue)
                .exchange(&self.exchange.name)
                .routing_key(key);
            channel.bind_queue(&binding).await?;
        }

        debug!("queue was bounded");

        Ok(queue)
    }
}

/// Declares `def` on the channel. Shared with the publish path.
pub(crate) async fn install_exchange(
    channel: &dyn BrokerChannel,
    def: &ExchangeDefinition,
) -> Result<(), AmqpError> {
    debug!("creating exchange: {}", def.name);
    channel.declare_exchange(def).await?;
    debug!("exchange: {} was created", def.name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBrokerChannel;
    use mockall::{predicate::eq, Sequence};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn declares_then_binds_every_key_in_order() {
        let mut seq = Sequence::new();
        let mut channel = MockBrokerChannel::new();

        channel
            .expect_declare_exchange()
            .withf(|def| def.name() == "orders")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_declare_queue()
            .with(eq(QueueDefinition::anonymous()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("amq.gen-1".to_owned()));
        let bound = Arc::new(Mutex::new(vec![]));
        let recorder = bound.clone();
        channel
            .expect_bind_queue()
            .withf(|b| b.queue_name() == "amq.gen-1" && b.exchange_name() == "orders")
            .times(3)
            .returning(move |b| {
                recorder.lock().unwrap().push(b.key().to_owned());
                Ok(())
            });

        let keys = ["created", "paid", "created"];
        let queue = ConsumerTopology::new("orders", &keys)
            .install(&channel)
            .await
            .unwrap();

        assert_eq!(queue, "amq.gen-1");
        assert_eq!(*bound.lock().unwrap(), vec!["created", "paid", "created"]);
    }

    #[tokio::test]
    async fn stops_at_first_failed_binding() {
        let mut channel = MockBrokerChannel::new();

        channel.expect_declare_exchange().returning(|_| Ok(()));
        channel
            .expect_declare_queue()
            .returning(|_| Ok("amq.gen-2".to_owned()));
        channel
            .expect_bind_queue()
            .times(1)
            .returning(|b| {
                Err(AmqpError::BindingExchangeToQueueError(
                    b.exchange_name().to_owned(),
                    b.queue_name().to_owned(),
                    b.key().to_owned(),
                ))
            });

        let keys = ["a", "b"];
        let err = ConsumerTopology::new("orders", &keys)
            .install(&channel)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AmqpError::BindingExchangeToQueueError("orders".into(), "amq.gen-2".into(), "a".into())
        );
    }

    #[tokio::test]
    async fn exchange_failure_skips_queue() {
        let mut channel = MockBrokerChannel::new();

        channel
            .expect_declare_exchange()
            .returning(|def| Err(AmqpError::DeclareExchangeError(def.name().to_owned())));
        channel.expect_declare_queue().never();
        channel.expect_bind_queue().never();

        let keys = ["a"];
        let err = ConsumerTopology::new("orders", &keys)
            .install(&channel)
            .await
            .unwrap_err();

        assert_eq!(err, AmqpError::DeclareExchangeError("orders".into()));
    }
}
