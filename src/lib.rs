// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod consumer;
mod otel;

pub mod blocking;
pub mod broker;
pub mod bus;
pub mod channel;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod publisher;
pub mod queue;
pub mod topology;

pub use blocking::BlockingRabbitMQBus;
pub use bus::RabbitMQBus;
pub use config::Config;
pub use errors::AmqpError;

#[cfg(feature = "mocks")]
pub use broker::{MockBroker, MockBrokerChannel, MockBrokerConnection};
