// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! Only direct exchanges are modeled: a message reaches every queue whose binding
//! key equals the message routing key. Exchanges are declared transient
//! (not durable), are never auto-deleted and are never internal, so declaring
//! the same name twice is a no-op on the broker.

use lapin::{options::ExchangeDeclareOptions, types::FieldTable, ExchangeKind};

/// Definition of a RabbitMQ direct exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) delete: bool,
    pub(crate) internal: bool,
}

impl ExchangeDefinition {
    /// Creates a transient direct exchange definition with the given name.
    pub fn direct(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            durable: false,
            delete: false,
            internal: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> ExchangeKind {
        ExchangeKind::Direct
    }

    pub(crate) fn declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: self.delete,
            internal: self.internal,
            nowait: false,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        FieldTable::default()
    }
}
