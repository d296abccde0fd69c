//! Outbound domain events.
//!
//! Publishing never fails a request: errors are logged and the event is dropped.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Used when no broker is configured.
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: DomainEvent) {
        debug!(subject = event.subject(), "event dropped, no broker configured");
    }
}

pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(subject, error = %e, "could not encode event");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.to_string(), payload.into()).await {
            warn!(subject, error = %e, "could not publish event");
        }
    }
}

/// Keeps published events in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: DomainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
