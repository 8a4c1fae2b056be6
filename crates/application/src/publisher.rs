//! Outbound notification of sale events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::SaleEvent;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised while delivering a sale event.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Event sink unavailable: {0}")]
    Unavailable(String),
}

/// Sink for sale notifications.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivers one event.
    async fn publish(&self, event: &SaleEvent) -> Result<(), PublishError>;
}

/// Publisher that writes each event as a structured log record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: &SaleEvent) -> Result<(), PublishError> {
        let sale = event.sale();
        tracing::info!(
            event_type = event.event_type(),
            sale_id = %sale.id(),
            sale_number = sale.sale_number(),
            total_amount = %sale.total_amount(),
            occurred_at = %event.occurred_at(),
            "sale event"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    events: RwLock<Vec<SaleEvent>>,
    fail_on_publish: AtomicBool,
}

/// Publisher that records events in memory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<InMemoryPublisherState>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to reject every event.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns every recorded event in publish order.
    pub async fn events(&self) -> Vec<SaleEvent> {
        self.state.events.read().await.clone()
    }

    /// Returns the type names of the recorded events.
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.state
            .events
            .read()
            .await
            .iter()
            .map(SaleEvent::event_type)
            .collect()
    }

    pub async fn clear(&self) {
        self.state.events.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &SaleEvent) -> Result<(), PublishError> {
        if self.state.fail_on_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable(
                "configured to fail".to_string(),
            ));
        }
        self.state.events.write().await.push(event.clone());
        Ok(())
    }
}
