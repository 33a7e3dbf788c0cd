use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::models::WorkOrderKind;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event after a mutation has been persisted. A closed or
    /// full channel is logged; the mutation it reports stays committed.
    pub async fn publish(&self, event: Event) {
        let description = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = description, "Event publication failed: {}", e);
        }
    }
}

/// Work order lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    WorkOrderCreated {
        id: i32,
        kind: WorkOrderKind,
        display_id: String,
    },
    WorkOrderUpdated(i32),
    WorkOrderCompleted {
        id: i32,
        closed_at: DateTime<Utc>,
    },
    WorkOrderDeleted {
        id: i32,
        display_id: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkOrderCreated { .. } => "work_order_created",
            Event::WorkOrderUpdated(_) => "work_order_updated",
            Event::WorkOrderCompleted { .. } => "work_order_completed",
            Event::WorkOrderDeleted { .. } => "work_order_deleted",
        }
    }

    pub fn work_order_id(&self) -> i32 {
        match self {
            Event::WorkOrderCreated { id, .. }
            | Event::WorkOrderCompleted { id, .. }
            | Event::WorkOrderDeleted { id, .. } => *id,
            Event::WorkOrderUpdated(id) => *id,
        }
    }
}

// Handlers implementing this trait process events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: Event) -> Result<(), String> {
        match &event {
            Event::WorkOrderCreated {
                id,
                kind,
                display_id,
            } => {
                info!("Work order created: id={}, kind={}, display_id={}", id, kind, display_id);
            }
            Event::WorkOrderUpdated(id) => {
                info!("Work order updated: id={}", id);
            }
            Event::WorkOrderCompleted { id, closed_at } => {
                info!("Work order completed: id={}, closed_at={}", id, closed_at);
            }
            Event::WorkOrderDeleted { id, display_id } => {
                info!("Work order deleted: id={}, display_id={}", id, display_id);
            }
        }
        Ok(())
    }
}

// Drains the channel and hands each event to the logging handler.
pub async fn process_events(rx: mpsc::Receiver<Event>) {
    process_events_with_handlers(rx, vec![Arc::new(LoggingEventHandler)]).await
}

/// Drains the channel, fanning each event out to every handler. A failing
/// handler is logged and does not stop the loop.
pub async fn process_events_with_handlers(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        for handler in &handlers {
            if let Err(e) = handler.handle_event(event.clone()).await {
                error!(
                    "Failed to handle {} event: work_order_id={}, error={}",
                    event.name(),
                    event.work_order_id(),
                    e
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}
