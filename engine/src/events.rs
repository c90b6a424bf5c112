//! Movement lifecycle events
//!
//! The engine publishes events through an injected [`EventPublisher`] so it
//! carries no compile-time dependency on any specific messaging runtime.
//! Consumers (notifications, audit log) subscribe outside the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use shared::Movement;

/// Events emitted by the movement workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MovementEvent {
    MovementRequested {
        movement: Movement,
        /// Raw request payload, kept for audit subscribers
        raw_data: Value,
    },
    MovementApproved {
        movement: Movement,
        approver_id: Uuid,
        notes: Option<String>,
    },
    MovementRejected {
        movement: Movement,
        approver_id: Uuid,
        notes: Option<String>,
    },
    MovementCancelled {
        movement: Movement,
        user_id: Uuid,
    },
    MovementExecuted {
        movement: Movement,
        user_id: Uuid,
    },
}

impl MovementEvent {
    pub fn movement_id(&self) -> Uuid {
        match self {
            MovementEvent::MovementRequested { movement, .. }
            | MovementEvent::MovementApproved { movement, .. }
            | MovementEvent::MovementRejected { movement, .. }
            | MovementEvent::MovementCancelled { movement, .. }
            | MovementEvent::MovementExecuted { movement, .. } => movement.id,
        }
    }
}

/// Injected publisher interface for movement lifecycle events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: MovementEvent) -> Result<(), String>;
}

/// Channel-backed publisher; the receiving end is consumed by whatever
/// subscriber wiring the host process sets up
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::Sender<MovementEvent>,
}

impl ChannelEventPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<MovementEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: MovementEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to publish event: {}", e))
    }
}

/// Recording publisher for tests: stores every published event in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<MovementEvent>>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<MovementEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: MovementEvent) -> Result<(), String> {
        self.events.lock().expect("event log poisoned").push(event);
        Ok(())
    }
}
