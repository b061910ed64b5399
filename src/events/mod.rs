use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::errors::WriteStep;
use crate::models::{Actor, Location, SessionId};

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

    /// Sends an event; a closed channel is logged, never surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Things that happened to counts and sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CountAccepted {
        barcode: String,
        location: Location,
        quantity: i32,
        session_id: SessionId,
        actor: Actor,
        conflict_overridden: bool,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session_id: SessionId,
        resumed: bool,
    },
    SessionReset {
        session_id: SessionId,
        cleared_barcodes: usize,
        history_deleted: u64,
    },
    SkuRemoved {
        session_id: SessionId,
        barcode: String,
    },
    PartialWriteDetected {
        barcode: String,
        location: Location,
        applied: Vec<WriteStep>,
        failed: WriteStep,
    },
}

/// Drains the event channel, logging each event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CountAccepted {
                barcode,
                location,
                quantity,
                session_id,
                actor,
                conflict_overridden,
                ..
            } => {
                info!(
                    %barcode, %location, quantity, %session_id, %actor, conflict_overridden,
                    "Count accepted"
                );
            }
            Event::SessionStarted { session_id, resumed } => {
                info!(%session_id, resumed, "Count session started");
            }
            Event::SessionReset {
                session_id,
                cleared_barcodes,
                history_deleted,
            } => {
                info!(%session_id, cleared_barcodes, history_deleted, "Count session reset");
            }
            Event::SkuRemoved {
                session_id,
                barcode,
            } => {
                info!(%session_id, %barcode, "SKU removed from session");
            }
            Event::PartialWriteDetected {
                barcode,
                location,
                applied,
                failed,
            } => {
                error!(
                    partial_write = true,
                    %barcode, %location, ?applied, %failed,
                    "Count left partially written; manual review needed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}
