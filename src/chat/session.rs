//! Per-connection client session state.
//!
//! A session bridges one transport connection to a room: broadcasters enqueue
//! accepted messages onto its bounded outbound queue, and the connection task
//! drains the queue to the wire.

use std::sync::Arc;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::Message;

/// Capacity of a session's outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outcome of delivering one message to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    /// Message enqueued.
    Delivered,
    /// Queue was full; the session has been disconnected.
    Disconnected,
    /// Session was already closed.
    Closed,
}

/// The live state of one connected participant.
pub struct ClientSession {
    /// Unique session ID.
    id: String,
    /// Display name.
    name: String,
    /// Room this session belongs to.
    room_id: String,
    /// Whether this session represents the automated assistant.
    is_assistant: bool,
    /// Join timestamp.
    joined_at: DateTime<Utc>,
    /// Sender half of the outbound queue. `close` takes it, so exactly one
    /// shutdown path ever drops the sender; the lock is never held across an
    /// await.
    outbound: Mutex<Option<mpsc::Sender<Arc<Message>>>>,
}

impl ClientSession {
    /// Create a new session and the receiver half of its outbound queue.
    ///
    /// The caller (the connection task) owns the receiver and drains it to the
    /// transport.
    pub fn new(
        name: impl Into<String>,
        room_id: impl Into<String>,
        is_assistant: bool,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            room_id: room_id.into(),
            is_assistant,
            joined_at: Utc::now(),
            outbound: Mutex::new(Some(tx)),
        });
        (session, rx)
    }

    /// Get the session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the room ID.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Whether this session is the automated assistant.
    pub fn is_assistant(&self) -> bool {
        self.is_assistant
    }

    /// Get the join timestamp.
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Deliver a message without blocking.
    ///
    /// A full queue means the receiver has stalled; the session is
    /// disconnected outright rather than blocking the broadcaster or silently
    /// dropping one message.
    pub fn deliver(&self, message: Arc<Message>) -> DeliveryResult {
        let mut outbound = self.outbound.lock().unwrap();
        let Some(tx) = outbound.as_ref() else {
            return DeliveryResult::Closed;
        };
        match tx.try_send(message) {
            Ok(()) => DeliveryResult::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Dropping the only sender closes the queue; the connection
                // task observes the closed queue and tears itself down.
                *outbound = None;
                DeliveryResult::Disconnected
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *outbound = None;
                DeliveryResult::Closed
            }
        }
    }

    /// Close the outbound queue.
    ///
    /// Terminal and idempotent: the first call drops the sender, every later
    /// call is a no-op. Returns true if this call performed the close.
    pub fn close(&self) -> bool {
        self.outbound.lock().unwrap().take().is_some()
    }

    /// Whether the outbound queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.outbound.lock().unwrap().is_none()
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("room_id", &self.room_id)
            .field("is_assistant", &self.is_assistant)
            .field("closed", &self.is_closed())
            .finish()
    }
}
