//! Chat room: bounded membership and an append-only, totally ordered message log.
//!
//! Membership and log live behind one `RwLock`; admit/remove/post take the
//! exclusive form, read-only queries the shared form. Broadcast runs inside
//! the same critical section as the log append, so every accepted message is
//! delivered to exactly the members present at acceptance. Delivery is a
//! non-blocking enqueue, keeping the exclusive section's duration independent
//! of receiver liveness.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::message::Message;
use super::session::{ClientSession, DeliveryResult};

/// Mutable room state, guarded by the room's lock.
struct RoomState {
    /// Members indexed by session ID.
    members: HashMap<String, Arc<ClientSession>>,
    /// Append-only message log in acceptance order.
    log: Vec<Arc<Message>>,
}

/// An isolated chat channel.
pub struct Room {
    /// Room ID.
    id: String,
    /// Room name.
    name: String,
    /// Maximum number of members.
    max_clients: usize,
    /// Creation timestamp.
    created_at: DateTime<Utc>,
    /// Membership and log.
    state: RwLock<RoomState>,
}

impl Room {
    /// Create a new room.
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_clients: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_clients,
            created_at: Utc::now(),
            state: RwLock::new(RoomState {
                members: HashMap::new(),
                log: Vec::new(),
            }),
        }
    }

    /// Get the room ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the room name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the maximum number of members.
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Get the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the number of members.
    pub async fn client_count(&self) -> usize {
        self.state.read().await.members.len()
    }

    /// Check whether a session is a member.
    pub async fn is_member(&self, session_id: &str) -> bool {
        self.state.read().await.members.contains_key(session_id)
    }

    /// Get a snapshot of current member sessions.
    pub async fn members(&self) -> Vec<Arc<ClientSession>> {
        self.state.read().await.members.values().cloned().collect()
    }

    /// Get the number of messages in the log.
    pub async fn message_count(&self) -> usize {
        self.state.read().await.log.len()
    }

    /// Admit a session into the room.
    ///
    /// Returns false if the room is full; the caller must discard the session.
    /// If an existing member shares the display name, that member is evicted
    /// first (removed, closed, Leave announced), then the new member is added
    /// and its Join is announced to everyone present after admission. A
    /// reconnecting name therefore never observes two simultaneous sessions.
    pub async fn admit(&self, session: Arc<ClientSession>) -> bool {
        let mut state = self.state.write().await;

        if state.members.len() >= self.max_clients {
            debug!(room = %self.id, name = %session.name(), "room full, rejecting");
            return false;
        }

        let colliding = state
            .members
            .iter()
            .find(|(_, member)| member.name() == session.name())
            .map(|(id, _)| id.clone());
        if let Some(prev_id) = colliding {
            if let Some(prev) = state.members.remove(&prev_id) {
                prev.close();
                debug!(room = %self.id, name = %prev.name(), "evicted previous session with same name");
                let leave = Arc::new(Message::leave(prev.name(), &self.id));
                Self::append_and_broadcast(&self.id, &mut state, leave);
            }
        }

        state
            .members
            .insert(session.id().to_string(), session.clone());
        let join = Arc::new(Message::join(session.name(), &self.id));
        Self::append_and_broadcast(&self.id, &mut state, join);
        true
    }

    /// Remove a session from the room.
    ///
    /// No-op if the session is not a member. Closes the session and announces
    /// its Leave to the remaining members.
    pub async fn remove(&self, session_id: &str) {
        let mut state = self.state.write().await;

        let Some(session) = state.members.remove(session_id) else {
            return;
        };
        session.close();

        let leave = Arc::new(Message::leave(session.name(), &self.id));
        Self::append_and_broadcast(&self.id, &mut state, leave);
    }

    /// Accept a message: append it to the log and broadcast it to every
    /// current member.
    pub async fn post(&self, message: Message) {
        let mut state = self.state.write().await;
        Self::append_and_broadcast(&self.id, &mut state, Arc::new(message));
    }

    /// Return the last `limit` messages in acceptance order (all, if the log
    /// is shorter). Used to replay history to a newly admitted client outside
    /// the broadcast path.
    pub async fn recent_messages(&self, limit: usize) -> Vec<Arc<Message>> {
        let state = self.state.read().await;
        let start = state.log.len().saturating_sub(limit);
        state.log[start..].to_vec()
    }

    /// Force-close every member session and clear the membership.
    ///
    /// Used when the room itself is being removed; no Leave messages are
    /// posted since nobody is left to observe them.
    pub async fn close_all(&self) {
        let mut state = self.state.write().await;
        for (_, session) in state.members.drain() {
            session.close();
        }
    }

    /// Append under the exclusive lock and deliver to the membership snapshot
    /// of the same critical section. Delivery is try-enqueue only, never a
    /// blocking send.
    fn append_and_broadcast(room_id: &str, state: &mut RoomState, message: Arc<Message>) {
        state.log.push(message.clone());
        for member in state.members.values() {
            match member.deliver(message.clone()) {
                DeliveryResult::Delivered => {}
                DeliveryResult::Disconnected => {
                    // Slow receiver: its queue was closed, its connection task
                    // will observe that and call `remove` for the Leave.
                    warn!(
                        room = %room_id,
                        name = %member.name(),
                        "outbound queue full, disconnecting slow receiver"
                    );
                }
                DeliveryResult::Closed => {
                    debug!(room = %room_id, name = %member.name(), "skipping closed session");
                }
            }
        }
    }
}
