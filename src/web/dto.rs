//! Request and response DTOs for the web API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{Message, Room};

/// Request body for creating a room.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Room name.
    pub name: String,
}

/// Summary of one room.
#[derive(Debug, Serialize)]
pub struct RoomSummary {
    /// Room ID.
    pub id: String,
    /// Room name.
    pub name: String,
    /// Number of members.
    pub client_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RoomSummary {
    /// Build a summary from a room.
    pub async fn from_room(room: &Room) -> Self {
        Self {
            id: room.id().to_string(),
            name: room.name().to_string(),
            client_count: room.client_count().await,
            created_at: room.created_at(),
        }
    }
}

/// Room list response.
#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Rooms.
    pub rooms: Vec<RoomSummary>,
}

/// Room detail response, including recent messages.
#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Room summary.
    pub room: RoomSummary,
    /// Recent messages in acceptance order.
    pub messages: Vec<Message>,
}

/// Response for a created room.
#[derive(Debug, Serialize)]
pub struct RoomCreatedResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The new room.
    pub room: RoomSummary,
}

/// Response for a deleted room.
#[derive(Debug, Serialize)]
pub struct RoomDeletedResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The removed room's ID.
    pub id: String,
}
