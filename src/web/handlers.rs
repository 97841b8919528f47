//! REST handlers for room management and stats.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::chat::{Hub, HubStats};

use super::dto::{
    CreateRoomRequest, RoomCreatedResponse, RoomDeletedResponse, RoomDetailResponse,
    RoomListResponse, RoomSummary,
};
use super::error::ApiError;

/// Number of recent messages included in a room detail response.
const DETAIL_MESSAGE_LIMIT: usize = 50;

/// Shared state for the web surface.
pub struct AppState {
    /// The chat hub.
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

/// GET /api/rooms - List all rooms.
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = state.hub.list_rooms().await;

    let mut summaries = Vec::with_capacity(rooms.len());
    for room in &rooms {
        summaries.push(RoomSummary::from_room(room).await);
    }
    // Sort by ID for consistent ordering
    summaries.sort_by(|a, b| a.id.cmp(&b.id));

    Json(RoomListResponse {
        success: true,
        rooms: summaries,
    })
}

/// POST /api/rooms - Create a room.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomCreatedResponse>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Room name is required"));
    }

    let room = state.hub.create_room(name).await;

    Ok(Json(RoomCreatedResponse {
        success: true,
        room: RoomSummary::from_room(&room).await,
    }))
}

/// GET /api/rooms/:id - Room detail with recent messages.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailResponse>, ApiError> {
    let room = state
        .hub
        .get_room(&room_id)
        .await
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    let messages = room
        .recent_messages(DETAIL_MESSAGE_LIMIT)
        .await
        .iter()
        .map(|m| (**m).clone())
        .collect();

    Ok(Json(RoomDetailResponse {
        success: true,
        room: RoomSummary::from_room(&room).await,
        messages,
    }))
}

/// DELETE /api/rooms/:id - Remove a room, force-closing its members.
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDeletedResponse>, ApiError> {
    if !state.hub.remove_room(&room_id).await {
        return Err(ApiError::not_found("Room not found"));
    }

    Ok(Json(RoomDeletedResponse {
        success: true,
        id: room_id,
    }))
}

/// GET /api/stats - Aggregate hub statistics.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<HubStats> {
    Json(state.hub.stats().await)
}
