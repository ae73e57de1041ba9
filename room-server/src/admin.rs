//! Read-mostly JSON admin surface, grounded on `plugins/http_api.py`. Shares
//! `ServerState` with the core packet handler and the stdin console (4.L) —
//! there is no separate notion of "what a ban is" here, only a thin HTTP
//! facade over the same `SecurityStore`/`RoomsTable` operations.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use protocol::{ChatMessage, ClientBoundPacket};
use serde::{Deserialize, Serialize};

use crate::error::AdminError;
use crate::security::BanType;
use crate::state::ServerState;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{id}", get(get_room))
        .route("/rooms/{id}/broadcast", post(broadcast_room))
        .route("/rooms/{id}/lock", post(lock_room))
        .route("/rooms/{id}/max-players", post(set_max_players))
        .route("/rooms/{id}/disband", post(disband_room))
        .route("/bans", post(add_ban))
        .route("/bans/{type}/{target}", delete(remove_ban))
        .route("/blacklist", get(list_blacklist).post(add_blacklist))
        .with_state(state)
}

#[derive(Serialize)]
struct RoomSummary {
    room_id: String,
    host: Option<i32>,
    player_count: usize,
    locked: bool,
    live: bool,
}

async fn list_rooms(State(state): State<ServerState>) -> Json<Vec<RoomSummary>> {
    let rooms = state.rooms().lock().await;
    Json(
        rooms
            .all()
            .map(|room| RoomSummary {
                room_id: room.id.clone(),
                host: room.host,
                player_count: room.users.len(),
                locked: room.locked,
                live: room.live,
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct RoomDetail {
    room_id: String,
    host: Option<i32>,
    locked: bool,
    live: bool,
    cycle: bool,
    chart: Option<i32>,
    max_users: Option<usize>,
    players: Vec<String>,
}

async fn get_room(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<RoomDetail>, AdminError> {
    let rooms = state.rooms().lock().await;
    let room = rooms.get(&id).ok_or_else(|| AdminError::RoomNotFound(id.clone()))?;
    Ok(Json(RoomDetail {
        room_id: room.id.clone(),
        host: room.host,
        locked: room.locked,
        live: room.live,
        cycle: room.cycle,
        chart: room.chart,
        max_users: room.max_users,
        players: room.user_profiles().into_iter().map(|p| p.username).collect(),
    }))
}

#[derive(Deserialize)]
struct BroadcastRequest {
    text: String,
}

async fn broadcast_room(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<BroadcastRequest>,
) -> Result<(), AdminError> {
    let rooms = state.rooms().lock().await;
    let room = rooms.get(&id).ok_or_else(|| AdminError::RoomNotFound(id.clone()))?;
    for conn in room.connections() {
        conn.send(&ClientBoundPacket::Message(ChatMessage::system(req.text.clone())));
    }
    Ok(())
}

async fn lock_room(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<bool>, AdminError> {
    let mut rooms = state.rooms().lock().await;
    rooms
        .toggle_lock(&id)
        .map(Json)
        .map_err(|_| AdminError::RoomNotFound(id))
}

#[derive(Deserialize)]
struct MaxPlayersRequest {
    max_players: Option<usize>,
}

async fn set_max_players(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<MaxPlayersRequest>,
) -> Result<(), AdminError> {
    let mut rooms = state.rooms().lock().await;
    rooms
        .set_max_users(&id, req.max_players)
        .map_err(|_| AdminError::RoomNotFound(id))
}

async fn disband_room(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(), AdminError> {
    let mut rooms = state.rooms().lock().await;
    let room = rooms.get(&id).ok_or_else(|| AdminError::RoomNotFound(id.clone()))?;
    for conn in room.connections() {
        conn.send(&ClientBoundPacket::Message(ChatMessage::system(
            "this room has been closed by an administrator",
        )));
    }
    rooms.destroy_room(&id);
    Ok(())
}

#[derive(Deserialize)]
struct AddBanRequest {
    #[serde(rename = "type")]
    ban_type: BanType,
    target: String,
    ttl_secs: Option<u64>,
    reason: Option<String>,
}

async fn add_ban(
    State(state): State<ServerState>,
    Json(req): Json<AddBanRequest>,
) -> impl IntoResponse {
    state
        .security()
        .lock()
        .await
        .add_ban(req.ban_type, req.target, req.ttl_secs, req.reason.unwrap_or_default())
        .await;
    axum::http::StatusCode::NO_CONTENT
}

async fn remove_ban(
    State(state): State<ServerState>,
    Path((ban_type, target)): Path<(String, String)>,
) -> Result<(), AdminError> {
    let ban_type = match ban_type.as_str() {
        "id" => BanType::Id,
        "ip" => BanType::Ip,
        other => return Err(AdminError::BadRequest(format!("unknown ban type {other}"))),
    };
    state.security().lock().await.remove_ban(ban_type, &target).await;
    Ok(())
}

async fn list_blacklist(State(state): State<ServerState>) -> Json<std::collections::HashMap<String, Option<f64>>> {
    Json(state.security().lock().await.list_blacklist_ips())
}

#[derive(Deserialize)]
struct AddBlacklistRequest {
    ip: String,
    ttl_secs: Option<u64>,
}

async fn add_blacklist(
    State(state): State<ServerState>,
    Json(req): Json<AddBlacklistRequest>,
) -> impl IntoResponse {
    state.security().lock().await.add_blacklist_ip(req.ip, req.ttl_secs).await;
    axum::http::StatusCode::NO_CONTENT
}
