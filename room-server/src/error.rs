//! Domain error enums. Every fallible room/auth/admin operation returns one
//! of these instead of the original's `{"status": "N"}` dictionaries, so
//! callers match on a variant rather than compare strings.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Outcome of a room-table mutation. Checked by variant, never by a string
/// status code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("room already exists")]
    RoomExists,
    #[error("room does not exist")]
    RoomNotFound,
    #[error("user already in room")]
    UserExists,
    #[error("user not in room")]
    UserNotFound,
    #[error("caller is not the room host")]
    NotHost,
    #[error("caller is not in any room")]
    NotInRoom,
    #[error("room is not in the select-chart state")]
    NotSelectingChart,
}

/// Raised by the identity client after exhausting retries, or when a caller
/// is rejected before reaching the identity service (ban/blacklist).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity service returned status {0}")]
    BadStatus(StatusCode),
    #[error("caller is banned: {0}")]
    Banned(String),
}

/// Errors surfaced by the admin HTTP surface. Never affects core state.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
