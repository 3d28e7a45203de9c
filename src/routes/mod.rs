use axum::{Router, http::HeaderMap};

use crate::{error::AppError, state::SharedState};

pub mod docs;
pub mod health;
pub mod sessions;
pub mod timer;
pub mod websocket;

const ORGANIZER_TOKEN_HEADER: &str = "x-organizer-token";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sessions::router())
        .merge(timer::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}

/// Pull the organizer token out of the request headers. Which session it
/// belongs to is checked further down, in the service layer.
pub(crate) fn organizer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(ORGANIZER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing organizer token header `X-Organizer-Token`".into())
        })
}
