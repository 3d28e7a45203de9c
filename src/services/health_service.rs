use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a live census of sessions and subscribed viewers.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.sessions().len(), state.viewer_total())
}
