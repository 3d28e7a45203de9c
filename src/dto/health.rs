use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status (always "ok"; the service has no external backends).
    pub status: String,
    /// Number of live draft sessions.
    pub sessions: usize,
    /// Number of currently subscribed viewers across all sessions.
    pub viewers: usize,
}

impl HealthResponse {
    /// Create a health response with the current session and viewer counts.
    pub fn ok(sessions: usize, viewers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            sessions,
            viewers,
        }
    }
}
