use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, timer::TimerStatusDto, validation::validate_session_name},
    state::session::DraftSession,
};

/// Payload used to open a new draft session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Display name shown to viewers.
    #[validate(custom(function = validate_session_name))]
    pub name: String,
    /// Default duration for start/reset commands that omit one.
    #[serde(default)]
    #[validate(range(min = 5, max = 600, message = "timer duration must be between 5 and 600 seconds"))]
    pub timer_seconds: Option<u32>,
}

/// Response to a successful session creation.
///
/// The organizer token is returned exactly once, here; it is never included
/// in public summaries.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreatedResponse {
    /// Identifier for all timer and subscription routes.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Secret expected in `x-organizer-token` on command routes.
    pub organizer_token: String,
    /// Default timer duration in seconds.
    pub timer_seconds: u32,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

impl SessionCreatedResponse {
    /// Build the one-time creation response, token included.
    pub fn issued(session: &DraftSession) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            organizer_token: session.organizer_token.clone(),
            timer_seconds: session.default_timer_seconds,
            created_at: format_system_time(session.created_at),
        }
    }
}

/// Public projection of a draft session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Number of currently subscribed viewers.
    pub viewers: usize,
    /// Coarse status of the session timer.
    pub timer_status: TimerStatusDto,
}

impl SessionSummary {
    /// Project a session together with its current timer status.
    pub fn describe(session: &DraftSession, timer_status: TimerStatusDto) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            created_at: format_system_time(session.created_at),
            viewers: session.hub.viewer_count(),
            timer_status,
        }
    }
}
