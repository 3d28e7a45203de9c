use std::{sync::Arc, time::SystemTime};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{services::authority::AuthorityCommand, state::hub::TimerHub};

/// Runtime record of one live draft session.
///
/// The actual timer state lives inside the session's authority task; this
/// struct only holds the handles needed to command it and to subscribe
/// viewers, plus the immutable session metadata.
pub struct DraftSession {
    /// Session identifier used in every route.
    pub id: Uuid,
    /// Display name shown to viewers.
    pub name: String,
    /// Secret required on organizer command routes. Returned once at
    /// creation, never in public summaries.
    pub organizer_token: String,
    /// Timer duration applied when a start/reset omits one.
    pub default_timer_seconds: u32,
    /// Creation time for public summaries.
    pub created_at: SystemTime,
    /// Command channel into the authority task.
    pub commands: mpsc::Sender<AuthorityCommand>,
    /// Push fan-out shared with the authority task.
    pub hub: Arc<TimerHub>,
}

impl DraftSession {
    /// Whether `provided` is this session's organizer token.
    pub fn token_matches(&self, provided: &str) -> bool {
        self.organizer_token == provided
    }
}
