//! Session lifecycle: creation, lookup, deletion, and the organizer token.

use std::{sync::Arc, time::SystemTime};

use rand::{Rng, distr::Alphanumeric, rng};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session::{CreateSessionRequest, SessionCreatedResponse, SessionSummary},
    error::ServiceError,
    services::authority::{self, AuthorityCommand},
    state::{HUB_CAPACITY, SharedState, TimerHub, session::DraftSession},
};

/// Random characters after the `org_` prefix.
const ORGANIZER_TOKEN_LEN: usize = 28;

/// Open a new draft session and spawn its timer authority.
///
/// The response is the only place the organizer token ever appears.
pub async fn create_session(
    state: &SharedState,
    payload: CreateSessionRequest,
) -> Result<SessionCreatedResponse, ServiceError> {
    payload.validate()?;

    let id = Uuid::new_v4();
    let default_timer_seconds = payload
        .timer_seconds
        .unwrap_or(state.config().default_timer_seconds());
    let hub = Arc::new(TimerHub::new(HUB_CAPACITY));
    let commands = authority::spawn(
        id,
        default_timer_seconds,
        hub.clone(),
        state.clock(),
        state.config().sync_broadcast_interval(),
    );

    let session = DraftSession {
        id,
        name: payload.name,
        organizer_token: generate_organizer_token(),
        default_timer_seconds,
        created_at: SystemTime::now(),
        commands,
        hub,
    };
    let response = SessionCreatedResponse::issued(&session);
    state.sessions().insert(id, session);

    info!(session = %id, default_timer_seconds, "session created");
    Ok(response)
}

/// List every live session with its current timer status.
pub async fn list_sessions(state: &SharedState) -> Result<Vec<SessionSummary>, ServiceError> {
    let handles: Vec<(Uuid, mpsc::Sender<AuthorityCommand>)> = state
        .sessions()
        .iter()
        .map(|entry| (entry.id, entry.commands.clone()))
        .collect();

    let mut summaries = Vec::with_capacity(handles.len());
    for (id, commands) in handles {
        // A session deleted mid-iteration simply drops out of the listing.
        let Ok(snapshot) = authority::query_snapshot(&commands).await else {
            continue;
        };
        if let Some(session) = state.sessions().get(&id) {
            summaries.push(SessionSummary::describe(&session, snapshot.status));
        }
    }
    Ok(summaries)
}

/// Describe a single session.
pub async fn get_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let commands = lookup_commands(state, session_id)?;
    let snapshot = authority::query_snapshot(&commands).await?;
    let session = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(SessionSummary::describe(&session, snapshot.status))
}

/// Tear down a session: unregister it, then stop its authority task.
///
/// Viewers see the push channel close and disconnect on their own.
pub async fn delete_session(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
) -> Result<(), ServiceError> {
    let commands = {
        let session = state
            .sessions()
            .get(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        if !session.token_matches(token) {
            return Err(ServiceError::Unauthorized(
                "organizer token does not match this session".into(),
            ));
        }
        session.commands.clone()
    };

    // Unregister first so no new viewer subscribes to a dying session.
    state.sessions().remove(&session_id);
    let _ = commands.send(AuthorityCommand::Shutdown).await;

    info!(session = %session_id, "session deleted");
    Ok(())
}

fn lookup_commands(
    state: &SharedState,
    session_id: Uuid,
) -> Result<mpsc::Sender<AuthorityCommand>, ServiceError> {
    state
        .sessions()
        .get(&session_id)
        .map(|session| session.commands.clone())
        .ok_or_else(|| session_not_found(session_id))
}

fn session_not_found(session_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("session {session_id} not found"))
}

/// Session-scoped organizer secret, issued once at creation.
fn generate_organizer_token() -> String {
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(ORGANIZER_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("org_{suffix}")
}
