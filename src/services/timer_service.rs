//! Organizer-facing timer operations, each routed through the owning
//! session's authority task.

use tokio::sync::mpsc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::timer::{TimerDurationRequest, TimerSnapshot},
    error::ServiceError,
    services::authority::{self, AuthorityCommand, TimerCommand},
    state::SharedState,
};

/// Begin a countdown; a running one restarts from the full duration.
pub async fn start_timer(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
    payload: TimerDurationRequest,
) -> Result<TimerSnapshot, ServiceError> {
    payload.validate()?;
    let (commands, default_seconds) = authorized_commands(state, session_id, token)?;
    let seconds = payload.seconds.unwrap_or(default_seconds);
    authority::apply_command(&commands, TimerCommand::Start { seconds }).await
}

/// Freeze the running countdown.
pub async fn pause_timer(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
) -> Result<TimerSnapshot, ServiceError> {
    let (commands, _) = authorized_commands(state, session_id, token)?;
    authority::apply_command(&commands, TimerCommand::Pause).await
}

/// Continue a paused countdown where it left off.
pub async fn resume_timer(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
) -> Result<TimerSnapshot, ServiceError> {
    let (commands, _) = authorized_commands(state, session_id, token)?;
    authority::apply_command(&commands, TimerCommand::Resume).await
}

/// Clear any countdown and return to the neutral state.
pub async fn stop_timer(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
) -> Result<TimerSnapshot, ServiceError> {
    let (commands, _) = authorized_commands(state, session_id, token)?;
    authority::apply_command(&commands, TimerCommand::Stop).await
}

/// Stop, then immediately start a fresh countdown.
pub async fn reset_timer(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
    payload: TimerDurationRequest,
) -> Result<TimerSnapshot, ServiceError> {
    payload.validate()?;
    let (commands, default_seconds) = authorized_commands(state, session_id, token)?;
    let seconds = payload.seconds.unwrap_or(default_seconds);
    authority::apply_command(&commands, TimerCommand::Reset { seconds }).await
}

/// Current state of a session's timer. No token required.
pub async fn timer_snapshot(
    state: &SharedState,
    session_id: Uuid,
) -> Result<TimerSnapshot, ServiceError> {
    let commands = {
        let session = state
            .sessions()
            .get(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.commands.clone()
    };
    authority::query_snapshot(&commands).await
}

/// Resolve the session and check the organizer token, returning its command
/// channel and default duration. The registry guard is dropped before any
/// await point.
fn authorized_commands(
    state: &SharedState,
    session_id: Uuid,
    token: &str,
) -> Result<(mpsc::Sender<AuthorityCommand>, u32), ServiceError> {
    let session = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    if !session.token_matches(token) {
        return Err(ServiceError::Unauthorized(
            "organizer token does not match this session".into(),
        ));
    }
    Ok((session.commands.clone(), session.default_timer_seconds))
}

fn session_not_found(session_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::{session::CreateSessionRequest, timer::TimerStatusDto},
        services::session_service,
    };

    async fn live_session(state: &SharedState) -> (Uuid, String) {
        let created = session_service::create_session(
            state,
            CreateSessionRequest {
                name: "Timer Exercises".into(),
                timer_seconds: None,
            },
        )
        .await
        .unwrap();
        (created.id, created.organizer_token)
    }

    #[tokio::test]
    async fn start_pause_resume_stop_flow() {
        let state = crate::state::AppState::new(AppConfig::default());
        let (id, token) = live_session(&state).await;

        let started = start_timer(&state, id, &token, TimerDurationRequest { seconds: Some(60) })
            .await
            .unwrap();
        assert_eq!(started.status, TimerStatusDto::Running);
        assert_eq!(started.total_seconds, 60);
        assert!(started.deadline.is_some());

        let paused = pause_timer(&state, id, &token).await.unwrap();
        assert_eq!(paused.status, TimerStatusDto::Paused);
        assert_eq!(paused.deadline, None);

        let resumed = resume_timer(&state, id, &token).await.unwrap();
        assert_eq!(resumed.status, TimerStatusDto::Running);
        assert!(resumed.deadline.is_some());

        let stopped = stop_timer(&state, id, &token).await.unwrap();
        assert_eq!(stopped.status, TimerStatusDto::Stopped);
        assert_eq!(stopped.remaining_seconds, 0);
    }

    #[tokio::test]
    async fn start_without_a_duration_uses_the_session_default() {
        let state = crate::state::AppState::new(AppConfig::default());
        let (id, token) = live_session(&state).await;

        let started = start_timer(&state, id, &token, TimerDurationRequest::default())
            .await
            .unwrap();
        assert_eq!(started.total_seconds, 30);
        assert_eq!(started.remaining_seconds, 30);
    }

    #[tokio::test]
    async fn commands_require_the_organizer_token() {
        let state = crate::state::AppState::new(AppConfig::default());
        let (id, _token) = live_session(&state).await;

        let denied = start_timer(
            &state,
            id,
            "org_imposter",
            TimerDurationRequest::default(),
        )
        .await;
        assert!(matches!(denied, Err(ServiceError::Unauthorized(_))));

        // The public snapshot stays reachable without a token.
        let snapshot = timer_snapshot(&state, id).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Stopped);
    }

    #[tokio::test]
    async fn out_of_range_durations_are_rejected_before_reaching_the_authority() {
        let state = crate::state::AppState::new(AppConfig::default());
        let (id, token) = live_session(&state).await;

        let rejected = start_timer(&state, id, &token, TimerDurationRequest { seconds: Some(3) })
            .await;
        assert!(matches!(rejected, Err(ServiceError::InvalidInput(_))));

        let snapshot = timer_snapshot(&state, id).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Stopped);
    }

    #[tokio::test]
    async fn unknown_session_is_reported_as_not_found() {
        let state = crate::state::AppState::new(AppConfig::default());
        let missing = timer_snapshot(&state, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
