//! The timer authority: one task per draft session owning the canonical
//! countdown state.
//!
//! All transitions for a session are serialized through its command channel,
//! so no two commands ever race. Expiry is driven by a monotonic wake-up
//! armed while the timer runs; wall-clock readings only ever stamp outgoing
//! protocol messages.

use std::{future, sync::Arc, time::Duration};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::WallClock,
    dto::{push::TimerPush, timer::TimerSnapshot},
    error::ServiceError,
    state::{
        TimerHub,
        timer::{PickTimer, TimerEvent, TimerOp},
    },
};

/// Depth of each session's command channel.
const COMMAND_BUFFER: usize = 16;

/// Organizer-facing timer commands.
///
/// The internal deadline-reached transition is deliberately absent: only the
/// authority's own wake-up may expire a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Begin a fresh countdown of `seconds`; restarts a running timer.
    Start {
        /// Full duration of the new cycle.
        seconds: u32,
    },
    /// Freeze the running countdown.
    Pause,
    /// Continue a paused countdown.
    Resume,
    /// Clear any countdown.
    Stop,
    /// Stop, then immediately start a fresh countdown of `seconds`.
    Reset {
        /// Full duration of the new cycle.
        seconds: u32,
    },
}

/// Messages accepted by an authority task.
#[derive(Debug)]
pub enum AuthorityCommand {
    /// Apply an organizer command and reply with the resulting snapshot.
    Apply {
        /// The command to apply.
        command: TimerCommand,
        /// Receives the state captured right after the transition.
        reply: oneshot::Sender<TimerSnapshot>,
    },
    /// Reply with the current snapshot without mutating anything.
    Snapshot {
        /// Receives the current state.
        reply: oneshot::Sender<TimerSnapshot>,
    },
    /// A viewer suspects drift; broadcast a correction.
    RequestSync {
        /// Viewer that asked, for logging only.
        viewer: Uuid,
    },
    /// A viewer's local countdown reached zero. Telemetry only.
    ClientExpired {
        /// Viewer that reported, for logging only.
        viewer: Uuid,
    },
    /// Stop the task; used when the session is deleted.
    Shutdown,
}

/// Spawn the authority task for a session and return its command channel.
pub fn spawn(
    session_id: Uuid,
    default_timer_seconds: u32,
    hub: Arc<TimerHub>,
    clock: Arc<dyn WallClock>,
    sync_interval: Duration,
) -> mpsc::Sender<AuthorityCommand> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    tokio::spawn(run_authority(
        session_id,
        default_timer_seconds,
        hub,
        clock,
        sync_interval,
        rx,
    ));
    tx
}

/// Send an organizer command and wait for the resulting snapshot.
pub async fn apply_command(
    commands: &mpsc::Sender<AuthorityCommand>,
    command: TimerCommand,
) -> Result<TimerSnapshot, ServiceError> {
    let (reply, response) = oneshot::channel();
    commands
        .send(AuthorityCommand::Apply { command, reply })
        .await
        .map_err(|_| ServiceError::TimerUnavailable)?;
    response.await.map_err(|_| ServiceError::TimerUnavailable)
}

/// Fetch the current snapshot without mutating the timer.
pub async fn query_snapshot(
    commands: &mpsc::Sender<AuthorityCommand>,
) -> Result<TimerSnapshot, ServiceError> {
    let (reply, response) = oneshot::channel();
    commands
        .send(AuthorityCommand::Snapshot { reply })
        .await
        .map_err(|_| ServiceError::TimerUnavailable)?;
    response.await.map_err(|_| ServiceError::TimerUnavailable)
}

/// The authority loop: serializes commands, schedules expiry, broadcasts.
async fn run_authority(
    session_id: Uuid,
    default_timer_seconds: u32,
    hub: Arc<TimerHub>,
    clock: Arc<dyn WallClock>,
    sync_interval: Duration,
    mut commands: mpsc::Receiver<AuthorityCommand>,
) {
    let mut timer = PickTimer::new(default_timer_seconds);
    // Both wake-ups are armed only while the timer runs. They are re-derived
    // on every transition, so a wake-up scheduled for an earlier cycle can
    // never fire into a later one.
    let mut expiry_at: Option<Instant> = None;
    let mut next_sync_at: Option<Instant> = None;

    info!(session = %session_id, "timer authority started");

    loop {
        tokio::select! {
            maybe_command = commands.recv() => {
                match maybe_command {
                    Some(AuthorityCommand::Apply { command, reply }) => {
                        let now_ms = clock.now_ms();
                        info!(session = %session_id, command = ?command, "applying timer command");
                        let events = timer.apply(op_for(command), now_ms);
                        (expiry_at, next_sync_at) = arm_wakeups(&timer, now_ms, sync_interval);
                        broadcast_events(&hub, &timer, clock.as_ref(), &events);
                        let _ = reply.send(TimerSnapshot::capture(&timer, clock.as_ref()));
                    }
                    Some(AuthorityCommand::Snapshot { reply }) => {
                        let _ = reply.send(TimerSnapshot::capture(&timer, clock.as_ref()));
                    }
                    Some(AuthorityCommand::RequestSync { viewer }) => {
                        debug!(session = %session_id, viewer = %viewer, "viewer requested a sync");
                        match timer.deadline_ms() {
                            Some(deadline) => {
                                hub.broadcast(TimerPush::TimerSync {
                                    deadline,
                                    server_time: clock.now_ms(),
                                });
                                // The correction just went out; push the
                                // periodic one back by a full interval.
                                next_sync_at = Some(Instant::now() + sync_interval);
                            }
                            None => {
                                hub.broadcast(TimerPush::state(TimerSnapshot::capture(
                                    &timer,
                                    clock.as_ref(),
                                )));
                            }
                        }
                    }
                    Some(AuthorityCommand::ClientExpired { viewer }) => {
                        // A hint, never a transition: only the wake-up below
                        // may expire the timer.
                        debug!(session = %session_id, viewer = %viewer, "viewer reported local expiry");
                    }
                    Some(AuthorityCommand::Shutdown) | None => break,
                }
            }
            _ = wake_at(expiry_at) => {
                let now_ms = clock.now_ms();
                let events = timer.apply(TimerOp::DeadlineReached, now_ms);
                expiry_at = None;
                next_sync_at = None;
                if events.is_empty() {
                    warn!(session = %session_id, "stale expiry wake-up ignored");
                } else {
                    info!(session = %session_id, "timer expired");
                    broadcast_events(&hub, &timer, clock.as_ref(), &events);
                }
            }
            _ = wake_at(next_sync_at) => {
                if let Some(deadline) = timer.deadline_ms() {
                    hub.broadcast(TimerPush::TimerSync {
                        deadline,
                        server_time: clock.now_ms(),
                    });
                }
                next_sync_at = Some(Instant::now() + sync_interval);
            }
        }
    }

    info!(session = %session_id, "timer authority stopped");
}

/// Sleep until `at`, or forever when no wake-up is armed.
async fn wake_at(at: Option<Instant>) {
    match at {
        Some(instant) => sleep_until(instant).await,
        None => future::pending().await,
    }
}

/// Derive the monotonic wake-ups from the timer state at `now_ms`.
fn arm_wakeups(
    timer: &PickTimer,
    now_ms: i64,
    sync_interval: Duration,
) -> (Option<Instant>, Option<Instant>) {
    match timer.deadline_ms() {
        Some(deadline_ms) => {
            let left_ms = (deadline_ms - now_ms).max(0) as u64;
            let expiry = Instant::now() + Duration::from_millis(left_ms);
            (Some(expiry), Some(Instant::now() + sync_interval))
        }
        None => (None, None),
    }
}

/// Map an organizer command onto the state machine operation.
fn op_for(command: TimerCommand) -> TimerOp {
    match command {
        TimerCommand::Start { seconds } => TimerOp::Start { seconds },
        TimerCommand::Pause => TimerOp::Pause,
        TimerCommand::Resume => TimerOp::Resume,
        TimerCommand::Stop => TimerOp::Stop,
        TimerCommand::Reset { seconds } => TimerOp::Reset { seconds },
    }
}

/// Broadcast one push per state machine event, stamped with the current
/// server time.
fn broadcast_events(
    hub: &TimerHub,
    timer: &PickTimer,
    clock: &dyn WallClock,
    events: &[TimerEvent],
) {
    for event in events {
        let push = match *event {
            TimerEvent::Started {
                deadline_ms,
                total_seconds,
            } => TimerPush::TimerStarted {
                deadline: deadline_ms,
                server_time: clock.now_ms(),
                total_seconds,
            },
            TimerEvent::Resumed {
                deadline_ms,
                total_seconds,
            } => TimerPush::TimerResumed {
                deadline: deadline_ms,
                server_time: clock.now_ms(),
                total_seconds,
            },
            TimerEvent::Paused { remaining_seconds } => {
                TimerPush::TimerPaused { remaining_seconds }
            }
            TimerEvent::Stopped => TimerPush::TimerStopped,
            TimerEvent::Expired => TimerPush::TimerExpired,
            TimerEvent::Snapshot => TimerPush::state(TimerSnapshot::capture(timer, clock)),
        };
        debug!(event = push.event_name(), "broadcasting timer push");
        hub.broadcast(push);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FakeClock, dto::timer::TimerStatusDto, state::HUB_CAPACITY};
    use tokio::sync::broadcast::{self, error::TryRecvError};
    use tokio::task::yield_now;

    const LONG_SYNC: Duration = Duration::from_secs(3600);

    struct Harness {
        commands: mpsc::Sender<AuthorityCommand>,
        pushes: broadcast::Receiver<TimerPush>,
        clock: Arc<FakeClock>,
    }

    fn spawn_harness(sync_interval: Duration) -> Harness {
        let hub = Arc::new(TimerHub::new(HUB_CAPACITY));
        let clock = Arc::new(FakeClock::new(1_000_000));
        let pushes = hub.subscribe();
        let commands = spawn(Uuid::new_v4(), 30, hub, clock.clone(), sync_interval);
        Harness {
            commands,
            pushes,
            clock,
        }
    }

    /// Let the authority task run until it has processed its pending work.
    async fn settle() {
        for _ in 0..8 {
            yield_now().await;
        }
    }

    /// Advance virtual scheduling time and the fake wall clock in lockstep.
    async fn advance(harness: &Harness, duration: Duration) {
        harness.clock.advance(duration.as_millis() as i64);
        tokio::time::advance(duration).await;
        settle().await;
    }

    async fn next_push(harness: &mut Harness) -> TimerPush {
        settle().await;
        harness.pushes.try_recv().expect("expected a push")
    }

    fn assert_no_push(harness: &mut Harness) {
        assert!(matches!(
            harness.pushes.try_recv(),
            Err(TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn start_broadcasts_and_expires_exactly_at_deadline() {
        let mut harness = spawn_harness(LONG_SYNC);

        let snapshot = apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Running);
        assert_eq!(snapshot.deadline, Some(1_030_000));
        assert_eq!(snapshot.remaining_seconds, 30);

        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerStarted {
                deadline: 1_030_000,
                server_time: 1_000_000,
                total_seconds: 30,
            }
        );

        advance(&harness, Duration::from_millis(29_999)).await;
        assert_no_push(&mut harness);

        advance(&harness, Duration::from_millis(1)).await;
        assert_eq!(next_push(&mut harness).await, TimerPush::TimerExpired);

        let snapshot = query_snapshot(&harness.commands).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Expired);
        assert_eq!(snapshot.deadline, None);
        assert_eq!(snapshot.remaining_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_the_expiry_wakeup() {
        let mut harness = spawn_harness(LONG_SYNC);

        apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;

        advance(&harness, Duration::from_secs(5)).await;
        let snapshot = apply_command(&harness.commands, TimerCommand::Pause)
            .await
            .unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Paused);
        assert_eq!(snapshot.remaining_seconds, 25);
        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerPaused {
                remaining_seconds: 25
            }
        );

        // Way past the original deadline: nothing may fire.
        advance(&harness, Duration::from_secs(120)).await;
        assert_no_push(&mut harness);

        let snapshot = query_snapshot(&harness.commands).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Paused);
        assert_eq!(snapshot.remaining_seconds, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_rearms_expiry_from_the_paused_remainder() {
        let mut harness = spawn_harness(LONG_SYNC);

        apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        advance(&harness, Duration::from_secs(5)).await;
        apply_command(&harness.commands, TimerCommand::Pause)
            .await
            .unwrap();
        advance(&harness, Duration::from_secs(40)).await;

        let resumed_at = harness.clock.now_ms();
        let snapshot = apply_command(&harness.commands, TimerCommand::Resume)
            .await
            .unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Running);
        assert_eq!(snapshot.deadline, Some(resumed_at + 25_000));

        // Drain started/paused/resumed pushes, then watch for expiry.
        while harness.pushes.try_recv().is_ok() {}

        advance(&harness, Duration::from_millis(24_999)).await;
        assert_no_push(&mut harness);
        advance(&harness, Duration::from_millis(1)).await;
        assert_eq!(next_push(&mut harness).await, TimerPush::TimerExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_running_emits_stopped_then_started() {
        let mut harness = spawn_harness(LONG_SYNC);

        apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;
        advance(&harness, Duration::from_secs(10)).await;

        let reset_at = harness.clock.now_ms();
        let snapshot = apply_command(&harness.commands, TimerCommand::Reset { seconds: 45 })
            .await
            .unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Running);
        assert_eq!(snapshot.total_seconds, 45);
        assert_eq!(snapshot.remaining_seconds, 45);

        assert_eq!(next_push(&mut harness).await, TimerPush::TimerStopped);
        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerStarted {
                deadline: reset_at + 45_000,
                server_time: reset_at,
                total_seconds: 45,
            }
        );

        // The old cycle's deadline passes without an expiry.
        advance(&harness, Duration::from_secs(21)).await;
        assert_no_push(&mut harness);
        advance(&harness, Duration::from_secs(24)).await;
        assert_eq!(next_push(&mut harness).await, TimerPush::TimerExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_pause_rebroadcasts_the_state_snapshot() {
        let mut harness = spawn_harness(LONG_SYNC);

        let snapshot = apply_command(&harness.commands, TimerCommand::Pause)
            .await
            .unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Stopped);

        match next_push(&mut harness).await {
            TimerPush::TimerState {
                status,
                deadline,
                total_seconds,
                remaining_seconds,
                ..
            } => {
                assert_eq!(status, TimerStatusDto::Stopped);
                assert_eq!(deadline, None);
                assert_eq!(total_seconds, 30);
                assert_eq!(remaining_seconds, 0);
            }
            other => panic!("expected a state push, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sync_request_broadcasts_a_correction_while_running() {
        let mut harness = spawn_harness(LONG_SYNC);

        apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;
        advance(&harness, Duration::from_secs(3)).await;

        harness
            .commands
            .send(AuthorityCommand::RequestSync {
                viewer: Uuid::new_v4(),
            })
            .await
            .unwrap();
        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerSync {
                deadline: 1_030_000,
                server_time: 1_003_000,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sync_request_outside_running_rebroadcasts_state() {
        let mut harness = spawn_harness(LONG_SYNC);

        harness
            .commands
            .send(AuthorityCommand::RequestSync {
                viewer: Uuid::new_v4(),
            })
            .await
            .unwrap();

        match next_push(&mut harness).await {
            TimerPush::TimerState { status, .. } => assert_eq!(status, TimerStatusDto::Stopped),
            other => panic!("expected a state push, got {other:?}"),
        }

        // The request never mutates the timer.
        let snapshot = query_snapshot(&harness.commands).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sync_broadcasts_while_running() {
        let mut harness = spawn_harness(Duration::from_secs(10));

        apply_command(&harness.commands, TimerCommand::Start { seconds: 300 })
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;

        advance(&harness, Duration::from_secs(10)).await;
        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerSync {
                deadline: 1_300_000,
                server_time: 1_010_000,
            }
        );

        advance(&harness, Duration::from_secs(10)).await;
        assert_eq!(
            next_push(&mut harness).await,
            TimerPush::TimerSync {
                deadline: 1_300_000,
                server_time: 1_020_000,
            }
        );

        // Corrections stop once the timer does.
        apply_command(&harness.commands, TimerCommand::Stop)
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;
        advance(&harness, Duration::from_secs(30)).await;
        assert_no_push(&mut harness);
    }

    #[tokio::test(start_paused = true)]
    async fn client_expiry_report_never_changes_state() {
        let mut harness = spawn_harness(LONG_SYNC);

        apply_command(&harness.commands, TimerCommand::Start { seconds: 30 })
            .await
            .unwrap();
        let _ = next_push(&mut harness).await;

        harness
            .commands
            .send(AuthorityCommand::ClientExpired {
                viewer: Uuid::new_v4(),
            })
            .await
            .unwrap();
        settle().await;

        assert_no_push(&mut harness);
        let snapshot = query_snapshot(&harness.commands).await.unwrap();
        assert_eq!(snapshot.status, TimerStatusDto::Running);
        assert_eq!(snapshot.remaining_seconds, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_makes_further_commands_fail() {
        let harness = spawn_harness(LONG_SYNC);

        harness
            .commands
            .send(AuthorityCommand::Shutdown)
            .await
            .unwrap();
        settle().await;

        let err = apply_command(&harness.commands, TimerCommand::Stop)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TimerUnavailable));
    }
}
