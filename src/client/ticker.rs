//! The viewer loop: feeds pushes and a 1 Hz cadence into the predictor,
//! forwards rendered frames to the surface, and sends uplink hints back.
//!
//! Transport-agnostic on purpose: the loop consumes a broadcast receiver, so
//! it runs against an in-process hub subscription exactly as it would against
//! frames decoded from a WebSocket.

use std::sync::Arc;

use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc};
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::{
    client::{
        display::TimerDisplay,
        predictor::{Reaction, TickControl, TimerPredictor, UplinkHint},
    },
    clock::WallClock,
    dto::{push::TimerPush, ws::ViewerInboundMessage},
};

/// Cadence of the local countdown.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Which event woke the loop.
enum Step {
    Push(Result<TimerPush, RecvError>),
    Beat,
}

/// Drive one viewer until its push source closes or its frame sink is gone.
pub async fn run_viewer(
    mut pushes: broadcast::Receiver<TimerPush>,
    clock: Arc<dyn WallClock>,
    frames: mpsc::UnboundedSender<TimerDisplay>,
    uplink: mpsc::UnboundedSender<ViewerInboundMessage>,
) {
    let mut predictor = TimerPredictor::new();
    let mut cadence: Option<Interval> = None;

    loop {
        let step = tokio::select! {
            push = pushes.recv() => Step::Push(push),
            _ = next_beat(&mut cadence) => Step::Beat,
        };

        let reaction = match step {
            Step::Push(Ok(push)) => predictor.handle_push(&push, clock.now_ms()),
            Step::Push(Err(RecvError::Lagged(missed))) => {
                // Pushes are self-contained; the next one re-converges the view.
                debug!(missed, "viewer loop lagged behind pushes");
                continue;
            }
            Step::Push(Err(RecvError::Closed)) => return,
            Step::Beat => predictor.tick(clock.now_ms()),
        };

        if !apply_reaction(reaction, &mut cadence, &frames, &uplink) {
            return;
        }
    }
}

/// Wait for the next cadence beat, or forever while the cadence is off.
async fn next_beat(cadence: &mut Option<Interval>) {
    match cadence {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Apply one predictor reaction to the cadence and both outbound channels.
///
/// Returns `false` when the frame sink is gone and the loop should end.
fn apply_reaction(
    reaction: Reaction,
    cadence: &mut Option<Interval>,
    frames: &mpsc::UnboundedSender<TimerDisplay>,
    uplink: &mpsc::UnboundedSender<ViewerInboundMessage>,
) -> bool {
    match reaction.tick {
        TickControl::Start => {
            // The reacting push already rendered its own frame; the first
            // beat belongs one full period later.
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *cadence = Some(interval);
        }
        TickControl::Stop => *cadence = None,
        TickControl::Keep => {}
    }

    for hint in &reaction.hints {
        let message = match hint {
            UplinkHint::RequestTimerSync => ViewerInboundMessage::RequestTimerSync,
            UplinkHint::TimerClientExpired => ViewerInboundMessage::TimerClientExpired,
        };
        if uplink.send(message).is_err() {
            warn!("uplink closed, dropping viewer hint");
        }
    }

    if let Some(frame) = reaction.display
        && frames.send(frame).is_err()
    {
        return false;
    }
    true
}
