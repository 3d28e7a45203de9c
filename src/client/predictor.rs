//! Deadline-based countdown prediction for one viewer.
//!
//! The predictor is a pure reducer over protocol pushes and 1 Hz ticks. It
//! never decrements a counter: every frame is recomputed from the adjusted
//! deadline, so a missed tick, a refresh, or a drift correction all converge
//! on the same rendered value. All clock readings come in as explicit
//! `local_now_ms` arguments, which keeps the whole module deterministic under
//! test.

use tracing::debug;

use crate::{
    client::display::{
        TimerDisplay, render_expired, render_paused, render_running, render_stopped,
    },
    clock::{adjusted_deadline_ms, clock_offset_ms, remaining_seconds},
    dto::{push::TimerPush, timer::TimerStatusDto},
};

/// Corrections smaller than this are treated as network jitter and discarded.
pub const DRIFT_TOLERANCE_MS: i64 = 3_000;

/// Idle time after which a running viewer proactively asks for a sync.
pub const RESYNC_AFTER_MS: i64 = 30_000;

/// What the surrounding loop should do with its 1 Hz cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// (Re)arm the 1 Hz cadence.
    Start,
    /// Drop the cadence; nothing left to count.
    Stop,
    /// Leave the cadence as it is.
    Keep,
}

/// Messages the predictor wants sent back to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkHint {
    /// Ask for a drift correction.
    RequestTimerSync,
    /// Report that the local countdown hit zero.
    TimerClientExpired,
}

/// Outcome of feeding one push or tick into the predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Frame to render, when the view changes.
    pub display: Option<TimerDisplay>,
    /// Uplink messages, in send order.
    pub hints: Vec<UplinkHint>,
    /// Cadence instruction.
    pub tick: TickControl,
}

impl Reaction {
    fn idle() -> Self {
        Self {
            display: None,
            hints: Vec::new(),
            tick: TickControl::Keep,
        }
    }
}

/// What the viewer currently believes about the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewPhase {
    /// No message seen yet; nothing to render.
    Awaiting,
    /// Counting against a deadline translated into the local clock domain.
    ///
    /// The deadline survives a local zero on purpose: a later correction can
    /// still move it back into the future.
    Running {
        /// Server deadline plus the local clock offset.
        adjusted_deadline_ms: i64,
    },
    /// Frozen at the value the authority reported.
    Paused {
        /// Seconds shown while frozen.
        remaining_seconds: u32,
    },
    /// Cleared; neutral visual.
    Stopped,
    /// Authoritatively over; terminal visual.
    Expired,
}

/// Client-side countdown state driven by pushes and ticks.
#[derive(Debug, Clone)]
pub struct TimerPredictor {
    phase: ViewPhase,
    /// Local time of the last accepted sync, bootstrap, or sent request.
    last_sync_ms: Option<i64>,
    /// Cycle duration used to scale the ring; zero until known.
    total_seconds: u32,
    drift_tolerance_ms: i64,
    /// Set once the local zero was reported, cleared by each bootstrap or
    /// applied correction.
    expired_notice_sent: bool,
}

impl TimerPredictor {
    /// A predictor that has seen nothing yet.
    pub fn new() -> Self {
        Self {
            phase: ViewPhase::Awaiting,
            last_sync_ms: None,
            total_seconds: 0,
            drift_tolerance_ms: DRIFT_TOLERANCE_MS,
            expired_notice_sent: false,
        }
    }

    /// Feed one protocol push received at local time `local_now_ms`.
    pub fn handle_push(&mut self, push: &TimerPush, local_now_ms: i64) -> Reaction {
        match push {
            TimerPush::TimerStarted {
                deadline,
                server_time,
                total_seconds,
            }
            | TimerPush::TimerResumed {
                deadline,
                server_time,
                total_seconds,
            } => self.bootstrap(*deadline, *server_time, *total_seconds, local_now_ms),
            TimerPush::TimerState {
                status,
                deadline,
                total_seconds,
                remaining_seconds,
                server_time,
            } => match (status, deadline) {
                (TimerStatusDto::Running, Some(deadline)) => {
                    // Older cycles may not have announced their duration;
                    // fall back to the snapshot's remaining value for scale.
                    let total = if *total_seconds == 0 {
                        *remaining_seconds
                    } else {
                        *total_seconds
                    };
                    self.bootstrap(*deadline, *server_time, total, local_now_ms)
                }
                // Running without a deadline carries nothing to count against.
                (TimerStatusDto::Running, None) => Reaction::idle(),
                (TimerStatusDto::Paused, _) => self.freeze(*remaining_seconds),
                (TimerStatusDto::Stopped, _) => self.clear(),
                (TimerStatusDto::Expired, _) => self.expire(),
            },
            TimerPush::TimerPaused { remaining_seconds } => self.freeze(*remaining_seconds),
            TimerPush::TimerStopped => self.clear(),
            TimerPush::TimerExpired => self.expire(),
            TimerPush::TimerSync {
                deadline,
                server_time,
            } => self.apply_sync(*deadline, *server_time, local_now_ms),
            TimerPush::Unknown => Reaction::idle(),
        }
    }

    /// One 1 Hz cadence beat at local time `local_now_ms`.
    ///
    /// Recomputes the frame from the deadline, asks for a sync when the last
    /// one is older than [`RESYNC_AFTER_MS`], and reports the local zero the
    /// first time it renders.
    pub fn tick(&mut self, local_now_ms: i64) -> Reaction {
        let ViewPhase::Running {
            adjusted_deadline_ms,
        } = self.phase
        else {
            return Reaction {
                display: None,
                hints: Vec::new(),
                tick: TickControl::Stop,
            };
        };

        let mut hints = Vec::new();
        if let Some(last_sync) = self.last_sync_ms
            && local_now_ms - last_sync > RESYNC_AFTER_MS
        {
            hints.push(UplinkHint::RequestTimerSync);
            // Reset so the request is not repeated every beat while the
            // answer is in flight.
            self.last_sync_ms = Some(local_now_ms);
        }

        let remaining = remaining_seconds(adjusted_deadline_ms, local_now_ms);
        let display = render_running(remaining, self.total_seconds);
        let tick = if remaining == 0 {
            if !self.expired_notice_sent {
                hints.push(UplinkHint::TimerClientExpired);
                self.expired_notice_sent = true;
            }
            TickControl::Stop
        } else {
            TickControl::Keep
        };

        Reaction {
            display: Some(display),
            hints,
            tick,
        }
    }

    /// Render the current belief without side effects.
    pub fn display(&self, local_now_ms: i64) -> Option<TimerDisplay> {
        match self.phase {
            ViewPhase::Awaiting => None,
            ViewPhase::Running {
                adjusted_deadline_ms,
            } => Some(render_running(
                remaining_seconds(adjusted_deadline_ms, local_now_ms),
                self.total_seconds,
            )),
            ViewPhase::Paused { remaining_seconds } => Some(render_paused(remaining_seconds)),
            ViewPhase::Stopped => Some(render_stopped()),
            ViewPhase::Expired => Some(render_expired()),
        }
    }

    /// Adopt a deadline from a time-bearing push and restart the cadence.
    fn bootstrap(
        &mut self,
        deadline_ms: i64,
        server_time_ms: i64,
        total_seconds: u32,
        local_now_ms: i64,
    ) -> Reaction {
        let offset = clock_offset_ms(local_now_ms, server_time_ms);
        self.phase = ViewPhase::Running {
            adjusted_deadline_ms: adjusted_deadline_ms(deadline_ms, offset),
        };
        self.last_sync_ms = Some(local_now_ms);
        self.total_seconds = total_seconds;
        self.expired_notice_sent = false;

        // The immediate frame goes through the tick path so a deadline that
        // is already in the past behaves exactly like a counted-down zero.
        let mut reaction = self.tick(local_now_ms);
        if reaction.tick != TickControl::Stop {
            reaction.tick = TickControl::Start;
        }
        reaction
    }

    fn freeze(&mut self, remaining_seconds: u32) -> Reaction {
        self.phase = ViewPhase::Paused { remaining_seconds };
        Reaction {
            display: Some(render_paused(remaining_seconds)),
            hints: Vec::new(),
            tick: TickControl::Stop,
        }
    }

    fn clear(&mut self) -> Reaction {
        self.phase = ViewPhase::Stopped;
        Reaction {
            display: Some(render_stopped()),
            hints: Vec::new(),
            tick: TickControl::Stop,
        }
    }

    fn expire(&mut self) -> Reaction {
        self.phase = ViewPhase::Expired;
        Reaction {
            display: Some(render_expired()),
            hints: Vec::new(),
            tick: TickControl::Stop,
        }
    }

    /// Compare a correction against the current deadline and adopt it only
    /// when the drift exceeds the tolerance.
    fn apply_sync(&mut self, deadline_ms: i64, server_time_ms: i64, local_now_ms: i64) -> Reaction {
        let ViewPhase::Running {
            adjusted_deadline_ms: current,
        } = self.phase
        else {
            // Nothing is counting; a correction has nothing to correct.
            return Reaction::idle();
        };

        let offset = clock_offset_ms(local_now_ms, server_time_ms);
        let candidate = adjusted_deadline_ms(deadline_ms, offset);
        let drift = (current - candidate).abs();
        if drift <= self.drift_tolerance_ms {
            return Reaction::idle();
        }

        debug!(drift_ms = drift, "timer drift detected, correcting");
        self.phase = ViewPhase::Running {
            adjusted_deadline_ms: candidate,
        };
        self.last_sync_ms = Some(local_now_ms);
        self.expired_notice_sent = false;

        // The cadence may have stopped at a local zero; a correction that
        // moved the deadline forward needs it running again.
        Reaction {
            display: None,
            hints: Vec::new(),
            tick: TickControl::Start,
        }
    }
}

impl Default for TimerPredictor {
    fn default() -> Self {
        Self::new()
    }
}
