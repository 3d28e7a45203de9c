use std::time::Duration;

use crate::clock::{remaining_ms, seconds_to_ms};

/// Coarse timer status, the `status` field every subscriber sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// No countdown in progress; the neutral initial state.
    Stopped,
    /// Counting down towards the deadline.
    Running,
    /// Frozen mid-countdown, remaining time snapshotted.
    Paused,
    /// The deadline was reached while running.
    Expired,
}

/// Phase of the countdown, carrying the data that is only meaningful there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerPhase {
    /// No deadline exists.
    Stopped,
    /// A deadline exists; `deadline_ms` is absolute server wall-clock time.
    Running {
        /// Unix milliseconds at which the countdown reaches zero.
        deadline_ms: i64,
    },
    /// Countdown frozen with this much time left.
    Paused {
        /// Remaining time captured at the moment of pausing.
        remaining: Duration,
    },
    /// The deadline passed while running.
    Expired,
}

/// Operations the authority can apply to its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// Begin a fresh countdown of `seconds`; running timers restart.
    Start {
        /// Full duration of the new cycle.
        seconds: u32,
    },
    /// Freeze a running countdown.
    Pause,
    /// Continue a paused countdown where it left off.
    Resume,
    /// Drop any countdown and return to the neutral state.
    Stop,
    /// Stop, then immediately begin a fresh countdown of `seconds`.
    Reset {
        /// Full duration of the new cycle.
        seconds: u32,
    },
    /// Internal: the scheduled wake-up for the current deadline fired.
    DeadlineReached,
}

/// Observable outcomes of applying a [`TimerOp`], in emission order.
///
/// The authority maps each value onto one protocol push; `Snapshot` re-emits
/// the full current state so redundant commands stay idempotent without going
/// silent. Events carry the payload their push needs so the mapping never has
/// to re-read the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A fresh countdown began.
    Started {
        /// Absolute deadline of the new cycle.
        deadline_ms: i64,
        /// Full duration of the new cycle.
        total_seconds: u32,
    },
    /// A paused countdown continued.
    Resumed {
        /// Recomputed absolute deadline.
        deadline_ms: i64,
        /// Full duration of the interrupted cycle.
        total_seconds: u32,
    },
    /// A running countdown froze.
    Paused {
        /// Whole seconds left, rounded up.
        remaining_seconds: u32,
    },
    /// The countdown was cleared.
    Stopped,
    /// The deadline was reached.
    Expired,
    /// Nothing changed; current state should be re-broadcast.
    Snapshot,
}

/// The per-session countdown owned exclusively by one authority task.
///
/// All arithmetic takes an explicit `now_ms` so the state machine itself has
/// no clock and tests drive it deterministically. `deadline_ms` is set iff
/// the phase is `Running`; `total_seconds` is always positive (enforced by
/// request validation upstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickTimer {
    phase: TimerPhase,
    total_seconds: u32,
}

impl PickTimer {
    /// Create a stopped timer whose display scale starts at `total_seconds`.
    pub fn new(total_seconds: u32) -> Self {
        Self {
            phase: TimerPhase::Stopped,
            total_seconds,
        }
    }

    /// Current phase including its payload.
    pub fn phase(&self) -> &TimerPhase {
        &self.phase
    }

    /// Coarse status derived from the phase.
    pub fn status(&self) -> TimerStatus {
        match self.phase {
            TimerPhase::Stopped => TimerStatus::Stopped,
            TimerPhase::Running { .. } => TimerStatus::Running,
            TimerPhase::Paused { .. } => TimerStatus::Paused,
            TimerPhase::Expired => TimerStatus::Expired,
        }
    }

    /// Configured duration of the current cycle, in seconds.
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    /// The absolute deadline, present only while running.
    pub fn deadline_ms(&self) -> Option<i64> {
        match self.phase {
            TimerPhase::Running { deadline_ms } => Some(deadline_ms),
            _ => None,
        }
    }

    /// Whole seconds left at `now_ms`, rounded up; zero outside a countdown.
    pub fn remaining_seconds(&self, now_ms: i64) -> u32 {
        match &self.phase {
            TimerPhase::Running { deadline_ms } => crate::clock::remaining_seconds(*deadline_ms, now_ms),
            TimerPhase::Paused { remaining } => duration_to_display_seconds(*remaining),
            TimerPhase::Stopped | TimerPhase::Expired => 0,
        }
    }

    /// Apply `op` at wall-clock time `now_ms`, returning the events to
    /// broadcast in order.
    pub fn apply(&mut self, op: TimerOp, now_ms: i64) -> Vec<TimerEvent> {
        match (&self.phase, op) {
            // A start on a stopped timer is the only start that is not a
            // restart; every other origin goes through the reset path so a
            // duplicate operator click can never leave a stale deadline.
            (TimerPhase::Stopped, TimerOp::Start { seconds }) => {
                vec![self.begin_cycle(seconds, now_ms)]
            }
            (_, TimerOp::Start { seconds }) | (_, TimerOp::Reset { seconds }) => {
                vec![TimerEvent::Stopped, self.begin_cycle(seconds, now_ms)]
            }
            (TimerPhase::Running { deadline_ms }, TimerOp::Pause) => {
                let left_ms = remaining_ms(*deadline_ms, now_ms).max(0);
                let remaining = Duration::from_millis(left_ms as u64);
                self.phase = TimerPhase::Paused { remaining };
                vec![TimerEvent::Paused {
                    remaining_seconds: duration_to_display_seconds(remaining),
                }]
            }
            (TimerPhase::Paused { remaining }, TimerOp::Resume) => {
                let deadline_ms = now_ms + remaining.as_millis() as i64;
                self.phase = TimerPhase::Running { deadline_ms };
                vec![TimerEvent::Resumed {
                    deadline_ms,
                    total_seconds: self.total_seconds,
                }]
            }
            (TimerPhase::Running { .. }, TimerOp::Stop)
            | (TimerPhase::Paused { .. }, TimerOp::Stop)
            | (TimerPhase::Expired, TimerOp::Stop) => {
                self.phase = TimerPhase::Stopped;
                vec![TimerEvent::Stopped]
            }
            (TimerPhase::Running { .. }, TimerOp::DeadlineReached) => {
                self.phase = TimerPhase::Expired;
                vec![TimerEvent::Expired]
            }
            // A wake-up that raced a transition out of Running is stale and
            // must not be observable.
            (_, TimerOp::DeadlineReached) => Vec::new(),
            // Redundant pause/resume/stop: absorb, re-broadcast the state so
            // every subscriber converges anyway.
            (_, TimerOp::Pause) | (_, TimerOp::Resume) | (_, TimerOp::Stop) => {
                vec![TimerEvent::Snapshot]
            }
        }
    }

    fn begin_cycle(&mut self, seconds: u32, now_ms: i64) -> TimerEvent {
        let deadline_ms = now_ms + seconds_to_ms(seconds);
        self.total_seconds = seconds;
        self.phase = TimerPhase::Running { deadline_ms };
        TimerEvent::Started {
            deadline_ms,
            total_seconds: seconds,
        }
    }
}

/// Seconds shown for a paused remainder, rounded up like a live countdown.
fn duration_to_display_seconds(remaining: Duration) -> u32 {
    u32::try_from(remaining.as_millis().div_ceil(1000)).unwrap_or(u32::MAX)
}
