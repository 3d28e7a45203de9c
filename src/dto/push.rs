use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::timer::{TimerSnapshot, TimerStatusDto};

/// Server-to-viewer push messages, tagged by event name on the wire.
///
/// Every time-bearing variant carries both the absolute `deadline` and the
/// authority's `server_time` so each receiver derives its clock offset at the
/// moment of receipt. Messages are self-contained and idempotent; the freshest
/// one always wins regardless of delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerPush {
    /// Full state snapshot, sent on subscribe and after no-op commands.
    TimerState {
        /// Coarse timer status.
        status: TimerStatusDto,
        /// Absolute deadline in Unix milliseconds, while running.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<i64>,
        /// Configured duration of the current cycle in seconds.
        total_seconds: u32,
        /// Whole seconds left (frozen value while paused).
        remaining_seconds: u32,
        /// Authority wall clock in Unix milliseconds.
        server_time: i64,
    },
    /// A fresh countdown began.
    TimerStarted {
        /// Absolute deadline in Unix milliseconds.
        deadline: i64,
        /// Authority wall clock in Unix milliseconds.
        server_time: i64,
        /// Configured duration of the new cycle in seconds.
        total_seconds: u32,
    },
    /// A paused countdown continued.
    TimerResumed {
        /// Absolute deadline in Unix milliseconds.
        deadline: i64,
        /// Authority wall clock in Unix milliseconds.
        server_time: i64,
        /// Configured duration of the current cycle in seconds.
        total_seconds: u32,
    },
    /// A running countdown froze.
    TimerPaused {
        /// Seconds left at the moment of pausing.
        remaining_seconds: u32,
    },
    /// The countdown was cleared; viewers show the neutral visual.
    TimerStopped,
    /// The deadline was reached; viewers show the terminal visual.
    TimerExpired,
    /// Periodic (or requested) correction while running.
    TimerSync {
        /// Absolute deadline in Unix milliseconds.
        deadline: i64,
        /// Authority wall clock in Unix milliseconds.
        server_time: i64,
    },
    /// Forward-compatibility catch-all for unrecognised events.
    #[serde(other)]
    Unknown,
}

impl TimerPush {
    /// Build the `timer_state` push from a captured snapshot.
    pub fn state(snapshot: TimerSnapshot) -> Self {
        Self::TimerState {
            status: snapshot.status,
            deadline: snapshot.deadline,
            total_seconds: snapshot.total_seconds,
            remaining_seconds: snapshot.remaining_seconds,
            server_time: snapshot.server_time,
        }
    }

    /// Event name as it appears on the wire, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::TimerState { .. } => "timer_state",
            Self::TimerStarted { .. } => "timer_started",
            Self::TimerResumed { .. } => "timer_resumed",
            Self::TimerPaused { .. } => "timer_paused",
            Self::TimerStopped => "timer_stopped",
            Self::TimerExpired => "timer_expired",
            Self::TimerSync { .. } => "timer_sync",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_push_is_flat_and_tagged() {
        let push = TimerPush::TimerStarted {
            deadline: 1_755_000_030_000,
            server_time: 1_755_000_000_000,
            total_seconds: 30,
        };
        let json = serde_json::to_value(&push).unwrap();

        assert_eq!(json["event"], "timer_started");
        assert_eq!(json["deadline"], 1_755_000_030_000_i64);
        assert_eq!(json["server_time"], 1_755_000_000_000_i64);
        assert_eq!(json["total_seconds"], 30);
    }

    #[test]
    fn unit_pushes_carry_only_the_event_tag() {
        let json = serde_json::to_value(TimerPush::TimerStopped).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "timer_stopped" }));

        let json = serde_json::to_value(TimerPush::TimerExpired).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "timer_expired" }));
    }

    #[test]
    fn state_push_flattens_the_snapshot() {
        let snapshot = TimerSnapshot {
            status: TimerStatusDto::Running,
            deadline: Some(60_000),
            total_seconds: 45,
            remaining_seconds: 12,
            server_time: 48_000,
        };
        let json = serde_json::to_value(TimerPush::state(snapshot)).unwrap();

        assert_eq!(json["event"], "timer_state");
        assert_eq!(json["status"], "running");
        assert_eq!(json["deadline"], 60_000);
        assert_eq!(json["total_seconds"], 45);
        assert_eq!(json["remaining_seconds"], 12);
        assert_eq!(json["server_time"], 48_000);
    }

    #[test]
    fn stopped_state_push_omits_deadline() {
        let snapshot = TimerSnapshot {
            status: TimerStatusDto::Stopped,
            deadline: None,
            total_seconds: 30,
            remaining_seconds: 0,
            server_time: 1_000,
        };
        let json = serde_json::to_value(TimerPush::state(snapshot)).unwrap();
        assert!(json.get("deadline").is_none());
    }

    #[test]
    fn pushes_round_trip_through_json() {
        let pushes = [
            TimerPush::TimerSync {
                deadline: 90_000,
                server_time: 70_000,
            },
            TimerPush::TimerPaused {
                remaining_seconds: 17,
            },
        ];
        for push in pushes {
            let json = serde_json::to_string(&push).unwrap();
            let back: TimerPush = serde_json::from_str(&json).unwrap();
            assert_eq!(back, push);
        }
    }

    #[test]
    fn unrecognised_event_deserializes_to_unknown() {
        let parsed: TimerPush =
            serde_json::from_str(r#"{"event":"confetti_burst","intensity":11}"#).unwrap();
        assert_eq!(parsed, TimerPush::Unknown);
    }
}
