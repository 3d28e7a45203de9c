use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    clock::WallClock,
    state::timer::{PickTimer, TimerStatus},
};

/// Wire representation of the timer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatusDto {
    /// No countdown in progress.
    Stopped,
    /// Counting down.
    Running,
    /// Frozen mid-countdown.
    Paused,
    /// Deadline reached.
    Expired,
}

impl From<TimerStatus> for TimerStatusDto {
    fn from(status: TimerStatus) -> Self {
        match status {
            TimerStatus::Stopped => Self::Stopped,
            TimerStatus::Running => Self::Running,
            TimerStatus::Paused => Self::Paused,
            TimerStatus::Expired => Self::Expired,
        }
    }
}

/// Complete timer description, sufficient to rebuild any viewer from scratch.
///
/// `deadline` is present only while running. `server_time` is the authority's
/// wall clock at the moment the snapshot was taken; receivers subtract it
/// from their own clock to compute the offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimerSnapshot {
    /// Coarse timer status.
    pub status: TimerStatusDto,
    /// Absolute deadline in Unix milliseconds, while running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    /// Configured duration of the current cycle in seconds.
    pub total_seconds: u32,
    /// Whole seconds left at `server_time` (frozen value while paused).
    pub remaining_seconds: u32,
    /// Authority wall clock in Unix milliseconds when this was produced.
    pub server_time: i64,
}

impl TimerSnapshot {
    /// Capture the timer through the authority's clock.
    pub fn capture(timer: &PickTimer, clock: &dyn WallClock) -> Self {
        let server_time = clock.now_ms();
        Self {
            status: timer.status().into(),
            deadline: timer.deadline_ms(),
            total_seconds: timer.total_seconds(),
            remaining_seconds: timer.remaining_seconds(server_time),
            server_time,
        }
    }
}

/// Optional duration carried by start and reset commands.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct TimerDurationRequest {
    /// Seconds for the new cycle; the session default applies when omitted.
    #[validate(range(min = 5, max = 600, message = "timer duration must be between 5 and 600 seconds"))]
    pub seconds: Option<u32>,
}
