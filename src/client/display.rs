//! Pure mapping from predicted countdown values to what a viewer surface
//! renders: the `M:SS` text, the urgency class, and the progress ring style.

use crate::dto::timer::TimerStatusDto;

/// Circumference of the SVG progress circle (2 * pi * 54, rounded).
pub const RING_CIRCUMFERENCE: f64 = 339.29;

/// Largest remaining-seconds value of the critical band.
pub const CRITICAL_MAX_SECONDS: u32 = 5;
/// Largest remaining-seconds value of the warning band.
pub const WARNING_MAX_SECONDS: u32 = 10;
/// Largest remaining-seconds value of the caution band.
pub const CAUTION_MAX_SECONDS: u32 = 30;

/// Urgency bands applied to the countdown text while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyBand {
    /// Five seconds or less.
    Critical,
    /// Ten seconds or less.
    Warning,
    /// Thirty seconds or less.
    Caution,
    /// Anything above the caution band.
    Normal,
}

impl UrgencyBand {
    /// Band for a remaining-seconds value.
    pub fn for_remaining(seconds: u32) -> Self {
        if seconds <= CRITICAL_MAX_SECONDS {
            Self::Critical
        } else if seconds <= WARNING_MAX_SECONDS {
            Self::Warning
        } else if seconds <= CAUTION_MAX_SECONDS {
            Self::Caution
        } else {
            Self::Normal
        }
    }

    /// CSS class a DOM renderer applies for this band.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Critical => "timer-critical",
            Self::Warning => "timer-warning",
            Self::Caution => "timer-caution",
            Self::Normal => "timer-normal",
        }
    }
}

/// One rendered countdown frame.
///
/// `band` is set only while running; other states leave the previous classes
/// alone. `progress_style` is set while running (scaled to the cycle) and on
/// stop (reset to full); pause and expiry leave the ring untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerDisplay {
    /// Countdown text, `M:SS` with unpadded minutes.
    pub text: String,
    /// Status attribute for the surface.
    pub status: TimerStatusDto,
    /// Remaining whole seconds backing the text.
    pub remaining_seconds: u32,
    /// Urgency class while running.
    pub band: Option<UrgencyBand>,
    /// Inline style for the progress ring, when it changes.
    pub progress_style: Option<String>,
}

/// Render a live countdown frame.
pub fn render_running(remaining_seconds: u32, total_seconds: u32) -> TimerDisplay {
    TimerDisplay {
        text: format_mm_ss(remaining_seconds),
        status: TimerStatusDto::Running,
        remaining_seconds,
        band: Some(UrgencyBand::for_remaining(remaining_seconds)),
        progress_style: progress_style(remaining_seconds, total_seconds),
    }
}

/// Render the frozen frame shown while paused.
pub fn render_paused(remaining_seconds: u32) -> TimerDisplay {
    TimerDisplay {
        text: format_mm_ss(remaining_seconds),
        status: TimerStatusDto::Paused,
        remaining_seconds,
        band: None,
        progress_style: None,
    }
}

/// Render the neutral frame shown after a stop, ring reset to full.
pub fn render_stopped() -> TimerDisplay {
    TimerDisplay {
        text: format_mm_ss(0),
        status: TimerStatusDto::Stopped,
        remaining_seconds: 0,
        band: None,
        progress_style: Some(stopped_ring_style()),
    }
}

/// Render the terminal frame shown after expiry, ring left as it was.
pub fn render_expired() -> TimerDisplay {
    TimerDisplay {
        text: format_mm_ss(0),
        status: TimerStatusDto::Expired,
        remaining_seconds: 0,
        band: None,
        progress_style: None,
    }
}

/// `M:SS` with unpadded minutes and zero-padded seconds.
pub fn format_mm_ss(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Inline style for the progress ring, or `None` when the cycle duration is
/// unknown and the ring cannot be scaled.
pub fn progress_style(remaining_seconds: u32, total_seconds: u32) -> Option<String> {
    if total_seconds == 0 {
        return None;
    }
    let fraction = f64::from(remaining_seconds) / f64::from(total_seconds);
    let dash_offset = RING_CIRCUMFERENCE * (1.0 - fraction);
    Some(format!(
        "stroke-dasharray: {RING_CIRCUMFERENCE}; stroke-dashoffset: {dash_offset};"
    ))
}

/// Ring style applied on stop, independent of any cycle duration.
pub fn stopped_ring_style() -> String {
    "stroke-dasharray: 339.29; stroke-dashoffset: 0;".to_string()
}
