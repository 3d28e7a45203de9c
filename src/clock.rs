//! Wall-clock access and the time arithmetic shared by the authority and the
//! client predictor.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one displayed second, used by the ceiling division below.
const MS_PER_SECOND: i64 = 1000;

/// Source of wall-clock readings in Unix milliseconds.
///
/// Protocol messages exchange wall-clock values so that machines with
/// different clocks can compute their offset from one another. Scheduling
/// never goes through this trait; it stays on the monotonic tokio clock.
pub trait WallClock: Send + Sync {
    /// Current wall-clock time as milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Production clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            // Clock set before 1970; treat as epoch rather than panic.
            Err(_) => 0,
        }
    }
}

/// Offset of the local clock relative to the server clock, from one
/// message receipt: `local_now - server_time`.
///
/// Positive means the local clock runs ahead of the server's. The value also
/// absorbs the message's network transit time, which is why corrections below
/// the drift tolerance are discarded instead of applied.
pub fn clock_offset_ms(local_now_ms: i64, server_time_ms: i64) -> i64 {
    local_now_ms - server_time_ms
}

/// Translate a server-side deadline into the local clock domain.
pub fn adjusted_deadline_ms(deadline_ms: i64, clock_offset_ms: i64) -> i64 {
    deadline_ms + clock_offset_ms
}

/// Milliseconds left until `deadline_ms`, negative once the deadline passed.
pub fn remaining_ms(deadline_ms: i64, now_ms: i64) -> i64 {
    deadline_ms - now_ms
}

/// Whole seconds left until `deadline_ms`, rounded up and clamped to zero.
///
/// Always re-derived from the deadline, never decremented: this is the single
/// code path that makes late join, refresh, and drift correction all render
/// the same value.
pub fn remaining_seconds(deadline_ms: i64, now_ms: i64) -> u32 {
    let left = remaining_ms(deadline_ms, now_ms);
    if left <= 0 {
        return 0;
    }
    // `left` is positive here, so the unsigned ceiling division is exact;
    // signed `div_ceil` is unstable on this toolchain.
    u32::try_from((left as u64).div_ceil(MS_PER_SECOND as u64)).unwrap_or(u32::MAX)
}

/// Convert a duration in whole seconds to milliseconds.
pub fn seconds_to_ms(seconds: u32) -> i64 {
    i64::from(seconds) * MS_PER_SECOND
}

#[cfg(test)]
pub(crate) use fake::FakeClock;

#[cfg(test)]
mod fake {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::WallClock;

    /// Manually advanced wall clock so tests control time instead of sleeping.
    pub(crate) struct FakeClock {
        ms: AtomicI64,
    }

    impl FakeClock {
        pub(crate) fn new(start_ms: i64) -> Self {
            Self {
                ms: AtomicI64::new(start_ms),
            }
        }

        pub(crate) fn advance(&self, delta_ms: i64) {
            self.ms.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }

    impl WallClock for FakeClock {
        fn now_ms(&self) -> i64 {
            self.ms.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_past_2024() {
        // 2024-01-01T00:00:00Z in Unix milliseconds.
        assert!(SystemClock.now_ms() > 1_704_067_200_000);
    }

    #[test]
    fn offset_positive_when_local_runs_ahead() {
        assert_eq!(clock_offset_ms(10_500, 10_000), 500);
        assert_eq!(clock_offset_ms(9_000, 10_000), -1_000);
        assert_eq!(clock_offset_ms(10_000, 10_000), 0);
    }

    #[test]
    fn adjusted_deadline_moves_with_offset() {
        assert_eq!(adjusted_deadline_ms(30_000, 500), 30_500);
        assert_eq!(adjusted_deadline_ms(30_000, -1_000), 29_000);
    }

    #[test]
    fn remaining_seconds_rounds_up() {
        assert_eq!(remaining_seconds(30_000, 29_999), 1);
        assert_eq!(remaining_seconds(30_000, 29_001), 1);
        assert_eq!(remaining_seconds(30_000, 29_000), 1);
        assert_eq!(remaining_seconds(30_000, 28_999), 2);
        assert_eq!(remaining_seconds(30_000, 0), 30);
    }

    #[test]
    fn remaining_seconds_clamps_past_deadlines_to_zero() {
        assert_eq!(remaining_seconds(30_000, 30_000), 0);
        assert_eq!(remaining_seconds(30_000, 30_001), 0);
        assert_eq!(remaining_seconds(30_000, 90_000), 0);
    }

    #[test]
    fn fake_clock_advances_on_demand() {
        let clock = FakeClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(2_500);
        assert_eq!(clock.now_ms(), 3_500);
    }
}
