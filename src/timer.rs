//! The focus countdown state machine.
//!
//! Remaining time is always recomputed from the absolute end time, so missed
//! ticks (a suspended terminal, a laptop lid) never drift the countdown.

use chrono::{DateTime, Duration, Utc};

use crate::error::{FocusError, Result};

pub const FOCUS_DURATION_SECS: u64 = 60 * 60;
pub const FOCUS_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub remaining_seconds: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            active: false,
            start_time: None,
            end_time: None,
            remaining_seconds: FOCUS_DURATION_SECS,
        }
    }
}

impl TimerState {
    fn running_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.active, self.start_time, self.end_time) {
            (true, Some(start), Some(end)) if end > start => Some((start, end)),
            _ => None,
        }
    }
}

/// A countdown that ran to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedCountdown {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Running { remaining_seconds: u64 },
    Completed(CompletedCountdown),
}

/// What `restore` found in the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    Idle,
    Resumed { remaining_seconds: u64 },
    /// The countdown ran out while the app was closed.
    Expired(CompletedCountdown),
}

#[derive(Debug, Clone, Default)]
pub struct FocusTimer {
    state: TimerState,
}

fn seconds_until(end: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (end - now).num_milliseconds();
    if ms <= 0 { 0 } else { (ms / 1000) as u64 }
}

impl FocusTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the machine from a persisted snapshot, trusting only the end time.
    pub fn restore(saved: TimerState, now: DateTime<Utc>) -> (Self, Restored) {
        let Some((start, end)) = saved.running_window() else {
            if saved.active {
                tracing::warn!("persisted timer was active without a valid window, resetting");
            }
            return (Self::new(), Restored::Idle);
        };

        let remaining = seconds_until(end, now);
        if remaining > 0 {
            let state = TimerState {
                remaining_seconds: remaining,
                ..saved
            };
            (Self { state }, Restored::Resumed { remaining_seconds: remaining })
        } else {
            let state = TimerState {
                remaining_seconds: 0,
                ..TimerState::default()
            };
            (Self { state }, Restored::Expired(CompletedCountdown { start, end }))
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.active
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state.active {
            return Err(FocusError::AlreadyRunning);
        }
        self.state = TimerState {
            active: true,
            start_time: Some(now),
            end_time: Some(now + Duration::seconds(FOCUS_DURATION_SECS as i64)),
            remaining_seconds: FOCUS_DURATION_SECS,
        };
        tracing::info!(start = %now, "focus session started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.state.active {
            return Err(FocusError::NotRunning);
        }
        self.state = TimerState::default();
        tracing::info!("focus session stopped");
        Ok(())
    }

    /// Click handler: start when idle, stop when running. Returns whether the
    /// timer is running afterwards.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.active {
            self.state = TimerState::default();
            tracing::info!("focus session stopped");
            false
        } else {
            // cannot fail from idle
            let _ = self.start(now);
            true
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let Some((start, end)) = self.state.running_window() else {
            return TickOutcome::Idle;
        };

        let remaining = seconds_until(end, now);
        if remaining > 0 {
            self.state.remaining_seconds = remaining;
            return TickOutcome::Running { remaining_seconds: remaining };
        }

        self.state = TimerState::default();
        tracing::info!(start = %start, end = %end, "focus session completed");
        TickOutcome::Completed(CompletedCountdown { start, end })
    }

    /// Elapsed fraction of the running countdown, 0 when idle.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        match self.state.running_window() {
            Some((start, end)) => {
                let total = (end - start).num_milliseconds() as f64;
                let elapsed = (now - start).num_milliseconds() as f64;
                (elapsed / total).clamp(0.0, 1.0)
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap()
    }

    #[test]
    fn new_timer_is_idle_with_full_duration() {
        let mut timer = FocusTimer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 3600);
        assert_eq!(timer.tick(t0()), TickOutcome::Idle);
    }

    #[test]
    fn remaining_tracks_wall_clock_not_tick_count() {
        let mut timer = FocusTimer::new();
        timer.start(t0()).unwrap();

        for elapsed in [1_i64, 59, 600, 3599] {
            let outcome = timer.tick(t0() + Duration::seconds(elapsed));
            assert_eq!(
                outcome,
                TickOutcome::Running { remaining_seconds: (3600 - elapsed) as u64 }
            );
        }
    }

    #[test]
    fn sub_second_remainders_round_down() {
        let mut timer = FocusTimer::new();
        timer.start(t0()).unwrap();
        timer.tick(t0() + Duration::milliseconds(1500));
        assert_eq!(timer.remaining_seconds(), 3598);
    }

    #[test]
    fn start_then_stop_resets() {
        let mut timer = FocusTimer::new();
        timer.start(t0()).unwrap();
        timer.tick(t0() + Duration::seconds(42));
        timer.stop().unwrap();

        assert_eq!(timer.state(), &TimerState::default());
        assert_eq!(timer.remaining_seconds(), 3600);
        assert!(timer.state().start_time.is_none());
        assert!(timer.state().end_time.is_none());
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut timer = FocusTimer::new();
        assert!(matches!(timer.stop(), Err(FocusError::NotRunning)));
        timer.start(t0()).unwrap();
        assert!(matches!(timer.start(t0()), Err(FocusError::AlreadyRunning)));
    }

    #[test]
    fn completes_once_and_returns_to_idle() {
        let mut timer = FocusTimer::new();
        timer.start(t0()).unwrap();

        let end = t0() + Duration::seconds(3600);
        assert_eq!(
            timer.tick(end + Duration::seconds(3)),
            TickOutcome::Completed(CompletedCountdown { start: t0(), end })
        );
        assert!(!timer.is_running());
        assert_eq!(timer.tick(end + Duration::seconds(4)), TickOutcome::Idle);
    }

    #[test]
    fn toggle_starts_and_stops() {
        let mut timer = FocusTimer::new();
        assert!(timer.toggle(t0()));
        assert!(timer.is_running());
        assert!(!timer.toggle(t0() + Duration::seconds(5)));
        assert_eq!(timer.remaining_seconds(), 3600);
    }

    #[test]
    fn restore_resumes_from_end_time() {
        let mut running = FocusTimer::new();
        running.start(t0()).unwrap();
        let saved = TimerState {
            // a stale countdown value must be ignored
            remaining_seconds: 3600,
            ..running.state().clone()
        };

        let (timer, restored) = FocusTimer::restore(saved, t0() + Duration::seconds(1000));
        assert_eq!(restored, Restored::Resumed { remaining_seconds: 2600 });
        assert!(timer.is_running());
        assert_eq!(timer.remaining_seconds(), 2600);
    }

    #[test]
    fn restore_after_expiry_is_idle_with_zero_remaining() {
        let now = t0();
        let saved = TimerState {
            active: true,
            start_time: Some(now - Duration::seconds(3590)),
            end_time: Some(now + Duration::seconds(10)),
            remaining_seconds: 10,
        };

        let (timer, restored) = FocusTimer::restore(saved, now + Duration::seconds(15));
        assert!(matches!(restored, Restored::Expired(_)));
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[test]
    fn restore_rejects_inconsistent_state() {
        let saved = TimerState {
            active: true,
            start_time: None,
            end_time: Some(t0()),
            remaining_seconds: 100,
        };
        let (timer, restored) = FocusTimer::restore(saved, t0());
        assert_eq!(restored, Restored::Idle);
        assert_eq!(timer.state(), &TimerState::default());
    }

    #[test]
    fn progress_is_clamped() {
        let mut timer = FocusTimer::new();
        assert_eq!(timer.progress(t0()), 0.0);
        timer.start(t0()).unwrap();
        assert!((timer.progress(t0() + Duration::seconds(900)) - 0.25).abs() < 1e-9);
        assert_eq!(timer.progress(t0() + Duration::seconds(9000)), 1.0);
    }
}
