//! JSON snapshots of the timer, the statistics and the goal-prompt date.
//!
//! Loads never fail: absent keys are a first run, malformed values are logged
//! and replaced by defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;
use crate::stats::SessionStats;
use crate::storage::KeyValueStore;
use crate::timer::TimerState;

pub const TIMER_KEY: &str = "timer_state";
pub const STATS_KEY: &str = "session_stats";
pub const GOAL_PROMPT_KEY: &str = "goal_prompt_date";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub active: bool,
    pub remaining_seconds: u64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    /// When the snapshot was written.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl TimerSnapshot {
    pub fn capture(state: &TimerState, now: DateTime<Utc>) -> Self {
        Self {
            active: state.active,
            remaining_seconds: state.remaining_seconds,
            start_time: state.start_time,
            end_time: state.end_time,
            timestamp: now,
        }
    }
}

impl From<TimerSnapshot> for TimerState {
    fn from(s: TimerSnapshot) -> Self {
        Self {
            active: s.active,
            start_time: s.start_time,
            end_time: s.end_time,
            remaining_seconds: s.remaining_seconds,
        }
    }
}

pub struct Persistence<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load_value(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read persisted value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed persisted value");
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed persisted value");
                None
            }
        }
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        Self::decode(key, self.load_value(key)?)
    }

    /// Like `load_json`, but only a JSON object is accepted. serde would
    /// otherwise map an array positionally onto the struct fields.
    fn load_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.load_value(key)?;
        if !value.is_object() {
            tracing::warn!(key, "ignoring persisted value that is not an object");
            return None;
        }
        Self::decode(key, value)
    }

    fn save_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        self.store.set(key, &raw)
    }

    pub fn save_timer(&mut self, state: &TimerState, now: DateTime<Utc>) -> Result<()> {
        self.save_json(TIMER_KEY, &TimerSnapshot::capture(state, now))
    }

    /// The persisted timer, or an idle full-length timer on first run.
    pub fn load_timer(&self) -> TimerState {
        self.load_record::<TimerSnapshot>(TIMER_KEY)
            .map(TimerState::from)
            .unwrap_or_default()
    }

    pub fn save_stats(&mut self, stats: &SessionStats) -> Result<()> {
        self.save_json(STATS_KEY, stats)
    }

    pub fn load_stats(&self) -> SessionStats {
        self.load_record(STATS_KEY).unwrap_or_default()
    }

    /// Last date (`YYYY-MM-DD`) on which the goal prompt was confirmed or skipped.
    pub fn goal_prompt_date(&self) -> Option<String> {
        self.load_json(GOAL_PROMPT_KEY)
    }

    pub fn set_goal_prompt_date(&mut self, date: &str) -> Result<()> {
        self.save_json(GOAL_PROMPT_KEY, &date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use crate::timer::FocusTimer;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 9, 0, 0).unwrap()
    }

    #[test]
    fn first_run_defaults() {
        let p = Persistence::new(MemoryStore::new());
        assert_eq!(p.load_timer(), TimerState::default());
        assert_eq!(p.load_stats(), SessionStats::default());
        assert!(p.goal_prompt_date().is_none());
    }

    #[test]
    fn timer_snapshot_uses_epoch_millis() {
        let mut p = Persistence::new(MemoryStore::new());
        let mut timer = FocusTimer::new();
        timer.start(now()).unwrap();
        p.save_timer(timer.state(), now()).unwrap();

        let raw = p.store().get(TIMER_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["start_time"], now().timestamp_millis());
        assert_eq!(json["end_time"], (now() + Duration::hours(1)).timestamp_millis());
        assert_eq!(json["timestamp"], now().timestamp_millis());

        assert_eq!(&p.load_timer(), timer.state());
    }

    #[test]
    fn idle_timer_persists_null_timestamps() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_timer(&TimerState::default(), now()).unwrap();

        let raw = p.store().get(TIMER_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["start_time"].is_null());
        assert_eq!(json["remaining_seconds"], 3600);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(TIMER_KEY, "{not json").unwrap();
        store.set(STATS_KEY, "[1, 2, 3]").unwrap();
        let p = Persistence::new(store);

        assert_eq!(p.load_timer(), TimerState::default());
        assert_eq!(p.load_stats(), SessionStats::default());
    }

    #[test]
    fn array_shaped_values_are_not_read_positionally() {
        let mut store = MemoryStore::new();
        store.set(STATS_KEY, "[1, 2, 3]").unwrap();
        store
            .set(TIMER_KEY, "[true, 10, null, null, 1710234000000]")
            .unwrap();
        let p = Persistence::new(store);

        let stats = p.load_stats();
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.today_sessions, 0);
        assert!(!p.load_timer().active);
    }

    #[test]
    fn partial_stats_fill_in_defaults() {
        let mut store = MemoryStore::new();
        store.set(STATS_KEY, r#"{"total_sessions": 7}"#).unwrap();
        let p = Persistence::new(store);

        let stats = p.load_stats();
        assert_eq!(stats.total_sessions, 7);
        assert!(stats.session_history.is_empty());
    }

    #[test]
    fn stats_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Persistence::new(FileStore::new(dir.path()));

        let mut stats = SessionStats::default();
        stats.record_completed_session(now() - Duration::hours(1), now());
        stats.daily_goals.insert("2024-03-12".into(), 4);
        p.save_stats(&stats).unwrap();
        p.set_goal_prompt_date("2024-03-12").unwrap();

        let reopened = Persistence::new(FileStore::new(dir.path()));
        let loaded = reopened.load_stats();
        assert_eq!(loaded, stats);
        assert_eq!(loaded.session_history[0].end_time, now());
        assert_eq!(reopened.goal_prompt_date().as_deref(), Some("2024-03-12"));
    }
}
